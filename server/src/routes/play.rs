//! The play surface: sidebar state, puzzle and gate pages, answer
//! submission, and the finish line.

use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    database,
    error::AppError,
    game::GameState,
    models::{HouseScore, Run, User},
    session,
    state::AppState,
    utils, views,
};

struct PageData {
    run: Run,
    game: GameState,
    place_text: String,
    house_scores: Vec<HouseScore>,
}

/// Everything a play-surface page renders. Unlock state is recomputed from
/// scratch on every request; gate clocks and other players move between
/// page views.
async fn load(state: &AppState, user: &User) -> Result<PageData, AppError> {
    let run = database::ensure_run(&state.pool, user.id).await?;
    let puzzles = database::list_puzzles(&state.pool).await?;
    let gates = database::list_gates(&state.pool).await?;
    let solved = database::solved_puzzle_ids(&state.pool, user.id).await?;
    let game = GameState::compute(&puzzles, &gates, &solved, Utc::now());

    let place_text = match database::overall_place(&state.pool, user.id).await? {
        Some(place) => utils::format_place(place),
        None => "unranked".to_string(),
    };
    let house_scores = database::house_scores(&state.pool).await?;

    Ok(PageData {
        run,
        game,
        place_text,
        house_scores,
    })
}

fn context<'a>(user_name: &'a str, data: &'a PageData) -> views::PlayContext<'a> {
    views::PlayContext {
        display_name: user_name,
        run: &data.run,
        state: &data.game,
        place_text: &data.place_text,
        house_scores: &data.house_scores,
    }
}

pub async fn play(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(user) = session::current_user(&state, &headers).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    let data = load(&state, &user).await?;
    if data.game.all_solved {
        return Ok(Redirect::to("/congratulations").into_response());
    }

    let name = utils::display_name(&user);
    Ok(views::play_page(&context(&name, &data)).into_response())
}

pub async fn puzzle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    let Some(user) = session::current_user(&state, &headers).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    let data = load(&state, &user).await?;
    if data.game.all_solved {
        return Ok(Redirect::to("/congratulations").into_response());
    }

    let Some(status) = data.game.puzzle(id) else {
        return Ok(Redirect::to("/play").into_response());
    };
    if !status.unlocked {
        return Ok(match &data.game.blocking_gate {
            Some(gate) => {
                Redirect::to(&format!("/gate/{}", gate.group_index)).into_response()
            }
            None => Redirect::to("/play").into_response(),
        });
    }

    let name = utils::display_name(&user);
    Ok(views::puzzle_page(&context(&name, &data), status, None).into_response())
}

pub async fn gate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(group_index): Path<i32>,
) -> Result<Response, AppError> {
    let Some(user) = session::current_user(&state, &headers).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    let data = load(&state, &user).await?;
    if data.game.all_solved {
        return Ok(Redirect::to("/congratulations").into_response());
    }

    // A gate page only exists while it is reachable and still counting down.
    let Some(status) = data.game.gate(group_index) else {
        return Ok(Redirect::to("/play").into_response());
    };
    if !status.can_view || !status.locked {
        return Ok(Redirect::to("/play").into_response());
    }

    let name = utils::display_name(&user);
    Ok(views::gate_page(&context(&name, &data), status).into_response())
}

#[derive(Deserialize)]
pub struct AnswerForm {
    #[serde(default)]
    puzzle_id: String,
    #[serde(default)]
    answer: String,
}

pub async fn answer(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<AnswerForm>,
) -> Result<Response, AppError> {
    let Some(user) = session::current_user(&state, &headers).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    let puzzle_id = form.puzzle_id.trim().parse::<i64>().unwrap_or(0);
    let submitted = utils::normalize_answer(&form.answer);

    let data = load(&state, &user).await?;
    let allowed = data.game.puzzle(puzzle_id).filter(|p| p.unlocked);
    let Some(status) = allowed else {
        return Ok(match &data.game.blocking_gate {
            Some(gate) => {
                Redirect::to(&format!("/gate/{}", gate.group_index)).into_response()
            }
            None => Redirect::to("/play").into_response(),
        });
    };

    if utils::normalize_answer(&status.puzzle.answer) != submitted {
        let name = utils::display_name(&user);
        return Ok(
            views::puzzle_page(&context(&name, &data), status, Some("Not quite. Try again."))
                .into_response(),
        );
    }

    database::record_solve(&state.pool, user.id, status.puzzle.id).await?;

    // Re-derive: this solve may have completed a group, exposed a gate, or
    // finished the hunt.
    let puzzles = database::list_puzzles(&state.pool).await?;
    let gates = database::list_gates(&state.pool).await?;
    let solved = database::solved_puzzle_ids(&state.pool, user.id).await?;
    let next = GameState::compute(&puzzles, &gates, &solved, Utc::now());

    if next.all_solved {
        database::finalize_run(&state.pool, user.id, Utc::now()).await?;
        return Ok(Redirect::to("/congratulations").into_response());
    }
    if next.next_puzzle.is_none() {
        if let Some(gate) = &next.blocking_gate {
            return Ok(Redirect::to(&format!("/gate/{}", gate.group_index)).into_response());
        }
    }
    Ok(match &next.next_puzzle {
        Some(p) => Redirect::to(&format!("/puzzle/{}", p.puzzle.id)).into_response(),
        None => Redirect::to("/play").into_response(),
    })
}

pub async fn congratulations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(user) = session::current_user(&state, &headers).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    let puzzles = database::list_puzzles(&state.pool).await?;
    let gates = database::list_gates(&state.pool).await?;
    let solved = database::solved_puzzle_ids(&state.pool, user.id).await?;
    let game = GameState::compute(&puzzles, &gates, &solved, Utc::now());
    if !game.all_solved {
        return Ok(Redirect::to("/play").into_response());
    }

    let finished = database::finalize_run(&state.pool, user.id, Utc::now()).await?;
    let name = utils::display_name(&user);
    let place_text = utils::format_place(i64::from(finished.rank.unwrap_or(0)));
    Ok(views::congratulations_page(&name, &place_text, &finished).into_response())
}
