//! Admin panel: password-gated catalog management, independent of the
//! player session.

use std::sync::Arc;

use axum::{
    Form,
    extract::{Path, State},
    http::{HeaderMap, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    database::{self, PuzzleInput},
    error::AppError,
    session,
    state::AppState,
    utils, views,
};

pub async fn login_form() -> Response {
    views::admin_login_page(None).into_response()
}

#[derive(Deserialize)]
pub struct AdminLoginForm {
    #[serde(default)]
    password: String,
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<AdminLoginForm>,
) -> Result<Response, AppError> {
    if form.password != state.config.admin_password {
        return Ok(views::admin_login_page(Some("Invalid password.")).into_response());
    }

    let token = session::mint_token();
    database::create_admin_session(&state.pool, &token).await?;
    Ok((
        AppendHeaders([(SET_COOKIE, session::set_cookie(session::ADMIN_COOKIE, &token))]),
        Redirect::to("/admin"),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session::cookie_value(&headers, session::ADMIN_COOKIE) {
        database::delete_admin_session(&state.pool, &token).await?;
    }
    Ok((
        AppendHeaders([(SET_COOKIE, session::clear_cookie(session::ADMIN_COOKIE))]),
        Redirect::to("/admin/login"),
    )
        .into_response())
}

async fn render_dashboard(state: &AppState, error: Option<&str>) -> Result<Response, AppError> {
    let puzzles = database::list_puzzles(&state.pool).await?;
    let gates = database::list_gates(&state.pool).await?;
    Ok(views::admin_page(&puzzles, &gates, error).into_response())
}

pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if !session::is_admin(&state, &headers).await? {
        return Ok(Redirect::to("/admin/login").into_response());
    }
    render_dashboard(&state, None).await
}

#[derive(Deserialize)]
pub struct PuzzleForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    clue: String,
    #[serde(default)]
    answer: String,
    #[serde(default)]
    group_index: String,
    #[serde(default)]
    order_index: String,
    #[serde(default)]
    media_url: String,
    #[serde(default)]
    media_embed_html: String,
    #[serde(default)]
    custom_html: String,
}

impl PuzzleForm {
    fn input(&self) -> PuzzleInput<'_> {
        PuzzleInput {
            title: self.title.trim(),
            clue: self.clue.trim(),
            answer: self.answer.trim(),
            group_index: utils::parse_int(&self.group_index, 1),
            order_index: utils::parse_int(&self.order_index, 0),
            media_url: self.media_url.trim(),
            media_embed_html: self.media_embed_html.trim(),
            custom_html: self.custom_html.trim(),
        }
    }
}

pub async fn create_puzzle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<PuzzleForm>,
) -> Result<Response, AppError> {
    if !session::is_admin(&state, &headers).await? {
        return Ok(Redirect::to("/admin/login").into_response());
    }

    let input = form.input();
    if input.title.is_empty()
        || input.clue.is_empty()
        || input.answer.is_empty()
        || input.order_index == 0
        || input.group_index == 0
    {
        return render_dashboard(
            &state,
            Some("Title, clue, answer, group, and order are required."),
        )
        .await;
    }

    database::create_puzzle(&state.pool, &input).await?;
    Ok(Redirect::to("/admin").into_response())
}

pub async fn update_puzzle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<PuzzleForm>,
) -> Result<Response, AppError> {
    if !session::is_admin(&state, &headers).await? {
        return Ok(Redirect::to("/admin/login").into_response());
    }

    database::update_puzzle(&state.pool, id, &form.input()).await?;
    Ok(Redirect::to("/admin").into_response())
}

pub async fn delete_puzzle(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !session::is_admin(&state, &headers).await? {
        return Ok(Redirect::to("/admin/login").into_response());
    }

    database::delete_puzzle(&state.pool, id).await?;
    Ok(Redirect::to("/admin").into_response())
}

#[derive(Deserialize)]
pub struct GateForm {
    #[serde(default)]
    group_index: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    unlock_at: String,
    #[serde(default)]
    content_html: String,
}

pub async fn upsert_gate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<GateForm>,
) -> Result<Response, AppError> {
    if !session::is_admin(&state, &headers).await? {
        return Ok(Redirect::to("/admin/login").into_response());
    }

    let group_index = utils::parse_int(&form.group_index, 0);
    let title = form.title.trim();
    let content_html = form.content_html.trim();
    if group_index == 0 || title.is_empty() || form.unlock_at.trim().is_empty()
        || content_html.is_empty()
    {
        return render_dashboard(
            &state,
            Some("Gate group, title, unlock time, and content are required."),
        )
        .await;
    }
    let Some(unlock_at) = utils::parse_unlock_at(&form.unlock_at) else {
        return render_dashboard(&state, Some("Unlock time must be a valid timestamp.")).await;
    };

    database::upsert_gate(&state.pool, group_index, title, content_html, unlock_at).await?;
    Ok(Redirect::to("/admin").into_response())
}

pub async fn update_gate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Form(form): Form<GateForm>,
) -> Result<Response, AppError> {
    if !session::is_admin(&state, &headers).await? {
        return Ok(Redirect::to("/admin/login").into_response());
    }

    let Some(unlock_at) = utils::parse_unlock_at(&form.unlock_at) else {
        return render_dashboard(&state, Some("Unlock time must be a valid timestamp.")).await;
    };
    database::update_gate(
        &state.pool,
        id,
        utils::parse_int(&form.group_index, 0),
        form.title.trim(),
        form.content_html.trim(),
        unlock_at,
    )
    .await?;
    Ok(Redirect::to("/admin").into_response())
}

pub async fn delete_gate(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Result<Response, AppError> {
    if !session::is_admin(&state, &headers).await? {
        return Ok(Redirect::to("/admin/login").into_response());
    }

    database::delete_gate(&state.pool, id).await?;
    Ok(Redirect::to("/admin").into_response())
}
