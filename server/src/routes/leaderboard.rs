use std::sync::Arc;

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};

use crate::{database, error::AppError, session, state::AppState, views};

pub async fn leaderboard(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if session::current_user(&state, &headers).await?.is_none() {
        return Ok(Redirect::to("/").into_response());
    }

    let scores = database::leaderboard(&state.pool).await?;
    let house_scores = database::house_scores(&state.pool).await?;
    Ok(views::leaderboard_page(&scores, &house_scores).into_response())
}
