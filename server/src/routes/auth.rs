//! Identity: landing, registration, returning sign-in, account edits.

use std::sync::Arc;

use axum::{
    Form,
    extract::State,
    http::{HeaderMap, header::SET_COOKIE},
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;

use crate::{
    database,
    error::AppError,
    models::is_valid_house,
    session,
    state::AppState,
    views,
};

pub async fn landing(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if session::current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/play").into_response());
    }
    Ok(views::landing().into_response())
}

pub async fn begin(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if session::current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/play").into_response());
    }
    Ok(views::intro().into_response())
}

pub async fn return_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if session::current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/play").into_response());
    }
    Ok(views::return_form(None).into_response())
}

#[derive(Deserialize)]
pub struct ReturnForm {
    #[serde(default)]
    username: String,
}

pub async fn return_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<ReturnForm>,
) -> Result<Response, AppError> {
    let username = form.username.trim();
    if username.is_empty() {
        return Ok(views::return_form(Some("Username is required.")).into_response());
    }

    let Some(user) = database::get_user_by_username(&state.pool, username).await? else {
        return Ok(
            views::return_form(Some("No account found with that username.")).into_response(),
        );
    };

    database::ensure_run(&state.pool, user.id).await?;
    Ok(start_session(&state, user.id).await?)
}

pub async fn login_form(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if session::current_user(&state, &headers).await?.is_some() {
        return Ok(Redirect::to("/play").into_response());
    }
    Ok(views::login_form(None).into_response())
}

#[derive(Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    username: String,
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
    #[serde(default)]
    house: String,
}

pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let first_name = form.first_name.trim();
    let last_name = form.last_name.trim();
    let house = form.house.trim();
    let mut username = form.username.trim().to_string();

    if first_name.is_empty() || last_name.is_empty() {
        return Ok(views::login_form(Some("First and last name are required.")).into_response());
    }
    if !is_valid_house(house) {
        return Ok(views::login_form(Some("Please select a valid house.")).into_response());
    }

    if username.is_empty() {
        username = database::generate_unique_username(&state.pool, first_name, last_name).await?;
    }

    let user = match database::get_user_by_username(&state.pool, &username).await? {
        None => database::create_user(&state.pool, &username, first_name, last_name, house).await?,
        Some(existing) => {
            database::update_user(&state.pool, existing.id, first_name, last_name, house).await?
        }
    };

    database::ensure_run(&state.pool, user.id).await?;
    Ok(start_session(&state, user.id).await?)
}

async fn start_session(state: &AppState, user_id: i64) -> Result<Response, AppError> {
    let token = session::mint_token();
    database::create_session(&state.pool, user_id, &token).await?;
    Ok((
        AppendHeaders([(SET_COOKIE, session::set_cookie(session::USER_COOKIE, &token))]),
        Redirect::to("/play"),
    )
        .into_response())
}

pub async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = session::cookie_value(&headers, session::USER_COOKIE) {
        database::delete_session(&state.pool, &token).await?;
    }
    Ok((
        AppendHeaders([(SET_COOKIE, session::clear_cookie(session::USER_COOKIE))]),
        Redirect::to("/"),
    )
        .into_response())
}

pub async fn account(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let Some(user) = session::current_user(&state, &headers).await? else {
        return Ok(Redirect::to("/").into_response());
    };
    Ok(views::account_page(&user, None, None).into_response())
}

#[derive(Deserialize)]
pub struct AccountForm {
    #[serde(default)]
    first_name: String,
    #[serde(default)]
    last_name: String,
}

pub async fn account_update(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Form(form): Form<AccountForm>,
) -> Result<Response, AppError> {
    let Some(user) = session::current_user(&state, &headers).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    let first_name = form.first_name.trim();
    let last_name = form.last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Ok(views::account_page(
            &user,
            Some("Both first and last name are required."),
            None,
        )
        .into_response());
    }

    let updated = database::update_user_names(&state.pool, user.id, first_name, last_name).await?;
    Ok(views::account_page(&updated, None, Some("Account updated.")).into_response())
}
