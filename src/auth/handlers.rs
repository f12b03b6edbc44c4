use axum::{
    extract::{
        rejection::{FormRejection, JsonRejection},
        State,
    },
    http::StatusCode,
    routing::post,
    Form, Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{LoginForm, RegisterRequest, TokenResponse, UserOut},
        services,
    },
    error::AppError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserOut>), AppError> {
    let Json(payload) = payload?;
    let user = services::register(&state.db, payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, form))]
pub async fn login(
    State(state): State<AppState>,
    form: Result<Form<LoginForm>, FormRejection>,
) -> Result<Json<TokenResponse>, AppError> {
    let Form(form) = form?;
    let token = services::login(&state.db, &state.tokens, form).await?;
    Ok(Json(token))
}
