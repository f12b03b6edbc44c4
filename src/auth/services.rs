use anyhow::Context;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::{Map, Value};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::{
    auth::{
        dto::{LoginForm, RegisterRequest, TokenResponse, UserOut, DEFAULT_ROLE},
        jwt::TokenService,
        password::{hash_password, verify_password},
        repo_types::User,
    },
    error::AppError,
};

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    // Verified against when the email is unknown, so both login failures cost the same.
    static ref DUMMY_HASH: String = hash_password("inventory-timing-pad").unwrap_or_default();
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}

pub async fn register(db: &SqlitePool, req: RegisterRequest) -> Result<UserOut, AppError> {
    let email = normalize_email(&req.email);

    if !is_valid_email(&email) {
        warn!(email = %email, "invalid email");
        return Err(AppError::Validation("invalid email".into()));
    }

    if req.password.is_empty() {
        warn!(email = %email, "empty password");
        return Err(AppError::Validation("password must not be empty".into()));
    }

    let role = match req.role.as_deref().map(str::trim) {
        Some(r) if !r.is_empty() => r.to_string(),
        _ => DEFAULT_ROLE.to_string(),
    };

    if User::find_by_email(db, &email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::EmailTaken);
    }

    let password = req.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task")??;

    let user = match User::create(db, &email, &hash, &role).await {
        Ok(u) => u,
        // Lost a race with a concurrent registration of the same email.
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            warn!(email = %email, "email already registered");
            return Err(AppError::EmailTaken);
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = user.id, email = %user.email, role = %user.role, "user registered");
    Ok(user.into())
}

pub async fn login(
    db: &SqlitePool,
    tokens: &TokenService,
    form: LoginForm,
) -> Result<TokenResponse, AppError> {
    let email = normalize_email(&form.username);
    if email.is_empty() || form.password.is_empty() {
        warn!("login with empty credentials");
        return Err(AppError::InvalidCredentials);
    }

    let user = User::find_by_email(db, &email).await?;

    let stored = user.as_ref().map(|u| u.hashed_password.clone());
    let password = form.password;
    let ok = tokio::task::spawn_blocking(move || {
        let hash = stored.as_deref().unwrap_or(DUMMY_HASH.as_str());
        verify_password(&password, hash)
    })
    .await
    .context("password verification task")?;

    let user = match user {
        Some(u) if ok => u,
        Some(u) => {
            warn!(email = %email, user_id = u.id, "login invalid password");
            return Err(AppError::InvalidCredentials);
        }
        None => {
            warn!(email = %email, "login unknown email");
            return Err(AppError::InvalidCredentials);
        }
    };

    let mut extra = Map::new();
    extra.insert("role".into(), Value::String(user.role.clone()));
    let access_token = tokens
        .issue(&user.email, extra, None)
        .map_err(|e| AppError::Internal(e.into()))?;

    info!(user_id = user.id, email = %user.email, "user logged in");
    Ok(TokenResponse {
        access_token,
        token_type: "bearer".into(),
    })
}
