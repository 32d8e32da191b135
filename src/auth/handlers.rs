use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    jwt::JwtKeys,
    password::{hash_password, is_valid_email, normalize_email, verify_password, MIN_PASSWORD_LEN},
};
use crate::{
    garden::{NewAccount, User},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
}

fn issue_tokens(state: &AppState, user: User) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(state);
    let pair = keys
        .sign_access(&user.email)
        .and_then(|access| Ok((access, keys.sign_refresh(&user.email)?)));
    match pair {
        Ok((access_token, refresh_token)) => Ok(Json(AuthResponse {
            access_token,
            refresh_token,
            user,
        })),
        Err(e) => {
            error!(error = %e, "jwt sign failed");
            Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err((StatusCode::BAD_REQUEST, "Password too short".into()));
    }

    let password_hash = hash_password(&payload.password).map_err(|e| {
        error!(error = %e, "hash_password failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let user = state
        .engine
        .open_account(NewAccount {
            email,
            username: payload.username.trim().to_string(),
            password_hash,
        })
        .await
        .map_err(|e| {
            warn!(error = %e, "registration rejected");
            e
        })?;

    info!(email = %user.email, username = %user.username, "user registered");
    issue_tokens(&state, user)
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let email = normalize_email(&payload.email);

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let user = match state.engine.find_account(&email).await? {
        Some(u) => u,
        None => {
            warn!(%email, "login unknown email");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
    };

    let ok = verify_password(&payload.password, &user.password_hash).map_err(|e| {
        error!(error = %e, "verify_password failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    if !ok {
        warn!(%email, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    info!(%email, "user logged in");
    issue_tokens(&state, user)
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| (StatusCode::UNAUTHORIZED, e.to_string()))?;

    let user = state
        .engine
        .find_account(&claims.sub)
        .await?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    issue_tokens(&state, user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register_body(email: &str, username: &str, password: &str) -> Json<RegisterRequest> {
        Json(RegisterRequest {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        })
    }

    #[tokio::test]
    async fn register_then_login() {
        let state = AppState::fake();
        let Json(registered) = register(
            State(state.clone()),
            register_body(" Sage@Example.com ", "sage", "long-enough-pw"),
        )
        .await
        .unwrap();
        assert_eq!(registered.user.email, "sage@example.com");
        assert_eq!(registered.user.money, 250);

        let Json(logged_in) = login(
            State(state.clone()),
            Json(LoginRequest {
                email: "sage@example.com".into(),
                password: "long-enough-pw".into(),
            }),
        )
        .await
        .unwrap();
        let claims = JwtKeys::from_ref(&state).verify(&logged_in.access_token).unwrap();
        assert_eq!(claims.sub, "sage@example.com");
    }

    #[tokio::test]
    async fn register_rejects_bad_input_and_duplicates() {
        let state = AppState::fake();
        let (status, _) = register(State(state.clone()), register_body("nope", "sage", "long-enough-pw"))
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = register(State(state.clone()), register_body("a@b.io", "sage", "short"))
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::BAD_REQUEST);

        register(State(state.clone()), register_body("a@b.io", "sage", "long-enough-pw"))
            .await
            .unwrap();
        let (status, _) = register(State(state.clone()), register_body("a@b.io", "other", "long-enough-pw"))
            .await
            .err()
            .unwrap();
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let state = AppState::fake();
        register(State(state.clone()), register_body("a@b.io", "sage", "long-enough-pw"))
            .await
            .unwrap();
        let (status, msg) = login(
            State(state),
            Json(LoginRequest {
                email: "a@b.io".into(),
                password: "not-the-password".into(),
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(msg, "Invalid credentials");
    }

    #[tokio::test]
    async fn refresh_issues_a_new_pair() {
        let state = AppState::fake();
        let Json(registered) = register(State(state.clone()), register_body("a@b.io", "sage", "long-enough-pw"))
            .await
            .unwrap();
        let Json(refreshed) = refresh(
            State(state.clone()),
            Json(RefreshRequest {
                refresh_token: registered.refresh_token,
            }),
        )
        .await
        .unwrap();
        assert_eq!(refreshed.user.email, "a@b.io");

        let (status, _) = refresh(
            State(state),
            Json(RefreshRequest {
                refresh_token: refreshed.access_token,
            }),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
