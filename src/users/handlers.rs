use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use super::dto::{LeaderboardEntry, LeaderboardQuery, MeResponse, PlantLimitQuote, RenameRequest};
use crate::{auth::AuthUser, state::AppState};

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn me_routes() -> Router<AppState> {
    Router::new()
        .route("/me", get(get_me).delete(delete_me))
        .route("/me/username", put(rename))
        .route("/me/weather", post(cycle_weather))
        .route("/me/plant-limit", get(plant_limit_quote).post(upgrade_plant_limit))
}

pub fn public_routes() -> Router<AppState> {
    Router::new().route("/leaderboard", get(leaderboard))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> ApiResult<Json<MeResponse>> {
    Ok(Json(state.engine.account(&email).await?.into()))
}

#[instrument(skip(state))]
pub async fn delete_me(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> ApiResult<StatusCode> {
    state.engine.delete_account(&email).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn rename(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Json(body): Json<RenameRequest>,
) -> ApiResult<Json<MeResponse>> {
    let user = state.engine.rename(&email, body.username.trim()).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn cycle_weather(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> ApiResult<Json<MeResponse>> {
    Ok(Json(state.engine.cycle_weather(&email).await?.into()))
}

#[instrument(skip(state))]
pub async fn plant_limit_quote(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> ApiResult<Json<PlantLimitQuote>> {
    let user = state.engine.account(&email).await?;
    Ok(Json(PlantLimitQuote {
        plant_limit: user.plant_limit,
        plant_count: user.plant_count,
        upgrades_bought: user.limit_upgrades(),
        next_price: user.next_limit_price(),
    }))
}

#[instrument(skip(state))]
pub async fn upgrade_plant_limit(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> ApiResult<Json<MeResponse>> {
    Ok(Json(state.engine.upgrade_plant_limit(&email).await?.into()))
}

#[instrument(skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(q): Query<LeaderboardQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    let users = state.engine.leaderboard(q.limit).await?;
    let entries = users
        .into_iter()
        .enumerate()
        .map(|(i, u)| LeaderboardEntry {
            rank: i + 1,
            username: u.username,
            money: u.money,
            plant_count: u.plant_count,
        })
        .collect();
    Ok(Json(entries))
}
