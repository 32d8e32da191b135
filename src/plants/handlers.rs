use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{BuyPlantRequest, GrowRequest, MoveRequest};
use crate::{
    auth::AuthUser,
    garden::{Plant, PlantReceipt, SaleReceipt},
    state::AppState,
};

type ApiResult<T> = Result<T, (StatusCode, String)>;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/plants", get(list_plants))
        .route("/plants/:id", get(get_plant))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/plants", post(buy_plant))
        .route("/plants/grow", post(grow_all))
        .route("/plants/:id/water", post(water_plant))
        .route("/plants/:id/fertilize", post(fertilize_plant))
        .route("/plants/:id/grow", post(grow_plant))
        .route("/plants/:id/position", put(move_plant))
        .route("/plants/:id/sell", post(sell_plant))
}

#[instrument(skip(state))]
pub async fn list_plants(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
) -> ApiResult<Json<Vec<Plant>>> {
    Ok(Json(state.engine.plants(&email).await?))
}

#[instrument(skip(state))]
pub async fn get_plant(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Plant>> {
    Ok(Json(state.engine.plant(&email, id).await?))
}

/// POST /plants: 201 with a Location pointing at the new plant.
#[instrument(skip(state))]
pub async fn buy_plant(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Json(body): Json<BuyPlantRequest>,
) -> ApiResult<(StatusCode, HeaderMap, Json<PlantReceipt>)> {
    let receipt = state
        .engine
        .purchase(&email, body.plant_type, body.x, body.y)
        .await?;

    let mut headers = HeaderMap::new();
    let location = HeaderValue::try_from(format!("/api/v1/plants/{}", receipt.plant.plant_id))
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    headers.insert(header::LOCATION, location);

    Ok((StatusCode::CREATED, headers, Json(receipt)))
}

#[instrument(skip(state))]
pub async fn water_plant(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PlantReceipt>> {
    Ok(Json(state.engine.water(&email, id).await?))
}

#[instrument(skip(state))]
pub async fn fertilize_plant(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<PlantReceipt>> {
    Ok(Json(state.engine.fertilize(&email, id).await?))
}

#[instrument(skip(state))]
pub async fn grow_plant(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<GrowRequest>,
) -> ApiResult<Json<Plant>> {
    Ok(Json(state.engine.grow(&email, id, body.elapsed_minutes).await?))
}

#[instrument(skip(state))]
pub async fn grow_all(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Json(body): Json<GrowRequest>,
) -> ApiResult<Json<Vec<Plant>>> {
    Ok(Json(state.engine.grow_all(&email, body.elapsed_minutes).await?))
}

#[instrument(skip(state))]
pub async fn move_plant(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<Uuid>,
    Json(body): Json<MoveRequest>,
) -> ApiResult<Json<Plant>> {
    Ok(Json(state.engine.move_plant(&email, id, body.x, body.y).await?))
}

#[instrument(skip(state))]
pub async fn sell_plant(
    State(state): State<AppState>,
    AuthUser(email): AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SaleReceipt>> {
    Ok(Json(state.engine.sell(&email, id).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::garden::{NewAccount, PlantType, Stage};

    async fn state_with_player() -> AppState {
        let state = AppState::fake();
        state
            .engine
            .open_account(NewAccount {
                email: "reed@example.com".into(),
                username: "reed".into(),
                password_hash: "hash".into(),
            })
            .await
            .unwrap();
        state
    }

    fn player() -> AuthUser {
        AuthUser("reed@example.com".into())
    }

    #[tokio::test]
    async fn buy_returns_created_with_location() {
        let state = state_with_player().await;
        let (status, headers, Json(receipt)) = buy_plant(
            State(state.clone()),
            player(),
            Json(BuyPlantRequest {
                plant_type: PlantType::Rose,
                x: 4,
                y: 5,
            }),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            headers.get(header::LOCATION).unwrap(),
            format!("/api/v1/plants/{}", receipt.plant.plant_id).as_str()
        );
        assert_eq!(receipt.user.money, 150);

        let Json(plants) = list_plants(State(state), player()).await.unwrap();
        assert_eq!(plants.len(), 1);
        assert_eq!(plants[0].stage, Stage::Seed);
    }

    #[tokio::test]
    async fn domain_errors_become_statuses() {
        let state = state_with_player().await;
        let (status, _) = get_plant(State(state.clone()), player(), Path(Uuid::new_v4()))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, _, Json(receipt)) = buy_plant(
            State(state.clone()),
            player(),
            Json(BuyPlantRequest {
                plant_type: PlantType::Berry,
                x: 0,
                y: 0,
            }),
        )
        .await
        .unwrap();
        let (status, msg) = sell_plant(State(state.clone()), player(), Path(receipt.plant.plant_id))
            .await
            .unwrap_err();
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(msg.contains("sell"));

        let (status, _) = grow_plant(
            State(state),
            player(),
            Path(receipt.plant.plant_id),
            Json(GrowRequest { elapsed_minutes: -3 }),
        )
        .await
        .unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn buy_request_defaults_position() {
        let body: BuyPlantRequest = serde_json::from_str(r#"{"plant_type":"fungi"}"#).unwrap();
        assert_eq!(body.plant_type, PlantType::Fungi);
        assert_eq!((body.x, body.y), (0, 0));
        assert!(serde_json::from_str::<BuyPlantRequest>(r#"{"plant_type":"cactus"}"#).is_err());
    }
}
