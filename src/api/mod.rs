use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::StoreError;
use crate::models::*;
use crate::services::{Evaluator, PredictionStore};

pub async fn serve(store: PredictionStore, port: u16) -> anyhow::Result<()> {
    let app = create_router(store);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Pluto prediction API listening on port {}", port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Pluto prediction API stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}

pub fn create_router(store: PredictionStore) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route(
            "/predictions/games",
            get(list_game_predictions_handler).post(record_game_prediction_handler),
        )
        .route("/predictions/games/{id}", get(get_game_prediction_handler))
        .route(
            "/predictions/games/{id}/outcome",
            post(record_game_outcome_handler),
        )
        .route(
            "/predictions/players",
            get(list_player_predictions_handler).post(record_player_prediction_handler),
        )
        .route("/predictions/players/latest", get(latest_player_prediction_handler))
        .route("/predictions/players/{id}", get(get_player_prediction_handler))
        .route(
            "/predictions/players/{id}/outcome",
            post(record_player_outcome_handler),
        )
        .route("/evaluation/games", get(evaluate_games_handler))
        .route("/evaluation/players", get(evaluate_players_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(store)
}

/// Error body returned by every handler, wrapped in the usual `ApiResponse` envelope.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn bad_request(message: String) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message,
        }
    }

    fn not_found(message: String) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        let status = match &err {
            StoreError::Validation(_) => StatusCode::BAD_REQUEST,
            StoreError::NotFound { .. } => StatusCode::NOT_FOUND,
            StoreError::Conflict { .. } => StatusCode::CONFLICT,
            StoreError::Storage(_) | StoreError::Corrupt(_) => {
                tracing::error!("Prediction store failure: {}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        Self {
            status,
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::<()>::error(self.message))).into_response()
    }
}

type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;
type Created<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

// Health check endpoint
async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("Pluto prediction API is running"))
}

// POST /predictions/games - Record a game prediction
async fn record_game_prediction_handler(
    State(store): State<PredictionStore>,
    payload: Result<Json<GamePredictionInput>, JsonRejection>,
) -> Created<GamePrediction> {
    let Json(input) = payload?;
    let prediction = store.record_game_prediction(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(prediction))))
}

// GET /predictions/games - List game predictions, oldest first
async fn list_game_predictions_handler(
    State(store): State<PredictionStore>,
    filter: Result<Query<GamePredictionFilter>, QueryRejection>,
) -> ApiResult<Vec<GamePrediction>> {
    let Query(filter) = filter?;
    let predictions = store.list_game_predictions(&filter).await?;
    Ok(Json(ApiResponse::success(predictions)))
}

// GET /predictions/games/{id}
async fn get_game_prediction_handler(
    State(store): State<PredictionStore>,
    Path(prediction_id): Path<i64>,
) -> ApiResult<GamePrediction> {
    match store.game_prediction(prediction_id).await? {
        Some(prediction) => Ok(Json(ApiResponse::success(prediction))),
        None => Err(ApiError::not_found(format!("game prediction {} not found", prediction_id))),
    }
}

// POST /predictions/games/{id}/outcome
async fn record_game_outcome_handler(
    State(store): State<PredictionStore>,
    Path(prediction_id): Path<i64>,
    payload: Result<Json<GameOutcomeInput>, JsonRejection>,
) -> Created<GameOutcome> {
    let Json(input) = payload?;
    let outcome = store.record_game_outcome(prediction_id, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(outcome))))
}

// POST /predictions/players - Record a player prediction
async fn record_player_prediction_handler(
    State(store): State<PredictionStore>,
    payload: Result<Json<PlayerPredictionInput>, JsonRejection>,
) -> Created<PlayerPrediction> {
    let Json(input) = payload?;
    let prediction = store.record_player_prediction(input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(prediction))))
}

// GET /predictions/players - List player predictions, oldest first
async fn list_player_predictions_handler(
    State(store): State<PredictionStore>,
    filter: Result<Query<PlayerPredictionFilter>, QueryRejection>,
) -> ApiResult<Vec<PlayerPrediction>> {
    let Query(filter) = filter?;
    let predictions = store.list_player_predictions(&filter).await?;
    Ok(Json(ApiResponse::success(predictions)))
}

#[derive(Deserialize)]
struct LatestPlayerPredictionQuery {
    player_name: String,
    prediction_type: Option<String>,
    opposing_team: Option<String>,
    game_date: Option<NaiveDate>,
}

// GET /predictions/players/latest - Most recent prediction for a player
async fn latest_player_prediction_handler(
    State(store): State<PredictionStore>,
    params: Result<Query<LatestPlayerPredictionQuery>, QueryRejection>,
) -> ApiResult<PlayerPrediction> {
    let Query(params) = params?;
    let prediction_type = params.prediction_type.as_deref().unwrap_or("points");

    let latest = store
        .latest_player_prediction(
            &params.player_name,
            prediction_type,
            params.opposing_team.as_deref(),
            params.game_date,
        )
        .await?;

    match latest {
        Some(prediction) => Ok(Json(ApiResponse::success(prediction))),
        None => {
            tracing::warn!(
                "No prediction found for player {} with type {}",
                params.player_name,
                prediction_type
            );
            Err(ApiError::not_found(format!(
                "no {} prediction found for {}",
                prediction_type, params.player_name
            )))
        }
    }
}

// GET /predictions/players/{id}
async fn get_player_prediction_handler(
    State(store): State<PredictionStore>,
    Path(prediction_id): Path<i64>,
) -> ApiResult<PlayerPrediction> {
    match store.player_prediction(prediction_id).await? {
        Some(prediction) => Ok(Json(ApiResponse::success(prediction))),
        None => Err(ApiError::not_found(format!("player prediction {} not found", prediction_id))),
    }
}

// POST /predictions/players/{id}/outcome
async fn record_player_outcome_handler(
    State(store): State<PredictionStore>,
    Path(prediction_id): Path<i64>,
    payload: Result<Json<PlayerOutcomeInput>, JsonRejection>,
) -> Created<PlayerOutcome> {
    let Json(input) = payload?;
    let outcome = store.record_player_outcome(prediction_id, input).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(outcome))))
}

// GET /evaluation/games
async fn evaluate_games_handler(State(store): State<PredictionStore>) -> ApiResult<GameEvaluationSummary> {
    let summary = Evaluator::new(&store).evaluate_game_predictions().await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[derive(Deserialize)]
struct EvaluationQuery {
    prediction_type: Option<String>,
}

// GET /evaluation/players
async fn evaluate_players_handler(
    State(store): State<PredictionStore>,
    params: Result<Query<EvaluationQuery>, QueryRejection>,
) -> ApiResult<PlayerEvaluationSummary> {
    let Query(params) = params?;
    let summary = Evaluator::new(&store)
        .evaluate_player_predictions(params.prediction_type.as_deref())
        .await?;
    Ok(Json(ApiResponse::success(summary)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    async fn test_router() -> Router {
        let pool = db::create_memory_pool().await.unwrap();
        db::init_database_with_pool(&pool).await.unwrap();
        create_router(PredictionStore::new(pool))
    }

    async fn send(router: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn lal_bos() -> Value {
        json!({
            "game_date": "2024-01-10",
            "home_team": "LAL",
            "away_team": "BOS",
            "predicted_winner": "BOS",
            "home_team_win_percentage": 0.42,
            "opposing_team_win_percentage": 0.58
        })
    }

    #[tokio::test]
    async fn test_health() {
        let router = test_router().await;
        let (status, body) = send(&router, Method::GET, "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }

    #[tokio::test]
    async fn test_record_and_list_game_prediction() {
        let router = test_router().await;

        let (status, created) = send(&router, Method::POST, "/predictions/games", Some(lal_bos())).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["data"]["prediction_id"].as_i64().unwrap();

        let (status, listed) = send(&router, Method::GET, "/predictions/games", None).await;
        assert_eq!(status, StatusCode::OK);
        let rows = listed["data"].as_array().unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["prediction_id"], id);
        assert_eq!(rows[0]["predicted_winner"], "BOS");
        assert_eq!(rows[0]["game_date"], "2024-01-10");

        let (status, fetched) = send(&router, Method::GET, &format!("/predictions/games/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["data"]["home_team"], "LAL");
    }

    #[tokio::test]
    async fn test_missing_field_is_bad_request() {
        let router = test_router().await;
        let mut body = lal_bos();
        body.as_object_mut().unwrap().remove("predicted_winner");

        let (status, response) = send(&router, Method::POST, "/predictions/games", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response["success"], false);
        assert!(response["error"].as_str().unwrap().contains("predicted_winner"));

        let (_, listed) = send(&router, Method::GET, "/predictions/games", None).await;
        assert!(listed["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_type_is_bad_request() {
        let router = test_router().await;
        let mut body = lal_bos();
        body["home_team_win_percentage"] = json!("high");

        let (status, _) = send(&router, Method::POST, "/predictions/games", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_player_prediction_latest_and_outcome() {
        let router = test_router().await;
        let body = json!({
            "game_date": "2024-01-10",
            "player_name": "Jayson Tatum",
            "team": "BOS",
            "opposing_team": "LAL",
            "prediction_type": "points",
            "predicted_value": 28.5
        });

        let (status, created) = send(&router, Method::POST, "/predictions/players", Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(created["data"]["range_low"].is_null());
        assert!(created["data"]["explanation"].is_null());
        let id = created["data"]["prediction_id"].as_i64().unwrap();

        let (status, latest) = send(
            &router,
            Method::GET,
            "/predictions/players/latest?player_name=Jayson%20Tatum&prediction_type=points",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(latest["data"]["prediction_id"], id);

        let outcome_uri = format!("/predictions/players/{}/outcome", id);
        let (status, _) = send(&router, Method::POST, &outcome_uri, Some(json!({"actual_value": 30.0}))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, _) = send(&router, Method::POST, &outcome_uri, Some(json!({"actual_value": 31.0}))).await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, summary) = send(&router, Method::GET, "/evaluation/players?prediction_type=points", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(summary["data"]["total_evaluated"], 1);
    }

    #[tokio::test]
    async fn test_unknown_prediction_is_not_found() {
        let router = test_router().await;
        let (status, _) = send(&router, Method::GET, "/predictions/players/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(
            &router,
            Method::POST,
            "/predictions/games/42/outcome",
            Some(json!({"actual_winner": "BOS"})),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
