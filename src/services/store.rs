use chrono::Utc;
use sqlx::SqlitePool;

use crate::db;
use crate::error::{StoreError, StoreResult, ValidationError};
use crate::models::*;
use crate::services::validation::{validate_game_prediction, validate_player_prediction};
use crate::utils::normalize_text;

/// Append-only store for game and player predictions and their outcomes.
///
/// Rows are validated before anything touches the database, so a rejected
/// record never leaves a partial write behind. There is no update path:
/// predictions are immutable and outcomes go to their own tables.
#[derive(Clone)]
pub struct PredictionStore {
    pool: SqlitePool,
}

impl PredictionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn record_game_prediction(&self, input: GamePredictionInput) -> StoreResult<GamePrediction> {
        let prediction = validate_game_prediction(input)?;
        let timestamp = Utc::now();
        let prediction_id = db::insert_game_prediction(&self.pool, &prediction, timestamp).await?;

        tracing::info!(
            "Recorded game prediction {}: {} vs {} on {}, winner {} ({} / {})",
            prediction_id,
            prediction.home_team,
            prediction.away_team,
            prediction.game_date,
            prediction.predicted_winner,
            prediction.home_team_win_percentage,
            prediction.opposing_team_win_percentage
        );

        Ok(GamePrediction {
            prediction_id,
            game_date: prediction.game_date,
            home_team: prediction.home_team,
            away_team: prediction.away_team,
            predicted_winner: prediction.predicted_winner,
            home_team_win_percentage: prediction.home_team_win_percentage,
            opposing_team_win_percentage: prediction.opposing_team_win_percentage,
            timestamp,
        })
    }

    pub async fn record_player_prediction(&self, input: PlayerPredictionInput) -> StoreResult<PlayerPrediction> {
        let prediction = validate_player_prediction(input)?;
        let timestamp = Utc::now();
        let prediction_id = db::insert_player_prediction(&self.pool, &prediction, timestamp).await?;

        tracing::info!(
            "Recorded player prediction {}: {} {} {} vs {} on {}",
            prediction_id,
            prediction.player_name,
            prediction.predicted_value,
            prediction.prediction_type,
            prediction.opposing_team,
            prediction.game_date
        );

        Ok(PlayerPrediction {
            prediction_id,
            game_date: prediction.game_date,
            player_name: prediction.player_name,
            team: prediction.team,
            opposing_team: prediction.opposing_team,
            prediction_type: prediction.prediction_type,
            predicted_value: prediction.predicted_value,
            range_low: prediction.range_low,
            range_high: prediction.range_high,
            confidence: prediction.confidence,
            explanation: prediction.explanation,
            prop_line: prediction.prop_line,
            prop_pick: prediction.prop_pick,
            prop_reason: prediction.prop_reason,
            model_name: prediction.model_name,
            prompt_version: prediction.prompt_version,
            timestamp,
        })
    }

    /// Game predictions matching `filter`, oldest first.
    pub async fn list_game_predictions(&self, filter: &GamePredictionFilter) -> StoreResult<Vec<GamePrediction>> {
        db::list_game_predictions(&self.pool, filter).await
    }

    /// Player predictions matching `filter`, oldest first.
    pub async fn list_player_predictions(&self, filter: &PlayerPredictionFilter) -> StoreResult<Vec<PlayerPrediction>> {
        db::list_player_predictions(&self.pool, filter).await
    }

    pub async fn game_prediction(&self, prediction_id: i64) -> StoreResult<Option<GamePrediction>> {
        db::get_game_prediction(&self.pool, prediction_id).await
    }

    pub async fn player_prediction(&self, prediction_id: i64) -> StoreResult<Option<PlayerPrediction>> {
        db::get_player_prediction(&self.pool, prediction_id).await
    }

    /// Most recent prediction of `prediction_type` for a player, optionally
    /// narrowed to an opponent and a game date.
    pub async fn latest_player_prediction(
        &self,
        player_name: &str,
        prediction_type: &str,
        opposing_team: Option<&str>,
        game_date: Option<chrono::NaiveDate>,
    ) -> StoreResult<Option<PlayerPrediction>> {
        let filter = PlayerPredictionFilter {
            player_name: Some(player_name.to_string()),
            prediction_type: Some(prediction_type.to_string()),
            opposing_team: opposing_team.map(str::to_string),
            game_date,
            ..Default::default()
        };
        db::get_latest_player_prediction(&self.pool, &filter).await
    }

    pub async fn record_game_outcome(&self, prediction_id: i64, input: GameOutcomeInput) -> StoreResult<GameOutcome> {
        let actual_winner = normalize_text(input.actual_winner)
            .ok_or(ValidationError::MissingField("actual_winner"))?;

        if self.game_prediction(prediction_id).await?.is_none() {
            return Err(StoreError::NotFound { kind: "game", id: prediction_id });
        }

        let outcome = GameOutcome {
            prediction_id,
            actual_winner,
            recorded_at: Utc::now(),
        };
        db::insert_game_outcome(&self.pool, &outcome).await?;

        tracing::info!("Recorded outcome for game prediction {}: {} won", prediction_id, outcome.actual_winner);
        Ok(outcome)
    }

    pub async fn record_player_outcome(&self, prediction_id: i64, input: PlayerOutcomeInput) -> StoreResult<PlayerOutcome> {
        let actual_value = input
            .actual_value
            .ok_or(ValidationError::MissingField("actual_value"))?;
        if !actual_value.is_finite() {
            return Err(ValidationError::invalid("actual_value", "must be a finite number").into());
        }

        if self.player_prediction(prediction_id).await?.is_none() {
            return Err(StoreError::NotFound { kind: "player", id: prediction_id });
        }

        let outcome = PlayerOutcome {
            prediction_id,
            actual_value,
            recorded_at: Utc::now(),
        };
        db::insert_player_outcome(&self.pool, &outcome).await?;

        tracing::info!("Recorded outcome for player prediction {}: {}", prediction_id, actual_value);
        Ok(outcome)
    }
}
