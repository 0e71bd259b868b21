use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

pub const DEFAULT_MODEL_NAME: &str = "deepseek-v3";
pub const DEFAULT_PROMPT_VERSION: &str = "v2";

/// Upper bound applied to every listing limit.
pub const MAX_LIST_LIMIT: usize = 1000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GamePrediction {
    pub prediction_id: i64,
    pub game_date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub predicted_winner: String,
    pub home_team_win_percentage: f64,
    pub opposing_team_win_percentage: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerPrediction {
    pub prediction_id: i64,
    pub game_date: NaiveDate,
    pub player_name: String,
    pub team: String,
    pub opposing_team: String,
    pub prediction_type: String, // "points", "rebounds", "assists", ...
    pub predicted_value: f64,
    pub range_low: Option<f64>,
    pub range_high: Option<f64>,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    pub prop_line: Option<f64>,
    pub prop_pick: Option<String>, // "over" or "under"
    pub prop_reason: Option<String>,
    pub model_name: String,
    pub prompt_version: String,
    pub timestamp: DateTime<Utc>,
}

/// Game prediction as submitted by a producer. Every field may be absent
/// until validated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GamePredictionInput {
    pub game_date: Option<NaiveDate>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub predicted_winner: Option<String>,
    pub home_team_win_percentage: Option<f64>,
    pub opposing_team_win_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerPredictionInput {
    pub game_date: Option<NaiveDate>,
    pub player_name: Option<String>,
    pub team: Option<String>,
    pub opposing_team: Option<String>,
    pub prediction_type: Option<String>,
    pub predicted_value: Option<f64>,
    pub range_low: Option<f64>,
    pub range_high: Option<f64>,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    pub prop_line: Option<f64>,
    pub prop_pick: Option<String>,
    pub prop_reason: Option<String>,
    pub model_name: Option<String>,
    pub prompt_version: Option<String>,
}

/// A game prediction that passed validation and is ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct NewGamePrediction {
    pub game_date: NaiveDate,
    pub home_team: String,
    pub away_team: String,
    pub predicted_winner: String,
    pub home_team_win_percentage: f64,
    pub opposing_team_win_percentage: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewPlayerPrediction {
    pub game_date: NaiveDate,
    pub player_name: String,
    pub team: String,
    pub opposing_team: String,
    pub prediction_type: String,
    pub predicted_value: f64,
    pub range_low: Option<f64>,
    pub range_high: Option<f64>,
    pub confidence: Option<f64>,
    pub explanation: Option<String>,
    pub prop_line: Option<f64>,
    pub prop_pick: Option<String>,
    pub prop_reason: Option<String>,
    pub model_name: String,
    pub prompt_version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GamePredictionFilter {
    pub game_date: Option<NaiveDate>,
    /// Matches either the home or the away team.
    pub team: Option<String>,
    pub predicted_winner: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerPredictionFilter {
    pub game_date: Option<NaiveDate>,
    pub player_name: Option<String>,
    pub team: Option<String>,
    pub opposing_team: Option<String>,
    pub prediction_type: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOutcome {
    pub prediction_id: i64,
    pub actual_winner: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerOutcome {
    pub prediction_id: i64,
    pub actual_value: f64,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameOutcomeInput {
    pub actual_winner: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerOutcomeInput {
    pub actual_value: Option<f64>,
}

/// How a single player prediction fared against its outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerScore {
    pub prediction_id: i64,
    pub exact: bool,
    pub in_range: bool,
    /// `None` when the prediction carries no usable prop line and pick.
    pub over_under: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlayerEvaluationSummary {
    pub prediction_type: Option<String>,
    pub total_evaluated: usize,
    pub exact_correct: usize,
    pub range_correct: usize,
    pub over_under_correct: usize,
    pub over_under_evaluable: usize,
    pub exact_accuracy: f64,
    pub range_accuracy: f64,
    pub over_under_accuracy: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GameEvaluationSummary {
    pub total_evaluated: usize,
    pub correct: usize,
    pub accuracy: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionKind {
    Game,
    Player,
}

impl FromStr for PredictionKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "game" | "games" => Ok(Self::Game),
            "player" | "players" => Ok(Self::Player),
            other => Err(ValidationError::invalid(
                "kind",
                format!("unknown prediction kind '{}', use 'game' or 'player'", other),
            )),
        }
    }
}

impl fmt::Display for PredictionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Game => write!(f, "game"),
            Self::Player => write!(f, "player"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl FromStr for ExportFormat {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(ValidationError::invalid(
                "format",
                format!("unsupported format: {}", other),
            )),
        }
    }
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

// API Response types
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
            timestamp: Utc::now(),
        }
    }
}
