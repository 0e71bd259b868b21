use crate::error::ValidationError;
use crate::models::{
    GamePredictionInput, NewGamePrediction, NewPlayerPrediction, PlayerPredictionInput,
    DEFAULT_MODEL_NAME, DEFAULT_PROMPT_VERSION,
};
use crate::utils::{is_probability, normalize_text};

fn required<T>(value: Option<T>, field: &'static str) -> Result<T, ValidationError> {
    value.ok_or(ValidationError::MissingField(field))
}

fn required_text(value: Option<String>, field: &'static str) -> Result<String, ValidationError> {
    required(normalize_text(value), field)
}

fn finite(value: f64, field: &'static str) -> Result<f64, ValidationError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ValidationError::invalid(field, "must be a finite number"))
    }
}

fn optional_finite(value: Option<f64>, field: &'static str) -> Result<Option<f64>, ValidationError> {
    value.map(|v| finite(v, field)).transpose()
}

fn probability(value: Option<f64>, field: &'static str) -> Result<f64, ValidationError> {
    let value = required(value, field)?;
    if is_probability(value) {
        Ok(value)
    } else {
        Err(ValidationError::invalid(field, format!("{} is not within [0, 1]", value)))
    }
}

pub fn validate_game_prediction(input: GamePredictionInput) -> Result<NewGamePrediction, ValidationError> {
    let game_date = required(input.game_date, "game_date")?;
    let home_team = required_text(input.home_team, "home_team")?;
    let away_team = required_text(input.away_team, "away_team")?;
    let predicted_winner = required_text(input.predicted_winner, "predicted_winner")?;
    let home_team_win_percentage = probability(input.home_team_win_percentage, "home_team_win_percentage")?;
    let opposing_team_win_percentage =
        probability(input.opposing_team_win_percentage, "opposing_team_win_percentage")?;

    if predicted_winner != home_team && predicted_winner != away_team {
        return Err(ValidationError::invalid(
            "predicted_winner",
            format!("'{}' is neither '{}' nor '{}'", predicted_winner, home_team, away_team),
        ));
    }

    Ok(NewGamePrediction {
        game_date,
        home_team,
        away_team,
        predicted_winner,
        home_team_win_percentage,
        opposing_team_win_percentage,
    })
}

pub fn validate_player_prediction(input: PlayerPredictionInput) -> Result<NewPlayerPrediction, ValidationError> {
    let game_date = required(input.game_date, "game_date")?;
    let player_name = required_text(input.player_name, "player_name")?;
    let team = required_text(input.team, "team")?;
    let opposing_team = required_text(input.opposing_team, "opposing_team")?;
    let prediction_type = required_text(input.prediction_type, "prediction_type")?;
    let predicted_value = finite(required(input.predicted_value, "predicted_value")?, "predicted_value")?;

    let range_low = optional_finite(input.range_low, "range_low")?;
    let range_high = optional_finite(input.range_high, "range_high")?;
    if let (Some(low), Some(high)) = (range_low, range_high) {
        if low > high {
            return Err(ValidationError::invalid(
                "range_low",
                format!("{} is greater than range_high {}", low, high),
            ));
        }
    }

    Ok(NewPlayerPrediction {
        game_date,
        player_name,
        team,
        opposing_team,
        prediction_type,
        predicted_value,
        range_low,
        range_high,
        confidence: optional_finite(input.confidence, "confidence")?,
        explanation: normalize_text(input.explanation),
        prop_line: optional_finite(input.prop_line, "prop_line")?,
        prop_pick: normalize_text(input.prop_pick),
        prop_reason: normalize_text(input.prop_reason),
        model_name: normalize_text(input.model_name).unwrap_or_else(|| DEFAULT_MODEL_NAME.to_string()),
        prompt_version: normalize_text(input.prompt_version)
            .unwrap_or_else(|| DEFAULT_PROMPT_VERSION.to_string()),
    })
}
