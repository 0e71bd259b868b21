use crate::db;
use crate::error::StoreResult;
use crate::models::{
    GameEvaluationSummary, GameOutcome, GamePrediction, PlayerEvaluationSummary, PlayerOutcome,
    PlayerPrediction, PlayerScore,
};
use crate::services::PredictionStore;
use crate::utils::{accuracy_percentage, over_under_hit, EXACT_TOLERANCE};

/// Scores stored predictions against their recorded outcomes.
pub struct Evaluator<'a> {
    store: &'a PredictionStore,
}

impl<'a> Evaluator<'a> {
    pub fn new(store: &'a PredictionStore) -> Self {
        Self { store }
    }

    pub async fn evaluate_player_predictions(&self, prediction_type: Option<&str>) -> StoreResult<PlayerEvaluationSummary> {
        let pairs = db::get_player_outcomes(self.store.pool(), prediction_type).await?;

        let scores: Vec<PlayerScore> = pairs
            .iter()
            .map(|(prediction, outcome)| score_player_prediction(prediction, outcome))
            .collect();

        let summary = summarize_player_scores(prediction_type, &scores);
        if summary.total_evaluated == 0 {
            tracing::info!("No player predictions have been evaluated yet.");
        } else {
            tracing::info!(
                "Player evaluation ({}): {} evaluated, exact {:.2}%, range {:.2}%, over/under {:.2}% ({}/{})",
                prediction_type.unwrap_or("all types"),
                summary.total_evaluated,
                summary.exact_accuracy,
                summary.range_accuracy,
                summary.over_under_accuracy,
                summary.over_under_correct,
                summary.over_under_evaluable
            );
        }
        Ok(summary)
    }

    pub async fn evaluate_game_predictions(&self) -> StoreResult<GameEvaluationSummary> {
        let pairs = db::get_game_outcomes(self.store.pool()).await?;

        let total_evaluated = pairs.len();
        let correct = pairs
            .iter()
            .filter(|(prediction, outcome)| game_prediction_correct(prediction, outcome))
            .count();

        let summary = GameEvaluationSummary {
            total_evaluated,
            correct,
            accuracy: accuracy_percentage(correct, total_evaluated),
        };
        tracing::info!(
            "Game evaluation: {}/{} winners called ({:.2}%)",
            summary.correct,
            summary.total_evaluated,
            summary.accuracy
        );
        Ok(summary)
    }
}

pub fn game_prediction_correct(prediction: &GamePrediction, outcome: &GameOutcome) -> bool {
    prediction.predicted_winner == outcome.actual_winner
}

pub fn score_player_prediction(prediction: &PlayerPrediction, outcome: &PlayerOutcome) -> PlayerScore {
    let actual = outcome.actual_value;

    let in_range = match (prediction.range_low, prediction.range_high) {
        (Some(low), Some(high)) => low <= actual && actual <= high,
        _ => false,
    };

    let over_under = match (prediction.prop_line, prediction.prop_pick.as_deref()) {
        (Some(line), Some(pick)) => {
            let hit = over_under_hit(pick, line, actual);
            if hit.is_none() {
                tracing::warn!(
                    "Unrecognized prop pick '{}' for prediction {}",
                    pick,
                    prediction.prediction_id
                );
            }
            hit
        }
        _ => None,
    };

    PlayerScore {
        prediction_id: prediction.prediction_id,
        exact: (actual - prediction.predicted_value).abs() < EXACT_TOLERANCE,
        in_range,
        over_under,
    }
}

pub fn summarize_player_scores(prediction_type: Option<&str>, scores: &[PlayerScore]) -> PlayerEvaluationSummary {
    let total_evaluated = scores.len();
    let exact_correct = scores.iter().filter(|s| s.exact).count();
    let range_correct = scores.iter().filter(|s| s.in_range).count();
    let over_under_evaluable = scores.iter().filter(|s| s.over_under.is_some()).count();
    let over_under_correct = scores.iter().filter(|s| s.over_under == Some(true)).count();

    PlayerEvaluationSummary {
        prediction_type: prediction_type.map(str::to_string),
        total_evaluated,
        exact_correct,
        range_correct,
        over_under_correct,
        over_under_evaluable,
        exact_accuracy: accuracy_percentage(exact_correct, total_evaluated),
        range_accuracy: accuracy_percentage(range_correct, total_evaluated),
        over_under_accuracy: accuracy_percentage(over_under_correct, over_under_evaluable),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GameOutcomeInput, GamePredictionInput, PlayerOutcomeInput, PlayerPredictionInput};
    use chrono::{NaiveDate, Utc};

    fn player_prediction(value: f64, range: Option<(f64, f64)>, prop: Option<(f64, &str)>) -> PlayerPrediction {
        PlayerPrediction {
            prediction_id: 1,
            game_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            player_name: "Anthony Davis".to_string(),
            team: "LAL".to_string(),
            opposing_team: "BOS".to_string(),
            prediction_type: "rebounds".to_string(),
            predicted_value: value,
            range_low: range.map(|r| r.0),
            range_high: range.map(|r| r.1),
            confidence: None,
            explanation: None,
            prop_line: prop.map(|p| p.0),
            prop_pick: prop.map(|p| p.1.to_string()),
            prop_reason: None,
            model_name: "deepseek-v3".to_string(),
            prompt_version: "v2".to_string(),
            timestamp: Utc::now(),
        }
    }

    fn outcome(actual: f64) -> PlayerOutcome {
        PlayerOutcome {
            prediction_id: 1,
            actual_value: actual,
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_score_exact_and_range() {
        let score = score_player_prediction(&player_prediction(12.0, Some((10.0, 14.0)), None), &outcome(12.0));
        assert!(score.exact);
        assert!(score.in_range);
        assert_eq!(score.over_under, None);
    }

    #[test]
    fn test_score_missing_range_is_not_in_range() {
        let score = score_player_prediction(&player_prediction(12.0, None, None), &outcome(13.0));
        assert!(!score.exact);
        assert!(!score.in_range);
    }

    #[test]
    fn test_score_over_under() {
        let over = score_player_prediction(&player_prediction(12.0, None, Some((10.5, "Over"))), &outcome(11.0));
        assert_eq!(over.over_under, Some(true));

        let under = score_player_prediction(&player_prediction(12.0, None, Some((10.5, "under"))), &outcome(11.0));
        assert_eq!(under.over_under, Some(false));

        let unknown = score_player_prediction(&player_prediction(12.0, None, Some((10.5, "lean"))), &outcome(11.0));
        assert_eq!(unknown.over_under, None);
    }

    #[test]
    fn test_summarize_player_scores() {
        let scores = vec![
            PlayerScore { prediction_id: 1, exact: true, in_range: true, over_under: Some(true) },
            PlayerScore { prediction_id: 2, exact: false, in_range: true, over_under: Some(false) },
            PlayerScore { prediction_id: 3, exact: false, in_range: false, over_under: None },
            PlayerScore { prediction_id: 4, exact: false, in_range: true, over_under: None },
        ];
        let summary = summarize_player_scores(Some("points"), &scores);
        assert_eq!(summary.total_evaluated, 4);
        assert_eq!(summary.exact_accuracy, 25.0);
        assert_eq!(summary.range_accuracy, 75.0);
        assert_eq!(summary.over_under_evaluable, 2);
        assert_eq!(summary.over_under_accuracy, 50.0);
    }

    #[test]
    fn test_summarize_nothing_evaluated() {
        let summary = summarize_player_scores(None, &[]);
        assert_eq!(summary.total_evaluated, 0);
        assert_eq!(summary.exact_accuracy, 0.0);
        assert_eq!(summary.over_under_accuracy, 0.0);
    }

    #[tokio::test]
    async fn test_evaluate_against_recorded_outcomes() {
        let pool = db::create_memory_pool().await.unwrap();
        db::init_database_with_pool(&pool).await.unwrap();
        let store = PredictionStore::new(pool);

        let game = store
            .record_game_prediction(GamePredictionInput {
                game_date: NaiveDate::from_ymd_opt(2024, 1, 10),
                home_team: Some("LAL".to_string()),
                away_team: Some("BOS".to_string()),
                predicted_winner: Some("BOS".to_string()),
                home_team_win_percentage: Some(0.42),
                opposing_team_win_percentage: Some(0.58),
            })
            .await
            .unwrap();
        store
            .record_game_outcome(game.prediction_id, GameOutcomeInput { actual_winner: Some("BOS".to_string()) })
            .await
            .unwrap();

        let points = store
            .record_player_prediction(PlayerPredictionInput {
                game_date: NaiveDate::from_ymd_opt(2024, 1, 10),
                player_name: Some("Jayson Tatum".to_string()),
                team: Some("BOS".to_string()),
                opposing_team: Some("LAL".to_string()),
                prediction_type: Some("points".to_string()),
                predicted_value: Some(28.0),
                range_low: Some(24.0),
                range_high: Some(32.0),
                prop_line: Some(26.5),
                prop_pick: Some("over".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        store
            .record_player_outcome(points.prediction_id, PlayerOutcomeInput { actual_value: Some(30.0) })
            .await
            .unwrap();

        // No outcome yet: excluded from evaluation
        store
            .record_player_prediction(PlayerPredictionInput {
                game_date: NaiveDate::from_ymd_opt(2024, 1, 10),
                player_name: Some("Jaylen Brown".to_string()),
                team: Some("BOS".to_string()),
                opposing_team: Some("LAL".to_string()),
                prediction_type: Some("points".to_string()),
                predicted_value: Some(22.0),
                ..Default::default()
            })
            .await
            .unwrap();

        let evaluator = Evaluator::new(&store);

        let games = evaluator.evaluate_game_predictions().await.unwrap();
        assert_eq!(games.total_evaluated, 1);
        assert_eq!(games.accuracy, 100.0);

        let players = evaluator.evaluate_player_predictions(Some("points")).await.unwrap();
        assert_eq!(players.total_evaluated, 1);
        assert_eq!(players.exact_correct, 0);
        assert_eq!(players.range_correct, 1);
        assert_eq!(players.over_under_correct, 1);

        let rebounds = evaluator.evaluate_player_predictions(Some("rebounds")).await.unwrap();
        assert_eq!(rebounds.total_evaluated, 0);
    }
}
