use anyhow::Result;
use chrono::NaiveDate;

use crate::models::{
    GameOutcomeInput, GamePredictionInput, PlayerOutcomeInput, PlayerPredictionInput,
};
use crate::services::PredictionStore;

/// Home/away win probabilities from team ratings, home side gets +100.
fn nba_probs(home_rating: f64, away_rating: f64) -> (f64, f64) {
    let adjusted = home_rating + 100.0;
    let home = 1.0 / (1.0 + 10f64.powf((away_rating - adjusted) / 400.0));
    (home, 1.0 - home)
}

/// Fill an empty store with a small slate of NBA predictions and outcomes
/// for demos. Skips when any game prediction already exists.
pub async fn seed_data(store: &PredictionStore) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM game_predictions")
        .fetch_one(store.pool())
        .await?;

    if count > 0 {
        tracing::info!("Database already seeded ({} game predictions found), skipping.", count);
        return Ok(());
    }

    tracing::info!("Seeding database with sample NBA predictions...");

    let games = seed_games(store).await?;
    let players = seed_players(store).await?;

    tracing::info!("Database seeded: {} game predictions, {} player predictions", games, players);
    Ok(())
}

// (date, home, away, home rating, away rating, actual winner)
type GameRow = (&'static str, &'static str, &'static str, f64, f64, Option<&'static str>);

// (date, player, team, opponent, type, value, range, confidence, prop line + pick, actual)
type PlayerRow = (
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    &'static str,
    f64,
    Option<(f64, f64)>,
    Option<f64>,
    Option<(f64, &'static str)>,
    Option<f64>,
);

async fn seed_games(store: &PredictionStore) -> Result<usize> {
    let slate: Vec<GameRow> = vec![
        ("2024-01-10", "LAL", "BOS", 1520.0, 1680.0, Some("BOS")),
        ("2024-01-10", "DEN", "MIN", 1640.0, 1610.0, Some("MIN")),
        ("2024-01-11", "NYK", "MIA", 1580.0, 1540.0, Some("NYK")),
        ("2024-01-11", "GSW", "PHX", 1550.0, 1570.0, Some("GSW")),
        ("2024-01-12", "MIL", "PHI", 1620.0, 1600.0, None),
        ("2024-01-12", "OKC", "DAL", 1630.0, 1560.0, None),
    ];

    for (date, home, away, home_rating, away_rating, actual_winner) in &slate {
        let (home_prob, away_prob) = nba_probs(*home_rating, *away_rating);
        let winner = if home_prob >= away_prob { home } else { away };

        let prediction = store
            .record_game_prediction(GamePredictionInput {
                game_date: Some(NaiveDate::parse_from_str(date, "%Y-%m-%d")?),
                home_team: Some(home.to_string()),
                away_team: Some(away.to_string()),
                predicted_winner: Some(winner.to_string()),
                home_team_win_percentage: Some(home_prob),
                opposing_team_win_percentage: Some(away_prob),
            })
            .await?;

        if let Some(actual) = actual_winner {
            store
                .record_game_outcome(
                    prediction.prediction_id,
                    GameOutcomeInput {
                        actual_winner: Some(actual.to_string()),
                    },
                )
                .await?;
        }
    }

    Ok(slate.len())
}

async fn seed_players(store: &PredictionStore) -> Result<usize> {
    let props: Vec<PlayerRow> = vec![
        (
            "2024-01-10",
            "Jayson Tatum",
            "BOS",
            "LAL",
            "points",
            28.5,
            Some((24.0, 33.0)),
            Some(0.72),
            Some((27.5, "over")),
            Some(31.0),
        ),
        (
            "2024-01-10",
            "Anthony Davis",
            "LAL",
            "BOS",
            "rebounds",
            12.0,
            Some((9.0, 15.0)),
            Some(0.65),
            Some((12.5, "under")),
            Some(14.0),
        ),
        (
            "2024-01-10",
            "LeBron James",
            "LAL",
            "BOS",
            "assists",
            8.0,
            Some((6.0, 10.0)),
            Some(0.60),
            None,
            Some(8.0),
        ),
        (
            "2024-01-10",
            "Nikola Jokic",
            "DEN",
            "MIN",
            "points",
            26.0,
            Some((22.0, 31.0)),
            Some(0.70),
            Some((25.5, "over")),
            Some(24.0),
        ),
        ("2024-01-11", "Jalen Brunson", "NYK", "MIA", "points", 27.0, None, None, None, None),
        (
            "2024-01-11",
            "Stephen Curry",
            "GSW",
            "PHX",
            "points",
            29.5,
            Some((25.0, 34.0)),
            Some(0.68),
            Some((28.5, "over")),
            None,
        ),
        (
            "2024-01-12",
            "Giannis Antetokounmpo",
            "MIL",
            "PHI",
            "rebounds",
            11.5,
            Some((9.0, 14.0)),
            Some(0.66),
            None,
            None,
        ),
    ];

    for (date, player, team, opponent, stat, value, range, confidence, prop, actual) in &props {
        let prediction = store
            .record_player_prediction(PlayerPredictionInput {
                game_date: Some(NaiveDate::parse_from_str(date, "%Y-%m-%d")?),
                player_name: Some(player.to_string()),
                team: Some(team.to_string()),
                opposing_team: Some(opponent.to_string()),
                prediction_type: Some(stat.to_string()),
                predicted_value: Some(*value),
                range_low: range.map(|r| r.0),
                range_high: range.map(|r| r.1),
                confidence: *confidence,
                explanation: Some(format!(
                    "Sample {} projection for {} vs {}",
                    stat, player, opponent
                )),
                prop_line: prop.map(|p| p.0),
                prop_pick: prop.map(|p| p.1.to_string()),
                ..Default::default()
            })
            .await?;

        if let Some(actual) = actual {
            store
                .record_player_outcome(
                    prediction.prediction_id,
                    PlayerOutcomeInput {
                        actual_value: Some(*actual),
                    },
                )
                .await?;
        }
    }

    Ok(props.len())
}
