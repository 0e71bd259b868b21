use anyhow::Result;
use sqlx::SqlitePool;
use std::path::PathBuf;

use crate::db;
use crate::models::*;
use crate::services::{default_export_name, export_predictions, Evaluator, ExportRequest, PredictionStore};
use crate::utils::format_probability;

pub async fn init_db(pool: &SqlitePool) -> Result<()> {
    db::init_database_with_pool(pool).await?;
    println!("✅ Database ready");
    Ok(())
}

pub async fn reset_db(pool: &SqlitePool, confirmed: bool) -> Result<()> {
    if !confirmed {
        println!("⚠️  This drops every prediction and outcome. Re-run with --yes to confirm.");
        return Ok(());
    }

    db::reset_database(pool).await?;
    println!("🧹 Database reset, all prediction tables recreated empty");
    Ok(())
}

pub async fn seed(store: &PredictionStore) -> Result<()> {
    println!("🌱 Seeding sample predictions...");
    db::seed_data(store).await?;
    println!("✅ Seed complete");
    Ok(())
}

pub async fn record_game(store: &PredictionStore, input: GamePredictionInput) -> Result<()> {
    let prediction = store.record_game_prediction(input).await?;

    println!("📝 Recorded game prediction #{}", prediction.prediction_id);
    print_game(&prediction);
    Ok(())
}

pub async fn record_player(store: &PredictionStore, input: PlayerPredictionInput) -> Result<()> {
    let prediction = store.record_player_prediction(input).await?;

    println!("📝 Recorded player prediction #{}", prediction.prediction_id);
    print_player(&prediction);
    Ok(())
}

pub async fn list_games(store: &PredictionStore, filter: &GamePredictionFilter) -> Result<()> {
    let predictions = store.list_game_predictions(filter).await?;

    if predictions.is_empty() {
        println!("📭 No game predictions match those filters.");
        return Ok(());
    }

    println!("🏀 {} game predictions:\n", predictions.len());
    for prediction in &predictions {
        print_game(prediction);
    }
    Ok(())
}

pub async fn list_players(store: &PredictionStore, filter: &PlayerPredictionFilter) -> Result<()> {
    let predictions = store.list_player_predictions(filter).await?;

    if predictions.is_empty() {
        println!("📭 No player predictions match those filters.");
        return Ok(());
    }

    println!("👤 {} player predictions:\n", predictions.len());
    for prediction in &predictions {
        print_player(prediction);
    }
    Ok(())
}

pub async fn record_game_outcome(store: &PredictionStore, prediction_id: i64, actual_winner: String) -> Result<()> {
    let outcome = store
        .record_game_outcome(
            prediction_id,
            GameOutcomeInput {
                actual_winner: Some(actual_winner),
            },
        )
        .await?;

    println!(
        "🏁 Outcome recorded for game prediction #{}: {} won",
        outcome.prediction_id, outcome.actual_winner
    );
    Ok(())
}

pub async fn record_player_outcome(store: &PredictionStore, prediction_id: i64, actual_value: f64) -> Result<()> {
    let outcome = store
        .record_player_outcome(
            prediction_id,
            PlayerOutcomeInput {
                actual_value: Some(actual_value),
            },
        )
        .await?;

    println!(
        "🏁 Outcome recorded for player prediction #{}: actual {}",
        outcome.prediction_id, outcome.actual_value
    );
    Ok(())
}

pub async fn evaluate_games(store: &PredictionStore) -> Result<()> {
    let summary = Evaluator::new(store).evaluate_game_predictions().await?;

    println!("📊 Game prediction evaluation");
    println!("   Evaluated: {}", summary.total_evaluated);
    println!("   Correct winners: {} ({:.2}%)", summary.correct, summary.accuracy);
    Ok(())
}

pub async fn evaluate_players(store: &PredictionStore, prediction_type: Option<&str>) -> Result<()> {
    let summary = Evaluator::new(store).evaluate_player_predictions(prediction_type).await?;

    println!("📊 Player prediction evaluation ({})", prediction_type.unwrap_or("all types"));
    if summary.total_evaluated == 0 {
        println!("   No predictions with recorded outcomes yet.");
        return Ok(());
    }

    println!("   Evaluated: {}", summary.total_evaluated);
    println!("   Exact: {} ({:.2}%)", summary.exact_correct, summary.exact_accuracy);
    println!("   Within range: {} ({:.2}%)", summary.range_correct, summary.range_accuracy);
    println!(
        "   Over/under: {}/{} ({:.2}%)",
        summary.over_under_correct, summary.over_under_evaluable, summary.over_under_accuracy
    );
    Ok(())
}

pub async fn export(store: &PredictionStore, request: ExportRequest, out: Option<PathBuf>) -> Result<()> {
    let path = out.unwrap_or_else(|| {
        PathBuf::from("exports").join(default_export_name(request.kind, request.format))
    });

    let summary = export_predictions(store, &request, &path).await?;

    println!(
        "💾 Exported {} {} predictions to {}",
        summary.rows,
        summary.kind,
        summary.path.display()
    );
    Ok(())
}

fn print_game(prediction: &GamePrediction) {
    println!(
        "#{} {} {} vs {}: pick {}",
        prediction.prediction_id,
        prediction.game_date,
        prediction.home_team,
        prediction.away_team,
        prediction.predicted_winner
    );
    println!(
        "   Home win: {} | Away win: {} | recorded {}\n",
        format_probability(prediction.home_team_win_percentage),
        format_probability(prediction.opposing_team_win_percentage),
        prediction.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
}

fn print_player(prediction: &PlayerPrediction) {
    println!(
        "#{} {} {} ({}) vs {}: {} {}",
        prediction.prediction_id,
        prediction.game_date,
        prediction.player_name,
        prediction.team,
        prediction.opposing_team,
        prediction.predicted_value,
        prediction.prediction_type
    );

    if let (Some(low), Some(high)) = (prediction.range_low, prediction.range_high) {
        println!("   Range: {} - {}", low, high);
    }
    if let Some(confidence) = prediction.confidence {
        println!("   Confidence: {}", confidence);
    }
    if let (Some(line), Some(pick)) = (prediction.prop_line, prediction.prop_pick.as_deref()) {
        println!("   Prop: {} {}", pick, line);
    }
    if let Some(explanation) = &prediction.explanation {
        println!("   {}", explanation);
    }
    println!(
        "   Model: {} ({}) | recorded {}\n",
        prediction.model_name,
        prediction.prompt_version,
        prediction.timestamp.format("%Y-%m-%d %H:%M:%S")
    );
}
