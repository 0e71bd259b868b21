use anyhow::Result;
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::models::{ExportFormat, GamePredictionFilter, PlayerPredictionFilter, PredictionKind};
use crate::services::PredictionStore;

#[derive(Debug, Clone)]
pub struct ExportRequest {
    pub kind: PredictionKind,
    pub format: ExportFormat,
    pub game_filter: GamePredictionFilter,
    pub player_filter: PlayerPredictionFilter,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub path: PathBuf,
    pub kind: PredictionKind,
    pub format: ExportFormat,
    pub rows: usize,
}

/// Write a prediction listing to `path` as CSV or JSON. Returns the number of rows written.
pub async fn export_predictions(store: &PredictionStore, request: &ExportRequest, path: &Path) -> Result<ExportSummary> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    let rows = match request.kind {
        PredictionKind::Game => {
            let predictions = store.list_game_predictions(&request.game_filter).await?;
            write_rows(&predictions, request.format, path).await?;
            predictions.len()
        }
        PredictionKind::Player => {
            let predictions = store.list_player_predictions(&request.player_filter).await?;
            write_rows(&predictions, request.format, path).await?;
            predictions.len()
        }
    };

    tracing::info!(
        "Exported {} {} predictions to {} as {}",
        rows,
        request.kind,
        path.display(),
        request.format.extension()
    );

    Ok(ExportSummary {
        path: path.to_path_buf(),
        kind: request.kind,
        format: request.format,
        rows,
    })
}

async fn write_rows<T: Serialize>(rows: &[T], format: ExportFormat, path: &Path) -> Result<()> {
    match format {
        ExportFormat::Csv => {
            let mut writer = csv::Writer::from_writer(Vec::new());
            for row in rows {
                writer.serialize(row)?;
            }
            let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("CSV flush failed: {}", e))?;
            tokio::fs::write(path, bytes).await?;
        }
        ExportFormat::Json => {
            let json_str = serde_json::to_string_pretty(rows)?;
            tokio::fs::write(path, json_str).await?;
        }
    }
    Ok(())
}

/// Default file name for an export, e.g. `player_predictions_1704880000.csv`.
pub fn default_export_name(kind: PredictionKind, format: ExportFormat) -> String {
    format!(
        "{}_predictions_{}.{}",
        kind,
        chrono::Utc::now().timestamp(),
        format.extension()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::{PlayerPrediction, PlayerPredictionInput};
    use chrono::NaiveDate;

    async fn store_with_player_rows() -> PredictionStore {
        let pool = db::create_memory_pool().await.unwrap();
        db::init_database_with_pool(&pool).await.unwrap();
        let store = PredictionStore::new(pool);

        for (name, value) in [("Luka Doncic", 33.5), ("Kyrie Irving", 24.0)] {
            store
                .record_player_prediction(PlayerPredictionInput {
                    game_date: NaiveDate::from_ymd_opt(2024, 2, 1),
                    player_name: Some(name.to_string()),
                    team: Some("DAL".to_string()),
                    opposing_team: Some("PHX".to_string()),
                    prediction_type: Some("points".to_string()),
                    predicted_value: Some(value),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
        store
    }

    fn player_request(format: ExportFormat) -> ExportRequest {
        ExportRequest {
            kind: PredictionKind::Player,
            format,
            game_filter: GamePredictionFilter::default(),
            player_filter: PlayerPredictionFilter::default(),
        }
    }

    #[tokio::test]
    async fn test_export_csv() {
        let store = store_with_player_rows().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("exports").join("players.csv");

        let summary = export_predictions(&store, &player_request(ExportFormat::Csv), &path).await.unwrap();
        assert_eq!(summary.rows, 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let mut lines = contents.lines();
        let header = lines.next().unwrap();
        assert!(header.starts_with("prediction_id,game_date,player_name"));
        assert_eq!(lines.count(), 2);
        assert!(contents.contains("Luka Doncic"));
    }

    #[tokio::test]
    async fn test_export_json() {
        let store = store_with_player_rows().await;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("players.json");

        export_predictions(&store, &player_request(ExportFormat::Json), &path).await.unwrap();

        let parsed: Vec<PlayerPrediction> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[1].player_name, "Kyrie Irving");
        assert_eq!(parsed[1].range_low, None);
    }

    #[test]
    fn test_default_export_name() {
        let name = default_export_name(PredictionKind::Game, ExportFormat::Json);
        assert!(name.starts_with("game_predictions_"));
        assert!(name.ends_with(".json"));
    }
}
