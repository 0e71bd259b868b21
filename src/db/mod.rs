pub mod seed;
pub use seed::seed_data;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use std::str::FromStr;

use crate::error::{StoreError, StoreResult};
use crate::models::*;
use crate::utils::{date_to_db, parse_game_date, parse_timestamp, timestamp_to_db};

/// Tables from the old normalized schema. They are never read, only dropped on reset.
const LEGACY_TABLES: [&str; 6] = [
    "player_stats_predictions",
    "player_game_stats",
    "predictions",
    "games",
    "players",
    "teams",
];

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if !file_path.starts_with(":memory:") {
        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePool::connect_with(options).await?;
    tracing::debug!("Connected to {}", database_url);
    Ok(pool)
}

/// Single-connection in-memory pool. Every connection to `:memory:` is a
/// separate database, so the pool must never open a second one.
#[cfg(test)]
pub async fn create_memory_pool() -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;
    Ok(pool)
}

pub async fn init_database_with_pool(pool: &SqlitePool) -> StoreResult<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_predictions (
            prediction_id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_date TEXT NOT NULL,
            home_team TEXT NOT NULL,
            away_team TEXT NOT NULL,
            predicted_winner TEXT NOT NULL,
            home_team_win_percentage REAL NOT NULL,
            opposing_team_win_percentage REAL NOT NULL,
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_predictions (
            prediction_id INTEGER PRIMARY KEY AUTOINCREMENT,
            game_date TEXT NOT NULL,
            player_name TEXT NOT NULL,
            team TEXT NOT NULL,
            opposing_team TEXT NOT NULL,
            prediction_type TEXT NOT NULL,
            predicted_value REAL NOT NULL,
            range_low REAL,
            range_high REAL,
            confidence REAL,
            explanation TEXT,
            prop_line REAL,
            prop_pick TEXT,
            prop_reason TEXT,
            model_name TEXT NOT NULL DEFAULT 'deepseek-v3',
            prompt_version TEXT NOT NULL DEFAULT 'v2',
            timestamp TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Outcomes live apart from predictions so prediction rows are never updated
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_prediction_outcomes (
            prediction_id INTEGER PRIMARY KEY,
            actual_winner TEXT NOT NULL,
            recorded_at TEXT NOT NULL,
            FOREIGN KEY (prediction_id) REFERENCES game_predictions (prediction_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS player_prediction_outcomes (
            prediction_id INTEGER PRIMARY KEY,
            actual_value REAL NOT NULL,
            recorded_at TEXT NOT NULL,
            FOREIGN KEY (prediction_id) REFERENCES player_predictions (prediction_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_game_predictions_timestamp ON game_predictions(timestamp)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_game_predictions_date ON game_predictions(game_date)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_player_predictions_timestamp ON player_predictions(timestamp)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_player_predictions_player_type ON player_predictions(player_name, prediction_type)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database initialized successfully");
    Ok(())
}

/// Drop every prediction, outcome and legacy table, then recreate the schema.
/// This is the only way rows ever leave the store.
pub async fn reset_database(pool: &SqlitePool) -> StoreResult<()> {
    let mut tx = pool.begin().await?;

    // Outcome tables first: they reference the prediction tables
    for table in [
        "game_prediction_outcomes",
        "player_prediction_outcomes",
        "game_predictions",
        "player_predictions",
    ]
    .iter()
    .chain(LEGACY_TABLES.iter())
    {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    tracing::warn!("All prediction tables dropped");

    init_database_with_pool(pool).await
}

// Game prediction operations

pub async fn insert_game_prediction(
    pool: &SqlitePool,
    prediction: &NewGamePrediction,
    timestamp: DateTime<Utc>,
) -> StoreResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO game_predictions
        (game_date, home_team, away_team, predicted_winner,
         home_team_win_percentage, opposing_team_win_percentage, timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(date_to_db(prediction.game_date))
    .bind(&prediction.home_team)
    .bind(&prediction.away_team)
    .bind(&prediction.predicted_winner)
    .bind(prediction.home_team_win_percentage)
    .bind(prediction.opposing_team_win_percentage)
    .bind(timestamp_to_db(timestamp))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_game_prediction(pool: &SqlitePool, prediction_id: i64) -> StoreResult<Option<GamePrediction>> {
    let row = sqlx::query("SELECT * FROM game_predictions WHERE prediction_id = ?")
        .bind(prediction_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(game_prediction_from_row).transpose()
}

pub async fn list_game_predictions(
    pool: &SqlitePool,
    filter: &GamePredictionFilter,
) -> StoreResult<Vec<GamePrediction>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM game_predictions WHERE 1=1");

    if let Some(game_date) = filter.game_date {
        query.push(" AND game_date = ").push_bind(date_to_db(game_date));
    }
    if let Some(team) = &filter.team {
        query
            .push(" AND (home_team = ")
            .push_bind(team.clone())
            .push(" OR away_team = ")
            .push_bind(team.clone())
            .push(")");
    }
    if let Some(winner) = &filter.predicted_winner {
        query.push(" AND predicted_winner = ").push_bind(winner.clone());
    }
    push_timestamp_bounds(&mut query, filter.since, filter.until);
    query.push(" ORDER BY timestamp ASC, prediction_id ASC");
    push_limit(&mut query, filter.limit);

    let rows = query.build().fetch_all(pool).await?;
    rows.iter().map(game_prediction_from_row).collect()
}

// Player prediction operations

pub async fn insert_player_prediction(
    pool: &SqlitePool,
    prediction: &NewPlayerPrediction,
    timestamp: DateTime<Utc>,
) -> StoreResult<i64> {
    let result = sqlx::query(
        r#"
        INSERT INTO player_predictions
        (game_date, player_name, team, opposing_team, prediction_type, predicted_value,
         range_low, range_high, confidence, explanation, prop_line, prop_pick, prop_reason,
         model_name, prompt_version, timestamp)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(date_to_db(prediction.game_date))
    .bind(&prediction.player_name)
    .bind(&prediction.team)
    .bind(&prediction.opposing_team)
    .bind(&prediction.prediction_type)
    .bind(prediction.predicted_value)
    .bind(prediction.range_low)
    .bind(prediction.range_high)
    .bind(prediction.confidence)
    .bind(&prediction.explanation)
    .bind(prediction.prop_line)
    .bind(&prediction.prop_pick)
    .bind(&prediction.prop_reason)
    .bind(&prediction.model_name)
    .bind(&prediction.prompt_version)
    .bind(timestamp_to_db(timestamp))
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn get_player_prediction(pool: &SqlitePool, prediction_id: i64) -> StoreResult<Option<PlayerPrediction>> {
    let row = sqlx::query("SELECT * FROM player_predictions WHERE prediction_id = ?")
        .bind(prediction_id)
        .fetch_optional(pool)
        .await?;

    row.as_ref().map(player_prediction_from_row).transpose()
}

pub async fn list_player_predictions(
    pool: &SqlitePool,
    filter: &PlayerPredictionFilter,
) -> StoreResult<Vec<PlayerPrediction>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM player_predictions WHERE 1=1");
    push_player_filters(&mut query, filter);
    query.push(" ORDER BY timestamp ASC, prediction_id ASC");
    push_limit(&mut query, filter.limit);

    let rows = query.build().fetch_all(pool).await?;
    rows.iter().map(player_prediction_from_row).collect()
}

pub async fn get_latest_player_prediction(
    pool: &SqlitePool,
    filter: &PlayerPredictionFilter,
) -> StoreResult<Option<PlayerPrediction>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new("SELECT * FROM player_predictions WHERE 1=1");
    push_player_filters(&mut query, filter);
    query.push(" ORDER BY timestamp DESC, prediction_id DESC LIMIT 1");

    let row = query.build().fetch_optional(pool).await?;
    row.as_ref().map(player_prediction_from_row).transpose()
}

fn push_player_filters(query: &mut QueryBuilder<'_, Sqlite>, filter: &PlayerPredictionFilter) {
    if let Some(game_date) = filter.game_date {
        query.push(" AND game_date = ").push_bind(date_to_db(game_date));
    }
    if let Some(player_name) = &filter.player_name {
        query.push(" AND player_name = ").push_bind(player_name.clone());
    }
    if let Some(team) = &filter.team {
        query.push(" AND team = ").push_bind(team.clone());
    }
    if let Some(opposing_team) = &filter.opposing_team {
        query.push(" AND opposing_team = ").push_bind(opposing_team.clone());
    }
    if let Some(prediction_type) = &filter.prediction_type {
        query.push(" AND prediction_type = ").push_bind(prediction_type.clone());
    }
    push_timestamp_bounds(query, filter.since, filter.until);
}

fn push_timestamp_bounds(
    query: &mut QueryBuilder<'_, Sqlite>,
    since: Option<DateTime<Utc>>,
    until: Option<DateTime<Utc>>,
) {
    if let Some(since) = since {
        query.push(" AND timestamp >= ").push_bind(timestamp_to_db(since));
    }
    if let Some(until) = until {
        query.push(" AND timestamp <= ").push_bind(timestamp_to_db(until));
    }
}

fn push_limit(query: &mut QueryBuilder<'_, Sqlite>, limit: Option<usize>) {
    if let Some(limit) = limit {
        let limit = limit.min(MAX_LIST_LIMIT) as i64;
        query.push(" LIMIT ").push_bind(limit);
    }
}

// Outcome operations

pub async fn insert_game_outcome(pool: &SqlitePool, outcome: &GameOutcome) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO game_prediction_outcomes (prediction_id, actual_winner, recorded_at) VALUES (?, ?, ?)",
    )
    .bind(outcome.prediction_id)
    .bind(&outcome.actual_winner)
    .bind(timestamp_to_db(outcome.recorded_at))
    .execute(pool)
    .await
    .map_err(|e| conflict_or_storage(e, "game", outcome.prediction_id))?;

    Ok(())
}

pub async fn insert_player_outcome(pool: &SqlitePool, outcome: &PlayerOutcome) -> StoreResult<()> {
    sqlx::query(
        "INSERT INTO player_prediction_outcomes (prediction_id, actual_value, recorded_at) VALUES (?, ?, ?)",
    )
    .bind(outcome.prediction_id)
    .bind(outcome.actual_value)
    .bind(timestamp_to_db(outcome.recorded_at))
    .execute(pool)
    .await
    .map_err(|e| conflict_or_storage(e, "player", outcome.prediction_id))?;

    Ok(())
}

fn conflict_or_storage(err: sqlx::Error, kind: &'static str, id: i64) -> StoreError {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => StoreError::Conflict { kind, id },
        sqlx::Error::Database(db_err) if db_err.is_foreign_key_violation() => StoreError::NotFound { kind, id },
        _ => StoreError::Storage(err),
    }
}

pub async fn get_game_outcomes(pool: &SqlitePool) -> StoreResult<Vec<(GamePrediction, GameOutcome)>> {
    let rows = sqlx::query(
        r#"
        SELECT p.*, o.actual_winner, o.recorded_at
        FROM game_predictions p
        JOIN game_prediction_outcomes o ON o.prediction_id = p.prediction_id
        ORDER BY p.timestamp ASC, p.prediction_id ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    let mut pairs = Vec::with_capacity(rows.len());
    for row in &rows {
        let prediction = game_prediction_from_row(row)?;
        let outcome = GameOutcome {
            prediction_id: prediction.prediction_id,
            actual_winner: row.try_get("actual_winner")?,
            recorded_at: parse_timestamp(&row.try_get::<String, _>("recorded_at")?)?,
        };
        pairs.push((prediction, outcome));
    }
    Ok(pairs)
}

pub async fn get_player_outcomes(
    pool: &SqlitePool,
    prediction_type: Option<&str>,
) -> StoreResult<Vec<(PlayerPrediction, PlayerOutcome)>> {
    let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
        r#"
        SELECT p.*, o.actual_value, o.recorded_at
        FROM player_predictions p
        JOIN player_prediction_outcomes o ON o.prediction_id = p.prediction_id
        WHERE 1=1
        "#,
    );
    if let Some(prediction_type) = prediction_type {
        query.push(" AND p.prediction_type = ").push_bind(prediction_type.to_string());
    }
    query.push(" ORDER BY p.timestamp ASC, p.prediction_id ASC");

    let rows = query.build().fetch_all(pool).await?;

    let mut pairs = Vec::with_capacity(rows.len());
    for row in &rows {
        let prediction = player_prediction_from_row(row)?;
        let outcome = PlayerOutcome {
            prediction_id: prediction.prediction_id,
            actual_value: row.try_get("actual_value")?,
            recorded_at: parse_timestamp(&row.try_get::<String, _>("recorded_at")?)?,
        };
        pairs.push((prediction, outcome));
    }
    Ok(pairs)
}

// Row mapping

fn game_prediction_from_row(row: &SqliteRow) -> StoreResult<GamePrediction> {
    Ok(GamePrediction {
        prediction_id: row.try_get("prediction_id")?,
        game_date: parse_game_date(&row.try_get::<String, _>("game_date")?)?,
        home_team: row.try_get("home_team")?,
        away_team: row.try_get("away_team")?,
        predicted_winner: row.try_get("predicted_winner")?,
        home_team_win_percentage: row.try_get("home_team_win_percentage")?,
        opposing_team_win_percentage: row.try_get("opposing_team_win_percentage")?,
        timestamp: parse_timestamp(&row.try_get::<String, _>("timestamp")?)?,
    })
}

fn player_prediction_from_row(row: &SqliteRow) -> StoreResult<PlayerPrediction> {
    Ok(PlayerPrediction {
        prediction_id: row.try_get("prediction_id")?,
        game_date: parse_game_date(&row.try_get::<String, _>("game_date")?)?,
        player_name: row.try_get("player_name")?,
        team: row.try_get("team")?,
        opposing_team: row.try_get("opposing_team")?,
        prediction_type: row.try_get("prediction_type")?,
        predicted_value: row.try_get("predicted_value")?,
        range_low: row.try_get("range_low")?,
        range_high: row.try_get("range_high")?,
        confidence: row.try_get("confidence")?,
        explanation: row.try_get("explanation")?,
        prop_line: row.try_get("prop_line")?,
        prop_pick: row.try_get("prop_pick")?,
        prop_reason: row.try_get("prop_reason")?,
        model_name: row.try_get("model_name")?,
        prompt_version: row.try_get("prompt_version")?,
        timestamp: parse_timestamp(&row.try_get::<String, _>("timestamp")?)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    async fn test_pool() -> SqlitePool {
        let pool = create_memory_pool().await.unwrap();
        init_database_with_pool(&pool).await.unwrap();
        pool
    }

    fn sample_game() -> NewGamePrediction {
        NewGamePrediction {
            game_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            home_team: "LAL".to_string(),
            away_team: "BOS".to_string(),
            predicted_winner: "BOS".to_string(),
            home_team_win_percentage: 0.42,
            opposing_team_win_percentage: 0.58,
        }
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let pool = test_pool().await;
        init_database_with_pool(&pool).await.unwrap();
    }

    #[tokio::test]
    async fn test_insert_and_get_game_prediction() {
        let pool = test_pool().await;
        let now = Utc::now();
        let id = insert_game_prediction(&pool, &sample_game(), now).await.unwrap();

        let stored = get_game_prediction(&pool, id).await.unwrap().unwrap();
        assert_eq!(stored.home_team, "LAL");
        assert_eq!(stored.game_date, NaiveDate::from_ymd_opt(2024, 1, 10).unwrap());
        assert_eq!(stored.timestamp, now);
        assert!(get_game_prediction(&pool, id + 1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_outcome_is_conflict() {
        let pool = test_pool().await;
        let id = insert_game_prediction(&pool, &sample_game(), Utc::now()).await.unwrap();
        let outcome = GameOutcome {
            prediction_id: id,
            actual_winner: "BOS".to_string(),
            recorded_at: Utc::now(),
        };
        insert_game_outcome(&pool, &outcome).await.unwrap();

        let err = insert_game_outcome(&pool, &outcome).await.unwrap_err();
        assert!(matches!(err, StoreError::Conflict { kind: "game", .. }));
    }

    #[tokio::test]
    async fn test_reset_drops_rows_and_legacy_tables() {
        let pool = test_pool().await;
        sqlx::query("CREATE TABLE teams (team_id INTEGER PRIMARY KEY, name TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        insert_game_prediction(&pool, &sample_game(), Utc::now()).await.unwrap();

        reset_database(&pool).await.unwrap();

        let games = list_game_predictions(&pool, &GamePredictionFilter::default()).await.unwrap();
        assert!(games.is_empty());
        let legacy: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sqlite_master WHERE name = 'teams'")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(legacy, 0);
    }

    #[tokio::test]
    async fn test_reset_restarts_identifiers() {
        let pool = test_pool().await;
        insert_game_prediction(&pool, &sample_game(), Utc::now()).await.unwrap();
        let second = insert_game_prediction(&pool, &sample_game(), Utc::now()).await.unwrap();
        assert_eq!(second, 2);

        reset_database(&pool).await.unwrap();

        let first_after_reset = insert_game_prediction(&pool, &sample_game(), Utc::now()).await.unwrap();
        assert_eq!(first_after_reset, 1);
    }
}
