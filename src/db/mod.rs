pub mod reconcile;

use anyhow::Result;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteConnectOptions, SqlitePool};
use std::str::FromStr;

use crate::models::*;

pub async fn create_pool(database_url: &str) -> Result<SqlitePool> {
    // Strip the "sqlite:" prefix to get the file path, create parent dir if needed
    let file_path = database_url
        .strip_prefix("sqlite:///")
        .or_else(|| database_url.strip_prefix("sqlite://"))
        .or_else(|| database_url.strip_prefix("sqlite:"))
        .unwrap_or(database_url);

    if file_path != ":memory:" {
        if let Some(parent) = std::path::Path::new(file_path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
        }
    }

    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
    let pool = SqlitePool::connect_with(options).await?;
    Ok(pool)
}

/// Create the schema. Primary keys are the provider's numeric ids, never a
/// generated surrogate; composite uniqueness is enforced where the natural
/// key spans several columns.
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS teams (
            team_id INTEGER PRIMARY KEY,
            team_name TEXT NOT NULL,
            short_name TEXT,
            record TEXT,
            last_updated TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS calendar_weeks (
            name TEXT PRIMARY KEY,
            details TEXT,
            week_num INTEGER NOT NULL,
            season INTEGER NOT NULL,
            season_type_id INTEGER NOT NULL,
            season_type_name TEXT,
            start_date TEXT NOT NULL,
            end_date TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS games (
            event_id INTEGER PRIMARY KEY,
            short_name TEXT,
            game_datetime TEXT NOT NULL,
            season INTEGER NOT NULL,
            week_num INTEGER NOT NULL,
            home_team_id INTEGER NOT NULL,
            away_team_id INTEGER NOT NULL,
            week_name TEXT,
            FOREIGN KEY (home_team_id) REFERENCES teams (team_id),
            FOREIGN KEY (away_team_id) REFERENCES teams (team_id),
            FOREIGN KEY (week_name) REFERENCES calendar_weeks (name)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS outcomes (
            event_id INTEGER PRIMARY KEY,
            spread_display TEXT,
            spread INTEGER,
            home_win_prob REAL,
            away_win_prob REAL,
            pred_diff REAL,
            last_updated TEXT,
            FOREIGN KEY (event_id) REFERENCES games (event_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS athletes (
            athlete_id INTEGER PRIMARY KEY,
            first_name TEXT,
            last_name TEXT,
            display_name TEXT,
            jersey INTEGER,
            team_id INTEGER,
            position_id INTEGER,
            position TEXT,
            position_abbreviation TEXT,
            age INTEGER,
            weight INTEGER,
            height INTEGER,
            debut_year INTEGER,
            active INTEGER,
            status_id INTEGER,
            status TEXT,
            injuries TEXT,
            FOREIGN KEY (team_id) REFERENCES teams (team_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS season_statistics (
            athlete_id INTEGER NOT NULL,
            season_year INTEGER NOT NULL,
            season_type TEXT NOT NULL,
            category_name TEXT NOT NULL,
            stat_name TEXT NOT NULL,
            stat_value REAL,
            stat_display_value TEXT,
            last_updated TEXT,
            UNIQUE (athlete_id, season_year, season_type, category_name, stat_name),
            FOREIGN KEY (athlete_id) REFERENCES athletes (athlete_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS game_statistics (
            athlete_id INTEGER NOT NULL,
            event_id INTEGER NOT NULL,
            game_date TEXT,
            opponent TEXT,
            category_name TEXT NOT NULL,
            stat_name TEXT NOT NULL,
            stat_value REAL,
            stat_display_value TEXT,
            last_updated TEXT,
            UNIQUE (athlete_id, event_id, category_name, stat_name),
            FOREIGN KEY (athlete_id) REFERENCES athletes (athlete_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS team_stats (
            team_id INTEGER NOT NULL,
            category TEXT NOT NULL,
            stat_name TEXT NOT NULL,
            value REAL,
            rank INTEGER,
            display_rank TEXT,
            description TEXT,
            UNIQUE (team_id, category, stat_name),
            FOREIGN KEY (team_id) REFERENCES teams (team_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_games_datetime ON games(game_datetime)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_games_season_week ON games(season, week_num)")
        .execute(pool)
        .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_athletes_team ON athletes(team_id)")
        .execute(pool)
        .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_weeks_season ON calendar_weeks(season, season_type_id)",
    )
    .execute(pool)
    .await?;

    tracing::info!("Database schema initialized");
    Ok(())
}

// ── Team reads ───────────────────────────────────────────────────────────────

pub async fn get_team(pool: &SqlitePool, team_id: i64) -> Result<Option<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE team_id = ?")
        .bind(team_id)
        .fetch_optional(pool)
        .await
}

pub async fn get_all_teams(pool: &SqlitePool) -> Result<Vec<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>("SELECT * FROM teams ORDER BY team_name")
        .fetch_all(pool)
        .await
}

// ── Calendar reads ───────────────────────────────────────────────────────────

pub async fn weeks_for_season(
    pool: &SqlitePool,
    season: i64,
) -> Result<Vec<CalendarWeek>, sqlx::Error> {
    sqlx::query_as::<_, CalendarWeek>(
        "SELECT * FROM calendar_weeks WHERE season = ? ORDER BY end_date",
    )
    .bind(season)
    .fetch_all(pool)
    .await
}

/// Weeks that have not yet concluded: the scope of the game-sync sweep.
pub async fn weeks_ending_after(
    pool: &SqlitePool,
    cutoff: DateTime<Utc>,
) -> Result<Vec<CalendarWeek>, sqlx::Error> {
    sqlx::query_as::<_, CalendarWeek>(
        "SELECT * FROM calendar_weeks WHERE end_date >= ? ORDER BY start_date",
    )
    .bind(cutoff)
    .fetch_all(pool)
    .await
}

pub async fn get_week_by_num(
    pool: &SqlitePool,
    season: i64,
    week_num: i64,
) -> Result<Option<CalendarWeek>, sqlx::Error> {
    // Week numbering restarts per season type; prefer the regular-season row.
    sqlx::query_as::<_, CalendarWeek>(
        "SELECT * FROM calendar_weeks WHERE season = ? AND week_num = ? \
         ORDER BY CASE season_type_id WHEN 2 THEN 0 ELSE 1 END, season_type_id LIMIT 1",
    )
    .bind(season)
    .bind(week_num)
    .fetch_optional(pool)
    .await
}

// ── Game reads ───────────────────────────────────────────────────────────────

pub async fn get_game(pool: &SqlitePool, event_id: i64) -> Result<Option<Game>, sqlx::Error> {
    sqlx::query_as::<_, Game>("SELECT * FROM games WHERE event_id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

pub async fn games_for_week_name(
    pool: &SqlitePool,
    week_name: &str,
) -> Result<Vec<Game>, sqlx::Error> {
    sqlx::query_as::<_, Game>(
        "SELECT * FROM games WHERE week_name = ? ORDER BY game_datetime",
    )
    .bind(week_name)
    .fetch_all(pool)
    .await
}

/// Games whose kickoff falls inside [start, end] — the shape every refresh
/// window query takes.
pub async fn games_with_kickoff_between(
    pool: &SqlitePool,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> Result<Vec<Game>, sqlx::Error> {
    sqlx::query_as::<_, Game>(
        "SELECT * FROM games WHERE game_datetime >= ? AND game_datetime <= ? ORDER BY game_datetime",
    )
    .bind(start)
    .bind(end)
    .fetch_all(pool)
    .await
}

pub async fn games_for_team(pool: &SqlitePool, team_id: i64) -> Result<Vec<Game>, sqlx::Error> {
    sqlx::query_as::<_, Game>(
        "SELECT * FROM games WHERE home_team_id = ? OR away_team_id = ? ORDER BY game_datetime",
    )
    .bind(team_id)
    .bind(team_id)
    .fetch_all(pool)
    .await
}

pub async fn get_outcome(pool: &SqlitePool, event_id: i64) -> Result<Option<Outcome>, sqlx::Error> {
    sqlx::query_as::<_, Outcome>("SELECT * FROM outcomes WHERE event_id = ?")
        .bind(event_id)
        .fetch_optional(pool)
        .await
}

// ── Athlete reads ────────────────────────────────────────────────────────────

pub async fn get_athlete(
    pool: &SqlitePool,
    athlete_id: i64,
) -> Result<Option<Athlete>, sqlx::Error> {
    sqlx::query_as::<_, Athlete>("SELECT * FROM athletes WHERE athlete_id = ?")
        .bind(athlete_id)
        .fetch_optional(pool)
        .await
}

pub async fn athletes_for_team(
    pool: &SqlitePool,
    team_id: i64,
) -> Result<Vec<Athlete>, sqlx::Error> {
    sqlx::query_as::<_, Athlete>(
        "SELECT * FROM athletes WHERE team_id = ? ORDER BY position, jersey",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await
}

pub async fn rostered_athletes(pool: &SqlitePool) -> Result<Vec<Athlete>, sqlx::Error> {
    sqlx::query_as::<_, Athlete>("SELECT * FROM athletes WHERE team_id IS NOT NULL")
        .fetch_all(pool)
        .await
}

/// Null out the team of roster rows the provider no longer returns. The
/// athlete rows themselves are kept; data is superseded, never purged.
pub async fn orphan_missing_athletes(
    pool: &SqlitePool,
    team_id: i64,
    seen_ids: &[i64],
) -> Result<u64, sqlx::Error> {
    let current = athletes_for_team(pool, team_id).await?;
    let mut orphaned = 0u64;
    for athlete in current {
        if !seen_ids.contains(&athlete.athlete_id) {
            let result = sqlx::query("UPDATE athletes SET team_id = NULL WHERE athlete_id = ?")
                .bind(athlete.athlete_id)
                .execute(pool)
                .await?;
            orphaned += result.rows_affected();
        }
    }
    Ok(orphaned)
}

// ── Statistic reads ──────────────────────────────────────────────────────────

pub async fn season_stats_for_athlete(
    pool: &SqlitePool,
    athlete_id: i64,
    season_year: i64,
) -> Result<Vec<SeasonStatistic>, sqlx::Error> {
    sqlx::query_as::<_, SeasonStatistic>(
        "SELECT * FROM season_statistics WHERE athlete_id = ? AND season_year = ? \
         ORDER BY category_name, stat_name",
    )
    .bind(athlete_id)
    .bind(season_year)
    .fetch_all(pool)
    .await
}

pub async fn team_stats_for_team(
    pool: &SqlitePool,
    team_id: i64,
) -> Result<Vec<TeamStat>, sqlx::Error> {
    sqlx::query_as::<_, TeamStat>(
        "SELECT * FROM team_stats WHERE team_id = ? ORDER BY category, stat_name",
    )
    .bind(team_id)
    .fetch_all(pool)
    .await
}
