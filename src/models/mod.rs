use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Sentinel team ids used as placeholders for playoff slots that have not
/// been decided yet. Created by team-sync, never returned by the provider.
pub const TBD_TEAM_IDS: [i64; 2] = [31, 32];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub team_id: i64,
    pub team_name: String,
    pub short_name: Option<String>,
    /// Win-loss display string, e.g. "11-6".
    pub record: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// One schedule week. `name` is the working key ("Week 3", "Wild Card", …);
/// (season, season_type_id, week_num) is the semantic identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct CalendarWeek {
    pub name: String,
    pub details: Option<String>,
    pub week_num: i64,
    pub season: i64,
    pub season_type_id: i64,
    pub season_type_name: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Game {
    pub event_id: i64,
    pub short_name: Option<String>,
    pub game_datetime: DateTime<Utc>,
    pub season: i64,
    pub week_num: i64,
    pub home_team_id: i64,
    pub away_team_id: i64,
    /// Owning calendar week, by name.
    pub week_name: Option<String>,
}

/// Odds and win-probability data, one-to-one with a game. The spread group
/// and the probability group arrive from two different provider endpoints
/// and are upserted independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Outcome {
    pub event_id: i64,
    pub spread_display: Option<String>,
    pub spread: Option<i64>,
    /// 0-100 scale.
    pub home_win_prob: Option<f64>,
    pub away_win_prob: Option<f64>,
    pub pred_diff: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Athlete {
    pub athlete_id: i64,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub jersey: Option<i64>,
    /// Null once the provider drops the athlete from the active roster.
    pub team_id: Option<i64>,
    pub position_id: Option<i64>,
    pub position: Option<String>,
    pub position_abbreviation: Option<String>,
    pub age: Option<i64>,
    pub weight: Option<i64>,
    pub height: Option<i64>,
    pub debut_year: Option<i64>,
    pub active: Option<bool>,
    pub status_id: Option<i64>,
    pub status: Option<String>,
    pub injuries: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct SeasonStatistic {
    pub athlete_id: i64,
    pub season_year: i64,
    pub season_type: String,
    pub category_name: String,
    pub stat_name: String,
    pub stat_value: Option<f64>,
    pub stat_display_value: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct GameStatistic {
    pub athlete_id: i64,
    pub event_id: i64,
    pub game_date: Option<NaiveDate>,
    pub opponent: Option<String>,
    pub category_name: String,
    pub stat_name: String,
    pub stat_value: Option<f64>,
    pub stat_display_value: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TeamStat {
    pub team_id: i64,
    pub category: String,
    pub stat_name: String,
    pub value: Option<f64>,
    pub rank: Option<i64>,
    pub display_rank: Option<String>,
    pub description: Option<String>,
}

// ── Upsert payloads ──────────────────────────────────────────────────────────
//
// One patch struct per entity, optional fields only. A `None` field means
// "leave the stored value alone"; the reconciler merges rather than
// replaces, so a partial fetch can never null out fields it did not carry.

#[derive(Debug, Clone, Default)]
pub struct TeamPatch {
    pub team_name: Option<String>,
    pub short_name: Option<String>,
    pub record: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct WeekPatch {
    pub details: Option<String>,
    pub week_num: Option<i64>,
    pub season: Option<i64>,
    pub season_type_id: Option<i64>,
    pub season_type_name: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct GamePatch {
    pub short_name: Option<String>,
    pub game_datetime: Option<DateTime<Utc>>,
    pub season: Option<i64>,
    pub week_num: Option<i64>,
    pub home_team_id: Option<i64>,
    pub away_team_id: Option<i64>,
    pub week_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct OutcomePatch {
    pub spread_display: Option<String>,
    pub spread: Option<i64>,
    pub home_win_prob: Option<f64>,
    pub away_win_prob: Option<f64>,
    pub pred_diff: Option<f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct AthletePatch {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub jersey: Option<i64>,
    /// Doubly-wrapped: `Some(None)` un-rosters the athlete, `None` leaves
    /// the stored team alone. Same for `injuries`, which clears on recovery.
    pub team_id: Option<Option<i64>>,
    pub position_id: Option<i64>,
    pub position: Option<String>,
    pub position_abbreviation: Option<String>,
    pub age: Option<i64>,
    pub weight: Option<i64>,
    pub height: Option<i64>,
    pub debut_year: Option<i64>,
    pub active: Option<bool>,
    pub status_id: Option<i64>,
    pub status: Option<String>,
    pub injuries: Option<Option<String>>,
}

#[derive(Debug, Clone, Default)]
pub struct StatValuePatch {
    pub stat_value: Option<f64>,
    pub stat_display_value: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct GameStatPatch {
    pub game_date: Option<NaiveDate>,
    pub opponent: Option<String>,
    pub stat_value: Option<f64>,
    pub stat_display_value: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
pub struct TeamStatPatch {
    pub value: Option<f64>,
    pub rank: Option<i64>,
    pub display_rank: Option<String>,
    pub description: Option<String>,
}

// ── Composite keys ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct SeasonStatKey {
    pub athlete_id: i64,
    pub season_year: i64,
    pub season_type: String,
    pub category_name: String,
    pub stat_name: String,
}

#[derive(Debug, Clone)]
pub struct GameStatKey {
    pub athlete_id: i64,
    pub event_id: i64,
    pub category_name: String,
    pub stat_name: String,
}

#[derive(Debug, Clone)]
pub struct TeamStatKey {
    pub team_id: i64,
    pub category: String,
    pub stat_name: String,
}

// ── API response envelope ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
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
