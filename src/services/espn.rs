//! Read-only client for the provider's sports data APIs.
//!
//! The provider spreads its endpoints over four hosts (core, site, site.web
//! and cdn); all four bases come from config so tests can point the whole
//! client at a stub. Every request shares one `reqwest::Client` with a
//! bounded timeout — an unbounded call would stall the owning job's cadence.
//!
//! Non-2xx responses map to `SourceUnavailable`, undecodable bodies to
//! `SourceFormat`. Both are recoverable per item from the orchestrator's
//! point of view.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::config::AppConfig;
use crate::error::IngestError;

// ── Reference lists ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RefList {
    #[serde(default)]
    pub items: Vec<RefItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefItem {
    #[serde(rename = "$ref")]
    pub reference: String,
}

// ── Teams ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamDetail {
    pub display_name: String,
    pub abbreviation: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordResponse {
    #[serde(default)]
    pub items: Vec<RecordItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordItem {
    pub display_value: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TeamStatisticsResponse {
    pub splits: Option<StatSplits>,
}

#[derive(Debug, Deserialize)]
pub struct StatSplits {
    #[serde(default)]
    pub categories: Vec<StatCategory>,
}

#[derive(Debug, Deserialize)]
pub struct StatCategory {
    pub name: Option<String>,
    #[serde(default)]
    pub stats: Vec<StatEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatEntry {
    pub name: Option<String>,
    pub value: Option<f64>,
    pub rank: Option<i64>,
    pub rank_display_value: Option<String>,
    pub description: Option<String>,
}

// ── Events ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDetail {
    pub short_name: Option<String>,
    pub date: Option<String>,
    #[serde(default)]
    pub competitions: Vec<Competition>,
}

#[derive(Debug, Deserialize)]
pub struct Competition {
    #[serde(default)]
    pub competitors: Vec<Competitor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competitor {
    pub home_away: Option<String>,
    pub team: Option<RefItem>,
}

/// Game package from the cdn host; used for in-flight kickoff/participant
/// updates once playoff seeding resolves placeholder teams.
#[derive(Debug, Deserialize)]
pub struct GamePackageResponse {
    #[serde(rename = "gamepackageJSON")]
    pub gamepackage_json: Option<GamePackage>,
}

#[derive(Debug, Deserialize)]
pub struct GamePackage {
    pub header: Option<GameHeader>,
}

#[derive(Debug, Deserialize)]
pub struct GameHeader {
    #[serde(default)]
    pub competitions: Vec<HeaderCompetition>,
}

#[derive(Debug, Deserialize)]
pub struct HeaderCompetition {
    pub date: Option<String>,
    #[serde(default)]
    pub competitors: Vec<HeaderCompetitor>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderCompetitor {
    pub home_away: Option<String>,
    pub id: Option<String>,
}

// ── Odds and win probability ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct OddsResponse {
    #[serde(default)]
    pub items: Vec<OddsItem>,
}

#[derive(Debug, Deserialize)]
pub struct OddsItem {
    pub details: Option<String>,
    pub spread: Option<f64>,
}

/// Power-index stats are positional: index 0 is the predicted point
/// differential, index 1 the home win probability on a 0-100 scale.
#[derive(Debug, Deserialize)]
pub struct PowerIndexResponse {
    #[serde(default)]
    pub stats: Vec<PowerIndexStat>,
}

#[derive(Debug, Deserialize)]
pub struct PowerIndexStat {
    pub value: Option<f64>,
}

// ── Rosters and athletes ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RosterResponse {
    #[serde(default)]
    pub athletes: Vec<RosterGroup>,
}

#[derive(Debug, Deserialize)]
pub struct RosterGroup {
    #[serde(default)]
    pub items: Vec<RosterAthlete>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterAthlete {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub jersey: Option<String>,
    pub position: Option<PositionRef>,
    pub age: Option<f64>,
    pub weight: Option<f64>,
    pub height: Option<f64>,
    pub debut_year: Option<i64>,
    pub active: Option<bool>,
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub injuries: Vec<InjuryEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PositionRef {
    pub id: Option<String>,
    pub name: Option<String>,
    pub abbreviation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct NamedRef {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InjuryEntry {
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AthleteOverviewResponse {
    pub athlete: Option<AthleteOverview>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AthleteOverview {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub display_name: Option<String>,
    pub position: Option<PositionRef>,
    pub status: Option<NamedRef>,
    #[serde(default)]
    pub injuries: Vec<InjuryEntry>,
}

// ── Game logs ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamelogResponse {
    pub athlete: Option<GamelogAthlete>,
    #[serde(default)]
    pub season_types: Vec<GamelogSeasonType>,
    /// Event metadata keyed by event id, shared by all categories.
    #[serde(default)]
    pub events: HashMap<String, GamelogEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamelogAthlete {
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamelogSeasonType {
    pub display_name: Option<String>,
    #[serde(default)]
    pub categories: Vec<GamelogCategory>,
}

/// One stat category. `totals` is the season aggregate: an ordered,
/// unlabeled value sequence whose positions are resolved through the stat
/// name mapping table. `events` carries the same positional layout per game.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamelogCategory {
    pub display_name: Option<String>,
    #[serde(default)]
    pub totals: Vec<serde_json::Value>,
    #[serde(default)]
    pub events: Vec<GamelogCategoryEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamelogCategoryEvent {
    pub event_id: Option<String>,
    #[serde(default)]
    pub stats: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GamelogEvent {
    pub game_date: Option<String>,
    pub opponent: Option<GamelogOpponent>,
}

#[derive(Debug, Deserialize)]
pub struct GamelogOpponent {
    pub abbreviation: Option<String>,
}

// ── Season schedule (cdn) ────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScheduleResponse {
    pub content: Option<ScheduleContent>,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleContent {
    #[serde(default)]
    pub calendar: Vec<CalendarSection>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarSection {
    /// Season type id as a string ("1" pre, "2" regular, "3" post).
    pub value: Option<String>,
    pub label: Option<String>,
    #[serde(default)]
    pub entries: Vec<CalendarEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub label: Option<String>,
    pub alternate_label: Option<String>,
    pub detail: Option<String>,
    pub value: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

// ── Client ───────────────────────────────────────────────────────────────────

pub struct SourceClient {
    http: reqwest::Client,
    core_base: String,
    site_base: String,
    web_base: String,
    cdn_base: String,
}

impl SourceClient {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http_timeout_secs))
            .build()?;
        Ok(Self {
            http,
            core_base: config.core_api_base.clone(),
            site_base: config.site_api_base.clone(),
            web_base: config.web_api_base.clone(),
            cdn_base: config.cdn_api_base.clone(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, IngestError> {
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| IngestError::SourceRequest {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::SourceUnavailable {
                status: status.as_u16(),
                url,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| IngestError::SourceRequest {
                url: url.clone(),
                source: e,
            })?;

        serde_json::from_str(&body).map_err(|e| IngestError::SourceFormat {
            endpoint: url,
            context: e.to_string(),
        })
    }

    pub async fn season_teams(&self, season: i64) -> Result<Vec<RefItem>, IngestError> {
        let url = format!("{}/seasons/{}/teams?limit=50", self.core_base, season);
        Ok(self.get_json::<RefList>(url).await?.items)
    }

    pub async fn team_detail(&self, season: i64, team_id: i64) -> Result<TeamDetail, IngestError> {
        let url = format!("{}/seasons/{}/teams/{}", self.core_base, season, team_id);
        self.get_json(url).await
    }

    pub async fn week_events(
        &self,
        season: i64,
        season_type_id: i64,
        week_num: i64,
    ) -> Result<Vec<RefItem>, IngestError> {
        let url = format!(
            "{}/seasons/{}/types/{}/weeks/{}/events",
            self.core_base, season, season_type_id, week_num
        );
        Ok(self.get_json::<RefList>(url).await?.items)
    }

    pub async fn event_detail(&self, event_id: i64) -> Result<EventDetail, IngestError> {
        let url = format!("{}/events/{}", self.core_base, event_id);
        self.get_json(url).await
    }

    pub async fn game_package(&self, event_id: i64) -> Result<GamePackageResponse, IngestError> {
        let url = format!("{}/game?xhr=1&gameId={}", self.cdn_base, event_id);
        self.get_json(url).await
    }

    pub async fn team_roster(&self, team_id: i64) -> Result<RosterResponse, IngestError> {
        let url = format!("{}/teams/{}/roster?limit=200", self.site_base, team_id);
        self.get_json(url).await
    }

    pub async fn team_record(
        &self,
        season: i64,
        team_id: i64,
    ) -> Result<RecordResponse, IngestError> {
        let url = format!(
            "{}/seasons/{}/types/2/teams/{}/record",
            self.core_base, season, team_id
        );
        self.get_json(url).await
    }

    pub async fn team_statistics(
        &self,
        season: i64,
        team_id: i64,
    ) -> Result<TeamStatisticsResponse, IngestError> {
        let url = format!(
            "{}/seasons/{}/types/2/teams/{}/statistics",
            self.core_base, season, team_id
        );
        self.get_json(url).await
    }

    pub async fn game_odds(&self, event_id: i64) -> Result<OddsResponse, IngestError> {
        let url = format!(
            "{}/events/{}/competitions/{}/odds",
            self.core_base, event_id, event_id
        );
        self.get_json(url).await
    }

    pub async fn win_probability(
        &self,
        event_id: i64,
        home_team_id: i64,
    ) -> Result<PowerIndexResponse, IngestError> {
        let url = format!(
            "{}/events/{}/competitions/{}/powerindex/{}",
            self.core_base, event_id, event_id, home_team_id
        );
        self.get_json(url).await
    }

    pub async fn athlete_gamelog(&self, athlete_id: i64) -> Result<GamelogResponse, IngestError> {
        let url = format!("{}/athletes/{}/gamelog", self.web_base, athlete_id);
        self.get_json(url).await
    }

    pub async fn athlete_overview(
        &self,
        athlete_id: i64,
    ) -> Result<AthleteOverviewResponse, IngestError> {
        let url = format!("{}/athletes/{}", self.web_base, athlete_id);
        self.get_json(url).await
    }

    pub async fn season_schedule(&self, year: i64) -> Result<ScheduleResponse, IngestError> {
        let url = format!("{}/schedule?xhr=1&year={}", self.cdn_base, year);
        self.get_json(url).await
    }
}

// ── Value helpers ────────────────────────────────────────────────────────────

/// Parse the provider's timestamp flavors: RFC 3339, or the minute-precision
/// `2024-09-15T17:00Z` shape the event endpoints use.
pub fn parse_provider_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%MZ") {
        return Some(naive.and_utc());
    }
    None
}

/// Numeric value of a game-log cell. Cells arrive as JSON numbers or as
/// display strings like "1,024"; "--" marks a stat the athlete has no value
/// for.
pub fn stat_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => {
            let cleaned = s.replace(',', "");
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

pub fn stat_display(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

/// Whether a game-log cell carries data at all.
pub fn stat_present(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::String(s) => !s.is_empty() && s != "--",
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minute_precision_timestamps() {
        let dt = parse_provider_datetime("2024-09-15T17:00Z").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-09-15T17:00:00+00:00");
    }

    #[test]
    fn parses_rfc3339_timestamps() {
        assert!(parse_provider_datetime("2024-09-04T07:00:00Z").is_some());
        assert!(parse_provider_datetime("not a date").is_none());
    }

    #[test]
    fn stat_cells_with_separators_parse_numerically() {
        let v = serde_json::Value::String("3,928".to_string());
        assert_eq!(stat_number(&v), Some(3928.0));
        assert!(stat_present(&v));
    }

    #[test]
    fn empty_stat_cells_are_absent() {
        assert!(!stat_present(&serde_json::Value::String("--".to_string())));
        assert!(!stat_present(&serde_json::Value::Null));
    }
}
