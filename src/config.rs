use std::env;

/// Bounds of the three refresh windows, in minutes relative to "now".
///
/// The live, stats and finished windows are deliberately different widths
/// per job and tuned independently. All six offsets can be overridden from
/// the environment.
#[derive(Debug, Clone)]
pub struct RefreshWindows {
    /// Live-game window: kickoff between `now - lookback` and `now + lookahead`.
    pub live_lookback_mins: i64,
    pub live_lookahead_mins: i64,
    /// Stat-refresh window around in-progress games.
    pub stats_lookback_mins: i64,
    pub stats_lookahead_mins: i64,
    /// Finalization window: games that kicked off long enough ago to be over.
    /// Both offsets are in the past; start > end.
    pub finished_start_mins: i64,
    pub finished_end_mins: i64,
}

impl Default for RefreshWindows {
    fn default() -> Self {
        Self {
            live_lookback_mins: 240,
            live_lookahead_mins: 300,
            stats_lookback_mins: 10,
            stats_lookahead_mins: 240,
            finished_start_mins: 270,
            finished_end_mins: 210,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    /// sports.core API: teams, events, odds, power index, records, statistics.
    pub core_api_base: String,
    /// site API: team rosters.
    pub site_api_base: String,
    /// site.web API: athlete game logs.
    pub web_api_base: String,
    /// cdn API: season schedule calendar, game packages.
    pub cdn_api_base: String,
    pub http_timeout_secs: u64,
    /// Days past a week's end date during which it still counts as current.
    pub week_grace_days: i64,
    pub windows: RefreshWindows,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:data/gridiron.db".to_string()),
            core_api_base: env::var("CORE_API_BASE").unwrap_or_else(|_| {
                "https://sports.core.api.espn.com/v2/sports/football/leagues/nfl".to_string()
            }),
            site_api_base: env::var("SITE_API_BASE").unwrap_or_else(|_| {
                "https://site.api.espn.com/apis/site/v2/sports/football/nfl".to_string()
            }),
            web_api_base: env::var("WEB_API_BASE").unwrap_or_else(|_| {
                "https://site.web.api.espn.com/apis/common/v3/sports/football/nfl".to_string()
            }),
            cdn_api_base: env::var("CDN_API_BASE")
                .unwrap_or_else(|_| "https://cdn.espn.com/core/nfl".to_string()),
            http_timeout_secs: env_u64("HTTP_TIMEOUT_SECS", 10),
            week_grace_days: env_i64("WEEK_GRACE_DAYS", 2),
            windows: RefreshWindows {
                live_lookback_mins: env_i64("LIVE_LOOKBACK_MINS", 240),
                live_lookahead_mins: env_i64("LIVE_LOOKAHEAD_MINS", 300),
                stats_lookback_mins: env_i64("STATS_LOOKBACK_MINS", 10),
                stats_lookahead_mins: env_i64("STATS_LOOKAHEAD_MINS", 240),
                finished_start_mins: env_i64("FINISHED_START_MINS", 270),
                finished_end_mins: env_i64("FINISHED_END_MINS", 210),
            },
        }
    }
}

fn env_i64(key: &str, default: i64) -> i64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
