//! Time-window selection: which calendar week is "current", and which games
//! are close enough to kickoff to deserve high-frequency refreshes.
//!
//! Everything here is a pure function of an explicitly passed `now`; nothing
//! is computed once at process start, so a long-running scheduler can never
//! go stale across a season boundary.

use chrono::{DateTime, Datelike, Duration, Utc};
use sqlx::SqlitePool;

use crate::config::RefreshWindows;
use crate::error::IngestError;
use crate::models::CalendarWeek;

pub const SEASON_TYPE_PRE: i64 = 1;
pub const SEASON_TYPE_REGULAR: i64 = 2;
pub const SEASON_TYPE_POST: i64 = 3;

// League calendar facts, not tuning: the season wraps the new year, the
// off-season runs from after the championship game to the summer, and
// training camps open in July.
const OFF_SEASON_MONTHS: std::ops::RangeInclusive<u32> = 2..=6;
const PRE_SEASON_MONTHS: std::ops::RangeInclusive<u32> = 7..=8;

/// Season year a timestamp belongs to. A season is named for the year it
/// starts in, and its postseason spills into the next calendar year, so the
/// year is taken 150 days back from `now`.
pub fn season_for(now: DateTime<Utc>) -> i64 {
    (now - Duration::days(150)).year() as i64
}

/// The calendar week containing `now`, stretched past its end date by
/// `grace_days` to smooth the Tuesday-to-Tuesday week boundary.
///
/// When no week contains `now` the fallback ladder applies, in order:
/// off-season months fall back to the most recent post-season week on
/// record; pre-season months to the earliest pre-season week of the current
/// season; anything else to the most-recently-started week, or the earliest
/// week on record when the schedule is entirely in the future. The ladder is
/// total: only an empty calendar fails.
pub async fn current_week(
    pool: &SqlitePool,
    now: DateTime<Utc>,
    grace_days: i64,
) -> Result<CalendarWeek, IngestError> {
    let season = season_for(now);
    let grace_cutoff = now - Duration::days(grace_days);

    let containing = sqlx::query_as::<_, CalendarWeek>(
        "SELECT * FROM calendar_weeks WHERE season = ? AND start_date <= ? AND end_date >= ? \
         ORDER BY start_date DESC LIMIT 1",
    )
    .bind(season)
    .bind(now)
    .bind(grace_cutoff)
    .fetch_optional(pool)
    .await?;
    if let Some(week) = containing {
        return Ok(week);
    }

    let month = now.month();

    if OFF_SEASON_MONTHS.contains(&month) {
        let last_postseason = sqlx::query_as::<_, CalendarWeek>(
            "SELECT * FROM calendar_weeks WHERE season_type_id = ? \
             ORDER BY season DESC, start_date DESC LIMIT 1",
        )
        .bind(SEASON_TYPE_POST)
        .fetch_optional(pool)
        .await?;
        if let Some(week) = last_postseason {
            return Ok(week);
        }
    }

    if PRE_SEASON_MONTHS.contains(&month) {
        let first_preseason = sqlx::query_as::<_, CalendarWeek>(
            "SELECT * FROM calendar_weeks WHERE season = ? AND season_type_id = ? \
             ORDER BY start_date ASC LIMIT 1",
        )
        .bind(season)
        .bind(SEASON_TYPE_PRE)
        .fetch_optional(pool)
        .await?;
        if let Some(week) = first_preseason {
            return Ok(week);
        }
    }

    let most_recent = sqlx::query_as::<_, CalendarWeek>(
        "SELECT * FROM calendar_weeks WHERE start_date <= ? ORDER BY start_date DESC LIMIT 1",
    )
    .bind(now)
    .fetch_optional(pool)
    .await?;
    if let Some(week) = most_recent {
        return Ok(week);
    }

    let earliest = sqlx::query_as::<_, CalendarWeek>(
        "SELECT * FROM calendar_weeks ORDER BY start_date ASC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    earliest.ok_or(IngestError::NoScheduleData)
}

/// Window for the live-game job: wide margins on both sides of kickoff so
/// odds keep moving before the game and scores settle after it.
pub fn live_window(now: DateTime<Utc>, w: &RefreshWindows) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now - Duration::minutes(w.live_lookback_mins),
        now + Duration::minutes(w.live_lookahead_mins),
    )
}

/// Window for the in-game player-stat job.
pub fn stats_window(now: DateTime<Utc>, w: &RefreshWindows) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now - Duration::minutes(w.stats_lookback_mins),
        now + Duration::minutes(w.stats_lookahead_mins),
    )
}

/// Window for post-game finalization: games that kicked off long enough ago
/// to be definitively over. Both bounds are in the past.
pub fn finished_window(now: DateTime<Utc>, w: &RefreshWindows) -> (DateTime<Utc>, DateTime<Utc>) {
    (
        now - Duration::minutes(w.finished_start_mins),
        now - Duration::minutes(w.finished_end_mins),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::reconcile::reconcile_week;
    use crate::models::WeekPatch;
    use chrono::TimeZone;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::db::init_schema(&pool).await.unwrap();
        pool
    }

    async fn seed_week(
        pool: &SqlitePool,
        name: &str,
        season: i64,
        season_type_id: i64,
        week_num: i64,
        start: (i32, u32, u32),
        end: (i32, u32, u32),
    ) {
        reconcile_week(
            pool,
            name,
            &WeekPatch {
                week_num: Some(week_num),
                season: Some(season),
                season_type_id: Some(season_type_id),
                start_date: Some(Utc.with_ymd_and_hms(start.0, start.1, start.2, 7, 0, 0).unwrap()),
                end_date: Some(Utc.with_ymd_and_hms(end.0, end.1, end.2, 6, 59, 0).unwrap()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    #[test]
    fn season_is_named_for_its_starting_year() {
        assert_eq!(season_for(Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap()), 2024);
        // January playoff football still belongs to the prior year's season
        assert_eq!(season_for(Utc.with_ymd_and_hms(2025, 1, 12, 0, 0, 0).unwrap()), 2024);
        assert_eq!(season_for(Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap()), 2025);
    }

    #[tokio::test]
    async fn picks_the_week_containing_now() {
        let pool = test_pool().await;
        seed_week(&pool, "2024 Week 1", 2024, SEASON_TYPE_REGULAR, 1, (2024, 9, 4), (2024, 9, 10)).await;
        seed_week(&pool, "2024 Week 2", 2024, SEASON_TYPE_REGULAR, 2, (2024, 9, 10), (2024, 9, 17)).await;

        let now = Utc.with_ymd_and_hms(2024, 9, 12, 18, 0, 0).unwrap();
        let week = current_week(&pool, now, 2).await.unwrap();
        assert_eq!(week.name, "2024 Week 2");
    }

    #[tokio::test]
    async fn season_rollover_prefers_the_week_of_the_current_season() {
        let pool = test_pool().await;
        seed_week(&pool, "2024 Week 3", 2024, SEASON_TYPE_REGULAR, 3, (2024, 9, 17), (2024, 9, 24)).await;
        seed_week(&pool, "2025 Week 3", 2025, SEASON_TYPE_REGULAR, 3, (2025, 9, 16), (2025, 9, 23)).await;

        let now = Utc.with_ymd_and_hms(2025, 9, 18, 12, 0, 0).unwrap();
        let week = current_week(&pool, now, 2).await.unwrap();
        assert_eq!(week.season, 2025);
    }

    #[tokio::test]
    async fn grace_period_keeps_a_just_ended_week_current() {
        let pool = test_pool().await;
        seed_week(&pool, "2024 Week 5", 2024, SEASON_TYPE_REGULAR, 5, (2024, 10, 1), (2024, 10, 8)).await;

        // A day past the end date, inside the 2-day grace period.
        let now = Utc.with_ymd_and_hms(2024, 10, 9, 12, 0, 0).unwrap();
        let week = current_week(&pool, now, 2).await.unwrap();
        assert_eq!(week.name, "2024 Week 5");
    }

    #[tokio::test]
    async fn summer_with_no_preseason_rows_falls_back_deterministically() {
        // Calendar holds only 2024 regular-season weeks; July has no current
        // week, no post-season rows, no pre-season rows. The ladder must
        // still produce a week.
        let pool = test_pool().await;
        seed_week(&pool, "2024 Week 1", 2024, SEASON_TYPE_REGULAR, 1, (2024, 9, 4), (2024, 9, 10)).await;
        seed_week(&pool, "2024 Week 18", 2024, SEASON_TYPE_REGULAR, 18, (2025, 1, 1), (2025, 1, 8)).await;

        let now = Utc.with_ymd_and_hms(2024, 7, 15, 12, 0, 0).unwrap();
        let week = current_week(&pool, now, 2).await.unwrap();
        assert_eq!(week.name, "2024 Week 1");
    }

    #[tokio::test]
    async fn off_season_falls_back_to_the_latest_postseason_week() {
        let pool = test_pool().await;
        seed_week(&pool, "2024 Week 18", 2024, SEASON_TYPE_REGULAR, 18, (2025, 1, 1), (2025, 1, 8)).await;
        seed_week(&pool, "Wild Card", 2024, SEASON_TYPE_POST, 1, (2025, 1, 11), (2025, 1, 14)).await;
        seed_week(&pool, "Super Bowl", 2024, SEASON_TYPE_POST, 5, (2025, 2, 9), (2025, 2, 10)).await;

        let now = Utc.with_ymd_and_hms(2025, 4, 20, 12, 0, 0).unwrap();
        let week = current_week(&pool, now, 2).await.unwrap();
        assert_eq!(week.name, "Super Bowl");
    }

    #[tokio::test]
    async fn empty_calendar_is_the_only_failure() {
        let pool = test_pool().await;
        let now = Utc.with_ymd_and_hms(2024, 10, 1, 0, 0, 0).unwrap();
        let err = current_week(&pool, now, 2).await.unwrap_err();
        assert!(matches!(err, IngestError::NoScheduleData));
    }

    #[test]
    fn windows_are_independently_shaped() {
        let w = RefreshWindows::default();
        let now = Utc.with_ymd_and_hms(2024, 9, 15, 20, 0, 0).unwrap();

        let (live_start, live_end) = live_window(now, &w);
        assert_eq!((now - live_start).num_hours(), 4);
        assert_eq!((live_end - now).num_hours(), 5);

        let (stats_start, stats_end) = stats_window(now, &w);
        assert_eq!((now - stats_start).num_minutes(), 10);
        assert_eq!((stats_end - now).num_hours(), 4);

        let (fin_start, fin_end) = finished_window(now, &w);
        assert_eq!((now - fin_start).num_minutes(), 270);
        assert_eq!((now - fin_end).num_minutes(), 210);
        assert!(fin_start < fin_end);
    }
}
