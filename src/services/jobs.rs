//! The refresh orchestrator: named jobs, each bound to a cadence, each a
//! stateless linear sweep of select-scope → fetch → reconcile.
//!
//! The contract that matters is per-item isolation: one item's fetch or
//! parse failure is logged with its id and the sweep continues. Store
//! failures abort the invocation and surface to the trigger; there is no
//! internal retry or backoff. Jobs of different cadences may overlap on the
//! same rows — last write wins, and the merge reconciler keeps partial
//! payloads from clobbering fields they did not carry.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::db::{self, reconcile};
use crate::error::IngestError;
use crate::models::*;
use crate::services::espn::{self, SourceClient};
use crate::services::{schedule, stat_map};
use crate::utils::extract_ref_id;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshJob {
    TeamSync,
    ScheduleSync,
    GameSync,
    LiveGameRefresh,
    OddsRefresh,
    PlayerStatRefresh,
    PlayerStatFinalize,
    RosterSync,
    TeamRecordRefresh,
    TeamStatRefresh,
    AthleteStatusRefresh,
}

impl RefreshJob {
    pub const ALL: [RefreshJob; 11] = [
        RefreshJob::TeamSync,
        RefreshJob::ScheduleSync,
        RefreshJob::GameSync,
        RefreshJob::LiveGameRefresh,
        RefreshJob::OddsRefresh,
        RefreshJob::PlayerStatRefresh,
        RefreshJob::PlayerStatFinalize,
        RefreshJob::RosterSync,
        RefreshJob::TeamRecordRefresh,
        RefreshJob::TeamStatRefresh,
        RefreshJob::AthleteStatusRefresh,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RefreshJob::TeamSync => "team-sync",
            RefreshJob::ScheduleSync => "schedule-sync",
            RefreshJob::GameSync => "game-sync",
            RefreshJob::LiveGameRefresh => "live-game-refresh",
            RefreshJob::OddsRefresh => "odds-refresh",
            RefreshJob::PlayerStatRefresh => "player-stat-refresh",
            RefreshJob::PlayerStatFinalize => "player-stat-finalize",
            RefreshJob::RosterSync => "roster-sync",
            RefreshJob::TeamRecordRefresh => "team-record-refresh",
            RefreshJob::TeamStatRefresh => "team-stat-refresh",
            RefreshJob::AthleteStatusRefresh => "athlete-status-refresh",
        }
    }

    pub fn from_name(name: &str) -> Option<RefreshJob> {
        RefreshJob::ALL.into_iter().find(|job| job.name() == name)
    }

    pub fn cadence_mins(&self) -> u64 {
        match self {
            RefreshJob::LiveGameRefresh => 1,
            RefreshJob::PlayerStatRefresh => 10,
            RefreshJob::GameSync
            | RefreshJob::OddsRefresh
            | RefreshJob::TeamRecordRefresh
            | RefreshJob::TeamStatRefresh => 60,
            RefreshJob::TeamSync
            | RefreshJob::ScheduleSync
            | RefreshJob::PlayerStatFinalize
            | RefreshJob::RosterSync
            | RefreshJob::AthleteStatusRefresh => 1440,
        }
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct JobReport {
    pub created: u64,
    pub updated: u64,
    pub failed: u64,
}

impl JobReport {
    fn record(&mut self, created: bool) {
        if created {
            self.created += 1;
        } else {
            self.updated += 1;
        }
    }
}

pub struct JobContext {
    pub pool: SqlitePool,
    pub client: SourceClient,
    pub config: AppConfig,
}

/// Single entry point per job name; this is what the external trigger
/// invokes. `now` is passed explicitly so every run is a pure function of
/// the clock it was handed.
pub async fn run_job(
    job: RefreshJob,
    ctx: &JobContext,
    now: DateTime<Utc>,
) -> Result<JobReport, IngestError> {
    debug!(job = job.name(), "refresh job starting");

    let report = match job {
        RefreshJob::TeamSync => team_sync(ctx, now).await?,
        RefreshJob::ScheduleSync => schedule_sync(ctx, now).await?,
        RefreshJob::GameSync => game_sync(ctx, now).await?,
        RefreshJob::LiveGameRefresh => live_game_refresh(ctx, now).await?,
        RefreshJob::OddsRefresh => odds_refresh(ctx, now).await?,
        RefreshJob::PlayerStatRefresh => {
            let window = schedule::stats_window(now, &ctx.config.windows);
            player_stat_sweep(ctx, now, window).await?
        }
        RefreshJob::PlayerStatFinalize => {
            let window = schedule::finished_window(now, &ctx.config.windows);
            player_stat_sweep(ctx, now, window).await?
        }
        RefreshJob::RosterSync => roster_sync(ctx).await?,
        RefreshJob::TeamRecordRefresh => team_record_refresh(ctx, now).await?,
        RefreshJob::TeamStatRefresh => team_stat_refresh(ctx, now).await?,
        RefreshJob::AthleteStatusRefresh => athlete_status_refresh(ctx).await?,
    };

    info!(
        job = job.name(),
        created = report.created,
        updated = report.updated,
        failed = report.failed,
        "refresh job finished"
    );
    Ok(report)
}

/// Run every job on its cadence until ctrl-c. Jobs sharing a cadence run
/// sequentially within one loop; loops of different cadences overlap freely.
pub async fn run_scheduler(ctx: Arc<JobContext>) -> anyhow::Result<()> {
    let mut by_cadence: BTreeMap<u64, Vec<RefreshJob>> = BTreeMap::new();
    for job in RefreshJob::ALL {
        by_cadence.entry(job.cadence_mins()).or_default().push(job);
    }

    let mut handles = Vec::new();
    for (mins, jobs) in by_cadence {
        let ctx = Arc::clone(&ctx);
        handles.push(tokio::spawn(async move {
            let mut interval = tokio::time::interval(StdDuration::from_secs(mins * 60));
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                for job in &jobs {
                    if let Err(e) = run_job(*job, &ctx, Utc::now()).await {
                        error!(job = job.name(), error = %e, "job invocation failed");
                    }
                }
            }
        }));
    }

    info!("scheduler running; ctrl-c to stop");
    tokio::signal::ctrl_c().await?;
    info!("scheduler shutting down");
    for handle in handles {
        handle.abort();
    }
    Ok(())
}

// ── team-sync ────────────────────────────────────────────────────────────────

async fn team_sync(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let season = schedule::season_for(now);

    // Placeholder rows for playoff slots that have no decided participant.
    for team_id in TBD_TEAM_IDS {
        let patch = TeamPatch {
            team_name: Some("TBD".to_string()),
            short_name: Some("TBD".to_string()),
            ..Default::default()
        };
        let (_, created) = reconcile::reconcile_team(&ctx.pool, team_id, &patch).await?;
        report.record(created);
    }

    for item in ctx.client.season_teams(season).await? {
        match sync_one_team(ctx, season, &item.reference).await {
            Ok(created) => report.record(created),
            Err(e) if e.is_item_recoverable() => {
                warn!(reference = %item.reference, error = %e, "team sync: skipping team");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

async fn sync_one_team(
    ctx: &JobContext,
    season: i64,
    reference: &str,
) -> Result<bool, IngestError> {
    let team_id = extract_ref_id(reference, "teams")?;
    let detail = ctx.client.team_detail(season, team_id).await?;
    let patch = TeamPatch {
        team_name: Some(detail.display_name),
        short_name: detail.abbreviation,
        ..Default::default()
    };
    let (_, created) = reconcile::reconcile_team(&ctx.pool, team_id, &patch).await?;
    Ok(created)
}

// ── schedule-sync ────────────────────────────────────────────────────────────

async fn schedule_sync(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let season = schedule::season_for(now);
    let response = ctx.client.season_schedule(season).await?;
    let calendar = response.content.map(|c| c.calendar).unwrap_or_default();

    for section in calendar {
        let Some(type_id) = section.value.as_deref().and_then(|v| v.parse::<i64>().ok()) else {
            continue;
        };
        if !(schedule::SEASON_TYPE_PRE..=schedule::SEASON_TYPE_POST).contains(&type_id) {
            continue;
        }
        for entry in &section.entries {
            match reconcile_week_entry(ctx, season, type_id, section.label.as_deref(), entry).await
            {
                Ok(created) => report.record(created),
                Err(e) if e.is_item_recoverable() => {
                    warn!(
                        week = entry.alternate_label.as_deref().unwrap_or("?"),
                        error = %e,
                        "schedule sync: skipping week entry"
                    );
                    report.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(report)
}

async fn reconcile_week_entry(
    ctx: &JobContext,
    season: i64,
    season_type_id: i64,
    season_type_name: Option<&str>,
    entry: &espn::CalendarEntry,
) -> Result<bool, IngestError> {
    let format_err = |context: &str| IngestError::SourceFormat {
        endpoint: "season schedule entry".to_string(),
        context: context.to_string(),
    };

    let name = entry
        .alternate_label
        .clone()
        .or_else(|| entry.label.clone())
        .ok_or_else(|| format_err("missing week label"))?;
    let week_num = entry
        .value
        .as_deref()
        .and_then(|v| v.parse::<i64>().ok())
        .ok_or_else(|| format_err("missing week number"))?;
    let start_date = entry
        .start_date
        .as_deref()
        .and_then(espn::parse_provider_datetime)
        .ok_or_else(|| format_err("missing start date"))?;
    let end_date = entry
        .end_date
        .as_deref()
        .and_then(espn::parse_provider_datetime)
        .ok_or_else(|| format_err("missing end date"))?;

    let patch = WeekPatch {
        details: entry.detail.clone(),
        week_num: Some(week_num),
        season: Some(season),
        season_type_id: Some(season_type_id),
        season_type_name: season_type_name.map(str::to_string),
        start_date: Some(start_date),
        end_date: Some(end_date),
    };
    let (_, created) = reconcile::reconcile_week(&ctx.pool, &name, &patch).await?;
    Ok(created)
}

// ── game-sync ────────────────────────────────────────────────────────────────

async fn game_sync(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let weeks = db::weeks_ending_after(&ctx.pool, now).await?;

    for week in &weeks {
        let events = match ctx
            .client
            .week_events(week.season, week.season_type_id, week.week_num)
            .await
        {
            Ok(events) => events,
            Err(e) if e.is_item_recoverable() => {
                warn!(week = %week.name, error = %e, "game sync: skipping week");
                report.failed += 1;
                continue;
            }
            Err(e) => return Err(e),
        };

        for item in events {
            match sync_one_event(ctx, week, &item.reference).await {
                Ok(created) => report.record(created),
                Err(e) if e.is_item_recoverable() => {
                    warn!(reference = %item.reference, error = %e, "game sync: skipping event");
                    report.failed += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
    Ok(report)
}

async fn sync_one_event(
    ctx: &JobContext,
    week: &CalendarWeek,
    reference: &str,
) -> Result<bool, IngestError> {
    let event_id = extract_ref_id(reference, "events")?;
    let event = ctx.client.event_detail(event_id).await?;

    let format_err = |context: String| IngestError::SourceFormat {
        endpoint: format!("event {}", event_id),
        context,
    };

    let competition = event
        .competitions
        .first()
        .ok_or_else(|| format_err("no competitions".to_string()))?;

    let team_ref = |side: &str| -> Result<i64, IngestError> {
        let competitor = competition
            .competitors
            .iter()
            .find(|c| c.home_away.as_deref() == Some(side))
            .ok_or_else(|| format_err(format!("no {} competitor", side)))?;
        let team = competitor
            .team
            .as_ref()
            .ok_or_else(|| format_err(format!("{} competitor has no team", side)))?;
        extract_ref_id(&team.reference, "teams")
    };
    let home_team_id = team_ref("home")?;
    let away_team_id = team_ref("away")?;

    // Reconciliation keys must reference synced teams; a gap here means the
    // team-sync job has not seen this id yet, so skip the event this sweep.
    for team_id in [home_team_id, away_team_id] {
        if db::get_team(&ctx.pool, team_id).await?.is_none() {
            return Err(format_err(format!("team {} not yet synced", team_id)));
        }
    }

    let game_datetime = event
        .date
        .as_deref()
        .and_then(espn::parse_provider_datetime)
        .ok_or_else(|| format_err("missing event date".to_string()))?;

    let patch = GamePatch {
        short_name: event.short_name.clone(),
        game_datetime: Some(game_datetime),
        season: Some(week.season),
        week_num: Some(week.week_num),
        home_team_id: Some(home_team_id),
        away_team_id: Some(away_team_id),
        week_name: Some(week.name.clone()),
    };
    let (_, created) = reconcile::reconcile_game(&ctx.pool, event_id, &patch).await?;
    Ok(created)
}

// ── live-game-refresh ────────────────────────────────────────────────────────

async fn live_game_refresh(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let (start, end) = schedule::live_window(now, &ctx.config.windows);
    let games = db::games_with_kickoff_between(&ctx.pool, start, end).await?;

    if games.is_empty() {
        debug!("live refresh: no games in window");
        return Ok(report);
    }

    for game in &games {
        match refresh_live_game(ctx, game, now).await {
            Ok(created) => report.record(created),
            Err(e) if e.is_item_recoverable() => {
                warn!(event_id = game.event_id, error = %e, "live refresh: skipping game");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

/// Kickoff time and participants can both still change close to game time
/// (flexed start, playoff seeding replacing a placeholder team), so the live
/// sweep re-reads the game package before refreshing both outcome groups.
async fn refresh_live_game(
    ctx: &JobContext,
    game: &Game,
    now: DateTime<Utc>,
) -> Result<bool, IngestError> {
    let package = ctx.client.game_package(game.event_id).await?;
    let competition = package
        .gamepackage_json
        .and_then(|g| g.header)
        .and_then(|h| h.competitions.into_iter().next());

    if let Some(competition) = competition {
        let side_id = |side: &str| {
            competition
                .competitors
                .iter()
                .find(|c| c.home_away.as_deref() == Some(side))
                .and_then(|c| c.id.as_deref())
                .and_then(|id| id.parse::<i64>().ok())
        };

        let patch = GamePatch {
            game_datetime: competition
                .date
                .as_deref()
                .and_then(espn::parse_provider_datetime),
            home_team_id: side_id("home"),
            away_team_id: side_id("away"),
            ..Default::default()
        };
        reconcile::reconcile_game(&ctx.pool, game.event_id, &patch).await?;
    }

    let mut created = refresh_game_odds(ctx, game, now).await?;
    created |= refresh_game_probability(ctx, game, now).await?;
    Ok(created)
}

async fn refresh_game_odds(
    ctx: &JobContext,
    game: &Game,
    now: DateTime<Utc>,
) -> Result<bool, IngestError> {
    let odds = ctx.client.game_odds(game.event_id).await?;
    let Some(first) = odds.items.first() else {
        return Ok(false);
    };
    let Some(details) = first.details.clone() else {
        return Ok(false);
    };

    let patch = OutcomePatch {
        spread_display: Some(details),
        spread: first.spread.map(|s| s as i64),
        last_updated: Some(now),
        ..Default::default()
    };
    let (_, created) = reconcile::reconcile_outcome(&ctx.pool, game.event_id, &patch).await?;
    Ok(created)
}

async fn refresh_game_probability(
    ctx: &JobContext,
    game: &Game,
    now: DateTime<Utc>,
) -> Result<bool, IngestError> {
    let index = ctx
        .client
        .win_probability(game.event_id, game.home_team_id)
        .await?;
    let pred_diff = index.stats.first().and_then(|s| s.value);
    let Some(home_win_prob) = index.stats.get(1).and_then(|s| s.value) else {
        return Ok(false);
    };

    let patch = OutcomePatch {
        pred_diff,
        home_win_prob: Some(home_win_prob),
        away_win_prob: Some(100.0 - home_win_prob),
        last_updated: Some(now),
        ..Default::default()
    };
    let (_, created) = reconcile::reconcile_outcome(&ctx.pool, game.event_id, &patch).await?;
    Ok(created)
}

// ── odds-refresh ─────────────────────────────────────────────────────────────

async fn odds_refresh(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    // A calendar gap aborts this invocation only; the trigger retries on its
    // own cadence.
    let week = schedule::current_week(&ctx.pool, now, ctx.config.week_grace_days).await?;
    let games = db::games_for_week_name(&ctx.pool, &week.name).await?;

    for game in &games {
        let result = async {
            let mut created = refresh_game_odds(ctx, game, now).await?;
            created |= refresh_game_probability(ctx, game, now).await?;
            Ok::<bool, IngestError>(created)
        }
        .await;

        match result {
            Ok(created) => report.record(created),
            Err(e) if e.is_item_recoverable() => {
                warn!(event_id = game.event_id, error = %e, "odds refresh: skipping game");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

// ── player stat sweeps ───────────────────────────────────────────────────────

async fn player_stat_sweep(
    ctx: &JobContext,
    now: DateTime<Utc>,
    window: (DateTime<Utc>, DateTime<Utc>),
) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let games = db::games_with_kickoff_between(&ctx.pool, window.0, window.1).await?;

    if games.is_empty() {
        debug!("stat sweep: no games in window");
        return Ok(report);
    }

    let mut team_ids: Vec<i64> = Vec::new();
    for game in &games {
        for team_id in [game.home_team_id, game.away_team_id] {
            if !team_ids.contains(&team_id) {
                team_ids.push(team_id);
            }
        }
    }

    let mut athletes = Vec::new();
    for team_id in &team_ids {
        athletes.extend(db::athletes_for_team(&ctx.pool, *team_id).await?);
    }
    info!(
        games = games.len(),
        athletes = athletes.len(),
        "stat sweep: refreshing athletes from games in window"
    );

    let season = schedule::season_for(now);
    for athlete in &athletes {
        match refresh_athlete_stats(ctx, athlete, season, now).await {
            Ok(created) => report.record(created),
            Err(e) if e.is_item_recoverable() => {
                warn!(athlete_id = athlete.athlete_id, error = %e, "stat sweep: skipping athlete");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

/// Pull one athlete's game log and reconcile every stat row it yields for
/// the requested season: season totals and per-game lines, with the
/// positional values resolved through the stat name mapping.
async fn refresh_athlete_stats(
    ctx: &JobContext,
    athlete: &Athlete,
    season: i64,
    now: DateTime<Utc>,
) -> Result<bool, IngestError> {
    let log = ctx.client.athlete_gamelog(athlete.athlete_id).await?;

    // Backfill the display name when the roster feed never carried one.
    if athlete.display_name.is_none() {
        if let Some(name) = log.athlete.as_ref().and_then(|a| a.display_name.clone()) {
            let patch = AthletePatch {
                display_name: Some(name),
                ..Default::default()
            };
            reconcile::reconcile_athlete(&ctx.pool, athlete.athlete_id, &patch).await?;
        }
    }

    let mut wrote_any = false;
    let season_label = season.to_string();

    for season_type in &log.season_types {
        let Some(display) = &season_type.display_name else {
            continue;
        };
        if !display.contains(&season_label) {
            continue;
        }
        let season_type_name = if display.to_lowercase().contains("postseason") {
            "Postseason"
        } else {
            "Regular Season"
        };

        for category in &season_type.categories {
            let category_name = category
                .display_name
                .clone()
                .unwrap_or_else(|| "general".to_string())
                .to_lowercase();

            for (index, value) in category.totals.iter().enumerate() {
                if !espn::stat_present(value) {
                    continue;
                }
                let key = SeasonStatKey {
                    athlete_id: athlete.athlete_id,
                    season_year: season,
                    season_type: season_type_name.to_string(),
                    category_name: category_name.clone(),
                    stat_name: stat_map::stat_name_for(
                        &category_name,
                        athlete.position.as_deref(),
                        index,
                    ),
                };
                let patch = StatValuePatch {
                    stat_value: espn::stat_number(value),
                    stat_display_value: espn::stat_display(value),
                    last_updated: Some(now),
                };
                let (_, created) =
                    reconcile::reconcile_season_stat(&ctx.pool, &key, &patch).await?;
                wrote_any |= created;
            }

            for event in &category.events {
                let Some(event_id) = event.event_id.as_deref().and_then(|id| id.parse::<i64>().ok())
                else {
                    continue;
                };
                let meta = event.event_id.as_deref().and_then(|id| log.events.get(id));
                let game_date = meta
                    .and_then(|m| m.game_date.as_deref())
                    .and_then(espn::parse_provider_datetime)
                    .map(|dt| dt.date_naive());
                let opponent = meta
                    .and_then(|m| m.opponent.as_ref())
                    .and_then(|o| o.abbreviation.clone());

                for (index, value) in event.stats.iter().enumerate() {
                    if !espn::stat_present(value) {
                        continue;
                    }
                    let key = GameStatKey {
                        athlete_id: athlete.athlete_id,
                        event_id,
                        category_name: category_name.clone(),
                        stat_name: stat_map::stat_name_for(
                            &category_name,
                            athlete.position.as_deref(),
                            index,
                        ),
                    };
                    let patch = GameStatPatch {
                        game_date,
                        opponent: opponent.clone(),
                        stat_value: espn::stat_number(value),
                        stat_display_value: espn::stat_display(value),
                        last_updated: Some(now),
                    };
                    let (_, created) =
                        reconcile::reconcile_game_stat(&ctx.pool, &key, &patch).await?;
                    wrote_any |= created;
                }
            }
        }
    }
    Ok(wrote_any)
}

// ── roster-sync ──────────────────────────────────────────────────────────────

async fn roster_sync(ctx: &JobContext) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let teams = db::get_all_teams(&ctx.pool).await?;

    for team in &teams {
        // Placeholder teams have no roster to fetch.
        if TBD_TEAM_IDS.contains(&team.team_id) {
            continue;
        }
        match sync_team_roster(ctx, team).await {
            Ok(sub) => {
                report.created += sub.created;
                report.updated += sub.updated;
            }
            Err(e) if e.is_item_recoverable() => {
                warn!(team_id = team.team_id, error = %e, "roster sync: skipping team");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

async fn sync_team_roster(ctx: &JobContext, team: &Team) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let roster = ctx.client.team_roster(team.team_id).await?;
    let mut seen_ids: Vec<i64> = Vec::new();

    for group in &roster.athletes {
        for entry in &group.items {
            let Ok(athlete_id) = entry.id.parse::<i64>() else {
                warn!(team_id = team.team_id, id = %entry.id, "roster sync: unparseable athlete id");
                report.failed += 1;
                continue;
            };
            let patch = roster_athlete_patch(team.team_id, entry);
            let (_, created) =
                reconcile::reconcile_athlete(&ctx.pool, athlete_id, &patch).await?;
            seen_ids.push(athlete_id);
            report.record(created);
        }
    }

    let orphaned = db::orphan_missing_athletes(&ctx.pool, team.team_id, &seen_ids).await?;
    if orphaned > 0 {
        info!(team = %team.team_name, orphaned, "roster sync: athletes dropped from roster");
    }
    Ok(report)
}

fn roster_athlete_patch(team_id: i64, entry: &espn::RosterAthlete) -> AthletePatch {
    AthletePatch {
        first_name: entry.first_name.clone(),
        last_name: entry.last_name.clone(),
        display_name: entry.display_name.clone(),
        jersey: entry.jersey.as_deref().and_then(|j| j.parse().ok()),
        team_id: Some(Some(team_id)),
        position_id: entry
            .position
            .as_ref()
            .and_then(|p| p.id.as_deref())
            .and_then(|id| id.parse().ok()),
        position: entry.position.as_ref().and_then(|p| p.name.clone()),
        position_abbreviation: entry
            .position
            .as_ref()
            .and_then(|p| p.abbreviation.clone()),
        age: entry.age.map(|a| a as i64),
        weight: entry.weight.map(|w| w.round() as i64),
        height: entry.height.map(|h| h.round() as i64),
        debut_year: entry.debut_year,
        active: entry.active,
        status_id: entry
            .status
            .as_ref()
            .and_then(|s| s.id.as_deref())
            .and_then(|id| id.parse().ok()),
        status: entry.status.as_ref().and_then(|s| s.name.clone()),
        injuries: Some(injury_summary(&entry.injuries)),
    }
}

/// Joined injury statuses, or an explicit clear when the list is empty — a
/// healed athlete should not keep a stale injury note.
fn injury_summary(injuries: &[espn::InjuryEntry]) -> Option<String> {
    let statuses: Vec<&str> = injuries.iter().filter_map(|i| i.status.as_deref()).collect();
    if statuses.is_empty() {
        None
    } else {
        Some(statuses.join(", "))
    }
}

// ── team-record-refresh ──────────────────────────────────────────────────────

async fn team_record_refresh(
    ctx: &JobContext,
    now: DateTime<Utc>,
) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let season = schedule::season_for(now);
    let teams = db::get_all_teams(&ctx.pool).await?;

    for team in &teams {
        if TBD_TEAM_IDS.contains(&team.team_id) {
            continue;
        }
        let result = async {
            let record = ctx.client.team_record(season, team.team_id).await?;
            let Some(display) = record.items.first().and_then(|i| i.display_value.clone()) else {
                return Ok::<bool, IngestError>(false);
            };
            let patch = TeamPatch {
                record: Some(display),
                last_updated: Some(now),
                ..Default::default()
            };
            let (_, created) = reconcile::reconcile_team(&ctx.pool, team.team_id, &patch).await?;
            Ok(created)
        }
        .await;

        match result {
            Ok(created) => report.record(created),
            Err(e) if e.is_item_recoverable() => {
                warn!(team_id = team.team_id, error = %e, "record refresh: skipping team");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

// ── team-stat-refresh ────────────────────────────────────────────────────────

async fn team_stat_refresh(ctx: &JobContext, now: DateTime<Utc>) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let season = schedule::season_for(now);
    let teams = db::get_all_teams(&ctx.pool).await?;

    for team in &teams {
        if TBD_TEAM_IDS.contains(&team.team_id) {
            continue;
        }
        match sync_team_statistics(ctx, season, team).await {
            Ok(sub) => {
                report.created += sub.created;
                report.updated += sub.updated;
            }
            Err(e) if e.is_item_recoverable() => {
                warn!(team_id = team.team_id, error = %e, "team stats: skipping team");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

async fn sync_team_statistics(
    ctx: &JobContext,
    season: i64,
    team: &Team,
) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let response = ctx.client.team_statistics(season, team.team_id).await?;
    let Some(splits) = response.splits else {
        return Ok(report);
    };

    for category in &splits.categories {
        let Some(category_name) = &category.name else {
            continue;
        };
        for stat in &category.stats {
            let Some(stat_name) = &stat.name else {
                continue;
            };
            let key = TeamStatKey {
                team_id: team.team_id,
                category: category_name.clone(),
                stat_name: stat_name.clone(),
            };
            let patch = TeamStatPatch {
                value: stat.value,
                rank: stat.rank,
                display_rank: Some(
                    stat.rank_display_value
                        .clone()
                        .unwrap_or_else(|| "n/a".to_string()),
                ),
                description: stat.description.clone(),
            };
            let (_, created) = reconcile::reconcile_team_stat(&ctx.pool, &key, &patch).await?;
            report.record(created);
        }
    }
    Ok(report)
}

// ── athlete-status-refresh ───────────────────────────────────────────────────

async fn athlete_status_refresh(ctx: &JobContext) -> Result<JobReport, IngestError> {
    let mut report = JobReport::default();
    let athletes = db::rostered_athletes(&ctx.pool).await?;

    for athlete in &athletes {
        match refresh_athlete_status(ctx, athlete).await {
            Ok(created) => report.record(created),
            Err(e) if e.is_item_recoverable() => {
                warn!(athlete_id = athlete.athlete_id, error = %e, "status refresh: skipping athlete");
                report.failed += 1;
            }
            Err(e) => return Err(e),
        }
    }
    Ok(report)
}

async fn refresh_athlete_status(
    ctx: &JobContext,
    athlete: &Athlete,
) -> Result<bool, IngestError> {
    let overview = ctx.client.athlete_overview(athlete.athlete_id).await?;
    let Some(data) = overview.athlete else {
        return Err(IngestError::SourceFormat {
            endpoint: format!("athlete {}", athlete.athlete_id),
            context: "missing athlete body".to_string(),
        });
    };

    let patch = AthletePatch {
        first_name: data.first_name,
        last_name: data.last_name,
        display_name: data.display_name,
        position_abbreviation: data.position.as_ref().and_then(|p| p.abbreviation.clone()),
        status_id: data
            .status
            .as_ref()
            .and_then(|s| s.id.as_deref())
            .and_then(|id| id.parse().ok()),
        status: data.status.as_ref().and_then(|s| s.name.clone()),
        injuries: Some(injury_summary(&data.injuries)),
        ..Default::default()
    };
    let (_, created) = reconcile::reconcile_athlete(&ctx.pool, athlete.athlete_id, &patch).await?;
    Ok(created)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path as AxPath, routing::get, Json as AxJson, Router};
    use chrono::TimeZone;
    use serde_json::{json, Value};
    use sqlx::sqlite::SqlitePoolOptions;

    // A stub of the provider, just enough surface for the sweeps under test.
    // Event 102's odds body is deliberately undecodable and event 104 names
    // a team no sync has ever seen.

    fn team_name(team_id: i64) -> (&'static str, &'static str) {
        match team_id {
            21 => ("Philadelphia Eagles", "PHI"),
            6 => ("Dallas Cowboys", "DAL"),
            19 => ("New York Giants", "NYG"),
            12 => ("Kansas City Chiefs", "KC"),
            _ => ("Unknown", "UNK"),
        }
    }

    async fn team_list(AxPath(season): AxPath<i64>) -> AxJson<Value> {
        let items: Vec<Value> = [21, 6, 19, 12]
            .iter()
            .map(|id| {
                json!({ "$ref": format!("http://stub/seasons/{}/teams/{}?lang=en", season, id) })
            })
            .collect();
        AxJson(json!({ "items": items }))
    }

    async fn team_detail(AxPath((_season, team_id)): AxPath<(i64, i64)>) -> AxJson<Value> {
        let (name, abbreviation) = team_name(team_id);
        AxJson(json!({ "displayName": name, "abbreviation": abbreviation }))
    }

    async fn season_schedule() -> AxJson<Value> {
        AxJson(json!({
            "content": { "calendar": [
                { "value": "2", "label": "Regular Season", "entries": [
                    { "label": "Week 2", "alternateLabel": "Week 2", "detail": "Sep 10-17",
                      "value": "2", "startDate": "2024-09-10T07:00Z",
                      "endDate": "2024-09-17T06:59Z" }
                ]}
            ]}
        }))
    }

    async fn week_events() -> AxJson<Value> {
        let items: Vec<Value> = [101, 102, 103, 104]
            .iter()
            .map(|id| json!({ "$ref": format!("http://stub/events/{}?lang=en", id) }))
            .collect();
        AxJson(json!({ "items": items }))
    }

    async fn event_detail(AxPath(event_id): AxPath<i64>) -> AxJson<Value> {
        let (home, away, short_name) = match event_id {
            101 => (21, 6, "DAL @ PHI"),
            102 => (19, 12, "KC @ NYG"),
            103 => (12, 21, "PHI @ KC"),
            _ => (99, 98, "TBD @ TBD"),
        };
        let team_ref =
            |id: i64| json!({ "$ref": format!("http://stub/seasons/2024/teams/{}?lang=en", id) });
        AxJson(json!({
            "shortName": short_name,
            "date": "2024-09-15T17:00Z",
            "competitions": [{ "competitors": [
                { "homeAway": "home", "team": team_ref(home) },
                { "homeAway": "away", "team": team_ref(away) }
            ]}]
        }))
    }

    async fn game_odds(AxPath((event_id, _)): AxPath<(i64, i64)>) -> String {
        if event_id == 102 {
            // items must be a list; this body cannot decode
            r#"{"items": 42}"#.to_string()
        } else {
            json!({ "items": [{ "details": "PHI -3.5", "spread": -3.5 }] }).to_string()
        }
    }

    async fn power_index(_path: AxPath<(i64, i64, i64)>) -> AxJson<Value> {
        AxJson(json!({ "stats": [{ "value": 2.1 }, { "value": 61.0 }] }))
    }

    async fn spawn_stub() -> String {
        let app = Router::new()
            .route("/seasons/{season}/teams", get(team_list))
            .route("/seasons/{season}/teams/{team_id}", get(team_detail))
            .route(
                "/seasons/{season}/types/{type_id}/weeks/{week}/events",
                get(week_events),
            )
            .route("/events/{event_id}", get(event_detail))
            .route(
                "/events/{event_id}/competitions/{competition_id}/odds",
                get(game_odds),
            )
            .route(
                "/events/{event_id}/competitions/{competition_id}/powerindex/{team_id}",
                get(power_index),
            )
            .route("/schedule", get(season_schedule));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    async fn test_context() -> JobContext {
        let base = spawn_stub().await;
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::init_schema(&pool).await.unwrap();

        let config = AppConfig {
            database_url: "sqlite::memory:".to_string(),
            core_api_base: base.clone(),
            site_api_base: base.clone(),
            web_api_base: base.clone(),
            cdn_api_base: base,
            http_timeout_secs: 5,
            week_grace_days: 2,
            windows: Default::default(),
        };
        let client = SourceClient::new(&config).unwrap();
        JobContext {
            pool,
            client,
            config,
        }
    }

    fn test_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 12, 18, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn full_sync_pipeline_populates_the_store() {
        let ctx = test_context().await;
        let now = test_now();

        let teams = run_job(RefreshJob::TeamSync, &ctx, now).await.unwrap();
        assert_eq!(teams.created, 6); // 4 provider teams + 2 placeholders
        assert_eq!(teams.failed, 0);

        let weeks = run_job(RefreshJob::ScheduleSync, &ctx, now).await.unwrap();
        assert_eq!(weeks.created, 1);

        let games = run_job(RefreshJob::GameSync, &ctx, now).await.unwrap();
        assert_eq!(games.created, 3);
        assert_eq!(games.failed, 1); // event naming a team no sync has seen

        let game = db::get_game(&ctx.pool, 101).await.unwrap().unwrap();
        assert_eq!(game.home_team_id, 21);
        assert_eq!(game.away_team_id, 6);
        assert_eq!(game.week_name.as_deref(), Some("Week 2"));
        assert_eq!(game.season, 2024);

        // Re-running the sweeps must not duplicate anything.
        let again = run_job(RefreshJob::TeamSync, &ctx, now).await.unwrap();
        assert_eq!(again.created, 0);
        let again = run_job(RefreshJob::GameSync, &ctx, now).await.unwrap();
        assert_eq!(again.created, 0);
    }

    #[tokio::test]
    async fn odds_refresh_isolates_per_item_failures() {
        let ctx = test_context().await;
        let now = test_now();

        run_job(RefreshJob::TeamSync, &ctx, now).await.unwrap();
        run_job(RefreshJob::ScheduleSync, &ctx, now).await.unwrap();
        run_job(RefreshJob::GameSync, &ctx, now).await.unwrap();

        let report = run_job(RefreshJob::OddsRefresh, &ctx, now).await.unwrap();
        assert_eq!(report.failed, 1);
        assert_eq!(report.created, 2);

        // Items on either side of the failure landed with both field groups.
        for event_id in [101, 103] {
            let outcome = db::get_outcome(&ctx.pool, event_id)
                .await
                .unwrap()
                .unwrap();
            assert_eq!(outcome.spread_display.as_deref(), Some("PHI -3.5"));
            assert_eq!(outcome.spread, Some(-3));
            assert_eq!(outcome.home_win_prob, Some(61.0));
            assert_eq!(outcome.away_win_prob, Some(39.0));
            assert_eq!(outcome.pred_diff, Some(2.1));
        }

        assert!(db::get_outcome(&ctx.pool, 102).await.unwrap().is_none());
    }

    #[test]
    fn job_names_round_trip() {
        for job in RefreshJob::ALL {
            assert_eq!(RefreshJob::from_name(job.name()), Some(job));
        }
        assert_eq!(RefreshJob::from_name("no-such-job"), None);
    }

    #[test]
    fn cadences_cover_every_tier() {
        assert_eq!(RefreshJob::LiveGameRefresh.cadence_mins(), 1);
        assert_eq!(RefreshJob::PlayerStatRefresh.cadence_mins(), 10);
        assert_eq!(RefreshJob::OddsRefresh.cadence_mins(), 60);
        assert_eq!(RefreshJob::TeamSync.cadence_mins(), 1440);
    }
}
