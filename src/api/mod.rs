//! Thin read-only JSON endpoints over the entity store.
//!
//! Handlers never touch the provider: a background refresh failure can
//! never block a read, and stale data always beats an error response.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use chrono::Utc;
use serde::Serialize;
use sqlx::SqlitePool;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::AppConfig;
use crate::db;
use crate::models::{ApiResponse, Athlete, CalendarWeek, Game, SeasonStatistic, Team, TeamStat};
use crate::services::schedule;
use crate::utils::format_kickoff;

#[derive(Clone)]
pub struct ApiState {
    pub pool: SqlitePool,
    pub config: AppConfig,
}

pub async fn serve(state: ApiState, port: u16) -> anyhow::Result<()> {
    let app = create_router().with_state(state);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    tracing::info!("gridiron API server listening on port {}", port);

    axum::serve(listener, app).await?;
    Ok(())
}

fn create_router() -> Router<ApiState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/games", get(current_week_games_handler))
        .route("/games/{week_num}", get(games_by_week_handler))
        .route("/teams", get(teams_handler))
        .route("/teams/{team_id}/schedule", get(team_schedule_handler))
        .route("/teams/{team_id}/roster", get(team_roster_handler))
        .route("/teams/{team_id}/stats", get(team_stats_handler))
        .route("/athletes/{athlete_id}/stats", get(athlete_stats_handler))
        .route("/matchup/{event_id}", get(matchup_handler))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

/// Error responses carry the same envelope as successes so clients parse
/// one shape.
struct ApiError(StatusCode, String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.0, Json(ApiResponse::<()>::error(self.1))).into_response()
    }
}

fn internal(context: &str, e: impl std::fmt::Display) -> ApiError {
    tracing::error!("{}: {}", context, e);
    ApiError(StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
}

fn not_found(message: String) -> ApiError {
    ApiError(StatusCode::NOT_FOUND, message)
}

async fn health_check() -> Json<ApiResponse<&'static str>> {
    Json(ApiResponse::success("gridiron API is running"))
}

// ── Games ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct TeamSide {
    team_id: i64,
    name: String,
    record: Option<String>,
}

#[derive(Serialize)]
struct GameSummary {
    event_id: i64,
    short_name: Option<String>,
    kickoff: String,
    season: i64,
    week_num: i64,
    home_team: TeamSide,
    away_team: TeamSide,
    odds: Option<String>,
    spread: Option<i64>,
    home_win_prob: Option<f64>,
    away_win_prob: Option<f64>,
    pred_diff: Option<f64>,
    odds_last_updated: Option<String>,
}

#[derive(Serialize)]
struct GamesResponse {
    week: CalendarWeek,
    weeks: Vec<CalendarWeek>,
    games: Vec<GameSummary>,
    total_games: usize,
}

async fn team_side(pool: &SqlitePool, team_id: i64) -> TeamSide {
    match db::get_team(pool, team_id).await {
        Ok(Some(team)) => TeamSide {
            team_id: team.team_id,
            name: team.team_name,
            record: team.record,
        },
        _ => TeamSide {
            team_id,
            name: "TBD".to_string(),
            record: None,
        },
    }
}

async fn summarize_game(pool: &SqlitePool, game: &Game) -> GameSummary {
    let outcome = db::get_outcome(pool, game.event_id).await.ok().flatten();

    GameSummary {
        event_id: game.event_id,
        short_name: game.short_name.clone(),
        kickoff: format_kickoff(game.game_datetime),
        season: game.season,
        week_num: game.week_num,
        home_team: team_side(pool, game.home_team_id).await,
        away_team: team_side(pool, game.away_team_id).await,
        odds: outcome.as_ref().and_then(|o| o.spread_display.clone()),
        spread: outcome.as_ref().and_then(|o| o.spread),
        home_win_prob: outcome.as_ref().and_then(|o| o.home_win_prob),
        away_win_prob: outcome.as_ref().and_then(|o| o.away_win_prob),
        pred_diff: outcome.as_ref().and_then(|o| o.pred_diff),
        odds_last_updated: outcome
            .as_ref()
            .and_then(|o| o.last_updated)
            .map(format_kickoff),
    }
}

async fn games_response(state: &ApiState, week: CalendarWeek) -> Result<GamesResponse, ApiError> {
    let weeks = db::weeks_for_season(&state.pool, week.season)
        .await
        .map_err(|e| internal("failed to fetch season weeks", e))?;
    let games = db::games_for_week_name(&state.pool, &week.name)
        .await
        .map_err(|e| internal("failed to fetch games for week", e))?;

    let mut summaries = Vec::with_capacity(games.len());
    for game in &games {
        summaries.push(summarize_game(&state.pool, game).await);
    }

    Ok(GamesResponse {
        week,
        weeks,
        total_games: summaries.len(),
        games: summaries,
    })
}

async fn current_week_games_handler(
    State(state): State<ApiState>,
) -> Result<Json<ApiResponse<GamesResponse>>, ApiError> {
    let week = schedule::current_week(&state.pool, Utc::now(), state.config.week_grace_days)
        .await
        .map_err(|e| not_found(format!("no calendar data available: {}", e)))?;

    let response = games_response(&state, week).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn games_by_week_handler(
    State(state): State<ApiState>,
    Path(week_num): Path<i64>,
) -> Result<Json<ApiResponse<GamesResponse>>, ApiError> {
    let season = schedule::season_for(Utc::now());
    let week = db::get_week_by_num(&state.pool, season, week_num)
        .await
        .map_err(|e| internal("failed to look up week", e))?
        .ok_or_else(|| not_found(format!("week {} not found for season {}", week_num, season)))?;

    let response = games_response(&state, week).await?;
    Ok(Json(ApiResponse::success(response)))
}

// ── Teams ────────────────────────────────────────────────────────────────────

async fn teams_handler(
    State(state): State<ApiState>,
) -> Result<Json<ApiResponse<Vec<Team>>>, ApiError> {
    let teams = db::get_all_teams(&state.pool)
        .await
        .map_err(|e| internal("failed to fetch teams", e))?;
    Ok(Json(ApiResponse::success(teams)))
}

#[derive(Serialize)]
struct ScheduleEntry {
    event_id: i64,
    kickoff: String,
    week_num: i64,
    is_home: bool,
    opponent: String,
    opponent_id: i64,
    opponent_record: Option<String>,
    odds: Option<String>,
    home_win_prob: Option<f64>,
    away_win_prob: Option<f64>,
}

#[derive(Serialize)]
struct TeamScheduleResponse {
    team: String,
    team_id: i64,
    schedule: Vec<ScheduleEntry>,
    total_games: usize,
}

async fn team_schedule_handler(
    State(state): State<ApiState>,
    Path(team_id): Path<i64>,
) -> Result<Json<ApiResponse<TeamScheduleResponse>>, ApiError> {
    let team = require_team(&state.pool, team_id).await?;

    let games = db::games_for_team(&state.pool, team_id)
        .await
        .map_err(|e| internal("failed to fetch team schedule", e))?;

    let mut schedule = Vec::with_capacity(games.len());
    for game in &games {
        let is_home = game.home_team_id == team_id;
        let opponent_id = if is_home {
            game.away_team_id
        } else {
            game.home_team_id
        };
        let opponent = team_side(&state.pool, opponent_id).await;
        let outcome = db::get_outcome(&state.pool, game.event_id).await.ok().flatten();

        schedule.push(ScheduleEntry {
            event_id: game.event_id,
            kickoff: format_kickoff(game.game_datetime),
            week_num: game.week_num,
            is_home,
            opponent: opponent.name,
            opponent_id,
            opponent_record: opponent.record,
            odds: outcome.as_ref().and_then(|o| o.spread_display.clone()),
            home_win_prob: outcome.as_ref().and_then(|o| o.home_win_prob),
            away_win_prob: outcome.as_ref().and_then(|o| o.away_win_prob),
        });
    }

    Ok(Json(ApiResponse::success(TeamScheduleResponse {
        team: team.team_name,
        team_id,
        total_games: schedule.len(),
        schedule,
    })))
}

#[derive(Serialize)]
struct RosterEntry {
    athlete_id: i64,
    display_name: String,
    jersey: Option<i64>,
    position: Option<String>,
    position_abbreviation: Option<String>,
    height: Option<i64>,
    weight: Option<i64>,
    age: Option<i64>,
    debut_year: Option<i64>,
    status: Option<String>,
    injuries: Option<String>,
}

#[derive(Serialize)]
struct TeamRosterResponse {
    team: String,
    team_id: i64,
    roster: Vec<RosterEntry>,
    total_players: usize,
}

fn athlete_display_name(athlete: &Athlete) -> String {
    if let Some(name) = &athlete.display_name {
        return name.clone();
    }
    match (&athlete.first_name, &athlete.last_name) {
        (Some(first), Some(last)) => format!("{} {}", first, last),
        (Some(first), None) => first.clone(),
        (None, Some(last)) => last.clone(),
        (None, None) => match athlete.jersey {
            Some(jersey) => format!("Player #{}", jersey),
            None => "Unknown Player".to_string(),
        },
    }
}

async fn team_roster_handler(
    State(state): State<ApiState>,
    Path(team_id): Path<i64>,
) -> Result<Json<ApiResponse<TeamRosterResponse>>, ApiError> {
    let team = require_team(&state.pool, team_id).await?;

    let athletes = db::athletes_for_team(&state.pool, team_id)
        .await
        .map_err(|e| internal("failed to fetch roster", e))?;

    let roster: Vec<RosterEntry> = athletes
        .iter()
        .map(|a| RosterEntry {
            athlete_id: a.athlete_id,
            display_name: athlete_display_name(a),
            jersey: a.jersey,
            position: a.position.clone(),
            position_abbreviation: a.position_abbreviation.clone(),
            height: a.height,
            weight: a.weight,
            age: a.age,
            debut_year: a.debut_year,
            status: a.status.clone(),
            injuries: a.injuries.clone(),
        })
        .collect();

    Ok(Json(ApiResponse::success(TeamRosterResponse {
        team: team.team_name,
        team_id,
        total_players: roster.len(),
        roster,
    })))
}

#[derive(Serialize)]
struct TeamStatsResponse {
    team: String,
    team_id: i64,
    record: Option<String>,
    stats: Vec<TeamStat>,
}

async fn team_stats_handler(
    State(state): State<ApiState>,
    Path(team_id): Path<i64>,
) -> Result<Json<ApiResponse<TeamStatsResponse>>, ApiError> {
    let team = require_team(&state.pool, team_id).await?;

    let stats = db::team_stats_for_team(&state.pool, team_id)
        .await
        .map_err(|e| internal("failed to fetch team stats", e))?;

    Ok(Json(ApiResponse::success(TeamStatsResponse {
        team: team.team_name,
        team_id,
        record: team.record,
        stats,
    })))
}

#[derive(Serialize)]
struct AthleteStatsResponse {
    athlete_id: i64,
    display_name: String,
    position: Option<String>,
    season: i64,
    stats: Vec<SeasonStatistic>,
}

async fn athlete_stats_handler(
    State(state): State<ApiState>,
    Path(athlete_id): Path<i64>,
) -> Result<Json<ApiResponse<AthleteStatsResponse>>, ApiError> {
    let athlete = db::get_athlete(&state.pool, athlete_id)
        .await
        .map_err(|e| internal("failed to fetch athlete", e))?
        .ok_or_else(|| not_found(format!("athlete {} not found", athlete_id)))?;

    let season = schedule::season_for(Utc::now());
    let stats = db::season_stats_for_athlete(&state.pool, athlete_id, season)
        .await
        .map_err(|e| internal("failed to fetch athlete stats", e))?;

    Ok(Json(ApiResponse::success(AthleteStatsResponse {
        athlete_id,
        display_name: athlete_display_name(&athlete),
        position: athlete.position.clone(),
        season,
        stats,
    })))
}

// ── Matchup ──────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct MatchupResponse {
    game: GameSummary,
    home_stats: Vec<TeamStat>,
    away_stats: Vec<TeamStat>,
    has_stats: bool,
}

async fn matchup_handler(
    State(state): State<ApiState>,
    Path(event_id): Path<i64>,
) -> Result<Json<ApiResponse<MatchupResponse>>, ApiError> {
    let game = db::get_game(&state.pool, event_id)
        .await
        .map_err(|e| internal("failed to fetch game", e))?
        .ok_or_else(|| not_found(format!("game {} not found", event_id)))?;

    let summary = summarize_game(&state.pool, &game).await;
    let home_stats = db::team_stats_for_team(&state.pool, game.home_team_id)
        .await
        .unwrap_or_default();
    let away_stats = db::team_stats_for_team(&state.pool, game.away_team_id)
        .await
        .unwrap_or_default();

    Ok(Json(ApiResponse::success(MatchupResponse {
        game: summary,
        has_stats: !home_stats.is_empty() || !away_stats.is_empty(),
        home_stats,
        away_stats,
    })))
}

// ── Helpers ──────────────────────────────────────────────────────────────────

async fn require_team(pool: &SqlitePool, team_id: i64) -> Result<Team, ApiError> {
    db::get_team(pool, team_id)
        .await
        .map_err(|e| internal("failed to fetch team", e))?
        .ok_or_else(|| not_found(format!("team {} not found", team_id)))
}
