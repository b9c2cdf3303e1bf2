//! The upsert engine. All ingestion funnels through here.
//!
//! Every entity follows the same contract: look the row up by its natural
//! key; create it from the patch when absent; otherwise merge the patch
//! over the stored row, where a `None` patch field leaves the stored value
//! untouched. Returns the resulting entity and whether a new row was
//! created. A merge that changes nothing performs no write.
//!
//! Concurrent calls for different keys are safe. Overlapping jobs writing
//! the same key are last-write-wins; the merge semantics guarantee a
//! partial payload never erases fields it did not carry.

use sqlx::SqlitePool;

use crate::error::IngestError;
use crate::models::*;

fn conflict_or_store(entity: &'static str, key: String) -> impl FnOnce(sqlx::Error) -> IngestError {
    move |e| {
        let unique = matches!(&e, sqlx::Error::Database(d) if d.is_unique_violation());
        if unique {
            IngestError::StoreConflict { entity, key }
        } else {
            IngestError::Store(e)
        }
    }
}

fn merge<T: Clone>(patch: &Option<T>, current: &T) -> T {
    patch.clone().unwrap_or_else(|| current.clone())
}

fn merge_opt<T: Clone>(patch: &Option<T>, current: &Option<T>) -> Option<T> {
    patch.clone().or_else(|| current.clone())
}

// ── Team ─────────────────────────────────────────────────────────────────────

pub async fn reconcile_team(
    pool: &SqlitePool,
    team_id: i64,
    patch: &TeamPatch,
) -> Result<(Team, bool), IngestError> {
    let existing = super::get_team(pool, team_id).await?;

    match existing {
        None => {
            let team = Team {
                team_id,
                team_name: patch.team_name.clone().unwrap_or_default(),
                short_name: patch.short_name.clone(),
                record: patch.record.clone(),
                last_updated: patch.last_updated,
            };
            sqlx::query(
                "INSERT INTO teams (team_id, team_name, short_name, record, last_updated) \
                 VALUES (?, ?, ?, ?, ?)",
            )
            .bind(team.team_id)
            .bind(&team.team_name)
            .bind(&team.short_name)
            .bind(&team.record)
            .bind(team.last_updated)
            .execute(pool)
            .await
            .map_err(conflict_or_store("team", team_id.to_string()))?;
            Ok((team, true))
        }
        Some(current) => {
            let merged = Team {
                team_id,
                team_name: merge(&patch.team_name, &current.team_name),
                short_name: merge_opt(&patch.short_name, &current.short_name),
                record: merge_opt(&patch.record, &current.record),
                last_updated: merge_opt(&patch.last_updated, &current.last_updated),
            };
            if merged == current {
                return Ok((current, false));
            }
            sqlx::query(
                "UPDATE teams SET team_name = ?, short_name = ?, record = ?, last_updated = ? \
                 WHERE team_id = ?",
            )
            .bind(&merged.team_name)
            .bind(&merged.short_name)
            .bind(&merged.record)
            .bind(merged.last_updated)
            .bind(team_id)
            .execute(pool)
            .await?;
            Ok((merged, false))
        }
    }
}

// ── Calendar week ────────────────────────────────────────────────────────────

pub async fn reconcile_week(
    pool: &SqlitePool,
    name: &str,
    patch: &WeekPatch,
) -> Result<(CalendarWeek, bool), IngestError> {
    let existing =
        sqlx::query_as::<_, CalendarWeek>("SELECT * FROM calendar_weeks WHERE name = ?")
            .bind(name)
            .fetch_optional(pool)
            .await?;

    match existing {
        None => {
            let week = CalendarWeek {
                name: name.to_string(),
                details: patch.details.clone(),
                week_num: patch.week_num.unwrap_or_default(),
                season: patch.season.unwrap_or_default(),
                season_type_id: patch.season_type_id.unwrap_or_default(),
                season_type_name: patch.season_type_name.clone(),
                start_date: patch.start_date.unwrap_or(chrono::DateTime::UNIX_EPOCH),
                end_date: patch.end_date.unwrap_or(chrono::DateTime::UNIX_EPOCH),
            };
            sqlx::query(
                "INSERT INTO calendar_weeks \
                 (name, details, week_num, season, season_type_id, season_type_name, start_date, end_date) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&week.name)
            .bind(&week.details)
            .bind(week.week_num)
            .bind(week.season)
            .bind(week.season_type_id)
            .bind(&week.season_type_name)
            .bind(week.start_date)
            .bind(week.end_date)
            .execute(pool)
            .await
            .map_err(conflict_or_store("calendar_week", name.to_string()))?;
            Ok((week, true))
        }
        Some(current) => {
            let merged = CalendarWeek {
                name: current.name.clone(),
                details: merge_opt(&patch.details, &current.details),
                week_num: merge(&patch.week_num, &current.week_num),
                season: merge(&patch.season, &current.season),
                season_type_id: merge(&patch.season_type_id, &current.season_type_id),
                season_type_name: merge_opt(&patch.season_type_name, &current.season_type_name),
                start_date: merge(&patch.start_date, &current.start_date),
                end_date: merge(&patch.end_date, &current.end_date),
            };
            if merged == current {
                return Ok((current, false));
            }
            sqlx::query(
                "UPDATE calendar_weeks SET details = ?, week_num = ?, season = ?, \
                 season_type_id = ?, season_type_name = ?, start_date = ?, end_date = ? \
                 WHERE name = ?",
            )
            .bind(&merged.details)
            .bind(merged.week_num)
            .bind(merged.season)
            .bind(merged.season_type_id)
            .bind(&merged.season_type_name)
            .bind(merged.start_date)
            .bind(merged.end_date)
            .bind(name)
            .execute(pool)
            .await?;
            Ok((merged, false))
        }
    }
}

// ── Game ─────────────────────────────────────────────────────────────────────

pub async fn reconcile_game(
    pool: &SqlitePool,
    event_id: i64,
    patch: &GamePatch,
) -> Result<(Game, bool), IngestError> {
    let existing = super::get_game(pool, event_id).await?;

    match existing {
        None => {
            // First sight of an event; callers supply the full field set here.
            let game = Game {
                event_id,
                short_name: patch.short_name.clone(),
                game_datetime: patch.game_datetime.unwrap_or(chrono::DateTime::UNIX_EPOCH),
                season: patch.season.unwrap_or_default(),
                week_num: patch.week_num.unwrap_or_default(),
                home_team_id: patch.home_team_id.unwrap_or_default(),
                away_team_id: patch.away_team_id.unwrap_or_default(),
                week_name: patch.week_name.clone(),
            };
            sqlx::query(
                "INSERT INTO games \
                 (event_id, short_name, game_datetime, season, week_num, home_team_id, away_team_id, week_name) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(game.event_id)
            .bind(&game.short_name)
            .bind(game.game_datetime)
            .bind(game.season)
            .bind(game.week_num)
            .bind(game.home_team_id)
            .bind(game.away_team_id)
            .bind(&game.week_name)
            .execute(pool)
            .await
            .map_err(conflict_or_store("game", event_id.to_string()))?;
            Ok((game, true))
        }
        Some(current) => {
            let merged = Game {
                event_id,
                short_name: merge_opt(&patch.short_name, &current.short_name),
                game_datetime: merge(&patch.game_datetime, &current.game_datetime),
                season: merge(&patch.season, &current.season),
                week_num: merge(&patch.week_num, &current.week_num),
                home_team_id: merge(&patch.home_team_id, &current.home_team_id),
                away_team_id: merge(&patch.away_team_id, &current.away_team_id),
                week_name: merge_opt(&patch.week_name, &current.week_name),
            };
            if merged == current {
                return Ok((current, false));
            }
            sqlx::query(
                "UPDATE games SET short_name = ?, game_datetime = ?, season = ?, week_num = ?, \
                 home_team_id = ?, away_team_id = ?, week_name = ? WHERE event_id = ?",
            )
            .bind(&merged.short_name)
            .bind(merged.game_datetime)
            .bind(merged.season)
            .bind(merged.week_num)
            .bind(merged.home_team_id)
            .bind(merged.away_team_id)
            .bind(&merged.week_name)
            .bind(event_id)
            .execute(pool)
            .await?;
            Ok((merged, false))
        }
    }
}

// ── Outcome ──────────────────────────────────────────────────────────────────

pub async fn reconcile_outcome(
    pool: &SqlitePool,
    event_id: i64,
    patch: &OutcomePatch,
) -> Result<(Outcome, bool), IngestError> {
    let existing = super::get_outcome(pool, event_id).await?;

    match existing {
        None => {
            let outcome = Outcome {
                event_id,
                spread_display: patch.spread_display.clone(),
                spread: patch.spread,
                home_win_prob: patch.home_win_prob,
                away_win_prob: patch.away_win_prob,
                pred_diff: patch.pred_diff,
                last_updated: patch.last_updated,
            };
            sqlx::query(
                "INSERT INTO outcomes \
                 (event_id, spread_display, spread, home_win_prob, away_win_prob, pred_diff, last_updated) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(outcome.event_id)
            .bind(&outcome.spread_display)
            .bind(outcome.spread)
            .bind(outcome.home_win_prob)
            .bind(outcome.away_win_prob)
            .bind(outcome.pred_diff)
            .bind(outcome.last_updated)
            .execute(pool)
            .await
            .map_err(conflict_or_store("outcome", event_id.to_string()))?;
            Ok((outcome, true))
        }
        Some(current) => {
            let merged = Outcome {
                event_id,
                spread_display: merge_opt(&patch.spread_display, &current.spread_display),
                spread: merge_opt(&patch.spread, &current.spread),
                home_win_prob: merge_opt(&patch.home_win_prob, &current.home_win_prob),
                away_win_prob: merge_opt(&patch.away_win_prob, &current.away_win_prob),
                pred_diff: merge_opt(&patch.pred_diff, &current.pred_diff),
                last_updated: merge_opt(&patch.last_updated, &current.last_updated),
            };
            if merged == current {
                return Ok((current, false));
            }
            sqlx::query(
                "UPDATE outcomes SET spread_display = ?, spread = ?, home_win_prob = ?, \
                 away_win_prob = ?, pred_diff = ?, last_updated = ? WHERE event_id = ?",
            )
            .bind(&merged.spread_display)
            .bind(merged.spread)
            .bind(merged.home_win_prob)
            .bind(merged.away_win_prob)
            .bind(merged.pred_diff)
            .bind(merged.last_updated)
            .bind(event_id)
            .execute(pool)
            .await?;
            Ok((merged, false))
        }
    }
}

// ── Athlete ──────────────────────────────────────────────────────────────────

pub async fn reconcile_athlete(
    pool: &SqlitePool,
    athlete_id: i64,
    patch: &AthletePatch,
) -> Result<(Athlete, bool), IngestError> {
    let existing = super::get_athlete(pool, athlete_id).await?;

    match existing {
        None => {
            let athlete = Athlete {
                athlete_id,
                first_name: patch.first_name.clone(),
                last_name: patch.last_name.clone(),
                display_name: patch.display_name.clone(),
                jersey: patch.jersey,
                team_id: patch.team_id.flatten(),
                position_id: patch.position_id,
                position: patch.position.clone(),
                position_abbreviation: patch.position_abbreviation.clone(),
                age: patch.age,
                weight: patch.weight,
                height: patch.height,
                debut_year: patch.debut_year,
                active: patch.active,
                status_id: patch.status_id,
                status: patch.status.clone(),
                injuries: patch.injuries.clone().flatten(),
            };
            sqlx::query(
                "INSERT INTO athletes \
                 (athlete_id, first_name, last_name, display_name, jersey, team_id, position_id, \
                  position, position_abbreviation, age, weight, height, debut_year, active, \
                  status_id, status, injuries) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(athlete.athlete_id)
            .bind(&athlete.first_name)
            .bind(&athlete.last_name)
            .bind(&athlete.display_name)
            .bind(athlete.jersey)
            .bind(athlete.team_id)
            .bind(athlete.position_id)
            .bind(&athlete.position)
            .bind(&athlete.position_abbreviation)
            .bind(athlete.age)
            .bind(athlete.weight)
            .bind(athlete.height)
            .bind(athlete.debut_year)
            .bind(athlete.active)
            .bind(athlete.status_id)
            .bind(&athlete.status)
            .bind(&athlete.injuries)
            .execute(pool)
            .await
            .map_err(conflict_or_store("athlete", athlete_id.to_string()))?;
            Ok((athlete, true))
        }
        Some(current) => {
            let merged = Athlete {
                athlete_id,
                first_name: merge_opt(&patch.first_name, &current.first_name),
                last_name: merge_opt(&patch.last_name, &current.last_name),
                display_name: merge_opt(&patch.display_name, &current.display_name),
                jersey: merge_opt(&patch.jersey, &current.jersey),
                // Option<Option<_>>: the outer layer distinguishes "leave
                // alone" from an explicit un-rostering (Some(None)).
                team_id: match &patch.team_id {
                    Some(value) => *value,
                    None => current.team_id,
                },
                position_id: merge_opt(&patch.position_id, &current.position_id),
                position: merge_opt(&patch.position, &current.position),
                position_abbreviation: merge_opt(
                    &patch.position_abbreviation,
                    &current.position_abbreviation,
                ),
                age: merge_opt(&patch.age, &current.age),
                weight: merge_opt(&patch.weight, &current.weight),
                height: merge_opt(&patch.height, &current.height),
                debut_year: merge_opt(&patch.debut_year, &current.debut_year),
                active: merge_opt(&patch.active, &current.active),
                status_id: merge_opt(&patch.status_id, &current.status_id),
                status: merge_opt(&patch.status, &current.status),
                injuries: match &patch.injuries {
                    Some(value) => value.clone(),
                    None => current.injuries.clone(),
                },
            };
            if merged == current {
                return Ok((current, false));
            }
            sqlx::query(
                "UPDATE athletes SET first_name = ?, last_name = ?, display_name = ?, jersey = ?, \
                 team_id = ?, position_id = ?, position = ?, position_abbreviation = ?, age = ?, \
                 weight = ?, height = ?, debut_year = ?, active = ?, status_id = ?, status = ?, \
                 injuries = ? WHERE athlete_id = ?",
            )
            .bind(&merged.first_name)
            .bind(&merged.last_name)
            .bind(&merged.display_name)
            .bind(merged.jersey)
            .bind(merged.team_id)
            .bind(merged.position_id)
            .bind(&merged.position)
            .bind(&merged.position_abbreviation)
            .bind(merged.age)
            .bind(merged.weight)
            .bind(merged.height)
            .bind(merged.debut_year)
            .bind(merged.active)
            .bind(merged.status_id)
            .bind(&merged.status)
            .bind(&merged.injuries)
            .bind(athlete_id)
            .execute(pool)
            .await?;
            Ok((merged, false))
        }
    }
}

// ── Season statistic ─────────────────────────────────────────────────────────

pub async fn reconcile_season_stat(
    pool: &SqlitePool,
    key: &SeasonStatKey,
    patch: &StatValuePatch,
) -> Result<(SeasonStatistic, bool), IngestError> {
    let existing = sqlx::query_as::<_, SeasonStatistic>(
        "SELECT * FROM season_statistics WHERE athlete_id = ? AND season_year = ? \
         AND season_type = ? AND category_name = ? AND stat_name = ?",
    )
    .bind(key.athlete_id)
    .bind(key.season_year)
    .bind(&key.season_type)
    .bind(&key.category_name)
    .bind(&key.stat_name)
    .fetch_optional(pool)
    .await?;

    match existing {
        None => {
            let stat = SeasonStatistic {
                athlete_id: key.athlete_id,
                season_year: key.season_year,
                season_type: key.season_type.clone(),
                category_name: key.category_name.clone(),
                stat_name: key.stat_name.clone(),
                stat_value: patch.stat_value,
                stat_display_value: patch.stat_display_value.clone(),
                last_updated: patch.last_updated,
            };
            sqlx::query(
                "INSERT INTO season_statistics \
                 (athlete_id, season_year, season_type, category_name, stat_name, \
                  stat_value, stat_display_value, last_updated) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(stat.athlete_id)
            .bind(stat.season_year)
            .bind(&stat.season_type)
            .bind(&stat.category_name)
            .bind(&stat.stat_name)
            .bind(stat.stat_value)
            .bind(&stat.stat_display_value)
            .bind(stat.last_updated)
            .execute(pool)
            .await
            .map_err(conflict_or_store(
                "season_statistic",
                format!("{}/{}/{}", key.athlete_id, key.season_year, key.stat_name),
            ))?;
            Ok((stat, true))
        }
        Some(current) => {
            let merged = SeasonStatistic {
                stat_value: merge_opt(&patch.stat_value, &current.stat_value),
                stat_display_value: merge_opt(
                    &patch.stat_display_value,
                    &current.stat_display_value,
                ),
                last_updated: merge_opt(&patch.last_updated, &current.last_updated),
                ..current.clone()
            };
            if merged == current {
                return Ok((current, false));
            }
            sqlx::query(
                "UPDATE season_statistics SET stat_value = ?, stat_display_value = ?, last_updated = ? \
                 WHERE athlete_id = ? AND season_year = ? AND season_type = ? \
                 AND category_name = ? AND stat_name = ?",
            )
            .bind(merged.stat_value)
            .bind(&merged.stat_display_value)
            .bind(merged.last_updated)
            .bind(key.athlete_id)
            .bind(key.season_year)
            .bind(&key.season_type)
            .bind(&key.category_name)
            .bind(&key.stat_name)
            .execute(pool)
            .await?;
            Ok((merged, false))
        }
    }
}

// ── Game statistic ───────────────────────────────────────────────────────────

pub async fn reconcile_game_stat(
    pool: &SqlitePool,
    key: &GameStatKey,
    patch: &GameStatPatch,
) -> Result<(GameStatistic, bool), IngestError> {
    let existing = sqlx::query_as::<_, GameStatistic>(
        "SELECT * FROM game_statistics WHERE athlete_id = ? AND event_id = ? \
         AND category_name = ? AND stat_name = ?",
    )
    .bind(key.athlete_id)
    .bind(key.event_id)
    .bind(&key.category_name)
    .bind(&key.stat_name)
    .fetch_optional(pool)
    .await?;

    match existing {
        None => {
            let stat = GameStatistic {
                athlete_id: key.athlete_id,
                event_id: key.event_id,
                game_date: patch.game_date,
                opponent: patch.opponent.clone(),
                category_name: key.category_name.clone(),
                stat_name: key.stat_name.clone(),
                stat_value: patch.stat_value,
                stat_display_value: patch.stat_display_value.clone(),
                last_updated: patch.last_updated,
            };
            sqlx::query(
                "INSERT INTO game_statistics \
                 (athlete_id, event_id, game_date, opponent, category_name, stat_name, \
                  stat_value, stat_display_value, last_updated) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(stat.athlete_id)
            .bind(stat.event_id)
            .bind(stat.game_date)
            .bind(&stat.opponent)
            .bind(&stat.category_name)
            .bind(&stat.stat_name)
            .bind(stat.stat_value)
            .bind(&stat.stat_display_value)
            .bind(stat.last_updated)
            .execute(pool)
            .await
            .map_err(conflict_or_store(
                "game_statistic",
                format!("{}/{}/{}", key.athlete_id, key.event_id, key.stat_name),
            ))?;
            Ok((stat, true))
        }
        Some(current) => {
            let merged = GameStatistic {
                game_date: merge_opt(&patch.game_date, &current.game_date),
                opponent: merge_opt(&patch.opponent, &current.opponent),
                stat_value: merge_opt(&patch.stat_value, &current.stat_value),
                stat_display_value: merge_opt(
                    &patch.stat_display_value,
                    &current.stat_display_value,
                ),
                last_updated: merge_opt(&patch.last_updated, &current.last_updated),
                ..current.clone()
            };
            if merged == current {
                return Ok((current, false));
            }
            sqlx::query(
                "UPDATE game_statistics SET game_date = ?, opponent = ?, stat_value = ?, \
                 stat_display_value = ?, last_updated = ? \
                 WHERE athlete_id = ? AND event_id = ? AND category_name = ? AND stat_name = ?",
            )
            .bind(merged.game_date)
            .bind(&merged.opponent)
            .bind(merged.stat_value)
            .bind(&merged.stat_display_value)
            .bind(merged.last_updated)
            .bind(key.athlete_id)
            .bind(key.event_id)
            .bind(&key.category_name)
            .bind(&key.stat_name)
            .execute(pool)
            .await?;
            Ok((merged, false))
        }
    }
}

// ── Team statistic ───────────────────────────────────────────────────────────

pub async fn reconcile_team_stat(
    pool: &SqlitePool,
    key: &TeamStatKey,
    patch: &TeamStatPatch,
) -> Result<(TeamStat, bool), IngestError> {
    let existing = sqlx::query_as::<_, TeamStat>(
        "SELECT * FROM team_stats WHERE team_id = ? AND category = ? AND stat_name = ?",
    )
    .bind(key.team_id)
    .bind(&key.category)
    .bind(&key.stat_name)
    .fetch_optional(pool)
    .await?;

    match existing {
        None => {
            let stat = TeamStat {
                team_id: key.team_id,
                category: key.category.clone(),
                stat_name: key.stat_name.clone(),
                value: patch.value,
                rank: patch.rank,
                display_rank: patch.display_rank.clone(),
                description: patch.description.clone(),
            };
            sqlx::query(
                "INSERT INTO team_stats \
                 (team_id, category, stat_name, value, rank, display_rank, description) \
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(stat.team_id)
            .bind(&stat.category)
            .bind(&stat.stat_name)
            .bind(stat.value)
            .bind(stat.rank)
            .bind(&stat.display_rank)
            .bind(&stat.description)
            .execute(pool)
            .await
            .map_err(conflict_or_store(
                "team_stat",
                format!("{}/{}/{}", key.team_id, key.category, key.stat_name),
            ))?;
            Ok((stat, true))
        }
        Some(current) => {
            let merged = TeamStat {
                value: merge_opt(&patch.value, &current.value),
                rank: merge_opt(&patch.rank, &current.rank),
                display_rank: merge_opt(&patch.display_rank, &current.display_rank),
                description: merge_opt(&patch.description, &current.description),
                ..current.clone()
            };
            if merged == current {
                return Ok((current, false));
            }
            sqlx::query(
                "UPDATE team_stats SET value = ?, rank = ?, display_rank = ?, description = ? \
                 WHERE team_id = ? AND category = ? AND stat_name = ?",
            )
            .bind(merged.value)
            .bind(merged.rank)
            .bind(&merged.display_rank)
            .bind(&merged.description)
            .bind(key.team_id)
            .bind(&key.category)
            .bind(&key.stat_name)
            .execute(pool)
            .await?;
            Ok((merged, false))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
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

    async fn seed_game(pool: &SqlitePool, event_id: i64) {
        for (id, name) in [(21, "Philadelphia Eagles"), (6, "Dallas Cowboys")] {
            reconcile_team(
                pool,
                id,
                &TeamPatch {
                    team_name: Some(name.to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }
        reconcile_game(
            pool,
            event_id,
            &GamePatch {
                short_name: Some("DAL @ PHI".to_string()),
                game_datetime: Some(Utc.with_ymd_and_hms(2024, 9, 15, 17, 0, 0).unwrap()),
                season: Some(2024),
                week_num: Some(2),
                home_team_id: Some(21),
                away_team_id: Some(6),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn reconcile_is_idempotent() {
        let pool = test_pool().await;
        let patch = TeamPatch {
            team_name: Some("New York Giants".to_string()),
            short_name: Some("NYG".to_string()),
            ..Default::default()
        };

        let (first, created) = reconcile_team(&pool, 19, &patch).await.unwrap();
        assert!(created);

        let (second, created) = reconcile_team(&pool, 19, &patch).await.unwrap();
        assert!(!created);
        assert_eq!(first, second);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM teams")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn partial_update_leaves_other_field_group_alone() {
        let pool = test_pool().await;
        seed_game(&pool, 401_000_001).await;

        // Spread group lands first, from the odds endpoint.
        reconcile_outcome(
            &pool,
            401_000_001,
            &OutcomePatch {
                spread_display: Some("PHI -3.5".to_string()),
                spread: Some(-3),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        // Probability group arrives later from a different endpoint; the
        // payload carries nothing about the spread.
        let (merged, created) = reconcile_outcome(
            &pool,
            401_000_001,
            &OutcomePatch {
                pred_diff: Some(2.1),
                home_win_prob: Some(61.0),
                away_win_prob: Some(39.0),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert!(!created);
        assert_eq!(merged.spread_display.as_deref(), Some("PHI -3.5"));
        assert_eq!(merged.spread, Some(-3));
        assert_eq!(merged.home_win_prob, Some(61.0));
        assert_eq!(merged.pred_diff, Some(2.1));

        let stored = crate::db::get_outcome(&pool, 401_000_001)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored, merged);
    }

    #[tokio::test]
    async fn empty_patch_changes_nothing() {
        let pool = test_pool().await;
        let patch = TeamPatch {
            team_name: Some("Buffalo Bills".to_string()),
            record: Some("11-6".to_string()),
            ..Default::default()
        };
        let (stored, _) = reconcile_team(&pool, 2, &patch).await.unwrap();

        let (after, created) = reconcile_team(&pool, 2, &TeamPatch::default())
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(stored, after);
    }

    #[tokio::test]
    async fn season_stat_upsert_replaces_value_on_refetch() {
        let pool = test_pool().await;
        reconcile_athlete(
            &pool,
            3_139_477,
            &AthletePatch {
                display_name: Some("Patrick Mahomes".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        let key = SeasonStatKey {
            athlete_id: 3_139_477,
            season_year: 2024,
            season_type: "Regular Season".to_string(),
            category_name: "passing".to_string(),
            stat_name: "yards".to_string(),
        };

        let (_, created) = reconcile_season_stat(
            &pool,
            &key,
            &StatValuePatch {
                stat_value: Some(3928.0),
                stat_display_value: Some("3,928".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(created);

        let (updated, created) = reconcile_season_stat(
            &pool,
            &key,
            &StatValuePatch {
                stat_value: Some(4183.0),
                stat_display_value: Some("4,183".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert!(!created);
        assert_eq!(updated.stat_value, Some(4183.0));

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM season_statistics")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn roster_sync_orphans_dropped_athletes_without_deleting() {
        let pool = test_pool().await;
        reconcile_team(
            &pool,
            12,
            &TeamPatch {
                team_name: Some("Kansas City Chiefs".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        for id in [100, 200] {
            reconcile_athlete(
                &pool,
                id,
                &AthletePatch {
                    team_id: Some(Some(12)),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        }

        let orphaned = crate::db::orphan_missing_athletes(&pool, 12, &[100])
            .await
            .unwrap();
        assert_eq!(orphaned, 1);

        let kept = crate::db::get_athlete(&pool, 100).await.unwrap().unwrap();
        assert_eq!(kept.team_id, Some(12));

        let dropped = crate::db::get_athlete(&pool, 200).await.unwrap().unwrap();
        assert_eq!(dropped.team_id, None);
    }
}
