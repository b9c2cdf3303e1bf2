use anyhow::{bail, Result};
use chrono::Utc;
use std::sync::Arc;

use crate::api::{self, ApiState};
use crate::config::AppConfig;
use crate::db;
use crate::services::{jobs, RefreshJob, SourceClient};

async fn build_context(config: &AppConfig) -> Result<jobs::JobContext> {
    let pool = db::create_pool(&config.database_url).await?;
    db::init_schema(&pool).await?;
    let client = SourceClient::new(config)?;
    Ok(jobs::JobContext {
        pool,
        client,
        config: config.clone(),
    })
}

pub async fn serve(config: &AppConfig, port: u16) -> Result<()> {
    let pool = db::create_pool(&config.database_url).await?;
    db::init_schema(&pool).await?;
    api::serve(
        ApiState {
            pool,
            config: config.clone(),
        },
        port,
    )
    .await
}

pub async fn init_db(config: &AppConfig) -> Result<()> {
    let pool = db::create_pool(&config.database_url).await?;
    db::init_schema(&pool).await?;
    println!("Database initialized at {}", config.database_url);
    Ok(())
}

pub async fn run_named_job(config: &AppConfig, name: &str) -> Result<()> {
    let Some(job) = RefreshJob::from_name(name) else {
        let known: Vec<&str> = RefreshJob::ALL.iter().map(|j| j.name()).collect();
        bail!("unknown job '{}'; known jobs: {}", name, known.join(", "));
    };

    let ctx = build_context(config).await?;
    let report = jobs::run_job(job, &ctx, Utc::now()).await?;
    println!(
        "{}: {} created, {} updated, {} failed",
        job.name(),
        report.created,
        report.updated,
        report.failed
    );
    Ok(())
}

/// First-time fill, in dependency order: teams before games, the calendar
/// before events, rosters and statistics last.
pub async fn bootstrap(config: &AppConfig) -> Result<()> {
    let ctx = build_context(config).await?;
    let sequence = [
        RefreshJob::TeamSync,
        RefreshJob::ScheduleSync,
        RefreshJob::GameSync,
        RefreshJob::TeamRecordRefresh,
        RefreshJob::RosterSync,
        RefreshJob::TeamStatRefresh,
    ];

    for job in sequence {
        println!("Running {}...", job.name());
        let report = jobs::run_job(job, &ctx, Utc::now()).await?;
        println!(
            "  {} created, {} updated, {} failed",
            report.created, report.updated, report.failed
        );
    }

    println!("Bootstrap complete.");
    Ok(())
}

pub async fn run_schedule(config: &AppConfig) -> Result<()> {
    let ctx = Arc::new(build_context(config).await?);
    jobs::run_scheduler(ctx).await
}
