//! Command handlers.

use crate::config::AppConfig;
use anyhow::Context;
use pkgmatrix_core::ids::PackageId;
use pkgmatrix_core::matrix::Matrix;
use pkgmatrix_db::Database;
use pkgmatrix_remote::{GitlabClient, HttpPackageList};
use pkgmatrix_scheduler::{
    BuildPlanner, BuildTrimmer, PackageListReconciler, SchedulerPorts, SystemClock, ThreadRandom,
    TriggerMetrics, TriggerMode, TriggerScheduler,
};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{info, warn};

async fn connect(config: &AppConfig) -> anyhow::Result<Database> {
    Database::connect(&config.database.url)
        .await
        .context("Failed to connect to database")
}

fn reconciler(
    config: &AppConfig,
    db: &Database,
    metrics: Arc<TriggerMetrics>,
) -> anyhow::Result<PackageListReconciler> {
    let source = HttpPackageList::new(&config.remote)?;
    Ok(PackageListReconciler::new(
        Arc::new(source),
        Arc::new(db.packages()),
        metrics,
    ))
}

fn scheduler(
    config: &AppConfig,
    db: &Database,
    metrics: Arc<TriggerMetrics>,
) -> anyhow::Result<TriggerScheduler> {
    let queue = GitlabClient::new(config.remote.clone())?;
    let ports = SchedulerPorts {
        packages: Arc::new(db.packages()),
        versions: Arc::new(db.versions()),
        builds: Arc::new(db.builds()),
        queue: Arc::new(queue),
        clock: Arc::new(SystemClock),
        random: Arc::new(ThreadRandom),
        metrics,
    };
    let scheduler = TriggerScheduler::new(
        ports,
        config.trigger.clone(),
        config.site.clone(),
        Matrix::active(),
    )?;
    Ok(scheduler)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let db = connect(config).await?;
    db.migrate().await?;
    println!("Migrations applied");
    Ok(())
}

pub async fn reconcile(config: &AppConfig, metrics: Arc<TriggerMetrics>) -> anyhow::Result<()> {
    let db = connect(config).await?;
    let report = reconciler(config, &db, metrics)?.reconcile().await?;
    print_json(&report)
}

pub async fn trim(config: &AppConfig) -> anyhow::Result<()> {
    config.trigger.validate()?;
    let db = connect(config).await?;
    let trimmer = BuildTrimmer::new(
        Arc::new(db.builds()),
        Arc::new(SystemClock),
        config.trigger.stale_after(),
    );
    let deleted = trimmer.trim_builds().await?;
    println!("Deleted {} build records", deleted);
    Ok(())
}

pub async fn trigger(
    config: &AppConfig,
    metrics: Arc<TriggerMetrics>,
    limit: Option<u32>,
    ids: &[String],
) -> anyhow::Result<()> {
    let mode = if ids.is_empty() {
        TriggerMode::Limit(limit.unwrap_or(config.trigger.candidate_limit))
    } else {
        let ids = ids
            .iter()
            .map(|id| {
                id.parse::<PackageId>()
                    .with_context(|| format!("Invalid package ID: {}", id))
            })
            .collect::<anyhow::Result<Vec<_>>>()?;
        TriggerMode::Packages(ids)
    };

    let db = connect(config).await?;
    let scheduler = scheduler(config, &db, metrics)?;
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let report = scheduler.run_cycle(mode, &shutdown_rx).await?;
    print_json(&report)
}

pub async fn missing(config: &AppConfig, package_id: &str) -> anyhow::Result<()> {
    let package_id: PackageId = package_id
        .parse()
        .with_context(|| format!("Invalid package ID: {}", package_id))?;
    let db = connect(config).await?;
    let planner = BuildPlanner::new(Arc::new(db.versions()), Arc::new(db.builds()), Matrix::active());
    let missing = planner.find_missing_builds(package_id).await?;
    print_json(&missing)
}

pub async fn run(config: &AppConfig, metrics: Arc<TriggerMetrics>) -> anyhow::Result<()> {
    config.validate()?;
    let db = connect(config).await?;
    let reconciler = reconciler(config, &db, metrics.clone())?;
    let scheduler = scheduler(config, &db, metrics)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown requested");
            let _ = shutdown_tx.send(true);
        }
    });

    let mut reconcile_ticker = interval(config.schedule.reconcile_interval());
    let mut trigger_ticker = interval(config.schedule.trigger_interval());
    reconcile_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    trigger_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(
        reconcile_interval_secs = config.schedule.reconcile_interval_secs,
        trigger_interval_secs = config.schedule.trigger_interval_secs,
        "Starting scheduler loop"
    );

    let mut shutdown = shutdown_rx.clone();
    loop {
        tokio::select! {
            _ = reconcile_ticker.tick() => {
                if let Err(e) = reconciler.reconcile().await {
                    warn!(error = %e, "Reconciliation skipped");
                }
            }
            _ = trigger_ticker.tick() => {
                let mode = TriggerMode::Limit(config.trigger.candidate_limit);
                if let Err(e) = scheduler.run_cycle(mode, &shutdown_rx).await {
                    warn!(error = %e, "Trigger cycle skipped");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("Scheduler loop shutting down");
                    break;
                }
            }
        }
    }

    Ok(())
}
