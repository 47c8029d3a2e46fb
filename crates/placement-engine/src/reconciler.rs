use std::sync::Arc;
use std::time::Duration;

use placement_db::Database;
use tokio::time::{MissedTickBehavior, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Background task that corrects state made stale by the passage of time.
///
/// Every `interval` it closes open drives past their deadline and purges
/// expired reset codes. Each sweep gets `sweep_timeout`; a sweep that fails
/// or times out is logged and retried on the next tick. Returns once
/// `shutdown` is cancelled.
pub async fn run_reconciler(
    db: Arc<Database>,
    interval: Duration,
    sweep_timeout: Duration,
    shutdown: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!(interval = ?interval, sweep_timeout = ?sweep_timeout, "Starting reconciler");

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("Reconciler shutting down");
                return;
            }
            _ = ticker.tick() => {}
        }

        sweep_once(&db, sweep_timeout).await;
    }
}

/// Counts from one pass of both sweeps. `None` means that sweep failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    pub drives_closed: Option<usize>,
    pub codes_purged: Option<usize>,
}

/// Run both sweeps back to back, each under its own deadline. Never fails.
pub async fn sweep_once(db: &Arc<Database>, sweep_timeout: Duration) -> SweepReport {
    let drives_closed = run_sweep("close expired drives", db, sweep_timeout, |db| {
        db.close_expired_drives()
    })
    .await;
    if let Some(count) = drives_closed.filter(|c| *c > 0) {
        info!(count, "Reconciler: closed expired drives");
    }

    let codes_purged = run_sweep("purge expired reset codes", db, sweep_timeout, |db| {
        db.purge_expired_reset_codes()
    })
    .await;
    if let Some(count) = codes_purged.filter(|c| *c > 0) {
        info!(count, "Reconciler: purged expired reset codes");
    }

    SweepReport {
        drives_closed,
        codes_purged,
    }
}

async fn run_sweep<F>(name: &'static str, db: &Arc<Database>, deadline: Duration, sweep: F) -> Option<usize>
where
    F: FnOnce(&Database) -> anyhow::Result<usize> + Send + 'static,
{
    let db = db.clone();
    let task = tokio::task::spawn_blocking(move || sweep(&db));

    match timeout(deadline, task).await {
        Ok(Ok(Ok(count))) => Some(count),
        Ok(Ok(Err(e))) => {
            warn!(sweep = name, error = %e, "Reconciler sweep failed");
            None
        }
        Ok(Err(e)) => {
            warn!(sweep = name, error = %e, "Reconciler sweep panicked");
            None
        }
        Err(_) => {
            // The blocking statement finishes on its own; only the wait is abandoned.
            warn!(sweep = name, timeout = ?deadline, "Reconciler sweep timed out");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle;
    use crate::test_support::{drive_fields, fixture};
    use chrono::Duration as ChronoDuration;
    use placement_types::models::DriveStatus;

    const SWEEP_TIMEOUT: Duration = Duration::from_secs(10);

    #[tokio::test]
    async fn expired_open_drive_closes_once() {
        let fx = fixture();
        let expired = fx.drive(&drive_fields(ChronoDuration::minutes(-1)));
        let live = fx.drive(&drive_fields(ChronoDuration::days(1)));

        let first = sweep_once(&fx.db, SWEEP_TIMEOUT).await;
        assert_eq!(first.drives_closed, Some(1));
        let second = sweep_once(&fx.db, SWEEP_TIMEOUT).await;
        assert_eq!(second.drives_closed, Some(0));

        assert_eq!(fx.db.get_drive(expired).unwrap().unwrap().status, DriveStatus::Closed);
        assert_eq!(fx.db.get_drive(live).unwrap().unwrap().status, DriveStatus::Open);
    }

    #[tokio::test]
    async fn admin_hold_is_not_clobbered() {
        let fx = fixture();
        let drive = fx.drive(&drive_fields(ChronoDuration::minutes(-1)));
        lifecycle::set_status(&fx.db, drive, DriveStatus::OnHold).unwrap();

        let report = sweep_once(&fx.db, SWEEP_TIMEOUT).await;
        assert_eq!(report.drives_closed, Some(0));
        assert_eq!(fx.db.get_drive(drive).unwrap().unwrap().status, DriveStatus::OnHold);
    }

    #[tokio::test]
    async fn expired_codes_are_purged() {
        let fx = fixture();
        let now = fx.now();
        fx.db
            .save_reset_code("old@kec.test", "111111", now - ChronoDuration::seconds(1))
            .unwrap();
        fx.db
            .save_reset_code("new@kec.test", "222222", now + ChronoDuration::hours(1))
            .unwrap();

        let report = sweep_once(&fx.db, SWEEP_TIMEOUT).await;
        assert_eq!(report.codes_purged, Some(1));

        let remaining: Vec<String> = fx
            .db
            .with_conn(|conn| {
                let mut stmt = conn.prepare("SELECT email FROM password_resets")?;
                let rows = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .unwrap();
        assert_eq!(remaining, vec!["new@kec.test".to_string()]);
    }

    #[tokio::test]
    async fn loop_runs_immediately_and_stops_on_cancel() {
        let fx = fixture();
        let expired = fx.drive(&drive_fields(ChronoDuration::minutes(-1)));
        let shutdown = CancellationToken::new();

        let handle = tokio::spawn(run_reconciler(
            fx.db.clone(),
            Duration::from_secs(3600),
            SWEEP_TIMEOUT,
            shutdown.clone(),
        ));

        // the first tick fires at once
        for _ in 0..50 {
            if fx.db.get_drive(expired).unwrap().unwrap().status == DriveStatus::Closed {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(fx.db.get_drive(expired).unwrap().unwrap().status, DriveStatus::Closed);

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("reconciler did not stop")
            .unwrap();
    }
}
