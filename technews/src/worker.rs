use chrono::{DateTime, Local, TimeZone};
use std::sync::Arc;
use tokio::select;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::agent::NewsAgent;
use crate::schedule::CronSchedule;

/// Run the agent on every firing of `schedule` until `shutdown` is signalled.
/// A shutdown during a run abandons that run.
pub async fn run_scheduled(
    agent: &NewsAgent,
    schedule: &CronSchedule,
    shutdown: Arc<Notify>,
) -> anyhow::Result<()> {
    info!("scheduler: started with schedule {:?}", schedule.to_string());

    let mut last_fire: Option<DateTime<Local>> = None;

    loop {
        let now = Local::now();
        let next = match next_firing(schedule, &now, last_fire.as_ref()) {
            Some(next) => next,
            None => anyhow::bail!("schedule {:?} never fires", schedule.to_string()),
        };
        let wait = (next - now).to_std().unwrap_or_default();
        info!("scheduler: next run at {}", next.format("%Y-%m-%d %H:%M %Z"));

        select! {
            _ = tokio::time::sleep(wait) => {},
            _ = shutdown.notified() => {
                info!("scheduler: shutdown requested, exiting loop");
                break;
            }
        }

        last_fire = Some(next);
        info!("scheduler: triggering weekly news run");
        select! {
            res = agent.run() => match res {
                Ok(report) if report.used_mock_data => {
                    warn!("scheduler: run finished using mock data ({} articles)", report.articles)
                }
                Ok(report) => info!("scheduler: run finished ({} articles)", report.articles),
                Err(e) => error!("scheduler: run failed: {}", e),
            },
            _ = shutdown.notified() => {
                warn!("scheduler: shutdown requested during a run, abandoning it");
                break;
            }
        }
    }

    info!("scheduler: stopped");
    Ok(())
}

/// Next firing strictly after both `now` and the previous firing. The wait is
/// a monotonic sleep, so the wall clock may still read just before `last`.
fn next_firing<Tz: TimeZone>(
    schedule: &CronSchedule,
    now: &DateTime<Tz>,
    last: Option<&DateTime<Tz>>,
) -> Option<DateTime<Tz>> {
    let from = match last {
        Some(last) if last > now => last,
        _ => now,
    };
    schedule.next_after(from)
}
