//! Due-notification scheduling.
//!
//! At startup the client looks for open tasks due tomorrow. If there are
//! any, a single desktop notification listing their names is scheduled
//! for tomorrow at a fixed local hour (15:00 by default). The alert is
//! armed once per process; later edits do not re-arm it.
//!
//! Notifications are best effort: a missing backend or a failing command
//! is logged and otherwise ignored.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use endel_proto::task::Task;
use tokio::task::JoinHandle;

/// Local hour the alert fires on the day before the due date.
pub const DEFAULT_ALERT_HOUR: u32 = 15;

/// Title used when none is configured.
pub const DEFAULT_TITLE: &str = "Tasks due tomorrow";

/// How long a notification command may run before it is abandoned.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors from a notification backend.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// No way to show notifications on this system.
    #[error("notification backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The backend ran but reported a failure.
    #[error("notification failed: {0}")]
    Failed(String),
}

/// Something that can show a notification.
pub trait Notifier: Send + Sync + 'static {
    /// Shows a notification with `title` and `body`.
    fn notify(
        &self,
        title: &str,
        body: &str,
    ) -> impl Future<Output = Result<(), NotifyError>> + Send;
}

/// When a planned alert should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Firing {
    /// The alert instant has already passed.
    Immediate,
    /// Fire after this delay.
    After(Duration),
}

/// A planned due-notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueAlert {
    /// Names of the selected tasks, in collection order.
    pub names: Vec<String>,
    /// When to fire.
    pub firing: Firing,
}

impl DueAlert {
    /// Notification body: the names joined with `", "`.
    #[must_use]
    pub fn body(&self) -> String {
        self.names.join(", ")
    }
}

/// Open tasks due on `tomorrow`, in collection order.
#[must_use]
pub fn select_due(tasks: &[Task], tomorrow: NaiveDate) -> Vec<&Task> {
    tasks.iter().filter(|t| t.is_pending_on(tomorrow)).collect()
}

/// `day` at `hour:00` local time. Hours past 23 clamp to 23.
#[must_use]
pub fn alert_at(day: NaiveDate, hour: u32) -> NaiveDateTime {
    let time = NaiveTime::from_hms_opt(hour.min(23), 0, 0).unwrap_or(NaiveTime::MIN);
    day.and_time(time)
}

/// How long to wait from `now` until `at`.
#[must_use]
pub fn firing_between(now: NaiveDateTime, at: NaiveDateTime) -> Firing {
    match (at - now).to_std() {
        Ok(delay) if !delay.is_zero() => Firing::After(delay),
        _ => Firing::Immediate,
    }
}

/// Plans the alert for tasks due the day after `now`.
///
/// Returns `None` when nothing open is due tomorrow.
#[must_use]
pub fn plan_alert(tasks: &[Task], now: NaiveDateTime, hour: u32) -> Option<DueAlert> {
    let tomorrow = now.date().succ_opt()?;
    let due = select_due(tasks, tomorrow);
    if due.is_empty() {
        return None;
    }

    Some(DueAlert {
        names: due.iter().map(|t| t.name.clone()).collect(),
        firing: firing_between(now, alert_at(tomorrow, hour)),
    })
}

/// Handle to an armed alert. Dropping it cancels the pending firing.
#[derive(Debug)]
pub struct AlertHandle {
    task: JoinHandle<()>,
}

impl AlertHandle {
    /// Cancels the alert if it has not fired yet.
    pub fn cancel(self) {
        drop(self);
    }

    /// Whether the alert has fired (or was cancelled).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for AlertHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Arms the one-shot due-notification.
///
/// Returns `None` if no open task is due tomorrow. Otherwise spawns a task
/// that waits until the alert instant (or fires right away if it has
/// passed) and calls `notifier` exactly once.
pub fn schedule_due_alert<N: Notifier>(
    tasks: &[Task],
    now: NaiveDateTime,
    hour: u32,
    title: String,
    notifier: Arc<N>,
) -> Option<AlertHandle> {
    let alert = plan_alert(tasks, now, hour)?;
    let body = alert.body();

    match alert.firing {
        Firing::Immediate => tracing::info!(count = alert.names.len(), "due alert firing now"),
        Firing::After(delay) => tracing::info!(
            count = alert.names.len(),
            delay_secs = delay.as_secs(),
            "due alert scheduled"
        ),
    }

    let task = tokio::spawn(async move {
        if let Firing::After(delay) = alert.firing {
            tokio::time::sleep(delay).await;
        }
        match notifier.notify(&title, &body).await {
            Ok(()) => tracing::info!(body = %body, "due alert shown"),
            Err(e) => tracing::warn!(error = %e, "due alert could not be shown"),
        }
    });

    Some(AlertHandle { task })
}

/// Shows notifications through the desktop's command-line tools.
///
/// Uses `notify-send` on Linux and the BSDs, and `osascript` on macOS.
#[derive(Debug, Clone)]
pub struct DesktopNotifier {
    timeout: Duration,
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self {
            timeout: COMMAND_TIMEOUT,
        }
    }
}

impl DesktopNotifier {
    /// Program and arguments for this platform, if supported.
    fn command(title: &str, body: &str) -> Option<(&'static str, Vec<String>)> {
        if cfg!(target_os = "macos") {
            let script = format!(
                "display notification \"{}\" with title \"{}\"",
                applescript_escape(body),
                applescript_escape(title)
            );
            Some(("osascript", vec!["-e".to_string(), script]))
        } else if cfg!(unix) {
            Some((
                "notify-send",
                vec![
                    "--app-name=endel".to_string(),
                    "--expire-time=10000".to_string(),
                    title.to_string(),
                    body.to_string(),
                ],
            ))
        } else {
            None
        }
    }
}

impl Notifier for DesktopNotifier {
    async fn notify(&self, title: &str, body: &str) -> Result<(), NotifyError> {
        let Some((program, args)) = Self::command(title, body) else {
            return Err(NotifyError::BackendUnavailable(
                "no notification command for this platform".to_string(),
            ));
        };

        let output = tokio::process::Command::new(program)
            .args(&args)
            .kill_on_drop(true)
            .output();

        match tokio::time::timeout(self.timeout, output).await {
            Err(_) => Err(NotifyError::Failed(format!(
                "{program} timed out after {}s",
                self.timeout.as_secs()
            ))),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::NotFound => Err(
                NotifyError::BackendUnavailable(format!("{program} is not installed")),
            ),
            Ok(Err(e)) => Err(NotifyError::Failed(format!("failed to spawn {program}: {e}"))),
            Ok(Ok(out)) if !out.status.success() => Err(NotifyError::Failed(format!(
                "{program} exited with {}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            ))),
            Ok(Ok(_)) => Ok(()),
        }
    }
}

fn applescript_escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
