use crate::scheduler::ReminderKind;
use anyhow::Result;

#[cfg(target_os = "macos")]
pub fn send_reminder(kind: ReminderKind) -> Result<()> {
    use std::process::{Command, Stdio};
    use tracing::warn;

    let notified = Command::new("terminal-notifier")
        .args(["-title", kind.title(), "-message", kind.message()])
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map(|status| status.success())
        .unwrap_or(false);

    if notified {
        return Ok(());
    }

    let script = format!(
        r#"display notification "{}" with title "{}""#,
        kind.message(),
        kind.title()
    );

    if let Err(error) = Command::new("osascript")
        .arg("-e")
        .arg(&script)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
    {
        warn!(error = %error, "failed to deliver reminder notification");
    }

    Ok(())
}

#[cfg(not(target_os = "macos"))]
pub fn send_reminder(kind: ReminderKind) -> Result<()> {
    tracing::info!(title = kind.title(), message = kind.message(), "reminder");

    Ok(())
}
