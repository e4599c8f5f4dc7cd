//! Desktop notifications.

use crate::i18n::{Language, Message};
use crate::APP_NAME;
use std::process::Command;

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &Message, language: Language);
}

/// Shows notifications with the platform's own tooling.
#[derive(Debug, Default)]
pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn notify(&self, message: &Message, language: Language) {
        let body = message.text(language);
        if let Err(e) = show(APP_NAME, &body, message.is_success()) {
            tracing::warn!("Could not show notification \"{body}\": {e}");
        }
    }
}

#[allow(unreachable_code)]
fn show(title: &str, body: &str, ok: bool) -> anyhow::Result<()> {
    #[cfg(target_os = "linux")]
    {
        let urgency = if ok { "normal" } else { "critical" };
        let status = Command::new("notify-send")
            .args(["--app-name", title, "--urgency", urgency, title, body])
            .status()?;
        anyhow::ensure!(status.success(), "notify-send exited with {status}");
        return Ok(());
    }

    #[cfg(target_os = "macos")]
    {
        let _ = ok;
        let script = format!(
            "display notification {} with title {}",
            applescript_string(body),
            applescript_string(title)
        );
        let status = Command::new("osascript").args(["-e", &script]).status()?;
        anyhow::ensure!(status.success(), "osascript exited with {status}");
        return Ok(());
    }

    #[cfg(windows)]
    {
        let icon = if ok { "Info" } else { "Error" };
        let script = format!(
            "Add-Type -AssemblyName System.Windows.Forms; \
             $n = New-Object System.Windows.Forms.NotifyIcon; \
             $n.Icon = [System.Drawing.SystemIcons]::Information; \
             $n.Visible = $true; \
             $n.ShowBalloonTip(4000, {}, {}, [System.Windows.Forms.ToolTipIcon]::{icon}); \
             Start-Sleep -Seconds 4; $n.Dispose()",
            powershell_string(title),
            powershell_string(body)
        );
        Command::new("powershell")
            .args(["-NoProfile", "-WindowStyle", "Hidden", "-Command", &script])
            .spawn()?;
        return Ok(());
    }

    let _ = (title, body, ok);
    anyhow::bail!("no notification backend on this platform")
}

/// Quote a string as an AppleScript literal.
pub fn applescript_string(value: &str) -> String {
    format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Quote a string as a single-quoted PowerShell literal.
pub fn powershell_string(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}
