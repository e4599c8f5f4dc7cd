//! Which office application currently has focus.

use std::process::Command;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetApp {
    Word,
    Wps,
    Excel,
    WpsSpreadsheet,
    None,
}

impl TargetApp {
    pub fn is_document(self) -> bool {
        matches!(self, TargetApp::Word | TargetApp::Wps)
    }

    pub fn is_spreadsheet(self) -> bool {
        matches!(self, TargetApp::Excel | TargetApp::WpsSpreadsheet)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TargetApp::Word => "Word",
            TargetApp::Wps => "WPS Writer",
            TargetApp::Excel => "Excel",
            TargetApp::WpsSpreadsheet => "WPS Spreadsheets",
            TargetApp::None => "",
        }
    }

    /// Map a foreground process or application name to a target.
    pub fn from_process_name(name: &str) -> Self {
        let name = name.trim().to_ascii_lowercase();
        let name = name.strip_suffix(".exe").unwrap_or(&name);

        match name {
            "winword" | "microsoft word" => TargetApp::Word,
            "excel" | "microsoft excel" => TargetApp::Excel,
            "wps" | "wpsoffice" | "wps office" | "wps writer" => TargetApp::Wps,
            "et" | "wps spreadsheets" => TargetApp::WpsSpreadsheet,
            _ => TargetApp::None,
        }
    }
}

pub trait TargetDetector: Send + Sync {
    fn detect(&self) -> TargetApp;
}

/// Looks at the process owning the foreground window.
#[derive(Debug, Default)]
pub struct ForegroundDetector;

impl TargetDetector for ForegroundDetector {
    fn detect(&self) -> TargetApp {
        match foreground_process_name() {
            Ok(name) => {
                let target = TargetApp::from_process_name(&name);
                tracing::debug!("Foreground process {name:?} -> {target:?}");
                target
            }
            Err(e) => {
                tracing::debug!("Could not determine the foreground application: {e}");
                TargetApp::None
            }
        }
    }
}

fn run(program: &str, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new(program).args(args).output()?;
    anyhow::ensure!(
        output.status.success(),
        "{program} exited with {}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr).trim()
    );
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[allow(unreachable_code)]
fn foreground_process_name() -> anyhow::Result<String> {
    #[cfg(windows)]
    {
        const SCRIPT: &str = r#"
Add-Type @"
using System;
using System.Runtime.InteropServices;
public static class Fg {
  [DllImport("user32.dll")] public static extern IntPtr GetForegroundWindow();
  [DllImport("user32.dll")] public static extern uint GetWindowThreadProcessId(IntPtr h, out uint p);
}
"@
$p = 0
[void][Fg]::GetWindowThreadProcessId([Fg]::GetForegroundWindow(), [ref]$p)
(Get-Process -Id $p).ProcessName
"#;
        return run("powershell", &["-NoProfile", "-Command", SCRIPT]);
    }

    #[cfg(target_os = "macos")]
    {
        return run(
            "osascript",
            &[
                "-e",
                "tell application \"System Events\" to get name of first application process whose frontmost is true",
            ],
        );
    }

    #[cfg(target_os = "linux")]
    {
        let pid = run("xdotool", &["getactivewindow", "getwindowpid"])?;
        let comm = std::fs::read_to_string(format!("/proc/{}/comm", pid.trim()))?;
        return Ok(comm.trim().to_string());
    }

    let _ = run;
    anyhow::bail!("foreground detection is not supported on this platform")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn process_names() {
        assert_eq!(TargetApp::from_process_name("WINWORD.EXE"), TargetApp::Word);
        assert_eq!(TargetApp::from_process_name("Microsoft Word"), TargetApp::Word);
        assert_eq!(TargetApp::from_process_name("wps.exe"), TargetApp::Wps);
        assert_eq!(TargetApp::from_process_name("EXCEL"), TargetApp::Excel);
        assert_eq!(TargetApp::from_process_name("et"), TargetApp::WpsSpreadsheet);
        assert_eq!(TargetApp::from_process_name("firefox"), TargetApp::None);
    }

    #[test]
    fn target_families() {
        assert!(TargetApp::Wps.is_document());
        assert!(!TargetApp::Wps.is_spreadsheet());
        assert!(TargetApp::WpsSpreadsheet.is_spreadsheet());
        assert!(!TargetApp::None.is_document() && !TargetApp::None.is_spreadsheet());
    }
}
