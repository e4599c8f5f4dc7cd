use anyhow::{Context, Result};
use pastemd::debounce::DebounceGate;
use pastemd::router::Router;
use pastemd::CONTROL_PORT;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::{thread, time::Duration};

const STREAM_MAX_RETRIES: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    Paste,
    Pause,
    Resume,
    Toggle,
    Reload,
    Status,
}

impl Request {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "PASTE" => Some(Request::Paste),
            "PAUSE" => Some(Request::Pause),
            "RESUME" => Some(Request::Resume),
            "TOGGLE" => Some(Request::Toggle),
            "RELOAD" => Some(Request::Reload),
            "STATUS" => Some(Request::Status),
            _ => None,
        }
    }
}

pub struct PasteDaemon {
    router: Arc<Router>,
    gate: Arc<DebounceGate>,
    enabled: AtomicBool,
    /// Set while a dialog has focus so the hotkey cannot fire into it.
    paused: AtomicBool,
}

impl PasteDaemon {
    pub fn new(router: Router) -> Self {
        Self {
            router: Arc::new(router),
            gate: DebounceGate::new(),
            enabled: AtomicBool::new(true),
            paused: AtomicBool::new(false),
        }
    }

    /// Answer one request. PASTE only starts the run; the outcome reaches the
    /// user as a notification.
    pub fn handle(&self, request: Option<Request>) -> String {
        let Some(request) = request else {
            tracing::warn!("Unexpected request received, sending back \"BAD_REQUEST\" ...");
            return "BAD_REQUEST".to_string();
        };

        match request {
            Request::Paste => {
                if !self.enabled.load(Ordering::Acquire) {
                    return "DISABLED".to_string();
                }
                if self.paused.load(Ordering::Acquire) {
                    return "PAUSED".to_string();
                }
                let Some(guard) = self.gate.try_enter() else {
                    tracing::info!("Paste already in flight, dropping trigger ...");
                    return "BUSY".to_string();
                };

                let router = Arc::clone(&self.router);
                thread::spawn(move || {
                    let _guard = guard;
                    router.run();
                });
                "OK".to_string()
            }
            Request::Pause => {
                self.paused.store(true, Ordering::Release);
                tracing::info!("Hotkey paused ...");
                "OK".to_string()
            }
            Request::Resume => {
                self.paused.store(false, Ordering::Release);
                tracing::info!("Hotkey resumed ...");
                "OK".to_string()
            }
            Request::Toggle => {
                let enabled = !self.enabled.fetch_xor(true, Ordering::AcqRel);
                tracing::info!("PasteMD {} ...", if enabled { "enabled" } else { "disabled" });
                if enabled { "ENABLED" } else { "DISABLED" }.to_string()
            }
            Request::Reload => match self.router.reload_config() {
                Ok(()) => "OK".to_string(),
                Err(e) => {
                    tracing::error!("Could not reload config: {e}");
                    format!("ERROR {e}")
                }
            },
            Request::Status => format!(
                "enabled={} paused={} in_flight={} hotkey={}",
                self.enabled.load(Ordering::Acquire),
                self.paused.load(Ordering::Acquire),
                self.gate.is_in_flight(),
                self.router.config().hotkey
            ),
        }
    }

    fn serve(&self, mut stream: TcpStream, buffer: &mut [u8]) -> Result<()> {
        let size = stream
            .read(buffer)
            .context("Could not read the incoming trigger request.")?;
        let raw = String::from_utf8_lossy(&buffer[..size]);
        tracing::debug!("\"{}\" request received ...", raw.trim());

        let reply = self.handle(Request::parse(&raw));
        stream
            .write_all(reply.as_bytes())
            .context("Could not answer the trigger request.")?;
        Ok(())
    }

    /// Serve trigger requests on the loopback control port from a background
    /// thread. Gives up after too many failed connections in a row.
    pub fn listen_for_triggers(self: Arc<Self>) -> thread::JoinHandle<Result<()>> {
        let daemon = Arc::clone(&self);
        thread::spawn(move || -> Result<()> {
            let mut buffer = [0; 512];

            let listener = TcpListener::bind(format!("127.0.0.1:{CONTROL_PORT}")).context(
                format!("Trigger listener could not bind to \"127.0.0.1:{CONTROL_PORT}\"."),
            )?;

            let mut get_stream_consecutive_failures = 0;
            for stream in listener.incoming() {
                let stream_success_result = stream
                    .context("Could not get stream from incoming trigger connexion.")
                    .and_then(|stream| daemon.serve(stream, &mut buffer));

                match stream_success_result {
                    Ok(()) => {
                        get_stream_consecutive_failures = 0;
                    }
                    Err(e) => {
                        tracing::error!("Error handling trigger request: {e}. Retrying...");
                        get_stream_consecutive_failures += 1;
                        if get_stream_consecutive_failures >= STREAM_MAX_RETRIES {
                            tracing::error!("Exceeded {STREAM_MAX_RETRIES} consecutive failures. Exiting trigger listener thread.");
                            anyhow::bail!(
                                "Exceeded {STREAM_MAX_RETRIES} consecutive failures on the trigger listener."
                            );
                        }
                        thread::sleep(Duration::from_millis(500));
                    }
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pastemd::clipboard::{ClipboardSnapshot, ClipboardSource};
    use pastemd::config::Config;
    use pastemd::convert::{ConvertOptions, Converter, InputFormat};
    use pastemd::error::{ClipboardError, ConversionError, InsertionError};
    use pastemd::i18n::{Language, Message};
    use pastemd::insert::Inserter;
    use pastemd::markdown::Table;
    use pastemd::notify::Notifier;
    use pastemd::output::Launcher;
    use pastemd::router::Collaborators;
    use pastemd::target::{TargetApp, TargetDetector};
    use std::path::Path;

    struct Inert;

    impl ClipboardSource for Inert {
        fn snapshot(&self) -> Result<ClipboardSnapshot, ClipboardError> {
            Ok(ClipboardSnapshot::default())
        }
        fn set_text(&self, _: &str) -> Result<(), ClipboardError> {
            Ok(())
        }
    }

    impl TargetDetector for Inert {
        fn detect(&self) -> TargetApp {
            TargetApp::None
        }
    }

    impl Converter for Inert {
        fn to_docx(&self, _: &str, _: InputFormat, _: &ConvertOptions) -> Result<Vec<u8>, ConversionError> {
            Err(ConversionError::EmptyOutput)
        }
    }

    impl Inserter for Inert {
        fn insert_document(&self, _: TargetApp, _: &Path, _: bool) -> Result<(), InsertionError> {
            Ok(())
        }
        fn insert_table(&self, _: TargetApp, _: &Table, _: bool) -> Result<(), InsertionError> {
            Ok(())
        }
    }

    impl Launcher for Inert {
        fn open(&self, _: &Path) -> Result<()> {
            Ok(())
        }
    }

    impl Notifier for Inert {
        fn notify(&self, _: &Message, _: Language) {}
    }

    fn daemon() -> PasteDaemon {
        let parts = Collaborators {
            clipboard: Box::new(Inert),
            detector: Box::new(Inert),
            converter: Box::new(Inert),
            inserter: Box::new(Inert),
            launcher: Box::new(Inert),
            notifier: Box::new(Inert),
        };
        PasteDaemon::new(Router::new(Config::default(), None, parts))
    }

    #[test]
    fn requests_parse_case_insensitively() {
        assert_eq!(Request::parse("paste\n"), Some(Request::Paste));
        assert_eq!(Request::parse(" STATUS "), Some(Request::Status));
        assert_eq!(Request::parse("GET_HISTORY"), None);
    }

    #[test]
    fn unknown_request_is_bad() {
        assert_eq!(daemon().handle(None), "BAD_REQUEST");
    }

    #[test]
    fn paused_and_disabled_triggers_are_ignored() {
        let daemon = daemon();
        assert_eq!(daemon.handle(Some(Request::Pause)), "OK");
        assert_eq!(daemon.handle(Some(Request::Paste)), "PAUSED");
        assert_eq!(daemon.handle(Some(Request::Resume)), "OK");

        assert_eq!(daemon.handle(Some(Request::Toggle)), "DISABLED");
        assert_eq!(daemon.handle(Some(Request::Paste)), "DISABLED");
        assert_eq!(daemon.handle(Some(Request::Toggle)), "ENABLED");
    }

    #[test]
    fn trigger_during_a_run_is_busy() {
        let daemon = daemon();
        let _held = daemon.gate.try_enter().unwrap();
        assert_eq!(daemon.handle(Some(Request::Paste)), "BUSY");
        assert!(daemon.handle(Some(Request::Status)).contains("in_flight=true"));
    }

    #[test]
    fn status_reports_the_hotkey() {
        let status = daemon().handle(Some(Request::Status));
        assert_eq!(status, "enabled=true paused=false in_flight=false hotkey=<ctrl>+b");
    }
}
