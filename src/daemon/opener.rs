//! Link opener: hands a button's link to the desktop, fire-and-forget.
//!
//! The launcher runs on its own short-lived thread. Its outcome is only
//! reported (stderr + activity log); the caller never waits and never sees an
//! error.

#![allow(missing_docs)]

use std::process::{Command, Stdio};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use parking_lot::Mutex;

use crate::core::config::OpenerConfig;
use crate::logger::{ActivityEvent, ActivityLoggerHandle};

/// Something that can open a link without blocking the caller.
pub trait LinkOpener {
    fn open(&self, link: &str);
}

impl<T: LinkOpener + ?Sized> LinkOpener for &T {
    fn open(&self, link: &str) {
        (**self).open(link);
    }
}

impl<T: LinkOpener + ?Sized> LinkOpener for Box<T> {
    fn open(&self, link: &str) {
        (**self).open(link);
    }
}

// ──────────────────── system opener ────────────────────

/// Opens links with the platform launcher or a configured command.
pub struct SystemOpener {
    command: Option<String>,
    logger: ActivityLoggerHandle,
    verbose: bool,
}

impl SystemOpener {
    pub fn new(command: Option<String>, logger: ActivityLoggerHandle) -> Self {
        Self {
            command,
            logger,
            verbose: false,
        }
    }

    pub fn from_config(config: &OpenerConfig, logger: ActivityLoggerHandle) -> Self {
        Self::new(config.command.clone(), logger)
    }

    /// Also report successful opens on stderr.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }
}

impl LinkOpener for SystemOpener {
    fn open(&self, link: &str) {
        let argv = launcher_argv(self.command.as_deref(), link);
        let link = link.to_string();
        let logger = self.logger.clone();
        let verbose = self.verbose;

        let spawned = thread::Builder::new()
            .name("dashpad-open".to_string())
            .spawn(move || {
                let started = Instant::now();
                match run_launcher(&argv) {
                    Ok(()) => {
                        if verbose {
                            eprintln!("[DASHPAD-OPEN] opened {link}");
                        }
                        logger.send(ActivityEvent::LinkOpened {
                            link,
                            duration_ms: u64::try_from(started.elapsed().as_millis())
                                .unwrap_or(u64::MAX),
                        });
                    }
                    Err(message) => {
                        eprintln!("[DASHPAD-OPEN] failed to open {link}: {message}");
                        logger.send(ActivityEvent::LinkOpenFailed { link, message });
                    }
                }
            });
        if let Err(e) = spawned {
            eprintln!("[DASHPAD-OPEN] failed to spawn opener thread: {e}");
        }
    }
}

/// Full argv used to open `link`.
///
/// A configured command is split on whitespace and the link is appended as
/// the last argument.
pub fn launcher_argv(custom: Option<&str>, link: &str) -> Vec<String> {
    let mut argv: Vec<String> = match custom.map(str::split_whitespace) {
        Some(words) => words.map(str::to_string).collect(),
        None => Vec::new(),
    };
    if argv.is_empty() {
        argv = default_launcher();
    }
    argv.push(link.to_string());
    argv
}

#[cfg(target_os = "macos")]
fn default_launcher() -> Vec<String> {
    vec!["open".to_string()]
}

// Never via `cmd`: it splits an untrusted link on `&` and `|`.
#[cfg(windows)]
fn default_launcher() -> Vec<String> {
    vec![
        "rundll32".to_string(),
        "url.dll,FileProtocolHandler".to_string(),
    ]
}

#[cfg(not(any(target_os = "macos", windows)))]
fn default_launcher() -> Vec<String> {
    vec!["xdg-open".to_string()]
}

fn run_launcher(argv: &[String]) -> std::result::Result<(), String> {
    let Some((program, args)) = argv.split_first() else {
        return Err("empty launcher command".to_string());
    };
    let status = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .map_err(|e| format!("{program}: {e}"))?;
    if status.success() {
        Ok(())
    } else {
        Err(format!("{program} exited with {status}"))
    }
}

// ──────────────────── recording opener ────────────────────

/// Opener that only remembers what it was asked to open. Clones share the
/// same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingOpener {
    opened: Arc<Mutex<Vec<String>>>,
}

impl RecordingOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Links opened so far, oldest first.
    pub fn opened(&self) -> Vec<String> {
        self.opened.lock().clone()
    }
}

impl LinkOpener for RecordingOpener {
    fn open(&self, link: &str) {
        self.opened.lock().push(link.to_string());
    }
}
