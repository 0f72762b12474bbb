//! Deep-link opener
//!
//! Hands `https://`, `tel:` and `sms:` links to the host. `SystemOpener`
//! finds the platform launcher on `PATH`.

use std::io;
use std::path::PathBuf;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::JoinHandle;

use crate::{Error, Result};

/// Opens deep links outside the assistant
pub trait LinkOpener: Send + Sync {
    /// Open `url`
    ///
    /// # Errors
    ///
    /// Returns error if the link could not be handed off
    fn open(&self, url: &str) -> Result<()>;
}

/// Launches links with the platform opener
#[derive(Debug, Clone)]
pub struct SystemOpener {
    program: Option<PathBuf>,
}

impl SystemOpener {
    /// Candidate launchers, first found wins
    const CANDIDATES: &[&str] = &["xdg-open", "open", "wslview"];

    #[must_use]
    pub fn new() -> Self {
        let program = Self::CANDIDATES
            .iter()
            .find_map(|bin| which::which(bin).ok());

        match &program {
            Some(path) => tracing::debug!(opener = %path.display(), "link opener found"),
            None => tracing::warn!("no link opener on PATH, links will only be shown"),
        }

        Self { program }
    }

    /// Use `program` as the launcher
    #[must_use]
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
        }
    }

    /// Start the launcher and reap it on a background thread
    fn launch(&self, url: &str) -> Result<JoinHandle<io::Result<ExitStatus>>> {
        let program = self
            .program
            .as_ref()
            .ok_or_else(|| Error::Config("no link opener available".to_string()))?;

        let mut child = Command::new(program)
            .arg(url)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let url = url.to_string();
        Ok(std::thread::spawn(move || {
            let status = child.wait();
            match &status {
                Ok(status) if !status.success() => {
                    tracing::warn!(url = %url, %status, "link opener exited with failure");
                }
                Err(e) => tracing::warn!(url = %url, error = %e, "failed to wait for link opener"),
                Ok(_) => {}
            }
            status
        }))
    }
}

impl Default for SystemOpener {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        self.launch(url)?;
        tracing::info!(url, "opened link");
        Ok(())
    }
}

/// Never opens anything
#[derive(Debug, Clone, Copy, Default)]
pub struct NullOpener;

impl LinkOpener for NullOpener {
    fn open(&self, url: &str) -> Result<()> {
        tracing::debug!(url, "link opening disabled");
        Err(Error::Config("link opening disabled".to_string()))
    }
}
