//! Terminal implementations of the host hooks.

use drivelink_core::FlowState;
use tracing::{debug, info, warn};
use url::Url;

use crate::orchestrator::HostHooks;

/// [`HostHooks`] for the `drivelink` CLI.
#[derive(Debug, Default)]
pub struct CliHooks {
    /// Print download links instead of opening them.
    pub no_open: bool,
}

impl HostHooks for CliHooks {
    fn on_transition(&self, from: FlowState, to: FlowState) {
        debug!(%from, %to, "flow state");
        match to {
            FlowState::Authenticating => println!("Waiting for Google authorization in your browser..."),
            FlowState::Picking => println!("Choose a file or folder to import."),
            FlowState::Submitting => println!("Sending selection to the server..."),
            _ => {}
        }
    }

    fn open_link(&self, url: &Url) {
        println!("Download: {}", url);
        if self.no_open {
            return;
        }
        info!(%url, "opening download link");
        if let Err(e) = open::that(url.as_str()) {
            warn!("failed to open {}: {}", url, e);
        }
    }

    fn session_expired(&self) {
        eprintln!("Your session has expired. Sign in again and update backend.session_token.");
    }

    fn notify(&self, message: &str) {
        eprintln!("{}", message);
    }
}

#[cfg(feature = "google")]
pub use chooser::TerminalChooser;

#[cfg(feature = "google")]
mod chooser {
    use std::io::{BufRead, Write};

    use drivelink_core::FOLDER_MIME_TYPE;
    use drivelink_providers::google::Chooser;
    use drivelink_providers::{HostError, PickedDocument};

    /// [`Chooser`] that lists documents on stdout and reads a number from stdin.
    #[derive(Debug, Default)]
    pub struct TerminalChooser;

    impl Chooser for TerminalChooser {
        fn choose(&self, documents: &[PickedDocument]) -> Result<Option<usize>, HostError> {
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            choose_from(documents, &mut stdin.lock(), &mut stdout)
        }
    }

    pub(super) fn choose_from(
        documents: &[PickedDocument],
        input: &mut impl BufRead,
        output: &mut impl Write,
    ) -> Result<Option<usize>, HostError> {
        let io_err = |e: std::io::Error| HostError::new("terminal I/O failed").with_source(e);

        if documents.is_empty() {
            writeln!(output, "No matching files found.").map_err(io_err)?;
            return Ok(None);
        }

        for (i, doc) in documents.iter().enumerate() {
            let marker = if doc.mime_type == FOLDER_MIME_TYPE { "/" } else { "" };
            let shared = if doc.is_shared { " (shared)" } else { "" };
            writeln!(output, "{:>3}. {}{}{}", i + 1, doc.name, marker, shared).map_err(io_err)?;
        }

        loop {
            write!(output, "Select 1-{} (empty to cancel): ", documents.len()).map_err(io_err)?;
            output.flush().map_err(io_err)?;

            let mut line = String::new();
            if input.read_line(&mut line).map_err(io_err)? == 0 {
                return Ok(None);
            }
            let line = line.trim();
            if line.is_empty() {
                return Ok(None);
            }
            match line.parse::<usize>() {
                Ok(n) if (1..=documents.len()).contains(&n) => return Ok(Some(n - 1)),
                _ => writeln!(output, "Not a valid choice: {}", line).map_err(io_err)?,
            }
        }
    }
}
