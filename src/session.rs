//! Persistence of the last conversation.
//!
//! There is one session slot: a JSON file holding the complete [`ChatCompletionRequest`] of
//! the last run, assistant reply included.  Every successful run overwrites it.  There is no
//! locking; two concurrent runs race and the last writer wins.

use std::env;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{from_reader, to_writer_pretty};

use crate::error::{Error, Result};
use crate::types::ChatCompletionRequest;

/// File name of the session slot inside the temporary directory.
pub const SESSION_FILE_NAME: &str = "chatgpt-cli-last-session.json";

/// The default session path: `chatgpt-cli-last-session.json` in the temporary directory.
pub fn default_session_path() -> PathBuf {
    env::temp_dir().join(SESSION_FILE_NAME)
}

/// Reads and writes the session file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    /// A store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the last saved request.
    pub fn load(&self) -> Result<ChatCompletionRequest> {
        let file = File::open(&self.path)
            .map_err(|err| Error::io("failed to open session file", err))?;
        let reader = BufReader::new(file);
        from_reader(reader).map_err(|err| {
            Error::serialization("failed to parse session file", Some(Box::new(err)))
        })
    }

    /// Saves `request`, replacing whatever the file held.
    pub fn save(&self, request: &ChatCompletionRequest) -> Result<()> {
        let file = File::create(&self.path)
            .map_err(|err| Error::io("failed to create session file", err))?;
        let mut writer = BufWriter::new(file);
        to_writer_pretty(&mut writer, request).map_err(|err| {
            Error::serialization("failed to serialize session", Some(Box::new(err)))
        })?;
        writer
            .flush()
            .map_err(|err| Error::io("failed to write session file", err))?;
        tracing::debug!(
            path = %self.path.display(),
            messages = request.messages.len(),
            "saved session"
        );
        Ok(())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(default_session_path())
    }
}
