use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Why a ROM load attempt failed. None of these are fatal: the attempt is
/// abandoned, the user is told, and the display stays on its last frame.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("no ROM file selected")]
    NoFileSelected,

    #[error("failed to read ROM file {}: {source}", .path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to load ROM: {name} ({reason})")]
    FetchTransport { name: String, reason: String },

    #[error("failed to load ROM: {name} (HTTP status {status})")]
    FetchHttp { name: String, status: u16 },
}

impl LoadError {
    /// the catalog entry this failure is about, if it came from a fetch
    pub fn rom_name(&self) -> Option<&str> {
        match self {
            LoadError::FetchTransport { name, .. } | LoadError::FetchHttp { name, .. } => {
                Some(name.as_str())
            }
            _ => None,
        }
    }
}
