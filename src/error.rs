use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = VisualizeError> = std::result::Result<T, E>;

/// Every failure that aborts a run. The CLI prints the message and exits 1.
#[derive(Debug, Error)]
pub enum VisualizeError {
    #[error("nix-store call failed for {package}, message {stderr}")]
    DiscoveryFailure { package: String, stderr: String },

    #[error("nix-store call for {package} did not finish within {seconds} seconds")]
    DiscoveryTimeout { package: String, seconds: u64 },

    #[error(
        "Config file {} contains more than one section, so -s must be set",
        path.display()
    )]
    ConfigAmbiguity { path: PathBuf },

    #[error(
        "Config file {} does not contain a section named {section}",
        path.display()
    )]
    ConfigSectionNotFound { path: PathBuf, section: String },

    #[error("could not read config file {}: {message}", path.display())]
    ConfigRead { path: PathBuf, message: String },

    #[error("malformed dependency graph: {0}")]
    MalformedGraph(String),

    #[error("Colormap {0} does not exist")]
    UnknownColorMap(String),

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl VisualizeError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}
