use std::path::PathBuf;

use thiserror::Error;

use crate::entities::MAX_PLAYERS;

/// Failures that can surface while setting a stage up. The per-frame
/// pipeline never returns errors; script failures are logged instead.
#[derive(Debug, Error)]
pub enum StageError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Config(#[from] ron::error::SpannedError),

    #[error("player count {0} is outside 1..={MAX_PLAYERS}")]
    PlayerCount(usize),

    #[error("physics rate must be positive, got {0}")]
    PhysicsRate(f32),

    /// Carries the rendered message; `mlua::Error` is neither `Send` nor
    /// `Sync` without mlua's `send` feature.
    #[error("script runtime: {0}")]
    Lua(String),
}

impl From<mlua::Error> for StageError {
    fn from(e: mlua::Error) -> Self {
        StageError::Lua(e.to_string())
    }
}
