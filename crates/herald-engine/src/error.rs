//! Error types for the engine binary.
//!
//! [`EngineError`] is the top-level error type that wraps all possible
//! failure modes during engine startup and the tick loop.

/// Top-level error for the engine binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration loading failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: herald_core::ConfigError,
    },

    /// Game clock initialization or advance failed.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: herald_core::ClockError,
    },

    /// The demo map could not be read.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: herald_world::WorldError,
    },

    /// Director lifecycle or actor creation failed.
    #[error("director error: {source}")]
    Director {
        /// The underlying director error.
        #[from]
        source: herald_core::DirectorError,
    },

    /// The tracing subscriber could not be installed.
    #[error("logging error: {message}")]
    Logging {
        /// Description of the logging failure.
        message: String,
    },
}
