use std::path::PathBuf;

use thiserror::Error;

/// Convenient result alias for the badgeserve library.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level library error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration failed validation.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Configuration files could not be read or parsed.
    #[error(transparent)]
    ConfigLoad(#[from] ConfigLoadError),
}

/// Which configuration tree an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Public,
    Private,
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Tier::Public => f.write_str("public"),
            Tier::Private => f.write_str("private"),
        }
    }
}

/// Raised when a candidate configuration is rejected.
///
/// Messages name the offending dotted paths so an operator can fix the
/// configuration without reading code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A tree has the wrong shape or a field has the wrong type.
    #[error("{tier} configuration is malformed: {message}")]
    Structure { tier: Tier, message: String },

    /// A field is present but its value is unacceptable.
    #[error("\"{path}\" {reason}")]
    InvalidValue { path: String, reason: String },

    /// An enabled subsystem is missing required public fields.
    #[error("{}", format_public_missing(.paths))]
    MissingPublic { paths: Vec<String> },

    /// An enabled subsystem is missing required private fields.
    #[error("Private configuration is invalid. Check these paths: {}", .paths.join(", "))]
    MissingPrivate { paths: Vec<String> },
}

fn format_public_missing(paths: &[String]) -> String {
    paths
        .iter()
        .map(|p| format!("\"{}\" is required", p))
        .collect::<Vec<_>>()
        .join(". ")
}

/// Raised when configuration sources cannot be turned into raw trees.
#[derive(Debug, Error)]
pub enum ConfigLoadError {
    /// The mandatory defaults file does not exist.
    #[error("configuration file not found at {path}")]
    NotFound { path: PathBuf },

    /// A configuration file is not valid YAML.
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// A configuration file parsed, but its top level is not a mapping.
    #[error("{path} must contain a mapping with `public` and `private` sections, found {found}")]
    NotAMapping { path: PathBuf, found: &'static str },

    /// An environment override carried a value of the wrong kind.
    #[error("environment variable {var} has invalid value {value:?}: expected {expected}")]
    InvalidEnv {
        var: String,
        value: String,
        expected: &'static str,
    },

    /// Wrapper for IO errors.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Raised by a badge renderer. Never fatal; the HTTP layer turns every
/// variant into the not-found stand-in badge.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    /// The subject does not name anything the renderer knows.
    #[error("badge subject not found: {subject}")]
    NotFound { subject: String },

    /// A query parameter the renderer needs was not supplied.
    #[error("missing required parameter: {name}")]
    MissingParameter { name: String },

    /// The renderer failed for any other reason.
    #[error("renderer failed: {message}")]
    Failed { message: String },
}
