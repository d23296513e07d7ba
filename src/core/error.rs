//! Error handling for aggcache
//!
//! The reachability engine itself has no recoverable failure modes: its
//! preconditions (acyclic, topologically ordered input with valid indices)
//! are guaranteed by the caller and only checked with `debug_assert!`.
//! Errors therefore come from the edges of the system:
//!
//! - **Live state**: [`AggError::CorruptLiveCache`] covers every problem with a
//!   persisted live state (truncated payload, trailing bytes, bad counts,
//!   version or graph fingerprint mismatch). Callers fall back to a full
//!   rebuild when they see it.
//! - **Graph manifests**: [`AggError::ManifestParseError`],
//!   [`AggError::DuplicatePackage`], [`AggError::UnknownPackage`] and
//!   [`AggError::CircularDependency`] are raised while turning a manifest into
//!   descriptors.
//! - **Configuration and I/O**: [`AggError::ConfigError`] and
//!   [`AggError::IoError`].
//!
//! Use [`user_friendly_error`] to convert any error into an [`ErrorContext`]
//! with a suggestion for CLI users.
//!
//! # Examples
//!
//! ```rust,no_run
//! use aggcache::core::{AggError, user_friendly_error};
//!
//! let error = AggError::CorruptLiveCache {
//!     reason: "unexpected end of input".to_string(),
//! };
//! let ctx = user_friendly_error(anyhow::Error::from(error));
//! ctx.display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The main error type for aggcache operations.
#[derive(Error, Debug)]
pub enum AggError {
    /// Persisted live state cannot be used
    ///
    /// Raised by the live-state codec and its file envelope. It is always
    /// recoverable: the live path discards the state and recomputes every
    /// table from scratch.
    ///
    /// # Fields
    /// - `reason`: What was wrong with the persisted data
    #[error("Corrupt live cache: {reason}")]
    CorruptLiveCache {
        /// What was wrong with the persisted data
        reason: String,
    },

    /// Graph manifest could not be parsed
    #[error("Invalid graph manifest syntax in {file}")]
    ManifestParseError {
        /// Path to the manifest file that failed to parse
        file: String,
        /// Specific reason for the parsing failure
        reason: String,
    },

    /// Two manifest entries share a package name
    #[error("Package '{name}' is declared more than once")]
    DuplicatePackage {
        /// The duplicated package name
        name: String,
    },

    /// A manifest entry references a package that is not declared
    #[error("Package '{referenced_by}' references unknown package '{name}'")]
    UnknownPackage {
        /// Name of the missing package
        name: String,
        /// Name of the package holding the dangling reference
        referenced_by: String,
    },

    /// Circular dependency detected in the package graph
    ///
    /// Example: `a` requires `b`, `b` contains `c`, `c` requires `a`.
    ///
    /// # Fields
    /// - `chain`: The dependency chain showing the circular reference
    #[error("Circular dependency detected: {chain}")]
    CircularDependency {
        /// String representation of the circular dependency chain
        chain: String,
    },

    /// A package name passed on the command line does not exist
    #[error("Package '{name}' not found in graph")]
    PackageNotFound {
        /// The requested package name
        name: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the configuration error
        message: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other error
    #[error("{message}")]
    Other {
        /// Error message
        message: String,
    },
}

impl Clone for AggError {
    fn clone(&self) -> Self {
        match self {
            Self::CorruptLiveCache {
                reason,
            } => Self::CorruptLiveCache {
                reason: reason.clone(),
            },
            Self::ManifestParseError {
                file,
                reason,
            } => Self::ManifestParseError {
                file: file.clone(),
                reason: reason.clone(),
            },
            Self::DuplicatePackage {
                name,
            } => Self::DuplicatePackage {
                name: name.clone(),
            },
            Self::UnknownPackage {
                name,
                referenced_by,
            } => Self::UnknownPackage {
                name: name.clone(),
                referenced_by: referenced_by.clone(),
            },
            Self::CircularDependency {
                chain,
            } => Self::CircularDependency {
                chain: chain.clone(),
            },
            Self::PackageNotFound {
                name,
            } => Self::PackageNotFound {
                name: name.clone(),
            },
            Self::ConfigError {
                message,
            } => Self::ConfigError {
                message: message.clone(),
            },
            // io::Error is not Clone
            Self::IoError(e) => Self::Other {
                message: format!("IO error: {e}"),
            },
            Self::Other {
                message,
            } => Self::Other {
                message: message.clone(),
            },
        }
    }
}

impl AggError {
    /// Shorthand for building a [`AggError::CorruptLiveCache`].
    pub fn corrupt(reason: impl Into<String>) -> Self {
        Self::CorruptLiveCache {
            reason: reason.into(),
        }
    }

    /// Whether the live path should recover from this error by rebuilding.
    #[must_use]
    pub const fn is_corrupt_live_cache(&self) -> bool {
        matches!(self, Self::CorruptLiveCache { .. })
    }
}

/// Error wrapper that adds a suggestion and details for CLI display.
///
/// Suggestions are actionable steps, details explain why the error
/// happened. Both are optional.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error
    pub error: AggError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: AggError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with terminal colors.
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into an [`ErrorContext`] suitable for the CLI.
///
/// Known [`AggError`] variants get tailored suggestions, TOML errors are
/// reported as manifest parse errors, and anything else is rendered with its
/// full `anyhow` cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    if let Some(agg_error) = error.downcast_ref::<AggError>() {
        return create_error_context(agg_error.clone());
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::NotFound
    {
        return ErrorContext::new(AggError::Other {
            message: error.to_string(),
        })
        .with_suggestion("Check that the file or directory exists and the path is correct");
    }

    if let Some(toml_error) = error.downcast_ref::<toml::de::Error>() {
        return ErrorContext::new(AggError::ManifestParseError {
            file: "graph manifest".to_string(),
            reason: toml_error.to_string(),
        })
        .with_suggestion("Check the TOML syntax. Verify quotes, brackets, and [[package]] headers");
    }

    // Generic error - include the full error chain
    let mut message = error.to_string();
    let chain: Vec<String> =
        error.chain().skip(1).map(std::string::ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }

    ErrorContext::new(AggError::Other {
        message,
    })
}

fn create_error_context(error: AggError) -> ErrorContext {
    let (suggestion, details): (Option<String>, Option<String>) = match &error {
        AggError::CorruptLiveCache { .. } => (
            Some("Delete the live state file or run 'aggcache build' without --live to rebuild it".to_string()),
            Some("The persisted live state does not match this build; all aggregates are recomputed".to_string()),
        ),
        AggError::ManifestParseError { file, .. } => (
            Some(format!(
                "Check the TOML syntax in {file}. Each package needs a [[package]] header and a name"
            )),
            None,
        ),
        AggError::DuplicatePackage { name } => (
            Some(format!("Rename or remove one of the '{name}' entries")),
            Some("Package names identify graph nodes and must be unique".to_string()),
        ),
        AggError::UnknownPackage { name, .. } => {
            (Some(format!("Declare package '{name}' or remove the reference to it")), None)
        }
        AggError::CircularDependency { chain } => (
            Some("Review the requires and children lists and remove the circular reference".to_string()),
            Some(format!(
                "Circular dependency chain detected: {chain}. Packages cannot require or contain themselves directly or indirectly"
            )),
        ),
        AggError::PackageNotFound { .. } => (
            Some("Check the name against the [[package]] entries of the graph manifest".to_string()),
            None,
        ),
        AggError::ConfigError { .. } => (
            Some("Check aggcache.toml; only the [live] table with 'enabled' and 'state_path' is recognized".to_string()),
            None,
        ),
        _ => (None, None),
    };

    ErrorContext {
        error,
        suggestion,
        details,
    }
}
