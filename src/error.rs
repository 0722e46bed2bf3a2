//! Error type shared by every module of the crate.

use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, DdnetError>;

/// Which representation layer an operation asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReprKind {
    Item,
    Context,
}

impl std::fmt::Display for ReprKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReprKind::Item => write!(f, "item"),
            ReprKind::Context => write!(f, "context"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DdnetError {
    /// Invalid configuration value (sizes, frequencies, thresholds).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `merged_repr` was requested while an item or context representation
    /// layer is skipped.
    #[error("can't both skip and merge representation layers")]
    MergeWithoutRepr,

    #[error("holdout testing and combo testing cannot both be active")]
    HoldoutAndCombo,

    #[error("unrecognized parameter init type '{0}'")]
    UnknownInitType(String),

    #[error("unrecognized holdout mode '{0}'")]
    UnknownHoldoutMode(String),

    #[error("unrecognized snapshot frequency scale '{0}'")]
    UnknownSnapScale(String),

    /// Cluster layout string that does not describe one domain's items.
    #[error("invalid cluster layout '{layout}': {reason}")]
    ClusterLayout { layout: String, reason: String },

    /// The requested representation layer is skipped in this network.
    #[error("no {0} representation to calculate")]
    NoRepresentation(ReprKind),

    /// A held-out item/context combination did not identify exactly one
    /// training example. Signals inconsistent training data.
    #[error("held-out combo for domain {domain} matched {matches} examples, expected exactly 1")]
    ComboMismatch { domain: usize, matches: usize },

    #[error("shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        actual: (usize, usize),
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
