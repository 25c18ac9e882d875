//! Route registration errors.

use std::fmt;

/// An invalid route registration.
///
/// All variants are programmer faults surfaced at registration time; a
/// router never produces one of these while dispatching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    /// The method string was empty.
    EmptyMethod,
    /// The pattern was empty.
    EmptyPath,
    /// The pattern did not begin with `/`.
    MissingLeadingSlash {
        /// The offending pattern.
        path: String,
    },
    /// The pattern itself is malformed: unnamed wildcard, more than one
    /// wildcard per segment, duplicate parameter names, or a non-terminal
    /// catch-all.
    BadPattern {
        /// The offending pattern.
        path: String,
        /// What exactly is wrong with it.
        detail: String,
    },
    /// The pattern is well-formed but collides with an already registered
    /// route.
    Conflict {
        /// The pattern that could not be registered.
        path: String,
        /// The colliding registration, human-readable.
        detail: String,
    },
}

impl RouteError {
    pub(crate) fn bad_pattern(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::BadPattern {
            path: path.into(),
            detail: detail.into(),
        }
    }

    pub(crate) fn conflict(path: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Conflict {
            path: path.into(),
            detail: detail.into(),
        }
    }

    /// True for the [`RouteError::Conflict`] variant.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

impl fmt::Display for RouteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyMethod => write!(f, "method must not be empty"),
            Self::EmptyPath => write!(f, "path must not be empty"),
            Self::MissingLeadingSlash { path } => {
                write!(f, "path must begin with '/' in path '{path}'")
            }
            Self::BadPattern { path, detail } => {
                write!(f, "invalid pattern '{path}': {detail}")
            }
            Self::Conflict { path, detail } => {
                write!(f, "route conflict in path '{path}': {detail}")
            }
        }
    }
}

impl std::error::Error for RouteError {}
