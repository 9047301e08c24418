//! Error types shared by the pipeline stages.
//!
//! Every stage reports failure as a value. Nothing here is ever used for
//! control flow across stage boundaries via panics.

use thiserror::Error;

/// Classification of a fatal commit or layout failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FatalCode {
    /// A numeric prop is non-finite, or geometry overflowed / went negative.
    InvalidProps,
    /// A node appears where its parent cannot hold it (e.g. children under text).
    InvalidNesting,
    /// Two siblings share the same `id`.
    DuplicateId,
}

impl FatalCode {
    /// Stable upper-case name, as reported to hosts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InvalidProps => "INVALID_PROPS",
            Self::InvalidNesting => "INVALID_NESTING",
            Self::DuplicateId => "DUPLICATE_ID",
        }
    }
}

impl std::fmt::Display for FatalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fatal, frame-aborting error from commit or layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {detail}")]
pub struct Fatal {
    /// Error class.
    pub code: FatalCode,
    /// Human-readable detail.
    pub detail: String,
}

impl Fatal {
    /// Create a new fatal error.
    pub fn new(code: FatalCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }

    /// Shorthand for [`FatalCode::InvalidProps`].
    pub fn invalid_props(detail: impl Into<String>) -> Self {
        Self::new(FatalCode::InvalidProps, detail)
    }
}

/// Classification of a drawlist build failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DrawlistErrorCode {
    /// A configured limit (bytes, commands, strings, blobs) was exceeded.
    TooLarge,
    /// An operation received arguments it cannot encode.
    BadParams,
    /// The command stream is structurally invalid (e.g. unbalanced clips).
    Format,
    /// Internal invariant violation.
    Internal,
}

impl DrawlistErrorCode {
    /// Stable upper-case name, as reported to hosts.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TooLarge => "TOO_LARGE",
            Self::BadParams => "BAD_PARAMS",
            Self::Format => "FORMAT",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for DrawlistErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A drawlist build or decode failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("drawlist {code}: {detail}")]
pub struct DrawlistError {
    /// Error class.
    pub code: DrawlistErrorCode,
    /// Human-readable detail.
    pub detail: String,
}

impl DrawlistError {
    /// Create a new drawlist error.
    pub fn new(code: DrawlistErrorCode, detail: impl Into<String>) -> Self {
        Self {
            code,
            detail: detail.into(),
        }
    }
}

/// Failure of one pipeline pass, tagged with the stage that aborted it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Commit rejected the tree; the previous instance tree is untouched.
    #[error("commit: {0}")]
    Commit(Fatal),
    /// Layout rejected the tree.
    #[error("layout: {0}")]
    Layout(Fatal),
    /// The drawlist could not be built.
    #[error(transparent)]
    Drawlist(#[from] DrawlistError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_display() {
        let err = Fatal::invalid_props("width is NaN");
        assert_eq!(err.to_string(), "INVALID_PROPS: width is NaN");
    }

    #[test]
    fn test_drawlist_error_display() {
        let err = DrawlistError::new(DrawlistErrorCode::Format, "unbalanced clip stack");
        assert_eq!(err.to_string(), "drawlist FORMAT: unbalanced clip stack");
    }

    #[test]
    fn test_frame_error_from_drawlist() {
        let err: FrameError = DrawlistError::new(DrawlistErrorCode::TooLarge, "x").into();
        assert!(matches!(err, FrameError::Drawlist(_)));
    }
}
