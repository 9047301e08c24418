//! Developer warnings: non-fatal hints surfaced only in dev mode.

use std::fmt;

use crate::drawlist::DrawlistVersion;
use crate::layout::Rect;
use crate::tree::{InstanceId, NodeKind};

/// A heuristic problem that never blocks a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DevWarning {
    /// A node with something to draw was laid out with no area.
    ZeroSize {
        /// Node kind.
        kind: NodeKind,
        /// Instance, when known.
        instance: Option<InstanceId>,
    },
    /// A box border does not fit its rect and was skipped.
    BorderTooSmall {
        /// Instance, when known.
        instance: Option<InstanceId>,
        /// The box rect.
        rect: Rect,
    },
    /// The target drawlist version cannot carry this node; a placeholder
    /// was drawn instead.
    Unsupported {
        /// Node kind.
        kind: NodeKind,
        /// Target version.
        version: DrawlistVersion,
    },
    /// A dropdown's anchor id matched no node.
    MissingAnchor {
        /// The anchor id.
        anchor: String,
    },
}

impl fmt::Display for DevWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroSize { kind, instance } => match instance {
                Some(id) => write!(f, "{kind} {id} has zero size and will never paint"),
                None => write!(f, "{kind} has zero size and will never paint"),
            },
            Self::BorderTooSmall { rect, .. } => {
                write!(f, "box border does not fit in {rect:?}")
            }
            Self::Unsupported { kind, version } => {
                write!(f, "{kind} cannot be encoded for drawlist {version:?}")
            }
            Self::MissingAnchor { anchor } => write!(f, "dropdown anchor {anchor:?} not found"),
        }
    }
}

/// Receiver of developer warnings.
pub trait WarningSink {
    /// Called once per warning.
    fn warn(&mut self, warning: &DevWarning);
}

impl<F: FnMut(&DevWarning)> WarningSink for F {
    fn warn(&mut self, warning: &DevWarning) {
        self(warning);
    }
}

/// Sink that only logs through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWarnings;

impl WarningSink for LogWarnings {
    fn warn(&mut self, _warning: &DevWarning) {}
}

/// Log `warning` and hand it to `sink`.
pub(crate) fn emit(sink: &mut dyn WarningSink, warning: &DevWarning) {
    tracing::warn!(%warning, "dev warning");
    sink.warn(warning);
}
