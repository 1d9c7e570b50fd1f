//! Error types for the `archipelago_core` crate.
//!
//! Search failures are not errors: planners return `None` and the policy
//! falls through to its next rule. The variants here are either invalid
//! input or broken invariants that must stop the engine.

use crate::{Action, map::GridError};

/// Errors that can occur while running the explorer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A heading value outside the four cardinal directions.
    #[error("heading value {0} is out of range")]
    InvalidHeading(u8),

    /// An action was chosen whose precondition does not hold.
    #[error("cannot perform {action:?}: {reason}")]
    PreconditionViolation {
        action: Action,
        reason: &'static str,
    },

    /// The transport has no more observations to deliver.
    #[error("observation stream closed")]
    ObservationStreamClosed,

    /// An observation contained a glyph outside the alphabet.
    #[error("unrecognised glyph {glyph:?} in observation")]
    UnknownGlyph { glyph: char },

    /// An observation did not have the 5x5 shape.
    #[error("malformed observation: {0}")]
    MalformedObservation(String),

    /// A map description could not be loaded.
    #[error("invalid map: {0}")]
    InvalidMap(String),

    #[error(transparent)]
    Grid(#[from] GridError),
}
