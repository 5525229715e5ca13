use chess::Square;
use thiserror::Error;

/// Everything that can go wrong while two peers play over the channel.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("Invalid move: {from} to {to}")]
    InvalidMove { from: Square, to: Square },

    #[error("Please wait for your opponent to make their move.")]
    NotYourTurn,

    #[error("A move is being animated")]
    AnimationInProgress,

    #[error("No piece of yours at {0}")]
    NoPieceToGrab(Square),

    #[error("No piece is grabbed")]
    NothingGrabbed,

    #[error("The boards are out of sync: {reason}")]
    DesyncDetected { reason: String },

    #[error("A remote move is already waiting to be replayed")]
    PendingMoveOverflow,

    #[error("The {0} launch parameter is missing")]
    MissingLaunchParameter(&'static str),

    #[error("Invalid value for the {name} launch parameter: {value}")]
    InvalidLaunchParameter { name: &'static str, value: String },

    #[error("Transport failure: {0}")]
    TransportFailure(String),

    #[error("Cannot animate a move from {0} to itself")]
    ZeroDisplacement(Square),

    #[error("Square {0} has no rendered position")]
    UnresolvedSquare(Square),

    #[error("Animation aborted: {reason}")]
    Aborted { reason: String },

    #[error("Game halted: {cause}")]
    Halted { cause: String },

    #[error("Malformed channel message: {0}")]
    MalformedMessage(String),
}

/// How far an error travels before it is absorbed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Reverted visually, nothing shown.
    Silent,
    /// Shown, play continues.
    Notice,
    /// Shown and must be acknowledged.
    Blocking,
    /// The session cannot continue.
    Fatal,
}

impl SyncError {
    pub fn severity(&self) -> Severity {
        match self {
            SyncError::InvalidMove { .. }
            | SyncError::AnimationInProgress
            | SyncError::NoPieceToGrab(_)
            | SyncError::NothingGrabbed
            | SyncError::MalformedMessage(_) => Severity::Silent,
            SyncError::NotYourTurn => Severity::Blocking,
            SyncError::TransportFailure(_) | SyncError::Aborted { .. } => Severity::Notice,
            SyncError::DesyncDetected { .. }
            | SyncError::PendingMoveOverflow
            | SyncError::MissingLaunchParameter(_)
            | SyncError::InvalidLaunchParameter { .. }
            | SyncError::ZeroDisplacement(_)
            | SyncError::UnresolvedSquare(_)
            | SyncError::Halted { .. } => Severity::Fatal,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }

    pub(crate) fn desync(reason: impl Into<String>) -> Self {
        SyncError::DesyncDetected {
            reason: reason.into(),
        }
    }
}
