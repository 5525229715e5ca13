use serde::{Deserialize, Serialize};

use crate::error::Severity;
use crate::models::chess_move::Move;

/// Payload published on the shared channel, discriminated by `type`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChannelMessage {
    ChessMove {
        #[serde(rename = "move")]
        chess_move: Move,
        src_uuid: String,
        target_uuid: String,
    },
    Chat {
        payload: ChatPayload,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ChatPayload {
    pub text: String,
    pub uuid: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PresenceAction {
    Join,
    Leave,
    Timeout,
}

/// Presence notification from the transport
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PresenceEvent {
    pub action: PresenceAction,
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
}

/// Input sent by the browser page that renders the board
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "message_type", rename_all = "snake_case")]
pub enum ClientMessage {
    Grab { square: String },
    Drag { x: f64, y: f64 },
    Drop,
    Release,
    Move { move_from: String, move_to: String },
    Chat { text: String },
}

/// One square of the rendered board that changed
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SquarePatch {
    pub square: String,
    /// Color letter followed by piece letter ("wp"), `None` for an emptied square
    pub piece: Option<String>,
}

/// Everything the renderer needs to draw, pushed from the game session
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum UiEvent {
    BoardUpdated {
        patches: Vec<SquarePatch>,
        fen: String,
        status: String,
        turn: String,
    },
    Highlight {
        from: String,
        valid: Vec<String>,
        captures: Vec<String>,
    },
    ClearHighlights,
    ClosestSquare {
        square: String,
    },
    PieceMoved {
        square: String,
        x: f64,
        y: f64,
    },
    PieceReverted {
        square: String,
    },
    Captured {
        jail: String,
        piece: String,
    },
    MoveApplied {
        #[serde(rename = "move")]
        chess_move: Move,
        remote: bool,
    },
    Opponent {
        uuid: Option<String>,
        skill: Option<String>,
    },
    Chat {
        uuid: String,
        text: String,
    },
    Notice {
        severity: Severity,
        text: String,
    },
}
