use chess::{Color, Piece, Square};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::str::FromStr;

use crate::error::SyncError;
use crate::game::utils::{color_from_letter, color_to_letter, piece_from_letter, piece_to_letter};

/// A move that the rules engine has accepted.
///
/// Travels on the wire as a "pretty move":
/// `{"color":"w","from":"e2","to":"e4","piece":"p","flags":"b","san":"e4"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "PrettyMove", into = "PrettyMove")]
pub struct Move {
    from: Square,
    to: Square,
    piece: Piece,
    color: Color,
    promotion: Option<Piece>,
    captured: Option<Piece>,
    flags: String,
    san: String,
}

impl Move {
    pub fn new(from: Square, to: Square, piece: Piece, color: Color) -> Self {
        Self {
            from,
            to,
            piece,
            color,
            promotion: None,
            captured: None,
            flags: "n".to_string(),
            san: String::new(),
        }
    }

    pub fn with_capture(mut self, captured: Piece) -> Self {
        self.captured = Some(captured);
        self
    }

    pub fn with_promotion(mut self, promotion: Piece) -> Self {
        self.promotion = Some(promotion);
        self
    }

    pub fn with_notation(mut self, flags: impl Into<String>, san: impl Into<String>) -> Self {
        self.flags = flags.into();
        self.san = san.into();
        self
    }

    pub fn from(&self) -> Square {
        self.from
    }

    pub fn to(&self) -> Square {
        self.to
    }

    pub fn piece(&self) -> Piece {
        self.piece
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn promotion(&self) -> Option<Piece> {
        self.promotion
    }

    pub fn captured(&self) -> Option<Piece> {
        self.captured
    }

    pub fn is_capture(&self) -> bool {
        self.captured.is_some()
    }

    pub fn flags(&self) -> &str {
        &self.flags
    }

    pub fn san(&self) -> &str {
        &self.san
    }

    /// Two moves describe the same board change, ignoring notation.
    pub fn same_action(&self, other: &Move) -> bool {
        self.from == other.from
            && self.to == other.to
            && self.piece == other.piece
            && self.color == other.color
            && self.promotion == other.promotion
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{} {}{}",
            color_to_letter(self.color),
            piece_to_letter(self.piece),
            self.from,
            self.to
        )?;
        if let Some(promotion) = self.promotion {
            write!(f, "={}", piece_to_letter(promotion))?;
        }
        Ok(())
    }
}

/// Wire shape of a move
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PrettyMove {
    pub color: String,
    pub from: String,
    pub to: String,
    pub piece: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub captured: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<String>,
    #[serde(default)]
    pub flags: String,
    #[serde(default)]
    pub san: String,
}

fn parse_square(field: &str, value: &str) -> Result<Square, SyncError> {
    Square::from_str(&value.to_lowercase())
        .map_err(|_| SyncError::MalformedMessage(format!("bad {} square: {}", field, value)))
}

fn parse_piece(field: &str, value: &str) -> Result<Piece, SyncError> {
    piece_from_letter(value)
        .ok_or_else(|| SyncError::MalformedMessage(format!("bad {} piece: {}", field, value)))
}

impl TryFrom<PrettyMove> for Move {
    type Error = SyncError;

    fn try_from(pretty: PrettyMove) -> Result<Self, Self::Error> {
        let color = color_from_letter(&pretty.color)
            .ok_or_else(|| SyncError::MalformedMessage(format!("bad color: {}", pretty.color)))?;
        let from = parse_square("from", &pretty.from)?;
        let to = parse_square("to", &pretty.to)?;
        let piece = parse_piece("piece", &pretty.piece)?;
        let captured = pretty
            .captured
            .as_deref()
            .map(|p| parse_piece("captured", p))
            .transpose()?;
        let promotion = pretty
            .promotion
            .as_deref()
            .map(|p| parse_piece("promotion", p))
            .transpose()?;

        Ok(Move {
            from,
            to,
            piece,
            color,
            promotion,
            captured,
            flags: if pretty.flags.is_empty() {
                "n".to_string()
            } else {
                pretty.flags
            },
            san: pretty.san,
        })
    }
}

impl From<Move> for PrettyMove {
    fn from(m: Move) -> Self {
        PrettyMove {
            color: color_to_letter(m.color).to_string(),
            from: m.from.to_string(),
            to: m.to.to_string(),
            piece: piece_to_letter(m.piece).to_string(),
            captured: m.captured.map(|p| piece_to_letter(p).to_string()),
            promotion: m.promotion.map(|p| piece_to_letter(p).to_string()),
            flags: m.flags,
            san: m.san,
        }
    }
}
