use chess::{Color, Piece, Square, ALL_SQUARES};

use crate::game::rules::RulesEngine;
use crate::game::utils::{color_to_letter, piece_to_letter};
use crate::models::{Move, SquarePatch};

/// What the renderer currently shows, kept so that each board update only
/// touches the squares that changed.
#[derive(Debug, Clone)]
pub struct BoardProjection {
    squares: [Option<(Piece, Color)>; 64],
    /// Pieces taken by White
    white_jail: Vec<Piece>,
    /// Pieces taken by Black
    black_jail: Vec<Piece>,
}

impl Default for BoardProjection {
    fn default() -> Self {
        Self::empty()
    }
}

pub fn occupant_code(piece: Piece, color: Color) -> String {
    format!("{}{}", color_to_letter(color), piece_to_letter(piece))
}

impl BoardProjection {
    /// A projection that has drawn nothing yet; the first sync patches every
    /// occupied square.
    pub fn empty() -> Self {
        Self {
            squares: [None; 64],
            white_jail: Vec::new(),
            black_jail: Vec::new(),
        }
    }

    pub fn occupant(&self, square: Square) -> Option<(Piece, Color)> {
        self.squares[square.to_index()]
    }

    /// Brings the projection in line with the rules engine and returns the
    /// squares that had to change.
    pub fn sync(&mut self, rules: &dyn RulesEngine) -> Vec<SquarePatch> {
        let mut patches = Vec::new();
        for square in ALL_SQUARES.iter() {
            let actual = rules.piece_at(*square);
            let shown = &mut self.squares[square.to_index()];
            if *shown != actual {
                *shown = actual;
                patches.push(SquarePatch {
                    square: square.to_string(),
                    piece: actual.map(|(piece, color)| occupant_code(piece, color)),
                });
            }
        }
        patches
    }

    /// Puts the captured piece of an applied move into the capturer's jail.
    /// Returns the jail side and the piece that went in.
    pub fn record_capture(&mut self, applied: &Move) -> Option<(Color, Piece)> {
        let captured = applied.captured()?;
        match applied.color() {
            Color::White => self.white_jail.push(captured),
            Color::Black => self.black_jail.push(captured),
        }
        Some((applied.color(), captured))
    }

    pub fn jail(&self, capturer: Color) -> &[Piece] {
        match capturer {
            Color::White => &self.white_jail,
            Color::Black => &self.black_jail,
        }
    }
}
