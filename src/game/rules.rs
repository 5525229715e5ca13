use chess::{Board, BoardStatus, ChessMove, Color, File, MoveGen, Piece, Rank, Square};
use std::str::FromStr;

use crate::error::SyncError;
use crate::game::utils::{color_to_string, fen_letter, has_insufficient_material, piece_to_letter};
use crate::models::Move;

/// The narrow view of a chess rules engine the coordinator relies on.
pub trait RulesEngine {
    fn side_to_move(&self) -> Color;

    /// Legal moves for the piece standing on `from`
    fn legal_moves(&self, from: Square) -> Vec<Move>;

    fn piece_at(&self, square: Square) -> Option<(Piece, Color)>;

    /// Applies a move. Pawns reaching the last rank promote to `promotion`,
    /// or to a queen when none is given.
    fn apply_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Result<Move, SyncError>;

    fn undo_last_move(&mut self) -> Option<Move>;

    fn is_in_check(&self) -> bool;
    fn is_checkmate(&self) -> bool;
    fn is_stalemate(&self) -> bool;
    fn is_draw(&self) -> bool;
    fn is_threefold_repetition(&self) -> bool;

    /// Canonical position string
    fn fen(&self) -> String;

    fn status_line(&self) -> String {
        let mover = color_to_string(self.side_to_move());
        let other = color_to_string(!self.side_to_move());
        if self.is_checkmate() {
            format!("{}'s king is in checkmate ! {} wins !", mover, other)
        } else if self.is_stalemate() {
            "Stalemate ! The game is a draw".to_string()
        } else if self.is_threefold_repetition() {
            "Threefold repetition ! The game is a draw".to_string()
        } else if self.is_draw() {
            "The game is a draw".to_string()
        } else if self.is_in_check() {
            format!("{}'s king is in check !", mover)
        } else {
            format!("{}'s turn", mover)
        }
    }
}

#[derive(Debug, Clone)]
struct Snapshot {
    board: Board,
    ep_target: Option<Square>,
    halfmove_clock: u32,
    fullmove_number: u32,
}

/// `RulesEngine` backed by the `chess` crate.
///
/// The crate's `Board` knows nothing about move clocks or the en passant
/// target of a non-capturable double push, so those are tracked here to
/// produce a full FEN.
#[derive(Debug, Clone)]
pub struct ChessRules {
    current: Snapshot,
    history: Vec<(Snapshot, Move)>,
}

impl Default for ChessRules {
    fn default() -> Self {
        Self::new()
    }
}

impl ChessRules {
    pub fn new() -> Self {
        Self {
            current: Snapshot {
                board: Board::default(),
                ep_target: None,
                halfmove_clock: 0,
                fullmove_number: 1,
            },
            history: Vec::new(),
        }
    }

    pub fn from_fen(fen: &str) -> Result<Self, SyncError> {
        let board = Board::from_str(fen)
            .map_err(|e| SyncError::MalformedMessage(format!("bad FEN {}: {:?}", fen, e)))?;
        let fields: Vec<&str> = fen.split_whitespace().collect();
        let ep_target = fields.get(3).and_then(|s| Square::from_str(s).ok());
        let halfmove_clock = fields.get(4).and_then(|s| s.parse().ok()).unwrap_or(0);
        let fullmove_number = fields.get(5).and_then(|s| s.parse().ok()).unwrap_or(1);

        Ok(Self {
            current: Snapshot {
                board,
                ep_target,
                halfmove_clock,
                fullmove_number,
            },
            history: Vec::new(),
        })
    }

    fn describe(&self, chess_move: ChessMove) -> Option<Move> {
        let board = &self.current.board;
        let from = chess_move.get_source();
        let to = chess_move.get_dest();
        let piece = board.piece_on(from)?;
        let color = board.color_on(from)?;

        let file_shift = from.get_file().to_index() as i32 - to.get_file().to_index() as i32;
        let rank_shift = from.get_rank().to_index() as i32 - to.get_rank().to_index() as i32;

        let en_passant = piece == Piece::Pawn && file_shift != 0 && board.piece_on(to).is_none();
        let captured = if en_passant {
            Some(Piece::Pawn)
        } else {
            board.piece_on(to)
        };
        let castle = if piece == Piece::King && file_shift.abs() == 2 {
            Some(if file_shift < 0 { 'k' } else { 'q' })
        } else {
            None
        };

        let mut flags = String::new();
        if captured.is_some() && !en_passant {
            flags.push('c');
        }
        if piece == Piece::Pawn && rank_shift.abs() == 2 {
            flags.push('b');
        }
        if en_passant {
            flags.push('e');
        }
        if chess_move.get_promotion().is_some() {
            flags.push('p');
        }
        if let Some(side) = castle {
            flags.push(side);
        }
        if flags.is_empty() {
            flags.push('n');
        }

        let san = self.san(chess_move, piece, captured.is_some(), castle);

        let mut described = Move::new(from, to, piece, color).with_notation(flags, san);
        if let Some(captured) = captured {
            described = described.with_capture(captured);
        }
        if let Some(promotion) = chess_move.get_promotion() {
            described = described.with_promotion(promotion);
        }
        Some(described)
    }

    fn san(&self, chess_move: ChessMove, piece: Piece, capture: bool, castle: Option<char>) -> String {
        let board = &self.current.board;
        let from = chess_move.get_source();
        let to = chess_move.get_dest();

        let mut san = match castle {
            Some('k') => "O-O".to_string(),
            Some(_) => "O-O-O".to_string(),
            None => {
                let mut text = String::new();
                if piece == Piece::Pawn {
                    if capture {
                        text.push_str(&from.to_string()[..1]);
                    }
                } else {
                    text.push(piece_to_letter(piece).to_ascii_uppercase());
                    text.push_str(&disambiguation(board, chess_move, piece));
                }
                if capture {
                    text.push('x');
                }
                text.push_str(&to.to_string());
                if let Some(promotion) = chess_move.get_promotion() {
                    text.push('=');
                    text.push(piece_to_letter(promotion).to_ascii_uppercase());
                }
                text
            }
        };

        let after = board.make_move_new(chess_move);
        if after.status() == BoardStatus::Checkmate {
            san.push('#');
        } else if after.checkers().popcnt() > 0 {
            san.push('+');
        }
        san
    }

    fn repetition_count(&self) -> usize {
        let key = self.current.board.get_hash();
        1 + self
            .history
            .iter()
            .filter(|(snapshot, _)| snapshot.board.get_hash() == key)
            .count()
    }
}

/// File, rank or full square needed to tell two identical pieces apart
fn disambiguation(board: &Board, chess_move: ChessMove, piece: Piece) -> String {
    let from = chess_move.get_source();
    let to = chess_move.get_dest();
    let rivals: Vec<Square> = MoveGen::new_legal(board)
        .filter(|m| {
            m.get_dest() == to && m.get_source() != from && board.piece_on(m.get_source()) == Some(piece)
        })
        .map(|m| m.get_source())
        .collect();

    if rivals.is_empty() {
        return String::new();
    }
    let same_file = rivals.iter().any(|s| s.get_file() == from.get_file());
    let same_rank = rivals.iter().any(|s| s.get_rank() == from.get_rank());
    let square = from.to_string();
    if same_file && same_rank {
        square
    } else if same_file {
        square[1..].to_string()
    } else {
        square[..1].to_string()
    }
}

impl RulesEngine for ChessRules {
    fn side_to_move(&self) -> Color {
        self.current.board.side_to_move()
    }

    fn legal_moves(&self, from: Square) -> Vec<Move> {
        MoveGen::new_legal(&self.current.board)
            .filter(|m| m.get_source() == from)
            .filter_map(|m| self.describe(m))
            .collect()
    }

    fn piece_at(&self, square: Square) -> Option<(Piece, Color)> {
        let board = &self.current.board;
        Some((board.piece_on(square)?, board.color_on(square)?))
    }

    fn apply_move(
        &mut self,
        from: Square,
        to: Square,
        promotion: Option<Piece>,
    ) -> Result<Move, SyncError> {
        let invalid = SyncError::InvalidMove { from, to };
        let board = self.current.board;
        let (piece, color) = self.piece_at(from).ok_or_else(|| invalid.clone())?;
        if color != board.side_to_move() {
            return Err(invalid);
        }

        let last_rank = match color {
            Color::White => Rank::Eighth,
            Color::Black => Rank::First,
        };
        let promotion = if piece == Piece::Pawn && to.get_rank() == last_rank {
            Some(promotion.unwrap_or(Piece::Queen))
        } else {
            None
        };

        let candidate = ChessMove::new(from, to, promotion);
        if !MoveGen::new_legal(&board).any(|m| m == candidate) {
            return Err(invalid);
        }
        let applied = self.describe(candidate).ok_or(invalid)?;

        let before = self.current.clone();
        let rank_shift = from.get_rank().to_index() as i32 - to.get_rank().to_index() as i32;
        self.current.ep_target = if piece == Piece::Pawn && rank_shift.abs() == 2 {
            let middle = (from.get_rank().to_index() + to.get_rank().to_index()) / 2;
            Some(Square::make_square(Rank::from_index(middle), from.get_file()))
        } else {
            None
        };
        self.current.halfmove_clock = if piece == Piece::Pawn || applied.is_capture() {
            0
        } else {
            self.current.halfmove_clock + 1
        };
        if color == Color::Black {
            self.current.fullmove_number += 1;
        }
        self.current.board = board.make_move_new(candidate);
        self.history.push((before, applied.clone()));

        Ok(applied)
    }

    fn undo_last_move(&mut self) -> Option<Move> {
        let (before, undone) = self.history.pop()?;
        self.current = before;
        Some(undone)
    }

    fn is_in_check(&self) -> bool {
        self.current.board.checkers().popcnt() > 0
    }

    fn is_checkmate(&self) -> bool {
        self.current.board.status() == BoardStatus::Checkmate
    }

    fn is_stalemate(&self) -> bool {
        self.current.board.status() == BoardStatus::Stalemate
    }

    fn is_draw(&self) -> bool {
        self.current.halfmove_clock >= 100
            || self.is_stalemate()
            || has_insufficient_material(&self.current.board)
            || self.is_threefold_repetition()
    }

    fn is_threefold_repetition(&self) -> bool {
        self.repetition_count() >= 3
    }

    fn fen(&self) -> String {
        let board = &self.current.board;
        let mut placement = String::new();
        for rank in (0..8).rev() {
            let mut empty = 0;
            for file in 0..8 {
                let square = Square::make_square(Rank::from_index(rank), File::from_index(file));
                match (board.piece_on(square), board.color_on(square)) {
                    (Some(piece), Some(color)) => {
                        if empty > 0 {
                            placement.push_str(&empty.to_string());
                            empty = 0;
                        }
                        placement.push(fen_letter(piece, color));
                    }
                    _ => empty += 1,
                }
            }
            if empty > 0 {
                placement.push_str(&empty.to_string());
            }
            if rank > 0 {
                placement.push('/');
            }
        }

        let mut castling = String::new();
        let white = board.castle_rights(Color::White);
        let black = board.castle_rights(Color::Black);
        if white.has_kingside() {
            castling.push('K');
        }
        if white.has_queenside() {
            castling.push('Q');
        }
        if black.has_kingside() {
            castling.push('k');
        }
        if black.has_queenside() {
            castling.push('q');
        }
        if castling.is_empty() {
            castling.push('-');
        }

        let side = match board.side_to_move() {
            Color::White => "w",
            Color::Black => "b",
        };
        let ep = self
            .current
            .ep_target
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());

        format!(
            "{} {} {} {} {} {}",
            placement,
            side,
            castling,
            ep,
            self.current.halfmove_clock,
            self.current.fullmove_number
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn play(rules: &mut ChessRules, moves: &[(Square, Square)]) {
        for (from, to) in moves {
            rules.apply_move(*from, *to, None).unwrap();
        }
    }

    #[test]
    fn start_position_fen() {
        assert_eq!(ChessRules::new().fen(), START);
    }

    #[test]
    fn king_pawn_opening() {
        let mut rules = ChessRules::new();
        let m = rules.apply_move(Square::E2, Square::E4, None).unwrap();
        assert_eq!(m.piece(), Piece::Pawn);
        assert_eq!(m.color(), Color::White);
        assert_eq!(m.flags(), "b");
        assert_eq!(m.san(), "e4");
        assert_eq!(
            rules.fen(),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1"
        );
        assert_eq!(rules.side_to_move(), Color::Black);
    }

    #[test]
    fn illegal_move_leaves_the_position_alone() {
        let mut rules = ChessRules::new();
        let err = rules.apply_move(Square::E2, Square::E5, None).unwrap_err();
        assert_eq!(
            err,
            SyncError::InvalidMove {
                from: Square::E2,
                to: Square::E5
            }
        );
        // Black piece on White's turn
        assert!(rules.apply_move(Square::E7, Square::E5, None).is_err());
        assert_eq!(rules.fen(), START);
        assert!(rules.undo_last_move().is_none());
    }

    #[test]
    fn undo_restores_clocks_and_en_passant() {
        let mut rules = ChessRules::new();
        play(&mut rules, &[(Square::G1, Square::F3)]);
        let after_knight = rules.fen();
        rules.apply_move(Square::E7, Square::E5, None).unwrap();
        let undone = rules.undo_last_move().unwrap();
        assert_eq!(undone.from(), Square::E7);
        assert_eq!(rules.fen(), after_knight);
        assert!(rules.undo_last_move().is_some());
        assert!(rules.undo_last_move().is_none());
        assert_eq!(rules.fen(), START);
    }

    #[test]
    fn en_passant_capture_is_flagged() {
        let mut rules = ChessRules::new();
        play(
            &mut rules,
            &[
                (Square::E2, Square::E4),
                (Square::A7, Square::A6),
                (Square::E4, Square::E5),
                (Square::D7, Square::D5),
            ],
        );
        let m = rules.apply_move(Square::E5, Square::D6, None).unwrap();
        assert_eq!(m.captured(), Some(Piece::Pawn));
        assert_eq!(m.flags(), "e");
        assert_eq!(m.san(), "exd6");
        assert_eq!(rules.piece_at(Square::D5), None);
    }

    #[test]
    fn castling_and_promotion_notation() {
        let mut rules = ChessRules::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let castle = rules.apply_move(Square::E1, Square::G1, None).unwrap();
        assert_eq!(castle.flags(), "k");
        assert_eq!(castle.san(), "O-O");
        assert_eq!(rules.piece_at(Square::F1), Some((Piece::Rook, Color::White)));

        let mut rules = ChessRules::from_fen("8/P7/8/8/8/8/8/k6K w - - 0 1").unwrap();
        let promote = rules.apply_move(Square::A7, Square::A8, None).unwrap();
        assert_eq!(promote.promotion(), Some(Piece::Queen));
        assert_eq!(promote.flags(), "p");
        assert_eq!(promote.san(), "a8=Q+");
    }

    #[test]
    fn knights_are_disambiguated_by_file() {
        let rules = ChessRules::from_fen("4k3/8/8/8/8/5N2/8/1N2K3 w - - 0 1").unwrap();
        let from_b1 = rules
            .legal_moves(Square::B1)
            .into_iter()
            .find(|m| m.to() == Square::D2)
            .unwrap();
        assert_eq!(from_b1.san(), "Nbd2");
    }

    #[test]
    fn legal_moves_for_a_single_piece() {
        let rules = ChessRules::new();
        let mut targets: Vec<Square> = rules.legal_moves(Square::G1).iter().map(|m| m.to()).collect();
        targets.sort();
        assert_eq!(targets, vec![Square::F3, Square::H3]);
        assert!(rules.legal_moves(Square::E4).is_empty());
    }

    #[test]
    fn knight_shuffle_is_a_threefold_repetition() {
        let mut rules = ChessRules::new();
        let shuffle = [
            (Square::G1, Square::F3),
            (Square::G8, Square::F6),
            (Square::F3, Square::G1),
            (Square::F6, Square::G8),
        ];
        play(&mut rules, &shuffle);
        assert!(!rules.is_threefold_repetition());
        play(&mut rules, &shuffle);
        assert!(rules.is_threefold_repetition());
        assert!(rules.is_draw());
        assert_eq!(rules.status_line(), "Threefold repetition ! The game is a draw");
    }

    #[test]
    fn fools_mate_is_detected() {
        let mut rules = ChessRules::new();
        play(
            &mut rules,
            &[
                (Square::F2, Square::F3),
                (Square::E7, Square::E5),
                (Square::G2, Square::G4),
            ],
        );
        let mate = rules.apply_move(Square::D8, Square::H4, None).unwrap();
        assert_eq!(mate.san(), "Qh4#");
        assert!(rules.is_checkmate());
        assert!(rules.is_in_check());
        assert_eq!(rules.status_line(), "White's king is in checkmate ! Black wins !");
    }
}
