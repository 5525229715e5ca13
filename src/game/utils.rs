use chess::{Board, Color, Piece, Square, ALL_SQUARES};

/// Human readable side name used in status lines
pub fn color_to_string(color: Color) -> &'static str {
    match color {
        Color::White => "White",
        Color::Black => "Black",
    }
}

/// Single letter side code used on the wire ("w" / "b")
pub fn color_to_letter(color: Color) -> &'static str {
    match color {
        Color::White => "w",
        Color::Black => "b",
    }
}

pub fn color_from_letter(letter: &str) -> Option<Color> {
    match letter {
        "w" | "W" => Some(Color::White),
        "b" | "B" => Some(Color::Black),
        _ => None,
    }
}

/// Lowercase piece letter ("p", "n", "b", "r", "q", "k")
pub fn piece_to_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

pub fn piece_from_letter(letter: &str) -> Option<Piece> {
    match letter.to_ascii_lowercase().as_str() {
        "p" => Some(Piece::Pawn),
        "n" => Some(Piece::Knight),
        "b" => Some(Piece::Bishop),
        "r" => Some(Piece::Rook),
        "q" => Some(Piece::Queen),
        "k" => Some(Piece::King),
        _ => None,
    }
}

/// FEN letter: uppercase for White, lowercase for Black
pub fn fen_letter(piece: Piece, color: Color) -> char {
    let letter = piece_to_letter(piece);
    match color {
        Color::White => letter.to_ascii_uppercase(),
        Color::Black => letter,
    }
}

fn is_light_square(square: Square) -> bool {
    (square.get_rank().to_index() + square.get_file().to_index()) % 2 == 1
}

/// Check if the board has insufficient material for checkmate
///
/// Covers K v K, K+minor v K, and any number of bishops all on one square color.
pub fn has_insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn).popcnt()
        + board.pieces(Piece::Rook).popcnt()
        + board.pieces(Piece::Queen).popcnt();
    if heavy > 0 {
        return false;
    }

    let knights = board.pieces(Piece::Knight).popcnt();
    let bishops = board.pieces(Piece::Bishop).popcnt();

    if knights + bishops <= 1 {
        return true;
    }
    if knights > 0 {
        return false;
    }

    // Only bishops left: a draw when they all sit on the same square color
    let mut light = 0;
    let mut dark = 0;
    for square in ALL_SQUARES.iter() {
        if board.piece_on(*square) == Some(Piece::Bishop) {
            if is_light_square(*square) {
                light += 1;
            } else {
                dark += 1;
            }
        }
    }
    light == 0 || dark == 0
}

/// The "whose turn" banner from the local player's point of view
pub fn turn_banner(local: Color, side_to_move: Color) -> String {
    let whose = if local == side_to_move {
        "your"
    } else {
        "your opponent's"
    };
    format!(
        "It is {} turn.  You are playing {}",
        whose,
        color_to_string(local)
    )
}
