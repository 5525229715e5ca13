use chess::{Color, File, Rank, Square};

/// A point in board space, in pixels, origin at the top-left corner of the
/// rendered board.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: Point) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl std::ops::Add for Point {
    type Output = Point;

    fn add(self, rhs: Point) -> Point {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl std::ops::Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Point) -> Point {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// Resolves a square to the center of its rendered cell.
pub trait SquareLocator {
    fn square_center(&self, square: Square) -> Option<Point>;
}

/// Flat 8x8 layout seen from the local player's side: White sees a1 at the
/// bottom-left, Black sees the board rotated by 180 degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoardGeometry {
    square_size: f64,
    orientation: Color,
}

impl BoardGeometry {
    pub fn new(square_size: f64, orientation: Color) -> Self {
        Self {
            square_size,
            orientation,
        }
    }

    pub fn square_size(&self) -> f64 {
        self.square_size
    }

    pub fn orientation(&self) -> Color {
        self.orientation
    }

    /// Column and row on screen, counted from the top-left
    fn cell(&self, square: Square) -> (usize, usize) {
        let seen = match self.orientation {
            Color::White => square,
            Color::Black => flip_square(square),
        };
        (seen.get_file().to_index(), 7 - seen.get_rank().to_index())
    }

    /// The square whose cell is closest to `point`. Points off the board
    /// snap to the nearest edge cell.
    pub fn nearest_square(&self, point: Point) -> Square {
        let clamp = |v: f64| -> usize {
            let cell = (v / self.square_size).floor();
            cell.clamp(0.0, 7.0) as usize
        };
        let column = clamp(point.x);
        let row = clamp(point.y);
        let (file, rank) = match self.orientation {
            Color::White => (column, 7 - row),
            Color::Black => (7 - column, row),
        };
        Square::make_square(Rank::from_index(rank), File::from_index(file))
    }
}

impl SquareLocator for BoardGeometry {
    fn square_center(&self, square: Square) -> Option<Point> {
        if !(self.square_size.is_finite() && self.square_size > 0.0) {
            return None;
        }
        let (column, row) = self.cell(square);
        Some(Point::new(
            (column as f64 + 0.5) * self.square_size,
            (row as f64 + 0.5) * self.square_size,
        ))
    }
}

/// The square a piece would cover if the board were rotated 180 degrees
pub fn flip_square(square: Square) -> Square {
    Square::make_square(
        Rank::from_index(7 - square.get_rank().to_index()),
        File::from_index(7 - square.get_file().to_index()),
    )
}
