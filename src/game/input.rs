use chess::{Color, Piece, Square};

use crate::error::SyncError;
use crate::game::geometry::{BoardGeometry, Point, SquareLocator};
use crate::game::rules::RulesEngine;
use crate::models::Move;

/// A piece the local player is currently holding
#[derive(Debug, Clone, PartialEq)]
pub struct Grab {
    pub square: Square,
    pub piece: Piece,
    pub color: Color,
    pub origin: Point,
    pub current: Point,
    pub closest: Option<Square>,
    pub destinations: Vec<Move>,
}

impl Grab {
    /// Destination squares, each listed once even when several promotions lead there
    pub fn target_squares(&self) -> Vec<Square> {
        let mut squares: Vec<Square> = Vec::new();
        for m in &self.destinations {
            if !squares.contains(&m.to()) {
                squares.push(m.to());
            }
        }
        squares
    }

    pub fn capture_squares(&self) -> Vec<Square> {
        let mut squares: Vec<Square> = Vec::new();
        for m in self.destinations.iter().filter(|m| m.is_capture()) {
            if !squares.contains(&m.to()) {
                squares.push(m.to());
            }
        }
        squares
    }

    /// Where a drop right now would land
    pub fn drop_square(&self) -> Square {
        self.closest.unwrap_or(self.square)
    }
}

/// Tracks the grab/drag/drop gesture of the local player
#[derive(Debug, Clone)]
pub struct InputController {
    geometry: BoardGeometry,
    grab: Option<Grab>,
}

impl InputController {
    pub fn new(geometry: BoardGeometry) -> Self {
        Self {
            geometry,
            grab: None,
        }
    }

    pub fn is_grabbing(&self) -> bool {
        self.grab.is_some()
    }

    pub fn current(&self) -> Option<&Grab> {
        self.grab.as_ref()
    }

    pub fn grab(
        &mut self,
        square: Square,
        rules: &dyn RulesEngine,
        local_side: Color,
        animating: bool,
    ) -> Result<&Grab, SyncError> {
        if rules.side_to_move() != local_side {
            return Err(SyncError::NotYourTurn);
        }
        if animating {
            return Err(SyncError::AnimationInProgress);
        }
        let piece = match rules.piece_at(square) {
            Some((piece, color)) if color == local_side => piece,
            _ => return Err(SyncError::NoPieceToGrab(square)),
        };
        let origin = self
            .geometry
            .square_center(square)
            .ok_or(SyncError::UnresolvedSquare(square))?;

        Ok(self.grab.insert(Grab {
            square,
            piece,
            color: local_side,
            origin,
            current: origin,
            closest: Some(square),
            destinations: rules.legal_moves(square),
        }))
    }

    /// Moves the held piece to `point`. Returns the nearest square when it
    /// differs from the previous one.
    pub fn drag(&mut self, point: Point) -> Result<Option<Square>, SyncError> {
        let grab = self.grab.as_mut().ok_or(SyncError::NothingGrabbed)?;
        grab.current = point;
        let nearest = self.geometry.nearest_square(point);
        if grab.closest == Some(nearest) {
            return Ok(None);
        }
        grab.closest = Some(nearest);
        Ok(Some(nearest))
    }

    /// Ends the gesture, handing back what was held
    pub fn take(&mut self) -> Option<Grab> {
        self.grab.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::rules::ChessRules;

    fn controller(side: Color) -> InputController {
        InputController::new(BoardGeometry::new(60.0, side))
    }

    #[test]
    fn grab_lists_legal_destinations() {
        let rules = ChessRules::new();
        let mut input = controller(Color::White);
        let grab = input.grab(Square::E2, &rules, Color::White, false).unwrap();
        assert_eq!(grab.piece, Piece::Pawn);
        assert_eq!(grab.origin, Point::new(270.0, 390.0));
        let targets = grab.target_squares();
        assert_eq!(targets.len(), 2);
        assert!(targets.contains(&Square::E3) && targets.contains(&Square::E4));
        assert!(grab.capture_squares().is_empty());
        assert!(input.is_grabbing());
    }

    #[test]
    fn grab_is_refused_off_turn_first() {
        let rules = ChessRules::new();
        let mut input = controller(Color::Black);
        assert_eq!(
            input.grab(Square::E7, &rules, Color::Black, true).unwrap_err(),
            SyncError::NotYourTurn
        );
        assert!(!input.is_grabbing());
    }

    #[test]
    fn grab_is_refused_during_a_replay() {
        let rules = ChessRules::new();
        let mut input = controller(Color::White);
        assert_eq!(
            input.grab(Square::E2, &rules, Color::White, true).unwrap_err(),
            SyncError::AnimationInProgress
        );
    }

    #[test]
    fn empty_squares_and_enemy_pieces_cannot_be_grabbed() {
        let rules = ChessRules::new();
        let mut input = controller(Color::White);
        assert_eq!(
            input.grab(Square::E4, &rules, Color::White, false).unwrap_err(),
            SyncError::NoPieceToGrab(Square::E4)
        );
        assert_eq!(
            input.grab(Square::E7, &rules, Color::White, false).unwrap_err(),
            SyncError::NoPieceToGrab(Square::E7)
        );
    }

    #[test]
    fn drag_reports_the_nearest_square_once() {
        let rules = ChessRules::new();
        let mut input = controller(Color::White);
        input.grab(Square::E2, &rules, Color::White, false).unwrap();

        // e4 center is (270, 270)
        assert_eq!(input.drag(Point::new(275.0, 280.0)).unwrap(), Some(Square::E4));
        assert_eq!(input.drag(Point::new(265.0, 262.0)).unwrap(), None);

        let grab = input.take().unwrap();
        assert_eq!(grab.drop_square(), Square::E4);
        assert_eq!(grab.current, Point::new(265.0, 262.0));
        assert_eq!(input.drag(Point::new(0.0, 0.0)).unwrap_err(), SyncError::NothingGrabbed);
    }
}
