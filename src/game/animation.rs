//! Replay of a remote move on the local board.
//!
//! A session moves the piece from the center of its source square to the
//! center of its destination square in fixed steps, one per timer tick. The
//! first tick grabs the piece, each later tick either advances it by the step
//! vector or, once it is within tolerance of the destination or has taken all
//! of its steps, snaps it there and reports completion. The timer itself lives
//! in the game session actor.

use std::time::Duration;

use crate::error::SyncError;
use crate::game::geometry::{Point, SquareLocator};
use crate::models::Move;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnimationConfig {
    pub step_count: u32,
    pub tick_interval: Duration,
    /// Distance in pixels under which the piece counts as arrived
    pub tolerance: f64,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            step_count: 10,
            tick_interval: Duration::from_millis(100),
            tolerance: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationPhase {
    NotStarted,
    InProgress,
    Completing,
}

/// What one tick did to the animated piece
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Frame {
    Grabbed(Point),
    Moved(Point),
    Completed(Point),
}

#[derive(Debug, Clone)]
pub struct AnimationSession {
    chess_move: Move,
    source_center: Point,
    destination_center: Point,
    current: Point,
    step: Point,
    tolerance: f64,
    step_count: u32,
    steps_taken: u32,
    phase: AnimationPhase,
    ticks: u32,
}

impl AnimationSession {
    pub fn start(
        chess_move: Move,
        locator: &dyn SquareLocator,
        config: &AnimationConfig,
    ) -> Result<Self, SyncError> {
        let from = chess_move.from();
        let to = chess_move.to();
        if from == to {
            return Err(SyncError::ZeroDisplacement(from));
        }
        let source_center = locator
            .square_center(from)
            .ok_or(SyncError::UnresolvedSquare(from))?;
        let destination_center = locator
            .square_center(to)
            .ok_or(SyncError::UnresolvedSquare(to))?;

        let step_count = config.step_count.max(1);
        let delta = destination_center - source_center;
        let step = Point::new(delta.x / step_count as f64, delta.y / step_count as f64);

        Ok(Self {
            chess_move,
            source_center,
            destination_center,
            current: source_center,
            step,
            tolerance: config.tolerance,
            step_count,
            steps_taken: 0,
            phase: AnimationPhase::NotStarted,
            ticks: 0,
        })
    }

    pub fn tick(&mut self) -> Frame {
        self.ticks += 1;
        match self.phase {
            AnimationPhase::NotStarted => {
                self.phase = AnimationPhase::InProgress;
                Frame::Grabbed(self.current)
            }
            AnimationPhase::InProgress => {
                let arrived = self.current.distance_to(self.destination_center) <= self.tolerance;
                if arrived || self.steps_taken >= self.step_count {
                    self.phase = AnimationPhase::Completing;
                    self.current = self.destination_center;
                    Frame::Completed(self.current)
                } else {
                    self.steps_taken += 1;
                    self.current = self.current + self.step;
                    Frame::Moved(self.current)
                }
            }
            AnimationPhase::Completing => Frame::Completed(self.current),
        }
    }

    pub fn chess_move(&self) -> &Move {
        &self.chess_move
    }

    pub fn into_move(self) -> Move {
        self.chess_move
    }

    pub fn phase(&self) -> AnimationPhase {
        self.phase
    }

    pub fn current_position(&self) -> Point {
        self.current
    }

    pub fn source_center(&self) -> Point {
        self.source_center
    }

    pub fn destination_center(&self) -> Point {
        self.destination_center
    }

    pub fn step_vector(&self) -> Point {
        self.step
    }

    pub fn ticks(&self) -> u32 {
        self.ticks
    }
}
