pub mod animation;
pub mod coordinator;
pub mod geometry;
pub mod input;
pub mod projection;
pub mod rules;
pub mod utils;

pub use animation::{AnimationConfig, AnimationSession, Frame};
pub use coordinator::{RemoteDisposition, TurnCoordinator};
pub use geometry::{BoardGeometry, Point};
pub use rules::{ChessRules, RulesEngine};
