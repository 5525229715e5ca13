pub mod app_state;
pub mod chess_move;
pub mod messages;
pub mod peer;

// Re-export important types
pub use app_state::AppState;
pub use chess_move::{Move, PrettyMove};
pub use messages::*;
pub use peer::{ConnectionState, PeerSession};
