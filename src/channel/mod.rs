//! Synchronization channel between the two peers.
//!
//! The game only sees the [`SyncChannel`] trait. Incoming traffic is handed
//! to actor recipients registered through the `on_*` methods, so it enters
//! the game session's mailbox like any other event.

use actix::prelude::*;

use crate::error::SyncError;
use crate::models::{Move, PresenceEvent};

pub mod hub;
pub mod hub_channel;

pub use hub::PubSubHub;
pub use hub_channel::HubChannel;

/// A move published by some member of the channel
#[derive(Message, Debug, Clone, PartialEq)]
#[rtype(result = "()")]
pub struct MoveReceived {
    pub chess_move: Move,
    pub src_uuid: String,
    pub target_uuid: String,
}

#[derive(Message, Debug, Clone, PartialEq)]
#[rtype(result = "()")]
pub struct ChatReceived {
    pub uuid: String,
    pub text: String,
}

#[derive(Message, Debug, Clone, PartialEq)]
#[rtype(result = "()")]
pub struct PresenceChanged(pub PresenceEvent);

/// Fire-and-forget link to the other peer. Nothing is retried.
pub trait SyncChannel {
    /// Publishes a move addressed to the remote player. Fails synchronously
    /// only when the channel can no longer accept messages.
    fn publish_move(&mut self, chess_move: &Move) -> Result<(), SyncError>;

    fn publish_chat(&mut self, text: &str) -> Result<(), SyncError>;

    fn on_move_received(&mut self, recipient: Recipient<MoveReceived>);

    fn on_chat_received(&mut self, recipient: Recipient<ChatReceived>);

    fn on_peer_presence_changed(&mut self, recipient: Recipient<PresenceChanged>);

    /// Leaves the channel; the remote side sees a `leave` presence event
    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;
}
