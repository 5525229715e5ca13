use serde::Serialize;

use crate::models::messages::{PresenceAction, PresenceEvent};

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Absent,
    Joined,
    Left,
    TimedOut,
}

/// What we know about the opponent for the lifetime of the page
#[derive(Debug, Clone, PartialEq)]
pub struct PeerSession {
    remote_uuid: String,
    skill: Option<String>,
    state: ConnectionState,
}

impl PeerSession {
    pub fn new(remote_uuid: impl Into<String>) -> Self {
        Self {
            remote_uuid: remote_uuid.into(),
            skill: None,
            state: ConnectionState::Absent,
        }
    }

    pub fn remote_uuid(&self) -> &str {
        &self.remote_uuid
    }

    pub fn skill(&self) -> Option<&str> {
        self.skill.as_deref()
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Applies a presence event. Returns the new state when the event
    /// concerned the opponent and changed something.
    pub fn apply(&mut self, event: &PresenceEvent) -> Option<ConnectionState> {
        if event.uuid != self.remote_uuid {
            return None;
        }
        let next = match event.action {
            PresenceAction::Join => {
                self.skill = event.skill.clone();
                ConnectionState::Joined
            }
            PresenceAction::Leave => ConnectionState::Left,
            PresenceAction::Timeout => ConnectionState::TimedOut,
        };
        if next == self.state && next != ConnectionState::Joined {
            return None;
        }
        self.state = next;
        Some(next)
    }
}
