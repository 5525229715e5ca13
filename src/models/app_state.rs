use actix::Addr;
use log::warn;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::channel::PubSubHub;
use crate::config::GameSettings;

/// Application state shared between connections
pub struct AppState {
    pub hub: Addr<PubSubHub>,
    pub settings: GameSettings,
    pub heartbeat: Duration,
    /// Connection id to the player uuid it serves
    pub connections: Mutex<HashMap<String, String>>,
}

impl AppState {
    pub fn new(hub: Addr<PubSubHub>, settings: GameSettings, heartbeat: Duration) -> Self {
        Self {
            hub,
            settings,
            heartbeat,
            connections: Mutex::new(HashMap::new()),
        }
    }

    /// Records a connection; returns how many are open
    pub fn register(&self, connection_id: &str, player_uuid: &str) -> usize {
        match self.connections.lock() {
            Ok(mut connections) => {
                connections.insert(connection_id.to_string(), player_uuid.to_string());
                connections.len()
            }
            Err(_) => {
                warn!("Connection registry poisoned");
                0
            }
        }
    }

    pub fn unregister(&self, connection_id: &str) -> usize {
        match self.connections.lock() {
            Ok(mut connections) => {
                connections.remove(connection_id);
                connections.len()
            }
            Err(_) => {
                warn!("Connection registry poisoned");
                0
            }
        }
    }
}
