use std::collections::HashMap;
use std::time::Duration;

use chess::Color;
use clap::Parser;

use crate::error::SyncError;
use crate::game::animation::AnimationConfig;
use crate::game::utils::color_from_letter;

/// Server command line. Every flag can also come from the environment.
#[derive(Parser, Debug, Clone)]
#[command(name = "chess_sync")]
#[command(about = "Two-player chess board kept in sync over a pub/sub channel")]
pub struct ServerConfig {
    /// HTTP listen address.
    #[arg(long, env = "CHESS_SYNC_BIND", default_value = "127.0.0.1:8080")]
    pub bind: String,

    /// Seconds without a heartbeat before a player is reported as timed out.
    #[arg(long, env = "CHESS_SYNC_PRESENCE_TIMEOUT_SECS", default_value_t = 30)]
    pub presence_timeout_secs: u64,

    #[arg(long, env = "CHESS_SYNC_HEARTBEAT_SECS", default_value_t = 10)]
    pub heartbeat_secs: u64,

    /// Milliseconds between two animation frames of a replayed move.
    #[arg(long, env = "CHESS_SYNC_TICK_MS", default_value_t = 100)]
    pub tick_ms: u64,

    /// Frames a replayed move is split into.
    #[arg(long, env = "CHESS_SYNC_STEPS", default_value_t = 10)]
    pub steps: u32,

    /// Pixels from the destination at which a replayed piece snaps into place.
    #[arg(long, env = "CHESS_SYNC_TOLERANCE", default_value_t = 10.0)]
    pub tolerance: f64,

    #[arg(long, env = "CHESS_SYNC_SQUARE_SIZE", default_value_t = 60.0)]
    pub square_size: f64,
}

impl ServerConfig {
    pub fn game_settings(&self) -> GameSettings {
        // Non-positive tolerances fall back to the default
        let tolerance = if self.tolerance.is_finite() && self.tolerance > 0.0 {
            self.tolerance
        } else {
            AnimationConfig::default().tolerance
        };
        GameSettings {
            animation: AnimationConfig {
                step_count: self.steps.max(1),
                tick_interval: Duration::from_millis(self.tick_ms.max(1)),
                tolerance,
            },
            square_size: self.square_size,
        }
    }

    pub fn presence_timeout(&self) -> Duration {
        Duration::from_secs(self.presence_timeout_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_secs.max(1))
    }
}

/// Board and animation settings shared by every game on this server
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameSettings {
    pub animation: AnimationConfig,
    pub square_size: f64,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            animation: AnimationConfig::default(),
            square_size: 60.0,
        }
    }
}

/// Who is playing what, as handed over by the page that opened the board
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchParams {
    pub local_uuid: String,
    pub remote_uuid: String,
    pub channel: String,
    pub local_skill_level: String,
    pub side: Color,
}

impl LaunchParams {
    pub fn from_query(query: &HashMap<String, String>) -> Result<Self, SyncError> {
        let required = |name: &'static str| -> Result<String, SyncError> {
            query
                .get(name)
                .filter(|value| !value.is_empty())
                .cloned()
                .ok_or(SyncError::MissingLaunchParameter(name))
        };

        let local_uuid = required("local_uuid")?;
        let remote_uuid = required("remote_uuid")?;
        let channel = required("pubnub_chess_channel")?;
        let local_skill_level = required("local_skill_level")?;
        let side_letter = required("chess_side")?;
        let side = match side_letter.as_str() {
            "w" | "b" => color_from_letter(&side_letter),
            _ => None,
        }
        .ok_or(SyncError::InvalidLaunchParameter {
            name: "chess_side",
            value: side_letter.clone(),
        })?;

        Ok(Self {
            local_uuid,
            remote_uuid,
            channel,
            local_skill_level,
            side,
        })
    }
}
