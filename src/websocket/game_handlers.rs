use actix_web_actors::ws;
use chess::Square;
use log::{debug, info, warn};
use std::str::FromStr;

use crate::models::messages::ClientMessage;
use crate::session::Input;
use crate::websocket::handler::ChessWebSocket;

/// Longest chat line relayed to the channel
const MAX_CHAT_LEN: usize = 500;

impl ChessWebSocket {
    pub fn handle_message(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match msg {
            ClientMessage::Grab { square } => self.handle_grab(square, ctx),
            ClientMessage::Drag { x, y } => self.handle_drag(x, y, ctx),
            ClientMessage::Drop => self.forward(ClientMessage::Drop, ctx),
            ClientMessage::Release => self.forward(ClientMessage::Release, ctx),
            ClientMessage::Move { move_from, move_to } => self.handle_move(move_from, move_to, ctx),
            ClientMessage::Chat { text } => self.handle_chat(text, ctx),
        }
    }

    /// Hands a checked message to the game session
    fn forward(&mut self, msg: ClientMessage, ctx: &mut ws::WebsocketContext<Self>) {
        match &self.session {
            Some(session) => session.do_send(Input(msg)),
            None => {
                warn!("No game session for connection {}", self.id);
                ctx.text("{\"error\": \"No game in progress\"}");
            }
        }
    }

    pub fn handle_grab(&mut self, square: String, ctx: &mut ws::WebsocketContext<Self>) {
        if Square::from_str(&square).is_err() {
            warn!("Invalid square format: {}", square);
            ctx.text("{\"error\": \"Invalid square format\"}");
            return;
        }
        debug!("{} grabs {}", self.launch.local_uuid, square);
        self.forward(ClientMessage::Grab { square }, ctx);
    }

    pub fn handle_drag(&mut self, x: f64, y: f64, ctx: &mut ws::WebsocketContext<Self>) {
        // Non-finite pointer positions are dropped
        if !x.is_finite() || !y.is_finite() {
            warn!("Ignoring drag to ({}, {})", x, y);
            return;
        }
        self.forward(ClientMessage::Drag { x, y }, ctx);
    }

    pub fn handle_move(&mut self, move_from: String, move_to: String, ctx: &mut ws::WebsocketContext<Self>) {
        info!("Move requested by {}: {} to {}", self.launch.local_uuid, move_from, move_to);

        // Parse the squares before bothering the game session
        for square in [&move_from, &move_to] {
            if Square::from_str(square).is_err() {
                warn!("Invalid square format: {}", square);
                ctx.text("{\"error\": \"Invalid square format\"}");
                return;
            }
        }
        self.forward(ClientMessage::Move { move_from, move_to }, ctx);
    }

    pub fn handle_chat(&mut self, text: String, ctx: &mut ws::WebsocketContext<Self>) {
        let text = text.trim();
        if text.is_empty() {
            return;
        }
        if text.chars().count() > MAX_CHAT_LEN {
            warn!("Chat line from {} too long", self.launch.local_uuid);
            ctx.text("{\"error\": \"Chat message too long\"}");
            return;
        }
        self.forward(
            ClientMessage::Chat {
                text: text.to_string(),
            },
            ctx,
        );
    }
}
