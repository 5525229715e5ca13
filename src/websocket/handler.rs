use std::collections::HashMap;

use actix::*;
use actix_web::{web, Error, HttpRequest, HttpResponse};
use actix_web_actors::ws;
use futures::channel::mpsc::unbounded;
use log::{info, warn};
use uuid::Uuid;

use crate::channel::HubChannel;
use crate::config::LaunchParams;
use crate::game::{ChessRules, TurnCoordinator};
use crate::models::{AppState, ClientMessage, UiEvent};
use crate::session::{GameSession, Shutdown};

/// WebSocket bridge between the page rendering the board and its game session
pub struct ChessWebSocket {
    pub id: String,
    pub app_state: web::Data<AppState>,
    pub launch: LaunchParams,
    pub session: Option<Addr<GameSession>>,
}

impl Actor for ChessWebSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        // Register the connection with the application state
        let total_sessions = self.app_state.register(&self.id, &self.launch.local_uuid);
        info!(
            "WebSocket connection started: {} for {} on channel {}",
            self.id, self.launch.local_uuid, self.launch.channel
        );
        info!("Total active sessions: {}", total_sessions);

        // UI events flow back to this actor as a stream
        let (ui_tx, ui_rx) = unbounded::<UiEvent>();
        ctx.add_stream(ui_rx);

        let channel = HubChannel::connect(
            self.app_state.hub.clone(),
            &self.launch,
            self.app_state.heartbeat,
        );
        let coordinator = TurnCoordinator::new(
            &self.launch,
            Box::new(ChessRules::new()),
            Box::new(channel),
            &self.app_state.settings,
        );
        self.session = Some(GameSession::new(coordinator, ui_tx).start());
    }

    fn stopping(&mut self, _: &mut Self::Context) -> Running {
        // Leaving the channel lets the opponent see us go
        if let Some(session) = self.session.take() {
            session.do_send(Shutdown);
        }

        let total_sessions = self.app_state.unregister(&self.id);
        info!("WebSocket connection closed: {}", self.id);
        info!("Total active sessions: {}", total_sessions);

        Running::Stop
    }
}

/// Pushes game session output to the browser
impl StreamHandler<UiEvent> for ChessWebSocket {
    fn handle(&mut self, event: UiEvent, ctx: &mut Self::Context) {
        match serde_json::to_string(&event) {
            Ok(text) => ctx.text(text),
            Err(e) => warn!("Error serializing UI event: {}", e),
        }
    }

    fn finished(&mut self, ctx: &mut Self::Context) {
        info!("Game session for {} ended, closing socket", self.id);
        ctx.close(None);
        ctx.stop();
    }
}

// WebSocket message handler
impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for ChessWebSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Ping(msg)) => {
                ctx.pong(&msg);
            }
            Ok(ws::Message::Pong(_)) => {
                // Do nothing for pong messages
            }
            Ok(ws::Message::Text(text)) => {
                match serde_json::from_str::<ClientMessage>(text.as_ref()) {
                    Ok(client_msg) => self.handle_message(client_msg, ctx),
                    Err(e) => {
                        warn!("Error parsing client message: {}", e);
                        ctx.text(format!("{{\"error\": \"Invalid message format: {}\"}}", e));
                    }
                }
            }
            Ok(ws::Message::Binary(_)) => {
                warn!("Binary messages are not supported");
                ctx.text("{\"error\": \"Binary messages are not supported\"}");
            }
            Ok(ws::Message::Close(reason)) => {
                info!("Connection closed: {:?}", reason);
                ctx.close(reason);
                ctx.stop();
            }
            _ => {
                ctx.stop();
            }
        }
    }
}

/// WebSocket connection handler
///
/// The launch parameters come from the query string; a page that lacks any
/// of them cannot start a game and gets a 400 naming the missing one.
pub async fn ws_index(
    req: HttpRequest,
    stream: web::Payload,
    query: web::Query<HashMap<String, String>>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let launch = match LaunchParams::from_query(&query) {
        Ok(launch) => launch,
        Err(e) => {
            warn!("Refusing game session: {}", e);
            return Ok(HttpResponse::BadRequest().body(e.to_string()));
        }
    };

    // Generate a unique ID for this connection
    let id = Uuid::new_v4().to_string();
    info!("New WebSocket connection {} for {}", id, launch.local_uuid);

    let ws = ChessWebSocket {
        id,
        app_state: app_state.clone(),
        launch,
        session: None,
    };
    ws::start(ws, &req, stream)
}
