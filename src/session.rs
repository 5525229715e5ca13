use std::str::FromStr;

use actix::prelude::*;
use chess::Square;
use futures::channel::mpsc::UnboundedSender;
use log::{debug, info, warn};

use crate::channel::{ChatReceived, MoveReceived, PresenceChanged};
use crate::error::{Severity, SyncError};
use crate::game::{Point, TurnCoordinator};
use crate::models::{ClientMessage, UiEvent};

/// Input forwarded from the page rendering the board
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct Input(pub ClientMessage);

/// Leaves the channel and stops the session
#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct Shutdown;

fn parse_square(text: &str) -> Result<Square, SyncError> {
    Square::from_str(&text.to_ascii_lowercase())
        .map_err(|_| SyncError::MalformedMessage(format!("not a square: {}", text)))
}

/// One player's game. Every input, channel event and animation frame is
/// handled here in turn, so the coordinator never sees two at once.
pub struct GameSession {
    coordinator: TurnCoordinator,
    ui: UnboundedSender<UiEvent>,
    ticker: Option<SpawnHandle>,
}

impl GameSession {
    pub fn new(coordinator: TurnCoordinator, ui: UnboundedSender<UiEvent>) -> Self {
        Self {
            coordinator,
            ui,
            ticker: None,
        }
    }

    /// Pushes pending UI events and starts or stops the animation timer to
    /// match the coordinator.
    fn flush(&mut self, ctx: &mut Context<Self>) {
        for event in self.coordinator.drain_events() {
            if self.ui.unbounded_send(event).is_err() {
                info!("Renderer went away, stopping game session");
                ctx.stop();
                return;
            }
        }

        match (self.coordinator.is_animating(), self.ticker) {
            (true, None) => {
                let interval = self.coordinator.animation_config().tick_interval;
                self.ticker = Some(ctx.run_interval(interval, |session, ctx| session.on_tick(ctx)));
            }
            (false, Some(handle)) => {
                ctx.cancel_future(handle);
                self.ticker = None;
            }
            _ => {}
        }
    }

    fn on_tick(&mut self, ctx: &mut Context<Self>) {
        if let Err(err) = self.coordinator.tick() {
            self.fail(err);
        }
        self.flush(ctx);
    }

    fn fail(&mut self, err: SyncError) {
        match self.coordinator.shown_severity(&err) {
            Severity::Silent => debug!("Absorbed: {}", err),
            Severity::Fatal => warn!("Fatal: {}", err),
            _ => info!("{}", err),
        }
        self.coordinator.report(&err);
    }

    fn handle_input(&mut self, msg: ClientMessage) -> Result<(), SyncError> {
        match msg {
            ClientMessage::Grab { square } => self.coordinator.grab(parse_square(&square)?),
            ClientMessage::Drag { x, y } => self.coordinator.drag(Point::new(x, y)),
            ClientMessage::Drop => self.coordinator.drop_piece().map(|_| ()),
            ClientMessage::Release => self.coordinator.release(),
            ClientMessage::Move { move_from, move_to } => {
                let from = parse_square(&move_from)?;
                let to = parse_square(&move_to)?;
                self.coordinator.attempt_local_move(from, to).map(|_| ())
            }
            ClientMessage::Chat { text } => self.coordinator.send_chat(&text),
        }
    }
}

impl Actor for GameSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        let addr = ctx.address();
        let channel = self.coordinator.channel_mut();
        channel.on_move_received(addr.clone().recipient());
        channel.on_chat_received(addr.clone().recipient());
        channel.on_peer_presence_changed(addr.recipient());

        self.coordinator.start();
        self.flush(ctx);
    }

    fn stopped(&mut self, _: &mut Self::Context) {
        self.coordinator.disconnect();
        info!("Game session stopped");
    }
}

impl Handler<Input> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: Input, ctx: &mut Self::Context) {
        if let Err(err) = self.handle_input(msg.0) {
            self.fail(err);
        }
        self.flush(ctx);
    }
}

impl Handler<MoveReceived> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: MoveReceived, ctx: &mut Self::Context) {
        let result = self
            .coordinator
            .handle_move_message(msg.chess_move, &msg.src_uuid, &msg.target_uuid);
        if let Err(err) = result {
            self.fail(err);
        }
        self.flush(ctx);
    }
}

impl Handler<ChatReceived> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: ChatReceived, ctx: &mut Self::Context) {
        if let Err(err) = self.coordinator.receive_chat(&msg.uuid, &msg.text) {
            self.fail(err);
        }
        self.flush(ctx);
    }
}

impl Handler<PresenceChanged> for GameSession {
    type Result = ();

    fn handle(&mut self, msg: PresenceChanged, ctx: &mut Self::Context) {
        if let Err(err) = self.coordinator.peer_presence_changed(&msg.0) {
            self.fail(err);
        }
        self.flush(ctx);
    }
}

impl Handler<Shutdown> for GameSession {
    type Result = ();

    fn handle(&mut self, _: Shutdown, ctx: &mut Self::Context) {
        self.coordinator.disconnect();
        self.flush(ctx);
        ctx.stop();
    }
}
