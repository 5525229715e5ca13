use chess::{Color, Square};
use log::{debug, info, warn};

use crate::channel::SyncChannel;
use crate::config::{GameSettings, LaunchParams};
use crate::error::{Severity, SyncError};
use crate::game::animation::{AnimationConfig, AnimationSession, Frame};
use crate::game::geometry::{BoardGeometry, Point};
use crate::game::input::InputController;
use crate::game::projection::{occupant_code, BoardProjection};
use crate::game::rules::RulesEngine;
use crate::game::utils::{color_to_letter, piece_to_letter, turn_banner};
use crate::models::{ConnectionState, Move, PeerSession, PresenceEvent, UiEvent};

/// What happened to a move that arrived from the channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteDisposition {
    /// Replay started, the move is applied when it ends
    Animating,
    /// Held until the current replay or local grab is over
    Queued,
    /// Our own echo, or addressed to someone else
    Ignored,
}

/// Decides whether a local or remote move may touch the board and applies
/// moves one at a time.
///
/// Local moves go to the rules engine immediately and are then published.
/// Remote moves are validated, replayed by an [`AnimationSession`] and only
/// applied once the replay completes. Every visible change is queued as a
/// [`UiEvent`] and collected with [`TurnCoordinator::drain_events`].
pub struct TurnCoordinator {
    rules: Box<dyn RulesEngine>,
    channel: Box<dyn SyncChannel>,
    local_uuid: String,
    local_side: Color,
    local_skill: String,
    peer: PeerSession,
    geometry: BoardGeometry,
    animation_config: AnimationConfig,
    animation: Option<AnimationSession>,
    pending_remote: Option<Move>,
    input: InputController,
    projection: BoardProjection,
    halted: Option<String>,
    fatal_shown: bool,
    outbox: Vec<UiEvent>,
}

impl TurnCoordinator {
    pub fn new(
        launch: &LaunchParams,
        rules: Box<dyn RulesEngine>,
        channel: Box<dyn SyncChannel>,
        settings: &GameSettings,
    ) -> Self {
        let geometry = BoardGeometry::new(settings.square_size, launch.side);
        Self {
            rules,
            channel,
            local_uuid: launch.local_uuid.clone(),
            local_side: launch.side,
            local_skill: launch.local_skill_level.clone(),
            peer: PeerSession::new(launch.remote_uuid.clone()),
            geometry,
            animation_config: settings.animation,
            animation: None,
            pending_remote: None,
            input: InputController::new(geometry),
            projection: BoardProjection::empty(),
            halted: None,
            fatal_shown: false,
            outbox: Vec::new(),
        }
    }

    /// Draws the initial board
    pub fn start(&mut self) {
        info!(
            "Game started for {} playing {} (skill {})",
            self.local_uuid,
            color_to_letter(self.local_side),
            self.local_skill
        );
        self.refresh_board();
    }

    pub fn rules(&self) -> &dyn RulesEngine {
        self.rules.as_ref()
    }

    pub fn channel_mut(&mut self) -> &mut dyn SyncChannel {
        self.channel.as_mut()
    }

    pub fn local_side(&self) -> Color {
        self.local_side
    }

    pub fn peer(&self) -> &PeerSession {
        &self.peer
    }

    pub fn animation(&self) -> Option<&AnimationSession> {
        self.animation.as_ref()
    }

    pub fn animation_config(&self) -> &AnimationConfig {
        &self.animation_config
    }

    pub fn is_animating(&self) -> bool {
        self.animation.is_some()
    }

    pub fn pending_remote(&self) -> Option<&Move> {
        self.pending_remote.as_ref()
    }

    pub fn projection(&self) -> &BoardProjection {
        &self.projection
    }

    pub fn halted(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    pub fn is_local_turn(&self) -> bool {
        self.rules.side_to_move() == self.local_side
    }

    pub fn drain_events(&mut self) -> Vec<UiEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Shows an error to the player unless it is one that is absorbed silently.
    /// Once a fatal notice is up, refusals of a halted game are not repeated.
    pub fn report(&mut self, err: &SyncError) {
        let severity = self.shown_severity(err);
        if severity == Severity::Fatal {
            self.fatal_shown = true;
        }
        if severity != Severity::Silent {
            self.outbox.push(UiEvent::Notice {
                severity,
                text: err.to_string(),
            });
        }
    }

    pub fn shown_severity(&self, err: &SyncError) -> Severity {
        match err {
            SyncError::Halted { .. } if self.fatal_shown => Severity::Silent,
            _ => err.severity(),
        }
    }

    fn guard(&self) -> Result<(), SyncError> {
        match &self.halted {
            Some(cause) => Err(SyncError::Halted {
                cause: cause.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Stops the game for good. Returns the error for propagation.
    fn halt(&mut self, err: SyncError) -> SyncError {
        warn!("Halting game of {}: {}", self.local_uuid, err);
        self.halted = Some(err.to_string());
        if let Some(session) = self.animation.take() {
            self.outbox.push(UiEvent::PieceReverted {
                square: session.chess_move().from().to_string(),
            });
        }
        self.pending_remote = None;
        self.input.take();
        err
    }

    fn refresh_board(&mut self) {
        let patches = self.projection.sync(self.rules.as_ref());
        self.outbox.push(UiEvent::BoardUpdated {
            patches,
            fen: self.rules.fen(),
            status: self.rules.status_line(),
            turn: turn_banner(self.local_side, self.rules.side_to_move()),
        });
    }

    /// Jails the captured piece and redraws after a confirmed mutation
    fn settle(&mut self, applied: &Move, remote: bool) {
        if let Some((capturer, piece)) = self.projection.record_capture(applied) {
            self.outbox.push(UiEvent::Captured {
                jail: color_to_letter(capturer).to_string(),
                piece: occupant_code(piece, !capturer),
            });
        }
        self.refresh_board();
        self.outbox.push(UiEvent::MoveApplied {
            chess_move: applied.clone(),
            remote,
        });
    }

    pub fn attempt_local_move(&mut self, from: Square, to: Square) -> Result<Move, SyncError> {
        self.guard()?;
        if !self.is_local_turn() {
            return Err(SyncError::NotYourTurn);
        }
        if self.is_animating() {
            return Err(SyncError::AnimationInProgress);
        }

        self.outbox.push(UiEvent::ClearHighlights);
        let applied = match self.rules.apply_move(from, to, None) {
            Ok(applied) => applied,
            Err(err) => {
                debug!("Rejected local move {} to {}: {}", from, to, err);
                self.outbox.push(UiEvent::PieceReverted {
                    square: from.to_string(),
                });
                return Err(err);
            }
        };

        if applied.color() == self.local_side {
            if let Err(err) = self.channel.publish_move(&applied) {
                warn!("Could not publish {}: {}, rolling back", applied, err);
                self.rules.undo_last_move();
                self.outbox.push(UiEvent::PieceReverted {
                    square: from.to_string(),
                });
                return Err(err);
            }
        }

        // A move typed while a piece is held ends that gesture
        self.input.take();
        info!("Local move {} ({})", applied, applied.san());
        self.settle(&applied, false);
        self.drain_pending()?;
        Ok(applied)
    }

    /// Entry point for moves coming off the channel. Drops our own echo and
    /// moves addressed to another player.
    pub fn handle_move_message(
        &mut self,
        chess_move: Move,
        src_uuid: &str,
        target_uuid: &str,
    ) -> Result<RemoteDisposition, SyncError> {
        if src_uuid == self.local_uuid {
            debug!("Ignoring echo of our own move {}", chess_move);
            return Ok(RemoteDisposition::Ignored);
        }
        if target_uuid != self.local_uuid {
            debug!("Ignoring move {} addressed to {}", chess_move, target_uuid);
            return Ok(RemoteDisposition::Ignored);
        }
        self.receive_remote_move(chess_move)
    }

    pub fn receive_remote_move(&mut self, chess_move: Move) -> Result<RemoteDisposition, SyncError> {
        self.guard()?;

        if self.is_animating() || self.input.is_grabbing() {
            if self.pending_remote.is_some() {
                return Err(self.halt(SyncError::PendingMoveOverflow));
            }
            info!("Queueing remote move {} until the board is free", chess_move);
            self.pending_remote = Some(chess_move);
            return Ok(RemoteDisposition::Queued);
        }

        if let Err(err) = self.validate_remote(&chess_move) {
            return Err(self.halt(err));
        }

        match AnimationSession::start(chess_move, &self.geometry, &self.animation_config) {
            Ok(session) => {
                info!("Replaying remote move {}", session.chess_move());
                self.animation = Some(session);
                Ok(RemoteDisposition::Animating)
            }
            Err(err) => Err(self.halt(SyncError::desync(format!("cannot replay move: {}", err)))),
        }
    }

    fn validate_remote(&self, chess_move: &Move) -> Result<(), SyncError> {
        let from = chess_move.from();
        match self.rules.piece_at(from) {
            Some((piece, color)) if piece == chess_move.piece() && color == chess_move.color() => {}
            _ => {
                return Err(SyncError::desync(format!(
                    "no {} at {} for remote move {}",
                    piece_to_letter(chess_move.piece()),
                    from,
                    chess_move
                )))
            }
        }
        if chess_move.color() != self.rules.side_to_move() {
            return Err(SyncError::desync(format!(
                "remote move {} played out of turn",
                chess_move
            )));
        }
        if chess_move.color() == self.local_side {
            return Err(SyncError::desync(format!(
                "remote move {} moves our own pieces",
                chess_move
            )));
        }
        let legal = self.rules.legal_moves(from).iter().any(|m| {
            m.to() == chess_move.to()
                && (chess_move.promotion().is_none() || m.promotion() == chess_move.promotion())
        });
        if !legal {
            return Err(SyncError::desync(format!(
                "remote move {} is illegal here",
                chess_move
            )));
        }
        Ok(())
    }

    /// Advances the running replay by one step. Returns `None` when nothing
    /// is being replayed.
    pub fn tick(&mut self) -> Result<Option<Frame>, SyncError> {
        self.guard()?;
        let Some(session) = self.animation.as_mut() else {
            return Ok(None);
        };

        let frame = session.tick();
        let square = session.chess_move().from().to_string();
        match frame {
            Frame::Grabbed(at) | Frame::Moved(at) => {
                self.outbox.push(UiEvent::PieceMoved {
                    square,
                    x: at.x,
                    y: at.y,
                });
            }
            Frame::Completed(at) => {
                self.outbox.push(UiEvent::PieceMoved {
                    square,
                    x: at.x,
                    y: at.y,
                });
                let finished = self.animation.take().map(AnimationSession::into_move);
                if let Some(chess_move) = finished {
                    self.complete_remote(chess_move)?;
                }
                self.drain_pending()?;
            }
        }
        Ok(Some(frame))
    }

    fn complete_remote(&mut self, chess_move: Move) -> Result<(), SyncError> {
        match self
            .rules
            .apply_move(chess_move.from(), chess_move.to(), chess_move.promotion())
        {
            Ok(applied) => {
                info!("Remote move {} ({}) applied", applied, applied.san());
                self.settle(&applied, true);
                Ok(())
            }
            Err(err) => Err(self.halt(SyncError::desync(format!(
                "replayed move {} rejected: {}",
                chess_move, err
            )))),
        }
    }

    fn drain_pending(&mut self) -> Result<(), SyncError> {
        if self.is_animating() || self.input.is_grabbing() {
            return Ok(());
        }
        if let Some(chess_move) = self.pending_remote.take() {
            self.receive_remote_move(chess_move)?;
        }
        Ok(())
    }

    /// Cancels the running replay without applying its move
    pub fn abort_animation(&mut self, reason: &str) -> Option<Move> {
        let session = self.animation.take()?;
        self.pending_remote = None;
        let from = session.chess_move().from();
        warn!("Aborting replay of {}: {}", session.chess_move(), reason);
        self.outbox.push(UiEvent::PieceReverted {
            square: from.to_string(),
        });
        self.report(&SyncError::Aborted {
            reason: reason.to_string(),
        });
        Some(session.into_move())
    }

    pub fn grab(&mut self, square: Square) -> Result<(), SyncError> {
        self.guard()?;
        let animating = self.is_animating();
        let grab = self
            .input
            .grab(square, self.rules.as_ref(), self.local_side, animating)?;
        let event = UiEvent::Highlight {
            from: square.to_string(),
            valid: grab.target_squares().iter().map(|s| s.to_string()).collect(),
            captures: grab.capture_squares().iter().map(|s| s.to_string()).collect(),
        };
        self.outbox.push(event);
        Ok(())
    }

    pub fn drag(&mut self, point: Point) -> Result<(), SyncError> {
        self.guard()?;
        let closest = self.input.drag(point)?;
        if let Some(grab) = self.input.current() {
            self.outbox.push(UiEvent::PieceMoved {
                square: grab.square.to_string(),
                x: point.x,
                y: point.y,
            });
        }
        if let Some(square) = closest {
            self.outbox.push(UiEvent::ClosestSquare {
                square: square.to_string(),
            });
        }
        Ok(())
    }

    /// Lets go of the held piece over the nearest square. Dropping it back
    /// where it came from is not a move.
    pub fn drop_piece(&mut self) -> Result<Option<Move>, SyncError> {
        self.guard()?;
        let grab = self.input.take().ok_or(SyncError::NothingGrabbed)?;
        let to = grab.drop_square();
        let result = if to == grab.square {
            self.outbox.push(UiEvent::ClearHighlights);
            self.outbox.push(UiEvent::PieceReverted {
                square: grab.square.to_string(),
            });
            Ok(None)
        } else {
            self.attempt_local_move(grab.square, to).map(Some)
        };
        self.drain_pending()?;
        result
    }

    pub fn release(&mut self) -> Result<(), SyncError> {
        self.guard()?;
        if let Some(grab) = self.input.take() {
            self.outbox.push(UiEvent::ClearHighlights);
            self.outbox.push(UiEvent::PieceReverted {
                square: grab.square.to_string(),
            });
        }
        self.drain_pending()
    }

    pub fn send_chat(&mut self, text: &str) -> Result<(), SyncError> {
        self.guard()?;
        self.channel.publish_chat(text)
    }

    pub fn receive_chat(&mut self, uuid: &str, text: &str) -> Result<(), SyncError> {
        self.guard()?;
        self.outbox.push(UiEvent::Chat {
            uuid: uuid.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    pub fn peer_presence_changed(&mut self, event: &PresenceEvent) -> Result<(), SyncError> {
        self.guard()?;
        let Some(state) = self.peer.apply(event) else {
            return Ok(());
        };
        info!("Opponent {} is now {:?}", event.uuid, state);
        match state {
            ConnectionState::Joined => {
                self.outbox.push(UiEvent::Opponent {
                    uuid: Some(self.peer.remote_uuid().to_string()),
                    skill: self.peer.skill().map(str::to_string),
                });
            }
            ConnectionState::Left | ConnectionState::TimedOut => {
                self.outbox.push(UiEvent::Opponent {
                    uuid: None,
                    skill: None,
                });
                self.outbox.push(UiEvent::Notice {
                    severity: Severity::Notice,
                    text: format!("{} has left the game.", event.uuid),
                });
            }
            ConnectionState::Absent => {}
        }
        Ok(())
    }

    /// Leaves the channel, cancelling any replay in flight
    pub fn disconnect(&mut self) {
        self.channel.disconnect();
        self.abort_animation("channel disconnected");
    }
}
