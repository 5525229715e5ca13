use std::time::Duration;

use actix::prelude::*;
use chess::Color;
use futures::channel::mpsc::{unbounded, UnboundedReceiver};
use futures::StreamExt;

use chess_sync::channel::{HubChannel, PubSubHub};
use chess_sync::config::{GameSettings, LaunchParams};
use chess_sync::game::{AnimationConfig, ChessRules, TurnCoordinator};
use chess_sync::models::{ClientMessage, UiEvent};
use chess_sync::session::{GameSession, Input, Shutdown};
use chess_sync::Severity;

const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";
const AFTER_E5: &str = "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2";

struct Player {
    session: Addr<GameSession>,
    events: UnboundedReceiver<UiEvent>,
}

impl Player {
    fn join(hub: &Addr<PubSubHub>, local: &str, remote: &str, side: Color) -> Self {
        let launch = LaunchParams {
            local_uuid: local.into(),
            remote_uuid: remote.into(),
            channel: "club-table-7".into(),
            local_skill_level: "1200".into(),
            side,
        };
        let settings = GameSettings {
            animation: AnimationConfig {
                step_count: 4,
                tick_interval: Duration::from_millis(5),
                tolerance: 10.0,
            },
            square_size: 60.0,
        };
        let channel = HubChannel::connect(hub.clone(), &launch, Duration::from_secs(5));
        let coordinator = TurnCoordinator::new(
            &launch,
            Box::new(ChessRules::new()),
            Box::new(channel),
            &settings,
        );
        let (tx, rx) = unbounded();
        Self {
            session: GameSession::new(coordinator, tx).start(),
            events: rx,
        }
    }

    async fn wait_for(&mut self, wanted: impl Fn(&UiEvent) -> bool) -> UiEvent {
        let events = &mut self.events;
        let wait = async {
            while let Some(event) = events.next().await {
                if wanted(&event) {
                    return event;
                }
            }
            panic!("event stream ended");
        };
        actix_rt::time::timeout(Duration::from_secs(3), wait)
            .await
            .expect("timed out waiting for a UI event")
    }

    async fn wait_for_fen(&mut self, fen: &str) {
        self.wait_for(|e| matches!(e, UiEvent::BoardUpdated { fen: f, .. } if f == fen))
            .await;
    }

    fn play(&self, from: &str, to: &str) {
        self.session.do_send(Input(ClientMessage::Move {
            move_from: from.into(),
            move_to: to.into(),
        }));
    }
}

async fn seated_pair(hub: &Addr<PubSubHub>) -> (Player, Player) {
    let mut white = Player::join(hub, "alice", "bob", Color::White);
    let mut black = Player::join(hub, "bob", "alice", Color::Black);
    white
        .wait_for(|e| matches!(e, UiEvent::Opponent { uuid: Some(u), .. } if u == "bob"))
        .await;
    black
        .wait_for(|e| matches!(e, UiEvent::Opponent { uuid: Some(u), .. } if u == "alice"))
        .await;
    (white, black)
}

#[actix_rt::test]
async fn moves_replay_on_the_other_board() {
    let hub = PubSubHub::new(Duration::from_secs(30)).start();
    let (mut white, mut black) = seated_pair(&hub).await;

    white.play("e2", "e4");
    white.wait_for_fen(AFTER_E4).await;

    let applied = black
        .wait_for(|e| matches!(e, UiEvent::MoveApplied { .. }))
        .await;
    match applied {
        UiEvent::MoveApplied { chess_move, remote } => {
            assert!(remote);
            assert_eq!(chess_move.san(), "e4");
        }
        _ => unreachable!(),
    }

    black.play("e7", "e5");
    black.wait_for_fen(AFTER_E5).await;
    white.wait_for_fen(AFTER_E5).await;
}

#[actix_rt::test]
async fn moving_out_of_turn_is_refused_without_touching_the_peer() {
    let hub = PubSubHub::new(Duration::from_secs(30)).start();
    let (_white, mut black) = seated_pair(&hub).await;

    black.play("e7", "e5");
    let notice = black
        .wait_for(|e| matches!(e, UiEvent::Notice { .. }))
        .await;
    assert_eq!(
        notice,
        UiEvent::Notice {
            severity: Severity::Blocking,
            text: "Please wait for your opponent to make their move.".into()
        }
    );
}

#[actix_rt::test]
async fn leaving_is_reported_to_the_opponent() {
    let hub = PubSubHub::new(Duration::from_secs(30)).start();
    let (mut white, black) = seated_pair(&hub).await;

    black.session.send(Shutdown).await.unwrap();
    let notice = white
        .wait_for(|e| matches!(e, UiEvent::Notice { .. }))
        .await;
    assert_eq!(
        notice,
        UiEvent::Notice {
            severity: Severity::Notice,
            text: "bob has left the game.".into()
        }
    );
}

#[actix_rt::test]
async fn chat_reaches_both_players() {
    let hub = PubSubHub::new(Duration::from_secs(30)).start();
    let (mut white, mut black) = seated_pair(&hub).await;

    white.session.do_send(Input(ClientMessage::Chat {
        text: "good luck".into(),
    }));
    for player in [&mut white, &mut black] {
        let chat = player.wait_for(|e| matches!(e, UiEvent::Chat { .. })).await;
        assert_eq!(
            chat,
            UiEvent::Chat {
                uuid: "alice".into(),
                text: "good luck".into()
            }
        );
    }
}
