use std::time::Duration;

use actix::prelude::*;
use log::{debug, info, warn};

use crate::channel::hub::{Heartbeat, HubDelivery, Publish, PubSubHub, Subscribe, Unsubscribe};
use crate::channel::{ChatReceived, MoveReceived, PresenceChanged, SyncChannel};
use crate::config::LaunchParams;
use crate::error::SyncError;
use crate::models::{ChannelMessage, ChatPayload, Move};

/// Decoded traffic waiting for its callback
#[derive(Debug, Clone)]
enum Inbound {
    Move(MoveReceived),
    Chat(ChatReceived),
    Presence(PresenceChanged),
}

#[derive(Message)]
#[rtype(result = "()")]
enum Register {
    Moves(Recipient<MoveReceived>),
    Chats(Recipient<ChatReceived>),
    Presence(Recipient<PresenceChanged>),
}

#[derive(Message)]
#[rtype(result = "()")]
struct Leave;

/// Hub member acting on behalf of one player. Decodes what the hub delivers
/// and forwards it to the registered callbacks, holding anything that
/// arrives before its callback is known.
struct ChannelSubscriber {
    hub: Addr<PubSubHub>,
    channel: String,
    uuid: String,
    skill: String,
    heartbeat: Duration,
    moves: Option<Recipient<MoveReceived>>,
    chats: Option<Recipient<ChatReceived>>,
    presence: Option<Recipient<PresenceChanged>>,
    backlog: Vec<Inbound>,
}

impl ChannelSubscriber {
    fn decode(&self, delivery: HubDelivery) -> Result<Inbound, SyncError> {
        match delivery {
            HubDelivery::Presence(event) => Ok(Inbound::Presence(PresenceChanged(event))),
            HubDelivery::Message(value) => {
                let message: ChannelMessage = serde_json::from_value(value)
                    .map_err(|e| SyncError::MalformedMessage(e.to_string()))?;
                Ok(match message {
                    ChannelMessage::ChessMove {
                        chess_move,
                        src_uuid,
                        target_uuid,
                    } => Inbound::Move(MoveReceived {
                        chess_move,
                        src_uuid,
                        target_uuid,
                    }),
                    ChannelMessage::Chat { payload } => Inbound::Chat(ChatReceived {
                        uuid: payload.uuid,
                        text: payload.text,
                    }),
                })
            }
        }
    }

    /// Hands `inbound` to its callback, or gives it back when there is none yet
    fn dispatch(&self, inbound: Inbound) -> Option<Inbound> {
        match inbound {
            Inbound::Move(msg) => match &self.moves {
                Some(to) => to.do_send(msg),
                None => return Some(Inbound::Move(msg)),
            },
            Inbound::Chat(msg) => match &self.chats {
                Some(to) => to.do_send(msg),
                None => return Some(Inbound::Chat(msg)),
            },
            Inbound::Presence(msg) => match &self.presence {
                Some(to) => to.do_send(msg),
                None => return Some(Inbound::Presence(msg)),
            },
        }
        None
    }

    fn flush_backlog(&mut self) {
        let backlog = std::mem::take(&mut self.backlog);
        for inbound in backlog {
            if let Some(undelivered) = self.dispatch(inbound) {
                self.backlog.push(undelivered);
            }
        }
    }
}

impl Actor for ChannelSubscriber {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        self.hub.do_send(Subscribe {
            channel: self.channel.clone(),
            uuid: self.uuid.clone(),
            skill: Some(self.skill.clone()),
            recipient: ctx.address().recipient(),
        });
        ctx.run_interval(self.heartbeat, |subscriber, _| {
            subscriber.hub.do_send(Heartbeat {
                channel: subscriber.channel.clone(),
                uuid: subscriber.uuid.clone(),
            });
        });
        info!("{} subscribed to channel {}", self.uuid, self.channel);
    }
}

impl Handler<HubDelivery> for ChannelSubscriber {
    type Result = ();

    fn handle(&mut self, msg: HubDelivery, _: &mut Self::Context) {
        match self.decode(msg) {
            Ok(inbound) => {
                if let Some(held) = self.dispatch(inbound) {
                    debug!("Holding {:?} until a callback is registered", held);
                    self.backlog.push(held);
                }
            }
            Err(e) => warn!("Dropping message on {}: {}", self.channel, e),
        }
    }
}

impl Handler<Register> for ChannelSubscriber {
    type Result = ();

    fn handle(&mut self, msg: Register, _: &mut Self::Context) {
        match msg {
            Register::Moves(recipient) => self.moves = Some(recipient),
            Register::Chats(recipient) => self.chats = Some(recipient),
            Register::Presence(recipient) => self.presence = Some(recipient),
        }
        self.flush_backlog();
    }
}

impl Handler<Leave> for ChannelSubscriber {
    type Result = ();

    fn handle(&mut self, _: Leave, ctx: &mut Self::Context) {
        self.hub.do_send(Unsubscribe {
            channel: self.channel.clone(),
            uuid: self.uuid.clone(),
        });
        info!("{} unsubscribed from channel {}", self.uuid, self.channel);
        ctx.stop();
    }
}

/// [`SyncChannel`] over the in-process [`PubSubHub`]
pub struct HubChannel {
    hub: Addr<PubSubHub>,
    subscriber: Addr<ChannelSubscriber>,
    channel: String,
    local_uuid: String,
    remote_uuid: String,
    connected: bool,
}

impl HubChannel {
    /// Joins the game channel named in `launch`, announcing the local skill level
    pub fn connect(hub: Addr<PubSubHub>, launch: &LaunchParams, heartbeat: Duration) -> Self {
        let subscriber = ChannelSubscriber {
            hub: hub.clone(),
            channel: launch.channel.clone(),
            uuid: launch.local_uuid.clone(),
            skill: launch.local_skill_level.clone(),
            heartbeat,
            moves: None,
            chats: None,
            presence: None,
            backlog: Vec::new(),
        }
        .start();

        Self {
            hub,
            subscriber,
            channel: launch.channel.clone(),
            local_uuid: launch.local_uuid.clone(),
            remote_uuid: launch.remote_uuid.clone(),
            connected: true,
        }
    }

    fn publish(&mut self, message: ChannelMessage) -> Result<(), SyncError> {
        if !self.connected {
            return Err(SyncError::TransportFailure("channel disconnected".into()));
        }
        let message = serde_json::to_value(&message)
            .map_err(|e| SyncError::TransportFailure(e.to_string()))?;
        self.hub
            .try_send(Publish {
                channel: self.channel.clone(),
                message,
            })
            .map_err(|e| SyncError::TransportFailure(e.to_string()))
    }
}

impl SyncChannel for HubChannel {
    fn publish_move(&mut self, chess_move: &Move) -> Result<(), SyncError> {
        self.publish(ChannelMessage::ChessMove {
            chess_move: chess_move.clone(),
            src_uuid: self.local_uuid.clone(),
            target_uuid: self.remote_uuid.clone(),
        })
    }

    fn publish_chat(&mut self, text: &str) -> Result<(), SyncError> {
        self.publish(ChannelMessage::Chat {
            payload: ChatPayload {
                text: text.to_string(),
                uuid: self.local_uuid.clone(),
            },
        })
    }

    fn on_move_received(&mut self, recipient: Recipient<MoveReceived>) {
        self.subscriber.do_send(Register::Moves(recipient));
    }

    fn on_chat_received(&mut self, recipient: Recipient<ChatReceived>) {
        self.subscriber.do_send(Register::Chats(recipient));
    }

    fn on_peer_presence_changed(&mut self, recipient: Recipient<PresenceChanged>) {
        self.subscriber.do_send(Register::Presence(recipient));
    }

    fn disconnect(&mut self) {
        if self.connected {
            self.connected = false;
            self.subscriber.do_send(Leave);
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PresenceAction, PresenceEvent};
    use chess::{Color, Piece, Square};

    #[derive(Default)]
    struct Inbox {
        moves: Vec<MoveReceived>,
        chats: Vec<ChatReceived>,
        presence: Vec<PresenceEvent>,
    }

    impl Actor for Inbox {
        type Context = Context<Self>;
    }

    impl Handler<MoveReceived> for Inbox {
        type Result = ();

        fn handle(&mut self, msg: MoveReceived, _: &mut Self::Context) {
            self.moves.push(msg);
        }
    }

    impl Handler<ChatReceived> for Inbox {
        type Result = ();

        fn handle(&mut self, msg: ChatReceived, _: &mut Self::Context) {
            self.chats.push(msg);
        }
    }

    impl Handler<PresenceChanged> for Inbox {
        type Result = ();

        fn handle(&mut self, msg: PresenceChanged, _: &mut Self::Context) {
            self.presence.push(msg.0);
        }
    }

    #[derive(Message)]
    #[rtype(result = "(usize, usize, Vec<PresenceEvent>)")]
    struct Peek;

    impl Handler<Peek> for Inbox {
        type Result = MessageResult<Peek>;

        fn handle(&mut self, _: Peek, _: &mut Self::Context) -> Self::Result {
            MessageResult((self.moves.len(), self.chats.len(), self.presence.clone()))
        }
    }

    fn launch(local: &str, remote: &str, side: Color) -> LaunchParams {
        LaunchParams {
            local_uuid: local.into(),
            remote_uuid: remote.into(),
            channel: "game-1".into(),
            local_skill_level: "1200".into(),
            side,
        }
    }

    fn connect(hub: &Addr<PubSubHub>, local: &str, remote: &str, side: Color) -> HubChannel {
        HubChannel::connect(hub.clone(), &launch(local, remote, side), Duration::from_secs(5))
    }

    fn attach(channel: &mut HubChannel, inbox: &Addr<Inbox>) {
        channel.on_move_received(inbox.clone().recipient());
        channel.on_chat_received(inbox.clone().recipient());
        channel.on_peer_presence_changed(inbox.clone().recipient());
    }

    async fn settle() {
        actix_rt::time::sleep(Duration::from_millis(50)).await;
    }

    #[actix_rt::test]
    async fn moves_and_chat_travel_between_two_players() {
        let hub = PubSubHub::new(Duration::from_secs(30)).start();
        let mut alice = connect(&hub, "alice", "bob", Color::White);
        let mut bob = connect(&hub, "bob", "alice", Color::Black);
        let alice_inbox = Inbox::default().start();
        let bob_inbox = Inbox::default().start();
        attach(&mut alice, &alice_inbox);
        attach(&mut bob, &bob_inbox);
        settle().await;

        alice
            .publish_move(&Move::new(Square::E2, Square::E4, Piece::Pawn, Color::White))
            .unwrap();
        alice.publish_chat("have fun").unwrap();
        settle().await;

        // The hub echoes to the publisher as well
        let (moves, chats, presence) = bob_inbox.send(Peek).await.unwrap();
        assert_eq!((moves, chats), (1, 1));
        assert!(presence.contains(&PresenceEvent {
            action: PresenceAction::Join,
            uuid: "alice".into(),
            skill: Some("1200".into()),
        }));
        let (moves, chats, _) = alice_inbox.send(Peek).await.unwrap();
        assert_eq!((moves, chats), (1, 1));
    }

    #[actix_rt::test]
    async fn disconnecting_announces_leave_and_refuses_publication() {
        let hub = PubSubHub::new(Duration::from_secs(30)).start();
        let mut alice = connect(&hub, "alice", "bob", Color::White);
        let mut bob = connect(&hub, "bob", "alice", Color::Black);
        let bob_inbox = Inbox::default().start();
        attach(&mut bob, &bob_inbox);
        settle().await;

        alice.disconnect();
        assert!(!alice.is_connected());
        assert!(matches!(
            alice.publish_chat("anyone?"),
            Err(SyncError::TransportFailure(_))
        ));
        settle().await;

        let (_, _, presence) = bob_inbox.send(Peek).await.unwrap();
        assert_eq!(
            presence.last(),
            Some(&PresenceEvent {
                action: PresenceAction::Leave,
                uuid: "alice".into(),
                skill: None,
            })
        );
    }

    #[actix_rt::test]
    async fn malformed_payloads_are_dropped() {
        let hub = PubSubHub::new(Duration::from_secs(30)).start();
        let mut bob = connect(&hub, "bob", "alice", Color::Black);
        let bob_inbox = Inbox::default().start();
        attach(&mut bob, &bob_inbox);
        settle().await;

        hub.send(Publish {
            channel: "game-1".into(),
            message: serde_json::json!({"type": "resign", "who": "alice"}),
        })
        .await
        .unwrap();
        settle().await;

        let (moves, chats, _) = bob_inbox.send(Peek).await.unwrap();
        assert_eq!((moves, chats), (0, 0));
    }
}
