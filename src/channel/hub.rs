//! In-process publish/subscribe hub with presence tracking.
//!
//! Members subscribe to a named channel under a uuid. Every publication is
//! fanned out to all members of the channel, the publisher included, and
//! membership changes are announced as `join`, `leave` or `timeout` presence
//! events. Members that stop sending heartbeats are swept out.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use actix::prelude::*;
use log::{debug, info, warn};

use crate::models::{PresenceAction, PresenceEvent};

/// Something the hub hands to a member
#[derive(Message, Debug, Clone, PartialEq)]
#[rtype(result = "()")]
pub enum HubDelivery {
    Message(serde_json::Value),
    Presence(PresenceEvent),
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Subscribe {
    pub channel: String,
    pub uuid: String,
    pub skill: Option<String>,
    pub recipient: Recipient<HubDelivery>,
}

#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct Unsubscribe {
    pub channel: String,
    pub uuid: String,
}

#[derive(Message, Debug, Clone)]
#[rtype(result = "()")]
pub struct Heartbeat {
    pub channel: String,
    pub uuid: String,
}

/// Publishes a payload; answers with the number of members it reached
#[derive(Message, Debug, Clone)]
#[rtype(result = "usize")]
pub struct Publish {
    pub channel: String,
    pub message: serde_json::Value,
}

struct Member {
    skill: Option<String>,
    recipient: Recipient<HubDelivery>,
    last_seen: Instant,
}

pub struct PubSubHub {
    channels: HashMap<String, HashMap<String, Member>>,
    presence_timeout: Duration,
}

impl PubSubHub {
    pub fn new(presence_timeout: Duration) -> Self {
        Self {
            channels: HashMap::new(),
            presence_timeout,
        }
    }

    fn sweep_interval(&self) -> Duration {
        (self.presence_timeout / 2).max(Duration::from_millis(10))
    }

    fn broadcast(&self, channel: &str, delivery: HubDelivery) -> usize {
        let Some(members) = self.channels.get(channel) else {
            return 0;
        };
        for member in members.values() {
            member.recipient.do_send(delivery.clone());
        }
        members.len()
    }

    fn announce(&self, channel: &str, action: PresenceAction, uuid: &str, skill: Option<String>) {
        self.broadcast(
            channel,
            HubDelivery::Presence(PresenceEvent {
                action,
                uuid: uuid.to_string(),
                skill,
            }),
        );
    }

    /// Drops members whose last heartbeat is older than the presence timeout
    fn sweep(&mut self) {
        let timeout = self.presence_timeout;
        let mut expired: Vec<(String, String)> = Vec::new();
        for (channel, members) in self.channels.iter_mut() {
            members.retain(|uuid, member| {
                let alive = member.last_seen.elapsed() <= timeout;
                if !alive {
                    expired.push((channel.clone(), uuid.clone()));
                }
                alive
            });
        }
        self.channels.retain(|_, members| !members.is_empty());

        for (channel, uuid) in expired {
            warn!("{} timed out on channel {}", uuid, channel);
            self.announce(&channel, PresenceAction::Timeout, &uuid, None);
        }
    }

    pub fn member_count(&self, channel: &str) -> usize {
        self.channels.get(channel).map_or(0, HashMap::len)
    }
}

impl Actor for PubSubHub {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            "Pub/sub hub started, presence timeout {:?}",
            self.presence_timeout
        );
        ctx.run_interval(self.sweep_interval(), |hub, _| hub.sweep());
    }
}

impl Handler<Subscribe> for PubSubHub {
    type Result = ();

    fn handle(&mut self, msg: Subscribe, _: &mut Self::Context) {
        info!("{} joined channel {}", msg.uuid, msg.channel);
        let members = self.channels.entry(msg.channel.clone()).or_default();

        // Let the newcomer know who is already here
        for (uuid, member) in members.iter().filter(|(uuid, _)| **uuid != msg.uuid) {
            msg.recipient.do_send(HubDelivery::Presence(PresenceEvent {
                action: PresenceAction::Join,
                uuid: uuid.clone(),
                skill: member.skill.clone(),
            }));
        }

        members.insert(
            msg.uuid.clone(),
            Member {
                skill: msg.skill.clone(),
                recipient: msg.recipient,
                last_seen: Instant::now(),
            },
        );
        self.announce(&msg.channel, PresenceAction::Join, &msg.uuid, msg.skill);
    }
}

impl Handler<Unsubscribe> for PubSubHub {
    type Result = ();

    fn handle(&mut self, msg: Unsubscribe, _: &mut Self::Context) {
        let removed = self
            .channels
            .get_mut(&msg.channel)
            .and_then(|members| members.remove(&msg.uuid))
            .is_some();
        if !removed {
            return;
        }
        info!("{} left channel {}", msg.uuid, msg.channel);
        if self.member_count(&msg.channel) == 0 {
            self.channels.remove(&msg.channel);
        }
        self.announce(&msg.channel, PresenceAction::Leave, &msg.uuid, None);
    }
}

impl Handler<Heartbeat> for PubSubHub {
    type Result = ();

    fn handle(&mut self, msg: Heartbeat, _: &mut Self::Context) {
        if let Some(member) = self
            .channels
            .get_mut(&msg.channel)
            .and_then(|members| members.get_mut(&msg.uuid))
        {
            member.last_seen = Instant::now();
        }
    }
}

impl Handler<Publish> for PubSubHub {
    type Result = usize;

    fn handle(&mut self, msg: Publish, _: &mut Self::Context) -> usize {
        let reached = self.broadcast(&msg.channel, HubDelivery::Message(msg.message));
        debug!("Published on {} to {} members", msg.channel, reached);
        reached
    }
}
