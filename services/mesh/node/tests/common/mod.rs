#![allow(dead_code)]

use mesh_identity::{KeyPair, Mode};
use mesh_node::{Node, NodeConfig};
use mesh_session::{
    connect, Channel, EventReceiver, MemoryNetwork, MemoryTransport, TransportEvent,
};
use mesh_wire::{decode, encode, signed_payload, AnnouncedMode, AskAround, Backtrack, Info, Message, PeerId};
use std::sync::Arc;

const MAX_ROUNDS: usize = 10_000;

pub struct Member {
    pub node: Node,
    pub transport: MemoryTransport,
    events: EventReceiver,
}

/// Several nodes over one in-memory network, driven deterministically
#[derive(Default)]
pub struct Mesh {
    pub network: MemoryNetwork,
    members: Vec<Member>,
}

impl Mesh {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str, mode: Mode) -> usize {
        self.add_with_config(NodeConfig::named(name), mode)
    }

    pub fn add_with_config(&mut self, config: NodeConfig, mode: Mode) -> usize {
        let (transport, events) = self.network.transport();
        let node = Node::new(config, mode, Arc::new(transport.clone()));
        self.members.push(Member {
            node,
            transport,
            events,
        });
        self.members.len() - 1
    }

    pub fn add_public(&mut self, name: &str) -> usize {
        self.add(name, Mode::Public)
    }

    /// Bootstrap a channel from `a` to `b` and let the mesh settle
    pub async fn link(&mut self, a: usize, b: usize) {
        connect(&self.members[a].transport, &self.members[b].transport)
            .await
            .unwrap();
        self.pump().await;
    }

    /// Deliver queued events until every node is idle
    pub async fn pump(&mut self) {
        for _ in 0..MAX_ROUNDS {
            let mut progressed = false;
            for member in &mut self.members {
                while let Ok(event) = member.events.try_recv() {
                    member.node.handle_event(event).await;
                    progressed = true;
                }
            }
            if !progressed {
                return;
            }
        }
        panic!("mesh did not settle");
    }

    pub fn node(&self, index: usize) -> &Node {
        &self.members[index].node
    }

    pub fn node_mut(&mut self, index: usize) -> &mut Node {
        &mut self.members[index].node
    }

    pub fn transport(&self, index: usize) -> &MemoryTransport {
        &self.members[index].transport
    }

    pub fn index_of(&self, id: PeerId) -> Option<usize> {
        self.members.iter().position(|m| m.node.peer_id() == id)
    }

    pub fn connected(&self, a: usize, b: usize) -> bool {
        self.node(a).peers().contains_id(self.node(b).peer_id())
    }

    pub fn edges(&self) -> usize {
        let total: usize = self.members.iter().map(|m| m.node.peers().len()).sum();
        total / 2
    }

    pub fn completions(&self) -> u64 {
        self.members.iter().map(|m| m.node.rendezvous_completions()).sum()
    }
}

/// Hand driven endpoint attached to one mesh node
pub struct Probe {
    pub id: PeerId,
    pub transport: MemoryTransport,
    events: EventReceiver,
    channel: Option<Arc<dyn Channel>>,
    inbox: Vec<Message>,
    pub closed: bool,
}

impl Probe {
    /// Open a channel to node `index` and announce `id` and `mode`
    pub async fn attach(mesh: &mut Mesh, index: usize, id: u32, mode: AnnouncedMode) -> Probe {
        let (transport, events) = mesh.network.transport();
        connect(&transport, mesh.transport(index)).await.unwrap();

        let mut probe = Probe {
            id: PeerId(id),
            transport,
            events,
            channel: None,
            inbox: Vec::new(),
            closed: false,
        };
        probe.poll();
        probe.send(&Message::Info(Info::announce(None, PeerId(id), mode)));
        mesh.pump().await;
        probe.take();
        probe
    }

    pub async fn attach_public(mesh: &mut Mesh, index: usize, id: u32) -> Probe {
        Self::attach(mesh, index, id, AnnouncedMode::Public).await
    }

    fn poll(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                TransportEvent::Opened(channel) => {
                    if self.channel.is_none() {
                        self.channel = Some(channel);
                    }
                }
                TransportEvent::Message { text, .. } => self.inbox.push(decode(&text).unwrap()),
                TransportEvent::Closed { .. } => self.closed = true,
            }
        }
    }

    pub fn send(&self, message: &Message) {
        self.channel
            .as_ref()
            .expect("probe is not attached")
            .send(encode(message))
            .unwrap();
    }

    pub fn send_raw(&self, text: &str) {
        self.channel
            .as_ref()
            .expect("probe is not attached")
            .send(text.to_string())
            .unwrap();
    }

    /// Everything received since the last call
    pub fn take(&mut self) -> Vec<Message> {
        self.poll();
        std::mem::take(&mut self.inbox)
    }

    pub fn take_ask_arounds(&mut self) -> Vec<AskAround> {
        self.take()
            .into_iter()
            .filter_map(|m| match m {
                Message::AskAround(ask) => Some(ask),
                _ => None,
            })
            .collect()
    }

    pub fn take_backtracks(&mut self) -> Vec<Backtrack> {
        self.take()
            .into_iter()
            .filter_map(|m| match m {
                Message::Backtrack(back) => Some(back),
                _ => None,
            })
            .collect()
    }
}

pub fn signed_ask(key: &KeyPair, path: Vec<PeerId>, offer: &str) -> AskAround {
    let signature = key.sign(signed_payload(path[0], offer).as_bytes());
    AskAround {
        offer: offer.to_string(),
        path,
        signature,
        public_key: key.public_key_hex().to_string(),
    }
}

pub fn signed_backtrack(key: &KeyPair, originator: PeerId, answer: &str, path: Vec<PeerId>) -> Backtrack {
    let signature = key.sign(signed_payload(originator, answer).as_bytes());
    Backtrack {
        answer: answer.to_string(),
        originator,
        signature,
        public_key: key.public_key_hex().to_string(),
        path,
    }
}
