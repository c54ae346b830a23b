mod common;

use common::{signed_ask, signed_backtrack, Mesh, Probe};
use mesh_identity::{verify, KeyPair, Mode};
use mesh_node::NodeConfig;
use mesh_session::Transport;
use mesh_wire::{signed_payload, AnnouncedMode, Message, PeerId};
use std::time::Duration;

fn hidden_as(key: &KeyPair) -> AnnouncedMode {
    AnnouncedMode::Hidden(key.public_key_hex().to_string())
}

#[tokio::test]
async fn test_hidden_nodes_meet_across_relays() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relays: Vec<usize> = (0..3).map(|i| mesh.add_public(&format!("R{}", i))).collect();
    let h1 = mesh.add("H1", Mode::Hidden(key.clone()));
    let h2 = mesh.add("H2", Mode::Hidden(key));

    for pair in relays.windows(2) {
        mesh.link(pair[0], pair[1]).await;
    }
    mesh.link(h2, relays[2]).await;
    assert!(!mesh.connected(h1, h2));

    mesh.link(h1, relays[0]).await;

    assert!(mesh.connected(h1, h2));
    assert!(mesh.connected(h2, h1));
    assert_eq!(mesh.completions(), 1);
    assert_eq!(mesh.node(h1).rendezvous_completions(), 1);
    assert!(!mesh.node_mut(h1).has_pending_rendezvous());
}

#[tokio::test]
async fn test_hidden_nodes_with_different_keys_never_meet() {
    let mut mesh = Mesh::new();
    let relay = mesh.add_public("R");
    let h1 = mesh.add("H1", Mode::Hidden(KeyPair::generate()));
    let h2 = mesh.add("H2", Mode::Hidden(KeyPair::generate()));

    mesh.link(h2, relay).await;
    mesh.link(h1, relay).await;

    assert!(!mesh.connected(h1, h2));
    assert_eq!(mesh.completions(), 0);
}

#[tokio::test]
async fn test_duplicate_search_is_relayed_once() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relay = mesh.add_public("R");
    let sender = Probe::attach_public(&mut mesh, relay, 10).await;
    let mut listener = Probe::attach_public(&mut mesh, relay, 20).await;

    let ask = signed_ask(&key, vec![PeerId(10)], "offer-1");
    sender.send(&Message::AskAround(ask.clone()));
    mesh.pump().await;
    let relay_id = mesh.node(relay).peer_id();
    let forwarded = listener.take_ask_arounds();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].path, vec![PeerId(10), relay_id]);
    assert_eq!(forwarded[0].signature, ask.signature);

    sender.send(&Message::AskAround(ask));
    mesh.pump().await;
    assert!(listener.take_ask_arounds().is_empty());
}

#[tokio::test]
async fn test_zero_dedup_limits_still_stop_flood_on_cycle() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relays: Vec<usize> = (0..3)
        .map(|i| {
            let config = NodeConfig {
                seen_capacity: 0,
                seen_ttl: Duration::ZERO,
                ..NodeConfig::named(format!("R{}", i))
            };
            mesh.add_with_config(config, Mode::Public)
        })
        .collect();
    mesh.link(relays[0], relays[1]).await;
    mesh.link(relays[1], relays[2]).await;
    mesh.link(relays[2], relays[0]).await;

    let sender = Probe::attach_public(&mut mesh, relays[0], 10).await;
    let mut listener = Probe::attach_public(&mut mesh, relays[2], 20).await;

    sender.send(&Message::AskAround(signed_ask(&key, vec![PeerId(10)], "offer-1")));
    mesh.pump().await;

    assert_eq!(listener.take_ask_arounds().len(), 1);
}

#[tokio::test]
async fn test_relay_hands_search_to_matching_hidden_neighbor() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relay = mesh.add_public("R");
    let sender = Probe::attach_public(&mut mesh, relay, 10).await;
    let mut other = Probe::attach_public(&mut mesh, relay, 20).await;
    let mut target = Probe::attach(&mut mesh, relay, 30, hidden_as(&key)).await;

    let ask = signed_ask(&key, vec![PeerId(1), PeerId(10)], "offer-1");
    sender.send(&Message::AskAround(ask.clone()));
    mesh.pump().await;

    assert_eq!(target.take_ask_arounds(), vec![ask]);
    assert!(other.take_ask_arounds().is_empty());
}

#[tokio::test]
async fn test_relay_does_not_hand_search_back_to_originator() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relay = mesh.add_public("R");
    let mut originator = Probe::attach(&mut mesh, relay, 10, hidden_as(&key)).await;
    let mut listener = Probe::attach_public(&mut mesh, relay, 20).await;

    originator.send(&Message::AskAround(signed_ask(&key, vec![PeerId(10)], "offer-1")));
    mesh.pump().await;

    assert!(originator.take_ask_arounds().is_empty());
    let relay_id = mesh.node(relay).peer_id();
    let forwarded = listener.take_ask_arounds();
    assert_eq!(forwarded.len(), 1);
    assert_eq!(forwarded[0].path, vec![PeerId(10), relay_id]);
}

#[tokio::test]
async fn test_relay_rejects_tampered_search() {
    let key = KeyPair::generate();
    let imposter = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relay = mesh.add_public("R");
    let sender = Probe::attach_public(&mut mesh, relay, 10).await;
    let mut listener = Probe::attach_public(&mut mesh, relay, 20).await;

    let mut forged_signature = signed_ask(&key, vec![PeerId(10)], "offer-1");
    forged_signature.signature = imposter.sign(b"10offer-1");

    let mut forged_offer = signed_ask(&key, vec![PeerId(10)], "offer-2");
    forged_offer.offer = "offer-2-tampered".to_string();

    let mut swapped_key = signed_ask(&key, vec![PeerId(10)], "offer-3");
    swapped_key.public_key = imposter.public_key_hex().to_string();

    let mut garbage_key = signed_ask(&key, vec![PeerId(10)], "offer-4");
    garbage_key.public_key = "zz".to_string();

    for ask in [forged_signature, forged_offer, swapped_key, garbage_key] {
        sender.send(&Message::AskAround(ask));
    }
    mesh.pump().await;

    assert!(listener.take_ask_arounds().is_empty());
}

#[tokio::test]
async fn test_relay_rejects_empty_search_path() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relay = mesh.add_public("R");
    let sender = Probe::attach_public(&mut mesh, relay, 10).await;
    let mut listener = Probe::attach_public(&mut mesh, relay, 20).await;

    let mut ask = signed_ask(&key, vec![PeerId(10)], "offer-1");
    ask.path.clear();
    sender.send(&Message::AskAround(ask));
    mesh.pump().await;

    assert!(listener.take_ask_arounds().is_empty());
}

#[tokio::test]
async fn test_hidden_target_answers_with_signed_backtrack() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let hidden = mesh.add("H", Mode::Hidden(key.clone()));
    let mut relay = Probe::attach_public(&mut mesh, hidden, 10).await;

    let searcher = mesh.network.transport();
    let (offer, _acceptor) = searcher.0.originate().await.unwrap();
    let path = vec![PeerId(1), PeerId(10)];
    relay.send(&Message::AskAround(signed_ask(&key, path.clone(), &offer)));
    mesh.pump().await;

    let backs = relay.take_backtracks();
    assert_eq!(backs.len(), 1);
    let back = &backs[0];
    assert_eq!(back.originator, mesh.node(hidden).peer_id());
    assert_eq!(back.path, path);
    assert_eq!(back.public_key, key.public_key_hex());
    verify(
        &back.public_key,
        signed_payload(back.originator, &back.answer).as_bytes(),
        &back.signature,
    )
    .unwrap();
}

#[tokio::test]
async fn test_hidden_node_ignores_foreign_or_forged_search() {
    let key = KeyPair::generate();
    let foreign = KeyPair::generate();
    let mut mesh = Mesh::new();
    let hidden = mesh.add("H", Mode::Hidden(key.clone()));
    let mut relay = Probe::attach_public(&mut mesh, hidden, 10).await;

    relay.send(&Message::AskAround(signed_ask(&foreign, vec![PeerId(1)], "offer-1")));

    let mut forged = signed_ask(&key, vec![PeerId(1)], "offer-2");
    forged.signature = foreign.sign(b"1offer-2");
    relay.send(&Message::AskAround(forged));
    mesh.pump().await;

    assert!(relay.take_backtracks().is_empty());
}

#[tokio::test]
async fn test_backtrack_pops_one_hop_per_relay() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relay = mesh.add_public("R");
    let mut upstream = Probe::attach_public(&mut mesh, relay, 10).await;
    let downstream = Probe::attach_public(&mut mesh, relay, 20).await;

    let back = signed_backtrack(&key, PeerId(99), "answer-1", vec![PeerId(1), PeerId(10)]);
    downstream.send(&Message::Backtrack(back.clone()));
    mesh.pump().await;

    let received = upstream.take_backtracks();
    assert_eq!(received.len(), 1);
    assert_eq!(received[0].path, vec![PeerId(1)]);
    assert_eq!(received[0].answer, back.answer);
    assert_eq!(received[0].signature, back.signature);
}

#[tokio::test]
async fn test_backtrack_with_stale_or_forged_route_is_dropped() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relay = mesh.add_public("R");
    let mut upstream = Probe::attach_public(&mut mesh, relay, 10).await;
    let downstream = Probe::attach_public(&mut mesh, relay, 20).await;

    // next hop is not a neighbor
    let stale = signed_backtrack(&key, PeerId(99), "answer-1", vec![PeerId(10), PeerId(55)]);
    downstream.send(&Message::Backtrack(stale));

    let mut forged = signed_backtrack(&key, PeerId(99), "answer-2", vec![PeerId(10)]);
    forged.answer = "answer-2-tampered".to_string();
    downstream.send(&Message::Backtrack(forged));

    let mut swapped = signed_backtrack(&key, PeerId(99), "answer-3", vec![PeerId(10)]);
    swapped.public_key = KeyPair::generate().public_key_hex().to_string();
    downstream.send(&Message::Backtrack(swapped));

    let empty = signed_backtrack(&key, PeerId(99), "answer-4", Vec::new());
    downstream.send(&Message::Backtrack(empty));
    mesh.pump().await;

    assert!(upstream.take_backtracks().is_empty());
}

#[tokio::test]
async fn test_hidden_searcher_rejects_forged_backtrack() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let hidden = mesh.add("H", Mode::Hidden(key.clone()));
    let mut relay = Probe::attach_public(&mut mesh, hidden, 10).await;

    assert_eq!(mesh.node_mut(hidden).search().await.unwrap(), 1);
    let asks = relay.take_ask_arounds();
    assert_eq!(asks.len(), 1);
    assert!(mesh.node_mut(hidden).has_pending_rendezvous());

    let (target, _target_events) = mesh.network.transport();
    let answer = target.accept(&asks[0].offer).await.unwrap();
    let hidden_id = mesh.node(hidden).peer_id();

    let mut tampered = signed_backtrack(&key, PeerId(77), &answer, vec![hidden_id]);
    tampered.answer = format!("{}-tampered", answer);
    relay.send(&Message::Backtrack(tampered));

    let foreign = signed_backtrack(&KeyPair::generate(), PeerId(77), &answer, vec![hidden_id]);
    relay.send(&Message::Backtrack(foreign));
    mesh.pump().await;

    assert!(mesh.node_mut(hidden).has_pending_rendezvous());
    assert_eq!(mesh.node(hidden).rendezvous_completions(), 0);
    assert_eq!(mesh.node(hidden).peers().len(), 1);
}

#[tokio::test]
async fn test_backtrack_reverses_forward_path() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let relays: Vec<usize> = (0..4).map(|i| mesh.add_public(&format!("R{}", i))).collect();
    for pair in relays.windows(2) {
        mesh.link(pair[0], pair[1]).await;
    }
    let last = *relays.last().unwrap();
    let mut target = Probe::attach(&mut mesh, last, 7, hidden_as(&key)).await;

    let searcher = mesh.add("H", Mode::Hidden(key.clone()));
    mesh.link(searcher, relays[0]).await;

    let asks = target.take_ask_arounds();
    assert_eq!(asks.len(), 1);
    let path = asks[0].path.clone();
    let searcher_id = mesh.node(searcher).peer_id();
    assert_eq!(path[0], searcher_id);

    let index_of = |id: PeerId| mesh.index_of(id).unwrap();
    // every hop of the recorded path is a live edge, and the last hop reaches the target's relay
    for hop in path.windows(2) {
        assert!(mesh.connected(index_of(hop[0]), index_of(hop[1])));
    }
    assert!(mesh.connected(index_of(*path.last().unwrap()), last));

    let answer = target.transport.accept(&asks[0].offer).await.unwrap();
    let back = signed_backtrack(&key, target.id, &answer, path);
    target.send(&Message::Backtrack(back));
    mesh.pump().await;

    assert_eq!(mesh.node(searcher).rendezvous_completions(), 1);
    assert_eq!(mesh.node(searcher).peers().len(), 2);
}

#[tokio::test]
async fn test_search_restarts_through_public_neighbors() {
    let key = KeyPair::generate();
    let mut mesh = Mesh::new();
    let hidden = mesh.add("H", Mode::Hidden(key));
    let mut first = Probe::attach_public(&mut mesh, hidden, 10).await;
    let mut second = Probe::attach_public(&mut mesh, hidden, 20).await;

    let sent = mesh.node_mut(hidden).search().await.unwrap();
    assert_eq!(sent, 2);
    let a = first.take_ask_arounds();
    let b = second.take_ask_arounds();
    assert_eq!(a.len(), 1);
    assert_eq!(a, b);
    assert!(mesh.node_mut(hidden).has_pending_rendezvous());

    let public = mesh.add_public("P");
    assert_eq!(mesh.node_mut(public).search().await.unwrap(), 0);
}
