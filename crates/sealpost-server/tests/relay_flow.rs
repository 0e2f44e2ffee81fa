//! End-to-end tests over real TCP.
//!
//! A server bound to an ephemeral port, driven by `sealpost-client`
//! connections: the full setup exchange, publish/fetch across two clients,
//! the reconnect notification, and a key recovery mid-session.

use std::{collections::HashMap, net::SocketAddr, time::Duration};

use sealpost_client::{Client, ClientConfig, ClientError};
use sealpost_core::GroupDirectory;
use sealpost_crypto::RecoveryMaterial;
use sealpost_proto::{GetOutcome, PutOutcome};
use sealpost_server::{Server, ServerConfig};

fn material_for(tag: u8) -> RecoveryMaterial {
    RecoveryMaterial {
        seed: [tag; 32],
        static_key: [tag.wrapping_add(1); 32],
        master_key: [tag.wrapping_add(2); 32],
    }
}

/// Start a relay on an ephemeral port with alice/bob/carol provisioned.
async fn start_relay() -> SocketAddr {
    let clients: HashMap<String, RecoveryMaterial> = [
        ("alice".to_string(), material_for(0x0A)),
        ("bob".to_string(), material_for(0x0B)),
        ("carol".to_string(), material_for(0x0C)),
    ]
    .into_iter()
    .collect();

    let config = ServerConfig {
        bind_address: "127.0.0.1:0".to_string(),
        read_timeout: Duration::from_secs(5),
        directory: GroupDirectory::new([
            ("G1", vec!["alice", "bob", "carol"]),
            ("G2", vec!["bob", "carol"]),
        ]),
        clients,
    };

    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.run());
    addr
}

fn client_config(id: &str, tag: u8) -> ClientConfig {
    let mut config = ClientConfig::new(id, material_for(tag));
    config.read_timeout = Duration::from_secs(5);
    config
}

#[tokio::test]
async fn publish_and_fetch_across_clients() {
    let addr = start_relay().await;

    let mut alice = Client::connect(&addr.to_string(), client_config("alice", 0x0A))
        .await
        .unwrap();
    assert!(alice.pending_groups().is_empty());

    let outcome = alice.publish("G1", "Olá grupo!").await.unwrap();
    assert_eq!(outcome, PutOutcome::Delivered);

    // Bob connects after the publish and is notified about G1
    let mut bob = Client::connect(&addr.to_string(), client_config("bob", 0x0B))
        .await
        .unwrap();
    assert_eq!(bob.pending_groups(), ["G1".to_string()]);

    match bob.fetch("G1").await.unwrap() {
        GetOutcome::Message(message) => {
            assert_eq!(message.sender, "alice");
            assert_eq!(message.text, "Olá grupo!");
        },
        other => panic!("expected a message, got {other:?}"),
    }

    // The queue is drained: the next fetch is an explicit Empty
    assert_eq!(bob.fetch("G1").await.unwrap(), GetOutcome::Empty);

    alice.shutdown().await.unwrap();
    bob.shutdown().await.unwrap();
}

#[tokio::test]
async fn consecutive_publishes_ratchet_in_lockstep() {
    let addr = start_relay().await;
    let mut alice = Client::connect(&addr.to_string(), client_config("alice", 0x0A))
        .await
        .unwrap();

    // Each delivered publish ratchets both ends; five in a row only work
    // if the keys stay synchronized
    for i in 0..5 {
        let text = format!("message {i}");
        assert_eq!(alice.publish("G1", &text).await.unwrap(), PutOutcome::Delivered);
    }

    let mut bob = Client::connect(&addr.to_string(), client_config("bob", 0x0B))
        .await
        .unwrap();
    for i in 0..5 {
        match bob.fetch("G1").await.unwrap() {
            GetOutcome::Message(message) => assert_eq!(message.text, format!("message {i}")),
            other => panic!("expected message {i}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn explicit_rejections_reach_the_client() {
    let addr = start_relay().await;
    let mut alice = Client::connect(&addr.to_string(), client_config("alice", 0x0A))
        .await
        .unwrap();

    assert_eq!(alice.publish("G9", "anyone?").await.unwrap(), PutOutcome::UnknownGroup);
    // Alice is not in G2
    assert_eq!(alice.publish("G2", "hello").await.unwrap(), PutOutcome::NotAMember);
    assert_eq!(alice.fetch("G9").await.unwrap(), GetOutcome::UnknownGroup);

    // The session survived all three rejections
    assert_eq!(alice.publish("G1", "still here").await.unwrap(), PutOutcome::Delivered);
}

#[tokio::test]
async fn recovery_mid_session_keeps_the_connection_usable() {
    let addr = start_relay().await;
    let mut alice = Client::connect(&addr.to_string(), client_config("alice", 0x0A))
        .await
        .unwrap();

    assert_eq!(alice.publish("G1", "before").await.unwrap(), PutOutcome::Delivered);

    // Suspected compromise: re-key via the recovery chain
    alice.recover().await.unwrap();

    assert_eq!(alice.publish("G1", "after").await.unwrap(), PutOutcome::Delivered);

    let mut bob = Client::connect(&addr.to_string(), client_config("bob", 0x0B))
        .await
        .unwrap();
    for expected in ["before", "after"] {
        match bob.fetch("G1").await.unwrap() {
            GetOutcome::Message(message) => assert_eq!(message.text, expected),
            other => panic!("expected {expected:?}, got {other:?}"),
        }
    }
}

#[tokio::test]
async fn repeated_recoveries_advance_the_chain() {
    let addr = start_relay().await;
    let mut alice = Client::connect(&addr.to_string(), client_config("alice", 0x0A))
        .await
        .unwrap();

    for _ in 0..3 {
        alice.recover().await.unwrap();
        assert_eq!(alice.publish("G1", "ping").await.unwrap(), PutOutcome::Delivered);
    }
}

#[tokio::test]
async fn unknown_client_is_rejected_at_identification() {
    let addr = start_relay().await;

    let result = Client::connect(&addr.to_string(), client_config("mallory", 0x0D)).await;
    match result {
        Err(ClientError::Rejected { greeting }) => assert_eq!(greeting, "unknown client"),
        other => panic!("expected a rejection, got {other:?}"),
    }
}

#[tokio::test]
async fn mismatched_recovery_material_is_fatal_to_recovery() {
    let addr = start_relay().await;

    // Alice connects with chain material the server did not provision for
    // her; setup and normal commands work (the chain is not involved), but
    // a recovery must die on the verifier mismatch
    let mut alice = Client::connect(&addr.to_string(), client_config("alice", 0x0E))
        .await
        .unwrap();
    assert_eq!(alice.publish("G1", "fine so far").await.unwrap(), PutOutcome::Delivered);

    let result = alice.recover().await;
    assert!(result.is_err(), "recovery with mismatched material must fail");
}
