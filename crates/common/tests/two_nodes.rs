//! Integration tests for send, receive and privacy groups across nodes

mod common;

use ::common::crypto::StorageKey;
use ::common::enclave::{EnclaveError, GroupType, PrivacyGroupPayload};
use ::common::node::{CreatePrivacyGroup, NodeError, Recipients, SendRequest};
use ::common::store::Storage;

#[tokio::test]
async fn test_direct_send_is_readable_on_recipient_node() {
    let nodes = common::network(2);
    let (k1, k2) = (nodes[0].keys[0], nodes[1].keys[0]);

    let sent = nodes[0]
        .node
        .send(SendRequest {
            payload: b"a message".to_vec(),
            from: Some(k1),
            to: Recipients::Keys(vec![k1, k2]),
        })
        .await
        .unwrap();

    let received = nodes[1].node.receive(&sent.key, Some(k2)).await.unwrap();
    assert_eq!(received.payload, b"a message");
    assert_eq!(received.privacy_group_id, Some(sent.privacy_group_id));

    let own = nodes[0].node.receive(&sent.key, Some(k1)).await.unwrap();
    assert_eq!(own.payload, b"a message");
}

#[tokio::test]
async fn test_recipient_node_cannot_read_as_foreign_key() {
    let nodes = common::network(2);
    let (k1, k2) = (nodes[0].keys[0], nodes[1].keys[0]);

    let sent = nodes[0]
        .node
        .send(SendRequest {
            payload: b"a message".to_vec(),
            from: Some(k1),
            to: Recipients::Keys(vec![k2]),
        })
        .await
        .unwrap();

    let result = nodes[1].node.receive(&sent.key, Some(k1)).await;
    assert!(matches!(
        result,
        Err(NodeError::Enclave(EnclaveError::NotARecipient(key))) if key == k1
    ));
}

#[tokio::test]
async fn test_direct_send_shares_implied_group() {
    let nodes = common::network(2);
    let (k1, k2) = (nodes[0].keys[0], nodes[1].keys[0]);

    let sent = nodes[0]
        .node
        .send(SendRequest {
            payload: b"hi".to_vec(),
            from: None,
            to: Recipients::Keys(vec![k2]),
        })
        .await
        .unwrap();

    assert_eq!(
        sent.privacy_group_id,
        PrivacyGroupPayload::implied([k1, k2]).id()
    );
    let group = nodes[1]
        .node
        .find_privacy_group(&sent.privacy_group_id)
        .await
        .unwrap()
        .expect("implied group pushed to recipient");
    assert_eq!(group.addresses.len(), 2);
}

#[tokio::test]
async fn test_reply_through_implied_group_reaches_both_nodes() {
    let nodes = common::network(2);
    let (k1, k2) = (nodes[0].keys[0], nodes[1].keys[0]);

    let first = nodes[0]
        .node
        .send(SendRequest {
            payload: b"offer".to_vec(),
            from: Some(k1),
            to: Recipients::Keys(vec![k2]),
        })
        .await
        .unwrap();
    let received = nodes[1].node.receive(&first.key, Some(k2)).await.unwrap();
    let id = received.privacy_group_id.unwrap();

    // The recipient answers by group id alone
    let reply = nodes[1]
        .node
        .send(SendRequest {
            payload: b"accept".to_vec(),
            from: Some(k2),
            to: Recipients::PrivacyGroup(id),
        })
        .await
        .unwrap();
    assert_eq!(reply.privacy_group_id, id);

    for (node, key) in [(&nodes[0], k1), (&nodes[1], k2)] {
        let got = node.node.receive(&reply.key, Some(key)).await.unwrap();
        assert_eq!(got.payload, b"accept");
        assert_eq!(got.privacy_group_id, Some(id));
    }
}

#[tokio::test]
async fn test_same_seed_derives_same_group_on_both_nodes() {
    let nodes = common::network(2);
    let (k1, k2) = (nodes[0].keys[0], nodes[1].keys[0]);
    let seed = b"shared seed".to_vec();

    let created = nodes[0]
        .node
        .create_privacy_group(CreatePrivacyGroup {
            from: Some(k1),
            addresses: vec![k1, k2],
            name: "pair".into(),
            description: "k1 and k2".into(),
            group_type: GroupType::Legacy,
            random_seed: Some(seed.clone()),
        })
        .await
        .unwrap();

    let derived = nodes[1].node.enclave().derive_privacy_group_id(
        &[k2, k1],
        Some(seed.as_slice()),
        GroupType::Legacy,
    );
    assert_eq!(created.id(), derived);
}

#[tokio::test]
async fn test_group_send_is_distinct_from_direct_send() {
    let nodes = common::network(2);
    let (k1, k2) = (nodes[0].keys[0], nodes[1].keys[0]);

    let direct = nodes[0]
        .node
        .send(SendRequest {
            payload: b"direct".to_vec(),
            from: Some(k1),
            to: Recipients::Keys(vec![k1, k2]),
        })
        .await
        .unwrap();

    let group = nodes[0]
        .node
        .create_privacy_group(CreatePrivacyGroup {
            from: Some(k1),
            addresses: vec![k2],
            name: "g1".into(),
            description: String::new(),
            group_type: GroupType::Legacy,
            random_seed: Some(b"S".to_vec()),
        })
        .await
        .unwrap();
    assert_ne!(group.id(), direct.privacy_group_id);

    let to_group = nodes[0]
        .node
        .send(SendRequest {
            payload: b"to group".to_vec(),
            from: Some(k1),
            to: Recipients::PrivacyGroup(group.id()),
        })
        .await
        .unwrap();
    assert_ne!(to_group.key, direct.key);
    assert_eq!(to_group.privacy_group_id, group.id());

    let first = nodes[1].node.receive(&direct.key, Some(k2)).await.unwrap();
    let second = nodes[1].node.receive(&to_group.key, Some(k2)).await.unwrap();
    assert_eq!(first.payload, b"direct");
    assert_eq!(second.payload, b"to group");
    assert_eq!(first.privacy_group_id, Some(direct.privacy_group_id));
    assert_eq!(second.privacy_group_id, Some(group.id()));
}

#[tokio::test]
async fn test_deletion_propagates_to_members() {
    let nodes = common::network(2);
    let (k1, k2) = (nodes[0].keys[0], nodes[1].keys[0]);

    let group = nodes[0]
        .node
        .create_privacy_group(CreatePrivacyGroup {
            from: Some(k1),
            addresses: vec![k2],
            name: String::new(),
            description: String::new(),
            group_type: GroupType::Onchain,
            random_seed: None,
        })
        .await
        .unwrap();
    assert!(nodes[1]
        .node
        .find_privacy_group(&group.id())
        .await
        .unwrap()
        .unwrap()
        .is_active());

    nodes[1]
        .node
        .delete_privacy_group(&group.id(), Some(k2))
        .await
        .unwrap();

    let on_creator = nodes[0]
        .node
        .find_privacy_group(&group.id())
        .await
        .unwrap()
        .unwrap();
    assert!(!on_creator.is_active());

    let result = nodes[0]
        .node
        .send(SendRequest {
            payload: b"late".to_vec(),
            from: Some(k1),
            to: Recipients::PrivacyGroup(group.id()),
        })
        .await;
    assert!(matches!(result, Err(NodeError::GroupDeleted(_))));
}

#[tokio::test]
async fn test_unknown_recipient_does_not_fail_send() {
    let nodes = common::network(1);
    let stranger = ::common::crypto::SecretKey::generate().unwrap().public();

    let sent = nodes[0]
        .node
        .send(SendRequest {
            payload: b"nobody home".to_vec(),
            from: None,
            to: Recipients::Keys(vec![stranger]),
        })
        .await
        .unwrap();
    assert!(nodes[0].node.payloads().get(&sent.key).await.unwrap().is_some());
}

#[tokio::test]
async fn test_never_stored_digest_is_not_found() {
    let nodes = common::network(1);
    let key = StorageKey::of(b"never stored");
    assert!(nodes[0].node.payloads().get(&key).await.unwrap().is_none());
    assert!(matches!(
        nodes[0].node.receive(&key, None).await,
        Err(NodeError::PayloadNotFound(_))
    ));
}
