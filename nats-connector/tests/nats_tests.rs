//! NATS Connector Tests (live broker)

use nats_connector::{Connector, NatsConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

fn live_connector() -> Connector {
    let connector = Connector::new(NatsConfig::enabled());
    connector.set_request_timeout(Some(Duration::from_secs(2)));
    connector
}

#[tokio::test]
#[ignore] // Requires NATS server running
async fn test_nats_connector_connection() {
    let connector = live_connector();

    let first = connector.ensure_connection().await.unwrap();
    let second = connector.ensure_connection().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(first.client_type(), "nats");
    assert!(connector.is_connected());
}

#[tokio::test]
#[ignore] // Requires NATS server running
async fn test_nats_connector_request_reply() {
    let connector = Arc::new(live_connector());

    let responder = Arc::clone(&connector);
    let handle = connector
        .subscribe("nats-connector.it.ping", move |msg| {
            let responder = Arc::clone(&responder);
            tokio::spawn(async move {
                if let Some(reply) = msg.reply {
                    responder.publish(&reply, "pong").await.unwrap();
                }
            });
        })
        .await
        .unwrap();
    connector.flush().await.unwrap();

    let body = connector.request("nats-connector.it.ping", "hi").await.unwrap();
    assert_eq!(body, "pong");

    handle.unsubscribe().await;
}

#[tokio::test]
#[ignore] // Requires NATS server running
async fn test_nats_connector_publish_and_subscribe() {
    let connector = live_connector();
    let (tx, rx) = oneshot::channel();
    let mut tx = Some(tx);

    let handle = connector
        .subscribe("nats-connector.it.*", move |msg| {
            if let Some(tx) = tx.take() {
                let _ = tx.send(msg.body().into_owned());
            }
        })
        .await
        .unwrap();
    connector.flush().await.unwrap();

    connector
        .publish("nats-connector.it.event", serde_json::json!({"n": "5"}))
        .await
        .unwrap();

    let body = tokio::time::timeout(Duration::from_secs(2), rx)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(body, r#"{"n":5}"#);

    handle.unsubscribe().await;
}
