/*
 * Copyright (c) 2024. Govcraft
 *
 * Licensed under either of
 *   * Apache License, Version 2.0 (the "License");
 *     you may not use this file except in compliance with the License.
 *     You may obtain a copy of the License at http://www.apache.org/licenses/LICENSE-2.0
 *   * MIT license: http://opensource.org/licenses/MIT
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the applicable License for the specific language governing permissions and
 * limitations under that License.
 */

#![allow(dead_code)]

use std::time::Duration;

use lattice::prelude::*;
use tokio::time::sleep;

use crate::setup::{
    initialize_tracing,
    models::{Recorder, Servo},
};

mod setup;

/// A single producer's messages are observed in enqueue order.
#[tokio::test]
async fn test_inbox_is_fifo_per_producer() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    let recorder = node.spawn::<Recorder>("rec").await?;

    for i in 0..200 {
        recorder.send("observe", vec![json!(i)])?;
    }

    // The blocking query enqueues behind the 200 sends, so the reply
    // reflects all of them, in order.
    let seen = node.send_blocking("rec", "seen", vec![], None).await?;
    let expected: Vec<Value> = (0..200).map(|i| json!(i)).collect();
    assert_eq!(seen, json!(expected));

    node.shutdown_all().await
}

/// A blocking request produces exactly one reply carrying the dispatch
/// result.
#[tokio::test]
async fn test_blocking_call_returns_dispatch_result() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.spawn::<Servo>("pan").await?;

    let angle = node
        .send_blocking("pan", "move_to", vec![json!(90.0)], None)
        .await?;
    assert_eq!(angle, json!(90.0));

    let read_back = node.send_blocking("pan", "get_angle", vec![], None).await?;
    assert_eq!(read_back, json!(90.0));

    node.shutdown_all().await
}

/// A message that lands on the wrong service's inbox is relayed to the
/// right unit without the sender knowing the topology.
#[tokio::test]
async fn test_misrouted_message_is_relayed() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    let pan = node.spawn::<Servo>("pan").await?;
    node.spawn::<Recorder>("rec").await?;

    let sender = Identity::new("external".to_string(), node.process_id().to_string());
    pan.accept(Message::oneway(sender, "rec", "observe", vec![json!("routed")]))?;

    sleep(Duration::from_millis(100)).await;
    let seen = node.send_blocking("rec", "seen", vec![], None).await?;
    assert_eq!(seen, json!([json!("routed")]));

    node.shutdown_all().await
}

/// Dispatch failures never terminate the loop; they surface as a status
/// broadcast that subscribers observe.
#[tokio::test]
async fn test_dispatch_error_publishes_status() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.spawn::<Servo>("pan").await?;
    node.spawn::<Recorder>("rec").await?;

    node.send(
        "pan",
        "add_listener",
        vec![json!("publish_status"), json!("rec"), json!("observe")],
    )
    .await?;
    sleep(Duration::from_millis(50)).await;

    node.send("pan", "no_such_method", vec![]).await?;
    sleep(Duration::from_millis(100)).await;

    let seen = node.send_blocking("rec", "seen", vec![], None).await?;
    let statuses = seen.as_array().cloned().unwrap_or_default();
    assert!(
        statuses.iter().any(|s| s["level"] == "ERROR"),
        "expected an error status, saw {statuses:?}"
    );

    // The loop survived the failure.
    let angle = node
        .send_blocking("pan", "move_to", vec![json!(10.0)], None)
        .await?;
    assert_eq!(angle, json!(10.0));

    node.shutdown_all().await
}

/// Identical statuses within the rate-limit window collapse into one
/// broadcast.
#[tokio::test]
async fn test_duplicate_statuses_are_rate_limited() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.spawn::<Servo>("pan").await?;
    node.spawn::<Recorder>("rec").await?;

    node.send(
        "pan",
        "add_listener",
        vec![json!("publish_status"), json!("rec"), json!("observe")],
    )
    .await?;
    sleep(Duration::from_millis(50)).await;

    for _ in 0..5 {
        node.send("pan", "no_such_method", vec![]).await?;
    }
    sleep(Duration::from_millis(150)).await;

    let seen = node.send_blocking("rec", "seen", vec![], None).await?;
    let statuses = seen.as_array().cloned().unwrap_or_default();
    assert_eq!(statuses.len(), 1, "expected one status, saw {statuses:?}");

    node.shutdown_all().await
}
