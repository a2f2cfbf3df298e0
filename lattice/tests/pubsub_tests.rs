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

async fn seen(node: &Node, name: &str) -> Vec<Value> {
    node.send_blocking(name, "seen", vec![], None)
        .await
        .ok()
        .and_then(|v| v.as_array().cloned())
        .unwrap_or_default()
}

/// A published return value fans out to every subscriber of the topic.
#[tokio::test]
async fn test_return_values_fan_out_to_subscribers() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.spawn::<Servo>("pan").await?;
    node.spawn::<Recorder>("a").await?;
    node.spawn::<Recorder>("b").await?;

    for subscriber in ["a", "b"] {
        node.send(
            "pan",
            "add_listener",
            vec![json!("move_to"), json!(subscriber), json!("observe")],
        )
        .await?;
    }
    sleep(Duration::from_millis(50)).await;

    node.send("pan", "move_to", vec![json!(30.0)]).await?;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(seen(&node, "a").await, vec![json!(30.0)]);
    assert_eq!(seen(&node, "b").await, vec![json!(30.0)]);

    node.shutdown_all().await
}

/// Subscribing the same triple twice yields exactly one binding and one
/// delivery.
#[tokio::test]
async fn test_duplicate_subscription_is_deduplicated() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.spawn::<Servo>("pan").await?;
    node.spawn::<Recorder>("rec").await?;

    for _ in 0..2 {
        node.send(
            "pan",
            "add_listener",
            vec![json!("move_to"), json!("rec"), json!("observe")],
        )
        .await?;
    }
    sleep(Duration::from_millis(50)).await;

    node.send("pan", "move_to", vec![json!(45.0)]).await?;
    sleep(Duration::from_millis(100)).await;

    assert_eq!(seen(&node, "rec").await.len(), 1);

    node.shutdown_all().await
}

/// Unsubscribing removes the binding; unsubscribing a binding that never
/// existed is a no-op, not an error.
#[tokio::test]
async fn test_unsubscribe_stops_delivery() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.spawn::<Servo>("pan").await?;
    node.spawn::<Recorder>("rec").await?;

    node.send(
        "pan",
        "add_listener",
        vec![json!("move_to"), json!("rec"), json!("observe")],
    )
    .await?;
    sleep(Duration::from_millis(50)).await;

    node.send("pan", "move_to", vec![json!(10.0)]).await?;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(seen(&node, "rec").await.len(), 1);

    node.send(
        "pan",
        "remove_listener",
        vec![json!("move_to"), json!("rec"), json!("observe")],
    )
    .await?;
    // Removing a binding that does not exist must not disturb anything.
    node.send(
        "pan",
        "remove_listener",
        vec![json!("move_to"), json!("ghost"), json!("observe")],
    )
    .await?;
    sleep(Duration::from_millis(50)).await;

    node.send("pan", "move_to", vec![json!(20.0)]).await?;
    sleep(Duration::from_millis(100)).await;
    assert_eq!(seen(&node, "rec").await.len(), 1, "delivery after unsubscribe");

    node.shutdown_all().await
}

/// A `*` topic method expands into one concrete binding per declared
/// method of the topic's type.
#[tokio::test]
async fn test_wildcard_method_subscription() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.spawn::<Servo>("pan").await?;

    let mut recorder = node.new_service::<Recorder>("rec");
    recorder.before_start(|_model, ctx| {
        ctx.subscribe("pan", "*");
    });
    recorder.start().await?;
    sleep(Duration::from_millis(100)).await;

    node.send("pan", "move_to", vec![json!(15.0)]).await?;
    node.send("pan", "get_angle", vec![]).await?;
    sleep(Duration::from_millis(100)).await;

    let observed = seen(&node, "rec").await;
    assert!(
        observed.iter().any(|v| v["move_to"] == json!(15.0)),
        "missing move_to observation: {observed:?}"
    );
    assert!(
        observed.iter().any(|v| v["get_angle"] == json!(15.0)),
        "missing get_angle observation: {observed:?}"
    );

    node.shutdown_all().await
}
