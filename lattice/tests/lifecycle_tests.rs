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

use lattice::prelude::*;

use crate::setup::{initialize_tracing, models::Servo};

mod setup;

/// Starting an already registered name returns the existing handle.
#[tokio::test]
async fn test_start_is_idempotent() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();

    let first = node.spawn::<Servo>("pan").await?;
    let second = node.spawn::<Servo>("pan").await?;

    assert_eq!(first, second);
    assert_eq!(node.service_count(), 1);

    node.shutdown_all().await
}

/// Stopping a service clears its running flag and removes it from the
/// directory.
#[tokio::test]
async fn test_stop_unregisters() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();

    let pan = node.spawn::<Servo>("pan").await?;
    assert!(pan.is_running());

    pan.stop().await?;
    assert!(!pan.is_running());
    assert!(node.resolve("pan").is_none());

    node.shutdown_all().await
}

/// The model document round-trips through `save`/`load` without touching
/// any transient runtime state.
#[tokio::test]
async fn test_state_roundtrip() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("servo-pan.json");
    let path_arg = json!(path.to_string_lossy());

    node.spawn::<Servo>("pan").await?;
    node.send_blocking("pan", "move_to", vec![json!(42.0)], None)
        .await?;
    let saved = node
        .send_blocking("pan", "save", vec![path_arg.clone()], None)
        .await?;
    assert_eq!(saved, json!(true));
    assert!(path.exists());

    // A second instance restores the document and serves it.
    node.spawn::<Servo>("spare").await?;
    let loaded = node
        .send_blocking("spare", "load", vec![path_arg], None)
        .await?;
    assert_eq!(loaded, json!(true));
    let angle = node.send_blocking("spare", "get_angle", vec![], None).await?;
    assert_eq!(angle, json!(42.0));

    node.shutdown_all().await
}

/// `publish_state` serves the whole model document.
#[tokio::test]
async fn test_publish_state_exposes_model() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();

    node.spawn::<Servo>("pan").await?;
    node.send_blocking("pan", "move_to", vec![json!(12.5)], None)
        .await?;

    let state = node
        .send_blocking("pan", "publish_state", vec![], None)
        .await?;
    assert_eq!(state["angle"], json!(12.5));
    assert_eq!(state["moves"], json!(1));

    node.shutdown_all().await
}
