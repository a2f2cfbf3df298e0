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
    models::{Arm, Gripper, Servo, Track},
};

mod setup;

/// The canonical scenario: `Arm` declares `{shoulder, elbow}` servo peers;
/// composing under the root key `Arm` plans and starts both, namespaced.
#[tokio::test]
async fn test_composite_plans_and_starts_declared_peers() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.register_type::<Servo>();

    node.spawn::<Arm>("Arm").await?;

    let shoulder = node
        .composition()
        .get("Arm.shoulder")
        .expect("shoulder reservation");
    assert_eq!(shoulder.actual_name.as_deref(), Some("Arm.shoulder"));
    assert_eq!(shoulder.type_name.as_deref(), Some("servo"));
    let elbow = node.composition().get("Arm.elbow").expect("elbow reservation");
    assert_eq!(elbow.actual_name.as_deref(), Some("Arm.elbow"));

    assert!(node.resolve("Arm.shoulder").is_some(), "shoulder not started");
    assert!(node.resolve("Arm.elbow").is_some(), "elbow not started");

    // The composite can drive its peers by key.
    node.send("Arm", "rest", vec![]).await?;
    sleep(Duration::from_millis(100)).await;
    let state = node
        .send_blocking("Arm.shoulder", "publish_state", vec![], None)
        .await?;
    assert_eq!(state["moves"], json!(1), "shoulder was not driven: {state:?}");

    node.shutdown_all().await
}

/// A peer with auto-start disabled is planned in the pool but never
/// instantiated.
#[tokio::test]
async fn test_manual_start_peer_is_planned_only() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.register_type::<Servo>();

    node.spawn::<Gripper>("grip").await?;

    let sensor = node.composition().get("grip.sensor").expect("sensor planned");
    assert!(!sensor.auto_start);
    assert!(node.resolve("grip.sensor").is_none(), "sensor must not start");

    node.shutdown_all().await
}

/// Re-binding a peer key to an already live instance leaves that instance
/// untouched and creates nothing new.
#[tokio::test]
async fn test_rebind_to_live_instance_is_idempotent() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.register_type::<Servo>();

    node.spawn::<Servo>("pan").await?;
    node.composition().rebind("head.x", "pan");

    node.spawn::<Track>("head").await?;

    assert_eq!(
        node.composition().actual_name("head.x").as_deref(),
        Some("pan")
    );
    assert!(node.resolve("head.x").is_none(), "no shadow instance");
    assert_eq!(node.service_count(), 2, "only head and pan exist");

    // Driving the composite reaches the shared servo.
    node.send("head", "target", vec![json!(70.0)]).await?;
    sleep(Duration::from_millis(100)).await;
    let angle = node.send_blocking("pan", "get_angle", vec![], None).await?;
    assert_eq!(angle, json!(70.0));

    node.shutdown_all().await
}

/// An operator's reservation survives composition: merge passes only fill
/// fields that are still null.
#[tokio::test]
async fn test_operator_reservation_survives_composition() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    node.register_type::<Servo>();
    node.register_type::<Arm>();

    node.composition()
        .reserve_as("Arm.shoulder", "pan", "servo", "shared pan servo");
    node.spawn::<Servo>("pan").await?;
    node.spawn::<Arm>("Arm").await?;

    let shoulder = node.composition().get("Arm.shoulder").expect("reserved");
    assert_eq!(shoulder.actual_name.as_deref(), Some("pan"));
    assert!(node.resolve("Arm.shoulder").is_none());

    node.shutdown_all().await
}

/// A missing peer type degrades to "no peers": the composite still starts.
#[tokio::test]
async fn test_unknown_peer_type_degrades_gracefully() -> anyhow::Result<()> {
    initialize_tracing();
    let node = Node::launch();
    // Servo is deliberately never registered.

    let arm = node.spawn::<Arm>("Arm").await?;
    assert!(arm.is_running());
    assert!(node.resolve("Arm.shoulder").is_none());

    node.shutdown_all().await
}
