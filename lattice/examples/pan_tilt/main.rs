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

//! A pan/tilt camera head built from two servo peers.
//!
//! Demonstrates the composition engine (the head declares its joints as
//! peers and the node plans and starts them), name-based messaging, and
//! publish/subscribe (a monitor service watching every joint movement).

use std::time::Duration;

use lattice::prelude::*;
use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::info;

#[derive(Debug, Default, Serialize, Deserialize)]
struct Servo {
    angle: f64,
}

impl ServiceModel for Servo {
    fn type_name() -> &'static str {
        "servo"
    }

    fn register_methods(table: &mut MethodTable<Self>) {
        table
            .on("move_to", 1, |model, _ctx, args| {
                model.angle = args[0].as_f64().unwrap_or(model.angle);
                Ok(json!(model.angle))
            })
            .on("get_angle", 0, |model, _ctx, _args| Ok(json!(model.angle)));
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct PanTilt {
    pan: f64,
    tilt: f64,
}

impl ServiceModel for PanTilt {
    fn type_name() -> &'static str {
        "pan_tilt"
    }

    fn register_methods(table: &mut MethodTable<Self>) {
        table.on("point", 2, |model, ctx, args| {
            model.pan = args[0].as_f64().unwrap_or_default();
            model.tilt = args[1].as_f64().unwrap_or_default();
            ctx.send_to_peer("pan", "move_to", vec![args[0].clone()]);
            ctx.send_to_peer("tilt", "move_to", vec![args[1].clone()]);
            Ok(json!([model.pan, model.tilt]))
        });
    }

    fn peers() -> Vec<PeerTemplate> {
        vec![
            PeerTemplate::new("pan", "servo", "horizontal axis"),
            PeerTemplate::new("tilt", "servo", "vertical axis"),
        ]
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Monitor {
    observed: u64,
}

impl ServiceModel for Monitor {
    fn type_name() -> &'static str {
        "monitor"
    }

    fn register_methods(table: &mut MethodTable<Self>) {
        table.on("on_move_to", 1, |model, _ctx, args| {
            model.observed += 1;
            info!(angle = %args[0], observed = model.observed, "joint moved");
            Ok(Value::Null)
        });
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let node = Node::launch();
    node.register_type::<Servo>();

    // The composite plans its peer tree before anything starts.
    let head = node.spawn::<PanTilt>("head").await?;
    info!(services = node.service_count(), "head and joints are up");

    // The monitor subscribes to each joint's movement topic.
    let mut monitor = node.new_service::<Monitor>("monitor");
    monitor.before_start(|_model, ctx| {
        ctx.subscribe_as("head.pan", "move_to", "monitor", "on_move_to");
        ctx.subscribe_as("head.tilt", "move_to", "monitor", "on_move_to");
    });
    monitor.start().await?;
    sleep(Duration::from_millis(50)).await;

    head.send("point", vec![json!(45.0), json!(-10.0)])?;
    sleep(Duration::from_millis(100)).await;

    let pan = node.send_blocking("head.pan", "get_angle", vec![], None).await?;
    let tilt = node.send_blocking("head.tilt", "get_angle", vec![], None).await?;
    info!(%pan, %tilt, "head is pointing");

    node.shutdown_all().await
}
