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

//! Service models shared across the integration tests.

use std::time::Duration;

use lattice::prelude::*;
use serde::{Deserialize, Serialize};

/// A single joint. The smallest useful leaf service.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Servo {
    pub angle: f64,
    pub moves: u64,
}

impl ServiceModel for Servo {
    fn type_name() -> &'static str {
        "servo"
    }

    fn register_methods(table: &mut MethodTable<Self>) {
        table
            .on("move_to", 1, |model, _ctx, args| {
                model.angle = args[0].as_f64().unwrap_or(model.angle);
                model.moves += 1;
                Ok(json!(model.angle))
            })
            .on("get_angle", 0, |model, _ctx, _args| Ok(json!(model.angle)));
    }
}

/// Records everything it is told; the observer in pub/sub tests.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Recorder {
    pub seen: Vec<Value>,
}

impl ServiceModel for Recorder {
    fn type_name() -> &'static str {
        "recorder"
    }

    fn register_methods(table: &mut MethodTable<Self>) {
        table
            .on("observe", 1, |model, _ctx, args| {
                model.seen.push(args[0].clone());
                Ok(Value::Null)
            })
            .on("on_move_to", 1, |model, _ctx, args| {
                model.seen.push(json!({ "move_to": args[0] }));
                Ok(Value::Null)
            })
            .on("on_get_angle", 1, |model, _ctx, args| {
                model.seen.push(json!({ "get_angle": args[0] }));
                Ok(Value::Null)
            })
            .on("seen", 0, |model, _ctx, _args| Ok(json!(model.seen)))
            .on("clear", 0, |model, _ctx, _args| {
                model.seen.clear();
                Ok(Value::Null)
            });
    }
}

/// A composite of two servo joints.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Arm {
    pub resting: bool,
}

impl ServiceModel for Arm {
    fn type_name() -> &'static str {
        "arm"
    }

    fn register_methods(table: &mut MethodTable<Self>) {
        table.on("rest", 0, |model, ctx, _args| {
            model.resting = true;
            ctx.send_to_peer("shoulder", "move_to", vec![json!(0.0)]);
            ctx.send_to_peer("elbow", "move_to", vec![json!(0.0)]);
            Ok(json!(model.resting))
        });
    }

    fn peers() -> Vec<PeerTemplate> {
        vec![
            PeerTemplate::new("shoulder", "servo", "lift joint"),
            PeerTemplate::new("elbow", "servo", "bend joint"),
        ]
    }
}

/// A composite whose peer is planned but never started automatically.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Gripper {
    pub closed: bool,
}

impl ServiceModel for Gripper {
    fn type_name() -> &'static str {
        "gripper"
    }

    fn register_methods(table: &mut MethodTable<Self>) {
        table.on("grip", 0, |model, _ctx, _args| {
            model.closed = true;
            Ok(json!(model.closed))
        });
    }

    fn peers() -> Vec<PeerTemplate> {
        vec![PeerTemplate::new("sensor", "servo", "grip feedback").manual_start()]
    }
}

/// A tracking head driving a single horizontal servo peer, often re-bound
/// to an existing pan servo.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Track {
    pub target: f64,
}

impl ServiceModel for Track {
    fn type_name() -> &'static str {
        "track"
    }

    fn register_methods(table: &mut MethodTable<Self>) {
        table.on("target", 1, |model, ctx, args| {
            model.target = args[0].as_f64().unwrap_or_default();
            ctx.send_to_peer("x", "move_to", vec![args[0].clone()]);
            Ok(json!(model.target))
        });
    }

    fn peers() -> Vec<PeerTemplate> {
        vec![PeerTemplate::new("x", "servo", "horizontal drive")]
    }
}

/// Takes half a second to answer; the callee in timeout tests.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Slowpoke;

impl ServiceModel for Slowpoke {
    fn type_name() -> &'static str {
        "slowpoke"
    }

    fn register_methods(table: &mut MethodTable<Self>) {
        table.on_async("wait", 0, |_model, _ctx, _args| {
            Box::pin(async {
                tokio::time::sleep(Duration::from_millis(500)).await;
                Ok(json!("done"))
            })
        });
    }
}
