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

use derive_new::new;
use serde::{Deserialize, Serialize};

/// A publish/subscribe route held in a topic service's outbox registry.
///
/// When the topic service publishes on `topic_method`, the payload is
/// re-addressed to `callback_name.callback_method`. Bindings are unique by
/// triple equality; duplicates are rejected on registration, and the
/// registration order of the surviving bindings is the fan-out order.
#[derive(new, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListenerBinding {
    /// Method name the publisher is publishing under.
    pub topic_method: String,
    /// Name of the subscribing service.
    pub callback_name: String,
    /// Method invoked on the subscriber with the published payload.
    pub callback_method: String,
}

/// Derives the conventional callback method name for a topic method:
/// topic `angle` is delivered to `on_angle`.
pub fn callback_topic_name(topic_method: &str) -> String {
    format!("on_{topic_method}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_callback_topic_name() {
        assert_eq!(callback_topic_name("angle"), "on_angle");
    }

    #[test]
    fn test_binding_equality() {
        let a = ListenerBinding::new("angle".into(), "probe".into(), "on_angle".into());
        let b = ListenerBinding::new("angle".into(), "probe".into(), "on_angle".into());
        let c = ListenerBinding::new("angle".into(), "other".into(), "on_angle".into());
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
