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

use serde::{Deserialize, Serialize};
use serde_json::Value;
use static_assertions::assert_impl_all;

use crate::message::identity::{split_address, Identity};

/// Delivery contract of a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MessageStatus {
    /// Fire-and-forget; no reply is ever produced.
    Oneway,
    /// The sender is waiting; exactly one `Return` with the same `msg_id`
    /// must be produced and addressed back to the sender.
    Blocking,
    /// The reply to a `Blocking` message, carrying the dispatch result.
    Return,
}

/// The unit of communication between services.
///
/// A message names its destination service and the method to invoke there;
/// arguments travel as JSON values so a message can cross process boundaries
/// through whatever gateway is plugged in. Messages are created by services,
/// the node, or the task scheduler, consumed exactly once by the inbox they
/// target, and discarded after dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Identity of the sending service.
    pub sender: Identity,
    /// Destination service name; may carry a process suffix (`name@process`).
    pub name: String,
    /// Method to invoke on the destination.
    pub method: String,
    /// Invocation arguments.
    #[serde(default)]
    pub data: Vec<Value>,
    /// Correlation id pairing a `Blocking` request with its `Return`.
    pub msg_id: u64,
    /// Delivery contract.
    pub status: MessageStatus,
}

impl Message {
    /// Creates a fire-and-forget message.
    pub fn oneway(
        sender: Identity,
        name: impl Into<String>,
        method: impl Into<String>,
        data: Vec<Value>,
    ) -> Self {
        Message {
            sender,
            name: name.into(),
            method: method.into(),
            data,
            msg_id: 0,
            status: MessageStatus::Oneway,
        }
    }

    /// Creates a blocking request carrying the caller's correlation id.
    pub fn blocking(
        sender: Identity,
        name: impl Into<String>,
        method: impl Into<String>,
        data: Vec<Value>,
        msg_id: u64,
    ) -> Self {
        Message {
            sender,
            name: name.into(),
            method: method.into(),
            data,
            msg_id,
            status: MessageStatus::Blocking,
        }
    }

    /// Synthesizes the `Return` for a blocking request, addressed to the
    /// original sender's full address and carrying the original `msg_id`.
    pub fn reply(
        sender: Identity,
        to: &Identity,
        method: impl Into<String>,
        value: Value,
        msg_id: u64,
    ) -> Self {
        Message {
            sender,
            name: to.full_name(),
            method: method.into(),
            data: vec![value],
            msg_id,
            status: MessageStatus::Return,
        }
    }

    /// Destination service name without any process suffix.
    pub fn dest_name(&self) -> &str {
        split_address(&self.name).0
    }

    /// Destination process id, when the address carries one.
    pub fn dest_process(&self) -> Option<&str> {
        split_address(&self.name).1
    }
}

// Ensures that Message can travel between the runtime's tasks.
assert_impl_all!(Message: Send);
