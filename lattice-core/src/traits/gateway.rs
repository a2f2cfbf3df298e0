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

use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::message::{Message, RuntimeError};

/// Carries messages to services hosted by a different process.
///
/// The core defines no wire format; it is owned entirely by the gateway
/// implementation. Gateways are registered on the node per remote process
/// id and are consulted whenever a destination's process differs from the
/// local one.
#[async_trait]
pub trait Gateway: Debug + Send + Sync {
    /// Forwards a fire-and-forget message to the remote process.
    async fn send_remote(&self, msg: Message) -> Result<(), RuntimeError>;

    /// Performs a blocking call against the remote process, returning the
    /// remote dispatch result or a timeout failure.
    async fn send_blocking_remote(
        &self,
        msg: Message,
        timeout: Duration,
    ) -> Result<Value, RuntimeError>;
}
