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

use std::fmt;

use derive_new::new;
use serde::{Deserialize, Serialize};

/// The addressable identity of a service: a name unique within its process,
/// and the id of the process hosting it.
///
/// The full address is `name@process_id`. A service whose `process_id`
/// matches the hosting node's id is local and has a live inbox/outbox; any
/// other identity is a remote peer reached through a gateway.
#[derive(new, Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Service name, unique within its process.
    pub name: String,
    /// Id of the hosting process.
    pub process_id: String,
}

impl Identity {
    /// Returns the full `name@process_id` address.
    pub fn full_name(&self) -> String {
        format!("{}@{}", self.name, self.process_id)
    }

    /// True when this identity lives in the given process.
    #[inline]
    pub fn is_local_to(&self, process_id: &str) -> bool {
        self.process_id == process_id
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.process_id)
    }
}

/// Splits a destination address into its name and optional process id.
///
/// `"pan"` yields `("pan", None)`; `"pan@p01"` yields `("pan", Some("p01"))`.
pub fn split_address(address: &str) -> (&str, Option<&str>) {
    match address.split_once('@') {
        Some((name, process_id)) => (name, Some(process_id)),
        None => (address, None),
    }
}
