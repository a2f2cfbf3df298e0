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

/// A peer declared statically by a composite service type.
///
/// Templates are instance-agnostic: the same declaration is expanded under
/// every instance of the declaring type, with keys and default names
/// prefixed by the instance's own key during composition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerTemplate {
    /// Key of the peer within the declaring composite.
    pub key: String,
    /// Custom instance name; `None` means the peer keeps its key as name.
    pub actual_name: Option<String>,
    /// Service type of the peer.
    pub type_name: String,
    /// Human-readable purpose of the peer within the composite.
    pub comment: String,
    /// Root peers keep their name unprefixed when expanded.
    pub is_root: bool,
    /// Whether the peer is instantiated when the composite starts.
    pub auto_start: bool,
}

impl PeerTemplate {
    pub fn new(
        key: impl Into<String>,
        type_name: impl Into<String>,
        comment: impl Into<String>,
    ) -> Self {
        PeerTemplate {
            key: key.into(),
            actual_name: None,
            type_name: type_name.into(),
            comment: comment.into(),
            is_root: false,
            auto_start: true,
        }
    }

    /// Rebinds the peer to a specific instance name, e.g. pointing a
    /// tracking system's `x` servo at an existing `pan` service.
    pub fn renamed(mut self, actual_name: impl Into<String>) -> Self {
        self.actual_name = Some(actual_name.into());
        self
    }

    /// Marks the peer as a tree root: its name is never prefixed with the
    /// parent's key.
    pub fn root(mut self) -> Self {
        self.is_root = true;
        self
    }

    /// Plans the peer without starting it automatically.
    pub fn manual_start(mut self) -> Self {
        self.auto_start = false;
        self
    }
}

/// A planned entry in the process-wide reservation pool.
///
/// Reservations are merge-only: once a field is non-null, later composition
/// passes never overwrite it, they only fill fields still null. Entries are
/// long-lived planning state, kept until process teardown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerReservation {
    /// Hierarchical lookup key (`parent.peerKey.subPeerKey...`).
    pub key: String,
    /// Resolved instance name that will actually be created.
    pub actual_name: Option<String>,
    /// Service type to instantiate.
    pub type_name: Option<String>,
    /// Purpose of the peer within its composite.
    pub comment: Option<String>,
    /// Root reservations keep their name unprefixed.
    pub is_root: bool,
    /// Whether the peer is instantiated when its composite starts.
    pub auto_start: bool,
}

impl PeerReservation {
    pub(crate) fn planned(key: String, actual_name: String, template: &PeerTemplate) -> Self {
        PeerReservation {
            key,
            actual_name: Some(actual_name),
            type_name: Some(template.type_name.clone()),
            comment: Some(template.comment.clone()),
            is_root: template.is_root,
            auto_start: template.auto_start,
        }
    }

    /// The name the peer resolves to: the customized name when present,
    /// otherwise the structural key.
    pub fn resolved_name(&self) -> &str {
        self.actual_name.as_deref().unwrap_or(&self.key)
    }

    /// Fills still-null fields from a template pass. Non-null fields are
    /// left untouched (the merge-only invariant).
    pub(crate) fn fill_missing(&mut self, actual_name: String, template: &PeerTemplate) {
        if self.actual_name.is_none() {
            self.actual_name = Some(actual_name);
        }
        if self.type_name.is_none() {
            self.type_name = Some(template.type_name.clone());
        }
        if self.comment.is_none() {
            self.comment = Some(template.comment.clone());
        }
    }
}
