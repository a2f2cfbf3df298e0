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

use std::collections::BTreeMap;

use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use crate::common::TypeRegistry;
use crate::compose::reservation::{PeerReservation, PeerTemplate};

/// The process-wide naming plan for composite service trees.
///
/// The pool is an ordered, monotonically grown mapping from hierarchical key
/// to [`PeerReservation`]. It is owned by the node and passed explicitly to
/// every construction path, so isolated contexts can be planned and tested
/// independently. Merges are performed under one lock per level, which makes
/// each key's merge atomic while keeping the critical sections short enough
/// for unrelated composites to plan concurrently.
#[derive(Debug, Default)]
pub struct CompositionContext {
    pool: Mutex<BTreeMap<String, PeerReservation>>,
}

impl CompositionContext {
    /// Reserves a name for a root-level service, keyed by its own name.
    pub fn reserve(&self, key: &str, type_name: &str, comment: &str) {
        self.reserve_as(key, key, type_name, comment);
    }

    /// Reserves `key` with an explicit instance name. This is a deliberate
    /// operator action and replaces any previous reservation for the key.
    pub fn reserve_as(&self, key: &str, actual_name: &str, type_name: &str, comment: &str) {
        info!(key, actual_name, type_name, "reserving");
        self.pool.lock().insert(
            key.to_string(),
            PeerReservation {
                key: key.to_string(),
                actual_name: Some(actual_name.to_string()),
                type_name: Some(type_name.to_string()),
                comment: Some(comment.to_string()),
                is_root: false,
                auto_start: true,
            },
        );
    }

    /// Re-binds a key to another instance name, e.g. pointing a tracking
    /// system's `x` servo at an already existing `pan` service. Creates a
    /// bare reservation when the key was never planned.
    pub fn rebind(&self, key: &str, new_name: &str) -> bool {
        let mut pool = self.pool.lock();
        match pool.get_mut(key) {
            Some(reservation) => {
                debug!(key, new_name, "re-binding reservation");
                reservation.actual_name = Some(new_name.to_string());
            }
            None => {
                debug!(key, new_name, "re-binding unplanned key");
                pool.insert(
                    key.to_string(),
                    PeerReservation {
                        key: key.to_string(),
                        actual_name: Some(new_name.to_string()),
                        type_name: None,
                        comment: None,
                        is_root: false,
                        auto_start: true,
                    },
                );
            }
        }
        true
    }

    /// The instance name a key resolves to, when planned.
    pub fn actual_name(&self, key: &str) -> Option<String> {
        self.pool
            .lock()
            .get(key)
            .map(|r| r.resolved_name().to_string())
    }

    /// A copy of the reservation for `key`.
    pub fn get(&self, key: &str) -> Option<PeerReservation> {
        self.pool.lock().get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.pool.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pool.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool.lock().is_empty()
    }

    /// A point-in-time copy of the whole pool, in key order.
    pub fn snapshot(&self) -> BTreeMap<String, PeerReservation> {
        self.pool.lock().clone()
    }

    /// Expands the declared peer tree of `root_type` under `root_key` and
    /// merges it into the pool, breadth first.
    ///
    /// The traversal is level by level on purpose: a parent's naming
    /// decisions must be fully merged before its children's keys are
    /// computed. Each peer's children are keyed under the peer's *resolved*
    /// name, so a customized name (a re-bind, or a template rename) moves
    /// the entire declared subtree with it in the same pass. Types without
    /// registered metadata are treated as leaves.
    #[instrument(skip(self, types))]
    pub fn merge_tree(&self, root_key: &str, root_type: &str, types: &TypeRegistry) {
        // A declaration cycle would otherwise grow keys forever.
        const MAX_DEPTH: usize = 32;

        let mut level: Vec<(String, String)> = vec![(root_key.to_string(), root_type.to_string())];
        let mut depth = 0;

        while !level.is_empty() {
            depth += 1;
            if depth > MAX_DEPTH {
                warn!(root_key, "peer tree exceeds {MAX_DEPTH} levels, abandoning merge");
                break;
            }
            let mut next = Vec::new();

            for (base_key, type_name) in level {
                let templates = match types.peers_of(&type_name) {
                    Some(peers) => peers,
                    None => {
                        // Unknown metadata degrades to "this type has no
                        // peers" rather than aborting the plan.
                        debug!(%type_name, "no peer metadata, treating as leaf");
                        continue;
                    }
                };

                let mut pool = self.pool.lock();
                for template in &templates {
                    let full_key = format!("{base_key}.{}", template.key);
                    let default_actual = default_actual_name(&base_key, &full_key, template);

                    match pool.get_mut(&full_key) {
                        Some(existing) => {
                            trace!(key = %full_key, "merging into existing reservation");
                            existing.fill_missing(default_actual, template);
                        }
                        None => {
                            trace!(key = %full_key, actual = %default_actual, "planning new reservation");
                            pool.insert(
                                full_key.clone(),
                                PeerReservation::planned(full_key.clone(), default_actual, template),
                            );
                        }
                    }

                    // Children derive from the resolved name, not the
                    // structural key: renames relocate the whole subtree.
                    let reservation = &pool[&full_key];
                    let child_base = reservation.resolved_name().to_string();
                    let child_type = reservation
                        .type_name
                        .clone()
                        .unwrap_or_else(|| template.type_name.clone());
                    next.push((child_base, child_type));
                }
            }

            level = next;
        }
    }
}

/// Default instance name for a freshly planned peer: custom names are kept
/// (prefixed unless the peer is a root), root peers keep their own key,
/// everything else is namespaced under the parent.
fn default_actual_name(base_key: &str, full_key: &str, template: &PeerTemplate) -> String {
    match (&template.actual_name, template.is_root) {
        (Some(custom), true) => custom.clone(),
        (Some(custom), false) => format!("{base_key}.{custom}"),
        (None, true) => template.key.clone(),
        (None, false) => full_key.to_string(),
    }
}
