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

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use serde_json::Value;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::common::MessageSender;
use crate::message::{Identity, Message, RuntimeError};

/// Per-service named periodic and one-shot message injectors.
///
/// Each firing constructs a fire-and-forget message targeting the owning
/// service's own method and enqueues it on that service's own inbox, so
/// scheduled work re-enters the same actor loop as ordinary messages — no
/// separate execution context.
#[derive(Debug, Clone)]
pub struct TaskScheduler {
    owner: Identity,
    inbox: MessageSender,
    tasks: Arc<DashMap<String, CancellationToken>>,
}

impl TaskScheduler {
    pub(crate) fn new(owner: Identity, inbox: MessageSender) -> Self {
        TaskScheduler {
            owner,
            inbox,
            tasks: Arc::new(DashMap::new()),
        }
    }

    /// Registers a uniquely named timer firing every `interval` after an
    /// initial `delay`. An `interval` of zero fires once. A duplicate name
    /// is a logged no-op surfaced as [`RuntimeError::TaskConflict`].
    pub fn add_task(
        &self,
        name: &str,
        interval: Duration,
        delay: Duration,
        method: &str,
        data: Vec<Value>,
    ) -> Result<(), RuntimeError> {
        if self.tasks.contains_key(name) {
            info!(owner = %self.owner, task = name, "already have an active task");
            return Err(RuntimeError::TaskConflict { task: name.into() });
        }

        let cancel = CancellationToken::new();
        self.tasks.insert(name.to_string(), cancel.clone());

        let msg = Message::oneway(self.owner.clone(), self.owner.name.clone(), method, data);
        let inbox = self.inbox.clone();
        let tasks = self.tasks.clone();
        let task_name = name.to_string();
        trace!(owner = %self.owner, task = name, ?interval, ?delay, "scheduling task");

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tasks.remove(&task_name);
                    return;
                }
                _ = sleep(delay) => {}
            }
            loop {
                if inbox.send(msg.clone()).is_err() {
                    // Owner's inbox is gone; nothing left to fire at.
                    break;
                }
                if interval.is_zero() {
                    break;
                }
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = sleep(interval) => {}
                }
            }
            tasks.remove(&task_name);
        });

        Ok(())
    }

    /// Registers a timer that fires exactly once after `delay`.
    pub fn add_one_shot(
        &self,
        name: &str,
        delay: Duration,
        method: &str,
        data: Vec<Value>,
    ) -> Result<(), RuntimeError> {
        self.add_task(name, Duration::ZERO, delay, method, data)
    }

    /// Cancels and removes a task. Best effort: a task that already fired
    /// its last occurrence is reported, not an error.
    pub fn purge_task(&self, name: &str) {
        match self.tasks.remove(name) {
            Some((_, cancel)) => {
                info!(owner = %self.owner, task = name, "purging task");
                cancel.cancel();
            }
            None => {
                debug!(owner = %self.owner, task = name, "purge_task: task does not exist");
            }
        }
    }

    /// Cancels and removes every task.
    pub fn purge_tasks(&self) {
        for entry in self.tasks.iter() {
            entry.value().cancel();
        }
        self.tasks.clear();
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
