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

use std::time::Duration;

/// Errors surfaced by the Lattice runtime.
#[derive(Debug)]
pub enum RuntimeError {
    /// No method matched the requested name and argument count on the
    /// destination's type.
    Dispatch {
        type_name: String,
        method: String,
        arity: usize,
    },
    /// The destination service name could not be resolved.
    Routing { destination: String },
    /// A blocking call exceeded its deadline.
    RemoteTimeout {
        destination: String,
        timeout: Duration,
    },
    /// Peer metadata was missing or malformed while planning a composite.
    Composition { type_name: String, detail: String },
    /// A scheduled task with the same name already exists.
    TaskConflict { task: String },
    /// A queue or channel refused the message.
    Send(String),
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RuntimeError::Dispatch { type_name, method, arity } => {
                write!(f, "no method {type_name}.{method}/{arity}")
            }
            RuntimeError::Routing { destination } => {
                write!(f, "unknown destination: {destination}")
            }
            RuntimeError::RemoteTimeout { destination, timeout } => {
                write!(f, "blocking call to {destination} timed out after {timeout:?}")
            }
            RuntimeError::Composition { type_name, detail } => {
                write!(f, "composition failed for {type_name}: {detail}")
            }
            RuntimeError::TaskConflict { task } => {
                write!(f, "task \"{task}\" already exists")
            }
            RuntimeError::Send(msg) => write!(f, "failed to send message: {msg}"),
        }
    }
}

impl std::error::Error for RuntimeError {}

/// Converts a `SendError` from Tokio's MPSC channel to a `RuntimeError`.
impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RuntimeError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        RuntimeError::Send("channel closed".into())
    }
}
