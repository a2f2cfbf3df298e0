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

#![forbid(unsafe_code)]
//! Lattice Core Library
//!
//! This library provides the core functionality for the Lattice service
//! runtime: per-service message queuing and delivery (inbox/outbox), the
//! service processing loop, name-based method dispatch, publish/subscribe,
//! periodic task scheduling, and the peer composition engine used to plan
//! and start composite services.

/// Common utilities and structures used throughout the Lattice framework.
pub(crate) mod common;

pub(crate) mod compose;
pub(crate) mod dispatch;
pub(crate) mod message;
pub(crate) mod service;
/// Trait definitions used in the Lattice framework.
pub(crate) mod traits;

/// Prelude module for convenient imports.
///
/// This module re-exports commonly used items from the `common`, `message`,
/// `service`, and `compose` modules, as well as the `async_trait` and
/// `serde_json` crates.
pub mod prelude {
    pub use async_trait;
    pub use serde_json::{self, json, Value};

    pub use crate::common::{LatticeConfig, Node, Outbox, ServiceHandle, TypeRegistry};
    pub use crate::compose::{CompositionContext, PeerReservation, PeerTemplate};
    pub use crate::dispatch::{DispatchCache, MethodTable, VARIADIC};
    pub use crate::message::{
        callback_topic_name, Identity, ListenerBinding, Message, MessageStatus, RuntimeError,
        Status, StatusLevel,
    };
    pub use crate::service::{ManagedService, Running, ServiceContext, Stopped, TaskScheduler};
    pub use crate::traits::{Gateway, ServiceModel};
}
