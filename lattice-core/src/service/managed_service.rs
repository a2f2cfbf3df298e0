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
use std::fmt::Formatter;
use std::marker::PhantomData;
use std::time::Instant;

pub use running::Running;
pub use stopped::Stopped;

use crate::common::{LifecycleHook, MessageHook, MessageReceiver, Node, Outbox, ServiceHandle};
use crate::message::Status;
use crate::service::ServiceContext;
use crate::traits::ServiceModel;

mod running;
mod stopped;

/// A service instance together with its runtime machinery, in one of two
/// type-states: [`Stopped`] (being configured) or [`Running`] (its loop is
/// processing messages).
///
/// The model `M` is the service's externally visible state; everything else
/// here is transient runtime state owned by the service's two tasks.
pub struct ManagedService<State, M: ServiceModel> {
    /// External reference to this service.
    pub handle: ServiceHandle,
    /// The service's own state.
    pub model: M,

    pub(crate) node: Node,
    pub(crate) inbox: MessageReceiver,
    pub(crate) outbox: Outbox,
    pub(crate) outbox_rx: Option<MessageReceiver>,
    pub(crate) ctx: ServiceContext,

    /// Veto hook run before routing; `false` discards the message.
    pub(crate) pre_routing: MessageHook<M>,
    /// Veto hook run before dispatch; `false` discards the message.
    pub(crate) pre_process: MessageHook<M>,
    /// Hook run once, just before the loop begins.
    pub(crate) before_start: LifecycleHook<M>,
    /// Hook run once, after the loop has finished.
    pub(crate) after_stop: LifecycleHook<M>,

    pub(crate) last_status: Option<(Status, Instant)>,
    pub(crate) last_error: Option<Status>,

    pub(crate) _state: PhantomData<State>,
}

impl<State, M: ServiceModel> fmt::Debug for ManagedService<State, M> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagedService")
            .field("service", &self.handle.identity())
            .field("type_name", &M::type_name())
            .finish()
    }
}

impl<M: ServiceModel> From<ManagedService<Stopped, M>> for ManagedService<Running, M> {
    fn from(value: ManagedService<Stopped, M>) -> Self {
        ManagedService::<Running, M> {
            handle: value.handle,
            model: value.model,
            node: value.node,
            inbox: value.inbox,
            outbox: value.outbox,
            outbox_rx: value.outbox_rx,
            ctx: value.ctx,
            pre_routing: value.pre_routing,
            pre_process: value.pre_process,
            before_start: value.before_start,
            after_stop: value.after_stop,
            last_status: value.last_status,
            last_error: value.last_error,
            _state: PhantomData,
        }
    }
}
