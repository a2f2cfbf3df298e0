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

use serde::{Deserialize, Serialize};

/// Severity of a [`Status`] broadcast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusLevel {
    Info,
    Warn,
    Error,
}

/// A service-level condition report, published on the status topic.
///
/// Dispatch and hook failures are converted to a `Status` at the runtime
/// loop boundary rather than escaping it; subscribers observe them on the
/// `publish_status` topic (and `publish_error` for errors).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Status {
    /// Severity of the report.
    pub level: StatusLevel,
    /// Name of the owning service; filled in by the broadcaster if absent.
    pub name: Option<String>,
    /// Human-readable detail.
    pub detail: String,
}

impl Status {
    pub fn info(detail: impl Into<String>) -> Self {
        Status { level: StatusLevel::Info, name: None, detail: detail.into() }
    }

    pub fn warn(detail: impl Into<String>) -> Self {
        Status { level: StatusLevel::Warn, name: None, detail: detail.into() }
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Status { level: StatusLevel::Error, name: None, detail: detail.into() }
    }

    /// True for `Error`-level reports.
    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }

    /// Two statuses are duplicates when severity and detail match; used by
    /// the per-service broadcast rate limit.
    pub(crate) fn same_report(&self, other: &Status) -> bool {
        self.level == other.level && self.detail == other.detail
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{:?} {} {}", self.level, name, self.detail),
            None => write!(f, "{:?} {}", self.level, self.detail),
        }
    }
}
