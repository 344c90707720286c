use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A presentation hosted by the server. Read-only for this layer.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Presentation {
    pub id: i64,
    pub fullname: String,
    pub url: String,
}

/// A GitHub repository known to the server.
///
/// `extra` captures whatever additional fields the serializer ships so they
/// survive a save round trip. `working` is client-only bookkeeping for an
/// in-flight activate/deactivate request and is never serialized.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Repository {
    pub id: i64,
    pub name: String,
    pub state: String,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
    #[serde(skip)]
    pub working: bool,
}

impl Repository {
    pub const ACTIVE: &'static str = "active";

    pub fn is_active(&self) -> bool {
        self.state == Self::ACTIVE
    }

    /// Merge the fields of a server response into this record, keeping
    /// client-only bookkeeping untouched.
    pub fn merge_from(&mut self, server: Repository) {
        self.id = server.id;
        self.name = server.name;
        self.state = server.state;
        self.extra.extend(server.extra);
    }
}

/// Recognized phases of a synchronization job.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SyncState {
    Pending,
    Progress,
    Success,
    Failure,
}

/// Progress counters attached to a job in the PROGRESS phase.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq, Eq)]
pub struct SyncProgress {
    pub current: u64,
    pub total: u64,
}

/// A server-side synchronization job as returned by the API.
///
/// `state` is kept as the raw wire value; `result` is only structured while
/// the job is in the PROGRESS phase, so it stays untyped here.
#[derive(Clone, Debug, Deserialize)]
pub struct Synchronization {
    pub id: String,
    pub state: String,
    #[serde(default)]
    pub result: Option<serde_json::Value>,
}

impl Synchronization {
    /// Map the wire state onto the recognized phases. Anything outside the
    /// known set is a hard error rather than a silent fall-through.
    pub fn phase(&self) -> Result<SyncState, Error> {
        match self.state.as_str() {
            "PENDING" => Ok(SyncState::Pending),
            "PROGRESS" => Ok(SyncState::Progress),
            "SUCCESS" => Ok(SyncState::Success),
            "FAILURE" => Ok(SyncState::Failure),
            other => Err(Error::UnknownJobState {
                id: self.id.clone(),
                state: other.to_string(),
            }),
        }
    }

    pub fn progress(&self) -> Option<SyncProgress> {
        self.result
            .as_ref()
            .and_then(|value| serde_json::from_value(value.clone()).ok())
    }
}
