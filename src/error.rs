use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced by the client layer.
///
/// Transport and decode failures wrap the underlying crates; the rest are
/// domain conditions the view is expected to present to the user.
#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("malformed response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("synchronization job {id} reported unknown state {state:?}")]
    UnknownJobState { id: String, state: String },

    #[error("synchronization job {id} failed on the server")]
    SyncFailed { id: String },

    #[error("synchronization job {id} reported progress without counters")]
    MalformedProgress { id: String },

    #[error("a state change for repository {id} is already in flight")]
    ToggleInFlight { id: i64 },

    #[error("repository {id} is not loaded")]
    UnknownRepository { id: i64 },

    #[error("synchronization cancelled")]
    Cancelled,

    #[error("unsupported transition verb {verb:?}")]
    UnsupportedVerb { verb: String },
}
