pub mod api;
pub mod config;
pub mod controller;
pub mod error;
pub mod models;
pub mod state;
pub mod sync;

pub use api::ApiClient;
pub use config::Config;
pub use controller::{PresentationsController, RepositoriesController};
pub use error::{Error, Result};
pub use models::{Presentation, Repository, SyncProgress, SyncState, Synchronization};
pub use state::{StateEvent, ViewState};
pub use sync::SyncPoller;
