use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::api::ApiClient;
use crate::error::{Error, Result};
use crate::models::Presentation;
use crate::state::{StateEvent, ViewState};
use crate::sync::{DEFAULT_POLL_INTERVAL, SyncPoller};

/// Loads and holds the presentation list.
pub struct PresentationsController {
    api: ApiClient,
    presentations: Vec<Presentation>,
}

impl PresentationsController {
    pub fn new(api: ApiClient) -> Self {
        PresentationsController {
            api,
            presentations: Vec::new(),
        }
    }

    pub async fn refresh(&mut self) -> Result<()> {
        self.presentations = self.api.presentations().await?;
        Ok(())
    }

    pub fn presentations(&self) -> &[Presentation] {
        &self.presentations
    }
}

/// Owns the repositories view state and every mutation applied to it.
///
/// Cloning shares the state and the cancellation token, so a clone can run
/// the synchronization while another observes it.
#[derive(Clone)]
pub struct RepositoriesController {
    api: ApiClient,
    state: Arc<Mutex<ViewState>>,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl RepositoriesController {
    pub fn new(api: ApiClient) -> Self {
        RepositoriesController {
            api,
            state: Arc::new(Mutex::new(ViewState::default())),
            poll_interval: DEFAULT_POLL_INTERVAL,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Token aborting any running synchronization chain.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn snapshot(&self) -> ViewState {
        self.state.lock().await.clone()
    }

    /// (Re)load the repository collection.
    pub async fn refresh(&self) -> Result<()> {
        let repositories = self.api.repositories().await?;
        self.state
            .lock()
            .await
            .apply(StateEvent::RepositoriesLoaded(repositories));
        Ok(())
    }

    /// Run a GitHub synchronization to completion against the shared state.
    ///
    /// Any poller error is recorded in the view state before it propagates,
    /// so the view always ends up with `sync_active == false` and a
    /// user-visible message.
    pub async fn sync_github(&self) -> Result<()> {
        let poller = SyncPoller::new(&self.api, self.poll_interval, self.cancel.clone());
        match poller.run(&self.state).await {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::warn!(error = %err, "synchronization aborted");
                self.state.lock().await.apply(StateEvent::SyncFailed {
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Flip a repository's activation state.
    ///
    /// A repository with a state change already in flight is rejected rather
    /// than racing a second request against the first. On success the server
    /// record is merged back into the local one; on failure `working` is
    /// cleared and the failure recorded.
    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn toggle_repository(&self, id: i64) -> Result<()> {
        let currently_active = {
            let mut view = self.state.lock().await;
            let repo = view
                .repository(id)
                .ok_or(Error::UnknownRepository { id })?;
            if repo.working {
                return Err(Error::ToggleInFlight { id });
            }
            let active = repo.is_active();
            view.apply(StateEvent::ToggleStarted { id });
            active
        };

        let result = if currently_active {
            self.api.deactivate_repository(id).await
        } else {
            self.api.activate_repository(id).await
        };

        let mut view = self.state.lock().await;
        match result {
            Ok(record) => {
                view.apply(StateEvent::ToggleResolved { id, record });
                Ok(())
            }
            Err(err) => {
                tracing::warn!(%id, error = %err, "repository toggle failed");
                view.apply(StateEvent::ToggleFailed {
                    id,
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mount_repositories(server: &MockServer, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path("/api/repositories/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    async fn controller(server: &MockServer) -> RepositoriesController {
        let api = ApiClient::new(server.uri()).unwrap();
        let controller =
            RepositoriesController::new(api).with_poll_interval(Duration::from_millis(10));
        controller.refresh().await.unwrap();
        controller
    }

    #[tokio::test]
    async fn toggling_active_repository_deactivates_it() {
        let server = MockServer::start().await;
        mount_repositories(
            &server,
            json!([{ "id": 7, "name": "slides", "state": "active" }]),
        )
        .await;
        Mock::given(method("DEACTIVATE"))
            .and(path("/api/repositories/7/state/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                { "id": 7, "name": "slides", "state": "inactive" }
            )))
            .expect(1)
            .mount(&server)
            .await;

        let controller = controller(&server).await;
        controller.toggle_repository(7).await.unwrap();

        let view = controller.snapshot().await;
        let repo = view.repository(7).unwrap();
        assert!(!repo.is_active());
        assert!(!repo.working);
    }

    #[tokio::test]
    async fn toggling_inactive_repository_activates_it() {
        let server = MockServer::start().await;
        mount_repositories(
            &server,
            json!([{ "id": 7, "name": "slides", "state": "inactive" }]),
        )
        .await;
        Mock::given(method("ACTIVATE"))
            .and(path("/api/repositories/7/state/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                { "id": 7, "name": "slides", "state": "active" }
            )))
            .expect(1)
            .mount(&server)
            .await;

        let controller = controller(&server).await;
        controller.toggle_repository(7).await.unwrap();

        let view = controller.snapshot().await;
        assert!(view.repository(7).unwrap().is_active());
    }

    #[tokio::test]
    async fn concurrent_toggle_is_rejected_while_working() {
        let server = MockServer::start().await;
        mount_repositories(
            &server,
            json!([{ "id": 7, "name": "slides", "state": "inactive" }]),
        )
        .await;
        Mock::given(method("ACTIVATE"))
            .and(path("/api/repositories/7/state/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "id": 7, "name": "slides", "state": "active" }))
                    .set_delay(Duration::from_millis(200)),
            )
            .expect(1)
            .mount(&server)
            .await;

        let controller = controller(&server).await;
        let background = controller.clone();
        let first = tokio::spawn(async move { background.toggle_repository(7).await });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(controller.snapshot().await.repository(7).unwrap().working);
        match controller.toggle_repository(7).await {
            Err(Error::ToggleInFlight { id: 7 }) => {}
            other => panic!("expected ToggleInFlight, got {other:?}"),
        }

        first.await.unwrap().unwrap();
        let view = controller.snapshot().await;
        let repo = view.repository(7).unwrap();
        assert!(repo.is_active());
        assert!(!repo.working);
    }

    #[tokio::test]
    async fn failed_toggle_clears_working_and_records_the_error() {
        let server = MockServer::start().await;
        mount_repositories(
            &server,
            json!([{ "id": 7, "name": "slides", "state": "inactive" }]),
        )
        .await;
        Mock::given(method("ACTIVATE"))
            .and(path("/api/repositories/7/state/"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let controller = controller(&server).await;
        match controller.toggle_repository(7).await {
            Err(Error::Transport(_)) => {}
            other => panic!("expected Transport error, got {other:?}"),
        }
        let view = controller.snapshot().await;
        assert!(!view.repository(7).unwrap().working);
        assert!(view.last_error.is_some());
    }

    #[tokio::test]
    async fn toggling_an_unknown_repository_fails() {
        let server = MockServer::start().await;
        mount_repositories(&server, json!([])).await;
        let controller = controller(&server).await;
        match controller.toggle_repository(99).await {
            Err(Error::UnknownRepository { id: 99 }) => {}
            other => panic!("expected UnknownRepository, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn sync_errors_surface_in_the_view_state() {
        let server = MockServer::start().await;
        mount_repositories(
            &server,
            json!([{ "id": 1, "name": "slides", "state": "active" }]),
        )
        .await;
        Mock::given(method("POST"))
            .and(path("/api/synchronizations/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                { "id": "0c5a", "state": "PENDING", "result": null }
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/synchronizations/0c5a/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                { "id": "0c5a", "state": "REVOKED", "result": null }
            )))
            .mount(&server)
            .await;

        let controller = controller(&server).await;
        assert!(controller.sync_github().await.is_err());

        let view = controller.snapshot().await;
        assert!(!view.sync_active);
        assert!(view.last_error.as_deref().unwrap().contains("REVOKED"));
        // the loaded collection is untouched by the failure
        assert_eq!(view.repositories.len(), 1);
    }

    #[tokio::test]
    async fn sync_github_runs_to_completion() {
        let server = MockServer::start().await;
        mount_repositories(&server, json!([])).await;
        Mock::given(method("POST"))
            .and(path("/api/synchronizations/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                { "id": "0c5a", "state": "PENDING", "result": null }
            )))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api/synchronizations/0c5a/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!(
                { "id": "0c5a", "state": "SUCCESS", "result": null }
            )))
            .mount(&server)
            .await;

        let controller = controller(&server).await;
        controller.sync_github().await.unwrap();
        let view = controller.snapshot().await;
        assert!(!view.sync_active);
        assert_eq!(view.last_error, None);
    }
}
