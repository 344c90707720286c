use crate::models::Repository;

/// Everything the view renders, owned by the repositories controller and
/// mutated only through [`ViewState::apply`].
#[derive(Clone, Debug, Default)]
pub struct ViewState {
    pub repositories: Vec<Repository>,
    pub sync_active: bool,
    pub sync_progress: f64,
    pub last_error: Option<String>,
}

/// Transitions applied to the view state from completion handlers.
#[derive(Clone, Debug)]
pub enum StateEvent {
    RepositoriesLoaded(Vec<Repository>),
    SyncStarted { id: String },
    SyncPending,
    SyncProgressed { current: u64, total: u64 },
    SyncCompleted { repositories: Vec<Repository> },
    SyncFailed { message: String },
    ToggleStarted { id: i64 },
    ToggleResolved { id: i64, record: Repository },
    ToggleFailed { id: i64, message: String },
}

impl ViewState {
    pub fn repository(&self, id: i64) -> Option<&Repository> {
        self.repositories.iter().find(|repo| repo.id == id)
    }

    fn repository_mut(&mut self, id: i64) -> Option<&mut Repository> {
        self.repositories.iter_mut().find(|repo| repo.id == id)
    }

    pub fn apply(&mut self, event: StateEvent) {
        match event {
            StateEvent::RepositoriesLoaded(repositories) => {
                self.repositories = repositories;
            }
            StateEvent::SyncStarted { id } => {
                tracing::debug!(job = %id, "synchronization started");
                self.sync_active = true;
                self.sync_progress = 0.0;
                self.last_error = None;
            }
            StateEvent::SyncPending => {
                self.sync_active = true;
            }
            StateEvent::SyncProgressed { current, total } => {
                // Scaled the way the gauge expects, not a percentage.
                self.sync_progress = total as f64 / 100.0 * current as f64;
            }
            StateEvent::SyncCompleted { repositories } => {
                self.repositories = repositories;
                self.sync_active = false;
            }
            StateEvent::SyncFailed { message } => {
                self.sync_active = false;
                self.last_error = Some(message);
            }
            StateEvent::ToggleStarted { id } => {
                if let Some(repo) = self.repository_mut(id) {
                    repo.working = true;
                }
            }
            StateEvent::ToggleResolved { id, record } => {
                if let Some(repo) = self.repository_mut(id) {
                    repo.merge_from(record);
                    repo.working = false;
                }
            }
            StateEvent::ToggleFailed { id, message } => {
                if let Some(repo) = self.repository_mut(id) {
                    repo.working = false;
                }
                self.last_error = Some(message);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn repo(id: i64, state: &str) -> Repository {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "name": format!("repo-{id}"),
            "state": state,
        }))
        .unwrap()
    }

    #[test]
    fn progress_uses_gauge_scaling() {
        let mut state = ViewState::default();
        state.apply(StateEvent::SyncProgressed {
            current: 50,
            total: 80,
        });
        assert_eq!(state.sync_progress, 40.0);
    }

    #[test]
    fn sync_lifecycle() {
        let mut state = ViewState {
            last_error: Some("stale".into()),
            ..ViewState::default()
        };
        state.apply(StateEvent::SyncStarted { id: "abc".into() });
        assert!(state.sync_active);
        assert_eq!(state.sync_progress, 0.0);
        assert_eq!(state.last_error, None);

        state.apply(StateEvent::SyncPending);
        assert!(state.sync_active);

        state.apply(StateEvent::SyncCompleted {
            repositories: vec![repo(1, "active")],
        });
        assert!(!state.sync_active);
        assert_eq!(state.repositories.len(), 1);
    }

    #[test]
    fn sync_failure_keeps_repositories() {
        let mut state = ViewState::default();
        state.apply(StateEvent::RepositoriesLoaded(vec![repo(1, "active")]));
        state.apply(StateEvent::SyncStarted { id: "abc".into() });
        state.apply(StateEvent::SyncFailed {
            message: "boom".into(),
        });
        assert!(!state.sync_active);
        assert_eq!(state.last_error.as_deref(), Some("boom"));
        assert_eq!(state.repositories.len(), 1);
    }

    #[test]
    fn toggle_transitions() {
        let mut state = ViewState::default();
        state.apply(StateEvent::RepositoriesLoaded(vec![repo(1, "inactive")]));

        state.apply(StateEvent::ToggleStarted { id: 1 });
        assert!(state.repository(1).unwrap().working);

        state.apply(StateEvent::ToggleResolved {
            id: 1,
            record: repo(1, "active"),
        });
        let toggled = state.repository(1).unwrap();
        assert!(toggled.is_active());
        assert!(!toggled.working);
    }

    #[test]
    fn toggle_failure_clears_working() {
        let mut state = ViewState::default();
        state.apply(StateEvent::RepositoriesLoaded(vec![repo(1, "active")]));
        state.apply(StateEvent::ToggleStarted { id: 1 });
        state.apply(StateEvent::ToggleFailed {
            id: 1,
            message: "offline".into(),
        });
        let repo = state.repository(1).unwrap();
        assert!(!repo.working);
        assert!(repo.is_active());
        assert_eq!(state.last_error.as_deref(), Some("offline"));
    }
}
