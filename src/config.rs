use std::time::Duration;

#[derive(Debug)]
pub struct Config {
    pub base_url: String,
    pub csrf_token: String,
    pub session_id: String,
    pub poll_interval_ms: u64,
}

const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;

impl Config {
    pub fn load() -> Self {
        let base_url = std::env::var("QRAZ_BASE_URL").unwrap_or_default();
        let csrf_token = std::env::var("QRAZ_CSRF_TOKEN").unwrap_or_default();
        let session_id = std::env::var("QRAZ_SESSION_ID").unwrap_or_default();
        let poll_interval_ms = std::env::var("QRAZ_POLL_INTERVAL_MS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_POLL_INTERVAL_MS);
        Config {
            base_url,
            csrf_token,
            session_id,
            poll_interval_ms,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.is_empty() {
            return Err("QRAZ_BASE_URL is missing".into());
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
