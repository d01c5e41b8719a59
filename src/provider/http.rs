//! HTTP client construction and status mapping.

use std::time::Duration;

use crate::error::SqlPilotError;

/// Build a reqwest client bounded by `timeout`.
pub fn build_client(timeout: Duration) -> Result<reqwest::Client, SqlPilotError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .pool_max_idle_per_host(4)
        .build()
        .map_err(|e| SqlPilotError::Configuration(format!("failed to build HTTP client: {e}")))
}

/// Map a transport-level reqwest failure.
pub fn request_error(url: &str, error: reqwest::Error) -> SqlPilotError {
    if error.is_timeout() {
        SqlPilotError::ModelUnavailable(format!("request to {url} timed out"))
    } else if error.is_connect() {
        SqlPilotError::ModelUnavailable(format!(
            "cannot connect to {url}; is the model server running? ({error})"
        ))
    } else {
        SqlPilotError::ModelUnavailable(format!("request to {url} failed: {error}"))
    }
}

/// Map a non-success HTTP status from the model server.
pub fn status_to_error(status: u16, body: &str, model: &str) -> SqlPilotError {
    let detail = extract_error_message(body).unwrap_or_else(|| body.trim().to_string());
    match status {
        404 if detail.contains("not found") => SqlPilotError::ModelUnavailable(format!(
            "model '{model}' not found; pull it with `ollama pull {model}`"
        )),
        _ => SqlPilotError::ModelUnavailable(format!("HTTP {status}: {detail}")),
    }
}

fn extract_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()?
        .get("error")?
        .as_str()
        .map(str::to_string)
}
