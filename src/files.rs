//! Background File-Creation Task
//!
//! The custom-client service periodically generates a file through the file
//! storage API. This runs as a single long-lived tokio task independent of
//! the accept loop and shares no state with per-connection handling; its
//! only effect on the world is the outbound HTTP call.

use serde_json::json;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default file storage endpoint when `FILE_STORAGE_URL` is unset.
pub const DEFAULT_FILE_STORAGE_URL: &str =
    "http://file-storage-service.edge-terrarium.svc.cluster.local:9000";

/// Timeout for the storage API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Configuration for the file-creation task.
#[derive(Debug, Clone)]
pub struct FileCreatorConfig {
    /// Interval between file creations (default: 15s)
    pub interval: Duration,
    /// Base URL of the file storage API
    pub storage_url: String,
}

impl FileCreatorConfig {
    /// Reads the storage endpoint from `FILE_STORAGE_URL`.
    pub fn from_env() -> Self {
        Self {
            interval: Duration::from_secs(15),
            storage_url: std::env::var("FILE_STORAGE_URL")
                .unwrap_or_else(|_| DEFAULT_FILE_STORAGE_URL.to_string()),
        }
    }
}

/// A handle to the running file-creation task.
///
/// Dropping the handle stops the task.
#[derive(Debug)]
pub struct FileCreator {
    shutdown_tx: watch::Sender<bool>,
}

impl FileCreator {
    /// Starts the file-creation loop as a background task.
    pub fn start(config: FileCreatorConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        tokio::spawn(creation_loop(config, shutdown_rx));

        info!("Background file-creation task started");

        Self { shutdown_tx }
    }

    /// Stops the task. Called automatically when the handle is dropped.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(true);
        info!("Background file-creation task stopped");
    }
}

impl Drop for FileCreator {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn creation_loop(config: FileCreatorConfig, mut shutdown_rx: watch::Receiver<bool>) {
    let client = reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .unwrap_or_default();

    loop {
        tokio::select! {
            _ = tokio::time::sleep(config.interval) => {}
            result = shutdown_rx.changed() => {
                if result.is_err() || *shutdown_rx.borrow() {
                    debug!("File-creation task received shutdown signal");
                    return;
                }
            }
        }

        match create_file(&client, &config.storage_url).await {
            Ok(()) => debug!("File created via storage API"),
            Err(e) => warn!(error = %e, "File creation via storage API failed"),
        }
    }
}

/// Issues one PUT to the storage API with a generated payload.
async fn create_file(client: &reqwest::Client, storage_url: &str) -> Result<(), reqwest::Error> {
    let timestamp = crate::http::response::unix_timestamp();
    let payload = json!({
        "filename_prefix": format!("custom-client-{timestamp}"),
        "content": format!(
            "Custom Client generated file at {timestamp}\n\n\
             This is a test file created by the Custom Client application."
        ),
        "extension": ".txt",
    });

    let response = client
        .put(format!("{storage_url}/files"))
        .json(&payload)
        .send()
        .await?;
    response.error_for_status()?;
    Ok(())
}
