use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use reqwest::StatusCode;

use crate::error::DiscoveryError;
use crate::probe::Transport;

#[derive(Clone)]
enum Script {
    Respond(StatusCode, Bytes),
    Delayed(Duration, StatusCode, Bytes),
    Hang,
}

/// In-memory transport answering from a URL script. Unscripted URLs answer 404.
#[derive(Default)]
pub(crate) struct ScriptedTransport {
    scripts: Mutex<HashMap<String, Script>>,
    requests: Mutex<Vec<String>>,
}

impl ScriptedTransport {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn respond(&self, url: &str, status: StatusCode, body: &str) {
        self.scripts.lock().insert(
            url.to_owned(),
            Script::Respond(status, Bytes::copy_from_slice(body.as_bytes())),
        );
    }

    pub(crate) fn respond_after(&self, url: &str, delay: Duration, status: StatusCode, body: &str) {
        self.scripts.lock().insert(
            url.to_owned(),
            Script::Delayed(delay, status, Bytes::copy_from_slice(body.as_bytes())),
        );
    }

    pub(crate) fn hang(&self, url: &str) {
        self.scripts.lock().insert(url.to_owned(), Script::Hang);
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn get(&self, url: &str, _timeout: Duration) -> Result<(StatusCode, Bytes), DiscoveryError> {
        self.requests.lock().push(url.to_owned());
        let script = self.scripts.lock().get(url).cloned();
        match script {
            Some(Script::Respond(status, body)) => Ok((status, body)),
            Some(Script::Delayed(delay, status, body)) => {
                tokio::time::sleep(delay).await;
                Ok((status, body))
            }
            Some(Script::Hang) => std::future::pending().await,
            None => Ok((StatusCode::NOT_FOUND, Bytes::new())),
        }
    }
}
