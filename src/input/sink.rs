use thiserror::Error;

use crate::{
    config::RelayConfig,
    input::message::{Endpoint, Payload},
    runtime::Spawner,
};

/// Destination of relayed input. Sending never blocks and never reports
/// back: failures are the sink's to log.
pub trait EventSink {
    fn send(&mut self, endpoint: Endpoint, payload: Payload);
}

#[derive(Debug, Error)]
pub enum InputError {
    #[error("no backend origin configured")]
    NoOrigin,
    #[error("invalid backend url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Posts every payload as JSON to `<base><endpoint>` on a detached task.
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: reqwest::Client,
    base: reqwest::Url,
    spawner: Spawner,
}

impl HttpSink {
    pub fn new(base_url: &str, spawner: Spawner) -> Result<Self, InputError> {
        let base = reqwest::Url::parse(base_url).map_err(|e| InputError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;
        if base.cannot_be_a_base() {
            return Err(InputError::InvalidUrl {
                url: base_url.to_string(),
                reason: "not a base url".to_string(),
            });
        }
        Ok(Self {
            client: reqwest::Client::new(),
            base,
            spawner,
        })
    }

    /// Uses the configured base URL, or in the browser the host and port
    /// of the page itself.
    pub fn from_config(config: &RelayConfig, spawner: Spawner) -> Result<Self, InputError> {
        match &config.base_url {
            Some(url) => Self::new(url, spawner),
            None => Self::new(&page_origin()?, spawner),
        }
    }

    pub fn url(&self, endpoint: Endpoint) -> Result<reqwest::Url, InputError> {
        self.base
            .join(endpoint.path())
            .map_err(|e| InputError::InvalidUrl {
                url: format!("{}{}", self.base, endpoint.path()),
                reason: e.to_string(),
            })
    }
}

#[cfg(target_arch = "wasm32")]
fn page_origin() -> Result<String, InputError> {
    let host = web_sys::window()
        .and_then(|w| w.location().host().ok())
        .ok_or(InputError::NoOrigin)?;
    Ok(format!("http://{host}"))
}

#[cfg(not(target_arch = "wasm32"))]
fn page_origin() -> Result<String, InputError> {
    Err(InputError::NoOrigin)
}

impl EventSink for HttpSink {
    fn send(&mut self, endpoint: Endpoint, payload: Payload) {
        let url = match self.url(endpoint) {
            Ok(url) => url,
            Err(e) => {
                log::error!("Dropping {} message: {e}", endpoint.path());
                return;
            }
        };
        let request = self.client.post(url).json(&payload);
        self.spawner.spawn(async move {
            let result = request.send().await.and_then(|r| r.error_for_status());
            if let Err(e) = result {
                log::error!("Failed to send {} update: {e}", endpoint.path());
            }
        });
    }
}
