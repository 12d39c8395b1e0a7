use std::time::Duration;

use tracing::debug;
use ureq::Agent;

use crate::errors::{LucasError, Result};

/// Blocking HTTP GET used for every call to the feature service and the photo server.
pub trait Transport {
    /// Fetches `url` with `params` appended as query string and returns the body.
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<Vec<u8>>;
}

/// [`Transport`] over a [`ureq::Agent`].
#[derive(Clone)]
pub struct HttpTransport {
    agent: Agent,
}

impl HttpTransport {
    /// Agent with `timeout` applied to each whole request.
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let agent: Agent = config.into();
        HttpTransport { agent }
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, params: &[(&str, &str)]) -> Result<Vec<u8>> {
        let mut request = self.agent.get(url);
        for (key, value) in params {
            request = request.query(*key, *value);
        }
        debug!(%url, ?params, "GET");
        let mut response = request
            .call()
            .map_err(|e| LucasError::download(url, e))?;
        // downloads near the server cap are far above ureq's default body limit
        response
            .body_mut()
            .with_config()
            .limit(u64::MAX)
            .read_to_vec()
            .map_err(|e| LucasError::download(url, e))
    }
}
