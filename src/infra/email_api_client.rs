use reqwest::blocking::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::EmailApiConfig;
use crate::error::Result;
use crate::pipeline::processing::email::{DeliverabilityCheck, DeliverabilityError, DeliverabilityVerdict};

/// Deliverability lookup against an HTTP verifier answering
/// `GET <url>?email=<address>` with a JSON verdict.
///
/// Blocking on purpose: the pipeline pass runs on a blocking worker.
pub struct HttpDeliverabilityClient {
    client: Client,
    url: String,
}

impl HttpDeliverabilityClient {
    pub fn new(url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("dq_pipeline/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    pub fn from_config(config: &EmailApiConfig) -> Result<Self> {
        Self::new(&config.url, config.timeout())
    }
}

fn classify(e: reqwest::Error) -> DeliverabilityError {
    if e.is_timeout() {
        DeliverabilityError::Timeout
    } else {
        DeliverabilityError::Request(e.to_string())
    }
}

impl DeliverabilityCheck for HttpDeliverabilityClient {
    fn check(&self, email: &str) -> std::result::Result<DeliverabilityVerdict, DeliverabilityError> {
        debug!(url = %self.url, "Checking email deliverability");
        let response = self
            .client
            .get(&self.url)
            .query(&[("email", email)])
            .send()
            .map_err(classify)?
            .error_for_status()
            .map_err(classify)?;
        response.json::<DeliverabilityVerdict>().map_err(classify)
    }
}
