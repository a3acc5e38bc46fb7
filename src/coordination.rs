//! Client for a simulation coordination service
//!
//! A coordination service hands out simulation parameters to worker nodes and collects their
//! results over HTTP with JSON bodies. Every request returns a [`Result`], with transport failures
//! and non-success statuses both reported as [`Error::Transport`]; the client never retries.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::Error;

/// Time allowed for each request to complete
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body of a request to set up a set of experiments
#[derive(Clone, PartialEq, Debug, Deserialize, Serialize)]
pub struct PrepareRequest {
    /// Code types to be simulated, or `None` for all types known to the service
    pub code_types: Option<Vec<String>>,
    /// Code lengths to be simulated, or `None` for all lengths known to the service
    pub code_lengths: Option<Vec<usize>>,
    /// Ratios (dB) of symbol energy to noise power spectral density to be simulated
    pub snr_range: Vec<f64>,
    /// Number of messages to be simulated per experiment
    pub required_messages: u64,
    /// Number of worker nodes
    pub nodes: u32,
    /// Number of repetitions of each experiment
    #[serde(default = "default_repetitions")]
    pub repetitions: u32,
}

impl PrepareRequest {
    /// Returns request for given SNR values, number of messages and number of worker nodes, with
    /// all code types and lengths and a single repetition.
    #[must_use]
    pub fn new(snr_range: Vec<f64>, required_messages: u64, nodes: u32) -> Self {
        Self {
            code_types: None,
            code_lengths: None,
            snr_range,
            required_messages,
            nodes,
            repetitions: default_repetitions(),
        }
    }
}

/// Returns default number of repetitions of each experiment.
fn default_repetitions() -> u32 {
    1
}

/// Identification of the experiment to which a result belongs
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
pub struct RouteParams {
    /// Code identifier assigned by the service
    pub code_id: u64,
    /// Code type
    pub code_type: String,
    /// Channel type
    pub channel_type: String,
}

/// Blocking client for a coordination service
#[derive(Clone, Debug)]
pub struct Client {
    /// Service URL, without trailing slash
    base_url: String,
    /// HTTP client
    http: reqwest::blocking::Client,
}

impl Client {
    /// Returns client for the service at given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be set up.
    pub fn new(base_url: &str) -> Result<Self, Error> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    /// Returns service URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sets up experiments on the service (`POST /prepare`).
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached or rejects the request.
    pub fn prepare(&self, request: &PrepareRequest) -> Result<(), Error> {
        self.http
            .post(self.url("prepare"))
            .json(request)
            .send()?
            .error_for_status()?;
        debug!(url = %self.base_url, "prepared experiments");
        Ok(())
    }

    /// Returns simulation parameters for given experiments (`PUT /get-params`).
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached, rejects the request, or responds with
    /// a body that is not JSON.
    pub fn get_params<T: Serialize>(&self, experiments: &[T]) -> Result<Value, Error> {
        let params = self
            .http
            .put(self.url("get-params"))
            .json(&GetParamsRequest { experiments })
            .send()?
            .error_for_status()?
            .json()?;
        Ok(params)
    }

    /// Saves a simulation result (`POST /save-result`), with the route parameters attached under
    /// the `route_params` key.
    ///
    /// # Errors
    ///
    /// Returns an error if the service cannot be reached or rejects the request.
    pub fn save_result(
        &self,
        result: &Map<String, Value>,
        route_params: &RouteParams,
    ) -> Result<(), Error> {
        let mut body = result.clone();
        body.insert(
            "route_params".to_string(),
            serde_json::to_value(route_params)?,
        );
        self.http
            .post(self.url("save-result"))
            .json(&body)
            .send()?
            .error_for_status()?;
        debug!(url = %self.base_url, code_id = route_params.code_id, "saved result");
        Ok(())
    }

    /// Returns URL of given endpoint.
    fn url(&self, endpoint: &str) -> String {
        format!("{}/{endpoint}", self.base_url)
    }
}

/// Body of a request for simulation parameters
#[derive(Serialize)]
struct GetParamsRequest<'a, T> {
    /// Experiments for which parameters are requested
    experiments: &'a [T],
}
