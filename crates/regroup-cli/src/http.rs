//! Blocking [`ApiClient`] backed by a `ureq` agent with bounded timeouts.

use std::io::{self, Read};
use std::time::Duration;

use regroup_core::{ApiClient, ApiError, ApiRequest, ApiResponse};
use serde_json::Value;
use tracing::{debug, trace};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_RESPONSE_BYTES: usize = 8 * 1024 * 1024;
const MAX_ERROR_BYTES: usize = 64 * 1024;

/// Talks to `<base_url><request.path>`, authenticating with a bearer token
/// when one is configured.
pub struct UreqClient {
    agent: ureq::Agent,
    base_url: String,
    auth_token: Option<String>,
}

impl UreqClient {
    pub fn new(base_url: &str, auth_token: Option<String>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT.min(timeout))
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        Self {
            agent,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth_token,
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}/{path}", self.base_url)
        }
    }
}

/// Read a response into memory, enforcing a maximum byte size.
fn read_body(response: ureq::Response, max_bytes: usize) -> io::Result<String> {
    let mut limited = response.into_reader().take(max_bytes as u64 + 1);
    let mut bytes = Vec::new();
    limited.read_to_end(&mut bytes)?;
    if bytes.len() > max_bytes {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Response exceeded {max_bytes} bytes"),
        ));
    }
    String::from_utf8(bytes).map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))
}

fn decode_body(text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(text).map_err(|err| ApiError::Decode(err.to_string()))
}

impl ApiClient for UreqClient {
    fn request(&self, request: &ApiRequest) -> Result<ApiResponse, ApiError> {
        let url = self.url(&request.path);
        debug!(method = %request.method, %url, "api request");

        let mut call = self
            .agent
            .request(request.method.as_str(), &url)
            .set("Accept", "application/json");
        for (key, value) in &request.query {
            call = call.query(key, value);
        }
        if let Some(token) = &self.auth_token {
            call = call.set("Authorization", &format!("Bearer {token}"));
        }

        let result = match &request.body {
            Some(body) => call.send_json(body),
            None => call.call(),
        };

        match result {
            Ok(response) => {
                let status = response.status();
                let link = response.header("Link").map(str::to_string);
                let text = read_body(response, MAX_RESPONSE_BYTES)
                    .map_err(|err| ApiError::Transport(err.to_string()))?;
                trace!(status, bytes = text.len(), "api response");
                Ok(ApiResponse {
                    status,
                    body: decode_body(&text)?,
                    link,
                })
            }
            Err(ureq::Error::Status(code, response)) => {
                let body = read_body(response, MAX_ERROR_BYTES).unwrap_or_default();
                Err(ApiError::from_status(code, &body))
            }
            Err(ureq::Error::Transport(err)) => Err(ApiError::Transport(err.to_string())),
        }
    }
}
