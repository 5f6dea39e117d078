//! Workload invocation
//!
//! Triggers one execution of the instrumented workload. Transport
//! failures are folded into a status code so the session can continue
//! to log retrieval and teardown: 504 for timeouts, 500 otherwise.

use serde::Serialize;
use std::time::Duration;

/// Invocation path of a Lambda-style runtime interface emulator
pub const DEFAULT_INVOKE_PATH: &str = "/2015-03-31/functions/function/invocations";

/// Local endpoint of the emulator published on `host_port`
pub fn local_invoke_url(host_port: u16) -> String {
    format!("http://localhost:{}{}", host_port, DEFAULT_INVOKE_PATH)
}

pub const DEFAULT_INPUT_TEXT: &str = "Introduce yourself in 2 sentences.";

/// Status and body returned by one invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InvocationOutcome {
    pub status: u16,
    pub body: String,
}

impl InvocationOutcome {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Serialize)]
struct InvokeRequest<'a> {
    input_text: &'a str,
}

/// Triggers the workload once
pub trait Invoker {
    fn invoke(&self, input_text: &str) -> InvocationOutcome;
}

/// Invoker posting `{"input_text": ...}` to an HTTP endpoint
#[derive(Debug, Clone)]
pub struct HttpInvoker {
    url: String,
    timeout: Duration,
}

impl HttpInvoker {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            timeout,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Invoker for HttpInvoker {
    fn invoke(&self, input_text: &str) -> InvocationOutcome {
        tracing::info!(url = %self.url, "invoking workload");

        let client = match reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()
        {
            Ok(client) => client,
            Err(e) => {
                return InvocationOutcome {
                    status: 500,
                    body: format!("Error building HTTP client: {}", e),
                }
            }
        };

        let response = client
            .post(&self.url)
            .json(&InvokeRequest { input_text })
            .send()
            .and_then(|resp| {
                let status = resp.status().as_u16();
                resp.text().map(|body| (status, body))
            });

        match response {
            Ok((status, body)) if status >= 300 => InvocationOutcome {
                status,
                body: format!("Error response from workload: {}", body),
            },
            Ok((status, body)) => InvocationOutcome { status, body },
            Err(e) if e.is_timeout() => InvocationOutcome {
                status: 504,
                body: "Timeout connecting to or receiving response from workload.".to_string(),
            },
            Err(e) => InvocationOutcome {
                status: 500,
                body: format!("Error calling workload endpoint: {}", e),
            },
        }
    }
}
