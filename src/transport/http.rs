//! REST transport for a hosted Redis-compatible store.
//!
//! Each call POSTs one command as a JSON array (`["SET", key, value, "EX",
//! "60"]`) to the endpoint with a bearer token. The store answers with an
//! envelope: `{"result": ...}` on success or `{"error": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::logging::{debug, trace};

use super::{KvTransport, TransportError};

/// Reply envelope returned for every command.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<String>,
}

impl Envelope {
    fn into_result(self) -> Result<Option<Value>, TransportError> {
        match self.error {
            Some(message) => Err(TransportError::Envelope(message)),
            None => Ok(self.result),
        }
    }
}

/// KV transport over HTTPS.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
    url: String,
    token: String,
}

impl HttpTransport {
    /// Create a transport for `url` authenticating with `token`.
    pub fn new(url: &str, token: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Endpoint this transport talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn command(&self, args: &[&str]) -> Result<Option<Value>, TransportError> {
        trace!(command = args.first().copied().unwrap_or_default(), "sending KV command");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(args)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // Command errors come back as 4xx with an envelope; anything else
            // is reported with the raw body.
            if let Ok(Envelope {
                error: Some(message),
                ..
            }) = serde_json::from_str::<Envelope>(&body)
            {
                return Err(TransportError::Envelope(message));
            }
            debug!(status = status.as_u16(), "KV store returned non-success status");
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        parse_envelope(&body)
    }
}

impl std::fmt::Debug for HttpTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpTransport")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl KvTransport for HttpTransport {
    async fn get(&self, key: &str) -> Result<Option<String>, TransportError> {
        let reply = self.command(&["GET", key]).await?;
        parse_get(reply)
    }

    async fn set(
        &self,
        key: &str,
        value: &str,
        ttl: Option<Duration>,
    ) -> Result<(), TransportError> {
        let reply = match ttl {
            Some(ttl) => {
                let secs = ttl_seconds(ttl).to_string();
                self.command(&["SET", key, value, "EX", &secs]).await?
            }
            None => self.command(&["SET", key, value]).await?,
        };
        parse_set(reply)
    }

    async fn delete(&self, key: &str) -> Result<bool, TransportError> {
        let reply = self.command(&["DEL", key]).await?;
        parse_del(reply)
    }
}

/// `EX` takes whole seconds and rejects zero.
fn ttl_seconds(ttl: Duration) -> u64 {
    ttl.as_secs().max(1)
}

fn parse_envelope(body: &str) -> Result<Option<Value>, TransportError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|_| TransportError::UnexpectedReply {
            command: "envelope",
            reply: body.to_string(),
        })?;
    envelope.into_result()
}

fn parse_get(reply: Option<Value>) -> Result<Option<String>, TransportError> {
    match reply {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(TransportError::UnexpectedReply {
            command: "GET",
            reply: other.to_string(),
        }),
    }
}

fn parse_set(reply: Option<Value>) -> Result<(), TransportError> {
    match reply {
        Some(Value::String(s)) if s == "OK" => Ok(()),
        other => Err(TransportError::UnexpectedReply {
            command: "SET",
            reply: other.map(|v| v.to_string()).unwrap_or_else(|| "null".into()),
        }),
    }
}

fn parse_del(reply: Option<Value>) -> Result<bool, TransportError> {
    match reply.as_ref().and_then(Value::as_u64) {
        Some(removed) => Ok(removed > 0),
        None => Err(TransportError::UnexpectedReply {
            command: "DEL",
            reply: reply.map(|v| v.to_string()).unwrap_or_else(|| "null".into()),
        }),
    }
}
