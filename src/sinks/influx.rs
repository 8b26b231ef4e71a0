//! InfluxDB writer speaking the 1.x (`/write`) and 2.x (`/api/v2/write`)
//! HTTP APIs.
//!
//! # Retry logic
//! - HTTP 429, 5xx and request timeouts: retry up to 3 times with
//!   exponential backoff (1s, 2s, 4s)
//! - anything else fails the batch at once

use reqwest::{RequestBuilder, StatusCode, Url};
use serde::Deserialize;
use std::time::Duration;

use crate::config::{Dialect, InfluxConfig, LogOptions};
use crate::error::{Result, SensorLoggerError};
use crate::output::Point;

const MAX_RETRIES: u32 = 3;
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Error payload of both server generations (`{"error": ..}` / `{"message": ..}`)
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    message: Option<String>,
}

pub struct InfluxSink {
    client: reqwest::Client,
    config: InfluxConfig,
    log: LogOptions,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig, log: LogOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(concat!("sensorlogger/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(InfluxSink { client, config, log })
    }

    /// Write endpoint with its query string for the configured dialect
    pub fn write_url(&self) -> Result<Url> {
        let invalid = || SensorLoggerError::SinkWrite(format!("invalid URL {:?}", self.config.url));
        let mut url = Url::parse(&self.config.url).map_err(|_| invalid())?;
        {
            let mut segments = url.path_segments_mut().map_err(|_| invalid())?;
            segments.pop_if_empty();
            match self.config.dialect {
                Dialect::V1 { .. } => {
                    segments.push("write");
                }
                Dialect::V2 { .. } => {
                    segments.extend(["api", "v2", "write"]);
                }
            }
        }
        {
            let mut query = url.query_pairs_mut();
            match &self.config.dialect {
                Dialect::V1 {
                    database,
                    retention_policy,
                } => {
                    query.append_pair("db", database);
                    query.append_pair("rp", retention_policy);
                }
                Dialect::V2 { org, bucket } => {
                    query.append_pair("org", org);
                    query.append_pair("bucket", bucket);
                }
            }
            query.append_pair("precision", "ns");
        }
        Ok(url)
    }

    fn request(&self, url: Url, body: String) -> RequestBuilder {
        let builder = self
            .client
            .post(url)
            .header("Content-Type", "text/plain; charset=utf-8")
            .body(body);
        let Some(token) = self.config.token.as_deref() else {
            return builder;
        };
        match self.config.dialect {
            Dialect::V1 { .. } => match token.split_once(':') {
                Some((user, password)) => builder.basic_auth(user, Some(password)),
                None => builder.header("Authorization", format!("Token {}", token)),
            },
            Dialect::V2 { .. } => builder.bearer_auth(token),
        }
    }

    /// Send every point, batched; returns the number of lines written
    pub async fn write(&self, source: &str, points: &[Point]) -> Result<usize> {
        let url = self.write_url()?;
        let batches = encode_batches(points, self.config.batch_size.max(1));
        let mut written = 0usize;

        for (i, batch) in batches.iter().enumerate() {
            if self.log.line_protocol {
                for line in batch {
                    log::debug!("{}", line);
                }
            }
            self.send_batch(&url, batch.join("\n")).await?;
            written += batch.len();
            log::debug!(
                "{}: batch {}/{} ({} lines) written",
                source,
                i + 1,
                batches.len(),
                batch.len()
            );
        }

        log::info!(
            "{}: wrote {} points to {}",
            source,
            written,
            self.config.url
        );
        Ok(written)
    }

    async fn send_batch(&self, url: &Url, body: String) -> Result<()> {
        for attempt in 0..=MAX_RETRIES {
            if self.log.influx_debug {
                log::debug!("POST {} ({} bytes), attempt {}", url, body.len(), attempt + 1);
            }

            let response = match self.request(url.clone(), body.clone()).send().await {
                Ok(resp) => resp,
                Err(e) if e.is_timeout() && attempt < MAX_RETRIES => {
                    self.backoff(attempt, "request timed out").await;
                    continue;
                }
                Err(e) => {
                    return Err(SensorLoggerError::SinkWrite(format!("{}: {}", url, e)));
                }
            };

            let status = response.status();
            if self.log.influx_debug {
                log::debug!("response: {}", status);
            }
            if status.is_success() {
                return Ok(());
            }
            if is_transient(status) && attempt < MAX_RETRIES {
                self.backoff(attempt, &format!("HTTP {}", status)).await;
                continue;
            }

            let text = response.text().await.unwrap_or_default();
            if self.log.influx_debug {
                log::debug!("response body: {}", text);
            }
            return Err(SensorLoggerError::SinkWrite(format!(
                "HTTP {}: {}",
                status,
                server_message(&text)
            )));
        }

        Err(SensorLoggerError::SinkWrite(format!(
            "{}: giving up after {} retries",
            url, MAX_RETRIES
        )))
    }

    async fn backoff(&self, attempt: u32, reason: &str) {
        let delay = 1u64 << attempt;
        log::warn!(
            "InfluxDB write failed ({}), attempt {}/{}, retrying in {}s",
            reason,
            attempt + 1,
            MAX_RETRIES + 1,
            delay
        );
        tokio::time::sleep(Duration::from_secs(delay)).await;
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Encoded lines grouped into batches of at most `batch_size`
fn encode_batches(points: &[Point], batch_size: usize) -> Vec<Vec<String>> {
    let lines: Vec<String> = points.iter().filter_map(Point::to_line).collect();
    lines.chunks(batch_size).map(<[String]>::to_vec).collect()
}

fn server_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            message: Some(msg), ..
        })
        | Ok(ErrorBody {
            error: Some(msg), ..
        }) => msg,
        _ if body.trim().is_empty() => "no error message".to_string(),
        _ => body.trim().to_string(),
    }
}
