//! Sequential latency benchmark against a running `/generate` endpoint.
//!
//! One request is in flight at a time, so `serial_throughput` is the
//! reciprocal of the mean latency and says nothing about concurrent capacity.

use std::{env, fmt, time::Instant};

use serde::Serialize;
use tracing::{debug, info};

use crate::{error::BenchmarkError, model::GenerationRequest};

#[derive(Debug, Clone)]
pub struct BenchmarkConfig {
    pub url: String,
    pub prompt: String,
    pub max_new_tokens: usize,
    pub n_requests: usize,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:8000/generate".to_string(),
            prompt: "how to manage time effectively?".to_string(),
            max_new_tokens: 20,
            n_requests: 20,
        }
    }
}

impl BenchmarkConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            url: lookup("BENCH_URL").unwrap_or(defaults.url),
            prompt: lookup("BENCH_PROMPT").unwrap_or(defaults.prompt),
            max_new_tokens: lookup("BENCH_MAX_NEW_TOKENS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_new_tokens),
            n_requests: lookup("BENCH_REQUESTS")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.n_requests),
        }
    }

    fn request(&self) -> GenerationRequest {
        GenerationRequest {
            prompt: self.prompt.clone(),
            max_new_tokens: self.max_new_tokens,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BenchmarkSample {
    pub elapsed_seconds: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkReport {
    pub samples: Vec<BenchmarkSample>,
}

impl BenchmarkReport {
    pub fn total_seconds(&self) -> f64 {
        self.samples.iter().map(|s| s.elapsed_seconds).sum()
    }

    pub fn avg_latency_seconds(&self) -> f64 {
        self.total_seconds() / self.samples.len() as f64
    }

    /// Requests per second under strictly sequential load.
    pub fn serial_throughput(&self) -> f64 {
        self.samples.len() as f64 / self.total_seconds()
    }
}

impl fmt::Display for BenchmarkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Avg Latency: {:.2} ms", self.avg_latency_seconds() * 1000.0)?;
        write!(
            f,
            "Serial Throughput: {:.2} requests/sec",
            self.serial_throughput()
        )
    }
}

/// Sends one untimed warm-up request, then `n_requests` timed ones back to
/// back. The first transport error or non-success status aborts the run.
pub async fn run_benchmark(
    client: &reqwest::Client,
    config: &BenchmarkConfig,
) -> Result<BenchmarkReport, BenchmarkError> {
    if config.n_requests == 0 {
        return Err(BenchmarkError::NoRequests);
    }
    let body = config.request();

    info!(url = %config.url, "sending warm-up request");
    send(client, &config.url, &body).await?;

    let mut samples = Vec::with_capacity(config.n_requests);
    for idx in 0..config.n_requests {
        let start = Instant::now();
        send(client, &config.url, &body).await?;
        let elapsed_seconds = start.elapsed().as_secs_f64();
        debug!(request = idx, elapsed_seconds, "request finished");
        samples.push(BenchmarkSample { elapsed_seconds });
    }

    Ok(BenchmarkReport { samples })
}

async fn send(
    client: &reqwest::Client,
    url: &str,
    body: &GenerationRequest,
) -> Result<(), BenchmarkError> {
    client
        .post(url)
        .json(body)
        .send()
        .await?
        .error_for_status()?
        .bytes()
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn report(elapsed: &[f64]) -> BenchmarkReport {
        BenchmarkReport {
            samples: elapsed
                .iter()
                .map(|&elapsed_seconds| BenchmarkSample { elapsed_seconds })
                .collect(),
        }
    }

    #[test]
    fn throughput_is_count_over_total_time() {
        let report = report(&[0.5, 0.25, 0.25]);
        assert_eq!(report.total_seconds(), 1.0);
        assert_eq!(report.serial_throughput(), 3.0 / 1.0);
        assert!((report.avg_latency_seconds() - 1.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn throughput_is_reciprocal_of_mean_latency() {
        let report = report(&[0.12, 0.48, 0.3, 0.9]);
        let reciprocal = 1.0 / report.avg_latency_seconds();
        assert!((report.serial_throughput() - reciprocal).abs() < 1e-9);
    }

    #[test]
    fn display_reports_milliseconds() {
        let rendered = report(&[0.2, 0.2]).to_string();
        assert_eq!(
            rendered,
            "Avg Latency: 200.00 ms\nSerial Throughput: 5.00 requests/sec"
        );
    }

    #[test]
    fn config_defaults_and_overrides() {
        let config = BenchmarkConfig::from_lookup(|_| None);
        assert_eq!(config.url, "http://127.0.0.1:8000/generate");
        assert_eq!(config.prompt, "how to manage time effectively?");
        assert_eq!(config.max_new_tokens, 20);
        assert_eq!(config.n_requests, 20);

        let overrides: HashMap<&str, &str> =
            [("BENCH_REQUESTS", "3"), ("BENCH_MAX_NEW_TOKENS", "nope")].into();
        let config = BenchmarkConfig::from_lookup(|key| overrides.get(key).map(|v| v.to_string()));
        assert_eq!(config.n_requests, 3);
        assert_eq!(config.max_new_tokens, 20);
    }

    #[tokio::test]
    async fn zero_requests_is_rejected_before_sending() {
        let config = BenchmarkConfig {
            url: "http://127.0.0.1:1/generate".to_string(),
            n_requests: 0,
            ..BenchmarkConfig::default()
        };
        let result = run_benchmark(&reqwest::Client::new(), &config).await;
        assert!(matches!(result, Err(BenchmarkError::NoRequests)));
    }
}
