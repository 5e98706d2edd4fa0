//! Measurement provider abstraction and the speedtest.net HTTP implementation

use crate::error::ProviderError;
use crate::models::{ServerTarget, UserInfo};
use async_trait::async_trait;
use futures::StreamExt;
use regex::Regex;
use reqwest::Client;
use std::time::{Duration, Instant};
use url::Url;

/// speedtest.net configuration document carrying the `<client isp="…">` element
pub const DEFAULT_USER_INFO_URL: &str = "https://www.speedtest.net/speedtest-config.php";

/// speedtest.net server list API, nearest servers first
pub const DEFAULT_SERVERS_URL: &str =
    "https://www.speedtest.net/api/js/servers?engine=js&limit=10&https_functional=true";

const PING_SAMPLES: usize = 5;

/// Edge lengths of the `random{N}x{N}.jpg` payloads fetched by the download test
const DOWNLOAD_SIZES: &[u32] = &[1000, 1500, 2000];

const UPLOAD_CHUNK_BYTES: usize = 1_000_000;
const UPLOAD_CHUNKS: usize = 4;

const USER_AGENT: &str = concat!("speedtest-exporter/", env!("CARGO_PKG_VERSION"));

/// Third-party service that lists servers and runs sub-tests against them.
/// Throughput readings are in bytes/s.
#[async_trait]
pub trait MeasurementProvider: Send + Sync {
    async fn fetch_user_info(&self) -> Result<UserInfo, ProviderError>;

    /// Candidate servers ordered nearest-first
    async fn fetch_servers(&self) -> Result<Vec<ServerTarget>, ProviderError>;

    /// Look up servers by ID among `candidates`.
    ///
    /// Exact matches are returned in request order; when nothing matches the
    /// nearest candidate is returned instead, so callers must compare IDs.
    fn find_server(
        &self,
        candidates: &[ServerTarget],
        ids: &[i64],
    ) -> Result<Vec<ServerTarget>, ProviderError> {
        let first = candidates.first().ok_or(ProviderError::NoCandidates)?;

        let mut found: Vec<ServerTarget> = ids
            .iter()
            .filter_map(|id| {
                candidates
                    .iter()
                    .find(|server| server.numeric_id() == Some(*id))
                    .cloned()
            })
            .collect();

        if found.is_empty() {
            found.push(first.clone());
        }
        Ok(found)
    }

    async fn ping_test(&self, server: &ServerTarget) -> Result<Duration, ProviderError>;

    async fn download_test(&self, server: &ServerTarget) -> Result<f64, ProviderError>;

    async fn upload_test(&self, server: &ServerTarget) -> Result<f64, ProviderError>;
}

/// Provider backed by the public speedtest.net endpoints
#[derive(Debug, Clone)]
pub struct HttpProvider {
    client: Client,
    user_info_url: String,
    servers_url: String,
}

impl HttpProvider {
    pub fn new(timeout: Duration) -> Result<Self, ProviderError> {
        Self::with_endpoints(timeout, DEFAULT_USER_INFO_URL, DEFAULT_SERVERS_URL)
    }

    /// Provider with custom discovery endpoints
    pub fn with_endpoints(
        timeout: Duration,
        user_info_url: &str,
        servers_url: &str,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            user_info_url: user_info_url.to_string(),
            servers_url: servers_url.to_string(),
        })
    }

    async fn get_text(&self, url: &str) -> Result<String, ProviderError> {
        let response = self.client.get(url).send().await?;
        check_status(url, &response)?;
        Ok(response.text().await?)
    }

    /// Resolve a file next to the server's upload endpoint
    fn sibling_url(server: &ServerTarget, file: &str) -> Result<Url, ProviderError> {
        Ok(Url::parse(&server.url)?.join(file)?)
    }
}

fn check_status(url: &str, response: &reqwest::Response) -> Result<(), ProviderError> {
    if response.status().is_success() {
        Ok(())
    } else {
        Err(ProviderError::Status {
            url: url.to_string(),
            status: response.status().as_u16(),
        })
    }
}

fn throughput(bytes: u64, elapsed: Duration) -> Result<f64, ProviderError> {
    let secs = elapsed.as_secs_f64();
    if bytes == 0 || secs <= 0.0 {
        return Err(ProviderError::Measurement(format!(
            "transfer too small to measure ({} bytes in {:.3}s)",
            bytes, secs
        )));
    }
    Ok(bytes as f64 / secs)
}

/// Extract the `isp` and `ip` attributes of the `<client …>` element
pub fn parse_user_info(document: &str) -> Result<UserInfo, ProviderError> {
    let client_tag = Regex::new(r"<client\s[^>]*>").map_err(|e| ProviderError::Decode(e.to_string()))?;
    let tag = client_tag
        .find(document)
        .ok_or_else(|| ProviderError::Decode("no <client> element in configuration".into()))?
        .as_str();

    let attribute = |name: &str| -> Result<Option<String>, ProviderError> {
        let pattern = Regex::new(&format!(r#"\b{}="([^"]*)""#, name))
            .map_err(|e| ProviderError::Decode(e.to_string()))?;
        Ok(pattern.captures(tag).map(|c| c[1].to_string()))
    };

    let isp = attribute("isp")?
        .filter(|isp| !isp.trim().is_empty())
        .ok_or_else(|| ProviderError::Decode("<client> element has no isp attribute".into()))?;

    Ok(UserInfo { isp, ip: attribute("ip")? })
}

/// Decode the server list JSON and order it nearest-first
pub fn parse_servers(body: &str) -> Result<Vec<ServerTarget>, ProviderError> {
    let mut servers: Vec<ServerTarget> =
        serde_json::from_str(body).map_err(|e| ProviderError::Decode(e.to_string()))?;
    servers.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    Ok(servers)
}

#[async_trait]
impl MeasurementProvider for HttpProvider {
    async fn fetch_user_info(&self) -> Result<UserInfo, ProviderError> {
        let document = self.get_text(&self.user_info_url).await?;
        parse_user_info(&document)
    }

    async fn fetch_servers(&self) -> Result<Vec<ServerTarget>, ProviderError> {
        let body = self.get_text(&self.servers_url).await?;
        parse_servers(&body)
    }

    /// Mean round trip of several `latency.txt` requests
    async fn ping_test(&self, server: &ServerTarget) -> Result<Duration, ProviderError> {
        let url = Self::sibling_url(server, "latency.txt")?;
        let mut total = Duration::ZERO;

        for _ in 0..PING_SAMPLES {
            let start = Instant::now();
            let response = self.client.get(url.clone()).send().await?;
            check_status(url.as_str(), &response)?;
            response.bytes().await?;
            total += start.elapsed();
        }

        Ok(total / PING_SAMPLES as u32)
    }

    async fn download_test(&self, server: &ServerTarget) -> Result<f64, ProviderError> {
        let mut bytes: u64 = 0;
        let start = Instant::now();

        for size in DOWNLOAD_SIZES {
            let url = Self::sibling_url(server, &format!("random{0}x{0}.jpg", size))?;
            let response = self.client.get(url.clone()).send().await?;
            check_status(url.as_str(), &response)?;

            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                bytes += chunk?.len() as u64;
            }
        }

        throughput(bytes, start.elapsed())
    }

    async fn upload_test(&self, server: &ServerTarget) -> Result<f64, ProviderError> {
        let url = Url::parse(&server.url)?;
        let payload = vec![b'0'; UPLOAD_CHUNK_BYTES];
        let mut bytes: u64 = 0;
        let start = Instant::now();

        for _ in 0..UPLOAD_CHUNKS {
            let response = self
                .client
                .post(url.clone())
                .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
                .body(payload.clone())
                .send()
                .await?;
            check_status(url.as_str(), &response)?;
            bytes += payload.len() as u64;
        }

        throughput(bytes, start.elapsed())
    }
}
