//! Measurement data models shared by both backends

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fields of one `bbk --quiet` summary line
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParsedFields {
    pub download_mbps: f64,
    pub upload_mbps: f64,
    pub latency_ms: f64,
    pub server: String,
    pub isp: String,
    /// Optional trailing tokens, kept for logging only
    pub ticket: Option<String>,
    pub measurement_id: Option<String>,
    pub rating: Option<String>,
}

/// A candidate measurement server as advertised by the provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerTarget {
    pub id: String,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub sponsor: String,
    /// Upload endpoint; the other endpoints are resolved relative to it
    #[serde(default)]
    pub url: String,
    /// Provider-computed distance in km
    #[serde(default)]
    pub distance: f64,
}

impl ServerTarget {
    /// Label values in `server_id, server_name, server_country` order
    pub fn label_values(&self) -> [&str; 3] {
        [&self.id, &self.name, &self.country]
    }

    /// Numeric server ID; the provider sends it as a string
    pub fn numeric_id(&self) -> Option<i64> {
        self.id.trim().parse().ok()
    }
}

/// Identity of the measuring client as seen by the provider
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserInfo {
    pub isp: String,
    pub ip: Option<String>,
}

/// How the service backend picks its server each cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerSelector {
    /// Use the first (nearest) server of the provider list
    Nearest,
    /// Use the server with this ID
    Id(i64),
}

impl ServerSelector {
    /// Sentinel server ID meaning "use nearest"
    pub const NEAREST_SENTINEL: i64 = -1;

    pub fn from_id(id: i64) -> Self {
        if id == Self::NEAREST_SENTINEL {
            Self::Nearest
        } else {
            Self::Id(id)
        }
    }
}

/// Service backend sub-tests, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubTest {
    Latency,
    Download,
    Upload,
}

impl SubTest {
    pub const ALL: [SubTest; 3] = [SubTest::Latency, SubTest::Download, SubTest::Upload];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubTest::Latency => "ping",
            SubTest::Download => "download",
            SubTest::Upload => "upload",
        }
    }
}

impl fmt::Display for SubTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One successful sub-test reading, already in canonical units
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    LatencySeconds(f64),
    DownloadBps(f64),
    UploadBps(f64),
}

impl Reading {
    pub fn sub_test(&self) -> SubTest {
        match self {
            Reading::LatencySeconds(_) => SubTest::Latency,
            Reading::DownloadBps(_) => SubTest::Download,
            Reading::UploadBps(_) => SubTest::Upload,
        }
    }

    pub fn value(&self) -> f64 {
        match *self {
            Reading::LatencySeconds(v) | Reading::DownloadBps(v) | Reading::UploadBps(v) => v,
        }
    }
}

/// Outcome of one service backend cycle; each sub-test reports independently
#[derive(Debug, Clone)]
pub struct PartialResult {
    pub server: ServerTarget,
    pub user_isp: String,
    pub latency: Result<f64, String>,
    pub download: Result<f64, String>,
    pub upload: Result<f64, String>,
}

impl PartialResult {
    /// Logical AND of the three sub-test outcomes
    pub fn is_success(&self) -> bool {
        self.latency.is_ok() && self.download.is_ok() && self.upload.is_ok()
    }

    pub fn outcome(&self, sub_test: SubTest) -> &Result<f64, String> {
        match sub_test {
            SubTest::Latency => &self.latency,
            SubTest::Download => &self.download,
            SubTest::Upload => &self.upload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> ServerTarget {
        ServerTarget {
            id: "5001".into(),
            name: "Stockholm".into(),
            country: "Sweden".into(),
            sponsor: "Example".into(),
            url: "http://st1.example.net:8080/speedtest/upload.php".into(),
            distance: 3.2,
        }
    }

    #[test]
    fn test_selector_sentinel() {
        assert_eq!(ServerSelector::from_id(-1), ServerSelector::Nearest);
        assert_eq!(ServerSelector::from_id(5001), ServerSelector::Id(5001));
        assert_eq!(ServerSelector::from_id(0), ServerSelector::Id(0));
    }

    #[test]
    fn test_partial_result_is_and_of_sub_tests() {
        let mut result = PartialResult {
            server: server(),
            user_isp: "ExampleISP".into(),
            latency: Ok(0.01),
            download: Ok(1e6),
            upload: Ok(5e5),
        };
        assert!(result.is_success());

        result.latency = Err("ping failed".into());
        assert!(!result.is_success());
        assert!(result.outcome(SubTest::Download).is_ok());
    }

    #[test]
    fn test_server_deserializes_with_missing_optional_fields() {
        let json = r#"{"id":"42","name":"Oslo","country":"Norway"}"#;
        let parsed: ServerTarget = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.label_values(), ["42", "Oslo", "Norway"]);
        assert_eq!(parsed.distance, 0.0);
    }

    #[test]
    fn test_numeric_id_ignores_padding() {
        let mut target = server();
        assert_eq!(target.numeric_id(), Some(5001));
        target.id = " 5001 ".into();
        assert_eq!(target.numeric_id(), Some(5001));
        target.id = "st-1".into();
        assert_eq!(target.numeric_id(), None);
    }

    #[test]
    fn test_reading_accessors() {
        let reading = Reading::UploadBps(2.5e6);
        assert_eq!(reading.sub_test(), SubTest::Upload);
        assert_eq!(reading.value(), 2.5e6);
        assert_eq!(SubTest::Latency.to_string(), "ping");
    }
}
