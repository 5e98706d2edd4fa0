//! Server selection and sequential sub-tests against the measurement provider

use super::provider::MeasurementProvider;
use crate::error::{ProviderError, RunError};
use crate::logging::Logger;
use crate::models::{PartialResult, Reading, ServerSelector, ServerTarget, SubTest, UserInfo};
use crate::units;

/// Resolves a server and runs latency, download and upload tests against it
#[derive(Debug, Clone)]
pub struct ServiceRunner<P> {
    provider: P,
    selector: ServerSelector,
    server_fallback: bool,
    logger: Logger,
}

impl<P: MeasurementProvider> ServiceRunner<P> {
    pub fn new(provider: P, selector: ServerSelector, server_fallback: bool, logger: Logger) -> Self {
        Self {
            provider,
            selector,
            server_fallback,
            logger,
        }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch the user identity and pick this cycle's server
    pub async fn resolve(&self) -> Result<(UserInfo, ServerTarget), RunError> {
        let user = self
            .provider
            .fetch_user_info()
            .await
            .map_err(RunError::UserInfoFailure)?;

        let servers = self
            .provider
            .fetch_servers()
            .await
            .map_err(|e| RunError::NoServers(e.to_string()))?;
        if servers.is_empty() {
            return Err(RunError::NoServers("no servers found".into()));
        }

        let server = self.select_server(&servers)?;
        Ok((user, server))
    }

    fn select_server(&self, servers: &[ServerTarget]) -> Result<ServerTarget, RunError> {
        let requested = match self.selector {
            ServerSelector::Nearest => {
                return servers
                    .first()
                    .cloned()
                    .ok_or_else(|| RunError::NoServers("no servers found".into()))
            }
            ServerSelector::Id(id) => id,
        };

        let found = self
            .provider
            .find_server(servers, &[requested])
            .map_err(|source| RunError::ServerLookupFailure { id: requested, source })?;
        let server = found
            .into_iter()
            .next()
            .ok_or(RunError::ServerNotFound(requested))?;

        if server.numeric_id() != Some(requested) {
            if !self.server_fallback {
                return Err(RunError::ServerMismatch {
                    requested,
                    returned: server.id,
                });
            }
            self.logger
                .warn("Configured server not available, falling back")
                .field("requested_id", requested)
                .field("server_id", &server.id)
                .log();
        }

        Ok(server)
    }

    /// Run one sub-test and convert its reading to canonical units
    pub async fn run_sub_test(
        &self,
        sub_test: SubTest,
        server: &ServerTarget,
    ) -> Result<Reading, ProviderError> {
        match sub_test {
            SubTest::Latency => self
                .provider
                .ping_test(server)
                .await
                .map(|latency| Reading::LatencySeconds(units::duration_to_seconds(latency))),
            SubTest::Download => self.provider.download_test(server).await.map(Reading::DownloadBps),
            SubTest::Upload => self.provider.upload_test(server).await.map(Reading::UploadBps),
        }
    }

    /// Resolve a server, then run the three sub-tests in order.
    ///
    /// Each successful reading is handed to `on_reading` as soon as it is
    /// available; a failed sub-test is logged and does not stop the others.
    pub async fn run<F>(&self, correlation_id: &str, mut on_reading: F) -> Result<PartialResult, RunError>
    where
        F: FnMut(&ServerTarget, &UserInfo, Reading) + Send,
    {
        let (user, server) = self.resolve().await?;
        self.logger
            .debug("Selected speedtest server")
            .correlation_id(correlation_id)
            .field("server_id", &server.id)
            .field("server_name", &server.name)
            .field("distance_km", server.distance)
            .log();

        let latency = self
            .attempt(SubTest::Latency, &server, &user, correlation_id, &mut on_reading)
            .await;
        let download = self
            .attempt(SubTest::Download, &server, &user, correlation_id, &mut on_reading)
            .await;
        let upload = self
            .attempt(SubTest::Upload, &server, &user, correlation_id, &mut on_reading)
            .await;

        Ok(PartialResult {
            server,
            user_isp: user.isp,
            latency,
            download,
            upload,
        })
    }

    async fn attempt<F>(
        &self,
        sub_test: SubTest,
        server: &ServerTarget,
        user: &UserInfo,
        correlation_id: &str,
        on_reading: &mut F,
    ) -> Result<f64, String>
    where
        F: FnMut(&ServerTarget, &UserInfo, Reading) + Send,
    {
        match self.run_sub_test(sub_test, server).await {
            Ok(reading) => {
                on_reading(server, user, reading);
                Ok(reading.value())
            }
            Err(e) => {
                self.logger
                    .error(&format!("failed to carry out {} test", sub_test))
                    .correlation_id(correlation_id)
                    .field("server_id", &server.id)
                    .error_info(&e)
                    .log();
                Err(e.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogLevel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct Scripted {
        servers: Vec<ServerTarget>,
        fail_user: bool,
        fail_ping: bool,
        sub_tests_run: AtomicUsize,
    }

    fn server(id: &str) -> ServerTarget {
        ServerTarget {
            id: id.to_string(),
            name: format!("name-{}", id),
            country: "Sweden".into(),
            sponsor: String::new(),
            url: String::new(),
            distance: 0.0,
        }
    }

    #[async_trait]
    impl MeasurementProvider for Scripted {
        async fn fetch_user_info(&self) -> Result<UserInfo, ProviderError> {
            if self.fail_user {
                Err(ProviderError::Measurement("offline".into()))
            } else {
                Ok(UserInfo { isp: "ExampleISP".into(), ip: None })
            }
        }
        async fn fetch_servers(&self) -> Result<Vec<ServerTarget>, ProviderError> {
            Ok(self.servers.clone())
        }
        async fn ping_test(&self, _: &ServerTarget) -> Result<Duration, ProviderError> {
            self.sub_tests_run.fetch_add(1, Ordering::SeqCst);
            if self.fail_ping {
                Err(ProviderError::Measurement("ping timed out".into()))
            } else {
                Ok(Duration::from_millis(12))
            }
        }
        async fn download_test(&self, _: &ServerTarget) -> Result<f64, ProviderError> {
            self.sub_tests_run.fetch_add(1, Ordering::SeqCst);
            Ok(10_000_000.0)
        }
        async fn upload_test(&self, _: &ServerTarget) -> Result<f64, ProviderError> {
            self.sub_tests_run.fetch_add(1, Ordering::SeqCst);
            Ok(5_000_000.0)
        }
    }

    fn runner(provider: Scripted, selector: ServerSelector, fallback: bool) -> ServiceRunner<Scripted> {
        let mut logger = Logger::new("speedtest");
        logger.set_level(LogLevel::Fatal);
        ServiceRunner::new(provider, selector, fallback, logger)
    }

    #[tokio::test]
    async fn test_nearest_selects_first_server() {
        let provider = Scripted { servers: vec![server("1"), server("2")], ..Default::default() };
        let (user, selected) = runner(provider, ServerSelector::Nearest, false).resolve().await.unwrap();
        assert_eq!(selected.id, "1");
        assert_eq!(user.isp, "ExampleISP");
    }

    #[tokio::test]
    async fn test_explicit_id_is_selected() {
        let provider = Scripted { servers: vec![server("1"), server("5001")], ..Default::default() };
        let (_, selected) = runner(provider, ServerSelector::Id(5001), false).resolve().await.unwrap();
        assert_eq!(selected.id, "5001");
    }

    #[tokio::test]
    async fn test_mismatch_without_fallback_fails() {
        let provider = Scripted { servers: vec![server("5002")], ..Default::default() };
        let err = runner(provider, ServerSelector::Id(5001), false).resolve().await.unwrap_err();
        match err {
            RunError::ServerMismatch { requested, returned } => {
                assert_eq!(requested, 5001);
                assert_eq!(returned, "5002");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_padded_server_id_is_not_a_mismatch() {
        let provider = Scripted { servers: vec![server(" 5001 ")], ..Default::default() };
        let (_, selected) = runner(provider, ServerSelector::Id(5001), false).resolve().await.unwrap();
        assert_eq!(selected.numeric_id(), Some(5001));
    }

    #[tokio::test]
    async fn test_mismatch_with_fallback_uses_returned_server() {
        let provider = Scripted { servers: vec![server("5002")], ..Default::default() };
        let (_, selected) = runner(provider, ServerSelector::Id(5001), true).resolve().await.unwrap();
        assert_eq!(selected.id, "5002");
    }

    #[tokio::test]
    async fn test_empty_server_list_fails() {
        let err = runner(Scripted::default(), ServerSelector::Nearest, false)
            .resolve()
            .await
            .unwrap_err();
        assert!(matches!(err, RunError::NoServers(_)));
    }

    #[tokio::test]
    async fn test_user_info_failure_stops_cycle() {
        let provider = Scripted { servers: vec![server("1")], fail_user: true, ..Default::default() };
        let runner = runner(provider, ServerSelector::Nearest, false);
        let err = runner.run("test", |_, _, _| {}).await.unwrap_err();
        assert!(matches!(err, RunError::UserInfoFailure(_)));
        assert_eq!(runner.provider().sub_tests_run.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_ping_does_not_stop_other_sub_tests() {
        let provider = Scripted { servers: vec![server("1")], fail_ping: true, ..Default::default() };
        let runner = runner(provider, ServerSelector::Nearest, false);
        let mut readings = Vec::new();
        let result = runner.run("test", |_, _, reading| readings.push(reading)).await.unwrap();

        assert!(!result.is_success());
        assert!(result.latency.is_err());
        assert_eq!(result.download, Ok(10_000_000.0));
        assert_eq!(result.upload, Ok(5_000_000.0));
        assert_eq!(readings, vec![Reading::DownloadBps(10_000_000.0), Reading::UploadBps(5_000_000.0)]);
        assert_eq!(runner.provider().sub_tests_run.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_latency_is_converted_to_seconds() {
        let provider = Scripted { servers: vec![server("1")], ..Default::default() };
        let runner = runner(provider, ServerSelector::Nearest, false);
        let reading = runner.run_sub_test(SubTest::Latency, &server("1")).await.unwrap();
        assert_eq!(reading, Reading::LatencySeconds(0.012));
    }
}
