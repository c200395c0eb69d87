//! Integration tests for drone scaler
//!
//! Tests cover:
//! - HTTP fetch with and without bearer token
//! - Timeouts and error statuses as skipped cycles
//! - End-to-end poll cycles against a stub metrics endpoint

use drone_scaler::{
    client::FetchError, poller::CycleError, Config, CycleOutcome, Decision, ExpositionError,
    HttpMetricsClient, Metrics, MetricsSource, Poller,
};
use std::time::Duration;
use wiremock::{
    matchers::{header, method, path},
    Mock, MockServer, ResponseTemplate,
};

const PENDING_BODY: &str = "# HELP drone_pending_jobs Total number of pending jobs.\n\
# TYPE drone_pending_jobs gauge\n\
drone_pending_jobs 12\n\
# HELP drone_running_jobs Total number of running jobs.\n\
# TYPE drone_running_jobs gauge\n\
drone_running_jobs 3\n";

fn config_for(server: &MockServer) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: server.address().port(),
        request_timeout_secs: 1,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetch_sends_bearer_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metrics"))
        .and(header("Authorization", "Bearer s3cret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PENDING_BODY))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = Config {
        token: Some("s3cret".to_string()),
        ..config_for(&mock_server)
    };
    let client = HttpMetricsClient::from_config(&config).unwrap();

    let body = client.fetch().await.unwrap();
    assert_eq!(body, PENDING_BODY);
}

#[tokio::test]
async fn test_fetch_without_token_sends_no_authorization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PENDING_BODY))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = HttpMetricsClient::from_config(&config_for(&mock_server)).unwrap();
    client.fetch().await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_error_status_is_fetch_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&mock_server)
        .await;

    let client = HttpMetricsClient::from_config(&config_for(&mock_server)).unwrap();
    let err = client.fetch().await.unwrap_err();

    assert!(matches!(err, FetchError::Status { .. }));
    assert_eq!(err.kind(), "http_status");
}

#[tokio::test]
async fn test_end_to_end_scale_up() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_string(PENDING_BODY))
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let client = HttpMetricsClient::from_config(&config).unwrap();
    let mut poller = Poller::new(&config, client, Metrics::new());

    let outcome = poller.step().await;
    assert_eq!(outcome.decision(), Some(Decision::ScaleUp));
    assert_eq!(poller.pending(), 12);
}

#[tokio::test]
async fn test_timeout_skips_cycle_and_keeps_estimate() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("drone_pending_jobs 4\n")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let client = HttpMetricsClient::from_config(&config).unwrap();
    let mut poller = Poller::new(&config, client, Metrics::new());

    let outcome = poller.step().await;
    assert!(outcome.decision().is_none());
    assert!(matches!(
        outcome,
        CycleOutcome::Skipped {
            error: CycleError::Fetch(FetchError::Timeout { .. })
        }
    ));
    assert_eq!(poller.pending(), 0);
    assert_eq!(poller.metrics().snapshot().skipped["timeout"], 1);
}

#[tokio::test]
async fn test_missing_metric_is_reported_not_zero() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/metrics"))
        .respond_with(ResponseTemplate::new(200).set_body_string("drone_running_jobs 0\n"))
        .mount(&mock_server)
        .await;

    let config = config_for(&mock_server);
    let client = HttpMetricsClient::from_config(&config).unwrap();
    let mut poller = Poller::new(&config, client, Metrics::new());

    let outcome = poller.step().await;
    match outcome {
        CycleOutcome::Skipped {
            error: CycleError::Exposition(ExpositionError::MetricNotFound { name }),
        } => assert_eq!(name, "drone_pending_jobs"),
        other => panic!("expected MetricNotFound, got {:?}", other),
    }

    // A true zero would have produced a scale-down decision.
    assert_eq!(poller.metrics().snapshot().scale_down, 0);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_not_fatal() {
    let config = Config {
        host: "127.0.0.1".to_string(),
        port: 9,
        request_timeout_secs: 1,
        ..Default::default()
    };
    let client = HttpMetricsClient::from_config(&config).unwrap();
    let mut poller = Poller::new(&config, client, Metrics::new());

    for _ in 0..3 {
        let outcome = poller.step().await;
        assert!(matches!(outcome, CycleOutcome::Skipped { .. }));
    }
    assert_eq!(poller.metrics().snapshot().cycles, 3);
    assert_eq!(poller.pending(), 0);
}
