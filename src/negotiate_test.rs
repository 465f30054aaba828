use axum::http::StatusCode;

use super::*;
use crate::test_helpers::{drain, negotiation, spawn_mock, spawn_negotiate_only};

#[test]
fn endpoint_url_joins_well_known_path() {
    let url = endpoint_url("https", "example.test:8443", NEGOTIATE_PATH).unwrap();
    assert_eq!(url.as_str(), "https://example.test:8443/signalr/negotiate");
}

#[test]
fn endpoint_url_rejects_non_authority_hosts() {
    for host in ["", "bad host", "example.test/extra", "example.test?x=1"] {
        let err = endpoint_url("https", host, NEGOTIATE_PATH).unwrap_err();
        assert!(matches!(err, ClientError::InvalidEndpoint(_)), "host {host:?} should be rejected");
    }
}

#[test]
fn session_parameters_use_wire_field_names() {
    let params: SessionParameters = serde_json::from_value(negotiation("tok123")).unwrap();
    assert_eq!(params.url, "/signalr");
    assert_eq!(params.connection_token, "tok123");
    assert_eq!(params.connection_id, "conn-1");
    assert_eq!(params.keep_alive_timeout, Some(20.0));
    assert!((params.disconnect_timeout - 30.0).abs() < f64::EPSILON);
    assert!((params.connection_timeout - 110.0).abs() < f64::EPSILON);
    assert!(params.try_web_sockets);
    assert_eq!(params.protocol_version, "1.5");
    assert!((params.transport_connect_timeout - 5.0).abs() < f64::EPSILON);
    assert!(params.log_poll_delay.abs() < f64::EPSILON);
}

#[test]
fn session_parameters_accept_null_keep_alive() {
    let params: SessionParameters =
        serde_json::from_str(r#"{"ConnectionToken":"t","KeepAliveTimeout":null}"#).unwrap();
    assert_eq!(params.keep_alive_timeout, None);
}

#[tokio::test]
async fn negotiate_reads_session_from_endpoint() {
    let server = spawn_mock(negotiation("tok123"), drain).await;
    let http = reqwest::Client::new();

    let params = negotiate(&http, "http", &server.host()).await.unwrap();
    assert_eq!(params.connection_token, "tok123");
    assert_eq!(params.connection_id, "conn-1");
}

#[tokio::test]
async fn negotiate_tolerates_partial_body() {
    let addr = spawn_negotiate_only(StatusCode::OK, r#"{"ConnectionToken":"tok123"}"#).await;
    let http = reqwest::Client::new();

    let params = negotiate(&http, "http", &addr.to_string()).await.unwrap();
    assert_eq!(params.connection_token, "tok123");
    assert_eq!(params.connection_id, "");
    assert!(!params.try_web_sockets);
}

#[tokio::test]
async fn negotiate_surfaces_undecodable_body() {
    let addr = spawn_negotiate_only(StatusCode::OK, "<html>nope</html>").await;
    let http = reqwest::Client::new();

    let err = negotiate(&http, "http", &addr.to_string()).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidJson(_)));
}

#[tokio::test]
async fn negotiate_surfaces_error_status() {
    let addr = spawn_negotiate_only(StatusCode::INTERNAL_SERVER_ERROR, "{}").await;
    let http = reqwest::Client::new();

    let err = negotiate(&http, "http", &addr.to_string()).await.unwrap_err();
    assert!(matches!(err, ClientError::Http(e) if e.status() == Some(reqwest::StatusCode::INTERNAL_SERVER_ERROR)));
}

#[tokio::test]
async fn negotiate_surfaces_network_failure() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let http = reqwest::Client::new();

    let err = negotiate(&http, "http", &addr.to_string()).await.unwrap_err();
    assert!(matches!(err, ClientError::Http(_)));
}
