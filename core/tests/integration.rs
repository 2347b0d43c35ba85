//! End-to-end tests against the mock server over real HTTP.
//!
//! # Design
//! Each test starts its own mock server router on a random port on a
//! background tokio runtime, then drives the blocking client against it
//! with the default ureq transport.

use std::net::SocketAddr;
use std::thread;
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use axum::Router;
use jsonstore::{CancellationToken, Client, Context, Error, TransportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TestData {
    #[serde(rename = "Foo")]
    foo: i64,
    #[serde(rename = "Bar")]
    bar: bool,
    #[serde(rename = "Baz")]
    baz: String,
}

/// Serve `router` on an ephemeral port from a background thread.
fn spawn(router: Router) -> SocketAddr {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::serve(listener, router).await
        })
        .unwrap();
    });

    addr
}

fn client_for(addr: SocketAddr) -> Client {
    Client::builder()
        .base_url(format!("http://{addr}"))
        .build()
        .unwrap()
}

fn ctx() -> Context {
    Context::background()
}

#[test]
fn document_round_trip() {
    let client = client_for(spawn(mock_server::app()));
    let key = "test";

    let original = TestData {
        foo: 123,
        bar: false,
        baz: "abc".to_string(),
    };
    client.post(&ctx(), key, &original).unwrap();

    let fetched: TestData = client.get(&ctx(), key).unwrap();
    assert_eq!(fetched, original);

    client.put(&ctx(), &format!("{key}/Baz"), "cde").unwrap();
    let fetched: TestData = client.get(&ctx(), key).unwrap();
    assert_eq!(
        fetched,
        TestData {
            baz: "cde".to_string(),
            ..original
        }
    );

    let baz: String = client.get(&ctx(), "/test/Baz").unwrap();
    assert_eq!(baz, "cde");

    client.delete(&ctx(), key).unwrap();
    assert!(matches!(client.get::<TestData>(&ctx(), key), Err(Error::NotFound)));
    assert!(matches!(client.delete(&ctx(), key), Err(Error::NotFound)));
}

#[test]
fn secrets_are_isolated() {
    let addr = spawn(mock_server::app());
    let alice = client_for(addr);
    let bob = client_for(addr);
    assert_ne!(alice.secret(), bob.secret());

    alice.post(&ctx(), "key", &1).unwrap();
    assert!(matches!(bob.get::<i64>(&ctx(), "key"), Err(Error::NotFound)));
    assert_eq!(alice.get::<i64>(&ctx(), "key").unwrap(), 1);
}

#[test]
fn get_unwraps_result() {
    let addr = spawn(mock_server::fixed_status(StatusCode::OK, r#"{"result": 6543}"#));
    let value: i64 = client_for(addr).get(&ctx(), "").unwrap();
    assert_eq!(value, 6543);
}

#[test]
fn writes_ignore_response_body() {
    let addr = spawn(mock_server::fixed_status(StatusCode::OK, "<html>fine</html>"));
    let client = client_for(addr);
    client.post(&ctx(), "key", &"value").unwrap();
    client.put(&ctx(), "key", &"value").unwrap();
    client.delete(&ctx(), "key").unwrap();
}

#[test]
fn statuses_map_to_errors_for_every_verb() {
    for (status, expected) in [
        (StatusCode::NOT_FOUND, "NotFound"),
        (StatusCode::INTERNAL_SERVER_ERROR, "InternalServerError"),
        (StatusCode::IM_A_TEAPOT, "UnexpectedStatus(418)"),
        (StatusCode::NO_CONTENT, "UnexpectedStatus(204)"),
    ] {
        let client = client_for(spawn(mock_server::fixed_status(status, "")));
        let errors = [
            client.get::<i64>(&ctx(), "key").unwrap_err(),
            client.post(&ctx(), "key", &1).unwrap_err(),
            client.put(&ctx(), "key", &1).unwrap_err(),
            client.delete(&ctx(), "key").unwrap_err(),
        ];
        for err in errors {
            assert!(err.is_status(), "{status}: {err:?}");
            assert_eq!(format!("{err:?}"), expected, "{status}");
        }
    }
}

#[test]
fn bad_envelope_is_decode_error() {
    let addr = spawn(mock_server::fixed_status(StatusCode::OK, r#"{"test": 6543}"#));
    let err = client_for(addr).get::<i64>(&ctx(), "").unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "{err:?}");
}

#[test]
fn requests_carry_headers_and_target_url() {
    let client = client_for(spawn(mock_server::echo()));

    for path in ["", "key", "/key/field", "nested/deeper/still"] {
        let seen: Value = client.get(&ctx(), path).unwrap();
        assert_eq!(seen["method"], "GET");
        assert_eq!(seen["path"], client.url(&[path]).path(), "{path:?}");
        assert_eq!(seen["headers"]["accept"], "application/json");
        assert_eq!(seen["headers"]["content-type"], "application/json");
        assert_eq!(seen["headers"]["user-agent"], client.user_agent());
    }

    assert_eq!(
        client.url(&["key", "field"]).path(),
        format!("/{}/key/field", client.secret())
    );
}

#[test]
fn concurrent_use_from_many_threads() {
    let client = client_for(spawn(mock_server::app()));

    let handles: Vec<_> = (0..16)
        .map(|i| {
            let client = client.clone();
            thread::spawn(move || {
                let key = format!("key{i}");
                client.post(&ctx(), &key, &i).unwrap();
                client.get::<i64>(&ctx(), &key).unwrap()
            })
        })
        .collect();

    for (i, handle) in handles.into_iter().enumerate() {
        assert_eq!(handle.join().unwrap(), i as i64);
    }

    let all: Value = client.get(&ctx(), "").unwrap();
    assert_eq!(all.as_object().unwrap().len(), 16);
}

#[test]
fn deadline_aborts_stalled_request() {
    // Accepts connections in the kernel backlog but never answers.
    let stalled = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = stalled.local_addr().unwrap();

    let client = client_for(addr);
    let ctx = Context::background().with_timeout(Duration::from_millis(200));
    let err = client.get::<i64>(&ctx, "key").unwrap_err();
    assert!(
        matches!(err, Error::Transport(TransportError::DeadlineExceeded)),
        "{err:?}"
    );
    drop(stalled);
}

#[test]
fn cancel_aborts_stalled_request() {
    let stalled = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = stalled.local_addr().unwrap();

    let client = Client::builder()
        .base_url(format!("http://{addr}"))
        .timeout(Duration::from_secs(3))
        .build()
        .unwrap();
    let token = CancellationToken::new();
    let canceller = {
        let token = token.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(100));
            token.cancel();
        })
    };

    let started = Instant::now();
    let ctx = Context::background().with_cancellation(token);
    let err = client.get::<i64>(&ctx, "key").unwrap_err();
    let elapsed = started.elapsed();

    assert!(
        matches!(err, Error::Transport(TransportError::Cancelled)),
        "{err:?}"
    );
    assert!(elapsed < Duration::from_secs(1), "took {elapsed:?}");
    canceller.join().unwrap();
    drop(stalled);
}

#[test]
fn sub_second_timeout_reaches_server() {
    let addr = spawn(mock_server::fixed_status(StatusCode::OK, r#"{"result": 1}"#));
    let client = Client::builder()
        .base_url(format!("http://{addr}"))
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    assert_eq!(client.get::<i64>(&ctx(), "key").unwrap(), 1);
}

#[test]
fn connection_failure_passes_through() {
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let err = client_for(addr).delete(&ctx(), "key").unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::Http(_))), "{err:?}");
    assert!(!err.is_status());
}
