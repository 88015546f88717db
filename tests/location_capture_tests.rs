use metro_cli::model::{CaptureEvent, CaptureOptions, Coordinates};
use metro_cli::{LocateError, LocationCapture};
use std::io::Write;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

fn options(port: Option<u16>, timeout: Duration) -> CaptureOptions {
    CaptureOptions {
        timeout,
        port,
        open_browser: false,
        ..CaptureOptions::default()
    }
}

fn http() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

/// Start a session and wait until its listener is bound. Returns the port and the session task.
async fn start(opts: CaptureOptions) -> (u16, JoinHandle<Result<Coordinates, LocateError>>) {
    let (evt_tx, mut evt_rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(LocationCapture::new(opts).run(Some(evt_tx)));
    match evt_rx.recv().await {
        Some(CaptureEvent::Listening { port, local_url, .. }) => {
            assert_eq!(local_url, format!("http://127.0.0.1:{port}/locate"));
            (port, handle)
        }
        other => panic!("expected Listening event, got {other:?}"),
    }
}

#[tokio::test]
async fn posted_coordinates_are_returned() {
    let started = Instant::now();
    let (port, handle) = start(options(Some(18923), Duration::from_secs(10))).await;
    assert_eq!(port, 18923);

    let resp = http()
        .post(format!("http://127.0.0.1:{port}/callback"))
        .header("Content-Type", "application/json")
        .body(r#"{"lat":48.860611,"lon":2.337644}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let coords = handle.await.unwrap().unwrap();
    assert_eq!(coords, Coordinates::new(48.860611, 2.337644));
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn capture_page_is_served_as_html() {
    let (port, handle) = start(options(Some(18924), Duration::from_secs(5))).await;

    let resp = http()
        .get(format!("http://127.0.0.1:{port}/locate"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let content_type = resp
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    assert!(content_type.contains("text/html"), "got {content_type}");
    let body = resp.text().await.unwrap();
    assert!(body.contains("/callback"));

    // Serving the page does not end the session.
    assert!(!handle.is_finished());
    http()
        .post(format!("http://127.0.0.1:{port}/callback"))
        .json(&serde_json::json!({ "lat": 1.5, "lon": -2.5 }))
        .send()
        .await
        .unwrap();
    assert_eq!(handle.await.unwrap().unwrap(), Coordinates::new(1.5, -2.5));
}

#[tokio::test]
async fn malformed_submission_fails_the_session() {
    let (port, handle) = start(options(Some(18925), Duration::from_secs(10))).await;

    let resp = http()
        .post(format!("http://127.0.0.1:{port}/callback"))
        .header("Content-Type", "application/json")
        .body(r#"{"lat":"x"}"#)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let err = handle.await.unwrap().unwrap_err();
    assert!(matches!(err, LocateError::Decode { .. }), "got {err:?}");
    assert!(err.to_string().starts_with("invalid location data received"));
}

#[tokio::test]
async fn out_of_range_submission_is_rejected() {
    let (port, handle) = start(options(Some(18926), Duration::from_secs(10))).await;

    let resp = http()
        .post(format!("http://127.0.0.1:{port}/callback"))
        .json(&serde_json::json!({ "lat": 123.0, "lon": 2.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    assert!(matches!(
        handle.await.unwrap(),
        Err(LocateError::Decode { .. })
    ));
}

#[tokio::test]
async fn callback_only_accepts_post() {
    let (port, handle) = start(options(Some(18927), Duration::from_secs(10))).await;
    let url = format!("http://127.0.0.1:{port}/callback");

    let resp = http().get(&url).send().await.unwrap();
    assert_eq!(resp.status(), 405);
    let resp = http().put(&url).body("{}").send().await.unwrap();
    assert_eq!(resp.status(), 405);
    assert!(!handle.is_finished());

    http()
        .post(&url)
        .json(&serde_json::json!({ "lat": 48.8566, "lon": 2.3522 }))
        .send()
        .await
        .unwrap();
    assert_eq!(
        handle.await.unwrap().unwrap(),
        Coordinates::new(48.8566, 2.3522)
    );
}

#[tokio::test]
async fn times_out_without_submission() {
    let started = Instant::now();
    let (_port, handle) = start(options(None, Duration::from_secs(2))).await;

    let err = handle.await.unwrap().unwrap_err();
    let elapsed = started.elapsed();
    assert!(matches!(err, LocateError::Timeout(d) if d == Duration::from_secs(2)));
    assert!(err.to_string().contains("did you allow browser location access"));
    assert!(elapsed >= Duration::from_secs(2), "failed early: {elapsed:?}");
    assert!(elapsed < Duration::from_secs(3), "failed late: {elapsed:?}");
}

#[tokio::test]
async fn listener_is_released_after_session() {
    let (port, handle) = start(options(Some(18928), Duration::from_secs(10))).await;
    http()
        .post(format!("http://127.0.0.1:{port}/callback"))
        .json(&serde_json::json!({ "lat": 10.0, "lon": 20.0 }))
        .send()
        .await
        .unwrap();
    handle.await.unwrap().unwrap();

    // The same fixed port is free for the next session.
    let (port, handle) = start(options(Some(18928), Duration::from_secs(10))).await;
    http()
        .post(format!("http://127.0.0.1:{port}/callback"))
        .json(&serde_json::json!({ "lat": 11.0, "lon": 21.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(handle.await.unwrap().unwrap(), Coordinates::new(11.0, 21.0));
}

#[tokio::test]
async fn ephemeral_port_is_reported() {
    let (port, handle) = start(options(None, Duration::from_secs(10))).await;
    assert_ne!(port, 0);
    http()
        .post(format!("http://127.0.0.1:{port}/callback"))
        .json(&serde_json::json!({ "lat": 0.0, "lon": 0.0 }))
        .send()
        .await
        .unwrap();
    assert_eq!(handle.await.unwrap().unwrap(), Coordinates::new(0.0, 0.0));
}

#[tokio::test]
async fn stalled_connection_does_not_undo_a_captured_location() {
    let mut opts = options(Some(18929), Duration::from_secs(10));
    opts.shutdown_grace = Duration::from_millis(500);
    let (port, handle) = start(opts).await;

    // A client that sent headers and stopped halfway through its body.
    let mut stalled = std::net::TcpStream::connect(("127.0.0.1", port)).unwrap();
    stalled
        .write_all(
            b"POST /callback HTTP/1.1\r\nHost: 127.0.0.1\r\n\
              Content-Type: application/json\r\nContent-Length: 64\r\n\r\n{\"lat\":",
        )
        .unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let posted = Instant::now();
    let resp = http()
        .post(format!("http://127.0.0.1:{port}/callback"))
        .json(&serde_json::json!({ "lat": 48.8738, "lon": 2.2950 }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let coords = handle.await.unwrap().unwrap();
    assert_eq!(coords, Coordinates::new(48.8738, 2.2950));
    let elapsed = posted.elapsed();
    assert!(elapsed < Duration::from_secs(2), "teardown took {elapsed:?}");
    drop(stalled);
}

#[tokio::test]
async fn late_post_after_success_cannot_change_the_result() {
    let (port, handle) = start(options(Some(18930), Duration::from_secs(10))).await;
    let url = format!("http://127.0.0.1:{port}/callback");

    let first = http()
        .post(&url)
        .json(&serde_json::json!({ "lat": 43.2965, "lon": 5.3698 }))
        .send()
        .await
        .unwrap();
    assert_eq!(first.status(), 200);
    // Either answered 200 and dropped, or refused once the listener is gone.
    if let Ok(second) = http()
        .post(&url)
        .json(&serde_json::json!({ "lat": 45.7640, "lon": 4.8357 }))
        .send()
        .await
    {
        assert_eq!(second.status(), 200);
    }

    assert_eq!(handle.await.unwrap().unwrap(), Coordinates::new(43.2965, 5.3698));
}

#[tokio::test]
async fn occupied_port_is_a_bind_error() {
    let taken = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
    let port = taken.local_addr().unwrap().port();

    let started = Instant::now();
    let err = LocationCapture::new(options(Some(port), Duration::from_secs(10)))
        .run(None)
        .await
        .unwrap_err();
    assert!(matches!(err, LocateError::Bind { .. }), "got {err:?}");
    assert!(err.to_string().starts_with("could not start the local location service"));
    assert!(started.elapsed() < Duration::from_secs(1));
}
