//! HTTP routes of a capture session.
//!
//! `GET /locate` serves the capture page; `POST /callback` decodes the posted
//! coordinates and hands them to the session through single-slot mailboxes.

use super::page::{CALLBACK_PATH, CAPTURE_PAGE, PAGE_PATH};
use crate::error::LocateError;
use crate::model::Coordinates;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::{get, post};
use axum::Router;
use bytes::Bytes;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

/// Producer side of the session mailboxes, shared by all connection tasks.
#[derive(Clone)]
pub(crate) struct Mailboxes {
    pub result_tx: mpsc::Sender<Coordinates>,
    pub error_tx: mpsc::Sender<LocateError>,
}

/// Consumer side, owned by the session.
pub(crate) struct Outcomes {
    pub result_rx: mpsc::Receiver<Coordinates>,
    pub error_rx: mpsc::Receiver<LocateError>,
}

/// Capacity-one mailboxes: the first value of each kind is the one that counts.
pub(crate) fn mailboxes() -> (Mailboxes, Outcomes) {
    let (result_tx, result_rx) = mpsc::channel(1);
    let (error_tx, error_rx) = mpsc::channel(1);
    (
        Mailboxes {
            result_tx,
            error_tx,
        },
        Outcomes {
            result_rx,
            error_rx,
        },
    )
}

impl Mailboxes {
    /// Deliver without waiting. A full or closed mailbox means the session already
    /// has an outcome, so the late value is dropped.
    pub(crate) fn deliver_error(&self, err: LocateError) {
        if let Err(e) = self.error_tx.try_send(err) {
            let dropped = match e {
                TrySendError::Full(v) | TrySendError::Closed(v) => v,
            };
            tracing::debug!(error = %dropped, "dropping late session error");
        }
    }

    fn deliver_result(&self, coords: Coordinates) {
        if let Err(e) = self.result_tx.try_send(coords) {
            let dropped = match e {
                TrySendError::Full(v) | TrySendError::Closed(v) => v,
            };
            tracing::debug!(coords = %dropped, "dropping late location submission");
        }
    }
}

pub(crate) fn router(mailboxes: Mailboxes) -> Router {
    Router::new()
        .route(PAGE_PATH, get(capture_page))
        .route(CALLBACK_PATH, post(callback))
        .with_state(mailboxes)
}

async fn capture_page() -> impl IntoResponse {
    tracing::debug!("serving capture page");
    (
        [(header::CACHE_CONTROL, "no-store")],
        Html(CAPTURE_PAGE),
    )
}

async fn callback(State(mailboxes): State<Mailboxes>, body: Bytes) -> impl IntoResponse {
    match decode_submission(&body) {
        Ok(coords) => {
            tracing::debug!(%coords, "received location submission");
            mailboxes.deliver_result(coords);
            (StatusCode::OK, "ok")
        }
        Err(message) => {
            tracing::debug!(%message, "rejecting location submission");
            mailboxes.deliver_error(LocateError::Decode { message });
            (StatusCode::BAD_REQUEST, "bad payload")
        }
    }
}

/// Parse a `{"lat": number, "lon": number}` body into in-range coordinates.
pub(crate) fn decode_submission(body: &[u8]) -> Result<Coordinates, String> {
    let coords: Coordinates = serde_json::from_slice(body).map_err(|e| e.to_string())?;
    if !coords.is_valid() {
        return Err(format!("coordinates out of range ({coords})"));
    }
    Ok(coords)
}
