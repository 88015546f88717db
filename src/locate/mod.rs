//! Browser-based location capture.
//!
//! A capture session binds a listener, serves the capture page on it in a
//! background task, points the user's browser at it, and waits for the first of:
//! a coordinate submission, a malformed submission, or the deadline. The
//! listener never outlives the session.

pub mod address;
pub mod browser;
mod page;
mod server;

use crate::error::LocateError;
use crate::model::{CaptureEvent, CaptureOptions, Coordinates};
use std::net::{Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;

pub use page::{CALLBACK_PATH, PAGE_PATH};

/// One-shot location capture. Consumed by [`LocationCapture::run`].
pub struct LocationCapture {
    opts: CaptureOptions,
}

/// A running endpoint set and the handle used to stop it.
struct ServerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl LocationCapture {
    pub fn new(opts: CaptureOptions) -> Self {
        Self { opts }
    }

    /// Run the capture session to completion.
    ///
    /// Progress is reported on `event_tx` when given; a dropped receiver is ignored.
    pub async fn run(
        self,
        event_tx: Option<mpsc::UnboundedSender<CaptureEvent>>,
    ) -> Result<Coordinates, LocateError> {
        let deadline = Instant::now() + self.opts.timeout;
        let emit = |ev: CaptureEvent| {
            if let Some(tx) = event_tx.as_ref() {
                let _ = tx.send(ev);
            }
        };

        let port = self.opts.port.unwrap_or(0);
        let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| LocateError::Bind {
                addr: bind_addr.to_string(),
                source,
            })?;
        let port = listener
            .local_addr()
            .map_err(|source| LocateError::Bind {
                addr: bind_addr.to_string(),
                source,
            })?
            .port();

        let (mailboxes, mut outcomes) = server::mailboxes();
        let server = spawn_server(listener, mailboxes);
        tracing::info!(port, "location capture listening");

        let local_url = address::local_url(port, PAGE_PATH);
        let lan_url = address::lan_url(address::lan_ip(), port, PAGE_PATH);
        emit(CaptureEvent::Listening {
            port,
            local_url: local_url.clone(),
            lan_url,
        });

        if self.opts.open_browser {
            let opened = match browser::open_url(&local_url) {
                Ok(()) => true,
                Err(e) => {
                    tracing::debug!(error = %e, "could not open a browser");
                    false
                }
            };
            emit(CaptureEvent::BrowserLaunch { opened });
        }

        let outcome = tokio::select! {
            Some(coords) = outcomes.result_rx.recv() => Ok(coords),
            Some(err) = outcomes.error_rx.recv() => Err(err),
            _ = tokio::time::sleep_until(deadline) => Err(LocateError::Timeout(self.opts.timeout)),
        };

        match &outcome {
            Ok(coords) => {
                tracing::info!(%coords, "location captured");
                server.shutdown(self.opts.shutdown_grace).await;
            }
            Err(e) => {
                tracing::info!(error = %e, "location capture failed");
                server.close().await;
            }
        }
        outcome
    }
}

fn spawn_server(listener: TcpListener, mailboxes: server::Mailboxes) -> ServerHandle {
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let app = server::router(mailboxes.clone());
    let task = tokio::spawn(async move {
        let served = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
        if let Err(e) = served {
            mailboxes.deliver_error(LocateError::Serve(e));
        }
    });
    ServerHandle { shutdown_tx, task }
}

impl ServerHandle {
    /// Stop accepting and let in-flight responses finish, for at most `grace`.
    async fn shutdown(self, grace: std::time::Duration) {
        let ServerHandle {
            shutdown_tx,
            mut task,
        } = self;
        let _ = shutdown_tx.send(());
        if tokio::time::timeout(grace, &mut task).await.is_err() {
            tracing::warn!(?grace, "graceful shutdown overran, closing listener");
            task.abort();
        }
    }

    /// Drop the listener immediately, without draining connections.
    async fn close(self) {
        self.task.abort();
        let _ = self.task.await;
    }
}
