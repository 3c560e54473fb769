//! Hub client counterpart: connects to `/notificationHub`, keeps the
//! connection alive across drops, and rebuilds group membership from scratch
//! after every reconnect.
//!
//! Received events are forwarded to the application through a channel; the
//! one event that drives the client itself is a forced logout (or a
//! deactivation matching the client's own account), which ends the session
//! instead of reconnecting.

pub mod reconnect;

use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::hub::events::ServerEvent;
use crate::hub::protocol::ClientRequest;

pub use reconnect::{HubClientState, Memberships, RetryPolicy};

type Transport = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Everything the hub client surfaces to the application.
#[derive(Debug)]
pub enum HubClientNotice {
    /// Lifecycle transition (connecting, connected, reconnecting, ...).
    State(HubClientState),
    /// A server-pushed event for the application to render.
    Event(ServerEvent),
    /// The session was ended remotely; the client has stopped.
    SessionEnded { reason: String },
}

#[derive(Debug, Clone)]
pub struct HubClientConfig {
    /// Full ws:// URL of the hub endpoint, including any session token.
    pub url: String,
    pub memberships: Memberships,
    pub retry: RetryPolicy,
}

/// Handle to a running hub client task.
pub struct HubClient {
    shutdown_tx: watch::Sender<bool>,
    handle: tokio::task::JoinHandle<()>,
}

impl HubClient {
    /// Spawn the client task. Notices (state changes and events) arrive on
    /// the returned receiver until the client stops.
    pub fn start(config: HubClientConfig) -> (Self, mpsc::UnboundedReceiver<HubClientNotice>) {
        let (notice_tx, notice_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run(config, notice_tx, shutdown_rx));
        (
            Self {
                shutdown_tx,
                handle,
            },
            notice_rx,
        )
    }

    /// Page-exit path: best-effort leaves for page-scoped groups, then close.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(true);
        let _ = self.handle.await;
    }
}

/// Why one connected session ended, deciding what the outer loop does next.
enum SessionOutcome {
    /// Transport dropped — reconnect.
    Dropped,
    /// Local shutdown — stop cleanly.
    Shutdown,
    /// Forced logout / own-account deactivation — stop, no reconnect.
    Ended { reason: String },
}

async fn run(
    config: HubClientConfig,
    notices: mpsc::UnboundedSender<HubClientNotice>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut state = HubClientState::Disconnected;
    let mut attempt = 0usize;

    loop {
        let next = if state == HubClientState::Connected || state == HubClientState::Reconnecting {
            HubClientState::Reconnecting
        } else {
            HubClientState::Connecting
        };
        set_state(&notices, &mut state, next);

        match connect_async(config.url.as_str()).await {
            Ok((mut transport, _)) => {
                attempt = 0;
                set_state(&notices, &mut state, HubClientState::Connected);

                // Membership never survives a reconnect: always re-register
                // the full set before anything else. A send failure here is
                // treated like a drop and falls through to the backoff.
                if register_memberships(&mut transport, &config.memberships)
                    .await
                    .is_ok()
                {
                    match run_session(&mut transport, &config, &notices, &mut shutdown).await {
                        SessionOutcome::Dropped => {
                            // Fall through to reconnect
                        }
                        SessionOutcome::Shutdown => {
                            set_state(&notices, &mut state, HubClientState::Disconnected);
                            return;
                        }
                        SessionOutcome::Ended { reason } => {
                            set_state(&notices, &mut state, HubClientState::Disconnected);
                            let _ = notices.send(HubClientNotice::SessionEnded { reason });
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Hub connect attempt failed");
            }
        }

        // Transport down: wait out the retry schedule or give up.
        match config.retry.delay_for(attempt) {
            Some(delay) => {
                attempt += 1;
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => {
                        set_state(&notices, &mut state, HubClientState::Disconnected);
                        return;
                    }
                }
            }
            None => {
                set_state(&notices, &mut state, HubClientState::GaveUp);
                return;
            }
        }
    }
}

fn set_state(
    notices: &mpsc::UnboundedSender<HubClientNotice>,
    state: &mut HubClientState,
    next: HubClientState,
) {
    if *state != next {
        *state = next;
        let _ = notices.send(HubClientNotice::State(next));
    }
}

async fn send_request(
    transport: &mut Transport,
    request: &ClientRequest,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    match serde_json::to_string(request) {
        Ok(payload) => transport.send(Message::Text(payload.into())).await,
        Err(_) => Ok(()),
    }
}

async fn register_memberships(
    transport: &mut Transport,
    memberships: &Memberships,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    for request in memberships.registration_requests() {
        send_request(transport, &request).await?;
    }
    Ok(())
}

/// Pump one connected session: forward events, answer pings, watch for the
/// session-ending events and the local shutdown signal.
async fn run_session(
    transport: &mut Transport,
    config: &HubClientConfig,
    notices: &mpsc::UnboundedSender<HubClientNotice>,
    shutdown: &mut watch::Receiver<bool>,
) -> SessionOutcome {
    loop {
        tokio::select! {
            _ = shutdown.changed() => {
                for request in config.memberships.leave_requests() {
                    let _ = send_request(transport, &request).await;
                }
                let _ = transport.close(None).await;
                return SessionOutcome::Shutdown;
            }
            msg = transport.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let Ok(event) = serde_json::from_str::<ServerEvent>(&text) else {
                        // Acks and error replies share the channel; skip them.
                        continue;
                    };
                    if let Some(reason) = session_ending_reason(&event, &config.memberships) {
                        let _ = notices.send(HubClientNotice::Event(event));
                        let _ = transport.close(None).await;
                        return SessionOutcome::Ended { reason };
                    }
                    let _ = notices.send(HubClientNotice::Event(event));
                }
                Some(Ok(Message::Ping(data))) => {
                    let _ = transport.send(Message::Pong(data)).await;
                }
                Some(Ok(Message::Close(_))) | None => {
                    return SessionOutcome::Dropped;
                }
                Some(Err(e)) => {
                    tracing::debug!(error = %e, "Hub client receive error");
                    return SessionOutcome::Dropped;
                }
                Some(Ok(_)) => {}
            }
        }
    }
}

/// A forced logout always ends the session; a deactivation only when it
/// names this client's own account.
fn session_ending_reason(event: &ServerEvent, memberships: &Memberships) -> Option<String> {
    match event {
        ServerEvent::ForceLogout { reason } => Some(reason.clone()),
        ServerEvent::AccountDeactivated { account_id } => {
            if memberships.account_id.as_deref() == Some(account_id.as_str()) {
                Some("account_deactivated".to_string())
            } else {
                None
            }
        }
        _ => None,
    }
}
