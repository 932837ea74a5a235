use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::{
    broadcast::{self, error::RecvError},
    mpsc,
};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::{
    dto::sse::{Handshake, ServerEvent, SystemStatus},
    error::ServiceError,
    overlay::presenter::PRESENT_EVENT,
    services::feed,
    state::SharedState,
};

const HANDSHAKE_EVENT: &str = "handshake";
const SYSTEM_EVENT: &str = "system";

/// Attach a renderer: subscribe first, then queue the handshake and the
/// current scene so nothing broadcast in between is lost.
pub fn subscribe_overlay(
    state: &SharedState,
) -> Result<(broadcast::Receiver<ServerEvent>, Vec<ServerEvent>), ServiceError> {
    let overlay = state.overlay()?;
    let receiver = overlay.presenter.hub().subscribe();

    let mut initial = Vec::new();
    let handshake = Handshake {
        table: state.config().binding.table.clone(),
        cards: state.config().params.cards,
        degraded: state.is_degraded(),
    };
    match ServerEvent::json(HANDSHAKE_EVENT.to_string(), &handshake) {
        Ok(event) => initial.push(event),
        Err(err) => warn!(error = %err, "failed to encode renderer handshake"),
    }
    for command in overlay.presenter.scene() {
        match ServerEvent::json(PRESENT_EVENT.to_string(), &command) {
            Ok(event) => initial.push(event),
            Err(err) => warn!(error = %err, ?command, "failed to encode scene replay"),
        }
    }
    debug!(replayed = initial.len(), "renderer attached");

    spawn_resync(state.clone());
    Ok((receiver, initial))
}

/// Refresh the overlay from the store in the background.
fn spawn_resync(state: SharedState) {
    tokio::spawn(async move {
        let Some(store) = state.store().await else {
            debug!("skipping renderer resync in degraded mode");
            return;
        };
        let Ok(overlay) = state.overlay() else {
            return;
        };
        let binding = &state.config().binding;
        if let Err(err) = feed::resync(store.as_ref(), binding, &overlay.handle).await {
            warn!(error = %err, "renderer resync failed");
        }
    });
}

/// Broadcast degraded mode changes to attached renderers until the process stops.
pub async fn announce_degraded(state: SharedState) {
    let Ok(overlay) = state.overlay() else {
        return;
    };
    let mut watcher = state.degraded_watcher();
    while watcher.changed().await.is_ok() {
        let degraded = *watcher.borrow_and_update();
        info!(degraded, "degraded mode changed");
        match ServerEvent::json(SYSTEM_EVENT.to_string(), &SystemStatus { degraded }) {
            Ok(event) => overlay.presenter.hub().broadcast(event),
            Err(err) => warn!(error = %err, "failed to encode system status"),
        }
    }
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Convert a broadcast receiver into an SSE response, sending `initial`
/// first and forwarding events until the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<ServerEvent>,
    initial: Vec<ServerEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    tokio::spawn(async move {
        for payload in initial {
            if tx.send(Ok(to_event(payload))).await.is_err() {
                return;
            }
        }

        loop {
            tokio::select! {
                _ = tx.closed() => break,
                recv_result = receiver.recv() => {
                    match recv_result {
                        Ok(payload) => {
                            if tx.send(Ok(to_event(payload))).await.is_err() {
                                break;
                            }
                        }
                        Err(RecvError::Closed) => break,
                        Err(RecvError::Lagged(skipped)) => {
                            debug!(skipped, "renderer stream lagged");
                            continue;
                        }
                    }
                }
            }
        }

        info!("renderer SSE stream disconnected");
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
