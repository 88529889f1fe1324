use crate::connection::SubscriberHandle;
use crate::error::ErrorKind;
use crate::hub::Hub;
use crate::transport::Transport;
use log::*;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Spawn the delivery worker for one subscriber.
pub fn spawn<T>(hub: Arc<Hub>, handle: SubscriberHandle, transport: T) -> JoinHandle<()>
where
    T: Transport + 'static,
{
    tokio::spawn(run(hub, handle, transport))
}

/// Drain `handle`'s queue into `transport` until the subscriber closes.
///
/// - A failed write closes the subscriber with `TransportWriteFailed` and
///   unsubscribes it; the hub never retries, reconnecting is up to the client.
/// - A frame that cannot be encoded closes the subscriber with `EncodingFailed`
///   rather than leaving a silent gap.
/// - A transport that closes while the worker is idle means the client went
///   away: the subscriber is unsubscribed and its queue released.
/// - After `unsubscribe` the worker delivers what is still queued, then exits.
///   A write stalled for longer than the hub's `drain_timeout` while draining
///   ends the stream.
/// - A subscriber closed by the hub (queue overflow) ends the stream at once,
///   even while a write is in progress.
pub async fn run<T: Transport>(hub: Arc<Hub>, handle: SubscriberHandle, mut transport: T) {
    debug!("Delivery worker started for subscriber {}", handle.id());

    loop {
        let frame = tokio::select! {
            frame = handle.recv() => frame,
            _ = transport.closed() => {
                debug!("Transport closed for subscriber {}", handle.id());
                hub.unsubscribe(&handle);
                handle.subscriber().close(None);
                break;
            }
        };

        let Some(frame) = frame else {
            break;
        };

        let data = match frame.encode() {
            Ok(data) => data,
            Err(e) => {
                error!("Failed to serialize frame for subscriber {}: {e}", handle.id());
                fail(&hub, &handle, ErrorKind::EncodingFailed);
                break;
            }
        };

        let written = tokio::select! {
            result = transport.send(data) => result,
            forced = stop_requested(&hub, &handle) => {
                match forced {
                    Some(error_kind) => {
                        debug!("Subscriber {} closed during a write: {error_kind}", handle.id());
                        hub.unsubscribe(&handle);
                    }
                    None => {
                        warn!(
                            "Subscriber {} stalled for {:?} while draining, closing it",
                            handle.id(),
                            hub.config().drain_timeout
                        );
                        fail(&hub, &handle, ErrorKind::TransportWriteFailed);
                    }
                }
                break;
            }
        };

        if let Err(e) = written {
            warn!(
                "Failed to deliver to subscriber {}: {e}. Connection will be closed.",
                handle.id()
            );
            fail(&hub, &handle, ErrorKind::TransportWriteFailed);
            break;
        }
    }

    debug!(
        "Delivery worker exiting for subscriber {} ({:?})",
        handle.id(),
        handle.state()
    );
}

/// Resolves once an in-flight write should be abandoned.
///
/// A subscriber the hub closed with an error (queue overflow) stops at once with
/// that error. One that is draining, or closed by unsubscribe, gets `drain_timeout`
/// to finish the write and then resolves with `None`.
async fn stop_requested(hub: &Hub, handle: &SubscriberHandle) -> Option<ErrorKind> {
    handle.subscriber().deactivated().await;
    if let Some(error_kind) = handle.last_error() {
        return Some(error_kind);
    }
    tokio::time::sleep(hub.config().drain_timeout).await;
    None
}

fn fail(hub: &Hub, handle: &SubscriberHandle, error_kind: ErrorKind) {
    handle.subscriber().close(Some(error_kind));
    hub.unsubscribe(handle);
}
