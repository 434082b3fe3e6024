//! Per-slot lifecycle task.
//!
//! Each slot runs its own task through the
//! `Connecting -> Open -> Reconnecting` cycle. All waits race against
//! the pool's cancellation token, so shutdown can never be resurrected
//! by a late timer.

use crate::pool::{PoolEvent, Shared};
use crate::transport::{Channel, ChannelEvent, Connector, Transport};
use crate::{PoolConfig, ReplayStore};
use std::sync::Arc;
use tickmesh_types::SlotIndex;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

pub(crate) async fn run_slot(
    slot: SlotIndex,
    config: PoolConfig,
    connector: Arc<dyn Connector>,
    shared: Arc<Shared>,
    replay: Arc<ReplayStore>,
    cancel: CancellationToken,
) {
    let mut failures: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return;
        }

        // Connecting: the attempt window grows with the failure streak.
        let window = config.min_attempt_window + config.backoff_step * failures;
        let channel = tokio::select! {
            _ = cancel.cancelled() => return,
            outcome = tokio::time::timeout(window, connector.connect(slot)) => match outcome {
                Ok(Ok(channel)) => Some(channel),
                Ok(Err(error)) => {
                    debug!(%slot, %error, "handshake failed");
                    None
                }
                Err(_) => {
                    debug!(%slot, "connection attempt window elapsed");
                    None
                }
            },
        };

        if let Some(channel) = channel {
            failures = 0;
            serve(slot, &config, &shared, &replay, &cancel, channel).await;
            if cancel.is_cancelled() {
                return;
            }
        }

        // Reconnecting: linear backoff, reset to one step after a
        // successful open.
        failures += 1;
        let delay = config.backoff_step * failures;
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
    }
}

/// Serve one open channel until it closes, goes silent, rotates out or
/// the pool shuts down.
async fn serve(
    slot: SlotIndex,
    config: &PoolConfig,
    shared: &Shared,
    replay: &ReplayStore,
    cancel: &CancellationToken,
    channel: Channel,
) {
    let transport: Arc<dyn Transport> = Arc::from(channel.transport);
    let mut events = channel.events;

    let count = shared.install(slot, transport.clone());
    shared.emit(PoolEvent::Peers(count)).await;
    info!(%slot, peers = count, "peer connected");

    // Bootstrap the fresh peer with the cached committee and ticks.
    for message in replay.snapshot() {
        let _ = transport.send(message);
    }

    // The last slot is rotated out after a maximum lifetime even when
    // healthy.
    let rotating = slot.0 == config.slots - 1;
    let rotation = tokio::time::sleep(config.rotation_lifetime);
    tokio::pin!(rotation);
    let inactivity = tokio::time::sleep(config.inactivity_window);
    tokio::pin!(inactivity);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                transport.close();
                break;
            }
            _ = &mut inactivity => {
                debug!(%slot, "closing silent channel");
                transport.close();
                break;
            }
            _ = &mut rotation, if rotating => {
                debug!(%slot, "rotating healthy channel");
                transport.close();
                break;
            }
            event = events.recv() => match event {
                Some(ChannelEvent::Message(bytes)) => {
                    inactivity.as_mut().reset(Instant::now() + config.inactivity_window);
                    shared.emit(PoolEvent::Message { slot, bytes }).await;
                }
                Some(ChannelEvent::Closed) | None => break,
            },
        }
    }

    let count = shared.remove(slot);
    shared.emit(PoolEvent::Peers(count)).await;
    info!(%slot, peers = count, "peer disconnected");
}
