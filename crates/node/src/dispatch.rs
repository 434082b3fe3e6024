//! Single-consumer message dispatch.
//!
//! Every slot's inbound payloads funnel into one dispatch task that
//! owns the consensus tracker and drives the propagation engine. The
//! shared engine and verifier are behind locks because the transaction
//! broadcaster touches them from other tasks; the tracker has exactly
//! one writer, this loop.

use crate::{NodeConfig, NodeEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tickmesh_consensus::{Action, ConsensusTracker, FinalizedTick};
use tickmesh_gossip::PropagationEngine;
use tickmesh_messages::{Header, MessageType, TickView, TransactionView};
use tickmesh_pool::{ChannelPool, PoolEvent};
use tickmesh_restest::ResourceTester;
use tickmesh_types::{Epoch, Hash, MemberIndex, SlotIndex, TickNumber};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Control-plane commands from the owning application.
///
/// These are the runtime hooks of the reputation cutover: the consensus
/// tracker and verifier are owned by the dispatch loop, so mutations
/// funnel through the same single consumer as inbound messages.
pub(crate) enum Command {
    MarkTerminated(Epoch),
    SetMinScore(u32),
    SetResourceTestParams(tickmesh_restest::ResourceTestParams),
}

pub(crate) struct Dispatcher {
    pub(crate) config: NodeConfig,
    pub(crate) pool: Arc<ChannelPool>,
    pub(crate) engine: Arc<Mutex<PropagationEngine>>,
    pub(crate) tester: Arc<Mutex<ResourceTester>>,
    pub(crate) tracker: ConsensusTracker,
    pub(crate) events: broadcast::Sender<NodeEvent>,
    pub(crate) finalized: watch::Sender<TickNumber>,
    pub(crate) cancel: CancellationToken,
    pub(crate) started: Instant,
    pub(crate) recent_ticks: HashMap<MemberIndex, Vec<u8>>,
    pub(crate) replay_epoch: Epoch,
}

impl Dispatcher {
    pub(crate) async fn run(
        mut self,
        mut pool_events: mpsc::Receiver<PoolEvent>,
        mut commands: mpsc::Receiver<Command>,
    ) {
        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                event = pool_events.recv() => match event {
                    Some(PoolEvent::Peers(count)) => {
                        let _ = self.events.send(NodeEvent::Peers(count));
                    }
                    Some(PoolEvent::Message { slot, bytes }) => {
                        self.on_message(slot, bytes).await;
                    }
                    None => break,
                },
                command = commands.recv() => match command {
                    Some(Command::MarkTerminated(epoch)) => {
                        self.tracker.mark_terminated(epoch);
                    }
                    Some(Command::SetMinScore(min_score)) => {
                        self.tracker.set_min_score(min_score);
                    }
                    Some(Command::SetResourceTestParams(params)) => {
                        if let Err(error) = self.tester.lock().set_params(params) {
                            warn!(%error, "rejected resource-test reconfiguration");
                        }
                    }
                    None => break,
                },
            }
        }
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    async fn on_message(&mut self, slot: SlotIndex, bytes: Vec<u8>) {
        let header = match Header::parse(&bytes) {
            Ok(header) => header,
            Err(error) => return self.violation(slot, &error.to_string()),
        };
        if let Err(error) = header.validate(&bytes, self.config.protocol) {
            return self.violation(slot, &error.to_string());
        }

        let _ = self.events.send(NodeEvent::Message(bytes.clone()));

        match header.message_type() {
            Some(MessageType::Committee) => self.on_committee(slot, bytes),
            Some(MessageType::Tick) => self.on_tick(slot, bytes),
            Some(MessageType::ResourceTestSolution) => self.on_solution(slot, bytes).await,
            Some(MessageType::Transaction) => self.on_transaction(slot, bytes),
            // Peer exchange belongs to the handshake collaborator;
            // unknown codes are ignored without prejudice.
            Some(MessageType::ExchangePeers) | None => {}
        }
    }

    /// Protocol violations all resolve the same way: drop the peer and
    /// let the slot reconnect with backoff.
    fn violation(&mut self, slot: SlotIndex, reason: &str) {
        debug!(%slot, reason, "protocol violation, dropping peer");
        self.tracker.forget_slot(slot);
        self.pool.disconnect(slot);
    }

    fn on_committee(&mut self, slot: SlotIndex, bytes: Vec<u8>) {
        for action in self.tracker.on_committee(&bytes, Some(slot)) {
            match action {
                Action::Propagate => {
                    let targets = self.engine.lock().propagate_committee(
                        Some(slot),
                        &self.pool.open_slots(),
                        self.now(),
                    );
                    for target in targets {
                        self.pool.send(target, bytes.clone());
                    }
                }
                Action::Disconnect => self.violation(slot, "committee rejected"),
                Action::ClearSolutionState => {
                    self.engine.lock().clear_solutions();
                    self.tester.lock().reset();
                }
                Action::EmitAlignment(event) => {
                    self.pool.replay_store().set_committee(bytes.clone());
                    if event.epoch != self.replay_epoch {
                        // Cached ticks belong to the previous epoch.
                        self.replay_epoch = event.epoch;
                        self.recent_ticks.clear();
                        self.pool.replay_store().set_ticks(Vec::new());
                    }
                    let _ = self.events.send(NodeEvent::Committee(event));
                }
                Action::EmitFinalizedTick(record) => self.finalize(record),
            }
        }
    }

    fn on_tick(&mut self, slot: SlotIndex, bytes: Vec<u8>) {
        for action in self.tracker.on_tick(&bytes) {
            match action {
                Action::Propagate => {
                    // The tracker only asks for propagation after the
                    // view parsed and the member signature verified.
                    let Ok(view) = TickView::parse(&bytes) else {
                        return;
                    };
                    let targets = self.engine.lock().propagate_tick(
                        Some(slot),
                        view.member_index(),
                        view.tick(),
                        &self.pool.open_slots(),
                        self.now(),
                    );
                    for target in targets {
                        self.pool.send(target, bytes.clone());
                    }
                    self.recent_ticks.insert(view.member_index(), bytes.clone());
                }
                Action::Disconnect => self.violation(slot, "tick rejected"),
                Action::EmitFinalizedTick(record) => self.finalize(record),
                Action::ClearSolutionState | Action::EmitAlignment(_) => {}
            }
        }
    }

    fn finalize(&mut self, record: FinalizedTick) {
        let _ = self.finalized.send(record.tick);
        self.engine.lock().prune(self.now());

        // Refresh the bootstrap cache: finalized ticks are history.
        let finalized = record.tick;
        self.recent_ticks.retain(|_, bytes| {
            TickView::parse(bytes)
                .map(|view| view.tick() > finalized)
                .unwrap_or(false)
        });
        self.pool
            .replay_store()
            .set_ticks(self.recent_ticks.values().cloned().collect());

        let _ = self.events.send(NodeEvent::Tick(record));
    }

    async fn on_solution(&mut self, slot: SlotIndex, bytes: Vec<u8>) {
        // Replaying up to a thousand boolean networks is CPU-bound;
        // keep it off the I/O dispatch path.
        let tester = self.tester.clone();
        let payload = bytes.clone();
        let outcome = tokio::task::spawn_blocking(move || tester.lock().verify(&payload)).await;

        match outcome {
            Ok(Ok(verified)) => {
                self.tracker.record_score(verified.member, verified.score);
                let targets = self.engine.lock().propagate_solution(
                    Some(slot),
                    verified.digest,
                    &self.pool.open_slots(),
                    self.now(),
                );
                for target in targets {
                    self.pool.send(target, bytes.clone());
                }
            }
            Ok(Err(error)) => self.violation(slot, &error.to_string()),
            Err(error) => warn!(%error, "solution verification task failed"),
        }
    }

    fn on_transaction(&mut self, slot: SlotIndex, bytes: Vec<u8>) {
        let parsed = TransactionView::parse(&bytes);
        let view = match parsed {
            Ok(view) => view,
            Err(error) => return self.violation(slot, &error.to_string()),
        };
        if !view.source().verify(&view.signing_digest(), &view.signature()) {
            return self.violation(slot, "transaction signature");
        }

        let digest = Hash::from_bytes(&bytes);
        let Some(relay) = self.engine.lock().propagate_transaction(&digest) else {
            return;
        };

        self.pool.broadcast_except(Some(slot), &bytes);
        let _ = self.events.send(NodeEvent::Transaction(bytes.clone()));

        // Timed re-broadcasts survive transient partitions; they ignore
        // further dedup.
        let pool = self.pool.clone();
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            for _ in 0..relay.rebroadcast_count {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(relay.rebroadcast_interval) => {}
                }
                pool.broadcast_except(Some(slot), &bytes);
            }
        });
    }
}
