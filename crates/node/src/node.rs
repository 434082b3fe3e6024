//! The combined mesh node.

use crate::dispatch::{Command, Dispatcher};
use crate::{ConfigError, Entity, NodeConfig, NodeEvent};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tickmesh_consensus::ConsensusTracker;
use tickmesh_gossip::PropagationEngine;
use tickmesh_messages::{build_transaction, TransactionView};
use tickmesh_pool::{ChannelPool, Connector};
use tickmesh_restest::{ResourceTestParams, ResourceTester};
use tickmesh_types::{Epoch, Hash, PublicKey, TickNumber};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// A node of the mesh: channel pool, propagation engine, consensus
/// tracker and resource-test verifier wired together.
///
/// Constructed and torn down per test; there is no process-wide state.
pub struct Node {
    config: NodeConfig,
    pool: Arc<ChannelPool>,
    engine: Arc<Mutex<PropagationEngine>>,
    events: broadcast::Sender<NodeEvent>,
    finalized: watch::Receiver<TickNumber>,
    commands: mpsc::Sender<Command>,
    cancel: CancellationToken,
    dispatch: JoinHandle<()>,
}

impl Node {
    /// Validate the configuration and launch the node.
    ///
    /// This is the only fallible startup path; every steady-state fault
    /// afterwards self-heals via reconnect/backoff.
    pub fn launch(config: NodeConfig, connector: Arc<dyn Connector>) -> Result<Self, ConfigError> {
        config.validate()?;
        let tester = ResourceTester::new(config.restest.clone())?;

        let (pool, pool_events) = ChannelPool::launch(config.pool.clone(), connector);
        let pool = Arc::new(pool);
        let engine = Arc::new(Mutex::new(PropagationEngine::new(
            config.propagation.clone(),
            rand::random(),
        )));
        let tracker =
            ConsensusTracker::new(config.pool.slots, config.root_authority, config.min_score);

        let (events_tx, _) = broadcast::channel(1024);
        let (finalized_tx, finalized_rx) = watch::channel(TickNumber::GENESIS);
        let (commands_tx, commands_rx) = mpsc::channel(16);
        let cancel = CancellationToken::new();

        let dispatcher = Dispatcher {
            config: config.clone(),
            pool: pool.clone(),
            engine: engine.clone(),
            tester: Arc::new(Mutex::new(tester)),
            tracker,
            events: events_tx.clone(),
            finalized: finalized_tx,
            cancel: cancel.child_token(),
            started: Instant::now(),
            recent_ticks: HashMap::new(),
            replay_epoch: Epoch::GENESIS,
        };
        let dispatch = tokio::spawn(dispatcher.run(pool_events, commands_rx));

        info!(slots = config.pool.slots, "node launched");
        Ok(Self {
            config,
            pool,
            engine,
            events: events_tx,
            finalized: finalized_rx,
            commands: commands_tx,
            cancel,
            dispatch,
        })
    }

    /// Subscribe to node events. Every subscriber sees every event.
    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.events.subscribe()
    }

    /// Number of open mesh channels.
    pub fn peer_count(&self) -> usize {
        self.pool.peer_count()
    }

    /// The current finalized tick.
    pub fn finalized_tick(&self) -> TickNumber {
        *self.finalized.borrow()
    }

    /// Record the epoch a termination marker was observed for, arming
    /// the reputation cutover on the next epoch adoption.
    pub async fn mark_terminated(&self, epoch: Epoch) {
        let _ = self.commands.send(Command::MarkTerminated(epoch)).await;
    }

    /// Set the minimum resource-test score used by the reputation
    /// cutover.
    pub async fn set_min_score(&self, min_score: u32) {
        let _ = self.commands.send(Command::SetMinScore(min_score)).await;
    }

    /// Replace the resource-test parameters. This is the explicit
    /// cutover reconfiguration hook; invalid parameters are rejected and
    /// logged, never fatal at runtime.
    pub async fn set_resource_test_params(&self, params: ResourceTestParams) {
        let _ = self
            .commands
            .send(Command::SetResourceTestParams(params))
            .await;
    }

    /// Broadcast a locally originated transaction and keep re-announcing
    /// it until the returned token is cancelled or its target tick is
    /// superseded by a newer finalized tick. The re-announce interval
    /// grows linearly with the attempt number.
    pub fn broadcast_transaction(&self, bytes: Vec<u8>) -> CancellationToken {
        let token = self.cancel.child_token();
        let target = TransactionView::parse(&bytes)
            .map(|view| view.tick())
            .unwrap_or(TickNumber::GENESIS);

        // Own transactions pass through the same dedup filter so copies
        // echoed back by peers are not relayed again.
        let digest = Hash::from_bytes(&bytes);
        let _ = self.engine.lock().propagate_transaction(&digest);
        self.pool.broadcast_except(None, &bytes);
        let _ = self.events.send(NodeEvent::Transaction(bytes.clone()));

        let pool = self.pool.clone();
        let mut finalized = self.finalized.clone();
        let interval = self.config.own_rebroadcast_interval;
        let task_token = token.clone();
        tokio::spawn(async move {
            let mut attempt: u32 = 1;
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => return,
                    _ = tokio::time::sleep(interval * attempt) => {}
                }
                if *finalized.borrow_and_update() >= target {
                    return;
                }
                pool.broadcast_except(None, &bytes);
                attempt += 1;
            }
        });
        token
    }

    /// Build, sign and broadcast a transfer from an entity.
    ///
    /// Without an explicit tick the target is chosen monotonically per
    /// sender, at least `tick_offset_margin` ahead of the finalized
    /// tick.
    pub fn submit_transaction(
        &self,
        entity: &mut Entity,
        destination: PublicKey,
        amount: u64,
        tick: Option<TickNumber>,
    ) -> (Vec<u8>, CancellationToken) {
        let target = tick.unwrap_or_else(|| {
            entity.next_target_tick(self.finalized_tick(), self.config.tick_offset_margin)
        });
        let bytes = build_transaction(
            self.config.protocol,
            entity.keypair(),
            destination,
            amount,
            target,
        );
        let token = self.broadcast_transaction(bytes.clone());
        (bytes, token)
    }

    /// Tear down the dispatch loop, every broadcaster task and the pool.
    /// No timer survives shutdown.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.dispatch.await;
        self.pool.shutdown().await;
        info!("node shut down");
    }
}
