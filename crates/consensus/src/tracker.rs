//! The quorum tick consensus tracker.
//!
//! Single writer of the system state: current epoch, alignment,
//! committee, finalized tick, per-tick working sets and per-member
//! scores. Driven synchronously by verified inbound messages; all I/O
//! happens in the runner via the returned [`Action`]s.

use crate::{Action, Alignment, AlignmentEvent, AlignmentTracker, FinalizedTick};
use std::collections::{BTreeMap, HashMap};
use tickmesh_messages::{CommitteeView, TickView, TICK_DIGEST_COUNT};
use tickmesh_types::{
    Committee, Epoch, Hash, PublicKey, SlotIndex, TickNumber, COMMITTEE_SIZE, QUORUM,
};
use tracing::{debug, info, warn};

/// Per-tick working set: one digest vector per committee seat, first
/// record per member wins.
type WorkingSet = Vec<Option<[Hash; TICK_DIGEST_COUNT]>>;

/// Committee-alignment and quorum-tick state machine.
///
/// `Unaligned -> Aligned(epoch, committee)` on the first authority-signed
/// committee message; tick finalization only runs while aligned.
pub struct ConsensusTracker {
    root_authority: PublicKey,
    min_score: Option<u32>,

    alignment_tracker: AlignmentTracker,
    epoch: Epoch,
    terminated_epoch: Epoch,
    alignment: u32,
    committee: Option<Committee>,

    finalized: TickNumber,
    working: HashMap<TickNumber, WorkingSet>,
    tx_digests: BTreeMap<TickNumber, Hash>,

    scores: HashMap<PublicKey, u32>,
    green_light: Option<f64>,
}

impl ConsensusTracker {
    /// Create an unaligned tracker.
    ///
    /// `min_score` enables the epoch reputation cutover; without it the
    /// green-light signal is never computed.
    pub fn new(slots: usize, root_authority: PublicKey, min_score: Option<u32>) -> Self {
        Self {
            root_authority,
            min_score,
            alignment_tracker: AlignmentTracker::new(slots),
            epoch: Epoch::GENESIS,
            terminated_epoch: Epoch::GENESIS,
            alignment: 0,
            committee: None,
            finalized: TickNumber::GENESIS,
            working: HashMap::new(),
            tx_digests: BTreeMap::new(),
            scores: HashMap::new(),
            green_light: None,
        }
    }

    /// Process an inbound committee-set message.
    pub fn on_committee(&mut self, bytes: &[u8], slot: Option<SlotIndex>) -> Vec<Action> {
        let view = match CommitteeView::parse(bytes) {
            Ok(view) => view,
            Err(error) => {
                warn!(%error, "malformed committee message");
                return vec![Action::Disconnect];
            }
        };

        let digest = view.signing_digest();
        if !self.root_authority.verify(&digest, &view.signature()) {
            warn!("committee message not signed by the root authority");
            return vec![Action::Disconnect];
        }

        let mut actions = Vec::new();
        let Alignment { epoch, alignment } =
            self.alignment_tracker.observe(slot, view.epoch(), digest);

        // Epoch zero is the unaligned origin; only strictly newer
        // (epoch, alignment) observations are adopted.
        let newer = epoch > self.epoch || (epoch == self.epoch && alignment > self.alignment);
        if epoch > Epoch::GENESIS && newer {
            self.maybe_cutover(epoch, &mut actions);

            if self.epoch != epoch {
                self.epoch = epoch;
                self.committee = Some(view.committee());
            }
            self.alignment = alignment;

            info!(%epoch, alignment, "committee aligned");
            actions.push(Action::EmitAlignment(AlignmentEvent {
                epoch,
                alignment,
                committee: self
                    .committee
                    .clone()
                    .expect("aligned tracker holds a committee"),
            }));
        }

        // Authority-signed committee messages are always relayed, even
        // when they lose the alignment race.
        actions.push(Action::Propagate);
        actions
    }

    /// Process an inbound tick message.
    ///
    /// The caller routes the returned actions; a stale epoch, an
    /// already-finalized tick number or a duplicate member record are
    /// tolerated races and produce no actions at all.
    pub fn on_tick(&mut self, bytes: &[u8]) -> Vec<Action> {
        if self.epoch == Epoch::GENESIS {
            return Vec::new();
        }

        let view = match TickView::parse(bytes) {
            Ok(view) => view,
            Err(error) => {
                warn!(%error, "malformed tick message");
                return vec![Action::Disconnect];
            }
        };

        if view.epoch() != self.epoch {
            debug!(received = %view.epoch(), current = %self.epoch, "tick epoch mismatch");
            return Vec::new();
        }
        let tick = view.tick();
        if tick <= self.finalized {
            return Vec::new();
        }

        let member = view.member_index();
        let member_key = match self.committee.as_ref().and_then(|c| c.member(member)) {
            Some(key) => *key,
            None => {
                warn!(%member, "tick claims an out-of-range committee seat");
                return vec![Action::Disconnect];
            }
        };

        if !member_key.verify(&view.signing_digest(), &view.signature()) {
            warn!(%member, "tick signature verification failed");
            return vec![Action::Disconnect];
        }

        let mut actions = vec![Action::Propagate];

        let records = self
            .working
            .entry(tick)
            .or_insert_with(|| vec![None; COMMITTEE_SIZE]);
        let seat = &mut records[member.0 as usize];
        if seat.is_some() {
            // First record per member per tick wins.
            return actions;
        }
        let digests = view.digests();
        *seat = Some(digests);

        let aligned = records
            .iter()
            .flatten()
            .filter(|&&vector| vector == digests)
            .count();
        if aligned >= QUORUM && tick > self.finalized {
            self.finalized = tick;
            self.tx_digests.insert(tick, digests[TICK_DIGEST_COUNT - 1]);
            // Finalized and superseded working sets are dropped at once.
            let finalized = self.finalized;
            self.working.retain(|&t, _| t > finalized);

            info!(%tick, aligned, "tick finalized");
            actions.push(Action::EmitFinalizedTick(FinalizedTick {
                tick,
                epoch: self.epoch,
                member,
                digests,
                tx_digest: digests[TICK_DIGEST_COUNT - 1],
            }));
        }

        actions
    }

    /// Record a member's verified resource-test score.
    pub fn record_score(&mut self, member: PublicKey, score: u32) {
        self.scores.insert(member, score);
    }

    /// Record the epoch a termination marker was observed for.
    ///
    /// The owning application calls this; it arms the reputation cutover
    /// check in [`Self::on_committee`].
    pub fn mark_terminated(&mut self, epoch: Epoch) {
        self.terminated_epoch = epoch;
    }

    /// Set the minimum score used by the reputation cutover.
    pub fn set_min_score(&mut self, min_score: u32) {
        self.min_score = Some(min_score);
    }

    /// A slot reconnected: drop its committee observation.
    pub fn forget_slot(&mut self, slot: SlotIndex) {
        self.alignment_tracker.forget(slot);
    }

    /// The currently finalized tick number (monotonic).
    pub fn finalized_tick(&self) -> TickNumber {
        self.finalized
    }

    /// The current epoch.
    pub fn epoch(&self) -> Epoch {
        self.epoch
    }

    /// The current alignment index.
    pub fn alignment(&self) -> u32 {
        self.alignment
    }

    /// The active committee, once aligned.
    pub fn committee(&self) -> Option<&Committee> {
        self.committee.as_ref()
    }

    /// The retained transaction-set digest of a finalized tick.
    pub fn digest_of_transactions(&self, tick: TickNumber) -> Option<Hash> {
        self.tx_digests.get(&tick).copied()
    }

    /// The green-light fraction from the last reputation cutover.
    pub fn green_light(&self) -> Option<f64> {
        self.green_light
    }

    /// Number of live per-tick working sets.
    pub fn working_sets(&self) -> usize {
        self.working.len()
    }

    /// Reputation cutover, checked before an epoch adoption.
    ///
    /// Fires only when a minimum score is configured, the new epoch
    /// immediately follows the recorded terminated epoch, and that
    /// terminated epoch equals the last fully-aligned epoch. Implemented
    /// literally as specified; see DESIGN.md.
    fn maybe_cutover(&mut self, epoch: Epoch, actions: &mut Vec<Action>) {
        let Some(min_score) = self.min_score else {
            return;
        };
        if self.terminated_epoch == Epoch::GENESIS
            || epoch != self.terminated_epoch.next()
            || self.terminated_epoch != self.epoch
        {
            return;
        }
        let Some(committee) = self.committee.as_ref() else {
            return;
        };

        let mut members = 0usize;
        let mut passing = 0usize;
        for key in committee.members() {
            if key.is_zero() {
                continue;
            }
            members += 1;
            if self.scores.get(key).copied().unwrap_or(0) >= min_score {
                passing += 1;
            }
        }
        if members > 0 {
            let fraction = passing as f64 / members as f64;
            info!(passing, members, fraction, "reputation cutover");
            self.green_light = Some(fraction);
        }

        self.scores.clear();
        actions.push(Action::ClearSolutionState);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tickmesh_messages::{build_committee, build_tick};
    use tickmesh_types::test_utils::{keypair, root_keypair};
    use tickmesh_types::KeyPair;

    const PROTOCOL: u16 = 1;
    const SLOTS: usize = 4;

    fn member_keys(count: usize) -> Vec<KeyPair> {
        (0..count as u64).map(keypair).collect()
    }

    fn committee_message(epoch: Epoch, members: &[KeyPair]) -> Vec<u8> {
        let keys: Vec<PublicKey> = members.iter().map(|k| k.public_key()).collect();
        build_committee(PROTOCOL, epoch, &keys, &root_keypair())
    }

    fn tick_message(
        member_index: u16,
        member: &KeyPair,
        epoch: Epoch,
        tick: TickNumber,
        digests: &[Hash; TICK_DIGEST_COUNT],
    ) -> Vec<u8> {
        build_tick(
            PROTOCOL,
            tickmesh_types::MemberIndex(member_index),
            epoch,
            tick,
            digests,
            Hash::ZERO,
            member,
        )
    }

    fn tracker() -> ConsensusTracker {
        ConsensusTracker::new(SLOTS, root_keypair().public_key(), None)
    }

    fn digests(tag: u16) -> [Hash; TICK_DIGEST_COUNT] {
        let mut out = [Hash::ZERO; TICK_DIGEST_COUNT];
        for (i, digest) in out.iter_mut().enumerate() {
            *digest = Hash::from_parts(&[&tag.to_le_bytes(), &[i as u8]]);
        }
        out
    }

    fn has_propagate(actions: &[Action]) -> bool {
        actions.iter().any(|a| matches!(a, Action::Propagate))
    }

    #[test]
    fn test_unaligned_to_aligned_then_stale_epoch_tick_rejected() {
        let members = member_keys(3);
        let mut tracker = tracker();

        // Committee for epoch 5 arrives before any tick.
        let actions =
            tracker.on_committee(&committee_message(Epoch(5), &members), Some(SlotIndex(0)));
        assert!(has_propagate(&actions));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EmitAlignment(e) if e.epoch == Epoch(5))));
        assert_eq!(tracker.epoch(), Epoch(5));

        // A tick for epoch 4 is rejected without mutating state.
        let stale = tick_message(0, &members[0], Epoch(4), TickNumber(10), &digests(1));
        assert!(tracker.on_tick(&stale).is_empty());
        assert_eq!(tracker.finalized_tick(), TickNumber::GENESIS);
        assert_eq!(tracker.working_sets(), 0);
    }

    #[test]
    fn test_ticks_ignored_while_unaligned() {
        let members = member_keys(1);
        let mut tracker = tracker();
        let tick = tick_message(0, &members[0], Epoch(1), TickNumber(5), &digests(1));
        assert!(tracker.on_tick(&tick).is_empty());
    }

    #[test]
    fn test_committee_not_signed_by_authority_disconnects() {
        let members = member_keys(2);
        let keys: Vec<PublicKey> = members.iter().map(|k| k.public_key()).collect();
        let forged = build_committee(PROTOCOL, Epoch(5), &keys, &keypair(99));

        let mut tracker = tracker();
        let actions = tracker.on_committee(&forged, Some(SlotIndex(0)));
        assert_eq!(actions, vec![Action::Disconnect]);
        assert_eq!(tracker.epoch(), Epoch::GENESIS);
    }

    #[test]
    fn test_epoch_zero_committee_propagated_but_not_adopted() {
        let members = member_keys(2);
        let mut tracker = tracker();
        let actions =
            tracker.on_committee(&committee_message(Epoch(0), &members), Some(SlotIndex(0)));
        assert_eq!(actions, vec![Action::Propagate]);
        assert!(tracker.committee().is_none());
    }

    #[test]
    fn test_alignment_improvement_same_epoch() {
        let members = member_keys(2);
        let message = committee_message(Epoch(5), &members);
        let mut tracker = tracker();

        tracker.on_committee(&message, Some(SlotIndex(0)));
        assert_eq!(tracker.alignment(), 1);

        // Same message from another slot: higher alignment, same epoch,
        // same committee.
        let actions = tracker.on_committee(&message, Some(SlotIndex(1)));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::EmitAlignment(e) if e.alignment == 2)));
        assert_eq!(tracker.epoch(), Epoch(5));

        // Replaying on the first slot is not strictly newer.
        let actions = tracker.on_committee(&message, Some(SlotIndex(0)));
        assert_eq!(actions, vec![Action::Propagate]);
    }

    #[test]
    fn test_older_epoch_not_adopted() {
        let members = member_keys(2);
        let mut tracker = tracker();
        tracker.on_committee(&committee_message(Epoch(5), &members), Some(SlotIndex(0)));

        let actions =
            tracker.on_committee(&committee_message(Epoch(4), &members), Some(SlotIndex(1)));
        assert_eq!(actions, vec![Action::Propagate]);
        assert_eq!(tracker.epoch(), Epoch(5));
    }

    #[test]
    fn test_bad_tick_signature_disconnects_without_recording() {
        let members = member_keys(2);
        let mut tracker = tracker();
        tracker.on_committee(&committee_message(Epoch(1), &members), Some(SlotIndex(0)));

        // Signed by a key that does not hold seat 1.
        let forged = tick_message(1, &members[0], Epoch(1), TickNumber(5), &digests(1));
        let actions = tracker.on_tick(&forged);
        assert_eq!(actions, vec![Action::Disconnect]);
        assert_eq!(tracker.working_sets(), 0);
    }

    #[test]
    fn test_quorum_threshold_exact() {
        let members = member_keys(QUORUM);
        let mut tracker = tracker();
        tracker.on_committee(&committee_message(Epoch(1), &members), Some(SlotIndex(0)));

        let tick = TickNumber(100);
        let vector = digests(7);

        // One short of quorum: never finalizes.
        for (i, member) in members.iter().enumerate().take(QUORUM - 1) {
            let actions =
                tracker.on_tick(&tick_message(i as u16, member, Epoch(1), tick, &vector));
            assert!(has_propagate(&actions));
            assert!(!actions
                .iter()
                .any(|a| matches!(a, Action::EmitFinalizedTick(_))));
        }
        assert_eq!(tracker.finalized_tick(), TickNumber::GENESIS);

        // The 451st identical vector finalizes.
        let actions = tracker.on_tick(&tick_message(
            (QUORUM - 1) as u16,
            &members[QUORUM - 1],
            Epoch(1),
            tick,
            &vector,
        ));
        let finalized = actions
            .iter()
            .find_map(|a| match a {
                Action::EmitFinalizedTick(record) => Some(record.clone()),
                _ => None,
            })
            .expect("quorum reached");
        assert_eq!(finalized.tick, tick);
        assert_eq!(finalized.digests, vector);
        assert_eq!(tracker.finalized_tick(), tick);
        // Working set discarded, transaction digest retained.
        assert_eq!(tracker.working_sets(), 0);
        assert_eq!(
            tracker.digest_of_transactions(tick),
            Some(vector[TICK_DIGEST_COUNT - 1])
        );
    }

    #[test]
    fn test_disagreeing_vectors_do_not_finalize() {
        let members = member_keys(QUORUM);
        let mut tracker = tracker();
        tracker.on_committee(&committee_message(Epoch(1), &members), Some(SlotIndex(0)));

        let tick = TickNumber(100);
        for (i, member) in members.iter().enumerate().take(QUORUM) {
            // Every member reports a different vector.
            let vector = digests(i as u16);
            tracker.on_tick(&tick_message(i as u16, member, Epoch(1), tick, &vector));
        }
        assert_eq!(tracker.finalized_tick(), TickNumber::GENESIS);
    }

    #[test]
    fn test_finalization_is_monotonic() {
        let members = member_keys(QUORUM);
        let mut tracker = tracker();
        tracker.on_committee(&committee_message(Epoch(1), &members), Some(SlotIndex(0)));

        let vector = digests(1);
        for (i, member) in members.iter().enumerate() {
            tracker.on_tick(&tick_message(i as u16, member, Epoch(1), TickNumber(100), &vector));
        }
        assert_eq!(tracker.finalized_tick(), TickNumber(100));
        let retained = tracker.digest_of_transactions(TickNumber(100)).unwrap();

        // Ticks at or below the finalized number are no-ops.
        let old = tick_message(0, &members[0], Epoch(1), TickNumber(100), &digests(9));
        assert!(tracker.on_tick(&old).is_empty());
        let older = tick_message(0, &members[0], Epoch(1), TickNumber(50), &digests(9));
        assert!(tracker.on_tick(&older).is_empty());

        assert_eq!(tracker.finalized_tick(), TickNumber(100));
        assert_eq!(
            tracker.digest_of_transactions(TickNumber(100)),
            Some(retained)
        );

        // A newer tick still advances.
        let vector2 = digests(2);
        for (i, member) in members.iter().enumerate() {
            tracker.on_tick(&tick_message(
                i as u16,
                member,
                Epoch(1),
                TickNumber(105),
                &vector2,
            ));
        }
        assert_eq!(tracker.finalized_tick(), TickNumber(105));
    }

    #[test]
    fn test_duplicate_member_record_ignored() {
        let members = member_keys(2);
        let mut tracker = tracker();
        tracker.on_committee(&committee_message(Epoch(1), &members), Some(SlotIndex(0)));

        let first = tick_message(0, &members[0], Epoch(1), TickNumber(10), &digests(1));
        let replay = tick_message(0, &members[0], Epoch(1), TickNumber(10), &digests(2));
        tracker.on_tick(&first);
        let actions = tracker.on_tick(&replay);
        // Still propagated (valid signature), but the record stands.
        assert_eq!(actions, vec![Action::Propagate]);
        assert_eq!(tracker.working_sets(), 1);
    }

    #[test]
    fn test_green_light_cutover_literal_condition() {
        let members = member_keys(4);
        let mut tracker = ConsensusTracker::new(SLOTS, root_keypair().public_key(), Some(5));

        tracker.on_committee(&committee_message(Epoch(3), &members), Some(SlotIndex(0)));
        tracker.record_score(members[0].public_key(), 7);
        tracker.record_score(members[1].public_key(), 5);
        tracker.record_score(members[2].public_key(), 2);
        // members[3] never scored.

        tracker.mark_terminated(Epoch(3));
        let actions =
            tracker.on_committee(&committee_message(Epoch(4), &members), Some(SlotIndex(0)));
        assert!(actions
            .iter()
            .any(|a| matches!(a, Action::ClearSolutionState)));
        // 2 of 4 non-placeholder members met the threshold.
        assert_eq!(tracker.green_light(), Some(0.5));
    }

    #[test]
    fn test_cutover_requires_immediately_following_epoch() {
        let members = member_keys(2);
        let mut tracker = ConsensusTracker::new(SLOTS, root_keypair().public_key(), Some(5));

        tracker.on_committee(&committee_message(Epoch(3), &members), Some(SlotIndex(0)));
        tracker.mark_terminated(Epoch(3));

        // Epoch jumps past terminated+1: no cutover.
        let actions =
            tracker.on_committee(&committee_message(Epoch(5), &members), Some(SlotIndex(0)));
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::ClearSolutionState)));
        assert_eq!(tracker.green_light(), None);
    }

    #[test]
    fn test_cutover_requires_min_score_configured() {
        let members = member_keys(2);
        let mut tracker = tracker();

        tracker.on_committee(&committee_message(Epoch(3), &members), Some(SlotIndex(0)));
        tracker.mark_terminated(Epoch(3));
        let actions =
            tracker.on_committee(&committee_message(Epoch(4), &members), Some(SlotIndex(0)));
        assert!(!actions
            .iter()
            .any(|a| matches!(a, Action::ClearSolutionState)));
    }
}
