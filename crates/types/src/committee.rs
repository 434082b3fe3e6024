//! Committee membership and quorum arithmetic.

use crate::{MemberIndex, PublicKey};
use thiserror::Error;

/// Fixed number of seats in a committee.
pub const COMMITTEE_SIZE: usize = 676;

/// Minimum number of bit-identical digest vectors required to finalize a
/// tick: floor(2/3 * committee size) + 1.
pub const QUORUM: usize = COMMITTEE_SIZE * 2 / 3 + 1;

/// Errors that can occur when constructing a committee.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitteeError {
    /// Wrong number of member keys.
    #[error("committee must have exactly {COMMITTEE_SIZE} members, got {0}")]
    WrongSize(usize),
}

/// The ordered set of public keys authorized to sign ticks for an epoch.
///
/// Replaced wholesale on epoch change; an alignment-index improvement
/// within the same epoch never touches the member array. Unfilled seats
/// hold the all-zero placeholder key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Committee {
    members: Vec<PublicKey>,
}

impl Committee {
    /// Build a committee from exactly [`COMMITTEE_SIZE`] ordered keys.
    pub fn from_members(members: Vec<PublicKey>) -> Result<Self, CommitteeError> {
        if members.len() != COMMITTEE_SIZE {
            return Err(CommitteeError::WrongSize(members.len()));
        }
        Ok(Self { members })
    }

    /// Get the member key at an index, if in range.
    pub fn member(&self, index: MemberIndex) -> Option<&PublicKey> {
        self.members.get(index.0 as usize)
    }

    /// All member keys in committee order.
    pub fn members(&self) -> &[PublicKey] {
        &self.members
    }

    /// Number of seats not holding the placeholder key.
    pub fn non_placeholder_count(&self) -> usize {
        self.members.iter().filter(|key| !key.is_zero()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quorum_constant() {
        // 676 * 2 / 3 = 450 (floor), + 1 = 451.
        assert_eq!(QUORUM, 451);
    }

    #[test]
    fn test_wrong_size_rejected() {
        let result = Committee::from_members(vec![PublicKey::ZERO; 10]);
        assert_eq!(result.unwrap_err(), CommitteeError::WrongSize(10));
    }

    #[test]
    fn test_member_lookup() {
        let mut members = vec![PublicKey::ZERO; COMMITTEE_SIZE];
        members[3] = PublicKey::from_bytes([7u8; 32]);
        let committee = Committee::from_members(members).unwrap();

        assert_eq!(
            committee.member(MemberIndex(3)),
            Some(&PublicKey::from_bytes([7u8; 32]))
        );
        assert_eq!(committee.member(MemberIndex(COMMITTEE_SIZE as u16)), None);
        assert_eq!(committee.non_placeholder_count(), 1);
    }
}
