use crate::error::{AppError, Result};
use time::OffsetDateTime;
use uuid::Uuid;

/// An unordered pair of distinct users, stored in canonical order.
///
/// `first < second` always holds, so the same two users resolve to the same
/// pair regardless of who initiated contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ParticipantPair {
    first: Uuid,
    second: Uuid,
}

impl ParticipantPair {
    /// Canonicalizes two user ids into a pair.
    ///
    /// # Errors
    /// Returns `AppError::InvalidParticipants` if both ids are the same user.
    pub fn new(a: Uuid, b: Uuid) -> Result<Self> {
        match a.cmp(&b) {
            std::cmp::Ordering::Less => Ok(Self { first: a, second: b }),
            std::cmp::Ordering::Greater => Ok(Self { first: b, second: a }),
            std::cmp::Ordering::Equal => Err(AppError::InvalidParticipants),
        }
    }

    #[must_use]
    pub const fn first(&self) -> Uuid {
        self.first
    }

    #[must_use]
    pub const fn second(&self) -> Uuid {
        self.second
    }

    #[must_use]
    pub const fn get(&self, slot: Slot) -> Uuid {
        match slot {
            Slot::First => self.first,
            Slot::Second => self.second,
        }
    }

    #[must_use]
    pub fn slot_of(&self, user: Uuid) -> Option<Slot> {
        if user == self.first {
            Some(Slot::First)
        } else if user == self.second {
            Some(Slot::Second)
        } else {
            None
        }
    }
}

/// One of the two fixed participant positions in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    First,
    Second,
}

impl Slot {
    #[must_use]
    pub const fn other(self) -> Self {
        match self {
            Self::First => Self::Second,
            Self::Second => Self::First,
        }
    }

    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }
}

/// View state owned by one participant slot. Never visible to the other side.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParticipantState {
    pub archived: bool,
    pub muted: bool,
    /// This participant has blocked the other one from sending.
    pub blocked_other: bool,
}

/// A single flag assignment on one participant slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChange {
    Archived(bool),
    Muted(bool),
    BlockedOther(bool),
}

impl StateChange {
    pub const fn apply(self, state: &mut ParticipantState) {
        match self {
            Self::Archived(v) => state.archived = v,
            Self::Muted(v) => state.muted = v,
            Self::BlockedOther(v) => state.blocked_other = v,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: Uuid,
    pub participants: ParticipantPair,
    pub states: [ParticipantState; 2],
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Conversation {
    #[must_use]
    pub fn new(id: Uuid, participants: ParticipantPair, now: OffsetDateTime) -> Self {
        Self { id, participants, states: [ParticipantState::default(); 2], created_at: now, updated_at: now }
    }

    /// Resolves which slot `user` occupies.
    ///
    /// # Errors
    /// Returns `AppError::NotAParticipant` if `user` is in neither slot.
    pub fn slot_of(&self, user: Uuid) -> Result<Slot> {
        self.participants.slot_of(user).ok_or(AppError::NotAParticipant)
    }

    /// # Errors
    /// Returns `AppError::NotAParticipant` if `user` is in neither slot.
    pub fn other_participant(&self, user: Uuid) -> Result<Uuid> {
        let slot = self.slot_of(user)?;
        Ok(self.participants.get(slot.other()))
    }

    #[must_use]
    pub const fn state(&self, slot: Slot) -> &ParticipantState {
        &self.states[slot.index()]
    }

    /// # Errors
    /// Returns `AppError::NotAParticipant` if `user` is in neither slot.
    pub fn state_of(&self, user: Uuid) -> Result<&ParticipantState> {
        Ok(self.state(self.slot_of(user)?))
    }

    pub fn apply(&mut self, slot: Slot, change: StateChange, now: OffsetDateTime) {
        change.apply(&mut self.states[slot.index()]);
        self.touch(now);
    }

    /// Advances `updated_at`, never moving it backwards.
    pub fn touch(&mut self, now: OffsetDateTime) {
        self.updated_at = self.updated_at.max(now);
    }

    /// Whether the participant opposite `sender` has blocked `sender` within
    /// this conversation.
    ///
    /// # Errors
    /// Returns `AppError::NotAParticipant` if `sender` is in neither slot.
    pub fn is_blocked(&self, sender: Uuid) -> Result<bool> {
        let slot = self.slot_of(sender)?;
        Ok(self.state(slot.other()).blocked_other)
    }

    /// Validates a conversation-scoped block request and resolves the slot
    /// whose flag it sets.
    ///
    /// # Errors
    /// Returns `AppError::NotAParticipant` if `blocker` is not in the conversation.
    /// Returns `AppError::InvalidParticipants` if `blocked` is not the other participant.
    pub fn block_target(&self, blocker: Uuid, blocked: Uuid) -> Result<Slot> {
        let slot = self.slot_of(blocker)?;
        if self.participants.get(slot.other()) != blocked {
            return Err(AppError::InvalidParticipants);
        }
        Ok(slot)
    }
}
