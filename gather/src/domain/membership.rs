//! Membership state and the rules for reconciling it.
//!
//! The follow relation is stored twice: in the follower's `following` set
//! and in the followee's `followers` set. The two writes are independent,
//! so the relation is eventually consistent. The viewer's own `following`
//! set is ground truth for "am I following"; the other side is repaired on
//! read with [`repair_follow_edge`].

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{RelationField, User, UserId};

/// Whether `user` belongs to `collection`.
#[must_use]
pub fn is_member(collection: &BTreeSet<UserId>, user: &UserId) -> bool {
    collection.contains(user)
}

/// Errors raised by [`OptimisticToggle`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleError {
    /// A toggle was started while another was still in flight.
    AlreadyPending,
    /// `confirm` or `roll_back` was called with nothing in flight.
    NotPending,
}

impl fmt::Display for ToggleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::AlreadyPending => write!(f, "a membership change is already in flight"),
            Self::NotPending => write!(f, "no membership change is in flight"),
        }
    }
}

impl std::error::Error for ToggleError {}

/// Locally displayed membership flag with optimistic updates.
///
/// # Examples
///
/// ```
/// use gather::domain::OptimisticToggle;
///
/// let mut following = OptimisticToggle::new(false);
/// following.begin()?;
/// assert!(following.shown());
/// following.roll_back()?;
/// assert!(!following.shown());
/// # Ok::<(), gather::domain::ToggleError>(())
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticToggle {
    /// No write in flight.
    Settled(bool),
    /// A write is in flight; `target` is already shown.
    Pending {
        /// Value before the flip.
        previous: bool,
        /// Value being written.
        target: bool,
    },
}

impl OptimisticToggle {
    /// Start from a value read from the backend.
    #[must_use]
    pub const fn new(current: bool) -> Self {
        Self::Settled(current)
    }

    /// Value the screen should display.
    #[must_use]
    pub const fn shown(&self) -> bool {
        match *self {
            Self::Settled(value) => value,
            Self::Pending { target, .. } => target,
        }
    }

    /// Whether a write is in flight.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }

    /// Flip the displayed value ahead of the remote write and return the
    /// value being written.
    pub const fn begin(&mut self) -> Result<bool, ToggleError> {
        let Self::Settled(previous) = *self else {
            return Err(ToggleError::AlreadyPending);
        };
        let target = !previous;
        *self = Self::Pending { previous, target };
        Ok(target)
    }

    /// Settle on the written value after the remote write succeeded.
    pub const fn confirm(&mut self) -> Result<bool, ToggleError> {
        let Self::Pending { target, .. } = *self else {
            return Err(ToggleError::NotPending);
        };
        *self = Self::Settled(target);
        Ok(target)
    }

    /// Restore the previous value after the remote write failed.
    pub const fn roll_back(&mut self) -> Result<bool, ToggleError> {
        let Self::Pending { previous, .. } = *self else {
            return Err(ToggleError::NotPending);
        };
        *self = Self::Settled(previous);
        Ok(previous)
    }
}

/// Backend set primitive applied to a membership collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetOp {
    /// Set-union of one member.
    Add,
    /// Set-difference of one member.
    Remove,
}

impl SetOp {
    /// Operation that undoes this one.
    #[must_use]
    pub const fn inverse(self) -> Self {
        match self {
            Self::Add => Self::Remove,
            Self::Remove => Self::Add,
        }
    }

    /// Apply to an in-memory set. Returns whether the set changed.
    pub fn apply(self, set: &mut BTreeSet<UserId>, member: UserId) -> bool {
        match self {
            Self::Add => set.insert(member),
            Self::Remove => set.remove(&member),
        }
    }
}

/// One write against one user's relation set.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelationWrite {
    /// Profile whose document is written.
    pub owner: UserId,
    /// Set being modified.
    pub field: RelationField,
    /// Member added or removed.
    pub member: UserId,
    /// Operation.
    pub op: SetOp,
}

impl RelationWrite {
    /// Write that undoes this one.
    #[must_use]
    pub fn compensation(&self) -> Self {
        Self {
            op: self.op.inverse(),
            ..self.clone()
        }
    }
}

/// The two writes for a follow (`SetOp::Add`) or unfollow
/// (`SetOp::Remove`), follower side first.
#[must_use]
pub fn follow_writes(follower: &UserId, followee: &UserId, op: SetOp) -> [RelationWrite; 2] {
    [
        RelationWrite {
            owner: follower.clone(),
            field: RelationField::Following,
            member: followee.clone(),
            op,
        },
        RelationWrite {
            owner: followee.clone(),
            field: RelationField::Followers,
            member: follower.clone(),
            op,
        },
    ]
}

/// Write needed to make `target.followers` agree with `viewer.following`,
/// if the two sides have drifted apart.
#[must_use]
pub fn repair_follow_edge(viewer: &User, target: &User) -> Option<RelationWrite> {
    let following = is_member(viewer.following(), target.id());
    let listed = is_member(target.followers(), viewer.id());
    let op = match (following, listed) {
        (true, false) => SetOp::Add,
        (false, true) => SetOp::Remove,
        _ => return None,
    };
    Some(RelationWrite {
        owner: target.id().clone(),
        field: RelationField::Followers,
        member: viewer.id().clone(),
        op,
    })
}

#[cfg(test)]
mod tests {
    //! Regression coverage for membership state transitions.

    use rstest::{fixture, rstest};

    use super::*;

    #[fixture]
    fn viewer() -> User {
        User::try_from_strings("uid-viewer", "Viewer").expect("valid user")
    }

    #[fixture]
    fn target() -> User {
        User::try_from_strings("uid-target", "Target").expect("valid user")
    }

    #[rstest]
    fn toggle_round_trip_confirms_target() {
        let mut toggle = OptimisticToggle::new(false);
        assert_eq!(toggle.begin(), Ok(true));
        assert!(toggle.is_pending());
        assert_eq!(toggle.confirm(), Ok(true));
        assert_eq!(toggle, OptimisticToggle::Settled(true));
    }

    #[rstest]
    fn roll_back_restores_previous_value() {
        let mut toggle = OptimisticToggle::new(true);
        toggle.begin().expect("begin");
        assert!(!toggle.shown());
        assert_eq!(toggle.roll_back(), Ok(true));
        assert!(toggle.shown());
    }

    #[rstest]
    fn begin_while_pending_is_rejected() {
        let mut toggle = OptimisticToggle::new(false);
        toggle.begin().expect("begin");
        assert_eq!(toggle.begin(), Err(ToggleError::AlreadyPending));
    }

    #[rstest]
    fn confirm_without_pending_is_rejected() {
        let mut toggle = OptimisticToggle::new(false);
        assert_eq!(toggle.confirm(), Err(ToggleError::NotPending));
        assert_eq!(toggle.roll_back(), Err(ToggleError::NotPending));
    }

    #[rstest]
    fn follow_then_unfollow_restores_both_sets(mut viewer: User, mut target: User) {
        for write in follow_writes(viewer.id(), target.id(), SetOp::Add)
            .into_iter()
            .chain(follow_writes(viewer.id(), target.id(), SetOp::Remove))
        {
            let owner = if &write.owner == viewer.id() {
                &mut viewer
            } else {
                &mut target
            };
            write.op.apply(owner.relation_mut(write.field), write.member);
        }

        assert!(!is_member(viewer.following(), target.id()));
        assert!(!is_member(target.followers(), viewer.id()));
    }

    #[rstest]
    fn add_is_idempotent() {
        let mut set = BTreeSet::new();
        let member = UserId::new("uid-a").expect("valid id");
        assert!(SetOp::Add.apply(&mut set, member.clone()));
        assert!(!SetOp::Add.apply(&mut set, member));
        assert_eq!(set.len(), 1);
    }

    #[rstest]
    fn compensation_inverts_the_operation(viewer: User, target: User) {
        let [first, _] = follow_writes(viewer.id(), target.id(), SetOp::Add);
        let undo = first.compensation();
        assert_eq!(undo.op, SetOp::Remove);
        assert_eq!(undo.owner, first.owner);
        assert_eq!(undo.member, first.member);
    }

    #[rstest]
    fn repair_adds_missing_follower_entry(mut viewer: User, target: User) {
        viewer
            .relation_mut(RelationField::Following)
            .insert(target.id().clone());

        let repair = repair_follow_edge(&viewer, &target).expect("repair needed");

        assert_eq!(repair.op, SetOp::Add);
        assert_eq!(&repair.owner, target.id());
        assert_eq!(repair.field, RelationField::Followers);
    }

    #[rstest]
    fn repair_removes_stale_follower_entry(viewer: User, mut target: User) {
        target
            .relation_mut(RelationField::Followers)
            .insert(viewer.id().clone());

        let repair = repair_follow_edge(&viewer, &target).expect("repair needed");

        assert_eq!(repair.op, SetOp::Remove);
    }

    #[rstest]
    fn consistent_edges_need_no_repair(viewer: User, target: User) {
        assert!(repair_follow_edge(&viewer, &target).is_none());
    }
}
