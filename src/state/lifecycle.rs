use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

/// Where a group stands in its setup conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum GroupPhase {
    /// No channel and no setup in progress.
    Idle,
    /// Setup was requested; the next step names the channel.
    AwaitingChannel,
    /// A channel is attached; submissions are accepted.
    Active,
}

/// Events driving [`GroupPhase`] changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// Setup requested.
    BeginInit,
    /// The supplied channel passed validation and the posting probe.
    ChannelAccepted,
    /// The supplied channel was malformed or not writable.
    ChannelRejected,
    /// Setup abandoned before a channel was accepted.
    Cancel,
    /// All group data wiped by an administrator.
    Reset,
}

/// Error returned when attempting to apply an invalid transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while in {from:?}")]
pub struct InvalidTransition {
    /// The phase the group was in when the event was received.
    pub from: GroupPhase,
    /// The event that cannot be applied from this phase.
    pub event: LifecycleEvent,
}

impl GroupPhase {
    /// Phase implied by what is known about a group: a stored channel wins over
    /// a pending setup conversation.
    pub fn derive(has_channel: bool, setup_pending: bool) -> GroupPhase {
        match (has_channel, setup_pending) {
            (true, _) => GroupPhase::Active,
            (false, true) => GroupPhase::AwaitingChannel,
            (false, false) => GroupPhase::Idle,
        }
    }

    /// Compute the phase reached by applying `event`, if the transition is valid.
    pub fn next(self, event: LifecycleEvent) -> Result<GroupPhase, InvalidTransition> {
        let next = match (self, event) {
            (GroupPhase::Idle | GroupPhase::AwaitingChannel, LifecycleEvent::BeginInit) => {
                GroupPhase::AwaitingChannel
            }
            (GroupPhase::AwaitingChannel, LifecycleEvent::ChannelAccepted) => GroupPhase::Active,
            (
                GroupPhase::AwaitingChannel,
                LifecycleEvent::ChannelRejected | LifecycleEvent::Cancel,
            ) => GroupPhase::Idle,
            (_, LifecycleEvent::Reset) => GroupPhase::Idle,
            (from, event) => return Err(InvalidTransition { from, event }),
        };

        Ok(next)
    }

    /// Whether submissions may be recorded in this phase.
    pub fn accepts_submissions(self) -> bool {
        self == GroupPhase::Active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(phase: GroupPhase, event: LifecycleEvent) -> GroupPhase {
        phase.next(event).unwrap()
    }

    #[test]
    fn stored_channel_outranks_pending_setup() {
        assert_eq!(GroupPhase::derive(true, true), GroupPhase::Active);
        assert_eq!(GroupPhase::derive(true, false), GroupPhase::Active);
        assert_eq!(
            GroupPhase::derive(false, true),
            GroupPhase::AwaitingChannel
        );
        assert_eq!(GroupPhase::derive(false, false), GroupPhase::Idle);
    }

    #[test]
    fn setup_happy_path() {
        let phase = apply(GroupPhase::Idle, LifecycleEvent::BeginInit);
        assert_eq!(phase, GroupPhase::AwaitingChannel);
        let phase = apply(phase, LifecycleEvent::ChannelAccepted);
        assert_eq!(phase, GroupPhase::Active);
        assert!(phase.accepts_submissions());
    }

    #[test]
    fn begin_init_is_idempotent_while_pending() {
        assert_eq!(
            apply(GroupPhase::AwaitingChannel, LifecycleEvent::BeginInit),
            GroupPhase::AwaitingChannel
        );
    }

    #[test]
    fn rejection_and_cancel_return_to_idle() {
        assert_eq!(
            apply(GroupPhase::AwaitingChannel, LifecycleEvent::ChannelRejected),
            GroupPhase::Idle
        );
        assert_eq!(
            apply(GroupPhase::AwaitingChannel, LifecycleEvent::Cancel),
            GroupPhase::Idle
        );
    }

    #[test]
    fn reset_is_valid_from_every_phase() {
        for phase in [
            GroupPhase::Idle,
            GroupPhase::AwaitingChannel,
            GroupPhase::Active,
        ] {
            assert_eq!(apply(phase, LifecycleEvent::Reset), GroupPhase::Idle);
        }
    }

    #[test]
    fn active_group_cannot_restart_setup() {
        let err = GroupPhase::Active
            .next(LifecycleEvent::BeginInit)
            .unwrap_err();
        assert_eq!(err.from, GroupPhase::Active);
        assert_eq!(err.event, LifecycleEvent::BeginInit);
    }

    #[test]
    fn channel_without_pending_setup_is_invalid() {
        assert!(
            GroupPhase::Idle
                .next(LifecycleEvent::ChannelAccepted)
                .is_err()
        );
        assert!(GroupPhase::Idle.next(LifecycleEvent::Cancel).is_err());
        assert!(!GroupPhase::Idle.accepts_submissions());
    }
}
