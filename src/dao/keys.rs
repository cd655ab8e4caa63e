//! Key naming for everything persisted on behalf of a group.
//!
//! Layout:
//! - `group:{id}:channel_id` string
//! - `group:{id}:current_number` decimal integer
//! - `group:{id}:message_history` map number -> proof link
//! - `group:{id}:user_submissions:{user_id}` set of numbers

use crate::state::game::{GroupId, UserId};

const CHANNEL_ID: &str = "channel_id";
const CURRENT_NUMBER: &str = "current_number";
const MESSAGE_HISTORY: &str = "message_history";
const USER_SUBMISSIONS: &str = "user_submissions";

/// Key builder scoped to a single group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupKeys {
    group_id: GroupId,
}

impl GroupKeys {
    /// Keys of `group_id`.
    pub fn new(group_id: GroupId) -> Self {
        Self { group_id }
    }

    /// Prefix shared by every key of the group, trailing separator included so
    /// `group:1:` never matches `group:12:...`.
    pub fn prefix(&self) -> String {
        format!("group:{}:", self.group_id)
    }

    /// Channel the group reposts proofs to.
    pub fn channel_id(&self) -> String {
        format!("{}{CHANNEL_ID}", self.prefix())
    }

    /// Last accepted number.
    pub fn current_number(&self) -> String {
        format!("{}{CURRENT_NUMBER}", self.prefix())
    }

    /// Hash of number to proof link.
    pub fn message_history(&self) -> String {
        format!("{}{MESSAGE_HISTORY}", self.prefix())
    }

    /// Set of numbers found by `user_id`.
    pub fn user_submissions(&self, user_id: UserId) -> String {
        format!("{}{user_id}", self.user_submissions_prefix())
    }

    /// Prefix shared by every per-user set of the group.
    pub fn user_submissions_prefix(&self) -> String {
        format!("{}{USER_SUBMISSIONS}:", self.prefix())
    }

    /// Recover the user id from a key produced by [`GroupKeys::user_submissions`].
    pub fn parse_user_submissions(&self, key: &str) -> Option<UserId> {
        key.strip_prefix(&self.user_submissions_prefix())?
            .parse()
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_follow_group_layout() {
        let keys = GroupKeys::new(-100123);
        assert_eq!(keys.channel_id(), "group:-100123:channel_id");
        assert_eq!(keys.current_number(), "group:-100123:current_number");
        assert_eq!(keys.message_history(), "group:-100123:message_history");
        assert_eq!(
            keys.user_submissions(42),
            "group:-100123:user_submissions:42"
        );
    }

    #[test]
    fn prefix_does_not_overlap_other_groups() {
        let short = GroupKeys::new(1);
        let long = GroupKeys::new(12);
        assert!(!long.channel_id().starts_with(&short.prefix()));
    }

    #[test]
    fn parse_user_submissions_round_trips_only_user_keys() {
        let keys = GroupKeys::new(5);
        assert_eq!(
            keys.parse_user_submissions(&keys.user_submissions(77)),
            Some(77)
        );
        assert_eq!(keys.parse_user_submissions(&keys.channel_id()), None);
        assert_eq!(
            keys.parse_user_submissions("group:5:user_submissions:abc"),
            None
        );
    }
}
