use serde::{Deserialize, Serialize};

/// Identifier of a chat group running one game instance.
pub type GroupId = i64;
/// Identifier of a chat user.
pub type UserId = i64;

/// Reference to the media message proving a find, as known by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaRef {
    /// Chat the media message lives in (usually the group itself).
    pub chat_id: i64,
    /// Message carrying the photo or video.
    pub message_id: i64,
}

/// Rule deciding which claimed numbers advance the counter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptancePolicy {
    /// Only `current + 1` is accepted.
    #[default]
    StrictSuccessor,
    /// Any number above `current` is accepted and the counter jumps to it.
    AnyGreater,
}

impl AcceptancePolicy {
    /// Whether `claimed` may follow `current` under this policy.
    pub fn accepts(self, current: u64, claimed: u64) -> bool {
        match self {
            AcceptancePolicy::StrictSuccessor => current.checked_add(1) == Some(claimed),
            AcceptancePolicy::AnyGreater => claimed > current,
        }
    }
}

/// Successful submission outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accepted {
    /// The accepted number.
    pub number: u64,
    /// Link to the reposted proof.
    pub proof_link: String,
}

/// Per-user leaderboard line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserStats {
    /// Member id.
    pub user_id: UserId,
    /// Resolved display name, or `User {id}`.
    pub username: String,
    /// Numbers found.
    pub count: usize,
    /// Highest number found.
    pub latest_number: u64,
    /// Proof link of the highest number, if still stored.
    pub latest_link: Option<String>,
}

/// Snapshot of a group's progress.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupInfo {
    /// Last accepted number.
    pub current_number: u64,
    /// Proof link of the last accepted number.
    pub latest_link: Option<String>,
    /// Channel proofs are reposted to.
    pub channel_id: String,
}
