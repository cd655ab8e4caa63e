//! DTO definitions used by the group REST API and documentation layer.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    services::submission_adapter::SubmissionEvent,
    state::{
        game::{Accepted, GroupInfo, MediaRef, UserId, UserStats},
        lifecycle::GroupPhase,
    },
};

/// Request starting the setup conversation of a group.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct BeginInitRequest {
    #[validate(range(min = 1))]
    pub user_id: UserId,
}

/// Request naming the channel proofs are reposted to.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CompleteInitRequest {
    /// Public channel handle, e.g. `@my_channel`.
    pub channel: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelInitResponse {
    /// Whether a pending setup existed.
    pub cancelled: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PhaseResponse {
    pub phase: GroupPhase,
}

/// Location of a photo or video message on the chat platform.
#[derive(Debug, Clone, Copy, Deserialize, ToSchema)]
pub struct MediaRefDto {
    pub chat_id: i64,
    pub message_id: i64,
}

impl From<MediaRefDto> for MediaRef {
    fn from(value: MediaRefDto) -> Self {
        Self {
            chat_id: value.chat_id,
            message_id: value.message_id,
        }
    }
}

/// Inbound message shapes that can report a find.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SubmissionPayload {
    /// Media message whose caption starts with `<number>!`.
    Caption { caption: String, media: MediaRefDto },
    /// `/submit <number>` or `/found <number>` replying to the media message.
    Command {
        text: String,
        #[serde(default)]
        reply_to: Option<MediaRefDto>,
    },
}

impl From<SubmissionPayload> for SubmissionEvent {
    fn from(value: SubmissionPayload) -> Self {
        match value {
            SubmissionPayload::Caption { caption, media } => SubmissionEvent::Caption {
                caption,
                media: media.into(),
            },
            SubmissionPayload::Command { text, reply_to } => SubmissionEvent::Command {
                text,
                reply_to: reply_to.map(Into::into),
            },
        }
    }
}

/// A find reported by a group member.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct SubmissionRequest {
    #[validate(range(min = 1))]
    pub user_id: UserId,
    pub event: SubmissionPayload,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AcceptedResponse {
    pub number: u64,
    /// Link to the reposted proof in the group channel.
    pub proof_link: String,
}

impl From<Accepted> for AcceptedResponse {
    fn from(value: Accepted) -> Self {
        Self {
            number: value.number,
            proof_link: value.proof_link,
        }
    }
}

/// Request wiping all group data; the requester must be a group administrator.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct ResetRequest {
    #[validate(range(min = 1))]
    pub user_id: UserId,
}

/// One leaderboard line.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserStatsResponse {
    pub user_id: UserId,
    pub username: String,
    pub count: usize,
    pub latest_number: u64,
    pub latest_link: Option<String>,
}

impl From<UserStats> for UserStatsResponse {
    fn from(value: UserStats) -> Self {
        Self {
            user_id: value.user_id,
            username: value.username,
            count: value.count,
            latest_number: value.latest_number,
            latest_link: value.latest_link,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GroupInfoResponse {
    pub current_number: u64,
    pub latest_link: Option<String>,
    pub channel_id: String,
}

impl From<GroupInfo> for GroupInfoResponse {
    fn from(value: GroupInfo) -> Self {
        Self {
            current_number: value.current_number,
            latest_link: value.latest_link,
            channel_id: value.channel_id,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryEntry {
    pub number: u64,
    pub link: String,
}

/// Flatten the number -> link map, keeping ascending order.
pub fn history_entries(history: BTreeMap<u64, String>) -> Vec<HistoryEntry> {
    history
        .into_iter()
        .map(|(number, link)| HistoryEntry { number, link })
        .collect()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserSubmissionsResponse {
    pub user_id: UserId,
    pub numbers: Vec<u64>,
}

impl UserSubmissionsResponse {
    pub fn new(user_id: UserId, numbers: BTreeSet<u64>) -> Self {
        Self {
            user_id,
            numbers: numbers.into_iter().collect(),
        }
    }
}

/// Error body shape; rejections may add fields such as `expected`/`got`
/// or `existing_link`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_payload_is_tagged_by_kind() {
        let request: SubmissionRequest = serde_json::from_str(
            r#"{"user_id": 42, "event": {"kind": "command", "text": "/found 3",
                "reply_to": {"chat_id": -100, "message_id": 9}}}"#,
        )
        .unwrap();

        let event: SubmissionEvent = request.event.into();
        assert_eq!(
            event,
            SubmissionEvent::Command {
                text: "/found 3".into(),
                reply_to: Some(MediaRef {
                    chat_id: -100,
                    message_id: 9
                }),
            }
        );
    }

    #[test]
    fn request_validation_rejects_bad_ids() {
        assert!(BeginInitRequest { user_id: 0 }.validate().is_err());
        assert!(ResetRequest { user_id: 7 }.validate().is_ok());
    }

    #[test]
    fn history_entries_stay_sorted() {
        let entries = history_entries(BTreeMap::from([(3, "c".into()), (1, "a".into())]));
        let numbers: Vec<_> = entries.iter().map(|entry| entry.number).collect();
        assert_eq!(numbers, vec![1, 3]);
    }
}
