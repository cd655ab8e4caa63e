use serde::{Deserialize, Serialize};

/// Envelope shared by every Bot API response.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub error_code: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct MessageId {
    pub message_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct ChatMember {
    pub status: String,
}

impl ChatMember {
    pub fn is_admin(&self) -> bool {
        matches!(self.status.as_str(), "creator" | "administrator")
    }
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CopyMessageRequest<'a> {
    pub chat_id: &'a str,
    pub from_chat_id: i64,
    pub message_id: i64,
    pub caption: &'a str,
}

#[derive(Debug, Serialize)]
pub struct SendMessageRequest<'a> {
    pub chat_id: &'a str,
    pub text: &'a str,
    pub disable_notification: bool,
}

#[derive(Debug, Serialize)]
pub struct DeleteMessageRequest<'a> {
    pub chat_id: &'a str,
    pub message_id: i64,
}

#[derive(Debug, Serialize)]
pub struct GetChatMemberRequest {
    pub chat_id: i64,
    pub user_id: i64,
}

#[derive(Debug, Serialize)]
pub struct GetChatRequest {
    pub chat_id: i64,
}

/// Public link to a channel post; `@name` handles lose their marker.
pub fn post_link(link_base: &str, channel_id: &str, message_id: i64) -> String {
    let channel = channel_id.trim_start_matches('@');
    format!("{}/{}/{}", link_base.trim_end_matches('/'), channel, message_id)
}
