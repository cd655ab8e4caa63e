use std::sync::Arc;

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::{
    state::game::{GroupId, MediaRef, UserId},
    transport::{Transport, TransportResult},
};

use super::{
    config::BotApiConfig,
    error::{BotApiError, BotApiResult},
    models::{
        ApiResponse, Chat, ChatMember, CopyMessageRequest, DeleteMessageRequest,
        GetChatMemberRequest, GetChatRequest, MessageId, SendMessageRequest, post_link,
    },
};

/// [`Transport`] backed by a Telegram-compatible Bot API over HTTPS.
#[derive(Clone)]
pub struct BotApiTransport {
    client: Client,
    endpoint: Arc<str>,
    link_base: Arc<str>,
    probe_text: Arc<str>,
}

impl BotApiTransport {
    /// Build the HTTP client.
    pub fn new(config: BotApiConfig) -> BotApiResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| BotApiError::ClientBuilder { source })?;

        let endpoint = format!(
            "{}/bot{}",
            config.base_url.trim_end_matches('/'),
            config.token
        );

        Ok(Self {
            client,
            endpoint: Arc::from(endpoint),
            link_base: Arc::from(config.link_base),
            probe_text: Arc::from(config.probe_text),
        })
    }

    async fn call<B, T>(&self, method: &'static str, body: &B) -> BotApiResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        let url = format!("{}/{}", self.endpoint, method);
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|source| BotApiError::RequestSend { method, source })?;

        // Refusals come back as 4xx with a JSON envelope, so decode regardless of status.
        let status = response.status();
        let envelope = response
            .json::<ApiResponse<T>>()
            .await
            .map_err(|source| BotApiError::DecodeResponse {
                method,
                status,
                source,
            })?;

        if !envelope.ok {
            return Err(BotApiError::Refused {
                method,
                error_code: envelope.error_code,
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("status {status}")),
            });
        }

        envelope
            .result
            .ok_or(BotApiError::EmptyResult { method })
    }

    async fn copy_to_channel(
        &self,
        channel_id: &str,
        media: MediaRef,
        caption: &str,
    ) -> BotApiResult<String> {
        let copied: MessageId = self
            .call(
                "copyMessage",
                &CopyMessageRequest {
                    chat_id: channel_id,
                    from_chat_id: media.chat_id,
                    message_id: media.message_id,
                    caption,
                },
            )
            .await?;

        Ok(post_link(&self.link_base, channel_id, copied.message_id))
    }

    async fn probe(&self, channel_id: &str) -> BotApiResult<bool> {
        let sent = self
            .call::<_, MessageId>(
                "sendMessage",
                &SendMessageRequest {
                    chat_id: channel_id,
                    text: &self.probe_text,
                    disable_notification: true,
                },
            )
            .await;

        let probe = match sent {
            Ok(message) => message,
            Err(BotApiError::Refused { description, .. }) => {
                debug!(channel_id, %description, "channel probe refused");
                return Ok(false);
            }
            Err(err) => return Err(err),
        };

        let deleted = self
            .call::<_, bool>(
                "deleteMessage",
                &DeleteMessageRequest {
                    chat_id: channel_id,
                    message_id: probe.message_id,
                },
            )
            .await;
        if let Err(err) = deleted {
            warn!(channel_id, error = %err, "failed to delete channel probe message");
        }

        Ok(true)
    }

    async fn member_is_admin(&self, group_id: GroupId, user_id: UserId) -> BotApiResult<bool> {
        let member = self
            .call::<_, ChatMember>(
                "getChatMember",
                &GetChatMemberRequest {
                    chat_id: group_id,
                    user_id,
                },
            )
            .await;

        match member {
            Ok(member) => Ok(member.is_admin()),
            Err(BotApiError::Refused { .. }) => Ok(false),
            Err(err) => Err(err),
        }
    }

    async fn username(&self, user_id: UserId) -> BotApiResult<String> {
        let chat: Chat = self
            .call("getChat", &GetChatRequest { chat_id: user_id })
            .await?;

        chat.username
            .map(|name| format!("@{name}"))
            .or(chat.first_name)
            .ok_or(BotApiError::EmptyResult { method: "getChat" })
    }
}

impl Transport for BotApiTransport {
    fn post_media(
        &self,
        channel_id: String,
        media: MediaRef,
        caption: String,
    ) -> BoxFuture<'static, TransportResult<String>> {
        let transport = self.clone();
        Box::pin(async move {
            transport
                .copy_to_channel(&channel_id, media, &caption)
                .await
                .map_err(Into::into)
        })
    }

    fn probe_channel_admin(&self, channel_id: String) -> BoxFuture<'static, TransportResult<bool>> {
        let transport = self.clone();
        Box::pin(async move { transport.probe(&channel_id).await.map_err(Into::into) })
    }

    fn is_group_admin(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> BoxFuture<'static, TransportResult<bool>> {
        let transport = self.clone();
        Box::pin(async move {
            transport
                .member_is_admin(group_id, user_id)
                .await
                .map_err(Into::into)
        })
    }

    fn resolve_username(&self, user_id: UserId) -> BoxFuture<'static, TransportResult<String>> {
        let transport = self.clone();
        Box::pin(async move { transport.username(user_id).await.map_err(Into::into) })
    }
}
