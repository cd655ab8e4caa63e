use super::error::{BotApiError, BotApiResult};

const DEFAULT_BASE_URL: &str = "https://api.telegram.org";
const DEFAULT_LINK_BASE: &str = "https://t.me";
const DEFAULT_PROBE_TEXT: &str = "number-hunt: checking posting rights";

/// Runtime configuration for the Bot API client.
#[derive(Debug, Clone)]
pub struct BotApiConfig {
    /// API host without trailing slash.
    pub base_url: String,
    /// Bot token.
    pub token: String,
    /// Public host used to build proof links (`{link_base}/{channel}/{message_id}`).
    pub link_base: String,
    /// Text of the message posted and deleted to check posting rights.
    pub probe_text: String,
}

impl BotApiConfig {
    /// Defaults for `token`.
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            token: token.into(),
            link_base: DEFAULT_LINK_BASE.to_owned(),
            probe_text: DEFAULT_PROBE_TEXT.to_owned(),
        }
    }

    /// Point the client at another API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Build a configuration from `BOT_TOKEN` and the optional `BOT_API_BASE_URL`.
    pub fn from_env() -> BotApiResult<Self> {
        let token = std::env::var("BOT_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty())
            .ok_or(BotApiError::MissingEnvVar { var: "BOT_TOKEN" })?;

        let mut config = Self::new(token);
        if let Ok(base_url) = std::env::var("BOT_API_BASE_URL") {
            config = config.with_base_url(base_url);
        }
        Ok(config)
    }
}
