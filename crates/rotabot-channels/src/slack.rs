//! Slack chat gateway — Web API for sending and name resolution,
//! Socket Mode for the inbound event stream.

use async_trait::async_trait;
use futures::stream::Stream;
use serde::Deserialize;

use rotabot_core::config::SlackConfig;
use rotabot_core::error::{Result, RotaBotError};
use rotabot_core::traits::ChatGateway;
use rotabot_core::types::InboundMessage;

use crate::socket_mode;

/// Slack gateway backed by the Web API.
pub struct SlackGateway {
    config: SlackConfig,
    client: reqwest::Client,
}

impl SlackGateway {
    pub fn new(config: SlackConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(15))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }

    fn api_url(&self, method: &str) -> String {
        format!("https://slack.com/api/{method}")
    }

    /// Identify the bot itself — the responder needs its user id to
    /// recognize mentions.
    pub async fn auth_test(&self) -> Result<SlackIdentity> {
        let response = self
            .client
            .post(self.api_url("auth.test"))
            .bearer_auth(&self.config.bot_token)
            .send()
            .await
            .map_err(|e| RotaBotError::Channel(format!("auth.test failed: {e}")))?;

        let body: AuthTestResponse = response
            .json()
            .await
            .map_err(|e| RotaBotError::Channel(format!("invalid auth.test response: {e}")))?;

        if !body.ok {
            return Err(RotaBotError::Channel(format!(
                "auth.test rejected: {}",
                body.error.unwrap_or_default()
            )));
        }
        Ok(SlackIdentity {
            user_id: body.user_id.unwrap_or_default(),
            user: body.user.unwrap_or_default(),
        })
    }

    async fn list_users(&self) -> Result<Vec<SlackUser>> {
        let response = self
            .client
            .get(self.api_url("users.list"))
            .bearer_auth(&self.config.bot_token)
            .send()
            .await
            .map_err(|e| RotaBotError::Channel(format!("users.list failed: {e}")))?;

        let body: UsersListResponse = response
            .json()
            .await
            .map_err(|e| RotaBotError::Channel(format!("invalid users.list response: {e}")))?;

        if !body.ok {
            return Err(RotaBotError::Channel(format!(
                "users.list rejected: {}",
                body.error.unwrap_or_default()
            )));
        }
        Ok(body.members.unwrap_or_default())
    }

    async fn list_channels(&self) -> Result<Vec<SlackChannel>> {
        let response = self
            .client
            .get(self.api_url("conversations.list"))
            .bearer_auth(&self.config.bot_token)
            .query(&[("exclude_archived", "true"), ("limit", "1000")])
            .send()
            .await
            .map_err(|e| RotaBotError::Channel(format!("conversations.list failed: {e}")))?;

        let body: ChannelsListResponse = response.json().await.map_err(|e| {
            RotaBotError::Channel(format!("invalid conversations.list response: {e}"))
        })?;

        if !body.ok {
            return Err(RotaBotError::Channel(format!(
                "conversations.list rejected: {}",
                body.error.unwrap_or_default()
            )));
        }
        Ok(body.channels.unwrap_or_default())
    }
}

#[async_trait]
impl ChatGateway for SlackGateway {
    async fn send_message(&self, channel_or_user_id: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "channel": channel_or_user_id,
            "text": text,
        });
        let response = self
            .client
            .post(self.api_url("chat.postMessage"))
            .bearer_auth(&self.config.bot_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| RotaBotError::Channel(format!("chat.postMessage failed: {e}")))?;

        let result: ApiAck = response
            .json()
            .await
            .map_err(|e| RotaBotError::Channel(format!("invalid send response: {e}")))?;

        if !result.ok {
            return Err(RotaBotError::Channel(format!(
                "send rejected: {}",
                result.error.unwrap_or_default()
            )));
        }
        Ok(())
    }

    async fn user_id_by_name(&self, display_name: &str) -> Result<String> {
        let users = self.list_users().await?;
        Ok(match_user(&users, display_name))
    }

    async fn channel_id_by_name(&self, name: &str) -> Result<String> {
        let channels = self.list_channels().await?;
        Ok(match_channel(&channels, name))
    }

    async fn listen(&self) -> Result<Box<dyn Stream<Item = InboundMessage> + Send + Unpin>> {
        if self.config.app_token.is_empty() {
            return Err(RotaBotError::Channel(
                "socket mode requires an app-level token (xapp-...)".into(),
            ));
        }
        Ok(Box::new(socket_mode::start(self.config.clone())))
    }
}

/// Match a display name against the member list. Handle names take
/// priority; the profile display name is the fallback. "unknown" when
/// nothing matches.
fn match_user(users: &[SlackUser], display_name: &str) -> String {
    for user in users {
        if user.name == display_name {
            return user.id.clone();
        }
    }
    for user in users {
        if let Some(profile) = &user.profile {
            if profile.display_name.as_deref() == Some(display_name) {
                return user.id.clone();
            }
        }
    }
    "unknown".into()
}

fn match_channel(channels: &[SlackChannel], name: &str) -> String {
    let name = name.trim_start_matches('#');
    channels
        .iter()
        .find(|c| c.name == name)
        .map(|c| c.id.clone())
        .unwrap_or_else(|| "unknown".into())
}

/// Who the bot is, per auth.test.
#[derive(Debug, Clone)]
pub struct SlackIdentity {
    pub user_id: String,
    pub user: String,
}

// --- Slack API types ---

#[derive(Debug, Deserialize)]
struct ApiAck {
    ok: bool,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthTestResponse {
    ok: bool,
    error: Option<String>,
    user_id: Option<String>,
    user: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersListResponse {
    ok: bool,
    error: Option<String>,
    members: Option<Vec<SlackUser>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackUser {
    pub id: String,
    pub name: String,
    pub profile: Option<SlackProfile>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackProfile {
    pub display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChannelsListResponse {
    ok: bool,
    error: Option<String>,
    channels: Option<Vec<SlackChannel>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SlackChannel {
    pub id: String,
    pub name: String,
}
