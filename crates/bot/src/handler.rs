use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::Rng;

use crate::hydrus::MediaIndex;
use crate::models::{InboundMessage, MessageType, ReplyPayload};
use crate::resolver::{MediaResolver, ResolveError};
use crate::tags::{extract_tags, strip_reply_fallback};

/// The chat side of the bridge: who we are and how to post into a room.
#[async_trait]
pub trait ChatClient: Send + Sync {
    fn user_id(&self) -> &str;

    async fn send_message(&self, room_id: &str, content: &ReplyPayload) -> anyhow::Result<()>;
}

#[derive(Debug, thiserror::Error)]
pub enum HandleError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("failed to send reply: {0:#}")]
    Dispatch(anyhow::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    Redacted,
    NotText,
    OwnMessage,
    EmptyBody,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOutcome {
    Ignored(IgnoreReason),
    NoTags,
    NoMatches,
    Replied(ReplyPayload),
    Failed,
}

pub struct Bot<M, C, R = StdRng> {
    resolver: MediaResolver<M, R>,
    chat: C,
}

impl<M, C, R> Bot<M, C, R>
where
    M: MediaIndex,
    C: ChatClient,
    R: Rng + Send,
{
    pub fn new(resolver: MediaResolver<M, R>, chat: C) -> Self {
        Self { resolver, chat }
    }

    pub fn chat(&self) -> &C {
        &self.chat
    }

    /// Filters the event, runs the lookup and posts the reply. Errors are
    /// logged here and never reach the room.
    pub async fn handle_message(&self, message: &InboundMessage) -> HandleOutcome {
        match self.try_handle(message).await {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::error!(room_id = %message.room_id, %error, "failed to handle message");
                HandleOutcome::Failed
            }
        }
    }

    pub async fn try_handle(&self, message: &InboundMessage) -> Result<HandleOutcome, HandleError> {
        let Some(content) = &message.content else {
            return Ok(HandleOutcome::Ignored(IgnoreReason::Redacted));
        };
        if content.message_type != MessageType::Text {
            return Ok(HandleOutcome::Ignored(IgnoreReason::NotText));
        }
        if message.sender == self.chat.user_id() {
            return Ok(HandleOutcome::Ignored(IgnoreReason::OwnMessage));
        }
        let body = match content.body.as_deref() {
            Some(b) if !b.is_empty() => b,
            _ => return Ok(HandleOutcome::Ignored(IgnoreReason::EmptyBody)),
        };

        let body = if content.is_reply {
            strip_reply_fallback(body)
        } else {
            body
        };

        let tags = extract_tags(body);
        if tags.is_empty() {
            return Ok(HandleOutcome::NoTags);
        }
        tracing::info!(room_id = %message.room_id, sender = %message.sender, ?tags, "tag lookup");

        let Some(payload) = self.resolver.resolve(&tags).await? else {
            tracing::debug!(?tags, "no files matched");
            return Ok(HandleOutcome::NoMatches);
        };

        self.chat
            .send_message(&message.room_id, &payload)
            .await
            .map_err(HandleError::Dispatch)?;
        tracing::info!(room_id = %message.room_id, url = %payload.url, "sent image");

        Ok(HandleOutcome::Replied(payload))
    }
}

/// Decides which room invites the bot accepts.
#[derive(Debug, Clone, Default)]
pub struct InvitePolicy {
    allowed_senders: Vec<String>,
}

impl InvitePolicy {
    pub fn new(allowed_senders: Vec<String>) -> Self {
        Self { allowed_senders }
    }

    pub fn should_accept(&self, sender: &str) -> bool {
        self.allowed_senders.iter().any(|s| s == sender)
    }
}
