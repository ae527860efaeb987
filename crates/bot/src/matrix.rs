//! Matrix side of the bot, using matrix-sdk.

use anyhow::Context as _;
use async_trait::async_trait;
use bones_shared::constants::ROOM_MESSAGE_EVENT;
use matrix_sdk::config::SyncSettings;
use matrix_sdk::matrix_auth::{MatrixSession, MatrixSessionTokens};
use matrix_sdk::ruma::events::room::member::StrippedRoomMemberEvent;
use matrix_sdk::ruma::events::room::message::{Relation, SyncRoomMessageEvent};
use matrix_sdk::ruma::events::room::tombstone::OriginalSyncRoomTombstoneEvent;
use matrix_sdk::ruma::{device_id, OwnedDeviceId, OwnedUserId, RoomId, UserId};
use matrix_sdk::{Client, Room, RoomState, SessionMeta};
use serde::Deserialize;
use std::sync::Arc;

use crate::config::Config;
use crate::handler::{Bot, ChatClient, InvitePolicy};
use crate::hydrus::MediaIndex;
use crate::models::{InboundMessage, MessageContent, MessageType, ReplyPayload};

#[derive(Deserialize)]
struct WhoAmI {
    user_id: String,
    device_id: Option<String>,
}

/// Logged-in Matrix client plus our own user id.
pub struct MatrixAdapter {
    client: Client,
    user_id: OwnedUserId,
}

impl MatrixAdapter {
    /// Builds the client on a SQLite store and restores a session from the
    /// configured access token.
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.store_path).with_context(|| {
            format!(
                "failed to create matrix store dir: {}",
                config.store_path.display()
            )
        })?;

        let client = Client::builder()
            .homeserver_url(&config.homeserver)
            .sqlite_store(&config.store_path, None)
            .build()
            .await
            .context("failed to build matrix client")?;

        let whoami = whoami(&config.homeserver, &config.access_token).await?;
        let user_id = UserId::parse(&whoami.user_id).context("invalid user id from whoami")?;
        let device_id = whoami
            .device_id
            .map(OwnedDeviceId::from)
            .unwrap_or_else(|| device_id!("BONES").to_owned());

        let session = MatrixSession {
            meta: SessionMeta {
                user_id: user_id.clone(),
                device_id,
            },
            tokens: MatrixSessionTokens {
                access_token: config.access_token.clone(),
                refresh_token: None,
            },
        };
        client
            .restore_session(session)
            .await
            .context("failed to restore matrix session from access token")?;
        tracing::info!(%user_id, "matrix session restored");

        Ok(Self { client, user_id })
    }

    pub fn chat(&self) -> MatrixChat {
        MatrixChat {
            client: self.client.clone(),
            user_id: self.user_id.to_string(),
        }
    }

    /// Registers the event handlers and syncs until the connection dies.
    pub async fn run<M>(
        self,
        bot: Arc<Bot<M, MatrixChat>>,
        invites: InvitePolicy,
    ) -> anyhow::Result<()>
    where
        M: MediaIndex + 'static,
    {
        self.client.add_event_handler(
            move |event: StrippedRoomMemberEvent, client: Client, room: Room| {
                let invites = invites.clone();
                async move {
                    if client.user_id().is_some_and(|me| event.state_key != *me) {
                        return;
                    }
                    if room.state() != RoomState::Invited {
                        return;
                    }
                    tracing::info!(room_id = %room.room_id(), sender = %event.sender, "invited to room");
                    if !invites.should_accept(event.sender.as_str()) {
                        tracing::info!(room_id = %room.room_id(), "ignoring invite from unlisted sender");
                        return;
                    }
                    match room.join().await {
                        Ok(_) => tracing::info!(room_id = %room.room_id(), "joined room"),
                        Err(error) => {
                            tracing::warn!(%error, room_id = %room.room_id(), "failed to join room")
                        }
                    }
                }
            },
        );

        self.client.add_event_handler(
            |event: OriginalSyncRoomTombstoneEvent, client: Client| async move {
                let replacement = event.content.replacement_room;
                tracing::info!(%replacement, "room upgraded, following");
                if let Err(error) = client.join_room_by_id(&replacement).await {
                    tracing::warn!(%error, %replacement, "failed to join upgraded room");
                }
            },
        );

        // Skip the backlog so old messages are not answered after a restart
        let response = self
            .client
            .sync_once(SyncSettings::default())
            .await
            .context("initial matrix sync failed")?;

        self.client.add_event_handler(
            move |event: SyncRoomMessageEvent, room: Room| {
                let bot = bot.clone();
                async move {
                    let message = inbound_message(event, &room);
                    bot.handle_message(&message).await;
                }
            },
        );

        tracing::info!(user_id = %self.user_id, "Client started!");
        self.client
            .sync(SyncSettings::default().token(response.next_batch))
            .await
            .context("matrix sync loop ended")?;

        Ok(())
    }
}

async fn whoami(homeserver: &str, access_token: &str) -> anyhow::Result<WhoAmI> {
    let url = format!(
        "{}/_matrix/client/v3/account/whoami",
        homeserver.trim_end_matches('/')
    );
    let res = reqwest::Client::new()
        .get(&url)
        .bearer_auth(access_token)
        .send()
        .await
        .context("whoami request failed")?;

    if !res.status().is_success() {
        anyhow::bail!("whoami returned {}", res.status());
    }

    res.json().await.context("failed to parse whoami response")
}

fn inbound_message(event: SyncRoomMessageEvent, room: &Room) -> InboundMessage {
    let room_id = room.room_id().to_string();
    match event {
        SyncRoomMessageEvent::Original(original) => {
            let is_reply = matches!(original.content.relates_to, Some(Relation::Reply { .. }));
            InboundMessage {
                room_id,
                sender: original.sender.to_string(),
                content: Some(MessageContent {
                    message_type: MessageType::from_msgtype(original.content.msgtype()),
                    body: Some(original.content.body().to_string()),
                    is_reply,
                }),
            }
        }
        SyncRoomMessageEvent::Redacted(redacted) => InboundMessage {
            room_id,
            sender: redacted.sender.to_string(),
            content: None,
        },
    }
}

/// `ChatClient` backed by a matrix-sdk client.
#[derive(Clone)]
pub struct MatrixChat {
    client: Client,
    user_id: String,
}

#[async_trait]
impl ChatClient for MatrixChat {
    fn user_id(&self) -> &str {
        &self.user_id
    }

    async fn send_message(&self, room_id: &str, content: &ReplyPayload) -> anyhow::Result<()> {
        let room_id = <&RoomId>::try_from(room_id).context("invalid matrix room id")?;
        let room = self
            .client
            .get_room(room_id)
            .context("room not found (not joined?)")?;
        let content = serde_json::to_value(content).context("failed to serialize reply")?;
        room.send_raw(ROOM_MESSAGE_EVENT, content)
            .await
            .context("failed to send matrix message")?;
        Ok(())
    }
}
