//! Role chooser.
//!
//! Members pick roles by reacting to a chooser message the bot posts in a
//! channel. There is at most one chooser message per channel; on restart the
//! bot attaches to the message it posted earlier instead of posting a new one.
//! Reactions with unrelated emoji are removed.
//!
//! The existing message is reused even if the configured choices changed
//! since it was posted. Delete the old message after changing the choices.

pub mod handler;
pub mod sync;

pub use sync::{emoji_matches, role_action, RoleAction};

use dashmap::DashMap;
use poise::serenity_prelude::{
    self as serenity, ChannelId, CreateEmbed, CreateMessage, GetMessages, MessageId,
    ReactionType, RoleId,
};
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::ChooserConfig;

/// How far back to look for a message posted by a previous run.
const HISTORY_LIMIT: u8 = 100;

#[derive(Error, Debug)]
pub enum ChooserError {
    #[error("The choice list is empty")]
    NoChoices,
    #[error("Role {0} is offered more than once")]
    RepeatedRole(RoleId),
    #[error("Icon {0} is used more than once")]
    RepeatedIcon(String),
    #[error("Invalid icon: {0}")]
    InvalidIcon(String),
    #[error("Channel {0} already has a chooser")]
    RepeatedChannel(ChannelId),
    #[error("Channel {0} is not a guild text channel")]
    NotGuildChannel(ChannelId),
    #[error("Role {0} does not belong to the chooser's guild")]
    ForeignRole(RoleId),
    #[error("Chooser in channel {0} is already enabled")]
    AlreadyEnabled(ChannelId),
}

#[derive(Debug, Clone)]
pub struct Choice {
    pub icon: ReactionType,
    pub role_id: RoleId,
    pub add_message: String,
    pub remove_message: String,
}

#[derive(Debug, Clone)]
pub struct Chooser {
    pub channel_id: ChannelId,
    title: Option<String>,
    notes: Vec<String>,
    choices: Vec<Choice>,
}

impl Chooser {
    pub fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id,
            title: None,
            notes: Vec::new(),
            choices: Vec::new(),
        }
    }

    pub fn from_config(config: &ChooserConfig) -> Result<Self, ChooserError> {
        let mut chooser = Self::new(config.channel_id);
        if let Some(title) = &config.title {
            chooser.set_title(title);
        }
        for choice in &config.choices {
            chooser.add_choice(
                &choice.icon,
                choice.role_id,
                &choice.add_message,
                &choice.remove_message,
            )?;
        }
        for note in &config.notes {
            chooser.add_note(note);
        }
        if chooser.choices.is_empty() {
            return Err(ChooserError::NoChoices);
        }
        Ok(chooser)
    }

    pub fn set_title(&mut self, title: &str) {
        self.title = Some(title.to_string());
    }

    /// Adds a footnote. Notes are separated by blank lines.
    pub fn add_note(&mut self, note: &str) {
        self.notes.push(note.to_string());
    }

    /// `icon` is a single Unicode emoji or a custom emoji code such as
    /// `<:cat:706936837247336568>`.
    pub fn add_choice(
        &mut self,
        icon: &str,
        role_id: RoleId,
        add_message: &str,
        remove_message: &str,
    ) -> Result<(), ChooserError> {
        let icon_type = ReactionType::try_from(icon.trim())
            .map_err(|_| ChooserError::InvalidIcon(icon.to_string()))?;

        for choice in &self.choices {
            if choice.role_id == role_id {
                return Err(ChooserError::RepeatedRole(role_id));
            }
            if emoji_matches(&choice.icon, &icon_type) {
                return Err(ChooserError::RepeatedIcon(icon.to_string()));
            }
        }

        self.choices.push(Choice {
            icon: icon_type,
            role_id,
            add_message: add_message.to_string(),
            remove_message: remove_message.to_string(),
        });
        Ok(())
    }

    pub fn find_choice(&self, emoji: &ReactionType) -> Option<&Choice> {
        self.choices.iter().find(|choice| emoji_matches(&choice.icon, emoji))
    }

    /// Embed description: one `<icon> <role>` line per choice, then the notes.
    pub fn render(&self, role_names: &HashMap<RoleId, String>) -> String {
        let mut text = self
            .choices
            .iter()
            .map(|choice| {
                let name = role_names
                    .get(&choice.role_id)
                    .cloned()
                    .unwrap_or_else(|| choice.role_id.to_string());
                format!("{} {}", choice.icon, name)
            })
            .collect::<Vec<_>>()
            .join("\n");

        for note in &self.notes {
            text.push_str("\n\n");
            text.push_str(note);
        }
        text
    }

    /// Attaches to the chooser message in the channel, posting it first when
    /// there is none yet.
    pub async fn enable(&self, ctx: &serenity::Context) -> Result<MessageId, crate::Error> {
        let channel = self
            .channel_id
            .to_channel(ctx)
            .await?
            .guild()
            .ok_or(ChooserError::NotGuildChannel(self.channel_id))?;

        let roles = channel.guild_id.roles(&ctx.http).await?;
        if let Some(choice) = self.choices.iter().find(|c| !roles.contains_key(&c.role_id)) {
            return Err(ChooserError::ForeignRole(choice.role_id).into());
        }

        let bot_id = ctx.cache.current_user().id;
        let history = self
            .channel_id
            .messages(ctx, GetMessages::new().limit(HISTORY_LIMIT))
            .await?;
        if let Some(existing) = history
            .iter()
            .find(|msg| msg.author.id == bot_id && !msg.embeds.is_empty())
        {
            info!("Attached to chooser {} in {}", existing.id, channel.name);
            return Ok(existing.id);
        }

        info!("Creating a chooser in {} of {}", channel.name, channel.guild_id);

        let role_names: HashMap<RoleId, String> = roles
            .into_iter()
            .map(|(id, role)| (id, role.name))
            .collect();
        let mut embed = CreateEmbed::new().description(self.render(&role_names));
        if let Some(title) = &self.title {
            embed = embed.title(title);
        }

        let message = self
            .channel_id
            .send_message(ctx, CreateMessage::new().embed(embed))
            .await?;
        self.add_reactions(ctx, message.id).await?;
        Ok(message.id)
    }

    /// Adds one bot reaction per choice to the chooser message.
    pub async fn add_reactions(
        &self,
        ctx: &serenity::Context,
        message_id: MessageId,
    ) -> Result<(), crate::Error> {
        for choice in &self.choices {
            self.channel_id
                .create_reaction(&ctx.http, message_id, choice.icon.clone())
                .await?;
        }
        Ok(())
    }
}

/// Configured choosers and the messages they are attached to.
#[derive(Debug, Default)]
pub struct ChooserRegistry {
    choosers: Vec<Chooser>,
    attached: DashMap<MessageId, usize>,
}

impl ChooserRegistry {
    pub fn from_config(configs: &[ChooserConfig]) -> Result<Self, ChooserError> {
        let mut channels = HashSet::new();
        let mut choosers = Vec::with_capacity(configs.len());
        for config in configs {
            if !channels.insert(config.channel_id) {
                return Err(ChooserError::RepeatedChannel(config.channel_id));
            }
            choosers.push(Chooser::from_config(config)?);
        }
        Ok(Self {
            choosers,
            attached: DashMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.choosers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choosers.is_empty()
    }

    /// Records `message_id` as the message of chooser `index`. A chooser is
    /// attached to one message at most.
    fn attach(&self, index: usize, message_id: MessageId) -> Result<(), ChooserError> {
        if self.is_attached(index) {
            let channel_id = self.choosers[index].channel_id;
            return Err(ChooserError::AlreadyEnabled(channel_id));
        }
        self.attached.insert(message_id, index);
        Ok(())
    }

    fn is_attached(&self, index: usize) -> bool {
        self.attached.iter().any(|entry| *entry.value() == index)
    }

    /// Chooser owning the given message, if it is a chooser message.
    pub fn by_message(&self, message_id: MessageId) -> Option<&Chooser> {
        let index = *self.attached.get(&message_id)?;
        self.choosers.get(index)
    }

    /// Enables every chooser not attached yet. Runs on each `ready`, so a
    /// reconnect does not post duplicates. Failures are logged per chooser.
    pub async fn enable_all(&self, ctx: &serenity::Context) {
        for (index, chooser) in self.choosers.iter().enumerate() {
            if self.is_attached(index) {
                continue;
            }
            match chooser.enable(ctx).await {
                Ok(message_id) => {
                    if let Err(e) = self.attach(index, message_id) {
                        warn!("{}", e);
                    }
                }
                Err(e) => error!(
                    "Failed to enable chooser in channel {}: {}",
                    chooser.channel_id, e
                ),
            }
        }
    }
}
