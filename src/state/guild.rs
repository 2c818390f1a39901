use dashmap::DashMap;

use super::room::{ChannelId, GuildId};

/// Text channel known for a guild.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChannel {
    /// Channel id.
    pub id: ChannelId,
    /// Channel name as shown in the guild.
    pub name: String,
}

/// What the gateway told us about a guild the service is part of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuildInfo {
    /// Guild id.
    pub guild_id: GuildId,
    /// Guild name.
    pub name: String,
    /// Channel the platform posts system messages in.
    pub system_channel_id: Option<ChannelId>,
    /// Text channels in advertised order.
    pub text_channels: Vec<TextChannel>,
}

impl GuildInfo {
    /// First text channel whose name contains any of `hints`, in advertised order.
    pub fn channel_named_like(&self, hints: &[&str]) -> Option<ChannelId> {
        self.text_channels
            .iter()
            .find(|channel| {
                let name = channel.name.to_lowercase();
                hints.iter().any(|hint| name.contains(hint))
            })
            .map(|channel| channel.id)
    }

    /// First advertised text channel.
    pub fn first_text_channel(&self) -> Option<ChannelId> {
        self.text_channels.first().map(|channel| channel.id)
    }
}

/// Guilds currently served, fed by the gateway.
#[derive(Default)]
pub struct GuildDirectory {
    guilds: DashMap<GuildId, GuildInfo>,
}

impl GuildDirectory {
    /// Store or replace a guild, true when it was not known.
    pub fn upsert(&self, info: GuildInfo) -> bool {
        self.guilds.insert(info.guild_id, info).is_none()
    }

    /// Forget a guild, true when it was known.
    pub fn remove(&self, guild_id: GuildId) -> bool {
        self.guilds.remove(&guild_id).is_some()
    }

    /// Copy of a known guild.
    pub fn get(&self, guild_id: GuildId) -> Option<GuildInfo> {
        self.guilds.get(&guild_id).map(|info| info.clone())
    }

    /// Snapshot of every known guild, ordered by id.
    pub fn all(&self) -> Vec<GuildInfo> {
        let mut guilds: Vec<GuildInfo> = self.guilds.iter().map(|info| info.clone()).collect();
        guilds.sort_by_key(|info| info.guild_id);
        guilds
    }

    /// Number of known guilds.
    pub fn len(&self) -> usize {
        self.guilds.len()
    }

    /// True when no guild is known.
    pub fn is_empty(&self) -> bool {
        self.guilds.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guild() -> GuildInfo {
        GuildInfo {
            guild_id: 1,
            name: "Study Hall".into(),
            system_channel_id: None,
            text_channels: vec![
                TextChannel {
                    id: 10,
                    name: "rules".into(),
                },
                TextChannel {
                    id: 11,
                    name: "Pomo-Reports".into(),
                },
                TextChannel {
                    id: 12,
                    name: "bot-spam".into(),
                },
            ],
        }
    }

    #[test]
    fn name_hint_lookup_is_case_insensitive_and_ordered() {
        let info = guild();
        assert_eq!(info.channel_named_like(&["pomo", "bot"]), Some(11));
        assert_eq!(info.channel_named_like(&["bot"]), Some(12));
        assert_eq!(info.channel_named_like(&["general"]), None);
        assert_eq!(info.first_text_channel(), Some(10));
    }

    #[test]
    fn directory_tracks_membership() {
        let directory = GuildDirectory::default();
        assert!(directory.upsert(guild()));
        assert!(!directory.upsert(guild()));
        assert_eq!(directory.all().len(), 1);
        assert!(directory.remove(1));
        assert!(directory.is_empty());
    }
}
