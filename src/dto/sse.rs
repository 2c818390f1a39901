use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use utoipa::ToSchema;

use crate::{
    dao::models::{LeaderboardEntry, Timeframe},
    dto::{format_minutes, room::RoomStatus},
    state::room::{ChannelId, GuildId, UserId},
};

/// Text sent instead of a leaderboard when a manual report finds nothing.
pub const NO_DATA_MESSAGE: &str = "No study data available for this timeframe yet.";

#[derive(Clone, Debug)]
/// Dispatched payload carried across SSE channels.
pub struct ServerEvent {
    /// SSE event name, the default stream event when `None`.
    pub event: Option<String>,
    /// Serialised payload.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialised payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the SSE data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Serialize, ToSchema)]
/// Initial metadata sent to an SSE client when it connects.
pub struct Handshake {
    /// Name of the stream.
    pub stream: String,
    /// Greeting shown in logs.
    pub message: String,
    /// Whether the backend is running without a storage backend connection.
    pub degraded: bool,
}

#[derive(Debug, Serialize, ToSchema)]
/// Broadcast when the backend enters or leaves degraded mode.
pub struct SystemStatus {
    /// True while no session store is usable.
    pub degraded: bool,
}

/// How the gateway should deliver a status message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MessageMode {
    /// Edit the message previously sent under the same id.
    Edit,
    /// Send a new message and remember it under the id.
    New,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// `status.refresh`: the room status card must be rendered again.
pub struct StatusRefreshEvent {
    /// Stable id the gateway maps to a platform message.
    pub message_id: String,
    /// Edit in place or post anew.
    pub mode: MessageMode,
    /// Room to render.
    pub status: RoomStatus,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// `status.closed`: the room is gone and its status card can be retired.
pub struct StatusClosedEvent {
    /// Guild of the closed room.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub guild_id: GuildId,
    /// Voice channel of the closed room.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
    /// Status card to retire, if one was published.
    pub message_id: Option<String>,
}

/// What caused a report to be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportTrigger {
    /// Fired by the report scheduler.
    Scheduled,
    /// Requested with the leaderboard command.
    Manual,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// One ranked line of a leaderboard report.
pub struct LeaderboardLine {
    /// One-based position.
    pub rank: usize,
    /// Ranked user.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub user_id: UserId,
    /// Counter value for the window.
    pub minutes: u64,
    /// Minutes formatted as `Xh Ym`.
    pub display: String,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// `report`: a rendered leaderboard for one guild and window.
pub struct ReportEvent {
    /// Reported guild.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub guild_id: GuildId,
    /// Channel the report is posted in.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
    /// Reported window.
    pub timeframe: Timeframe,
    /// Heading such as `Weekly Leaderboard`.
    pub title: String,
    /// Scheduled or manual.
    pub trigger: ReportTrigger,
    /// Ranked lines, best first.
    pub entries: Vec<LeaderboardLine>,
    /// True when nobody studied in the window.
    pub no_data: bool,
    /// Set only when `no_data` is true.
    pub message: Option<String>,
}

impl ReportEvent {
    /// Render the store's ordered entries into a report.
    pub fn render(
        guild_id: GuildId,
        channel_id: ChannelId,
        timeframe: Timeframe,
        trigger: ReportTrigger,
        entries: &[LeaderboardEntry],
    ) -> Self {
        let no_data = entries.is_empty();
        Self {
            guild_id,
            channel_id,
            timeframe,
            title: format!("{} Leaderboard", timeframe.title()),
            trigger,
            entries: entries
                .iter()
                .enumerate()
                .map(|(index, entry)| LeaderboardLine {
                    rank: index + 1,
                    user_id: entry.user_id,
                    minutes: entry.minutes,
                    display: format_minutes(entry.minutes),
                })
                .collect(),
            no_data,
            message: no_data.then(|| NO_DATA_MESSAGE.to_owned()),
        }
    }
}

/// Audio cue played in the voice channel at a phase boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum VoiceAlertKind {
    /// A focus phase begins.
    FocusStart,
    /// A short or long break begins.
    BreakStart,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// `voice.alert`: play a cue in the room's voice channel.
pub struct VoiceAlertEvent {
    /// Guild of the voice channel.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub guild_id: GuildId,
    /// Voice channel to play the cue in.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
    /// Cue to play.
    pub kind: VoiceAlertKind,
    /// Room sound toggle at the boundary.
    pub sound_enabled: bool,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// `welcome`: greet a member who just joined the guild.
pub struct WelcomeEvent {
    /// Guild joined.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub guild_id: GuildId,
    /// Channel the card is posted in.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
    /// Member greeted.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub user_id: UserId,
    /// Card heading.
    pub title: String,
    /// Card body.
    pub description: String,
    /// Guild size, when known.
    pub member_count: Option<u64>,
    /// Custom text configured for the guild, sent alongside the card.
    pub custom_message: Option<String>,
    /// Sent from the admin test command rather than a real join.
    pub test: bool,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// `onboarding`: introduce the service in a guild that just added it.
pub struct OnboardingEvent {
    /// Guild that added the service.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub guild_id: GuildId,
    /// Channel the introduction is posted in.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
    /// Card heading.
    pub title: String,
    /// Card body.
    pub description: String,
    /// Getting-started tips, one per line.
    pub tips: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
/// `presence`: global activity line across every room.
pub struct PresenceEvent {
    /// Participants across every room.
    pub participants: usize,
    /// Line shown as the service's activity.
    pub text: String,
}

impl PresenceEvent {
    /// Presence line for `participants` people.
    pub fn new(participants: usize) -> Self {
        Self {
            participants,
            text: format!("{participants} People Working"),
        }
    }
}
