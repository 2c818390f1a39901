use serde::Serialize;
use serde_with::{DisplayFromStr, serde_as};
use utoipa::ToSchema;

use crate::{
    dto::format_clock,
    state::room::{ChannelId, GuildId, Phase, RoomSnapshot, UserId},
};

/// Public view of a live room, shared by the status command and status notifications.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RoomStatus {
    /// Guild owning the room.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub guild_id: GuildId,
    /// Voice channel of the room.
    #[serde_as(as = "DisplayFromStr")]
    #[schema(value_type = String)]
    pub channel_id: ChannelId,
    /// Current phase.
    pub phase: Phase,
    /// Remaining time formatted as `mm:ss`.
    pub remaining: String,
    /// Remaining time in seconds.
    pub remaining_secs: u32,
    /// Full length of the current phase.
    pub duration_secs: u32,
    /// Focus length setting.
    pub focus_minutes: u32,
    /// Short break length setting.
    pub break_minutes: u32,
    /// Current focus round, starting at one.
    pub round_number: u32,
    /// Participants in join order.
    #[serde_as(as = "Vec<DisplayFromStr>")]
    #[schema(value_type = Vec<String>)]
    pub participants: Vec<UserId>,
    /// Number of participants.
    pub participant_count: usize,
    /// Participants who confirmed this phase.
    pub confirmed_count: usize,
    /// Sound toggle.
    pub sound_enabled: bool,
    /// Voice alert toggle.
    pub voice_alerts_enabled: bool,
}

impl From<&RoomSnapshot> for RoomStatus {
    fn from(snapshot: &RoomSnapshot) -> Self {
        Self {
            guild_id: snapshot.key.guild_id,
            channel_id: snapshot.key.channel_id,
            phase: snapshot.phase,
            remaining: format_clock(snapshot.remaining_secs),
            remaining_secs: snapshot.remaining_secs,
            duration_secs: snapshot.duration_secs,
            focus_minutes: snapshot.focus_secs / 60,
            break_minutes: snapshot.break_secs / 60,
            round_number: snapshot.round_number,
            participants: snapshot.participants.clone(),
            participant_count: snapshot.participants.len(),
            confirmed_count: snapshot.confirmed.len(),
            sound_enabled: snapshot.sound_enabled,
            voice_alerts_enabled: snapshot.voice_alerts_enabled,
        }
    }
}
