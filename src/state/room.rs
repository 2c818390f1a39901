use indexmap::IndexSet;
use serde::Serialize;
use utoipa::ToSchema;

use crate::config::TimerConfig;

/// Platform snowflake of a user.
pub type UserId = u64;
/// Platform snowflake of a guild (the "group" owning rooms).
pub type GuildId = u64;
/// Platform snowflake of a voice or text channel.
pub type ChannelId = u64;

/// Registry key of a room: one live room per guild channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomKey {
    /// Guild owning the channel.
    pub guild_id: GuildId,
    /// Voice channel hosting the room.
    pub channel_id: ChannelId,
}

impl RoomKey {
    /// Key of the room in `channel_id` of `guild_id`.
    pub fn new(guild_id: GuildId, channel_id: ChannelId) -> Self {
        Self {
            guild_id,
            channel_id,
        }
    }
}

/// Timer mode of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Work interval; completing it credits every participant.
    Focus,
    /// Short rest between two focus phases.
    Break,
    /// Longer rest after every configured number of focus rounds.
    LongBreak,
}

impl Phase {
    /// Whether the phase earns credit when it completes.
    pub fn is_focus(self) -> bool {
        matches!(self, Phase::Focus)
    }
}

/// Long break played after every `every_rounds` completed focus rounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LongBreakSettings {
    /// Length of the long break in seconds.
    pub duration_secs: u32,
    /// Number of focus rounds between two long breaks.
    pub every_rounds: u32,
}

/// Settings a room is created with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomSettings {
    /// Focus phase length in seconds.
    pub focus_secs: u32,
    /// Short break length in seconds.
    pub break_secs: u32,
    /// Long break escalation, `None` to only ever use short breaks.
    pub long_break: Option<LongBreakSettings>,
    /// Whether status cards ask the gateway to play a sound.
    pub sound_enabled: bool,
    /// Whether phase changes trigger a voice channel cue.
    pub voice_alerts_enabled: bool,
}

impl RoomSettings {
    /// Global defaults taken from the timer configuration.
    pub fn from_timer(config: &TimerConfig) -> Self {
        Self {
            focus_secs: config.focus_minutes * 60,
            break_secs: config.break_minutes * 60,
            long_break: config.long_break.map(|long_break| LongBreakSettings {
                duration_secs: long_break.minutes * 60,
                every_rounds: long_break.every_rounds,
            }),
            sound_enabled: true,
            voice_alerts_enabled: true,
        }
    }
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self::from_timer(&TimerConfig::default())
    }
}

/// Runtime change requested through the settings command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsChange {
    /// New focus length in seconds.
    pub focus_secs: u32,
    /// New short break length in seconds.
    pub break_secs: u32,
    /// New sound toggle.
    pub sound_enabled: bool,
    /// New voice alert toggle.
    pub voice_alerts_enabled: bool,
}

/// Live session of one channel. Lives in the registry only while it has participants.
#[derive(Debug, Clone)]
pub struct Room {
    key: RoomKey,
    phase: Phase,
    duration_secs: u32,
    remaining_secs: u32,
    custom_focus_secs: u32,
    custom_break_secs: u32,
    long_break: Option<LongBreakSettings>,
    sound_enabled: bool,
    voice_alerts_enabled: bool,
    participants: IndexSet<UserId>,
    confirmed: IndexSet<UserId>,
    status_message_ref: Option<String>,
    round_number: u32,
    secs_since_refresh: u32,
}

/// Everything a phase boundary needs once the room has already flipped.
///
/// Values are captured so post-boundary work never touches the live room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseBoundary {
    /// Room that crossed the boundary.
    pub key: RoomKey,
    /// Phase that just completed.
    pub ended: Phase,
    /// Full length of the completed phase.
    pub ended_duration_secs: u32,
    /// Round number of the phase that just ended.
    pub ended_round: u32,
    /// Participants present when the countdown reached zero.
    pub participants: Vec<UserId>,
    /// Phase the room is now in.
    pub next: Phase,
    /// Length of the phase that just started.
    pub next_duration_secs: u32,
    /// Sound toggle at the time of the boundary.
    pub sound_enabled: bool,
    /// Voice alert toggle at the time of the boundary.
    pub voice_alerts_enabled: bool,
}

impl PhaseBoundary {
    /// Whole minutes credited to every participant, rounded half up.
    pub fn credited_minutes(&self) -> u32 {
        if self.ended.is_focus() {
            (self.ended_duration_secs + 30) / 60
        } else {
            0
        }
    }
}

/// Read-only copy of a room handed out of the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomSnapshot {
    /// Registry key of the room.
    pub key: RoomKey,
    /// Current phase.
    pub phase: Phase,
    /// Full length of the current phase.
    pub duration_secs: u32,
    /// Seconds left in the current phase, never above `duration_secs`.
    pub remaining_secs: u32,
    /// Focus length used for upcoming focus phases.
    pub focus_secs: u32,
    /// Short break length used for upcoming breaks.
    pub break_secs: u32,
    /// Sound toggle.
    pub sound_enabled: bool,
    /// Voice alert toggle.
    pub voice_alerts_enabled: bool,
    /// Users in the channel, in join order.
    pub participants: Vec<UserId>,
    /// Participants who confirmed their presence this phase.
    pub confirmed: Vec<UserId>,
    /// Focus round in progress or last completed, starting at one.
    pub round_number: u32,
    /// Status card last published for the room.
    pub status_message_ref: Option<String>,
}

impl Room {
    /// Fresh room at the start of round one, with no participants yet.
    pub fn new(key: RoomKey, settings: RoomSettings) -> Self {
        Self {
            key,
            phase: Phase::Focus,
            duration_secs: settings.focus_secs,
            remaining_secs: settings.focus_secs,
            custom_focus_secs: settings.focus_secs,
            custom_break_secs: settings.break_secs,
            long_break: settings.long_break,
            sound_enabled: settings.sound_enabled,
            voice_alerts_enabled: settings.voice_alerts_enabled,
            participants: IndexSet::new(),
            confirmed: IndexSet::new(),
            status_message_ref: None,
            round_number: 1,
            secs_since_refresh: 0,
        }
    }

    /// Registry key of the room.
    pub fn key(&self) -> RoomKey {
        self.key
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Seconds left in the current phase.
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    /// Full length of the current phase.
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    /// Current round number.
    pub fn round_number(&self) -> u32 {
        self.round_number
    }

    /// Number of users in the room.
    pub fn participant_count(&self) -> usize {
        self.participants.len()
    }

    /// True once the last participant left.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Whether `user_id` is a participant.
    pub fn contains(&self, user_id: UserId) -> bool {
        self.participants.contains(&user_id)
    }

    /// Returns `false` when the user was already present.
    pub fn add_participant(&mut self, user_id: UserId) -> bool {
        self.participants.insert(user_id)
    }

    /// Returns `false` when the user was not present.
    pub fn remove_participant(&mut self, user_id: UserId) -> bool {
        self.confirmed.shift_remove(&user_id);
        self.participants.shift_remove(&user_id)
    }

    /// Only participants can confirm. Returns `false` otherwise.
    pub fn confirm(&mut self, user_id: UserId) -> bool {
        if !self.participants.contains(&user_id) {
            return false;
        }
        self.confirmed.insert(user_id);
        true
    }

    /// Remember the status card currently shown for the room.
    pub fn set_status_message_ref(&mut self, message_ref: Option<String>) {
        self.status_message_ref = message_ref;
    }

    fn duration_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Focus => self.custom_focus_secs,
            Phase::Break => self.custom_break_secs,
            Phase::LongBreak => self
                .long_break
                .map_or(self.custom_break_secs, |long_break| long_break.duration_secs),
        }
    }

    fn next_phase(&self) -> Phase {
        match self.phase {
            Phase::Focus => match self.long_break {
                Some(long_break)
                    if long_break.every_rounds > 0
                        && self.round_number % long_break.every_rounds == 0 =>
                {
                    Phase::LongBreak
                }
                _ => Phase::Break,
            },
            Phase::Break | Phase::LongBreak => Phase::Focus,
        }
    }

    /// Count down by `step_secs` and flip the phase when the countdown reaches zero.
    pub fn advance(&mut self, step_secs: u32) -> Option<PhaseBoundary> {
        self.remaining_secs = self.remaining_secs.saturating_sub(step_secs);
        self.secs_since_refresh = self.secs_since_refresh.saturating_add(step_secs);
        if self.remaining_secs > 0 {
            return None;
        }

        let ended = self.phase;
        let ended_duration_secs = self.duration_secs;
        let ended_round = self.round_number;
        let next = self.next_phase();
        if ended.is_focus() {
            self.round_number += 1;
        }

        self.phase = next;
        self.duration_secs = self.duration_for(next);
        self.remaining_secs = self.duration_secs;
        self.confirmed.clear();
        self.secs_since_refresh = 0;

        Some(PhaseBoundary {
            key: self.key,
            ended,
            ended_duration_secs,
            ended_round,
            participants: self.participants.iter().copied().collect(),
            next,
            next_duration_secs: self.duration_secs,
            sound_enabled: self.sound_enabled,
            voice_alerts_enabled: self.voice_alerts_enabled,
        })
    }

    /// True once per throttle window; resets the window when it fires.
    pub fn take_refresh_due(&mut self, throttle_secs: u32) -> bool {
        if self.secs_since_refresh < throttle_secs {
            return false;
        }
        self.secs_since_refresh = 0;
        true
    }

    /// Apply new durations to the current phase without restarting it.
    pub fn apply_settings(&mut self, change: SettingsChange) {
        self.custom_focus_secs = change.focus_secs;
        self.custom_break_secs = change.break_secs;
        self.sound_enabled = change.sound_enabled;
        self.voice_alerts_enabled = change.voice_alerts_enabled;
        self.duration_secs = self.duration_for(self.phase);
        self.remaining_secs = self.remaining_secs.min(self.duration_secs);
    }

    /// Copy of the room state for readers outside the registry.
    pub fn snapshot(&self) -> RoomSnapshot {
        RoomSnapshot {
            key: self.key,
            phase: self.phase,
            duration_secs: self.duration_secs,
            remaining_secs: self.remaining_secs,
            focus_secs: self.custom_focus_secs,
            break_secs: self.custom_break_secs,
            sound_enabled: self.sound_enabled,
            voice_alerts_enabled: self.voice_alerts_enabled,
            participants: self.participants.iter().copied().collect(),
            confirmed: self.confirmed.iter().copied().collect(),
            round_number: self.round_number,
            status_message_ref: self.status_message_ref.clone(),
        }
    }
}
