use dashmap::DashMap;

use super::room::{GuildId, PhaseBoundary, Room, RoomKey, RoomSettings, RoomSnapshot, UserId};

/// Result of adding a user to a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinResult {
    /// The room did not exist and was created around this user.
    Created,
    /// The user was added to an existing room.
    Joined,
    /// The user was already a participant.
    AlreadyPresent,
}

/// Result of removing a user from a room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeaveResult {
    /// No live room under that key.
    UnknownRoom,
    /// The room exists but the user was not part of it.
    NotParticipant,
    /// The user left and others remain.
    Left,
    /// The user was the last participant and the room is gone.
    RoomRemoved {
        status_message_ref: Option<String>,
    },
}

/// Work produced by one engine step over every live room.
#[derive(Debug, Default)]
pub struct AdvanceReport {
    /// Rooms that completed a phase during the step.
    pub boundaries: Vec<PhaseBoundary>,
    /// Rooms due for a throttled status refresh.
    pub refreshes: Vec<RoomKey>,
}

/// In-memory owner of every live room plus the user -> room index.
///
/// A room is present iff it has at least one participant: rooms are only
/// created by [`RoomRegistry::join`] and removed by [`RoomRegistry::leave`]
/// when the last participant goes.
#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomKey, Room>,
    users: DashMap<UserId, RoomKey>,
}

impl RoomRegistry {
    /// Registry without rooms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user_id` to the room under `key`, creating the room with `settings` if needed.
    pub fn join(&self, key: RoomKey, user_id: UserId, settings: RoomSettings) -> JoinResult {
        let mut created = false;
        let added = {
            let mut room = self.rooms.entry(key).or_insert_with(|| {
                created = true;
                Room::new(key, settings)
            });
            room.add_participant(user_id)
        };
        self.users.insert(user_id, key);

        match (created, added) {
            (true, _) => JoinResult::Created,
            (false, true) => JoinResult::Joined,
            (false, false) => JoinResult::AlreadyPresent,
        }
    }

    /// Remove `user_id` from the room under `key`, dropping the room when it empties.
    pub fn leave(&self, key: RoomKey, user_id: UserId) -> LeaveResult {
        let (removed, empty) = match self.rooms.get_mut(&key) {
            Some(mut room) => (room.remove_participant(user_id), room.is_empty()),
            None => return LeaveResult::UnknownRoom,
        };

        if removed {
            self.users.remove_if(&user_id, |_, indexed| *indexed == key);
        }

        // Re-checked under the shard lock so a concurrent join keeps the room alive.
        if empty {
            if let Some((_, room)) = self.rooms.remove_if(&key, |_, room| room.is_empty()) {
                return LeaveResult::RoomRemoved {
                    status_message_ref: room.snapshot().status_message_ref,
                };
            }
        }

        if removed {
            LeaveResult::Left
        } else {
            LeaveResult::NotParticipant
        }
    }

    /// Snapshot of the room under `key`.
    pub fn get(&self, key: RoomKey) -> Option<RoomSnapshot> {
        self.rooms.get(&key).map(|room| room.snapshot())
    }

    /// Whether a room lives under `key`.
    pub fn contains(&self, key: RoomKey) -> bool {
        self.rooms.contains_key(&key)
    }

    /// Key of the room the user currently occupies.
    pub fn room_of(&self, user_id: UserId) -> Option<RoomKey> {
        self.users.get(&user_id).map(|key| *key)
    }

    /// Snapshot of the room the user occupies.
    pub fn find_by_user(&self, user_id: UserId) -> Option<RoomSnapshot> {
        let key = self.room_of(user_id)?;
        self.get(key)
    }

    /// Run `f` against the live room under `key`.
    pub fn with_room_mut<T>(&self, key: RoomKey, f: impl FnOnce(&mut Room) -> T) -> Option<T> {
        self.rooms.get_mut(&key).map(|mut room| f(room.value_mut()))
    }

    /// Run `f` against the live room the user occupies.
    pub fn with_user_room_mut<T>(
        &self,
        user_id: UserId,
        f: impl FnOnce(&mut Room) -> T,
    ) -> Option<T> {
        let key = self.room_of(user_id)?;
        self.with_room_mut(key, |room| room.contains(user_id).then(|| f(room)))
            .flatten()
    }

    /// Advance every live room by `step_secs`.
    ///
    /// Rooms flip their phase in place; the returned boundaries carry copies of
    /// what the post-boundary work needs.
    pub fn advance_all(&self, step_secs: u32, refresh_throttle_secs: u32) -> AdvanceReport {
        let mut report = AdvanceReport::default();
        for mut room in self.rooms.iter_mut() {
            match room.advance(step_secs) {
                Some(boundary) => report.boundaries.push(boundary),
                None => {
                    if room.take_refresh_due(refresh_throttle_secs) {
                        report.refreshes.push(*room.key());
                    }
                }
            }
        }
        report
    }

    /// Number of live rooms.
    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    /// True when no room is live.
    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    /// Participants across every live room.
    pub fn total_participants(&self) -> usize {
        self.rooms.iter().map(|room| room.participant_count()).sum()
    }

    /// Drop every room of a guild, returning each key with its last status message.
    pub fn remove_guild(&self, guild_id: GuildId) -> Vec<(RoomKey, Option<String>)> {
        let keys: Vec<RoomKey> = self
            .rooms
            .iter()
            .filter(|room| room.key().guild_id == guild_id)
            .map(|room| *room.key())
            .collect();

        keys.into_iter()
            .filter_map(|key| {
                let (_, room) = self.rooms.remove(&key)?;
                self.users.retain(|_, indexed| *indexed != key);
                Some((key, room.snapshot().status_message_ref))
            })
            .collect()
    }
}
