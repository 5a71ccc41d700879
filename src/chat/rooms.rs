//! Room membership tracking.
//!
//! A room is the set of participants currently present in one conversation.
//! Rooms are created on first join and dropped as soon as they empty. A reverse
//! index (user → conversations) keeps disconnect cleanup proportional to the
//! rooms the user actually occupies.

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct RoomTracker {
    /// conversation_id -> present user ids
    rooms: Arc<DashMap<String, HashSet<String>>>,
    /// user_id -> conversation ids the user is present in
    by_user: Arc<DashMap<String, HashSet<String>>>,
}

impl RoomTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `user_id` to the room. Returns false if the user was already present.
    pub fn join(&self, conversation_id: &str, user_id: &str) -> bool {
        let added = self
            .rooms
            .entry(conversation_id.to_string())
            .or_default()
            .insert(user_id.to_string());

        self.by_user
            .entry(user_id.to_string())
            .or_default()
            .insert(conversation_id.to_string());

        added
    }

    /// Remove `user_id` from the room, dropping the room once empty.
    /// Returns false if the user was not present.
    pub fn leave(&self, conversation_id: &str, user_id: &str) -> bool {
        let removed = self.remove_member(conversation_id, user_id);

        if let Some(mut rooms) = self.by_user.get_mut(user_id) {
            rooms.remove(conversation_id);
        }
        self.by_user.remove_if(user_id, |_, rooms| rooms.is_empty());

        removed
    }

    /// Remove `user_id` from every room it occupies.
    /// Returns the conversations it was removed from.
    pub fn leave_all(&self, user_id: &str) -> Vec<String> {
        let Some((_, conversations)) = self.by_user.remove(user_id) else {
            return Vec::new();
        };

        let mut left: Vec<String> = conversations
            .into_iter()
            .filter(|conversation_id| self.remove_member(conversation_id, user_id))
            .collect();
        left.sort();
        left
    }

    /// Snapshot of the users present in a room, sorted. Empty for an absent room.
    pub fn members(&self, conversation_id: &str) -> Vec<String> {
        let mut members: Vec<String> = self
            .rooms
            .get(conversation_id)
            .map(|entry| entry.value().iter().cloned().collect())
            .unwrap_or_default();
        members.sort();
        members
    }

    pub fn is_member(&self, conversation_id: &str, user_id: &str) -> bool {
        self.rooms
            .get(conversation_id)
            .map(|entry| entry.value().contains(user_id))
            .unwrap_or(false)
    }

    pub fn member_count(&self, conversation_id: &str) -> usize {
        self.rooms
            .get(conversation_id)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Whether a room entry exists at all (rooms are never kept empty).
    pub fn contains_room(&self, conversation_id: &str) -> bool {
        self.rooms.contains_key(conversation_id)
    }

    /// Number of non-empty rooms.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total presences across all rooms.
    pub fn total_members(&self) -> usize {
        self.rooms.iter().map(|entry| entry.value().len()).sum()
    }

    fn remove_member(&self, conversation_id: &str, user_id: &str) -> bool {
        let removed = match self.rooms.get_mut(conversation_id) {
            Some(mut entry) => entry.value_mut().remove(user_id),
            None => false,
        };
        self.rooms
            .remove_if(conversation_id, |_, members| members.is_empty());
        removed
    }
}
