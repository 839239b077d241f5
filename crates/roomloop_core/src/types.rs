//! # Core Type Definitions
//!
//! Identifiers and value types shared by the driver, the callback registry and
//! the replication policy engines.
//!
//! ## Key Types
//!
//! - [`ActorNumber`] - Per-room identifier of a session participant
//! - [`ViewId`] - Identifier of a networked object
//! - [`Player`] - Snapshot of a participant as seen by this client
//! - [`PropertyTable`] - Custom room/player properties

use serde::{Deserialize, Serialize};
use std::fmt;

/// Custom properties attached to rooms and players.
///
/// Keys are short strings, values are arbitrary JSON so that game code can
/// store whatever it needs without the driver knowing the schema.
pub type PropertyTable = serde_json::Map<String, serde_json::Value>;

/// Numeric code carried by matchmaking failure notifications.
pub type ReturnCode = i16;

/// Identifier of a participant inside a room.
///
/// Actor numbers are assigned by the server when a player joins and are only
/// unique within that room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorNumber(pub i32);

impl ActorNumber {
    /// Returns the raw actor number.
    #[inline]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ActorNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i32> for ActorNumber {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

/// Identifier of a networked object (a "view") whose state is replicated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ViewId(pub u32);

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "view:{}", self.0)
    }
}

/// A participant of the current room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Actor number assigned by the server
    pub actor: ActorNumber,
    /// Display name chosen by the player
    pub nickname: String,
    /// Authenticated user id, if the server exposes it
    pub user_id: Option<String>,
    /// Whether this player currently is the master client
    pub is_master: bool,
    /// Custom player properties
    #[serde(default)]
    pub properties: PropertyTable,
}

impl Player {
    /// Creates a player with no custom properties.
    pub fn new(actor: impl Into<ActorNumber>, nickname: impl Into<String>) -> Self {
        Self {
            actor: actor.into(),
            nickname: nickname.into(),
            user_id: None,
            is_master: false,
            properties: PropertyTable::new(),
        }
    }
}

/// Presence information for a friend, as reported by a friend list update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendInfo {
    pub user_id: String,
    pub is_online: bool,
    /// Name of the room the friend is in, if any
    pub room: Option<String>,
}

/// Summary of a room this client is in or just created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    pub name: String,
    pub max_players: u8,
    pub player_count: u8,
    #[serde(default)]
    pub properties: PropertyTable,
}

impl RoomInfo {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            max_players: 0,
            player_count: 0,
            properties: PropertyTable::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_number_display_and_order() {
        let a = ActorNumber(1);
        let b = ActorNumber::from(7);
        assert!(a < b);
        assert_eq!(b.get(), 7);
        assert_eq!(a.to_string(), "#1");
    }

    #[test]
    fn test_player_serde_defaults_properties() {
        let json = r#"{"actor":3,"nickname":"kit","user_id":null,"is_master":true}"#;
        let player: Player = serde_json::from_str(json).unwrap();
        assert_eq!(player.actor, ActorNumber(3));
        assert!(player.is_master);
        assert!(player.properties.is_empty());
    }
}
