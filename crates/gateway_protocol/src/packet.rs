//! Packet type catalog.
//!
//! Fixed table of named integer codes grouped into semantic bands. The
//! codes are wire-stable: adding a type appends a new code, and existing
//! codes are never reused or renumbered. On the wire a packet type is a
//! bare integer in the envelope's `type` field.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Error returned when an integer code does not resolve to a catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownPacketCode(pub u16);

impl fmt::Display for UnknownPacketCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown packet type code: {}", self.0)
    }
}

impl std::error::Error for UnknownPacketCode {}

macro_rules! packet_catalog {
    ( $( $name:ident = $code:literal ),+ $(,)? ) => {
        /// A packet type from the closed catalog.
        ///
        /// Serialized as its integer code; deserialization of a code not
        /// in the catalog fails (a recoverable decode error, never a panic).
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(into = "u16", try_from = "u16")]
        pub enum PacketType {
            $( $name, )+
        }

        impl PacketType {
            /// The stable wire code for this packet type.
            pub const fn code(self) -> u16 {
                match self {
                    $( PacketType::$name => $code, )+
                }
            }

            /// Resolve an integer code to a catalog entry, if it exists.
            pub const fn from_code(code: u16) -> Option<PacketType> {
                match code {
                    $( $code => Some(PacketType::$name), )+
                    _ => None,
                }
            }
        }
    };
}

packet_catalog! {
    // Connection / auth (0-9)
    Heartbeat = 0,
    AuthRequest = 1,
    Handshake = 2,
    Disconnect = 3,
    SessionInvalid = 4,
    ReconnectRequest = 5,
    ReconnectSuccess = 6,
    ClientPing = 7,
    ServerPong = 8,

    // Chat / social (10-29)
    ChatMsg = 10,
    PrivateMsg = 11,
    PostArticle = 12,
    GroupChat = 13,
    SystemBroadcast = 14,
    ChatHistoryPull = 15,
    ChatHistoryPush = 16,
    ChatMuteNotice = 17,
    Emote = 18,

    // Friend / relationship (30-49)
    FriendApply = 30,
    FriendApplyResult = 31,
    FriendDelete = 32,
    FriendStatusUpdate = 33,
    BlockUser = 34,
    UnblockUser = 35,

    // Guild / team (50-69)
    GuildCreate = 50,
    GuildInvite = 51,
    GuildApply = 52,
    GuildKick = 53,
    GuildQuit = 54,
    GuildInfoUpdate = 55,
    GuildChat = 56,

    // Matchmaking / battle (70-89)
    MatchQueueEnter = 70,
    MatchQueueCancel = 71,
    MatchFound = 72,
    MatchTimeout = 73,
    BattleStart = 74,
    BattleAction = 75,
    BattleSyncState = 76,
    BattleEnd = 77,
    BattleReconnect = 78,
    BattlePenalty = 79,

    // Mail / notification (90-109)
    MailListRequest = 90,
    MailRead = 91,
    MailRewardClaim = 92,
    MailDelete = 93,
    NotifyPopup = 94,

    // Quest / achievement (110-129)
    QuestUpdate = 110,
    QuestReward = 111,
    AchievementUnlock = 112,
    SeasonPassProgress = 113,

    // Economy / trade (130-149)
    InventorySync = 130,
    ItemUse = 131,
    ItemReward = 132,
    TradeRequest = 133,
    TradeResult = 134,
    AuctionBid = 135,

    // World / event (150-169)
    WorldEventTrigger = 150,
    WorldEventReward = 151,
    DungeonEnter = 152,
    DungeonResult = 153,
    ResourcePointUpdate = 154,

    // Party / room (170-189)
    PartyCreate = 170,
    PartyInvite = 171,
    PartyReady = 172,
    PartyStart = 173,
    PartyLeave = 174,

    // Spectate / replay (190-199)
    SpectateRequest = 190,
    SpectateEnd = 191,
    ReplayRequest = 192,
    ReplayData = 193,

    // Anti-cheat / moderation (200-209)
    AntiCheatAlert = 200,
    BanNotice = 201,
    ClientLogUpload = 202,

    // Server management / admin (210-229)
    ServerLogin = 210,
    ServerLoginResp = 211,
    ServerHeartbeat = 212,
    ServerInfo = 213,
    AdminCommand = 214,
    AdminCommandResp = 215,
}

impl From<PacketType> for u16 {
    fn from(value: PacketType) -> Self {
        value.code()
    }
}

impl TryFrom<u16> for PacketType {
    type Error = UnknownPacketCode;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        PacketType::from_code(code).ok_or(UnknownPacketCode(code))
    }
}

impl fmt::Display for PacketType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_resolve_both_ways() {
        assert_eq!(PacketType::ServerLogin.code(), 210);
        assert_eq!(PacketType::from_code(210), Some(PacketType::ServerLogin));
        assert_eq!(PacketType::from_code(211), Some(PacketType::ServerLoginResp));
        assert_eq!(PacketType::from_code(214), Some(PacketType::AdminCommand));
        assert_eq!(PacketType::Heartbeat.code(), 0);
    }

    #[test]
    fn unknown_code_is_rejected() {
        assert_eq!(PacketType::from_code(999), None);
        assert_eq!(PacketType::try_from(999), Err(UnknownPacketCode(999)));
    }

    #[test]
    fn serializes_as_bare_integer() {
        let json = serde_json::to_string(&PacketType::AdminCommand).unwrap();
        assert_eq!(json, "214");

        let parsed: PacketType = serde_json::from_str("212").unwrap();
        assert_eq!(parsed, PacketType::ServerHeartbeat);
    }

    #[test]
    fn deserializing_unknown_code_fails() {
        let result: Result<PacketType, _> = serde_json::from_str("47");
        assert!(result.is_err());
    }
}
