use bitflags::bitflags;
use glam::{DVec3, IVec3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::block::BlockId;
use crate::coords::ColumnPos;

pub const PROTOCOL_VERSION: u32 = 1;

/// Plugin-message channel the client and server exchange brand strings on.
pub const BRAND_CHANNEL: &str = "skarn:brand";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct ColumnFlags: u8 {
        /// The payload describes the whole column: install replaces rather
        /// than merges, and an empty bitmask means "unload this column".
        const FULL_COLUMN = 0b0000_0001;
        /// Encoded sections carry a sky-light array after block light.
        const SKY_LIGHT   = 0b0000_0010;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum C2S {
    Handshake {
        protocol_version: u32,
        username: String,
    },
    /// Movement acknowledgement; sent once per `TeleportPlayer` received.
    PositionLook {
        position: DVec3,
        yaw: f32,
        pitch: f32,
        on_ground: bool,
    },
    PluginMessage {
        channel: String,
        data: Vec<u8>,
    },
    Disconnect,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum S2C {
    JoinGame {
        player_id: i32,
        gamemode: u8,
        dimension: i32,
    },
    ServerText {
        origin: TextOrigin,
        text: String,
    },
    Respawn {
        dimension: i32,
    },
    ChunkColumn {
        pos: ColumnPos,
        sections: u16,
        flags: u8,
        data: Vec<u8>,
    },
    ChunkColumnBatch {
        sky_light: bool,
        columns: Vec<ColumnMeta>,
        data: Vec<u8>,
    },
    BlockChange {
        world_pos: IVec3,
        block: BlockId,
    },
    MultiBlockChange {
        column: ColumnPos,
        records: Vec<BlockRecord>,
    },
    PluginMessage {
        channel: String,
        data: Vec<u8>,
    },
    TeleportPlayer {
        position: DVec3,
        yaw: f32,
        pitch: f32,
    },
    TimeSync {
        tick: u64,
        time_of_day: f32,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TextOrigin {
    Chat,
    System,
    ActionBar,
}

/// Per-column record of a batched column payload; the shared buffer is
/// consumed record by record in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMeta {
    pub pos: ColumnPos,
    pub sections: u16,
}

/// One edit of a multi-block batch: local x/z packed in one byte, world y,
/// and the block to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockRecord {
    pub xz: u8,
    pub y: u8,
    pub block: BlockId,
}

impl BlockRecord {
    pub fn new(local_x: u8, local_z: u8, y: u8, block: BlockId) -> Self {
        Self {
            xz: (local_x << 4) | (local_z & 0x0F),
            y,
            block,
        }
    }

    pub fn local_x(self) -> u8 {
        self.xz >> 4
    }

    pub fn local_z(self) -> u8 {
        self.xz & 0x0F
    }
}

/// Variant identity of an inbound message; the dispatch registry is keyed
/// by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    JoinGame,
    ServerText,
    Respawn,
    ChunkColumn,
    ChunkColumnBatch,
    BlockChange,
    MultiBlockChange,
    PluginMessage,
    TeleportPlayer,
    TimeSync,
}

impl S2C {
    pub fn kind(&self) -> MessageKind {
        match self {
            S2C::JoinGame { .. } => MessageKind::JoinGame,
            S2C::ServerText { .. } => MessageKind::ServerText,
            S2C::Respawn { .. } => MessageKind::Respawn,
            S2C::ChunkColumn { .. } => MessageKind::ChunkColumn,
            S2C::ChunkColumnBatch { .. } => MessageKind::ChunkColumnBatch,
            S2C::BlockChange { .. } => MessageKind::BlockChange,
            S2C::MultiBlockChange { .. } => MessageKind::MultiBlockChange,
            S2C::PluginMessage { .. } => MessageKind::PluginMessage,
            S2C::TeleportPlayer { .. } => MessageKind::TeleportPlayer,
            S2C::TimeSync { .. } => MessageKind::TimeSync,
        }
    }
}

pub fn encode<T: Serialize>(msg: &T) -> Vec<u8> {
    bincode::serialize(msg).expect("failed to encode protocol payload")
}

pub fn decode<T: DeserializeOwned>(data: &[u8]) -> Result<T, bincode::Error> {
    bincode::deserialize(data)
}

#[cfg(test)]
mod tests {
    use glam::{DVec3, IVec3};

    use super::{decode, encode, BlockRecord, ColumnFlags, ColumnMeta, MessageKind, S2C};
    use crate::block::BlockId;
    use crate::coords::ColumnPos;

    #[test]
    fn block_record_packs_and_unpacks_local_coords() {
        let record = BlockRecord::new(13, 6, 200, BlockId::SAND);
        assert_eq!(record.local_x(), 13);
        assert_eq!(record.local_z(), 6);
        assert_eq!(record.y, 200);
    }

    #[test]
    fn column_flags_survive_the_wire_as_bits() {
        let flags = ColumnFlags::FULL_COLUMN | ColumnFlags::SKY_LIGHT;
        let restored = ColumnFlags::from_bits_truncate(flags.bits());
        assert!(restored.contains(ColumnFlags::FULL_COLUMN));
        assert!(restored.contains(ColumnFlags::SKY_LIGHT));
    }

    #[test]
    fn batch_message_round_trips_through_bincode() {
        let msg = S2C::ChunkColumnBatch {
            sky_light: true,
            columns: vec![
                ColumnMeta {
                    pos: ColumnPos::new(-3, 7),
                    sections: 0b1010,
                },
                ColumnMeta {
                    pos: ColumnPos::new(0, -1),
                    sections: 0b0001,
                },
            ],
            data: vec![1, 2, 3],
        };
        let decoded: S2C = decode(&encode(&msg)).expect("decode batch");
        assert_eq!(decoded, msg);
    }

    #[test]
    fn kind_is_stable_per_variant() {
        assert_eq!(
            S2C::TeleportPlayer {
                position: DVec3::ZERO,
                yaw: 0.0,
                pitch: 0.0,
            }
            .kind(),
            MessageKind::TeleportPlayer
        );
        assert_eq!(
            S2C::BlockChange {
                world_pos: IVec3::ZERO,
                block: BlockId::AIR,
            }
            .kind(),
            MessageKind::BlockChange
        );
    }
}
