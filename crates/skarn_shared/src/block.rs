use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

#[repr(transparent)]
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Pod,
    Zeroable,
)]
pub struct BlockId(pub u16);

impl BlockId {
    pub const AIR: Self = Self(0);
    pub const STONE: Self = Self(1);
    pub const SOIL: Self = Self(2);
    pub const TURF: Self = Self(3);
    pub const GRAVEL: Self = Self(4);
    pub const TIMBER: Self = Self(5);
    pub const LEAVES: Self = Self(6);
    pub const WATER: Self = Self(7);
    pub const SAND: Self = Self(8);
    pub const GLOWSTONE: Self = Self(9);

    pub fn is_air(self) -> bool {
        self == Self::AIR
    }
}

#[cfg(test)]
mod tests {
    use super::BlockId;

    #[test]
    fn air_is_the_default_and_only_air() {
        assert_eq!(BlockId::default(), BlockId::AIR);
        assert!(BlockId::AIR.is_air());
        assert!(!BlockId::STONE.is_air());
    }
}
