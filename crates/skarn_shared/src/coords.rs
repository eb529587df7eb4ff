use glam::IVec3;
use serde::{Deserialize, Serialize};

pub const SECTION_SIZE: usize = 16;
pub const SECTION_VOLUME: usize = SECTION_SIZE * SECTION_SIZE * SECTION_SIZE;
pub const SECTIONS_PER_COLUMN: usize = 16;
pub const COLUMN_HEIGHT: i32 = (SECTION_SIZE * SECTIONS_PER_COLUMN) as i32;

/// Key of the world store: one vertical 16x256x16 column of the world.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnPos {
    pub x: i32,
    pub z: i32,
}

impl ColumnPos {
    pub fn new(x: i32, z: i32) -> Self {
        Self { x, z }
    }

    /// Column owning the given world-space block position.
    pub fn containing(world: IVec3) -> Self {
        Self {
            x: world.x >> 4,
            z: world.z >> 4,
        }
    }
}

/// Block position within one section, each axis in `0..SECTION_SIZE`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalPos {
    pub x: u8,
    pub y: u8,
    pub z: u8,
}

/// Block position within one column: x/z in `0..16`, y in `0..COLUMN_HEIGHT`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ColumnLocalPos {
    pub x: u8,
    pub y: u16,
    pub z: u8,
}

impl ColumnLocalPos {
    /// Index of the 16-block-tall section this position falls in.
    pub fn section_index(self) -> usize {
        usize::from(self.y) / SECTION_SIZE
    }

    /// The same position expressed relative to its section.
    pub fn section_local(self) -> LocalPos {
        LocalPos {
            x: self.x,
            y: (usize::from(self.y) % SECTION_SIZE) as u8,
            z: self.z,
        }
    }
}

/// Splits a world-space block position into its owning column and the
/// column-local position. `None` when y falls outside the world's vertical
/// range; block edits at such positions are dropped by the caller.
pub fn world_to_column(world: IVec3) -> Option<(ColumnPos, ColumnLocalPos)> {
    if world.y < 0 || world.y >= COLUMN_HEIGHT {
        return None;
    }
    let column = ColumnPos::containing(world);
    let local = ColumnLocalPos {
        x: (world.x & 0xF) as u8,
        y: world.y as u16,
        z: (world.z & 0xF) as u8,
    };
    Some((column, local))
}

pub fn column_to_world(column: ColumnPos, local: ColumnLocalPos) -> IVec3 {
    IVec3::new(
        (column.x << 4) + i32::from(local.x),
        i32::from(local.y),
        (column.z << 4) + i32::from(local.z),
    )
}

pub fn local_to_index(local: LocalPos) -> usize {
    usize::from(local.x)
        + usize::from(local.z) * SECTION_SIZE
        + usize::from(local.y) * SECTION_SIZE * SECTION_SIZE
}

pub fn index_to_local(index: usize) -> LocalPos {
    assert!(index < SECTION_VOLUME, "section index out of bounds: {index}");

    let y = index / (SECTION_SIZE * SECTION_SIZE);
    let rem = index % (SECTION_SIZE * SECTION_SIZE);
    let z = rem / SECTION_SIZE;
    let x = rem % SECTION_SIZE;

    LocalPos {
        x: x as u8,
        y: y as u8,
        z: z as u8,
    }
}

#[cfg(test)]
mod tests {
    use glam::IVec3;

    use super::{
        column_to_world, index_to_local, local_to_index, world_to_column, ColumnLocalPos,
        ColumnPos, LocalPos, COLUMN_HEIGHT, SECTION_SIZE,
    };

    #[test]
    fn local_to_index_round_trips_back_to_local_coords() {
        for y in 0..SECTION_SIZE {
            for z in 0..SECTION_SIZE {
                for x in 0..SECTION_SIZE {
                    let local = LocalPos {
                        x: x as u8,
                        y: y as u8,
                        z: z as u8,
                    };
                    let index = local_to_index(local);
                    assert_eq!(index_to_local(index), local);
                }
            }
        }
    }

    #[test]
    fn world_to_column_handles_negative_coordinates() {
        let (column, local) = world_to_column(IVec3::new(-1, 0, -1)).expect("in range");
        assert_eq!(column, ColumnPos { x: -1, z: -1 });
        assert_eq!(
            local,
            ColumnLocalPos {
                x: (SECTION_SIZE - 1) as u8,
                y: 0,
                z: (SECTION_SIZE - 1) as u8,
            }
        );

        let world = IVec3::new(-33, 95, 66);
        let (column, local) = world_to_column(world).expect("in range");
        assert_eq!(column, ColumnPos { x: -3, z: 4 });
        assert_eq!(column_to_world(column, local), world);
    }

    #[test]
    fn out_of_range_height_is_rejected() {
        assert!(world_to_column(IVec3::new(0, -1, 0)).is_none());
        assert!(world_to_column(IVec3::new(0, COLUMN_HEIGHT, 0)).is_none());
        assert!(world_to_column(IVec3::new(0, COLUMN_HEIGHT - 1, 0)).is_some());
    }

    #[test]
    fn column_local_splits_into_section_and_offset() {
        let local = ColumnLocalPos { x: 3, y: 71, z: 15 };
        assert_eq!(local.section_index(), 4);
        assert_eq!(local.section_local(), LocalPos { x: 3, y: 7, z: 15 });
    }
}
