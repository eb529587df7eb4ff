use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};

use glam::IVec3;
use rustc_hash::FxHashMap;
use tracing::debug;

use skarn_core::events::EventSender;
use skarn_shared::block::BlockId;
use skarn_shared::chunk::{ChunkColumn, Section};
use skarn_shared::coords::{
    column_to_world, world_to_column, ColumnLocalPos, ColumnPos, SECTIONS_PER_COLUMN,
    SECTION_SIZE,
};
use skarn_shared::protocol::BlockRecord;

/// Notifications to the render side. Mesh rebuild, GPU uploads and resource
/// release happen in the renderer; this core only reports what changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderEvent {
    ColumnLoaded(ColumnPos),
    ColumnFreed(ColumnPos),
    SectionDirty { column: ColumnPos, section: usize },
}

/// The shared world model: loaded columns keyed by coordinate, one
/// mutual-exclusion domain over the whole map. Mutations from the dispatch
/// thread and the install side serialize against each other; readers never
/// observe a partially built column because columns enter the map fully
/// decoded.
pub struct WorldStore {
    columns: RwLock<FxHashMap<ColumnPos, ChunkColumn>>,
    generation: AtomicU64,
    render: EventSender<RenderEvent>,
}

impl WorldStore {
    pub fn new(render: EventSender<RenderEvent>) -> Self {
        Self {
            columns: RwLock::new(FxHashMap::default()),
            generation: AtomicU64::new(0),
            render,
        }
    }

    /// Bumped on every world reset. Background decodes capture it at
    /// submission; installs with a stale generation are discarded.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub fn contains(&self, pos: ColumnPos) -> bool {
        self.read_columns().contains_key(&pos)
    }

    pub fn column_count(&self) -> usize {
        self.read_columns().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read_columns().is_empty()
    }

    pub fn loaded_columns(&self) -> Vec<ColumnPos> {
        self.read_columns().keys().copied().collect()
    }

    /// Block at a world position, `None` when the owning column is not
    /// loaded or the position is outside the vertical range.
    pub fn block_at(&self, world: IVec3) -> Option<BlockId> {
        let (pos, local) = world_to_column(world)?;
        self.read_columns().get(&pos).map(|column| column.block_at(local))
    }

    /// Writes one block. A block change for a column that is not loaded is
    /// dropped; such races against column loads are expected client/server
    /// timing, not errors.
    pub fn set_block(&self, world: IVec3, block: BlockId) -> bool {
        let Some((pos, local)) = world_to_column(world) else {
            debug!("block change at {world:?} outside world height, dropped");
            return false;
        };
        {
            let mut columns = self.write_columns();
            let Some(column) = columns.get_mut(&pos) else {
                debug!("block change for unloaded column {pos:?} dropped");
                return false;
            };
            column.set_block(local, block);
        }
        self.mark_block_dirty(world);
        true
    }

    /// Applies a multi-block batch to one column, in record order; later
    /// records override earlier ones at the same position. The whole batch
    /// is dropped when the column is not loaded. Returns applied count.
    pub fn apply_block_batch(&self, pos: ColumnPos, records: &[BlockRecord]) -> usize {
        let mut edited = Vec::with_capacity(records.len());
        {
            let mut columns = self.write_columns();
            let Some(column) = columns.get_mut(&pos) else {
                debug!(
                    "multi-block batch of {} record(s) for unloaded column {pos:?} dropped",
                    records.len()
                );
                return 0;
            };
            for record in records {
                let local = ColumnLocalPos {
                    x: record.local_x(),
                    y: u16::from(record.y),
                    z: record.local_z(),
                };
                column.set_block(local, record.block);
                edited.push(column_to_world(pos, local));
            }
        }
        for world in &edited {
            self.mark_block_dirty(*world);
        }
        edited.len()
    }

    /// Installs a decoded column. Full updates replace the previous column
    /// wholesale (freeing it); partial updates merge per-section, or create
    /// the column when it was absent.
    pub fn install(
        &self,
        pos: ColumnPos,
        sections: Vec<(usize, Box<Section>)>,
        full: bool,
        sky_light: bool,
    ) {
        let mut events = Vec::new();
        {
            let mut columns = self.write_columns();
            if full {
                if columns
                    .insert(pos, ChunkColumn::from_sections(sections, sky_light))
                    .is_some()
                {
                    events.push(RenderEvent::ColumnFreed(pos));
                }
                events.push(RenderEvent::ColumnLoaded(pos));
            } else if let Some(column) = columns.get_mut(&pos) {
                events.extend(
                    sections
                        .iter()
                        .map(|(section, _)| RenderEvent::SectionDirty {
                            column: pos,
                            section: *section,
                        }),
                );
                column.merge_sections(sections);
            } else {
                columns.insert(pos, ChunkColumn::from_sections(sections, sky_light));
                events.push(RenderEvent::ColumnLoaded(pos));
            }
        }
        for event in events {
            let _ = self.render.send(event);
        }
    }

    /// Removes one column, releasing it. Signalled to the render side once.
    pub fn remove_column(&self, pos: ColumnPos) -> bool {
        let removed = self.write_columns().remove(&pos).is_some();
        if removed {
            let _ = self.render.send(RenderEvent::ColumnFreed(pos));
        }
        removed
    }

    /// Frees every loaded column and advances the generation so in-flight
    /// decodes from before the reset cannot resurrect stale chunks.
    pub fn clear(&self) {
        let freed: Vec<ColumnPos> = {
            let mut columns = self.write_columns();
            self.generation.fetch_add(1, Ordering::SeqCst);
            columns.drain().map(|(pos, _)| pos).collect()
        };
        for pos in freed {
            let _ = self.render.send(RenderEvent::ColumnFreed(pos));
        }
    }

    /// Marks the section holding `world` dirty, plus every neighboring
    /// section sharing a face with the edited block, so boundary geometry
    /// gets rebuilt on both sides.
    fn mark_block_dirty(&self, world: IVec3) {
        let Some((pos, local)) = world_to_column(world) else {
            return;
        };
        let section = local.section_index();
        let in_section = local.section_local();
        let edge = (SECTION_SIZE - 1) as u8;

        let mut dirty = vec![RenderEvent::SectionDirty {
            column: pos,
            section,
        }];
        if in_section.x == 0 {
            dirty.push(RenderEvent::SectionDirty {
                column: ColumnPos::new(pos.x - 1, pos.z),
                section,
            });
        } else if in_section.x == edge {
            dirty.push(RenderEvent::SectionDirty {
                column: ColumnPos::new(pos.x + 1, pos.z),
                section,
            });
        }
        if in_section.z == 0 {
            dirty.push(RenderEvent::SectionDirty {
                column: ColumnPos::new(pos.x, pos.z - 1),
                section,
            });
        } else if in_section.z == edge {
            dirty.push(RenderEvent::SectionDirty {
                column: ColumnPos::new(pos.x, pos.z + 1),
                section,
            });
        }
        if in_section.y == 0 && section > 0 {
            dirty.push(RenderEvent::SectionDirty {
                column: pos,
                section: section - 1,
            });
        } else if in_section.y == edge && section < SECTIONS_PER_COLUMN - 1 {
            dirty.push(RenderEvent::SectionDirty {
                column: pos,
                section: section + 1,
            });
        }

        for event in dirty {
            let _ = self.render.send(event);
        }
    }

    fn read_columns(
        &self,
    ) -> std::sync::RwLockReadGuard<'_, FxHashMap<ColumnPos, ChunkColumn>> {
        self.columns.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_columns(
        &self,
    ) -> std::sync::RwLockWriteGuard<'_, FxHashMap<ColumnPos, ChunkColumn>> {
        self.columns.write().unwrap_or_else(PoisonError::into_inner)
    }
}
