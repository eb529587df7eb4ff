use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};

use rayon::ThreadPoolBuildError;
use tracing::{debug, warn};

use skarn_core::jobs::JobPool;
use skarn_shared::chunk::{decode_sections, decode_sections_at, Section};
use skarn_shared::coords::ColumnPos;
use skarn_shared::protocol::{ColumnFlags, ColumnMeta};

use crate::world::WorldStore;

struct DecodedColumn {
    pos: ColumnPos,
    sections: Vec<(usize, Box<Section>)>,
    full: bool,
    sky_light: bool,
}

/// One decode task's output. Columns from a batch message install together
/// or not at all.
struct DecodedBatch {
    generation: u64,
    columns: Vec<DecodedColumn>,
}

/// Background decoding of column payloads. Decode jobs run on a worker
/// pool so palette and light unpacking never stall message intake; results
/// come back over a completion channel and `apply_completed`, the single
/// routine that owns installs, moves them into the store once per tick.
pub struct ChunkIngest {
    jobs: JobPool,
    completed_tx: Sender<DecodedBatch>,
    completed_rx: Receiver<DecodedBatch>,
    stale_discards: AtomicU64,
}

impl ChunkIngest {
    pub fn new(decode_threads: Option<usize>) -> Result<Self, ThreadPoolBuildError> {
        let (completed_tx, completed_rx) = mpsc::channel();
        Ok(Self {
            jobs: JobPool::new(decode_threads)?,
            completed_tx,
            completed_rx,
            stale_discards: AtomicU64::new(0),
        })
    }

    /// Queues one column payload for decoding. `generation` must be the
    /// store generation observed when the message arrived.
    pub fn submit_column(
        &self,
        generation: u64,
        pos: ColumnPos,
        bitmask: u16,
        flags: ColumnFlags,
        data: Vec<u8>,
    ) {
        let completed_tx = self.completed_tx.clone();
        let sky_light = flags.contains(ColumnFlags::SKY_LIGHT);
        let full = flags.contains(ColumnFlags::FULL_COLUMN);
        self.jobs.spawn(move || {
            match decode_sections(&data, bitmask, sky_light) {
                Ok(sections) => {
                    let _ = completed_tx.send(DecodedBatch {
                        generation,
                        columns: vec![DecodedColumn {
                            pos,
                            sections,
                            full,
                            sky_light,
                        }],
                    });
                }
                // Fatal for this message only; the coordinate stays as it was.
                Err(err) => warn!("discarding column payload for {pos:?}: {err}"),
            }
        });
    }

    /// Queues a batched payload: several column records backed by one
    /// buffer, each record consuming the slice its own bitmask implies.
    /// Any over- or under-consumption is fatal to the whole batch; there is
    /// no way to resync mid-buffer.
    pub fn submit_batch(
        &self,
        generation: u64,
        sky_light: bool,
        columns: Vec<ColumnMeta>,
        data: Vec<u8>,
    ) {
        let completed_tx = self.completed_tx.clone();
        self.jobs.spawn(move || {
            let mut decoded = Vec::with_capacity(columns.len());
            let mut offset = 0;
            for meta in &columns {
                match decode_sections_at(&data, offset, meta.sections, sky_light) {
                    Ok((sections, next_offset)) => {
                        offset = next_offset;
                        decoded.push(DecodedColumn {
                            pos: meta.pos,
                            sections,
                            full: true,
                            sky_light,
                        });
                    }
                    Err(err) => {
                        warn!(
                            "discarding column batch of {} record(s) at {:?}: {err}",
                            columns.len(),
                            meta.pos
                        );
                        return;
                    }
                }
            }
            if offset != data.len() {
                warn!(
                    "discarding column batch: {} trailing bytes after {} record(s)",
                    data.len() - offset,
                    columns.len()
                );
                return;
            }
            let _ = completed_tx.send(DecodedBatch {
                generation,
                columns: decoded,
            });
        });
    }

    /// Drains finished decodes into the store. Batches whose generation
    /// predates a world reset are discarded instead of resurrecting stale
    /// chunks. Returns the number of columns installed.
    pub fn apply_completed(&self, world: &WorldStore) -> usize {
        let mut installed = 0;
        while let Ok(batch) = self.completed_rx.try_recv() {
            if batch.generation != world.generation() {
                debug!(
                    "discarding {} decoded column(s) from generation {}",
                    batch.columns.len(),
                    batch.generation
                );
                self.stale_discards.fetch_add(1, Ordering::SeqCst);
                continue;
            }
            for column in batch.columns {
                world.install(column.pos, column.sections, column.full, column.sky_light);
                installed += 1;
            }
        }
        installed
    }

    /// Count of completed decode batches dropped for arriving after a
    /// world reset. Surfaced for diagnostics.
    pub fn stale_discards(&self) -> u64 {
        self.stale_discards.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use glam::IVec3;

    use skarn_core::events::channel;
    use skarn_shared::block::BlockId;
    use skarn_shared::chunk::{encode_section, Section};
    use skarn_shared::coords::ColumnPos;
    use skarn_shared::protocol::{ColumnFlags, ColumnMeta};

    use super::ChunkIngest;
    use crate::world::WorldStore;

    fn filled_payload(block: BlockId, sky_light: bool) -> Vec<u8> {
        let mut section = Section::new_empty(sky_light);
        for slot in section.blocks.iter_mut() {
            *slot = block;
        }
        let mut payload = Vec::new();
        encode_section(&section, sky_light, &mut payload);
        payload
    }

    fn wait_for_installs(ingest: &ChunkIngest, world: &WorldStore, wanted: usize) -> usize {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut installed = 0;
        while installed < wanted && Instant::now() < deadline {
            installed += ingest.apply_completed(world);
            std::thread::sleep(Duration::from_millis(5));
        }
        installed
    }

    #[test]
    fn concurrent_decodes_for_distinct_columns_do_not_mix() {
        let (tx, _rx) = channel();
        let world = WorldStore::new(tx);
        let ingest = ChunkIngest::new(Some(2)).expect("build ingest");

        let stone = ColumnPos::new(0, 0);
        let water = ColumnPos::new(5, -3);
        ingest.submit_column(
            world.generation(),
            stone,
            0b0001,
            ColumnFlags::FULL_COLUMN,
            filled_payload(BlockId::STONE, false),
        );
        ingest.submit_column(
            world.generation(),
            water,
            0b0001,
            ColumnFlags::FULL_COLUMN,
            filled_payload(BlockId::WATER, false),
        );

        assert_eq!(wait_for_installs(&ingest, &world, 2), 2);

        for x in [0, 7, 15] {
            for z in [0, 9, 15] {
                assert_eq!(
                    world.block_at(IVec3::new(x, 3, z)),
                    Some(BlockId::STONE),
                    "stone column corrupted at {x},{z}"
                );
                assert_eq!(
                    world.block_at(IVec3::new(5 * 16 + x, 3, -3 * 16 + z)),
                    Some(BlockId::WATER),
                    "water column corrupted at {x},{z}"
                );
            }
        }
    }

    #[test]
    fn batch_installs_every_record_and_consumes_the_buffer_exactly() {
        let (tx, _rx) = channel();
        let world = WorldStore::new(tx);
        let ingest = ChunkIngest::new(Some(2)).expect("build ingest");

        let blocks = [BlockId::STONE, BlockId::SOIL, BlockId::SAND];
        let mut data = Vec::new();
        let mut columns = Vec::new();
        for (index, block) in blocks.iter().enumerate() {
            data.extend_from_slice(&filled_payload(*block, true));
            columns.push(ColumnMeta {
                pos: ColumnPos::new(index as i32, 0),
                sections: 0b0001,
            });
        }

        ingest.submit_batch(world.generation(), true, columns, data);
        assert_eq!(wait_for_installs(&ingest, &world, 3), 3);

        assert_eq!(world.column_count(), 3);
        for (index, block) in blocks.iter().enumerate() {
            assert_eq!(
                world.block_at(IVec3::new(index as i32 * 16 + 1, 1, 1)),
                Some(*block)
            );
        }
    }

    #[test]
    fn malformed_batch_installs_nothing() {
        let (tx, _rx) = channel();
        let world = WorldStore::new(tx);
        let ingest = ChunkIngest::new(Some(2)).expect("build ingest");

        // Two records claimed, barely more than one record's bytes present.
        let mut data = filled_payload(BlockId::STONE, false);
        data.extend_from_slice(&[0; 16]);
        let columns = vec![
            ColumnMeta {
                pos: ColumnPos::new(0, 0),
                sections: 0b0001,
            },
            ColumnMeta {
                pos: ColumnPos::new(1, 0),
                sections: 0b0001,
            },
        ];
        ingest.submit_batch(world.generation(), false, columns, data);

        let deadline = Instant::now() + Duration::from_millis(400);
        let mut installed = 0;
        while Instant::now() < deadline {
            installed += ingest.apply_completed(&world);
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(installed, 0);
        assert!(world.is_empty());
    }

    #[test]
    fn decodes_finishing_after_a_world_reset_are_discarded() {
        let (tx, _rx) = channel();
        let world = WorldStore::new(tx);
        let ingest = ChunkIngest::new(Some(2)).expect("build ingest");

        let stale_generation = world.generation();
        world.clear();
        ingest.submit_column(
            stale_generation,
            ColumnPos::new(0, 0),
            0b0001,
            ColumnFlags::FULL_COLUMN,
            filled_payload(BlockId::STONE, false),
        );

        let deadline = Instant::now() + Duration::from_secs(5);
        while ingest.stale_discards() == 0 && Instant::now() < deadline {
            ingest.apply_completed(&world);
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(ingest.stale_discards(), 1);
        assert!(world.is_empty());
    }
}
