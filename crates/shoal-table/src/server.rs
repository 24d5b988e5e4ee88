use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use shoal_types::{encode_slice, Blob, ClusterContext, Element};
use tracing::debug;

use crate::error::TableError;
use crate::plan::ShardPlan;
use crate::updater::Updater;
use crate::WHOLE_TABLE_KEY;

/// Server-side authority over one shard of the distributed array.
///
/// Storage is allocated zero-initialized at construction, sized by this
/// rank's extent in the shared [`ShardPlan`], and lives for the process
/// lifetime. Only [`process_add`] mutates it; the `&mut` receiver pushes
/// mutual exclusion onto the caller, matching a serve loop that handles one
/// request at a time.
///
/// [`process_add`]: ArrayServer::process_add
pub struct ArrayServer<E: Element> {
    rank: usize,
    plan: ShardPlan,
    storage: Vec<E>,
    updater: Box<dyn Updater<E>>,
}

impl<E: Element> ArrayServer<E> {
    /// Create the shard server for `ctx.rank()` over a global array of
    /// `total` elements.
    pub fn new(
        ctx: &ClusterContext,
        total: usize,
        updater: Box<dyn Updater<E>>,
    ) -> Result<Self, TableError> {
        Self::sharded(ctx, total, ctx.size(), updater)
    }

    /// Create the shard server against the first `servers` ranks of the
    /// cluster; this rank must be one of them.
    pub fn sharded(
        ctx: &ClusterContext,
        total: usize,
        servers: usize,
        updater: Box<dyn Updater<E>>,
    ) -> Result<Self, TableError> {
        if ctx.rank() >= servers {
            return Err(TableError::ShardOutOfRange {
                shard: ctx.rank(),
                count: servers,
            });
        }
        let plan = ShardPlan::new(total, servers)?;
        let local_len = plan.shard_len(ctx.rank())?;
        debug!(
            rank = ctx.rank(),
            local = local_len,
            total,
            "server created array shard"
        );
        Ok(Self {
            rank: ctx.rank(),
            plan,
            storage: vec![E::default(); local_len],
            updater,
        })
    }

    /// This server's rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Local shard element count.
    pub fn local_len(&self) -> usize {
        self.storage.len()
    }

    /// Read-only view of the local shard.
    pub fn storage(&self) -> &[E] {
        &self.storage
    }

    /// Apply a whole-shard delta in place through the updater.
    ///
    /// The request is exactly two blobs: the whole-table sentinel key and a
    /// value of exactly `local_len * WIRE_SIZE` bytes.
    pub fn process_add(&mut self, request: &[Blob<'_>]) -> Result<(), TableError> {
        if request.len() != 2 {
            return Err(TableError::BadRequest(format!(
                "add expects 2 blobs (key, values), got {}",
                request.len()
            )));
        }
        check_key(&request[0])?;
        let expected = self.storage.len() * E::WIRE_SIZE;
        if request[1].len() != expected {
            return Err(TableError::SizeMismatch {
                expected,
                actual: request[1].len(),
            });
        }
        let delta = request[1].to_elements::<E>()?;
        self.updater.update(&mut self.storage, &delta);
        debug!(rank = self.rank, local = self.storage.len(), "server applied delta");
        Ok(())
    }

    /// Answer a whole-shard Get: this rank as an i32, then the full local
    /// storage, little-endian encoded.
    pub fn process_get(&self, request: &[Blob<'_>]) -> Result<Vec<Blob<'static>>, TableError> {
        if request.len() != 1 {
            return Err(TableError::BadRequest(format!(
                "get expects 1 blob (key), got {}",
                request.len()
            )));
        }
        check_key(&request[0])?;
        Ok(vec![
            Blob::from_element(self.rank as i32),
            Blob::from_elements(&self.storage),
        ])
    }

    /// Write the shard checkpoint: exactly `local_len * WIRE_SIZE` raw
    /// little-endian bytes, no header, no version tag.
    pub fn store<W: Write>(&self, w: &mut W) -> Result<(), TableError> {
        w.write_all(&encode_slice(&self.storage))?;
        w.flush()?;
        Ok(())
    }

    /// Read a shard checkpoint produced by [`store`] on the identical
    /// `(total, shards, rank)` configuration.
    ///
    /// [`store`]: ArrayServer::store
    pub fn load<R: Read>(&mut self, r: &mut R) -> Result<(), TableError> {
        let mut raw = vec![0u8; self.storage.len() * E::WIRE_SIZE];
        r.read_exact(&mut raw)?;
        self.storage = shoal_types::decode_slice(&raw)?;
        Ok(())
    }

    /// Checkpoint to a file path.
    pub fn store_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), TableError> {
        let mut writer = BufWriter::new(File::create(path)?);
        self.store(&mut writer)
    }

    /// Restore from a checkpoint file.
    pub fn load_from_path<P: AsRef<Path>>(&mut self, path: P) -> Result<(), TableError> {
        let mut reader = BufReader::new(File::open(path)?);
        self.load(&mut reader)
    }

    /// The plan this shard was sized from.
    pub fn plan(&self) -> &ShardPlan {
        &self.plan
    }
}

fn check_key(key: &Blob<'_>) -> Result<(), TableError> {
    if key.element_count::<i32>()? != 1 {
        return Err(TableError::BadRequest(format!(
            "key blob must hold exactly one i32, got {} bytes",
            key.len()
        )));
    }
    let value = key.element::<i32>(0)?;
    if value != WHOLE_TABLE_KEY {
        return Err(TableError::BadKey(value));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::updater::AddUpdater;

    fn ctx(size: usize, rank: usize) -> ClusterContext {
        let peers = (0..size)
            .map(|i| format!("10.0.0.{}:9000", i + 1).parse().unwrap())
            .collect();
        ClusterContext::new(peers, rank).unwrap()
    }

    fn server(total: usize, shards: usize, rank: usize) -> ArrayServer<f32> {
        ArrayServer::new(&ctx(shards, rank), total, Box::new(AddUpdater)).unwrap()
    }

    fn whole_key() -> Blob<'static> {
        Blob::from_element(WHOLE_TABLE_KEY)
    }

    #[test]
    fn local_lengths_match_plan_extents() {
        // N=10, S=3: every rank sizes itself from the shared plan, so the
        // last shard is 4 (not floor + remainder = 5).
        assert_eq!(server(10, 3, 0).local_len(), 3);
        assert_eq!(server(10, 3, 1).local_len(), 3);
        assert_eq!(server(10, 3, 2).local_len(), 4);
    }

    #[test]
    fn storage_starts_zeroed() {
        let s = server(10, 3, 1);
        assert!(s.storage().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn add_applies_updater_in_place() {
        let mut s = server(10, 3, 2);
        let delta = [1.0f32, 2.0, 3.0, 4.0];
        s.process_add(&[whole_key(), Blob::from_elements(&delta)]).unwrap();
        s.process_add(&[whole_key(), Blob::from_elements(&delta)]).unwrap();
        assert_eq!(s.storage(), &[2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn add_rejects_wrong_delta_length() {
        let mut s = server(10, 3, 0);
        let err = s
            .process_add(&[whole_key(), Blob::from_elements(&[1.0f32; 4])])
            .unwrap_err();
        assert!(matches!(
            err,
            TableError::SizeMismatch { expected: 12, actual: 16 }
        ));
    }

    #[test]
    fn add_rejects_foreign_key() {
        let mut s = server(10, 3, 0);
        let err = s
            .process_add(&[Blob::from_element(0i32), Blob::from_elements(&[0.0f32; 3])])
            .unwrap_err();
        assert!(matches!(err, TableError::BadKey(0)));
    }

    #[test]
    fn add_rejects_missing_value() {
        let mut s = server(10, 3, 0);
        assert!(matches!(
            s.process_add(&[whole_key()]),
            Err(TableError::BadRequest(_))
        ));
    }

    #[test]
    fn get_returns_rank_and_full_storage() {
        let mut s = server(10, 3, 1);
        s.process_add(&[whole_key(), Blob::from_elements(&[5.0f32, 6.0, 7.0])])
            .unwrap();
        let reply = s.process_get(&[whole_key()]).unwrap();
        assert_eq!(reply.len(), 2);
        assert_eq!(reply[0].element::<i32>(0).unwrap(), 1);
        assert_eq!(reply[1].to_elements::<f32>().unwrap(), vec![5.0, 6.0, 7.0]);
    }

    #[test]
    fn get_rejects_foreign_key() {
        let s = server(10, 3, 0);
        assert!(matches!(
            s.process_get(&[Blob::from_element(2i32)]),
            Err(TableError::BadKey(2))
        ));
    }

    #[test]
    fn checkpoint_round_trip_is_byte_exact() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shard.ckpt");

        let mut original = server(10, 3, 2);
        original
            .process_add(&[whole_key(), Blob::from_elements(&[1.5f32, -2.0, 0.25, 9.0])])
            .unwrap();
        original.store_to_path(&path).unwrap();

        // Raw little-endian bytes, no header.
        let on_disk = std::fs::read(&path).unwrap();
        assert_eq!(on_disk.len(), original.local_len() * 4);

        let mut restored = server(10, 3, 2);
        restored.load_from_path(&path).unwrap();
        assert_eq!(restored.storage(), original.storage());
    }

    #[test]
    fn load_rejects_short_stream() {
        let mut s = server(10, 3, 2);
        let mut short: &[u8] = &[0u8; 8];
        assert!(matches!(s.load(&mut short), Err(TableError::Io(_))));
    }
}
