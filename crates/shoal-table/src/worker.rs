use std::marker::PhantomData;

use shoal_types::{Blob, ClusterContext, Element};
use tracing::debug;

use crate::dispatch::{Dispatch, TableOp};
use crate::error::TableError;
use crate::plan::ShardPlan;
use crate::WHOLE_TABLE_KEY;

/// Client-side proxy for the distributed shared array.
///
/// Holds the declared global size and the shard plan; per-call state is
/// only the caller's buffer, borrowed for the duration of one [`get`] or
/// [`add`]. The exclusive `&mut` borrow in `get` makes overlapping calls on
/// one buffer a compile error rather than a data race.
///
/// [`get`]: ArrayWorker::get
/// [`add`]: ArrayWorker::add
pub struct ArrayWorker<E: Element> {
    plan: ShardPlan,
    table_id: u32,
    rank: usize,
    _elem: PhantomData<E>,
}

impl<E: Element> ArrayWorker<E> {
    /// Create a worker view of a global array of `total` elements sharded
    /// across `ctx.size()` servers.
    pub fn new(ctx: &ClusterContext, total: usize) -> Result<Self, TableError> {
        Self::sharded(ctx, total, ctx.size())
    }

    /// Create a worker against the first `servers` ranks of the cluster,
    /// for deployments where worker processes occupy the ranks after the
    /// servers.
    pub fn sharded(
        ctx: &ClusterContext,
        total: usize,
        servers: usize,
    ) -> Result<Self, TableError> {
        if servers > ctx.size() {
            return Err(TableError::BadRequest(format!(
                "server count {servers} exceeds cluster size {}",
                ctx.size()
            )));
        }
        let plan = ShardPlan::new(total, servers)?;
        debug!(
            rank = ctx.rank(),
            total,
            shards = servers,
            "worker created array table"
        );
        Ok(Self {
            plan,
            table_id: 0,
            rank: ctx.rank(),
            _elem: PhantomData,
        })
    }

    /// Use a non-default table id (for processes holding several tables).
    pub fn with_table_id(mut self, table_id: u32) -> Self {
        self.table_id = table_id;
        self
    }

    pub fn table_id(&self) -> u32 {
        self.table_id
    }

    /// Declared global element count.
    pub fn total(&self) -> usize {
        self.plan.total()
    }

    /// The shard plan this worker slices buffers by.
    pub fn plan(&self) -> &ShardPlan {
        &self.plan
    }

    /// Fetch the whole array into `buf`, blocking until every shard has
    /// replied and been merged. `buf.len()` must equal the declared size.
    pub fn get(&self, dispatch: &impl Dispatch, buf: &mut [E]) -> Result<(), TableError> {
        self.check_size(buf.len())?;
        let key = Blob::from_element(WHOLE_TABLE_KEY);
        let requests = self.partition(&key, None)?;
        let replies = dispatch.issue_and_collect(self.table_id, TableOp::Get, requests)?;
        self.check_fanout(replies.len())?;

        // Replies may arrive in any order; each shard range is written
        // exactly once.
        let mut merged = vec![false; self.plan.num_shards()];
        for reply in &replies {
            let shard = self.merge_get_reply(buf, reply)?;
            if merged[shard] {
                return Err(TableError::BadReply(format!(
                    "duplicate reply for shard {shard}"
                )));
            }
            merged[shard] = true;
        }
        debug!(rank = self.rank, total = self.plan.total(), "worker got all elements");
        Ok(())
    }

    /// Send `buf` as a whole-array delta, blocking until every shard has
    /// acknowledged. Acknowledgment payloads are not inspected.
    pub fn add(&self, dispatch: &impl Dispatch, buf: &[E]) -> Result<(), TableError> {
        self.check_size(buf.len())?;
        let key = Blob::from_element(WHOLE_TABLE_KEY);
        let value = Blob::from_elements(buf);
        let requests = self.partition(&key, Some(&value))?;
        let replies = dispatch.issue_and_collect(self.table_id, TableOp::Add, requests)?;
        self.check_fanout(replies.len())?;
        debug!(rank = self.rank, total = self.plan.total(), "worker added delta");
        Ok(())
    }

    /// Split a whole-array request into per-shard sub-requests.
    ///
    /// Every shard receives the key blob; when a value blob is present,
    /// shard `i` receives its `[B[i]*w, B[i+1]*w)` byte slice of it,
    /// zero-copy.
    pub fn partition<'a>(
        &self,
        key: &Blob<'a>,
        value: Option<&Blob<'a>>,
    ) -> Result<Vec<Vec<Blob<'a>>>, TableError> {
        self.check_key(key)?;
        let shards = self.plan.num_shards();
        let mut out: Vec<Vec<Blob<'a>>> = (0..shards).map(|_| vec![key.clone()]).collect();

        if let Some(value) = value {
            let expected = self.plan.total() * E::WIRE_SIZE;
            if value.len() != expected {
                return Err(TableError::SizeMismatch {
                    expected,
                    actual: value.len(),
                });
            }
            for (shard, request) in out.iter_mut().enumerate() {
                let range = self.plan.shard_range(shard)?;
                request.push(value.slice(range.start * E::WIRE_SIZE..range.end * E::WIRE_SIZE)?);
            }
        }
        Ok(out)
    }

    /// Merge one shard's Get reply into `buf`; returns the shard id merged.
    ///
    /// A reply is exactly two blobs: the shard id as a little-endian i32,
    /// then that shard's value bytes, whose length must match the shard's
    /// extent in the plan.
    pub fn merge_get_reply(
        &self,
        buf: &mut [E],
        reply: &[Blob<'_>],
    ) -> Result<usize, TableError> {
        self.check_size(buf.len())?;
        if reply.len() != 2 {
            return Err(TableError::BadReply(format!(
                "expected 2 blobs (shard id, values), got {}",
                reply.len()
            )));
        }
        let id = reply[0].element::<i32>(0)?;
        if id < 0 || id as usize >= self.plan.num_shards() {
            return Err(TableError::ShardOutOfRange {
                shard: id.max(0) as usize,
                count: self.plan.num_shards(),
            });
        }
        let shard = id as usize;
        let range = self.plan.shard_range(shard)?;
        let expected = range.len() * E::WIRE_SIZE;
        if reply[1].len() != expected {
            return Err(TableError::SizeMismatch {
                expected,
                actual: reply[1].len(),
            });
        }
        let values = reply[1].to_elements::<E>()?;
        buf[range].copy_from_slice(&values);
        Ok(shard)
    }

    fn check_size(&self, actual: usize) -> Result<(), TableError> {
        if actual != self.plan.total() {
            return Err(TableError::SizeMismatch {
                expected: self.plan.total(),
                actual,
            });
        }
        Ok(())
    }

    fn check_fanout(&self, replies: usize) -> Result<(), TableError> {
        if replies != self.plan.num_shards() {
            return Err(TableError::BadReply(format!(
                "expected {} shard replies, got {}",
                self.plan.num_shards(),
                replies
            )));
        }
        Ok(())
    }

    fn check_key(&self, key: &Blob<'_>) -> Result<(), TableError> {
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
}
