use shoal_types::Blob;

use crate::error::TableError;

/// Table operation to fan out.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TableOp {
    Get,
    Add,
}

/// The request fan-out/collection seam.
///
/// The worker table defines how a whole-array request splits into per-shard
/// sub-requests and how shard replies merge back; actually issuing the
/// sub-requests (sequentially, concurrently, with retries) belongs to the
/// dispatch layer behind this trait. `requests` is indexed by shard; the
/// returned replies may arrive in any order — each Get reply identifies its
/// shard in its first blob, and Add replies are bare acknowledgments.
pub trait Dispatch {
    fn issue_and_collect(
        &self,
        table_id: u32,
        op: TableOp,
        requests: Vec<Vec<Blob<'_>>>,
    ) -> Result<Vec<Vec<Blob<'static>>>, TableError>;
}
