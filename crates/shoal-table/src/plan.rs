use std::ops::Range;

use crate::error::TableError;

/// The single shared derivation of shard extents.
///
/// For `N` elements over `S` shards the boundaries are
/// `[0, L, 2L, ..., (S-1)L, N]` with `L = floor(N / S)`; the last shard
/// absorbs the remainder and may be longer than the others. Worker
/// partitioning and server storage sizing both read extents from the same
/// plan, so the two sides can never disagree on who owns which range.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardPlan {
    total: usize,
    boundaries: Vec<usize>,
}

impl ShardPlan {
    /// Build a plan for `total` elements over `shards` shards.
    ///
    /// Requires `shards > 0` and `total > shards` so every shard gets at
    /// least one element.
    pub fn new(total: usize, shards: usize) -> Result<Self, TableError> {
        if shards == 0 || total <= shards {
            return Err(TableError::InvalidPlan { total, shards });
        }
        let base = total / shards;
        let mut boundaries: Vec<usize> = (0..shards).map(|i| i * base).collect();
        boundaries.push(total);
        Ok(Self { total, boundaries })
    }

    /// Global element count.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Number of shards.
    pub fn num_shards(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// The boundary list `[0, ..., total]`.
    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    /// Element range `[B[shard], B[shard+1])` owned by `shard`.
    pub fn shard_range(&self, shard: usize) -> Result<Range<usize>, TableError> {
        if shard >= self.num_shards() {
            return Err(TableError::ShardOutOfRange {
                shard,
                count: self.num_shards(),
            });
        }
        Ok(self.boundaries[shard]..self.boundaries[shard + 1])
    }

    /// Element count owned by `shard`.
    pub fn shard_len(&self, shard: usize) -> Result<usize, TableError> {
        self.shard_range(shard).map(|r| r.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn concrete_ten_over_three() {
        let plan = ShardPlan::new(10, 3).unwrap();
        assert_eq!(plan.boundaries(), &[0, 3, 6, 10]);
        assert_eq!(plan.shard_len(0).unwrap(), 3);
        assert_eq!(plan.shard_len(1).unwrap(), 3);
        assert_eq!(plan.shard_len(2).unwrap(), 4);
    }

    #[test]
    fn single_shard_owns_everything() {
        let plan = ShardPlan::new(5, 1).unwrap();
        assert_eq!(plan.boundaries(), &[0, 5]);
        assert_eq!(plan.shard_range(0).unwrap(), 0..5);
    }

    #[test]
    fn degenerate_plans_rejected() {
        assert!(matches!(
            ShardPlan::new(10, 0),
            Err(TableError::InvalidPlan { .. })
        ));
        assert!(matches!(
            ShardPlan::new(3, 3),
            Err(TableError::InvalidPlan { .. })
        ));
        assert!(matches!(
            ShardPlan::new(2, 3),
            Err(TableError::InvalidPlan { .. })
        ));
    }

    #[test]
    fn shard_out_of_range() {
        let plan = ShardPlan::new(10, 3).unwrap();
        assert!(matches!(
            plan.shard_range(3),
            Err(TableError::ShardOutOfRange { shard: 3, count: 3 })
        ));
    }

    proptest! {
        /// Shards partition `[0, total)` exactly: no gaps, no overlap,
        /// lengths summing to the total, with every shard but the last of
        /// length `floor(total / shards)`.
        #[test]
        fn partitions_exactly(shards in 1usize..64, extra in 1usize..1000) {
            let total = shards + extra;
            let plan = ShardPlan::new(total, shards).unwrap();
            let base = total / shards;

            prop_assert_eq!(plan.boundaries()[0], 0);
            prop_assert_eq!(*plan.boundaries().last().unwrap(), total);

            let mut covered = 0;
            for i in 0..plan.num_shards() {
                let range = plan.shard_range(i).unwrap();
                prop_assert_eq!(range.start, covered);
                covered = range.end;
                if i + 1 < plan.num_shards() {
                    prop_assert_eq!(range.len(), base);
                } else {
                    prop_assert_eq!(range.len(), total - (shards - 1) * base);
                }
            }
            prop_assert_eq!(covered, total);
        }

        /// Server-side local length equals the worker-side boundary span for
        /// every rank: the two derivations are the same derivation.
        #[test]
        fn worker_and_server_extents_agree(shards in 1usize..64, extra in 1usize..1000) {
            let total = shards + extra;
            let plan = ShardPlan::new(total, shards).unwrap();
            for rank in 0..shards {
                let b = plan.boundaries();
                prop_assert_eq!(plan.shard_len(rank).unwrap(), b[rank + 1] - b[rank]);
            }
        }
    }
}
