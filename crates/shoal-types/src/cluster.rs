use std::net::SocketAddr;

use crate::error::TypeError;

/// Cluster membership: the ordered peer list and this node's place in it.
///
/// A node's rank is its 0-based index in the peer list; rank and size are
/// fixed for the process lifetime. Both the worker and the server shard
/// tables take a `ClusterContext` at construction instead of consulting any
/// ambient global state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClusterContext {
    peers: Vec<SocketAddr>,
    rank: usize,
}

impl ClusterContext {
    /// Build a context from an ordered peer list and this node's rank.
    pub fn new(peers: Vec<SocketAddr>, rank: usize) -> Result<Self, TypeError> {
        if peers.is_empty() {
            return Err(TypeError::EmptyCluster);
        }
        if rank >= peers.len() {
            return Err(TypeError::RankOutOfRange {
                rank,
                size: peers.len(),
            });
        }
        Ok(Self { peers, rank })
    }

    /// This node's 0-based rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Number of peers in the cluster.
    pub fn size(&self) -> usize {
        self.peers.len()
    }

    /// The ordered peer address list.
    pub fn peers(&self) -> &[SocketAddr] {
        &self.peers
    }

    /// Address of the peer at `rank`, if in range.
    pub fn peer(&self, rank: usize) -> Option<SocketAddr> {
        self.peers.get(rank).copied()
    }

    /// This node's own address.
    pub fn local_addr(&self) -> SocketAddr {
        self.peers[self.rank]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peers(n: usize) -> Vec<SocketAddr> {
        (0..n)
            .map(|i| format!("10.0.0.{}:9000", i + 1).parse().unwrap())
            .collect()
    }

    #[test]
    fn basic_accessors() {
        let ctx = ClusterContext::new(peers(3), 1).unwrap();
        assert_eq!(ctx.rank(), 1);
        assert_eq!(ctx.size(), 3);
        assert_eq!(ctx.local_addr(), "10.0.0.2:9000".parse().unwrap());
        assert_eq!(ctx.peer(2), Some("10.0.0.3:9000".parse().unwrap()));
        assert_eq!(ctx.peer(3), None);
    }

    #[test]
    fn empty_peer_list_rejected() {
        assert_eq!(
            ClusterContext::new(vec![], 0).unwrap_err(),
            TypeError::EmptyCluster
        );
    }

    #[test]
    fn rank_out_of_range_rejected() {
        assert_eq!(
            ClusterContext::new(peers(2), 2).unwrap_err(),
            TypeError::RankOutOfRange { rank: 2, size: 2 }
        );
    }
}
