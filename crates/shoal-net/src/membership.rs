use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::path::Path;

use shoal_types::ClusterContext;
use tracing::debug;

use crate::error::NetError;

/// Parse a plain-text, whitespace-delimited peer address list.
///
/// Entries are `ip:port` or bare `ip` (bare entries take `default_port`).
/// Order matters: a peer's position in the list is its rank.
pub fn parse_peer_file<P: AsRef<Path>>(
    path: P,
    default_port: u16,
) -> Result<Vec<SocketAddr>, NetError> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| {
        NetError::Config(format!("cannot read peer file {}: {e}", path.display()))
    })?;

    let mut peers = Vec::new();
    for token in text.split_whitespace() {
        peers.push(parse_peer(token, default_port)?);
    }
    if peers.is_empty() {
        return Err(NetError::Config(format!(
            "peer file {} lists no peers",
            path.display()
        )));
    }
    Ok(peers)
}

fn parse_peer(token: &str, default_port: u16) -> Result<SocketAddr, NetError> {
    if let Ok(addr) = token.parse::<SocketAddr>() {
        return Ok(addr);
    }
    if let Ok(ip) = token.parse::<IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }
    Err(NetError::Config(format!("unparsable peer address {token:?}")))
}

/// The subset of peer IPs assigned to a local interface.
///
/// An address can be bound iff it is local, so a throwaway UDP bind probes
/// each candidate without any traffic. Loopback always counts as local.
pub fn local_ips(peers: &[SocketAddr]) -> HashSet<IpAddr> {
    let mut local = HashSet::new();
    for peer in peers {
        let ip = peer.ip();
        if ip.is_loopback() || UdpSocket::bind((ip, 0)).is_ok() {
            local.insert(ip);
        }
    }
    debug!(?local, "probed local interface addresses");
    local
}

/// This node's rank: the index of the unique peer whose IP is local.
pub fn resolve_rank(peers: &[SocketAddr]) -> Result<usize, NetError> {
    let local = local_ips(peers);
    let matches: Vec<usize> = peers
        .iter()
        .enumerate()
        .filter(|(_, peer)| local.contains(&peer.ip()))
        .map(|(i, _)| i)
        .collect();
    match matches.as_slice() {
        [rank] => Ok(*rank),
        [] => Err(NetError::Config(
            "no peer address matches a local interface".into(),
        )),
        _ => Err(NetError::Config(
            "several peer addresses match local interfaces; pass the local address explicitly"
                .into(),
        )),
    }
}

/// Membership from a peer file, rank auto-detected.
pub fn cluster_from_file<P: AsRef<Path>>(
    path: P,
    default_port: u16,
) -> Result<ClusterContext, NetError> {
    let peers = parse_peer_file(path, default_port)?;
    let rank = resolve_rank(&peers)?;
    Ok(ClusterContext::new(peers, rank)?)
}

/// Membership with an explicitly named local address.
pub fn cluster_with_local(
    peers: Vec<SocketAddr>,
    local: SocketAddr,
) -> Result<ClusterContext, NetError> {
    let rank = peers.iter().position(|p| *p == local).ok_or_else(|| {
        NetError::Config(format!("local address {local} is not in the peer list"))
    })?;
    Ok(ClusterContext::new(peers, rank)?)
}
