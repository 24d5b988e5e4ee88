use std::io::BufReader;
use std::net::{Ipv4Addr, SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use shoal_protocol::{read_message, write_message, Message, ProtocolError};
use shoal_types::ClusterContext;
use tracing::{debug, info, warn};

use crate::config::NetConfig;
use crate::error::NetError;

type Inbound = Result<(Message<'static>, usize), NetError>;

/// Blocking point-to-point transport.
///
/// One inbound listener bound on all interfaces at this rank's port; one
/// outbound TCP channel per non-self peer, connected eagerly at init (the
/// self slot stays empty — a self-destination send has no route and is an
/// invariant violation). Sends to one peer are serialized by that channel's
/// lock; sends to distinct peers may proceed concurrently, with per-peer
/// reply-follows-request ordering preserved by the channel itself.
///
/// There is no timeout and no cancellation: a lost reply blocks `recv`
/// forever, a deliberate fail-stop.
pub struct Transport {
    ctx: ClusterContext,
    requesters: Vec<Option<Mutex<TcpStream>>>,
    inbound: Mutex<Receiver<Inbound>>,
    acceptor: Option<JoinHandle<()>>,
    shutdown: Arc<AtomicBool>,
    listen_port: u16,
}

impl Transport {
    /// Bind the inbound listener, then connect to every other peer,
    /// retrying each with backoff until its listener is up. Bind failure or
    /// exhausted connection attempts fail init.
    pub fn open(ctx: ClusterContext, config: &NetConfig) -> Result<Self, NetError> {
        let listen_port = ctx.local_addr().port();
        let bind_addr = SocketAddr::new(Ipv4Addr::UNSPECIFIED.into(), listen_port);
        let listener =
            TcpListener::bind(bind_addr).map_err(|source| NetError::Bind { addr: bind_addr, source })?;

        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = mpsc::channel();
        let acceptor = spawn_acceptor(listener, tx, Arc::clone(&shutdown));

        let mut requesters = Vec::with_capacity(ctx.size());
        for (rank, peer) in ctx.peers().iter().enumerate() {
            if rank == ctx.rank() {
                requesters.push(None);
            } else {
                let stream =
                    connect_with_retry(*peer, config.connect_attempts, config.connect_backoff())?;
                requesters.push(Some(Mutex::new(stream)));
            }
        }

        info!(
            rank = ctx.rank(),
            size = ctx.size(),
            port = listen_port,
            "tcp transport initialized"
        );
        Ok(Self {
            ctx,
            requesters,
            inbound: Mutex::new(rx),
            acceptor: Some(acceptor),
            shutdown,
            listen_port,
        })
    }

    /// This node's rank.
    pub fn rank(&self) -> usize {
        self.ctx.rank()
    }

    /// Cluster size.
    pub fn size(&self) -> usize {
        self.ctx.size()
    }

    /// Transport name.
    pub fn name(&self) -> &'static str {
        "tcp"
    }

    /// The membership this transport was opened with.
    pub fn cluster(&self) -> &ClusterContext {
        &self.ctx
    }

    /// Write one message to its destination's outbound channel. Returns the
    /// logical byte count (header + length fields + payloads).
    pub fn send(&self, msg: &Message<'_>) -> Result<usize, NetError> {
        let dst = msg.header.dst as usize;
        let no_route = || NetError::NoRoute { dst, size: self.ctx.size() };
        let requester = self
            .requesters
            .get(dst)
            .ok_or_else(no_route)?
            .as_ref()
            .ok_or_else(no_route)?;

        let mut stream = requester.lock().expect("lock poisoned");
        let sent = write_message(&mut *stream, msg)?;
        debug!(rank = self.ctx.rank(), dst, bytes = sent, "sent message");
        Ok(sent)
    }

    /// Block for the next whole inbound message, from any peer. A framing
    /// failure on any inbound connection surfaces here as the fatal
    /// protocol error it is.
    pub fn recv(&self) -> Result<(Message<'static>, usize), NetError> {
        let pair = self
            .inbound
            .lock()
            .expect("lock poisoned")
            .recv()
            .map_err(|_| NetError::ChannelClosed)??;
        debug!(rank = self.ctx.rank(), src = pair.0.header.src, bytes = pair.1, "received message");
        Ok(pair)
    }

    /// Close every channel and tear the listener down. Call once at process
    /// end.
    pub fn finalize(mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        // A throwaway local connection unblocks the acceptor so it can
        // observe the flag.
        let _ = TcpStream::connect((Ipv4Addr::LOCALHOST, self.listen_port));
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
        info!(rank = self.ctx.rank(), "tcp transport finalized");
    }
}

fn spawn_acceptor(
    listener: TcpListener,
    tx: Sender<Inbound>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                debug!(%peer, "accepted inbound connection");
                let tx = tx.clone();
                let shutdown = Arc::clone(&shutdown);
                thread::spawn(move || reader_loop(stream, tx, shutdown));
            }
            Err(e) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                warn!(error = %e, "accept failed");
            }
        }
    })
}

/// Decode messages off one inbound connection into the shared channel,
/// preserving that connection's arrival order.
fn reader_loop(stream: TcpStream, tx: Sender<Inbound>, shutdown: Arc<AtomicBool>) {
    let mut reader = BufReader::new(stream);
    loop {
        match read_message(&mut reader) {
            Ok(pair) => {
                if tx.send(Ok(pair)).is_err() {
                    break;
                }
            }
            // EOF on a frame boundary: the peer closed cleanly.
            Err(ProtocolError::TruncatedFrame { expected: 1, actual: 0 }) => break,
            Err(e) => {
                if !shutdown.load(Ordering::SeqCst) {
                    let _ = tx.send(Err(NetError::Protocol(e)));
                }
                break;
            }
        }
    }
}

fn connect_with_retry(
    peer: SocketAddr,
    attempts: u32,
    backoff: Duration,
) -> Result<TcpStream, NetError> {
    let mut last_err = None;
    for attempt in 0..attempts.max(1) {
        match TcpStream::connect(peer) {
            Ok(stream) => {
                stream.set_nodelay(true).ok();
                return Ok(stream);
            }
            Err(e) => {
                debug!(%peer, attempt, error = %e, "connect attempt failed");
                last_err = Some(e);
                thread::sleep(backoff);
            }
        }
    }
    Err(NetError::Connect {
        peer,
        attempts: attempts.max(1),
        source: last_err.expect("at least one attempt"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use shoal_protocol::{Header, MessageKind};
    use shoal_types::Blob;

    fn free_port() -> u16 {
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0))
            .unwrap()
            .local_addr()
            .unwrap()
            .port()
    }

    fn test_config() -> NetConfig {
        NetConfig {
            connect_attempts: 150,
            connect_backoff_ms: 20,
            ..NetConfig::default()
        }
    }

    #[test]
    fn request_reply_round_trip_between_two_nodes() {
        let peers: Vec<SocketAddr> = vec![
            (Ipv4Addr::LOCALHOST, free_port()).into(),
            (Ipv4Addr::LOCALHOST, free_port()).into(),
        ];

        let (peers0, peers1) = (peers.clone(), peers);
        let requester = thread::spawn(move || {
            let ctx = ClusterContext::new(peers0, 0).unwrap();
            let transport = Transport::open(ctx, &test_config()).unwrap();
            assert_eq!(transport.rank(), 0);
            assert_eq!(transport.size(), 2);
            assert_eq!(transport.name(), "tcp");

            let request = Message::with_data(
                Header { src: 0, dst: 1, table_id: 3, kind: MessageKind::Get },
                vec![Blob::from_element(-1i32)],
            );
            let sent = transport.send(&request).unwrap();
            assert_eq!(sent, 16 + 8 + 4);

            let (reply, received) = transport.recv().unwrap();
            assert_eq!(reply.header.kind, MessageKind::ReplyGet);
            assert_eq!(reply.header.table_id, 3);
            assert_eq!(reply.data.len(), 2);
            assert_eq!(reply.data[0].element::<i32>(0).unwrap(), 1);
            assert_eq!(reply.data[1].as_slice(), &[1, 2, 3, 4]);
            assert_eq!(received, 16 + (8 + 4) + (8 + 4));
            transport.finalize();
        });

        let replier = thread::spawn(move || {
            let ctx = ClusterContext::new(peers1, 1).unwrap();
            let transport = Transport::open(ctx, &test_config()).unwrap();

            let (request, _) = transport.recv().unwrap();
            assert_eq!(request.header.kind, MessageKind::Get);
            assert_eq!(request.header.src, 0);
            assert_eq!(request.data[0].element::<i32>(0).unwrap(), -1);

            let reply = Message::reply_to(
                &request.header,
                vec![Blob::from_element(1i32), Blob::copy_from_slice(&[1, 2, 3, 4])],
            );
            transport.send(&reply).unwrap();
            transport.finalize();
        });

        requester.join().unwrap();
        replier.join().unwrap();
    }

    #[test]
    fn self_destination_send_has_no_route() {
        let peers: Vec<SocketAddr> = vec![(Ipv4Addr::LOCALHOST, free_port()).into()];
        let ctx = ClusterContext::new(peers, 0).unwrap();
        let transport = Transport::open(ctx, &test_config()).unwrap();

        let msg = Message::new(Header { src: 0, dst: 0, table_id: 0, kind: MessageKind::Add });
        assert!(matches!(
            transport.send(&msg),
            Err(NetError::NoRoute { dst: 0, size: 1 })
        ));

        let out_of_range = Message::new(Header { src: 0, dst: 9, table_id: 0, kind: MessageKind::Add });
        assert!(matches!(
            transport.send(&out_of_range),
            Err(NetError::NoRoute { dst: 9, size: 1 })
        ));
        transport.finalize();
    }
}
