use anyhow::{bail, ensure, Context};
use tracing::info;

use shoal_net::{cluster_with_local, parse_peer_file, resolve_rank, NetConfig, SyncDispatcher, Transport};
use shoal_protocol::{Message, MessageKind};
use shoal_table::{AddUpdater, ArrayServer, ArrayWorker};
use shoal_types::ClusterContext;

use crate::cli::{AddArgs, Cli, Command, GetArgs, ServeArgs};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = NetConfig {
        peer_file: cli.peers.clone(),
        port: cli.port,
        ..NetConfig::default()
    };
    let ctx = membership(&cli, &config)?;
    let servers = cli.servers.unwrap_or_else(|| ctx.size());
    ensure!(
        servers > 0 && servers <= ctx.size(),
        "--servers must be between 1 and the peer count ({})",
        ctx.size()
    );

    match cli.command {
        Command::Serve(args) => cmd_serve(ctx, &config, cli.table_size, servers, args),
        Command::Add(args) => cmd_add(ctx, &config, cli.table_size, servers, args),
        Command::Get(args) => cmd_get(ctx, &config, cli.table_size, servers, args),
    }
}

fn membership(cli: &Cli, config: &NetConfig) -> anyhow::Result<ClusterContext> {
    let peers = parse_peer_file(&config.peer_file, config.port)?;
    let ctx = match cli.local {
        Some(local) => cluster_with_local(peers, local)?,
        None => {
            let rank = resolve_rank(&peers)?;
            ClusterContext::new(peers, rank)?
        }
    };
    info!(rank = ctx.rank(), size = ctx.size(), "resolved cluster membership");
    Ok(ctx)
}

fn cmd_serve(
    ctx: ClusterContext,
    config: &NetConfig,
    table_size: usize,
    servers: usize,
    args: ServeArgs,
) -> anyhow::Result<()> {
    let transport = Transport::open(ctx.clone(), config)?;
    let mut server =
        ArrayServer::<f32>::sharded(&ctx, table_size, servers, Box::new(AddUpdater))?;

    if let Some(path) = &args.checkpoint {
        if path.exists() {
            server
                .load_from_path(path)
                .with_context(|| format!("loading checkpoint {}", path.display()))?;
            info!(path = %path.display(), "loaded shard checkpoint");
        }
    }

    println!(
        "shard server rank {} serving {} of {} elements",
        server.rank(),
        server.local_len(),
        table_size
    );

    let mut served = 0u64;
    while args.requests == 0 || served < args.requests {
        // Any transport or invariant failure below aborts the process:
        // masking protocol desync risks silently wrong numeric state.
        let (request, _) = transport.recv()?;
        let reply = match request.header.kind {
            MessageKind::Get => Message::reply_to(&request.header, server.process_get(&request.data)?),
            MessageKind::Add => {
                server.process_add(&request.data)?;
                Message::reply_to(&request.header, vec![])
            }
            other => bail!("unexpected request kind {other:?}"),
        };
        transport.send(&reply)?;
        served += 1;
    }

    if let Some(path) = &args.checkpoint {
        server
            .store_to_path(path)
            .with_context(|| format!("storing checkpoint {}", path.display()))?;
        info!(path = %path.display(), "stored shard checkpoint");
    }
    println!("served {served} requests, shutting down");
    transport.finalize();
    Ok(())
}

fn cmd_add(
    ctx: ClusterContext,
    config: &NetConfig,
    table_size: usize,
    servers: usize,
    args: AddArgs,
) -> anyhow::Result<()> {
    check_worker_rank(&ctx, servers)?;
    let transport = Transport::open(ctx.clone(), config)?;
    let worker = ArrayWorker::<f32>::sharded(&ctx, table_size, servers)?;
    let dispatcher = SyncDispatcher::new(&transport);

    let delta = vec![args.value; table_size];
    worker.add(&dispatcher, &delta)?;
    println!("added {} to {} elements across {} shards", args.value, table_size, servers);
    transport.finalize();
    Ok(())
}

fn cmd_get(
    ctx: ClusterContext,
    config: &NetConfig,
    table_size: usize,
    servers: usize,
    args: GetArgs,
) -> anyhow::Result<()> {
    check_worker_rank(&ctx, servers)?;
    let transport = Transport::open(ctx.clone(), config)?;
    let worker = ArrayWorker::<f32>::sharded(&ctx, table_size, servers)?;
    let dispatcher = SyncDispatcher::new(&transport);

    let mut buf = vec![0.0f32; table_size];
    worker.get(&dispatcher, &mut buf)?;

    let sum: f64 = buf.iter().map(|v| f64::from(*v)).sum();
    let head: Vec<f32> = buf.iter().take(8).copied().collect();
    println!("fetched {table_size} elements: head {head:?}, sum {sum}");

    if let Some(expect) = args.expect {
        let mismatched = buf.iter().filter(|v| **v != expect).count();
        ensure!(mismatched == 0, "{mismatched} elements differ from {expect}");
        println!("all elements equal {expect}");
    }
    transport.finalize();
    Ok(())
}

fn check_worker_rank(ctx: &ClusterContext, servers: usize) -> anyhow::Result<()> {
    ensure!(
        ctx.rank() >= servers,
        "worker rank {} overlaps server ranks 0..{}; list worker addresses after the servers \
         and pass --servers",
        ctx.rank(),
        servers
    );
    Ok(())
}
