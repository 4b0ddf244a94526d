use std::env;
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use dht_logic::{Id, RoutingTable, SystemConfig};
use tokio::net::UdpSocket;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod udp_transport;

use udp_transport::UdpTransport;

/// Largest datagram we'll read off the wire. Generously larger than any
/// `find_node` reply this node ever sends (26 bytes per packed node, `K`
/// of them, plus the KRPC envelope).
const MAX_DATAGRAM: usize = 1500;

/// Cadence of the background bucket/callback maintenance tick.
const MAINTENANCE_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let bind_addr = match parse_bind_addr() {
        Ok(addr) => addr,
        Err(message) => {
            error!("{}", message);
            return ExitCode::from(2);
        }
    };

    let socket = match UdpSocket::bind(bind_addr).await {
        Ok(socket) => Arc::new(socket),
        Err(e) => {
            error!(error = %e, %bind_addr, "failed to bind socket");
            return ExitCode::from(1);
        }
    };

    let self_id = Id::random();
    info!(id = %self_id, %bind_addr, "dht node starting");

    let table = Arc::new(RoutingTable::new(self_id, SystemConfig::default(), UdpTransport::new(socket.clone())));

    let maintenance_table = table.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(MAINTENANCE_INTERVAL);
        loop {
            ticker.tick().await;
            if let Err(e) = maintenance_table.maintenance_tick().await {
                warn!(error = %e, "maintenance tick incomplete");
            }
        }
    });

    tokio::select! {
        () = run_receive_loop(socket, table) => unreachable!("receive loop never returns on its own"),
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received, exiting");
            ExitCode::SUCCESS
        }
    }
}

async fn run_receive_loop(socket: Arc<UdpSocket>, table: Arc<RoutingTable<UdpTransport>>) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        let (len, from) = match socket.recv_from(&mut buf).await {
            Ok(v) => v,
            Err(e) => {
                error!(error = %e, "recv_from failed");
                continue;
            }
        };

        let from = match from {
            SocketAddr::V4(v4) => v4,
            SocketAddr::V6(_) => {
                warn!("ignoring datagram from an IPv6 peer");
                continue;
            }
        };

        let datagram = buf[..len].to_vec();
        let table = table.clone();
        tokio::spawn(async move {
            if let Err(e) = table.on_datagram(from, &datagram).await {
                error!(error = %e, %from, "failed to handle datagram");
            }
        });
    }
}

/// Reads the bind address from the first CLI argument, defaulting to
/// `0.0.0.0:6881` (the conventional Mainline DHT port) when none is given.
fn parse_bind_addr() -> Result<SocketAddrV4, String> {
    match env::args().nth(1) {
        Some(arg) => arg.parse::<SocketAddrV4>().map_err(|_| format!("invalid bind address: {}", arg)),
        None => Ok(SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 6881)),
    }
}
