use std::{
    net::SocketAddr,
    sync::Arc,
    thread,
    time::Duration,
};

use anyhow::Result;
use clap::{Parser, Subcommand};
use srtfacade::{Callbacks, Configuration, Facade, NetworkConnection};

#[derive(Parser)]
#[command(
    about = env!("CARGO_PKG_DESCRIPTION"),
    version = env!("CARGO_PKG_VERSION"),
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
    /// Pre-shared key; empty disables encryption.
    #[arg(long, default_value = "")]
    psk: String,
}

#[derive(Subcommand)]
enum Command {
    /// Runs an SRT server that echoes every message it receives.
    Server {
        #[arg(long)]
        address: SocketAddr,
        #[arg(long)]
        single_client: bool,
    },
    /// Runs an SRT client that sends one message and prints the echo.
    Client {
        #[arg(long)]
        address: SocketAddr,
        #[arg(long, default_value = "hello")]
        message: String,
    },
}

fn main() -> Result<()> {
    simple_logger::init_with_level(log::Level::Info)?;

    let cli = Cli::parse();
    if !srtfacade::startup() {
        anyhow::bail!("failed to initialize the SRT library");
    }

    match cli.command {
        Command::Server {
            address,
            single_client,
        } => run_server(address, &cli.psk, single_client)?,
        Command::Client { address, message } => run_client(address, &cli.psk, &message)?,
    }

    srtfacade::shutdown();
    Ok(())
}

fn run_server(address: SocketAddr, psk: &str, single_client: bool) -> Result<()> {
    let config = Configuration::builder()
        .local_host(address.ip().to_string())
        .local_port(address.port())
        .passphrase(psk)
        .single_client(single_client)
        .build();

    let facade = Arc::new(Facade::new());
    let mut callbacks = Callbacks::default();
    callbacks.client_connected = Some(Box::new(|peer, socket, _server_ctx, info| {
        log::info!(
            "client connected: peer={peer}, socket={socket}, peer_version={}",
            info.peer_version
        );
        Some(NetworkConnection::new(peer))
    }));
    let echo_facade = facade.clone();
    callbacks.received_data = Some(Box::new(move |payload, _ctrl, ctx, socket| {
        if let Some(peer) = ctx.downcast_ref::<SocketAddr>() {
            log::info!("echoing {} bytes back to {peer} (socket {socket})", payload.len());
        }
        if !echo_facade.send_data(payload, Some(socket)) {
            log::warn!("echo back to socket {socket} failed");
        }
    }));
    callbacks.client_disconnected = Some(Box::new(|_ctx, socket| {
        log::info!("client disconnected: socket={socket}");
    }));

    if !facade.start_server(config, callbacks, None) {
        anyhow::bail!("startServer failed");
    }

    log::info!("listening on port {}", facade.locally_bound_port());

    loop {
        thread::sleep(Duration::from_secs(1));
    }
}

fn run_client(address: SocketAddr, psk: &str, message: &str) -> Result<()> {
    let config = Configuration::builder()
        .remote_host(address.ip().to_string())
        .remote_port(address.port())
        .passphrase(psk)
        .fail_on_connect_error(true)
        .build();

    let facade = Facade::new();
    let mut callbacks = Callbacks::default();
    callbacks.connected_to_server = Some(Box::new(|_ctx, socket, info| {
        log::info!(
            "connected to server: socket={socket}, negotiated_latency={}",
            info.negotiated_latency
        );
    }));
    callbacks.received_data = Some(Box::new(|payload, _ctrl, _ctx, _socket| {
        log::info!("received echo: {} bytes", payload.len());
    }));

    let ctx = NetworkConnection::new(());
    if !facade.start_client(config, None, callbacks, ctx) {
        anyhow::bail!("startClient failed");
    }

    thread::sleep(Duration::from_millis(200));
    if !facade.send_data(message.as_bytes(), None) {
        log::warn!("sendData failed");
    }

    thread::sleep(Duration::from_secs(1));
    facade.stop();
    Ok(())
}
