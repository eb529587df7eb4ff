use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use tracing::{error, info, trace, warn};

use crate::config::{ClientSettings, SETTINGS_PATH};
use crate::dispatch::Dispatcher;
use crate::handlers;
use crate::main_thread::MainThreadState;
use crate::net::ClientNet;
use crate::session::Session;

/// Connects and runs the client loop until the connection closes. Each
/// tick: pump the transport, dispatch inbound messages in arrival order,
/// move finished chunk decodes into the world, run handed-off main-thread
/// work, then flush outbound messages FIFO.
pub fn run() {
    let _ = tracing_subscriber::fmt().with_target(false).try_init();

    let settings = match ClientSettings::load(Path::new(SETTINGS_PATH)) {
        Ok(settings) => settings,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => ClientSettings::default(),
        Err(err) => {
            warn!("falling back to default settings: {err}");
            ClientSettings::default()
        }
    };

    let server_addr: SocketAddr = match settings.server_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!("invalid server address {:?}: {err}", settings.server_addr);
            return;
        }
    };

    let (session, channels) = match Session::create(settings.decode_threads()) {
        Ok(created) => created,
        Err(err) => {
            error!("failed to start decode workers: {err}");
            return;
        }
    };

    let mut dispatcher = Dispatcher::new();
    handlers::register_defaults(&mut dispatcher);

    let mut net = ClientNet::new(server_addr);
    net.connect(&settings.username);

    let mut state = MainThreadState::default();
    let tick = Duration::from_secs_f64(1.0 / f64::from(settings.tick_hz));

    loop {
        net.update(tick);
        if !net.is_connected() {
            info!("connection closed");
            break;
        }

        for msg in net.receive_reliable() {
            dispatcher.dispatch(&session, msg);
        }
        for msg in net.receive_unreliable() {
            dispatcher.dispatch(&session, msg);
        }

        session.ingest.apply_completed(&session.world);
        channels.handoff.drain(&mut state);

        for msg in channels.outbound.drain() {
            net.send_reliable(&msg);
        }
        // The render layer consumes these; without one attached they only
        // leave a trace.
        for event in channels.render.drain() {
            trace!("render notice: {event:?}");
        }

        std::thread::sleep(tick);
    }

    net.disconnect();
}
