mod actions;
mod config;
mod dispatch;
mod error;
mod ipc;
mod permissions;
mod state;

use std::sync::Arc;

use tokio::net::TcpListener;

use actions::capture::{CaptureSession, ScreenBackend};
use actions::notify::SystemNotifier;
use actions::shell::SystemRunner;
use dispatch::Dispatcher;
use permissions::probe::PlatformProbe;
use permissions::PermissionStore;
use state::ControlState;

#[tokio::main]
async fn main() {
    env_logger::init();

    let settings = config::load();
    let control = Arc::new(ControlState::new(&settings));
    let dispatcher = Arc::new(Dispatcher::new(
        control.clone(),
        PermissionStore::new(Box::new(PlatformProbe)),
        Box::new(SystemNotifier),
        CaptureSession::new(Box::new(ScreenBackend)),
        Box::new(SystemRunner),
    ));

    let listener = TcpListener::bind(("127.0.0.1", settings.listen_port))
        .await
        .expect("failed to bind command port");
    log::info!("valetd listening on 127.0.0.1:{}", settings.listen_port);
    if control.paused() {
        log::info!("starting paused; all actions will be refused until resumed");
    }

    tokio::select! {
        _ = ipc::server::serve(listener, dispatcher) => {}
        _ = tokio::signal::ctrl_c() => {
            log::info!("shutdown signal received");
        }
    }

    log::info!("clean shutdown complete");
}
