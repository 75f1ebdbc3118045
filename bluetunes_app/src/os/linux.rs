use bluetunes_bluez::{spawn_listener, Bluez};
use bluetunes_core::PipelineSender;
use std::time::Duration;
use tracing::debug;

pub type PlatformBus = Bluez;

pub fn connect_bus(timeout: Duration) -> anyhow::Result<PlatformBus> {
    Bluez::connect(timeout)
}

pub fn start_listener(sender: PipelineSender, retry: Duration) -> anyhow::Result<()> {
    let handle = spawn_listener(sender, retry)?;
    debug!(thread = ?handle.thread().name(), "started BlueZ listener");
    Ok(())
}
