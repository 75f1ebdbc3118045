use crate::property_map;
use anyhow::Context;
use bluetunes_core::{ChangeNotification, PipelineSender};
use dbus::{
    blocking::{stdintf::org_freedesktop_dbus::PropertiesPropertiesChanged, Connection},
    message::MatchRule,
    Message, Path,
};
use std::{
    thread::{self, JoinHandle},
    time::Duration,
};
use tracing::{debug, info, trace, warn};

const PROPERTIES_IFACE: &str = "org.freedesktop.DBus.Properties";
const BLUEZ_ROOT: &str = "/org/bluez";
const PROCESS_PERIOD: Duration = Duration::from_secs(1);

fn notification_from_signal(signal: &PropertiesPropertiesChanged) -> ChangeNotification {
    ChangeNotification::new(
        signal.interface_name.clone(),
        property_map(&signal.changed_properties),
    )
}

/// Register for `PropertiesChanged` on every BlueZ object and forward them until the connection fails.
fn listen(sender: &PipelineSender) -> Result<(), dbus::Error> {
    let conn = Connection::new_system()?;
    let mut rule = MatchRule::new_signal(PROPERTIES_IFACE, "PropertiesChanged");
    rule.path = Some(Path::from(BLUEZ_ROOT));
    rule.path_is_namespace = true;

    let sender = sender.clone();
    conn.add_match(
        rule,
        move |signal: PropertiesPropertiesChanged, _: &Connection, msg: &Message| {
            trace!(path = ?msg.path(), interface = %signal.interface_name, "properties changed");
            sender.put(notification_from_signal(&signal));
            true
        },
    )?;
    info!("listening for BlueZ property changes");

    loop {
        conn.process(PROCESS_PERIOD)?;
    }
}

/// Start the listener thread. It reconnects after `retry` whenever the bus connection fails,
/// and lives until the process exits.
pub fn spawn_listener(sender: PipelineSender, retry: Duration) -> anyhow::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("bluez-listener".into())
        .spawn(move || loop {
            if let Err(err) = listen(&sender) {
                warn!(%err, "BlueZ listener lost the system bus");
            }
            debug!(?retry, "restarting BlueZ listener");
            thread::sleep(retry);
        })
        .context("Failed to spawn BlueZ listener thread")
}

#[cfg(test)]
mod tests {
    use super::*;
    use bluetunes_core::{pipeline, Value, DEVICE_IFACE};
    use dbus::arg::{PropMap, RefArg, Variant};

    #[test]
    fn signal_becomes_notification() {
        let mut changed: PropMap = PropMap::new();
        changed.insert("Connected".into(), Variant(Box::new(false) as Box<dyn RefArg>));
        let signal = PropertiesPropertiesChanged {
            interface_name: DEVICE_IFACE.to_string(),
            changed_properties: changed,
            invalidated_properties: vec!["Alias".into()],
        };

        let (tx, rx) = pipeline();
        tx.put(notification_from_signal(&signal));
        let drained = rx.drain_all();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].interface, DEVICE_IFACE);
        assert_eq!(drained[0].changed["Connected"], Value::Bool(false));
    }
}
