// BlueZ over the D-Bus system bus: object discovery, property access, player actions,
// and the signal listener that feeds the pipeline.

pub mod listener;
pub use listener::spawn_listener;

use bluetunes_core::{BusError, MediaBus, PropertyMap, Value, BLUEZ_SERVICE};
use dbus::{
    arg::{ArgType, PropMap, RefArg, Variant},
    blocking::{
        stdintf::org_freedesktop_dbus::{ObjectManager, Properties},
        Connection, Proxy,
    },
};
use std::time::Duration;
use tracing::debug;

/// Blocking connection to BlueZ, used from the UI thread.
pub struct Bluez {
    conn: Connection,
    timeout: Duration,
}

impl Bluez {
    /// Connect to the system bus.
    pub fn connect(timeout: Duration) -> anyhow::Result<Bluez> {
        let conn = Connection::new_system().map_err(|err| anyhow::anyhow!("Failed to connect to system bus: {err}"))?;
        debug!(unique_name = %conn.unique_name(), "connected to system bus");
        Ok(Bluez { conn, timeout })
    }

    fn proxy<'a>(&'a self, path: &'a str) -> Proxy<'a, &'a Connection> {
        self.conn.with_proxy(BLUEZ_SERVICE, path, self.timeout)
    }
}

fn call_error(operation: &str, path: &str, err: dbus::Error) -> BusError {
    BusError::Call {
        operation: operation.to_string(),
        path: path.to_string(),
        message: err.message().unwrap_or("unknown error").to_string(),
    }
}

impl MediaBus for Bluez {
    fn find_objects(&self, interface: &str) -> Result<Vec<String>, BusError> {
        let objects = self
            .proxy("/")
            .get_managed_objects()
            .map_err(|err| call_error("GetManagedObjects", "/", err))?;
        let mut paths: Vec<String> = objects
            .into_iter()
            .filter(|(_, ifaces)| ifaces.contains_key(interface))
            .map(|(path, _)| path.to_string())
            .collect();
        paths.sort();
        Ok(paths)
    }

    fn get_all(&self, path: &str, interface: &str) -> Result<PropertyMap, BusError> {
        let props = self
            .proxy(path)
            .get_all(interface)
            .map_err(|err| call_error("GetAll", path, err))?;
        Ok(property_map(&props))
    }

    fn get(&self, path: &str, interface: &str, name: &str) -> Result<Value, BusError> {
        let value: Variant<Box<dyn RefArg>> = self
            .proxy(path)
            .get(interface, name)
            .map_err(|err| call_error("Get", path, err))?;
        Ok(value_from_refarg(&*value.0))
    }

    fn set(&self, path: &str, interface: &str, name: &str, value: Value) -> Result<(), BusError> {
        let proxy = self.proxy(path);
        let result = match value {
            Value::Bool(v) => proxy.set(interface, name, v),
            Value::U16(v) => proxy.set(interface, name, v),
            Value::U32(v) => proxy.set(interface, name, v),
            Value::Int(v) => proxy.set(interface, name, v),
            Value::Str(v) => proxy.set(interface, name, v),
            Value::Dict(_) | Value::List(_) | Value::Other(_) => {
                return Err(BusError::Unsupported { name: name.to_string() })
            }
        };
        result.map_err(|err| call_error("Set", path, err))
    }

    fn call(&self, path: &str, interface: &str, method: &str) -> Result<(), BusError> {
        self.proxy(path)
            .method_call::<(), _, _, _>(interface, method, ())
            .map_err(|err| call_error(method, path, err))
    }
}

/// Convert a D-Bus property dictionary (`a{sv}`).
pub fn property_map(props: &PropMap) -> PropertyMap {
    props
        .iter()
        .map(|(key, value)| (key.clone(), value_from_refarg(&*value.0)))
        .collect()
}

/// Convert a single D-Bus value. Variants are unwrapped; dictionaries with string keys become
/// `Value::Dict`, other arrays `Value::List`.
pub fn value_from_refarg(arg: &dyn RefArg) -> Value {
    let other = || Value::Other(format!("{arg:?}"));
    match arg.arg_type() {
        ArgType::Boolean => arg.as_u64().map(|v| Value::Bool(v != 0)).unwrap_or_else(other),
        ArgType::UInt16 => arg
            .as_u64()
            .and_then(|v| u16::try_from(v).ok())
            .map(Value::U16)
            .unwrap_or_else(other),
        ArgType::UInt32 => arg
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .map(Value::U32)
            .unwrap_or_else(other),
        ArgType::Byte | ArgType::Int16 | ArgType::Int32 | ArgType::Int64 | ArgType::UInt64 => {
            arg.as_i64().map(Value::Int).unwrap_or_else(other)
        }
        ArgType::String | ArgType::ObjectPath => {
            arg.as_str().map(|s| Value::Str(s.to_string())).unwrap_or_else(other)
        }
        ArgType::Variant => arg
            .as_iter()
            .and_then(|mut inner| inner.next().map(value_from_refarg))
            .unwrap_or_else(other),
        ArgType::Array if arg.signature().starts_with("a{s") => {
            let Some(mut items) = arg.as_iter() else {
                return other();
            };
            let mut map = PropertyMap::new();
            // dictionaries iterate as key, value, key, value, ...
            while let (Some(key), Some(value)) = (items.next(), items.next()) {
                if let Some(key) = key.as_str() {
                    map.insert(key.to_string(), value_from_refarg(value));
                }
            }
            Value::Dict(map)
        }
        ArgType::Array => arg
            .as_iter()
            .map(|items| Value::List(items.map(value_from_refarg).collect()))
            .unwrap_or_else(other),
        _ => other(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn variant<T: RefArg + 'static>(v: T) -> Variant<Box<dyn RefArg>> {
        Variant(Box::new(v))
    }

    #[test]
    fn scalars() {
        assert_eq!(value_from_refarg(&true), Value::Bool(true));
        assert_eq!(value_from_refarg(&false), Value::Bool(false));
        assert_eq!(value_from_refarg(&87u16), Value::U16(87));
        assert_eq!(value_from_refarg(&215_000u32), Value::U32(215_000));
        assert_eq!(value_from_refarg(&-3i32), Value::Int(-3));
        assert_eq!(value_from_refarg(&"playing".to_string()), Value::Str("playing".into()));
    }

    #[test]
    fn variants_are_unwrapped() {
        assert_eq!(value_from_refarg(&variant(false)), Value::Bool(false));
        assert_eq!(value_from_refarg(&variant(variant(12u16))), Value::U16(12));
    }

    #[test]
    fn track_dictionary() {
        let mut track: PropMap = HashMap::new();
        track.insert("Title".into(), variant("So What".to_string()));
        track.insert("Artist".into(), variant("Miles Davis".to_string()));
        track.insert("Duration".into(), variant(562_000u32));
        let mut props: PropMap = HashMap::new();
        props.insert("Track".into(), variant(track));
        props.insert("Status".into(), variant("paused".to_string()));

        let converted = property_map(&props);
        assert_eq!(converted["Status"], Value::Str("paused".into()));
        let track = converted["Track"].as_dict().unwrap();
        assert_eq!(track["Title"], Value::Str("So What".into()));
        assert_eq!(track["Artist"], Value::Str("Miles Davis".into()));
        assert_eq!(track["Duration"], Value::U32(562_000));
    }

    #[test]
    fn plain_arrays_become_lists() {
        let uuids = vec!["0000110a".to_string(), "0000110b".to_string()];
        assert_eq!(
            value_from_refarg(&uuids),
            Value::List(vec![Value::Str("0000110a".into()), Value::Str("0000110b".into())])
        );
    }
}
