use anyhow::bail;
use bluetunes_core::{BusError, MediaBus, PipelineSender, PropertyMap, Value};
use std::time::Duration;

const UNAVAILABLE: &str = "BlueZ media control is only available on Linux";

pub struct PlatformBus;

impl MediaBus for PlatformBus {
    fn find_objects(&self, _interface: &str) -> Result<Vec<String>, BusError> {
        Err(BusError::Unavailable(UNAVAILABLE.into()))
    }
    fn get_all(&self, _path: &str, _interface: &str) -> Result<PropertyMap, BusError> {
        Err(BusError::Unavailable(UNAVAILABLE.into()))
    }
    fn get(&self, _path: &str, _interface: &str, _name: &str) -> Result<Value, BusError> {
        Err(BusError::Unavailable(UNAVAILABLE.into()))
    }
    fn set(&self, _path: &str, _interface: &str, _name: &str, _value: Value) -> Result<(), BusError> {
        Err(BusError::Unavailable(UNAVAILABLE.into()))
    }
    fn call(&self, _path: &str, _interface: &str, _method: &str) -> Result<(), BusError> {
        Err(BusError::Unavailable(UNAVAILABLE.into()))
    }
}

pub fn connect_bus(_timeout: Duration) -> anyhow::Result<PlatformBus> {
    bail!(UNAVAILABLE)
}

pub fn start_listener(_sender: PipelineSender, _retry: Duration) -> anyhow::Result<()> {
    bail!(UNAVAILABLE)
}
