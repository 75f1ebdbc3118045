use crate::value::{PropertyMap, Value};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    #[error("{operation} on {path} failed: {message}")]
    Call {
        operation: String,
        path: String,
        message: String,
    },
    #[error("property {name} has an unexpected type")]
    PropertyType { name: String },
    #[error("cannot write property {name} with this value type")]
    Unsupported { name: String },
    #[error("bus unavailable: {0}")]
    Unavailable(String),
}

/// The remote operations the session needs from the system bus.
/// Paths are object paths on the BlueZ service.
pub trait MediaBus {
    /// Paths of every object currently implementing `interface`, sorted.
    fn find_objects(&self, interface: &str) -> Result<Vec<String>, BusError>;
    fn get_all(&self, path: &str, interface: &str) -> Result<PropertyMap, BusError>;
    fn get(&self, path: &str, interface: &str, name: &str) -> Result<Value, BusError>;
    fn set(&self, path: &str, interface: &str, name: &str, value: Value) -> Result<(), BusError>;
    /// Invoke a method that takes no arguments and whose reply is ignored.
    fn call(&self, path: &str, interface: &str, method: &str) -> Result<(), BusError>;
}

#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::{cell::RefCell, collections::BTreeMap};

    #[derive(Clone, Debug, PartialEq)]
    pub enum Call {
        Set { path: String, name: String, value: Value },
        Method { path: String, method: String },
    }

    /// In-memory bus: objects with per-interface properties, and a log of writes and method calls.
    #[derive(Default)]
    pub struct FakeBus {
        pub objects: RefCell<BTreeMap<String, BTreeMap<String, PropertyMap>>>,
        pub calls: RefCell<Vec<Call>>,
        pub fail_calls: bool,
    }

    impl FakeBus {
        pub fn add(&self, path: &str, interface: &str, props: PropertyMap) {
            self.objects
                .borrow_mut()
                .entry(path.to_string())
                .or_default()
                .insert(interface.to_string(), props);
        }

        pub fn remove(&self, path: &str) {
            self.objects.borrow_mut().remove(path);
        }

        pub fn put_property(&self, path: &str, interface: &str, name: &str, value: Value) {
            self.objects
                .borrow_mut()
                .entry(path.to_string())
                .or_default()
                .entry(interface.to_string())
                .or_default()
                .insert(name.to_string(), value);
        }

        pub fn methods(&self) -> Vec<String> {
            self.calls
                .borrow()
                .iter()
                .filter_map(|c| match c {
                    Call::Method { method, .. } => Some(method.clone()),
                    _ => None,
                })
                .collect()
        }

        fn missing(path: &str, operation: &str) -> BusError {
            BusError::Call {
                operation: operation.to_string(),
                path: path.to_string(),
                message: "no such object".to_string(),
            }
        }
    }

    impl MediaBus for FakeBus {
        fn find_objects(&self, interface: &str) -> Result<Vec<String>, BusError> {
            Ok(self
                .objects
                .borrow()
                .iter()
                .filter(|(_, ifaces)| ifaces.contains_key(interface))
                .map(|(path, _)| path.clone())
                .collect())
        }

        fn get_all(&self, path: &str, interface: &str) -> Result<PropertyMap, BusError> {
            self.objects
                .borrow()
                .get(path)
                .and_then(|ifaces| ifaces.get(interface))
                .cloned()
                .ok_or_else(|| Self::missing(path, "GetAll"))
        }

        fn get(&self, path: &str, interface: &str, name: &str) -> Result<Value, BusError> {
            self.get_all(path, interface)?
                .remove(name)
                .ok_or_else(|| Self::missing(path, "Get"))
        }

        fn set(&self, path: &str, interface: &str, name: &str, value: Value) -> Result<(), BusError> {
            if self.fail_calls {
                return Err(Self::missing(path, "Set"));
            }
            self.put_property(path, interface, name, value.clone());
            self.calls.borrow_mut().push(Call::Set {
                path: path.to_string(),
                name: name.to_string(),
                value,
            });
            Ok(())
        }

        fn call(&self, path: &str, _interface: &str, method: &str) -> Result<(), BusError> {
            if self.fail_calls {
                return Err(Self::missing(path, method));
            }
            self.calls.borrow_mut().push(Call::Method {
                path: path.to_string(),
                method: method.to_string(),
            });
            Ok(())
        }
    }
}
