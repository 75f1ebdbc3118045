use std::collections::BTreeMap;

/// Property map as carried by `PropertiesChanged` and `GetAll`.
pub type PropertyMap = BTreeMap<String, Value>;

/// A decoded D-Bus variant. Only the shapes BlueZ media objects actually use get their own variant.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Bool(bool),
    U16(u16),
    U32(u32),
    Int(i64),
    Str(String),
    Dict(PropertyMap),
    List(Vec<Value>),
    /// Anything else, kept as its debug rendering for logs.
    Other(String),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Accepts any integer that fits, since bindings disagree on the width they report.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            Value::U16(v) => Some(*v),
            Value::U32(v) => u16::try_from(*v).ok(),
            Value::Int(v) => u16::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            Value::U16(v) => Some(*v as u32),
            Value::U32(v) => Some(*v),
            Value::Int(v) => u32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&PropertyMap> {
        match self {
            Value::Dict(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<u16> for Value {
    fn from(v: u16) -> Self {
        Value::U16(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::U32(v)
    }
}

impl From<PropertyMap> for Value {
    fn from(map: PropertyMap) -> Self {
        Value::Dict(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_accessors_accept_any_width_that_fits() {
        assert_eq!(Value::U16(90).as_u16(), Some(90));
        assert_eq!(Value::U32(90).as_u16(), Some(90));
        assert_eq!(Value::Int(90).as_u16(), Some(90));
        assert_eq!(Value::Int(-1).as_u16(), None);
        assert_eq!(Value::U32(70_000).as_u16(), None);
        assert_eq!(Value::U16(5).as_u32(), Some(5));
    }

    #[test]
    fn accessors_reject_other_shapes() {
        assert_eq!(Value::from("playing").as_bool(), None);
        assert_eq!(Value::Bool(true).as_str(), None);
        assert!(Value::Other("(ay)".into()).as_dict().is_none());
    }
}
