use std::collections::BTreeMap;

use rhai::{Dynamic, Variant};

/// Opaque handle around a guest-native value, typically a host object
/// injected into a scope.
#[derive(Debug, Clone)]
pub struct HostObject(Dynamic);

impl HostObject {
    pub fn new<T: Variant + Clone>(value: T) -> Self {
        Self(Dynamic::from(value))
    }

    pub fn from_dynamic(value: Dynamic) -> Self {
        Self(value)
    }

    pub fn as_dynamic(&self) -> &Dynamic {
        &self.0
    }

    pub fn into_dynamic(self) -> Dynamic {
        self.0
    }

    pub fn downcast<T: Variant + Clone>(&self) -> Option<T> {
        self.0.clone().try_cast::<T>()
    }

    pub fn type_name(&self) -> &str {
        self.0.type_name()
    }
}

#[derive(Debug, Clone)]
pub enum GuestValue {
    Unit,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Seq(Vec<GuestValue>),
    Map(BTreeMap<String, GuestValue>),
    Object(HostObject),
}

impl GuestValue {
    pub fn object<T: Variant + Clone>(value: T) -> Self {
        Self::Object(HostObject::new(value))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(value) => Some(*value),
            Self::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[GuestValue]> {
        match self {
            Self::Seq(values) => Some(values.as_slice()),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&BTreeMap<String, GuestValue>> {
        match self {
            Self::Map(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&HostObject> {
        match self {
            Self::Object(object) => Some(object),
            _ => None,
        }
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, Self::Unit)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Seq(_) => "sequence",
            Self::Map(_) => "map",
            Self::Object(_) => "object",
        }
    }
}

// Host objects have no structural identity, so they never compare equal.
impl PartialEq for GuestValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Unit, Self::Unit) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a == b,
            (Self::Str(a), Self::Str(b)) => a == b,
            (Self::Seq(a), Self::Seq(b)) => a == b,
            (Self::Map(a), Self::Map(b)) => a == b,
            _ => false,
        }
    }
}

impl From<()> for GuestValue {
    fn from(_: ()) -> Self {
        Self::Unit
    }
}

impl From<bool> for GuestValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for GuestValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<i64> for GuestValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for GuestValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for GuestValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for GuestValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl<T: Into<GuestValue>> From<Vec<T>> for GuestValue {
    fn from(values: Vec<T>) -> Self {
        Self::Seq(values.into_iter().map(Into::into).collect())
    }
}

impl From<HostObject> for GuestValue {
    fn from(value: HostObject) -> Self {
        Self::Object(value)
    }
}

#[cfg(test)]
mod value_tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Probe(u8);

    #[test]
    fn accessors_match_variants() {
        assert_eq!(GuestValue::from("a").as_str(), Some("a"));
        assert_eq!(GuestValue::from(4).as_int(), Some(4));
        assert_eq!(GuestValue::from(4).as_float(), Some(4.0));
        assert_eq!(GuestValue::from(4.5).as_float(), Some(4.5));
        assert_eq!(GuestValue::from(4.5).as_int(), None);
        assert_eq!(GuestValue::from(true).as_bool(), Some(true));
        assert!(GuestValue::from(()).is_unit());

        let seq = GuestValue::from(vec!["a", "b"]);
        assert_eq!(seq.type_name(), "sequence");
        assert_eq!(
            seq.as_seq().map(<[GuestValue]>::len),
            Some(2)
        );
    }

    #[test]
    fn host_objects_never_compare_equal() {
        let object = GuestValue::object(Probe(1));
        assert_ne!(object, object.clone());
        assert_eq!(object.type_name(), "object");
        assert_eq!(
            object.as_object().and_then(HostObject::downcast::<Probe>),
            Some(Probe(1))
        );
        assert_eq!(
            object.as_object().and_then(HostObject::downcast::<String>),
            None
        );
    }

    #[test]
    fn structural_equality_covers_nested_values() {
        let left = GuestValue::Map(BTreeMap::from([(
            "k".to_string(),
            GuestValue::from(vec![1, 2]),
        )]));
        let right = GuestValue::Map(BTreeMap::from([(
            "k".to_string(),
            GuestValue::Seq(vec![GuestValue::Int(1), GuestValue::Int(2)]),
        )]));
        assert_eq!(left, right);
        assert_ne!(GuestValue::Int(1), GuestValue::Float(1.0));
    }
}
