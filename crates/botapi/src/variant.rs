//! Codec support for closed "one of N concrete shapes" values.
//!
//! The platform discriminates variant values in one of two ways:
//!
//! - **Explicit tag.** A field such as `status` or `type` names the shape.
//!   These families derive serde's internally tagged representation; an
//!   unknown tag is a decode error.
//! - **Structural.** The shape is implied by which marker field is present
//!   (`inline_keyboard` vs `keyboard`, ...). These families decode through
//!   [`probe_shape`], which picks the first shape whose marker is present and
//!   fails otherwise.
//!
//! [`ObjectOrTrue`] covers the edit-style results that are either the updated
//! object or a bare `true` confirmation.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use tracing::debug;

use crate::DecodeError;

/// Returns the first shape whose marker field is present on `value`.
///
/// `shapes` is checked in order, so list more specific markers first when two
/// shapes could share a field.
pub fn probe_shape<K: Copy>(
    value: &Value,
    family: &'static str,
    shapes: &[(&'static str, K)],
) -> Result<K, DecodeError> {
    let shape = value.as_object().and_then(|object| {
        shapes
            .iter()
            .find(|(marker, _)| object.contains_key(*marker))
            .map(|(_, shape)| *shape)
    });

    shape.ok_or_else(|| {
        let found = describe(value);
        debug!(family, found = %found, "no variant shape matched");
        DecodeError::UnknownVariant { family, found }
    })
}

/// Short, token-free description of a JSON value for error messages.
pub fn describe(value: &Value) -> String {
    match value {
        Value::Null => "null".to_owned(),
        Value::Bool(b) => format!("boolean {b}"),
        Value::Number(n) => format!("number {n}"),
        Value::String(_) => "string".to_owned(),
        Value::Array(items) => format!("array of {}", items.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with fields [{}]", keys.join(", "))
        }
    }
}

/// Decodes a structural variant from an owned value, mapping failures into
/// the deserializer's error type.
pub(crate) fn decode_shape<'de, D, T>(value: Value) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    serde_json::from_value(value).map_err(D::Error::custom)
}

// ---------------------------------------------------------------------------
// Object-or-confirmation results
// ---------------------------------------------------------------------------

/// Result of an edit-style method that returns either the updated object or
/// a bare `true`.
///
/// The platform returns `true` when the edited message was sent via inline
/// mode (it has no chat the bot can see) and the updated object otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectOrTrue<T> {
    /// The platform returned the updated object.
    Object(T),
    /// The platform returned the literal `true`.
    Confirmed,
}

impl<T> ObjectOrTrue<T> {
    /// Returns the object, or `None` for a bare confirmation.
    pub fn into_object(self) -> Option<T> {
        match self {
            ObjectOrTrue::Object(object) => Some(object),
            ObjectOrTrue::Confirmed => None,
        }
    }

    /// Returns `true` for [`ObjectOrTrue::Confirmed`].
    pub fn is_confirmation(&self) -> bool {
        matches!(self, ObjectOrTrue::Confirmed)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for ObjectOrTrue<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        match value {
            Value::Bool(true) => Ok(ObjectOrTrue::Confirmed),
            Value::Object(_) => decode_shape::<D, T>(value).map(ObjectOrTrue::Object),
            other => Err(D::Error::custom(DecodeError::UnknownVariant {
                family: "ObjectOrTrue",
                found: describe(&other),
            })),
        }
    }
}

impl<T: Serialize> Serialize for ObjectOrTrue<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ObjectOrTrue::Object(object) => object.serialize(serializer),
            ObjectOrTrue::Confirmed => serializer.serialize_bool(true),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Shape {
        A,
        B,
    }

    #[test]
    fn probe_picks_first_present_marker() {
        let shapes = [("alpha", Shape::A), ("beta", Shape::B)];
        assert_eq!(probe_shape(&json!({"beta": 1}), "Test", &shapes), Ok(Shape::B));
        assert_eq!(
            probe_shape(&json!({"alpha": 1, "beta": 2}), "Test", &shapes),
            Ok(Shape::A)
        );
    }

    #[test]
    fn unmatched_values_are_rejected() {
        let shapes = [("alpha", Shape::A)];
        let err = probe_shape(&json!({"gamma": 1}), "Test", &shapes).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownVariant {
                family: "Test",
                found: "object with fields [gamma]".into()
            }
        );
        assert!(probe_shape(&json!([1, 2]), "Test", &shapes).is_err());
    }

    #[derive(Debug, PartialEq, Deserialize)]
    struct Thing {
        id: i64,
    }

    #[test]
    fn object_or_true_decodes_both_cases() {
        let confirmed: ObjectOrTrue<Thing> = serde_json::from_value(json!(true)).unwrap();
        assert!(confirmed.is_confirmation());

        let object: ObjectOrTrue<Thing> = serde_json::from_value(json!({"id": 3})).unwrap();
        assert_eq!(object, ObjectOrTrue::Object(Thing { id: 3 }));
    }

    #[test]
    fn object_or_true_rejects_other_shapes() {
        assert!(serde_json::from_value::<ObjectOrTrue<Thing>>(json!(false)).is_err());
        assert!(serde_json::from_value::<ObjectOrTrue<Thing>>(json!("ok")).is_err());
        assert!(serde_json::from_value::<ObjectOrTrue<Thing>>(json!({"name": "x"})).is_err());
    }
}
