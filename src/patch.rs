// src/patch.rs

//! Tri-state fields for partial updates.
//!
//! A JSON key that is missing leaves the field [`Patch::Unset`]; a key holding
//! `null` becomes [`Patch::Null`]; anything else becomes [`Patch::Value`].
//! Update payloads mark every field `#[serde(default)]` so that only keys
//! actually present in the body reach the deserializer below.

use serde::{Deserialize, Deserializer};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn as_value(&self) -> Option<&T> {
        match self {
            Patch::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Collapses a patch on a non-nullable field: `Unset` is `None`, a value is
    /// `Some`, and an explicit `null` is rejected.
    pub fn required(self, field: &str) -> Result<Option<T>, AppError> {
        match self {
            Patch::Unset => Ok(None),
            Patch::Null => Err(AppError::validation(format!("{} cannot be null", field))),
            Patch::Value(v) => Ok(Some(v)),
        }
    }

    /// Overwrites a non-nullable field when the patch carries a value.
    pub fn apply(self, field: &str, target: &mut T) -> Result<(), AppError> {
        if let Some(v) = self.required(field)? {
            *target = v;
        }
        Ok(())
    }

    /// Overwrites or clears a nullable field.
    pub fn apply_nullable(self, target: &mut Option<T>) {
        match self {
            Patch::Unset => {}
            Patch::Null => *target = None,
            Patch::Value(v) => *target = Some(v),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only called for keys present in the input.
        Option::<T>::deserialize(deserializer).map(Patch::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    #[serde(default, rename_all = "camelCase")]
    struct Payload {
        title: Patch<String>,
        assignee_id: Patch<i64>,
    }

    #[test]
    fn distinguishes_absent_null_and_value() {
        let absent: Payload = serde_json::from_str("{}").unwrap();
        assert_eq!(absent.title, Patch::Unset);
        assert_eq!(absent.assignee_id, Patch::Unset);

        let cleared: Payload = serde_json::from_str(r#"{"assigneeId": null}"#).unwrap();
        assert_eq!(cleared.title, Patch::Unset);
        assert_eq!(cleared.assignee_id, Patch::Null);

        let set: Payload = serde_json::from_str(r#"{"title": "X", "assigneeId": 4}"#).unwrap();
        assert_eq!(set.title, Patch::Value("X".to_string()));
        assert_eq!(set.assignee_id, Patch::Value(4));
    }

    #[test]
    fn nullable_apply_touches_only_mentioned_fields() {
        let mut assignee = Some(9);
        Patch::<i64>::Unset.apply_nullable(&mut assignee);
        assert_eq!(assignee, Some(9));
        Patch::Null.apply_nullable(&mut assignee);
        assert_eq!(assignee, None);
        Patch::Value(2).apply_nullable(&mut assignee);
        assert_eq!(assignee, Some(2));
    }

    #[test]
    fn required_field_rejects_explicit_null() {
        let mut title = "keep".to_string();
        assert!(Patch::Unset.apply("title", &mut title).is_ok());
        assert_eq!(title, "keep");

        let err = Patch::<String>::Null.apply("title", &mut title).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(title, "keep");

        Patch::Value("new".to_string()).apply("title", &mut title).unwrap();
        assert_eq!(title, "new");
    }

    #[test]
    fn wrong_type_is_a_deserialization_error() {
        assert!(serde_json::from_str::<Payload>(r#"{"assigneeId": "four"}"#).is_err());
    }
}
