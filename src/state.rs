//! Writes attribute maps into the declarative-state store.

use crate::encode::{AttrValue, AttributeMap, Encode};
use crate::error::{ApiError, StateError};
use std::collections::{BTreeMap, BTreeSet};

pub const ID_ATTRIBUTE: &str = "id";

/// A persisted record in the external state store.
pub trait StateTarget {
    fn id(&self) -> Option<&str>;
    fn set_id(&mut self, id: String);
    /// Mark the record as gone; the store drops it after the current operation.
    fn clear_id(&mut self);
    fn set(&mut self, key: &str, value: AttrValue) -> Result<(), String>;
}

/// Apply `map` to `target`. `id` sets the identifier and is never set as an ordinary key;
/// the first failing key aborts and nothing after it is applied.
pub fn apply<S: StateTarget + ?Sized>(map: AttributeMap, target: &mut S) -> Result<(), StateError> {
    let mut map = map;
    if let Some(id) = map.remove(ID_ATTRIBUTE) {
        let id = match id {
            AttrValue::String(s) => s,
            AttrValue::Int(n) if n >= 0 => n.to_string(),
            other => return Err(StateError::InvalidId(other.to_string())),
        };
        target.set_id(id);
    }

    for (key, value) in map {
        tracing::debug!(key = %key, kind = value.kind(), "set attribute");
        let shown = value.to_string();
        target.set(&key, value).map_err(|reason| StateError::Set {
            key,
            value: shown,
            reason,
        })?;
    }
    Ok(())
}

/// Encode `record` and apply the result to `target`.
pub fn encode_and_apply<T, S>(record: &T, target: &mut S) -> Result<(), ApiError>
where
    T: Encode,
    S: StateTarget + ?Sized,
{
    let map = record.encode()?;
    apply(map, target)?;
    Ok(())
}

/// Read path: a found record is written to state; a not-found error clears the id so the
/// store forgets the record. Any other error propagates.
pub fn apply_read<T, S>(result: Result<Option<T>, ApiError>, target: &mut S) -> Result<(), ApiError>
where
    T: Encode,
    S: StateTarget + ?Sized,
{
    match result {
        Ok(Some(record)) => encode_and_apply(&record, target),
        Ok(None) => {
            tracing::warn!(id = ?target.id(), "read returned no content, removing from state");
            target.clear_id();
            Ok(())
        }
        Err(e) if e.is_not_found() => {
            tracing::warn!(id = ?target.id(), "record not found, removing from state");
            target.clear_id();
            Ok(())
        }
        Err(e) => Err(e),
    }
}

/// In-memory state record. With a schema, setting a key outside it fails like the real store.
#[derive(Clone, Debug, Default)]
pub struct MemoryState {
    id: Option<String>,
    schema: Option<BTreeSet<String>>,
    attributes: BTreeMap<String, AttrValue>,
}

impl MemoryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        MemoryState {
            schema: Some(keys.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.attributes.get(key)
    }

    pub fn attributes(&self) -> &BTreeMap<String, AttrValue> {
        &self.attributes
    }
}

impl StateTarget for MemoryState {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    fn clear_id(&mut self) {
        self.id = None;
    }

    fn set(&mut self, key: &str, value: AttrValue) -> Result<(), String> {
        if let Some(schema) = &self.schema {
            if !schema.contains(key) {
                return Err(format!("invalid address to set: {key:?}"));
            }
        }
        self.attributes.insert(key.to_string(), value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::AppError;
    use reqwest::Method;

    fn map(pairs: &[(&str, AttrValue)]) -> AttributeMap {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn string_id_sets_identifier_only() {
        let mut state = MemoryState::new();
        apply(
            map(&[("id", "abc".into()), ("name", "ops".into())]),
            &mut state,
        )
        .unwrap();
        assert_eq!(state.id(), Some("abc"));
        assert!(state.get("id").is_none());
        assert_eq!(state.get("name"), Some(&AttrValue::String("ops".into())));
    }

    #[test]
    fn integer_id_is_normalized_to_string() {
        let mut state = MemoryState::new();
        apply(map(&[("id", AttrValue::Int(42))]), &mut state).unwrap();
        assert_eq!(state.id(), Some("42"));
    }

    #[test]
    fn non_scalar_id_is_rejected() {
        let mut state = MemoryState::new();
        let err = apply(map(&[("id", AttrValue::Bool(true))]), &mut state).unwrap_err();
        assert!(matches!(err, StateError::InvalidId(_)));
        assert_eq!(state.id(), None);
    }

    #[test]
    fn first_failing_key_aborts() {
        let mut state = MemoryState::with_schema(["alpha", "gamma"]);
        let err = apply(
            map(&[
                ("alpha", AttrValue::Int(1)),
                ("beta", AttrValue::Int(2)),
                ("gamma", AttrValue::Int(3)),
            ]),
            &mut state,
        )
        .unwrap_err();
        match err {
            StateError::Set { key, value, .. } => {
                assert_eq!(key, "beta");
                assert_eq!(value, "2");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(state.get("alpha").is_some());
        assert!(state.get("gamma").is_none());
    }

    struct Thing {
        id: String,
    }

    impl crate::encode::Projectable for Thing {
        const RECORD: &'static str = "Thing";
        const FIELDS: &'static [crate::encode::Field<Self>] = &[crate::encode::Field::attr(
            "id",
            "id",
            |t| crate::encode::ToAttribute::to_attribute(&t.id),
        )];
    }

    impl Encode for Thing {}

    #[test]
    fn read_not_found_clears_id() {
        let mut state = MemoryState::new();
        state.set_id("stale".into());
        let result: Result<Option<Thing>, ApiError> = Err(ApiError::Api {
            method: Method::GET,
            url: "https://api.oncall.io/v3/things/stale".into(),
            error: AppError {
                status: 404,
                message: "not found".into(),
                error_details: None,
                conflict_data: None,
            },
        });
        apply_read(result, &mut state).unwrap();
        assert_eq!(state.id(), None);
    }

    #[test]
    fn read_other_errors_propagate() {
        let mut state = MemoryState::new();
        state.set_id("keep".into());
        let result: Result<Option<Thing>, ApiError> = Err(ApiError::EmptyBody {
            method: Method::GET,
            url: "https://api.oncall.io/v3/things/keep".into(),
            status: 500,
        });
        assert!(apply_read(result, &mut state).is_err());
        assert_eq!(state.id(), Some("keep"));
    }

    #[test]
    fn read_found_writes_state() {
        let mut state = MemoryState::new();
        apply_read(Ok(Some(Thing { id: "t-9".into() })), &mut state).unwrap();
        assert_eq!(state.id(), Some("t-9"));
    }
}
