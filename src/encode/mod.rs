//! Record to attribute-map encoding.
//!
//! Every record type carries a static descriptor table ([`Projectable::FIELDS`]) naming the
//! attribute each field projects to. Only fields with an attribute name that are not marked
//! excluded are emitted. [`Encode`] defaults to that structural projection; a type overrides
//! `encode` to splice computed or renamed keys into the default map.

pub mod attr;
pub mod value;

pub use attr::{block, blocks, flags, one_of, pairs, ToAttribute};
pub use value::{AttrValue, AttributeMap};

use crate::error::EncodingError;

pub type Projector<T> = fn(&T) -> Result<Option<AttrValue>, EncodingError>;

/// Descriptor for one field of a record type.
pub struct Field<T> {
    pub name: &'static str,
    pub attribute: Option<&'static str>,
    pub excluded: bool,
    project: Option<Projector<T>>,
}

impl<T> Field<T> {
    /// Field exposed under `attribute`.
    pub const fn attr(name: &'static str, attribute: &'static str, project: Projector<T>) -> Self {
        Field {
            name,
            attribute: Some(attribute),
            excluded: false,
            project: Some(project),
        }
    }

    /// Field that has an attribute name but is explicitly excluded from the default projection.
    pub const fn excluded(name: &'static str, attribute: &'static str) -> Self {
        Field {
            name,
            attribute: Some(attribute),
            excluded: true,
            project: None,
        }
    }

    /// Field with no attribute metadata; never emitted by the default projection.
    pub const fn internal(name: &'static str) -> Self {
        Field {
            name,
            attribute: None,
            excluded: false,
            project: None,
        }
    }

    fn exposed(&self) -> Option<(&'static str, Projector<T>)> {
        if self.excluded {
            return None;
        }
        Some((self.attribute?, self.project?))
    }
}

pub trait Projectable: Sized + 'static {
    const RECORD: &'static str;
    const FIELDS: &'static [Field<Self>];
}

/// Structural projection driven by the descriptor table.
pub fn encode_default<T: Projectable>(record: &T) -> Result<AttributeMap, EncodingError> {
    let mut map = AttributeMap::new();
    for field in T::FIELDS {
        let Some((attribute, project)) = field.exposed() else {
            continue;
        };
        if let Some(value) = project(record).map_err(|e| e.in_field(T::RECORD, field.name))? {
            map.insert(attribute.to_string(), value);
        }
    }
    Ok(map)
}

pub trait Encode: Projectable {
    fn encode(&self) -> Result<AttributeMap, EncodingError> {
        encode_default(self)
    }
}

/// Encode records in order. The first failing element aborts with its index attached.
pub fn encode_slice<T: Encode>(records: &[T]) -> Result<Vec<AttributeMap>, EncodingError> {
    let mut out = Vec::with_capacity(records.len());
    for (index, record) in records.iter().enumerate() {
        let map = record.encode().map_err(|e| EncodingError::Element {
            index,
            source: Box::new(e),
        })?;
        out.push(map);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct Owner {
        id: String,
        kind: String,
    }

    impl Projectable for Owner {
        const RECORD: &'static str = "Owner";
        const FIELDS: &'static [Field<Self>] = &[
            Field::attr("id", "id", |o| o.id.to_attribute()),
            Field::attr("kind", "type", |o| o.kind.to_attribute()),
        ];
    }

    impl Encode for Owner {}

    struct Widget {
        id: String,
        name: String,
        secret: String,
        cache_key: String,
        weight: u64,
        owner: Option<Owner>,
        labels: HashMap<String, String>,
    }

    impl Projectable for Widget {
        const RECORD: &'static str = "Widget";
        const FIELDS: &'static [Field<Self>] = &[
            Field::attr("id", "id", |w| w.id.to_attribute()),
            Field::attr("name", "name", |w| w.name.to_attribute()),
            Field::excluded("secret", "secret"),
            Field::internal("cache_key"),
            Field::attr("weight", "weight", |w| w.weight.to_attribute()),
            Field::attr("owner", "owner", |w| block(&w.owner)),
            Field::attr("labels", "labels", |w| pairs(&w.labels)),
        ];
    }

    impl Encode for Widget {}

    struct Named {
        name: String,
    }

    impl Projectable for Named {
        const RECORD: &'static str = "Named";
        const FIELDS: &'static [Field<Self>] =
            &[Field::attr("name", "name", |n| n.name.to_attribute())];
    }

    impl Encode for Named {
        fn encode(&self) -> Result<AttributeMap, EncodingError> {
            let mut map = encode_default(self)?;
            let slug = self.name.to_lowercase().replace(' ', "-");
            map.insert("slug".into(), AttrValue::String(slug));
            Ok(map)
        }
    }

    fn widget() -> Widget {
        Widget {
            id: "w1".into(),
            name: "pump".into(),
            secret: "s3cret".into(),
            cache_key: "k".into(),
            weight: 12,
            owner: Some(Owner {
                id: "t1".into(),
                kind: "team".into(),
            }),
            labels: [("b", "2"), ("a", "1"), ("c", "3")]
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    #[test]
    fn default_projection_is_an_allow_list() {
        let map = widget().encode().unwrap();
        let keys: Vec<&str> = map.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["id", "labels", "name", "owner", "weight"]);
        assert!(!map.contains_key("secret"));
        assert!(!map.contains_key("cache_key"));
    }

    #[test]
    fn encoding_is_deterministic() {
        let w = widget();
        let first = serde_json::to_string(&w.encode().unwrap()).unwrap();
        let second = serde_json::to_string(&w.encode().unwrap()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn present_relation_is_a_one_element_list() {
        let map = widget().encode().unwrap();
        let owner = map["owner"].as_list().unwrap();
        assert_eq!(owner.len(), 1);
        let inner = owner[0].as_map().unwrap();
        assert_eq!(inner.len(), 2);
        assert_eq!(inner["id"], AttrValue::String("t1".into()));
        assert_eq!(inner["type"], AttrValue::String("team".into()));
    }

    #[test]
    fn absent_relation_omits_the_key() {
        let mut w = widget();
        w.owner = None;
        let map = w.encode().unwrap();
        assert!(!map.contains_key("owner"));
    }

    #[test]
    fn projection_error_names_record_and_field() {
        let mut w = widget();
        w.weight = u64::MAX;
        let err = w.encode().unwrap_err();
        assert!(err.to_string().starts_with("Widget.weight:"));
    }

    #[test]
    fn custom_encode_composes_over_default() {
        let map = Named {
            name: "Core Platform".into(),
        }
        .encode()
        .unwrap();
        assert_eq!(map["name"], AttrValue::String("Core Platform".into()));
        assert_eq!(map["slug"], AttrValue::String("core-platform".into()));
    }

    #[test]
    fn encode_slice_of_nothing_is_empty() {
        let out = encode_slice::<Named>(&[]).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn encode_slice_reports_failing_index() {
        let mut bad = widget();
        bad.weight = u64::MAX;
        let err = encode_slice(&[widget(), bad]).unwrap_err();
        assert!(matches!(err, EncodingError::Element { index: 1, .. }));
    }
}
