//! Projection of individual field values into attribute values.
//!
//! `Ok(None)` from any projection means "omit the attribute"; it is how optional fields and
//! absent relations stay out of the map instead of showing up as empty values.

use crate::encode::{encode_slice, AttrValue, AttributeMap, Encode};
use crate::error::EncodingError;
use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;

pub trait ToAttribute {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError>;
}

impl<T: ToAttribute + ?Sized> ToAttribute for &T {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        (**self).to_attribute()
    }
}

impl ToAttribute for str {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        Ok(Some(AttrValue::String(self.to_string())))
    }
}

impl ToAttribute for String {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        self.as_str().to_attribute()
    }
}

impl ToAttribute for bool {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        Ok(Some(AttrValue::Bool(*self)))
    }
}

macro_rules! int_attribute {
    ($($t:ty),*) => {
        $(impl ToAttribute for $t {
            fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
                Ok(Some(AttrValue::Int(i64::from(*self))))
            }
        })*
    };
}

int_attribute!(i8, i16, i32, i64, u8, u16, u32);

impl ToAttribute for u64 {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        i64::try_from(*self)
            .map(|n| Some(AttrValue::Int(n)))
            .map_err(|_| {
                EncodingError::Value(format!("{self} does not fit a signed 64-bit attribute"))
            })
    }
}

impl ToAttribute for f64 {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        if !self.is_finite() {
            return Err(EncodingError::Value(format!("non-finite number {self}")));
        }
        Ok(Some(AttrValue::Float(*self)))
    }
}

impl<T: ToAttribute> ToAttribute for Option<T> {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        match self {
            Some(v) => v.to_attribute(),
            None => Ok(None),
        }
    }
}

impl<T: ToAttribute> ToAttribute for Vec<T> {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        self.as_slice().to_attribute()
    }
}

impl<T: ToAttribute> ToAttribute for [T] {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        let mut out = Vec::with_capacity(self.len());
        for (index, item) in self.iter().enumerate() {
            let value = item
                .to_attribute()
                .map_err(|e| EncodingError::Element {
                    index,
                    source: Box::new(e),
                })?
                .ok_or_else(|| EncodingError::Element {
                    index,
                    source: Box::new(EncodingError::Value("absent element in sequence".into())),
                })?;
            out.push(value);
        }
        Ok(Some(AttrValue::List(out)))
    }
}

impl ToAttribute for DateTime<Utc> {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        Ok(Some(AttrValue::String(
            self.to_rfc3339_opts(SecondsFormat::Secs, true),
        )))
    }
}

/// Arbitrary JSON: null is omitted at the top level and inside objects, rejected inside arrays.
impl ToAttribute for Value {
    fn to_attribute(&self) -> Result<Option<AttrValue>, EncodingError> {
        Ok(match self {
            Value::Null => None,
            Value::Bool(b) => Some(AttrValue::Bool(*b)),
            Value::String(s) => Some(AttrValue::String(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(AttrValue::Int(i))
                } else if let Some(u) = n.as_u64() {
                    return u.to_attribute();
                } else if let Some(f) = n.as_f64() {
                    return f.to_attribute();
                } else {
                    return Err(EncodingError::Value(format!("unrepresentable number {n}")));
                }
            }
            Value::Array(items) => return items.to_attribute(),
            Value::Object(obj) => {
                let mut map = AttributeMap::new();
                for (k, v) in obj {
                    if let Some(value) = v.to_attribute()? {
                        map.insert(k.clone(), value);
                    }
                }
                Some(AttrValue::Map(map))
            }
        })
    }
}

/// Optional nested relation as a list capped at one element; absent relation omits the key.
pub fn block<T: Encode>(value: &Option<T>) -> Result<Option<AttrValue>, EncodingError> {
    match value {
        Some(v) => Ok(Some(AttrValue::List(vec![AttrValue::Map(v.encode()?)]))),
        None => Ok(None),
    }
}

/// Sequence of nested records, order preserved.
pub fn blocks<T: Encode>(values: &[T]) -> Result<Option<AttrValue>, EncodingError> {
    Ok(Some(encode_slice(values)?.into()))
}

/// Key/value map as `[{key, value}]`, sorted by key.
pub fn pairs<'a, K, V, I>(entries: I) -> Result<Option<AttrValue>, EncodingError>
where
    K: AsRef<str> + 'a,
    V: ToAttribute + 'a,
    I: IntoIterator<Item = (&'a K, &'a V)>,
{
    let mut entries: Vec<(&str, &V)> = entries.into_iter().map(|(k, v)| (k.as_ref(), v)).collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let mut out = Vec::with_capacity(entries.len());
    for (key, value) in entries {
        let mut pair = AttributeMap::new();
        pair.insert("key".into(), AttrValue::String(key.to_string()));
        if let Some(v) = value.to_attribute().map_err(|e| e.in_field("pair", "value"))? {
            pair.insert("value".into(), v);
        }
        out.push(AttrValue::Map(pair));
    }
    Ok(Some(AttrValue::List(out)))
}

/// Set of boolean flags as the sorted list of names that are on.
pub fn flags<'a, K, I>(entries: I) -> Result<Option<AttrValue>, EncodingError>
where
    K: AsRef<str> + 'a,
    I: IntoIterator<Item = (&'a K, &'a bool)>,
{
    let mut on: Vec<&str> = entries
        .into_iter()
        .filter(|(_, enabled)| **enabled)
        .map(|(k, _)| k.as_ref())
        .collect();
    on.sort_unstable();
    Ok(Some(AttrValue::List(
        on.into_iter().map(|k| AttrValue::String(k.to_string())).collect(),
    )))
}

/// First label whose flag is set, as a single enumerated string. Omitted when none is set.
pub fn one_of(choices: &[(bool, &'static str)]) -> Option<AttrValue> {
    choices
        .iter()
        .find(|(set, _)| *set)
        .map(|(_, label)| AttrValue::String((*label).to_string()))
}
