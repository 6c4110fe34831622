use std::{borrow::Cow, sync::Arc};

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone};
use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::{error::Result, fragment::Fragment, quote};

pub type Map = IndexMap<SmolStr, Value>;

#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    BigInt(i128),
    Float(f64),
    Str(SmolStr),
    Bytes(Arc<[u8]>),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Json(serde_json::Value),
    List(Vec<Value>),
    Map(Map),
    Fragment(Box<Fragment>),
    Opaque(&'static str),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) | Value::UInt(_) | Value::Float(_) => "number",
            Value::BigInt(_) => "bigint",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Date(_) | Value::DateTime(_) => "date",
            Value::Json(_) => "json",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Fragment(_) => "fragment",
            Value::Opaque(name) => *name,
        }
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn bytes<B: Into<Arc<[u8]>>>(bytes: B) -> Self {
        Value::Bytes(bytes.into())
    }

    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Value::List(items.into_iter().map(Into::into).collect())
    }

    pub fn map<I, K, T>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, T)>,
        K: Into<SmolStr>,
        T: Into<Value>,
    {
        Value::Map(
            entries
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        use serde_json::Value as Json;
        Ok(match self {
            Value::Null | Value::Opaque(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(i) => Json::from(*i),
            Value::UInt(u) => Json::from(*u),
            Value::BigInt(i) => Json::from(quote::checked_i64(*i)?),
            Value::Float(f) => Json::from(*f),
            Value::Str(s) => Json::String(s.to_string()),
            Value::Bytes(b) => Json::String(hex::encode(b)),
            Value::Date(d) => Json::String(quote::format_date(&d.and_time(Default::default()))),
            Value::DateTime(dt) => Json::String(quote::format_date(dt)),
            Value::Json(json) => json.clone(),
            Value::List(items) => Json::Array(
                items
                    .iter()
                    .map(Value::to_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Map(map) => {
                let mut object = serde_json::Map::with_capacity(map.len());
                for (key, value) in map {
                    object.insert(key.to_string(), value.to_json()?);
                }
                Json::Object(object)
            }
            Value::Fragment(fragment) => Json::String(fragment.to_sql()?),
        })
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}

macro_rules! from_int {
    ($variant:ident: $($ty:ty),+) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value.into())
                }
            }
        )+
    };
}

from_int!(Int: i8, i16, i32, i64, u8, u16, u32);
from_int!(UInt: u64);
from_int!(BigInt: i128);
from_int!(Float: f32, f64);

impl From<usize> for Value {
    fn from(value: usize) -> Self {
        Value::UInt(value as u64)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::Str(value.into())
    }
}

impl From<&String> for Value {
    #[inline]
    fn from(value: &String) -> Self {
        Value::Str(value.into())
    }
}

impl From<String> for Value {
    #[inline]
    fn from(value: String) -> Self {
        Value::Str(value.into())
    }
}

impl From<SmolStr> for Value {
    #[inline]
    fn from(value: SmolStr) -> Self {
        Value::Str(value)
    }
}

impl<'a> From<Cow<'a, str>> for Value {
    fn from(value: Cow<'a, str>) -> Self {
        Value::Str(value.into())
    }
}

impl From<&[u8]> for Value {
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.into())
    }
}

impl From<Vec<u8>> for Value {
    fn from(value: Vec<u8>) -> Self {
        Value::Bytes(value.into())
    }
}

impl From<NaiveDate> for Value {
    fn from(value: NaiveDate) -> Self {
        Value::Date(value)
    }
}

impl From<NaiveDateTime> for Value {
    fn from(value: NaiveDateTime) -> Self {
        Value::DateTime(value)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for Value {
    fn from(value: DateTime<Tz>) -> Self {
        Value::DateTime(value.naive_utc())
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Value::Json(value)
    }
}

impl From<Map> for Value {
    fn from(value: Map) -> Self {
        Value::Map(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(value: Vec<Value>) -> Self {
        Value::List(value)
    }
}

impl From<Vec<&str>> for Value {
    fn from(value: Vec<&str>) -> Self {
        Value::list(value)
    }
}

impl From<Vec<String>> for Value {
    fn from(value: Vec<String>) -> Self {
        Value::list(value)
    }
}

impl From<Vec<i64>> for Value {
    fn from(value: Vec<i64>) -> Self {
        Value::list(value)
    }
}

impl From<Vec<i32>> for Value {
    fn from(value: Vec<i32>) -> Self {
        Value::list(value)
    }
}

impl<const N: usize> From<[&str; N]> for Value {
    fn from(value: [&str; N]) -> Self {
        Value::list(value)
    }
}

impl<const N: usize> From<[i32; N]> for Value {
    fn from(value: [i32; N]) -> Self {
        Value::list(value)
    }
}

impl<const N: usize> From<[i64; N]> for Value {
    fn from(value: [i64; N]) -> Self {
        Value::list(value)
    }
}

impl<const N: usize> From<[Value; N]> for Value {
    fn from(value: [Value; N]) -> Self {
        Value::List(value.into())
    }
}

impl From<Fragment> for Value {
    fn from(value: Fragment) -> Self {
        Value::Fragment(Box::new(value))
    }
}

#[cfg(feature = "time")]
impl From<time::PrimitiveDateTime> for Value {
    fn from(value: time::PrimitiveDateTime) -> Self {
        let date = NaiveDate::from_ymd_opt(
            value.year(),
            u8::from(value.month()) as u32,
            value.day() as u32,
        );
        let time = chrono::NaiveTime::from_hms_nano_opt(
            value.hour() as u32,
            value.minute() as u32,
            value.second() as u32,
            value.nanosecond(),
        );
        match (date, time) {
            (Some(date), Some(time)) => Value::DateTime(date.and_time(time)),
            _ => Value::Opaque("time::PrimitiveDateTime"),
        }
    }
}

#[cfg(feature = "uuid")]
impl From<uuid::Uuid> for Value {
    fn from(value: uuid::Uuid) -> Self {
        let mut buf = uuid::Uuid::encode_buffer();
        Value::Str(SmolStr::new(value.hyphenated().encode_lower(&mut buf)))
    }
}

/// Build the parameter list of a template.
///
/// ```ignore
/// let frag = tagsql::mysql(["select * from t where id='", "'"], tagsql::params![5])?;
/// ```
#[macro_export]
macro_rules! params {
    () => {
        ::std::vec::Vec::<$crate::Value>::new()
    };
    ( $($value:expr),+ $(,)? ) => {
        ::std::vec![$( $crate::Value::from($value) ),+]
    };
}

#[macro_export]
macro_rules! map {
    () => {
        $crate::Value::Map($crate::Map::new())
    };
    ( $($key:expr => $value:expr),+ $(,)? ) => {{
        let mut map = $crate::Map::new();
        $( map.insert($crate::SmolStr::from($key), $crate::Value::from($value)); )+
        $crate::Value::Map(map)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_conversions() {
        assert!(matches!(Value::from(5), Value::Int(5)));
        assert!(matches!(Value::from(u64::MAX), Value::UInt(u64::MAX)));
        assert!(matches!(Value::from(None::<i32>), Value::Null));
        assert!(matches!(Value::from(Some("x")), Value::Str(_)));
        assert!(matches!(Value::from(vec![1u8, 2]), Value::Bytes(_)));
        assert_eq!("list", Value::from([1, 2, 3]).type_name());
    }

    #[test]
    fn test_map_macro_keeps_order() {
        let value = crate::map! { "b" => 1, "a" => "x" };
        let Value::Map(map) = value else {
            panic!("expected a map");
        };
        let keys: Vec<&str> = map.keys().map(|k| k.as_str()).collect();
        assert_eq!(vec!["b", "a"], keys);
    }

    #[test]
    fn test_to_json() {
        let value = crate::map! {
            "id" => 1,
            "blob" => vec![0xffu8],
            "tags" => ["a", "b"],
        };
        let json = value.to_json().unwrap();
        assert_eq!(r#"{"id":1,"blob":"ff","tags":["a","b"]}"#, json.to_string());
    }
}
