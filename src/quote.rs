use std::fmt::Write;

use chrono::{NaiveDateTime, Timelike};

use crate::{
    error::{Error, Result},
    value::Value,
    writer::Serializer,
};

/// Render one value as a literal.
pub fn quote(value: &Value, no_backslash_escapes: bool, for_mssql: bool) -> Result<String> {
    if let Value::Fragment(fragment) = value {
        return fragment.to_sql();
    }
    let mut ser = Serializer::with_capacity(estimate(value));
    quote_into(&mut ser, value, no_backslash_escapes, for_mssql)?;
    ser.into_string()
}

pub(crate) fn quote_into(
    ser: &mut Serializer,
    value: &Value,
    no_backslash_escapes: bool,
    for_mssql: bool,
) -> Result<()> {
    match value {
        Value::Null => ser.push_str("NULL"),
        Value::Bool(b) => ser.push_str(match (for_mssql, *b) {
            (true, true) => "1",
            (true, false) => "0",
            (false, true) => "TRUE",
            (false, false) => "FALSE",
        }),
        Value::Int(i) => {
            let _ = write!(ser, "{i}");
        }
        Value::UInt(u) => {
            let i = checked_i64(*u as i128)?;
            let _ = write!(ser, "{i}");
        }
        Value::BigInt(i) => {
            let i = checked_i64(*i)?;
            let _ = write!(ser, "{i}");
        }
        Value::Float(f) => {
            if !f.is_finite() {
                return Err(Error::Range(f.to_string()));
            }
            let _ = write!(ser, "{f}");
        }
        Value::Str(s) => quote_str(ser, s, no_backslash_escapes),
        Value::Bytes(bytes) => quote_bytes(ser, bytes, for_mssql),
        Value::Date(d) => {
            ser.push(b'\'');
            ser.push_str(&format_date(&d.and_time(Default::default())));
            ser.push(b'\'');
        }
        Value::DateTime(dt) => {
            ser.push(b'\'');
            ser.push_str(&format_date(dt));
            ser.push(b'\'');
        }
        Value::Json(json) => {
            let text = serde_json::to_string(json)?;
            quote_str(ser, &text, no_backslash_escapes);
        }
        Value::List(_) | Value::Map(_) => {
            let text = serde_json::to_string(&value.to_json()?)?;
            quote_str(ser, &text, no_backslash_escapes);
        }
        Value::Fragment(_) | Value::Opaque(_) => return Err(Error::Stringify(value.type_name())),
    }
    Ok(())
}

pub(crate) fn checked_i64(value: i128) -> Result<i64> {
    i64::try_from(value).map_err(|_| Error::Range(value.to_string()))
}

pub(crate) fn quote_str(ser: &mut Serializer, s: &str, no_backslash_escapes: bool) {
    ser.ensure_room(s.len() + 2);
    ser.push(b'\'');
    let bytes = s.as_bytes();
    let mut last = 0;
    for (index, &byte) in bytes.iter().enumerate() {
        if byte == b'\'' || (byte == b'\\' && !no_backslash_escapes) {
            ser.extend(&bytes[last..=index]);
            ser.push(byte);
            last = index + 1;
        }
    }
    ser.extend(&bytes[last..]);
    ser.push(b'\'');
}

pub(crate) fn quote_bytes(ser: &mut Serializer, bytes: &[u8], for_mssql: bool) {
    ser.ensure_room(bytes.len() * 2 + 3);
    ser.push_str(if for_mssql { "0x" } else { "x'" });
    ser.push_str(&hex::encode(bytes));
    if !for_mssql {
        ser.push(b'\'');
    }
}

pub(crate) fn format_date(dt: &NaiveDateTime) -> String {
    let millis = dt.nanosecond() / 1_000_000 % 1000;
    let date = dt.format("%Y-%m-%d");
    if millis != 0 {
        format!("{date} {}.{millis:03}", dt.format("%H:%M:%S"))
    } else if dt.num_seconds_from_midnight() != 0 {
        format!("{date} {}", dt.format("%H:%M:%S"))
    } else {
        date.to_string()
    }
}

pub(crate) fn estimate(value: &Value) -> usize {
    match value {
        Value::Null | Value::Bool(_) => 5,
        Value::Int(_) | Value::UInt(_) => 24,
        Value::Float(f) => float_width(*f),
        Value::BigInt(_) => 40,
        Value::Date(_) | Value::DateTime(_) => 26,
        Value::Str(s) => s.len() * 2 + 3,
        Value::Bytes(b) => b.len() * 2 + 3,
        Value::Json(_) | Value::Opaque(_) => 64,
        Value::List(items) => items.iter().map(|v| estimate(v) + 2).sum::<usize>() + 2,
        Value::Map(map) => map
            .iter()
            .map(|(k, v)| k.len() + estimate(v) + 6)
            .sum::<usize>() + 2,
        Value::Fragment(fragment) => fragment.size_hint() + 2,
    }
}

// `{f}` never switches to exponent notation, so every power of ten is a digit.
fn float_width(f: f64) -> usize {
    if f == 0.0 || !f.is_finite() {
        return 24;
    }
    f.abs().log10().abs() as usize + 24
}
