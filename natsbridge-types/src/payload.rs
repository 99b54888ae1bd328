//! Outgoing payload model and its text encoding
// Copyright 2025 Francisco F. Pinochet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.


use serde::Serialize;
use serde_json::{Map, Number, Value};

/// A value to be published on a subject
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Sent as-is
    Text(String),
    /// Sent as compact JSON, numeric-looking strings unquoted
    Json(Value),
}

impl Payload {
    /// Build a JSON payload from any serializable value
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        serde_json::to_value(value).map(Payload::Json)
    }

    /// Encode the payload to the text that goes on the wire
    pub fn encode(&self) -> String {
        encode(self)
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Json(Value::Null)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Text(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Text(value)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

impl From<()> for Payload {
    fn from(_: ()) -> Self {
        Payload::default()
    }
}

impl<T: Into<Payload>> From<Option<T>> for Payload {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or_default()
    }
}

macro_rules! json_scalar_payload {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Payload {
                fn from(value: $ty) -> Self {
                    Payload::Json(Value::from(value))
                }
            }
        )*
    };
}

json_scalar_payload!(i8, i16, i32, i64, u8, u16, u32, u64, f32, f64, bool);

/// Encode a payload for publishing.
///
/// Text passes through unchanged. JSON is rendered compactly, and any
/// string value that reads as a decimal number is written as a bare number
/// instead of a quoted string. Object keys are never rewritten.
pub fn encode(payload: &Payload) -> String {
    match payload {
        Payload::Text(text) => text.clone(),
        Payload::Json(value) => numeric_check(value).to_string(),
    }
}

fn numeric_check(value: &Value) -> Value {
    match value {
        Value::String(s) => numeric_value(s).unwrap_or_else(|| value.clone()),
        Value::Array(items) => Value::Array(items.iter().map(numeric_check).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(key, field)| (key.clone(), numeric_check(field)))
                .collect::<Map<String, Value>>(),
        ),
        other => other.clone(),
    }
}

fn numeric_value(s: &str) -> Option<Value> {
    let trimmed = s.trim_matches(|c: char| c.is_ascii_whitespace());
    if !is_decimal_literal(trimmed) {
        return None;
    }

    if let Ok(int) = trimmed.parse::<i64>() {
        return Some(Value::from(int));
    }
    if let Ok(uint) = trimmed.parse::<u64>() {
        return Some(Value::from(uint));
    }

    trimmed
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map(Value::Number)
}

/// `[+-]? (digits [. digits*] | . digits) ([eE] [+-]? digits)?`
fn is_decimal_literal(s: &str) -> bool {
    let bytes = s.as_bytes();
    let mut i = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        i += 1;
    }

    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let int_digits = i - int_start;

    let mut frac_digits = 0;
    if i < bytes.len() && bytes[i] == b'.' {
        i += 1;
        let frac_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        frac_digits = i - frac_start;
    }

    if int_digits == 0 && frac_digits == 0 {
        return false;
    }

    if i < bytes.len() && (bytes[i] == b'e' || bytes[i] == b'E') {
        i += 1;
        if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
            i += 1;
        }
        let exp_start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        if i == exp_start {
            return false;
        }
    }

    i == bytes.len()
}
