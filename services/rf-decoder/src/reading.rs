//! Decoded readings
//!
//! A reading is an ordered list of named fields. The first field is always
//! `model`; the rest appear in the order the decoder added them, and that
//! order is preserved all the way to the JSON output.

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Int(i64),
    UInt(u64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_i64(&self) -> i64 {
        match self {
            Self::Int(v) => *v,
            Self::UInt(v) => *v as i64,
            Self::Float(v) => *v as i64,
            Self::Text(s) => s.trim().parse().unwrap_or(0),
        }
    }

    pub fn as_f64(&self) -> f64 {
        match self {
            Self::Int(v) => *v as f64,
            Self::UInt(v) => *v as f64,
            Self::Float(v) => *v,
            Self::Text(s) => s.trim().parse().unwrap_or(0.0),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::UInt(v) => write!(f, "{}", v),
            Self::Float(v) => {
                let s = format!("{:.3}", v);
                f.write_str(s.trim_end_matches('0').trim_end_matches('.'))
            }
            Self::Text(s) => f.write_str(s),
        }
    }
}

macro_rules! impl_from_int {
    ($variant:ident, $target:ty, $($t:ty),*) => {
        $(impl From<$t> for FieldValue {
            fn from(v: $t) -> Self {
                Self::$variant(<$target>::from(v))
            }
        })*
    };
}

impl_from_int!(Int, i64, i8, i16, i32, i64);
impl_from_int!(UInt, u64, u8, u16, u32, u64);

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        Self::Float(f64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One named field of a reading
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Machine-readable key, used in JSON output
    pub key: &'static str,
    /// Optional pretty label for human-readable output
    pub label: Option<&'static str>,
    pub value: FieldValue,
    /// printf-style presentation hint, e.g. `"%.1f C"`
    pub format: Option<&'static str>,
}

impl Field {
    /// Label if one was given, else the key
    pub fn display_name(&self) -> &'static str {
        self.label.unwrap_or(self.key)
    }

    /// Value rendered through its presentation hint
    pub fn render(&self) -> String {
        match self.format {
            Some(hint) => render_hint(hint, &self.value),
            None => self.value.to_string(),
        }
    }
}

/// A decoded device reading
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    fields: Vec<Field>,
}

impl Reading {
    pub const MODEL_KEY: &'static str = "model";

    /// Start a reading for the given device model
    pub fn new(model: impl Into<String>) -> Self {
        let mut reading = Self {
            fields: Vec::with_capacity(12),
        };
        reading.push(Self::MODEL_KEY, "", model.into());
        reading
    }

    pub fn model(&self) -> &str {
        self.fields
            .first()
            .and_then(|f| f.value.as_str())
            .unwrap_or_default()
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.key == key).map(|f| &f.value)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Append a field; an empty label means "use the key"
    pub fn push(&mut self, key: &'static str, label: &'static str, value: impl Into<FieldValue>) {
        self.push_field(key, label, None, value.into());
    }

    /// Append a field with a presentation hint
    pub fn push_fmt(
        &mut self,
        key: &'static str,
        label: &'static str,
        format: &'static str,
        value: impl Into<FieldValue>,
    ) {
        self.push_field(key, label, Some(format), value.into());
    }

    /// Builder form of [`Reading::push`]
    pub fn with(mut self, key: &'static str, label: &'static str, value: impl Into<FieldValue>) -> Self {
        self.push(key, label, value);
        self
    }

    /// Builder form of [`Reading::push_fmt`]
    pub fn with_fmt(
        mut self,
        key: &'static str,
        label: &'static str,
        format: &'static str,
        value: impl Into<FieldValue>,
    ) -> Self {
        self.push_fmt(key, label, format, value);
        self
    }

    /// Append a field only when `cond` holds
    pub fn with_if(
        self,
        cond: bool,
        key: &'static str,
        label: &'static str,
        value: impl Into<FieldValue>,
    ) -> Self {
        if cond {
            self.with(key, label, value)
        } else {
            self
        }
    }

    fn push_field(
        &mut self,
        key: &'static str,
        label: &'static str,
        format: Option<&'static str>,
        value: FieldValue,
    ) {
        self.fields.push(Field {
            key,
            label: (!label.is_empty()).then_some(label),
            value,
            format,
        });
    }
}

impl Serialize for Reading {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for field in &self.fields {
            map.serialize_entry(field.key, &field.value)?;
        }
        map.end()
    }
}

/// Render a value through a printf-style hint.
///
/// Supports one conversion of `d i u x X f s` with `0 - #` flags, width and
/// precision, surrounded by literal text. `%%` is a literal percent sign.
pub fn render_hint(hint: &str, value: &FieldValue) -> String {
    let mut out = String::with_capacity(hint.len() + 8);
    let mut chars = hint.chars().peekable();
    let mut converted = false;

    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        if converted {
            out.push(c);
            continue;
        }

        let mut spec = Conversion::default();
        while let Some(&flag) = chars.peek() {
            match flag {
                '0' => spec.zero = true,
                '-' => spec.left = true,
                '#' => spec.alt = true,
                '+' | ' ' => {}
                _ => break,
            }
            chars.next();
        }
        spec.width = take_number(&mut chars);
        if chars.peek() == Some(&'.') {
            chars.next();
            spec.precision = Some(take_number(&mut chars));
        }
        while matches!(chars.peek(), Some('l' | 'h' | 'z')) {
            chars.next();
        }

        match chars.next() {
            Some(conv) => out.push_str(&spec.apply(conv, value)),
            None => out.push('%'),
        }
        converted = true;
    }

    out
}

fn take_number(chars: &mut Peekable<Chars<'_>>) -> usize {
    let mut n = 0usize;
    while let Some(d) = chars.peek().and_then(|c| c.to_digit(10)) {
        n = n * 10 + d as usize;
        chars.next();
    }
    n
}

#[derive(Debug, Default)]
struct Conversion {
    zero: bool,
    left: bool,
    alt: bool,
    width: usize,
    precision: Option<usize>,
}

impl Conversion {
    fn apply(&self, conv: char, value: &FieldValue) -> String {
        match conv {
            'd' | 'i' | 'u' => self.pad(value.as_i64().to_string(), true),
            'x' => self.pad(self.hex(format!("{:x}", value.as_i64() as u64)), true),
            'X' => self.pad(self.hex(format!("{:X}", value.as_i64() as u64)), true),
            'f' | 'F' => {
                let precision = self.precision.unwrap_or(6);
                self.pad(format!("{:.*}", precision, value.as_f64()), true)
            }
            's' => {
                let mut s = value.to_string();
                if let Some(max) = self.precision {
                    s = s.chars().take(max).collect();
                }
                self.pad(s, false)
            }
            other => format!("%{}", other),
        }
    }

    fn hex(&self, digits: String) -> String {
        if self.alt {
            format!("0x{}", digits)
        } else {
            digits
        }
    }

    fn pad(&self, body: String, numeric: bool) -> String {
        let len = body.chars().count();
        if len >= self.width {
            return body;
        }
        let fill = self.width - len;
        if self.left {
            return body + &" ".repeat(fill);
        }
        if self.zero && numeric {
            // zeros go after the sign or radix prefix
            let split = if body.starts_with("0x") || body.starts_with("0X") {
                2
            } else if body.starts_with('-') {
                1
            } else {
                0
            };
            let (prefix, digits) = body.split_at(split);
            return format!("{}{}{}", prefix, "0".repeat(fill), digits);
        }
        " ".repeat(fill) + &body
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_is_first_field() {
        let reading = Reading::new("Honeywell CM921")
            .with("id", "", 42u32)
            .with_fmt("temperature_C", "Temperature", "%.1f C", 21.5);

        assert_eq!(reading.model(), "Honeywell CM921");
        assert_eq!(reading.fields()[0].key, "model");
        assert_eq!(reading.len(), 3);
        assert_eq!(reading.get("id"), Some(&FieldValue::UInt(42)));
        assert_eq!(reading.fields()[2].display_name(), "Temperature");
        assert_eq!(reading.fields()[1].display_name(), "id");
    }

    #[test]
    fn test_serialize_preserves_order() {
        let reading = Reading::new("Calibeur-RF104")
            .with("id", "ID", 1)
            .with("temperature_C", "", 21.5)
            .with("humidity", "", 45)
            .with("mic", "", "PARITY");

        let json = serde_json::to_string(&reading).unwrap();
        assert_eq!(
            json,
            r#"{"model":"Calibeur-RF104","id":1,"temperature_C":21.5,"humidity":45,"mic":"PARITY"}"#
        );
    }

    #[test]
    fn test_with_if() {
        let reading = Reading::new("x")
            .with_if(false, "delay", "", 1)
            .with_if(true, "battery_ok", "", 0);
        assert!(!reading.contains("delay"));
        assert!(reading.contains("battery_ok"));
    }

    #[test]
    fn test_render_hint() {
        let v = FieldValue::Float(21.456);
        assert_eq!(render_hint("%.1f C", &v), "21.5 C");
        assert_eq!(render_hint("%.02f %%", &FieldValue::Float(25.0)), "25.00 %");
        assert_eq!(render_hint("%04x", &FieldValue::UInt(0x2309)), "2309");
        assert_eq!(render_hint("%04x", &FieldValue::UInt(0x8)), "0008");
        assert_eq!(render_hint("%06d", &FieldValue::Int(-42)), "-00042");
        assert_eq!(render_hint("%#04x", &FieldValue::UInt(0x5)), "0x05");
        assert_eq!(render_hint("%3s|", &FieldValue::from("ab")), " ab|");
        assert_eq!(render_hint("%-4d|", &FieldValue::Int(7)), "7   |");
        assert_eq!(render_hint("%d W", &FieldValue::Float(12.9)), "12 W");
        assert_eq!(render_hint("no conversion", &FieldValue::Int(1)), "no conversion");
    }

    #[test]
    fn test_field_render_without_hint() {
        let reading = Reading::new("x").with("rain_mm", "", 79.00000000000001);
        assert_eq!(reading.fields()[1].render(), "79");
        assert_eq!(FieldValue::Float(325.11).to_string(), "325.11");
    }
}
