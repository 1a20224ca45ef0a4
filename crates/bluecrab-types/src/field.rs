use std::fmt;

use serde::{Deserialize, Serialize};

/// One `key=value` pair parsed from a block payload.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    pub key: String,
    pub value: String,
}

impl Field {
    /// Create a new field pair.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.key, self.value)
    }
}

/// Parse a payload into field pairs.
///
/// The payload text convention is `key=value` segments separated by `;`,
/// for example `temp=20;hum=55`. Keys and values are trimmed. Segments
/// without a `=`, or with an empty key, are skipped. A payload that is not
/// valid UTF-8 yields no fields; the raw bytes are still stored verbatim.
pub fn parse_fields(payload: &[u8]) -> Vec<Field> {
    let Ok(text) = std::str::from_utf8(payload) else {
        return Vec::new();
    };
    let mut fields = Vec::new();
    for segment in text.split(';') {
        let Some((key, value)) = segment.split_once('=') else {
            continue;
        };
        let key = key.trim();
        if key.is_empty() {
            continue;
        }
        fields.push(Field::new(key, value.trim()));
    }
    fields
}

/// Render field pairs back into payload bytes.
///
/// Inverse of [`parse_fields`] for payloads that are purely well-formed
/// pairs: `key=value` joined by `;`.
pub fn join_fields(fields: &[Field]) -> Vec<u8> {
    let mut out = String::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(';');
        }
        out.push_str(&field.key);
        out.push('=');
        out.push_str(&field.value);
    }
    out.into_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_two_pairs() {
        let fields = parse_fields(b"temp=20;hum=55");
        assert_eq!(
            fields,
            vec![Field::new("temp", "20"), Field::new("hum", "55")]
        );
    }

    #[test]
    fn trims_whitespace() {
        let fields = parse_fields(b" temp = 20 ; hum = 55 ");
        assert_eq!(
            fields,
            vec![Field::new("temp", "20"), Field::new("hum", "55")]
        );
    }

    #[test]
    fn skips_segments_without_equals() {
        let fields = parse_fields(b"temp=20;garbage;hum=55");
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1], Field::new("hum", "55"));
    }

    #[test]
    fn skips_empty_keys() {
        let fields = parse_fields(b"=20;hum=55");
        assert_eq!(fields, vec![Field::new("hum", "55")]);
    }

    #[test]
    fn allows_empty_values() {
        let fields = parse_fields(b"flag=");
        assert_eq!(fields, vec![Field::new("flag", "")]);
    }

    #[test]
    fn splits_value_at_first_equals() {
        let fields = parse_fields(b"expr=a=b");
        assert_eq!(fields, vec![Field::new("expr", "a=b")]);
    }

    #[test]
    fn non_utf8_yields_no_fields() {
        let fields = parse_fields(&[0xff, 0xfe, b'=', b'x']);
        assert!(fields.is_empty());
    }

    #[test]
    fn empty_payload_yields_no_fields() {
        assert!(parse_fields(b"").is_empty());
    }

    #[test]
    fn join_renders_pairs() {
        let fields = vec![Field::new("temp", "20"), Field::new("hum", "55")];
        assert_eq!(join_fields(&fields), b"temp=20;hum=55");
    }

    #[test]
    fn join_of_empty_list_is_empty() {
        assert!(join_fields(&[]).is_empty());
    }

    #[test]
    fn join_then_parse_recovers_pairs() {
        let fields = vec![Field::new("a", "1"), Field::new("b", ""), Field::new("c", "x y")];
        assert_eq!(parse_fields(&join_fields(&fields)), fields);
    }

    #[test]
    fn display_renders_pair() {
        assert_eq!(Field::new("temp", "20").to_string(), "temp=20");
    }
}
