// Cache keys: namespace + SHA-256 of sorted, ASCII-escaped JSON

use sha2::{Digest, Sha256};
use std::fmt::Write;

use crate::models::InferenceRequest;

pub const KEY_NAMESPACE: &str = "inference:";

pub fn fingerprint(prompt: &str, max_tokens: Option<u32>, temperature: Option<f64>) -> String {
    let canonical = canonical_form(prompt, max_tokens, temperature);
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{KEY_NAMESPACE}{digest:x}")
}

pub fn request_fingerprint(request: &InferenceRequest) -> String {
    fingerprint(request.prompt(), request.max_tokens(), request.temperature())
}

pub(crate) fn canonical_form(
    prompt: &str,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
) -> String {
    let mut out = String::with_capacity(prompt.len() + 64);
    out.push_str("{\"max_tokens\": ");
    match max_tokens {
        Some(n) => {
            let _ = write!(out, "{n}");
        }
        None => out.push_str("null"),
    }
    out.push_str(", \"prompt\": ");
    push_ascii_string(&mut out, prompt);
    out.push_str(", \"temperature\": ");
    match temperature {
        Some(t) => push_float(&mut out, t),
        None => out.push_str("null"),
    }
    out.push('}');
    out
}

fn push_ascii_string(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    let _ = write!(out, "\\u{unit:04x}");
                }
            }
        }
    }
    out.push('"');
}

// Same text Python's repr gives a float
pub(crate) fn format_float(value: f64) -> String {
    let mut out = String::new();
    push_float(&mut out, value);
    out
}

// Shortest round-trip digits; exponent form outside [1e-4, 1e16)
fn push_float(out: &mut String, value: f64) {
    if !value.is_finite() {
        out.push_str(if value.is_nan() {
            "NaN"
        } else if value > 0.0 {
            "Infinity"
        } else {
            "-Infinity"
        });
        return;
    }

    let sci = format!("{value:e}");
    let (mantissa, exponent) = match sci.split_once('e') {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (sci.as_str(), 0),
    };

    if value == 0.0 || (-4..16).contains(&exponent) {
        let plain = format!("{value}");
        out.push_str(&plain);
        if !plain.contains('.') {
            out.push_str(".0");
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        let _ = write!(out, "{mantissa}e{sign}{:02}", exponent.abs());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_input_same_key() {
        let a = fingerprint("What is artificial intelligence?", Some(50), Some(0.7));
        let b = fingerprint("What is artificial intelligence?", Some(50), Some(0.7));
        assert_eq!(a, b);
        assert!(a.starts_with(KEY_NAMESPACE));
        assert_eq!(a.len(), KEY_NAMESPACE.len() + 64);
    }

    #[test]
    fn field_order_in_transport_does_not_matter() {
        let first: crate::models::InferPayload = serde_json::from_str(
            r#"{"prompt": "hello", "max_tokens": 10, "temperature": 0.5}"#,
        )
        .unwrap();
        let second: crate::models::InferPayload = serde_json::from_str(
            r#"{"temperature": 0.5, "max_tokens": 10, "prompt": "hello"}"#,
        )
        .unwrap();

        let defaults = crate::config::RequestDefaults::default();
        let first = InferenceRequest::from_payload(first, &defaults).unwrap();
        let second = InferenceRequest::from_payload(second, &defaults).unwrap();
        assert_eq!(request_fingerprint(&first), request_fingerprint(&second));
    }

    #[test]
    fn every_parameter_contributes() {
        let base = fingerprint("hello", Some(10), Some(0.5));
        assert_ne!(base, fingerprint("hello!", Some(10), Some(0.5)));
        assert_ne!(base, fingerprint("hello", Some(11), Some(0.5)));
        assert_ne!(base, fingerprint("hello", Some(10), Some(0.6)));
        assert_ne!(base, fingerprint("hello", None, Some(0.5)));
        assert_ne!(base, fingerprint("hello", Some(10), None));
    }

    #[test]
    fn absent_fields_are_explicit_nulls() {
        assert_eq!(
            canonical_form("hi", None, None),
            r#"{"max_tokens": null, "prompt": "hi", "temperature": null}"#
        );
    }

    #[test]
    fn canonical_form_layout() {
        assert_eq!(
            canonical_form("What is artificial intelligence?", Some(50), Some(0.7)),
            r#"{"max_tokens": 50, "prompt": "What is artificial intelligence?", "temperature": 0.7}"#
        );
    }

    #[test]
    fn known_digest() {
        // sha256 of {"max_tokens": null, "prompt": "hi", "temperature": null}
        let expected = {
            let digest =
                Sha256::digest(br#"{"max_tokens": null, "prompt": "hi", "temperature": null}"#);
            format!("inference:{digest:x}")
        };
        assert_eq!(fingerprint("hi", None, None), expected);
    }

    #[test]
    fn strings_are_ascii_escaped() {
        assert_eq!(
            canonical_form("caf\u{e9} \"q\"\n\u{1F600}", Some(1), Some(1.0)),
            "{\"max_tokens\": 1, \"prompt\": \"caf\\u00e9 \\\"q\\\"\\n\\ud83d\\ude00\", \"temperature\": 1.0}"
        );
        assert_eq!(
            canonical_form("\u{1}", None, None),
            r#"{"max_tokens": null, "prompt": "\u0001", "temperature": null}"#
        );
    }

    #[test]
    fn float_formatting() {
        let render = format_float;
        assert_eq!(render(0.0), "0.0");
        assert_eq!(render(2.0), "2.0");
        assert_eq!(render(0.7), "0.7");
        assert_eq!(render(0.0001), "0.0001");
        assert_eq!(render(0.00001), "1e-05");
        assert_eq!(render(1.5e-7), "1.5e-07");
        assert_eq!(render(1e16), "1e+16");
    }
}
