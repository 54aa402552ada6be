//! Input checks shared by the people and messages handlers.
//!
//! Everything here is pure: no storage access, no request state.

use crate::error::{ApiError, ApiResult};
use crate::models::PersonInput;
use regex::Regex;
use serde_json::{Map, Value};
use std::iter::Peekable;
use std::str::Chars;
use std::sync::OnceLock;

const USERNAME_PATTERN: &str = r"^[A-Za-z0-9_]{4,16}$";

pub const PERSON_FIELDS: [&str; 3] = ["firstname", "lastname", "phone"];

fn username_regex() -> &'static Regex {
    static USERNAME: OnceLock<Regex> = OnceLock::new();
    USERNAME.get_or_init(|| Regex::new(USERNAME_PATTERN).expect("username pattern compiles"))
}

/// 4 to 16 ASCII letters, digits or underscores.
pub fn is_valid_username(username: &str) -> bool {
    username_regex().is_match(username)
}

/// Message bodies only need to be strings; empty and whitespace-only text is
/// kept as content.
pub fn is_valid_message_content(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(_)))
}

/// True when every person field is present and not blank after trimming.
pub fn validate_person(data: &Map<String, Value>) -> bool {
    PERSON_FIELDS.iter().all(|field| {
        text_field(data, field)
            .map(|value| !value.trim().is_empty())
            .unwrap_or(false)
    })
}

/// Builds the writable person fields from a (sanitized) body.
pub fn person_input(data: &Map<String, Value>) -> ApiResult<PersonInput> {
    if !validate_person(data) {
        return Err(ApiError::validation(
            "Missing required fields(firstname, lastname, phone)",
        ));
    }

    let field = |name: &str| text_field(data, name).unwrap_or_default();
    Ok(PersonInput {
        firstname: field("firstname"),
        lastname: field("lastname"),
        phone: field("phone"),
    })
}

/// Parses the `id` query parameter of the people resource.
pub fn parse_person_id(raw: &str) -> ApiResult<i64> {
    sanitize_text(raw)
        .trim()
        .parse::<i64>()
        .map_err(|_| ApiError::validation("Invalid ID Format"))
}

// Numbers are accepted for text fields and stored as written.
fn text_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Strips markup from and HTML-escapes every string inside `value`,
/// descending into arrays and objects.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_text(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => Value::Object(sanitize_map(map)),
        other => other,
    }
}

pub fn sanitize_map(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter().map(|(k, v)| (k, sanitize(v))).collect()
}

pub fn sanitize_text(input: &str) -> String {
    escape_html(&strip_tags(input))
}

/// Removes `<...>` tags. A `<` followed by whitespace or at the end of input
/// is plain text; an unterminated tag runs to the end of the string.
pub fn strip_tags(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '<' {
            out.push(c);
            continue;
        }
        match chars.peek() {
            Some(next) if !next.is_whitespace() => skip_tag(&mut chars),
            _ => out.push(c),
        }
    }

    out
}

fn skip_tag(chars: &mut Peekable<Chars<'_>>) {
    let mut quote: Option<char> = None;
    for c in chars.by_ref() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None => match c {
                '"' | '\'' => quote = Some(c),
                '>' => return,
                _ => {}
            },
        }
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(m) => m,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_username_length_bounds() {
        assert!(!is_valid_username("abc"));
        assert!(is_valid_username("abcd"));
        assert!(is_valid_username("abcdefghijklmnop"));
        assert!(!is_valid_username("abcdefghijklmnopq"));
        assert!(!is_valid_username(""));
    }

    #[test]
    fn test_username_charset() {
        assert!(is_valid_username("alice_01"));
        assert!(is_valid_username("____"));
        assert!(!is_valid_username("alice-01"));
        assert!(!is_valid_username("alice 01"));
        assert!(!is_valid_username("älice01"));
        assert!(!is_valid_username("alice1\n"));
    }

    #[test]
    fn test_username_matches_char_rule() {
        let candidates = ["bob222", "a_b_c", "x", "toolongusername_17", "semi;colon", "UPPER_case9"];
        for u in candidates {
            let expected = (4..=16).contains(&u.len())
                && u.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
            assert_eq!(is_valid_username(u), expected, "{u}");
        }
    }

    #[test]
    fn test_message_content_type_only() {
        assert!(is_valid_message_content(Some(&json!(""))));
        assert!(is_valid_message_content(Some(&json!("  hi  "))));
        assert!(!is_valid_message_content(Some(&json!(42))));
        assert!(!is_valid_message_content(Some(&Value::Null)));
        assert!(!is_valid_message_content(None));
    }

    #[test]
    fn test_validate_person() {
        let ok = map(json!({"firstname": "Ann", "lastname": "Lee", "phone": "555-1234"}));
        assert!(validate_person(&ok));

        let blank = map(json!({"firstname": "  ", "lastname": "Lee", "phone": "555"}));
        assert!(!validate_person(&blank));

        let missing = map(json!({"firstname": "Ann", "lastname": "Lee"}));
        assert!(!validate_person(&missing));

        let wrong_type = map(json!({"firstname": "Ann", "lastname": ["Lee"], "phone": "555"}));
        assert!(!validate_person(&wrong_type));
    }

    #[test]
    fn test_person_input_accepts_numeric_phone() {
        let data = map(json!({"firstname": "Ann", "lastname": "Lee", "phone": 5551234}));
        let input = person_input(&data).unwrap();
        assert_eq!(input.phone, "5551234");
    }

    #[test]
    fn test_person_input_keeps_surrounding_whitespace() {
        let data = map(json!({"firstname": " Ann ", "lastname": "Lee", "phone": "1"}));
        assert_eq!(person_input(&data).unwrap().firstname, " Ann ");
    }

    #[test]
    fn test_parse_person_id() {
        assert_eq!(parse_person_id("42").unwrap(), 42);
        assert_eq!(parse_person_id(" 7 ").unwrap(), 7);
        assert!(matches!(parse_person_id("abc"), Err(ApiError::Validation(_))));
        assert!(parse_person_id("").is_err());
        assert!(parse_person_id("1.5").is_err());
    }

    #[test]
    fn test_strip_tags() {
        assert_eq!(strip_tags("<b>Ann</b>"), "Ann");
        assert_eq!(strip_tags("a < b"), "a < b");
        assert_eq!(strip_tags("<a href=\"x>y\">link</a>"), "link");
        assert_eq!(strip_tags("before<unclosed tag"), "before");
        assert_eq!(strip_tags("trailing<"), "trailing<");
    }

    #[test]
    fn test_sanitize_text() {
        assert_eq!(sanitize_text("Tom & Jerry"), "Tom &amp; Jerry");
        assert_eq!(sanitize_text("O'Brien"), "O&#039;Brien");
        assert_eq!(sanitize_text("a < b"), "a &lt; b");
        assert_eq!(
            sanitize_text("<script>alert(\"x\")</script>Bob"),
            "alert(&quot;x&quot;)Bob"
        );
    }

    #[test]
    fn test_sanitize_nested_values() {
        let value = json!({
            "name": "<i>Ann</i>",
            "tags": ["<b>x</b>", 3],
            "inner": {"note": "1 > 0"},
            "flag": true
        });
        let clean = sanitize(value);
        assert_eq!(
            clean,
            json!({
                "name": "Ann",
                "tags": ["x", 3],
                "inner": {"note": "1 &gt; 0"},
                "flag": true
            })
        );
    }
}
