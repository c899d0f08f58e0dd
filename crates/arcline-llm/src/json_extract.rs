//! Tolerant JSON extraction for [`AnthropicClient::complete_json`]
//! (spec §4.10): models routinely wrap a JSON payload in prose or a
//! markdown fence, so a straight `serde_json::from_str` on the whole
//! response is too strict.

/// Heuristic: does the prompt already ask for JSON? Skips appending a
/// redundant instruction when the caller already wrote one.
pub fn already_asks_for_json(prompt: &str) -> bool {
    let lower = prompt.to_lowercase();
    lower.contains("json")
}

/// Scan `text` for the first balanced `{...}` or `[...]` block and try to
/// parse it. Balance is tracked over raw bytes, ignoring braces/brackets
/// that appear inside string literals, so a stray `{` in a quoted value
/// doesn't throw off the count.
pub fn extract_first_json_block(text: &str) -> Option<serde_json::Value> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{' || b == b'[')?;

    let open = bytes[start];
    let close = if open == b'{' { b'}' } else { b']' };

    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            c if c == open => depth += 1,
            c if c == close => {
                depth -= 1;
                if depth == 0 {
                    let end = start + offset + 1;
                    let candidate = &text[start..end];
                    return serde_json::from_str(candidate).ok();
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn already_asks_for_json_detects_mention() {
        assert!(already_asks_for_json("Return the result as JSON."));
        assert!(!already_asks_for_json("Return the result."));
    }

    #[test]
    fn extracts_bare_object() {
        let out = extract_first_json_block(r#"{"a": 1, "b": 2}"#).unwrap();
        assert_eq!(out, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn extracts_object_wrapped_in_prose() {
        let text = "Sure, here is the result:\n```json\n{\"verdict\": \"strategic\"}\n```\nLet me know if you need anything else.";
        let out = extract_first_json_block(text).unwrap();
        assert_eq!(out, json!({"verdict": "strategic"}));
    }

    #[test]
    fn extracts_array() {
        let out = extract_first_json_block("prefix [1, 2, 3] suffix").unwrap();
        assert_eq!(out, json!([1, 2, 3]));
    }

    #[test]
    fn ignores_braces_inside_strings() {
        let text = r#"{"note": "contains a } brace", "ok": true}"#;
        let out = extract_first_json_block(text).unwrap();
        assert_eq!(out, json!({"note": "contains a } brace", "ok": true}));
    }

    #[test]
    fn returns_none_for_unbalanced_input() {
        assert!(extract_first_json_block("no json here at all").is_none());
        assert!(extract_first_json_block("{\"a\": 1").is_none());
    }
}
