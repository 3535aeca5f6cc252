use serde_json::Value;

/// Pull the first JSON object or array out of model output.
///
/// Tolerates Markdown code fences and prose before or after the payload.
pub fn extract_json(text: &str) -> Option<Value> {
    let trimmed = text.trim();
    if let Ok(v) = serde_json::from_str::<Value>(trimmed)
        && (v.is_object() || v.is_array())
    {
        return Some(v);
    }

    let unfenced = strip_fences(trimmed);
    if let Ok(v) = serde_json::from_str::<Value>(unfenced)
        && (v.is_object() || v.is_array())
    {
        return Some(v);
    }

    let bytes = unfenced.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = unfenced[search_from..].find(['{', '[']) {
        let start = search_from + offset;
        if let Some(end) = matching_close(bytes, start)
            && let Ok(v) = serde_json::from_str::<Value>(&unfenced[start..=end])
        {
            return Some(v);
        }
        search_from = start + 1;
    }
    None
}

fn strip_fences(text: &str) -> &str {
    let Some(open) = text.find("```") else {
        return text;
    };
    let after = &text[open + 3..];
    // skip a language tag such as ```json
    let body_start = after.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after[body_start..];
    match body.find("```") {
        Some(close) => body[..close].trim(),
        None => body.trim(),
    }
}

/// Index of the bracket closing the one at `start`, honoring strings and escapes.
fn matching_close(bytes: &[u8], start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate().skip(start) {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(i);
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
    fn plain_json() {
        assert_eq!(extract_json(r#" {"a": 1} "#), Some(json!({"a": 1})));
        assert_eq!(extract_json("[1,2]"), Some(json!([1, 2])));
    }

    #[test]
    fn fenced_json() {
        let text = "Here you go:\n```json\n{\"recipes\": []}\n```\nEnjoy!";
        assert_eq!(extract_json(text), Some(json!({"recipes": []})));
    }

    #[test]
    fn json_embedded_in_prose_with_tricky_strings() {
        let text = r#"Sure! {"name": "Mac {and} cheese", "note": "say \"hi\""} Hope it helps."#;
        assert_eq!(
            extract_json(text),
            Some(json!({"name": "Mac {and} cheese", "note": "say \"hi\""}))
        );
    }

    #[test]
    fn skips_unbalanced_prefix() {
        let text = r#"Use [brackets like this and then {"ok": true}"#;
        assert_eq!(extract_json(text), Some(json!({"ok": true})));
    }

    #[test]
    fn nothing_to_extract() {
        assert_eq!(extract_json("no json here"), None);
        assert_eq!(extract_json("42"), None);
    }
}
