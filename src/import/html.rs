use regex::Regex;
use std::sync::LazyLock;

static INVISIBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?is)<!--.*?-->|<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>|<svg\b.*?</svg\s*>",
    )
    .expect("valid regex")
});

static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<(?:br|/p|/div|/li|/h[1-6]|/tr|/section|/article|/header|/footer)\b[^>]*>")
        .expect("valid regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"));

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z][a-zA-Z0-9]{1,8});")
        .expect("valid regex")
});

static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title\s*>").expect("valid regex"));

#[rustfmt::skip]
const NAMED: &[(&str, &str)] = &[
    ("amp", "&"), ("lt", "<"), ("gt", ">"), ("quot", "\""), ("apos", "'"), ("nbsp", " "),
    ("ndash", "–"), ("mdash", "—"), ("hellip", "…"), ("deg", "°"), ("frac12", "½"),
    ("frac14", "¼"), ("frac34", "¾"), ("rsquo", "’"), ("lsquo", "‘"), ("rdquo", "”"),
    ("ldquo", "“"), ("times", "×"), ("copy", "©"), ("reg", "®"), ("eacute", "é"),
    ("egrave", "è"), ("ntilde", "ñ"), ("uuml", "ü"), ("ouml", "ö"), ("auml", "ä"),
];

/// Decode numeric and common named character references; unknown ones are kept.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    ENTITY
        .replace_all(text, |caps: &regex::Captures| {
            let body = &caps[1];
            let decoded = if let Some(hex) = body.strip_prefix("#x").or_else(|| body.strip_prefix("#X")) {
                u32::from_str_radix(hex, 16).ok().and_then(char::from_u32).map(String::from)
            } else if let Some(dec) = body.strip_prefix('#') {
                dec.parse::<u32>().ok().and_then(char::from_u32).map(String::from)
            } else {
                NAMED
                    .iter()
                    .find(|(name, _)| *name == body)
                    .map(|(_, v)| (*v).to_string())
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Remove tags from an HTML fragment and decode entities, on one line.
pub fn strip_tags(fragment: &str) -> String {
    let text = TAG.replace_all(fragment, " ");
    decode_entities(&text)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Visible text of a page, one block per line, truncated to `max_chars`.
pub fn page_text(html: &str, max_chars: usize) -> String {
    let visible = INVISIBLE.replace_all(html, " ");
    let broken = BLOCK_TAG.replace_all(&visible, "\n");
    let bare = TAG.replace_all(&broken, " ");
    let decoded = decode_entities(&bare);

    let mut out = String::new();
    for line in decoded.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&line);
    }
    truncate_chars(out, max_chars)
}

pub fn page_title(html: &str) -> Option<String> {
    TITLE
        .captures(html)
        .map(|c| strip_tags(&c[1]))
        .filter(|t| !t.is_empty())
}

fn truncate_chars(mut s: String, max_chars: usize) -> String {
    if let Some((idx, _)) = s.char_indices().nth(max_chars) {
        s.truncate(idx);
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities() {
        assert_eq!(decode_entities("Mac &amp; cheese"), "Mac & cheese");
        assert_eq!(decode_entities("&#189; cup &#x2F; &frac14;"), "½ cup / ¼");
        assert_eq!(decode_entities("&bogus; stays"), "&bogus; stays");
    }

    #[test]
    fn visible_text_only() {
        let html = r#"<html><head><title>Best &amp; Easy Chili</title>
            <style>.x{color:red}</style><script>var a = "<p>no</p>";</script></head>
            <body><!-- hidden --><h1>Easy   Chili</h1><p>Brown the beef.</p>
            <ul><li>1 lb beef</li><li>1 can beans</li></ul><noscript>enable js</noscript></body></html>"#;
        let text = page_text(html, 10_000);
        assert_eq!(
            text,
            "Best & Easy Chili\nEasy Chili\nBrown the beef.\n1 lb beef\n1 can beans"
        );
        assert_eq!(page_title(html).as_deref(), Some("Best & Easy Chili"));
    }

    #[test]
    fn truncates_on_char_boundary() {
        let text = page_text("<p>héllo wörld</p>", 4);
        assert_eq!(text, "héll");
    }
}
