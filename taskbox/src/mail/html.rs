//! HTML email body to plain text.
//!
//! A fixed sequence of regex rewrites, not a parser: markup that is
//! malformed enough to confuse the patterns simply comes through as text.

use std::sync::LazyLock;

use regex::{Captures, Regex};

/// Rewrites applied in order before entity decoding.
const RULES: &[(&str, &str)] = &[
    (r"<!--[\s\S]*?-->", ""),
    (r"(?is)<head\b[^>]*>.*?</head\s*>", ""),
    (r"(?is)<style\b[^>]*>.*?</style\s*>", ""),
    (r"(?is)<script\b[^>]*>.*?</script\s*>", ""),
    (r"(?i)<br\s*/?>", "\n"),
    (r"(?i)<li\b[^>]*>", "• "),
    (r"(?i)</(?:p|div|tr|h[1-6]|li|table|blockquote)\s*>", "\n"),
    (r"<[^>]*>", ""),
];

const ENTITY_PATTERN: &str = r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[a-zA-Z]+);";

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

static COMPILED_RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    RULES
        .iter()
        .filter_map(|&(pattern, replacement)| match Regex::new(pattern) {
            Ok(pattern) => Some(Rule {
                pattern,
                replacement,
            }),
            Err(e) => {
                tracing::error!(pattern, error = %e, "skipping invalid html rule");
                None
            }
        })
        .collect()
});

static ENTITY: LazyLock<Option<Regex>> = LazyLock::new(|| match Regex::new(ENTITY_PATTERN) {
    Ok(re) => Some(re),
    Err(e) => {
        tracing::error!(error = %e, "invalid entity pattern");
        None
    }
});

/// Converts an HTML email body into readable plain text.
///
/// Block-level closers and `<br>` become line breaks, list items get a
/// bullet, everything else tagged is dropped, common entities are decoded,
/// and runs of blank lines collapse to one.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let mut text = html.replace("\r\n", "\n");
    for rule in COMPILED_RULES.iter() {
        text = rule
            .pattern
            .replace_all(&text, rule.replacement)
            .into_owned();
    }
    let text = decode_entities(&text);
    normalize_whitespace(&text)
}

/// Decodes named and numeric character references. Unknown or invalid
/// references are left untouched.
#[must_use]
pub fn decode_entities(text: &str) -> String {
    let Some(entity) = ENTITY.as_ref() else {
        return text.to_string();
    };
    entity
        .replace_all(text, |caps: &Captures<'_>| {
            decode_entity(&caps[1]).map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

fn decode_entity(body: &str) -> Option<char> {
    if let Some(numeric) = body.strip_prefix('#') {
        let code = match numeric.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => numeric.parse().ok()?,
        };
        return char::from_u32(code);
    }
    match body {
        "nbsp" => Some(' '),
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        _ => None,
    }
}

/// Collapses spaces within lines, trims each line, and keeps at most one
/// blank line between paragraphs.
fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut blank_run = 0usize;
    for line in text.lines() {
        let line = line.split_whitespace().collect::<Vec<_>>().join(" ");
        if line.is_empty() {
            blank_run += 1;
            if blank_run == 1 && !out.is_empty() {
                out.push('\n');
            }
            continue;
        }
        blank_run = 0;
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&line);
    }
    out.truncate(out.trim_end().len());
    out
}
