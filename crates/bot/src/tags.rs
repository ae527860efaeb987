use bones_shared::constants::TAG_PATTERN;
use regex_lite::Regex;
use std::sync::OnceLock;

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(TAG_PATTERN).expect("tag pattern is valid"))
}

/// Pulls every `` `tag` `` token out of a message body, left to right.
/// Duplicates are kept; empty tokens are skipped.
pub fn extract_tags(body: &str) -> Vec<String> {
    tag_regex()
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|tag| !tag.is_empty())
        .map(String::from)
        .collect()
}

/// Drops the quoted `> ...` fallback that rich replies prepend to the body.
pub fn strip_reply_fallback(body: &str) -> &str {
    if !body.starts_with('>') {
        return body;
    }

    let mut rest = body;
    while let Some(line_end) = rest.find('\n') {
        let line = &rest[..line_end];
        if line.starts_with('>') {
            rest = &rest[line_end + 1..];
            continue;
        }
        if line.trim().is_empty() {
            return &rest[line_end + 1..];
        }
        return rest;
    }

    // Nothing but quote lines
    if rest.starts_with('>') {
        ""
    } else {
        rest
    }
}
