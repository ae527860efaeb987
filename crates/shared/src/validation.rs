use crate::constants::*;

pub fn is_tag_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || TAG_EXTRA_CHARS.contains(&c)
}

pub fn validate_tag(tag: &str) -> Result<(), String> {
    if tag.is_empty() {
        return Err("Tag is empty".into());
    }
    if let Some(bad) = tag.chars().find(|c| !is_tag_char(*c)) {
        return Err(format!("Tag {:?} contains disallowed character {:?}", tag, bad));
    }
    Ok(())
}

pub fn validate_tags(tags: &[String]) -> Result<(), String> {
    for tag in tags {
        validate_tag(tag)?;
    }
    Ok(())
}
