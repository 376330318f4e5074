pub const MAX_TAGS: usize = 15;
pub const MAX_TAG_CHARS: usize = 49;

/// Splits comma-separated model output into tags. Empty and over-long
/// tokens are dropped; order is preserved.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty() && tag.chars().count() <= MAX_TAG_CHARS)
        .take(MAX_TAGS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drops_empty_and_overlong_tokens() {
        let long = "averylongtagthatexceedsfortyninecharacters........";
        assert!(long.chars().count() > MAX_TAG_CHARS);

        let raw = format!("Tag1, tag2,, {}, Tag3", long);
        assert_eq!(parse_tags(&raw), vec!["Tag1", "tag2", "Tag3"]);
    }

    #[test]
    fn forty_eight_character_token_is_within_limit() {
        let token = "averylongtagthatexceedsfortyninecharacters......";
        assert_eq!(token.chars().count(), 48);

        let raw = format!("Tag1, tag2,, {}, Tag3", token);
        assert_eq!(parse_tags(&raw), vec!["Tag1", "tag2", token, "Tag3"]);
    }

    #[test]
    fn keeps_tag_at_exact_limit() {
        let edge = "t".repeat(MAX_TAG_CHARS);
        let over = "t".repeat(MAX_TAG_CHARS + 1);
        let raw = format!("{} ,{}", edge, over);
        assert_eq!(parse_tags(&raw), vec![edge]);
    }

    #[test]
    fn caps_at_fifteen_in_order() {
        let raw: Vec<String> = (1..=20).map(|i| format!(" tag{} ", i)).collect();
        let tags = parse_tags(&raw.join(","));
        assert_eq!(tags.len(), MAX_TAGS);
        assert_eq!(tags.first().map(String::as_str), Some("tag1"));
        assert_eq!(tags.last().map(String::as_str), Some("tag15"));
    }

    #[test]
    fn blank_output_yields_no_tags() {
        assert!(parse_tags(" , ,\n").is_empty());
    }
}
