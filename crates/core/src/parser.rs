//! Story list parsing
//!
//! Turns text pasted from a backlog tool into story items. Each
//! `http://` or `https://` token starts a story; the words after it, up to the
//! next url, form its description. Words before the first url are dropped.

use crate::models::StoryItem;

fn is_url(token: &str) -> bool {
    token.starts_with("http://") || token.starts_with("https://")
}

/// Parse freeform text into stories in encounter order.
///
/// Description words are each followed by a single space, so a non-empty
/// description always ends with a trailing space.
pub fn parse_story_list(text: &str) -> Vec<StoryItem> {
    let mut items: Vec<StoryItem> = Vec::new();

    for token in text.split_whitespace() {
        if is_url(token) {
            items.push(StoryItem {
                story_url: token.to_string(),
                story_description: String::new(),
            });
        } else if let Some(current) = items.last_mut() {
            current.story_description.push_str(token);
            current.story_description.push(' ');
        }
    }

    items
}
