//! Notification templates.
//!
//! The engine does not render notifications. It only checks that a template
//! uses the tags the renderer knows about.

use std::sync::LazyLock;

use regex::Regex;

use crate::{EngineError, ResultEngine};

/// Tags a template may reference, written `{{ tag }}`.
pub const AUTHORIZED_TAGS: [&str; 4] = [
    "recipient",
    "recipient.surname",
    "recipient.first_name",
    "recipient.last_name",
];

#[allow(clippy::expect_used)]
static RE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{ *(.*?) *\}\}").expect("tag pattern is valid"));

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NotificationTemplate {
    text: String,
}

impl NotificationTemplate {
    /// Validates `text` and wraps it.
    ///
    /// ```rust
    /// use engine::NotificationTemplate;
    ///
    /// assert!(NotificationTemplate::validate("Hi {{ recipient.surname }}").is_ok());
    /// assert!(NotificationTemplate::validate("Hi {{ sender }}").is_err());
    /// ```
    pub fn validate(text: &str) -> ResultEngine<Self> {
        for captures in RE_TAG.captures_iter(text) {
            let tag = captures.get(1).map_or("", |m| m.as_str());
            if !AUTHORIZED_TAGS.contains(&tag) {
                return Err(EngineError::InvalidTemplate(format!(
                    "unauthorized or misspelled tag: {tag}"
                )));
            }
        }
        Ok(Self {
            text: text.to_string(),
        })
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_known_tags_with_any_spacing() {
        let text = "{{recipient}} aka {{  recipient.surname }} ({{ recipient.first_name}} {{recipient.last_name}})";
        assert_eq!(NotificationTemplate::validate(text).unwrap().text(), text);
    }

    #[test]
    fn tag_pattern_captures_every_tag() {
        let tags: Vec<&str> = RE_TAG
            .captures_iter("{{ a }} and {{b}}, {{ c.d}}")
            .filter_map(|captures| captures.get(1).map(|m| m.as_str()))
            .collect();
        assert_eq!(tags, vec!["a", "b", "c.d"]);
    }

    #[test]
    fn plain_text_is_valid() {
        assert!(NotificationTemplate::validate("Your balance is low.").is_ok());
    }

    #[test]
    fn rejects_unknown_tag_by_name() {
        let err = NotificationTemplate::validate("Dear {{ recipient.balance }}").unwrap_err();
        assert_eq!(
            err,
            EngineError::InvalidTemplate(
                "unauthorized or misspelled tag: recipient.balance".to_string()
            )
        );
    }
}
