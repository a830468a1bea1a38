//! Block Kit wire types
//!
//! The typed subset of Slack's Block Kit this sink emits. Serialization
//! matches the webhook wire format exactly; anything optional is skipped
//! when absent so payloads stay minimal.

use serde::Serialize;

/// Markdown text type tag
pub const MRKDWN: &str = "mrkdwn";

/// Plain text type tag
pub const PLAIN_TEXT: &str = "plain_text";

/// A text object: `{type, text, emoji?}`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextObject {
    /// `mrkdwn` or `plain_text`
    #[serde(rename = "type")]
    pub text_type: String,

    /// The rendered text
    pub text: String,

    /// Emoji unescaping, only meaningful for plain text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emoji: Option<bool>,
}

impl TextObject {
    /// Markdown text
    pub fn mrkdwn(text: impl Into<String>) -> Self {
        Self {
            text_type: MRKDWN.to_string(),
            text: text.into(),
            emoji: None,
        }
    }

    /// Plain text
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text_type: PLAIN_TEXT.to_string(),
            text: text.into(),
            emoji: None,
        }
    }
}

/// One message block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    /// Plain-text header
    Header {
        /// Header text, always plain
        text: TextObject,
    },

    /// Horizontal divider
    Divider,

    /// Section with optional text and field columns
    Section {
        /// Leading text
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<TextObject>,
        /// Two-column field texts
        #[serde(skip_serializing_if = "Vec::is_empty")]
        fields: Vec<TextObject>,
    },

    /// Small-print context line
    Context {
        /// Context elements
        elements: Vec<TextObject>,
    },

    /// Interactive elements
    Actions {
        /// Buttons and menus
        elements: Vec<ActionElement>,
    },

    /// Image block
    Image {
        /// Image source
        image_url: String,
        /// Accessibility text
        alt_text: String,
        /// Optional title, always plain text
        #[serde(skip_serializing_if = "Option::is_none")]
        title: Option<TextObject>,
        /// Optional stable block id
        #[serde(skip_serializing_if = "Option::is_none")]
        block_id: Option<String>,
    },
}

/// An interactive element inside an actions block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionElement {
    /// Clickable button
    Button {
        /// Button label
        text: TextObject,
        /// Link target
        #[serde(skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        /// Interaction identifier
        #[serde(skip_serializing_if = "Option::is_none")]
        action_id: Option<String>,
        /// Value sent with the interaction payload
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<String>,
    },

    /// Static select menu
    StaticSelect {
        /// Placeholder shown before a choice is made
        #[serde(skip_serializing_if = "Option::is_none")]
        placeholder: Option<TextObject>,
        /// Interaction identifier
        #[serde(skip_serializing_if = "Option::is_none")]
        action_id: Option<String>,
        /// The selectable options
        options: Vec<SelectOption>,
    },
}

/// One option of a static select
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    /// Option label
    pub text: TextObject,
    /// Value sent when chosen
    pub value: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn divider_serializes_with_tag_only() {
        let encoded = serde_json::to_value(Block::Divider).unwrap();
        assert_eq!(encoded, json!({"type": "divider"}));
    }

    #[test]
    fn header_serializes_text_object() {
        let block = Block::Header {
            text: TextObject::plain("Deploy finished"),
        };
        let encoded = serde_json::to_value(&block).unwrap();
        assert_eq!(
            encoded,
            json!({
                "type": "header",
                "text": {"type": "plain_text", "text": "Deploy finished"}
            })
        );
    }

    #[test]
    fn section_skips_empty_parts() {
        let block = Block::Section {
            text: Some(TextObject::mrkdwn("*bold*")),
            fields: Vec::new(),
        };
        let encoded = serde_json::to_value(&block).unwrap();
        assert_eq!(
            encoded,
            json!({
                "type": "section",
                "text": {"type": "mrkdwn", "text": "*bold*"}
            })
        );
    }

    #[test]
    fn button_skips_absent_options() {
        let element = ActionElement::Button {
            text: TextObject::plain("View"),
            url: Some("https://example.com".into()),
            action_id: None,
            value: None,
        };
        let encoded = serde_json::to_value(&element).unwrap();
        assert_eq!(
            encoded,
            json!({
                "type": "button",
                "text": {"type": "plain_text", "text": "View"},
                "url": "https://example.com"
            })
        );
    }

    #[test]
    fn static_select_serializes_options() {
        let element = ActionElement::StaticSelect {
            placeholder: Some(TextObject::plain("Pick one")),
            action_id: Some("env".into()),
            options: vec![SelectOption {
                text: TextObject::plain("prod"),
                value: "prod".into(),
            }],
        };
        let encoded = serde_json::to_value(&element).unwrap();
        assert_eq!(encoded["type"], "static_select");
        assert_eq!(encoded["options"][0]["value"], "prod");
    }

    #[test]
    fn emoji_flag_serializes_when_set() {
        let mut text = TextObject::plain(":tada:");
        text.emoji = Some(true);
        let encoded = serde_json::to_value(&text).unwrap();
        assert_eq!(encoded["emoji"], true);
    }
}
