//! Wire records shared between the REST surface and the chat socket.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Handle the assistant responds to when mentioned in a message.
pub const BOT_HANDLE: &str = "recme";

/// Display name attached to assistant entries in the log.
pub const BOT_DISPLAY_NAME: &str = "Mingle AI";

/// Sentinel id for log entries the server never persisted.
pub const PLACEHOLDER_ID: i64 = -1;

static BOT_MENTION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)@{BOT_HANDLE}\b")).expect("bot mention pattern is valid")
});

/// Whole-word, case-insensitive check for the assistant trigger.
pub fn mentions_bot(text: &str) -> bool {
    BOT_MENTION.is_match(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    System,
}

/// One chat entry, as broadcast over the socket and returned by the history
/// fetch. History rows omit `sender_username`; live frames carry it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub content: String,
    pub sender: Sender,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Marks the synthetic "assistant is responding" entry. Client-side
    /// only: never serialized, never sent to the server.
    #[serde(skip)]
    pub placeholder: bool,
}

impl ChatMessage {
    /// The synthetic entry shown while an assistant reply is pending.
    pub fn typing_placeholder() -> Self {
        ChatMessage {
            id: PLACEHOLDER_ID,
            content: String::new(),
            sender: Sender::Bot,
            sender_username: Some(BOT_DISPLAY_NAME.to_string()),
            timestamp: None,
            placeholder: true,
        }
    }

    /// True when this is a human message authored by `username`.
    pub fn is_own_echo(&self, username: &str) -> bool {
        self.sender == Sender::User && self.sender_username.as_deref() == Some(username)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSummary {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub last_updated: Option<String>,
    #[serde(default)]
    pub owner_username: Option<String>,
}

/// A registered account, also used for chat membership lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfEntry {
    pub id: i64,
    pub filename: String,
}

/// Ad-bidding settings for restaurant accounts. The client only reads and
/// writes the form values; rule evaluation happens server-side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BiddingRules {
    pub bid_amount: f64,
    pub max_budget: f64,
    pub charged_amount: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_matches_whole_word_case_insensitive() {
        assert!(mentions_bot("hello @recme"));
        assert!(mentions_bot("@RecMe summarize this"));
        assert!(mentions_bot("ping @RECME, thanks"));
        assert!(!mentions_bot("mail me at x@recmedia.com"));
        assert!(!mentions_bot("recme without the at sign"));
    }

    #[test]
    fn sender_uses_lowercase_wire_names() {
        assert_eq!(serde_json::to_string(&Sender::Bot).unwrap(), "\"bot\"");
        let sender: Sender = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(sender, Sender::System);
    }

    #[test]
    fn history_row_without_username_deserializes() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"id": 7, "content": "hi", "sender": "user", "timestamp": "2024-01-01 10:00:00"}"#,
        )
        .unwrap();
        assert_eq!(message.id, 7);
        assert_eq!(message.sender_username, None);
        assert!(!message.placeholder);
    }

    #[test]
    fn placeholder_flag_never_reaches_the_wire() {
        let entry = ChatMessage::typing_placeholder();
        let value = serde_json::to_value(&entry).unwrap();
        assert!(value.get("placeholder").is_none());
        assert_eq!(value["id"], PLACEHOLDER_ID);
    }

    #[test]
    fn own_echo_requires_matching_username() {
        let message: ChatMessage = serde_json::from_str(
            r#"{"id": 1, "content": "x", "sender": "user", "sender_username": "ada"}"#,
        )
        .unwrap();
        assert!(message.is_own_echo("ada"));
        assert!(!message.is_own_echo("grace"));
        assert!(!ChatMessage::typing_placeholder().is_own_echo("ada"));
    }
}
