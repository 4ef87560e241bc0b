//! The ordered message log for one chat.
//!
//! The log is append-ordered and never re-sorted: the history fetch seeds it
//! as delivered, then [`Transcript::apply_inbound`] appends live frames in
//! arrival order. There is no optimistic append on send; a sent message only
//! enters the log through its own echo frame.

use crate::messages::{mentions_bot, ChatMessage, Sender};

/// Log change notifications handed to the view layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A real message was appended.
    Appended(ChatMessage),
    /// The "assistant is responding" placeholder was appended.
    TypingStarted,
    /// The placeholder was removed because the real reply arrived.
    TypingEnded,
    /// The transport is gone; the log will no longer change.
    Closed,
}

#[derive(Debug, Default)]
pub struct Transcript {
    entries: Vec<ChatMessage>,
}

impl Transcript {
    /// Seed from the history fetch, order preserved.
    pub fn new(history: Vec<ChatMessage>) -> Self {
        Transcript { entries: history }
    }

    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    /// While present, the placeholder is always the last entry.
    pub fn has_placeholder(&self) -> bool {
        self.entries.last().is_some_and(|entry| entry.placeholder)
    }

    /// Apply one inbound frame. This is the only code that may insert or
    /// remove the placeholder entry.
    ///
    /// A `bot` frame resolves any pending placeholder and appends the real
    /// reply. Any other frame is appended; if it is the local user's own
    /// echo and mentions the assistant, exactly one placeholder follows it.
    pub fn apply_inbound(&mut self, message: ChatMessage, self_username: &str) -> Vec<ChatEvent> {
        let mut events = Vec::with_capacity(2);

        if message.sender == Sender::Bot {
            if self.has_placeholder() {
                self.entries.pop();
                events.push(ChatEvent::TypingEnded);
            }
            events.push(ChatEvent::Appended(message.clone()));
            self.entries.push(message);
            return events;
        }

        let wants_reply = message.is_own_echo(self_username) && mentions_bot(&message.content);
        events.push(ChatEvent::Appended(message.clone()));
        if self.has_placeholder() {
            // Keep the placeholder pinned to the tail.
            let tail = self.entries.len() - 1;
            self.entries.insert(tail, message);
        } else {
            self.entries.push(message);
            if wants_reply {
                self.entries.push(ChatMessage::typing_placeholder());
                events.push(ChatEvent::TypingStarted);
            }
        }
        events
    }
}
