//! Conversation state supplied by the caller on every request.
//!
//! The wire shape is `[{ "sender": "user" | "bot", "text": "..." }, ...]`.
//! Parsing fails open: anything malformed is dropped instead of rejected.

use ai_llm_service::ChatTurn;
use serde_json::Value;
use tracing::debug;

/// Who wrote a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub speaker: Speaker,
    pub text: String,
}

/// Ordered, filtered turns. Never contains blank text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    /// Builds a conversation from typed turns, dropping blank ones.
    pub fn from_turns(turns: impl IntoIterator<Item = Turn>) -> Self {
        Self {
            turns: turns
                .into_iter()
                .filter(|t| !t.text.trim().is_empty())
                .collect(),
        }
    }

    /// Builds a conversation from a raw request.
    ///
    /// - A non-array `history` counts as empty.
    /// - Entries without a string `text` are skipped.
    /// - `sender == "user"` is a user turn; any other sender is the assistant.
    /// - A non-blank `message` becomes the final user turn, unless history
    ///   already ends with the same user text.
    pub fn from_request(history: &Value, message: Option<&str>) -> Self {
        let mut turns = Vec::new();
        match history.as_array() {
            Some(items) => {
                for item in items {
                    let Some(text) = item.get("text").and_then(Value::as_str) else {
                        continue;
                    };
                    let speaker = match item.get("sender").and_then(Value::as_str) {
                        Some("user") => Speaker::User,
                        _ => Speaker::Assistant,
                    };
                    turns.push(Turn {
                        speaker,
                        text: text.to_string(),
                    });
                }
            }
            None if !history.is_null() => debug!("history is not an array; treating as empty"),
            None => {}
        }

        let mut conv = Self::from_turns(turns);
        if let Some(msg) = message.filter(|m| !m.trim().is_empty()) {
            let repeated = conv
                .turns
                .last()
                .is_some_and(|t| t.speaker == Speaker::User && t.text == msg);
            if !repeated {
                conv.turns.push(Turn {
                    speaker: Speaker::User,
                    text: msg.to_string(),
                });
            }
        }
        conv
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Index and text of the last user turn.
    pub fn latest_user(&self) -> Option<(usize, &str)> {
        self.turns
            .iter()
            .enumerate()
            .rev()
            .find(|(_, t)| t.speaker == Speaker::User)
            .map(|(i, t)| (i, t.text.as_str()))
    }

    /// Role-tagged turns that precede the question being answered.
    ///
    /// A trailing user turn is the question itself and is left out. When the
    /// conversation ends with an assistant reply every turn is kept.
    /// This is the only place where speakers map onto model roles.
    pub fn chat_history(&self) -> Vec<ChatTurn> {
        let end = match self.turns.last() {
            Some(t) if t.speaker == Speaker::User => self.turns.len() - 1,
            _ => self.turns.len(),
        };
        self.turns[..end]
            .iter()
            .map(|t| match t.speaker {
                Speaker::User => ChatTurn::user(t.text.clone()),
                Speaker::Assistant => ChatTurn::model(t.text.clone()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ai_llm_service::ChatRole;
    use serde_json::json;

    #[test]
    fn malformed_history_is_empty() {
        for h in [json!("oops"), json!({ "sender": "user" }), json!(42), Value::Null] {
            let c = Conversation::from_request(&h, None);
            assert!(c.is_empty());
            assert!(c.latest_user().is_none());
        }
    }

    #[test]
    fn bad_entries_and_blank_turns_are_dropped() {
        let h = json!([
            { "sender": "user", "text": "What is quicksort?" },
            { "sender": "bot" },
            "stray",
            { "sender": "bot", "text": "   " },
            { "sender": "bot", "text": "A sorting algorithm." },
            { "sender": "user", "text": 7 }
        ]);
        let c = Conversation::from_request(&h, Some("What is its complexity?"));
        let speakers: Vec<Speaker> = c.turns().iter().map(|t| t.speaker).collect();
        assert_eq!(speakers, [Speaker::User, Speaker::Assistant, Speaker::User]);
        assert_eq!(c.latest_user(), Some((2, "What is its complexity?")));
    }

    #[test]
    fn any_non_user_sender_is_assistant() {
        let h = json!([{ "sender": "system", "text": "hi" }, { "text": "hello" }]);
        let c = Conversation::from_request(&h, None);
        assert!(c.turns().iter().all(|t| t.speaker == Speaker::Assistant));
        assert!(c.latest_user().is_none());
    }

    #[test]
    fn message_already_in_history_is_not_duplicated() {
        let h = json!([{ "sender": "user", "text": "What is a BST?" }]);
        let c = Conversation::from_request(&h, Some("What is a BST?"));
        assert_eq!(c.turns().len(), 1);
    }

    #[test]
    fn blank_message_and_blank_history_have_no_user_turn() {
        let h = json!([{ "sender": "user", "text": "" }]);
        let c = Conversation::from_request(&h, Some(" \n"));
        assert!(c.latest_user().is_none());
    }

    #[test]
    fn chat_history_maps_roles_and_leaves_out_trailing_question() {
        let h = json!([
            { "sender": "user", "text": "What is quicksort?" },
            { "sender": "bot", "text": "A sorting algorithm." }
        ]);
        let c = Conversation::from_request(&h, Some("What is its complexity?"));
        let turns = c.chat_history();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[1], ChatTurn::model("A sorting algorithm."));
    }

    #[test]
    fn history_ending_with_bot_reply_is_kept_whole() {
        let h = json!([
            { "sender": "user", "text": "What is quicksort?" },
            { "sender": "bot", "text": "A sorting algorithm." }
        ]);
        let c = Conversation::from_request(&h, None);
        assert_eq!(c.latest_user(), Some((0, "What is quicksort?")));
        assert_eq!(
            c.chat_history(),
            vec![
                ChatTurn::user("What is quicksort?"),
                ChatTurn::model("A sorting algorithm."),
            ]
        );
    }
}
