use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationTurn {
    pub role: Role,
    pub text: String,
}

/// Ordered dialogue memory, capped at a fixed number of user/assistant
/// pairs. When appending would exceed the cap the oldest pair is
/// evicted first, preserving recency. Owned exclusively by the
/// conversation engine; the serialized pipeline never touches it
/// concurrently.
#[derive(Debug)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    pair_limit: usize,
}

impl ConversationHistory {
    pub fn new(pair_limit: usize) -> Self {
        Self {
            turns: VecDeque::with_capacity(pair_limit * 2),
            pair_limit: pair_limit.max(1),
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Role::User, text.into());
    }

    pub fn push_assistant(&mut self, text: impl Into<String>) {
        self.push(Role::Assistant, text.into());
    }

    fn push(&mut self, role: Role, text: String) {
        self.turns.push_back(ConversationTurn { role, text });
        while self.turns.len() > self.pair_limit * 2 {
            // Drop the oldest pair, not a single turn, so the history
            // never starts mid-exchange.
            self.turns.pop_front();
            self.turns.pop_front();
        }
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn last(&self) -> Option<&ConversationTurn> {
        self.turns.back()
    }
}
