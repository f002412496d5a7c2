use crate::model::{Message, MessageRole};

/// Rolling window over the conversation. Holds at most `max_history`
/// non-system turns; a leading system turn is never counted or evicted.
#[derive(Debug)]
pub struct HistoryBuffer {
    messages: Vec<Message>,
    max_history: usize,
}

impl HistoryBuffer {
    pub fn new(max_history: usize) -> Self {
        Self {
            messages: Vec::new(),
            max_history,
        }
    }

    /// Inserts or replaces the leading system turn.
    pub fn set_system(&mut self, content: impl Into<String>) {
        let system = Message::system(content);
        match self.messages.first() {
            Some(first) if first.role == MessageRole::System => self.messages[0] = system,
            _ => self.messages.insert(0, system),
        }
    }

    /// Appends a turn, then evicts the oldest non-system turns until the
    /// window fits `max_history` again.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
        let head = self.system_head();
        while self.messages.len() - head > self.max_history {
            self.messages.remove(head);
        }
    }

    /// Current window, oldest first, ready for prompt assembly.
    pub fn as_messages(&self) -> &[Message] {
        &self.messages
    }

    /// Drops every turn except the leading system turn.
    pub fn clear(&mut self) {
        self.messages.truncate(self.system_head());
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    fn system_head(&self) -> usize {
        match self.messages.first() {
            Some(first) if first.role == MessageRole::System => 1,
            _ => 0,
        }
    }
}
