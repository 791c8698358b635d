use std::collections::VecDeque;

use parley_core::types::ChatMessage;

/// Bounded FIFO of the most recent chat messages, replayed to new joiners.
#[derive(Debug)]
pub struct HistoryBuffer {
    messages: VecDeque<ChatMessage>,
    capacity: usize,
}

impl HistoryBuffer {
    /// `capacity` comes straight from config, so storage grows on demand
    /// instead of being reserved here.
    pub fn new(capacity: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            capacity,
        }
    }

    /// Append to the tail, evicting from the head once over capacity.
    pub fn append(&mut self, message: ChatMessage) {
        self.messages.push_back(message);
        while self.messages.len() > self.capacity {
            self.messages.pop_front();
        }
    }

    /// Copy of the retained messages, oldest first.
    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
