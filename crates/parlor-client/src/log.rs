//! Bounded, order-preserving chat log for the current room.

use std::collections::VecDeque;

use parlor_proto::SYSTEM_SENDER;

/// Maximum number of lines retained; oldest entries are evicted first.
pub const ROOM_LOG_CAP: usize = 100;

/// Who a chat line came from, relative to the local user.
///
/// Computed at read time by comparing the sender to the current display name,
/// not stored on the line itself, so a display-name change never requires
/// rewriting history.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Sent by the local user.
    Mine,
    /// Sent by another occupant.
    Other,
    /// Protocol-level notice from the reserved `"system"` sender.
    System,
}

/// One delivered chat line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatLine {
    /// Display name of the originator.
    pub sender: String,
    /// Message payload.
    pub text: String,
}

impl ChatLine {
    /// Classify this line against the local display name.
    pub fn origin(&self, my_name: &str) -> Origin {
        if self.sender == SYSTEM_SENDER {
            Origin::System
        } else if self.sender == my_name {
            Origin::Mine
        } else {
            Origin::Other
        }
    }
}

/// Append-only view of chat lines for the current room.
///
/// Single-writer: owned and mutated exclusively by the session state machine.
/// Lines are kept in the order received; the log never reorders and never
/// deduplicates by content. Once [`ROOM_LOG_CAP`] is exceeded the oldest line
/// is dropped.
#[derive(Debug, Clone, Default)]
pub struct RoomLog {
    lines: VecDeque<ChatLine>,
}

impl RoomLog {
    /// Create an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a line to the tail, evicting the head once the bound is exceeded.
    pub fn append(&mut self, line: ChatLine) {
        if self.lines.len() == ROOM_LOG_CAP {
            self.lines.pop_front();
        }
        self.lines.push_back(line);
    }

    /// Ordered copy of the current lines, oldest first.
    pub fn snapshot(&self) -> Vec<ChatLine> {
        self.lines.iter().cloned().collect()
    }

    /// Iterate over the current lines, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &ChatLine> {
        self.lines.iter()
    }

    /// Drop every line.
    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Number of retained lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the log holds no lines.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(sender: &str, text: &str) -> ChatLine {
        ChatLine { sender: sender.to_string(), text: text.to_string() }
    }

    #[test]
    fn append_preserves_order() {
        let mut log = RoomLog::new();
        log.append(line("Alice", "a"));
        log.append(line("Bob", "b"));
        log.append(line("Alice", "c"));

        let texts: Vec<&str> = log.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, ["a", "b", "c"]);
    }

    #[test]
    fn duplicate_lines_are_kept() {
        let mut log = RoomLog::new();
        log.append(line("Alice", "same"));
        log.append(line("Alice", "same"));
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn eviction_drops_oldest_first() {
        let mut log = RoomLog::new();
        for i in 0..ROOM_LOG_CAP {
            log.append(line("Alice", &i.to_string()));
        }
        assert_eq!(log.len(), ROOM_LOG_CAP);

        log.append(line("Alice", "overflow"));
        assert_eq!(log.len(), ROOM_LOG_CAP);

        let snapshot = log.snapshot();
        assert_eq!(snapshot[0].text, "1");
        assert_eq!(snapshot[ROOM_LOG_CAP - 1].text, "overflow");
    }

    #[test]
    fn clear_empties_the_log() {
        let mut log = RoomLog::new();
        log.append(line("Alice", "a"));
        log.clear();
        assert!(log.is_empty());
    }

    #[test]
    fn origin_classification() {
        assert_eq!(line("Alice", "x").origin("Alice"), Origin::Mine);
        assert_eq!(line("Bob", "x").origin("Alice"), Origin::Other);
        assert_eq!(line("system", "x").origin("Alice"), Origin::System);
        // The system sender is reserved even if a user claims the name.
        assert_eq!(line("system", "x").origin("system"), Origin::System);
    }
}
