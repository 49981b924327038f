//! The stack of held lines, one per open scope.

use crate::message::RawMessage;

/// Most recent hold message per open scope, in first-hold order.
///
/// Scopes are unique within the stack.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeldLineStack {
    entries: Vec<RawMessage>,
}

impl HeldLineStack {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the entry of the message's scope in place, or append it.
    pub fn hold(&mut self, msg: RawMessage) {
        match self.position(msg.scope()) {
            Some(idx) => self.entries[idx] = msg,
            None => self.entries.push(msg),
        }
    }

    /// Drop the entry of `scope` and every entry held after it.
    ///
    /// Returns the removed entry for `scope`, or `None` if it was not held.
    pub fn release(&mut self, scope: &str) -> Option<RawMessage> {
        let idx = self.position(scope)?;
        let mut removed = self.entries.split_off(idx);
        Some(removed.swap_remove(0))
    }

    #[must_use]
    pub fn position(&self, scope: &str) -> Option<usize> {
        self.entries.iter().position(|entry| entry.scope() == scope)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawMessage> {
        self.entries.iter()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(scope: &str, text: &str) -> RawMessage {
        RawMessage::hold("main", scope, 1, text)
    }

    fn scopes(stack: &HeldLineStack) -> Vec<&str> {
        stack.iter().map(RawMessage::scope).collect()
    }

    #[test]
    fn test_hold_replaces_in_place() {
        let mut stack = HeldLineStack::new();
        stack.hold(held("a", "1"));
        stack.hold(held("b", "1"));
        stack.hold(held("a", "2"));
        assert_eq!(scopes(&stack), ["a", "b"]);
        assert_eq!(stack.iter().next().map(RawMessage::text), Some("2"));
    }

    #[test]
    fn test_release_truncates_nested_entries() {
        let mut stack = HeldLineStack::new();
        for scope in ["a", "b", "c"] {
            stack.hold(held(scope, "x"));
        }
        let removed = stack.release("b");
        assert_eq!(removed.map(|m| m.scope().to_string()), Some("b".to_string()));
        assert_eq!(scopes(&stack), ["a"]);
    }

    #[test]
    fn test_release_unknown_scope_is_noop() {
        let mut stack = HeldLineStack::new();
        stack.hold(held("a", "x"));
        assert!(stack.release("zzz").is_none());
        assert_eq!(stack.len(), 1);
    }

    #[test]
    fn test_release_last_empties() {
        let mut stack = HeldLineStack::new();
        stack.hold(held("a", "x"));
        assert!(stack.release("a").is_some());
        assert!(stack.is_empty());
    }
}
