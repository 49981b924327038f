//! Raw messages produced by logging threads.

/// What a message asks the renderer to do; derived from scope and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    /// A permanent log line.
    Println,
    /// Replace (or open) the held line of a scope.
    Hold,
    /// Close the held line of a scope.
    Release,
}

/// A message as submitted by a producer, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    thread_name: String,
    scope: Option<String>,
    level: u32,
    text: String,
}

impl RawMessage {
    /// A permanent line.
    #[must_use]
    pub fn println(thread_name: impl Into<String>, level: u32, text: impl Into<String>) -> Self {
        Self {
            thread_name: thread_name.into(),
            scope: None,
            level,
            text: text.into(),
        }
    }

    /// A held line for `scope`. Empty `text` makes this a release.
    #[must_use]
    pub fn hold(
        thread_name: impl Into<String>,
        scope: impl Into<String>,
        level: u32,
        text: impl Into<String>,
    ) -> Self {
        Self {
            thread_name: thread_name.into(),
            scope: Some(scope.into()),
            level,
            text: text.into(),
        }
    }

    /// A release of the held line of `scope`.
    #[must_use]
    pub fn release(thread_name: impl Into<String>, scope: impl Into<String>, level: u32) -> Self {
        Self::hold(thread_name, scope, level, String::new())
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        match self.scope.as_deref() {
            None | Some("") => MessageKind::Println,
            Some(_) if self.text.is_empty() => MessageKind::Release,
            Some(_) => MessageKind::Hold,
        }
    }

    #[must_use]
    pub fn thread_name(&self) -> &str {
        &self.thread_name
    }

    /// The scope, or `""` for a plain line.
    #[must_use]
    pub fn scope(&self) -> &str {
        self.scope.as_deref().unwrap_or("")
    }

    #[must_use]
    pub const fn level(&self) -> u32 {
        self.level
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}
