//! Logger configuration.
//!
//! [`LoggerConfiguration`] is a plain value read by the renderer on every
//! message. It is built with consuming `with_*` methods and can be overlaid
//! with environment settings through [`LoggerConfiguration::from_env`].

use std::fmt;
use std::str::FromStr;

use crate::highlight::KeywordTable;
use crate::style::TextStyle;
use crate::terminal::EnvSettings;
use crate::theme::Theme;

/// Where the thread name goes relative to the level number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ThreadNamePolicy {
    #[default]
    Never,
    Before,
    After,
}

impl fmt::Display for ThreadNamePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Never => "never",
            Self::Before => "before",
            Self::After => "after",
        })
    }
}

/// Error returned for an unrecognised thread name policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePolicyError(pub String);

impl fmt::Display for ParsePolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid thread name policy {:?} (expected never, before or after)",
            self.0
        )
    }
}

impl std::error::Error for ParsePolicyError {}

impl FromStr for ThreadNamePolicy {
    type Err = ParsePolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "never" => Ok(Self::Never),
            "before" => Ok(Self::Before),
            "after" => Ok(Self::After),
            _ => Err(ParsePolicyError(s.to_string())),
        }
    }
}

/// Rendering options of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerConfiguration {
    verbosity: u32,
    indents_based_on_level: bool,
    prints_level_on_change_only: bool,
    prints_scope_entrance: bool,
    prints_scope_exit: bool,
    handles_multiline_output: bool,
    discards_newlines_and_indentation: bool,
    thread_name_policy: ThreadNamePolicy,
    theme: Theme,
    keywords: KeywordTable,
}

impl Default for LoggerConfiguration {
    fn default() -> Self {
        Self {
            verbosity: 0,
            indents_based_on_level: true,
            prints_level_on_change_only: true,
            prints_scope_entrance: false,
            prints_scope_exit: false,
            handles_multiline_output: true,
            discards_newlines_and_indentation: false,
            thread_name_policy: ThreadNamePolicy::Never,
            theme: Theme::none(),
            keywords: KeywordTable::new(),
        }
    }
}

impl LoggerConfiguration {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overlaid with the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::default().with_env(&EnvSettings::from_process())
    }

    /// Overlay `env` on this configuration; invalid values are ignored.
    #[must_use]
    pub fn with_env(mut self, env: &EnvSettings) -> Self {
        if let Some(verbosity) = env.verbosity.as_deref().and_then(|v| v.trim().parse().ok()) {
            self.verbosity = verbosity;
        }
        if let Some(theme) = env.theme.as_deref().and_then(|t| t.parse().ok()) {
            self.theme = theme;
        }
        if let Some(policy) = env.thread_names.as_deref().and_then(|p| p.parse().ok()) {
            self.thread_name_policy = policy;
        }
        if env.color_disabled() {
            self.theme = Theme::none();
        }
        self
    }

    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u32) -> Self {
        self.verbosity = verbosity;
        self
    }

    #[must_use]
    pub fn with_indents_based_on_level(mut self, enabled: bool) -> Self {
        self.indents_based_on_level = enabled;
        self
    }

    #[must_use]
    pub fn with_prints_level_on_change_only(mut self, enabled: bool) -> Self {
        self.prints_level_on_change_only = enabled;
        self
    }

    #[must_use]
    pub fn with_prints_scope_entrance(mut self, enabled: bool) -> Self {
        self.prints_scope_entrance = enabled;
        self
    }

    #[must_use]
    pub fn with_prints_scope_exit(mut self, enabled: bool) -> Self {
        self.prints_scope_exit = enabled;
        self
    }

    #[must_use]
    pub fn with_handles_multiline_output(mut self, enabled: bool) -> Self {
        self.handles_multiline_output = enabled;
        self
    }

    #[must_use]
    pub fn with_discards_newlines_and_indentation(mut self, enabled: bool) -> Self {
        self.discards_newlines_and_indentation = enabled;
        self
    }

    #[must_use]
    pub fn with_thread_name_policy(mut self, policy: ThreadNamePolicy) -> Self {
        self.thread_name_policy = policy;
        self
    }

    #[must_use]
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Register `keyword` using the keyword style of the current theme.
    #[must_use]
    pub fn with_custom_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.add_custom_keyword(keyword);
        self
    }

    pub fn set_verbosity(&mut self, verbosity: u32) {
        self.verbosity = verbosity;
    }

    pub fn set_indents_based_on_level(&mut self, enabled: bool) {
        self.indents_based_on_level = enabled;
    }

    pub fn set_prints_level_on_change_only(&mut self, enabled: bool) {
        self.prints_level_on_change_only = enabled;
    }

    pub fn set_prints_scope_entrance(&mut self, enabled: bool) {
        self.prints_scope_entrance = enabled;
    }

    pub fn set_prints_scope_exit(&mut self, enabled: bool) {
        self.prints_scope_exit = enabled;
    }

    pub fn set_handles_multiline_output(&mut self, enabled: bool) {
        self.handles_multiline_output = enabled;
    }

    pub fn set_discards_newlines_and_indentation(&mut self, enabled: bool) {
        self.discards_newlines_and_indentation = enabled;
    }

    pub fn set_thread_name_policy(&mut self, policy: ThreadNamePolicy) {
        self.thread_name_policy = policy;
    }

    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
    }

    /// Register `keyword` with the keyword style of the theme active now.
    ///
    /// Returns false if the keyword already exists (built in or custom).
    pub fn add_custom_keyword(&mut self, keyword: impl Into<String>) -> bool {
        let style = self.theme.keyword;
        self.keywords.insert(keyword, style)
    }

    /// Register `keyword` with an explicit style.
    pub fn add_custom_keyword_styled(&mut self, keyword: impl Into<String>, style: TextStyle) -> bool {
        self.keywords.insert(keyword, style)
    }

    #[must_use]
    pub const fn verbosity(&self) -> u32 {
        self.verbosity
    }

    #[must_use]
    pub const fn indents_based_on_level(&self) -> bool {
        self.indents_based_on_level
    }

    #[must_use]
    pub const fn prints_level_on_change_only(&self) -> bool {
        self.prints_level_on_change_only
    }

    #[must_use]
    pub const fn prints_scope_entrance(&self) -> bool {
        self.prints_scope_entrance
    }

    #[must_use]
    pub const fn prints_scope_exit(&self) -> bool {
        self.prints_scope_exit
    }

    #[must_use]
    pub const fn handles_multiline_output(&self) -> bool {
        self.handles_multiline_output
    }

    #[must_use]
    pub const fn discards_newlines_and_indentation(&self) -> bool {
        self.discards_newlines_and_indentation
    }

    #[must_use]
    pub const fn thread_name_policy(&self) -> ThreadNamePolicy {
        self.thread_name_policy
    }

    #[must_use]
    pub const fn theme(&self) -> &Theme {
        &self.theme
    }

    #[must_use]
    pub const fn custom_keywords(&self) -> &KeywordTable {
        &self.keywords
    }
}

impl fmt::Display for LoggerConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "LoggerConfiguration(")?;
        writeln!(f, "  verbosity={},", self.verbosity)?;
        writeln!(f, "  indents_based_on_level={},", self.indents_based_on_level)?;
        writeln!(f, "  prints_level_on_change_only={},", self.prints_level_on_change_only)?;
        writeln!(f, "  prints_scope_entrance={},", self.prints_scope_entrance)?;
        writeln!(f, "  prints_scope_exit={},", self.prints_scope_exit)?;
        writeln!(f, "  handles_multiline_output={},", self.handles_multiline_output)?;
        writeln!(
            f,
            "  discards_newlines_and_indentation={},",
            self.discards_newlines_and_indentation
        )?;
        writeln!(f, "  thread_name_policy={},", self.thread_name_policy)?;
        writeln!(f, "  styled_theme={},", self.theme.has_style())?;
        writeln!(f, "  custom_keywords={}", self.keywords.len())?;
        write!(f, ")")
    }
}
