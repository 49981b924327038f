//! Terminal text styles.
//!
//! A [`TextStyle`] is an immutable descriptor of an optional 256-color
//! foreground, an optional background, and the bold/underline attributes.
//! Styles render to standard ANSI escape sequences, one sequence per
//! property, always terminated by [`RESET`].

use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::{LazyLock, Mutex};

use bitflags::bitflags;
use lru::LruCache;
use regex::Regex;
use smallvec::SmallVec;

use crate::sync::lock_recover;

/// Escape sequence that clears every attribute.
pub const RESET: &str = "\x1b[0m";

/// Palette entries used by the built-in themes (256-color indices).
pub mod palette {
    pub const DARK_BROWN: u8 = 95;
    pub const DARK_ORANGE: u8 = 130;
    pub const LIGHT_BROWN: u8 = 136;
    pub const BRIGHT_ORANGE: u8 = 208;
    pub const CREAM: u8 = 223;
    pub const OBSIDIAN: u8 = 237;
    pub const DARK_GREY: u8 = 244;
    pub const LIGHT_GREY: u8 = 251;
}

bitflags! {
    /// Text attribute flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Attributes: u8 {
        /// Bold/bright text (SGR 1).
        const BOLD      = 1 << 0;
        /// Single underline (SGR 4).
        const UNDERLINE = 1 << 1;
    }
}

/// A single select-graphic-rendition code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SgrCode {
    Foreground(u8),
    Background(u8),
    Bold,
    Underline,
}

impl fmt::Display for SgrCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Foreground(n) => write!(f, "\x1b[38;5;{n}m"),
            Self::Background(n) => write!(f, "\x1b[48;5;{n}m"),
            Self::Bold => f.write_str("\x1b[1m"),
            Self::Underline => f.write_str("\x1b[4m"),
        }
    }
}

/// Foreground/background colors plus attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TextStyle {
    foreground: Option<u8>,
    background: Option<u8>,
    attributes: Attributes,
}

impl TextStyle {
    /// The unstyled style.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            foreground: None,
            background: None,
            attributes: Attributes::empty(),
        }
    }

    /// A style with only a foreground color.
    #[must_use]
    pub const fn fg(color: u8) -> Self {
        Self {
            foreground: Some(color),
            background: None,
            attributes: Attributes::empty(),
        }
    }

    /// Set the foreground color.
    #[must_use]
    pub const fn with_foreground(mut self, color: u8) -> Self {
        self.foreground = Some(color);
        self
    }

    /// Set the background color.
    #[must_use]
    pub const fn with_background(mut self, color: u8) -> Self {
        self.background = Some(color);
        self
    }

    /// Enable bold.
    #[must_use]
    pub const fn bold(mut self) -> Self {
        self.attributes = self.attributes.union(Attributes::BOLD);
        self
    }

    /// Enable underline.
    #[must_use]
    pub const fn underline(mut self) -> Self {
        self.attributes = self.attributes.union(Attributes::UNDERLINE);
        self
    }

    #[must_use]
    pub const fn foreground(&self) -> Option<u8> {
        self.foreground
    }

    #[must_use]
    pub const fn background(&self) -> Option<u8> {
        self.background
    }

    #[must_use]
    pub const fn attributes(&self) -> Attributes {
        self.attributes
    }

    /// True if any color or attribute is set.
    #[must_use]
    pub const fn is_styled(&self) -> bool {
        self.foreground.is_some() || self.background.is_some() || !self.attributes.is_empty()
    }

    fn sgr_codes(&self) -> SmallVec<[SgrCode; 4]> {
        let mut codes = SmallVec::new();
        if let Some(n) = self.foreground {
            codes.push(SgrCode::Foreground(n));
        }
        if let Some(n) = self.background {
            codes.push(SgrCode::Background(n));
        }
        if self.attributes.contains(Attributes::BOLD) {
            codes.push(SgrCode::Bold);
        }
        if self.attributes.contains(Attributes::UNDERLINE) {
            codes.push(SgrCode::Underline);
        }
        codes
    }

    /// The escape sequences that switch this style on.
    ///
    /// Empty for an unstyled style.
    #[must_use]
    pub fn prefix(&self) -> String {
        self.sgr_codes().iter().map(ToString::to_string).collect()
    }

    /// Wrap `text` with this style's prefix and [`RESET`].
    ///
    /// Returns `text` unchanged when unstyled.
    #[must_use]
    pub fn paint(&self, text: &str) -> String {
        if self.is_styled() {
            format!("{}{text}{RESET}", self.prefix())
        } else {
            text.to_string()
        }
    }

    /// Parse a style definition.
    ///
    /// Grammar (whitespace separated, case insensitive):
    /// - `none` or empty: unstyled
    /// - `bold`, `underline`
    /// - a color: `208`, `color(208)` or a standard name such as `red`
    /// - `on <color>`: background
    ///
    /// ```rust
    /// use conclog::style::TextStyle;
    ///
    /// let style = TextStyle::parse("bold 208 on black").unwrap();
    /// assert_eq!(style, TextStyle::fg(208).with_background(0).bold());
    /// ```
    ///
    /// # Errors
    ///
    /// Returns [`StyleParseError`] for unknown words or out-of-range colors.
    pub fn parse(definition: &str) -> Result<Self, StyleParseError> {
        static CACHE: LazyLock<Mutex<LruCache<String, TextStyle>>> = LazyLock::new(|| {
            Mutex::new(LruCache::new(NonZeroUsize::new(256).unwrap_or(NonZeroUsize::MIN)))
        });

        let normalized = definition.trim().to_lowercase();
        if let Some(cached) = lock_recover(&CACHE).get(&normalized) {
            return Ok(*cached);
        }

        let style = Self::parse_uncached(&normalized)?;
        lock_recover(&CACHE).put(normalized, style);
        Ok(style)
    }

    fn parse_uncached(definition: &str) -> Result<Self, StyleParseError> {
        if definition.is_empty() || definition == "none" {
            return Ok(Self::none());
        }

        let mut style = Self::none();
        let mut words = definition.split_whitespace();
        while let Some(word) = words.next() {
            match word {
                "bold" | "b" => style = style.bold(),
                "underline" | "u" => style = style.underline(),
                "on" => {
                    let color = words.next().ok_or_else(|| {
                        StyleParseError::InvalidFormat("'on' requires a color".to_string())
                    })?;
                    style = style.with_background(parse_color(color)?);
                }
                other => style = style.with_foreground(parse_color(other)?),
            }
        }
        Ok(style)
    }
}

impl fmt::Display for TextStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.is_styled() {
            return f.write_str("none");
        }
        let mut parts: SmallVec<[String; 4]> = SmallVec::new();
        if self.attributes.contains(Attributes::BOLD) {
            parts.push("bold".to_string());
        }
        if self.attributes.contains(Attributes::UNDERLINE) {
            parts.push("underline".to_string());
        }
        if let Some(n) = self.foreground {
            parts.push(n.to_string());
        }
        if let Some(n) = self.background {
            parts.push(format!("on {n}"));
        }
        f.write_str(&parts.join(" "))
    }
}

impl FromStr for TextStyle {
    type Err = StyleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

const STANDARD_COLORS: [&str; 16] = [
    "black",
    "red",
    "green",
    "yellow",
    "blue",
    "magenta",
    "cyan",
    "white",
    "bright_black",
    "bright_red",
    "bright_green",
    "bright_yellow",
    "bright_blue",
    "bright_magenta",
    "bright_cyan",
    "bright_white",
];

fn parse_color(word: &str) -> Result<u8, StyleParseError> {
    static COLOR_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^color\((\d{1,3})\)$").expect("valid regex"));

    if let Some(idx) = STANDARD_COLORS.iter().position(|name| *name == word) {
        return u8::try_from(idx).map_err(|_| StyleParseError::UnknownToken(word.to_string()));
    }

    let digits = if let Some(caps) = COLOR_RE.captures(word) {
        caps.get(1).map_or("", |m| m.as_str())
    } else if word.chars().all(|c| c.is_ascii_digit()) {
        word
    } else {
        return Err(StyleParseError::UnknownToken(word.to_string()));
    };

    digits
        .parse::<u8>()
        .map_err(|_| StyleParseError::ColorOutOfRange(word.to_string()))
}

/// Error returned when a style definition cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StyleParseError {
    /// A word that is neither an attribute nor a color.
    UnknownToken(String),
    /// A color index outside `0..=255`.
    ColorOutOfRange(String),
    /// Structurally invalid definition.
    InvalidFormat(String),
}

impl fmt::Display for StyleParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownToken(token) => write!(f, "unknown style token: {token}"),
            Self::ColorOutOfRange(color) => {
                write!(f, "color index out of range (0-255): {color}")
            }
            Self::InvalidFormat(msg) => write!(f, "invalid style definition: {msg}"),
        }
    }
}

impl std::error::Error for StyleParseError {}
