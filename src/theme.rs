//! Themes: one [`TextStyle`] per syntax category of rendered text.
//!
//! Three themes are built in: [`Theme::none`] (no escape codes at all),
//! [`Theme::dark`] for terminals with a black background and
//! [`Theme::light`] for a white background. Custom themes can be written
//! field by field or loaded from an ini file with a `[theme]` section:
//!
//! ```ini
//! [theme]
//! number = 223
//! keyword = bold 208
//! ```

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::style::palette::{
    BRIGHT_ORANGE, CREAM, DARK_BROWN, DARK_GREY, DARK_ORANGE, LIGHT_BROWN, OBSIDIAN,
};
use crate::style::{StyleParseError, TextStyle};

/// Syntax categories a theme assigns styles to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThemeCategory {
    LevelNumber,
    LevelShownSeparator,
    LevelHiddenSeparator,
    MultilineSeparator,
    AssignmentComparison,
    MiscellaneousOperator,
    RoundParentheses,
    SquareParentheses,
    CurlyParentheses,
    Colon,
    Comma,
    Number,
    At,
    Keyword,
}

impl ThemeCategory {
    pub const ALL: [Self; 14] = [
        Self::LevelNumber,
        Self::LevelShownSeparator,
        Self::LevelHiddenSeparator,
        Self::MultilineSeparator,
        Self::AssignmentComparison,
        Self::MiscellaneousOperator,
        Self::RoundParentheses,
        Self::SquareParentheses,
        Self::CurlyParentheses,
        Self::Colon,
        Self::Comma,
        Self::Number,
        Self::At,
        Self::Keyword,
    ];

    /// Key used in theme ini files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::LevelNumber => "level_number",
            Self::LevelShownSeparator => "level_shown_separator",
            Self::LevelHiddenSeparator => "level_hidden_separator",
            Self::MultilineSeparator => "multiline_separator",
            Self::AssignmentComparison => "assignment_comparison",
            Self::MiscellaneousOperator => "miscellaneous_operator",
            Self::RoundParentheses => "round_parentheses",
            Self::SquareParentheses => "square_parentheses",
            Self::CurlyParentheses => "curly_parentheses",
            Self::Colon => "colon",
            Self::Comma => "comma",
            Self::Number => "number",
            Self::At => "at",
            Self::Keyword => "keyword",
        }
    }

    /// Glyphs shown for this category in the theme showcase.
    #[must_use]
    pub const fn sample(self) -> &'static str {
        match self {
            Self::LevelNumber => "1 2 3",
            Self::LevelShownSeparator | Self::LevelHiddenSeparator => "|",
            Self::MultilineSeparator => "·",
            Self::AssignmentComparison => "= < > !",
            Self::MiscellaneousOperator => "+ - * / \\ ^ | & %",
            Self::RoundParentheses => "( )",
            Self::SquareParentheses => "[ ]",
            Self::CurlyParentheses => "{ }",
            Self::Colon => ":",
            Self::Comma => ",",
            Self::Number => "0 1.5 42",
            Self::At => "@",
            Self::Keyword => "virtual const true false inf",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|category| category.name() == name)
    }
}

/// A complete assignment of styles to syntax categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Theme {
    pub level_number: TextStyle,
    pub level_shown_separator: TextStyle,
    pub level_hidden_separator: TextStyle,
    pub multiline_separator: TextStyle,
    pub assignment_comparison: TextStyle,
    pub miscellaneous_operator: TextStyle,
    pub round_parentheses: TextStyle,
    pub square_parentheses: TextStyle,
    pub curly_parentheses: TextStyle,
    pub colon: TextStyle,
    pub comma: TextStyle,
    pub number: TextStyle,
    pub at: TextStyle,
    pub keyword: TextStyle,
}

impl Theme {
    /// Theme without any style; rendering emits plain text.
    #[must_use]
    pub const fn none() -> Self {
        Self::from_foregrounds([None; 14])
    }

    /// Theme for terminals with a dark background.
    #[must_use]
    pub const fn dark() -> Self {
        Self::from_foregrounds([
            Some(BRIGHT_ORANGE),
            Some(BRIGHT_ORANGE),
            Some(DARK_GREY),
            Some(DARK_GREY),
            Some(BRIGHT_ORANGE),
            Some(LIGHT_BROWN),
            Some(DARK_ORANGE),
            Some(DARK_GREY),
            Some(LIGHT_BROWN),
            Some(LIGHT_BROWN),
            Some(DARK_GREY),
            Some(CREAM),
            Some(DARK_GREY),
            Some(DARK_GREY),
        ])
    }

    /// Theme for terminals with a light background.
    #[must_use]
    pub const fn light() -> Self {
        Self::from_foregrounds([
            Some(BRIGHT_ORANGE),
            Some(BRIGHT_ORANGE),
            Some(DARK_GREY),
            Some(DARK_GREY),
            Some(DARK_BROWN),
            Some(DARK_BROWN),
            Some(DARK_GREY),
            Some(OBSIDIAN),
            Some(LIGHT_BROWN),
            Some(LIGHT_BROWN),
            Some(OBSIDIAN),
            Some(DARK_ORANGE),
            Some(DARK_GREY),
            Some(DARK_GREY),
        ])
    }

    // Order follows `ThemeCategory::ALL`.
    const fn from_foregrounds(colors: [Option<u8>; 14]) -> Self {
        const fn style(color: Option<u8>) -> TextStyle {
            match color {
                Some(c) => TextStyle::fg(c),
                None => TextStyle::none(),
            }
        }
        Self {
            level_number: style(colors[0]),
            level_shown_separator: style(colors[1]),
            level_hidden_separator: style(colors[2]),
            multiline_separator: style(colors[3]),
            assignment_comparison: style(colors[4]),
            miscellaneous_operator: style(colors[5]),
            round_parentheses: style(colors[6]),
            square_parentheses: style(colors[7]),
            curly_parentheses: style(colors[8]),
            colon: style(colors[9]),
            comma: style(colors[10]),
            number: style(colors[11]),
            at: style(colors[12]),
            keyword: style(colors[13]),
        }
    }

    /// The style assigned to `category`.
    #[must_use]
    pub const fn get(&self, category: ThemeCategory) -> TextStyle {
        match category {
            ThemeCategory::LevelNumber => self.level_number,
            ThemeCategory::LevelShownSeparator => self.level_shown_separator,
            ThemeCategory::LevelHiddenSeparator => self.level_hidden_separator,
            ThemeCategory::MultilineSeparator => self.multiline_separator,
            ThemeCategory::AssignmentComparison => self.assignment_comparison,
            ThemeCategory::MiscellaneousOperator => self.miscellaneous_operator,
            ThemeCategory::RoundParentheses => self.round_parentheses,
            ThemeCategory::SquareParentheses => self.square_parentheses,
            ThemeCategory::CurlyParentheses => self.curly_parentheses,
            ThemeCategory::Colon => self.colon,
            ThemeCategory::Comma => self.comma,
            ThemeCategory::Number => self.number,
            ThemeCategory::At => self.at,
            ThemeCategory::Keyword => self.keyword,
        }
    }

    /// Replace the style assigned to `category`.
    pub fn set(&mut self, category: ThemeCategory, style: TextStyle) {
        let slot = match category {
            ThemeCategory::LevelNumber => &mut self.level_number,
            ThemeCategory::LevelShownSeparator => &mut self.level_shown_separator,
            ThemeCategory::LevelHiddenSeparator => &mut self.level_hidden_separator,
            ThemeCategory::MultilineSeparator => &mut self.multiline_separator,
            ThemeCategory::AssignmentComparison => &mut self.assignment_comparison,
            ThemeCategory::MiscellaneousOperator => &mut self.miscellaneous_operator,
            ThemeCategory::RoundParentheses => &mut self.round_parentheses,
            ThemeCategory::SquareParentheses => &mut self.square_parentheses,
            ThemeCategory::CurlyParentheses => &mut self.curly_parentheses,
            ThemeCategory::Colon => &mut self.colon,
            ThemeCategory::Comma => &mut self.comma,
            ThemeCategory::Number => &mut self.number,
            ThemeCategory::At => &mut self.at,
            ThemeCategory::Keyword => &mut self.keyword,
        };
        *slot = style;
    }

    /// True if any category carries a style.
    #[must_use]
    pub fn has_style(&self) -> bool {
        ThemeCategory::ALL
            .into_iter()
            .any(|category| self.get(category).is_styled())
    }

    /// The contents of an ini theme file describing this theme.
    #[must_use]
    pub fn config(&self) -> String {
        let mut out = String::from("[theme]\n");
        for category in ThemeCategory::ALL {
            out.push_str(category.name());
            out.push_str(" = ");
            out.push_str(&self.get(category).to_string());
            out.push('\n');
        }
        out
    }

    /// Parse an ini theme definition on top of `base`.
    ///
    /// Only the `[theme]` section is read; categories it does not mention
    /// keep the style from `base`.
    ///
    /// # Errors
    ///
    /// Fails if the section is missing, a line is malformed, a category is
    /// unknown or repeated, or a style definition does not parse.
    pub fn from_ini_str(contents: &str, base: Theme) -> Result<Self, ThemeError> {
        let mut theme = base;
        let mut in_theme = false;
        let mut seen_section = false;
        let mut seen: Vec<ThemeCategory> = Vec::new();

        for (line_no, raw_line) in contents.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }

            if line.starts_with('[') && line.ends_with(']') {
                in_theme = line[1..line.len() - 1].trim().eq_ignore_ascii_case("theme");
                seen_section |= in_theme;
                continue;
            }
            if !in_theme {
                continue;
            }

            let invalid_line = || ThemeError::InvalidIniLine {
                line_no: line_no + 1,
                line: raw_line.to_string(),
            };
            let (name, definition) = line.split_once('=').ok_or_else(invalid_line)?;
            let name = name.trim().to_lowercase();
            if name.is_empty() {
                return Err(invalid_line());
            }
            let category = ThemeCategory::from_name(&name)
                .ok_or_else(|| ThemeError::UnknownCategory(name.clone()))?;
            if seen.contains(&category) {
                return Err(ThemeError::DuplicateIniKey {
                    line_no: line_no + 1,
                    name,
                });
            }
            seen.push(category);

            let style = TextStyle::parse(definition)
                .map_err(|err| ThemeError::InvalidStyle { name, err })?;
            theme.set(category, style);
        }

        if !seen_section {
            return Err(ThemeError::MissingThemeSection);
        }
        Ok(theme)
    }

    /// Read an ini theme file from disk on top of `base`.
    ///
    /// # Errors
    ///
    /// See [`Theme::from_ini_str`]; additionally fails if the file cannot be read.
    pub fn read(path: impl AsRef<Path>, base: Theme) -> Result<Self, ThemeError> {
        let contents = fs::read_to_string(&path).map_err(|err| ThemeError::Io {
            path: path.as_ref().to_path_buf(),
            err,
        })?;
        Self::from_ini_str(&contents, base)
    }
}

/// Showcase of every category painted with its style.
impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for category in ThemeCategory::ALL {
            writeln!(
                f,
                "{:<24}{}",
                category.name(),
                self.get(category).paint(category.sample())
            )?;
        }
        Ok(())
    }
}

/// Built-in themes by name: `none`, `dark` or `light`.
impl FromStr for Theme {
    type Err = ThemeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" => Ok(Self::none()),
            "dark" => Ok(Self::dark()),
            "light" => Ok(Self::light()),
            other => Err(ThemeError::UnknownTheme(other.to_string())),
        }
    }
}

/// Errors returned when building a theme from text.
#[derive(Debug)]
pub enum ThemeError {
    Io { path: PathBuf, err: std::io::Error },
    MissingThemeSection,
    InvalidIniLine { line_no: usize, line: String },
    DuplicateIniKey { line_no: usize, name: String },
    UnknownCategory(String),
    UnknownTheme(String),
    InvalidStyle { name: String, err: StyleParseError },
}

impl fmt::Display for ThemeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, err } => {
                write!(f, "failed to read theme file {}: {err}", path.display())
            }
            Self::MissingThemeSection => write!(f, "theme ini is missing a [theme] section"),
            Self::InvalidIniLine { line_no, line } => {
                write!(f, "invalid theme ini line {line_no}: {line:?}")
            }
            Self::DuplicateIniKey { line_no, name } => {
                write!(f, "duplicate theme key {name:?} at line {line_no}")
            }
            Self::UnknownCategory(name) => write!(f, "unknown theme category {name:?}"),
            Self::UnknownTheme(name) => write!(f, "unknown built-in theme {name:?}"),
            Self::InvalidStyle { name, err } => {
                write!(f, "invalid style definition for theme key {name:?}: {err}")
            }
        }
    }
}

impl std::error::Error for ThemeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { err, .. } => Some(err as &(dyn std::error::Error + 'static)),
            Self::InvalidStyle { err, .. } => Some(err as &(dyn std::error::Error + 'static)),
            _ => None,
        }
    }
}
