//! Syntax highlighting of message text.
//!
//! Highlighting runs in two passes over the raw text. The first classifies
//! single characters (operators, brackets, punctuation, digits). The second
//! finds whole keywords and overrides the character styles underneath them.
//! Consecutive characters with the same style are painted as one run.

use std::collections::BTreeMap;

use crate::style::{RESET, TextStyle};
use crate::theme::Theme;

/// Keywords highlighted with the theme's `keyword` style.
pub const BUILTIN_KEYWORDS: [&str; 5] = ["virtual", "const", "true", "false", "inf"];

/// User-registered keywords with the style captured when they were added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordTable {
    custom: BTreeMap<String, TextStyle>,
}

impl KeywordTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `keyword` with `style`.
    ///
    /// Returns false (and changes nothing) if the keyword is built in or
    /// already registered.
    pub fn insert(&mut self, keyword: impl Into<String>, style: TextStyle) -> bool {
        let keyword = keyword.into();
        if keyword.is_empty()
            || BUILTIN_KEYWORDS.contains(&keyword.as_str())
            || self.custom.contains_key(&keyword)
        {
            return false;
        }
        self.custom.insert(keyword, style);
        true
    }

    #[must_use]
    pub fn get(&self, keyword: &str) -> Option<TextStyle> {
        self.custom.get(keyword).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.custom.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.custom.is_empty()
    }

    /// Built-in and custom keywords in lexicographic order with their styles.
    fn resolved(&self, theme: &Theme) -> BTreeMap<&str, TextStyle> {
        let mut all: BTreeMap<&str, TextStyle> = BUILTIN_KEYWORDS
            .iter()
            .map(|keyword| (*keyword, theme.keyword))
            .collect();
        for (keyword, style) in &self.custom {
            all.entry(keyword.as_str()).or_insert(*style);
        }
        all
    }
}

/// Style of the character at `idx` according to the single-character rules.
fn classify(theme: &Theme, chars: &[char], idx: usize) -> Option<TextStyle> {
    let prev = |back: usize| idx.checked_sub(back).map(|i| chars[i]);
    let style = match chars[idx] {
        '=' | '>' | '<' | '!' => theme.assignment_comparison,
        '(' | ')' => theme.round_parentheses,
        '[' | ']' => theme.square_parentheses,
        '{' | '}' => theme.curly_parentheses,
        ':' => theme.colon,
        ',' => theme.comma,
        '@' => theme.at,
        '.' if prev(1).is_some_and(|c| c.is_ascii_digit()) => theme.number,
        '0'..='9' => {
            // Identifiers ending with up to two digits stay plain (`x1`, `x11`).
            let after_letter = match (prev(1), prev(2)) {
                (Some(p), _) if p.is_alphabetic() => true,
                (Some(p), Some(pp)) if p.is_ascii_digit() && pp.is_alphabetic() => true,
                _ => false,
            };
            if after_letter {
                return None;
            }
            theme.number
        }
        '+' | '-' | '*' | '/' | '\\' | '^' | '|' | '&' | '%' => theme.miscellaneous_operator,
        _ => return None,
    };
    Some(style)
}

/// Apply `theme` and `keywords` to `text`.
///
/// Returns `text` unchanged when the theme has no style.
#[must_use]
pub fn highlight(text: &str, theme: &Theme, keywords: &KeywordTable) -> String {
    if !theme.has_style() {
        return text.to_string();
    }

    let chars: Vec<char> = text.chars().collect();
    let mut styles: Vec<Option<TextStyle>> =
        (0..chars.len()).map(|idx| classify(theme, &chars, idx)).collect();

    let byte_to_char: BTreeMap<usize, usize> = text
        .char_indices()
        .enumerate()
        .map(|(char_idx, (byte_idx, _))| (byte_idx, char_idx))
        .collect();
    let mut claimed = vec![false; chars.len()];

    for (keyword, style) in keywords.resolved(theme) {
        let kw_len = keyword.chars().count();
        for (byte_idx, _) in text.match_indices(keyword) {
            let Some(&start) = byte_to_char.get(&byte_idx) else {
                continue;
            };
            let end = start + kw_len;
            let bordered_before = start > 0 && chars[start - 1].is_alphanumeric();
            let bordered_after = end < chars.len() && chars[end].is_alphanumeric();
            if bordered_before || bordered_after || claimed[start..end].iter().any(|c| *c) {
                continue;
            }
            for idx in start..end {
                claimed[idx] = true;
                styles[idx] = style.is_styled().then_some(style);
            }
        }
    }

    paint_runs(&chars, &styles)
}

fn paint_runs(chars: &[char], styles: &[Option<TextStyle>]) -> String {
    let mut out = String::with_capacity(chars.len() * 2);
    let mut idx = 0;
    while idx < chars.len() {
        let style = styles[idx];
        let run_end = (idx..chars.len())
            .find(|&j| styles[j] != style)
            .unwrap_or(chars.len());
        match style.filter(TextStyle::is_styled) {
            Some(style) => {
                out.push_str(&style.prefix());
                out.extend(&chars[idx..run_end]);
                out.push_str(RESET);
            }
            None => out.extend(&chars[idx..run_end]),
        }
        idx = run_end;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::palette::{BRIGHT_ORANGE, CREAM, DARK_GREY, LIGHT_BROWN};

    fn fg(n: u8) -> String {
        format!("\x1b[38;5;{n}m")
    }

    #[test]
    fn test_unstyled_theme_is_pass_through() {
        let text = "x0 = [1, 2] && true";
        assert_eq!(highlight(text, &Theme::none(), &KeywordTable::new()), text);
    }

    #[test]
    fn test_numbers_and_operators() {
        let out = highlight("x0=2.0^3", &Theme::dark(), &KeywordTable::new());
        let expected = format!(
            "x0{}={RESET}{}2.0{RESET}{}^{RESET}{}3{RESET}",
            fg(BRIGHT_ORANGE),
            fg(CREAM),
            fg(LIGHT_BROWN),
            fg(CREAM)
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn test_two_digit_identifier_is_plain() {
        let out = highlight("x11", &Theme::dark(), &KeywordTable::new());
        assert_eq!(out, "x11");
        let out = highlight("x111", &Theme::dark(), &KeywordTable::new());
        assert_eq!(out, format!("x11{}1{RESET}", fg(CREAM)));
    }

    #[test]
    fn test_dot_after_letter_is_plain() {
        assert_eq!(highlight("a.b", &Theme::dark(), &KeywordTable::new()), "a.b");
    }

    #[test]
    fn test_keywords_only_when_not_bordered() {
        let theme = Theme::dark();
        let out = highlight("constant const", &theme, &KeywordTable::new());
        assert_eq!(out, format!("constant {}const{RESET}", fg(DARK_GREY)));
        assert_eq!(highlight("infinity", &theme, &KeywordTable::new()), "infinity");
    }

    #[test]
    fn test_keyword_after_operator_is_styled() {
        let out = highlight("=true", &Theme::dark(), &KeywordTable::new());
        assert_eq!(
            out,
            format!("{}={RESET}{}true{RESET}", fg(BRIGHT_ORANGE), fg(DARK_GREY))
        );
    }

    #[test]
    fn test_custom_keywords_use_captured_style() {
        let mut keywords = KeywordTable::new();
        assert!(keywords.insert("Real", TextStyle::fg(27).bold()));
        assert!(!keywords.insert("Real", TextStyle::fg(1)));
        assert!(!keywords.insert("const", TextStyle::fg(1)));
        assert_eq!(keywords.len(), 1);

        let out = highlight("Real x", &Theme::dark(), &keywords);
        assert_eq!(out, format!("\x1b[38;5;27m\x1b[1mReal{RESET} x"));
    }

    #[test]
    fn test_custom_keywords_inactive_without_theme_style() {
        let mut keywords = KeywordTable::new();
        keywords.insert("Real", TextStyle::fg(27));
        assert_eq!(highlight("Real", &Theme::none(), &keywords), "Real");
    }

    #[test]
    fn test_multibyte_text_is_preserved() {
        let out = highlight("温度=30°", &Theme::dark(), &KeywordTable::new());
        assert!(out.starts_with("温度"));
        assert!(out.ends_with('°'));
    }
}
