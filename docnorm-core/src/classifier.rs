//! Numbering and bullet recognition for paragraph text.
//!
//! Recognizers are tried in declaration order and the first match wins, so
//! the order of [`NUMBERING_PATTERNS`] encodes priority: multi-level and mixed
//! markers sit ahead of the single-level markers they start with.

use crate::types::IndentLevel;
use lazy_static::lazy_static;
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NumberingPattern {
    MultiLevelMixed,
    MultiLevelDecimal,
    MultiLevelEastAsian,
    DecimalDot,
    DecimalParen,
    DecimalHyphen,
    DecimalColon,
    DecimalBracket,
    EastAsianDot,
    EastAsianComma,
    EastAsianParen,
    LowerAlphaDot,
    UpperAlphaDot,
    LowerAlphaParen,
    UpperAlphaParen,
    LowerRomanDot,
    UpperRomanDot,
    LowerRomanParen,
    UpperRomanParen,
    DecimalSlash,
    DecimalUnspaced,
}

impl NumberingPattern {
    pub fn id(self) -> &'static str {
        match self {
            Self::MultiLevelMixed => "multi_level_mixed",
            Self::MultiLevelDecimal => "multi_level_arabic",
            Self::MultiLevelEastAsian => "multi_level_chinese",
            Self::DecimalDot => "arabic_with_dot",
            Self::DecimalParen => "arabic_with_paren",
            Self::DecimalHyphen => "arabic_with_hyphen",
            Self::DecimalColon => "arabic_with_colon",
            Self::DecimalBracket => "arabic_with_bracket",
            Self::EastAsianDot => "chinese_with_dot",
            Self::EastAsianComma => "chinese_with_bracket",
            Self::EastAsianParen => "chinese_with_paren",
            Self::LowerAlphaDot => "lower_alpha_with_dot",
            Self::UpperAlphaDot => "upper_alpha_with_dot",
            Self::LowerAlphaParen => "lower_alpha_with_paren",
            Self::UpperAlphaParen => "upper_alpha_with_paren",
            Self::LowerRomanDot => "lower_roman_with_dot",
            Self::UpperRomanDot => "upper_roman_with_dot",
            Self::LowerRomanParen => "lower_roman_with_paren",
            Self::UpperRomanParen => "upper_roman_with_paren",
            Self::DecimalSlash => "number_with_slash",
            Self::DecimalUnspaced => "number_with_period",
        }
    }

    /// Decimal and East-Asian markers are primary, letters and roman numerals secondary.
    pub fn indent_level(self) -> IndentLevel {
        match self {
            Self::LowerAlphaDot
            | Self::UpperAlphaDot
            | Self::LowerAlphaParen
            | Self::UpperAlphaParen
            | Self::LowerRomanDot
            | Self::UpperRomanDot
            | Self::LowerRomanParen
            | Self::UpperRomanParen => IndentLevel::Secondary,
            _ => IndentLevel::Primary,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerKind {
    Bullet,
    Numbering(NumberingPattern),
}

impl MarkerKind {
    pub fn id(self) -> &'static str {
        match self {
            Self::Bullet => "bullet",
            Self::Numbering(pattern) => pattern.id(),
        }
    }
}

/// A classified line: recognized marker prefix and trimmed remainder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineClassification<'a> {
    pub kind: MarkerKind,
    pub marker: &'a str,
    pub content: &'a str,
}

const EAST_ASIAN_NUMERALS: &str = "[一二三四五六七八九十]+";

lazy_static! {
    /// Numbering recognizers in priority order.
    pub static ref NUMBERING_PATTERNS: Vec<(NumberingPattern, Regex)> = {
        let cn = EAST_ASIAN_NUMERALS;
        vec![
            (NumberingPattern::MultiLevelMixed, r"^\s*(\d+)\.\s*\(([a-z])\)\s+".to_string()),
            (NumberingPattern::MultiLevelDecimal, r"^\s*(\d+\.\d+(?:\.\d+)*)\.?\s+".to_string()),
            (NumberingPattern::MultiLevelEastAsian, format!(r"^\s*({cn})、\s*(\d+)\.\s+")),
            (NumberingPattern::DecimalDot, r"^\s*(\d+)\.\s+".to_string()),
            (NumberingPattern::DecimalParen, r"^\s*(\d+)\)\s+".to_string()),
            (NumberingPattern::DecimalHyphen, r"^\s*(\d+)-\s+".to_string()),
            (NumberingPattern::DecimalColon, r"^\s*(\d+):\s+".to_string()),
            (NumberingPattern::DecimalBracket, r"^\s*\[(\d+)\]\s+".to_string()),
            (NumberingPattern::EastAsianDot, format!(r"^\s*({cn})\.\s+")),
            (NumberingPattern::EastAsianComma, format!(r"^\s*({cn})、\s*")),
            (NumberingPattern::EastAsianParen, format!(r"^\s*[(（]({cn})[)）]\s*")),
            (NumberingPattern::LowerAlphaDot, r"^\s*([a-z])\.\s+".to_string()),
            (NumberingPattern::UpperAlphaDot, r"^\s*([A-Z])\.\s+".to_string()),
            (NumberingPattern::LowerAlphaParen, r"^\s*([a-z])\)\s+".to_string()),
            (NumberingPattern::UpperAlphaParen, r"^\s*([A-Z])\)\s+".to_string()),
            (NumberingPattern::LowerRomanDot, r"^\s*([ivxlcdm]+)\.\s+".to_string()),
            (NumberingPattern::UpperRomanDot, r"^\s*([IVXLCDM]+)\.\s+".to_string()),
            (NumberingPattern::LowerRomanParen, r"^\s*([ivxlcdm]+)\)\s+".to_string()),
            (NumberingPattern::UpperRomanParen, r"^\s*([IVXLCDM]+)\)\s+".to_string()),
            (NumberingPattern::DecimalSlash, r"^\s*(\d+)/(\d+)\s+".to_string()),
            (NumberingPattern::DecimalUnspaced, r"^\s*(\d+)\.(\d+)\s+".to_string()),
        ]
        .into_iter()
        .map(|(pattern, source)| (pattern, Regex::new(&source).unwrap()))
        .collect()
    };

    /// Non-semantic bullet glyphs, each followed by whitespace.
    pub static ref BULLET_PATTERNS: Vec<Regex> = [
        "·", // mid-dot
        r"\*",
        "-",
        "•",
        "◦",
        "▪",
        "▫",
        "▸",
        "▶",
        "→",
        "⇒",
        "✓",
        "✗",
        "☑",
        "☒",
    ]
    .iter()
    .map(|glyph| Regex::new(&format!(r"^\s*{glyph}\s+")).unwrap())
    .collect();
}

/// Classifies one line of paragraph text.
///
/// Returns `None` for empty lines, for lines the caller tagged as headings,
/// and for lines without a recognized marker.
pub fn classify_line(text: &str, is_heading: bool) -> Option<LineClassification<'_>> {
    let line = text.trim();
    if line.is_empty() || is_heading {
        return None;
    }

    if let Some(found) = BULLET_PATTERNS.iter().find_map(|regex| regex.find(line)) {
        return Some(split(line, MarkerKind::Bullet, found.end()));
    }

    NUMBERING_PATTERNS.iter().find_map(|(pattern, regex)| {
        regex
            .find(line)
            .map(|found| split(line, MarkerKind::Numbering(*pattern), found.end()))
    })
}

fn split(line: &str, kind: MarkerKind, marker_end: usize) -> LineClassification<'_> {
    LineClassification {
        kind,
        marker: &line[..marker_end],
        content: line[marker_end..].trim(),
    }
}

/// Indentation tier used when a line is re-rendered as a list item.
pub fn indent_level_for(kind: MarkerKind) -> IndentLevel {
    match kind {
        MarkerKind::Bullet => IndentLevel::Primary,
        MarkerKind::Numbering(pattern) => pattern.indent_level(),
    }
}
