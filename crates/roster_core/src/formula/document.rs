//! Line-oriented parser for the formula text document.
//!
//! ```text
//! Quarterbacks
//!
//! Throw Power
//!
//! =PRODUCT(THP4*0.8+STR4*0.2)
//! ```
//!
//! A letter-only line followed by a blank line is either a rating name (when
//! the next non-blank line starts with `=`) or a position heading (when the
//! next non-blank line is another letter-only line, or nothing).
//!
//! Right after a heading with no ratings yet, a name line followed by another
//! name line is ambiguous. It opens a new section only when it is a known
//! heading; otherwise it is a rating without a formula and is skipped.

use crate::config::{default_config, EngineConfig};
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RatingFormula {
    /// Normalized rating name (`ThrowPower`).
    pub name: String,
    /// Formula text as written, leading `=` included.
    pub formula: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PositionSection {
    pub heading: String,
    pub ratings: Vec<RatingFormula>,
}

/// A line the parser could not place, kept for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedLine {
    pub line_no: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormulaDocument {
    pub sections: Vec<PositionSection>,
    pub skipped: Vec<SkippedLine>,
}

impl FormulaDocument {
    /// Parse with the headings known to the built-in configuration.
    pub fn parse(text: &str) -> Self {
        Self::parse_with_config(text, default_config())
    }

    pub fn parse_with_config(text: &str, config: &EngineConfig) -> Self {
        Self::parse_with_headings(text, |heading| config.is_section_heading(heading))
    }

    pub fn parse_with_headings(text: &str, known_heading: impl Fn(&str) -> bool) -> Self {
        let lines: Vec<&str> = text.lines().collect();
        let mut doc = FormulaDocument::default();
        let mut i = 0;

        while i < lines.len() {
            let line = lines[i];

            if is_blank(line) {
                i += 1;
                continue;
            }

            let followed_by_blank = lines.get(i + 1).map(|l| is_blank(l)).unwrap_or(false);
            if !is_name_line(line) || !followed_by_blank {
                doc.skip(i, line);
                i += 1;
                continue;
            }

            let next = (i + 1..lines.len()).find(|&j| !is_blank(lines[j]));
            match next {
                Some(j) if lines[j].trim_start().starts_with('=') => {
                    let rating = RatingFormula {
                        name: normalize_rating_name(line),
                        formula: lines[j].trim().to_string(),
                    };
                    match doc.sections.last_mut() {
                        Some(section) => section.insert(rating),
                        None => {
                            debug!("Rating '{}' appears before any position heading", rating.name);
                            doc.skip(i, line);
                            doc.skip(j, lines[j]);
                        }
                    }
                    i = j + 1;
                }
                Some(j) if !is_name_line(lines[j]) => {
                    // A name without a formula: the block is malformed.
                    debug!("Skipping malformed rating block '{}' at line {}", line.trim(), i + 1);
                    doc.skip(i, line);
                    i += 1;
                }
                _ => {
                    let heading = line.trim();
                    let awaiting_ratings = doc.sections.last().is_some_and(|s| s.ratings.is_empty());
                    if awaiting_ratings && !known_heading(heading) {
                        debug!("Rating '{}' at line {} has no formula", heading, i + 1);
                        doc.skip(i, line);
                    } else {
                        doc.sections.push(PositionSection { heading: heading.to_string(), ratings: Vec::new() });
                    }
                    i += 1;
                }
            }
        }

        doc
    }

    fn skip(&mut self, index: usize, line: &str) {
        self.skipped.push(SkippedLine { line_no: index + 1, text: line.trim().to_string() });
    }

    pub fn rating_count(&self) -> usize {
        self.sections.iter().map(|s| s.ratings.len()).sum()
    }
}

impl PositionSection {
    /// Insert or replace a rating, keeping first-seen order.
    fn insert(&mut self, rating: RatingFormula) {
        match self.ratings.iter_mut().find(|r| r.name == rating.name) {
            Some(existing) => *existing = rating,
            None => self.ratings.push(rating),
        }
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

fn is_name_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_alphabetic() || c.is_whitespace())
}

/// `"throw  POWER"` → `"ThrowPower"`.
pub fn normalize_rating_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut word_start = true;
    for c in name.trim().chars() {
        if c.is_whitespace() {
            word_start = true;
            continue;
        }
        if word_start {
            out.extend(c.to_uppercase());
        } else {
            out.extend(c.to_lowercase());
        }
        word_start = false;
    }
    out
}
