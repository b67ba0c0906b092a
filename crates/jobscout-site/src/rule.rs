//! Selector rules.
//!
//! A rule is a CSS selector optionally followed by a pseudo-element naming
//! what to read from the matched element:
//!
//! - `a.title::text` reads the element's own text nodes
//! - `a.title::attr(href)` reads an attribute
//! - `a.title` reads all descendant text
//!
//! Selector groups are allowed when every member names the same target,
//! e.g. `div.summary::text, p::text`.

use crate::error::{Result, SiteError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const TEXT_SUFFIX: &str = "::text";
const ATTR_PREFIX: &str = "::attr(";

/// What a rule reads from the element it matches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RuleTarget {
    /// Direct child text nodes of the element
    OwnText,
    /// All descendant text, whitespace collapsed
    Text,
    /// Value of the named attribute
    Attr(String),
}

/// A parsed selector rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SelectorRule {
    css: String,
    target: RuleTarget,
    source: String,
}

impl SelectorRule {
    /// Parse a rule string.
    pub fn parse(rule: &str) -> Result<Self> {
        let source = rule.trim();
        let invalid = |reason: &str| SiteError::InvalidRule {
            rule: source.to_string(),
            reason: reason.to_string(),
        };

        let mut css_parts = Vec::new();
        let mut target: Option<RuleTarget> = None;

        for part in split_selector_group(source) {
            let (css, part_target) = split_pseudo_element(part).map_err(|r| invalid(&r))?;
            if css.is_empty() {
                return Err(invalid("empty CSS selector"));
            }

            match &target {
                Some(existing) if *existing != part_target => {
                    return Err(invalid("selector group mixes different targets"));
                }
                Some(_) => {}
                None => target = Some(part_target),
            }
            css_parts.push(css);
        }

        let target = target.ok_or_else(|| invalid("empty CSS selector"))?;

        Ok(Self {
            css: css_parts.join(", "),
            target,
            source: source.to_string(),
        })
    }

    /// CSS selector with pseudo-elements removed.
    #[must_use]
    pub fn css(&self) -> &str {
        &self.css
    }

    /// What the rule reads.
    #[must_use]
    pub fn target(&self) -> &RuleTarget {
        &self.target
    }

    /// The rule as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }
}

impl FromStr for SelectorRule {
    type Err = SiteError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SelectorRule {
    type Error = SiteError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<SelectorRule> for String {
    fn from(rule: SelectorRule) -> Self {
        rule.source
    }
}

impl fmt::Display for SelectorRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split `a, b::text` on top-level commas, ignoring commas inside quotes,
/// brackets and parentheses.
fn split_selector_group(group: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (i, c) in group.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '[' | '(') => depth += 1,
            (None, ']' | ')') => depth = depth.saturating_sub(1),
            (None, ',') if depth == 0 => {
                parts.push(group[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(group[start..].trim());
    parts
}

fn split_pseudo_element(part: &str) -> std::result::Result<(String, RuleTarget), String> {
    if let Some(css) = part.strip_suffix(TEXT_SUFFIX) {
        return Ok((css.trim().to_string(), RuleTarget::OwnText));
    }

    if let Some(idx) = part.rfind(ATTR_PREFIX) {
        let rest = &part[idx + ATTR_PREFIX.len()..];
        let name = rest
            .strip_suffix(')')
            .ok_or_else(|| "unterminated ::attr(...)".to_string())?
            .trim();
        if name.is_empty() {
            return Err("::attr() needs an attribute name".to_string());
        }
        return Ok((part[..idx].trim().to_string(), RuleTarget::Attr(name.to_string())));
    }

    if part.contains("::") {
        return Err("unsupported pseudo-element (expected ::text or ::attr(name))".to_string());
    }

    Ok((part.to_string(), RuleTarget::Text))
}
