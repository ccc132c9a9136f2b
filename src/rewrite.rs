//! Pattern-rewrite engine for metric classnames

use crate::errors::{Result, WriterError};
use regex::{Captures, Regex};
use std::collections::BTreeMap;
use tracing::warn;

/// One flag attached to a rewrite rule
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RewriteFlag {
    /// `F`: destroy the point, nothing is written
    Forbid,
    /// `L`: accept the current classname and stop evaluating
    Last,
    /// `N`: restart the scan from the first rule
    NextRound,
    /// `T:name=value`: derive a label from the capture groups of the match
    TagExtract { name: String, value: String },
}

/// A compiled rewrite rule: pattern, replacement template and flags.
///
/// The pattern must match at the start of the classname for the rule to
/// apply; the substitution itself replaces every occurrence. Replacement and
/// label templates reference capture groups as `\1`, `\2`, ...
#[derive(Clone, Debug)]
pub struct RewriteRule {
    pattern: Regex,
    replacement: String,
    flags: Vec<RewriteFlag>,
}

impl RewriteRule {
    pub fn new(pattern: &str, replacement: &str, flags: Vec<RewriteFlag>) -> Result<Self> {
        let compiled = Regex::new(pattern).map_err(|err| {
            WriterError::Config(format!("invalid rewrite pattern {:?}: {}", pattern, err))
        })?;

        Ok(Self {
            pattern: compiled,
            replacement: to_dollar_template(replacement),
            flags,
        })
    }

    /// Build a rule from a `RewriteRule` config declaration: pattern,
    /// replacement and an optional comma-separated flag list. Malformed
    /// declarations are rejected with a warning.
    pub fn from_values(values: &[String]) -> Option<Self> {
        if values.len() != 2 && values.len() != 3 {
            warn!(?values, "Invalid RewriteRule declaration");
            return None;
        }

        let flags = match values.get(2) {
            Some(raw) => parse_flags(raw)?,
            None => Vec::new(),
        };

        match Self::new(&values[0], &values[1], flags) {
            Ok(rule) => Some(rule),
            Err(err) => {
                warn!(pattern = %values[0], error = %err, "Skipping unparseable rewrite rule");
                None
            }
        }
    }
}

fn parse_flags(raw: &str) -> Option<Vec<RewriteFlag>> {
    let mut flags = Vec::new();

    for token in raw.split(',').map(str::trim).filter(|t| !t.is_empty()) {
        match token {
            "F" => flags.push(RewriteFlag::Forbid),
            "L" => flags.push(RewriteFlag::Last),
            "N" => flags.push(RewriteFlag::NextRound),
            _ => {
                if let Some(rest) = token.strip_prefix("T:") {
                    match rest.split_once('=') {
                        Some((name, value)) => flags.push(RewriteFlag::TagExtract {
                            name: name.to_string(),
                            value: value.to_string(),
                        }),
                        None => {
                            warn!(flag = token, "Malformed T: flag, expected T:name=value");
                            return None;
                        }
                    }
                } else {
                    warn!(flag = token, "Unknown rewrite flag, ignoring");
                }
            }
        }
    }

    Some(flags)
}

/// Convert `\N` backreferences to the `${N}` form the regex engine expands,
/// escaping any literal `$` on the way.
fn to_dollar_template(template: &str) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '$' => out.push_str("$$"),
            '\\' => {
                let mut digits = String::new();
                while let Some(&d) = chars.peek() {
                    if d.is_ascii_digit() {
                        digits.push(d);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if digits.is_empty() {
                    out.push('\\');
                } else {
                    out.push_str("${");
                    out.push_str(&digits);
                    out.push('}');
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Expand `\N` backreferences in a label template against a concrete match
fn expand_backrefs(template: &str, caps: &Captures<'_>) -> Result<String> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }

        let mut digits = String::new();
        while let Some(&d) = chars.peek() {
            if d.is_ascii_digit() {
                digits.push(d);
                chars.next();
            } else {
                break;
            }
        }

        if digits.is_empty() {
            out.push('\\');
            continue;
        }

        let group: usize = digits.parse().unwrap_or(usize::MAX);
        match caps.get(group) {
            Some(m) => out.push_str(m.as_str()),
            None => return Err(WriterError::UnknownCaptureGroup(group)),
        }
    }

    Ok(out)
}

/// The accepted outcome of a rewrite: final classname plus derived labels
#[derive(Clone, Debug, PartialEq)]
pub struct Rewrite {
    pub classname: String,
    pub labels: BTreeMap<String, String>,
}

/// Evaluates an ordered rule list against candidate classnames.
///
/// Evaluation runs in rounds over the rule list, bounded by the configured
/// round limit. Within a round the first matching rule that sets `L` or `N`
/// wins; a matching rule that sets neither lets the scan continue with the
/// remaining rules of the same round. A round in which no rule matches
/// accepts the current classname.
#[derive(Debug)]
pub struct RewriteEngine {
    rules: Vec<RewriteRule>,
    round_limit: usize,
}

impl RewriteEngine {
    pub fn new(rules: Vec<RewriteRule>, round_limit: usize) -> Self {
        Self { rules, round_limit }
    }

    /// Rewrite one classname. Returns the final classname and any extracted
    /// labels, or `None` when a rule forbids the point.
    pub fn rewrite(&self, classname: &str) -> Result<Option<Rewrite>> {
        let mut classname = classname.to_string();
        let mut labels = BTreeMap::new();

        if self.rules.is_empty() {
            return Ok(Some(Rewrite { classname, labels }));
        }

        for _ in 0..self.round_limit {
            let mut last = false;
            let mut next_round = false;
            let mut interrupted = false;

            for rule in &self.rules {
                last = false;
                next_round = false;

                // Anchored match test: the leftmost match must sit at the
                // start of the classname.
                let caps = rule
                    .pattern
                    .captures(&classname)
                    .filter(|caps| caps.get(0).is_some_and(|m| m.start() == 0));

                if let Some(caps) = caps {
                    let rewritten = rule
                        .pattern
                        .replace_all(&classname, rule.replacement.as_str())
                        .into_owned();

                    for flag in &rule.flags {
                        match flag {
                            RewriteFlag::Forbid => return Ok(None),
                            RewriteFlag::Last => last = true,
                            RewriteFlag::NextRound => next_round = true,
                            RewriteFlag::TagExtract { name, value } => {
                                // Templates resolve against the match on the
                                // pre-substitution classname.
                                let name = expand_backrefs(name, &caps)?;
                                let value = expand_backrefs(value, &caps)?;
                                labels.insert(name, value);
                            }
                        }
                    }

                    classname = rewritten;
                }

                if last || next_round {
                    interrupted = true;
                    break;
                }
            }

            if !interrupted {
                // Reached the end of the rule list: implicit last
                last = true;
            }

            if last && next_round {
                return Err(WriterError::ConflictingFlags);
            }
            if last {
                return Ok(Some(Rewrite { classname, labels }));
            }
        }

        Err(WriterError::RewriteLimitExceeded(self.round_limit))
    }
}
