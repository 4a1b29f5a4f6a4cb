use std::fmt;

use regex::Regex;
use scrape_logging::{scrape_debug, scrape_warn};
use scraper::{Html, Selector};
use serde_json::Value;

use crate::{ExtractedPayload, ExtractionContext, ExtractionError};

const TRUNCATED_MARKER: &str = "...[truncated]";
pub const DEFAULT_SNIPPET_LEN: usize = 500;

/// One way of finding a JSON payload inside an HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorCandidate {
    /// Text content of the first element matching a CSS selector,
    /// e.g. `script#__UNIVERSAL_DATA_FOR_REHYDRATION__`.
    Css(String),
    /// Object literal assigned to `window.<name>` inside an inline script.
    GlobalAssignment(String),
    /// First capture group (or whole match) of a regular expression.
    Pattern(String),
}

impl SelectorCandidate {
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css(selector.into())
    }

    pub fn global(name: impl Into<String>) -> Self {
        Self::GlobalAssignment(name.into())
    }

    pub fn pattern(pattern: impl Into<String>) -> Self {
        Self::Pattern(pattern.into())
    }
}

impl fmt::Display for SelectorCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectorCandidate::Css(selector) => write!(f, "css:{selector}"),
            SelectorCandidate::GlobalAssignment(name) => write!(f, "window.{name}"),
            SelectorCandidate::Pattern(pattern) => write!(f, "pattern:{pattern}"),
        }
    }
}

pub trait Locator: Send + Sync {
    fn locate(&self, html: &str) -> Result<ExtractedPayload, ExtractionError>;
}

/// Tries an ordered list of candidates and keeps the first parseable payload.
///
/// Selectors and patterns are compiled once, when the locator is built.
#[derive(Debug, Clone)]
pub struct CandidateLocator {
    candidates: Vec<SelectorCandidate>,
    matchers: Vec<Matcher>,
    snippet_len: Option<usize>,
}

impl CandidateLocator {
    pub fn new(candidates: Vec<SelectorCandidate>) -> Self {
        let matchers = candidates.iter().map(Matcher::compile).collect();
        Self {
            candidates,
            matchers,
            snippet_len: Some(DEFAULT_SNIPPET_LEN),
        }
    }

    /// `None` disables the HTML snippet in failures.
    pub fn with_snippet_len(mut self, snippet_len: Option<usize>) -> Self {
        self.snippet_len = snippet_len;
        self
    }

    pub fn candidates(&self) -> &[SelectorCandidate] {
        &self.candidates
    }
}

impl Locator for CandidateLocator {
    fn locate(&self, html: &str) -> Result<ExtractedPayload, ExtractionError> {
        locate_with(html, &self.candidates, &self.matchers, self.snippet_len)
    }
}

/// Compiled form of a [`SelectorCandidate`]. `None` marks an invalid one, which never matches.
#[derive(Debug, Clone)]
enum Matcher {
    Css(Option<Selector>),
    Global(Option<Regex>),
    Pattern(Option<Regex>),
}

impl Matcher {
    fn compile(candidate: &SelectorCandidate) -> Self {
        match candidate {
            SelectorCandidate::Css(selector) => Matcher::Css(
                Selector::parse(selector)
                    .map_err(|err| scrape_warn!("Invalid CSS selector {selector:?}: {err}"))
                    .ok(),
            ),
            SelectorCandidate::GlobalAssignment(name) => Matcher::Global(assignment_regex(name)),
            SelectorCandidate::Pattern(pattern) => Matcher::Pattern(
                Regex::new(pattern)
                    .map_err(|err| scrape_warn!("Invalid locator pattern {pattern:?}: {err}"))
                    .ok(),
            ),
        }
    }
}

/// Returns the first candidate payload that is non-empty and parses as a JSON object.
///
/// Compiles `candidates` on every call; build a [`CandidateLocator`] to reuse them.
pub fn locate(
    html: &str,
    candidates: &[SelectorCandidate],
) -> Result<ExtractedPayload, ExtractionError> {
    let matchers: Vec<Matcher> = candidates.iter().map(Matcher::compile).collect();
    locate_with(html, candidates, &matchers, Some(DEFAULT_SNIPPET_LEN))
}

fn locate_with(
    html: &str,
    candidates: &[SelectorCandidate],
    matchers: &[Matcher],
    snippet_len: Option<usize>,
) -> Result<ExtractedPayload, ExtractionError> {
    // Parsed lazily: regex-only candidate lists never build a DOM.
    let mut document: Option<Html> = None;

    for (candidate, matcher) in candidates.iter().zip(matchers) {
        let raw = match matcher {
            Matcher::Css(selector) => selector.as_ref().and_then(|selector| {
                let doc = document.get_or_insert_with(|| Html::parse_document(html));
                select_text(doc, selector)
            }),
            Matcher::Global(regex) => regex.as_ref().and_then(|re| assignment_after(html, re)),
            Matcher::Pattern(regex) => regex.as_ref().and_then(|re| first_capture(html, re)),
        };

        let Some(raw) = raw else {
            scrape_debug!("Locator candidate {candidate} matched nothing");
            continue;
        };
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            scrape_debug!("Locator candidate {candidate} matched empty content");
            continue;
        }

        match parse_payload(trimmed) {
            Ok(map) => {
                scrape_debug!(
                    "Locator candidate {candidate} yielded {} chars, {} top-level keys",
                    trimmed.len(),
                    map.len()
                );
                return Ok(ExtractedPayload::new(map, candidate.to_string()));
            }
            Err(reason) => {
                scrape_warn!("Locator candidate {candidate} rejected: {reason}");
            }
        }
    }

    if let Some(doc) = &document {
        scrape_debug!(
            "No payload found; first script ids: [{}]",
            script_ids(doc, 5).join(", ")
        );
    }

    let tried: Vec<String> = candidates.iter().map(ToString::to_string).collect();
    Err(ExtractionError::DataExtraction {
        message: format!("no embedded payload found (tried: {})", tried.join(", ")),
        context: ExtractionContext::Locator {
            candidates: tried,
            snippet: snippet_len.map(|len| diagnostic_snippet(html, len)),
        },
    })
}

fn parse_payload(raw: &str) -> Result<serde_json::Map<String, Value>, String> {
    let rewritten = rewrite_undefined(raw);
    match serde_json::from_str::<Value>(&rewritten) {
        Ok(Value::Object(map)) if !map.is_empty() => Ok(map),
        Ok(Value::Object(_)) => Err("empty object".to_string()),
        Ok(other) => Err(format!("expected a JSON object, found {}", json_type(&other))),
        Err(err) => Err(format!("invalid JSON: {err}")),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn select_text(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .map(|node| node.text().collect::<String>())
}

fn script_ids(doc: &Html, limit: usize) -> Vec<String> {
    let Ok(selector) = Selector::parse("script[id]") else {
        return Vec::new();
    };
    doc.select(&selector)
        .filter_map(|node| node.value().attr("id"))
        .take(limit)
        .map(ToOwned::to_owned)
        .collect()
}

fn first_capture(html: &str, regex: &Regex) -> Option<String> {
    let captures = regex.captures(html)?;
    captures
        .get(1)
        .or_else(|| captures.get(0))
        .map(|m| m.as_str().to_string())
}

fn assignment_regex(name: &str) -> Option<Regex> {
    let pattern = format!(r"window\.{}\s*=\s*", regex::escape(name));
    Regex::new(&pattern)
        .map_err(|err| scrape_warn!("Invalid global name {name:?}: {err}"))
        .ok()
}

fn assignment_after(html: &str, regex: &Regex) -> Option<String> {
    let found = regex
        .find_iter(html)
        .find_map(|m| balanced_object(&html[m.end()..]))
        .map(ToOwned::to_owned);
    found
}

/// Finds `window.<name> = { ... }` and returns the balanced object literal.
pub fn find_global_assignment(html: &str, name: &str) -> Option<String> {
    let regex = assignment_regex(name)?;
    assignment_after(html, &regex)
}

/// Returns the `{...}` prefix of `input`, honouring nested braces and string literals.
fn balanced_object(input: &str) -> Option<&str> {
    if !input.starts_with('{') {
        return None;
    }
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (idx, ch) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' | '`' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&input[..=idx]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Rewrites bare `undefined` tokens to `null`. String literals are left untouched.
pub fn rewrite_undefined(raw: &str) -> String {
    const TOKEN: &str = "undefined";
    let mut out = String::with_capacity(raw.len());
    let mut in_string = false;
    let mut escaped = false;
    let mut prev: Option<char> = None;
    let mut rest = raw;

    while let Some(ch) = rest.chars().next() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
        } else if ch == '"' {
            in_string = true;
        } else if rest.starts_with(TOKEN)
            && !prev.is_some_and(is_ident_char)
            && !rest[TOKEN.len()..].chars().next().is_some_and(is_ident_char)
        {
            out.push_str("null");
            rest = &rest[TOKEN.len()..];
            prev = Some('l');
            continue;
        }
        out.push(ch);
        prev = Some(ch);
        rest = &rest[ch.len_utf8()..];
    }
    out
}

fn is_ident_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

/// Leading slice of `html` for error diagnostics, cut on a char boundary.
pub fn diagnostic_snippet(html: &str, max_len: usize) -> String {
    if html.len() <= max_len {
        return html.to_string();
    }
    let mut end = max_len;
    while end > 0 && !html.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}{TRUNCATED_MARKER}", &html[..end])
}
