//! Rendering [`RuleRecord`]s as Cursor `.mdc` rule files.
//!
//! A rule file is a front-matter block followed by the rule body:
//!
//! ````text
//! ---
//! description: Use an indent of 2 spaces, with no tabs.
//! globs:
//! alwaysApply: false
//! ---
//! Use an indent of 2 spaces, with no tabs.
//!
//! ```php
//! if ($x) { ... }
//! ```
//! ````
//!
//! Rendering is pure. Run-wide filename uniqueness is the job of
//! [`FilenameAllocator`].

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::OutputConfig;
use crate::contract::{FormattedRule, RuleRecord, Segment};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static DISALLOWED_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^a-z0-9-]+").unwrap());
static HYPHENS_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());
static YAML_KEYWORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^(null|~|true|false|yes|no|on|off|y|n)$").unwrap());
static YAML_NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[-+]?(0x[0-9a-fA-F_]+|0o[0-7_]+|0b[01_]+|[0-9][0-9_]*(\.[0-9_]*)?([eE][-+]?[0-9]+)?|\.[0-9]+([eE][-+]?[0-9]+)?|\.(inf|Inf|INF|nan|NaN|NAN))$")
        .unwrap()
});

const MAX_SLUG_LEN: usize = 96;
const FALLBACK_SLUG: &str = "rule";

/// Lowercase, hyphenated, `[a-z0-9-]` only. Never empty.
pub fn slugify(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let hyphenated = WHITESPACE_RE.replace_all(&lowered, "-");
    let stripped = DISALLOWED_RE.replace_all(&hyphenated, "");
    let collapsed = HYPHENS_RE.replace_all(&stripped, "-");

    let mut slug = collapsed.trim_matches('-').to_string();
    if slug.len() > MAX_SLUG_LEN {
        slug.truncate(MAX_SLUG_LEN);
        slug = slug.trim_end_matches('-').to_string();
    }
    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

/// Hands out unique filenames for one run. The first claimant of a name keeps
/// it; later ones get `-2`, `-3`, ... before the extension.
#[derive(Debug, Default)]
pub struct FilenameAllocator {
    taken: HashSet<String>,
}

impl FilenameAllocator {
    pub fn claim(&mut self, filename: &str) -> String {
        if self.taken.insert(filename.to_string()) {
            return filename.to_string();
        }
        let (stem, extension) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (filename, None),
        };
        let mut counter = 2usize;
        loop {
            let candidate = match extension {
                Some(ext) => format!("{stem}-{counter}.{ext}"),
                None => format!("{stem}-{counter}"),
            };
            if self.taken.insert(candidate.clone()) {
                return candidate;
            }
            counter += 1;
        }
    }
}

pub struct Formatter {
    extension: String,
    globs: String,
    always_apply: bool,
    code_language: Option<String>,
}

impl Formatter {
    pub fn new(config: &OutputConfig) -> Self {
        Self {
            extension: config.extension.trim_start_matches('.').to_string(),
            globs: config.globs.clone(),
            always_apply: config.always_apply,
            code_language: config.code_language.clone(),
        }
    }

    /// Filename and content of one rule. Same record in, same output out.
    pub fn format(&self, rule: &RuleRecord) -> FormattedRule {
        FormattedRule {
            filename: self.filename(&rule.title),
            content: self.render(rule),
        }
    }

    pub fn filename(&self, title: &str) -> String {
        let slug = slugify(title);
        if self.extension.is_empty() {
            slug
        } else {
            format!("{slug}.{}", self.extension)
        }
    }

    pub fn render(&self, rule: &RuleRecord) -> String {
        let header = [
            "---".to_string(),
            format!("description: {}", yaml_scalar(&description(rule))),
            format!("globs: {}", self.globs),
            format!("alwaysApply: {}", self.always_apply),
            "---".to_string(),
        ];
        let mut content = header.join("\n");
        content.push('\n');

        let body: Vec<String> = rule
            .body
            .iter()
            .map(|segment| self.render_segment(segment))
            .collect();
        if !body.is_empty() {
            content.push_str(&body.join("\n\n"));
            content.push('\n');
        }
        content
    }

    fn render_segment(&self, segment: &Segment) -> String {
        match segment {
            Segment::Prose(text) => text.clone(),
            Segment::Code { language, text } => {
                let fence = fence_for(text);
                let language = language
                    .as_deref()
                    .or(self.code_language.as_deref())
                    .unwrap_or("");
                let code = text.trim_end_matches(['\n', '\r']);
                format!("{fence}{language}\n{code}\n{fence}")
            }
        }
    }
}

/// First prose paragraph, or the title when there is none.
fn description(rule: &RuleRecord) -> String {
    let text = rule
        .body
        .iter()
        .find_map(|segment| match segment {
            Segment::Prose(text) if !text.trim().is_empty() => Some(text.as_str()),
            _ => None,
        })
        .unwrap_or(rule.title.as_str());
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// Plain scalar when YAML would read it back as the same string, double-quoted otherwise.
/// Keywords such as `null` or `yes` and anything numeric are quoted.
fn yaml_scalar(value: &str) -> String {
    const INDICATORS: &[char] = &[
        '-', '?', ':', ',', '[', ']', '{', '}', '#', '&', '*', '!', '|', '>', '\'', '"', '%', '@',
        '`',
    ];
    let needs_quotes = value.is_empty()
        || value.starts_with(INDICATORS)
        || value.ends_with(':')
        || value.contains(": ")
        || value.contains(" #")
        || value.chars().any(char::is_control)
        || YAML_KEYWORD_RE.is_match(value)
        || YAML_NUMBER_RE.is_match(value)
        || value.parse::<f64>().is_ok();
    if !needs_quotes {
        return value.to_string();
    }
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '"' => quoted.push_str("\\\""),
            '\\' => quoted.push_str("\\\\"),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push(' '),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

/// Three backticks, or one more than the longest backtick run inside the code.
fn fence_for(code: &str) -> String {
    let mut longest = 0usize;
    let mut run = 0usize;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}
