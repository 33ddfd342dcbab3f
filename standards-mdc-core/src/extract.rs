//! Turning standards markup into [`RuleRecord`]s.
//!
//! Extraction runs in two passes:
//!
//! 1. The parsed DOM is flattened into a list of typed [`Block`]s in document
//!    order (headings, prose, code, skipped elements).
//! 2. The blocks are cut into sections at every heading whose level is one of
//!    the configured rule levels. Each section with a usable title becomes one
//!    rule; the rest are reported as [`ExtractionWarning`]s.
//!
//! Extraction never fails. Markup it does not understand is skipped.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};
use tracing::debug;

use crate::config::ExtractConfig;
use crate::contract::{RuleRecord, Segment};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Elements whose content is page chrome or not text at all.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "noscript", "template", "nav", "header", "footer", "aside", "form", "svg",
    "button", "iframe",
];

/// Elements whose own text is one paragraph. A lone `code` inside one stays inline.
const PROSE_TAGS: &[&str] = &[
    "p",
    "li",
    "dt",
    "dd",
    "blockquote",
    "td",
    "th",
    "figcaption",
];

/// Elements that end the current run of inline text.
const BLOCK_TAGS: &[&str] = &[
    "address", "article", "blockquote", "body", "caption", "dd", "details", "div", "dl", "dt",
    "fieldset", "figcaption", "figure", "h1", "h2", "h3", "h4", "h5", "h6", "head", "hgroup", "hr",
    "html", "li", "main", "menu", "ol", "p", "pre", "section", "summary", "table", "tbody", "td",
    "tfoot", "th", "thead", "tr", "ul",
];

/// Permalink markers some sites append to headings.
const ANCHOR_MARKERS: &[&str] = &["#", "¶", "§"];

/// A node of the flattened document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        id: Option<String>,
    },
    Text(String),
    Code {
        language: Option<String>,
        text: String,
    },
    Other {
        tag: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    EmptyTitle,
    TitleTooShort { min: usize },
    TitleKeyword(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyTitle => write!(f, "heading has no text"),
            SkipReason::TitleTooShort { min } => {
                write!(f, "title shorter than {min} characters")
            }
            SkipReason::TitleKeyword(keyword) => write!(f, "title contains {keyword:?}"),
        }
    }
}

/// A section that was recognised but not turned into a rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionWarning {
    /// Index of the section's heading among the page's blocks.
    pub position: usize,
    pub level: u8,
    pub title: String,
    pub reason: SkipReason,
}

impl fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "skipped h{} section {:?} at block {}: {}",
            self.level, self.title, self.position, self.reason
        )
    }
}

/// Rules of one page plus everything that was skipped on the way.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub rules: Vec<RuleRecord>,
    pub warnings: Vec<ExtractionWarning>,
}

pub struct Extractor {
    heading_levels: Vec<u8>,
    min_title_len: usize,
    skip_title_keywords: Vec<String>,
}

struct OpenSection {
    position: usize,
    level: u8,
    title: String,
    id: Option<String>,
    body: Vec<Segment>,
}

impl Extractor {
    pub fn new(config: &ExtractConfig) -> Self {
        Self {
            heading_levels: config.heading_levels.clone(),
            min_title_len: config.min_title_len,
            skip_title_keywords: config
                .skip_title_keywords
                .iter()
                .map(|k| k.to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    pub fn extract(&self, html: &str) -> Extraction {
        let blocks = blocks(html);
        debug!(blocks = blocks.len(), "Flattened document");

        let mut extraction = Extraction::default();
        let mut current: Option<OpenSection> = None;

        for (position, block) in blocks.into_iter().enumerate() {
            match block {
                Block::Heading { level, text, id } if self.heading_levels.contains(&level) => {
                    if let Some(section) = current.take() {
                        self.close(section, &mut extraction);
                    }
                    current = Some(OpenSection {
                        position,
                        level,
                        title: text,
                        id,
                        body: Vec::new(),
                    });
                }
                Block::Heading { level, text, .. } => match current.as_mut() {
                    Some(section) if level > section.level => {
                        if !text.is_empty() {
                            section.body.push(Segment::Prose(text));
                        }
                    }
                    _ => {
                        if let Some(section) = current.take() {
                            self.close(section, &mut extraction);
                        }
                    }
                },
                Block::Text(text) => {
                    if let Some(section) = current.as_mut() {
                        section.body.push(Segment::Prose(text));
                    }
                }
                Block::Code { language, text } => {
                    if let Some(section) = current.as_mut() {
                        section.body.push(Segment::Code { language, text });
                    }
                }
                Block::Other { tag } => debug!(tag = %tag, position, "Skipping element"),
            }
        }
        if let Some(section) = current.take() {
            self.close(section, &mut extraction);
        }

        extraction
    }

    fn close(&self, section: OpenSection, extraction: &mut Extraction) {
        match self.rejection(&section.title) {
            Some(reason) => extraction.warnings.push(ExtractionWarning {
                position: section.position,
                level: section.level,
                title: section.title,
                reason,
            }),
            None => extraction.rules.push(RuleRecord {
                title: section.title,
                body: section.body,
                source_section_id: section.id,
            }),
        }
    }

    fn rejection(&self, title: &str) -> Option<SkipReason> {
        if title.is_empty() {
            return Some(SkipReason::EmptyTitle);
        }
        if title.chars().count() < self.min_title_len {
            return Some(SkipReason::TitleTooShort {
                min: self.min_title_len,
            });
        }
        let lowered = title.to_lowercase();
        self.skip_title_keywords
            .iter()
            .find(|keyword| lowered.contains(keyword.as_str()))
            .map(|keyword| SkipReason::TitleKeyword(keyword.clone()))
    }
}

/// Flatten a document into blocks, in source order.
pub fn blocks(html: &str) -> Vec<Block> {
    let document = Html::parse_document(html);
    let mut flattener = Flattener::default();
    flattener.visit(document.root_element());
    flattener.blocks
}

/// Collects inline text across elements until a block element interrupts it.
#[derive(Default)]
struct Flattener {
    blocks: Vec<Block>,
    inline: String,
    /// The next prose run opens a list item.
    bullet: bool,
}

impl Flattener {
    fn visit(&mut self, element: ElementRef<'_>) {
        let name = element.value().name();
        match name {
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.blocks.push(Block::Heading {
                level: name.as_bytes()[1] - b'0',
                text: heading_text(element),
                id: heading_id(element),
            }),
            "pre" | "code" => self.blocks.push(Block::Code {
                language: code_language(element),
                text: element.text().collect(),
            }),
            _ if SKIPPED_TAGS.contains(&name) => self.blocks.push(Block::Other {
                tag: name.to_string(),
            }),
            "li" => {
                let outer = std::mem::replace(&mut self.bullet, true);
                self.flow(element);
                self.flush();
                self.bullet = outer;
            }
            _ => {
                self.flow(element);
                self.flush();
            }
        }
    }

    fn flow(&mut self, element: ElementRef<'_>) {
        for child in element.children() {
            match child.value() {
                scraper::Node::Text(text) => self.inline.push_str(text),
                scraper::Node::Element(_) => {
                    let Some(child) = ElementRef::wrap(child) else {
                        continue;
                    };
                    if is_block(child) {
                        self.flush();
                        self.visit(child);
                    } else if child.value().name() == "br" {
                        self.inline.push(' ');
                    } else {
                        self.flow(child);
                    }
                }
                _ => {}
            }
        }
    }

    fn flush(&mut self) {
        let text = collapse(&self.inline);
        self.inline.clear();
        if text.is_empty() {
            return;
        }
        let text = if std::mem::take(&mut self.bullet) {
            format!("- {text}")
        } else {
            text
        };
        self.blocks.push(Block::Text(text));
    }
}

fn is_block(element: ElementRef<'_>) -> bool {
    let name = element.value().name();
    BLOCK_TAGS.contains(&name)
        || SKIPPED_TAGS.contains(&name)
        || (name == "code" && is_code_block(element))
}

fn heading_text(heading: ElementRef<'_>) -> String {
    let mut text = String::new();
    collect_heading_text(heading, &mut text);
    collapse(&text)
}

fn collect_heading_text(element: ElementRef<'_>, text: &mut String) {
    for child in element.children() {
        match child.value() {
            scraper::Node::Text(t) => text.push_str(t),
            scraper::Node::Element(_) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if is_permalink(child) {
                    continue;
                }
                collect_heading_text(child, text);
            }
            _ => {}
        }
    }
}

fn is_permalink(element: ElementRef<'_>) -> bool {
    element.value().name() == "a"
        && element
            .value()
            .attr("href")
            .is_some_and(|href| href.starts_with('#'))
        && ANCHOR_MARKERS.contains(&element.text().collect::<String>().trim())
}

fn heading_id(heading: ElementRef<'_>) -> Option<String> {
    if let Some(id) = heading.value().id() {
        return Some(id.to_string());
    }
    heading
        .descendants()
        .filter_map(ElementRef::wrap)
        .find_map(|e| e.value().id().or_else(|| e.value().attr("name")))
        .map(str::to_string)
}

/// `language-php` / `lang-php` class on the element or a `code` inside it.
fn code_language(element: ElementRef<'_>) -> Option<String> {
    std::iter::once(element)
        .chain(
            element
                .descendants()
                .filter_map(ElementRef::wrap)
                .filter(|e| e.value().name() == "code"),
        )
        .flat_map(|e| e.value().classes())
        .find_map(|class| {
            class
                .strip_prefix("language-")
                .or_else(|| class.strip_prefix("lang-"))
        })
        .filter(|lang| !lang.is_empty())
        .map(str::to_string)
}

/// A `code` element is a block when it is the only non-blank content of a
/// parent that is not itself a paragraph.
fn is_code_block(element: ElementRef<'_>) -> bool {
    let Some(parent) = element.parent() else {
        return false;
    };
    if ElementRef::wrap(parent).is_some_and(|p| PROSE_TAGS.contains(&p.value().name())) {
        return false;
    }
    parent.children().all(|sibling| {
        sibling.id() == (*element).id()
            || match sibling.value() {
                scraper::Node::Text(t) => t.trim().is_empty(),
                scraper::Node::Comment(_) => true,
                _ => false,
            }
    })
}

fn collapse(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}
