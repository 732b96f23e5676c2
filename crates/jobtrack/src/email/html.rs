//! HTML to plain text conversion for message bodies.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html};

static RE_SPACES: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t\u{a0}]+").unwrap());

/// Elements whose text never reaches the reader.
const HIDDEN: &[&str] = &["head", "script", "style", "noscript", "template", "title"];

/// Elements that start and end on their own line.
const BLOCKS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "footer", "form", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main", "nav", "ol", "p", "pre", "section",
    "table", "tbody", "thead", "tfoot", "tr", "ul",
];

/// Table cells, kept apart by a space.
const CELLS: &[&str] = &["td", "th"];

/// Converts an HTML document or fragment to readable plain text.
///
/// Entities are decoded by the parser. Text nodes of neighbouring cells
/// and blocks never run together.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut text = String::new();
    push_text(document.root_element(), &mut text);
    collapse_whitespace(&text)
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            // Source line breaks are plain whitespace in HTML.
            out.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }));
            continue;
        }
        let Some(child) = ElementRef::wrap(child) else {
            continue;
        };

        let name = child.value().name();
        if HIDDEN.contains(&name) {
            continue;
        }
        if name == "br" {
            out.push('\n');
            continue;
        }

        let block = BLOCKS.contains(&name);
        if block {
            out.push('\n');
        }
        push_text(child, out);
        if block {
            out.push('\n');
        } else if CELLS.contains(&name) {
            out.push(' ');
        }
    }
}

/// Collapses runs of spaces within lines and runs of blank lines.
pub fn collapse_whitespace(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut previous_blank = true;

    for line in text.lines() {
        let line = RE_SPACES.replace_all(line, " ");
        let line = line.trim();
        if line.is_empty() {
            if !previous_blank {
                lines.push(String::new());
            }
            previous_blank = true;
        } else {
            lines.push(line.to_string());
            previous_blank = false;
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines.join("\n")
}
