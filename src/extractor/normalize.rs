use ego_tree::iter::Edge;
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use std::panic;
use std::sync::LazyLock;
use tracing::warn;

static TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

/// Elements that end a paragraph.
const BLOCK_ELEMENTS: [&str; 15] = [
    "div",
    "p",
    "br",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "ul",
    "ol",
    "li",
    "blockquote",
    "pre",
    "tr",
];

/// Elements whose text is never shown to readers.
const SKIPPED_ELEMENTS: [&str; 4] = ["script", "style", "noscript", "template"];

#[derive(Debug)]
enum Token {
    Text(String),
    Break,
}

/// Converts HTML into newline-separated paragraphs of plain text.
///
/// `None` passes through. Input without anything tag-like is returned as-is.
pub fn normalize(html: Option<&str>) -> Option<String> {
    html.map(normalize_text)
}

pub fn normalize_text(html: &str) -> String {
    if !TAG_PATTERN.is_match(html) {
        return html.to_string();
    }

    // Keep the original on any failure rather than lose the content.
    match panic::catch_unwind(|| render(html)) {
        Ok(text) => text,
        Err(_) => {
            warn!(len = html.len(), "html normalization panicked, keeping raw input");
            html.to_string()
        }
    }
}

fn render(html: &str) -> String {
    let document = Html::parse_document(html);
    let tokens = collect_tokens(document.root_element());
    join_tokens(&tokens)
}

/// Walks the tree without recursion; nesting depth is attacker-controlled.
fn collect_tokens(root: ElementRef<'_>) -> Vec<Token> {
    let mut tokens = Vec::new();
    // Open skipped elements enclosing the current node.
    let mut skipped = 0usize;

    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => match node.value() {
                Node::Element(el) if SKIPPED_ELEMENTS.contains(&el.name()) => skipped += 1,
                Node::Text(text) if skipped == 0 => {
                    let trimmed = text.trim();
                    if !trimmed.is_empty() {
                        tokens.push(Token::Text(trimmed.to_string()));
                    }
                }
                _ => {}
            },
            Edge::Close(node) => {
                let Node::Element(el) = node.value() else {
                    continue;
                };
                let name = el.name();
                if SKIPPED_ELEMENTS.contains(&name) {
                    skipped = skipped.saturating_sub(1);
                } else if skipped == 0 && BLOCK_ELEMENTS.contains(&name) {
                    tokens.push(Token::Break);
                }
            }
        }
    }
    tokens
}

fn join_tokens(tokens: &[Token]) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for token in tokens {
        match token {
            Token::Text(text) => current.push(text),
            Token::Break => flush_line(&mut current, &mut lines),
        }
    }
    flush_line(&mut current, &mut lines);

    lines.join("\n")
}

fn flush_line(current: &mut Vec<&str>, lines: &mut Vec<String>) {
    let line = current.join(" ");
    let line = line.trim();
    if !line.is_empty() {
        lines.push(line.to_string());
    }
    current.clear();
}
