//! Lightweight markup parsing for message text.
//!
//! Three constructs are recognized, in priority order: fenced code blocks delimited by
//! triple backticks, inline code spans delimited by single backticks, and bold spans
//! delimited by double asterisks. Everything else is plain text. The parser is total:
//! any input, including unbalanced delimiters, produces a segment list.

use crate::types::Segment;

const FENCE: &str = "```";

/// Parse `text` into display segments.
///
/// Unterminated fences, lone backticks and unmatched asterisks are kept as plain text.
/// Empty plain segments are never emitted.
pub fn render(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = text;
    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(close) = after_open.find(FENCE) else {
            break;
        };
        render_inline(&rest[..open], &mut segments);
        segments.push(code_block(&after_open[..close]));
        rest = &after_open[close + FENCE.len()..];
    }
    render_inline(rest, &mut segments);
    segments
}

/// Returns true if `text` contains anything `render` would style.
pub fn has_markup(text: &str) -> bool {
    !matches!(render(text).as_slice(), [] | [Segment::PlainText(_)])
}

fn code_block(inner: &str) -> Segment {
    if let Some((first, remainder)) = inner.split_once('\n')
        && is_language_tag(first)
    {
        return Segment::CodeBlock {
            language: Some(first.to_string()),
            body: remainder.trim().to_string(),
        };
    }
    Segment::CodeBlock {
        language: None,
        body: inner.trim().to_string(),
    }
}

fn is_language_tag(line: &str) -> bool {
    !line.is_empty()
        && line
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '-'))
}

// Inline code spans with non-empty content; the text between them goes to bold parsing.
fn render_inline(text: &str, segments: &mut Vec<Segment>) {
    let mut plain_start = 0;
    let mut i = 0;
    while let Some(offset) = text[i..].find('`') {
        let open = i + offset;
        let Some(len) = text[open + 1..].find('`') else {
            break;
        };
        let close = open + 1 + len;
        if len == 0 {
            // "``" has no content; the second backtick may still open a span.
            i = close;
            continue;
        }
        render_bold(&text[plain_start..open], segments);
        segments.push(Segment::InlineCode(text[open + 1..close].to_string()));
        plain_start = close + 1;
        i = plain_start;
    }
    render_bold(&text[plain_start..], segments);
}

// Bold spans are `**` followed by one or more non-asterisks followed by `**`.
fn render_bold(text: &str, segments: &mut Vec<Segment>) {
    let bytes = text.as_bytes();
    let mut plain_start = 0;
    let mut i = 0;
    while let Some(offset) = text[i..].find("**") {
        let open = i + offset;
        let content_start = open + 2;
        let close = text[content_start..]
            .find('*')
            .map(|k| content_start + k)
            .filter(|&k| k > content_start && bytes.get(k + 1) == Some(&b'*'));
        match close {
            Some(close) => {
                push_plain(&text[plain_start..open], segments);
                segments.push(Segment::Bold(text[content_start..close].to_string()));
                plain_start = close + 2;
                i = plain_start;
            }
            None => i = open + 1,
        }
    }
    push_plain(&text[plain_start..], segments);
}

fn push_plain(text: &str, segments: &mut Vec<Segment>) {
    if !text.is_empty() {
        segments.push(Segment::PlainText(text.to_string()));
    }
}
