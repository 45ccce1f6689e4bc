/// A display unit produced by parsing message markup.
///
/// Segments are computed on demand for display and never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Text shown as-is.
    PlainText(String),

    /// Text between `**` markers.
    Bold(String),

    /// Text between single backticks.
    InlineCode(String),

    /// A fenced block between triple backticks.
    CodeBlock {
        /// Language tag from the fence's first line, if it was a bare identifier.
        language: Option<String>,
        /// The trimmed block body.
        body: String,
    },
}

impl Segment {
    /// Returns the visible text of the segment, without delimiters or language tag.
    pub fn text(&self) -> &str {
        match self {
            Segment::PlainText(text) | Segment::Bold(text) | Segment::InlineCode(text) => text,
            Segment::CodeBlock { body, .. } => body,
        }
    }
}
