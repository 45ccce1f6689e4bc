//! Output rendering for the chat transcript.
//!
//! The session controller reports every transcript change to a [`Renderer`]. The
//! [`TerminalRenderer`] draws them with the green-on-black terminal theme, printing
//! reply chunks live or waiting for the finished message, and styling message bodies
//! from the segments produced by [`crate::markup::render`].

use std::io::{self, Stdout, Write};

use time::format_description::FormatItem;
use time::macros::format_description;

use crate::markup;
use crate::types::{Message, Segment, Sender};

/// ANSI escape code for dim text (used for system notices and fences).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code for bold text.
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for green text (the base theme color).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for bright green text (used for bold spans and AI headers).
const ANSI_BRIGHT_GREEN: &str = "\x1b[92m";

/// ANSI escape code for cyan text (used for inline code and operator headers).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

const CLOCK: &[FormatItem<'static>] = format_description!("[hour]:[minute]:[second]");

/// Receives transcript changes as they happen.
///
/// Every method has a no-op default except the two free-form outputs, so a renderer
/// only implements what it displays.
pub trait Renderer: Send {
    /// Called when the transcript is cleared for a topic switch.
    fn transcript_reset(&mut self) {}

    /// Called after a message is appended.
    fn message_appended(&mut self, message: &Message) {
        _ = message;
    }

    /// Called after a streaming message grows by `delta`.
    fn text_updated(&mut self, message: &Message, delta: &str) {
        _ = message;
        _ = delta;
    }

    /// Called after a streaming message is finalized.
    fn message_finalized(&mut self, message: &Message) {
        _ = message;
    }

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

impl Renderer for () {
    fn print_error(&mut self, _: &str) {}

    fn print_info(&mut self, _: &str) {}
}

/// Themed terminal renderer with optional ANSI styling.
pub struct TerminalRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    live: bool,
    line_start: bool,
}

impl TerminalRenderer<Stdout> {
    /// Creates a renderer on stdout with ANSI colors and live streaming enabled.
    pub fn new() -> Self {
        Self::with_writer(io::stdout(), true)
    }

    /// Creates a renderer on stdout with the specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for TerminalRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> TerminalRenderer<W> {
    /// Creates a renderer on an arbitrary writer.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            live: true,
            line_start: true,
        }
    }

    /// Print reply chunks as they arrive (`true`) or the finished reply at once.
    pub fn live(mut self, live: bool) -> Self {
        self.live = live;
        self
    }

    /// Returns the underlying writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    /// Redraw an entire transcript, styled from segments.
    pub fn render_transcript(&mut self, messages: &[Message]) {
        for message in messages {
            let block = self.format_message(message);
            self.write(&block);
        }
    }

    /// Format one message: its header followed by its styled body.
    pub fn format_message(&self, message: &Message) -> String {
        match message.sender {
            Sender::System => self.format_notice(&message.text),
            Sender::User | Sender::Ai => {
                let mut block = self.format_header(message);
                block.push_str(&self.format_segments(&markup::render(&message.text)));
                if !block.ends_with('\n') {
                    block.push('\n');
                }
                block.push('\n');
                block
            }
        }
    }

    /// Style `segments` for the terminal.
    pub fn format_segments(&self, segments: &[Segment]) -> String {
        let mut out = String::new();
        for segment in segments {
            match segment {
                Segment::PlainText(text) => self.styled(&mut out, ANSI_GREEN, text),
                Segment::Bold(text) => {
                    if self.use_color {
                        out.push_str(&format!("{ANSI_BOLD}{ANSI_BRIGHT_GREEN}{text}{ANSI_RESET}"));
                    } else {
                        out.push_str(&format!("**{text}**"));
                    }
                }
                Segment::InlineCode(text) => {
                    if self.use_color {
                        self.styled(&mut out, ANSI_CYAN, text);
                    } else {
                        out.push_str(&format!("`{text}`"));
                    }
                }
                Segment::CodeBlock { language, body } => {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                    let rule = match language {
                        Some(language) => format!("--- {language} ---"),
                        None => "------".to_string(),
                    };
                    self.styled(&mut out, ANSI_DIM, &rule);
                    out.push('\n');
                    for line in body.lines() {
                        out.push_str("  ");
                        self.styled(&mut out, ANSI_BRIGHT_GREEN, line);
                        out.push('\n');
                    }
                    self.styled(&mut out, ANSI_DIM, "------");
                    out.push('\n');
                }
            }
        }
        out
    }

    fn format_header(&self, message: &Message) -> String {
        let clock = message.timestamp.format(CLOCK).unwrap_or_default();
        let color = match message.sender {
            Sender::User => ANSI_CYAN,
            _ => ANSI_BRIGHT_GREEN,
        };
        let mut header = String::new();
        self.styled(&mut header, color, message.sender.label());
        header.push(' ');
        self.styled(&mut header, ANSI_DIM, &format!("[{clock}]"));
        header.push('\n');
        header
    }

    fn format_notice(&self, text: &str) -> String {
        let mut notice = String::new();
        self.styled(&mut notice, ANSI_DIM, &format!("[ {} ]", text.to_uppercase()));
        notice.push_str("\n\n");
        notice
    }

    fn styled(&self, out: &mut String, style: &str, text: &str) {
        if self.use_color && !text.is_empty() {
            out.push_str(style);
            out.push_str(text);
            out.push_str(ANSI_RESET);
        } else {
            out.push_str(text);
        }
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.out.write_all(text.as_bytes());
        let _ = self.out.flush();
        self.line_start = text.ends_with('\n');
    }
}

impl<W: Write + Send> Renderer for TerminalRenderer<W> {
    fn transcript_reset(&mut self) {
        if !self.line_start {
            self.write("\n");
        }
    }

    fn message_appended(&mut self, message: &Message) {
        match message.sender {
            // The operator's line is already on screen from the prompt.
            Sender::User => {}
            Sender::System => {
                let notice = self.format_notice(&message.text);
                self.write(&notice);
            }
            Sender::Ai if message.streaming => {
                if self.live {
                    let header = self.format_header(message);
                    self.write(&header);
                }
            }
            Sender::Ai => {
                let block = self.format_message(message);
                self.write(&block);
            }
        }
    }

    fn text_updated(&mut self, _: &Message, delta: &str) {
        if self.live {
            let mut text = String::new();
            self.styled(&mut text, ANSI_GREEN, delta);
            self.write(&text);
        }
    }

    fn message_finalized(&mut self, message: &Message) {
        if self.live {
            let tail = if self.line_start { "\n" } else { "\n\n" };
            self.write(tail);
        } else {
            let block = self.format_message(message);
            self.write(&block);
        }
    }

    fn print_error(&mut self, error: &str) {
        let mut text = String::new();
        if !self.line_start {
            text.push('\n');
        }
        self.styled(&mut text, ANSI_RED, &format!("[!] {error}"));
        text.push('\n');
        self.write(&text);
    }

    fn print_info(&mut self, info: &str) {
        let mut text = String::new();
        if !self.line_start {
            text.push('\n');
        }
        text.push_str(info);
        text.push('\n');
        self.write(&text);
    }
}
