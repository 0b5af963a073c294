//! Output rendering for the chat loop.
//!
//! Reply text goes to standard output as it streams in; errors go to standard
//! error. The plain-text renderer optionally styles non-reply output with ANSI
//! escape codes.

use std::io::{self, Stderr, Stdout, Write};

/// ANSI escape code for dim text (used for informational lines).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for yellow text (used for interruptions).
const ANSI_YELLOW: &str = "\x1b[33m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print a chunk of response text.
    ///
    /// This is called once per streamed fragment and must make the text
    /// visible before returning.
    fn print_text(&mut self, text: &str);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);

    /// Called when a response is complete.
    fn finish_response(&mut self);

    /// Called when the stream is interrupted by the user.
    fn print_interrupted(&mut self);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer<O: Write + Send = Stdout, E: Write + Send = Stderr> {
    out: O,
    err: E,
    use_color: bool,
    mid_line: bool,
}

impl PlainTextRenderer {
    /// Creates a renderer on stdout and stderr with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a renderer on stdout and stderr with the given color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writers(io::stdout(), io::stderr(), use_color)
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Write + Send, E: Write + Send> PlainTextRenderer<O, E> {
    /// Creates a renderer over arbitrary writers.
    pub fn with_writers(out: O, err: E, use_color: bool) -> Self {
        Self {
            out,
            err,
            use_color,
            mid_line: false,
        }
    }

    /// Consumes the renderer and returns its writers.
    pub fn into_writers(self) -> (O, E) {
        (self.out, self.err)
    }

    /// Ends a partially written reply line so the next message starts fresh.
    fn break_line(&mut self) {
        if self.mid_line {
            let _ = writeln!(self.out);
            let _ = self.out.flush();
            self.mid_line = false;
        }
    }

    fn styled(&self, style: &'static str, text: &str) -> String {
        if self.use_color {
            format!("{style}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }
}

impl<O: Write + Send, E: Write + Send> Renderer for PlainTextRenderer<O, E> {
    fn print_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = write!(self.out, "{text}");
        let _ = self.out.flush();
        self.mid_line = !text.ends_with('\n');
    }

    fn print_error(&mut self, error: &str) {
        self.break_line();
        let line = self.styled(ANSI_RED, &format!("Error: {error}"));
        let _ = writeln!(self.err, "{line}");
        let _ = self.err.flush();
    }

    fn print_info(&mut self, info: &str) {
        self.break_line();
        let line = self.styled(ANSI_DIM, info);
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
    }

    fn finish_response(&mut self) {
        let _ = writeln!(self.out);
        let _ = self.out.flush();
        self.mid_line = false;
    }

    fn print_interrupted(&mut self) {
        self.break_line();
        let line = self.styled(ANSI_YELLOW, "[interrupted]");
        let _ = writeln!(self.out, "{line}");
        let _ = self.out.flush();
    }
}
