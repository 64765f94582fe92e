//! Output rendering for streamed completions.
//!
//! A [`Renderer`] receives each fragment of the response as it arrives.  The stream does not
//! advance until the renderer has taken the fragment, so a renderer that writes and flushes
//! shows tokens as soon as the server sends them.

use std::io::{self, Stdout, Write};

use crate::error::{Error, Result};

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// Trait for rendering streaming output.
pub trait Renderer: Send {
    /// Print a fragment of response text.
    ///
    /// This is called incrementally as fragments are streamed from the API.  An error aborts
    /// the stream.
    fn print_text(&mut self, text: &str) -> Result<()>;

    /// Called once the stream is over, whether it succeeded or not.
    ///
    /// Used to ensure proper newlines and cleanup after streaming.
    fn finish_response(&mut self) -> Result<()> {
        Ok(())
    }

    /// Print an error message.
    fn print_error(&mut self, error: &str);
}

/// Plain text renderer.
///
/// Response text goes to the wrapped writer (stdout by default) and is flushed after every
/// fragment.  Errors go to stderr, in red when `use_color` is set.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    line_start: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer that writes response text to `out`.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            line_start: true,
        }
    }

    /// Consumes the renderer, returning the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_and_flush(&mut self, text: &str) -> Result<()> {
        self.out
            .write_all(text.as_bytes())
            .and_then(|_| self.out.flush())
            .map_err(|err| Error::io("failed to write response to output", err))
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn print_text(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.write_and_flush(text)?;
        self.line_start = text.ends_with('\n');
        Ok(())
    }

    fn finish_response(&mut self) -> Result<()> {
        self.line_start = true;
        self.write_and_flush("\n")
    }

    fn print_error(&mut self, error: &str) {
        let prefix = if self.line_start { "" } else { "\n" };
        if self.use_color {
            eprintln!("{prefix}{ANSI_RED}Error: {error}{ANSI_RESET}");
        } else {
            eprintln!("{prefix}Error: {error}");
        }
        self.line_start = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renderer_default_has_color() {
        let renderer = PlainTextRenderer::new();
        assert!(renderer.use_color);
    }

    #[test]
    fn renderer_without_color() {
        let renderer = PlainTextRenderer::with_color(false);
        assert!(!renderer.use_color);
    }

    #[test]
    fn fragments_written_in_order_then_newline() {
        let mut renderer = PlainTextRenderer::with_writer(Vec::new(), false);
        renderer.print_text("Hel").unwrap();
        renderer.print_text("").unwrap();
        renderer.print_text("lo").unwrap();
        renderer.finish_response().unwrap();
        assert_eq!(renderer.into_inner(), b"Hello\n");
    }

    #[test]
    fn write_failure_is_an_error() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let mut renderer = PlainTextRenderer::with_writer(Closed, false);
        assert!(renderer.print_text("lost").unwrap_err().is_io());
    }
}
