//! Terminal presentation of streamed fragments and their control markers.

use std::io::{self, Write};

use glyph_types::{is_sentinel, ProviderError, FINAL_MARKER, RETRY_MARKER};

#[derive(Debug, PartialEq)]
pub enum Fragment<'a> {
    Text(&'a str),
    /// Prior partial output is void; a new attempt follows.
    Retry,
    /// Full corrected re-render.
    Final(&'a str),
    Error(ProviderError),
}

pub fn classify(fragment: &str) -> Fragment<'_> {
    if fragment == RETRY_MARKER {
        return Fragment::Retry;
    }
    if let Some(rest) = fragment.strip_prefix(FINAL_MARKER) {
        return Fragment::Final(rest.strip_prefix('\n').unwrap_or(rest));
    }
    if is_sentinel(fragment) {
        if let Some(err) = ProviderError::from_sentinel(fragment) {
            return Fragment::Error(err);
        }
    }
    Fragment::Text(fragment)
}

pub fn report_error(err: &mut impl Write, error: &ProviderError) -> io::Result<()> {
    writeln!(err, "[ERROR] {}: {}", error.code(), error.message())
}

/// Writes art to `out` and status lines to `err`.
pub struct StreamPrinter<O: Write, E: Write> {
    out: O,
    err: E,
    line_open: bool,
    failed: bool,
}

impl<O: Write, E: Write> StreamPrinter<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self {
            out,
            err,
            line_open: false,
            failed: false,
        }
    }

    pub fn print(&mut self, fragment: &str) -> io::Result<()> {
        match classify(fragment) {
            Fragment::Text(text) => {
                self.out.write_all(text.as_bytes())?;
                self.line_open = !text.ends_with('\n');
                self.out.flush()
            }
            Fragment::Retry => {
                self.close_line()?;
                writeln!(self.err, "[WARN] Output rejected, regenerating...")
            }
            Fragment::Final(text) => {
                self.close_line()?;
                writeln!(self.out, "--- cleaned ---")?;
                writeln!(self.out, "{text}")
            }
            Fragment::Error(error) => {
                self.close_line()?;
                self.failed = true;
                report_error(&mut self.err, &error)
            }
        }
    }

    fn close_line(&mut self) -> io::Result<()> {
        if self.line_open {
            writeln!(self.out)?;
            self.line_open = false;
        }
        Ok(())
    }

    /// Terminate the last line. Returns whether an error sentinel was seen.
    pub fn finish(mut self) -> io::Result<bool> {
        self.close_line()?;
        self.out.flush()?;
        Ok(self.failed)
    }
}
