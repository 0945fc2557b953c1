use std::io::Write;

use crate::errors::HarnessError;

/// Incremental text output.
///
/// Every write is flushed immediately so fragments become visible as they
/// arrive. Notices go on their own line.
pub struct TextSink<W: Write> {
    inner: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Writes a streamed fragment as-is.
    pub fn fragment(&mut self, text: &str) -> Result<(), HarnessError> {
        if text.is_empty() {
            return Ok(());
        }
        self.inner
            .write_all(text.as_bytes())
            .and_then(|_| self.inner.flush())
            .map_err(HarnessError::output)
    }

    /// Writes a diagnostic line interleaved with the streamed text.
    pub fn notice(&mut self, line: &str) -> Result<(), HarnessError> {
        write!(self.inner, "\n{line}\n")
            .and_then(|_| self.inner.flush())
            .map_err(HarnessError::output)
    }

    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}
