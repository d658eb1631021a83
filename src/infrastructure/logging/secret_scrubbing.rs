//! Redaction of API keys and bearer tokens from log output.

use regex::{Captures, Regex};
use std::io;
use std::sync::LazyLock;
use tracing_subscriber::fmt::MakeWriter;

static SCRUBBER: LazyLock<SecretScrubber> = LazyLock::new(SecretScrubber::new);

/// Redact credentials from a message using the shared scrubber.
pub fn scrub(message: &str) -> String {
    SCRUBBER.scrub_message(message)
}

/// Redacts API keys and tokens from text before it is logged or shown
#[derive(Debug, Clone)]
pub struct SecretScrubber {
    api_key_pattern: Regex,
    query_key_pattern: Regex,
    token_pattern: Regex,
    bearer_pattern: Regex,
}

impl SecretScrubber {
    /// Compile the redaction patterns.
    pub fn new() -> Self {
        Self {
            // Anthropic API keys: sk-ant-api03-...
            api_key_pattern: Regex::new(r"sk-ant-[a-zA-Z0-9_\-]{8,}").expect("static pattern"),
            // Google API keys travel as ?key=... on search requests
            query_key_pattern: Regex::new(r"([?&](?:key|api_key|cx)=)[^&\s\x22']+")
                .expect("static pattern"),
            token_pattern: Regex::new(
                r#"(["']?(?:api_key|apikey|x-api-key|token|secret)["']?\s*[:=]\s*)["']?[a-zA-Z0-9_\-\.]{16,}["']?"#,
            )
            .expect("static pattern"),
            bearer_pattern: Regex::new(r"Bearer\s+[a-zA-Z0-9_\-\.=]+").expect("static pattern"),
        }
    }

    /// Redact every known secret pattern in `message`.
    pub fn scrub_message(&self, message: &str) -> String {
        let scrubbed = self
            .api_key_pattern
            .replace_all(message, "[API_KEY_REDACTED]");
        let scrubbed = self
            .query_key_pattern
            .replace_all(&scrubbed, |caps: &Captures| format!("{}[REDACTED]", &caps[1]));
        let scrubbed = self
            .bearer_pattern
            .replace_all(&scrubbed, "Bearer [TOKEN_REDACTED]");
        self.token_pattern
            .replace_all(&scrubbed, |caps: &Captures| format!("{}[REDACTED]", &caps[1]))
            .into_owned()
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

/// `MakeWriter` that scrubs every formatted event before it reaches the inner writer.
#[derive(Debug, Clone)]
pub struct Scrubbed<M> {
    inner: M,
}

impl<M> Scrubbed<M> {
    /// Wrap `inner`.
    pub const fn new(inner: M) -> Self {
        Self { inner }
    }
}

impl<'a, M> MakeWriter<'a> for Scrubbed<M>
where
    M: MakeWriter<'a>,
{
    type Writer = ScrubbingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        ScrubbingWriter {
            inner: self.inner.make_writer(),
        }
    }
}

/// Writer produced by [`Scrubbed`].
pub struct ScrubbingWriter<W> {
    inner: W,
}

impl<W: io::Write> io::Write for ScrubbingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let text = String::from_utf8_lossy(buf);
        self.inner.write_all(scrub(&text).as_bytes())?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}
