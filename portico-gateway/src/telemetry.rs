//! Log output with sensitive data masked.
//!
//! [`RedactingFields`] formats event and span fields the way
//! [`DefaultFields`] does, then passes the result through
//! [`portico::redact::mask`]. Installed on the fmt layer by [`init`], it
//! covers every message and field the process logs, including span fields
//! recorded after creation.

use std::fmt;

use portico::redact::mask;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::field::RecordFields;
use tracing_subscriber::fmt::FormatFields;
use tracing_subscriber::fmt::format::{DefaultFields, Writer};

/// A [`FormatFields`] implementation that masks card numbers, CVNs and SSNs.
#[derive(Debug, Default)]
pub struct RedactingFields {
    inner: DefaultFields,
}

impl RedactingFields {
    /// Creates a redacting formatter over [`DefaultFields`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl<'writer> FormatFields<'writer> for RedactingFields {
    fn format_fields<R: RecordFields>(&self, mut writer: Writer<'writer>, fields: R) -> fmt::Result {
        let mut buf = String::new();
        self.inner.format_fields(Writer::new(&mut buf), fields)?;
        writer.write_str(&mask(&buf))
    }
}

/// Installs the global subscriber: `RUST_LOG` filter (default `info`) and a
/// fmt layer whose fields go through [`RedactingFields`].
///
/// Call once, before anything logs.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .fmt_fields(RedactingFields::new())
        .init();
}
