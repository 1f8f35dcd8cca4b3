//! Logging setup.
//!
//! Events go to stderr, the same stream the progress spinner draws on. Each
//! event is buffered and written with the spinner suspended so the two never
//! interleave on one line.

use indicatif::ProgressBar;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

/// One formatted event, written out when the subscriber drops it.
pub struct SuspendingWriter<W: Write> {
    pb: ProgressBar,
    inner: W,
    buf: Vec<u8>,
}

impl<W: Write> SuspendingWriter<W> {
    pub fn new(pb: ProgressBar, inner: W) -> Self {
        Self {
            pb,
            inner,
            buf: Vec::new(),
        }
    }

    fn emit(&mut self) -> io::Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let buf = std::mem::take(&mut self.buf);
        let inner = &mut self.inner;
        self.pb.suspend(|| {
            inner.write_all(&buf)?;
            inner.flush()
        })
    }
}

impl<W: Write> Write for SuspendingWriter<W> {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.emit()
    }
}

impl<W: Write> Drop for SuspendingWriter<W> {
    fn drop(&mut self) {
        let _ = self.emit();
    }
}

/// Install the global subscriber. `RUST_LOG` wins over the flags.
pub fn init(verbose: bool, quiet: bool, pb: &ProgressBar) {
    let default_directive = if verbose {
        "lifelog_export=debug"
    } else if quiet {
        "error"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let pb = pb.clone();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(move || SuspendingWriter::new(pb.clone(), io::stderr()))
        .with_target(false)
        .init();
}
