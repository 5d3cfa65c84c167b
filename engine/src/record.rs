//! Line-oriented record streams shared by every stage of the pipeline.
//!
//! Intermediate files hold one `key<SP>value` record per line, with no
//! terminator after the last record. End of data is a tagged `None`, never
//! a sentinel record, so running out of input can always be told apart
//! from an I/O fault.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use common::KeyValue;

/// Streaming reader over one record file.
pub struct RecordReader {
    inner: BufReader<File>,
    buf: String,
}

impl RecordReader {
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open record file `{}`", path.display()))?;
        Ok(Self {
            inner: BufReader::new(file),
            buf: String::new(),
        })
    }

    /// The next record in file order, or `None` once the stream is
    /// exhausted. Blank lines are skipped.
    pub fn next_record(&mut self) -> Result<Option<KeyValue>> {
        loop {
            self.buf.clear();
            let n = self
                .inner
                .read_line(&mut self.buf)
                .context("failed reading record stream")?;
            if n == 0 {
                return Ok(None);
            }
            let line = self.buf.trim_end_matches('\n');
            if line.is_empty() {
                continue;
            }
            return line.parse::<KeyValue>().map(Some);
        }
    }
}

/// Buffered writer producing the record file format.
pub struct RecordWriter {
    inner: BufWriter<File>,
    started: bool,
}

impl RecordWriter {
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("failed to create record file `{}`", path.display()))?;
        Ok(Self {
            inner: BufWriter::new(file),
            started: false,
        })
    }

    /// Append one record, separated from the previous one by a newline.
    pub fn write_record(&mut self, record: &KeyValue) -> Result<()> {
        if self.started {
            self.inner.write_all(b"\n")?;
        }
        write!(self.inner, "{record}")?;
        self.started = true;
        Ok(())
    }

    pub fn finish(mut self) -> Result<()> {
        self.inner.flush().context("failed flushing record file")?;
        Ok(())
    }
}
