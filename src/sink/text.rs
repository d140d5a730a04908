//! Delimited text output
//!
//! In text mode the workers do not write to a database: they render
//! order-line rows as comma-separated text and append them to one shared
//! output file. The stream is the only resource shared between workers, so
//! every append takes the stream lock; workers batch one order's worth of
//! lines per append to keep lock hold times short.

use crate::order::OrderLine;
use crate::Result;
use anyhow::Context;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Shared append-only text stream.
///
/// Cheap to clone; clones append to the same underlying file.
#[derive(Clone)]
pub struct TextStream {
    inner: Arc<Mutex<BufWriter<File>>>,
}

impl TextStream {
    /// Create (truncating) the output file.
    pub fn create(path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create output file {}", path.display()))?;
        Ok(Self {
            inner: Arc::new(Mutex::new(BufWriter::new(file))),
        })
    }

    /// Append a chunk of already-rendered text under the stream lock.
    pub fn append(&self, text: &str) -> Result<()> {
        let mut writer = self.inner.lock().unwrap();
        writer
            .write_all(text.as_bytes())
            .context("Failed to append to output stream")
    }

    /// Flush buffered output to the file.
    pub fn flush(&self) -> Result<()> {
        self.inner
            .lock()
            .unwrap()
            .flush()
            .context("Failed to flush output stream")
    }
}

/// Per-worker CSV renderer over a shared [`TextStream`].
///
/// Rows accumulate in a private buffer; [`CsvWriter::append_buffered`]
/// hands the buffer to the stream in one locked append, mirroring how each
/// worker owns its formatting state while sharing the file.
pub struct CsvWriter {
    stream: TextStream,
    null_value: String,
    buf: String,
}

impl CsvWriter {
    pub fn new(stream: TextStream, null_value: impl Into<String>) -> Self {
        Self {
            stream,
            null_value: null_value.into(),
            buf: String::new(),
        }
    }

    /// Render one row into the private buffer.
    ///
    /// Column order matches the loader's table definition: warehouse,
    /// district, order, line number, item, delivery timestamp (or the null
    /// token), amount, supplying warehouse, quantity, district info.
    pub fn push_row(&mut self, row: &OrderLine) {
        use std::fmt::Write as _;

        let delivery = match row.delivery_d {
            Some(ts) => ts.format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            None => self.null_value.clone(),
        };
        // Infallible for String targets.
        let _ = writeln!(
            self.buf,
            "{},{},{},{},{},{},{:.2},{},{},{}",
            row.w_id,
            row.d_id,
            row.o_id,
            row.number,
            row.item_id,
            delivery,
            row.amount,
            row.supply_w_id,
            row.quantity,
            row.dist_info
        );
    }

    /// Append everything buffered so far to the shared stream and clear the
    /// buffer.
    pub fn append_buffered(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        self.stream.append(&self.buf)?;
        self.buf.clear();
        Ok(())
    }

    /// Rows currently buffered (rendered, not yet appended).
    pub fn buffered_len(&self) -> usize {
        self.buf.lines().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Nurand;

    #[test]
    fn test_csv_row_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("order-line.csv");
        let stream = TextStream::create(&path).unwrap();
        let mut writer = CsvWriter::new(stream.clone(), "NULL");
        let mut rnd = Nurand::load_master_with_seed(1).derive_with_seed(2);

        let delivered = OrderLine::synthesize(&mut rnd, 1, 1, 1, 42);
        let open = OrderLine::synthesize(&mut rnd, 1, 2101, 2, 43);
        writer.push_row(&delivered);
        writer.push_row(&open);
        writer.append_buffered().unwrap();
        stream.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: Vec<&str> = lines[0].split(',').collect();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0], "1"); // warehouse
        assert_eq!(first[1], "11"); // district
        assert_eq!(first[4], "42"); // item
        assert_ne!(first[5], "NULL"); // delivered: real timestamp
        assert_eq!(first[6], "0.00");
        assert_eq!(first[8], "5"); // quantity

        let second: Vec<&str> = lines[1].split(',').collect();
        assert_eq!(second[5], "NULL"); // open order: null token
        assert_ne!(second[6], "0.00");
    }

    #[test]
    fn test_custom_null_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let stream = TextStream::create(&path).unwrap();
        let mut writer = CsvWriter::new(stream.clone(), "\\N");
        let mut rnd = Nurand::load_master_with_seed(3).derive_with_seed(4);

        writer.push_row(&OrderLine::synthesize(&mut rnd, 2, 2500, 1, 1));
        writer.append_buffered().unwrap();
        stream.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains(",\\N,"));
    }

    #[test]
    fn test_empty_append_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.csv");
        let stream = TextStream::create(&path).unwrap();
        let mut writer = CsvWriter::new(stream.clone(), "NULL");

        writer.append_buffered().unwrap();
        stream.flush().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn test_interleaved_appends_are_line_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shared.csv");
        let stream = TextStream::create(&path).unwrap();

        let mut handles = Vec::new();
        for worker in 0..4u32 {
            let stream = stream.clone();
            handles.push(std::thread::spawn(move || {
                let mut writer = CsvWriter::new(stream, "NULL");
                let mut rnd = Nurand::load_master_with_seed(worker as u64).derive();
                for o_id in 1..=50 {
                    writer.push_row(&OrderLine::synthesize(&mut rnd, worker + 1, o_id, 1, 7));
                    writer.append_buffered().unwrap();
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }
        stream.flush().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 200);
        for line in lines {
            assert_eq!(line.split(',').count(), 10, "torn line: {}", line);
        }
    }
}
