//! Append-only CSV result sinks.
//!
//! A [`CsvSink`] is created (header written) before any work is dispatched and
//! then shared by every unit of work. Appends are serialized behind a single
//! lock and flushed to disk before returning, so rows for completed units
//! survive an interrupted run. The write and sync run on the blocking pool.

mod input;

pub use input::{load_domains, InputError, DOMAIN_COLUMN};

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Errors from writing to a result sink.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CSV error on {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// A row schema written to a sink.
pub trait Record {
    /// Column names, written once when the sink is created.
    const HEADER: &'static [&'static str];

    /// Field values in header order.
    fn fields(&self) -> Vec<String>;
}

/// Byte destination that can be made durable after each flush.
pub trait SinkWriter: Write + Send + 'static {
    fn sync(&mut self) -> io::Result<()>;
}

impl SinkWriter for File {
    fn sync(&mut self) -> io::Result<()> {
        self.sync_data()
    }
}

type SharedWriter = Arc<Mutex<csv::Writer<Box<dyn SinkWriter>>>>;

/// Mutex-guarded CSV writer over one output file.
pub struct CsvSink {
    path: PathBuf,
    writer: SharedWriter,
}

impl CsvSink {
    /// Create (or truncate) `path` and write the header for `R`.
    pub fn create<R: Record>(path: &Path) -> Result<Self, SinkError> {
        Self::with_header(path, R::HEADER)
    }

    /// Create (or truncate) `path` and write `header`.
    pub fn with_header(path: &Path, header: &[&str]) -> Result<Self, SinkError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| SinkError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .map_err(|source| SinkError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_writer(path, header, file)
    }

    /// Wrap an already open destination. `path` only labels errors.
    pub fn from_writer<W: SinkWriter>(
        path: &Path,
        header: &[&str],
        writer: W,
    ) -> Result<Self, SinkError> {
        let boxed: Box<dyn SinkWriter> = Box::new(writer);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(boxed);

        let header: Vec<String> = header.iter().map(|h| h.to_string()).collect();
        write_rows(&mut writer, vec![header], path)?;

        Ok(Self {
            path: path.to_path_buf(),
            writer: Arc::new(Mutex::new(writer)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and flush it to disk before returning.
    pub async fn append<R: Record>(&self, record: &R) -> Result<(), SinkError> {
        self.write(vec![record.fields()]).await
    }

    /// Append several records under one lock acquisition, flushing once.
    pub async fn append_all<R: Record>(&self, records: &[R]) -> Result<(), SinkError> {
        if records.is_empty() {
            return Ok(());
        }
        self.write(records.iter().map(Record::fields).collect()).await
    }

    /// Append a row already rendered in header order.
    pub async fn append_row(&self, fields: Vec<String>) -> Result<(), SinkError> {
        self.write(vec![fields]).await
    }

    async fn write(&self, rows: Vec<Vec<String>>) -> Result<(), SinkError> {
        let writer = self.writer.clone();
        let path = self.path.clone();

        tokio::task::spawn_blocking(move || {
            let mut writer = writer.lock().map_err(|_| SinkError::Io {
                path: path.clone(),
                source: io::Error::other("sink lock poisoned"),
            })?;
            write_rows(&mut writer, rows, &path)
        })
        .await
        .map_err(|e| SinkError::Io {
            path: self.path.clone(),
            source: io::Error::other(e),
        })?
    }
}

fn write_rows(
    writer: &mut csv::Writer<Box<dyn SinkWriter>>,
    rows: Vec<Vec<String>>,
    path: &Path,
) -> Result<(), SinkError> {
    for row in rows {
        writer.write_record(&row).map_err(|source| SinkError::Csv {
            path: path.to_path_buf(),
            source,
        })?;
    }

    let io_err = |source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    writer.flush().map_err(io_err)?;
    writer.get_mut().sync().map_err(io_err)
}

/// Render an optional value as an empty cell when absent.
pub fn opt_field<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
