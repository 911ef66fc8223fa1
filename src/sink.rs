//! Destinations for synthesized bytes.
//!
//! A sink receives chunks in order through [`Sink::accept`] and is closed
//! once with [`Sink::finalize`]. Writes after finalize fail with
//! [`SynthesisError::SinkClosed`]. A sink has at most one writer at a time.

use std::fs::File;
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::mpsc::SyncSender;

use crate::error::{Result, SynthesisError};

pub trait Sink {
    /// Append bytes to the destination.
    fn accept(&mut self, bytes: &[u8]) -> Result<()>;

    /// Overwrite bytes already accepted at `offset`.
    ///
    /// Returns `Ok(false)` when the destination cannot be rewritten (a
    /// network body that has already left the process, for instance).
    fn rewrite(&mut self, _offset: u64, _bytes: &[u8]) -> Result<bool> {
        Ok(false)
    }

    /// Flush and close the destination.
    fn finalize(&mut self) -> Result<()>;
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        (**self).accept(bytes)
    }

    fn rewrite(&mut self, offset: u64, bytes: &[u8]) -> Result<bool> {
        (**self).rewrite(offset, bytes)
    }

    fn finalize(&mut self) -> Result<()> {
        (**self).finalize()
    }
}

/// Writes to a file; finalize syncs it to disk.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
}

impl FileSink {
    /// Create (or truncate) the file at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: Some(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn writer(&mut self) -> Result<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or(SynthesisError::SinkClosed)
    }
}

impl Sink for FileSink {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        self.writer()?.write_all(bytes)?;
        Ok(())
    }

    fn rewrite(&mut self, offset: u64, bytes: &[u8]) -> Result<bool> {
        let writer = self.writer()?;
        let end = writer.stream_position()?;
        writer.seek(SeekFrom::Start(offset))?;
        writer.write_all(bytes)?;
        writer.seek(SeekFrom::Start(end))?;
        Ok(true)
    }

    fn finalize(&mut self) -> Result<()> {
        let writer = self.writer.take().ok_or(SynthesisError::SinkClosed)?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        log::debug!("Wrote {}", self.path.display());
        Ok(())
    }
}

/// Collects everything in a growable in-memory buffer.
#[derive(Debug, Default)]
pub struct BufferSink {
    buf: Vec<u8>,
    closed: bool,
}

impl BufferSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

impl Sink for BufferSink {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(SynthesisError::SinkClosed);
        }
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    fn rewrite(&mut self, offset: u64, bytes: &[u8]) -> Result<bool> {
        if self.closed {
            return Err(SynthesisError::SinkClosed);
        }
        let start = usize::try_from(offset).unwrap_or(usize::MAX);
        let end = start.saturating_add(bytes.len());
        if end > self.buf.len() {
            return Err(SynthesisError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("rewrite of {start}..{end} past end of buffer ({})", self.buf.len()),
            )));
        }
        self.buf[start..end].copy_from_slice(bytes);
        Ok(true)
    }

    fn finalize(&mut self) -> Result<()> {
        if self.closed {
            return Err(SynthesisError::SinkClosed);
        }
        self.closed = true;
        Ok(())
    }
}

/// Incremental writer supplied by the caller, such as an HTTP body writer.
///
/// Finalize flushes the writer; [`StreamSink::into_inner`] hands it back so
/// the caller's transport can end the body.
pub struct StreamSink<W: Write> {
    writer: W,
    closed: bool,
}

impl<W: Write> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            closed: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Sink for StreamSink<W> {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        if self.closed {
            return Err(SynthesisError::SinkClosed);
        }
        self.writer.write_all(bytes)?;
        Ok(())
    }

    fn finalize(&mut self) -> Result<()> {
        if self.closed {
            return Err(SynthesisError::SinkClosed);
        }
        self.writer.flush()?;
        self.closed = true;
        Ok(())
    }
}

/// Sends each chunk over a bounded channel to another thread.
///
/// Finalize drops the sender, which the receiving side observes as the end
/// of the body. A disconnected receiver surfaces as a `BrokenPipe` I/O error.
pub struct ChannelSink {
    tx: Option<SyncSender<Vec<u8>>>,
}

impl ChannelSink {
    pub fn new(tx: SyncSender<Vec<u8>>) -> Self {
        Self { tx: Some(tx) }
    }
}

impl Sink for ChannelSink {
    fn accept(&mut self, bytes: &[u8]) -> Result<()> {
        let tx = self.tx.as_ref().ok_or(SynthesisError::SinkClosed)?;
        tx.send(bytes.to_vec()).map_err(|_| {
            SynthesisError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "receiver hung up",
            ))
        })
    }

    fn finalize(&mut self) -> Result<()> {
        self.tx.take().ok_or(SynthesisError::SinkClosed)?;
        Ok(())
    }
}
