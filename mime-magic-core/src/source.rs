//! Byte-source abstraction: random access and mark-capable streams.
//!
//! The match engine consumes subject bytes through two seams:
//!
//! - [`RandomAccess`]: length-known, absolute-position reads. Implemented
//!   for in-memory slices and for [`MmapSource`] (memory-mapped files).
//! - [`MarkRead`]: a forward-only stream with bounded rewind. The engine
//!   marks once with the forest's precomputed read limit, inspects a prefix,
//!   and resets — it never consumes the stream beyond the mark.
//!
//! Both paths funnel into the same matching core: the stream path buffers
//! the marked prefix and matches it as an in-memory slice.

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use memmap2::Mmap;

use crate::error::Result;

// ============================================================================
// Random access
// ============================================================================

/// Length-known source supporting absolute-position reads.
pub trait RandomAccess {
    /// Total length of the source in bytes.
    fn len(&self) -> u64;

    /// Read up to `buf.len()` bytes starting at `offset`.
    ///
    /// Short reads return what is available; reading at or past the end
    /// returns `Ok(0)`. Implementations never report more bytes than they
    /// wrote into `buf`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize>;

    /// Whether the source has no bytes.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RandomAccess for [u8] {
    fn len(&self) -> u64 {
        <[u8]>::len(self) as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        if offset >= <[u8]>::len(self) as u64 {
            return Ok(0);
        }
        let start = offset as usize;
        let n = buf.len().min(<[u8]>::len(self) - start);
        buf[..n].copy_from_slice(&self[start..start + n]);
        Ok(n)
    }
}

impl RandomAccess for Vec<u8> {
    fn len(&self) -> u64 {
        self.as_slice().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        RandomAccess::read_at(self.as_slice(), offset, buf)
    }
}

// ============================================================================
// MmapSource
// ============================================================================

/// Memory-mapped file source.
///
/// Maps the whole file once and serves `read_at` as slice copies, leaving
/// caching to the OS page cache. Zero-length files are handled without a
/// mapping (mapping an empty file is an error on most platforms).
#[derive(Debug)]
pub struct MmapSource {
    map: Option<Mmap>,
}

impl MmapSource {
    /// Open and map the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path)?;
        let len = file.metadata()?.len();
        if len == 0 {
            return Ok(MmapSource { map: None });
        }
        // Safety: the mapping is read-only and private to this process; the
        // usual caveat about concurrent truncation of the underlying file
        // applies, as it does everywhere this crate family maps files.
        let map = unsafe { Mmap::map(&file)? };
        Ok(MmapSource { map: Some(map) })
    }

    /// Mapped bytes (empty for a zero-length file).
    pub fn as_bytes(&self) -> &[u8] {
        self.map.as_deref().unwrap_or(&[])
    }
}

impl RandomAccess for MmapSource {
    fn len(&self) -> u64 {
        self.as_bytes().len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        RandomAccess::read_at(self.as_bytes(), offset, buf)
    }
}

// ============================================================================
// Mark-capable streams
// ============================================================================

/// Forward stream with bounded mark/rewind.
///
/// `mark(limit)` remembers the current position and promises the caller will
/// read at most `limit` bytes before `reset()`. `reset()` restores the read
/// position to the mark point; bytes consumed between mark and reset are
/// delivered again by subsequent reads. Reading past `limit` invalidates the
/// mark, after which `reset()` fails.
///
/// Sources that cannot rewind may return `false` from [`mark_supported`]
/// (`MarkRead::mark_supported`); the engine rejects them up front with a
/// usage error instead of consuming the stream.
pub trait MarkRead: Read {
    /// Whether mark/reset is functional on this stream.
    fn mark_supported(&self) -> bool {
        true
    }

    /// Remember the current position, valid for up to `limit` read bytes.
    fn mark(&mut self, limit: usize);

    /// Rewind to the mark point.
    fn reset(&mut self) -> io::Result<()>;
}

/// Adapter that adds mark/reset to any [`Read`] by buffering the marked
/// region and replaying it after a reset.
///
/// After the replayed bytes are drained, reads continue from the inner
/// stream, so a caller that inspected a prefix can still consume the whole
/// stream from its true beginning.
#[derive(Debug)]
pub struct ReplayReader<R> {
    inner: R,
    /// Bytes read since the active mark.
    buf: Vec<u8>,
    /// Replay cursor into `buf`; equal to `buf.len()` when reading live.
    pos: usize,
    limit: usize,
    marked: bool,
}

impl<R: Read> ReplayReader<R> {
    /// Wrap a reader.
    pub fn new(inner: R) -> Self {
        ReplayReader {
            inner,
            buf: Vec::new(),
            pos: 0,
            limit: 0,
            marked: false,
        }
    }

    /// Unwrap, discarding any buffered bytes.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for ReplayReader<R> {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if out.is_empty() {
            return Ok(0);
        }
        // Serve pending replay bytes first.
        if self.pos < self.buf.len() {
            let n = (self.buf.len() - self.pos).min(out.len());
            out[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
            self.pos += n;
            return Ok(n);
        }
        let n = self.inner.read(out)?;
        if self.marked && n > 0 {
            if self.buf.len() + n <= self.limit {
                self.buf.extend_from_slice(&out[..n]);
                self.pos = self.buf.len();
            } else {
                // Read past the promised limit: the mark no longer holds.
                self.marked = false;
                self.buf.clear();
                self.pos = 0;
            }
        }
        Ok(n)
    }
}

impl<R: Read> MarkRead for ReplayReader<R> {
    fn mark(&mut self, limit: usize) {
        // Bytes already replayed are behind the new mark point; bytes still
        // pending replay remain ahead of it and stay buffered.
        self.buf.drain(..self.pos);
        self.pos = 0;
        self.limit = limit;
        self.marked = true;
    }

    fn reset(&mut self) -> io::Result<()> {
        if !self.marked {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "reset without an active mark (or the mark limit was exceeded)",
            ));
        }
        self.pos = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn slice_read_at_short_reads() {
        let data: &[u8] = b"hello world";
        let mut buf = [0u8; 8];

        assert_eq!(data.read_at(0, &mut buf).unwrap(), 8);
        assert_eq!(&buf, b"hello wo");

        assert_eq!(data.read_at(6, &mut buf).unwrap(), 5);
        assert_eq!(&buf[..5], b"world");

        assert_eq!(data.read_at(11, &mut buf).unwrap(), 0);
        assert_eq!(data.read_at(999, &mut buf).unwrap(), 0);
    }

    #[test]
    fn mmap_source_reads_file() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        tmp.write_all(b"\x89PNG\r\n\x1a\n").unwrap();
        tmp.flush().unwrap();

        let src = MmapSource::open(tmp.path()).unwrap();
        assert_eq!(src.len(), 8);

        let mut buf = [0u8; 4];
        assert_eq!(src.read_at(1, &mut buf).unwrap(), 4);
        assert_eq!(&buf, b"PNG\r");

        assert_eq!(src.read_at(6, &mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"\x1a\n");
    }

    #[test]
    fn mmap_source_empty_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let src = MmapSource::open(tmp.path()).unwrap();
        assert!(src.is_empty());

        let mut buf = [0u8; 4];
        assert_eq!(src.read_at(0, &mut buf).unwrap(), 0);
    }

    #[test]
    fn replay_reader_rewinds_to_mark() {
        let mut r = ReplayReader::new(&b"abcdefgh"[..]);
        let mut buf = [0u8; 4];

        r.mark(8);
        r.read(&mut buf).unwrap();
        assert_eq!(&buf, b"abcd");

        r.reset().unwrap();
        let mut all = Vec::new();
        r.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"abcdefgh");
    }

    #[test]
    fn replay_reader_mark_mid_stream() {
        let mut r = ReplayReader::new(&b"abcdefgh"[..]);
        let mut buf = [0u8; 2];

        r.read(&mut buf).unwrap();
        assert_eq!(&buf, b"ab");

        r.mark(4);
        r.read(&mut buf).unwrap();
        assert_eq!(&buf, b"cd");

        r.reset().unwrap();
        r.read(&mut buf).unwrap();
        assert_eq!(&buf, b"cd");
    }

    #[test]
    fn replay_reader_reset_without_mark_fails() {
        let mut r = ReplayReader::new(&b"abc"[..]);
        assert!(r.reset().is_err());
    }

    #[test]
    fn replay_reader_limit_overrun_invalidates_mark() {
        let mut r = ReplayReader::new(&b"abcdefgh"[..]);
        let mut buf = [0u8; 4];

        r.mark(2);
        r.read(&mut buf).unwrap();
        assert!(r.reset().is_err());
    }

    #[test]
    fn replay_reader_reads_past_mark_after_replay() {
        let mut r = ReplayReader::new(&b"abcdef"[..]);
        let mut buf = [0u8; 3];

        r.mark(6);
        r.read(&mut buf).unwrap();
        r.reset().unwrap();

        // Replay the marked bytes, then continue live.
        let mut all = Vec::new();
        r.read_to_end(&mut all).unwrap();
        assert_eq!(all, b"abcdef");
    }
}
