// src/lexer/source.rs
//! Byte sources: the only I/O the scanner performs is "fill this slice".

use std::{
    fs::File,
    io::{self, Read},
    path::Path,
};

use super::error::ScanError;

/// Supplies input bytes on demand. `Ok(0)` means end of input.
pub trait ByteSource: Send {
    fn read_bytes(&mut self, dst: &mut [u8]) -> io::Result<usize>;

    fn name(&self) -> &str {
        "<input>"
    }
}

impl<S: ByteSource + ?Sized> ByteSource for Box<S> {
    fn read_bytes(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        (**self).read_bytes(dst)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Scans an owned in-memory blob.
#[derive(Debug, Clone)]
pub struct MemorySource {
    data: Vec<u8>,
    pos: usize,
    name: String,
}

impl MemorySource {
    pub fn new(data: impl Into<Vec<u8>>) -> Self {
        Self {
            data: data.into(),
            pos: 0,
            name: "<memory>".to_string(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

impl ByteSource for MemorySource {
    fn read_bytes(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let rest = &self.data[self.pos..];
        let n = rest.len().min(dst.len());
        dst[..n].copy_from_slice(&rest[..n]);
        self.pos += n;
        Ok(n)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Adapts any `Read` (files, stdin, sockets).
pub struct ReaderSource<R> {
    reader: R,
    name: String,
}

impl<R: Read + Send> ReaderSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        Self {
            reader,
            name: name.into(),
        }
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read + Send> ByteSource for ReaderSource<R> {
    fn read_bytes(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        loop {
            match self.reader.read(dst) {
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                other => return other,
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub type FileSource = ReaderSource<File>;

/// Opens a named file as a byte source.
pub fn open_file(path: &Path) -> Result<FileSource, ScanError> {
    let file = File::open(path).map_err(|source| ScanError::CannotOpen {
        path: path.to_path_buf(),
        source,
    })?;
    log::debug!("opened input file {}", path.display());
    Ok(ReaderSource::new(file, path.display().to_string()))
}

pub fn stdin_source() -> ReaderSource<io::Stdin> {
    ReaderSource::new(io::stdin(), "<stdin>")
}

/// Hands out at most `chunk` bytes per read. Forces the scanner through
/// many small refills regardless of its buffer size.
pub struct ChunkedSource<S> {
    inner: S,
    chunk: usize,
}

impl<S: ByteSource> ChunkedSource<S> {
    pub fn new(inner: S, chunk: usize) -> Self {
        Self {
            inner,
            chunk: chunk.max(1),
        }
    }
}

impl<S: ByteSource> ByteSource for ChunkedSource<S> {
    fn read_bytes(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        let n = dst.len().min(self.chunk);
        self.inner.read_bytes(&mut dst[..n])
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_drains_then_reports_end() {
        let mut src = MemorySource::new("hello");
        let mut buf = [0u8; 3];
        assert_eq!(src.read_bytes(&mut buf).unwrap(), 3);
        assert_eq!(&buf, b"hel");
        assert_eq!(src.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"lo");
        assert_eq!(src.read_bytes(&mut buf).unwrap(), 0);
    }

    #[test]
    fn chunked_source_caps_reads() {
        let mut src = ChunkedSource::new(MemorySource::new("abcdef"), 2);
        let mut buf = [0u8; 16];
        assert_eq!(src.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(src.read_bytes(&mut buf).unwrap(), 2);
        assert_eq!(&buf[..2], b"cd");
    }

    #[test]
    fn missing_file_is_cannot_open() {
        let err = open_file(Path::new("/definitely/not/here.txt")).err().unwrap();
        assert!(matches!(err, ScanError::CannotOpen { .. }));
    }
}
