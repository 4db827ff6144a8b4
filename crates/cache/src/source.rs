//! Where an entry's encoded bytes come from.
//!
//! An image is either backed by an in-memory blob handed to
//! [`SharedImageCache::get`](crate::SharedImageCache::get) or by a file whose
//! path is derived from the image name.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;

use crate::error::DecodeError;

/// Borrowed view of an entry's source, passed to decoders.
#[derive(Debug, Clone, Copy)]
pub struct ImageSource<'a> {
    name: &'a str,
    path: &'a Path,
    bytes: Option<&'a [u8]>,
}

impl<'a> ImageSource<'a> {
    pub fn new(name: &'a str, path: &'a Path, bytes: Option<&'a [u8]>) -> Self {
        Self { name, path, bytes }
    }

    /// Source backed only by memory; the path is the name itself.
    pub fn from_bytes(name: &'a str, bytes: &'a [u8]) -> Self {
        Self { name, path: Path::new(name), bytes: Some(bytes) }
    }

    pub fn name(&self) -> &'a str {
        self.name
    }

    pub fn path(&self) -> &'a Path {
        self.path
    }

    pub fn bytes(&self) -> Option<&'a [u8]> {
        self.bytes
    }

    pub fn is_in_memory(&self) -> bool {
        self.bytes.is_some()
    }

    /// Opens a seekable reader over the encoded data.
    pub fn open(&self) -> Result<SourceReader<'a>, DecodeError> {
        match self.bytes {
            Some(bytes) => Ok(SourceReader::Memory(Cursor::new(bytes))),
            None => Ok(SourceReader::File(BufReader::new(self.open_file()?))),
        }
    }

    /// Reads at most `limit` leading bytes for format detection.
    ///
    /// Short files yield a short header rather than an error.
    pub fn read_header(&self, limit: usize) -> Result<Vec<u8>, DecodeError> {
        if let Some(bytes) = self.bytes {
            return Ok(bytes[..bytes.len().min(limit)].to_vec());
        }

        let file = self.open_file()?;
        let mut header = Vec::with_capacity(limit);
        file.take(limit as u64)
            .read_to_end(&mut header)
            .map_err(|source| self.io_error(source))?;
        Ok(header)
    }

    /// A source with no bytes and an empty path has nothing to read.
    fn open_file(&self) -> Result<File, DecodeError> {
        if self.path.as_os_str().is_empty() {
            return Err(DecodeError::MissingSource { name: self.name.to_string() });
        }
        File::open(self.path).map_err(|source| self.io_error(source))
    }

    fn io_error(&self, source: io::Error) -> DecodeError {
        DecodeError::Io { path: self.path.to_path_buf(), source }
    }
}

/// Reader over either an in-memory blob or a buffered file.
pub enum SourceReader<'a> {
    Memory(Cursor<&'a [u8]>),
    File(BufReader<File>),
}

impl Read for SourceReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SourceReader::Memory(cursor) => cursor.read(buf),
            SourceReader::File(file) => file.read(buf),
        }
    }
}

impl BufRead for SourceReader<'_> {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            SourceReader::Memory(cursor) => cursor.fill_buf(),
            SourceReader::File(file) => file.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            SourceReader::Memory(cursor) => cursor.consume(amt),
            SourceReader::File(file) => file.consume(amt),
        }
    }
}

impl Seek for SourceReader<'_> {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            SourceReader::Memory(cursor) => cursor.seek(pos),
            SourceReader::File(file) => file.seek(pos),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_header_from_memory_is_truncated() {
        let data = b"GIF89a-and-some-more";
        let source = ImageSource::from_bytes("a.gif", data);
        assert_eq!(source.read_header(6).unwrap(), b"GIF89a");
        assert_eq!(source.read_header(100).unwrap().len(), data.len());
    }

    #[test]
    fn test_header_from_file() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("short.bin");
        fs::write(&path, b"BM").unwrap();

        let source = ImageSource::new("short.bin", &path, None);
        assert_eq!(source.read_header(64).unwrap(), b"BM");
        assert!(!source.is_in_memory());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let temp = tempfile::tempdir().expect("temp dir should be created");
        let path = temp.path().join("missing.png");
        let source = ImageSource::new("missing.png", &path, None);

        assert!(matches!(source.read_header(8), Err(DecodeError::Io { .. })));
        assert!(matches!(source.open(), Err(DecodeError::Io { .. })));
    }

    #[test]
    fn test_empty_path_without_bytes_is_missing_source() {
        let source = ImageSource::new("", Path::new(""), None);

        assert!(matches!(source.read_header(8), Err(DecodeError::MissingSource { .. })));
        assert!(matches!(source.open(), Err(DecodeError::MissingSource { .. })));
    }

    #[test]
    fn test_reader_reads_everything() {
        let source = ImageSource::from_bytes("x", b"hello");
        let mut reader = source.open().unwrap();
        let mut out = String::new();
        reader.read_to_string(&mut out).unwrap();
        assert_eq!(out, "hello");

        reader.seek(SeekFrom::Start(1)).unwrap();
        let mut rest = Vec::new();
        reader.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, b"ello");
    }
}
