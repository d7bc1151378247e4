#![forbid(unsafe_code)]

use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind};
use std::path::Path;

use crate::types::Result;

/// Positioned access to the table file.
///
/// The pager only ever reads and writes whole pages at page offsets, so
/// implementations need no cursor of their own.
pub trait FileIo {
    /// Fills `dst` from `off`; a read that hits end of file is
    /// `ErrorKind::UnexpectedEof`.
    fn read_at(&self, off: u64, dst: &mut [u8]) -> Result<()>;
    /// Writes `src` at `off`, extending the file as needed.
    fn write_at(&self, off: u64, src: &[u8]) -> Result<()>;
    /// Forces written pages to stable storage.
    fn sync_all(&self) -> Result<()>;
    /// File length in bytes.
    fn len(&self) -> Result<u64>;
    /// True for a zero-length file.
    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// [`FileIo`] over a local [`File`].
pub struct StdFileIo {
    file: File,
}

impl StdFileIo {
    /// Opens `path` read-write, creating it when absent. Existing contents
    /// are kept.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut options = OpenOptions::new();
        options.read(true).write(true).create(true).truncate(false);
        #[cfg(unix)]
        std::os::unix::fs::OpenOptionsExt::mode(&mut options, 0o600);
        Ok(Self {
            file: options.open(path)?,
        })
    }
}

impl FileIo for StdFileIo {
    fn read_at(&self, mut off: u64, mut dst: &mut [u8]) -> Result<()> {
        while !dst.is_empty() {
            match pread(&self.file, dst, off)? {
                0 => return Err(io::Error::from(ErrorKind::UnexpectedEof).into()),
                n => {
                    dst = &mut std::mem::take(&mut dst)[n..];
                    off += n as u64;
                }
            }
        }
        Ok(())
    }

    fn write_at(&self, mut off: u64, mut src: &[u8]) -> Result<()> {
        while !src.is_empty() {
            match pwrite(&self.file, src, off)? {
                0 => return Err(io::Error::from(ErrorKind::WriteZero).into()),
                n => {
                    src = &src[n..];
                    off += n as u64;
                }
            }
        }
        Ok(())
    }

    fn sync_all(&self) -> Result<()> {
        Ok(self.file.sync_all()?)
    }

    fn len(&self) -> Result<u64> {
        Ok(self.file.metadata()?.len())
    }
}

#[cfg(unix)]
fn pread(file: &File, buf: &mut [u8], off: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::read_at(file, buf, off)
}

#[cfg(unix)]
fn pwrite(file: &File, buf: &[u8], off: u64) -> io::Result<usize> {
    std::os::unix::fs::FileExt::write_at(file, buf, off)
}

// seek_read/seek_write move the handle's cursor; nothing here relies on it.
#[cfg(windows)]
fn pread(file: &File, buf: &mut [u8], off: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_read(file, buf, off)
}

#[cfg(windows)]
fn pwrite(file: &File, buf: &[u8], off: u64) -> io::Result<usize> {
    std::os::windows::fs::FileExt::seek_write(file, buf, off)
}

#[cfg(not(any(unix, windows)))]
fn pread(_file: &File, _buf: &mut [u8], _off: u64) -> io::Result<usize> {
    Err(ErrorKind::Unsupported.into())
}

#[cfg(not(any(unix, windows)))]
fn pwrite(_file: &File, _buf: &[u8], _off: u64) -> io::Result<usize> {
    Err(ErrorKind::Unsupported.into())
}
