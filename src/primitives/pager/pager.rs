use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::io::ErrorKind;
use std::path::Path;

use super::frame::{Frame, PageBuf};
use crate::primitives::io::{FileIo, StdFileIo};
use crate::types::{
    page::{DEFAULT_MAX_PAGES, PAGE_SIZE},
    PageId, PageboyError, Result,
};
use tracing::{debug, error, info};

/// Configuration options for the pager.
#[derive(Clone, Debug)]
pub struct PagerOptions {
    /// Upper bound on the number of pages the file may hold.
    pub max_pages: u32,
}

impl Default for PagerOptions {
    fn default() -> Self {
        Self {
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Counters describing cache behaviour since the pager was opened.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PagerStats {
    /// Requests served from a resident page.
    pub hits: u64,
    /// Requests that had to load or allocate a page.
    pub misses: u64,
    /// Pages read from the backing file.
    pub pages_read: u64,
    /// Pages written back to the backing file.
    pub pages_flushed: u64,
}

impl fmt::Display for PagerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "hits={} misses={} pages_read={} pages_flushed={}",
            self.hits, self.misses, self.pages_read, self.pages_flushed
        )
    }
}

/// Maps page numbers to resident buffers backed by a single file.
///
/// Pages are loaded lazily on first access and stay resident until the pager
/// is closed; there is no eviction. Dirty pages are written back by
/// [`Pager::flush`] or, all at once, by [`Pager::close`].
pub struct Pager {
    io: Box<dyn FileIo>,
    file_len: u64,
    num_pages: u32,
    max_pages: u32,
    frames: HashMap<PageId, Frame>,
    stats: PagerStats,
    closed: bool,
}

impl Pager {
    /// Opens (creating if absent) the file at `path`.
    pub fn open(path: impl AsRef<Path>, options: PagerOptions) -> Result<Self> {
        let path = path.as_ref();
        let io = StdFileIo::open(path)?;
        let pager = Self::with_io(Box::new(io), options)?;
        info!(
            path = %path.display(),
            pages = pager.num_pages,
            max_pages = pager.max_pages,
            "pager.open"
        );
        Ok(pager)
    }

    /// Builds a pager over an arbitrary [`FileIo`] backend.
    pub fn with_io(io: Box<dyn FileIo>, options: PagerOptions) -> Result<Self> {
        if options.max_pages == 0 {
            return Err(PageboyError::Invalid("max_pages must be at least 1"));
        }
        let file_len = io.len()?;
        if file_len % PAGE_SIZE as u64 != 0 {
            return Err(PageboyError::CorruptFileLength { len: file_len });
        }
        let pages = file_len / PAGE_SIZE as u64;
        if pages > u64::from(options.max_pages) {
            return Err(PageboyError::Corruption(
                "file holds more pages than max_pages allows",
            ));
        }
        Ok(Self {
            io,
            file_len,
            num_pages: pages as u32,
            max_pages: options.max_pages,
            frames: HashMap::new(),
            stats: PagerStats::default(),
            closed: false,
        })
    }

    /// Number of pages known to exist, on disk or allocated in memory.
    pub fn num_pages(&self) -> u32 {
        self.num_pages
    }

    /// Configured page limit.
    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Pages that can still be allocated before the limit is reached.
    pub fn remaining_pages(&self) -> u32 {
        self.max_pages.saturating_sub(self.num_pages)
    }

    /// Length of the backing file as of the last open or flush.
    pub fn file_len(&self) -> u64 {
        self.file_len
    }

    /// Returns a snapshot of the cache counters.
    pub fn stats(&self) -> PagerStats {
        self.stats
    }

    /// Returns the next never-allocated page number.
    ///
    /// Allocation is monotonic. The page only comes into existence once it
    /// is first fetched.
    pub fn get_unused_page_number(&self) -> PageId {
        PageId(self.num_pages)
    }

    /// Read access to page `id`, loading it on a cache miss.
    pub fn page(&mut self, id: PageId) -> Result<&PageBuf> {
        let frame = self.frame(id)?;
        Ok(&*frame.buf)
    }

    /// Write access to page `id`; the page is marked dirty.
    pub fn page_mut(&mut self, id: PageId) -> Result<&mut PageBuf> {
        let frame = self.frame(id)?;
        frame.dirty = true;
        Ok(&mut *frame.buf)
    }

    /// True when page `id` is resident in the cache.
    pub fn is_loaded(&self, id: PageId) -> bool {
        self.frames.contains_key(&id)
    }

    fn frame(&mut self, id: PageId) -> Result<&mut Frame> {
        if id.0 >= self.max_pages {
            return Err(PageboyError::PageOutOfBounds {
                page: id,
                max_pages: self.max_pages,
            });
        }
        match self.frames.entry(id) {
            Entry::Occupied(entry) => {
                self.stats.hits += 1;
                Ok(entry.into_mut())
            }
            Entry::Vacant(slot) => {
                self.stats.misses += 1;
                let frame = if id.offset() < self.file_len {
                    self.stats.pages_read += 1;
                    read_frame(self.io.as_ref(), self.file_len, id)?
                } else {
                    debug!(page = %id, "pager.allocate");
                    Frame::allocated()
                };
                if id.0 >= self.num_pages {
                    self.num_pages = id.0 + 1;
                }
                Ok(slot.insert(frame))
            }
        }
    }

    /// Writes the full buffer of page `id` to its file offset.
    pub fn flush(&mut self, id: PageId) -> Result<()> {
        let frame = self
            .frames
            .get_mut(&id)
            .ok_or(PageboyError::PageNotLoaded(id))?;
        self.io.write_at(id.offset(), &frame.buf[..])?;
        frame.dirty = false;
        self.file_len = self.file_len.max(id.offset() + PAGE_SIZE as u64);
        self.stats.pages_flushed += 1;
        debug!(page = %id, "pager.flush");
        Ok(())
    }

    /// Writes back every dirty page in page order and syncs the file.
    pub fn flush_all(&mut self) -> Result<()> {
        let mut dirty: Vec<PageId> = self
            .frames
            .iter()
            .filter(|(_, frame)| frame.dirty)
            .map(|(id, _)| *id)
            .collect();
        dirty.sort_unstable();
        for id in &dirty {
            self.flush(*id)?;
        }
        if !dirty.is_empty() {
            self.io.sync_all()?;
        }
        Ok(())
    }

    /// Flushes all dirty pages, then releases every buffer and the file.
    pub fn close(mut self) -> Result<()> {
        self.flush_all()?;
        self.closed = true;
        info!(
            pages = self.num_pages,
            file_len = self.file_len,
            stats = %self.stats,
            "pager.close"
        );
        Ok(())
    }
}

impl Drop for Pager {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        if let Err(err) = self.flush_all() {
            error!(error = %err, "pager.drop.flush_failed");
        }
    }
}

fn read_frame(io: &dyn FileIo, file_len: u64, id: PageId) -> Result<Frame> {
    let mut frame = Frame::new();
    let offset = id.offset();
    let available = (file_len - offset).min(PAGE_SIZE as u64) as usize;
    match io.read_at(offset, &mut frame.buf[..available]) {
        Ok(()) => {}
        Err(PageboyError::Io(err)) if err.kind() == ErrorKind::UnexpectedEof => {
            debug!(page = %id, "pager.load.short_read");
        }
        Err(err) => return Err(err),
    }
    debug!(page = %id, "pager.load");
    Ok(frame)
}
