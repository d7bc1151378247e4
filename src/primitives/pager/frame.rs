use crate::types::page::PAGE_SIZE;

/// Raw contents of one page.
pub type PageBuf = [u8; PAGE_SIZE];

/// A resident page plus its write-back state.
pub struct Frame {
    pub buf: Box<PageBuf>,
    pub dirty: bool,
}

impl Frame {
    pub fn new() -> Self {
        Self {
            buf: Box::new([0u8; PAGE_SIZE]),
            dirty: false,
        }
    }

    /// A page past the end of the file; it must reach disk on close.
    pub fn allocated() -> Self {
        Self {
            dirty: true,
            ..Self::new()
        }
    }
}
