#![forbid(unsafe_code)]

mod frame;
mod pager;

pub use frame::PageBuf;
pub use pager::{Pager, PagerOptions, PagerStats};
