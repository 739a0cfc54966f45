//! 二维切片对象的操作.

mod core;
mod save;

pub use core::{GraySlice, ScanSlice};

pub use save::ImgWriteRaw;
