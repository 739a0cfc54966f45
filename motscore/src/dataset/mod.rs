//! 数据集操作.

use std::path::PathBuf;

pub mod bids;

pub use bids::{list_datasets, list_volumes, VolumeRecord};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}
