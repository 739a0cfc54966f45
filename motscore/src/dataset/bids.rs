//! BIDS 数据集浏览.
//!
//! 仅解析文件名中的 `sub-` 和 `ses-` 实体, 不读取 `dataset_description.json`
//! 或 sidecar 文件.

use std::io;
use std::path::{Path, PathBuf};

use walkdir::{DirEntry, WalkDir};

use crate::{Error, Result};

/// 不属于原始数据的顶层目录.
const IGNORED_TOP_DIRS: [&str; 5] = ["derivatives", "sourcedata", "code", "stimuli", "models"];

/// 数据集中的一个体积文件, 尚未入库.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeRecord {
    /// 受试者标签, 不含 `sub-` 前缀.
    pub sub_id: String,
    /// 会话标签, 不含 `ses-` 前缀. 数据集没有会话层级时为空.
    pub ses_id: String,
    /// 体积文件的绝对路径.
    pub path: PathBuf,
    /// 数据集名称, 即数据集根目录名.
    pub dataset: String,
}

/// 文件名是否形如 `*_<modality>.nii.gz` 或 `*_<modality>.nii`?
fn is_volume_file(name: &str, modality: &str) -> bool {
    [".nii.gz", ".nii"].iter().any(|ext| {
        name.strip_suffix(ext)
            .and_then(|stem| stem.strip_suffix(modality))
            .is_some_and(|rest| rest.ends_with('_'))
    })
}

/// 从 BIDS 文件名中解析 `(sub, ses)` 实体. 缺少 `sub-` 时返回 `None`.
fn parse_entities(name: &str) -> Option<(String, String)> {
    let mut sub = None;
    let mut ses = String::new();
    for part in name.split('_') {
        if let Some(v) = part.strip_prefix("sub-") {
            sub = Some(v.to_string());
        } else if let Some(v) = part.strip_prefix("ses-") {
            ses = v.to_string();
        }
    }
    sub.filter(|s| !s.is_empty()).map(|s| (s, ses))
}

/// 隐藏目录和非原始数据目录不参与遍历.
fn is_visible(entry: &DirEntry) -> bool {
    let name = entry.file_name().to_string_lossy();
    if entry.depth() == 0 {
        return true;
    }
    if name.starts_with('.') {
        return false;
    }
    !(entry.depth() == 1 && entry.file_type().is_dir() && IGNORED_TOP_DIRS.contains(&&*name))
}

/// 规范化并检查数据集根目录.
fn canonical_dir(root: &Path) -> Result<PathBuf> {
    let root = root.canonicalize().map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => {
            Error::NotFound(format!("dataset directory `{}` does not exist", root.display()))
        }
        _ => Error::Io(e),
    })?;
    if !root.is_dir() {
        return Err(Error::NotFound(format!(
            "`{}` is not a directory",
            root.display()
        )));
    }
    Ok(root)
}

/// 列出 BIDS 数据集 `root` 下所有 `*_<modality>.nii.gz` (或 `.nii`) 体积文件.
///
/// 缺少 `sub-` 实体的文件被跳过. 结果按路径排序.
///
/// # 错误
///
/// `root` 不存在或不是目录时返回 `Error::NotFound`.
pub fn list_volumes<P: AsRef<Path>>(root: P, modality: &str) -> Result<Vec<VolumeRecord>> {
    let root = canonical_dir(root.as_ref())?;
    let dataset = root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut ans = Vec::new();
    for entry in WalkDir::new(&root).follow_links(true).into_iter().filter_entry(is_visible) {
        let entry = entry.map_err(io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !is_volume_file(&name, modality) {
            continue;
        }
        match parse_entities(&name) {
            Some((sub_id, ses_id)) => ans.push(VolumeRecord {
                sub_id,
                ses_id,
                path: entry.path().to_owned(),
                dataset: dataset.clone(),
            }),
            None => log::debug!(
                "event=skip_file module=dataset reason=no_subject path={}",
                entry.path().display()
            ),
        }
    }
    ans.sort_by(|a, b| a.path.cmp(&b.path));

    log::info!(
        "event=list_volumes module=dataset status=ok dataset={dataset} volumes={}",
        ans.len()
    );
    Ok(ans)
}

/// 列出 `parent` 下的所有数据集目录 (非隐藏子目录), 按路径排序.
pub fn list_datasets<P: AsRef<Path>>(parent: P) -> Result<Vec<PathBuf>> {
    let parent = canonical_dir(parent.as_ref())?;
    let mut ans = Vec::new();
    for entry in std::fs::read_dir(&parent)? {
        let entry = entry?;
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if !hidden && entry.path().is_dir() {
            ans.push(entry.path());
        }
    }
    ans.sort();
    Ok(ans)
}
