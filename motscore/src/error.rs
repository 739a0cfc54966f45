//! 运行时错误.

use std::path::PathBuf;
use thiserror::Error;

/// 本 crate 的统一结果类型.
pub type Result<T> = std::result::Result<T, Error>;

/// 切片提取, 存储与进度追踪的运行时错误.
#[derive(Error, Debug)]
pub enum Error {
    /// 目标不存在: 没有待评体积, 没有可撤销的评分, 或未知的评审者/体积.
    #[error("not found: {0}")]
    NotFound(String),

    /// 体积文件无法解析.
    #[error("cannot decode volume `{}`: {reason}", path.display())]
    Decode {
        /// 体积文件路径.
        path: PathBuf,
        /// 失败原因.
        reason: String,
    },

    /// 数值上无法完成的操作, 如对均匀切片做线性映射.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// 输入不合法, 如评分越界或重复评分.
    #[error("invalid input: {0}")]
    Validation(String),

    /// 底层 I/O 错误.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// SQLite 错误.
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),

    /// 数据库表结构版本比当前程序支持的更新.
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        /// 数据库记录的版本.
        db_version: u32,
        /// 程序支持的最新版本.
        latest_supported: u32,
    },

    /// 图像编码错误.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// CSV 写出错误.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn decode(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Decode {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// 是否为 "目标不存在" 类错误.
    #[inline]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// 是否为输入校验类错误.
    #[inline]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}
