#![warn(missing_docs)]

//! 核心库. 为 MRI 体积的众包质量评分提供切片提取, 评分进度追踪和数据导出.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 体积文件按 BIDS 组织 (`sub-*/ses-*/anat/*_T1w.nii.gz`), 其他组织方式需要自行构造
//!   [`dataset::VolumeRecord`] 再入库.
//! 2. 所有操作都是阻塞的. 在异步运行时中调用时, 调用方应自行移交到阻塞线程.
//!
//! # 组成
//!
//! ### 体积加载与方向校正 ✅
//!
//! 读取 nifti 体积, 由 affine 推导体素轴方向, 并统一到 RPI 方向.
//!
//! 实现位于 `motscore/src/data`.
//!
//! ### 三视图切片提取 ✅
//!
//! 以几何中心加固定偏移选取三个切片, 转置, 按切片自身的极值线性映射到 8-bit,
//! 可选地裁剪到前景包围盒.
//!
//! 实现位于 `motscore/src/extract.rs`.
//!
//! ### 评分进度追踪 ✅
//!
//! 保证每位评审者对每个体积至多有一条评分, 支持撤销最近一次评分.
//!
//! 实现位于 `motscore/src/tracker.rs`.
//!
//! ### 存储与导出 ✅
//!
//! SQLite 表结构迁移, 用户/体积/评分的读写, CSV 导出.
//!
//! 实现位于 `motscore/src/store` 和 `motscore/src/export.rs`.

/// 二维索引 (行, 列).
pub type Idx2d = (usize, usize);

/// 三维索引, 按体素轴顺序.
pub type Idx3d = (usize, usize, usize);

pub mod consts;
pub mod data;
pub mod dataset;
mod error;
pub mod export;
pub mod extract;
pub mod prelude;
pub mod store;
pub mod tracker;

pub use data::{
    reorient, Affine, AxisCode, AxisCodes, GraySlice, GrayWindow, ImgWriteRaw, MriVolume,
    NiftiHeaderAttr, ScanSlice,
};
pub use error::{Error, Result};
pub use extract::{extract, extract_from_array, extract_many, ExtractSpec, SliceTriple, UniformPolicy};
pub use export::export_csv;
pub use store::{Review, Reviewer, Volume};
pub use tracker::{Decision, Progress, ReviewTracker, ScorePolicy, Selection};
