//! 通用常量.

use std::ops::RangeInclusive;

/// 评分相关.
pub mod score {
    use super::RangeInclusive;

    /// 允许提交的最高分.
    pub const MAX_SCORE: u8 = 10;

    /// 视为 "可保留" 的评分区间. 分数越低, 运动伪影越少.
    pub const KEPT_SCORES: RangeInclusive<u8> = 0..=1;

    /// 分数是否落在可保留区间?
    #[inline]
    pub fn is_kept(score: u8) -> bool {
        KEPT_SCORES.contains(&score)
    }
}

/// 切片提取相关.
pub mod slicing {
    /// 三个体素轴上, 切片索引相对几何中心的偏移. 顺序为 RPI 方向下的轴 0, 1, 2.
    pub const CENTER_OFFSETS: [isize; 3] = [-15, 0, -20];

    /// 单通道黑色.
    pub const BLACK: u8 = u8::MIN;

    /// 单通道白色.
    pub const WHITE: u8 = u8::MAX;
}

/// BIDS 数据集中默认收集的模态后缀.
pub const DEFAULT_MODALITY: &str = "T1w";

/// 用户码长度.
pub const USER_CODE_LEN: usize = 8;
