use itertools::{Itertools, MinMaxResult};

use crate::consts::slicing::{BLACK, WHITE};

/// 灰度窗口, 由下限和上限组成, 用于将体素强度线性映射为 8-bit 灰度值.
///
/// 该窗口是只读的. 若要修改窗口参数, 你应该创建新的实例.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct GrayWindow {
    lower: f32,
    upper: f32,
}

impl GrayWindow {
    /// 构建灰度窗.
    ///
    /// `lower` 和 `upper` 必须是有限值且 `lower < upper`, 否则返回 `None`.
    pub fn new(lower: f32, upper: f32) -> Option<GrayWindow> {
        if lower.is_finite() && upper.is_finite() && lower < upper {
            Some(Self { lower, upper })
        } else {
            None
        }
    }

    /// 以 `values` 中有限值的最小值和最大值构建窗口.
    ///
    /// 没有有限值, 或所有有限值都相等 (均匀数据) 时返回 `None`.
    pub fn from_extent<'a, I: IntoIterator<Item = &'a f32>>(values: I) -> Option<GrayWindow> {
        match values.into_iter().copied().filter(|v| v.is_finite()).minmax() {
            MinMaxResult::MinMax(lower, upper) => Self::new(lower, upper),
            MinMaxResult::NoElements | MinMaxResult::OneElement(_) => None,
        }
    }

    /// 窗下限.
    #[inline]
    pub fn lower_bound(&self) -> f32 {
        self.lower
    }

    /// 窗上限.
    #[inline]
    pub fn upper_bound(&self) -> f32 {
        self.upper
    }

    /// 窗宽.
    #[inline]
    pub fn width(&self) -> f32 {
        self.upper - self.lower
    }

    /// 求在当前窗口设置下, 强度 `v` 对应的灰度图像素整数值 (0 <= value <= 255).
    /// 小数部分直接截断.
    ///
    /// 如果 `v` 无意义 (如 inf, NaN), 则返回 `None`.
    pub fn eval(&self, v: f32) -> Option<u8> {
        if !v.is_finite() {
            return None;
        }
        if v <= self.lower {
            Some(BLACK)
        } else if v >= self.upper {
            Some(WHITE)
        } else {
            // 255, not 256.
            let lb = self.lower as f64;
            Some(((v as f64 - lb) * 255.0 / (self.upper as f64 - lb)) as u8)
        }
    }
}
