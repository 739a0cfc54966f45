use crate::consts::slicing::BLACK;
use crate::data::GrayWindow;
use crate::{Error, Idx2d, Result};
use ndarray::iter::Iter;
use ndarray::{Array2, ArrayView2, Ix2};
use std::ops::Index;

/// 不可变、借用的二维强度切片. 强度以 `f32` 保存.
#[derive(Clone, Debug)]
pub struct ScanSlice<'a> {
    /// 底层数据的轻量级视图, 借用于 3D 体积.
    data: ArrayView2<'a, f32>,
}

impl<'a> From<ArrayView2<'a, f32>> for ScanSlice<'a> {
    #[inline]
    fn from(data: ArrayView2<'a, f32>) -> Self {
        Self::new(data)
    }
}

impl Index<Idx2d> for ScanSlice<'_> {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl<'a> ScanSlice<'a> {
    /// 直接初始化.
    #[inline]
    pub(crate) fn new(data: ArrayView2<'a, f32>) -> Self {
        Self { data }
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 获取可以迭代图像像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, f32, Ix2> {
        self.data.iter()
    }

    /// 行列互换. 不复制数据.
    #[inline]
    pub fn t(&self) -> ScanSlice<'a> {
        Self::new(self.data.clone().reversed_axes())
    }

    /// 以切片自身有限强度的最小值和最大值构建的灰度窗. 均匀切片返回 `None`.
    #[inline]
    pub fn window(&self) -> Option<GrayWindow> {
        GrayWindow::from_extent(self.data.iter())
    }

    /// 按 `window` 映射为 8-bit 灰度切片. 非有限强度映射为 0.
    pub fn rescale_with(&self, window: &GrayWindow) -> GraySlice {
        GraySlice::from(self.data.map(|&v| window.eval(v).unwrap_or(BLACK)))
    }

    /// 将切片强度从 `[min, max]` 线性映射到 `[0, 255]`, 小数部分截断.
    ///
    /// 均匀切片 (`min == max`) 无法映射, 返回 `Error::Arithmetic`.
    pub fn rescale(&self) -> Result<GraySlice> {
        let window = self.window().ok_or_else(|| {
            Error::Arithmetic(format!(
                "cannot rescale a uniform slice of shape {:?}",
                self.shape()
            ))
        })?;
        Ok(self.rescale_with(&window))
    }
}

/// 拥有所有权的二维 8-bit 灰度切片.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraySlice {
    data: Array2<u8>,
}

impl From<Array2<u8>> for GraySlice {
    #[inline]
    fn from(data: Array2<u8>) -> Self {
        Self { data }
    }
}

impl Index<Idx2d> for GraySlice {
    type Output = u8;

    #[inline]
    fn index(&self, index: Idx2d) -> &Self::Output {
        &self.data[index]
    }
}

impl GraySlice {
    /// 全黑切片.
    #[inline]
    pub fn zeros(shape: Idx2d) -> Self {
        Self::from(Array2::zeros(shape))
    }

    /// 图像的分辨率 (高, 宽).
    #[inline]
    pub fn shape(&self) -> Idx2d {
        self.data.dim()
    }

    /// 获得图像的高.
    #[inline]
    pub fn height(&self) -> usize {
        self.shape().0
    }

    /// 获得图像的宽.
    #[inline]
    pub fn width(&self) -> usize {
        self.shape().1
    }

    /// 获取给定位置 (高, 宽) 的像素值. 越界时返回 `None`.
    #[inline]
    pub fn get(&self, pos: Idx2d) -> Option<&u8> {
        self.data.get(pos)
    }

    /// 获取可以迭代图像像素的迭代器.
    #[inline]
    pub fn iter(&self) -> Iter<'_, u8, Ix2> {
        self.data.iter()
    }

    /// 获得 **底层** 数据的一份不可变 shallow copy.
    #[inline]
    pub fn array_view(&self) -> ArrayView2<'_, u8> {
        self.data.view()
    }

    /// 交出底层数据.
    #[inline]
    pub fn into_array(self) -> Array2<u8> {
        self.data
    }

    /// 最小像素值. 空图像返回 `None`.
    #[inline]
    pub fn min(&self) -> Option<u8> {
        self.data.iter().copied().min()
    }

    /// 最大像素值. 空图像返回 `None`.
    #[inline]
    pub fn max(&self) -> Option<u8> {
        self.data.iter().copied().max()
    }

    /// 将图像转化为行优先的序列化存储.
    pub fn as_row_major_vec(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.data.len());
        buf.extend(self.iter());
        buf
    }

    /// 满足谓词 `pred` 的所有像素的包围盒, 以左上角和右下角 (均含) 表示.
    /// 没有像素满足时返回 `None`.
    pub fn bounding_box(&self, mut pred: impl FnMut(u8) -> bool) -> Option<(Idx2d, Idx2d)> {
        self.data
            .indexed_iter()
            .filter(|(_, &p)| pred(p))
            .fold(None, |acc, ((h, w), _)| match acc {
                None => Some(((h, w), (h, w))),
                Some(((h0, w0), (h1, w1))) => Some(((h0.min(h), w0.min(w)), (h1.max(h), w1.max(w)))),
            })
    }

    /// 裁剪到像素值严格大于 `threshold` 的区域的包围盒.
    ///
    /// 阈值为 `i16`, 因此负阈值等价于不裁剪. 没有像素大于阈值时返回 `None`.
    pub fn crop_above(&self, threshold: i16) -> Option<GraySlice> {
        let ((h0, w0), (h1, w1)) = self.bounding_box(|p| i16::from(p) > threshold)?;
        let cropped = self.data.slice(ndarray::s![h0..=h1, w0..=w1]).to_owned();
        Some(Self::from(cropped))
    }
}
