//! 三视图切片提取.
//!
//! 体积先被调整到统一方向 (默认 RPI), 然后在几何中心附近以固定偏移取三个切片,
//! 转置后按切片自身的强度范围映射到 8-bit, 最后可选地裁剪到前景包围盒.

use std::fmt::{Display, Formatter};
use std::path::Path;
use std::str::FromStr;

use ndarray::{ArrayView3, Axis};

use crate::consts::slicing::CENTER_OFFSETS;
use crate::{AxisCodes, Error, GraySlice, MriVolume, Result, ScanSlice};

/// 均匀切片 (所有有限强度相等) 的处理方式.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum UniformPolicy {
    /// 报 `Error::Arithmetic`.
    #[default]
    Fail,
    /// 输出全黑切片.
    Zero,
}

impl Display for UniformPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Fail => "fail",
            Self::Zero => "zero",
        })
    }
}

impl FromStr for UniformPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "zero" => Ok(Self::Zero),
            other => Err(format!("unknown uniform-slice policy `{other}`, expected `fail` or `zero`")),
        }
    }
}

/// 切片提取参数.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ExtractSpec {
    offsets: [isize; 3],
    crop_threshold: Option<i16>,
    on_uniform: UniformPolicy,
    target: AxisCodes,
}

impl Default for ExtractSpec {
    fn default() -> Self {
        Self {
            offsets: CENTER_OFFSETS,
            crop_threshold: None,
            on_uniform: UniformPolicy::Fail,
            target: AxisCodes::RPI,
        }
    }
}

impl ExtractSpec {
    /// 默认参数: 偏移 `[-15, 0, -20]`, 不裁剪, 均匀切片报错, RPI 方向.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置三个轴上相对几何中心的偏移.
    #[inline]
    pub fn with_offsets(mut self, offsets: [isize; 3]) -> Self {
        self.offsets = offsets;
        self
    }

    /// 设置裁剪阈值. `None` 表示不裁剪.
    #[inline]
    pub fn with_crop_threshold(mut self, threshold: Option<i16>) -> Self {
        self.crop_threshold = threshold;
        self
    }

    /// 设置均匀切片的处理方式.
    #[inline]
    pub fn with_uniform_policy(mut self, policy: UniformPolicy) -> Self {
        self.on_uniform = policy;
        self
    }

    /// 设置统一方向.
    #[inline]
    pub fn with_target(mut self, target: AxisCodes) -> Self {
        self.target = target;
        self
    }

    /// 相对几何中心的偏移.
    #[inline]
    pub fn offsets(&self) -> [isize; 3] {
        self.offsets
    }

    /// 裁剪阈值.
    #[inline]
    pub fn crop_threshold(&self) -> Option<i16> {
        self.crop_threshold
    }

    /// 均匀切片的处理方式.
    #[inline]
    pub fn uniform_policy(&self) -> UniformPolicy {
        self.on_uniform
    }

    /// 统一方向.
    #[inline]
    pub fn target(&self) -> AxisCodes {
        self.target
    }

    /// 长度为 `len` 的轴上, 第 `axis` 个切片的索引. 越界时收缩到边界.
    #[inline]
    fn cut_index(&self, axis: usize, len: usize) -> usize {
        let idx = (len / 2) as isize + self.offsets[axis];
        idx.clamp(0, len as isize - 1) as usize
    }
}

/// 一个体积的三个标准切片.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SliceTriple {
    /// 冠状面, 沿轴 1 切取.
    pub coronal: GraySlice,
    /// 矢状面, 沿轴 0 切取.
    pub sagittal: GraySlice,
    /// 横断面, 沿轴 2 切取.
    pub axial: GraySlice,
}

impl SliceTriple {
    /// 按展示顺序 (冠状, 矢状, 横断) 交出三个切片.
    #[inline]
    pub fn into_array(self) -> [GraySlice; 3] {
        [self.coronal, self.sagittal, self.axial]
    }

    /// 按展示顺序迭代.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &GraySlice> {
        [&self.coronal, &self.sagittal, &self.axial].into_iter()
    }
}

/// 从 `path` 处的体积文件中提取三视图切片.
///
/// # 错误
///
/// - 文件不存在: `Error::Io`;
/// - 文件无法解析或仿射奇异: `Error::Decode`;
/// - 均匀切片 (在 [`UniformPolicy::Fail`] 下), 或裁剪阈值以上没有像素: `Error::Arithmetic`.
pub fn extract<P: AsRef<Path>>(path: P, spec: &ExtractSpec) -> Result<SliceTriple> {
    let path = path.as_ref();
    log::debug!("event=extract module=extract status=start path={}", path.display());
    let data = MriVolume::open(path)?.into_oriented(spec.target())?;
    let ans = extract_from_array(data.view(), spec);
    match &ans {
        Ok(_) => log::debug!("event=extract module=extract status=ok path={}", path.display()),
        Err(e) => log::warn!(
            "event=extract module=extract status=error path={} error={e}",
            path.display()
        ),
    }
    ans
}

/// 从已经调整好方向的体素数据中提取三视图切片.
///
/// 任一轴长度为 0 时返回 `Error::Arithmetic`.
pub fn extract_from_array(data: ArrayView3<'_, f32>, spec: &ExtractSpec) -> Result<SliceTriple> {
    let (d0, d1, d2) = data.dim();
    if d0 == 0 || d1 == 0 || d2 == 0 {
        return Err(Error::Arithmetic(format!(
            "cannot slice an empty volume of shape {:?}",
            data.dim()
        )));
    }

    let cut = |axis: usize, len: usize| -> Result<GraySlice> {
        let plane = ScanSlice::from(data.index_axis(Axis(axis), spec.cut_index(axis, len)));
        render(&plane.t(), spec)
    };

    Ok(SliceTriple {
        coronal: cut(1, d1)?,
        sagittal: cut(0, d0)?,
        axial: cut(2, d2)?,
    })
}

/// 单个切片的映射和裁剪.
fn render(plane: &ScanSlice<'_>, spec: &ExtractSpec) -> Result<GraySlice> {
    let gray = match (plane.window(), spec.uniform_policy()) {
        (Some(window), _) => plane.rescale_with(&window),
        (None, UniformPolicy::Zero) => GraySlice::zeros(plane.shape()),
        (None, UniformPolicy::Fail) => return plane.rescale(),
    };
    match spec.crop_threshold() {
        None => Ok(gray),
        Some(t) => gray.crop_above(t).ok_or_else(|| {
            Error::Arithmetic(format!("no pixel above crop threshold {t}"))
        }),
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelRefIterator, ParallelIterator};

        /// 借助 `rayon` 并行地提取多个体积. 结果与 `paths` 一一对应.
        pub fn extract_many<P>(paths: &[P], spec: &ExtractSpec) -> Vec<Result<SliceTriple>>
        where
            P: AsRef<Path> + Sync,
        {
            paths.par_iter().map(|p| extract(p, spec)).collect()
        }
    } else {
        /// 依次提取多个体积. 结果与 `paths` 一一对应.
        pub fn extract_many<P>(paths: &[P], spec: &ExtractSpec) -> Vec<Result<SliceTriple>>
        where
            P: AsRef<Path> + Sync,
        {
            paths.iter().map(|p| extract(p, spec)).collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{s, Array3};
    use nifti::writer::WriterOptions;
    use nifti::NiftiHeader;
    use rstest::rstest;
    use std::path::PathBuf;

    fn header_with_sform(diag: [f32; 3]) -> NiftiHeader {
        NiftiHeader {
            sform_code: 1,
            srow_x: [diag[0], 0.0, 0.0, 0.0],
            srow_y: [0.0, diag[1], 0.0, 0.0],
            srow_z: [0.0, 0.0, diag[2], 0.0],
            pixdim: [1.0; 8],
            ..NiftiHeader::default()
        }
    }

    fn write_volume(dir: &Path, name: &str, diag: [f32; 3], data: &Array3<f32>) -> PathBuf {
        let path = dir.join(name);
        let header = header_with_sform(diag);
        WriterOptions::new(&path)
            .reference_header(&header)
            .write_nifti(data)
            .unwrap();
        path
    }

    fn ramp(shape: (usize, usize, usize)) -> Array3<f32> {
        Array3::from_shape_fn(shape, |(i, j, k)| (i * 10_000 + j * 100 + k) as f32)
    }

    #[rstest]
    #[case(40, 0, 5)]
    #[case(30, 1, 15)]
    #[case(50, 2, 5)]
    #[case(4, 0, 0)]
    #[case(4, 2, 0)]
    #[case(1, 1, 0)]
    fn test_cut_index(#[case] len: usize, #[case] axis: usize, #[case] expected: usize) {
        assert_eq!(ExtractSpec::new().cut_index(axis, len), expected);
    }

    #[test]
    fn test_extract_rpi_volume() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_volume(dir.path(), "rpi.nii.gz", [1.0, -1.0, -1.0], &ramp((40, 30, 50)));

        let triple = extract(&path, &ExtractSpec::new()).unwrap();
        assert_eq!(triple.coronal.shape(), (50, 40));
        assert_eq!(triple.sagittal.shape(), (50, 30));
        assert_eq!(triple.axial.shape(), (30, 40));

        for slice in triple.iter() {
            assert_eq!(slice.min(), Some(0));
            assert_eq!(slice.max(), Some(255));
        }
        // 转置后 (行, 列) = (k, i).
        assert_eq!(triple.coronal[(0, 0)], 0);
        assert_eq!(triple.coronal[(49, 39)], 255);
    }

    #[test]
    fn test_extract_is_orientation_invariant() {
        let dir = tempfile::tempdir().unwrap();
        let rpi = ramp((20, 24, 40));
        // 同一解剖内容以 RAS 方向存储: 轴 1 和轴 2 反向.
        let ras = rpi.slice(s![.., ..;-1, ..;-1]).to_owned();

        let a = write_volume(dir.path(), "rpi.nii", [1.0, -1.0, -1.0], &rpi);
        let b = write_volume(dir.path(), "ras.nii", [1.0, 1.0, 1.0], &ras);

        let spec = ExtractSpec::new();
        assert_eq!(extract(a, &spec).unwrap(), extract(b, &spec).unwrap());
    }

    #[test]
    fn test_extract_uniform_policy() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_volume(dir.path(), "flat.nii", [1.0, -1.0, -1.0], &Array3::zeros((8, 8, 8)));

        let err = extract(&path, &ExtractSpec::new()).unwrap_err();
        assert!(matches!(err, Error::Arithmetic(_)));

        let spec = ExtractSpec::new().with_uniform_policy(UniformPolicy::Zero);
        let triple = extract(&path, &spec).unwrap();
        assert!(triple.iter().all(|s| s.max() == Some(0)));
        assert_eq!(triple.axial.shape(), (8, 8));
    }

    #[test]
    fn test_extract_crop() {
        let mut data = Array3::<f32>::zeros((16, 16, 16));
        data.slice_mut(s![4..10, 6..12, 3..9]).fill(1.0);
        let spec = ExtractSpec::new()
            .with_offsets([0, 0, 0])
            .with_crop_threshold(Some(0));

        let triple = extract_from_array(data.view(), &spec).unwrap();
        // 冠状面 (k, i), 矢状面 (k, j), 横断面 (j, i).
        assert_eq!(triple.coronal.shape(), (6, 6));
        assert_eq!(triple.sagittal.shape(), (6, 6));
        assert_eq!(triple.axial.shape(), (6, 6));
        assert!(triple.iter().all(|s| s.min() == Some(255)));

        // 负阈值不裁剪.
        let spec = spec.with_crop_threshold(Some(-1));
        let triple = extract_from_array(data.view(), &spec).unwrap();
        assert_eq!(triple.coronal.shape(), (16, 16));
    }

    #[test]
    fn test_extract_missing_and_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let spec = ExtractSpec::new();
        assert!(matches!(
            extract(dir.path().join("missing.nii.gz"), &spec),
            Err(Error::Io(_))
        ));

        let bad = dir.path().join("bad.nii");
        std::fs::write(&bad, b"definitely not nifti").unwrap();
        assert!(matches!(extract(&bad, &spec), Err(Error::Decode { .. })));
    }

    #[test]
    fn test_extract_many_keeps_order() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_volume(dir.path(), "good.nii", [1.0, -1.0, -1.0], &ramp((10, 10, 10)));
        let missing = dir.path().join("missing.nii");
        let results = extract_many(&[good.clone(), missing, good], &ExtractSpec::new());
        assert_eq!(results.len(), 3);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
        assert!(results[2].is_ok());
    }

    #[test]
    fn test_uniform_policy_from_str() {
        assert_eq!("ZERO".parse::<UniformPolicy>().unwrap(), UniformPolicy::Zero);
        assert_eq!("fail".parse::<UniformPolicy>().unwrap(), UniformPolicy::Fail);
        assert!("skip".parse::<UniformPolicy>().is_err());
    }
}
