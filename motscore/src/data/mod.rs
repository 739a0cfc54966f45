use std::path::{Path, PathBuf};

use ndarray::{Array3, ArrayView3, Axis, Ix3};
use nifti::{IntoNdArray, NiftiHeader, NiftiObject, ReaderOptions};

use crate::{Error, Idx3d, Result};

pub mod orient;
pub mod slice;
pub mod window;

pub use orient::{reorient, Affine, AxisCode, AxisCodes};
pub use slice::{GraySlice, ImgWriteRaw, ScanSlice};
pub use window::GrayWindow;

/// `NiftiHeader` 是栈上大对象, 移动该对象的开销很可观.
/// 因此我们将其分配到堆上.
type BoxedHeader = Box<NiftiHeader>;

/// nii 格式 3D MRI 体积, 包括 header 和体素强度. 强度以 `f32` 保存.
///
/// 体素数据按文件中的体素轴 `[i, j, k]` 索引, 不做任何方向调整.
#[derive(Debug, Clone)]
pub struct MriVolume {
    path: PathBuf,
    header: BoxedHeader,
    data: Array3<f32>,
}

/// 读取 header 中的体素个数 `[i, j, k]`.
#[inline]
fn get_shape_from_header(h: &NiftiHeader) -> Idx3d {
    let [_, i, j, k, ..] = h.dim;
    (i as usize, j as usize, k as usize)
}

/// 3D nii 文件 header 的共用属性和部分通用操作.
pub trait NiftiHeaderAttr {
    /// 获取 header 部分.
    fn header(&self) -> &NiftiHeader;

    /// 获取数据形状大小.
    #[inline]
    fn shape(&self) -> Idx3d {
        get_shape_from_header(self.header())
    }

    /// 获取数据体素个数.
    #[inline]
    fn size(&self) -> usize {
        let (i, j, k) = self.shape();
        i * j * k
    }

    /// 获取单个体素在三个体素轴上的分辨率, 以毫米为单位.
    #[inline]
    fn pix_dim(&self) -> [f64; 3] {
        let [_, i, j, k, ..] = self.header().pixdim;
        [i as f64, j as f64, k as f64]
    }

    /// 获取体素的实际体积值, 以立方毫米为单位.
    #[inline]
    fn voxel(&self) -> f64 {
        self.pix_dim().iter().product()
    }

    /// 体素索引到世界坐标 (RAS+, 毫米) 的仿射变换.
    ///
    /// 优先使用 sform, 其次 qform, 两者都缺失时退回 Analyze 约定的基础仿射.
    #[inline]
    fn affine(&self) -> Affine {
        orient::affine_from_header(self.header())
    }

    /// 每个体素轴最接近的解剖方向. 仿射奇异时返回 `None`.
    #[inline]
    fn axis_codes(&self) -> Option<AxisCodes> {
        AxisCodes::from_affine(&self.affine())
    }
}

impl NiftiHeaderAttr for MriVolume {
    #[inline]
    fn header(&self) -> &NiftiHeader {
        &self.header
    }

    #[inline]
    fn shape(&self) -> Idx3d {
        self.data.dim()
    }
}

impl MriVolume {
    /// 打开 nii (或 nii.gz) 文件格式的 3D MRI 体积. `path` 为本地路径.
    ///
    /// - 文件不存在时返回 `Error::Io`;
    /// - 文件无法解析, 或维度不是 3 (第 4 维长度为 1 的 4D 文件除外) 时返回 `Error::Decode`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("volume file `{}` does not exist", path.display()),
            )));
        }

        let obj = ReaderOptions::new()
            .read_file(path)
            .map_err(|e| Error::decode(path, e))?;
        let header = Box::new(obj.header().clone());

        let data = obj
            .into_volume()
            .into_ndarray::<f32>()
            .map_err(|e| Error::decode(path, e))?;

        let shape = data.shape().to_vec();
        let data = match shape.as_slice() {
            [_, _, _] => data.into_dimensionality::<Ix3>(),
            [_, _, _, 1] => data.index_axis_move(Axis(3), 0).into_dimensionality::<Ix3>(),
            shape => {
                return Err(Error::decode(
                    path,
                    format!("expected a 3D volume, found shape {shape:?}"),
                ))
            }
        }
        .map_err(|e| Error::decode(path, e))?;

        Ok(Self {
            path: path.to_owned(),
            header,
            data,
        })
    }

    /// 根据 header 和体素数据直接创建实体. `data` 按体素轴 `[i, j, k]` 索引.
    ///
    /// 数据形状会写回 header 的 `dim` 字段, 其余字段保持原样.
    pub fn from_parts(mut header: NiftiHeader, data: Array3<f32>) -> Self {
        let (i, j, k) = data.dim();
        header.dim = [3, i as u16, j as u16, k as u16, 1, 1, 1, 1];
        Self {
            path: PathBuf::new(),
            header: Box::new(header),
            data,
        }
    }

    /// 体积来源路径. 由 [`Self::from_parts`] 创建时为空.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }

    /// 获取沿体素轴 `axis` 的第 `index` 层切片视图.
    ///
    /// 当 `axis` 或 `index` 越界时 panic.
    #[inline]
    pub fn slice_along(&self, axis: usize, index: usize) -> ScanSlice<'_> {
        ScanSlice::new(self.data.index_axis(Axis(axis), index))
    }

    /// 将体素数据调整到 `target` 方向, 并交出所有权.
    ///
    /// 仿射奇异 (无法确定体素轴方向) 时返回 `Error::Decode`.
    pub fn into_oriented(self, target: AxisCodes) -> Result<Array3<f32>> {
        let Some(codes) = self.axis_codes() else {
            return Err(Error::decode(&self.path, "affine is singular"));
        };
        log::debug!(
            "event=reorient module=data from={codes} to={target} path={}",
            self.path.display()
        );
        Ok(reorient(self.data, codes, target))
    }
}
