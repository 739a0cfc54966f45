//! 体素轴方向.
//!
//! 世界坐标系采用 nifti 的 RAS+ 约定: x 轴指向右 (Right), y 轴指向前 (Anterior),
//! z 轴指向上 (Superior). 一个体素轴的方向用它 **递增** 时所指向的解剖方向表示,
//! 例如 `RPI` 表示第 0 轴向右, 第 1 轴向后, 第 2 轴向下递增.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use itertools::iproduct;
use ndarray::{Array3, Axis};
use nifti::NiftiHeader;

/// 体素索引 `(i, j, k, 1)` 到世界坐标的 4x4 仿射矩阵, 行优先.
pub type Affine = [[f64; 4]; 4];

/// 单个体素轴递增时指向的解剖方向.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum AxisCode {
    /// 右.
    Right,
    /// 左.
    Left,
    /// 前.
    Anterior,
    /// 后.
    Posterior,
    /// 上.
    Superior,
    /// 下.
    Inferior,
}

impl AxisCode {
    /// 由世界坐标轴 (0, 1, 2 分别为 x, y, z) 和方向构造.
    ///
    /// 当 `world_axis > 2` 时 panic.
    pub const fn from_world(world_axis: usize, positive: bool) -> Self {
        match (world_axis, positive) {
            (0, true) => Self::Right,
            (0, false) => Self::Left,
            (1, true) => Self::Anterior,
            (1, false) => Self::Posterior,
            (2, true) => Self::Superior,
            (2, false) => Self::Inferior,
            _ => panic!("world axis out of range"),
        }
    }

    /// 对应的世界坐标轴.
    #[inline]
    pub const fn world_axis(self) -> usize {
        match self {
            Self::Right | Self::Left => 0,
            Self::Anterior | Self::Posterior => 1,
            Self::Superior | Self::Inferior => 2,
        }
    }

    /// 是否与 RAS+ 世界坐标轴同向?
    #[inline]
    pub const fn is_positive(self) -> bool {
        matches!(self, Self::Right | Self::Anterior | Self::Superior)
    }

    /// 单字母缩写.
    #[inline]
    pub const fn letter(self) -> char {
        match self {
            Self::Right => 'R',
            Self::Left => 'L',
            Self::Anterior => 'A',
            Self::Posterior => 'P',
            Self::Superior => 'S',
            Self::Inferior => 'I',
        }
    }

    /// 由单字母缩写解析, 大小写不敏感.
    pub fn from_letter(c: char) -> Option<Self> {
        match c.to_ascii_uppercase() {
            'R' => Some(Self::Right),
            'L' => Some(Self::Left),
            'A' => Some(Self::Anterior),
            'P' => Some(Self::Posterior),
            'S' => Some(Self::Superior),
            'I' => Some(Self::Inferior),
            _ => None,
        }
    }
}

/// 三个体素轴的方向. 保证三个轴分别对应三个不同的世界坐标轴.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct AxisCodes([AxisCode; 3]);

impl AxisCodes {
    /// 切片提取使用的规范方向: 右, 后, 下.
    pub const RPI: AxisCodes = AxisCodes([AxisCode::Right, AxisCode::Posterior, AxisCode::Inferior]);

    /// nifti 世界坐标系本身的方向.
    pub const RAS: AxisCodes = AxisCodes([AxisCode::Right, AxisCode::Anterior, AxisCode::Superior]);

    /// 构造方向. 若有两个轴对应同一世界坐标轴, 返回 `None`.
    pub fn new(codes: [AxisCode; 3]) -> Option<Self> {
        let mut seen = [false; 3];
        for c in codes {
            if std::mem::replace(&mut seen[c.world_axis()], true) {
                return None;
            }
        }
        Some(Self(codes))
    }

    /// 获取各体素轴方向.
    #[inline]
    pub fn codes(&self) -> [AxisCode; 3] {
        self.0
    }

    /// 由仿射矩阵推导每个体素轴最接近的解剖方向.
    ///
    /// 先将旋转缩放部分按列归一化, 再反复选取剩余行列中绝对值最大的元素,
    /// 把对应体素轴分配给对应世界坐标轴. 若某列全零 (仿射奇异), 返回 `None`.
    pub fn from_affine(affine: &Affine) -> Option<Self> {
        // cols[体素轴][世界轴]
        let mut cols = [[0.0f64; 3]; 3];
        for (j, col) in cols.iter_mut().enumerate() {
            let norm = (0..3).map(|i| affine[i][j].powi(2)).sum::<f64>().sqrt();
            if !(norm.is_finite() && norm > 0.0) {
                return None;
            }
            for (i, v) in col.iter_mut().enumerate() {
                *v = affine[i][j] / norm;
            }
        }

        let mut codes = [None; 3];
        let mut used = [false; 3];
        for _ in 0..3 {
            let (j, i, v) = iproduct!(0..3, 0..3)
                .filter(|&(j, i)| codes[j].is_none() && !used[i])
                .map(|(j, i)| (j, i, cols[j][i]))
                .max_by(|a, b| a.2.abs().total_cmp(&b.2.abs()))?;
            if v == 0.0 {
                return None;
            }
            codes[j] = Some(AxisCode::from_world(i, v > 0.0));
            used[i] = true;
        }

        let [Some(a), Some(b), Some(c)] = codes else {
            return None;
        };
        Some(Self([a, b, c]))
    }

    /// `[世界轴] -> 体素轴` 的查找表.
    fn world_to_axis(&self) -> [usize; 3] {
        let mut table = [0; 3];
        for (axis, code) in self.0.iter().enumerate() {
            table[code.world_axis()] = axis;
        }
        table
    }
}

impl Display for AxisCodes {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for c in self.0 {
            write!(f, "{}", c.letter())?;
        }
        Ok(())
    }
}

/// 解析 `AxisCodes` 失败.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseAxisCodesError(String);

impl Display for ParseAxisCodesError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid axis codes `{}`", self.0)
    }
}

impl std::error::Error for ParseAxisCodesError {}

impl FromStr for AxisCodes {
    type Err = ParseAxisCodesError;

    /// 解析形如 `"RPI"` 的三字母方向.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseAxisCodesError(s.to_string());
        let letters: Vec<AxisCode> = s
            .chars()
            .map(AxisCode::from_letter)
            .collect::<Option<_>>()
            .ok_or_else(err)?;
        let codes: [AxisCode; 3] = letters.try_into().map_err(|_| err())?;
        Self::new(codes).ok_or_else(err)
    }
}

/// 将按 `from` 方向存储的体素数据翻转并转置, 使其按 `to` 方向存储.
///
/// 返回的数组可能不是标准内存布局.
pub fn reorient<A>(mut data: Array3<A>, from: AxisCodes, to: AxisCodes) -> Array3<A> {
    let target = to.world_to_axis();
    let mut perm = [0usize; 3];
    for (axis, code) in from.0.iter().enumerate() {
        let k = target[code.world_axis()];
        if code.is_positive() != to.0[k].is_positive() {
            data.invert_axis(Axis(axis));
        }
        perm[k] = axis;
    }
    data.permuted_axes(perm)
}

/// 体素分辨率. 非正或非有限值视为 1 毫米.
#[inline]
fn zoom(p: f32) -> f64 {
    let p = (p as f64).abs();
    if p.is_finite() && p > 0.0 {
        p
    } else {
        1.0
    }
}

/// 按 nifti 约定从 header 解析仿射矩阵.
pub(crate) fn affine_from_header(h: &NiftiHeader) -> Affine {
    if h.sform_code > 0 {
        sform_affine(h)
    } else if h.qform_code > 0 {
        qform_affine(h)
    } else {
        base_affine(h)
    }
}

fn sform_affine(h: &NiftiHeader) -> Affine {
    let row = |r: [f32; 4]| r.map(f64::from);
    [
        row(h.srow_x),
        row(h.srow_y),
        row(h.srow_z),
        [0.0, 0.0, 0.0, 1.0],
    ]
}

/// 由四元数和体素分辨率构造仿射. `pixdim[0]` 为负时第 3 轴反向 (qfac).
fn qform_affine(h: &NiftiHeader) -> Affine {
    let (b, c, d) = (
        h.quatern_b as f64,
        h.quatern_c as f64,
        h.quatern_d as f64,
    );
    let a = (1.0 - (b * b + c * c + d * d)).max(0.0).sqrt();
    let r = [
        [
            a * a + b * b - c * c - d * d,
            2.0 * (b * c - a * d),
            2.0 * (b * d + a * c),
        ],
        [
            2.0 * (b * c + a * d),
            a * a + c * c - b * b - d * d,
            2.0 * (c * d - a * b),
        ],
        [
            2.0 * (b * d - a * c),
            2.0 * (c * d + a * b),
            a * a + d * d - c * c - b * b,
        ],
    ];
    let qfac = if h.pixdim[0] < 0.0 { -1.0 } else { 1.0 };
    let zooms = [
        zoom(h.pixdim[1]),
        zoom(h.pixdim[2]),
        zoom(h.pixdim[3]) * qfac,
    ];
    let offset = [
        h.quatern_x as f64,
        h.quatern_y as f64,
        h.quatern_z as f64,
    ];

    let mut affine = [[0.0; 4]; 4];
    for i in 0..3 {
        for j in 0..3 {
            affine[i][j] = r[i][j] * zooms[j];
        }
        affine[i][3] = offset[i];
    }
    affine[3][3] = 1.0;
    affine
}

/// Analyze 约定: x 轴取反, 原点位于体积中心.
fn base_affine(h: &NiftiHeader) -> Affine {
    let [_, di, dj, dk, ..] = h.dim;
    let zooms = [-zoom(h.pixdim[1]), zoom(h.pixdim[2]), zoom(h.pixdim[3])];
    let origin = [di, dj, dk].map(|d| (d.max(1) as f64 - 1.0) / 2.0);

    let mut affine = [[0.0; 4]; 4];
    for i in 0..3 {
        affine[i][i] = zooms[i];
        affine[i][3] = -origin[i] * zooms[i];
    }
    affine[3][3] = 1.0;
    affine
}
