//! 集成测试共用的合成数据.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::Array3;
use nifti::writer::WriterOptions;
use nifti::NiftiHeader;

/// 以对角 sform 写出一个 nifti 体积.
pub fn write_volume(path: &Path, diag: [f32; 3], data: &Array3<f32>) {
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    let header = NiftiHeader {
        sform_code: 1,
        srow_x: [diag[0], 0.0, 0.0, 0.0],
        srow_y: [0.0, diag[1], 0.0, 0.0],
        srow_z: [0.0, 0.0, diag[2], 0.0],
        pixdim: [1.0; 8],
        ..NiftiHeader::default()
    };
    WriterOptions::new(path)
        .reference_header(&header)
        .write_nifti(data)
        .unwrap();
}

/// 强度随体素索引单调递增的体积, 任何切片都不均匀.
pub fn ramp(shape: (usize, usize, usize), seed: usize) -> Array3<f32> {
    Array3::from_shape_fn(shape, |(i, j, k)| (seed + i * 10_000 + j * 100 + k) as f32)
}

/// 在 `parent/name` 下建立一个有 `n_sub` 个受试者, 每人一个会话的 BIDS 数据集.
/// 返回数据集根目录.
pub fn bids_dataset(parent: &Path, name: &str, n_sub: usize) -> PathBuf {
    let root = parent.join(name);
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(
        root.join("dataset_description.json"),
        format!(r#"{{"Name": "{name}", "BIDSVersion": "1.8.0"}}"#),
    )
    .unwrap();
    for s in 0..n_sub {
        let sub = format!("{s:06}");
        let anat = root.join(format!("sub-{sub}/ses-headmotion1/anat"));
        let file = anat.join(format!("sub-{sub}_ses-headmotion1_T1w.nii.gz"));
        // RAS 方向存储.
        write_volume(&file, [1.0, 1.0, 1.0], &ramp((24, 28, 32), s));
        std::fs::write(anat.join(format!("sub-{sub}_ses-headmotion1_T1w.json")), "{}").unwrap();
    }
    root
}
