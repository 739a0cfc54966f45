//! 图像的持久化存储和编码.

use crate::{GraySlice, Result};
use base64::Engine;
use image::codecs::png::PngEncoder;
use image::{ColorType, GrayImage, ImageEncoder, ImageResult};
use std::path::Path;

/// 表明一个可以通过 **按原样** 模式持久化存储的图像对象.
///
/// 像素值不做任何映射, 直接写入单通道灰度图像.
pub trait ImgWriteRaw {
    /// 按原样将图片保存到 `path` 路径. 格式由扩展名决定.
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()>;
}

/// 按原样存储.
impl ImgWriteRaw for GraySlice {
    fn save_raw<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.to_gray_image().save(path)
    }
}

impl GraySlice {
    /// 转换为 `image` 的灰度图像. 行对应高, 列对应宽.
    pub fn to_gray_image(&self) -> GrayImage {
        let (height, width) = self.shape();
        let mut buf = GrayImage::new(width as u32, height as u32);
        for ((h, w), &pix) in self.array_view().indexed_iter() {
            buf.put_pixel(w as u32, h as u32, image::Luma([pix]));
        }
        buf
    }

    /// 编码为 8-bit 单通道 PNG.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let (height, width) = self.shape();
        let raw = self.as_row_major_vec();
        let mut buf = Vec::new();
        PngEncoder::new(&mut buf).write_image(&raw, width as u32, height as u32, ColorType::L8)?;
        Ok(buf)
    }

    /// 编码为 PNG 后再以标准字母表做 base64 编码, 用于 JSON 传输.
    pub fn to_base64_png(&self) -> Result<String> {
        Ok(base64::engine::general_purpose::STANDARD.encode(self.to_png()?))
    }
}
