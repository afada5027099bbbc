// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/preprocess.rs - 图像预处理
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use image::{ImageBuffer, Rgb, imageops::FilterType};
use tracing::{debug, trace};

use crate::frame::{BGR_CHANNELS, BgrFrame, FrameError, NhwcTensor};

/// SSD 系列参考模型的输入尺寸
pub const SSD_INPUT_W: u32 = 300;
pub const SSD_INPUT_H: u32 = 300;

pub type Ssd300Preprocessor = Preprocessor<SSD_INPUT_W, SSD_INPUT_H>;
pub type Ssd300Tensor = NhwcTensor<SSD_INPUT_W, SSD_INPUT_H>;

/// 缩放方式
///
/// `Linear` 是逐点双线性采样，源坐标取 `(dst + 0.5) * scale - 0.5`，
/// 缩小时不扩展卷积核，与参考模型训练时的预处理一致。
/// `Filter` 使用 `image::imageops::resize`，其 `Triangle` 等滤波在缩小时会展宽核做抗锯齿，
/// 像素值与参考预处理不同。
#[derive(Debug, Clone, Copy)]
pub enum Resize {
  Linear,
  Filter(FilterType),
}

/// 将任意尺寸的 BGR 帧转换为检测器所需的 [1, H, W, 3] RGB f32 张量
#[derive(Debug, Clone, Copy)]
pub struct Preprocessor<const W: u32, const H: u32> {
  resize: Resize,
}

impl<const W: u32, const H: u32> Default for Preprocessor<W, H> {
  fn default() -> Self {
    Self {
      resize: Resize::Linear,
    }
  }
}

impl<const W: u32, const H: u32> Preprocessor<W, H> {
  pub fn filter(mut self, filter: FilterType) -> Self {
    self.resize = Resize::Filter(filter);
    self
  }

  pub fn resize(mut self, resize: Resize) -> Self {
    self.resize = resize;
    self
  }

  pub fn prepare(&self, frame: &BgrFrame) -> Result<NhwcTensor<W, H>, FrameError> {
    let (width, height) = (frame.width(), frame.height());
    // 缩放不关心通道含义，这里借用 Rgb 容器承载 BGR 数据
    let buffer: ImageBuffer<Rgb<u8>, Vec<u8>> =
      ImageBuffer::from_raw(width, height, frame.as_bgr().to_vec()).ok_or(
        FrameError::LengthMismatch {
          expected: BGR_CHANNELS * width as usize * height as usize,
          actual: frame.as_bgr().len(),
        },
      )?;

    let resized = if (width, height) == (W, H) {
      trace!("输入尺寸与模型一致，跳过缩放");
      buffer
    } else {
      debug!("缩放输入图像: {}x{} -> {}x{}", width, height, W, H);
      match self.resize {
        Resize::Linear => resize_linear(&buffer, W, H),
        Resize::Filter(filter) => image::imageops::resize(&buffer, W, H, filter),
      }
    };

    let mut tensor = NhwcTensor::<W, H>::default();
    let slice = tensor.as_mut();
    for (dst, bgr) in slice
      .chunks_exact_mut(BGR_CHANNELS)
      .zip(resized.as_raw().chunks_exact(BGR_CHANNELS))
    {
      // BGR -> RGB
      dst[0] = bgr[2] as f32;
      dst[1] = bgr[1] as f32;
      dst[2] = bgr[0] as f32;
    }

    Ok(tensor)
  }
}

/// 源坐标与插值权重，越界时贴边且权重归零
fn sample_axis(dst: u32, src_len: u32, dst_len: u32) -> (u32, u32, f32) {
  let scale = src_len as f32 / dst_len as f32;
  let pos = (dst as f32 + 0.5) * scale - 0.5;
  let last = src_len - 1;
  if pos <= 0.0 {
    return (0, 1.min(last), 0.0);
  }
  let i0 = pos.floor() as u32;
  if i0 >= last {
    return (last, last, 0.0);
  }
  (i0, i0 + 1, pos - i0 as f32)
}

fn resize_linear(
  src: &ImageBuffer<Rgb<u8>, Vec<u8>>,
  width: u32,
  height: u32,
) -> ImageBuffer<Rgb<u8>, Vec<u8>> {
  let (src_w, src_h) = src.dimensions();
  let xs: Vec<_> = (0..width).map(|x| sample_axis(x, src_w, width)).collect();

  ImageBuffer::from_fn(width, height, |x, y| {
    let (y0, y1, fy) = sample_axis(y, src_h, height);
    let (x0, x1, fx) = xs[x as usize];
    let (p00, p01) = (src.get_pixel(x0, y0).0, src.get_pixel(x1, y0).0);
    let (p10, p11) = (src.get_pixel(x0, y1).0, src.get_pixel(x1, y1).0);

    let mut out = [0u8; 3];
    for c in 0..3 {
      let top = p00[c] as f32 * (1.0 - fx) + p01[c] as f32 * fx;
      let bottom = p10[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
      out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
  })
}
