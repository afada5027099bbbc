// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/frame.rs - BGR 帧与 NHWC 张量定义
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

use image::RgbImage;
use thiserror::Error;

pub const BGR_CHANNELS: usize = 3;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
  #[error("图像尺寸无效: {width}x{height}")]
  EmptyImage { width: u32, height: u32 },
  #[error("通道数无效: 期望 3, 实际 {0}")]
  ChannelMismatch(usize),
  #[error("数据长度不匹配: 期望长度 {expected}, 实际长度 {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// 相机采集的彩色帧，通道顺序为 B、G、R
///
/// 构造时即完成合法性检查，之后不可修改。
#[derive(Debug, Clone, PartialEq)]
pub struct BgrFrame {
  width: u32,
  height: u32,
  data: Box<[u8]>,
}

impl BgrFrame {
  /// 从交织存储（HWC）的原始字节构造帧
  pub fn from_raw(
    width: u32,
    height: u32,
    channels: usize,
    data: Vec<u8>,
  ) -> Result<Self, FrameError> {
    if width == 0 || height == 0 {
      return Err(FrameError::EmptyImage { width, height });
    }
    if channels != BGR_CHANNELS {
      return Err(FrameError::ChannelMismatch(channels));
    }
    let expected = BGR_CHANNELS * width as usize * height as usize;
    if data.len() != expected {
      return Err(FrameError::LengthMismatch {
        expected,
        actual: data.len(),
      });
    }

    Ok(Self {
      width,
      height,
      data: data.into_boxed_slice(),
    })
  }

  /// 将解码得到的 RGB 图像转换为采集约定的 BGR 帧
  pub fn from_rgb_image(image: &RgbImage) -> Result<Self, FrameError> {
    let (width, height) = image.dimensions();
    let mut data = Vec::with_capacity(image.as_raw().len());
    for pixel in image.pixels() {
      data.extend_from_slice(&[pixel[2], pixel[1], pixel[0]]);
    }
    Self::from_raw(width, height, BGR_CHANNELS, data)
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn channels(&self) -> usize {
    BGR_CHANNELS
  }

  pub fn as_bgr(&self) -> &[u8] {
    &self.data
  }

  /// [b, g, r]
  pub fn pixel(&self, x: u32, y: u32) -> [u8; 3] {
    let idx = (y as usize * self.width as usize + x as usize) * BGR_CHANNELS;
    [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
  }
}

/// 检测器输入张量，形状为 [1, H, W, 3]，RGB 通道，f32 原始像素值
#[derive(Debug, Clone, PartialEq)]
pub struct NhwcTensor<const W: u32, const H: u32> {
  data: Box<[f32]>,
}

impl<const W: u32, const H: u32> Default for NhwcTensor<W, H> {
  fn default() -> Self {
    Self {
      data: vec![0.0f32; Self::len()].into_boxed_slice(),
    }
  }
}

impl<const W: u32, const H: u32> NhwcTensor<W, H> {
  pub const BATCH: usize = 1;

  fn len() -> usize {
    Self::BATCH * BGR_CHANNELS * W as usize * H as usize
  }

  pub fn shape(&self) -> [usize; 4] {
    [Self::BATCH, H as usize, W as usize, BGR_CHANNELS]
  }

  pub fn height(&self) -> usize {
    H as usize
  }

  pub fn width(&self) -> usize {
    W as usize
  }

  pub fn channels(&self) -> usize {
    BGR_CHANNELS
  }

  pub fn as_nhwc(&self) -> &[f32] {
    &self.data
  }

  /// [r, g, b]
  pub fn pixel(&self, x: usize, y: usize) -> [f32; 3] {
    let idx = (y * W as usize + x) * BGR_CHANNELS;
    [self.data[idx], self.data[idx + 1], self.data[idx + 2]]
  }

  /// 本机字节序的原始字节，供推理运行时直接拷贝
  pub fn to_ne_bytes(&self) -> Vec<u8> {
    self.data.iter().flat_map(|v| v.to_ne_bytes()).collect()
  }
}

impl<const W: u32, const H: u32> AsMut<[f32]> for NhwcTensor<W, H> {
  fn as_mut(&mut self) -> &mut [f32] {
    &mut self.data
  }
}
