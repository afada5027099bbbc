// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/model.rs - 检测模型
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, preprocess::Ssd300Tensor};

/// 检测器适配层：输入张量，输出按模型原生顺序排列的检测结果。
///
/// 实现中不应包含任何决策逻辑，也不应在调用之间缓存结果。
pub trait Detector {
  type Input;
  type Error: std::error::Error + Send + Sync + 'static;

  fn detect(&self, input: &Self::Input) -> Result<DetectResult, Self::Error>;
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
  pub class_id: u32,
  pub score: f32,
  pub bbox: [f32; 4], // 模型原生顺序，SSD 为 [y_min, x_min, y_max, x_max]
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectResult {
  pub items: Box<[Detection]>,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AlignmentError {
  #[error("类别与置信度数量不一致: 类别 {classes}, 置信度 {scores}")]
  ClassesMismatch { classes: usize, scores: usize },
  #[error("边界框数量不一致: 期望 {expected} 个坐标, 实际 {actual} 个")]
  BoxesMismatch { expected: usize, actual: usize },
}

impl DetectResult {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  /// 将按位置对齐的三个输出数组组合为检测结果
  ///
  /// 第 i 个类别、置信度与第 i 组四个坐标描述同一个检测。
  /// 类别以浮点形式给出时四舍五入取整，负数与 NaN 视为 0 号类别。
  pub fn from_aligned(
    classes: &[f32],
    scores: &[f32],
    boxes: &[f32],
  ) -> Result<Self, AlignmentError> {
    if classes.len() != scores.len() {
      return Err(AlignmentError::ClassesMismatch {
        classes: classes.len(),
        scores: scores.len(),
      });
    }
    if boxes.len() != 4 * scores.len() {
      return Err(AlignmentError::BoxesMismatch {
        expected: 4 * scores.len(),
        actual: boxes.len(),
      });
    }

    let items = classes
      .iter()
      .zip(scores)
      .zip(boxes.chunks_exact(4))
      .map(|((&class, &score), bbox)| Detection {
        class_id: class.round() as u32,
        score,
        bbox: [bbox[0], bbox[1], bbox[2], bbox[3]],
      })
      .collect::<Vec<_>>();

    Ok(DetectResult {
      items: items.into_boxed_slice(),
    })
  }
}

impl From<Vec<Detection>> for DetectResult {
  fn from(items: Vec<Detection>) -> Self {
    DetectResult {
      items: items.into_boxed_slice(),
    }
  }
}

mod recorded;
pub use self::recorded::{RecordedDetector, RecordedError};

#[cfg(feature = "model_ssd_rknn")]
mod ssd;
#[cfg(feature = "model_ssd_rknn")]
pub use self::ssd::{SsdRknn, SsdRknnBuilder, SsdRknnError};

#[derive(Error, Debug)]
pub enum ModelError {
  #[error("录制检测结果错误: {0}")]
  RecordedError(#[from] RecordedError),
  #[cfg(feature = "model_ssd_rknn")]
  #[error("SSD 模型错误: {0}")]
  SsdRknnError(#[from] SsdRknnError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

/// 按 URL 方案选择检测器，输入为 300x300 的 SSD 张量
pub enum ModelWrapper {
  Recorded(RecordedDetector),
  #[cfg(feature = "model_ssd_rknn")]
  SsdRknn(SsdRknn),
}

impl FromUrl for ModelWrapper {
  type Error = ModelError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      RecordedDetector::SCHEME => {
        let model = RecordedDetector::from_url(url)?;
        Ok(ModelWrapper::Recorded(model))
      }
      #[cfg(feature = "model_ssd_rknn")]
      SsdRknnBuilder::SCHEME => {
        let model = SsdRknnBuilder::from_url(url)?.build()?;
        Ok(ModelWrapper::SsdRknn(model))
      }
      other => Err(ModelError::SchemeMismatch(other.to_string())),
    }
  }
}

impl Detector for ModelWrapper {
  type Input = Ssd300Tensor;
  type Error = ModelError;

  fn detect(&self, input: &Self::Input) -> Result<DetectResult, Self::Error> {
    match self {
      ModelWrapper::Recorded(model) => model.detect(input).map_err(ModelError::from),
      #[cfg(feature = "model_ssd_rknn")]
      ModelWrapper::SsdRknn(model) => model.detect(input).map_err(ModelError::from),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn aligned_outputs_keep_native_order() {
    let result = DetectResult::from_aligned(
      &[3.0, 1.0],
      &[0.2, 0.9],
      &[0.1, 0.2, 0.3, 0.4, 0.5, 0.6, 0.7, 0.8],
    )
    .unwrap();

    assert_eq!(result.len(), 2);
    assert_eq!(result.items[0].class_id, 3);
    assert_eq!(result.items[0].bbox, [0.1, 0.2, 0.3, 0.4]);
    assert_eq!(result.items[1].class_id, 1);
    assert_eq!(result.items[1].score, 0.9);
  }

  #[test]
  fn float_class_ids_are_rounded_and_clamped() {
    let result =
      DetectResult::from_aligned(&[1.9999, -1.0, f32::NAN], &[0.5; 3], &[0.0; 12]).unwrap();
    let ids: Vec<_> = result.items.iter().map(|d| d.class_id).collect();
    assert_eq!(ids, vec![2, 0, 0]);
  }

  #[test]
  fn misaligned_outputs_are_rejected() {
    assert_eq!(
      DetectResult::from_aligned(&[1.0], &[0.5, 0.6], &[0.0; 8]),
      Err(AlignmentError::ClassesMismatch {
        classes: 1,
        scores: 2
      })
    );
    assert_eq!(
      DetectResult::from_aligned(&[1.0], &[0.5], &[0.0; 3]),
      Err(AlignmentError::BoxesMismatch {
        expected: 4,
        actual: 3
      })
    );
  }

  #[test]
  fn empty_outputs_give_empty_result() {
    let result = DetectResult::from_aligned(&[], &[], &[]).unwrap();
    assert!(result.is_empty());
  }
}
