// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/model/recorded.rs - 回放录制的模型输出
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

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{AlignmentError, DetectResult, Detector},
  preprocess::Ssd300Tensor,
};

#[derive(Error, Debug)]
pub enum RecordedError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl From<std::io::Error> for RecordedError {
  fn from(err: std::io::Error) -> Self {
    RecordedError::ModelLoadError(format!("I/O 错误: {}", err))
  }
}

impl From<serde_json::Error> for RecordedError {
  fn from(err: serde_json::Error) -> Self {
    RecordedError::ModelLoadError(format!("解析错误: {}", err))
  }
}

impl From<AlignmentError> for RecordedError {
  fn from(err: AlignmentError) -> Self {
    RecordedError::ModelLoadError(err.to_string())
  }
}

/// 与模型三个输出一一对应的录制格式
#[derive(Debug, Deserialize)]
struct RecordedOutputs {
  classes: Vec<f32>,
  scores: Vec<f32>,
  boxes: Vec<[f32; 4]>,
}

/// 回放一次录制好的模型输出，每次调用都返回同一组检测结果
///
/// 用于在没有 NPU 的环境中离线验证决策逻辑。
#[derive(Debug, Clone)]
pub struct RecordedDetector {
  result: DetectResult,
}

impl FromUrlWithScheme for RecordedDetector {
  const SCHEME: &'static str = "recorded";
}

impl FromUrl for RecordedDetector {
  type Error = RecordedError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(RecordedError::SchemeMismatch(format!(
        "模型路径必须使用 {} 方案, 实际为 {}",
        Self::SCHEME,
        url.scheme()
      )));
    }

    Self::open(crate::url_file_path(url))
  }
}

impl RecordedDetector {
  pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RecordedError> {
    let path = path.as_ref();
    info!("加载录制的模型输出: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_json(&content)
  }

  pub fn from_json(content: &str) -> Result<Self, RecordedError> {
    let outputs: RecordedOutputs = serde_json::from_str(content)?;
    let boxes: Vec<f32> = outputs.boxes.iter().flatten().copied().collect();
    let result = DetectResult::from_aligned(&outputs.classes, &outputs.scores, &boxes)?;
    debug!("录制结果包含 {} 个检测", result.len());
    Ok(Self { result })
  }
}

impl From<DetectResult> for RecordedDetector {
  fn from(result: DetectResult) -> Self {
    Self { result }
  }
}

impl Detector for RecordedDetector {
  type Input = Ssd300Tensor;
  type Error = RecordedError;

  fn detect(&self, _input: &Self::Input) -> Result<DetectResult, Self::Error> {
    Ok(self.result.clone())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_three_aligned_outputs() {
    let detector = RecordedDetector::from_json(
      r#"{
        "classes": [2.0, 1.0],
        "scores": [0.91, 0.3],
        "boxes": [[0.1, 0.2, 0.3, 0.4], [0.5, 0.5, 0.6, 0.6]]
      }"#,
    )
    .unwrap();

    let result = detector.detect(&Ssd300Tensor::default()).unwrap();
    assert_eq!(result.len(), 2);
    assert_eq!(result.items[0].class_id, 2);
    assert_eq!(result.items[1].bbox, [0.5, 0.5, 0.6, 0.6]);
  }

  #[test]
  fn misaligned_recording_is_a_load_error() {
    let err = RecordedDetector::from_json(
      r#"{"classes": [1.0], "scores": [0.9, 0.8], "boxes": [[0, 0, 1, 1]]}"#,
    )
    .unwrap_err();
    assert!(matches!(err, RecordedError::ModelLoadError(_)));
  }

  #[test]
  fn missing_file_is_a_load_error() {
    let url = Url::parse("recorded:///definitely/not/here.json").unwrap();
    let err = RecordedDetector::from_url(&url).unwrap_err();
    assert!(matches!(err, RecordedError::ModelLoadError(_)));
  }

  #[test]
  fn wrong_scheme_is_rejected() {
    let url = Url::parse("ssd:///model.rknn").unwrap();
    let err = RecordedDetector::from_url(&url).unwrap_err();
    assert!(matches!(err, RecordedError::SchemeMismatch(_)));
  }
}
