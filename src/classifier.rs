// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/classifier.rs - 交通灯分类器
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

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::{
  frame::{BgrFrame, FrameError, NhwcTensor},
  light::TrafficLightState,
  model::{Detection, Detector},
  policy::DecisionPolicy,
  preprocess::{Preprocessor, SSD_INPUT_H, SSD_INPUT_W},
};

#[derive(Error, Debug)]
pub enum ClassifyError<E: std::error::Error + 'static> {
  #[error("输入帧无效: {0}")]
  InvalidInput(#[from] FrameError),
  #[error("推理失败: {0}")]
  Inference(#[source] E),
}

/// 一次分类的完整结果
#[derive(Debug, Clone, Serialize)]
pub struct Classification {
  pub state: TrafficLightState,
  pub num_detections: usize,
  /// 决定结果的检测在模型输出中的位置
  pub winner_index: Option<usize>,
  pub winner: Option<Detection>,
}

/// 预处理、检测与决策的组合，对外提供单帧分类
pub struct TlClassifier<D, const W: u32 = SSD_INPUT_W, const H: u32 = SSD_INPUT_H> {
  preprocessor: Preprocessor<W, H>,
  detector: D,
  policy: DecisionPolicy,
}

impl<D, const W: u32, const H: u32> TlClassifier<D, W, H>
where
  D: Detector<Input = NhwcTensor<W, H>>,
{
  pub fn new(detector: D, policy: DecisionPolicy) -> Self {
    Self {
      preprocessor: Preprocessor::default(),
      detector,
      policy,
    }
  }

  pub fn with_preprocessor(mut self, preprocessor: Preprocessor<W, H>) -> Self {
    self.preprocessor = preprocessor;
    self
  }

  pub fn policy(&self) -> &DecisionPolicy {
    &self.policy
  }

  pub fn detector(&self) -> &D {
    &self.detector
  }

  pub fn classify(&self, frame: &BgrFrame) -> Result<Classification, ClassifyError<D::Error>> {
    let tensor = self.preprocessor.prepare(frame)?;
    let result = self
      .detector
      .detect(&tensor)
      .map_err(ClassifyError::Inference)?;
    debug!("模型输出 {} 个检测", result.len());

    let selection = self.policy.select(&result.items);
    let classification = Classification {
      state: selection
        .map(|s| s.state)
        .unwrap_or(TrafficLightState::Unknown),
      num_detections: result.len(),
      winner_index: selection.map(|s| s.index),
      winner: selection.map(|s| s.detection),
    };
    debug!("分类结果: {}", classification.state);

    Ok(classification)
  }

  pub fn get_classification(
    &self,
    frame: &BgrFrame,
  ) -> Result<TrafficLightState, ClassifyError<D::Error>> {
    self.classify(frame).map(|c| c.state)
  }
}
