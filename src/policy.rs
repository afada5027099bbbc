// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/policy.rs - 交通灯状态决策
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

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, trace};

use crate::{
  light::TrafficLightState,
  model::Detection,
  vocabulary::{LabelName, Vocabulary, VocabularyPreset},
};

#[derive(Error, Debug)]
pub enum PolicyError {
  #[error("置信度阈值必须在 [0, 1] 之间: {0}")]
  ThresholdOutOfRange(f32),
  #[error("词表不能为空")]
  EmptyVocabulary,
  #[error("未指定决策配置")]
  Unspecified,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("配置解析错误: {0}")]
  ParseError(#[from] serde_json::Error),
}

/// 置信度阈值，检测分数严格大于该值才参与决策
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f32);

impl Threshold {
  pub fn new(value: f32) -> Result<Self, PolicyError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
      return Err(PolicyError::ThresholdOutOfRange(value));
    }
    Ok(Threshold(value))
  }

  pub fn value(&self) -> f32 {
    self.0
  }

  /// NaN 分数永远不满足
  pub fn passes(&self, score: f32) -> bool {
    score > self.0
  }
}

/// 决策配置：阈值与词表必须显式给出，不提供默认值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
  pub threshold: f32,
  pub labels: Vec<LabelName>,
}

impl PolicyConfig {
  pub fn preset(preset: VocabularyPreset, threshold: f32) -> Self {
    Self {
      threshold,
      labels: preset.labels(),
    }
  }

  pub fn from_json(content: &str) -> Result<Self, PolicyError> {
    Ok(serde_json::from_str(content)?)
  }

  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PolicyError> {
    let path = path.as_ref();
    debug!("读取决策配置: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_json(&content)
  }
}

/// 获胜检测在原始序列中的位置
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Selection {
  pub index: usize,
  pub detection: Detection,
  pub state: TrafficLightState,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DecisionPolicy {
  threshold: Threshold,
  vocabulary: Vocabulary,
}

impl TryFrom<PolicyConfig> for DecisionPolicy {
  type Error = PolicyError;

  fn try_from(config: PolicyConfig) -> Result<Self, Self::Error> {
    if config.labels.is_empty() {
      return Err(PolicyError::EmptyVocabulary);
    }
    let threshold = Threshold::new(config.threshold)?;
    let policy = DecisionPolicy::new(threshold, Vocabulary::new(config.labels));
    info!(
      "决策策略: 阈值 {}, 词表 {}",
      policy.threshold.value(),
      policy.vocabulary
    );
    Ok(policy)
  }
}

impl DecisionPolicy {
  pub fn new(threshold: Threshold, vocabulary: Vocabulary) -> Self {
    Self {
      threshold,
      vocabulary,
    }
  }

  pub fn threshold(&self) -> Threshold {
    self.threshold
  }

  pub fn vocabulary(&self) -> &Vocabulary {
    &self.vocabulary
  }

  /// 按原生顺序返回第一个分数达标且解析为具体颜色的检测
  ///
  /// 分数达标但解析为背景或未知的检测会被跳过，继续向后查找。
  /// 这里不是按最高分取最大值，排序靠前的检测优先。
  pub fn select(&self, detections: &[Detection]) -> Option<Selection> {
    for (index, detection) in detections.iter().enumerate() {
      if !self.threshold.passes(detection.score) {
        trace!(
          "检测 {} 置信度 {:.3} 未超过阈值 {}",
          index, detection.score, self.threshold.value()
        );
        continue;
      }

      let state = self.vocabulary.resolve(detection.class_id);
      if state.is_color() {
        trace!(
          "检测 {} 类别 {} 置信度 {:.3} -> {}",
          index, detection.class_id, detection.score, state
        );
        return Some(Selection {
          index,
          detection: *detection,
          state,
        });
      }

      trace!(
        "检测 {} 类别 {} 不是具体颜色，继续查找",
        index, detection.class_id
      );
    }
    None
  }

  pub fn decide(&self, detections: &[Detection]) -> TrafficLightState {
    self
      .select(detections)
      .map(|selection| selection.state)
      .unwrap_or(TrafficLightState::Unknown)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(class_id: u32, score: f32) -> Detection {
    Detection {
      class_id,
      score,
      bbox: [0.0, 0.0, 1.0, 1.0],
    }
  }

  fn policy(preset: VocabularyPreset, threshold: f32) -> DecisionPolicy {
    DecisionPolicy::try_from(PolicyConfig::preset(preset, threshold)).unwrap()
  }

  #[test]
  fn empty_sequence_is_unknown() {
    let policy = policy(VocabularyPreset::UnknownFirst, 0.3);
    assert_eq!(policy.decide(&[]), TrafficLightState::Unknown);
    assert_eq!(policy.select(&[]), None);
  }

  #[test]
  fn first_qualifying_detection_wins_over_higher_score() {
    let policy = policy(VocabularyPreset::UnknownFirst, 0.5);
    let detections = [det(2, 0.81), det(1, 0.95)];
    assert_eq!(policy.decide(&detections), TrafficLightState::Yellow);
    assert_eq!(policy.select(&detections).map(|s| s.index), Some(0));
  }

  #[test]
  fn qualifying_background_does_not_stop_the_scan() {
    let policy = policy(VocabularyPreset::BackgroundFirst, 0.5);
    let detections = [det(0, 0.99), det(4, 0.97), det(3, 0.6)];
    let selection = policy.select(&detections).unwrap();
    assert_eq!(selection.index, 2);
    assert_eq!(selection.state, TrafficLightState::Green);
  }

  #[test]
  fn only_background_qualifies_gives_unknown() {
    let policy = policy(VocabularyPreset::BackgroundFirst, 0.5);
    assert_eq!(
      policy.decide(&[det(0, 0.99), det(2, 0.1)]),
      TrafficLightState::Unknown
    );
    let policy = self::policy(VocabularyPreset::UnknownFirst, 0.3);
    assert_eq!(policy.decide(&[det(0, 0.99)]), TrafficLightState::Unknown);
  }

  #[test]
  fn threshold_comparison_is_strict() {
    let policy = policy(VocabularyPreset::UnknownFirst, 0.3);
    assert_eq!(policy.decide(&[det(1, 0.3)]), TrafficLightState::Unknown);
    assert_eq!(
      policy.decide(&[det(1, 0.3 + f32::EPSILON)]),
      TrafficLightState::Red
    );
  }

  #[test]
  fn nan_score_never_qualifies() {
    let policy = policy(VocabularyPreset::UnknownFirst, 0.0);
    assert_eq!(policy.decide(&[det(1, f32::NAN)]), TrafficLightState::Unknown);
  }

  #[test]
  fn out_of_vocabulary_index_resolves_to_unknown() {
    let policy = policy(VocabularyPreset::UnknownFirst, 0.3);
    assert_eq!(
      policy.decide(&[det(90, 0.99), det(u32::MAX, 0.99)]),
      TrafficLightState::Unknown
    );
  }

  #[test]
  fn decide_always_returns_one_of_four_states() {
    let policy = policy(VocabularyPreset::BackgroundFirst, 0.5);
    for class_id in 0..16 {
      for score in [0.0, 0.5, 0.51, 1.0] {
        let state = policy.decide(&[det(class_id, score)]);
        assert!(TrafficLightState::ALL.contains(&state));
      }
    }
  }

  #[test]
  fn rejects_invalid_configuration() {
    assert!(matches!(
      Threshold::new(1.5),
      Err(PolicyError::ThresholdOutOfRange(_))
    ));
    assert!(Threshold::new(f32::NAN).is_err());
    let config = PolicyConfig {
      threshold: 0.5,
      labels: vec![],
    };
    assert!(matches!(
      DecisionPolicy::try_from(config),
      Err(PolicyError::EmptyVocabulary)
    ));
  }

  #[test]
  fn parses_json_configuration() {
    let config = PolicyConfig::from_json(
      r#"{"threshold": 0.5, "labels": ["background", "red", "yellow", "green", "unknown"]}"#,
    )
    .unwrap();
    assert_eq!(config, PolicyConfig::preset(VocabularyPreset::BackgroundFirst, 0.5));
    assert!(PolicyConfig::from_json(r#"{"threshold": 0.5, "labels": ["amber"]}"#).is_err());
  }
}
