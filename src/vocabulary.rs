// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/vocabulary.rs - 类别索引到交通灯状态的映射表
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

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::light::TrafficLightState;

/// 模型词表中的一个标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelName {
  Background,
  Unknown,
  Red,
  Yellow,
  Green,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelKind {
  /// 背景类，不是合法的交通灯状态
  Background,
  Light(TrafficLightState),
}

impl From<LabelName> for LabelKind {
  fn from(name: LabelName) -> Self {
    match name {
      LabelName::Background => LabelKind::Background,
      LabelName::Unknown => LabelKind::Light(TrafficLightState::Unknown),
      LabelName::Red => LabelKind::Light(TrafficLightState::Red),
      LabelName::Yellow => LabelKind::Light(TrafficLightState::Yellow),
      LabelName::Green => LabelKind::Light(TrafficLightState::Green),
    }
  }
}

impl LabelKind {
  pub fn state(&self) -> TrafficLightState {
    match self {
      LabelKind::Background => TrafficLightState::Unknown,
      LabelKind::Light(state) => *state,
    }
  }
}

/// 已知的两种模型词表约定
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VocabularyPreset {
  /// 0 号为未知，1/2/3 依次为红/黄/绿
  UnknownFirst,
  /// 0 号为背景，1/2/3 依次为红/黄/绿，末尾为未知
  BackgroundFirst,
}

impl VocabularyPreset {
  /// 该约定下训练模型时使用的置信度阈值，仅作参考
  pub fn reference_threshold(&self) -> f32 {
    match self {
      VocabularyPreset::UnknownFirst => 0.30,
      VocabularyPreset::BackgroundFirst => 0.50,
    }
  }

  pub fn labels(&self) -> Vec<LabelName> {
    match self {
      VocabularyPreset::UnknownFirst => vec![
        LabelName::Unknown,
        LabelName::Red,
        LabelName::Yellow,
        LabelName::Green,
      ],
      VocabularyPreset::BackgroundFirst => vec![
        LabelName::Background,
        LabelName::Red,
        LabelName::Yellow,
        LabelName::Green,
        LabelName::Unknown,
      ],
    }
  }

  pub fn vocabulary(&self) -> Vocabulary {
    Vocabulary::new(self.labels())
  }
}

/// 类别索引到交通灯状态的映射，对任意索引都有定义
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Vocabulary {
  labels: Box<[LabelKind]>,
}

impl Vocabulary {
  pub fn new<I, L>(labels: I) -> Self
  where
    I: IntoIterator<Item = L>,
    L: Into<LabelKind>,
  {
    Self {
      labels: labels.into_iter().map(Into::into).collect(),
    }
  }

  pub fn unknown_first() -> Self {
    VocabularyPreset::UnknownFirst.vocabulary()
  }

  pub fn background_first() -> Self {
    VocabularyPreset::BackgroundFirst.vocabulary()
  }

  pub fn len(&self) -> usize {
    self.labels.len()
  }

  pub fn is_empty(&self) -> bool {
    self.labels.is_empty()
  }

  pub fn label(&self, class_id: u32) -> Option<LabelKind> {
    self.labels.get(class_id as usize).copied()
  }

  /// 背景类与词表外的索引均解析为未知
  pub fn resolve(&self, class_id: u32) -> TrafficLightState {
    self
      .label(class_id)
      .map(|label| label.state())
      .unwrap_or(TrafficLightState::Unknown)
  }
}

impl fmt::Display for Vocabulary {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let names: Vec<_> = self
      .labels
      .iter()
      .map(|label| match label {
        LabelKind::Background => "background",
        LabelKind::Light(state) => state.as_str(),
      })
      .collect();
    write!(f, "[{}]", names.join(", "))
  }
}
