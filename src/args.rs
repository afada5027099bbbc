// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/args.rs - 命令行参数配置
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

use std::path::PathBuf;

use clap::Args;
use tracing::warn;
use url::Url;

use crate::{
  policy::{PolicyConfig, PolicyError},
  vocabulary::VocabularyPreset,
};

/// 各个程序共用的参数
#[derive(Args, Debug)]
pub struct ClassifierArgs {
  /// 模型地址，例如 ssd:///path/model.rknn 或 recorded:///path/outputs.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 输入来源，例如 image:///path/frame.png 或 folder:///path/frames
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 输出路径，例如 log:// 或 jsonl:///path/result.jsonl
  #[arg(long, value_name = "OUTPUT", default_value = "log://")]
  pub output: Url,
  #[command(flatten)]
  pub policy: PolicyArgs,
}

/// 决策配置：配置文件，或者词表约定加阈值，二者必选其一
#[derive(Args, Debug)]
pub struct PolicyArgs {
  /// JSON 决策配置文件
  #[arg(long, value_name = "FILE", conflicts_with_all = ["vocabulary", "threshold"])]
  pub policy: Option<PathBuf>,
  /// 模型词表约定
  #[arg(long, value_enum, required_unless_present = "policy", requires = "threshold")]
  pub vocabulary: Option<VocabularyPreset>,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, value_name = "THRESHOLD", required_unless_present = "policy", requires = "vocabulary")]
  pub threshold: Option<f32>,
}

impl PolicyArgs {
  pub fn policy_config(&self) -> Result<PolicyConfig, PolicyError> {
    if let Some(path) = &self.policy {
      return PolicyConfig::from_json_file(path);
    }

    match (self.vocabulary, self.threshold) {
      (Some(preset), Some(threshold)) => {
        if threshold != preset.reference_threshold() {
          warn!(
            "阈值 {} 与词表约定 {:?} 的参考值 {} 不同",
            threshold,
            preset,
            preset.reference_threshold()
          );
        }
        Ok(PolicyConfig::preset(preset, threshold))
      }
      _ => Err(PolicyError::Unspecified),
    }
  }
}
