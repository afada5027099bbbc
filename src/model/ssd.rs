// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/model/ssd.rs - RKNN 上的 SSD 交通灯检测模型
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

use rknpu::{Context, InitFlags, TensorFormat, TensorType};
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{AlignmentError, DetectResult, Detector},
  preprocess::Ssd300Tensor,
};

const SSD_NUM_INPUTS: u32 = 1;
const SSD_NUM_OUTPUTS: u32 = 3;

/// 只区分两类失败：加载阶段（读文件、解析模型、检查输入输出）与推理阶段
/// （NPU 运行、取输出、输出长度不对齐）
#[derive(Error, Debug)]
pub enum SsdRknnError {
  #[error("模型加载错误: {0}")]
  ModelLoadError(String),
  #[error("推理错误: {0}")]
  InferenceError(String),
}

impl From<std::io::Error> for SsdRknnError {
  fn from(err: std::io::Error) -> Self {
    SsdRknnError::ModelLoadError(format!("I/O 错误: {}", err))
  }
}

impl From<rknpu::Error> for SsdRknnError {
  fn from(err: rknpu::Error) -> Self {
    SsdRknnError::InferenceError(err.to_string())
  }
}

impl From<AlignmentError> for SsdRknnError {
  fn from(err: AlignmentError) -> Self {
    SsdRknnError::InferenceError(format!("输出未对齐: {}", err))
  }
}

impl SsdRknnError {
  pub fn invalid(msg: &str, e: rknpu::Error) -> Self {
    SsdRknnError::ModelLoadError(format!("{}, 错误: {}", msg, e))
  }
}

/// 三个输出在 RKNN 模型中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputIndices {
  pub classes: usize,
  pub scores: usize,
  pub boxes: usize,
}

impl Default for OutputIndices {
  fn default() -> Self {
    Self {
      classes: 0,
      scores: 1,
      boxes: 2,
    }
  }
}

/// SSD 检测模型，持有 NPU 推理上下文直至被释放
pub struct SsdRknn {
  context: Context,
  outputs: OutputIndices,
}

pub struct SsdRknnBuilder {
  model_path: PathBuf,
  flags: InitFlags,
  outputs: OutputIndices,
}

impl FromUrlWithScheme for SsdRknnBuilder {
  const SCHEME: &'static str = "ssd";
}

impl FromUrl for SsdRknnBuilder {
  type Error = SsdRknnError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(SsdRknnError::ModelLoadError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    let mut outputs = OutputIndices::default();
    for (k, v) in url.query_pairs() {
      let slot = match k.as_ref() {
        "classes" => &mut outputs.classes,
        "scores" => &mut outputs.scores,
        "boxes" => &mut outputs.boxes,
        _ => continue,
      };
      *slot = v
        .parse()
        .map_err(|_| SsdRknnError::ModelLoadError(format!("输出索引无效: {}={}", k, v)))?;
    }

    Ok(SsdRknnBuilder {
      model_path: crate::url_file_path(url),
      flags: InitFlags::default(),
      outputs,
    })
  }
}

impl SsdRknnBuilder {
  pub fn flags(mut self, flags: InitFlags) -> Self {
    self.flags = flags;
    self
  }

  pub fn outputs(mut self, outputs: OutputIndices) -> Self {
    self.outputs = outputs;
    self
  }

  pub fn build(self) -> Result<SsdRknn, SsdRknnError> {
    info!("加载模型文件: {}", self.model_path.display());
    let model_data = std::fs::read(&self.model_path)?;
    debug!(
      "模型文件大小: {:.2} MB",
      model_data.len() as f64 / (1024.0 * 1024.0)
    );

    info!("创建 RKNN 推理上下文");
    let context = Context::new(&model_data, self.flags)
      .map_err(|e| SsdRknnError::invalid("无法解析模型文件", e))?;

    // 之后的任何失败都会随 context 一并释放 NPU 资源
    match context.sdk_version() {
      Ok(version) => {
        if let Ok(api_ver) = version.api_version() {
          debug!("模型 API 版本: {}", api_ver);
        }
        if let Ok(drv_ver) = version.driver_version() {
          debug!("模型驱动版本: {}", drv_ver);
        }
      }
      Err(e) => {
        error!("查询 SDK 版本失败: {}", e);
        return Err(SsdRknnError::invalid("无法查询 SDK 版本", e));
      }
    }

    let num_inputs = context
      .num_inputs()
      .map_err(|e| SsdRknnError::invalid("无法获取输入数量", e))?;
    let num_outputs = context
      .num_outputs()
      .map_err(|e| SsdRknnError::invalid("无法获取输出数量", e))?;

    if num_inputs != SSD_NUM_INPUTS {
      let msg = format!("预期模型输入数量为 {}, 实际为 {}", SSD_NUM_INPUTS, num_inputs);
      error!("{}", msg);
      return Err(SsdRknnError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    if num_outputs != SSD_NUM_OUTPUTS {
      let msg = format!("预期模型输出数量为 {}, 实际为 {}", SSD_NUM_OUTPUTS, num_outputs);
      error!("{}", msg);
      return Err(SsdRknnError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    let OutputIndices {
      classes,
      scores,
      boxes,
    } = self.outputs;
    let max_index = SSD_NUM_OUTPUTS as usize;
    if classes >= max_index
      || scores >= max_index
      || boxes >= max_index
      || classes == scores
      || classes == boxes
      || scores == boxes
    {
      let msg = format!("输出索引配置无效: {:?}", self.outputs);
      error!("{}", msg);
      return Err(SsdRknnError::invalid(&msg, rknpu::Error::InvalidModel));
    }

    debug!("模型输入数量: {}", num_inputs);
    debug!("模型输出数量: {}", num_outputs);
    info!("模型加载完成");

    Ok(SsdRknn {
      context,
      outputs: self.outputs,
    })
  }
}

impl Detector for SsdRknn {
  type Input = Ssd300Tensor;
  type Error = SsdRknnError;

  fn detect(&self, input: &Self::Input) -> Result<DetectResult, Self::Error> {
    debug!("设置模型输入");
    self.context.set_input(
      0,
      &input.to_ne_bytes(),
      TensorFormat::NHWC,
      TensorType::Float32,
    )?;

    debug!("执行模型推理");
    self.context.run()?;

    debug!("获取模型输出");
    let output = self.context.get_outputs()?;

    let classes = output.get_f32(self.outputs.classes)?;
    let scores = output.get_f32(self.outputs.scores)?;
    let boxes = output.get_f32(self.outputs.boxes)?;

    let result = DetectResult::from_aligned(&classes, &scores, &boxes)?;
    debug!("检测到 {} 个物体", result.len());
    Ok(result)
  }
}
