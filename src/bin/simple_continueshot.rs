// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/bin/simple_continueshot.rs - 连续分类输入中的每一帧
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

use anyhow::Result;
use clap::Parser;

use hongdeng::{
  FromUrl, TlClassifier,
  args::ClassifierArgs,
  input::InputWrapper,
  model::ModelWrapper,
  output::OutputWrapper,
  policy::DecisionPolicy,
  task::{ContinuousTask, Task},
};
use tracing::info;

/// Hongdeng 连续分类
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  #[command(flatten)]
  pub classifier: ClassifierArgs,
  /// 最大处理帧数，不指定则处理全部输入
  #[arg(long, value_name = "COUNT")]
  pub max_frames: Option<usize>,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型地址: {}", args.classifier.model);
  info!("输入来源: {}", args.classifier.input);
  info!("输出路径: {}", args.classifier.output);

  let policy = DecisionPolicy::try_from(args.classifier.policy.policy_config()?)?;
  let input = InputWrapper::from_url(&args.classifier.input)?;
  let model = ModelWrapper::from_url(&args.classifier.model)?;
  let output = OutputWrapper::from_url(&args.classifier.output)?;

  let classifier: TlClassifier<ModelWrapper> = TlClassifier::new(model, policy);
  ContinuousTask::default()
    .with_frame_number(args.max_frames)
    .with_interrupt_handler(true)
    .run_task(input, classifier, output)?;

  Ok(())
}
