// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/task.rs - 分类任务
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

use std::{
  collections::HashMap,
  thread,
  time::{Duration, Instant},
};
use tracing::{info, warn};

use crate::{
  classifier::{Classification, TlClassifier},
  frame::{BgrFrame, NhwcTensor},
  light::TrafficLightState,
  model::Detector,
  output::Render,
};

pub trait Task<I, M, O>: Sized {
  type Error;
  type Summary;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Summary, Self::Error>;
}

/// 任务结束时的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskSummary {
  pub frames: usize,
  pub states: HashMap<TrafficLightState, usize>,
}

impl TaskSummary {
  fn record(&mut self, result: &Classification) {
    self.frames += 1;
    *self.states.entry(result.state).or_default() += 1;
  }

  pub fn count(&self, state: TrafficLightState) -> usize {
    self.states.get(&state).copied().unwrap_or(0)
  }

  fn log(&self) {
    info!(
      "共处理 {} 帧: 红 {}, 黄 {}, 绿 {}, 未知 {}",
      self.frames,
      self.count(TrafficLightState::Red),
      self.count(TrafficLightState::Yellow),
      self.count(TrafficLightState::Green),
      self.count(TrafficLightState::Unknown)
    );
  }
}

pub struct OneShotTask;

impl<
  D: Detector<Input = NhwcTensor<W, H>>,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = BgrFrame>,
  O: Render<BgrFrame, Classification, Error = RE>,
  const W: u32,
  const H: u32,
> Task<I, TlClassifier<D, W, H>, O> for OneShotTask
{
  type Error = anyhow::Error;
  type Summary = TaskSummary;

  fn run_task(
    self,
    mut input: I,
    model: TlClassifier<D, W, H>,
    output: O,
  ) -> Result<Self::Summary, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始分类...");
    let now = Instant::now();
    let result = model.classify(&frame)?;
    let elapsed = now.elapsed();
    info!("分类完成，耗时: {:.2?}", elapsed);
    output.render_result(&frame, &result)?;

    let mut summary = TaskSummary::default();
    summary.record(&result);
    summary.log();
    Ok(summary)
  }
}

/// 对同一帧重复分类，统计平均耗时
pub struct RepeatShotTask {
  repeat_times: usize,
}

impl Default for RepeatShotTask {
  fn default() -> Self {
    Self { repeat_times: 1000 }
  }
}

impl RepeatShotTask {
  // 前两次视为预热，不计入平均耗时
  const WARMUP_TIMES: usize = 2;

  pub const MIN_REPEAT_TIMES: usize = Self::WARMUP_TIMES + 1;

  pub fn with_repeat_times(mut self, repeat_times: usize) -> Self {
    if repeat_times < Self::MIN_REPEAT_TIMES {
      warn!(
        "重复次数 {} 不足以扣除预热，调整为 {}",
        repeat_times,
        Self::MIN_REPEAT_TIMES
      );
    }
    self.repeat_times = repeat_times.max(Self::MIN_REPEAT_TIMES);
    self
  }

  pub fn repeat_times(&self) -> usize {
    self.repeat_times
  }
}

impl<
  D: Detector<Input = NhwcTensor<W, H>>,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = BgrFrame>,
  O: Render<BgrFrame, Classification, Error = RE>,
  const W: u32,
  const H: u32,
> Task<I, TlClassifier<D, W, H>, O> for RepeatShotTask
{
  type Error = anyhow::Error;
  type Summary = TaskSummary;

  fn run_task(
    self,
    mut input: I,
    model: TlClassifier<D, W, H>,
    output: O,
  ) -> Result<Self::Summary, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!("输入帧获取成功，开始分类...");
    let mut summary = TaskSummary::default();
    let mut times = Vec::with_capacity(self.repeat_times);
    for i in 0..self.repeat_times {
      let now = Instant::now();
      let result = model.classify(&frame)?;
      let elapsed = now.elapsed();
      info!("({})分类完成，耗时: {:.2?}", i, elapsed);
      output.render_result(&frame, &result)?;
      summary.record(&result);
      times.push(elapsed);
    }

    let measured = &times[Self::WARMUP_TIMES.min(times.len())..];
    if !measured.is_empty() {
      warn!(
        "平均分类时间: {:.2?}",
        measured.iter().sum::<Duration>() / measured.len() as u32
      );
    }
    summary.log();
    Ok(summary)
  }
}

#[derive(Default, Debug)]
pub struct ContinuousTask {
  frame_number: Option<usize>,
  handle_interrupt: bool,
}

impl ContinuousTask {
  pub fn with_frame_number(mut self, frame_number: Option<usize>) -> Self {
    self.frame_number = frame_number;
    self
  }

  /// 收到 Ctrl-C 后处理完当前帧再退出
  pub fn with_interrupt_handler(mut self, handle_interrupt: bool) -> Self {
    self.handle_interrupt = handle_interrupt;
    self
  }
}

impl<
  D: Detector<Input = NhwcTensor<W, H>>,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = BgrFrame>,
  O: Render<BgrFrame, Classification, Error = RE>,
  const W: u32,
  const H: u32,
> Task<I, TlClassifier<D, W, H>, O> for ContinuousTask
{
  type Error = anyhow::Error;
  type Summary = TaskSummary;

  fn run_task(
    self,
    input: I,
    model: TlClassifier<D, W, H>,
    output: O,
  ) -> Result<Self::Summary, Self::Error> {
    info!("开始任务...");
    let (tx, rx) = std::sync::mpsc::channel();

    if self.handle_interrupt {
      ctrlc::set_handler(move || {
        info!("收到中断信号，准备退出...");
        let _ = tx.send(());
        thread::spawn(|| {
          thread::sleep(Duration::from_secs(30));
          warn!("强制退出程序");
          std::process::exit(1);
        });
      })?;
    }

    let mut summary = TaskSummary::default();
    let mut now = Instant::now();
    for frame in input {
      info!("处理第 {} 帧图像", summary.frames + 1);
      let result = model.classify(&frame)?;
      let elapsed_a = now.elapsed();
      output.render_result(&frame, &result)?;
      let elapsed_b = now.elapsed();
      now = Instant::now();
      summary.record(&result);
      info!("分类完成，耗时: {:.2?} / {:.2?}", elapsed_a, elapsed_b);
      if self.frame_number.is_some_and(|n| summary.frames >= n) {
        info!("达到指定帧数 {}, 退出任务循环", summary.frames);
        break;
      }
      if rx.try_recv().is_ok() {
        warn!("中断信号接收，退出任务循环");
        break;
      }
    }

    summary.log();
    info!("任务完成，退出");
    Ok(summary)
  }
}
