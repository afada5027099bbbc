// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/output/json_lines.rs - 逐帧 JSON 记录输出
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
  fs::{File, OpenOptions},
  io::{BufRead, BufReader, BufWriter, Write},
  path::{Path, PathBuf},
  sync::Mutex,
};

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  classifier::Classification,
  frame::BgrFrame,
  light::TrafficLightState,
  model::Detection,
  output::Render,
};

#[derive(Error, Debug)]
pub enum JsonLinesOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("序列化错误: {0}")]
  SerializeError(#[from] serde_json::Error),
}

/// 每帧一行的分类记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
  pub timestamp: String,
  pub sequence: u64,
  pub width: u32,
  pub height: u32,
  pub state: TrafficLightState,
  pub styx_code: u8,
  pub num_detections: usize,
  pub winner_index: Option<usize>,
  pub winner: Option<Detection>,
}

struct Sink {
  writer: BufWriter<File>,
  sequence: u64,
}

pub struct JsonLinesOutput {
  path: PathBuf,
  sink: Mutex<Sink>,
}

impl FromUrlWithScheme for JsonLinesOutput {
  const SCHEME: &'static str = "jsonl";
}

impl FromUrl for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(JsonLinesOutputError::SchemeMismatch);
    }

    let append = uri.query_pairs().any(|(k, _)| k == "append");
    Self::create(crate::url_file_path(uri), append)
  }
}

impl JsonLinesOutput {
  pub fn create<P: AsRef<Path>>(path: P, append: bool) -> Result<Self, JsonLinesOutputError> {
    let path = path.as_ref().to_path_buf();
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    // 追加模式下序号接着已有记录往后编，保证整个文件内不重复
    let sequence = if append && path.is_file() {
      BufReader::new(File::open(&path)?)
        .lines()
        .filter(|line| line.as_ref().map_or(true, |l| !l.trim().is_empty()))
        .count() as u64
    } else {
      0
    };

    let file = OpenOptions::new()
      .create(true)
      .write(true)
      .append(append)
      .truncate(!append)
      .open(&path)?;
    info!("分类记录写入: {}, 起始序号 {}", path.display(), sequence + 1);

    Ok(JsonLinesOutput {
      path,
      sink: Mutex::new(Sink {
        writer: BufWriter::new(file),
        sequence,
      }),
    })
  }

  pub fn path(&self) -> &Path {
    &self.path
  }
}

impl Render<BgrFrame, Classification> for JsonLinesOutput {
  type Error = JsonLinesOutputError;

  fn render_result(&self, frame: &BgrFrame, result: &Classification) -> Result<(), Self::Error> {
    let mut sink = self.sink.lock().unwrap_or_else(|e| e.into_inner());
    sink.sequence += 1;

    let record = Record {
      timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
      sequence: sink.sequence,
      width: frame.width(),
      height: frame.height(),
      state: result.state,
      styx_code: result.state.styx_code(),
      num_detections: result.num_detections,
      winner_index: result.winner_index,
      winner: result.winner,
    };

    serde_json::to_writer(&mut sink.writer, &record)?;
    sink.writer.write_all(b"\n")?;
    sink.writer.flush()?;
    debug!("写入第 {} 条记录", record.sequence);

    Ok(())
  }
}
