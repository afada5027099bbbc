// 该文件是 Hongdeng （红灯） 项目的一部分。
// src/light.rs - 交通灯状态定义
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

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 交通灯状态
///
/// 决策策略的唯一输出，每次分类恰好产生其中一个值。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLightState {
  Unknown,
  Red,
  Yellow,
  Green,
}

// styx_msgs/TrafficLight 消息中的取值
const STYX_RED: u8 = 0;
const STYX_YELLOW: u8 = 1;
const STYX_GREEN: u8 = 2;
const STYX_UNKNOWN: u8 = 4;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum LightStateError {
  #[error("未知的交通灯状态名称: {0}")]
  UnknownName(String),
  #[error("未知的交通灯消息编码: {0}")]
  UnknownCode(u8),
}

impl TrafficLightState {
  pub const ALL: [TrafficLightState; 4] = [
    TrafficLightState::Unknown,
    TrafficLightState::Red,
    TrafficLightState::Yellow,
    TrafficLightState::Green,
  ];

  /// 是否为具体颜色（红、黄、绿）
  pub fn is_color(&self) -> bool {
    !matches!(self, TrafficLightState::Unknown)
  }

  pub fn as_str(&self) -> &'static str {
    match self {
      TrafficLightState::Unknown => "unknown",
      TrafficLightState::Red => "red",
      TrafficLightState::Yellow => "yellow",
      TrafficLightState::Green => "green",
    }
  }

  /// 下游规划模块使用的 TrafficLight 消息编码
  pub fn styx_code(&self) -> u8 {
    match self {
      TrafficLightState::Red => STYX_RED,
      TrafficLightState::Yellow => STYX_YELLOW,
      TrafficLightState::Green => STYX_GREEN,
      TrafficLightState::Unknown => STYX_UNKNOWN,
    }
  }

  pub fn from_styx_code(code: u8) -> Result<Self, LightStateError> {
    match code {
      STYX_RED => Ok(TrafficLightState::Red),
      STYX_YELLOW => Ok(TrafficLightState::Yellow),
      STYX_GREEN => Ok(TrafficLightState::Green),
      STYX_UNKNOWN => Ok(TrafficLightState::Unknown),
      other => Err(LightStateError::UnknownCode(other)),
    }
  }
}

impl fmt::Display for TrafficLightState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for TrafficLightState {
  type Err = LightStateError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    TrafficLightState::ALL
      .into_iter()
      .find(|state| state.as_str().eq_ignore_ascii_case(s.trim()))
      .ok_or_else(|| LightStateError::UnknownName(s.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn styx_codes_match_message_definition() {
    assert_eq!(TrafficLightState::Red.styx_code(), 0);
    assert_eq!(TrafficLightState::Yellow.styx_code(), 1);
    assert_eq!(TrafficLightState::Green.styx_code(), 2);
    assert_eq!(TrafficLightState::Unknown.styx_code(), 4);
    assert_eq!(
      TrafficLightState::from_styx_code(3),
      Err(LightStateError::UnknownCode(3))
    );
  }

  #[test]
  fn only_unknown_is_not_a_color() {
    let colors: Vec<_> = TrafficLightState::ALL
      .into_iter()
      .filter(TrafficLightState::is_color)
      .collect();
    assert_eq!(
      colors,
      vec![
        TrafficLightState::Red,
        TrafficLightState::Yellow,
        TrafficLightState::Green
      ]
    );
  }

  #[test]
  fn parses_names_case_insensitively() {
    assert_eq!("Yellow".parse(), Ok(TrafficLightState::Yellow));
    assert_eq!(" green ".parse(), Ok(TrafficLightState::Green));
    assert!("amber".parse::<TrafficLightState>().is_err());
  }

  #[test]
  fn serializes_as_lowercase_name() {
    let json = serde_json::to_string(&TrafficLightState::Red).unwrap();
    assert_eq!(json, "\"red\"");
  }
}
