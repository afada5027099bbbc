// 该文件是 Hongdeng （红灯） 项目的一部分。
// tests/classifier.rs - 分类器端到端测试
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

use std::cell::{Cell, RefCell};

use hongdeng::{
  ClassifyError, TlClassifier, TrafficLightState,
  frame::{BgrFrame, FrameError},
  model::{DetectResult, Detection, Detector},
  policy::{DecisionPolicy, PolicyConfig},
  preprocess::Ssd300Tensor,
  vocabulary::VocabularyPreset,
};
use thiserror::Error;

#[derive(Error, Debug)]
#[error("mock backend failure")]
struct MockError;

/// 按顺序返回预设结果的替身检测器，并记录收到的输入
struct MockDetector {
  responses: RefCell<Vec<Result<Vec<Detection>, MockError>>>,
  calls: Cell<usize>,
  last_input: RefCell<Option<Ssd300Tensor>>,
}

impl MockDetector {
  fn returning(detections: Vec<Detection>) -> Self {
    Self::sequence(vec![Ok(detections)])
  }

  fn sequence(mut responses: Vec<Result<Vec<Detection>, MockError>>) -> Self {
    responses.reverse();
    Self {
      responses: RefCell::new(responses),
      calls: Cell::new(0),
      last_input: RefCell::new(None),
    }
  }
}

impl Detector for MockDetector {
  type Input = Ssd300Tensor;
  type Error = MockError;

  fn detect(&self, input: &Self::Input) -> Result<DetectResult, Self::Error> {
    self.calls.set(self.calls.get() + 1);
    *self.last_input.borrow_mut() = Some(input.clone());
    let response = self.responses.borrow_mut().pop().unwrap_or(Ok(vec![]));
    response.map(DetectResult::from)
  }
}

fn det(class_id: u32, score: f32) -> Detection {
  Detection {
    class_id,
    score,
    bbox: [0.1, 0.2, 0.3, 0.4],
  }
}

fn classifier(
  detector: MockDetector,
  preset: VocabularyPreset,
  threshold: f32,
) -> TlClassifier<MockDetector> {
  let policy = DecisionPolicy::try_from(PolicyConfig::preset(preset, threshold)).unwrap();
  TlClassifier::new(detector, policy)
}

fn frame(width: u32, height: u32) -> BgrFrame {
  BgrFrame::from_raw(
    width,
    height,
    3,
    [0u8, 0, 255].repeat((width * height) as usize),
  )
  .unwrap()
}

#[test]
fn yellow_detection_with_unknown_first_vocabulary() {
  let classifier = classifier(
    MockDetector::returning(vec![det(2, 0.91)]),
    VocabularyPreset::UnknownFirst,
    0.3,
  );
  let state = classifier.get_classification(&frame(800, 600)).unwrap();
  assert_eq!(state, TrafficLightState::Yellow);
}

#[test]
fn background_then_low_score_is_unknown() {
  let classifier = classifier(
    MockDetector::returning(vec![det(0, 0.99), det(1, 0.40)]),
    VocabularyPreset::BackgroundFirst,
    0.5,
  );
  let state = classifier.get_classification(&frame(800, 600)).unwrap();
  assert_eq!(state, TrafficLightState::Unknown);
}

#[test]
fn first_qualifying_detection_wins() {
  let classifier = classifier(
    MockDetector::returning(vec![det(0, 0.99), det(2, 0.81), det(1, 0.95)]),
    VocabularyPreset::BackgroundFirst,
    0.5,
  );
  let result = classifier.classify(&frame(64, 48)).unwrap();
  assert_eq!(result.state, TrafficLightState::Yellow);
  assert_eq!(result.num_detections, 3);
  assert_eq!(result.winner_index, Some(1));
  assert_eq!(result.winner.map(|d| d.score), Some(0.81));
}

#[test]
fn no_detections_is_unknown() {
  let classifier = classifier(
    MockDetector::returning(vec![]),
    VocabularyPreset::UnknownFirst,
    0.3,
  );
  let result = classifier.classify(&frame(10, 10)).unwrap();
  assert_eq!(result.state, TrafficLightState::Unknown);
  assert_eq!(result.winner, None);
}

#[test]
fn detector_receives_batched_rgb_float_tensor() {
  let classifier = classifier(
    MockDetector::returning(vec![]),
    VocabularyPreset::UnknownFirst,
    0.3,
  );
  classifier.get_classification(&frame(300, 300)).unwrap();

  let input = classifier.detector().last_input.borrow();
  let tensor = input.as_ref().unwrap();
  assert_eq!(tensor.shape(), [1, 300, 300, 3]);
  // BGR (0, 0, 255) 为纯红色
  assert_eq!(tensor.pixel(150, 150), [255.0, 0.0, 0.0]);
}

#[test]
fn inference_error_does_not_poison_later_calls() {
  let classifier = classifier(
    MockDetector::sequence(vec![Err(MockError), Ok(vec![det(3, 0.7)])]),
    VocabularyPreset::UnknownFirst,
    0.3,
  );
  let frame = frame(32, 32);

  let err = classifier.get_classification(&frame).unwrap_err();
  assert!(matches!(err, ClassifyError::Inference(MockError)));
  assert_eq!(
    classifier.get_classification(&frame).unwrap(),
    TrafficLightState::Green
  );
  assert_eq!(classifier.detector().calls.get(), 2);
}

#[test]
fn malformed_frame_fails_before_any_inference() {
  let err = BgrFrame::from_raw(0, 0, 3, vec![]).unwrap_err();
  assert_eq!(
    err,
    FrameError::EmptyImage {
      width: 0,
      height: 0
    }
  );
  let classify_err: ClassifyError<MockError> = err.into();
  assert!(matches!(classify_err, ClassifyError::InvalidInput(_)));

  let err = BgrFrame::from_raw(4, 4, 1, vec![0; 16]).unwrap_err();
  assert_eq!(err, FrameError::ChannelMismatch(1));
}

#[test]
fn same_algorithm_serves_both_vocabularies() {
  let detections = vec![det(4, 0.9), det(3, 0.45)];

  let a = classifier(
    MockDetector::returning(detections.clone()),
    VocabularyPreset::UnknownFirst,
    0.3,
  );
  let b = classifier(
    MockDetector::returning(detections),
    VocabularyPreset::BackgroundFirst,
    0.5,
  );

  // 词表 A 中 4 号越界，3 号为绿灯且 0.45 > 0.3
  assert_eq!(
    a.get_classification(&frame(8, 8)).unwrap(),
    TrafficLightState::Green
  );
  // 词表 B 中 4 号为未知，3 号 0.45 未超过 0.5
  assert_eq!(
    b.get_classification(&frame(8, 8)).unwrap(),
    TrafficLightState::Unknown
  );
}
