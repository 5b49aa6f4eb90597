// 该文件是 Shanlan （山岚） 项目的一部分。
// src/rank.rs - Top-N 结果排序
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

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::label::LabelStore;

/// 单个分类结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
  pub class_index: usize,
  pub label: String,
  pub confidence: f32,
}

/// Top-N 选择参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankConfig {
  pub num_results: usize,
  pub threshold: f32,
}

impl Default for RankConfig {
  fn default() -> Self {
    Self {
      num_results: 3,
      threshold: 0.1,
    }
  }
}

impl RankConfig {
  /// 从 `?top=..&threshold=..` 读取参数，缺省或无法解析的项保持默认值
  pub fn from_query(url: &Url) -> Self {
    let mut config = Self::default();
    for (k, v) in url.query_pairs() {
      match k.as_ref() {
        "top" => {
          if let Ok(n) = v.parse() {
            config.num_results = n;
          }
        }
        "threshold" => {
          if let Ok(t) = v.parse() {
            config.threshold = t;
          }
        }
        _ => {}
      }
    }
    config
  }
}

/// 选出置信度严格大于 `threshold` 的前 `num_results` 个类别
///
/// 按置信度降序排列，置信度相同时类别序号小者在前。
pub fn select_top_n(
  confidences: &[f32],
  labels: &LabelStore,
  num_results: usize,
  threshold: f32,
) -> Vec<ClassificationResult> {
  if num_results == 0 {
    return Vec::new();
  }

  let mut kept: Vec<(usize, f32)> = confidences
    .iter()
    .copied()
    .enumerate()
    .filter(|&(_, confidence)| confidence > threshold)
    .collect();

  // NaN 已被过滤，partial_cmp 总有结果
  kept.sort_by(|a, b| {
    b.1
      .partial_cmp(&a.1)
      .unwrap_or(Ordering::Equal)
      .then(a.0.cmp(&b.0))
  });
  kept.truncate(num_results);

  debug!(
    "Top-N: {} 个输出中保留 {} 个",
    confidences.len(),
    kept.len()
  );

  kept
    .into_iter()
    .map(|(class_index, confidence)| ClassificationResult {
      class_index,
      label: labels.get(class_index).to_string(),
      confidence,
    })
    .collect()
}
