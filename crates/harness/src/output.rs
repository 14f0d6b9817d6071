//! 출력값 조회
//!
//! [`OutputSet`]은 apply가 성공한 뒤 도구가 보고한 출력값 모음입니다.
//! 접근자는 선언한 형태와 실제 형태가 다르면 변환하지 않고 에러를 반환합니다.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::HarnessError;

pub use terracycle_core::types::{OutputShape, OutputValue};

/// 출력 이름 → 값 매핑
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputSet(BTreeMap<String, OutputValue>);

/// `terraform output -json`의 항목 하나
#[derive(Debug, Deserialize)]
struct RawOutput {
    value: Value,
}

impl OutputSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// 값을 추가한 집합을 반환합니다 (빌더 스타일).
    pub fn with(mut self, name: impl Into<String>, value: OutputValue) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: OutputValue) {
        self.0.insert(name.into(), value);
    }

    /// `terraform output -json` 출력을 파싱합니다.
    ///
    /// 입력 형식: `{"name": {"value": ..., "type": ..., "sensitive": ...}}`
    ///
    /// - 문자열/숫자/불리언 → `Scalar` (`true`, `2` 같은 문자열 표기)
    /// - 배열 → `List`, 객체 → `Mapping`
    /// - 중첩된 복합 요소는 compact JSON 문자열
    /// - `null` → 빈 `Scalar`
    pub fn from_terraform_json(json: &str) -> Result<Self, serde_json::Error> {
        let trimmed = json.trim();
        if trimmed.is_empty() {
            // 출력이 하나도 없는 모듈
            return Ok(Self::new());
        }
        let raw: BTreeMap<String, RawOutput> = serde_json::from_str(trimmed)?;
        Ok(Self(
            raw.into_iter()
                .map(|(name, output)| (name, convert_value(output.value)))
                .collect(),
        ))
    }

    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &OutputValue)> {
        self.0.iter()
    }

    fn lookup(&self, name: &str) -> Result<&OutputValue, HarnessError> {
        self.0.get(name).ok_or_else(|| HarnessError::OutputNotFound {
            name: name.to_owned(),
        })
    }

    /// 단일 값 출력을 읽습니다.
    pub fn read_scalar(&self, name: &str) -> Result<&str, HarnessError> {
        match self.lookup(name)? {
            OutputValue::Scalar(s) => Ok(s),
            other => Err(mismatch(name, OutputShape::Scalar, other)),
        }
    }

    /// 목록 출력을 읽습니다.
    pub fn read_list(&self, name: &str) -> Result<&[String], HarnessError> {
        match self.lookup(name)? {
            OutputValue::List(items) => Ok(items),
            other => Err(mismatch(name, OutputShape::List, other)),
        }
    }

    /// 매핑 출력을 읽습니다.
    pub fn read_mapping(&self, name: &str) -> Result<&BTreeMap<String, String>, HarnessError> {
        match self.lookup(name)? {
            OutputValue::Mapping(map) => Ok(map),
            other => Err(mismatch(name, OutputShape::Mapping, other)),
        }
    }
}

fn mismatch(name: &str, expected: OutputShape, actual: &OutputValue) -> HarnessError {
    HarnessError::OutputShapeMismatch {
        name: name.to_owned(),
        expected,
        actual: actual.shape(),
    }
}

fn convert_value(value: Value) -> OutputValue {
    match value {
        Value::Array(items) => OutputValue::List(items.into_iter().map(render_element).collect()),
        Value::Object(map) => OutputValue::Mapping(
            map.into_iter()
                .map(|(k, v)| (k, render_element(v)))
                .collect(),
        ),
        scalar => OutputValue::Scalar(render_element(scalar)),
    }
}

fn render_element(value: Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        compound => compound.to_string(),
    }
}
