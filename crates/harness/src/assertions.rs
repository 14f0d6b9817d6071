//! 출력값 검증
//!
//! 시나리오는 출력 이름, 선언 형태, 기대 조건을 [`ExpectedOutput`]으로 선언합니다.
//! [`check`]는 선언 순서대로 평가하고 첫 실패에서 멈춥니다.
//!
//! | 조건 | scalar | list | mapping |
//! |------|--------|------|---------|
//! | `NonEmpty` | 빈 문자열 아님 | 요소 있음 | 키 있음 |
//! | `Equals` | 값 일치 | - | - |
//! | `Len` | - | 요소 수 | 키 수 |
//! | `Contains` | - | 요소 포함 | 키 포함 |

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::output::{OutputSet, OutputShape};

/// 출력값에 대한 기대 조건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum Expectation {
    NonEmpty,
    Equals(String),
    Len(usize),
    Contains(String),
}

impl Expectation {
    /// 주어진 형태에 적용할 수 있는 조건인지 여부
    pub fn applies_to(&self, shape: OutputShape) -> bool {
        match self {
            Self::NonEmpty => true,
            Self::Equals(_) => shape == OutputShape::Scalar,
            Self::Len(_) | Self::Contains(_) => shape != OutputShape::Scalar,
        }
    }
}

impl fmt::Display for Expectation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonEmpty => write!(f, "non-empty"),
            Self::Equals(expected) => write!(f, "== \"{expected}\""),
            Self::Len(n) => write!(f, "len == {n}"),
            Self::Contains(item) => write!(f, "contains \"{item}\""),
        }
    }
}

/// 출력 이름과 형태에 묶인 기대 조건
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOutput {
    pub name: String,
    pub shape: OutputShape,
    pub expectation: Expectation,
}

impl ExpectedOutput {
    pub fn scalar(name: impl Into<String>, expectation: Expectation) -> Self {
        Self {
            name: name.into(),
            shape: OutputShape::Scalar,
            expectation,
        }
    }

    pub fn list(name: impl Into<String>, expectation: Expectation) -> Self {
        Self {
            name: name.into(),
            shape: OutputShape::List,
            expectation,
        }
    }

    pub fn mapping(name: impl Into<String>, expectation: Expectation) -> Self {
        Self {
            name: name.into(),
            shape: OutputShape::Mapping,
            expectation,
        }
    }

    /// 형태와 조건의 조합이 유효한지 확인합니다.
    pub fn validate(&self) -> Result<(), HarnessError> {
        if self.name.is_empty() {
            return Err(HarnessError::Scenario(
                "expected output name must not be empty".to_owned(),
            ));
        }
        if !self.expectation.applies_to(self.shape) {
            return Err(HarnessError::Scenario(format!(
                "expectation '{}' cannot apply to {} output '{}'",
                self.expectation, self.shape, self.name
            )));
        }
        Ok(())
    }

    /// 단일 기대 조건을 평가합니다.
    pub fn evaluate(&self, outputs: &OutputSet) -> Result<(), HarnessError> {
        if !self.expectation.applies_to(self.shape) {
            return Err(HarnessError::Assertion {
                output: self.name.clone(),
                message: format!(
                    "expectation '{}' cannot apply to {} output",
                    self.expectation, self.shape
                ),
            });
        }

        let failure = match self.shape {
            OutputShape::Scalar => {
                let value = outputs.read_scalar(&self.name)?;
                match &self.expectation {
                    Expectation::NonEmpty if value.is_empty() => {
                        Some("expected a non-empty value".to_owned())
                    }
                    Expectation::Equals(expected) if value != expected.as_str() => {
                        Some(format!("expected \"{expected}\", got \"{value}\""))
                    }
                    _ => None,
                }
            }
            OutputShape::List => {
                let items = outputs.read_list(&self.name)?;
                match &self.expectation {
                    Expectation::NonEmpty if items.is_empty() => {
                        Some("expected a non-empty list".to_owned())
                    }
                    Expectation::Len(n) if items.len() != *n => {
                        Some(format!("expected {n} element(s), got {}", items.len()))
                    }
                    Expectation::Contains(item) if !items.iter().any(|i| i == item) => {
                        Some(format!("expected list to contain \"{item}\""))
                    }
                    _ => None,
                }
            }
            OutputShape::Mapping => {
                let map = outputs.read_mapping(&self.name)?;
                match &self.expectation {
                    Expectation::NonEmpty if map.is_empty() => {
                        Some("expected a non-empty mapping".to_owned())
                    }
                    Expectation::Len(n) if map.len() != *n => {
                        Some(format!("expected {n} key(s), got {}", map.len()))
                    }
                    Expectation::Contains(key) if !map.contains_key(key) => {
                        Some(format!("expected mapping to contain key \"{key}\""))
                    }
                    _ => None,
                }
            }
        };

        match failure {
            Some(message) => Err(HarnessError::Assertion {
                output: self.name.clone(),
                message,
            }),
            None => Ok(()),
        }
    }
}

impl fmt::Display for ExpectedOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) {}", self.name, self.shape, self.expectation)
    }
}

/// 기대 조건을 선언 순서대로 평가합니다.
///
/// 첫 실패에서 멈추고 그 에러를 반환합니다.
pub fn check(outputs: &OutputSet, expectations: &[ExpectedOutput]) -> Result<(), HarnessError> {
    expectations.iter().try_for_each(|e| e.evaluate(outputs))
}
