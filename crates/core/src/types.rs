//! 도메인 타입: 시스템 전역에서 사용되는 공통 타입
//!
//! 파라미터 값, 출력값, 계정 컨텍스트, 사이클 단계/상태를 정의합니다.
//! 하네스와 CLI가 이 타입들을 공유합니다.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// 프로비저닝 도구에 전달되는 단일 파라미터 값
///
/// 직렬화는 untagged 형식이므로 JSON/TOML에서 자연스러운 값으로 표현됩니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// 불리언 토글
    Bool(bool),
    /// 숫자 (예산 한도 등)
    Number(f64),
    /// 문자열
    String(String),
    /// 문자열 목록 (서브넷 CIDR, 버킷 이름 등)
    List(Vec<String>),
    /// 중첩 레코드 목록 (IAM 역할 정의 등)
    Records(Vec<BTreeMap<String, ParamValue>>),
    /// 문자열 매핑 (태그 등)
    Map(BTreeMap<String, String>),
}

impl ParamValue {
    /// 도구 CLI에 `-var name=<literal>` 형태로 넘길 리터럴을 만듭니다.
    ///
    /// 문자열은 그대로, 숫자/불리언은 표기 그대로, 복합 값은 JSON으로 렌더링합니다.
    /// JSON 배열/객체는 Terraform이 HCL 표현식으로 그대로 받아들입니다.
    ///
    /// 유한하지 않은 숫자는 표현할 수 없으므로 호출 전에 [`is_finite`](Self::is_finite)로
    /// 걸러야 합니다.
    pub fn to_cli_literal(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => n.to_string(),
            Self::String(s) => s.clone(),
            Self::List(_) | Self::Records(_) | Self::Map(_) => self.to_json().to_string(),
        }
    }

    /// 모든 숫자(중첩 레코드 포함)가 유한한지 여부
    pub fn is_finite(&self) -> bool {
        match self {
            Self::Number(n) => n.is_finite(),
            Self::Records(records) => records
                .iter()
                .all(|record| record.values().all(ParamValue::is_finite)),
            Self::Bool(_) | Self::String(_) | Self::List(_) | Self::Map(_) => true,
        }
    }

    fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;

        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => serde_json::Number::from_f64(*n).map_or(Value::Null, Value::Number),
            Self::String(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            Self::Records(records) => Value::Array(
                records
                    .iter()
                    .map(|record| {
                        Value::Object(
                            record
                                .iter()
                                .map(|(k, v)| (k.clone(), v.to_json()))
                                .collect(),
                        )
                    })
                    .collect(),
            ),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect(),
            ),
        }
    }

    /// 값의 종류명 (로그/에러 메시지용)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Records(_) => "records",
            Self::Map(_) => "map",
        }
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_owned())
    }
}

impl From<String> for ParamValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for ParamValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        Self::List(v)
    }
}

impl From<BTreeMap<String, String>> for ParamValue {
    fn from(m: BTreeMap<String, String>) -> Self {
        Self::Map(m)
    }
}

/// 파라미터 이름 → 값 매핑
///
/// 순서는 의미가 없지만 `BTreeMap`을 사용해 CLI 인자와 로그 출력이 결정적이 되도록 합니다.
/// 도구에 전달된 뒤에는 변경하지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, ParamValue>);

impl ParameterSet {
    /// 빈 파라미터 집합을 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 값을 추가한 집합을 반환합니다 (빌더 스타일).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    /// 값을 추가하거나 덮어씁니다.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<ParamValue>) {
        self.0.insert(name.into(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    pub fn contains_key(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ParamValue)> {
        self.0.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl FromIterator<(String, ParamValue)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (String, ParamValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for ParameterSet {
    type Item = (String, ParamValue);
    type IntoIter = std::collections::btree_map::IntoIter<String, ParamValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// apply 이후 도구가 보고하는 출력값
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutputValue {
    /// 단일 문자열 (숫자/불리언도 문자열 표기로 저장)
    Scalar(String),
    /// 순서 있는 문자열 목록
    List(Vec<String>),
    /// 문자열 매핑
    Mapping(BTreeMap<String, String>),
}

impl OutputValue {
    /// 값의 형태를 반환합니다.
    pub fn shape(&self) -> OutputShape {
        match self {
            Self::Scalar(_) => OutputShape::Scalar,
            Self::List(_) => OutputShape::List,
            Self::Mapping(_) => OutputShape::Mapping,
        }
    }
}

impl fmt::Display for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "[{}]", items.join(", ")),
            Self::Mapping(map) => {
                let pairs: Vec<String> = map.iter().map(|(k, v)| format!("{k}={v}")).collect();
                write!(f, "{{{}}}", pairs.join(", "))
            }
        }
    }
}

/// 출력값의 선언된 형태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputShape {
    Scalar,
    List,
    Mapping,
}

impl fmt::Display for OutputShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::List => write!(f, "list"),
            Self::Mapping => write!(f, "mapping"),
        }
    }
}

/// 사이클당 한 번 조회하는 계정 컨텍스트
///
/// 프로세스 전역 상태가 아니라 명시적으로 전달되는 불변 값입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountContext {
    /// 계정 ID (12자리 숫자 문자열)
    pub account_id: String,
    /// 대상 리전
    pub region: String,
    /// 호출자 ARN (정적 컨텍스트에서는 없음)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caller_arn: Option<String>,
}

impl AccountContext {
    /// 정적 컨텍스트를 생성합니다.
    pub fn new(account_id: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            account_id: account_id.into(),
            region: region.into(),
            caller_arn: None,
        }
    }
}

impl fmt::Display for AccountContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "account={} region={}", self.account_id, self.region)
    }
}

/// 사이클 단계
///
/// 최초 실패 보고 시 어느 단계에서 실패했는지를 나타냅니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Probe,
    Assemble,
    Initialize,
    Apply,
    Output,
    Assert,
    Destroy,
    /// 사이클 밖 (실행기 태스크)
    Runner,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Probe => "probe",
            Self::Assemble => "assemble",
            Self::Initialize => "initialize",
            Self::Apply => "apply",
            Self::Output => "output",
            Self::Assert => "assert",
            Self::Destroy => "destroy",
            Self::Runner => "runner",
        };
        write!(f, "{name}")
    }
}

/// 프로비저닝 사이클 상태
///
/// ```text
/// Created → Initializing → Applying → {Applied | ApplyFailed}
///         → Asserting (Applied일 때만) → Destroying → {Destroyed | DestroyFailed} → Terminal
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleState {
    Created,
    Initializing,
    Applying,
    Applied,
    ApplyFailed,
    Asserting,
    Destroying,
    Destroyed,
    DestroyFailed,
    Terminal,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Initializing => "initializing",
            Self::Applying => "applying",
            Self::Applied => "applied",
            Self::ApplyFailed => "apply_failed",
            Self::Asserting => "asserting",
            Self::Destroying => "destroying",
            Self::Destroyed => "destroyed",
            Self::DestroyFailed => "destroy_failed",
            Self::Terminal => "terminal",
        };
        write!(f, "{name}")
    }
}
