//! 기본 제공 시나리오
//!
//! 랜딩 존 모듈마다 하나씩, 모듈 디렉토리와 파라미터와 기대 출력을 묶은
//! 시나리오를 만듭니다. 버킷 이름처럼 전역에서 유일해야 하는 값은 빌드할 때마다
//! 새 접미사로 생성됩니다. `account_id`/`region`은 사이클이 probe 결과로 채웁니다.

use std::collections::BTreeMap;

use terracycle_core::types::ParamValue;

use crate::assembler::standard_tags;
use crate::assertions::{Expectation, ExpectedOutput};
use crate::error::HarnessError;
use crate::ident::unique_name;
use crate::scenario::{Scenario, ScenarioBuilder};

/// 모든 기본 시나리오가 요구하는 파라미터
pub const COMMON_REQUIRED: [&str; 3] = ["account_id", "region", "tags"];

/// 일시적인 apply 실패로 취급하는 모듈 공통 문자열
pub const APPLY_PLAN_ERROR: &str = "Error applying plan";

/// 기본 시나리오 이름 (정렬되지 않은 선언 순서)
pub const SCENARIO_NAMES: [&str; 9] = [
    "network",
    "landing-zone",
    "audit-trail",
    "config-recorder",
    "threat-detection",
    "identity",
    "classification",
    "security-posture",
    "budget",
];

fn base(name: &str, module_dir: &str, project: &str) -> ScenarioBuilder {
    Scenario::builder(name)
        .module_dir(module_dir)
        .param("tags", standard_tags(project))
        .require_all(COMMON_REQUIRED)
}

fn non_empty(name: &str) -> ExpectedOutput {
    ExpectedOutput::scalar(name, Expectation::NonEmpty)
}

fn equals_true(name: &str) -> ExpectedOutput {
    ExpectedOutput::scalar(name, Expectation::Equals("true".to_owned()))
}

fn strings(items: &[&str]) -> ParamValue {
    ParamValue::List(items.iter().map(|s| (*s).to_owned()).collect())
}

fn string_map(pairs: &[(&str, &str)]) -> ParamValue {
    ParamValue::Map(
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect(),
    )
}

pub fn network() -> Result<Scenario, HarnessError> {
    base("network", "modules/landing_zone/vpc", "vpc-test")
        .param("vpc_cidr", "10.0.0.0/16")
        .param("public_subnet_cidrs", strings(&["10.0.1.0/24", "10.0.2.0/24"]))
        .param("private_subnet_cidrs", strings(&["10.0.11.0/24", "10.0.12.0/24"]))
        .retry_on(APPLY_PLAN_ERROR)
        .expect(non_empty("vpc_id"))
        .expect(ExpectedOutput::list("public_subnet_ids", Expectation::Len(2)))
        .expect(ExpectedOutput::list("private_subnet_ids", Expectation::Len(2)))
        .expect(non_empty("internet_gateway_id"))
        .expect(non_empty("nat_gateway_id"))
        .build()
}

pub fn landing_zone() -> Result<Scenario, HarnessError> {
    base("landing-zone", "examples/basic", "landing-zone-test")
        .param("cloudtrail_bucket_name", unique_name("test-cloudtrail"))
        .retry_on(APPLY_PLAN_ERROR)
        .expect(non_empty("vpc_id"))
        .expect(ExpectedOutput::list("public_subnet_ids", Expectation::Len(2)))
        .expect(ExpectedOutput::list("private_subnet_ids", Expectation::Len(2)))
        .expect(non_empty("cloudtrail_bucket_arn"))
        .build()
}

pub fn audit_trail() -> Result<Scenario, HarnessError> {
    base("audit-trail", "modules/cloudtrail", "cloudtrail-test")
        .param("cloudtrail_bucket_name", unique_name("test-cloudtrail"))
        .param("cloudtrail_enable_kms", true)
        .expect(non_empty("bucket_arn"))
        .expect(non_empty("cloudtrail_arn"))
        .expect(non_empty("kms_key_arn"))
        .build()
}

pub fn config_recorder() -> Result<Scenario, HarnessError> {
    base("config-recorder", "modules/landing_zone/config", "config-test")
        .param("config_bucket_name", unique_name("test-config"))
        .param(
            "config_rules",
            string_map(&[
                (
                    "s3-bucket-public-read-prohibited",
                    "S3_BUCKET_PUBLIC_READ_PROHIBITED",
                ),
                (
                    "s3-bucket-public-write-prohibited",
                    "S3_BUCKET_PUBLIC_WRITE_PROHIBITED",
                ),
            ]),
        )
        .expect(non_empty("recorder_name"))
        .expect(ExpectedOutput::mapping("rule_arns", Expectation::NonEmpty))
        .build()
}

pub fn threat_detection() -> Result<Scenario, HarnessError> {
    base(
        "threat-detection",
        "modules/landing_zone/guardduty",
        "guardduty-test",
    )
    .param("enable_guardduty", true)
    .param(
        "guardduty_findings_bucket_name",
        unique_name("test-guardduty-findings"),
    )
    .param("guardduty_kms_key_arn", "")
    .expect(non_empty("detector_id"))
    .expect(non_empty("detector_arn"))
    .expect(non_empty("findings_bucket_arn"))
    .build()
}

pub fn identity() -> Result<Scenario, HarnessError> {
    let role = |name: &str, description: &str, policy: &str| -> BTreeMap<String, ParamValue> {
        [
            ("name", name),
            ("description", description),
            ("policy_arn", policy),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_owned(), ParamValue::from(v)))
        .collect()
    };

    base("identity", "modules/iam", "iam-test")
        .param(
            "iam_roles",
            ParamValue::Records(vec![
                role(
                    "ReadOnlyAdmin",
                    "Read-only administrator role",
                    "arn:aws:iam::aws:policy/ReadOnlyAccess",
                ),
                role(
                    "PowerUserRestrictedIAM",
                    "Power user role with restricted IAM access",
                    "arn:aws:iam::aws:policy/PowerUserAccess",
                ),
            ]),
        )
        .expect(ExpectedOutput::mapping("role_arns", Expectation::NonEmpty))
        .expect(ExpectedOutput::list("role_names", Expectation::Len(2)))
        .expect(ExpectedOutput::list(
            "role_names",
            Expectation::Contains("ReadOnlyAdmin".to_owned()),
        ))
        .expect(ExpectedOutput::list(
            "role_names",
            Expectation::Contains("PowerUserRestrictedIAM".to_owned()),
        ))
        .build()
}

pub fn classification() -> Result<Scenario, HarnessError> {
    base("classification", "modules/macie", "macie-test")
        .param("enable_macie", true)
        .param("finding_publishing_frequency", "FIFTEEN_MINUTES")
        .param("enable_s3_classification", true)
        .param("s3_buckets_to_scan", strings(&["test-bucket-1", "test-bucket-2"]))
        .param("excluded_file_extensions", strings(&["jpg", "png", "gif"]))
        .param("custom_data_identifiers", ParamValue::Map(BTreeMap::new()))
        .expect(equals_true("macie_enabled"))
        .expect(equals_true("classification_job_enabled"))
        .expect(ExpectedOutput::scalar(
            "buckets_to_scan_count",
            Expectation::Equals("2".to_owned()),
        ))
        .build()
}

pub fn security_posture() -> Result<Scenario, HarnessError> {
    base(
        "security-posture",
        "modules/landing_zone/security_hub",
        "security-hub-test",
    )
    .param("enable_security_hub", true)
    .param("enable_cis_standard", true)
    .param("enable_pci_standard", false)
    .param("enable_action_targets", true)
    .expect(equals_true("security_hub_enabled"))
    .expect(equals_true("cis_standard_enabled"))
    .expect(equals_true("action_targets_enabled"))
    .build()
}

pub fn budget() -> Result<Scenario, HarnessError> {
    base("budget", "modules/budget", "budget-test")
        .param("enable_budget_alerts", true)
        .param("enable_budget_actions", false)
        .param("budget_limit_usd", 100.0)
        .param("budget_alert_subscribers", strings(&["test@example.com"]))
        .expect(non_empty("budget_id"))
        .expect(non_empty("budget_arn"))
        .expect(non_empty("sns_topic_arn"))
        .build()
}

/// 이름으로 기본 시나리오를 빌드합니다.
pub fn by_name(name: &str) -> Result<Scenario, HarnessError> {
    match name {
        "network" => network(),
        "landing-zone" => landing_zone(),
        "audit-trail" => audit_trail(),
        "config-recorder" => config_recorder(),
        "threat-detection" => threat_detection(),
        "identity" => identity(),
        "classification" => classification(),
        "security-posture" => security_posture(),
        "budget" => budget(),
        other => Err(HarnessError::Scenario(format!(
            "unknown scenario '{other}' (available: {})",
            SCENARIO_NAMES.join(", ")
        ))),
    }
}

/// 모든 기본 시나리오를 빌드합니다.
pub fn all() -> Result<Vec<Scenario>, HarnessError> {
    SCENARIO_NAMES.iter().map(|name| by_name(name)).collect()
}
