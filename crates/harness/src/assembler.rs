//! 파라미터 조립
//!
//! 시나리오의 기본값과 덮어쓸 값을 합쳐 도구에 넘길 [`ParameterSet`]을 만듭니다.
//! 병합은 오른쪽 우선이며, 값은 통째로 교체됩니다 (목록/맵을 깊게 합치지 않음).

use std::collections::BTreeMap;

use terracycle_core::types::{AccountContext, ParamValue, ParameterSet};

use crate::error::HarnessError;

/// 모든 리소스에 붙이는 `Owner` 태그 값
pub const TAG_OWNER: &str = "terracycle";

/// 기본값에 덮어쓸 값을 병합하고 필수 키를 확인합니다.
///
/// `required`의 선언 순서상 첫 번째로 빠진 키를 `MissingParameter`로 보고합니다.
/// NaN이나 무한대 숫자는 도구가 받아들이지 않으므로 `InvalidParameter`로 거부합니다.
pub fn assemble(
    base: &ParameterSet,
    overrides: &ParameterSet,
    required: &[String],
) -> Result<ParameterSet, HarnessError> {
    let mut merged = base.clone();
    for (key, value) in overrides.iter() {
        merged.insert(key.clone(), value.clone());
    }

    if let Some(missing) = required.iter().find(|key| !merged.contains_key(key)) {
        return Err(HarnessError::MissingParameter {
            key: missing.clone(),
        });
    }

    if let Some((key, _)) = merged.iter().find(|(_, value)| !value.is_finite()) {
        return Err(HarnessError::InvalidParameter {
            key: key.clone(),
            reason: "numbers must be finite".to_owned(),
        });
    }

    Ok(merged)
}

/// 모든 시나리오에 공통으로 들어가는 `account_id`/`region` 파라미터
pub fn account_base(ctx: &AccountContext) -> ParameterSet {
    ParameterSet::new()
        .with("account_id", ctx.account_id.as_str())
        .with("region", ctx.region.as_str())
}

/// 표준 태그 맵 (`Environment=test`, `Owner`, `Project=<project>`)
pub fn standard_tags(project: &str) -> ParamValue {
    let tags: BTreeMap<String, String> = [
        ("Environment", "test"),
        ("Owner", TAG_OWNER),
        ("Project", project),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_owned(), v.to_owned()))
    .collect();
    ParamValue::Map(tags)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn overrides_win_over_base() {
        let base = ParameterSet::new()
            .with("region", "us-east-1")
            .with("enable_nat_gateway", true);
        let overrides = ParameterSet::new().with("region", "eu-west-1");

        let merged = assemble(&base, &overrides, &[]).unwrap();
        assert_eq!(merged.get("region"), Some(&ParamValue::from("eu-west-1")));
        assert_eq!(merged.get("enable_nat_gateway"), Some(&ParamValue::Bool(true)));
    }

    #[test]
    fn non_finite_number_is_rejected() {
        let base = ParameterSet::new()
            .with("region", "us-east-1")
            .with("budget_limit_usd", 100.0);
        let overrides = ParameterSet::new().with("budget_limit_usd", f64::NAN);

        let err = assemble(&base, &overrides, &[]).unwrap_err();
        assert_eq!(
            err,
            HarnessError::InvalidParameter {
                key: "budget_limit_usd".to_owned(),
                reason: "numbers must be finite".to_owned(),
            }
        );
        assert_eq!(err.phase(), terracycle_core::types::Phase::Assemble);
    }

    #[test]
    fn lists_are_replaced_not_merged() {
        let base = ParameterSet::new().with(
            "public_subnet_cidrs",
            vec!["10.0.1.0/24".to_owned(), "10.0.2.0/24".to_owned()],
        );
        let overrides =
            ParameterSet::new().with("public_subnet_cidrs", vec!["10.1.1.0/24".to_owned()]);

        let merged = assemble(&base, &overrides, &[]).unwrap();
        assert_eq!(
            merged.get("public_subnet_cidrs"),
            Some(&ParamValue::List(vec!["10.1.1.0/24".to_owned()]))
        );
    }

    #[test]
    fn reports_first_missing_required_key() {
        let base = ParameterSet::new().with("region", "us-east-1");
        let err = assemble(
            &base,
            &ParameterSet::new(),
            &keys(&["region", "account_id", "tags"]),
        )
        .unwrap_err();
        assert_eq!(
            err,
            HarnessError::MissingParameter {
                key: "account_id".to_owned()
            }
        );
    }

    #[test]
    fn required_key_satisfied_by_override() {
        let overrides = ParameterSet::new().with("tags", standard_tags("vpc-test"));
        let merged = assemble(&ParameterSet::new(), &overrides, &keys(&["tags"])).unwrap();
        assert!(merged.contains_key("tags"));
    }

    #[test]
    fn account_base_has_account_and_region() {
        let ctx = AccountContext::new("123456789012", "us-east-1");
        let params = account_base(&ctx);
        assert_eq!(params.len(), 2);
        assert_eq!(
            params.get("account_id"),
            Some(&ParamValue::from("123456789012"))
        );
        assert_eq!(params.get("region"), Some(&ParamValue::from("us-east-1")));
    }

    #[test]
    fn standard_tags_contents() {
        let ParamValue::Map(tags) = standard_tags("budget-test") else {
            panic!("expected a map");
        };
        assert_eq!(tags.get("Environment").map(String::as_str), Some("test"));
        assert_eq!(tags.get("Owner").map(String::as_str), Some(TAG_OWNER));
        assert_eq!(tags.get("Project").map(String::as_str), Some("budget-test"));
    }
}
