//! 계정 컨텍스트 조회
//!
//! [`AccountProbe`]는 사이클이 사용할 [`AccountContext`]를 얻는 경계입니다.
//!
//! - [`AwsCliProbe`]: `aws sts get-caller-identity`로 현재 자격증명의 계정을 조회
//! - [`StaticProbe`]: 고정 컨텍스트 (자격증명이 없는 CI, 테스트)
//! - [`MemoizedProbe`]: 내부 probe를 최대 한 번만 성공 호출
//! - [`ConfiguredProbe`]: 설정에 따라 위 둘 중 하나를 선택
//!
//! probe 자체는 재시도하지 않습니다. 조회 실패는 사이클의 종료 실패가 됩니다.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use terracycle_core::types::AccountContext;

use crate::config::HarnessConfig;
use crate::error::HarnessError;
use crate::process::run_command;

/// 계정 컨텍스트 조회 trait
pub trait AccountProbe: Send + Sync + 'static {
    /// 현재 계정 컨텍스트를 조회합니다.
    ///
    /// # Errors
    ///
    /// 자격증명이 없거나 조회가 실패하면 `HarnessError::Probe`를 반환합니다.
    fn resolve_account_context(
        &self,
    ) -> impl Future<Output = Result<AccountContext, HarnessError>> + Send;
}

impl<P: AccountProbe> AccountProbe for Arc<P> {
    async fn resolve_account_context(&self) -> Result<AccountContext, HarnessError> {
        self.as_ref().resolve_account_context().await
    }
}

/// 고정 컨텍스트를 반환하는 probe
#[derive(Debug, Clone)]
pub struct StaticProbe {
    context: AccountContext,
}

impl StaticProbe {
    pub fn new(context: AccountContext) -> Self {
        Self { context }
    }
}

impl AccountProbe for StaticProbe {
    async fn resolve_account_context(&self) -> Result<AccountContext, HarnessError> {
        Ok(self.context.clone())
    }
}

/// `sts get-caller-identity` 응답
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CallerIdentity {
    account: String,
    arn: Option<String>,
}

/// aws CLI로 계정을 조회하는 probe
#[derive(Debug, Clone)]
pub struct AwsCliProbe {
    aws_binary: String,
    region: String,
    timeout: Duration,
}

impl AwsCliProbe {
    pub fn new(aws_binary: impl Into<String>, region: impl Into<String>, timeout: Duration) -> Self {
        Self {
            aws_binary: aws_binary.into(),
            region: region.into(),
            timeout,
        }
    }

    fn parse_identity(&self, stdout: &str) -> Result<AccountContext, HarnessError> {
        let identity: CallerIdentity = serde_json::from_str(stdout)
            .map_err(|e| HarnessError::Probe(format!("unexpected caller identity output: {e}")))?;

        if identity.account.is_empty() || !identity.account.chars().all(|c| c.is_ascii_digit()) {
            return Err(HarnessError::Probe(format!(
                "invalid account id in caller identity: '{}'",
                identity.account
            )));
        }

        Ok(AccountContext {
            account_id: identity.account,
            region: self.region.clone(),
            caller_arn: identity.arn,
        })
    }
}

impl AccountProbe for AwsCliProbe {
    async fn resolve_account_context(&self) -> Result<AccountContext, HarnessError> {
        let args = [
            "sts",
            "get-caller-identity",
            "--output",
            "json",
            "--region",
            self.region.as_str(),
        ]
        .map(str::to_owned);

        debug!(aws_binary = %self.aws_binary, region = %self.region, "resolving caller identity");

        let output = run_command(&self.aws_binary, &args, &[], None, Some(self.timeout))
            .await
            .map_err(|e| HarnessError::Probe(format!("{}: {e}", self.aws_binary)))?;

        if !output.success() {
            return Err(HarnessError::Probe(output.failure_message()));
        }

        let context = self.parse_identity(&output.stdout)?;
        info!(
            account_id = %context.account_id,
            region = %context.region,
            "resolved account context"
        );
        Ok(context)
    }
}

/// 내부 probe의 첫 성공 결과를 재사용하는 probe
///
/// 실패는 캐시하지 않으므로 다음 호출이 다시 조회합니다.
pub struct MemoizedProbe<P: AccountProbe> {
    inner: P,
    cell: OnceCell<AccountContext>,
}

impl<P: AccountProbe> MemoizedProbe<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            cell: OnceCell::new(),
        }
    }

    /// 이미 조회된 컨텍스트가 있으면 반환합니다.
    pub fn cached(&self) -> Option<&AccountContext> {
        self.cell.get()
    }
}

impl<P: AccountProbe> AccountProbe for MemoizedProbe<P> {
    async fn resolve_account_context(&self) -> Result<AccountContext, HarnessError> {
        self.cell
            .get_or_try_init(|| self.inner.resolve_account_context())
            .await
            .cloned()
    }
}

/// 설정으로 선택되는 probe
#[derive(Debug, Clone)]
pub enum ConfiguredProbe {
    Static(StaticProbe),
    AwsCli(AwsCliProbe),
}

impl ConfiguredProbe {
    /// 계정 ID가 설정되어 있으면 고정 probe, 아니면 aws CLI probe를 만듭니다.
    pub fn from_config(config: &HarnessConfig) -> Self {
        match &config.account_id {
            Some(account_id) => Self::Static(StaticProbe::new(AccountContext::new(
                account_id.clone(),
                config.region.clone(),
            ))),
            None => Self::AwsCli(AwsCliProbe::new(
                config.aws_binary.clone(),
                config.region.clone(),
                config.probe_timeout(),
            )),
        }
    }
}

impl AccountProbe for ConfiguredProbe {
    async fn resolve_account_context(&self) -> Result<AccountContext, HarnessError> {
        match self {
            Self::Static(probe) => probe.resolve_account_context().await,
            Self::AwsCli(probe) => probe.resolve_account_context().await,
        }
    }
}
