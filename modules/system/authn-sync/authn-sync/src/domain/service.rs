//! Domain service for authn sync.
//!
//! Validates an [`AuthSpec`], picks the audience strategy for the device,
//! converges the device onto it and reports the faults of the pass.

use std::sync::Arc;

use authn_sync_sdk::{
    AuthSpec, ContentStore, CsVserverAuth, DeviceSession, Field, Resource, ResourceKind,
};
use tracing::instrument;

use super::audience;
use super::capability::DeviceCapabilities;
use super::error::DomainError;
use super::faults::Fault;
use super::pass::Pass;
use super::priority::HighWaterMarks;
use super::reconciler::reconcile;
use super::synthesizer::{Plan, drop_pattern_set, synthesize};
use crate::config::AuthnSyncConfig;

/// Outcome of one pass.
#[derive(Debug)]
pub struct SyncReport {
    /// Auth vserver the pass ran against.
    pub auth_vserver: String,
    pub marks: HighWaterMarks,
    /// Device calls that failed and were not benign, in call order.
    pub faults: Vec<Fault>,
    /// Number of failures matched by an allow-list.
    pub suppressed: usize,
}

impl SyncReport {
    fn from_pass(auth_vserver: &str, marks: HighWaterMarks, pass: Pass<'_>) -> Self {
        let (faults, suppressed) = pass.faults.into_parts();
        Self {
            auth_vserver: auth_vserver.to_owned(),
            marks,
            faults,
            suppressed,
        }
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
    }
}

/// Domain service for authn sync operations.
#[derive(Clone)]
pub struct AuthnSyncService {
    session: Arc<dyn DeviceSession>,
    content: Arc<dyn ContentStore>,
    config: Arc<AuthnSyncConfig>,
}

impl AuthnSyncService {
    pub fn new(
        session: Arc<dyn DeviceSession>,
        content: Arc<dyn ContentStore>,
        config: AuthnSyncConfig,
    ) -> Self {
        Self {
            session,
            content,
            config: Arc::new(config),
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthnSyncConfig {
        &self.config
    }

    fn pass(&self) -> Pass<'_> {
        Pass::new(self.session.as_ref(), self.content.as_ref(), &self.config)
    }

    /// Converge the device onto `spec` and remove superseded entries.
    ///
    /// Device failures do not stop the pass; they are collected in the
    /// report. Only problems found before the first mutating call are errors.
    ///
    /// # Errors
    /// Returns [`DomainError`] if `spec` is invalid, the device version
    /// cannot be queried, or the audiences cannot be packed.
    #[instrument(skip_all, fields(auth_vserver = %spec.name))]
    pub async fn sync(&self, spec: &AuthSpec) -> Result<SyncReport, DomainError> {
        let mut pass = self.pass();
        let marks = self.run_sync(&mut pass, spec).await?;
        let report = SyncReport::from_pass(&spec.name, marks, pass);
        log_report("sync", &report);
        Ok(report)
    }

    /// Remove every object the engine created for `name`.
    #[instrument(skip(self))]
    pub async fn remove(&self, name: &str) -> SyncReport {
        let mut pass = self.pass();
        let marks = Self::run_remove(&mut pass, name).await;
        let report = SyncReport::from_pass(name, marks, pass);
        log_report("remove", &report);
        report
    }

    /// Attach authentication to content-switching vserver `cs_vserver`, or
    /// detach it when `spec` is `None`.
    ///
    /// The auth vserver is named after `cs_vserver`; the name in `spec` is
    /// ignored.
    ///
    /// # Errors
    /// Same as [`AuthnSyncService::sync`].
    #[instrument(skip(self, spec), fields(attach = spec.is_some()))]
    pub async fn attach(
        &self,
        cs_vserver: &str,
        spec: Option<&AuthSpec>,
    ) -> Result<SyncReport, DomainError> {
        let auth_vserver = format!("{cs_vserver}{}", self.config.vserver_suffix);
        let mut pass = self.pass();

        let marks = if let Some(spec) = spec {
            let spec = AuthSpec {
                name: auth_vserver.clone(),
                ..spec.clone()
            };
            let marks = self.run_sync(&mut pass, &spec).await?;
            pass.update(&Resource::CsVserver(CsVserverAuth {
                name: cs_vserver.to_owned(),
                authn_401: true,
                authn_vserver: auth_vserver.clone(),
            }))
            .await;
            marks
        } else {
            pass.unset(
                ResourceKind::CsVserver,
                cs_vserver,
                &[Field::Authn401, Field::AuthnVsName],
            )
            .await;
            Self::run_remove(&mut pass, &auth_vserver).await
        };

        let report = SyncReport::from_pass(&auth_vserver, marks, pass);
        log_report(if spec.is_some() { "attach" } else { "detach" }, &report);
        Ok(report)
    }

    async fn run_sync(
        &self,
        pass: &mut Pass<'_>,
        spec: &AuthSpec,
    ) -> Result<HighWaterMarks, DomainError> {
        let plan = Plan::prepare(spec, &self.config)?;

        let version = self.session.version().await?;
        let capabilities = DeviceCapabilities::resolve(version, &self.config.capability_rules);
        tracing::debug!(%version, audience_mode = ?capabilities.audience_mode, "resolved device capabilities");

        let audience = audience::pack(
            &spec.audiences,
            capabilities.audience_mode,
            self.config.audience_budget,
            &spec.name,
        )?;

        let marks = synthesize(pass, &plan, &audience).await;
        reconcile(pass, &spec.name, marks).await;
        Ok(marks)
    }

    async fn run_remove(pass: &mut Pass<'_>, name: &str) -> HighWaterMarks {
        let marks = HighWaterMarks::teardown();
        reconcile(pass, name, marks).await;
        drop_pattern_set(pass, name).await;
        pass.delete(ResourceKind::AuthVserver, name).await;
        marks
    }
}

fn log_report(operation: &str, report: &SyncReport) {
    if report.is_clean() {
        tracing::info!(
            operation,
            auth_vserver = %report.auth_vserver,
            suppressed = report.suppressed,
            "authn sync pass completed"
        );
    } else {
        tracing::warn!(
            operation,
            auth_vserver = %report.auth_vserver,
            faults = report.faults.len(),
            suppressed = report.suppressed,
            "authn sync pass completed with faults"
        );
    }
}
