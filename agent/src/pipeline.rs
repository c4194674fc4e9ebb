//! Upload of pending records, one account group at a time.
//!
//! For each account the pipeline first creates the remote account instance,
//! then uploads old meters, then new meters. New meters of an account are
//! only sent once at least one of its old meters was accepted in the same
//! pass. Failures are recorded on the rows and folded into the returned
//! [`UploadSummary`]; nothing is ever deleted except on a confirmed upload.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fieldsync_engine::{
    group_by_account, AccountGroup, Classification, FailureKind, PendingRecord, RecordFailure,
    RetryPolicy, UploadSummary, ALREADY_UPLOADING, INVALID_ACCOUNT_MESSAGE, NO_CONNECTION,
    SKIPPED_DEPENDENCY_MESSAGE,
};
use futures::stream::{self, StreamExt};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::clock;
use crate::db::{self, Database, DatabaseError, SyncType};
use crate::gateway::{Connectivity, GatewayError, UploadGateway};
use crate::reconciler::InFlight;
use crate::retry::retry_fixed;

/// Tuning knobs for one pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Account groups processed per pass; the rest are deferred
    pub max_accounts_per_pass: usize,
    /// Account groups in flight at once
    pub account_concurrency: usize,
    pub instance_retry: RetryPolicy,
    pub upload_retry: RetryPolicy,
}

impl PipelineOptions {
    pub const DEFAULT_MAX_ACCOUNTS: usize = 25;
    pub const DEFAULT_CONCURRENCY: usize = 2;

    /// Defaults with the given fixed retry delay for every remote call.
    pub fn with_retry_delay(delay_ms: u64) -> Self {
        Self {
            instance_retry: RetryPolicy::instance(delay_ms),
            upload_retry: RetryPolicy::upload(delay_ms),
            ..Self::default()
        }
    }
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_accounts_per_pass: Self::DEFAULT_MAX_ACCOUNTS,
            account_concurrency: Self::DEFAULT_CONCURRENCY,
            instance_retry: RetryPolicy::instance(2000),
            upload_retry: RetryPolicy::upload(2000),
        }
    }
}

pub struct UploadPipeline {
    db: Database,
    gateway: Arc<dyn UploadGateway>,
    connectivity: Arc<dyn Connectivity>,
    options: PipelineOptions,
    in_flight: AtomicBool,
}

impl UploadPipeline {
    pub fn new(
        db: Database,
        gateway: Arc<dyn UploadGateway>,
        connectivity: Arc<dyn Connectivity>,
        options: PipelineOptions,
    ) -> Self {
        Self {
            db,
            gateway,
            connectivity,
            options,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn is_uploading(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Push every pending record to the backend.
    ///
    /// Returns without touching the store when offline or when another pass
    /// is running.
    pub async fn upload_pending(&self) -> UploadSummary {
        let Some(_guard) = InFlight::acquire(&self.in_flight) else {
            debug!("Upload pass already in flight");
            return UploadSummary::aborted(ALREADY_UPLOADING);
        };

        if !self.connectivity.is_online().await {
            debug!("Upload pass skipped, no connection");
            return UploadSummary::aborted(NO_CONNECTION);
        }

        let run_id = Uuid::new_v4();
        let span = info_span!("upload_pass", run_id = %run_id);
        match self.run().instrument(span).await {
            Ok(summary) => summary,
            Err(e) => {
                error!(run_id = %run_id, "Upload pass failed on local store: {}", e);
                UploadSummary::aborted(e.to_string())
            }
        }
    }

    async fn run(&self) -> Result<UploadSummary, DatabaseError> {
        let pool = self.db.pool();
        let old_meters = db::list_pending_old_meters(pool).await?;
        let new_meters = db::list_pending_new_meters(pool).await?;
        let groups = group_by_account(old_meters, new_meters);

        let mut summary = UploadSummary {
            success: true,
            ..Default::default()
        };

        let (valid, invalid): (Vec<_>, Vec<_>) =
            groups.into_iter().partition(AccountGroup::has_valid_account);
        for group in &invalid {
            summary.merge(self.reject_group(group).await?);
        }

        let limit = self.options.max_accounts_per_pass.max(1);
        summary.deferred_accounts = valid.len().saturating_sub(limit);
        if summary.deferred_accounts > 0 {
            info!(
                deferred = summary.deferred_accounts,
                "Account limit reached, deferring the newest accounts"
            );
        }

        info!(accounts = valid.len().min(limit), "Upload pass started");
        let results: Vec<_> = stream::iter(valid.into_iter().take(limit))
            .map(|group| self.process_group(group))
            .buffer_unordered(self.options.account_concurrency.max(1))
            .collect()
            .await;

        for (partial, store_error) in results {
            summary.merge(partial);
            if let Some(e) = store_error {
                error!("Account group aborted on local store: {}", e);
                summary.success = false;
                summary.reason = Some(e.to_string());
            }
        }

        db::set_last_sync_timestamp(pool, SyncType::Upload, clock::now_ms()).await?;
        info!(
            old_uploaded = summary.old_meter_uploaded,
            old_total = summary.old_meter_total,
            new_uploaded = summary.new_meter_uploaded,
            new_total = summary.new_meter_total,
            failed = summary.failed(),
            skipped = summary.skipped,
            "Upload pass finished"
        );
        Ok(summary)
    }

    /// Mark every record of a group with an unusable account id.
    async fn reject_group(&self, group: &AccountGroup) -> Result<UploadSummary, DatabaseError> {
        warn!(records = group.len(), "Rejecting records with an empty account id");
        let mut summary = Self::group_totals(group);
        let classification = Classification::local(FailureKind::Validation);

        for record in &group.old_meters {
            self.record_failure(&mut summary, record, INVALID_ACCOUNT_MESSAGE, None, classification)
                .await?;
        }
        for record in &group.new_meters {
            self.record_failure(&mut summary, record, INVALID_ACCOUNT_MESSAGE, None, classification)
                .await?;
        }
        Ok(summary)
    }

    /// Upload one account group. Counts made before a local store failure
    /// are returned with the error.
    async fn process_group(&self, group: AccountGroup) -> (UploadSummary, Option<DatabaseError>) {
        let mut summary = Self::group_totals(&group);
        let outcome = self.upload_group(&group, &mut summary).await;
        (summary, outcome.err())
    }

    async fn upload_group(
        &self,
        group: &AccountGroup,
        summary: &mut UploadSummary,
    ) -> Result<(), DatabaseError> {
        let account = group.account_id.as_str();

        let instance = retry_fixed(
            self.options.instance_retry,
            "create account instance",
            || self.gateway.create_account_instance(account),
            GatewayError::is_transient,
        )
        .await;

        if let Err(e) = instance {
            warn!(account_id = %account, auth = e.is_auth(), "Account instance failed: {}", e);
            for record in &group.old_meters {
                self.record_gateway_failure(summary, record, &e).await?;
            }
            for record in &group.new_meters {
                self.record_gateway_failure(summary, record, &e).await?;
            }
            return Ok(());
        }

        for record in &group.old_meters {
            let upload = retry_fixed(
                self.options.upload_retry,
                "old meter upload",
                || self.gateway.upload_old_meter(record),
                GatewayError::is_transient,
            )
            .await;

            match upload {
                Ok(_) => {
                    db::mark_old_meter_uploaded(self.db.pool(), record.id).await?;
                    summary.old_meter_uploaded += 1;
                    debug!(account_id = %account, record_id = record.id, "Old meter uploaded");
                }
                Err(e) => self.record_gateway_failure(summary, record, &e).await?,
            }
        }

        if summary.old_meter_uploaded == 0 {
            if !group.new_meters.is_empty() {
                warn!(
                    account_id = %account,
                    records = group.new_meters.len(),
                    "No old meter accepted, holding back new meters"
                );
            }
            let classification = Classification::local(FailureKind::SkippedDependency);
            for record in &group.new_meters {
                self.record_failure(
                    summary,
                    record,
                    SKIPPED_DEPENDENCY_MESSAGE,
                    None,
                    classification,
                )
                .await?;
                summary.skipped += 1;
            }
            return Ok(());
        }

        for record in &group.new_meters {
            let upload = retry_fixed(
                self.options.upload_retry,
                "new meter upload",
                || self.gateway.upload_new_meter(record),
                GatewayError::is_transient,
            )
            .await;

            match upload {
                Ok(_) => {
                    db::mark_new_meter_uploaded(self.db.pool(), record.id).await?;
                    summary.new_meter_uploaded += 1;
                    debug!(account_id = %account, record_id = record.id, "New meter uploaded");
                }
                Err(e) => self.record_gateway_failure(summary, record, &e).await?,
            }
        }

        Ok(())
    }

    fn group_totals(group: &AccountGroup) -> UploadSummary {
        UploadSummary {
            old_meter_total: group.old_meters.len(),
            new_meter_total: group.new_meters.len(),
            ..Default::default()
        }
    }

    async fn record_gateway_failure<R: PendingRecord>(
        &self,
        summary: &mut UploadSummary,
        record: &R,
        error: &GatewayError,
    ) -> Result<(), DatabaseError> {
        warn!(
            account_id = %record.account_id(),
            record_id = record.id(),
            kind = %R::KIND,
            "Upload failed: {}",
            error
        );
        self.record_failure(
            summary,
            record,
            &error.to_string(),
            error.status(),
            error.classification(),
        )
        .await
    }

    /// Store the error on the row and add it to the summary. The row stays
    /// pending.
    async fn record_failure<R: PendingRecord>(
        &self,
        summary: &mut UploadSummary,
        record: &R,
        message: &str,
        status: Option<u16>,
        classification: Classification,
    ) -> Result<(), DatabaseError> {
        db::mark_with_error(self.db.pool(), R::KIND, record.id(), message).await?;
        summary.failures.push(RecordFailure::new(
            record.id(),
            R::KIND,
            record.account_id().trim(),
            message,
            status,
            classification,
        ));
        Ok(())
    }
}

