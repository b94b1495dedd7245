//! Gemelnet sync engine
//!
//! Fetch → normalize → group → upsert. Every fund group is written inside
//! its own transaction: a group either lands completely (company, fund,
//! snapshots, cached values) or not at all, and a failing group never stops
//! the run.
//!
//! Idempotence comes from a pre-loaded `(external_id, report_period)` index:
//! a period that is already stored is skipped, never rewritten.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    IntoActiveModel, JoinType, QueryFilter, QuerySelect, RelationTrait, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::entities::{companies, fund_snapshots, funds, prelude::*};
use crate::services::fund_aggregator::{group_by_fund, FundGroup};
use crate::services::fund_store::{self, CachedValues};
use crate::services::gemelnet::{fetch_all_records, DatasetClient, FetchError, GemelnetConfig};
use crate::services::record_normalizer::{normalize, NormalizedRecord, SnapshotMetrics};

/// Emit a progress event every this many fund groups
const PROGRESS_EVERY: usize = 100;

/// Rows per multi-row INSERT, well under the bind-parameter limits
const SNAPSHOT_INSERT_CHUNK: usize = 500;

#[derive(Debug, Clone)]
pub struct SyncOptions {
    /// Fetched in order; a (fund, period) seen in more than one resource is
    /// taken from the first
    pub resource_ids: Vec<String>,
    pub batch_size: usize,
    /// true: ingest every period in the fetch. false: only each fund's
    /// latest period, and keep company names up to date.
    pub keep_history: bool,
    /// Run every write, then roll it back.
    pub dry_run: bool,
}

impl SyncOptions {
    pub fn new(config: &GemelnetConfig) -> Self {
        Self {
            resource_ids: vec![config.resource_id.clone()],
            batch_size: config.batch_size,
            keep_history: true,
            dry_run: false,
        }
    }

    pub fn resources(mut self, resource_ids: Vec<String>) -> Self {
        self.resource_ids = resource_ids;
        self
    }

    pub fn keep_history(mut self, keep_history: bool) -> Self {
        self.keep_history = keep_history;
        self
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStats {
    pub fetched: usize,
    pub unique_funds: usize,
    pub companies_created: usize,
    pub companies_updated: usize,
    pub funds_created: usize,
    pub funds_updated: usize,
    pub snapshots_created: usize,
    pub snapshots_skipped: usize,
    /// Unusable records plus failed fund groups
    pub errors: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncFailure {
    pub fund_id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub stats: SyncStats,
    pub failures: Vec<SyncFailure>,
    pub dry_run: bool,
}

/// Errors that abort a whole run.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Errors that skip a single fund group.
#[derive(Debug, Error)]
pub enum GroupError {
    #[error("missing company legal id or name")]
    MissingCompany,

    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

/// Progress notifications emitted during a run.
#[derive(Debug)]
pub enum SyncEvent<'a> {
    Started {
        resource_ids: &'a [String],
        limit: Option<usize>,
        keep_history: bool,
        dry_run: bool,
    },
    Fetched {
        resource_id: &'a str,
        records: usize,
    },
    Grouped {
        funds: usize,
        dropped: usize,
    },
    FundSynced {
        fund_id: &'a str,
        snapshots_created: usize,
        snapshots_skipped: usize,
    },
    FundFailed {
        fund_id: &'a str,
        reason: &'a str,
    },
    Progress {
        processed: usize,
        total: usize,
    },
    Finished {
        stats: &'a SyncStats,
    },
}

pub trait SyncObserver: Send + Sync {
    fn on_event(&self, event: &SyncEvent<'_>);
}

/// Default observer: structured log lines.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl SyncObserver for TracingObserver {
    fn on_event(&self, event: &SyncEvent<'_>) {
        match event {
            SyncEvent::Started {
                resource_ids,
                limit,
                keep_history,
                dry_run,
            } => tracing::info!(
                ?resource_ids,
                ?limit,
                keep_history,
                dry_run,
                "Starting Gemelnet sync"
            ),
            SyncEvent::Fetched {
                resource_id,
                records,
            } => tracing::info!(resource_id, records, "Fetched Gemelnet resource"),
            SyncEvent::Grouped { funds, dropped } => {
                tracing::info!(funds, dropped, "Grouped records by fund")
            }
            SyncEvent::FundSynced {
                fund_id,
                snapshots_created,
                snapshots_skipped,
            } => tracing::debug!(
                fund_id,
                snapshots_created,
                snapshots_skipped,
                "Synced fund"
            ),
            SyncEvent::FundFailed { fund_id, reason } => {
                tracing::warn!(fund_id, reason, "Failed to sync fund")
            }
            SyncEvent::Progress { processed, total } => {
                tracing::info!(processed, total, "Sync progress")
            }
            SyncEvent::Finished { stats } => tracing::info!(
                fetched = stats.fetched,
                unique_funds = stats.unique_funds,
                companies_created = stats.companies_created,
                companies_updated = stats.companies_updated,
                funds_created = stats.funds_created,
                funds_updated = stats.funds_updated,
                snapshots_created = stats.snapshots_created,
                snapshots_skipped = stats.snapshots_skipped,
                errors = stats.errors,
                "Gemelnet sync finished"
            ),
        }
    }
}

/// What one fund group contributed, applied to the run state only after the
/// group's transaction has committed.
#[derive(Debug, Default)]
struct GroupOutcome {
    company: Option<companies::Model>,
    company_created: bool,
    company_updated: bool,
    fund_created: bool,
    fund_updated: bool,
    new_periods: Vec<i32>,
    snapshots_skipped: usize,
}

pub struct FundSyncService {
    db: DatabaseConnection,
    client: Arc<dyn DatasetClient>,
    options: SyncOptions,
    observer: Arc<dyn SyncObserver>,
}

impl FundSyncService {
    pub fn new(db: DatabaseConnection, client: Arc<dyn DatasetClient>, options: SyncOptions) -> Self {
        Self {
            db,
            client,
            options,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn SyncObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Run one sync. `limit` caps the fetch of each resource to a single
    /// page of that size.
    ///
    /// Every resource is fetched before anything is written, so a fetch
    /// failure aborts with the store untouched. Failures of individual fund
    /// groups are counted in `stats.errors` and listed in `failures`.
    pub async fn sync(&self, limit: Option<usize>) -> Result<SyncReport, SyncError> {
        let options = &self.options;

        self.observer.on_event(&SyncEvent::Started {
            resource_ids: &options.resource_ids,
            limit,
            keep_history: options.keep_history,
            dry_run: options.dry_run,
        });

        let mut report = SyncReport {
            dry_run: options.dry_run,
            ..Default::default()
        };
        let mut normalized: Vec<NormalizedRecord> = Vec::new();

        for resource_id in &options.resource_ids {
            let raw_records = fetch_all_records(
                self.client.as_ref(),
                resource_id,
                limit,
                options.batch_size,
            )
            .await?;

            report.stats.fetched += raw_records.len();
            self.observer.on_event(&SyncEvent::Fetched {
                resource_id,
                records: raw_records.len(),
            });

            normalized.extend(raw_records.iter().map(normalize));
        }

        let fund_groups = group_by_fund(normalized);
        report.stats.unique_funds = fund_groups.len();
        report.stats.errors += fund_groups.dropped;
        self.observer.on_event(&SyncEvent::Grouped {
            funds: fund_groups.len(),
            dropped: fund_groups.dropped,
        });

        let mut index = self.load_snapshot_index().await?;
        let mut companies = self.load_companies().await?;
        // Companies a dry run has already counted, since their rows were rolled back
        let mut dry_run_seen: HashSet<(String, bool)> = HashSet::new();

        let total = fund_groups.len();

        for (processed, group) in fund_groups.groups.values().enumerate() {
            match self.sync_group(group, &companies, &index).await {
                Ok(outcome) => {
                    let stats = &mut report.stats;

                    if let Some(company) = outcome.company {
                        if options.dry_run {
                            let created_key = (company.legal_id.clone(), outcome.company_created);
                            if dry_run_seen.insert(created_key) {
                                stats.companies_created += outcome.company_created as usize;
                                stats.companies_updated += outcome.company_updated as usize;
                            }
                        } else {
                            stats.companies_created += outcome.company_created as usize;
                            stats.companies_updated += outcome.company_updated as usize;
                            companies.insert(company.legal_id.clone(), company);
                        }
                    }

                    stats.funds_created += outcome.fund_created as usize;
                    stats.funds_updated += outcome.fund_updated as usize;
                    stats.snapshots_created += outcome.new_periods.len();
                    stats.snapshots_skipped += outcome.snapshots_skipped;

                    self.observer.on_event(&SyncEvent::FundSynced {
                        fund_id: &group.fund_id,
                        snapshots_created: outcome.new_periods.len(),
                        snapshots_skipped: outcome.snapshots_skipped,
                    });

                    for period in outcome.new_periods {
                        index.insert((group.fund_id.clone(), period));
                    }
                }
                Err(e) => {
                    let reason = e.to_string();
                    report.stats.errors += 1;
                    self.observer.on_event(&SyncEvent::FundFailed {
                        fund_id: &group.fund_id,
                        reason: &reason,
                    });
                    report.failures.push(SyncFailure {
                        fund_id: group.fund_id.clone(),
                        reason,
                    });
                }
            }

            if (processed + 1) % PROGRESS_EVERY == 0 {
                self.observer.on_event(&SyncEvent::Progress {
                    processed: processed + 1,
                    total,
                });
            }
        }

        self.observer.on_event(&SyncEvent::Finished {
            stats: &report.stats,
        });

        Ok(report)
    }

    /// Every `(external_id, report_period)` already stored, in one query.
    async fn load_snapshot_index(&self) -> Result<HashSet<(String, i32)>, DbErr> {
        let rows: Vec<(Option<String>, i32)> = FundSnapshots::find()
            .select_only()
            .column_as(funds::Column::ExternalId, "external_id")
            .column(fund_snapshots::Column::ReportPeriod)
            .join(JoinType::InnerJoin, fund_snapshots::Relation::Funds.def())
            .into_tuple()
            .all(&self.db)
            .await?;

        let index: HashSet<(String, i32)> = rows
            .into_iter()
            .filter_map(|(external_id, period)| external_id.map(|id| (id, period)))
            .collect();

        tracing::debug!(snapshots = index.len(), "Loaded existing snapshot index");
        Ok(index)
    }

    async fn load_companies(&self) -> Result<HashMap<String, companies::Model>, DbErr> {
        let companies = Companies::find().all(&self.db).await?;
        Ok(companies
            .into_iter()
            .map(|c| (c.legal_id.clone(), c))
            .collect())
    }

    async fn sync_group(
        &self,
        group: &FundGroup,
        companies: &HashMap<String, companies::Model>,
        index: &HashSet<(String, i32)>,
    ) -> Result<GroupOutcome, GroupError> {
        let Some(latest) = group.latest() else {
            return Ok(GroupOutcome::default());
        };

        let (Some(legal_id), Some(company_name)) = (&latest.company_legal_id, &latest.company_name)
        else {
            return Err(GroupError::MissingCompany);
        };

        let txn = self.db.begin().await?;

        match self
            .write_group(&txn, group, latest, legal_id, company_name, companies, index)
            .await
        {
            Ok(outcome) => {
                if self.options.dry_run {
                    txn.rollback().await?;
                } else {
                    txn.commit().await?;
                }
                Ok(outcome)
            }
            Err(e) => {
                if let Err(rollback_err) = txn.rollback().await {
                    tracing::warn!(
                        fund_id = %group.fund_id,
                        error = %rollback_err,
                        "Rollback failed"
                    );
                }
                Err(e)
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn write_group(
        &self,
        txn: &DatabaseTransaction,
        group: &FundGroup,
        latest: &NormalizedRecord,
        legal_id: &str,
        company_name: &str,
        companies: &HashMap<String, companies::Model>,
        index: &HashSet<(String, i32)>,
    ) -> Result<GroupOutcome, GroupError> {
        let now = Utc::now().naive_utc();
        let mut outcome = GroupOutcome::default();

        // Company
        let company_id = match companies.get(legal_id) {
            Some(existing) => {
                if !self.options.keep_history && existing.name != company_name {
                    let mut active = existing.clone().into_active_model();
                    active.name = Set(company_name.to_string());
                    active.updated_at = Set(now);
                    outcome.company = Some(active.update(txn).await?);
                    outcome.company_updated = true;
                }
                existing.id
            }
            None => {
                let created = companies::ActiveModel {
                    legal_id: Set(legal_id.to_string()),
                    name: Set(company_name.to_string()),
                    short_name: Set(None),
                    created_at: Set(now),
                    updated_at: Set(now),
                    ..Default::default()
                }
                .insert(txn)
                .await?;
                let id = created.id;
                outcome.company = Some(created);
                outcome.company_created = true;
                id
            }
        };

        // Fund
        let latest_period = group.latest_period().map(|p| p.value());
        let existing = Funds::find()
            .filter(funds::Column::ExternalId.eq(group.fund_id.as_str()))
            .one(txn)
            .await?;

        let fund = match existing {
            None => {
                let cached = CachedValues::from_record(latest);
                let mut active = fund_fields(latest, company_id, now);
                active.external_id = Set(Some(group.fund_id.clone()));
                active.return_rate = Set(cached.return_rate);
                active.total_assets = Set(cached.total_assets);
                active.latest_report_period = Set(cached.latest_report_period);
                active.created_at = Set(now);
                outcome.fund_created = true;
                active.insert(txn).await?
            }
            Some(fund) => {
                // An older fetch must not overwrite newer static fields
                let is_current = match (fund.latest_report_period, latest_period) {
                    (Some(stored), Some(incoming)) => incoming >= stored,
                    _ => true,
                };

                if is_current {
                    let mut active = fund_fields(latest, company_id, now);
                    active.id = Set(fund.id);
                    outcome.fund_updated = true;
                    active.update(txn).await?
                } else {
                    fund
                }
            }
        };

        // Snapshots
        let candidates: Vec<&NormalizedRecord> = if self.options.keep_history {
            group.records.iter().collect()
        } else {
            vec![latest]
        };

        let mut inserted: HashSet<i32> = HashSet::new();
        let mut rows = Vec::new();

        for record in candidates {
            let Some(period) = record.report_period.map(|p| p.value()) else {
                continue;
            };

            if index.contains(&(group.fund_id.clone(), period)) || !inserted.insert(period) {
                outcome.snapshots_skipped += 1;
                continue;
            }

            rows.push(snapshot_row(fund.id, period, &record.metrics, now));
        }

        while !rows.is_empty() {
            let rest = rows.split_off(rows.len().min(SNAPSHOT_INSERT_CHUNK));
            FundSnapshots::insert_many(rows)
                .exec_without_returning(txn)
                .await?;
            rows = rest;
        }

        // Cached values follow whatever snapshot now has the max period
        if !outcome.fund_created && fund_store::refresh_fund_cache(txn, fund).await? {
            outcome.fund_updated = true;
        }

        let mut new_periods: Vec<i32> = inserted.into_iter().collect();
        new_periods.sort_unstable();
        outcome.new_periods = new_periods;

        Ok(outcome)
    }
}

/// Static fund fields taken from a group's latest record.
fn fund_fields(record: &NormalizedRecord, company_id: i32, now: NaiveDateTime) -> funds::ActiveModel {
    funds::ActiveModel {
        company_id: Set(company_id),
        name: Set(record.fund_name.clone()),
        category: Set(record.category.as_str().to_string()),
        fund_classification: Set(record.fund_classification.clone()),
        specialization: Set(record.specialization.clone()),
        sub_specialization: Set(record.sub_specialization.clone()),
        inception_date: Set(record.inception_date),
        management_fee: Set(record.management_fee),
        updated_at: Set(now),
        ..Default::default()
    }
}

fn snapshot_row(
    fund_id: i32,
    report_period: i32,
    m: &SnapshotMetrics,
    now: NaiveDateTime,
) -> fund_snapshots::ActiveModel {
    fund_snapshots::ActiveModel {
        fund_id: Set(fund_id),
        report_period: Set(report_period),
        monthly_yield: Set(m.monthly_yield),
        ytd_yield: Set(m.ytd_yield),
        return_3yr: Set(m.return_3yr),
        return_5yr: Set(m.return_5yr),
        avg_annual_return_3yr: Set(m.avg_annual_return_3yr),
        avg_annual_return_5yr: Set(m.avg_annual_return_5yr),
        total_assets: Set(m.total_assets),
        deposits: Set(m.deposits),
        withdrawals: Set(m.withdrawals),
        net_deposits: Set(m.net_deposits),
        internal_transfers: Set(m.internal_transfers),
        net_monthly_deposits: Set(m.net_monthly_deposits),
        standard_deviation: Set(m.standard_deviation),
        alpha: Set(m.alpha),
        sharpe_ratio: Set(m.sharpe_ratio),
        liquid_assets_percent: Set(m.liquid_assets_percent),
        stock_market_exposure: Set(m.stock_market_exposure),
        foreign_exposure: Set(m.foreign_exposure),
        foreign_currency_exposure: Set(m.foreign_currency_exposure),
        avg_annual_management_fee: Set(m.avg_annual_management_fee),
        avg_deposit_fee: Set(m.avg_deposit_fee),
        created_at: Set(now),
        ..Default::default()
    }
}
