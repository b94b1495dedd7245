//! Groups normalized records by fund id.
//!
//! Records without a fund id or a valid report period cannot be stored and
//! are dropped here; the count is reported back so the sync can surface it.

use std::collections::BTreeMap;

use crate::services::record_normalizer::NormalizedRecord;
use crate::services::report_period::ReportPeriod;

/// All valid records of one fund, in input order.
#[derive(Debug, Clone)]
pub struct FundGroup {
    pub fund_id: String,
    pub records: Vec<NormalizedRecord>,
}

impl FundGroup {
    /// The record with the highest report period. On ties the first one in
    /// input order wins.
    pub fn latest(&self) -> Option<&NormalizedRecord> {
        self.records.iter().reduce(|best, record| {
            if record.report_period > best.report_period {
                record
            } else {
                best
            }
        })
    }

    pub fn latest_period(&self) -> Option<ReportPeriod> {
        self.latest().and_then(|r| r.report_period)
    }
}

#[derive(Debug, Default)]
pub struct FundGroups {
    pub groups: BTreeMap<String, FundGroup>,
    /// Records dropped for a missing fund id or report period
    pub dropped: usize,
}

impl FundGroups {
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

pub fn group_by_fund(records: Vec<NormalizedRecord>) -> FundGroups {
    let mut result = FundGroups::default();

    for record in records {
        let fund_id = match (&record.fund_id, record.report_period) {
            (Some(id), Some(_)) => id.clone(),
            _ => {
                tracing::debug!(
                    fund_id = ?record.fund_id,
                    fund_name = %record.fund_name,
                    "Dropping record without fund id or report period"
                );
                result.dropped += 1;
                continue;
            }
        };

        result
            .groups
            .entry(fund_id.clone())
            .or_insert_with(|| FundGroup {
                fund_id,
                records: Vec::new(),
            })
            .records
            .push(record);
    }

    if result.dropped > 0 {
        tracing::warn!(dropped = result.dropped, "Dropped unusable Gemelnet records");
    }

    result
}
