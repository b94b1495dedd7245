//! Record normalizer
//!
//! Turns one raw Gemelnet row into a typed [`NormalizedRecord`]. Never fails:
//! a field that cannot be parsed becomes `None` and the rest of the record
//! is kept.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use crate::services::gemelnet::RawRecord;
use crate::services::report_period::ReportPeriod;

/// Source column names. `WITHDRAWLS` is spelled the way the dataset spells it.
pub mod columns {
    pub const FUND_ID: &str = "FUND_ID";
    pub const FUND_NAME: &str = "FUND_NAME";
    pub const REPORT_PERIOD: &str = "REPORT_PERIOD";
    pub const MANAGING_CORPORATION: &str = "MANAGING_CORPORATION";
    pub const MANAGING_CORPORATION_LEGAL_ID: &str = "MANAGING_CORPORATION_LEGAL_ID";
    pub const FUND_CLASSIFICATION: &str = "FUND_CLASSIFICATION";
    pub const SPECIALIZATION: &str = "SPECIALIZATION";
    pub const SUB_SPECIALIZATION: &str = "SUB_SPECIALIZATION";
    pub const INCEPTION_DATE: &str = "INCEPTION_DATE";
    pub const AVG_ANNUAL_MANAGEMENT_FEE: &str = "AVG_ANNUAL_MANAGEMENT_FEE";
    pub const AVG_DEPOSIT_FEE: &str = "AVG_DEPOSIT_FEE";
    pub const MONTHLY_YIELD: &str = "MONTHLY_YIELD";
    pub const YEAR_TO_DATE_YIELD: &str = "YEAR_TO_DATE_YIELD";
    pub const YIELD_TRAILING_3_YRS: &str = "YIELD_TRAILING_3_YRS";
    pub const YIELD_TRAILING_5_YRS: &str = "YIELD_TRAILING_5_YRS";
    pub const AVG_ANNUAL_YIELD_TRAILING_3YRS: &str = "AVG_ANNUAL_YIELD_TRAILING_3YRS";
    pub const AVG_ANNUAL_YIELD_TRAILING_5YRS: &str = "AVG_ANNUAL_YIELD_TRAILING_5YRS";
    pub const TOTAL_ASSETS: &str = "TOTAL_ASSETS";
    pub const DEPOSITS: &str = "DEPOSITS";
    pub const WITHDRAWLS: &str = "WITHDRAWLS";
    pub const INTERNAL_TRANSFERS: &str = "INTERNAL_TRANSFERS";
    pub const NET_MONTHLY_DEPOSITS: &str = "NET_MONTHLY_DEPOSITS";
    pub const STANDARD_DEVIATION: &str = "STANDARD_DEVIATION";
    pub const ALPHA: &str = "ALPHA";
    pub const SHARPE_RATIO: &str = "SHARPE_RATIO";
    pub const LIQUID_ASSETS_PERCENT: &str = "LIQUID_ASSETS_PERCENT";
    pub const STOCK_MARKET_EXPOSURE: &str = "STOCK_MARKET_EXPOSURE";
    pub const FOREIGN_EXPOSURE: &str = "FOREIGN_EXPOSURE";
    pub const FOREIGN_CURRENCY_EXPOSURE: &str = "FOREIGN_CURRENCY_EXPOSURE";
}

/// Simplified fund category, derived heuristically from classification text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundCategory {
    Stocks,
    Bonds,
    Mixed,
    MoneyMarket,
    Foreign,
    Index,
    RealEstate,
    #[default]
    Uncategorized,
}

impl FundCategory {
    pub const ALL: [FundCategory; 8] = [
        FundCategory::Stocks,
        FundCategory::Bonds,
        FundCategory::Mixed,
        FundCategory::MoneyMarket,
        FundCategory::Foreign,
        FundCategory::Index,
        FundCategory::RealEstate,
        FundCategory::Uncategorized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FundCategory::Stocks => "stocks",
            FundCategory::Bonds => "bonds",
            FundCategory::Mixed => "mixed",
            FundCategory::MoneyMarket => "money_market",
            FundCategory::Foreign => "foreign",
            FundCategory::Index => "index",
            FundCategory::RealEstate => "real_estate",
            FundCategory::Uncategorized => "uncategorized",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        let slug = slug.to_lowercase();
        Self::ALL.into_iter().find(|c| c.as_str() == slug)
    }
}

impl fmt::Display for FundCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which text a keyword is matched against.
#[derive(Debug, Clone, Copy)]
enum Field {
    Classification,
    Specialization,
}

/// Keyword table, checked top to bottom; the first hit wins.
const CATEGORY_RULES: &[(FundCategory, &[(Field, &str)])] = &[
    (
        FundCategory::Stocks,
        &[(Field::Classification, "מניות"), (Field::Specialization, "מניות")],
    ),
    (
        FundCategory::Bonds,
        &[
            (Field::Classification, "אג\"ח"),
            (Field::Specialization, "אג\"ח"),
            (Field::Classification, "אגח"),
        ],
    ),
    (
        FundCategory::Mixed,
        &[(Field::Classification, "מעורב"), (Field::Specialization, "מעורב")],
    ),
    (
        FundCategory::MoneyMarket,
        &[(Field::Classification, "שוק כסף"), (Field::Specialization, "כסף")],
    ),
    (
        FundCategory::Foreign,
        &[(Field::Classification, "חו\"ל"), (Field::Classification, "חול")],
    ),
    (
        FundCategory::Index,
        &[(Field::Classification, "מדד"), (Field::Specialization, "מדד")],
    ),
    (
        FundCategory::RealEstate,
        &[(Field::Classification, "נדל\"ן"), (Field::Classification, "נדלן")],
    ),
];

/// Map classification/specialization text to a category.
pub fn map_category(classification: &str, specialization: &str) -> FundCategory {
    let classification = classification.to_lowercase();
    let specialization = specialization.to_lowercase();

    for (category, keywords) in CATEGORY_RULES {
        let hit = keywords.iter().any(|(field, keyword)| match field {
            Field::Classification => classification.contains(keyword),
            Field::Specialization => specialization.contains(keyword),
        });
        if hit {
            return *category;
        }
    }

    FundCategory::Uncategorized
}

/// Per-period metrics of one fund; every field is independently optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetrics {
    pub monthly_yield: Option<Decimal>,
    pub ytd_yield: Option<Decimal>,
    pub return_3yr: Option<Decimal>,
    pub return_5yr: Option<Decimal>,
    pub avg_annual_return_3yr: Option<Decimal>,
    pub avg_annual_return_5yr: Option<Decimal>,
    pub total_assets: Option<Decimal>,
    pub deposits: Option<Decimal>,
    pub withdrawals: Option<Decimal>,
    pub net_deposits: Option<Decimal>,
    pub internal_transfers: Option<Decimal>,
    pub net_monthly_deposits: Option<Decimal>,
    pub standard_deviation: Option<Decimal>,
    pub alpha: Option<Decimal>,
    pub sharpe_ratio: Option<Decimal>,
    pub liquid_assets_percent: Option<Decimal>,
    pub stock_market_exposure: Option<Decimal>,
    pub foreign_exposure: Option<Decimal>,
    pub foreign_currency_exposure: Option<Decimal>,
    pub avg_annual_management_fee: Option<Decimal>,
    pub avg_deposit_fee: Option<Decimal>,
}

impl SnapshotMetrics {
    /// The return rate cached on the fund: 5-year average, else 3-year.
    pub fn headline_return(&self) -> Option<Decimal> {
        self.avg_annual_return_5yr.or(self.avg_annual_return_3yr)
    }
}

/// A typed Gemelnet row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub fund_id: Option<String>,
    pub report_period: Option<ReportPeriod>,
    pub fund_name: String,
    pub company_name: Option<String>,
    pub company_legal_id: Option<String>,
    pub fund_classification: String,
    pub specialization: String,
    pub sub_specialization: String,
    pub category: FundCategory,
    pub inception_date: Option<NaiveDate>,
    pub management_fee: Option<Decimal>,
    pub metrics: SnapshotMetrics,
}

pub fn normalize(record: &RawRecord) -> NormalizedRecord {
    use columns::*;

    let dec = |key: &str| parse_decimal(record.get(key));

    let fund_classification = text(record.get(FUND_CLASSIFICATION)).unwrap_or_default();
    let specialization = text(record.get(SPECIALIZATION)).unwrap_or_default();
    let category = map_category(&fund_classification, &specialization);

    let metrics = SnapshotMetrics {
        monthly_yield: dec(MONTHLY_YIELD),
        ytd_yield: dec(YEAR_TO_DATE_YIELD),
        return_3yr: dec(YIELD_TRAILING_3_YRS),
        return_5yr: dec(YIELD_TRAILING_5_YRS),
        avg_annual_return_3yr: dec(AVG_ANNUAL_YIELD_TRAILING_3YRS),
        avg_annual_return_5yr: dec(AVG_ANNUAL_YIELD_TRAILING_5YRS),
        total_assets: dec(TOTAL_ASSETS),
        deposits: dec(DEPOSITS),
        withdrawals: dec(WITHDRAWLS),
        net_deposits: dec(NET_MONTHLY_DEPOSITS),
        internal_transfers: dec(INTERNAL_TRANSFERS),
        net_monthly_deposits: dec(NET_MONTHLY_DEPOSITS),
        standard_deviation: dec(STANDARD_DEVIATION),
        alpha: dec(ALPHA),
        sharpe_ratio: dec(SHARPE_RATIO),
        liquid_assets_percent: dec(LIQUID_ASSETS_PERCENT),
        stock_market_exposure: dec(STOCK_MARKET_EXPOSURE),
        foreign_exposure: dec(FOREIGN_EXPOSURE),
        foreign_currency_exposure: dec(FOREIGN_CURRENCY_EXPOSURE),
        avg_annual_management_fee: dec(AVG_ANNUAL_MANAGEMENT_FEE),
        avg_deposit_fee: dec(AVG_DEPOSIT_FEE),
    };

    NormalizedRecord {
        fund_id: text(record.get(FUND_ID)),
        report_period: parse_report_period(record.get(REPORT_PERIOD)),
        fund_name: text(record.get(FUND_NAME)).unwrap_or_default(),
        company_name: text(record.get(MANAGING_CORPORATION)),
        company_legal_id: text(record.get(MANAGING_CORPORATION_LEGAL_ID)),
        fund_classification,
        specialization,
        sub_specialization: text(record.get(SUB_SPECIALIZATION)).unwrap_or_default(),
        category,
        inception_date: parse_date(record.get(INCEPTION_DATE)),
        management_fee: metrics.avg_annual_management_fee,
        metrics,
    }
}

/// Trimmed text of a string or number cell; empty → None.
fn text(value: Option<&Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if s.is_empty() { None } else { Some(s) }
}

/// Decimal from a string or number cell. Null, empty or unparseable → None.
pub fn parse_decimal(value: Option<&Value>) -> Option<Decimal> {
    let raw = match value? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    if raw.is_empty() {
        return None;
    }

    match Decimal::from_str(&raw).or_else(|_| Decimal::from_scientific(&raw)) {
        Ok(d) => Some(d),
        Err(e) => {
            tracing::debug!(value = %raw, error = %e, "Unparseable decimal, treating as absent");
            None
        }
    }
}

/// Date part of `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`.
pub fn parse_date(value: Option<&Value>) -> Option<NaiveDate> {
    let raw = value?.as_str()?.trim();
    let date_part = raw.split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn parse_report_period(value: Option<&Value>) -> Option<ReportPeriod> {
    let raw = match value? {
        Value::Number(n) => n.as_i64()?,
        Value::String(s) => s.trim().parse::<i64>().ok()?,
        _ => return None,
    };
    ReportPeriod::new(i32::try_from(raw).ok()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawRecord {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_parse_decimal_variants() {
        assert_eq!(parse_decimal(Some(&json!("12.34"))), Some(dec!(12.34)));
        assert_eq!(parse_decimal(Some(&json!(" -0.5 "))), Some(dec!(-0.5)));
        assert_eq!(parse_decimal(Some(&json!(7))), Some(dec!(7)));
        assert_eq!(parse_decimal(Some(&json!(1.25))), Some(dec!(1.25)));
        assert_eq!(parse_decimal(Some(&json!("1e-2"))), Some(dec!(0.01)));
    }

    #[test]
    fn test_parse_decimal_absent_values() {
        assert_eq!(parse_decimal(None), None);
        assert_eq!(parse_decimal(Some(&Value::Null)), None);
        assert_eq!(parse_decimal(Some(&json!(""))), None);
        assert_eq!(parse_decimal(Some(&json!("   "))), None);
        assert_eq!(parse_decimal(Some(&json!("n/a"))), None);
        assert_eq!(parse_decimal(Some(&json!(true))), None);
    }

    #[test]
    fn test_parse_date_takes_date_part() {
        let expected = NaiveDate::from_ymd_opt(2016, 11, 28);
        assert_eq!(parse_date(Some(&json!("2016-11-28 00:00:00"))), expected);
        assert_eq!(parse_date(Some(&json!("2016-11-28T00:00:00"))), expected);
        assert_eq!(parse_date(Some(&json!("2016-11-28"))), expected);
    }

    #[test]
    fn test_parse_date_malformed() {
        assert_eq!(parse_date(Some(&json!("28/11/2016"))), None);
        assert_eq!(parse_date(Some(&json!(""))), None);
        assert_eq!(parse_date(Some(&json!(20161128))), None);
        assert_eq!(parse_date(None), None);
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(map_category("מסלול מניות", ""), FundCategory::Stocks);
        assert_eq!(map_category("", "מניות חו\"ל"), FundCategory::Stocks);
        assert_eq!(map_category("אג\"ח ממשלתי", ""), FundCategory::Bonds);
        assert_eq!(map_category("כללי", "אגח"), FundCategory::Uncategorized);
        assert_eq!(map_category("מסלול מעורב", ""), FundCategory::Mixed);
        assert_eq!(map_category("", "שקלי כסף"), FundCategory::MoneyMarket);
        assert_eq!(map_category("השקעות בחו\"ל", ""), FundCategory::Foreign);
        assert_eq!(map_category("עוקב מדד", ""), FundCategory::Index);
        assert_eq!(map_category("נדל\"ן", ""), FundCategory::RealEstate);
        assert_eq!(map_category("תגמולים ואישית לפיצויים", "כללי"), FundCategory::Uncategorized);
        assert_eq!(map_category("", ""), FundCategory::Uncategorized);
    }

    #[test]
    fn test_category_match_is_case_insensitive() {
        assert_eq!(map_category("Stocks מניות", ""), FundCategory::Stocks);
        assert_eq!(FundCategory::from_slug("MONEY_MARKET"), Some(FundCategory::MoneyMarket));
        assert_eq!(FundCategory::from_slug("crypto"), None);
    }

    #[test]
    fn test_normalize_full_record() {
        let record = raw(json!({
            "FUND_ID": 578,
            "FUND_NAME": " הראל גמל מניות ",
            "REPORT_PERIOD": 202508,
            "MANAGING_CORPORATION": "הראל",
            "MANAGING_CORPORATION_LEGAL_ID": 513910703,
            "FUND_CLASSIFICATION": "תגמולים ואישית לפיצויים",
            "SPECIALIZATION": "מניות",
            "SUB_SPECIALIZATION": "",
            "INCEPTION_DATE": "1999-01-01 00:00:00",
            "AVG_ANNUAL_MANAGEMENT_FEE": "0.52",
            "AVG_ANNUAL_YIELD_TRAILING_5YRS": "11.5",
            "MONTHLY_YIELD": 1.25,
            "TOTAL_ASSETS": "1500.75",
            "WITHDRAWLS": "3.5",
            "SHARPE_RATIO": "bad"
        }));

        let normalized = normalize(&record);

        assert_eq!(normalized.fund_id.as_deref(), Some("578"));
        assert_eq!(normalized.report_period.map(|p| p.value()), Some(202508));
        assert_eq!(normalized.fund_name, "הראל גמל מניות");
        assert_eq!(normalized.company_legal_id.as_deref(), Some("513910703"));
        assert_eq!(normalized.category, FundCategory::Stocks);
        assert_eq!(normalized.inception_date, NaiveDate::from_ymd_opt(1999, 1, 1));
        assert_eq!(normalized.management_fee, Some(dec!(0.52)));
        assert_eq!(normalized.metrics.monthly_yield, Some(dec!(1.25)));
        assert_eq!(normalized.metrics.withdrawals, Some(dec!(3.5)));
        assert_eq!(normalized.metrics.sharpe_ratio, None);
        assert_eq!(normalized.metrics.alpha, None);
        assert_eq!(normalized.metrics.headline_return(), Some(dec!(11.5)));
    }

    #[test]
    fn test_normalize_missing_identity() {
        let record = raw(json!({
            "FUND_ID": "",
            "REPORT_PERIOD": "202513",
            "MANAGING_CORPORATION": null
        }));

        let normalized = normalize(&record);

        assert_eq!(normalized.fund_id, None);
        assert_eq!(normalized.report_period, None);
        assert_eq!(normalized.company_name, None);
        assert_eq!(normalized.category, FundCategory::Uncategorized);
    }

    #[test]
    fn test_report_period_from_string() {
        let record = raw(json!({"REPORT_PERIOD": "202401"}));
        assert_eq!(normalize(&record).report_period.map(|p| p.value()), Some(202401));
    }

    #[test]
    fn test_headline_return_falls_back_to_three_years() {
        let metrics = SnapshotMetrics {
            avg_annual_return_3yr: Some(dec!(4.2)),
            ..Default::default()
        };
        assert_eq!(metrics.headline_return(), Some(dec!(4.2)));
    }
}
