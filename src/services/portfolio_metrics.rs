//! Portfolio metrics
//!
//! Linear profit/loss estimates, weighted returns and contribution
//! projections over the stored fund data. `today` is always passed in so the
//! calculations are deterministic.

use chrono::NaiveDate;
use rust_decimal::{Decimal, MathematicalOps};
use sea_orm::{ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;

use crate::entities::{periodic_contributions, portfolio_holdings, prelude::*};

const DAYS_PER_YEAR: i64 = 365;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Portfolio {0} not found")]
    PortfolioNotFound(i32),

    #[error("Unknown contribution interval: {0}")]
    UnknownInterval(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ContributionInterval {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl ContributionInterval {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_uppercase().as_str() {
            "DAILY" => Some(Self::Daily),
            "WEEKLY" => Some(Self::Weekly),
            "MONTHLY" => Some(Self::Monthly),
            "QUARTERLY" => Some(Self::Quarterly),
            "YEARLY" => Some(Self::Yearly),
            _ => None,
        }
    }

    /// Approximate length in days (30-day months, 90-day quarters).
    pub fn days(self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
            Self::Quarterly => 90,
            Self::Yearly => 365,
        }
    }

    /// Number of contributions made over a horizon of `months`.
    pub fn contributions_over(self, months: u32) -> i64 {
        let months = months as i64;
        match self {
            Self::Daily => months * 30,
            Self::Weekly => months * 30 / 7,
            Self::Monthly => months,
            Self::Quarterly => months / 3,
            Self::Yearly => months / 12,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContributionPlan {
    pub amount: Decimal,
    pub interval: ContributionInterval,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub is_active: bool,
}

impl TryFrom<&periodic_contributions::Model> for ContributionPlan {
    type Error = MetricsError;

    fn try_from(model: &periodic_contributions::Model) -> Result<Self, Self::Error> {
        let interval = ContributionInterval::parse(&model.interval)
            .ok_or_else(|| MetricsError::UnknownInterval(model.interval.clone()))?;

        Ok(Self {
            amount: model.amount,
            interval,
            start_date: model.start_date,
            end_date: model.end_date,
            is_active: model.is_active,
        })
    }
}

/// Amount invested in a fund and the fund's cached annual return (percent).
#[derive(Debug, Clone, Copy)]
pub struct WeightedHolding {
    pub amount: Decimal,
    pub return_rate: Option<Decimal>,
}

/// Σ(amount × rate) / Σ(amount). Holdings without a return rate are left
/// out of both sums. Zero when nothing remains.
pub fn weighted_return(holdings: &[WeightedHolding]) -> Decimal {
    let (weighted, total) = holdings
        .iter()
        .filter_map(|h| h.return_rate.map(|rate| (h.amount, rate)))
        .fold((Decimal::ZERO, Decimal::ZERO), |(weighted, total), (amount, rate)| {
            (weighted + amount * rate, total + amount)
        });

    if total.is_zero() {
        Decimal::ZERO
    } else {
        weighted / total
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum ProfitLoss {
    /// No purchase date or no return rate recorded
    NotApplicable,
    #[serde(rename_all = "camelCase")]
    Estimate {
        days_held: i64,
        amount: Decimal,
        percentage: Decimal,
    },
}

/// Linear day-count estimate: amount × rate/100 × days/365, and rate × days/365.
pub fn holding_profit_loss(
    amount: Decimal,
    return_rate: Option<Decimal>,
    purchase_date: Option<NaiveDate>,
    today: NaiveDate,
) -> ProfitLoss {
    let (Some(rate), Some(purchased)) = (return_rate, purchase_date) else {
        return ProfitLoss::NotApplicable;
    };

    let days_held = (today - purchased).num_days();
    let days = Decimal::from(days_held);
    let year = Decimal::from(DAYS_PER_YEAR);

    ProfitLoss::Estimate {
        days_held,
        amount: amount * rate * days / (Decimal::ONE_HUNDRED * year),
        percentage: rate * days / year,
    }
}

/// What a plan would have contributed from its start up to `today` (or its
/// end date, if earlier), counted in whole intervals.
pub fn total_contributions_to_date(plan: &ContributionPlan, today: NaiveDate) -> Decimal {
    if !plan.is_active || plan.start_date > today {
        return Decimal::ZERO;
    }

    let end = match plan.end_date {
        Some(end) if end < today => end,
        _ => today,
    };

    let days = (end - plan.start_date).num_days().max(0);
    let count = days / plan.interval.days();

    plan.amount * Decimal::from(count)
}

/// (1 + rate/100)^years, or zero when the base is not positive.
fn growth_factor(return_rate: Decimal, years: Decimal) -> Decimal {
    let base = Decimal::ONE + return_rate / Decimal::ONE_HUNDRED;
    if base <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    if years.is_zero() {
        return Decimal::ONE;
    }

    base.checked_powd(years).unwrap_or_else(|| {
        tracing::warn!(%base, %years, "Growth factor overflowed, assuming no growth");
        Decimal::ONE
    })
}

/// Holding value after `months` plus the plan's new contributions, which are
/// compounded over half the horizon as an average time in market. Zero for
/// inactive plans.
pub fn projected_value(
    plan: &ContributionPlan,
    holding_amount: Decimal,
    return_rate: Decimal,
    months: u32,
) -> Decimal {
    if !plan.is_active {
        return Decimal::ZERO;
    }

    let years = Decimal::from(months) / Decimal::from(12);
    let current = holding_amount * growth_factor(return_rate, years);

    let contributions = plan.amount * Decimal::from(plan.interval.contributions_over(months));
    let added = contributions * growth_factor(return_rate, years / Decimal::TWO);

    current + added
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContributionMetrics {
    pub contribution_id: i32,
    pub amount: Decimal,
    pub interval: ContributionInterval,
    pub is_active: bool,
    pub contributed_to_date: Decimal,
    pub projected_value: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldingMetrics {
    pub holding_id: i32,
    pub fund_id: i32,
    pub fund_name: String,
    pub amount: Decimal,
    pub return_rate: Option<Decimal>,
    /// amount × rate / 100
    pub annual_return_amount: Option<Decimal>,
    pub profit_loss: ProfitLoss,
    pub contributions: Vec<ContributionMetrics>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortfolioMetrics {
    pub portfolio_id: i32,
    pub name: String,
    pub total_value: Decimal,
    pub weighted_return: Decimal,
    pub projection_months: u32,
    pub holdings: Vec<HoldingMetrics>,
}

/// Load a portfolio with its holdings, funds and contribution plans and
/// compute every metric above.
pub async fn portfolio_metrics<C: ConnectionTrait>(
    conn: &C,
    portfolio_id: i32,
    today: NaiveDate,
    months: u32,
) -> Result<PortfolioMetrics, MetricsError> {
    let portfolio = Portfolios::find_by_id(portfolio_id)
        .one(conn)
        .await?
        .ok_or(MetricsError::PortfolioNotFound(portfolio_id))?;

    let holdings = PortfolioHoldings::find()
        .filter(portfolio_holdings::Column::PortfolioId.eq(portfolio_id))
        .order_by_desc(portfolio_holdings::Column::AddedAt)
        .find_also_related(Funds)
        .all(conn)
        .await?;

    let holding_ids: Vec<i32> = holdings.iter().map(|(h, _)| h.id).collect();
    let mut plans_by_holding: HashMap<i32, Vec<periodic_contributions::Model>> = HashMap::new();
    if !holding_ids.is_empty() {
        let plans = PeriodicContributions::find()
            .filter(periodic_contributions::Column::HoldingId.is_in(holding_ids))
            .order_by_desc(periodic_contributions::Column::CreatedAt)
            .all(conn)
            .await?;
        for plan in plans {
            plans_by_holding.entry(plan.holding_id).or_default().push(plan);
        }
    }

    let mut total_value = Decimal::ZERO;
    let mut weights = Vec::with_capacity(holdings.len());
    let mut holding_metrics = Vec::with_capacity(holdings.len());

    for (holding, fund) in holdings {
        let return_rate = fund.as_ref().and_then(|f| f.return_rate);
        total_value += holding.amount;
        weights.push(WeightedHolding {
            amount: holding.amount,
            return_rate,
        });

        let mut contributions = Vec::new();
        for model in plans_by_holding.remove(&holding.id).unwrap_or_default() {
            let plan = ContributionPlan::try_from(&model)?;
            contributions.push(ContributionMetrics {
                contribution_id: model.id,
                amount: plan.amount,
                interval: plan.interval,
                is_active: plan.is_active,
                contributed_to_date: total_contributions_to_date(&plan, today),
                projected_value: projected_value(
                    &plan,
                    holding.amount,
                    return_rate.unwrap_or(Decimal::ZERO),
                    months,
                ),
            });
        }

        holding_metrics.push(HoldingMetrics {
            holding_id: holding.id,
            fund_id: holding.fund_id,
            fund_name: fund.map(|f| f.name).unwrap_or_default(),
            amount: holding.amount,
            return_rate,
            annual_return_amount: return_rate.map(|r| holding.amount * r / Decimal::ONE_HUNDRED),
            profit_loss: holding_profit_loss(holding.amount, return_rate, holding.purchase_date, today),
            contributions,
        });
    }

    Ok(PortfolioMetrics {
        portfolio_id: portfolio.id,
        name: portfolio.name,
        total_value,
        weighted_return: weighted_return(&weights),
        projection_months: months,
        holdings: holding_metrics,
    })
}
