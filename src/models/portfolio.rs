use serde::Deserialize;

pub const DEFAULT_PROJECTION_MONTHS: u32 = 12;
pub const MAX_PROJECTION_MONTHS: u32 = 600;

/// Query parameters for GET /api/portfolios/{id}/metrics
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PortfolioMetricsQuery {
    /// Projection horizon (default: 12, max: 600)
    pub months: Option<u32>,
}

impl PortfolioMetricsQuery {
    pub fn months(&self) -> Result<u32, String> {
        match self.months {
            None => Ok(DEFAULT_PROJECTION_MONTHS),
            Some(0) => Err("months must be greater than 0".to_string()),
            Some(m) if m > MAX_PROJECTION_MONTHS => Err(format!(
                "months must not exceed {}",
                MAX_PROJECTION_MONTHS
            )),
            Some(m) => Ok(m),
        }
    }
}
