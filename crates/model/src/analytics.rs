//! Read-only analytics payloads: demand forecasts and dashboard counters.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One day of forecast demand for a SKU.
///
/// Produced by the forecasting service; the client only displays it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
	/// SKU the forecast is for.
	pub sku: String,
	/// Forecast day.
	pub date: NaiveDate,
	/// Expected units sold.
	pub predicted_demand: f64,
	/// Lower end of the confidence interval.
	pub lower_bound: f64,
	/// Upper end of the confidence interval.
	pub upper_bound: f64,
}

/// Summary counters shown on the dashboard landing page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
	/// Number of SKUs.
	pub total_items: u64,
	/// SKUs at or below their reorder threshold.
	pub low_stock_items: u64,
	/// Deliveries that are pending or in transit.
	pub pending_deliveries: u64,
	/// Ledger entries.
	pub total_transactions: u64,
}
