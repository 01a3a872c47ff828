//! Plain-text tables for terminal output.

use std::fmt::Write as _;

use stockroom_model::{
	ChainReport, DashboardStats, Delivery, ForecastPoint, InventoryItem, LedgerEntry, ROUTE_STAGES, UserProfile,
};

pub fn inventory(items: &[InventoryItem]) -> String {
	let mut out = format!(
		"{:<12} {:<24} {:>8} {:>8} {:>10}  {}\n",
		"SKU", "NAME", "QTY", "REORDER", "PRICE", "CATEGORY"
	);
	for item in items {
		let flag = if item.is_low_stock() { " (low)" } else { "" };
		let _ = writeln!(
			out,
			"{:<12} {:<24} {:>8} {:>8} {:>10.2}  {}{flag}",
			item.sku,
			truncate(&item.name, 24),
			item.quantity,
			item.reorder_threshold,
			item.price,
			item.category,
		);
	}
	out
}

pub fn deliveries(deliveries: &[Delivery]) -> String {
	let mut out = format!(
		"{:<10} {:<12} {:<12} {:<11} {:<18} {}\n",
		"ORDER", "SKU", "ROUTE", "STATUS", "LOCATION", "ETA"
	);
	for delivery in deliveries {
		let _ = writeln!(out, "{}", delivery_row(delivery));
	}
	out
}

pub fn delivery_row(delivery: &Delivery) -> String {
	format!(
		"{:<10} {:<12} {:<12} {:<11} {:<18} {}",
		delivery.order_id,
		delivery.sku,
		truncate(&delivery.route, 12),
		delivery.status.as_str(),
		delivery.current_location,
		delivery.estimated_delivery.format("%Y-%m-%d %H:%M"),
	)
}

/// Route progress as `stage/total`, or `?` for a location off the named route.
pub fn progress(delivery: &Delivery) -> String {
	match delivery.stage_index() {
		Some(stage) => format!("{}/{}", stage + 1, ROUTE_STAGES.len()),
		None => "?".to_string(),
	}
}

pub fn ledger(entries: &[LedgerEntry]) -> String {
	let mut out = format!("{:<20} {:<9} {:<12} {:>6}  {}\n", "TIME", "TYPE", "SKU", "QTY", "HASH");
	for entry in entries {
		let _ = writeln!(
			out,
			"{:<20} {:<9} {:<12} {:>6}  {}",
			entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
			entry.transaction_type.to_string(),
			entry.sku,
			entry.quantity,
			short_hash(&entry.hash),
		);
	}
	out
}

pub fn chain_report(report: &ChainReport) -> String {
	let mut out = String::new();
	if report.is_intact() {
		let _ = writeln!(out, "{} entries checked, all links intact", report.checked);
	} else {
		let _ = writeln!(out, "{} entries checked, {} broken link(s):", report.checked, report.breaks.len());
		for gap in &report.breaks {
			let _ = writeln!(
				out,
				"  {}: expects {} but follows {}",
				gap.id,
				short_hash(&gap.expected),
				short_hash(&gap.found)
			);
		}
	}
	if report.truncated {
		out.push_str("oldest listed entry does not start at genesis; listing is partial\n");
	}
	out
}

pub fn forecast(points: &[ForecastPoint]) -> String {
	let mut out = format!("{:<10} {:>10} {:>10} {:>10}\n", "DATE", "DEMAND", "LOW", "HIGH");
	for point in points {
		let _ = writeln!(
			out,
			"{:<10} {:>10.1} {:>10.1} {:>10.1}",
			point.date, point.predicted_demand, point.lower_bound, point.upper_bound
		);
	}
	out
}

pub fn stats(stats: &DashboardStats) -> String {
	format!(
		"items:             {}\nlow stock:         {}\npending deliveries: {}\ntransactions:      {}\n",
		stats.total_items, stats.low_stock_items, stats.pending_deliveries, stats.total_transactions
	)
}

pub fn profile(user: &UserProfile) -> String {
	format!("{} <{}> ({})", user.full_name, user.email, user.role)
}

fn short_hash(hash: &str) -> &str {
	hash.get(..12).unwrap_or(hash)
}

fn truncate(text: &str, width: usize) -> String {
	if text.chars().count() <= width {
		return text.to_string();
	}
	let mut cut: String = text.chars().take(width.saturating_sub(1)).collect();
	cut.push('~');
	cut
}

#[cfg(test)]
mod tests {
	use chrono::{TimeZone, Utc};
	use pretty_assertions::assert_eq;
	use stockroom_model::{ChainBreak, DeliveryStatus, EntityId};

	use super::*;

	fn delivery(location: &str) -> Delivery {
		let at = Utc.with_ymd_and_hms(2025, 6, 1, 8, 0, 0).unwrap();
		Delivery {
			id: EntityId::new("D1"),
			order_id: "ORD-1".into(),
			sku: "WID-1".into(),
			status: DeliveryStatus::InTransit,
			route: "North".into(),
			estimated_delivery: at,
			current_location: location.into(),
			updated_at: at,
		}
	}

	#[test]
	fn test_delivery_row_shows_status_and_location() {
		let row = delivery_row(&delivery("Local Hub"));
		assert!(row.starts_with("ORD-1"));
		assert!(row.contains("in_transit"));
		assert!(row.contains("Local Hub"));
		assert!(row.ends_with("2025-06-01 08:00"));
	}

	#[test]
	fn test_progress_counts_named_stages() {
		assert_eq!(progress(&delivery("Warehouse")), "1/6");
		assert_eq!(progress(&delivery("Local Hub")), "4/6");
		assert_eq!(progress(&delivery("Depot")), "?");
	}

	#[test]
	fn test_chain_report_lists_breaks() {
		let report = ChainReport {
			checked: 3,
			breaks: vec![ChainBreak {
				id: EntityId::new("L3"),
				expected: "a".repeat(64),
				found: "b".repeat(64),
			}],
			truncated: true,
		};
		let text = chain_report(&report);
		assert!(text.starts_with("3 entries checked, 1 broken link(s):"));
		assert!(text.contains("L3: expects aaaaaaaaaaaa but follows bbbbbbbbbbbb"));
		assert!(text.contains("listing is partial"));
	}

	#[test]
	fn test_truncate_marks_cut_text() {
		assert_eq!(truncate("Widget", 24), "Widget");
		assert_eq!(truncate("Extra Long Product Name", 10), "Extra Lon~");
	}
}
