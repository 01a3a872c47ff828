use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use stockroom_model::Role;

#[derive(Parser, Debug)]
#[command(name = "stockroom")]
#[command(about = "Terminal view over the stockroom dashboard")]
#[command(version)]
/// Command-line arguments.
pub struct Cli {
	/// API origin, e.g. http://localhost:8000 (overrides config and environment)
	#[arg(long, global = true, value_name = "URL")]
	pub backend: Option<String>,

	/// Verbose logging
	#[arg(short, long, global = true)]
	pub verbose: bool,

	/// Subcommand to execute.
	#[command(subcommand)]
	pub command: Command,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
	/// Log in and save the access token
	Login {
		/// Account email
		#[arg(long)]
		email: String,
		/// Account password
		#[arg(long)]
		password: String,
	},
	/// Create an account and save its access token
	Register {
		/// Account email
		#[arg(long)]
		email: String,
		/// Account password
		#[arg(long)]
		password: String,
		/// Display name
		#[arg(long = "name")]
		full_name: String,
		/// Access level
		#[arg(long, value_enum, default_value_t = RoleArg::Customer)]
		role: RoleArg,
	},
	/// Forget the saved access token
	Logout,
	/// Show the logged-in user
	Whoami,
	/// Stock on hand
	Inventory {
		/// Inventory subcommand action.
		#[command(subcommand)]
		action: InventoryAction,
	},
	/// Delivery schedule and live tracking
	Deliveries {
		/// Delivery subcommand action.
		#[command(subcommand)]
		action: DeliveryAction,
	},
	/// Transaction ledger
	Ledger {
		/// Ledger subcommand action.
		#[command(subcommand)]
		action: LedgerAction,
	},
	/// Demand forecast for one SKU
	Forecast {
		/// Stock-keeping unit
		sku: String,
	},
	/// Dashboard counters
	Stats,
}

/// Inventory subcommands.
#[derive(Subcommand, Debug)]
pub enum InventoryAction {
	/// List items in dashboard order
	List {
		/// Only items at or below their reorder threshold
		#[arg(long)]
		low_stock: bool,
	},
	/// Register a new item
	Add {
		/// Stock-keeping unit
		sku: String,
		/// Display name
		name: String,
		/// Longer description
		#[arg(long, default_value = "")]
		description: String,
		/// Initial units on hand
		#[arg(long, default_value_t = 0)]
		quantity: i64,
		/// Reorder threshold
		#[arg(long, default_value_t = 10)]
		reorder_threshold: i64,
		/// Unit price
		#[arg(long)]
		price: f64,
		/// Category
		#[arg(long, default_value = "general")]
		category: String,
		/// Product image URL
		#[arg(long)]
		image_url: Option<String>,
	},
	/// Remove units sold to a customer
	Purchase {
		/// Stock-keeping unit
		sku: String,
		/// Units to remove
		#[arg(value_parser = clap::value_parser!(i64).range(1..))]
		quantity: i64,
	},
	/// Add units received from a supplier
	Restock {
		/// Stock-keeping unit
		sku: String,
		/// Units to add
		#[arg(value_parser = clap::value_parser!(i64).range(1..))]
		quantity: i64,
	},
}

/// Delivery subcommands.
#[derive(Subcommand, Debug)]
pub enum DeliveryAction {
	/// List deliveries
	List {
		/// Only pending and in-transit deliveries
		#[arg(long)]
		active: bool,
	},
	/// Follow live delivery updates until interrupted
	Watch {
		/// Only pending and in-transit deliveries
		#[arg(long)]
		active: bool,
	},
	/// Schedule a delivery
	Schedule {
		/// Order reference
		order_id: String,
		/// Stock-keeping unit
		sku: String,
		/// Route description
		route: String,
		/// Promised arrival (RFC 3339 timestamp or YYYY-MM-DD)
		#[arg(long, value_parser = parse_eta)]
		eta: DateTime<Utc>,
	},
}

/// Ledger subcommands.
#[derive(Subcommand, Debug)]
pub enum LedgerAction {
	/// List the newest entries
	List {
		/// Maximum number of entries to show
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	/// Check that every listed entry links to the one before it
	Verify,
}

/// Role accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleArg {
	/// Store manager
	Manager,
	/// Supplier
	Supplier,
	/// Customer
	Customer,
}

impl From<RoleArg> for Role {
	fn from(role: RoleArg) -> Self {
		match role {
			RoleArg::Manager => Role::Manager,
			RoleArg::Supplier => Role::Supplier,
			RoleArg::Customer => Role::Customer,
		}
	}
}

/// Parses an arrival estimate. A bare date means midnight UTC.
pub fn parse_eta(raw: &str) -> Result<DateTime<Utc>, String> {
	if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
		return Ok(at.with_timezone(&Utc));
	}
	NaiveDate::parse_from_str(raw, "%Y-%m-%d")
		.ok()
		.and_then(|date| date.and_hms_opt(0, 0, 0))
		.map(|at| at.and_utc())
		.ok_or_else(|| format!("expected an RFC 3339 timestamp or YYYY-MM-DD, got {raw:?}"))
}
