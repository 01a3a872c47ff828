//! Subcommand handlers.
//!
//! Each listing mounts a [`Session`] for its entity kind, loads the snapshot,
//! and renders the projected view. Mutations go through [`ApiClient`] and then
//! bring the mounted view up to date with an equivalent local patch.

use anyhow::{Context, Result, bail};
use stockroom_model::{
	Credentials, Delivery, InventoryItem, InventoryPatch, LedgerEntry, NewDelivery, NewInventoryItem, Record,
	Registration, StockAction, StockAdjustment, UserProfile, verify_links,
};
use stockroom_sync::config::config_dir;
use stockroom_sync::{ApiClient, ClientConfig, ConnectionState, Outcome, Session, SessionEvent, WsTransport};

use crate::cli::{Command, DeliveryAction, InventoryAction, LedgerAction};
use crate::{credentials, render};

struct App {
	config: ClientConfig,
	api: ApiClient,
}

impl App {
	fn new(config: ClientConfig) -> Self {
		let api = ApiClient::new(&config.api);
		Self { config, api }
	}

	/// Mounts a snapshot-only view of `R` and loads it.
	async fn snapshot<R: Record>(&self) -> Result<Session<R>> {
		let mut session = Session::<R>::builder(self.api.snapshot_source())
			.config(&self.config)
			.mount();
		session
			.load_snapshot()
			.await
			.with_context(|| format!("loading {}", R::KIND))?;
		Ok(session)
	}

	/// Fails early for roles the API would refuse anyway.
	async fn require_manager(&self) -> Result<UserProfile> {
		let user = self.api.me().await.context("checking account role")?;
		if !user.role.can_manage() {
			bail!("{} accounts cannot change stock or deliveries", user.role);
		}
		Ok(user)
	}
}

pub async fn run(command: Command, config: ClientConfig) -> Result<()> {
	let app = App::new(config);
	match command {
		Command::Login { email, password } => {
			let token = app.api.login(&Credentials { email, password }).await.context("logging in")?;
			store_token(&token.access_token)?;
			println!("Logged in as {}", render::profile(&token.user));
		}
		Command::Register {
			email,
			password,
			full_name,
			role,
		} => {
			let registration = Registration {
				email,
				password,
				full_name,
				role: role.into(),
			};
			let token = app.api.register(&registration).await.context("registering")?;
			store_token(&token.access_token)?;
			println!("Registered {}", render::profile(&token.user));
		}
		Command::Logout => {
			let dir = config_dir().context("no config directory")?;
			if credentials::clear(&dir).context("removing saved token")? {
				println!("Logged out");
			} else {
				println!("No saved token");
			}
		}
		Command::Whoami => {
			let user = app.api.me().await.context("fetching profile")?;
			println!("{}", render::profile(&user));
		}
		Command::Inventory { action } => inventory(&app, action).await?,
		Command::Deliveries { action } => deliveries(&app, action).await?,
		Command::Ledger { action } => ledger(&app, action).await?,
		Command::Forecast { sku } => {
			let points = app.api.forecast(&sku).await.with_context(|| format!("forecasting {sku}"))?;
			print!("{}", render::forecast(&points));
		}
		Command::Stats => {
			let stats = app.api.stats().await.context("fetching stats")?;
			print!("{}", render::stats(&stats));
		}
	}
	Ok(())
}

async fn inventory(app: &App, action: InventoryAction) -> Result<()> {
	match action {
		InventoryAction::List { low_stock } => {
			let session = app.snapshot::<InventoryItem>().await?;
			let items = if low_stock {
				session.view_where(InventoryItem::is_low_stock)
			} else {
				session.view()
			};
			print!("{}", render::inventory(&items));
		}
		InventoryAction::Add {
			sku,
			name,
			description,
			quantity,
			reorder_threshold,
			price,
			category,
			image_url,
		} => {
			app.require_manager().await?;
			let item = NewInventoryItem {
				sku,
				name,
				description,
				quantity,
				reorder_threshold,
				price,
				category,
				image_url,
			};
			let created = app.api.create_inventory_item(&item).await.context("adding item")?;
			print!("{}", render::inventory(std::slice::from_ref(&created)));
		}
		InventoryAction::Purchase { sku, quantity } => adjust(app, &sku, quantity, StockAction::Purchase).await?,
		InventoryAction::Restock { sku, quantity } => adjust(app, &sku, quantity, StockAction::Restock).await?,
	}
	Ok(())
}

async fn adjust(app: &App, sku: &str, quantity: i64, action: StockAction) -> Result<()> {
	app.require_manager().await?;
	let mut session = app.snapshot::<InventoryItem>().await?;
	let id = session
		.store()
		.find(|item| item.sku == sku)
		.map(|item| item.id.clone())
		.with_context(|| format!("no inventory item with SKU {sku}"))?;

	let adjusted = app
		.api
		.adjust_stock(sku, &StockAdjustment { quantity, action })
		.await
		.with_context(|| format!("{action} of {quantity} x {sku}"))?;

	match session.apply_local(&InventoryPatch::new(id.clone()).quantity(adjusted.new_quantity))? {
		Outcome::Applied { .. } | Outcome::Unchanged => {}
		other => tracing::warn!(entity_id = %id, ?other, "Local patch not applied"),
	}
	println!("{} ({sku} now {})", adjusted.message, adjusted.new_quantity);
	if let Some(item) = session.get(&id) {
		print!("{}", render::inventory(std::slice::from_ref(item)));
	}
	Ok(())
}

async fn deliveries(app: &App, action: DeliveryAction) -> Result<()> {
	match action {
		DeliveryAction::List { active } => {
			let session = app.snapshot::<Delivery>().await?;
			let rows = if active {
				session.view_where(Delivery::is_active)
			} else {
				session.view()
			};
			print!("{}", render::deliveries(&rows));
		}
		DeliveryAction::Watch { active } => watch(app, active).await?,
		DeliveryAction::Schedule {
			order_id,
			sku,
			route,
			eta,
		} => {
			app.require_manager().await?;
			let request = NewDelivery {
				order_id,
				sku,
				route,
				estimated_delivery: eta,
			};
			let created = app.api.create_delivery(&request).await.context("scheduling delivery")?;
			print!("{}", render::deliveries(std::slice::from_ref(&created)));
		}
	}
	Ok(())
}

async fn watch(app: &App, active: bool) -> Result<()> {
	let stream = WsTransport::for_kind(&app.config.api, Delivery::KIND).context("building push channel address")?;
	let mut session = Session::<Delivery>::builder(app.api.snapshot_source())
		.config(&app.config)
		.optional_stream(stream)
		.mount();
	session.load_snapshot().await.context("loading deliveries")?;

	let render_view = |session: &Session<Delivery>| {
		let rows = if active {
			session.view_where(Delivery::is_active)
		} else {
			session.view()
		};
		render::deliveries(&rows)
	};
	print!("{}", render_view(&session));

	loop {
		let event = tokio::select! {
			_ = tokio::signal::ctrl_c() => break,
			event = session.next_event() => event,
		};
		match event {
			Some(SessionEvent::Reconciled {
				id,
				outcome: Outcome::Applied { changed },
			}) => {
				if let Some(delivery) = session.get(&id) {
					println!(
						"{} [{}] {} (changed: {})",
						render::delivery_row(delivery),
						render::progress(delivery),
						id,
						changed.join(", ")
					);
				}
			}
			Some(SessionEvent::Reconciled { .. }) => {}
			Some(SessionEvent::Connection(state)) => {
				eprintln!("-- push channel {state}");
				if state == ConnectionState::Connected {
					resync(&mut session).await;
				}
			}
			Some(SessionEvent::ChannelFailed(err)) => {
				eprintln!("-- live updates stopped: {err}; last known state:");
				print!("{}", render_view(&session));
				break;
			}
			None => break,
		}
	}

	session.unmount();
	Ok(())
}

/// Re-reads the snapshot after a reconnect. A failed read leaves the last
/// known records in place and the stream running.
async fn resync<R: Record>(session: &mut Session<R>) -> bool {
	match session.refresh().await {
		Ok(_) => true,
		Err(err) => {
			tracing::warn!(entity_kind = %R::KIND, error = %err, "Refresh after reconnect failed");
			eprintln!("-- refresh failed ({err}); showing last known state");
			false
		}
	}
}

async fn ledger(app: &App, action: LedgerAction) -> Result<()> {
	let session = app.snapshot::<LedgerEntry>().await?;
	let entries = session.view();
	match action {
		LedgerAction::List { limit } => {
			let shown = &entries[..entries.len().min(limit)];
			print!("{}", render::ledger(shown));
		}
		LedgerAction::Verify => {
			let report = verify_links(&entries);
			print!("{}", render::chain_report(&report));
			if !report.is_intact() {
				bail!("ledger has {} broken link(s)", report.breaks.len());
			}
		}
	}
	Ok(())
}

fn store_token(token: &str) -> Result<()> {
	let dir = config_dir().context("no config directory to save the token in")?;
	let path = credentials::save(&dir, token).with_context(|| format!("saving token in {}", dir.display()))?;
	tracing::debug!(path = %path.display(), "Saved access token");
	Ok(())
}
