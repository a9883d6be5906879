use anyhow::{bail, Result};
use clap::ValueEnum;
use futures::StreamExt;
use serde::Serialize;
use tracing::warn;
use mine_idler_core::{
    proto::{
        GetHiscoresRequest, GetInventoryRequest, Item, SortBy, SortDirection, StartMiningRequest,
        UpgradeBaseRequest, UpgradeType, Upgrades,
    },
    AppContext, GlobalAppState, LoadStatus, Location,
};

use crate::Command;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortKey {
    Date,
    Rarity,
    Value,
}

impl From<SortKey> for SortBy {
    fn from(key: SortKey) -> Self {
        match key {
            SortKey::Date => SortBy::DateAcquired,
            SortKey::Rarity => SortBy::RarityTier,
            SortKey::Value => SortBy::Value,
        }
    }
}

pub async fn run(app: &AppContext, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            app.auth.login(&username, &password).await?;
            println!("Logged in as {username}");
        }
        Command::Register { username, password } => {
            app.auth.register(&username, &password).await?;
            println!("Registered and logged in as {username}");
        }
        Command::Logout => {
            app.logout()?;
            println!("Logged out");
        }
        Command::Status { json } => status(app, json).await?,
        Command::Hiscores => hiscores(app).await?,
        Command::Inventory {
            page_size,
            page,
            sort,
            ascending,
        } => {
            let direction = if ascending {
                SortDirection::Ascending
            } else {
                SortDirection::Descending
            };
            inventory(app, page_size, page, sort.into(), direction).await?
        }
        Command::Base => {
            let response = app.channels.private.get_base().await?;
            print_upgrades(response.upgrades);
        }
        Command::Upgrade => {
            let response = app
                .channels
                .private
                .upgrade_base(UpgradeBaseRequest {
                    upgrade_type: UpgradeType::Storage as i32,
                })
                .await?;
            print_upgrades(response.upgrades);
        }
        Command::Mine { location, count } => mine(app, location, count).await?,
    }
    Ok(())
}

fn require_login(app: &AppContext) -> Result<()> {
    if !app.auth.is_logged_in() {
        bail!("not logged in; run `mine-idler login <username> <password>` first");
    }
    Ok(())
}

#[derive(Serialize)]
struct StatusView {
    username: String,
    item_types: usize,
    mine_locations: Vec<LocationView>,
    gamble_locations: Vec<LocationView>,
}

#[derive(Serialize)]
struct LocationView {
    name: String,
    available: bool,
}

impl StatusView {
    fn from_state(state: &GlobalAppState) -> Self {
        let locations = |list: Option<&[Location]>| -> Vec<LocationView> {
            list.unwrap_or_default()
                .iter()
                .map(|l| LocationView {
                    name: l.descriptor.name.clone(),
                    available: l.is_available,
                })
                .collect()
        };

        Self {
            username: state
                .account_info()
                .map(|a| a.username.clone())
                .unwrap_or_default(),
            item_types: state.items().map(<[_]>::len).unwrap_or(0),
            mine_locations: locations(state.mine_locations()),
            gamble_locations: locations(state.gamble_locations()),
        }
    }
}

async fn status(app: &AppContext, json: bool) -> Result<()> {
    require_login(app)?;
    app.engine.initialize().await?;

    let settled = tokio::time::timeout(
        app.config.request_timeout(),
        app.engine.wait_for_locations(),
    )
    .await;
    match settled {
        Ok(loads) if loads.mine == LoadStatus::Failed || loads.gamble == LoadStatus::Failed => {
            warn!("some locations could not be loaded")
        }
        Ok(_) => {}
        Err(_) => warn!("timed out waiting for locations"),
    }

    let view = StatusView::from_state(&app.engine.state().get());
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    println!("Player: {}", view.username);
    println!("Known item types: {}", view.item_types);
    for (title, list) in [
        ("Mines", &view.mine_locations),
        ("Gambling", &view.gamble_locations),
    ] {
        println!("{title}:");
        for location in list {
            let marker = if location.available { "open" } else { "locked" };
            println!("  {:<24} {marker}", location.name);
        }
    }
    Ok(())
}

async fn hiscores(app: &AppContext) -> Result<()> {
    let response = app
        .channels
        .public
        .get_hiscores(GetHiscoresRequest {})
        .await?;
    for (rank, entry) in response.hiscores.iter().enumerate() {
        println!("{:>3}. {:<20} {:>12.2}", rank + 1, entry.username, entry.total_value);
    }
    Ok(())
}

async fn inventory(
    app: &AppContext,
    page_size: u32,
    page_number: u32,
    sort_by: SortBy,
    direction: SortDirection,
) -> Result<()> {
    require_login(app)?;
    app.engine.initialize().await?;
    let response = app
        .channels
        .private
        .get_inventory(GetInventoryRequest {
            page_size,
            page_number,
            sort_by: sort_by as i32,
            sort_direction: direction as i32,
        })
        .await?;

    let state = app.engine.state().get();
    for item in &response.items {
        println!("{}", describe(&state, item));
    }
    println!(
        "Page {} ({} of {} items)",
        page_number + 1,
        response.items.len(),
        response.total_items
    );
    Ok(())
}

async fn mine(app: &AppContext, location: String, count: Option<usize>) -> Result<()> {
    require_login(app)?;
    app.engine.initialize().await?;

    let mut stream = app
        .channels
        .private
        .start_mining(StartMiningRequest {
            location_name: location.clone(),
        })
        .await?;
    println!("Mining at {location}");

    let mut received = 0;
    while let Some(message) = stream.next().await {
        let response = message?;
        if let Some(loot) = response.loot {
            println!("  {}", describe(&app.engine.state().get(), &loot));
            received += 1;
        }
        if count.is_some_and(|limit| received >= limit) {
            break;
        }
    }

    if let Err(err) = app.channels.private.stop_mining().await {
        warn!("failed to stop mining: {err}");
    }
    Ok(())
}

fn describe(state: &GlobalAppState, item: &Item) -> String {
    let name = u32::try_from(item.id)
        .ok()
        .and_then(|id| state.item(id))
        .map(|d| d.name.as_str())
        .unwrap_or("unknown item");
    format!("{name:<20} quality {:>5.2}  value {:>8.2}", item.quality, item.value)
}

fn print_upgrades(upgrades: Option<Upgrades>) {
    match upgrades {
        Some(upgrades) => println!("Storage level: {}", upgrades.storage_level),
        None => println!("No upgrades yet"),
    }
}
