use std::{path::PathBuf, process::ExitCode};

use anyhow::{Context, Result};
use catalog::{CatalogController, ClockIds, IdGenerator, PricePolicy, UuidIds};
use clap::{Parser, Subcommand};
use shared::{domain::ProductId, protocol::Notice};
use storage::{MemorySlots, ProductStore, SlotProductStore, Storage};
use tracing::error;
use tracing_subscriber::EnvFilter;

mod config;
mod view;

use config::{load_settings, normalize_database_url, IdStrategy, Settings};
use view::AdminView;

type Admin = AdminView<Box<dyn ProductStore>, Box<dyn IdGenerator>>;

#[derive(Parser, Debug)]
#[command(name = "catalog-admin", about = "Manage the product catalog")]
struct Cli {
    #[arg(long, default_value = "catalog.toml")]
    config: PathBuf,
    #[arg(long)]
    database_url: Option<String>,
    /// Keep the catalog in memory for this run only.
    #[arg(long)]
    ephemeral: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    List,
    Show {
        id: String,
    },
    Add {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "")]
        price: String,
        #[arg(long, default_value = "")]
        image_url: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long)]
        image_url: Option<String>,
    },
    Remove {
        id: String,
    },
    /// Print the persisted catalog exactly as stored.
    Export,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    let mut settings = load_settings(&cli.config)?;
    if let Some(database_url) = cli.database_url {
        settings.database_url = database_url;
    }
    init_tracing(&settings.log_filter);

    let mut admin = open_admin(&settings, cli.ephemeral).await?;
    admin.activate().await;

    let notice = match cli.command {
        Command::List => {
            print!("{}", admin.render());
            None
        }
        Command::Show { id } => match admin.controller().get(&ProductId::new(&id)) {
            Some(product) => {
                println!("{}", serde_json::to_string_pretty(product)?);
                None
            }
            None => Some(Notice::error(format!("product {id} not found"))),
        },
        Command::Add {
            name,
            price,
            image_url,
        } => {
            let draft = admin.new_draft_mut();
            draft.name = name;
            draft.price = price;
            draft.image_url = image_url;
            Some(admin.submit_new().await)
        }
        Command::Edit {
            id,
            name,
            price,
            image_url,
        } => Some(edit(&mut admin, ProductId::new(id), name, price, image_url).await),
        Command::Remove { id } => Some(admin.delete(&ProductId::new(id)).await),
        Command::Export => match admin.export().await {
            Ok(Some(raw)) => {
                println!("{raw}");
                None
            }
            Ok(None) => Some(Notice::info("No products have been saved yet")),
            Err(notice) => Some(notice),
        },
    };

    let Some(notice) = notice else {
        return Ok(ExitCode::SUCCESS);
    };
    println!("{}: {}", notice.title, notice.description);
    Ok(if notice.is_destructive() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

async fn edit(
    admin: &mut Admin,
    id: ProductId,
    name: Option<String>,
    price: Option<String>,
    image_url: Option<String>,
) -> Notice {
    if let Err(notice) = admin.begin_edit(&id) {
        return notice;
    }
    if let Some(draft) = admin.edit_draft_mut() {
        if let Some(name) = name {
            draft.name = name;
        }
        if let Some(price) = price {
            draft.price = price;
        }
        if let Some(image_url) = image_url {
            draft.image_url = image_url;
        }
    }
    admin.save_edit().await
}

async fn open_admin(settings: &Settings, ephemeral: bool) -> Result<Admin> {
    let store: Box<dyn ProductStore> = if ephemeral {
        Box::new(SlotProductStore::new(
            MemorySlots::new(),
            settings.storage_key.clone(),
        ))
    } else {
        let database_url = normalize_database_url(&settings.database_url)?;
        let storage = Storage::new(&database_url).await.map_err(|error| {
            error!(
                %database_url,
                error = %format!("{error:#}"),
                "failed to open catalog database"
            );
            error
        })?;
        storage
            .health_check()
            .await
            .context("catalog database is not usable")?;
        Box::new(SlotProductStore::new(storage, settings.storage_key.clone()))
    };

    let ids: Box<dyn IdGenerator> = match settings.id_strategy {
        IdStrategy::Clock => Box::new(ClockIds::new()),
        IdStrategy::Uuid => Box::new(UuidIds),
    };

    let controller = CatalogController::new(store, ids)
        .with_price_policy(PricePolicy::from_allow_negative(settings.allow_negative_prices));
    Ok(AdminView::new(controller))
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
