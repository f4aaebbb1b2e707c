//! Loads a catalog seed file into the configured store.
//!
//! The file is a JSON array of products. Inline `validity_options` blobs are
//! converted to pricing plans on the way in.

use std::path::PathBuf;

use api::config::Config;
use clap::Parser;
use domain::{Money, ProductSeed, SeedOptions, build_seed_products};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use store::{InMemoryStore, PostgresStore, Store};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "seed", about = "Load catalog products into the storefront store")]
struct Args {
    /// Path to the catalog JSON file.
    path: PathBuf,

    /// Do not give plan-less products the one-day trial plan.
    #[arg(long)]
    no_default_trial: bool,

    /// Trial plan price in major units. Defaults to TRIAL_PRICE_MINOR.
    #[arg(long)]
    trial_price: Option<Decimal>,

    /// Parse and validate the file without writing anything.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::from_env().expect("invalid configuration");

    let trial_price = match args.trial_price {
        Some(price) => Money::from_decimal(price).expect("trial price out of range"),
        None => config.trial_price,
    };
    let options = SeedOptions {
        create_default_trial: !args.no_default_trial,
        trial_price,
    };

    let raw = std::fs::read_to_string(&args.path).expect("failed to read seed file");
    let seeds: Vec<ProductSeed> = serde_json::from_str(&raw).expect("invalid seed file");
    let products = build_seed_products(&seeds, options).expect("invalid catalog entry");
    tracing::info!(
        products = products.len(),
        plans = products.iter().map(|p| p.plans().len()).sum::<usize>(),
        "catalog parsed"
    );

    if args.dry_run {
        return;
    }

    match config.database_url.as_deref() {
        Some(url) => {
            let pool = PgPoolOptions::new()
                .max_connections(config.database_max_connections)
                .connect(url)
                .await
                .expect("failed to connect to database");
            let store = PostgresStore::new(pool);
            store
                .run_migrations()
                .await
                .expect("failed to run migrations");
            insert_all(&store, &products).await;
        }
        None => {
            tracing::warn!("DATABASE_URL not set, seeding a throwaway in-memory store");
            insert_all(&InMemoryStore::new(), &products).await;
        }
    }
}

async fn insert_all<S: Store>(store: &S, products: &[domain::Product]) {
    for product in products {
        store
            .insert_product(product)
            .await
            .expect("failed to insert product");
        tracing::info!(product_id = %product.id, name = %product.name, "product seeded");
    }
}
