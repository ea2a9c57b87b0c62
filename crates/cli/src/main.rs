//! SoleMate CLI - checkout quotes, coupon checks and backend inspection.
//!
//! # Usage
//!
//! ```bash
//! # Checkout totals for a subtotal and discount
//! solemate quote 450 --discount 0
//!
//! # Evaluate a coupon code against a coupon list
//! solemate coupon SAVE20 --coupons coupons.json --cart-value 1000
//!
//! # Resolve a color/size pick against a product file
//! solemate variant product.json --color Black --size 9
//!
//! # Fetch a product from the backend
//! solemate product 1001 --refresh
//!
//! # Inspect or change a shopper's cart
//! solemate cart --identity me.json show
//! ```
//!
//! # Commands
//!
//! - `quote`, `coupon`, `variant` - Offline, no configuration needed
//! - `product`, `cart`, `checkout`, `orders` - Talk to `SOLEMATE_API_URL`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use sentry::integrations::tracing as sentry_tracing;
use solemate_core::{ModelNo, OrderId};
use solemate_storefront::StorefrontConfig;
use solemate_storefront::config::{LogFormat, parse_amount};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "solemate")]
#[command(author, version, about = "SoleMate CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute checkout totals
    Quote {
        /// Cart subtotal
        #[arg(value_parser = parse_amount)]
        subtotal: Decimal,

        /// Coupon discount
        #[arg(short, long, default_value = "0", value_parser = parse_amount)]
        discount: Decimal,

        /// Free-shipping threshold (default from configuration, else 500)
        #[arg(long, value_parser = parse_amount)]
        threshold: Option<Decimal>,

        /// Flat shipping fee (default from configuration, else 50)
        #[arg(long, value_parser = parse_amount)]
        fee: Option<Decimal>,
    },
    /// Evaluate a coupon code against a JSON coupon list
    Coupon {
        /// Coupon code (case-insensitive)
        code: String,

        /// JSON file with an array of coupons
        #[arg(short, long)]
        coupons: PathBuf,

        /// Cart value to evaluate against
        #[arg(short = 'v', long, value_parser = parse_amount)]
        cart_value: Decimal,

        /// Number of the shopper's prior orders (unknown if omitted)
        #[arg(long)]
        prior_orders: Option<u64>,
    },
    /// Resolve a color/size selection against a JSON product
    Variant {
        /// JSON file with a product
        product: PathBuf,

        /// Color name
        #[arg(short, long)]
        color: Option<String>,

        /// Size label
        #[arg(short, long)]
        size: Option<String>,
    },
    /// Fetch a product from the backend
    Product {
        /// Product model number
        model_no: ModelNo,

        /// Drop the cached copy first
        #[arg(long)]
        refresh: bool,
    },
    /// Inspect or change a shopper's cart
    Cart {
        /// JSON file with the signed-in identity
        #[arg(short, long)]
        identity: PathBuf,

        #[command(subcommand)]
        action: CartAction,
    },
    /// Checkout quote for a shopper's cart
    Checkout {
        /// JSON file with the signed-in identity
        #[arg(short, long)]
        identity: PathBuf,

        /// Coupon code to apply
        #[arg(long)]
        coupon: Option<String>,

        /// List active coupons with their evaluation
        #[arg(long)]
        offers: bool,
    },
    /// Inspect or cancel a shopper's orders
    Orders {
        /// JSON file with the signed-in identity
        #[arg(short, long)]
        identity: PathBuf,

        #[command(subcommand)]
        action: OrderAction,
    },
}

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart and wishlist
    Show,
    /// Add a variant
    Add {
        model_no: ModelNo,
        #[arg(short, long)]
        color: String,
        #[arg(short, long)]
        size: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Change a line's quantity
    Set { line: i64, quantity: u32 },
    /// Remove a line
    Remove { line: i64 },
    /// Remove every line
    Clear,
}

#[derive(Subcommand)]
pub enum OrderAction {
    /// List orders
    List,
    /// Show an order with its tracking history
    Track { order_id: OrderId },
    /// Cancel an order
    Cancel { order_id: OrderId },
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn init_tracing(format: LogFormat) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "solemate_storefront=info,solemate_cli=info".into());

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter));

    match format {
        LogFormat::Pretty => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}

#[tokio::main]
async fn main() {
    // Offline commands run without a backend URL, so a missing config is
    // only an error once a live command needs it.
    let config = StorefrontConfig::from_env();

    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);
    init_tracing(config.as_ref().map(|c| c.log_format).unwrap_or_default());

    let cli = Cli::parse();

    if let Err(e) = run(cli, config).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(
    cli: Cli,
    config: Result<StorefrontConfig, solemate_storefront::ConfigError>,
) -> Result<(), commands::CliError> {
    match cli.command {
        Commands::Quote {
            subtotal,
            discount,
            threshold,
            fee,
        } => {
            let (base, currency) = config
                .map(|c| (c.shipping, c.currency))
                .unwrap_or_default();
            commands::pricing::quote(subtotal, discount, threshold, fee, base, currency)?;
        }
        Commands::Coupon {
            code,
            coupons,
            cart_value,
            prior_orders,
        } => commands::pricing::coupon(&code, &coupons, cart_value, prior_orders)?,
        Commands::Variant {
            product,
            color,
            size,
        } => commands::pricing::variant(&product, color.as_deref(), size.as_deref())?,
        Commands::Product { model_no, refresh } => {
            commands::shop::product(config?, model_no, refresh).await?;
        }
        Commands::Cart { identity, action } => {
            commands::shop::cart(config?, &identity, action).await?;
        }
        Commands::Checkout {
            identity,
            coupon,
            offers,
        } => commands::shop::checkout(config?, &identity, coupon.as_deref(), offers).await?,
        Commands::Orders { identity, action } => {
            commands::shop::orders(config?, &identity, action).await?;
        }
    }
    Ok(())
}
