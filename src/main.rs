use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use log::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use pow_ledger::api::{self, ApiDoc};
use pow_ledger::blockchain::{Ledger, Transaction, Wallet};
use pow_ledger::config::{LedgerConfig, ServerConfig};

// Replay a few transfers between fresh wallets so the chain has some content
fn seed_demo_transfers(ledger: &Ledger) {
    let satoshi = Wallet::new();
    let bob = Wallet::new();
    let alice = Wallet::new();

    let transfers = [
        ("satoshi", &satoshi, &bob, 50.0),
        ("bob", &bob, &alice, 23.0),
        ("alice", &alice, &bob, 5.0),
    ];

    for (name, sender, payee, amount) in transfers {
        let (transaction, signature) = Transaction::signed_by(sender, amount, payee.public_key());

        match ledger.append(transaction, sender.public_key(), &signature) {
            Ok(block) => info!("{} sent {} in block {}", name, amount, block.hash()),
            Err(err) => warn!("Demo transfer from {} failed: {}", name, err),
        }
    }

    info!("Demo chain has {} blocks", ledger.len());
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let ledger_config = LedgerConfig::from_env().context("reading ledger configuration")?;
    let server_config = ServerConfig::from_env().context("reading server configuration")?;

    info!(
        "Creating ledger with difficulty '{}' (max iterations: {:?})",
        ledger_config.difficulty, ledger_config.max_iterations
    );
    let ledger = web::Data::new(Ledger::with_config(ledger_config)?);

    if server_config.demo {
        let demo_ledger = ledger.clone();
        tokio::task::spawn_blocking(move || seed_demo_transfers(&demo_ledger))
            .await
            .context("running demo transfers")?;
    }

    info!(
        "Starting HTTP server at http://{}:{}",
        server_config.host, server_config.port
    );

    // Start HTTP server
    HttpServer::new(move || {
        // Configure CORS
        let cors = Cors::default()
            .allow_any_origin()
            .allow_any_method()
            .allow_any_header()
            .max_age(3600);

        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors)
            .app_data(ledger.clone())
            // API routes
            .configure(api::configure_routes)
            // Swagger UI
            .service(
                SwaggerUi::new("/swagger-ui/{_:.*}")
                    .url("/api-docs/openapi.json", ApiDoc::openapi())
            )
    })
    .bind((server_config.host.as_str(), server_config.port))?
    .run()
    .await?;

    Ok(())
}
