// API module
//
// This module contains the HTTP interface to the ledger

pub mod handlers;
pub mod routes;
pub mod schema;

use utoipa::OpenApi;

// Re-export main components for easier access
pub use routes::configure_routes;

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_chain,
        handlers::get_last_block,
        handlers::validate_chain,
        handlers::append_block,
        handlers::create_wallet,
        handlers::send_transfer
    ),
    components(
        schemas(
            crate::blockchain::Block,
            crate::blockchain::Transaction,
            schema::BlockView,
            handlers::ChainResponse,
            handlers::ValidationResponse,
            handlers::AppendRequest,
            handlers::AppendResponse,
            handlers::WalletResponse,
            handlers::SendRequest
        )
    ),
    tags(
        (name = "ledger", description = "Ledger API endpoints")
    ),
    info(
        title = "Ledger API",
        version = "1.0.0",
        description = "An append-only proof-of-work ledger",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    )
)]
pub struct ApiDoc;
