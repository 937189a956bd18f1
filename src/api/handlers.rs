use actix_web::{web, HttpResponse, Responder};
use log::error;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::schema::BlockView;
use crate::blockchain::{DigitalSignature, Ledger, LedgerError, Transaction, Wallet};

/// Data structure for the ledger state
pub type LedgerData = web::Data<Ledger>;

/// Response for the chain endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ChainResponse {
    /// The length of the chain
    pub length: usize,

    /// The blocks in the chain
    pub chain: Vec<BlockView>,

    /// Whether the chain is valid
    pub is_valid: bool,
}

/// Response for the validate endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct ValidationResponse {
    pub is_valid: bool,

    /// Why validation failed, if it did
    pub message: String,
}

/// Request for the blocks endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AppendRequest {
    /// The transfer to append
    pub transaction: Transaction,

    /// The claimed sender's public key (base58)
    pub sender_public_key: String,

    /// Signature over the serialized transaction (base58)
    pub signature: String,
}

/// Response for a successful append
#[derive(Serialize, Deserialize, ToSchema)]
pub struct AppendResponse {
    /// The message
    pub message: String,

    /// The newly mined block
    pub block: BlockView,
}

/// Response for the create wallet endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct WalletResponse {
    /// The wallet's public key (base58), used as its identity on the ledger
    pub public_key: String,

    /// The wallet's private key (base58)
    pub private_key: String,
}

/// Request for the send endpoint
#[derive(Serialize, Deserialize, ToSchema)]
pub struct SendRequest {
    /// The sender's private key (for signing)
    pub private_key: String,

    /// The amount to transfer
    pub amount: f64,

    /// The payee's public key
    pub payee: String,
}

/// Get the full chain
///
/// Returns every block and the chain's validity status
#[utoipa::path(
    get,
    path = "/api/v1/chain",
    responses(
        (status = 200, description = "Chain retrieved successfully", body = ChainResponse)
    )
)]
pub async fn get_chain(ledger: LedgerData) -> impl Responder {
    let chain: Vec<BlockView> = ledger
        .blocks()
        .into_iter()
        .enumerate()
        .map(|(height, block)| BlockView::new(height, block))
        .collect();

    let response = ChainResponse {
        length: chain.len(),
        chain,
        is_valid: ledger.is_valid(),
    };

    HttpResponse::Ok().json(response)
}

/// Get the most recent block
#[utoipa::path(
    get,
    path = "/api/v1/chain/last",
    responses(
        (status = 200, description = "Last block retrieved successfully", body = BlockView)
    )
)]
pub async fn get_last_block(ledger: LedgerData) -> impl Responder {
    let (height, block) = ledger.tip();
    HttpResponse::Ok().json(BlockView::new(height, block))
}

/// Check if the chain is valid
///
/// Recomputes every link and mining hash
#[utoipa::path(
    get,
    path = "/api/v1/validate",
    responses(
        (status = 200, description = "Chain validation status", body = ValidationResponse)
    )
)]
pub async fn validate_chain(ledger: LedgerData) -> impl Responder {
    let response = match ledger.validate() {
        Ok(()) => ValidationResponse {
            is_valid: true,
            message: "Chain is valid".to_string(),
        },
        Err(err) => ValidationResponse {
            is_valid: false,
            message: err.to_string(),
        },
    };

    HttpResponse::Ok().json(response)
}

/// Append a signed transaction
///
/// Verifies the signature, mines a nonce and appends a new block
#[utoipa::path(
    post,
    path = "/api/v1/blocks",
    request_body = AppendRequest,
    responses(
        (status = 201, description = "Block appended successfully", body = AppendResponse),
        (status = 400, description = "Invalid signature or amount"),
        (status = 422, description = "Proof of work exhausted"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn append_block(ledger: LedgerData, append_req: web::Json<AppendRequest>) -> impl Responder {
    let AppendRequest {
        transaction,
        sender_public_key,
        signature,
    } = append_req.into_inner();

    mine_and_append(ledger, transaction, sender_public_key, DigitalSignature(signature)).await
}

/// Create a new wallet
///
/// Creates a new wallet with a random keypair
///
/// The private key must be stored by your own
#[utoipa::path(
    post,
    path = "/api/v1/wallet/new",
    responses(
        (status = 201, description = "Wallet created successfully", body = WalletResponse)
    )
)]
pub async fn create_wallet() -> impl Responder {
    let wallet = Wallet::new();

    let response = WalletResponse {
        public_key: wallet.public_key().to_string(),
        private_key: wallet.private_key(),
    };

    HttpResponse::Created().json(response)
}

/// Send funds from a wallet
///
/// Signs a transfer with the given private key and appends it
#[utoipa::path(
    post,
    path = "/api/v1/wallet/send",
    request_body = SendRequest,
    responses(
        (status = 201, description = "Block appended successfully", body = AppendResponse),
        (status = 400, description = "Invalid private key"),
        (status = 422, description = "Proof of work exhausted"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn send_transfer(ledger: LedgerData, send_req: web::Json<SendRequest>) -> impl Responder {
    let wallet = match Wallet::from_private_key(&send_req.private_key) {
        Ok(wallet) => wallet,
        Err(err) => {
            return HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Invalid private key: {}", err)
            }));
        }
    };

    let (transaction, signature) = Transaction::signed_by(&wallet, send_req.amount, send_req.payee.clone());

    mine_and_append(ledger, transaction, wallet.public_key().to_string(), signature).await
}

/// Runs the proof-of-work search on the blocking pool and maps the result
async fn mine_and_append(
    ledger: LedgerData,
    transaction: Transaction,
    sender_public_key: String,
    signature: DigitalSignature,
) -> HttpResponse {
    let mining_ledger = ledger.clone();
    let result = web::block(move || {
        mining_ledger.append(transaction, &sender_public_key, &signature)
    })
    .await;

    match result {
        Ok(Ok(block)) => {
            // other appends may have landed since, so look the block up
            let height = ledger
                .blocks()
                .iter()
                .rposition(|candidate| candidate == &block)
                .unwrap_or_else(|| ledger.len() - 1);

            let response = AppendResponse {
                message: "New Block Mined".to_string(),
                block: BlockView::new(height, block),
            };

            HttpResponse::Created().json(response)
        }
        Ok(Err(err @ (LedgerError::InvalidSignature | LedgerError::InvalidAmount(_)))) => {
            HttpResponse::BadRequest().json(serde_json::json!({
                "error": format!("Transaction rejected: {}", err)
            }))
        }
        Ok(Err(err @ LedgerError::ProofOfWorkExhausted { .. })) => {
            HttpResponse::UnprocessableEntity().json(serde_json::json!({
                "error": format!("Transaction rejected: {}", err)
            }))
        }
        Ok(Err(err)) => HttpResponse::InternalServerError().json(serde_json::json!({
            "error": format!("Failed to append block: {}", err)
        })),
        Err(err) => {
            error!("Mining task failed: {}", err);
            HttpResponse::InternalServerError().json(serde_json::json!({
                "error": "Mining task failed"
            }))
        }
    }
}
