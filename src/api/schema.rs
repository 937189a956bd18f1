use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::Block;

/// A block together with its computed hash
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BlockView {
    /// Position of the block in the chain, 0 for genesis
    pub height: usize,

    /// SHA-256 hash of the block
    pub hash: String,

    pub block: Block,
}

impl BlockView {
    pub fn new(height: usize, block: Block) -> Self {
        BlockView {
            height,
            hash: block.hash(),
            block,
        }
    }
}
