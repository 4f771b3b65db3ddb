pub mod args;
pub mod gateway;
pub mod models;
pub mod normalize;
pub mod registry;
pub mod transport;

pub use gateway::Gateway;
pub use registry::{ToolDescriptor, ToolKind, ToolRegistry, ValidationError};

use octogate_core::codec::CodecError;
use octogate_core::error::ApiError;
use thiserror::Error;

/// Everything a dispatch can fail with. Validation and lookup failures
/// are produced locally, before any network call; the rest are classified
/// once at the response boundary and returned as values.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error(transparent)]
    InvalidArguments(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Codec(#[from] CodecError),
}
