pub mod error;
pub mod rpc;
pub mod signer;
pub mod types;

pub use error::{CoreError, RpcError};
pub use rpc::{ClientOptions, IwanRpc, WsRpcClient, DEFAULT_BASE_URI};
pub use signer::{SignatureMaterial, Signer};
pub use types::{BlockRef, BlockTag, ChainType, Envelope, Params, ParamsBuilder};
