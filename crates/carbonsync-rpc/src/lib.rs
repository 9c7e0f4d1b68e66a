//! carbonsync-rpc: the wire layer under the chain client.
//!
//! - [`RpcTransport`]: async trait every transport implements
//! - [`HttpTransport`]: `reqwest`-backed JSON-RPC over HTTP
//! - [`JsonRpcRequest`] / [`JsonRpcResponse`]: JSON-RPC 2.0 wire types
//! - [`retry`]: bounded retry policy applied by the chain client decorator

pub mod error;
pub mod http;
pub mod request;
pub mod retry;
pub mod transport;

pub use error::TransportError;
pub use http::HttpTransport;
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse};
pub use retry::{RetryConfig, RetryPolicy};
pub use transport::RpcTransport;
