//! HTTP and real-time transport for the Matcha client.
//!
//! The transport layer is deliberately dumb: it attaches the bearer token,
//! encodes query strings, sends each request exactly once and maps the
//! backend's error bodies onto [`ApiError`]. Retries, caching and session
//! policy live in `matcha-client`.

pub mod api;
pub mod error;
pub mod socket;
pub mod transport;

pub use api::ApiClient;
pub use error::{ApiError, ChannelError};
pub use socket::{Connection, Connector, EventStream, WsConnector};
pub use transport::{ApiRequest, HttpTransport, Method, RequestBody, ReqwestTransport};
