//! Moving optimized images to the photo host.
//!
//! - **Transport**: [`Transport`] trait, request and error types
//! - **HTTP**: [`HttpTransport`], reqwest multipart with streamed progress
//! - **Retry**: [`RetryPolicy`], bounded exponential backoff

pub mod http;
pub mod retry;
pub mod transport;

pub use http::HttpTransport;
pub use retry::RetryPolicy;
pub use transport::{ProgressFn, Transport, TransportError, UploadRequest, no_progress};
