//! Core Infrastructure
//!
//! Transport seam and response envelope decoding.

pub mod envelope;
pub mod transport;

pub use envelope::parse_payload;
pub use transport::{
    HttpMethod, HttpRequest, HttpResponse, HttpTransport, MockTransport, ReqwestTransport,
};
