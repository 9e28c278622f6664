//! Structured logging + Prometheus metrics/health endpoints, shared by
//! every Trustflow component (SPEC_FULL.md §1.1/§1.2).

mod http;
mod init;

pub use http::run_server;
pub use init::init_tracing;
