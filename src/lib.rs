//! Library surface for the raft replica binary, split out so integration
//! tests can drive the axum `Router` directly with `tower::ServiceExt`
//! instead of a real socket.

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod raft;
