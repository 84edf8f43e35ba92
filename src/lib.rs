//! Helius DAS gateway for the fractionalization app.
//!
//! The server half (`http`, `upstream`, `state`) keeps the Helius key on the
//! server and forwards JSON-RPC bodies to the DAS endpoint. The client half
//! (`das`, `query`, `status`) talks to that gateway and narrows DAS assets
//! into the compressed-NFT view the UI renders.

pub mod config;
pub mod credentials;
pub mod das;
pub mod http;
pub mod models;
pub mod query;
pub mod retry;
pub mod state;
pub mod status;
pub mod upstream;
