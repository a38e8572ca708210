//! Document fill and e-signature MCP server
//!
//! Exposes PDF form detection and filling plus the signature request
//! lifecycle as MCP tools over stdio or HTTP.

pub mod config;
pub mod error;
pub mod loader;
pub mod mcp;
pub mod output;
pub mod transport;

pub use config::ServerConfig;
pub use error::ServerError;
pub use mcp::SigningMcpServer;
