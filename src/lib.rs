//! Outlookctl is a command-line client for Outlook/Microsoft 365 that
//! delegates every operation to a Model Context Protocol tool server.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns configuration, the result cache, and the error
//!   taxonomy.
//! - [`mcp`] provides the MCP integration: the stdio transport, the
//!   response-envelope rules, and the session guard that owns the
//!   single server connection.
//! - [`outlook`] is the domain façade: one thin method per mail,
//!   calendar, contact, task, or search operation, with read-through
//!   caching and write-triggered invalidation.
//! - [`cli`] parses the command surface and dispatches into the façade.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and
//! route through [`crate::cli::main`].

pub mod cli;
pub mod core;
pub mod mcp;
pub mod outlook;

#[cfg(test)]
pub(crate) mod test_support;
