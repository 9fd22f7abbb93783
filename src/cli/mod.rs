//! Client-side plumbing for subcommands that talk to a running server.

pub mod client;
