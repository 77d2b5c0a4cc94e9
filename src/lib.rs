pub mod cli;
pub mod commands;
pub mod config;
pub mod crypto;
pub mod handler;
pub mod package;
pub mod rlp;
pub mod rpc;
pub mod signer;
pub mod transaction;
pub mod units;
