//! `chamelium_cli` -- argument parsing and dispatch for the `chamelium` binary.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`cli`] | clap derive definitions |
//! | [`dispatch`] | Address resolution and routing into `chamelium_core` |

pub mod cli;
pub mod dispatch;
