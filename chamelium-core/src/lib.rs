//! `chamelium_core` -- client library for a Chameleon display-testing board.
//!
//! This crate holds every command's logic with **no CLI dependency**.  The
//! board is reached through the [`device::Device`] trait; [`rpc::RpcDevice`]
//! speaks XML-RPC to `chameleond`; `mock::MockDevice`, behind the `mock`
//! feature, stands in for it in tests.  It is consumed by `chamelium-cli`.
//!
//! # Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`errors`] | `ChameliumError` enum via `thiserror` |
//! | [`config`] | Device address parsing and precedence, environment names |
//! | [`device`] | `Device` trait, connector types, capture areas |
//! | [`rpc`] | `RpcDevice`: XML-RPC over `ureq` |
//! | `mock` | `MockDevice`: recording in-memory board (tests, `mock` feature) |
//! | [`edid`] | `EdidHandle` RAII guard, `edid get` / `edid set` |
//! | [`hotplug`] | Port status, plug/unplug, HPD pulses, reset |
//! | [`capture`] | Screenshot workflow and frame encoding via `image` |
//! | [`output`] | Output targets and progress lines |

pub mod capture;
pub mod config;
pub mod device;
pub mod edid;
pub mod errors;
pub mod hotplug;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod output;
pub mod rpc;
