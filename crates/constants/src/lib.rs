//! Era thresholds and block-reward schedule used by the fee indexer.
//!
//! Mirrors the handful of chain constants the original daemon hard-coded:
//! the Byzantium/Constantinople/London activation blocks, the per-era base
//! block reward, and the London activation timestamp used to seed
//! calendar-bucket aggregation.

#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]

mod network;
pub use network::NetworkConstants;

/// Wei per ether, as a `u128` (fits every era's base reward with room to
/// spare; totals that exceed this width live in [`alloy_primitives::U256`]
/// upstream of this crate).
pub const WEI_PER_ETHER: u128 = 1_000_000_000_000_000_000;

/// Default base fee (1 Gwei) assumed for the London block itself when the
/// upstream node reports an empty `baseFeePerGas`.
pub const DEFAULT_BASE_FEE_WEI: u128 = 1_000_000_000;
