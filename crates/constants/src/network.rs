use crate::WEI_PER_ETHER;
use serde::{Deserialize, Serialize};

/// Chain-specific activation blocks and reward schedule.
///
/// Two presets ship by default, matching the `--ropsten` flag on the
/// original daemon's CLI: [`NetworkConstants::mainnet`] and
/// [`NetworkConstants::ropsten`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkConstants {
    byzantium_block: u64,
    constantinople_block: u64,
    london_block: u64,
    london_timestamp: u64,
}

impl NetworkConstants {
    /// Mainnet activation blocks.
    pub const fn mainnet() -> Self {
        Self {
            byzantium_block: 4_370_000,
            constantinople_block: 7_280_000,
            london_block: 12_965_000,
            london_timestamp: 1_628_166_822,
        }
    }

    /// Ropsten activation blocks, selected via `--ropsten`.
    pub const fn ropsten() -> Self {
        Self {
            byzantium_block: 1_700_000,
            constantinople_block: 4_230_000,
            london_block: 10_499_401,
            london_timestamp: 1_624_455_233,
        }
    }

    /// The Byzantium activation block.
    pub const fn byzantium_block(&self) -> u64 {
        self.byzantium_block
    }

    /// The Constantinople activation block.
    pub const fn constantinople_block(&self) -> u64 {
        self.constantinople_block
    }

    /// The London (EIP-1559) activation block. Fee accounting begins here.
    pub const fn london_block(&self) -> u64 {
        self.london_block
    }

    /// Unix timestamp of the London activation block, used to seed
    /// calendar-bucket aggregation.
    pub const fn london_timestamp(&self) -> u64 {
        self.london_timestamp
    }

    /// The base block reward (wei) for a block mined at `block_number`,
    /// ignoring uncle adjustments.
    pub const fn base_reward_wei(&self, block_number: u64) -> u128 {
        if block_number >= self.constantinople_block {
            2 * WEI_PER_ETHER
        } else if block_number >= self.byzantium_block {
            3 * WEI_PER_ETHER
        } else {
            5 * WEI_PER_ETHER
        }
    }

    /// Whether `block_number` is at or after the London activation block,
    /// i.e. subject to EIP-1559 base-fee accounting.
    pub const fn is_post_london(&self, block_number: u64) -> bool {
        block_number >= self.london_block
    }
}

impl Default for NetworkConstants {
    fn default() -> Self {
        Self::mainnet()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_reward_by_era() {
        let c = NetworkConstants::mainnet();
        assert_eq!(c.base_reward_wei(0), 5 * WEI_PER_ETHER);
        assert_eq!(c.base_reward_wei(c.byzantium_block()), 3 * WEI_PER_ETHER);
        assert_eq!(c.base_reward_wei(c.constantinople_block()), 2 * WEI_PER_ETHER);
        assert_eq!(c.base_reward_wei(c.london_block()), 2 * WEI_PER_ETHER);
    }

    #[test]
    fn post_london_boundary_is_inclusive() {
        let c = NetworkConstants::mainnet();
        assert!(c.is_post_london(c.london_block()));
        assert!(!c.is_post_london(c.london_block() - 1));
    }

    #[test]
    fn roundtrips_through_json() {
        let c = NetworkConstants::mainnet();
        let s = serde_json::to_string(&c).unwrap();
        let back: NetworkConstants = serde_json::from_str(&s).unwrap();
        assert_eq!(c, back);
    }
}
