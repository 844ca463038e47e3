use serde::{Deserialize, Serialize};
use std::{convert::Infallible, str::FromStr};

/// The identifier of a network, e.g. `sepolia` or `arbitrum-sepolia`.
///
/// Identifiers are normalized to trimmed lowercase so lookups are case-insensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NetworkId(String);

impl NetworkId {
    /// Returns a new normalized [`NetworkId`].
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_lowercase())
    }

    /// Returns the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for NetworkId {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for NetworkId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for NetworkId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl AsRef<str> for NetworkId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for NetworkId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifiers of the networks known to the builtin registry.
pub mod known_networks {
    /// Ethereum mainnet.
    pub const MAINNET: &str = "mainnet";
    /// Ethereum Sepolia.
    pub const SEPOLIA: &str = "sepolia";
    /// Arbitrum One.
    pub const ARBITRUM_ONE: &str = "arbitrum-one";
    /// Arbitrum Sepolia.
    pub const ARBITRUM_SEPOLIA: &str = "arbitrum-sepolia";
    /// OP Mainnet.
    pub const OPTIMISM: &str = "optimism";
    /// OP Sepolia.
    pub const OPTIMISM_SEPOLIA: &str = "optimism-sepolia";
    /// Base mainnet.
    pub const BASE: &str = "base";
    /// Base Sepolia.
    pub const BASE_SEPOLIA: &str = "base-sepolia";
    /// zkSync Era mainnet.
    pub const ZKSYNC: &str = "zksync";
    /// zkSync Era Sepolia.
    pub const ZKSYNC_SEPOLIA: &str = "zksync-sepolia";
    /// Polygon zkEVM mainnet.
    pub const POLYGON_ZKEVM: &str = "polygon-zkevm";
    /// Polygon zkEVM Cardona testnet.
    pub const POLYGON_ZKEVM_CARDONA: &str = "polygon-zkevm-cardona";
    /// Scroll mainnet.
    pub const SCROLL: &str = "scroll";
    /// Scroll Sepolia.
    pub const SCROLL_SEPOLIA: &str = "scroll-sepolia";
    /// Linea mainnet.
    pub const LINEA: &str = "linea";
    /// Linea Sepolia.
    pub const LINEA_SEPOLIA: &str = "linea-sepolia";
}

#[cfg(test)]
mod tests {
    use super::NetworkId;

    #[test]
    fn test_network_id_is_normalized() {
        assert_eq!(NetworkId::new(" Arbitrum-Sepolia "), NetworkId::from("arbitrum-sepolia"));
        assert_eq!(NetworkId::new("SEPOLIA").as_str(), "sepolia");
    }
}
