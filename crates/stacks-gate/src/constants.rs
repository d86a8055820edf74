use std::fmt;
use std::str::FromStr;

use crate::GateError;

/// Stacks mainnet chain ID.
pub const MAINNET_CHAIN_ID: u32 = 0x0000_0001;

/// Stacks testnet chain ID.
pub const TESTNET_CHAIN_ID: u32 = 0x8000_0000;

/// Address version bytes (c32 `P`, `M`, `T`, `N`).
pub const MAINNET_SINGLESIG_VERSION: u8 = 22;
pub const MAINNET_MULTISIG_VERSION: u8 = 20;
pub const TESTNET_SINGLESIG_VERSION: u8 = 26;
pub const TESTNET_MULTISIG_VERSION: u8 = 21;

/// Default Stacks API endpoints.
pub const MAINNET_API_URL: &str = "https://api.mainnet.hiro.so";
pub const TESTNET_API_URL: &str = "https://api.testnet.hiro.so";

/// Structured-message domain. Clients sign against exactly these values, so
/// any change here must ship as a new protocol version.
pub const MESSAGE_DOMAIN_NAME: &str = "aibtcdev";
pub const MESSAGE_DOMAIN_VERSION: &str = "0.0.2";

/// Invoice contract coordinates.
pub const CONTRACT_NAME: &str = "stacks-m2m-v2";
pub const MAINNET_CONTRACT_ADDRESS: &str = "SP1EGQ03EP0NE60FJV3X0MRE0QTJMRHF5X5EQY0QS";
pub const TESTNET_CONTRACT_ADDRESS: &str = "ST1EGQ03EP0NE60FJV3X0MRE0QTJMRHF5X402W70M";
pub const QUERY_FUNCTION: &str = "get-recent-payment-data-by-address";
pub const PAYMENT_FUNCTION: &str = "pay-invoice-by-resource-name";

/// Request header carrying the hex-encoded structured-message signature.
pub const SIGNED_MESSAGE_HEADER: &str = "X-Signed-Message";

/// The two Stacks networks a request may target.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Network {
    Mainnet,
    #[default]
    Testnet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    pub fn chain_id(&self) -> u32 {
        match self {
            Network::Mainnet => MAINNET_CHAIN_ID,
            Network::Testnet => TESTNET_CHAIN_ID,
        }
    }

    /// Version byte for single-signature (P2PKH) addresses.
    pub fn singlesig_version(&self) -> u8 {
        match self {
            Network::Mainnet => MAINNET_SINGLESIG_VERSION,
            Network::Testnet => TESTNET_SINGLESIG_VERSION,
        }
    }

    /// Version byte for multi-signature (P2SH) addresses.
    pub fn multisig_version(&self) -> u8 {
        match self {
            Network::Mainnet => MAINNET_MULTISIG_VERSION,
            Network::Testnet => TESTNET_MULTISIG_VERSION,
        }
    }

    /// Whether an address version byte belongs to this network.
    pub fn accepts_version(&self, version: u8) -> bool {
        version == self.singlesig_version() || version == self.multisig_version()
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = GateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" => Ok(Network::Mainnet),
            "testnet" => Ok(Network::Testnet),
            other => Err(GateError::InvalidNetwork(other.to_string())),
        }
    }
}

/// Where the invoice contract lives on one network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractCoordinates {
    pub contract_address: String,
    pub contract_name: String,
}

impl ContractCoordinates {
    /// Fully-qualified contract identifier (`<address>.<name>`).
    pub fn identifier(&self) -> String {
        format!("{}.{}", self.contract_address, self.contract_name)
    }
}

/// Immutable per-network settings: which API to query and which contract to ask.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub network: Network,
    pub api_url: String,
    pub contract: ContractCoordinates,
}

impl NetworkConfig {
    /// Default configuration for a network tag.
    pub fn for_network(network: Network) -> Self {
        let (api_url, contract_address) = match network {
            Network::Mainnet => (MAINNET_API_URL, MAINNET_CONTRACT_ADDRESS),
            Network::Testnet => (TESTNET_API_URL, TESTNET_CONTRACT_ADDRESS),
        };
        Self {
            network,
            api_url: api_url.to_string(),
            contract: ContractCoordinates {
                contract_address: contract_address.to_string(),
                contract_name: CONTRACT_NAME.to_string(),
            },
        }
    }

    pub fn chain_id(&self) -> u32 {
        self.network.chain_id()
    }
}

/// Runtime protocol configuration shared (read-only) by every request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    pub mainnet: NetworkConfig,
    pub testnet: NetworkConfig,
    pub query_function: String,
    pub payment_function: String,
    pub domain_name: String,
    pub domain_version: String,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            mainnet: NetworkConfig::for_network(Network::Mainnet),
            testnet: NetworkConfig::for_network(Network::Testnet),
            query_function: QUERY_FUNCTION.to_string(),
            payment_function: PAYMENT_FUNCTION.to_string(),
            domain_name: MESSAGE_DOMAIN_NAME.to_string(),
            domain_version: MESSAGE_DOMAIN_VERSION.to_string(),
        }
    }
}

impl GateConfig {
    pub fn network(&self, network: Network) -> &NetworkConfig {
        match network {
            Network::Mainnet => &self.mainnet,
            Network::Testnet => &self.testnet,
        }
    }
}
