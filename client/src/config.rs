// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Wallet connectivity configuration.
//!
//! The configuration is built once by the startup routine from the environment and then shared
//! read-only. It always activates exactly one network: [select_network] returns the primary
//! network whatever the testnet flag says, so the local development chain is never activated even
//! when testnets are enabled.

use serde::Serialize;
use snafu::Snafu;
use std::{env, fmt};
use surf::Url;

/// Enables the development network when set to exactly `true`.
pub const ENABLE_TESTNETS_VAR: &str = "TODO_ENABLE_TESTNETS";
/// WalletConnect project id. Required.
pub const PROJECT_ID_VAR: &str = "TODO_WALLETCONNECT_PROJECT_ID";
/// Optional JSON-RPC endpoint overriding the network's public one.
pub const RPC_URL_VAR: &str = "TODO_RPC_URL";

pub const DEFAULT_APP_NAME: &str = "Todo DApp";

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum ConfigError {
    #[snafu(display("{} must be set to a WalletConnect project id", var))]
    MissingProjectId { var: &'static str },

    #[snafu(display("invalid RPC URL {}: {}", url, msg))]
    InvalidRpcUrl { url: String, msg: String },

    #[snafu(display("unable to load contract addresses: {}", source))]
    ContractRecord {
        source: todo_contracts::DeployError,
    },

    #[snafu(display("no address for contract {} in the deployment record", name))]
    MissingContract { name: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Sepolia,
    Hardhat,
}

impl Network {
    /// The network the client activates.
    pub const PRIMARY: Network = Network::Sepolia;

    pub fn chain_id(self) -> u64 {
        match self {
            Network::Sepolia => 11_155_111,
            Network::Hardhat => 31_337,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Network::Sepolia => "Sepolia",
            Network::Hardhat => "Hardhat",
        }
    }

    pub fn currency_symbol(self) -> &'static str {
        "ETH"
    }

    pub fn default_rpc_url(self) -> &'static str {
        match self {
            Network::Sepolia => "https://rpc.sepolia.org",
            Network::Hardhat => "http://127.0.0.1:8545",
        }
    }

    /// Whether this is a local chain that only exists on a developer machine.
    pub fn is_local(self) -> bool {
        matches!(self, Network::Hardhat)
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.chain_id())
    }
}

/// Interpret a boolean-like environment value. Anything but `true` is off.
pub fn flag_enabled(value: Option<&str>) -> bool {
    value == Some("true")
}

/// The single network the client activates.
///
/// `enable_testnets` only makes the development network *available*; it never changes which
/// network is activated.
pub fn select_network(enable_testnets: bool) -> Network {
    let _ = enable_testnets;
    Network::PRIMARY
}

/// Immutable wallet connectivity configuration.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    app_name: String,
    project_id: String,
    network: Network,
    rpc_url: Url,
    testnets_enabled: bool,
}

impl ClientConfig {
    pub fn new(project_id: Option<String>, enable_testnets: bool) -> Result<Self, ConfigError> {
        let project_id = project_id
            .map(|id| id.trim().to_string())
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::MissingProjectId {
                var: PROJECT_ID_VAR,
            })?;
        let network = select_network(enable_testnets);
        Ok(Self {
            app_name: DEFAULT_APP_NAME.to_string(),
            project_id,
            network,
            rpc_url: parse_rpc_url(network.default_rpc_url())?,
            testnets_enabled: enable_testnets,
        })
    }

    /// Read the configuration from the environment. Called once at startup.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::new(
            env::var(PROJECT_ID_VAR).ok(),
            flag_enabled(env::var(ENABLE_TESTNETS_VAR).ok().as_deref()),
        )?;
        match env::var(RPC_URL_VAR) {
            Ok(url) => config.with_rpc_url(&url),
            Err(_) => Ok(config),
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = app_name.into();
        self
    }

    pub fn with_rpc_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.rpc_url = parse_rpc_url(url)?;
        Ok(self)
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// The networks the client may connect to. Always exactly one.
    pub fn chains(&self) -> &[Network] {
        std::slice::from_ref(&self.network)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn rpc_url(&self) -> &Url {
        &self.rpc_url
    }

    /// The testnet flag as it was read at startup.
    pub fn testnets_enabled(&self) -> bool {
        self.testnets_enabled
    }

    pub fn supports(&self, network: Network) -> bool {
        self.chains().contains(&network)
    }
}

fn parse_rpc_url(url: &str) -> Result<Url, ConfigError> {
    Url::parse(url).map_err(|err| ConfigError::InvalidRpcUrl {
        url: url.to_string(),
        msg: err.to_string(),
    })
}
