// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Connection state behind the wallet connect button.

use crate::config::{ClientConfig, Network};
use async_std::sync::RwLock;
use ethers::types::Address;
use serde::{Deserialize, Serialize};
use snafu::Snafu;
use std::sync::Arc;
use tracing::{event, Level};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Auto,
    Light,
    Dark,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    Connected { account: Address, network: Network },
}

#[derive(Debug, Snafu)]
pub enum ConnectError {
    #[snafu(display("{} is not one of the configured networks", network))]
    UnsupportedNetwork { network: Network },
}

pub struct ConnectUi {
    config: Arc<ClientConfig>,
    theme: Theme,
    status: RwLock<ConnectionStatus>,
}

impl ConnectUi {
    pub fn new(config: Arc<ClientConfig>) -> Self {
        Self {
            config,
            theme: Theme::default(),
            status: RwLock::new(ConnectionStatus::Disconnected),
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub async fn status(&self) -> ConnectionStatus {
        self.status.read().await.clone()
    }

    pub async fn is_connected(&self) -> bool {
        matches!(
            *self.status.read().await,
            ConnectionStatus::Connected { .. }
        )
    }

    /// Record a wallet connection. Fails if the wallet is on a network the client is not
    /// configured for.
    pub async fn connect(&self, account: Address, network: Network) -> Result<(), ConnectError> {
        if !self.config.supports(network) {
            event!(
                Level::WARN,
                "refusing connection from {:?} on {}",
                account,
                network
            );
            return Err(ConnectError::UnsupportedNetwork { network });
        }
        *self.status.write().await = ConnectionStatus::Connected { account, network };
        event!(Level::INFO, "connected {:?} on {}", account, network);
        Ok(())
    }

    pub async fn disconnect(&self) {
        *self.status.write().await = ConnectionStatus::Disconnected;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn connect_ui() -> ConnectUi {
        let config = ClientConfig::new(Some("todo-project".to_string()), true).unwrap();
        ConnectUi::new(Arc::new(config))
    }

    #[async_std::test]
    async fn test_connect_and_disconnect() {
        let ui = connect_ui();
        let account = Address::from_low_u64_be(7);
        assert_eq!(ui.status().await, ConnectionStatus::Disconnected);

        ui.connect(account, Network::Sepolia).await.unwrap();
        assert!(ui.is_connected().await);
        assert_eq!(
            ui.status().await,
            ConnectionStatus::Connected {
                account,
                network: Network::Sepolia
            }
        );

        ui.disconnect().await;
        assert!(!ui.is_connected().await);
    }

    #[async_std::test]
    async fn test_development_network_is_refused_even_with_testnets() {
        let ui = connect_ui();
        match ui.connect(Address::from_low_u64_be(7), Network::Hardhat).await {
            Err(ConnectError::UnsupportedNetwork { network }) => {
                assert_eq!(network, Network::Hardhat)
            }
            res => panic!("expected unsupported network, got {:?}", res),
        }
        assert_eq!(ui.status().await, ConnectionStatus::Disconnected);
    }

    #[test]
    fn test_theme() {
        assert_eq!(connect_ui().theme(), Theme::Auto);
        assert_eq!(connect_ui().with_theme(Theme::Dark).theme(), Theme::Dark);
    }
}
