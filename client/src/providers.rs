// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The composition root of the client.
//!
//! [Providers] owns the connectivity configuration, the query client and the connect UI state.
//! The application's startup routine builds it once, then wraps its UI tree with
//! [Providers::wrap]. Everything inside the tree sees the three scopes through a [Context], nested
//! outer to inner as listed in [SCOPES].

use crate::config::{ClientConfig, ConfigError, ContractRecordSnafu};
use crate::connect::{ConnectUi, Theme};
use crate::query::QueryClient;
use snafu::ResultExt;
use std::path::Path;
use std::sync::Arc;
use todo_contracts::{ContractAddress, DeploymentRecord};
use tracing::{event, Level};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    Connectivity,
    QueryCache,
    ConnectUi,
}

/// Scopes applied around the children, outermost first.
pub const SCOPES: [Scope; 3] = [Scope::Connectivity, Scope::QueryCache, Scope::ConnectUi];

pub struct Providers {
    config: Arc<ClientConfig>,
    query_client: Arc<QueryClient>,
    connect_ui: Arc<ConnectUi>,
    contracts: Arc<DeploymentRecord>,
}

impl Providers {
    pub fn new(config: ClientConfig, query_client: QueryClient) -> Self {
        event!(
            Level::INFO,
            "{} configured for {} (testnets flag: {})",
            config.app_name(),
            config.network(),
            config.testnets_enabled()
        );
        let config = Arc::new(config);
        Self {
            connect_ui: Arc::new(ConnectUi::new(config.clone())),
            config,
            query_client: Arc::new(query_client),
            contracts: Default::default(),
        }
    }

    /// Build the providers from the environment with a default query client.
    ///
    /// Fails before anything can be composed if the WalletConnect project id is not set.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::new(ClientConfig::from_env()?, QueryClient::new()))
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.connect_ui = Arc::new(ConnectUi::new(self.config.clone()).with_theme(theme));
        self
    }

    /// Load the addresses published by the deployer.
    pub fn with_contracts(mut self, path: &Path) -> Result<Self, ConfigError> {
        let record = DeploymentRecord::load(path).context(ContractRecordSnafu)?;
        event!(
            Level::INFO,
            "loaded {} contract address(es) from {}",
            record.len(),
            path.display()
        );
        self.contracts = Arc::new(record);
        Ok(self)
    }

    pub fn config(&self) -> &Arc<ClientConfig> {
        &self.config
    }

    pub fn query_client(&self) -> &Arc<QueryClient> {
        &self.query_client
    }

    pub fn connect_ui(&self) -> &Arc<ConnectUi> {
        &self.connect_ui
    }

    /// Wrap `children` in the connectivity, query cache and connect UI scopes.
    pub fn wrap<C>(&self, children: C) -> ProviderTree<C> {
        ProviderTree {
            config: self.config.clone(),
            query_client: self.query_client.clone(),
            connect_ui: self.connect_ui.clone(),
            contracts: self.contracts.clone(),
            children,
        }
    }
}

/// A UI subtree with the provider scopes applied.
pub struct ProviderTree<C> {
    config: Arc<ClientConfig>,
    query_client: Arc<QueryClient>,
    connect_ui: Arc<ConnectUi>,
    contracts: Arc<DeploymentRecord>,
    children: C,
}

impl<C> ProviderTree<C> {
    pub fn scopes(&self) -> &'static [Scope] {
        &SCOPES
    }

    pub fn context(&self) -> Context<'_> {
        Context {
            config: &self.config,
            query_client: &self.query_client,
            connect_ui: &self.connect_ui,
            contracts: &self.contracts,
        }
    }

    /// Hand the children to `render` together with the context of the enclosing scopes.
    pub fn render<R>(&self, render: impl FnOnce(&Context<'_>, &C) -> R) -> R {
        render(&self.context(), &self.children)
    }

    pub fn children(&self) -> &C {
        &self.children
    }

    pub fn into_children(self) -> C {
        self.children
    }
}

/// What a descendant of the providers can reach.
#[derive(Clone, Copy)]
pub struct Context<'a> {
    config: &'a ClientConfig,
    query_client: &'a QueryClient,
    connect_ui: &'a ConnectUi,
    contracts: &'a DeploymentRecord,
}

impl<'a> Context<'a> {
    pub fn config(&self) -> &'a ClientConfig {
        self.config
    }

    pub fn query_client(&self) -> &'a QueryClient {
        self.query_client
    }

    pub fn connect_ui(&self) -> &'a ConnectUi {
        self.connect_ui
    }

    pub fn contract_address(&self, name: &str) -> Result<&'a ContractAddress, ConfigError> {
        self.contracts
            .address(name)
            .ok_or_else(|| ConfigError::MissingContract {
                name: name.to_string(),
            })
    }
}
