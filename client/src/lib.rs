// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Todo client
//!
//! Composition root for the Todo client. The startup routine reads a [ClientConfig] from the
//! environment, builds one [QueryClient], and hands both to [Providers], which wraps the UI tree in
//! the connectivity, query cache and connect UI scopes.

pub mod config;
pub mod connect;
pub mod providers;
pub mod query;

pub use config::{select_network, ClientConfig, ConfigError, Network};
pub use connect::{ConnectError, ConnectUi, ConnectionStatus, Theme};
pub use providers::{Context, ProviderTree, Providers, Scope};
pub use query::{QueryClient, QueryError, QueryKey};
