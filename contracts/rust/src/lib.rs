// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Todo contract deployment
//!
//! Deploys a compiled contract to an Ethereum node and publishes the resulting address as a small
//! JSON document that the Todo client reads at startup. The deployment procedure itself lives in
//! [deploy]; [ethereum] provides the ethers-backed signer and contract factory it runs against.

pub mod assertion;
pub mod deploy;
pub mod ethereum;
pub mod record;

pub use deploy::{
    default_artifacts_dir, default_record_path, deploy_and_publish, exit_code, DeployError,
    DeployReport,
};
pub use record::{ContractAddress, DeploymentRecord};
