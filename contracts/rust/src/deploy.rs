// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! One-shot deployment of a named contract.
//!
//! [deploy_and_publish] runs the whole procedure against any [DeployEnvironment]:
//!
//! 1. acquire the signer that pays for the deployment,
//! 2. resolve the contract factory from the compiled artifacts,
//! 3. submit the deployment and wait for it to be confirmed,
//! 4. publish `{ <name>: <address> }` to the deployment record file.
//!
//! Every step is fatal. Nothing is retried and nothing is rolled back, so a failure while writing
//! the record leaves a deployed contract whose address was only logged.

use crate::record::{ContractAddress, DeploymentRecord};
use async_trait::async_trait;
use ethers::types::Address;
use snafu::Snafu;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{event, Level};

pub const DEFAULT_CONTRACT_NAME: &str = "Todo";

/// Hardhat output for the contract sources of the `contracts/` project.
pub fn default_artifacts_dir() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.push("artifacts/contracts");
    path
}

/// The deployment record read by the client at startup.
pub fn default_record_path() -> PathBuf {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.pop();
    path.pop();
    path.push("client/src/constants/contracts-address.json");
    path
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum DeployError {
    #[snafu(display("no signer available: {}", msg))]
    NoSigner { msg: String },

    #[snafu(display("error talking to the Ethereum node: {}", msg))]
    Provider { msg: String },

    #[snafu(display(
        "no compiled artifact for contract {} under {}",
        name,
        artifacts.display()
    ))]
    UnknownContract { name: String, artifacts: PathBuf },

    #[snafu(display(
        "contract {} is defined in more than one source file: {}",
        name,
        candidates
            .iter()
            .map(|path| path.display().to_string())
            .collect::<Vec<_>>()
            .join(", ")
    ))]
    AmbiguousContract {
        name: String,
        candidates: Vec<PathBuf>,
    },

    #[snafu(display("malformed contract artifact {}: {}", path.display(), msg))]
    Artifact { path: PathBuf, msg: String },

    #[snafu(display("deployment transaction failed: {}", msg))]
    Deployment { msg: String },

    #[snafu(display("deployment transaction was not confirmed: {}", msg))]
    NotConfirmed { msg: String },

    #[snafu(display("failed to create directory {}: {}", path.display(), source))]
    CreateDir { path: PathBuf, source: io::Error },

    #[snafu(display("failed to write deployment record {}: {}", path.display(), source))]
    WriteRecord { path: PathBuf, source: io::Error },

    #[snafu(display("failed to read deployment record {}: {}", path.display(), source))]
    ReadRecord { path: PathBuf, source: io::Error },

    #[snafu(display("malformed deployment record {}: {}", path.display(), source))]
    ParseRecord {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("cannot serialize deployment record: {}", source))]
    Serialize { source: serde_json::Error },
}

/// The identity that signs and pays for a deployment.
pub trait DeploySigner: Send + Sync {
    fn address(&self) -> Address;
}

/// A deployable contract.
#[async_trait]
pub trait ContractFactory: Send {
    /// Submit the deployment transaction and wait until it is confirmed.
    ///
    /// There is no timeout: this only returns once the node reports the contract as mined, or
    /// fails.
    async fn deploy(self) -> Result<ContractAddress, DeployError>;
}

/// Everything a deployment needs from the outside world.
#[async_trait]
pub trait DeployEnvironment: Sync {
    type Signer: DeploySigner;
    type Factory: ContractFactory;

    async fn signer(&self) -> Result<Self::Signer, DeployError>;

    /// Resolve the factory for `contract_name`, bound to `signer`.
    fn factory(
        &self,
        signer: Self::Signer,
        contract_name: &str,
    ) -> Result<Self::Factory, DeployError>;
}

/// Outcome of a successful [deploy_and_publish].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployReport {
    pub deployer: Address,
    pub contract_name: String,
    pub address: ContractAddress,
    pub record_path: PathBuf,
}

/// Deploy `contract_name` and publish its address to `record_path`.
///
/// The record file is only written once the deployment is confirmed, and it is replaced in full.
pub async fn deploy_and_publish<E: DeployEnvironment>(
    env: &E,
    contract_name: &str,
    record_path: &Path,
) -> Result<DeployReport, DeployError> {
    let signer = env.signer().await?;
    let deployer = signer.address();
    event!(
        Level::INFO,
        "Deploying contracts with the account: {:?}",
        deployer
    );

    let factory = env.factory(signer, contract_name)?;
    let address = factory.deploy().await?;
    event!(
        Level::INFO,
        "{} contract deployed to: {}",
        contract_name,
        address
    );

    DeploymentRecord::single(contract_name, address.clone()).publish(record_path)?;
    event!(
        Level::INFO,
        "wrote deployment record {}",
        record_path.display()
    );

    Ok(DeployReport {
        deployer,
        contract_name: contract_name.to_string(),
        address,
        record_path: record_path.to_path_buf(),
    })
}

/// Process exit status for the outcome of a deployment run.
pub fn exit_code<T>(result: &Result<T, DeployError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}
