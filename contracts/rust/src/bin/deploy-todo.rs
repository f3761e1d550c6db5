// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! # Todo deployer
//!
//! Deploys the Todo contract and writes its address to the file the client reads at startup.
//!
//! ```
//! cargo run --release --bin deploy-todo -- --rpc-url http://localhost:8545
//! ```
//!
//! Unless overridden, artifacts are read from `contracts/artifacts/contracts` and the address is
//! written to `client/src/constants/contracts-address.json`, both relative to this workspace, so
//! the result does not depend on the working directory.
//!
//! Exits with status 0 once the address has been published, and with status 1 (after printing the
//! error) if any step fails.

use std::path::PathBuf;
use structopt::StructOpt;
use todo_contracts::{
    default_artifacts_dir, default_record_path, deploy_and_publish, ethereum::EthEnvironment,
    exit_code,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "Todo Deployer",
    about = "Deploys a compiled contract and publishes its address for the Todo client"
)]
struct DeployOptions {
    /// URL for Ethers provider
    #[structopt(
        short = "u",
        long = "rpc-url",
        env = "RPC_URL",
        default_value = "http://localhost:8545"
    )]
    rpc_url: String,

    /// Mnemonic phrase for the deployer wallet.
    ///
    /// If not provided, the contract is deployed from the node's first unlocked account.
    #[structopt(long, env = "MNEMONIC", hide_env_values = true)]
    mnemonic: Option<String>,

    /// Directory containing the Hardhat artifacts of the compiled contracts.
    ///
    /// Defaults to `contracts/artifacts/contracts` in this workspace.
    #[structopt(long, env = "TODO_ARTIFACTS_DIR")]
    artifacts: Option<PathBuf>,

    /// Name of the contract to deploy.
    #[structopt(long, env = "TODO_CONTRACT_NAME", default_value = "Todo")]
    contract: String,

    /// Where to publish the deployed address.
    ///
    /// Defaults to the client's `src/constants/contracts-address.json` in this workspace.
    #[structopt(long, env = "TODO_ADDRESS_FILE")]
    out: Option<PathBuf>,

    /// Send legacy (pre-EIP-1559) transactions.
    #[structopt(long)]
    legacy: bool,
}

impl DeployOptions {
    fn artifacts(&self) -> PathBuf {
        self.artifacts.clone().unwrap_or_else(default_artifacts_dir)
    }

    fn out(&self) -> PathBuf {
        self.out.clone().unwrap_or_else(default_record_path)
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let opt = DeployOptions::from_args();
    let out = opt.out();
    let env = EthEnvironment::new(&opt.rpc_url, opt.artifacts())
        .with_mnemonic(opt.mnemonic)
        .with_legacy_transactions(opt.legacy);

    let result = deploy_and_publish(&env, &opt.contract, &out).await;
    if let Err(err) = &result {
        eprintln!("{}", err);
    }
    std::process::exit(exit_code(&result));
}
