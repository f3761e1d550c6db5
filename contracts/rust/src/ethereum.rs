// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

use crate::assertion::EnsureMined;
use crate::deploy::{ContractFactory, DeployEnvironment, DeployError, DeploySigner};
use crate::record::ContractAddress;
use async_trait::async_trait;
use ethers::{
    abi::Abi,
    contract::ContractFactory as EthContractFactory,
    core::k256::ecdsa::SigningKey,
    middleware::SignerMiddleware,
    providers::{Http, Middleware, Provider},
    signers::{coins_bip39::English, MnemonicBuilder, Signer, Wallet},
    types::{Address, Bytes},
};
use glob::{glob, Pattern};
use serde::Deserialize;
use std::{
    convert::TryFrom,
    fmt::Display,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tracing::{event, Level};

// Middleware used for locally signing transactions
pub type EthMiddleware = SignerMiddleware<Provider<Http>, Wallet<SigningKey>>;

fn provider_error(err: impl Display) -> DeployError {
    DeployError::Provider {
        msg: err.to_string(),
    }
}

fn deployment_error(err: impl Display) -> DeployError {
    DeployError::Deployment {
        msg: err.to_string(),
    }
}

pub fn get_provider(rpc_url: &str) -> Result<Provider<Http>, DeployError> {
    Provider::<Http>::try_from(rpc_url).map_err(provider_error)
}

/// The account a deployment is sent from.
#[derive(Clone, Debug)]
pub enum EthDeployer {
    /// A wallet derived from a mnemonic. Transactions are signed locally.
    Wallet(Arc<EthMiddleware>),
    /// An account unlocked on the node. The node signs, and `client` sends from `account` by
    /// default.
    Node {
        client: Arc<Provider<Http>>,
        account: Address,
    },
}

impl DeploySigner for EthDeployer {
    fn address(&self) -> Address {
        match self {
            Self::Wallet(client) => client.address(),
            Self::Node { account, .. } => *account,
        }
    }
}

/// Connect to `rpc_url` and return the account that deploys.
///
/// With a mnemonic the deployer is the first account derived from it. Without one, the deployer is
/// the first account the node has unlocked, as for a Hardhat or Anvil development node.
pub async fn get_deployer(
    rpc_url: &str,
    mnemonic: Option<&str>,
) -> Result<EthDeployer, DeployError> {
    let provider = get_provider(rpc_url)?;
    match mnemonic {
        Some(phrase) => {
            let chain_id = provider
                .get_chainid()
                .await
                .map_err(provider_error)?
                .as_u64();
            let wallet = MnemonicBuilder::<English>::default()
                .phrase(phrase)
                .build()
                .map_err(|err| DeployError::NoSigner {
                    msg: format!("could not open deployer wallet: {}", err),
                })?
                .with_chain_id(chain_id);
            Ok(EthDeployer::Wallet(Arc::new(SignerMiddleware::new(
                provider, wallet,
            ))))
        }
        None => {
            let accounts = provider.get_accounts().await.map_err(provider_error)?;
            let account = *accounts.first().ok_or_else(|| DeployError::NoSigner {
                msg: "no mnemonic configured and the node has no unlocked accounts".to_string(),
            })?;
            event!(Level::DEBUG, "using unlocked node account {:?}", account);

            // Set a lower polling interval to avoid very slow local deployments
            let client = provider
                .interval(Duration::from_millis(100u64))
                .with_sender(account);
            Ok(EthDeployer::Node {
                client: Arc::new(client),
                account,
            })
        }
    }
}

#[derive(Deserialize)]
struct HardhatArtifact {
    abi: Abi,
    bytecode: String,
}

/// Where Hardhat puts the artifact of `contract_name` when it lives in `<contract_name>.sol`.
pub fn artifact_path(artifacts: &Path, contract_name: &str) -> PathBuf {
    artifacts
        .join(format!("{}.sol", contract_name))
        .join(format!("{}.json", contract_name))
}

/// Locate the artifact for `contract_name`.
///
/// Contracts defined in a source file with a different name, or in a subdirectory, are found too.
/// A name defined by more than one source file is rejected rather than picking one of them.
pub fn find_artifact(artifacts: &Path, contract_name: &str) -> Result<PathBuf, DeployError> {
    let path = artifact_path(artifacts, contract_name);
    if path.is_file() {
        return Ok(path);
    }

    let unknown = || DeployError::UnknownContract {
        name: contract_name.to_string(),
        artifacts: artifacts.to_path_buf(),
    };
    let root = artifacts.to_str().ok_or_else(unknown)?;
    let pattern = format!(
        "{}/**/*.sol/{}.json",
        Pattern::escape(root),
        Pattern::escape(contract_name)
    );
    let mut candidates = glob(&pattern)
        .map_err(|_| unknown())?
        .filter_map(Result::ok)
        .filter(|path| path.is_file())
        .collect::<Vec<_>>();
    candidates.sort();

    match candidates.len() {
        0 => Err(unknown()),
        1 => Ok(candidates.remove(0)),
        _ => Err(DeployError::AmbiguousContract {
            name: contract_name.to_string(),
            candidates,
        }),
    }
}

/// Read the ABI and creation bytecode from a Hardhat artifact.
pub fn load_contract(path: &Path) -> Result<(Abi, Bytes), DeployError> {
    let artifact_error = |msg: String| DeployError::Artifact {
        path: path.to_path_buf(),
        msg,
    };

    let contents = fs::read_to_string(path).map_err(|err| artifact_error(err.to_string()))?;
    let artifact: HardhatArtifact =
        serde_json::from_str(&contents).map_err(|err| artifact_error(err.to_string()))?;

    let trimmed = artifact.bytecode.trim().trim_start_matches("0x");
    if trimmed.is_empty() {
        return Err(artifact_error(
            "no bytecode, the contract is abstract or an interface".to_string(),
        ));
    }
    let bytecode = hex::decode(trimmed)
        .map_err(|err| artifact_error(format!("cannot parse bytecode: {}", err)))?
        .into();

    Ok((artifact.abi, bytecode))
}

/// Deploys Hardhat-compiled contracts through an Ethereum JSON-RPC node.
#[derive(Clone, Debug)]
pub struct EthEnvironment {
    rpc_url: String,
    mnemonic: Option<String>,
    artifacts: PathBuf,
    legacy: bool,
}

impl EthEnvironment {
    pub fn new(rpc_url: impl Into<String>, artifacts: impl Into<PathBuf>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            mnemonic: None,
            artifacts: artifacts.into(),
            legacy: false,
        }
    }

    pub fn with_mnemonic(mut self, mnemonic: Option<String>) -> Self {
        self.mnemonic = mnemonic;
        self
    }

    /// Send pre-EIP-1559 transactions, for nodes whose fee estimation is unreliable.
    pub fn with_legacy_transactions(mut self, legacy: bool) -> Self {
        self.legacy = legacy;
        self
    }
}

#[async_trait]
impl DeployEnvironment for EthEnvironment {
    type Signer = EthDeployer;
    type Factory = EthFactory;

    async fn signer(&self) -> Result<Self::Signer, DeployError> {
        get_deployer(&self.rpc_url, self.mnemonic.as_deref()).await
    }

    fn factory(
        &self,
        signer: Self::Signer,
        contract_name: &str,
    ) -> Result<Self::Factory, DeployError> {
        let path = find_artifact(&self.artifacts, contract_name)?;
        let (abi, bytecode) = load_contract(&path)?;
        let factory = match signer {
            EthDeployer::Wallet(client) => {
                DeployFactory::Wallet(EthContractFactory::new(abi, bytecode, client))
            }
            EthDeployer::Node { client, .. } => {
                DeployFactory::Node(EthContractFactory::new(abi, bytecode, client))
            }
        };
        Ok(EthFactory {
            factory,
            legacy: self.legacy,
        })
    }
}

enum DeployFactory {
    Wallet(EthContractFactory<EthMiddleware>),
    Node(EthContractFactory<Provider<Http>>),
}

pub struct EthFactory {
    factory: DeployFactory,
    legacy: bool,
}

async fn send_deployment<M: Middleware + 'static>(
    factory: EthContractFactory<M>,
    legacy: bool,
) -> Result<ContractAddress, DeployError> {
    let mut deployer = factory.deploy(()).map_err(deployment_error)?;
    if legacy {
        deployer = deployer.legacy();
    }
    let (contract, receipt) = deployer
        .send_with_receipt()
        .await
        .map_err(deployment_error)?;
    receipt.ensure_mined()?;
    Ok(contract.address().into())
}

#[async_trait]
impl ContractFactory for EthFactory {
    async fn deploy(self) -> Result<ContractAddress, DeployError> {
        match self.factory {
            DeployFactory::Wallet(factory) => send_deployment(factory, self.legacy).await,
            DeployFactory::Node(factory) => send_deployment(factory, self.legacy).await,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    // Creation code that returns TODO_RUNTIME as the deployed code.
    const TODO_ARTIFACT: &str = r#"{
  "_format": "hh-sol-artifact-1",
  "contractName": "Todo",
  "sourceName": "contracts/Todo.sol",
  "abi": [
    {
      "inputs": [{ "internalType": "string", "name": "content", "type": "string" }],
      "name": "createTask",
      "outputs": [],
      "stateMutability": "nonpayable",
      "type": "function"
    }
  ],
  "bytecode": "0x600980600b6000396000f36080604052600080fd",
  "deployedBytecode": "0x6080604052600080fd",
  "linkReferences": {},
  "deployedLinkReferences": {}
}"#;
    const TODO_BYTECODE: &str = "600980600b6000396000f36080604052600080fd";
    #[cfg_attr(not(feature = "slow-tests"), allow(dead_code))]
    const TODO_RUNTIME: &str = "6080604052600080fd";

    fn write_artifact(artifacts: &Path, source: &str, name: &str, contents: &str) -> PathBuf {
        let dir = artifacts.join(source);
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{}.json", name));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load_hardhat_artifact() {
        let dir = TempDir::new("todo_artifacts").unwrap();
        let path = write_artifact(dir.path(), "Todo.sol", "Todo", TODO_ARTIFACT);
        assert_eq!(find_artifact(dir.path(), "Todo").unwrap(), path);

        let (abi, bytecode) = load_contract(&path).unwrap();
        assert!(abi.function("createTask").is_ok());
        assert_eq!(bytecode.to_vec(), hex::decode(TODO_BYTECODE).unwrap());
    }

    #[test]
    fn test_find_artifact_in_other_source_file() {
        let dir = TempDir::new("todo_artifacts").unwrap();
        let path = write_artifact(dir.path(), "TodoList.sol", "Todo", TODO_ARTIFACT);
        assert_eq!(find_artifact(dir.path(), "Todo").unwrap(), path);
        assert!(matches!(
            find_artifact(dir.path(), "Counter"),
            Err(DeployError::UnknownContract { .. })
        ));
        assert!(matches!(
            find_artifact(&dir.path().join("missing"), "Todo"),
            Err(DeployError::UnknownContract { .. })
        ));
    }

    #[test]
    fn test_find_artifact_in_subdirectory() {
        let dir = TempDir::new("todo_artifacts").unwrap();
        let path = write_artifact(&dir.path().join("apps"), "TodoList.sol", "Todo", TODO_ARTIFACT);
        write_artifact(dir.path(), "TodoList.sol", "Task", TODO_ARTIFACT);
        assert_eq!(find_artifact(dir.path(), "Todo").unwrap(), path);
    }

    #[test]
    fn test_contract_in_two_sources_is_ambiguous() {
        let dir = TempDir::new("todo_artifacts").unwrap();
        let second = write_artifact(dir.path(), "TodoV2.sol", "Todo", TODO_ARTIFACT);
        let first = write_artifact(dir.path(), "TodoList.sol", "Todo", TODO_ARTIFACT);

        let err = find_artifact(dir.path(), "Todo").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("TodoList.sol"), "{}", msg);
        assert!(msg.contains("TodoV2.sol"), "{}", msg);
        match err {
            DeployError::AmbiguousContract { name, candidates } => {
                assert_eq!(name, "Todo");
                assert_eq!(candidates, vec![first, second]);
            }
            err => panic!("expected ambiguous contract error, got {}", err),
        }

        // The canonical location wins over the other sources.
        let canonical = write_artifact(dir.path(), "Todo.sol", "Todo", TODO_ARTIFACT);
        assert_eq!(find_artifact(dir.path(), "Todo").unwrap(), canonical);
    }

    #[test]
    fn test_reject_artifact_without_bytecode() {
        let dir = TempDir::new("todo_artifacts").unwrap();
        let path = write_artifact(
            dir.path(),
            "ITodo.sol",
            "ITodo",
            r#"{ "contractName": "ITodo", "abi": [], "bytecode": "0x" }"#,
        );
        assert!(matches!(
            load_contract(&path),
            Err(DeployError::Artifact { .. })
        ));
    }

    #[test]
    fn test_reject_malformed_bytecode() {
        let dir = TempDir::new("todo_artifacts").unwrap();
        let path = write_artifact(
            dir.path(),
            "Todo.sol",
            "Todo",
            r#"{ "contractName": "Todo", "abi": [], "bytecode": "0xzz" }"#,
        );
        match load_contract(&path) {
            Err(DeployError::Artifact { msg, .. }) => {
                assert!(msg.contains("cannot parse bytecode"), "{}", msg)
            }
            res => panic!("expected artifact error, got {:?}", res),
        }
    }

    #[test]
    fn test_unknown_contract_is_reported_before_connecting() {
        let dir = TempDir::new("todo_artifacts").unwrap();
        let env = EthEnvironment::new("http://localhost:8545", dir.path());
        let account = Address::from_low_u64_be(0xd1);
        let signer = EthDeployer::Node {
            client: Arc::new(
                get_provider("http://localhost:8545")
                    .unwrap()
                    .with_sender(account),
            ),
            account,
        };
        assert_eq!(signer.address(), account);
        match env.factory(signer, "Todo") {
            Err(DeployError::UnknownContract { name, artifacts }) => {
                assert_eq!(name, "Todo");
                assert_eq!(artifacts, dir.path());
            }
            Err(err) => panic!("expected unknown contract error, got {}", err),
            Ok(_) => panic!("expected unknown contract error"),
        }
    }

    #[test]
    fn test_bad_rpc_url() {
        assert!(matches!(
            get_provider("not a url"),
            Err(DeployError::Provider { .. })
        ));
    }

    // The tests below need a development node (Hardhat or Anvil) at RPC_URL whose unlocked
    // accounts are derived from the default development mnemonic.
    #[cfg(feature = "slow-tests")]
    mod node {
        use super::*;
        use crate::deploy::deploy_and_publish;
        use crate::record::DeploymentRecord;

        const DEV_MNEMONIC: &str = "test test test test test test test test test test test junk";

        fn rpc_url() -> String {
            std::env::var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string())
        }

        async fn deploy_todo(env: EthEnvironment, dir: &TempDir) {
            let record_path = dir.path().join("constants").join("contracts-address.json");
            let report = deploy_and_publish(&env, "Todo", &record_path)
                .await
                .unwrap();

            let provider = get_provider(&rpc_url()).unwrap();
            let accounts = provider.get_accounts().await.unwrap();
            assert_eq!(report.deployer, accounts[0]);

            let address = report.address.to_address().unwrap();
            let code = provider.get_code(address, None).await.unwrap();
            assert_eq!(code.to_vec(), hex::decode(TODO_RUNTIME).unwrap());

            let record = DeploymentRecord::load(&record_path).unwrap();
            assert_eq!(record.address("Todo"), Some(&report.address));
        }

        fn environment(dir: &TempDir) -> EthEnvironment {
            let artifacts = dir.path().join("artifacts");
            write_artifact(&artifacts, "Todo.sol", "Todo", TODO_ARTIFACT);
            EthEnvironment::new(rpc_url(), artifacts)
        }

        #[tokio::test]
        async fn test_deploy_from_unlocked_account() {
            let dir = TempDir::new("todo_deploy").unwrap();
            deploy_todo(environment(&dir), &dir).await;
        }

        #[tokio::test]
        async fn test_legacy_deploy_from_unlocked_account() {
            let dir = TempDir::new("todo_deploy").unwrap();
            deploy_todo(environment(&dir).with_legacy_transactions(true), &dir).await;
        }

        #[tokio::test]
        async fn test_deploy_from_mnemonic() {
            let dir = TempDir::new("todo_deploy").unwrap();
            let env = environment(&dir).with_mnemonic(Some(DEV_MNEMONIC.to_string()));
            deploy_todo(env, &dir).await;
        }
    }
}
