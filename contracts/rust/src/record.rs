// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! The deployment record shared between the deployer and the client.
//!
//! On disk this is a JSON object mapping contract names to addresses, e.g.
//! ```text
//! {
//!   "Todo": "0x5FbDB2315678afecb367f032d93F642f64180aa3"
//! }
//! ```
//! The deployer overwrites the whole file on every run; nothing from a previous run is kept.

use crate::deploy::{
    CreateDirSnafu, DeployError, ParseRecordSnafu, ReadRecordSnafu, SerializeSnafu,
    WriteRecordSnafu,
};
use ethers::types::Address;
use ethers::utils::to_checksum;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// Address of a deployed contract, as published to the client.
///
/// Addresses produced by a real deployment are EIP-55 checksummed. The string is kept verbatim so
/// that the published file contains exactly what the deployer reported.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContractAddress(String);

impl ContractAddress {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse into an Ethereum address, if this is a well-formed one.
    pub fn to_address(&self) -> Option<Address> {
        self.0.parse().ok()
    }
}

impl From<Address> for ContractAddress {
    fn from(address: Address) -> Self {
        Self(to_checksum(&address, None))
    }
}

impl From<&str> for ContractAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

impl From<String> for ContractAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

impl fmt::Display for ContractAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Mapping from contract name to deployed address.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeploymentRecord(BTreeMap<String, ContractAddress>);

impl DeploymentRecord {
    /// A record holding exactly one contract.
    pub fn single(name: impl Into<String>, address: ContractAddress) -> Self {
        let mut record = Self::default();
        record.insert(name, address);
        record
    }

    pub fn insert(&mut self, name: impl Into<String>, address: ContractAddress) {
        self.0.insert(name.into(), address);
    }

    pub fn address(&self, name: &str) -> Option<&ContractAddress> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContractAddress)> {
        self.0.iter().map(|(name, address)| (name.as_str(), address))
    }

    /// Pretty-printed JSON with 2-space indentation.
    pub fn to_json(&self) -> Result<String, DeployError> {
        serde_json::to_string_pretty(self).context(SerializeSnafu)
    }

    /// Write the record to `path`, replacing whatever was there.
    ///
    /// The parent directory is created if it does not exist yet. Other files in that directory are
    /// never touched.
    pub fn publish(&self, path: &Path) -> Result<(), DeployError> {
        // Serialize first so a bad record never truncates an existing file.
        let json = self.to_json()?;
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir).context(CreateDirSnafu { path: dir })?;
            }
        }
        fs::write(path, json).context(WriteRecordSnafu { path })
    }

    /// Read a record previously written by [DeploymentRecord::publish].
    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let contents = fs::read_to_string(path).context(ReadRecordSnafu { path })?;
        serde_json::from_str(&contents).context(ParseRecordSnafu { path })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use tempdir::TempDir;

    #[test]
    fn test_json_layout() {
        let record = DeploymentRecord::single("Todo", "0xABC123".into());
        assert_eq!(record.to_json().unwrap(), "{\n  \"Todo\": \"0xABC123\"\n}");
    }

    #[test]
    fn test_address_is_checksummed() {
        let address: Address = "0x5fbdb2315678afecb367f032d93f642f64180aa3"
            .parse()
            .unwrap();
        let published = ContractAddress::from(address);
        assert_eq!(
            published.as_str(),
            "0x5FbDB2315678afecb367f032d93F642f64180aa3"
        );
        assert_eq!(published.to_address(), Some(address));
        assert_eq!(ContractAddress::from("0xABC123").to_address(), None);
    }

    #[test]
    fn test_publish_then_load() {
        let dir = TempDir::new("todo_record").unwrap();
        let path = dir.path().join("constants").join("contracts-address.json");

        let record = DeploymentRecord::single(
            "Todo",
            "0x5FbDB2315678afecb367f032d93F642f64180aa3".into(),
        );
        record.publish(&path).unwrap();

        let loaded = DeploymentRecord::load(&path).unwrap();
        assert_eq!(loaded, record);
        assert_eq!(
            loaded.address("Todo").map(ContractAddress::as_str),
            Some("0x5FbDB2315678afecb367f032d93F642f64180aa3")
        );
        assert!(loaded.address("Counter").is_none());
    }

    #[test]
    fn test_load_missing_file() {
        let dir = TempDir::new("todo_record").unwrap();
        match DeploymentRecord::load(&dir.path().join("missing.json")) {
            Err(DeployError::ReadRecord { .. }) => {}
            res => panic!("expected read error, got {:?}", res),
        }
    }

    #[test]
    fn test_load_malformed_file() {
        let dir = TempDir::new("todo_record").unwrap();
        let path = dir.path().join("contracts-address.json");
        fs::write(&path, "[\"Todo\"]").unwrap();
        match DeploymentRecord::load(&path) {
            Err(err @ DeployError::ParseRecord { .. }) => {
                assert!(err.to_string().contains("contracts-address.json"), "{}", err)
            }
            res => panic!("expected parse error, got {:?}", res),
        }
    }
}
