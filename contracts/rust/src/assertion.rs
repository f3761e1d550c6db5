// Copyright (c) 2022 Espresso Systems (espressosys.com)
// This file is part of the Configurable Asset Privacy for Ethereum (CAPE) library.
//
// This program is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License as published by the Free Software Foundation, either version 3 of the License, or (at your option) any later version.
// This program is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
// You should have received a copy of the GNU General Public License along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Confirmation checks for mined transactions.
use crate::deploy::DeployError;
use ethers::types::{TransactionReceipt, U64};

pub trait EnsureMined {
    /// Fail unless the transaction was mined and executed successfully.
    fn ensure_mined(self) -> Result<TransactionReceipt, DeployError>;
}

impl EnsureMined for TransactionReceipt {
    fn ensure_mined(self) -> Result<TransactionReceipt, DeployError> {
        match self.status {
            Some(status) if status == U64::from(1) => Ok(self),
            Some(_) => Err(DeployError::NotConfirmed {
                msg: format!("transaction {:?} reverted", self.transaction_hash),
            }),
            None => Err(DeployError::NotConfirmed {
                msg: format!("transaction {:?} has no status", self.transaction_hash),
            }),
        }
    }
}

impl EnsureMined for Option<TransactionReceipt> {
    fn ensure_mined(self) -> Result<TransactionReceipt, DeployError> {
        // A finalized transaction without a receipt was dropped or replaced.
        self.ok_or_else(|| DeployError::NotConfirmed {
            msg: "no receipt for transaction".to_string(),
        })?
        .ensure_mined()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn receipt(status: Option<u64>) -> TransactionReceipt {
        TransactionReceipt {
            status: status.map(U64::from),
            ..Default::default()
        }
    }

    #[test]
    fn test_successful_receipt() {
        assert!(receipt(Some(1)).ensure_mined().is_ok());
        assert!(Some(receipt(Some(1))).ensure_mined().is_ok());
    }

    #[test]
    fn test_reverted_or_missing_receipt() {
        assert!(matches!(
            receipt(Some(0)).ensure_mined(),
            Err(DeployError::NotConfirmed { .. })
        ));
        assert!(matches!(
            receipt(None).ensure_mined(),
            Err(DeployError::NotConfirmed { .. })
        ));
        assert!(matches!(
            None::<TransactionReceipt>.ensure_mined(),
            Err(DeployError::NotConfirmed { .. })
        ));
    }
}
