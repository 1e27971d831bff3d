//! Two-pass fee balancing
//!
//! The fee is computed once, from a body built out of the fee-free draft,
//! then subtracted from the fee-paying output. The second body carries the
//! final fee and is the one that gets signed and submitted. The fee is not
//! re-derived from the second body; the two bodies differ only in the
//! encoded integers, which can shift the size by a few bytes at encoding
//! boundaries.

use crate::draft::{OutputRole, TxDraft};
use crate::toolchain::{LedgerToolchain, TxId};
use crate::utxo::SigningKeyRef;
use crate::value::unsigned;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Default upper bound for a computed fee (2 ADA)
pub const DEFAULT_MAX_FEE: u64 = 2_000_000;

/// A submitted transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    /// Transaction id returned by the node
    pub tx_id: TxId,
    /// Fee paid
    pub fee: u64,
    /// Final draft
    pub draft: TxDraft,
}

/// Drives a draft through costing, signing and submission
pub struct DraftBuilder<'a, T: ?Sized> {
    toolchain: &'a T,
    max_fee: u64,
}

impl<'a, T: LedgerToolchain + ?Sized> DraftBuilder<'a, T> {
    /// Create a builder over a toolchain
    pub fn new(toolchain: &'a T) -> Self {
        Self {
            toolchain,
            max_fee: DEFAULT_MAX_FEE,
        }
    }

    /// Set the fee safety limit
    pub fn with_max_fee(mut self, max_fee: u64) -> Self {
        self.max_fee = max_fee;
        self
    }

    /// Validate a computed fee against the safety limit
    pub fn validate_fee(&self, fee: u64) -> Result<()> {
        if fee == 0 {
            return Err(Error::FeeCalculation("toolchain returned a zero fee".to_string()));
        }
        if fee > self.max_fee {
            return Err(Error::FeeCalculation(format!(
                "fee {} exceeds maximum {}",
                fee, self.max_fee
            )));
        }
        Ok(())
    }

    /// Conservation and output-shape audit
    pub fn audit(&self, draft: &TxDraft) -> Result<()> {
        draft.check_balance()?;
        draft.check_outputs()
    }

    /// Every oracle-priced output must meet the oracle minimum
    pub fn check_minimum_outputs(&self, draft: &TxDraft) -> Result<()> {
        for (index, output) in draft.tx_out.iter().enumerate() {
            if output.role != OutputRole::Payment {
                continue;
            }
            let minimum = self
                .toolchain
                .minimum_lovelace(&output.address, &output.value)?;
            let carried = unsigned(output.value.lovelace())?;
            if carried < minimum {
                return Err(Error::BelowMinimumOutput(format!(
                    "output #{} to {} carries {} lovelace, minimum is {}",
                    index, output.address, carried, minimum
                )));
            }
        }
        Ok(())
    }

    /// Pass one: cost the fee-free draft and return the rebalanced draft
    pub fn prepare(&self, draft: TxDraft) -> Result<TxDraft> {
        if draft.fee != 0 {
            return Err(Error::FeeCalculation(
                "fee must be computed from a fee-free draft".to_string(),
            ));
        }
        self.audit(&draft)?;

        let body = self.toolchain.build_body(&draft)?;
        let fee = self.toolchain.minimum_fee(&draft, &body)?;
        self.validate_fee(fee)?;
        tracing::debug!(
            "Fee {} for {} inputs, {} outputs, {} witnesses",
            fee,
            draft.tx_in.len(),
            draft.tx_out.len(),
            draft.witness_count
        );

        let balanced = draft.rebalance(fee)?;
        self.audit(&balanced)?;
        self.check_minimum_outputs(&balanced)?;
        Ok(balanced)
    }

    /// Both passes, then sign and submit
    pub fn submit(&self, draft: TxDraft, signers: &[SigningKeyRef]) -> Result<Submission> {
        if signers.len() != draft.witness_count {
            return Err(Error::TransactionSigning(format!(
                "draft declares {} witnesses but {} keys were given",
                draft.witness_count,
                signers.len()
            )));
        }

        let balanced = self.prepare(draft)?;
        let body = self.toolchain.build_body(&balanced)?;
        let signed = self.toolchain.sign(&body, signers)?;
        let tx_id = self.toolchain.submit(&signed)?;

        tracing::info!(
            "Submitted {} (fee {}, {} inputs, {} outputs)",
            tx_id,
            balanced.fee,
            balanced.tx_in.len(),
            balanced.tx_out.len()
        );

        Ok(Submission {
            tx_id,
            fee: balanced.fee,
            draft: balanced,
        })
    }
}
