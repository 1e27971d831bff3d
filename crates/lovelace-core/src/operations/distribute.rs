//! One-to-many distributions
//!
//! All three flows put the change output first and one output per
//! recipient after it, in request order. The fee comes out of the change.

use super::{
    message_metadata, require_positive, spend_value, OperationResult, Operations, PlannedTx,
};
use crate::builder::Submission;
use crate::draft::TxOutput;
use crate::metadata::MessageMetadata;
use crate::toolchain::LedgerToolchain;
use crate::utxo::{Utxo, UtxoSelection, WalletHandle};
use crate::value::{quantity, AssetId, Value, LOVELACE};
use crate::{Error, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Recipient of a single-asset distribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecipient {
    /// Destination address
    pub address: String,
    /// Units of the distributed asset
    pub quantity: u64,
    /// Lovelace to attach instead of the oracle minimum
    #[serde(default)]
    pub lovelace: Option<u64>,
}

/// Send one asset to many addresses
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeToken {
    /// Asset to distribute
    pub asset: AssetId,
    /// Recipients, in output order
    pub recipients: Vec<TokenRecipient>,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

/// Recipient of an asset bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetRecipient {
    /// Destination address
    pub address: String,
    /// `policy.name` to quantity; the `lovelace` key overrides the oracle
    pub assets: BTreeMap<String, u64>,
}

/// Send a different asset bundle to each address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeAssets {
    /// Recipients, in output order
    pub recipients: Vec<AssetRecipient>,
    /// Spend only outputs of these transactions, plus every output that
    /// carries native assets; empty for the whole wallet
    #[serde(default)]
    pub allow_list: Vec<String>,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

/// Recipient of randomly chosen assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomRecipient {
    /// Destination address
    pub address: String,
    /// Number of distinct asset types to receive, one unit each
    pub count: usize,
}

/// Hand out randomly chosen assets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributeRandom {
    /// Recipients, in output order
    pub recipients: Vec<RandomRecipient>,
    /// Optional message
    #[serde(default)]
    pub message: Option<String>,
}

impl<T: LedgerToolchain> Operations<T> {
    /// Distribute one asset
    pub fn distribute_token(
        &self,
        wallet: &WalletHandle,
        request: &DistributeToken,
    ) -> OperationResult<Submission> {
        self.submit("distribute_token", self.draft_distribute_token(wallet, request))
    }

    /// Distribute asset bundles
    pub fn distribute_assets(
        &self,
        wallet: &WalletHandle,
        request: &DistributeAssets,
    ) -> OperationResult<Submission> {
        self.submit(
            "distribute_assets",
            self.draft_distribute_assets(wallet, request),
        )
    }

    /// Distribute random assets using the thread-local generator
    pub fn distribute_random(
        &self,
        wallet: &WalletHandle,
        request: &DistributeRandom,
    ) -> OperationResult<Submission> {
        let mut rng = rand::thread_rng();
        self.submit(
            "distribute_random",
            self.draft_distribute_random(wallet, request, &mut rng),
        )
    }

    /// Distribute random assets drawn from `rng`
    pub fn distribute_random_with<R: Rng + ?Sized>(
        &self,
        wallet: &WalletHandle,
        request: &DistributeRandom,
        rng: &mut R,
    ) -> OperationResult<Submission> {
        self.submit(
            "distribute_random",
            self.draft_distribute_random(wallet, request, rng),
        )
    }

    /// Draft a single-asset distribution
    pub fn draft_distribute_token(
        &self,
        wallet: &WalletHandle,
        request: &DistributeToken,
    ) -> Result<PlannedTx> {
        if request.asset.is_lovelace() {
            return Err(Error::InvalidAsset(
                "lovelace is sent with transfer_lovelace".to_string(),
            ));
        }
        require_recipients(request.recipients.len())?;
        for recipient in &request.recipients {
            require_positive(recipient.quantity, "distributed quantity")?;
            self.validate_recipient(&recipient.address)?;
        }
        let metadata = message_metadata(request.message.as_deref())?;

        let balance = self.balance(wallet)?;
        let inputs = UtxoSelection::All.select(&balance.utxos)?;

        let mut outputs = Vec::with_capacity(request.recipients.len());
        for recipient in &request.recipients {
            let mut tokens = Value::new();
            tokens.add(&request.asset, quantity(recipient.quantity)?)?;
            outputs.push(self.priced_output(&recipient.address, tokens, recipient.lovelace)?);
        }

        self.distribute(wallet, inputs, outputs, metadata)
    }

    /// Draft a multi-asset distribution
    pub fn draft_distribute_assets(
        &self,
        wallet: &WalletHandle,
        request: &DistributeAssets,
    ) -> Result<PlannedTx> {
        require_recipients(request.recipients.len())?;
        let mut bundles = Vec::with_capacity(request.recipients.len());
        for recipient in &request.recipients {
            self.validate_recipient(&recipient.address)?;
            bundles.push(parse_bundle(recipient)?);
        }
        let metadata = message_metadata(request.message.as_deref())?;

        let balance = self.balance(wallet)?;
        let selection = if request.allow_list.is_empty() {
            UtxoSelection::All
        } else {
            UtxoSelection::AllowList(request.allow_list.clone())
        };
        let inputs = selection.select(&balance.utxos)?;

        let mut outputs = Vec::with_capacity(bundles.len());
        for (recipient, (assets, lovelace)) in request.recipients.iter().zip(bundles) {
            outputs.push(self.priced_output(&recipient.address, assets, lovelace)?);
        }

        self.distribute(wallet, inputs, outputs, metadata)
    }

    /// Draft a random distribution. Each recipient gets `count` distinct
    /// asset types still held after the earlier recipients were served.
    pub fn draft_distribute_random<R: Rng + ?Sized>(
        &self,
        wallet: &WalletHandle,
        request: &DistributeRandom,
        rng: &mut R,
    ) -> Result<PlannedTx> {
        require_recipients(request.recipients.len())?;
        for recipient in &request.recipients {
            if recipient.count == 0 {
                return Err(Error::InvalidAmount(format!(
                    "asset count for {} must be positive",
                    recipient.address
                )));
            }
            self.validate_recipient(&recipient.address)?;
        }
        let metadata = message_metadata(request.message.as_deref())?;

        let balance = self.balance(wallet)?;
        let inputs = UtxoSelection::All.select(&balance.utxos)?;
        let mut pool = Value::sum(inputs.iter().map(|utxo| &utxo.value))?.native_assets();

        let mut outputs = Vec::with_capacity(request.recipients.len());
        for recipient in &request.recipients {
            let candidates: Vec<AssetId> = pool.iter().map(|(asset, _)| asset.clone()).collect();
            if candidates.len() < recipient.count {
                return Err(Error::InsufficientFunds(format!(
                    "{} asset types requested for {}, {} left",
                    recipient.count,
                    recipient.address,
                    candidates.len()
                )));
            }

            let mut picked = Value::new();
            for asset in candidates.choose_multiple(&mut *rng, recipient.count) {
                picked.add(asset, 1)?;
                pool.subtract(asset, 1)?;
            }
            tracing::debug!(
                "Picked {} asset types for {}",
                picked.len(),
                recipient.address
            );
            outputs.push(self.priced_output(&recipient.address, picked, None)?);
        }

        self.distribute(wallet, inputs, outputs, metadata)
    }

    fn distribute(
        &self,
        wallet: &WalletHandle,
        inputs: Vec<Utxo>,
        outputs: Vec<TxOutput>,
        metadata: Option<MessageMetadata>,
    ) -> Result<PlannedTx> {
        let mut change = Value::sum(inputs.iter().map(|utxo| &utxo.value))?;
        for output in &outputs {
            spend_value(&mut change, &output.value)?;
        }
        self.change_first(wallet, inputs, change, outputs, metadata)
    }
}

fn require_recipients(count: usize) -> Result<()> {
    if count == 0 {
        return Err(Error::MissingField("recipients".to_string()));
    }
    Ok(())
}

/// Split a recipient's asset map into native assets and a lovelace override
fn parse_bundle(recipient: &AssetRecipient) -> Result<(Value, Option<u64>)> {
    let mut assets = Value::new();
    let mut lovelace = None;
    for (key, amount) in &recipient.assets {
        if key == LOVELACE {
            lovelace = Some(require_positive(*amount, "lovelace override")?);
            continue;
        }
        let asset: AssetId = key.parse()?;
        let amount = require_positive(*amount, "asset quantity")?;
        assets.add(&asset, quantity(amount)?)?;
    }
    if assets.is_empty() && lovelace.is_none() {
        return Err(Error::InvalidAmount(format!(
            "nothing to send to {}",
            recipient.address
        )));
    }
    Ok((assets, lovelace))
}
