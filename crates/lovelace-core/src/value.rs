//! Multi-asset value arithmetic
//!
//! A [`Value`] maps asset identifiers to signed quantities. Entries that
//! reach zero are pruned immediately; the ledger toolchain treats a zero
//! entry as a malformed output.

use crate::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Asset quantity (lovelace or native token units)
pub type Quantity = i64;

/// Text form of the base unit
pub const LOVELACE: &str = "lovelace";

/// Asset identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AssetId {
    /// The base currency
    Lovelace,
    /// A native asset under a minting policy
    Native {
        /// Minting policy id (hex)
        policy_id: String,
        /// Asset name as the ledger toolchain expects it
        asset_name: String,
    },
}

impl AssetId {
    /// Create a native asset id
    pub fn native(policy_id: impl Into<String>, asset_name: impl Into<String>) -> Self {
        AssetId::Native {
            policy_id: policy_id.into(),
            asset_name: asset_name.into(),
        }
    }

    /// Whether this is the base currency
    pub fn is_lovelace(&self) -> bool {
        matches!(self, AssetId::Lovelace)
    }

    /// Policy id of a native asset
    pub fn policy_id(&self) -> Option<&str> {
        match self {
            AssetId::Lovelace => None,
            AssetId::Native { policy_id, .. } => Some(policy_id),
        }
    }

    /// Asset name of a native asset
    pub fn asset_name(&self) -> Option<&str> {
        match self {
            AssetId::Lovelace => None,
            AssetId::Native { asset_name, .. } => Some(asset_name),
        }
    }

    /// Decode a hex asset name back to UTF-8, if it is one
    pub fn asset_name_utf8(&self) -> Option<String> {
        let bytes = hex::decode(self.asset_name()?).ok()?;
        String::from_utf8(bytes).ok()
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetId::Lovelace => write!(f, "{}", LOVELACE),
            AssetId::Native {
                policy_id,
                asset_name,
            } => write!(f, "{}.{}", policy_id, asset_name),
        }
    }
}

impl FromStr for AssetId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        if s == LOVELACE {
            return Ok(AssetId::Lovelace);
        }

        let (policy_id, asset_name) = s
            .split_once('.')
            .ok_or_else(|| Error::InvalidAsset(format!("'{}' is not <policy>.<name>", s)))?;

        if policy_id.is_empty() {
            return Err(Error::InvalidAsset(format!("'{}' has an empty policy id", s)));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(Error::InvalidAsset(format!("'{}' contains whitespace", s)));
        }

        Ok(AssetId::native(policy_id, asset_name))
    }
}

impl Serialize for AssetId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

/// Convert an unsigned amount into a [`Quantity`]
pub fn quantity(amount: u64) -> Result<Quantity> {
    Quantity::try_from(amount)
        .map_err(|_| Error::AmountOverflow(format!("{} does not fit a quantity", amount)))
}

/// Convert a non-negative [`Quantity`] back to an unsigned amount
pub fn unsigned(quantity: Quantity) -> Result<u64> {
    u64::try_from(quantity)
        .map_err(|_| Error::NegativeQuantity(format!("{} is negative", quantity)))
}

/// Mapping from asset to quantity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(BTreeMap<AssetId, Quantity>);

impl Value {
    /// Empty value
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Value holding only lovelace
    pub fn from_lovelace(lovelace: u64) -> Result<Self> {
        let mut value = Self::new();
        value.insert(AssetId::Lovelace, quantity(lovelace)?);
        Ok(value)
    }

    /// Build a value from entries, accumulating duplicates
    pub fn from_entries<I>(entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (AssetId, Quantity)>,
    {
        let mut value = Self::new();
        for (asset, qty) in entries {
            value.add(&asset, qty)?;
        }
        Ok(value)
    }

    /// Quantity of an asset (zero when absent)
    pub fn get(&self, asset: &AssetId) -> Quantity {
        self.0.get(asset).copied().unwrap_or(0)
    }

    /// Lovelace quantity
    pub fn lovelace(&self) -> Quantity {
        self.get(&AssetId::Lovelace)
    }

    /// Set an entry, pruning it when zero
    pub fn insert(&mut self, asset: AssetId, qty: Quantity) {
        if qty == 0 {
            self.0.remove(&asset);
        } else {
            self.0.insert(asset, qty);
        }
    }

    /// Set the lovelace entry
    pub fn set_lovelace(&mut self, lovelace: u64) -> Result<()> {
        self.insert(AssetId::Lovelace, quantity(lovelace)?);
        Ok(())
    }

    /// Signed addition; the entry is pruned if the sum is zero.
    pub fn add(&mut self, asset: &AssetId, qty: Quantity) -> Result<()> {
        let current = self.get(asset);
        let sum = current
            .checked_add(qty)
            .ok_or_else(|| Error::AmountOverflow(format!("{} + {} of {}", current, qty, asset)))?;
        self.insert(asset.clone(), sum);
        Ok(())
    }

    /// Decrement an entry, removing it on exactly zero.
    ///
    /// Driving a quantity below zero is an error; ordinary outputs never
    /// carry negative entries.
    pub fn subtract(&mut self, asset: &AssetId, qty: Quantity) -> Result<()> {
        let current = self.get(asset);
        let rest = current
            .checked_sub(qty)
            .ok_or_else(|| Error::AmountOverflow(format!("{} - {} of {}", current, qty, asset)))?;
        if rest < 0 {
            return Err(Error::NegativeQuantity(format!(
                "{} {} requested but only {} available",
                qty, asset, current
            )));
        }
        self.insert(asset.clone(), rest);
        Ok(())
    }

    /// Add every entry of `other` into `self`
    pub fn merge(&mut self, other: &Value) -> Result<()> {
        for (asset, qty) in other.iter() {
            self.add(asset, qty)?;
        }
        Ok(())
    }

    /// Subtract every entry of `other` from `self`
    pub fn subtract_value(&mut self, other: &Value) -> Result<()> {
        for (asset, qty) in other.iter() {
            self.subtract(asset, qty)?;
        }
        Ok(())
    }

    /// Fold values into their sum
    pub fn sum<'a, I>(values: I) -> Result<Value>
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut total = Value::new();
        for value in values {
            total.merge(value)?;
        }
        Ok(total)
    }

    /// Everything except lovelace
    pub fn native_assets(&self) -> Value {
        Value(
            self.0
                .iter()
                .filter(|(asset, _)| !asset.is_lovelace())
                .map(|(asset, qty)| (asset.clone(), *qty))
                .collect(),
        )
    }

    /// Whether any native asset is present
    pub fn has_native_assets(&self) -> bool {
        self.0.keys().any(|asset| !asset.is_lovelace())
    }

    /// Whether every entry is strictly positive
    pub fn is_strictly_positive(&self) -> bool {
        self.0.values().all(|qty| *qty > 0)
    }

    /// Whether the value has no entries
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate entries in asset order
    pub fn iter(&self) -> impl Iterator<Item = (&AssetId, Quantity)> {
        self.0.iter().map(|(asset, qty)| (asset, *qty))
    }
}
