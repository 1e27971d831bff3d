//! `cardano-cli` backed toolchain
//!
//! Every capability shells out to the `cardano-cli` binary. Bodies, signed
//! transactions, scripts and metadata are exchanged through files in the
//! work directory, so [`TxBody`] and [`SignedTx`] hold file paths here.
//! Protocol parameters are fetched once per adapter.

use crate::config::{CliConfig, EngineConfig};
use crate::draft::{MintAction, TxDraft, TxOutput};
use crate::script::{MintScript, PolicyId};
use crate::toolchain::{
    ChainTip, LedgerQuery, LedgerToolchain, MinOutputOracle, SignedTx, StakeInfo, TxBody, TxId,
    WalletProvisioner,
};
use crate::utxo::{SigningKeyRef, Utxo, UtxoRef, WalletHandle};
use crate::value::{AssetId, Quantity, Value};
use crate::{Error, Result};
use lovelace_params::Network;
use once_cell::sync::OnceCell;
use std::ffi::OsStr;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tempfile::{NamedTempFile, TempDir};
use uuid::Uuid;

const PAYMENT_VKEY: &str = "payment.vkey";
const PAYMENT_SKEY: &str = "payment.skey";
const STAKE_VKEY: &str = "stake.vkey";
const STAKE_SKEY: &str = "stake.skey";
const PAYMENT_ADDR: &str = "payment.addr";
const STAKE_ADDR: &str = "stake.addr";

/// Toolchain adapter over the `cardano-cli` binary
pub struct CardanoCli {
    config: CliConfig,
    network: Network,
    work_dir: PathBuf,
    _temp_dir: Option<TempDir>,
    protocol_params: OnceCell<PathBuf>,
}

impl CardanoCli {
    /// Create the adapter, preparing its work directory
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let (work_dir, temp_dir) = match &config.cli.work_dir {
            Some(dir) => {
                fs::create_dir_all(dir)?;
                (dir.clone(), None)
            }
            None => {
                let temp = TempDir::new()?;
                (temp.path().to_path_buf(), Some(temp))
            }
        };
        tracing::debug!("cardano-cli work directory: {}", work_dir.display());

        Ok(Self {
            config: config.cli.clone(),
            network: config.network_params(),
            work_dir,
            _temp_dir: temp_dir,
            protocol_params: OnceCell::new(),
        })
    }

    /// Directory holding transaction files
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn era_flag(&self) -> String {
        format!("--{}-era", self.config.era)
    }

    /// Path for a file `cardano-cli` writes; the caller removes it
    fn scratch(&self, extension: &str) -> PathBuf {
        self.work_dir
            .join(format!("{}.{}", Uuid::new_v4().simple(), extension))
    }

    /// Input file that lives as long as the returned handle
    fn input_file(&self, extension: &str, contents: &str) -> Result<NamedTempFile> {
        let mut file = tempfile::Builder::new()
            .suffix(&format!(".{}", extension))
            .tempfile_in(&self.work_dir)?;
        file.write_all(contents.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    /// Run `f`, then remove `path` whether or not it succeeded
    fn consuming<R>(&self, path: &Path, f: impl FnOnce() -> Result<R>) -> Result<R> {
        let result = f();
        if let Err(e) = fs::remove_file(path) {
            if e.kind() != io::ErrorKind::NotFound {
                tracing::warn!("Could not remove {}: {}", path.display(), e);
            }
        }
        result
    }

    fn wallet_dir(&self, name: &str) -> PathBuf {
        self.config.wallets_dir.join(name)
    }

    /// Run the binary, mapping a non-zero exit to `stage`
    fn run<I, S>(&self, stage: fn(String) -> Error, args: I) -> Result<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        let mut command = Command::new(&self.config.binary);
        command
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(socket) = &self.config.socket_path {
            command.env("CARDANO_NODE_SOCKET_PATH", socket);
        }
        tracing::debug!("Running {:?}", command);

        let output = command.output().map_err(|e| {
            Error::Process(format!(
                "failed to run {}: {}",
                self.config.binary.display(),
                e
            ))
        })?;
        if !output.status.success() {
            return Err(stage(format!(
                "{} ({})",
                String::from_utf8_lossy(&output.stderr).trim(),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    fn protocol_params(&self) -> Result<&Path> {
        let path = self.protocol_params.get_or_try_init(|| -> Result<PathBuf> {
            let path = self.work_dir.join("protocol-parameters.json");
            let mut args = vec![
                "query".to_string(),
                "protocol-parameters".to_string(),
                "--out-file".to_string(),
                path.display().to_string(),
            ];
            args.extend(self.network.cli_args());
            self.run(Error::Query, args)?;
            tracing::info!("Fetched protocol parameters for {}", self.network.name);
            Ok(path)
        })?;
        Ok(path.as_path())
    }

    fn write_scripts(&self, mint: &[MintAction]) -> Result<Vec<NamedTempFile>> {
        let mut written: Vec<&MintScript> = Vec::new();
        let mut files = Vec::new();
        for action in mint {
            if written.contains(&&action.script) {
                continue;
            }
            let json = serde_json::to_string_pretty(&action.script)?;
            files.push(self.input_file("script", &json)?);
            written.push(&action.script);
        }
        Ok(files)
    }
}

impl LedgerQuery for CardanoCli {
    fn query_tip(&self) -> Result<ChainTip> {
        let mut args = vec!["query".to_string(), "tip".to_string()];
        args.extend(self.network.cli_args());
        let out = self.run(Error::Query, args)?;
        Ok(serde_json::from_str(&out)?)
    }

    fn query_stake_info(&self, stake_address: &str) -> Result<Vec<StakeInfo>> {
        let mut args = vec![
            "query".to_string(),
            "stake-address-info".to_string(),
            "--address".to_string(),
            stake_address.to_string(),
        ];
        args.extend(self.network.cli_args());
        let out = self.run(Error::Query, args)?;
        Ok(serde_json::from_str(&out)?)
    }

    fn query_utxo(&self, address: &str) -> Result<Vec<Utxo>> {
        let path = self.scratch("utxo.json");
        let mut args = vec![
            "query".to_string(),
            "utxo".to_string(),
            "--address".to_string(),
            address.to_string(),
            "--out-file".to_string(),
            path.display().to_string(),
        ];
        args.extend(self.network.cli_args());

        let json = self.consuming(&path, || {
            self.run(Error::Query, args)?;
            Ok(fs::read_to_string(&path)?)
        })?;
        parse_utxo_json(&json)
    }
}

impl MinOutputOracle for CardanoCli {
    fn minimum_lovelace(&self, address: &str, value: &Value) -> Result<u64> {
        let output = TxOutput::payment(address, value.clone());
        let args = vec![
            "transaction".to_string(),
            "calculate-min-required-utxo".to_string(),
            self.era_flag(),
            "--protocol-params-file".to_string(),
            self.protocol_params()?.display().to_string(),
            "--tx-out".to_string(),
            render_tx_out(&output)?,
        ];
        let out = self.run(Error::MinimumOutput, args)?;
        parse_lovelace(&out)
            .map_err(|_| Error::MinimumOutput(format!("unexpected output '{}'", out)))
    }
}

impl LedgerToolchain for CardanoCli {
    fn build_body(&self, draft: &TxDraft) -> Result<TxBody> {
        let body = self.scratch("raw");
        let mut args = vec![
            "transaction".to_string(),
            "build-raw".to_string(),
            self.era_flag(),
        ];
        args.extend(tx_args(draft)?);
        let scripts = self.write_scripts(&draft.mint)?;
        for script in &scripts {
            args.push("--minting-script-file".to_string());
            args.push(script.path().display().to_string());
        }
        let metadata = match &draft.metadata {
            Some(metadata) => Some(self.input_file(
                "metadata.json",
                &serde_json::to_string(&metadata.to_json())?,
            )?),
            None => None,
        };
        if let Some(file) = &metadata {
            args.push("--metadata-json-file".to_string());
            args.push(file.path().display().to_string());
        }
        args.push("--out-file".to_string());
        args.push(body.display().to_string());

        match self.run(Error::TransactionBuild, args) {
            Ok(_) => Ok(TxBody(body.display().to_string())),
            Err(e) => self.consuming(&body, || Err(e)),
        }
    }

    fn minimum_fee(&self, draft: &TxDraft, body: &TxBody) -> Result<u64> {
        // The costed body is never signed
        let out = self.consuming(Path::new(&body.0), || {
            let mut args = vec![
                "transaction".to_string(),
                "calculate-min-fee".to_string(),
                "--tx-body-file".to_string(),
                body.0.clone(),
                "--tx-in-count".to_string(),
                draft.tx_in.len().to_string(),
                "--tx-out-count".to_string(),
                draft.tx_out.len().to_string(),
                "--witness-count".to_string(),
                draft.witness_count.to_string(),
                "--protocol-params-file".to_string(),
                self.protocol_params()?.display().to_string(),
            ];
            args.extend(self.network.cli_args());
            self.run(Error::FeeCalculation, args)
        })?;
        parse_lovelace(&out)
            .map_err(|_| Error::FeeCalculation(format!("unexpected output '{}'", out)))
    }

    fn derive_policy_id(&self, script: &MintScript) -> Result<PolicyId> {
        let file = self.input_file("script", &serde_json::to_string_pretty(script)?)?;
        let out = self.run(
            Error::PolicyDerivation,
            [
                "transaction".to_string(),
                "policyid".to_string(),
                "--script-file".to_string(),
                file.path().display().to_string(),
            ],
        )?;
        Ok(PolicyId(out))
    }

    fn sign(&self, body: &TxBody, keys: &[SigningKeyRef]) -> Result<SignedTx> {
        let signed = self.scratch("signed");
        let mut args = vec![
            "transaction".to_string(),
            "sign".to_string(),
            "--tx-body-file".to_string(),
            body.0.clone(),
        ];
        for key in keys {
            args.push("--signing-key-file".to_string());
            args.push(key.0.display().to_string());
        }
        args.extend(self.network.cli_args());
        args.push("--out-file".to_string());
        args.push(signed.display().to_string());

        self.consuming(Path::new(&body.0), || {
            self.run(Error::TransactionSigning, args)
        })?;
        Ok(SignedTx(signed.display().to_string()))
    }

    fn submit(&self, signed: &SignedTx) -> Result<TxId> {
        let mut args = vec![
            "transaction".to_string(),
            "submit".to_string(),
            "--tx-file".to_string(),
            signed.0.clone(),
        ];
        args.extend(self.network.cli_args());

        let out = self.consuming(Path::new(&signed.0), || {
            self.run(Error::TransactionSubmit, args)?;
            self.run(
                Error::TransactionSubmit,
                [
                    "transaction".to_string(),
                    "txid".to_string(),
                    "--tx-file".to_string(),
                    signed.0.clone(),
                ],
            )
        })?;
        parse_tx_id(&out)
    }
}

impl WalletProvisioner for CardanoCli {
    fn create_wallet(&self, name: &str) -> Result<WalletHandle> {
        let dir = self.wallet_dir(name);
        if dir.exists() {
            return Err(Error::WalletAlreadyExists(name.to_string()));
        }
        fs::create_dir_all(&self.config.wallets_dir)?;
        // Files are generated in a staging directory that only moves into
        // place once every key and address exists; it is removed otherwise
        let staging = tempfile::Builder::new()
            .prefix(&format!(".{}-", name))
            .tempdir_in(&self.config.wallets_dir)?;
        let file = |file_name: &str| staging.path().join(file_name).display().to_string();

        self.run(
            Error::Process,
            [
                "address",
                "key-gen",
                "--verification-key-file",
                file(PAYMENT_VKEY).as_str(),
                "--signing-key-file",
                file(PAYMENT_SKEY).as_str(),
            ],
        )?;
        self.run(
            Error::Process,
            [
                "stake-address",
                "key-gen",
                "--verification-key-file",
                file(STAKE_VKEY).as_str(),
                "--signing-key-file",
                file(STAKE_SKEY).as_str(),
            ],
        )?;

        let mut args = vec![
            "address".to_string(),
            "build".to_string(),
            "--payment-verification-key-file".to_string(),
            file(PAYMENT_VKEY),
            "--stake-verification-key-file".to_string(),
            file(STAKE_VKEY),
            "--out-file".to_string(),
            file(PAYMENT_ADDR),
        ];
        args.extend(self.network.cli_args());
        self.run(Error::Process, args)?;

        let mut args = vec![
            "stake-address".to_string(),
            "build".to_string(),
            "--stake-verification-key-file".to_string(),
            file(STAKE_VKEY),
            "--out-file".to_string(),
            file(STAKE_ADDR),
        ];
        args.extend(self.network.cli_args());
        self.run(Error::Process, args)?;

        fs::rename(staging.path(), &dir)?;
        tracing::info!("Generated keys for wallet {} in {}", name, dir.display());
        self.load_wallet(name)
    }

    fn load_wallet(&self, name: &str) -> Result<WalletHandle> {
        let dir = self.wallet_dir(name);
        let address_file = dir.join(PAYMENT_ADDR);
        if !address_file.exists() {
            return Err(Error::WalletNotFound(name.to_string()));
        }

        let payment_address = fs::read_to_string(&address_file)?.trim().to_string();
        let key_hash = self.run(
            Error::Process,
            [
                "address".to_string(),
                "key-hash".to_string(),
                "--payment-verification-key-file".to_string(),
                dir.join(PAYMENT_VKEY).display().to_string(),
            ],
        )?;

        let mut wallet = WalletHandle::new(
            name,
            payment_address,
            SigningKeyRef::new(dir.join(PAYMENT_SKEY)),
        )
        .with_key_hash(key_hash);
        let stake_file = dir.join(STAKE_ADDR);
        if stake_file.exists() {
            wallet = wallet.with_stake_address(fs::read_to_string(stake_file)?.trim());
        }
        Ok(wallet)
    }
}

/// Body arguments shared by every `build-raw` call: inputs, outputs, fee,
/// validity end and mint value
fn tx_args(draft: &TxDraft) -> Result<Vec<String>> {
    let mut args = Vec::new();
    for utxo in &draft.tx_in {
        args.push("--tx-in".to_string());
        args.push(utxo.reference.to_string());
    }
    for output in &draft.tx_out {
        args.push("--tx-out".to_string());
        args.push(render_tx_out(output)?);
    }
    if let Some(slot) = draft.invalid_after {
        args.push("--invalid-hereafter".to_string());
        args.push(slot.to_string());
    }
    if !draft.mint.is_empty() {
        args.push("--mint".to_string());
        args.push(render_mint(&draft.mint));
    }
    args.push("--fee".to_string());
    args.push(draft.fee.to_string());
    Ok(args)
}

fn render_asset(asset: &AssetId) -> String {
    match asset {
        AssetId::Native {
            policy_id,
            asset_name,
        } if asset_name.is_empty() => policy_id.clone(),
        other => other.to_string(),
    }
}

/// `lovelace+q policy.name+...`
fn render_value(value: &Value) -> Result<String> {
    let lovelace = value.lovelace();
    if lovelace < 0 {
        return Err(Error::NegativeQuantity(format!("{} lovelace", lovelace)));
    }
    let mut rendered = lovelace.to_string();
    for (asset, qty) in value.native_assets().iter() {
        rendered.push_str(&format!("+{} {}", qty, render_asset(asset)));
    }
    Ok(rendered)
}

fn render_tx_out(output: &TxOutput) -> Result<String> {
    Ok(format!("{}+{}", output.address, render_value(&output.value)?))
}

/// `-5 policy.name+3 policy.other`
fn render_mint(mint: &[MintAction]) -> String {
    mint.iter()
        .map(|action| format!("{} {}", action.quantity, render_asset(&action.asset)))
        .collect::<Vec<_>>()
        .join("+")
}

/// First integer in outputs like `170000 Lovelace` or `Lovelace 969750`
fn parse_lovelace(out: &str) -> Result<u64> {
    out.split_whitespace()
        .find_map(|token| token.parse::<u64>().ok())
        .ok_or_else(|| Error::Other(format!("no amount in '{}'", out)))
}

/// Plain hash, or `{"txhash": ...}` from newer releases
fn parse_tx_id(out: &str) -> Result<TxId> {
    let out = out.trim();
    if out.starts_with('{') {
        let json: serde_json::Value = serde_json::from_str(out)?;
        let hash = json["txhash"]
            .as_str()
            .ok_or_else(|| Error::TransactionSubmit(format!("no txhash in '{}'", out)))?;
        return Ok(TxId(hash.to_string()));
    }
    if out.is_empty() {
        return Err(Error::TransactionSubmit("empty transaction id".to_string()));
    }
    Ok(TxId(out.to_string()))
}

/// Parse `query utxo` JSON: `{"hash#ix": {"value": {"lovelace": n, policy: {name: q}}}}`
fn parse_utxo_json(json: &str) -> Result<Vec<Utxo>> {
    let entries: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)?;
    let mut utxos = Vec::with_capacity(entries.len());

    for (key, entry) in entries {
        let reference: UtxoRef = key.parse()?;
        let assets = entry["value"]
            .as_object()
            .ok_or_else(|| Error::Query(format!("UTXO {} has no value", key)))?;

        let mut value = Value::new();
        for (policy_id, amount) in assets {
            if policy_id == "lovelace" {
                value.add(&AssetId::Lovelace, json_quantity(&key, amount)?)?;
                continue;
            }
            let names = amount
                .as_object()
                .ok_or_else(|| Error::Query(format!("UTXO {} has a malformed asset map", key)))?;
            for (asset_name, qty) in names {
                let asset = AssetId::native(policy_id.as_str(), asset_name.as_str());
                value.add(&asset, json_quantity(&key, qty)?)?;
            }
        }
        utxos.push(Utxo::new(reference, value));
    }

    utxos.sort_by(|a, b| a.reference.cmp(&b.reference));
    Ok(utxos)
}

fn json_quantity(key: &str, amount: &serde_json::Value) -> Result<Quantity> {
    amount
        .as_i64()
        .ok_or_else(|| Error::Query(format!("UTXO {} has a non-integer quantity", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lovelace_params::NetworkType;

    fn token(name: &str) -> AssetId {
        AssetId::native("policy1", name)
    }

    #[test]
    fn test_render_value() {
        let mut value = Value::from_lovelace(1_500_000).unwrap();
        value.add(&token("746f6b656e41"), 4).unwrap();
        value.add(&AssetId::native("policy2", ""), 1).unwrap();
        assert_eq!(
            render_value(&value).unwrap(),
            "1500000+4 policy1.746f6b656e41+1 policy2"
        );
    }

    #[test]
    fn test_render_mint() {
        let script = MintScript::single_signer("kh");
        let mint = vec![
            MintAction::burn(token("a"), 5, script.clone()).unwrap(),
            MintAction::mint(token("b"), 3, script).unwrap(),
        ];
        assert_eq!(render_mint(&mint), "-5 policy1.a+3 policy1.b");
    }

    #[test]
    fn test_tx_args() {
        let utxo = Utxo::new(UtxoRef::new("aa", 1), Value::from_lovelace(5_000_000).unwrap());
        let mut draft = TxDraft::new(vec![utxo]);
        draft.push_change("addr_test1x", Value::from_lovelace(4_830_000).unwrap());
        draft.fee = 170_000;
        draft.invalid_after = Some(12_345_678);

        let args = tx_args(&draft).unwrap();
        assert_eq!(
            args,
            vec![
                "--tx-in",
                "aa#1",
                "--tx-out",
                "addr_test1x+4830000",
                "--invalid-hereafter",
                "12345678",
                "--fee",
                "170000"
            ]
        );
    }

    #[test]
    fn test_parse_lovelace() {
        assert_eq!(parse_lovelace("170869 Lovelace").unwrap(), 170_869);
        assert_eq!(parse_lovelace("Lovelace 969750").unwrap(), 969_750);
        assert!(parse_lovelace("Coin").is_err());
    }

    #[test]
    fn test_parse_tx_id() {
        assert_eq!(parse_tx_id("abcd\n").unwrap().0, "abcd");
        assert_eq!(parse_tx_id(r#"{"txhash": "ef01"}"#).unwrap().0, "ef01");
        assert!(parse_tx_id("").is_err());
    }

    #[test]
    fn test_parse_utxo_json() {
        let json = r#"{
            "bb#0": {"address": "addr_test1x", "value": {"lovelace": 2000000}},
            "aa#1": {
                "address": "addr_test1x",
                "value": {"lovelace": 1500000, "policy1": {"746f6b656e41": 10}}
            }
        }"#;
        let utxos = parse_utxo_json(json).unwrap();
        assert_eq!(utxos.len(), 2);
        assert_eq!(utxos[0].reference, UtxoRef::new("aa", 1));
        assert_eq!(utxos[0].value.get(&token("746f6b656e41")), 10);
        assert_eq!(utxos[1].value.lovelace(), 2_000_000);
    }

    #[test]
    fn test_parse_utxo_json_rejects_bad_key() {
        let json = r#"{"aa": {"value": {"lovelace": 1}}}"#;
        assert!(parse_utxo_json(json).is_err());
    }

    fn adapter(root: &Path) -> CardanoCli {
        let mut config = EngineConfig::for_network(NetworkType::Preprod);
        config.cli.binary = root.join("no-such-cardano-cli");
        config.cli.work_dir = Some(root.join("work"));
        config.cli.wallets_dir = root.join("wallets");
        CardanoCli::new(&config).unwrap()
    }

    #[test]
    fn test_work_dir_created() {
        let root = tempfile::tempdir().unwrap();
        let cli = adapter(root.path());
        assert!(cli.work_dir().is_dir());
        assert_eq!(cli.era_flag(), "--babbage-era");
    }

    #[test]
    fn test_missing_binary_is_process_error() {
        let root = tempfile::tempdir().unwrap();
        let cli = adapter(root.path());
        assert!(matches!(cli.query_tip(), Err(Error::Process(_))));
    }

    #[test]
    fn test_wallet_lookup() {
        let root = tempfile::tempdir().unwrap();
        let cli = adapter(root.path());
        assert!(matches!(
            cli.load_wallet("ghost"),
            Err(Error::WalletNotFound(_))
        ));

        fs::create_dir_all(root.path().join("wallets").join("taken")).unwrap();
        assert!(matches!(
            cli.create_wallet("taken"),
            Err(Error::WalletAlreadyExists(_))
        ));
    }

    /// Stand-in for `cardano-cli`: writes every requested output file and
    /// prints fixed answers for the commands whose stdout is parsed
    #[cfg(unix)]
    const FAKE_CLI: &str = r#"#!/bin/sh
#GUARD
prev=""
for arg in "$@"; do
    case "$prev" in
        --out-file) echo "fake-$1-$2" > "$arg" ;;
        --verification-key-file|--signing-key-file)
            if [ "$2" = "key-gen" ]; then echo "fake-$1-$2" > "$arg"; fi ;;
    esac
    prev="$arg"
done
case "$1 $2" in
    "transaction calculate-min-fee") echo "170000 Lovelace" ;;
    "transaction calculate-min-required-utxo") echo "Lovelace 1000000" ;;
    "transaction policyid") echo "policy1" ;;
    "transaction txid") echo "abcd" ;;
    "address key-hash") echo "deadbeef" ;;
esac
exit 0
"#;

    #[cfg(unix)]
    fn fake_adapter(root: &Path, fail_on: Option<&str>) -> CardanoCli {
        use std::os::unix::fs::PermissionsExt;

        let guard = match fail_on {
            Some(command) => format!(
                "if [ \"$1\" = \"{}\" ]; then echo boom >&2; exit 1; fi",
                command
            ),
            None => String::new(),
        };
        let binary = root.join("fake-cardano-cli");
        fs::write(&binary, FAKE_CLI.replace("#GUARD", &guard)).unwrap();
        fs::set_permissions(&binary, fs::Permissions::from_mode(0o755)).unwrap();

        let mut config = EngineConfig::for_network(NetworkType::Preprod);
        config.cli.binary = binary;
        config.cli.work_dir = Some(root.join("work"));
        config.cli.wallets_dir = root.join("wallets");
        CardanoCli::new(&config).unwrap()
    }

    #[cfg(unix)]
    fn entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[cfg(unix)]
    #[test]
    fn test_work_dir_clean_after_submit() {
        use crate::builder::DraftBuilder;
        use crate::metadata::MessageMetadata;

        let root = tempfile::tempdir().unwrap();
        let cli = fake_adapter(root.path(), None);
        let script = MintScript::single_signer("kh");
        let policy_id = cli.derive_policy_id(&script).unwrap();
        assert_eq!(policy_id.as_str(), "policy1");

        let minted = AssetId::native(policy_id.as_str(), "746f6b");
        let mut change = Value::from_lovelace(4_000_000).unwrap();
        change.add(&minted, 5).unwrap();
        let mut draft = TxDraft::new(vec![Utxo::new(
            UtxoRef::new("aa", 0),
            Value::from_lovelace(5_000_000).unwrap(),
        )]);
        draft.push_change("addr_test1x", change);
        draft.push_output(TxOutput::explicit(
            "addr_test1y",
            Value::from_lovelace(1_000_000).unwrap(),
        ));
        draft.push_mint(MintAction::mint(minted, 5, script).unwrap());
        draft.set_metadata(MessageMetadata::from_message("hello"));

        for _ in 0..3 {
            let submission = DraftBuilder::new(&cli)
                .submit(draft.clone(), &[SigningKeyRef::new("payment.skey")])
                .unwrap();
            assert_eq!(submission.tx_id.0, "abcd");
            assert_eq!(submission.fee, 170_000);
        }

        // Only the cached protocol parameters survive
        assert_eq!(entries(cli.work_dir()), vec!["protocol-parameters.json"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_build_leaves_no_body() {
        use crate::metadata::MessageMetadata;

        let root = tempfile::tempdir().unwrap();
        let cli = fake_adapter(root.path(), Some("transaction"));
        let mut draft = TxDraft::new(vec![]);
        draft.set_metadata(MessageMetadata::from_message("hello"));

        assert!(matches!(
            cli.build_body(&draft),
            Err(Error::TransactionBuild(_))
        ));
        assert!(entries(cli.work_dir()).is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_create_wallet_moves_files_into_place() {
        let root = tempfile::tempdir().unwrap();
        let cli = fake_adapter(root.path(), None);

        let wallet = cli.create_wallet("w2").unwrap();

        assert_eq!(wallet.payment_address, "fake-address-build");
        assert_eq!(
            wallet.stake_address.as_deref(),
            Some("fake-stake-address-build")
        );
        assert_eq!(wallet.key_hash.as_deref(), Some("deadbeef"));
        assert!(wallet.signing_key.0.ends_with("w2/payment.skey"));
        assert!(wallet.signing_key.0.is_file());
        assert_eq!(entries(&root.path().join("wallets")), vec!["w2"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_failed_wallet_generation_can_be_retried() {
        let root = tempfile::tempdir().unwrap();
        let cli = fake_adapter(root.path(), Some("stake-address"));

        for _ in 0..2 {
            match cli.create_wallet("w1") {
                Err(Error::Process(message)) => assert!(message.contains("boom")),
                other => panic!("unexpected result: {:?}", other),
            }
        }
        assert!(entries(&root.path().join("wallets")).is_empty());
        assert!(matches!(
            cli.load_wallet("w1"),
            Err(Error::WalletNotFound(_))
        ));
    }
}
