//! Configuration Manager
//!
//! Owns the agent's configuration snapshot. `update` is the only mutation
//! entry point: it applies the change, persists it under `config/local` and
//! swaps in a new immutable snapshot. The private key is written to an
//! encrypted keystore next to the store; the persisted snapshot only names
//! that keystore.

use crate::error::ConfigError;
use crate::store::ArbitrationStore;
use arbitration_types::{ArbitrationConfig, GasOverrides, PrivateKey, CONFIG_KEY};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, U256};
use ethers::utils::hex;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

/// Keystore file name for the agent wallet
pub const KEYSTORE_NAME: &str = "arbitration-wallet";

/// On-disk form of the configuration (no plaintext key)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PersistedConfig {
    #[serde(default)]
    rpc_url: Option<String>,
    #[serde(default)]
    coordinator_url: Option<String>,
    #[serde(default)]
    subgraph_url: Option<String>,
    #[serde(default)]
    maker_list: Vec<String>,
    #[serde(default)]
    gas: GasOverrides,
    /// Name of the encrypted keystore holding the private key
    #[serde(default)]
    keystore: Option<String>,
}

/// A change to the configuration. `None` leaves a field untouched.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub private_key: Option<PrivateKey>,
    pub rpc_url: Option<String>,
    pub coordinator_url: Option<String>,
    pub subgraph_url: Option<String>,
    pub maker_list: Option<Vec<String>>,
    pub gas_limit: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub gas_price: Option<U256>,
}

impl ConfigUpdate {
    /// True when the update changes nothing
    pub fn is_empty(&self) -> bool {
        self.private_key.is_none()
            && self.rpc_url.is_none()
            && self.coordinator_url.is_none()
            && self.subgraph_url.is_none()
            && self.maker_list.is_none()
            && self.gas_limit.is_none()
            && self.max_fee_per_gas.is_none()
            && self.max_priority_fee_per_gas.is_none()
            && self.gas_price.is_none()
    }

    fn apply(&self, base: &ArbitrationConfig) -> ArbitrationConfig {
        let mut next = base.clone();
        if let Some(key) = &self.private_key {
            next.private_key = Some(key.clone());
        }
        if let Some(url) = &self.rpc_url {
            next.rpc_url = Some(url.clone());
        }
        if let Some(url) = &self.coordinator_url {
            next.coordinator_url = Some(url.trim_end_matches('/').to_string());
        }
        if let Some(url) = &self.subgraph_url {
            next.subgraph_url = Some(url.clone());
        }
        if let Some(makers) = &self.maker_list {
            next.maker_list = makers
                .iter()
                .map(|m| m.trim().to_lowercase())
                .filter(|m| !m.is_empty())
                .collect();
        }
        next.gas.gas_limit = self.gas_limit.or(next.gas.gas_limit);
        next.gas.max_fee_per_gas = self.max_fee_per_gas.or(next.gas.max_fee_per_gas);
        next.gas.max_priority_fee_per_gas = self
            .max_priority_fee_per_gas
            .or(next.gas.max_priority_fee_per_gas);
        next.gas.gas_price = self.gas_price.or(next.gas.gas_price);
        next
    }
}

/// Single owner of the configuration snapshot
pub struct ConfigManager {
    store: Arc<ArbitrationStore>,
    /// Directory holding the encrypted keystore
    keystore_dir: PathBuf,
    /// Keystore password
    secret: Option<String>,
    keystore: RwLock<Option<String>>,
    current: RwLock<Arc<ArbitrationConfig>>,
}

impl ConfigManager {
    /// Load the persisted snapshot, decrypting the keystore when a secret is given
    pub fn load(
        store: Arc<ArbitrationStore>,
        keystore_dir: impl Into<PathBuf>,
        secret: Option<String>,
    ) -> Result<Self, ConfigError> {
        let keystore_dir = keystore_dir.into();
        let persisted: PersistedConfig = store.get_json(CONFIG_KEY)?.unwrap_or_default();

        let private_key = match (&persisted.keystore, &secret) {
            (Some(name), Some(secret)) => {
                let wallet = LocalWallet::decrypt_keystore(keystore_dir.join(name), secret)
                    .map_err(|e| ConfigError::Keystore(e.to_string()))?;
                tracing::info!("Loaded wallet {:?} from keystore", wallet.address());
                Some(PrivateKey::new(hex::encode(wallet.signer().to_bytes())))
            }
            (Some(_), None) => {
                tracing::warn!("Keystore present but no secret configured; private key not loaded");
                None
            }
            (None, _) => None,
        };

        let config = ArbitrationConfig {
            private_key,
            rpc_url: persisted.rpc_url.clone(),
            coordinator_url: persisted.coordinator_url.clone(),
            subgraph_url: persisted.subgraph_url.clone(),
            maker_list: persisted.maker_list.clone(),
            gas: persisted.gas.clone(),
        };

        Ok(Self {
            store,
            keystore_dir,
            secret,
            keystore: RwLock::new(persisted.keystore),
            current: RwLock::new(Arc::new(config)),
        })
    }

    /// Current snapshot
    pub fn snapshot(&self) -> Arc<ArbitrationConfig> {
        self.current.read().clone()
    }

    /// Apply values for this process only (environment, CLI flags)
    pub fn overlay(&self, update: &ConfigUpdate) -> Result<Arc<ArbitrationConfig>, ConfigError> {
        if let Some(key) = &update.private_key {
            let address = wallet_address(key)?;
            tracing::info!("Using wallet {:?} from environment", address);
        }
        let mut current = self.current.write();
        let next = Arc::new(update.apply(&current));
        *current = next.clone();
        Ok(next)
    }

    /// Apply and persist a configuration change, returning the new snapshot.
    ///
    /// Setting a private key requires the keystore secret; the derived wallet
    /// address is logged so the operator can confirm it.
    pub fn update(&self, update: ConfigUpdate) -> Result<Arc<ArbitrationConfig>, ConfigError> {
        if let Some(key) = &update.private_key {
            let wallet = parse_wallet(key)?;
            let secret = self.secret.as_ref().ok_or(ConfigError::MissingSecret)?;
            std::fs::create_dir_all(&self.keystore_dir)
                .map_err(|e| ConfigError::Keystore(e.to_string()))?;
            LocalWallet::encrypt_keystore(
                &self.keystore_dir,
                &mut rand::thread_rng(),
                wallet.signer().to_bytes(),
                secret,
                Some(KEYSTORE_NAME),
            )
            .map_err(|e| ConfigError::Keystore(e.to_string()))?;
            *self.keystore.write() = Some(KEYSTORE_NAME.to_string());
            tracing::info!("Private key updated, wallet address {:?}", wallet.address());
        }

        let mut current = self.current.write();
        let next = Arc::new(update.apply(&current));

        let persisted = PersistedConfig {
            rpc_url: next.rpc_url.clone(),
            coordinator_url: next.coordinator_url.clone(),
            subgraph_url: next.subgraph_url.clone(),
            maker_list: next.maker_list.clone(),
            gas: next.gas.clone(),
            keystore: self.keystore.read().clone(),
        };
        self.store.put_json(CONFIG_KEY, &persisted)?;

        *current = next.clone();
        tracing::info!("Configuration updated");
        Ok(next)
    }
}

fn parse_wallet(key: &PrivateKey) -> Result<LocalWallet, ConfigError> {
    let raw = key.expose();
    raw.strip_prefix("0x")
        .unwrap_or(raw)
        .parse::<LocalWallet>()
        .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))
}

/// Address controlled by a private key
pub fn wallet_address(key: &PrivateKey) -> Result<Address, ConfigError> {
    Ok(parse_wallet(key)?.address())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // Well-known development key (anvil account 0)
    const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DEV_ADDRESS: &str = "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266";

    fn open_store(dir: &std::path::Path) -> Arc<ArbitrationStore> {
        Arc::new(ArbitrationStore::open(dir.join("db")).unwrap())
    }

    #[test]
    fn test_wallet_address_derivation() {
        let address = wallet_address(&PrivateKey::new(DEV_KEY)).unwrap();
        assert_eq!(format!("{:?}", address), DEV_ADDRESS);
        assert!(wallet_address(&PrivateKey::new("0x1234")).is_err());
    }

    #[test]
    fn test_update_returns_new_snapshot() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::load(open_store(dir.path()), dir.path().join("keys"), None).unwrap();
        let before = manager.snapshot();

        let after = manager
            .update(ConfigUpdate {
                rpc_url: Some("http://localhost:8545".to_string()),
                coordinator_url: Some("http://coordinator/".to_string()),
                maker_list: Some(vec![" 0xABC ".to_string(), "".to_string()]),
                gas_limit: Some(U256::from(500_000)),
                ..Default::default()
            })
            .unwrap();

        assert!(before.rpc_url.is_none());
        assert_eq!(after.rpc_url.as_deref(), Some("http://localhost:8545"));
        assert_eq!(after.coordinator_url.as_deref(), Some("http://coordinator"));
        assert_eq!(after.maker_list, vec!["0xabc".to_string()]);
        assert_eq!(after.gas.gas_limit, Some(U256::from(500_000)));
        assert!(Arc::ptr_eq(&after, &manager.snapshot()));
    }

    #[test]
    fn test_private_key_requires_secret() {
        let dir = tempdir().unwrap();
        let manager = ConfigManager::load(open_store(dir.path()), dir.path().join("keys"), None).unwrap();

        let result = manager.update(ConfigUpdate {
            private_key: Some(PrivateKey::new(DEV_KEY)),
            ..Default::default()
        });
        assert!(matches!(result, Err(ConfigError::MissingSecret)));
        assert!(manager.snapshot().private_key.is_none());
    }

    #[test]
    fn test_key_persisted_encrypted_and_reloaded() {
        let dir = tempdir().unwrap();
        let keys = dir.path().join("keys");
        let store = open_store(dir.path());
        {
            let manager = ConfigManager::load(store.clone(), &keys, Some("s3cret".to_string())).unwrap();
            manager
                .update(ConfigUpdate {
                    private_key: Some(PrivateKey::new(DEV_KEY)),
                    rpc_url: Some("http://localhost:8545".to_string()),
                    ..Default::default()
                })
                .unwrap();
        }

        let raw: serde_json::Value = store.get_json(CONFIG_KEY).unwrap().unwrap();
        let text = raw.to_string();
        assert!(!text.contains(&DEV_KEY[2..]));
        assert_eq!(raw["keystore"], KEYSTORE_NAME);

        let reloaded = ConfigManager::load(store, &keys, Some("s3cret".to_string())).unwrap();
        let snapshot = reloaded.snapshot();
        let key = snapshot.private_key.as_ref().unwrap();
        assert_eq!(format!("{:?}", wallet_address(key).unwrap()), DEV_ADDRESS);
        assert_eq!(snapshot.rpc_url.as_deref(), Some("http://localhost:8545"));
    }

    #[test]
    fn test_overlay_is_not_persisted() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path());
        let manager = ConfigManager::load(store.clone(), dir.path().join("keys"), None).unwrap();

        manager
            .overlay(&ConfigUpdate {
                rpc_url: Some("http://env".to_string()),
                ..Default::default()
            })
            .unwrap();

        assert_eq!(manager.snapshot().rpc_url.as_deref(), Some("http://env"));
        assert!(store.get_json::<serde_json::Value>(CONFIG_KEY).unwrap().is_none());
    }
}
