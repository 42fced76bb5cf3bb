//! The embedded wallet: account derivation, signing, and optional network
//! capabilities.
//!
//! Construction is pure derivation with no I/O. Network access (fetching
//! spendable outputs, submitting signed transactions) is optional; calls that
//! need a missing capability fail fast instead of dereferencing nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use ebb_core::address::{Address, Credential, NetworkTag};
use ebb_core::crypto::KeyPair;
use ebb_core::traits::{Fetcher, Submitter};
use ebb_core::tx::{Tx, TxBody, Witness};
use ebb_core::types::{Hash32, Utxo};

use crate::error::WalletError;
use crate::keys::{KeyMaterial, WalletSecret};
use crate::witness;

/// A derived account: keypairs plus the three address forms they control.
///
/// Never persisted; rederive from the wallet on demand.
#[derive(Debug, Clone)]
pub struct Account {
    pub account_index: u32,
    pub key_index: u32,
    pub payment_key: KeyPair,
    pub stake_key: KeyPair,
    network: NetworkTag,
}

impl Account {
    /// Payment credential plus stake credential.
    pub fn base_address(&self) -> Address {
        Address::base(
            self.network,
            self.payment_key.public_key().key_hash(),
            self.stake_key.public_key().key_hash(),
        )
    }

    /// Payment credential only.
    pub fn enterprise_address(&self) -> Address {
        Address::enterprise(self.network, self.payment_key.public_key().key_hash())
    }

    /// Stake credential only.
    pub fn reward_address(&self) -> Address {
        Address::reward(
            self.network,
            Credential::KeyHash(self.stake_key.public_key().key_hash()),
        )
    }
}

/// An ownership proof over arbitrary payload bytes.
///
/// Both fields are hex so the proof can travel through JSON untouched.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DataSignature {
    pub key: String,
    pub signature: String,
}

/// A deterministic wallet with optional network capabilities.
pub struct EmbeddedWallet {
    secret: WalletSecret,
    network: NetworkTag,
    fetcher: Option<Arc<dyn Fetcher>>,
    submitter: Option<Arc<dyn Submitter>>,
}

impl EmbeddedWallet {
    /// Build a wallet from key material. Pure derivation, no I/O.
    pub fn new(material: &KeyMaterial, network: NetworkTag) -> Result<Self, WalletError> {
        Ok(Self {
            secret: WalletSecret::from_material(material)?,
            network,
            fetcher: None,
            submitter: None,
        })
    }

    /// Attach a source of spendable outputs.
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Attach a transaction submission endpoint.
    pub fn with_submitter(mut self, submitter: Arc<dyn Submitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    pub fn network(&self) -> NetworkTag {
        self.network
    }

    /// Derive the account at `(account_index, key_index)`.
    ///
    /// Deterministic and side-effect free: the same root secret and indices
    /// always yield the same keys and addresses.
    pub fn get_account(&self, account_index: u32, key_index: u32) -> Account {
        let (payment_key, stake_key) = self.secret.derive(account_index, key_index);
        Account {
            account_index,
            key_index,
            payment_key,
            stake_key,
            network: self.network,
        }
    }

    /// Sign a transaction body with the derived payment key, returning a
    /// single witness. Callers compose per-signer witnesses into one
    /// transaction.
    pub fn sign_tx(
        &self,
        body: &TxBody,
        account_index: u32,
        key_index: u32,
    ) -> Result<Witness, WalletError> {
        let account = self.get_account(account_index, key_index);
        let tx_hash = body.hash()?;
        debug!(tx_hash = %tx_hash, account_index, key_index, "signing transaction body");
        let signature = account.payment_key.sign(tx_hash.as_bytes());
        Ok(Witness {
            public_key: account.payment_key.public_key().to_bytes(),
            signature: signature.to_vec(),
        })
    }

    /// Sign an arbitrary payload as an ownership proof for `address`.
    ///
    /// The address must be one of the derived account's three forms; a reward
    /// address is proven with the stake key, the other two with the payment
    /// key. Signing for an address the wallet does not control is a caller
    /// bug and fails loudly.
    pub fn sign_data(
        &self,
        address: &Address,
        payload: &[u8],
        account_index: u32,
        key_index: u32,
    ) -> Result<DataSignature, WalletError> {
        let account = self.get_account(account_index, key_index);
        let key = if *address == account.reward_address() {
            &account.stake_key
        } else if *address == account.base_address() || *address == account.enterprise_address() {
            &account.payment_key
        } else {
            return Err(WalletError::ForeignAddress(address.encode()));
        };
        debug!(address = %address.encode(), account_index, key_index, "signing data payload");
        let signature = key.sign(payload);
        Ok(DataSignature {
            key: hex::encode(key.public_key().to_bytes()),
            signature: hex::encode(signature),
        })
    }

    /// Sign a complete hex-encoded transaction and return it re-encoded with
    /// this wallet's witness merged in.
    ///
    /// With `partial_sign` false the transaction must not already carry
    /// witnesses; the check happens before any signature is computed.
    pub fn sign_transaction(
        &self,
        tx_hex: &str,
        partial_sign: bool,
        account_index: u32,
        key_index: u32,
    ) -> Result<String, WalletError> {
        let mut tx = Tx::from_hex(tx_hex)?;
        if !partial_sign && !tx.witness_set.is_empty() {
            return Err(WalletError::AlreadyWitnessed);
        }
        let witness = self.sign_tx(&tx.body, account_index, key_index)?;
        witness::add_witnesses(&mut tx, vec![witness], partial_sign)?;
        Ok(tx.to_hex()?)
    }

    /// Batch form of [`sign_transaction`](Self::sign_transaction); each entry
    /// keeps its own partial-sign intent. Fails on the first error.
    pub fn sign_txs(
        &self,
        txs: &[(String, bool)],
        account_index: u32,
        key_index: u32,
    ) -> Result<Vec<String>, WalletError> {
        txs.iter()
            .map(|(tx_hex, partial)| {
                self.sign_transaction(tx_hex, *partial, account_index, key_index)
            })
            .collect()
    }

    /// Spendable outputs at an address, via the attached fetcher.
    pub async fn fetch_address_utxos(&self, address: &Address) -> Result<Vec<Utxo>, WalletError> {
        let fetcher = self
            .fetcher
            .as_ref()
            .ok_or(WalletError::CapabilityNotProvided("fetcher"))?;
        Ok(fetcher.fetch_address_utxos(address).await?)
    }

    /// Unspent outputs created by a transaction, via the attached fetcher.
    pub async fn fetch_utxos(&self, tx_hash: &Hash32) -> Result<Vec<Utxo>, WalletError> {
        let fetcher = self
            .fetcher
            .as_ref()
            .ok_or(WalletError::CapabilityNotProvided("fetcher"))?;
        Ok(fetcher.fetch_utxos(tx_hash).await?)
    }

    /// Hand a signed transaction to the attached submitter.
    pub async fn submit_tx(&self, signed_tx_hex: &str) -> Result<Hash32, WalletError> {
        let submitter = self
            .submitter
            .as_ref()
            .ok_or(WalletError::CapabilityNotProvided("submitter"))?;
        let tx_hash = submitter.submit_tx(signed_tx_hex).await?;
        debug!(tx_hash = %tx_hash, "transaction submitted");
        Ok(tx_hash)
    }
}

impl std::fmt::Debug for EmbeddedWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddedWallet")
            .field("network", &self.network)
            .field("has_fetcher", &self.fetcher.is_some())
            .field("has_submitter", &self.submitter.is_some())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ebb_core::crypto::PublicKey;
    use ebb_core::error::ProviderError;
    use ebb_core::tx::WitnessSet;
    use ebb_core::types::{TxInput, TxOutput};
    use ebb_core::value::Value;

    fn demo_words() -> Vec<String> {
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about"
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    fn demo_wallet() -> EmbeddedWallet {
        EmbeddedWallet::new(&KeyMaterial::Mnemonic(demo_words()), NetworkTag::Testnet).unwrap()
    }

    fn demo_body() -> TxBody {
        TxBody {
            inputs: vec![TxInput {
                tx_hash: Hash32::from_bytes([1u8; 32]),
                output_index: 0,
            }],
            outputs: vec![TxOutput::new(
                demo_wallet().get_account(0, 0).base_address(),
                Value::lovelace(1_000_000),
            )],
            fee: 170_000,
            ttl: None,
            mint: None,
        }
    }

    // --- accounts ---

    #[test]
    fn get_account_deterministic() {
        let wallet = demo_wallet();
        let a = wallet.get_account(0, 0);
        let b = wallet.get_account(0, 0);
        assert_eq!(a.payment_key.public_key(), b.payment_key.public_key());
        assert_eq!(a.base_address(), b.base_address());
        assert_eq!(a.enterprise_address(), b.enterprise_address());
        assert_eq!(a.reward_address(), b.reward_address());
    }

    #[test]
    fn account_addresses_are_distinct_forms() {
        let account = demo_wallet().get_account(0, 0);
        let base = account.base_address().encode();
        let enterprise = account.enterprise_address().encode();
        let reward = account.reward_address().encode();
        assert_ne!(base, enterprise);
        assert!(base.starts_with("addr_test1"));
        assert!(enterprise.starts_with("addr_test1"));
        assert!(reward.starts_with("stake_test1"));
    }

    #[test]
    fn network_tag_flows_into_addresses() {
        let wallet =
            EmbeddedWallet::new(&KeyMaterial::Mnemonic(demo_words()), NetworkTag::Mainnet).unwrap();
        let account = wallet.get_account(0, 0);
        assert!(account.base_address().encode().starts_with("addr1"));
        assert!(account.reward_address().encode().starts_with("stake1"));
    }

    // --- sign_tx ---

    #[test]
    fn sign_tx_witness_verifies_against_body_hash() {
        let wallet = demo_wallet();
        let body = demo_body();
        let witness = wallet.sign_tx(&body, 0, 0).unwrap();
        let pk = PublicKey::from_bytes(&witness.public_key).unwrap();
        let sig: [u8; 64] = witness.signature.as_slice().try_into().unwrap();
        assert!(pk.verify(body.hash().unwrap().as_bytes(), &sig).is_ok());
        assert_eq!(
            pk,
            wallet.get_account(0, 0).payment_key.public_key()
        );
    }

    #[test]
    fn sign_tx_differs_per_account() {
        let wallet = demo_wallet();
        let body = demo_body();
        let w0 = wallet.sign_tx(&body, 0, 0).unwrap();
        let w1 = wallet.sign_tx(&body, 1, 0).unwrap();
        assert_ne!(w0.public_key, w1.public_key);
    }

    // --- sign_data ---

    #[test]
    fn sign_data_base_address_uses_payment_key() {
        let wallet = demo_wallet();
        let account = wallet.get_account(0, 0);
        let proof = wallet
            .sign_data(&account.base_address(), b"ownership", 0, 0)
            .unwrap();
        assert_eq!(
            proof.key,
            hex::encode(account.payment_key.public_key().to_bytes())
        );
        let sig: [u8; 64] = hex::decode(&proof.signature)
            .unwrap()
            .as_slice()
            .try_into()
            .unwrap();
        assert!(account
            .payment_key
            .public_key()
            .verify(b"ownership", &sig)
            .is_ok());
    }

    #[test]
    fn sign_data_reward_address_uses_stake_key() {
        let wallet = demo_wallet();
        let account = wallet.get_account(0, 0);
        let proof = wallet
            .sign_data(&account.reward_address(), b"delegate", 0, 0)
            .unwrap();
        assert_eq!(
            proof.key,
            hex::encode(account.stake_key.public_key().to_bytes())
        );
    }

    #[test]
    fn sign_data_foreign_address_fails() {
        let wallet = demo_wallet();
        let other = wallet.get_account(7, 0).base_address();
        let err = wallet.sign_data(&other, b"payload", 0, 0).unwrap_err();
        assert!(matches!(err, WalletError::ForeignAddress(_)));
    }

    // --- sign_transaction ---

    #[test]
    fn sign_transaction_round_trip() {
        let wallet = demo_wallet();
        let tx = Tx::unsigned(demo_body());
        let signed_hex = wallet
            .sign_transaction(&tx.to_hex().unwrap(), false, 0, 0)
            .unwrap();
        let signed = Tx::from_hex(&signed_hex).unwrap();
        assert_eq!(signed.body, tx.body);
        assert_eq!(signed.witness_set.len(), 1);
    }

    #[test]
    fn sign_transaction_rejects_already_witnessed() {
        let wallet = demo_wallet();
        let body = demo_body();
        let witness = wallet.sign_tx(&body, 1, 0).unwrap();
        let mut set = WitnessSet::new();
        set.add(witness);
        let tx = Tx {
            body,
            witness_set: set,
        };
        let err = wallet
            .sign_transaction(&tx.to_hex().unwrap(), false, 0, 0)
            .unwrap_err();
        assert_eq!(err, WalletError::AlreadyWitnessed);
    }

    #[test]
    fn partial_sign_accumulates_witnesses() {
        let wallet = demo_wallet();
        let body = demo_body();
        let unsigned = Tx::unsigned(body);
        let once = wallet
            .sign_transaction(&unsigned.to_hex().unwrap(), false, 0, 0)
            .unwrap();
        let twice = wallet.sign_transaction(&once, true, 1, 0).unwrap();
        let tx = Tx::from_hex(&twice).unwrap();
        assert_eq!(tx.witness_set.len(), 2);
    }

    #[test]
    fn partial_sign_same_key_is_idempotent() {
        let wallet = demo_wallet();
        let unsigned = Tx::unsigned(demo_body());
        let once = wallet
            .sign_transaction(&unsigned.to_hex().unwrap(), false, 0, 0)
            .unwrap();
        let again = wallet.sign_transaction(&once, true, 0, 0).unwrap();
        assert_eq!(Tx::from_hex(&again).unwrap().witness_set.len(), 1);
    }

    #[test]
    fn sign_txs_preserves_per_entry_intent() {
        let wallet = demo_wallet();
        let unsigned = Tx::unsigned(demo_body()).to_hex().unwrap();
        let presigned = wallet.sign_transaction(&unsigned, false, 1, 0).unwrap();
        let signed = wallet
            .sign_txs(&[(unsigned, false), (presigned.clone(), true)], 0, 0)
            .unwrap();
        assert_eq!(signed.len(), 2);
        assert_eq!(Tx::from_hex(&signed[0]).unwrap().witness_set.len(), 1);
        assert_eq!(Tx::from_hex(&signed[1]).unwrap().witness_set.len(), 2);

        let err = wallet
            .sign_txs(&[(presigned, false)], 0, 0)
            .unwrap_err();
        assert_eq!(err, WalletError::AlreadyWitnessed);
    }

    // --- capabilities ---

    struct StaticFetcher(Vec<Utxo>);

    #[async_trait]
    impl Fetcher for StaticFetcher {
        async fn fetch_address_utxos(
            &self,
            _address: &Address,
        ) -> Result<Vec<Utxo>, ProviderError> {
            Ok(self.0.clone())
        }

        async fn fetch_utxos(&self, _tx_hash: &Hash32) -> Result<Vec<Utxo>, ProviderError> {
            Ok(self.0.clone())
        }
    }

    struct EchoSubmitter;

    #[async_trait]
    impl Submitter for EchoSubmitter {
        async fn submit_tx(&self, signed_tx_hex: &str) -> Result<Hash32, ProviderError> {
            let bytes = hex::decode(signed_tx_hex)
                .map_err(|e| ProviderError::Submit(e.to_string()))?;
            Ok(ebb_core::crypto::blake2b_256(&bytes))
        }
    }

    #[tokio::test]
    async fn missing_capabilities_fail_fast() {
        let wallet = demo_wallet();
        let address = wallet.get_account(0, 0).base_address();
        assert_eq!(
            wallet.fetch_address_utxos(&address).await.unwrap_err(),
            WalletError::CapabilityNotProvided("fetcher")
        );
        assert_eq!(
            wallet.submit_tx("82").await.unwrap_err(),
            WalletError::CapabilityNotProvided("submitter")
        );
    }

    #[tokio::test]
    async fn attached_capabilities_are_used() {
        let utxo = Utxo {
            input: TxInput {
                tx_hash: Hash32::from_bytes([9u8; 32]),
                output_index: 0,
            },
            output: TxOutput::new(
                demo_wallet().get_account(0, 0).base_address(),
                Value::lovelace(5_000_000),
            ),
        };
        let wallet = demo_wallet()
            .with_fetcher(Arc::new(StaticFetcher(vec![utxo.clone()])))
            .with_submitter(Arc::new(EchoSubmitter));

        let address = wallet.get_account(0, 0).base_address();
        assert_eq!(wallet.fetch_address_utxos(&address).await.unwrap(), vec![utxo.clone()]);
        assert_eq!(
            wallet.fetch_utxos(&Hash32::from_bytes([9u8; 32])).await.unwrap(),
            vec![utxo]
        );

        let signed = wallet
            .sign_transaction(&Tx::unsigned(demo_body()).to_hex().unwrap(), false, 0, 0)
            .unwrap();
        let tx_hash = wallet.submit_tx(&signed).await.unwrap();
        assert_eq!(
            tx_hash,
            ebb_core::crypto::blake2b_256(&hex::decode(&signed).unwrap())
        );
    }
}
