//! Request dispatch
//!
//! One request per line, `{"op": "...", "params": {...}}`, answered by
//! exactly one of `{"data": ...}` or `{"error": "..."}`. A failing request
//! never takes the process down.

use bitcoin::bip32::Xpub;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;
use vaporkit_core::account::{derive_pubkey_info, Account, AccountError};
use vaporkit_core::address::{decode_address, AddressError};
use vaporkit_core::argument::{convert_argument, ArgumentError, ContractArgument};
use vaporkit_core::crypto::{Argon2Cipher, CryptoError, KdfParams, KeyCipher};
use vaporkit_core::keys::{Bip32Deriver, KeyError, XKey};
use vaporkit_core::keystore::{KeyStore, MemoryKeyStore};
use vaporkit_core::network::NetworkParams;
use vaporkit_tx::annotate::{decode_raw_tx, DecodeError};
use vaporkit_tx::sign::{EncryptedKey, KeyProvider, SignError, SigningEngine, StoredKey};
use vaporkit_tx::template::Template;

#[derive(Error, Debug)]
pub enum OpError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unknown op: {0}")]
    UnknownOp(String),
    #[error(transparent)]
    Key(#[from] KeyError),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error(transparent)]
    Address(#[from] AddressError),
    #[error(transparent)]
    Argument(#[from] ArgumentError),
    #[error(transparent)]
    Sign(#[from] SignError),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub op: String,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Data(Value),
    Error(String),
}

impl From<Result<Value, OpError>> for Response {
    fn from(result: Result<Value, OpError>) -> Self {
        match result {
            Ok(v) => Response::Data(v),
            Err(e) => Response::Error(e.to_string()),
        }
    }
}

#[derive(Deserialize)]
struct CreateKeyParams {
    alias: String,
    #[serde(alias = "password")]
    auth: String,
}

#[derive(Deserialize)]
struct ResetKeyPasswordParams {
    #[serde(rename = "rootXPub")]
    root_xpub: Xpub,
    #[serde(rename = "oldPassword")]
    old_password: String,
    #[serde(rename = "newPassword")]
    new_password: String,
}

/// A single xpub or a list of them
#[derive(Deserialize)]
#[serde(untagged)]
enum XpubList {
    One(Xpub),
    Many(Vec<Xpub>),
}

impl XpubList {
    fn into_vec(self) -> Vec<Xpub> {
        match self {
            XpubList::One(x) => vec![x],
            XpubList::Many(v) => v,
        }
    }
}

#[derive(Deserialize)]
struct CreateAccountParams {
    alias: String,
    quorum: usize,
    #[serde(rename = "rootXPub", alias = "rootXPubs")]
    root_xpubs: XpubList,
    #[serde(rename = "nextIndex")]
    next_index: u64,
}

#[derive(Deserialize)]
struct CreateAccountReceiverParams {
    /// An account object or its JSON text
    account: Value,
    #[serde(rename = "nextIndex")]
    next_index: u64,
    #[serde(default)]
    change: bool,
}

#[derive(Deserialize)]
struct CreatePubkeyParams {
    xpub: Xpub,
    #[serde(alias = "seed")]
    index: u64,
}

/// Either a keystore blob (object or JSON text) or the xpub of a stored key
#[derive(Deserialize)]
struct KeyRef {
    #[serde(default)]
    key: Option<Value>,
    #[serde(default)]
    xpub: Option<Xpub>,
}

#[derive(Deserialize)]
struct SignTransactionParams {
    /// A template object or its JSON text
    transaction: Value,
    password: String,
    #[serde(flatten)]
    key: KeyRef,
}

#[derive(Deserialize)]
struct SignMessageParams {
    message: String,
    password: String,
    #[serde(flatten)]
    key: KeyRef,
}

#[derive(Deserialize)]
struct DecodeAddressParams {
    address: String,
}

#[derive(Deserialize)]
struct DecodeRawTxParams {
    raw_transaction: String,
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, OpError> {
    serde_json::from_value(params).map_err(|e| OpError::BadRequest(e.to_string()))
}

/// Accept a value given either inline or as a JSON string
fn inline_or_text<T: DeserializeOwned>(value: Value, what: &str) -> Result<T, OpError> {
    let parsed = match value {
        Value::String(text) => serde_json::from_str(&text),
        other => serde_json::from_value(other),
    };
    parsed.map_err(|e| OpError::BadRequest(format!("{}: {}", what, e)))
}

fn to_data<T: Serialize>(value: &T) -> Result<Value, OpError> {
    serde_json::to_value(value).map_err(|e| OpError::BadRequest(e.to_string()))
}

/// Serves requests against one network and one in-memory key store
pub struct Dispatcher {
    params: NetworkParams,
    cipher: Argon2Cipher,
    store: MemoryKeyStore,
    deriver: Bip32Deriver,
    engine: SigningEngine,
}

impl Dispatcher {
    pub fn new(params: NetworkParams, kdf: KdfParams, store: MemoryKeyStore) -> Self {
        Self {
            params,
            cipher: Argon2Cipher::new(kdf),
            store,
            deriver: Bip32Deriver::new(),
            engine: SigningEngine::new(),
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &MemoryKeyStore {
        &self.store
    }

    /// Handle one request line. Malformed JSON is an error response too.
    pub fn handle_line(&mut self, line: &str) -> Response {
        match serde_json::from_str::<Request>(line) {
            Ok(request) => self.handle(request),
            Err(e) => Response::Error(format!("bad request: {}", e)),
        }
    }

    pub fn handle(&mut self, request: Request) -> Response {
        log::debug!("op {}", request.op);
        let result = self.dispatch(&request.op, request.params);
        if let Err(ref e) = result {
            log::info!("op {} failed: {}", request.op, e);
        }
        result.into()
    }

    fn dispatch(&mut self, op: &str, params: Value) -> Result<Value, OpError> {
        match op {
            "createKey" => self.create_key(parse_params(params)?),
            "resetKeyPassword" => self.reset_key_password(parse_params(params)?),
            "createAccount" => self.create_account(parse_params(params)?),
            "createAccountReceiver" => self.create_account_receiver(parse_params(params)?),
            "createPubkey" => self.create_pubkey(parse_params(params)?),
            "signTransaction" => self.sign_transaction(parse_params(params)?),
            "signMessage" => self.sign_message(parse_params(params)?),
            "convertArgument" => {
                let arg: ContractArgument = parse_params(params)?;
                Ok(Value::String(hex::encode(convert_argument(&arg)?)))
            }
            "decodeAddress" => self.decode_address(parse_params(params)?),
            "decodeRawTx" | "decodeVaporRawTx" => {
                let p: DecodeRawTxParams = parse_params(params)?;
                to_data(&decode_raw_tx(&p.raw_transaction, &self.params)?)
            }
            other => Err(OpError::UnknownOp(other.to_string())),
        }
    }

    fn create_key(&mut self, p: CreateKeyParams) -> Result<Value, OpError> {
        if p.auth.is_empty() {
            return Err(KeyError::BadInput("auth empty".into()).into());
        }
        let (key, mnemonic) = XKey::generate(&p.alias)?;
        let blob = self.cipher.encrypt(&key, &p.auth)?;
        let keystore: Value =
            serde_json::from_slice(&blob).map_err(|_| CryptoError::InvalidFormat)?;
        self.store.put(blob)?;

        log::info!("created key {} ({})", key.id, key.alias);
        Ok(json!({
            "xpub": key.xpub.to_string(),
            "keystore": keystore,
            "mnemonic": mnemonic.to_string(),
        }))
    }

    fn reset_key_password(&mut self, p: ResetKeyPasswordParams) -> Result<Value, OpError> {
        if p.new_password.is_empty() {
            return Err(KeyError::BadInput("new password empty".into()).into());
        }
        let blob = self
            .store
            .get_by_xpub(&p.root_xpub)
            .ok_or_else(|| SignError::KeyNotFound(p.root_xpub.to_string()))?;
        let blob = self
            .cipher
            .reset_password(&blob, &p.old_password, &p.new_password)?;
        let keystore: Value =
            serde_json::from_slice(&blob).map_err(|_| CryptoError::InvalidFormat)?;
        self.store.put(blob)?;
        Ok(keystore)
    }

    fn create_account(&self, p: CreateAccountParams) -> Result<Value, OpError> {
        let account = Account::new(&p.alias, p.root_xpubs.into_vec(), p.quorum, p.next_index)?;
        to_data(&account)
    }

    fn create_account_receiver(&self, p: CreateAccountReceiverParams) -> Result<Value, OpError> {
        let account: Account = inline_or_text(p.account, "account")?;
        let cp = account.next_receive_program(&self.deriver, p.next_index, p.change, &self.params)?;
        let mut db = serde_json::Map::new();
        db.insert(cp.storage_key(), to_data(&cp)?);
        Ok(json!({
            "control_program": hex::encode(cp.control_program.as_bytes()),
            "address": cp.address,
            "db": db,
        }))
    }

    fn create_pubkey(&self, p: CreatePubkeyParams) -> Result<Value, OpError> {
        to_data(&derive_pubkey_info(&p.xpub, p.index)?)
    }

    /// Resolve the key a signing request names. An inline blob wins over an
    /// xpub lookup.
    fn provider(&self, key: KeyRef) -> Result<Box<dyn KeyProvider + '_>, OpError> {
        match (key.key, key.xpub) {
            (Some(blob), _) => {
                let blob = match blob {
                    Value::String(text) => text.into_bytes(),
                    other => other.to_string().into_bytes(),
                };
                Ok(Box::new(EncryptedKey::with_cipher(blob, self.cipher)))
            }
            (None, Some(xpub)) => Ok(Box::new(StoredKey::with_cipher(&self.store, xpub, self.cipher))),
            (None, None) => Err(SignError::BadInput("key or xpub required".into()).into()),
        }
    }

    fn sign_transaction(&self, p: SignTransactionParams) -> Result<Value, OpError> {
        let template: Template = match p.transaction {
            Value::String(text) => serde_json::from_str(&text),
            other => serde_json::from_value(other),
        }
        .map_err(|e| SignError::MalformedTemplate(e.to_string()))?;
        let provider = self.provider(p.key)?;
        let response = self
            .engine
            .sign_template(provider.as_ref(), &p.password, &template)?;
        to_data(&response)
    }

    fn sign_message(&self, p: SignMessageParams) -> Result<Value, OpError> {
        let provider = self.provider(p.key)?;
        let signature = self
            .engine
            .sign_message(provider.as_ref(), &p.password, p.message.as_bytes())?;
        to_data(&signature)
    }

    fn decode_address(&self, p: DecodeAddressParams) -> Result<Value, OpError> {
        let address = decode_address(&p.address)?;
        let program = address.to_program()?;
        Ok(json!({
            "hash": hex::encode(&address.hash),
            "kind": address.kind,
            "chain": address.params.chain,
            "network": address.params.network,
            "control_program": hex::encode(program.as_bytes()),
        }))
    }
}
