use serde::Deserialize;
use serde::Serialize;
use zeroize::Zeroize;
use zeroize::ZeroizeOnDrop;

/// One account held in the vault.
///
/// The private key and recovery phrase are wiped from memory when the record
/// is dropped, and never appear in `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(rename_all = "camelCase")]
pub struct WalletRecord {
    pub name: String,
    pub address: String,
    pub private_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mnemonic: Option<String>,
}

impl WalletRecord {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        private_key: impl Into<String>,
        mnemonic: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            private_key: private_key.into(),
            mnemonic,
        }
    }

    pub fn has_mnemonic(&self) -> bool {
        self.mnemonic.is_some()
    }
}

impl std::fmt::Debug for WalletRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WalletRecord")
            .field("name", &self.name)
            .field("address", &self.address)
            .field("private_key", &"<redacted>")
            .field("mnemonic", &self.mnemonic.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
