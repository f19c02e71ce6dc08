use serde::Deserialize;
use serde::Serialize;

/// Confirmation status of a sent transaction
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Confirmed,
    Failed,
}

/// A transaction sent from one of the vault's accounts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    pub hash: String,
    pub from: String,
    pub to: String,

    /// amount in the network's display unit, as entered
    pub value: String,
    pub network: String,

    /// unix epoch milliseconds
    pub timestamp: u64,

    #[serde(default)]
    pub status: TransactionStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}
