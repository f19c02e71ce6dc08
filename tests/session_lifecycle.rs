mod common;

use std::sync::Arc;

use assert2::assert;
use assert2::let_assert;
use common::logging;
use serde_json::Value;
use wallet_vault::application::config::SessionConfig;
use wallet_vault::state::session::LockState;
use wallet_vault::state::session::SessionError;
use wallet_vault::state::session::SessionManager;
use wallet_vault::state::store::keys;
use wallet_vault::state::store::FileStore;
use wallet_vault::state::store::MemoryStore;
use wallet_vault::state::store::VaultStore;
use wallet_vault::state::vault::TransactionRecord;
use wallet_vault::state::vault::TransactionStatus;
use wallet_vault::state::vault::WalletRecord;

const PASSWORD: &str = "Tr0ub4dor&3";
const NEW_PASSWORD: &str = "CorrectHorse9";

async fn open(store: Arc<dyn VaultStore>) -> anyhow::Result<SessionManager> {
    Ok(SessionManager::open(store, SessionConfig::default()).await?)
}

/// scenario:
/// 1. set up a password on an empty store
/// 2. save one account and lock
/// 3. a wrong password is rejected and the session stays locked
/// 4. the right password brings the account back
#[tokio::test]
async fn setup_save_lock_unlock() -> anyhow::Result<()> {
    logging::tracing_logger();

    let session = open(Arc::new(MemoryStore::new())).await?;
    assert!(session.state().await == LockState::NoPassword);

    session.setup_password(PASSWORD).await?;
    session
        .update_vault(|vault| {
            vault.add_wallet(WalletRecord::new("Account 1", "0xabc", "0x4c0883a6", None));
            Ok(())
        })
        .await?;

    session.lock().await;
    assert!(session.state().await == LockState::Locked);
    let_assert!(Err(SessionError::NotUnlocked) = session.vault().await);

    let_assert!(Err(SessionError::InvalidPassword) = session.unlock("wrong").await);
    assert!(session.state().await == LockState::Locked);

    let vault = session.unlock(PASSWORD).await?;
    assert!(session.state().await == LockState::Unlocked);
    assert!(vault.wallet("0xabc").is_some());
    assert!(vault.active_wallet_address() == Some("0xabc"));

    Ok(())
}

/// A changed password survives a restart, and the old password no longer
/// opens the vault.
#[tokio::test]
async fn changed_password_survives_restart() -> anyhow::Result<()> {
    logging::tracing_logger();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("vault.json");

    {
        let session = open(Arc::new(FileStore::new(&path))).await?;
        session.setup_password(PASSWORD).await?;
        session
            .record_transaction(TransactionRecord {
                hash: "0x01".into(),
                from: "0xabc".into(),
                to: "0xdef".into(),
                value: "0.1".into(),
                network: "ETHEREUM_SEPOLIA".into(),
                timestamp: 1_700_000_000_000,
                status: TransactionStatus::Pending,
                data: None,
            })
            .await?;
        session.change_password(PASSWORD, NEW_PASSWORD).await?;
        session.lock().await;
    }

    let session = open(Arc::new(FileStore::new(&path))).await?;
    assert!(session.state().await == LockState::Locked);

    let_assert!(Err(SessionError::InvalidPassword) = session.unlock(PASSWORD).await);
    let vault = session.unlock(NEW_PASSWORD).await?;
    let_assert!([tx] = vault.transactions());
    assert!(tx.hash == "0x01");
    assert!(tx.status == TransactionStatus::Pending);

    Ok(())
}

/// After a reset nothing of the old vault can be recovered, while the
/// auto-lock preference is kept.
#[tokio::test]
async fn reset_is_final() -> anyhow::Result<()> {
    logging::tracing_logger();

    let dir = tempfile::tempdir()?;
    let path = dir.path().join("vault.json");

    {
        let session = open(Arc::new(FileStore::new(&path))).await?;
        session.setup_password(PASSWORD).await?;
        session.set_auto_lock_minutes(5).await?;
        session
            .update_vault(|vault| {
                vault.add_wallet(WalletRecord::new("Account 1", "0xabc", "0x01", None));
                Ok(())
            })
            .await?;
        session.reset_wallet().await?;
        assert!(session.state().await == LockState::NoPassword);
    }

    let store = Arc::new(FileStore::new(&path));
    let stored = store.get(&keys::RESET).await?;
    assert!(stored.is_empty());

    let session = open(store.clone()).await?;
    assert!(session.state().await == LockState::NoPassword);
    assert!(session.auto_lock_minutes() == 5);
    let_assert!(Err(SessionError::NoPasswordConfigured) = session.unlock(PASSWORD).await);

    // a new password starts from an empty vault
    session.setup_password(PASSWORD).await?;
    assert!(session.vault().await?.is_empty());

    let stored = store.get(&[keys::AUTO_LOCK_TIME]).await?;
    assert!(stored.get(keys::AUTO_LOCK_TIME).and_then(Value::as_u64) == Some(5));

    Ok(())
}
