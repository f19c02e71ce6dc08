//! The lock/unlock state machine governing when wallet secrets are in
//! memory.
//!
//! A [`SessionManager`] owns the only in-memory copy of the password and the
//! decrypted [`Vault`]. They exist only while the session is
//! [`LockState::Unlocked`] and are wiped on lock, on reset, on inactivity and
//! when the manager is dropped.
//!
//! ```text
//!                 setup_password
//!   NoPassword ───────────────────┐
//!       ▲                          ▼
//!       │ reset_wallet          Unlocked ◀──┐
//!       │ (from any state)         │        │ unlock
//!       │                lock /    │        │
//!       │                idle      ▼        │
//!       └──────────────────────  Locked ────┘
//! ```
//!
//! Every transition runs while holding the session mutex, so transitions
//! never interleave. Key derivation and encryption run on the blocking pool.

mod error;
mod events;
mod lock_state;
mod lock_timer;


use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Weak;

pub use error::SessionError;
pub use events::LockReason;
pub use events::SessionEvent;
use futures::FutureExt;
pub use lock_state::LockState;
use lock_state::Session;
pub use lock_timer::IdleCallback;
pub use lock_timer::InactivityLockTimer;
use serde_json::json;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::debug;
use tracing::info;
use tracing::warn;
use zeroize::Zeroizing;

use crate::application::config::session_config::minutes;
use crate::application::config::SessionConfig;
use crate::application::locks::tokio::AtomicMutex;
use crate::application::locks::tokio::AtomicMutexGuard;
use crate::state::encryption::EncryptedContainer;
use crate::state::encryption::PasswordHasher;
use crate::state::encryption::PasswordPolicy;
use crate::state::encryption::VaultCipher;
use crate::state::key_material::validate_mnemonic;
use crate::state::key_material::KeyMaterial;
use crate::state::key_material::KeyMaterialProvider;
use crate::state::store::entries;
use crate::state::store::keys;
use crate::state::store::VaultStore;
use crate::state::vault::TransactionRecord;
use crate::state::vault::TransactionStatus;
use crate::state::vault::Vault;
use crate::state::vault::VaultError;
use crate::state::vault::WalletRecord;

type SessionGuard<'a> = AtomicMutexGuard<'a, Session>;

/// Handle to a wallet session. Cheap to clone; clones share one session.
#[derive(Debug, Clone)]
pub struct SessionManager {
    inner: Arc<SessionInner>,
}

#[derive(Debug)]
struct SessionInner {
    store: Arc<dyn VaultStore>,
    session: AtomicMutex<Session>,
    timer: InactivityLockTimer,

    // mirrors `session.state == Unlocked` for callers that must not wait on
    // the session mutex
    unlocked: AtomicBool,

    events: broadcast::Sender<SessionEvent>,
    policy: PasswordPolicy,
}

impl SessionManager {
    /// Read the persisted password flag, hash and auto-lock preference and
    /// start in [`LockState::Locked`] if a password exists, otherwise in
    /// [`LockState::NoPassword`].
    pub async fn open(
        store: Arc<dyn VaultStore>,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        let stored = store
            .get(&[keys::HAS_PASSWORD, keys::PASSWORD_HASH, keys::AUTO_LOCK_TIME])
            .await?;

        let has_password = stored
            .get(keys::HAS_PASSWORD)
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let password_hash = stored
            .get(keys::PASSWORD_HASH)
            .and_then(Value::as_str)
            .map(str::to_owned);
        let auto_lock_minutes = stored
            .get(keys::AUTO_LOCK_TIME)
            .and_then(Value::as_u64)
            .and_then(|m| u32::try_from(m).ok())
            .filter(|m| *m > 0)
            .unwrap_or(config.auto_lock_minutes);

        let state = match (has_password, &password_hash) {
            (true, Some(_)) => LockState::Locked,
            (true, None) => {
                warn!("password flag is set but no hash is stored; treating as no password");
                LockState::NoPassword
            }
            (false, _) => LockState::NoPassword,
        };

        let session = Session {
            state,
            password_hash: password_hash.filter(|_| state.has_password()),
            ..Default::default()
        };

        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let inner = Arc::new_cyclic(|weak: &Weak<SessionInner>| {
            let weak = weak.clone();
            let on_idle: IdleCallback = Arc::new(move || {
                let weak = weak.clone();
                async move {
                    if let Some(inner) = weak.upgrade() {
                        SessionManager { inner }.lock_if_idle().await;
                    }
                }
                .boxed()
            });

            SessionInner {
                store,
                session: AtomicMutex::<Session>::from((
                    session,
                    Some("session"),
                    Some(crate::LOG_LOCK_EVENT_CB),
                )),
                timer: InactivityLockTimer::new(minutes(auto_lock_minutes), on_idle),
                unlocked: AtomicBool::new(false),
                events,
                policy: config.password_policy,
            }
        });

        info!(%state, auto_lock_minutes, "session opened");
        Ok(Self { inner })
    }

    pub async fn state(&self) -> LockState {
        self.inner.session.lock(|s| s.state).await
    }

    /// Receive lifecycle events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    /// Current idle threshold in whole minutes.
    pub fn auto_lock_minutes(&self) -> u32 {
        u32::try_from(self.inner.timer.timeout().as_secs() / 60).unwrap_or(u32::MAX)
    }

    /// Set the first password. Stores its hash and an empty encrypted vault
    /// in a single write, then leaves the session unlocked.
    pub async fn setup_password(&self, password: &str) -> Result<(), SessionError> {
        let mut session = self.inner.session.lock_guard_mut().await;
        match session.state {
            LockState::NoPassword => {}
            LockState::Uninitialized => return Err(SessionError::NoPasswordConfigured),
            LockState::Locked | LockState::Unlocked => {
                return Err(SessionError::PasswordAlreadyConfigured)
            }
        }
        self.check_policy(password)?;

        let password = Zeroizing::new(password.to_owned());
        let vault = Vault::default();
        let container = encrypt_vault(&vault, &password).await?;
        let hash = PasswordHasher::hash(&password);

        self.inner
            .store
            .set(entries([
                (keys::PASSWORD_HASH, json!(hash)),
                (keys::HAS_PASSWORD, json!(true)),
                (keys::ENCRYPTED_WALLET_DATA, json!(container.as_str())),
            ]))
            .await?;

        session.password_hash = Some(hash);
        session.hold(password, vault);
        self.inner.unlocked.store(true, Ordering::SeqCst);
        self.inner.timer.reset_timer();

        info!("password set up; session unlocked");
        self.emit(SessionEvent::Unlocked);
        Ok(())
    }

    /// Verify `password` and decrypt the stored vault into memory.
    ///
    /// A missing container yields an empty vault. Unlocking an already
    /// unlocked session re-verifies the password and returns the held vault.
    /// On any failure the session stays locked.
    pub async fn unlock(&self, password: &str) -> Result<Vault, SessionError> {
        let mut session = self.inner.session.lock_guard_mut().await;
        if !session.state.has_password() {
            return Err(SessionError::NoPasswordConfigured);
        }
        let stored_hash = session
            .password_hash
            .as_deref()
            .ok_or(SessionError::NoPasswordConfigured)?;

        if !PasswordHasher::verify(password, stored_hash) {
            warn!("unlock rejected: incorrect password");
            return Err(SessionError::InvalidPassword);
        }

        if session.state.is_unlocked() {
            self.inner.timer.reset_timer();
            return held_vault(&session).cloned();
        }

        let password = Zeroizing::new(password.to_owned());
        let vault = match self.load_container().await? {
            None => {
                debug!("no stored vault; unlocking with an empty one");
                Vault::default()
            }
            Some(container) => decrypt_vault(container, &password)
                .await
                .inspect_err(|e| match e {
                    SessionError::DecryptionFailed => {
                        warn!("unlock failed: password hash matched but the vault did not decrypt")
                    }
                    SessionError::MalformedVault(detail) => {
                        warn!("unlock failed: decrypted vault is malformed: {detail}")
                    }
                    _ => {}
                })?,
        };

        session.hold(password, vault.clone());
        self.inner.unlocked.store(true, Ordering::SeqCst);
        self.inner.timer.reset_timer();

        info!(wallets = vault.wallet_count(), "session unlocked");
        self.emit(SessionEvent::Unlocked);
        Ok(vault)
    }

    /// Drop the password and vault from memory. Does nothing unless unlocked.
    pub async fn lock(&self) {
        let mut session = self.inner.session.lock_guard_mut().await;
        self.seal(&mut session, LockReason::Manual);
    }

    async fn lock_if_idle(&self) {
        let mut session = self.inner.session.lock_guard_mut().await;
        // activity may have landed while we waited for the mutex
        if !self.inner.timer.idle_expired() {
            debug!("idle check superseded by activity");
            return;
        }
        self.seal(&mut session, LockReason::Inactivity);
    }

    fn seal(&self, session: &mut SessionGuard<'_>, reason: LockReason) {
        if !session.state.is_unlocked() {
            return;
        }
        session.clear_secrets();
        session.state = LockState::Locked;
        self.inner.unlocked.store(false, Ordering::SeqCst);
        self.inner.timer.clear_timer();

        info!(%reason, "session locked");
        self.emit(SessionEvent::Locked { reason });
    }

    /// Re-encrypt the vault under `new_password`. The new hash and container
    /// are written together, so a restart sees either the old pair or the
    /// new one.
    pub async fn change_password(
        &self,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), SessionError> {
        let mut session = self.inner.session.lock_guard_mut().await;
        let vault = held_vault(&session)?.clone();

        let current_matches = session
            .password
            .as_ref()
            .is_some_and(|held| held.as_str() == current_password);
        if !current_matches {
            warn!("password change rejected: incorrect current password");
            return Err(SessionError::InvalidPassword);
        }
        self.check_policy(new_password)?;

        let new_password = Zeroizing::new(new_password.to_owned());
        let container = encrypt_vault(&vault, &new_password).await?;
        let hash = PasswordHasher::hash(&new_password);

        self.inner
            .store
            .set(entries([
                (keys::PASSWORD_HASH, json!(hash)),
                (keys::HAS_PASSWORD, json!(true)),
                (keys::ENCRYPTED_WALLET_DATA, json!(container.as_str())),
            ]))
            .await?;

        session.password_hash = Some(hash);
        session.password = Some(new_password);
        self.inner.timer.reset_timer();

        info!("password changed");
        self.emit(SessionEvent::PasswordChanged);
        Ok(())
    }

    /// Clone of the decrypted vault.
    pub async fn vault(&self) -> Result<Vault, SessionError> {
        self.inner
            .session
            .lock(|session| held_vault(session).cloned())
            .await
    }

    /// Replace the vault, encrypting it under the held password.
    pub async fn save_vault(&self, vault: Vault) -> Result<(), SessionError> {
        let mut session = self.inner.session.lock_guard_mut().await;
        held_vault(&session)?;
        self.persist(&mut session, vault).await
    }

    /// Apply `mutate` to a copy of the vault and save the result. Nothing is
    /// saved if `mutate` fails.
    pub async fn update_vault<R, F>(&self, mutate: F) -> Result<R, SessionError>
    where
        F: FnOnce(&mut Vault) -> Result<R, VaultError>,
    {
        let mut session = self.inner.session.lock_guard_mut().await;
        let mut vault = held_vault(&session)?.clone();
        let result = mutate(&mut vault)?;
        self.persist(&mut session, vault).await?;
        Ok(result)
    }

    async fn persist(
        &self,
        session: &mut SessionGuard<'_>,
        vault: Vault,
    ) -> Result<(), SessionError> {
        vault.validate()?;
        let password = session.password.clone().ok_or(SessionError::NotUnlocked)?;
        let container = encrypt_vault(&vault, &password).await?;

        self.inner
            .store
            .set(entries([(keys::ENCRYPTED_WALLET_DATA, json!(container.as_str()))]))
            .await?;

        session.vault = Some(vault);
        debug!("vault saved");
        self.emit(SessionEvent::VaultUpdated);
        Ok(())
    }

    /// Store a freshly generated account and make it active. `name` defaults
    /// to "Account N".
    pub async fn create_account(
        &self,
        provider: &dyn KeyMaterialProvider,
        name: Option<&str>,
    ) -> Result<WalletRecord, SessionError> {
        held_vault(&*self.inner.session.lock_guard().await)?;
        let material = provider.generate()?;
        self.add_account(material, name).await
    }

    /// Restore an account from a recovery phrase and make it active.
    pub async fn import_account(
        &self,
        provider: &dyn KeyMaterialProvider,
        phrase: &str,
        name: Option<&str>,
    ) -> Result<WalletRecord, SessionError> {
        held_vault(&*self.inner.session.lock_guard().await)?;
        validate_mnemonic(phrase)?;
        let material = provider.from_mnemonic(phrase)?;
        self.add_account(material, name).await
    }

    /// Store externally supplied key material as an account and make it
    /// active. An account with the same address is replaced.
    pub async fn add_account(
        &self,
        material: KeyMaterial,
        name: Option<&str>,
    ) -> Result<WalletRecord, SessionError> {
        material.check_mnemonic()?;
        self.update_vault(|vault| {
            let name = name.map_or_else(|| vault.next_account_name(), str::to_owned);
            let record = material.into_wallet_record(name);
            vault.add_wallet(record.clone());
            Ok(record)
        })
        .await
    }

    pub async fn set_active_wallet(&self, address: &str) -> Result<(), SessionError> {
        self.update_vault(|vault| vault.set_active_wallet(address)).await
    }

    pub async fn record_transaction(
        &self,
        transaction: TransactionRecord,
    ) -> Result<(), SessionError> {
        self.update_vault(|vault| {
            vault.record_transaction(transaction);
            Ok(())
        })
        .await
    }

    pub async fn set_transaction_status(
        &self,
        hash: &str,
        status: TransactionStatus,
    ) -> Result<(), SessionError> {
        self.update_vault(|vault| vault.set_transaction_status(hash, status))
            .await
    }

    /// Erase every persisted wallet key and forget the password. The
    /// auto-lock preference is kept. If the store fails nothing changes.
    pub async fn reset_wallet(&self) -> Result<(), SessionError> {
        let mut session = self.inner.session.lock_guard_mut().await;
        self.inner.store.remove(&keys::RESET).await?;

        session.clear_secrets();
        session.password_hash = None;
        session.state = LockState::NoPassword;
        self.inner.unlocked.store(false, Ordering::SeqCst);
        self.inner.timer.clear_timer();

        info!("wallet reset");
        self.emit(SessionEvent::Reset);
        Ok(())
    }

    /// Note user activity, postponing auto-lock. Ignored unless unlocked.
    ///
    /// Activity that lands while a fired idle check is still waiting for the
    /// session mutex counts: the check re-reads the last activity before
    /// locking.
    pub fn record_activity(&self) {
        if self.inner.unlocked.load(Ordering::SeqCst) {
            self.inner.timer.reset_timer();
        }
    }

    /// Persist a new idle threshold and apply it to the running timer.
    pub async fn set_auto_lock_minutes(&self, minutes_idle: u32) -> Result<(), SessionError> {
        if minutes_idle == 0 {
            return Err(SessionError::InvalidAutoLock(minutes_idle));
        }
        let session = self.inner.session.lock_guard_mut().await;

        self.inner
            .store
            .set(entries([(keys::AUTO_LOCK_TIME, json!(minutes_idle))]))
            .await?;

        self.inner.timer.set_timeout(minutes(minutes_idle));
        if session.state.is_unlocked() {
            self.inner.timer.reset_timer();
        }

        info!(minutes = minutes_idle, "auto-lock time updated");
        Ok(())
    }

    async fn load_container(&self) -> Result<Option<EncryptedContainer>, SessionError> {
        let stored = self.inner.store.get(&[keys::ENCRYPTED_WALLET_DATA]).await?;
        match stored.get(keys::ENCRYPTED_WALLET_DATA) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(encoded)) => {
                Ok(Some(EncryptedContainer::from_encoded(encoded.as_str())))
            }
            Some(other) => Err(SessionError::MalformedVault(format!(
                "stored container is not a string: {}",
                json_type(other)
            ))),
        }
    }

    fn check_policy(&self, password: &str) -> Result<(), SessionError> {
        self.inner
            .policy
            .check(password)
            .map_err(|strength| SessionError::WeakPassword {
                score: strength.score(),
                feedback: strength.feedback().to_vec(),
            })
    }

    fn emit(&self, event: SessionEvent) {
        // no subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

fn held_vault(session: &Session) -> Result<&Vault, SessionError> {
    match (&session.state, &session.vault) {
        (LockState::Unlocked, Some(vault)) => Ok(vault),
        _ => Err(SessionError::NotUnlocked),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

async fn encrypt_vault(
    vault: &Vault,
    password: &Zeroizing<String>,
) -> Result<EncryptedContainer, SessionError> {
    let vault = vault.clone();
    let password = password.clone();
    let container =
        tokio::task::spawn_blocking(move || VaultCipher::encrypt(&vault, &password)).await??;
    Ok(container)
}

async fn decrypt_vault(
    container: EncryptedContainer,
    password: &Zeroizing<String>,
) -> Result<Vault, SessionError> {
    let password = password.clone();
    let vault =
        tokio::task::spawn_blocking(move || VaultCipher::decrypt::<Vault>(&container, &password))
            .await??;
    vault
        .validate()
        .map_err(|e| SessionError::MalformedVault(e.to_string()))?;
    Ok(vault)
}
