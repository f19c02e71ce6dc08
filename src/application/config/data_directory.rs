use std::path::Path;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use directories::ProjectDirs;

const VAULT_FILE_NAME: &str = "vault.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataDirectory {
    data_dir: PathBuf,
}

impl DataDirectory {
    /// The data directory to use, either supplied or the platform default:
    /// - Linux:   /home/alice/.local/share/wallet-vault
    /// - Windows: C:\Users\Alice\AppData\Roaming\wallet-vault\data
    /// - macOS:   /Users/Alice/Library/Application Support/org.wallet-vault.wallet-vault
    pub fn get(root_dir: Option<PathBuf>) -> Result<Self> {
        let data_dir = match root_dir {
            Some(dir) => dir,
            None => ProjectDirs::from("org", "wallet-vault", "wallet-vault")
                .context("Could not determine data directory")?
                .data_dir()
                .to_path_buf(),
        };

        Ok(DataDirectory { data_dir })
    }

    /// Create directory if it does not exist
    pub async fn create_dir_if_not_exists(dir: &Path) -> Result<()> {
        tokio::fs::create_dir_all(dir)
            .await
            .with_context(|| format!("Failed to create data directory {}", dir.to_string_lossy()))
    }

    pub fn root_dir_path(&self) -> PathBuf {
        self.data_dir.clone()
    }

    /// The JSON document holding the encrypted vault and session settings.
    pub fn vault_file_path(&self) -> PathBuf {
        self.data_dir.join(VAULT_FILE_NAME)
    }
}

impl std::fmt::Display for DataDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.data_dir.display())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn explicit_root_is_used_as_is() {
        let dir = DataDirectory::get(Some(PathBuf::from("/tmp/vault-test"))).unwrap();
        assert_eq!(PathBuf::from("/tmp/vault-test"), dir.root_dir_path());
        assert_eq!(PathBuf::from("/tmp/vault-test/vault.json"), dir.vault_file_path());
    }

    #[tokio::test]
    async fn creates_missing_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");

        DataDirectory::create_dir_if_not_exists(&nested).await.unwrap();
        assert!(nested.is_dir());
    }
}
