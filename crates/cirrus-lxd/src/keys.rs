//! SSH key pairs injected into instances through cloud-init.

use crate::cloud::Lxd;
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Key size of generated RSA key pairs.
const GENERATED_KEY_BITS: &str = "4096";

/// An SSH key pair whose public half is authorized on launched instances.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPair {
    public_key_path: PathBuf,
    private_key_path: PathBuf,
    public_key_content: String,
}

impl KeyPair {
    /// Create a key pair from already-known public key content.
    pub fn new(
        public_key_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
        public_key_content: impl Into<String>,
    ) -> Self {
        Self {
            public_key_path: public_key_path.into(),
            private_key_path: private_key_path.into(),
            public_key_content: public_key_content.into().trim().to_string(),
        }
    }

    /// Load a key pair, reading the public key from disk.
    ///
    /// # Errors
    /// Returns an error if the public key cannot be read.
    pub async fn load(
        public_key_path: impl Into<PathBuf>,
        private_key_path: impl Into<PathBuf>,
    ) -> Result<Self> {
        let public_key_path = public_key_path.into();
        let content = tokio::fs::read_to_string(&public_key_path).await?;
        Ok(Self::new(public_key_path, private_key_path, content))
    }

    pub fn public_key_path(&self) -> &Path {
        &self.public_key_path
    }

    pub fn private_key_path(&self) -> &Path {
        &self.private_key_path
    }

    pub fn public_key_content(&self) -> &str {
        &self.public_key_content
    }

    /// cloud-config fragment authorizing this key for the default user.
    pub fn authorized_keys_block(&self) -> String {
        format!("ssh_authorized_keys:\n    - {}\n", self.public_key_content)
    }

    /// Whether an `authorized_keys` file already lists this key.
    pub fn is_authorized_in(&self, authorized_keys: &str) -> bool {
        !self.public_key_content.is_empty() && authorized_keys.contains(&self.public_key_content)
    }
}

impl Lxd {
    /// Generate a fresh 4096-bit RSA key pair with `ssh-keygen`.
    ///
    /// The public key carries no comment and the private key is PEM encoded.
    /// The key is written to a temporary staging directory that is removed
    /// before returning.
    ///
    /// # Returns
    /// `(public_key, private_key)` as OpenSSH text.
    pub async fn create_key_pair(&self) -> Result<(String, String)> {
        let staging = tempfile::tempdir()?;
        let private_path = staging.path().join("id_rsa");
        let public_path = staging.path().join("id_rsa.pub");

        let args = vec![
            "ssh-keygen".to_string(),
            "-t".into(),
            "rsa".into(),
            "-b".into(),
            GENERATED_KEY_BITS.into(),
            "-N".into(),
            String::new(),
            "-C".into(),
            String::new(),
            "-m".into(),
            "PEM".into(),
            "-q".into(),
            "-f".into(),
            private_path.to_string_lossy().into_owned(),
        ];
        self.runner().run(&args, None).await?;

        let public_key = tokio::fs::read_to_string(&public_path).await?;
        let private_key = tokio::fs::read_to_string(&private_path).await?;
        tracing::debug!("Generated RSA key pair");

        Ok((public_key.trim().to_string(), private_key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorized_keys_block() {
        let key = KeyPair::new("id.pub", "id", "ssh-rsa AAAA test@host\n");
        assert_eq!(key.public_key_content(), "ssh-rsa AAAA test@host");
        assert_eq!(
            key.authorized_keys_block(),
            "ssh_authorized_keys:\n    - ssh-rsa AAAA test@host\n"
        );
    }

    #[test]
    fn test_is_authorized_in() {
        let key = KeyPair::new("id.pub", "id", "ssh-rsa AAAA test@host");
        assert!(key.is_authorized_in("ssh-ed25519 BBBB other\nssh-rsa AAAA test@host\n"));
        assert!(!key.is_authorized_in("ssh-ed25519 BBBB other\n"));

        let empty = KeyPair::new("id.pub", "id", "");
        assert!(!empty.is_authorized_in("anything"));
    }

    #[tokio::test]
    async fn test_load_reads_public_key() {
        let dir = tempfile::tempdir().unwrap();
        let public = dir.path().join("id_rsa.pub");
        std::fs::write(&public, "ssh-rsa CCCC me@box\n").unwrap();

        let key = KeyPair::load(&public, dir.path().join("id_rsa")).await.unwrap();
        assert_eq!(key.public_key_content(), "ssh-rsa CCCC me@box");
        assert_eq!(key.public_key_path(), public.as_path());
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = KeyPair::load(dir.path().join("nope.pub"), dir.path().join("nope")).await;
        assert!(result.is_err());
    }
}
