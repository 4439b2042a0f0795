//! Security token storage
//!
//! The server identifies this host by an opaque security token that it
//! hands out during authentication. The token is persisted between runs in
//! a single file, sealed so that only the same OS user can read it back.
//!
//! # Protection Model
//!
//! - Sealing is behind [`TokenProtector`]; the default [`UserKeyProtector`]
//!   uses XChaCha20-Poly1305 under a 32-byte per-user key
//! - The key file is created on first use with mode 0600 on Unix
//! - The token file layout is `nonce (24 bytes) || ciphertext`, not versioned
//! - Writes go to a sibling temp file which is then renamed over the target

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chacha20poly1305::{
    aead::{Aead, KeyInit},
    XChaCha20Poly1305, XNonce,
};
use zeroize::Zeroizing;

use crate::error::TokenError;

/// Length of the protection key in bytes
const KEY_BYTES: usize = 32;

/// Length of the XChaCha20 nonce in bytes
const NONCE_BYTES: usize = 24;

/// Seals and opens the token at rest
pub trait TokenProtector: Send + Sync {
    /// Seal plaintext token bytes for storage
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, TokenError>;

    /// Open bytes previously produced by [`TokenProtector::protect`]
    fn unprotect(&self, sealed: &[u8]) -> Result<Vec<u8>, TokenError>;
}

/// Protector keyed by a secret only the current user can read
#[derive(Debug, Clone)]
pub struct UserKeyProtector {
    key_path: PathBuf,
}

impl UserKeyProtector {
    /// Create a protector whose key lives at `key_path`
    pub fn new(key_path: impl Into<PathBuf>) -> Self {
        Self {
            key_path: key_path.into(),
        }
    }

    /// Path of the protection key
    pub fn key_path(&self) -> &Path {
        &self.key_path
    }

    fn cipher(&self) -> Result<XChaCha20Poly1305, TokenError> {
        let key = self.load_or_create_key()?;
        Ok(XChaCha20Poly1305::new((&*key).into()))
    }

    fn load_or_create_key(&self) -> Result<Zeroizing<[u8; KEY_BYTES]>, TokenError> {
        match fs::read(&self.key_path) {
            // Left behind by an interrupted write; nothing was ever sealed with it
            Ok(bytes) if bytes.is_empty() => {
                tracing::warn!("Token protection key {:?} is empty, replacing it", self.key_path);
                match fs::remove_file(&self.key_path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => return Err(TokenError::KeyUnavailable(e.to_string())),
                }
            }
            Ok(bytes) => return key_from_bytes(&self.key_path, bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(TokenError::KeyUnavailable(e.to_string())),
        }

        let mut key = Zeroizing::new([0u8; KEY_BYTES]);
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut key[..]);

        match self.publish_key(&key) {
            Ok(()) => {
                tracing::info!("Created token protection key at {:?}", self.key_path);
                Ok(key)
            }
            // Another process published first
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let bytes = fs::read(&self.key_path)?;
                key_from_bytes(&self.key_path, bytes)
            }
            Err(e) => Err(TokenError::KeyUnavailable(e.to_string())),
        }
    }

    /// Write the key to a private temp sibling, then link it into place.
    ///
    /// The key path only ever names a complete key. Fails with
    /// `AlreadyExists` if a key is already there.
    fn publish_key(&self, key: &[u8; KEY_BYTES]) -> io::Result<()> {
        let mut name = self
            .key_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(format!(".{:016x}.tmp", rand::random::<u64>()));
        let tmp_path = self.key_path.with_file_name(name);

        let written = create_private_file(&tmp_path).and_then(|mut file| {
            file.write_all(key)?;
            file.sync_all()
        });
        let linked = written.and_then(|()| fs::hard_link(&tmp_path, &self.key_path));
        let _ = fs::remove_file(&tmp_path);
        linked
    }
}

impl TokenProtector for UserKeyProtector {
    fn protect(&self, plaintext: &[u8]) -> Result<Vec<u8>, TokenError> {
        let cipher = self.cipher()?;

        let mut nonce = [0u8; NONCE_BYTES];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut nonce);

        let ciphertext = cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext)
            .map_err(|e| TokenError::Protection(e.to_string()))?;

        let mut sealed = Vec::with_capacity(NONCE_BYTES + ciphertext.len());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn unprotect(&self, sealed: &[u8]) -> Result<Vec<u8>, TokenError> {
        if sealed.len() < NONCE_BYTES {
            return Err(TokenError::Protection(format!(
                "sealed token too short ({} bytes)",
                sealed.len()
            )));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_BYTES);

        self.cipher()?
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|e| TokenError::Protection(e.to_string()))
    }
}

fn key_from_bytes(
    path: &Path,
    bytes: Vec<u8>,
) -> Result<Zeroizing<[u8; KEY_BYTES]>, TokenError> {
    let bytes = Zeroizing::new(bytes);
    let key: [u8; KEY_BYTES] = bytes.as_slice().try_into().map_err(|_| {
        TokenError::KeyUnavailable(format!(
            "{:?} holds {} bytes, expected {}",
            path,
            bytes.len(),
            KEY_BYTES
        ))
    })?;
    Ok(Zeroizing::new(key))
}

/// Create a new file readable only by the owner, failing if it exists
fn create_private_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

/// Persisted security token
pub struct TokenStore {
    path: PathBuf,
    protector: Box<dyn TokenProtector>,
}

impl TokenStore {
    /// Create a store for the token file at `path`
    pub fn new(path: impl Into<PathBuf>, protector: impl TokenProtector + 'static) -> Self {
        Self {
            path: path.into(),
            protector: Box::new(protector),
        }
    }

    /// Path of the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and open the stored token
    pub fn try_load(&self) -> Result<Vec<u8>, TokenError> {
        let sealed = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TokenError::NotFound(self.path.clone()))
            }
            Err(e) => return Err(e.into()),
        };
        self.protector.unprotect(&sealed)
    }

    /// Read the stored token, treating any failure as "no token".
    ///
    /// Failures are logged; the result is then empty.
    pub fn load(&self) -> Vec<u8> {
        match self.try_load() {
            Ok(token) => token,
            Err(e) => {
                tracing::error!("Could not get security token: {}", e);
                Vec::new()
            }
        }
    }

    /// Seal and atomically replace the stored token
    pub fn save(&self, token: &[u8]) -> Result<(), TokenError> {
        self.write(token).map_err(|e| {
            tracing::error!("Could not save security token: {}", e);
            e
        })
    }

    fn write(&self, token: &[u8]) -> Result<(), TokenError> {
        let sealed = self.protector.protect(token)?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let tmp_path = self.temp_path();
        let _ = fs::remove_file(&tmp_path);
        {
            let mut file = create_private_file(&tmp_path)?;
            file.write_all(&sealed)?;
            file.sync_all()?;
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!("Saved security token to {:?}", self.path);
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn store_in(dir: &Path) -> TokenStore {
        TokenStore::new(
            dir.join("token.dat"),
            UserKeyProtector::new(dir.join("keys").join("token.key")),
        )
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = store_in(dir.path());

        store.save(b"ABCD").expect("Failed to save");
        assert_eq!(store.load(), b"ABCD");
    }

    #[test]
    fn test_file_is_not_plaintext() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = store_in(dir.path());

        store.save(b"super-secret-token").expect("Failed to save");
        let raw = fs::read(store.path()).expect("Failed to read");
        assert!(!raw
            .windows(b"super-secret-token".len())
            .any(|w| w == b"super-secret-token"));
    }

    #[test]
    fn test_missing_file_is_empty_token() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = store_in(dir.path());

        assert!(matches!(store.try_load(), Err(TokenError::NotFound(_))));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_corrupt_file_is_empty_token() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = store_in(dir.path());

        store.save(b"token").expect("Failed to save");
        let mut raw = fs::read(store.path()).unwrap();
        let last = raw.len() - 1;
        raw[last] ^= 0xFF;
        fs::write(store.path(), &raw).unwrap();

        assert!(matches!(store.try_load(), Err(TokenError::Protection(_))));
        assert!(store.load().is_empty());
    }

    #[test]
    fn test_other_key_cannot_open() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = store_in(dir.path());
        store.save(b"token").expect("Failed to save");

        let other = TokenStore::new(
            store.path().to_path_buf(),
            UserKeyProtector::new(dir.path().join("other.key")),
        );
        assert!(other.load().is_empty());
    }

    #[test]
    fn test_overwrite_leaves_no_temp_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = store_in(dir.path());

        store.save(b"first").expect("Failed to save");
        store.save(b"second").expect("Failed to save");

        assert_eq!(store.load(), b"second");
        assert!(!dir.path().join("token.dat.tmp").exists());
    }

    #[test]
    fn test_short_key_file_rejected() {
        let dir = tempdir().expect("Failed to create temp dir");
        let key_path = dir.path().join("token.key");
        fs::write(&key_path, b"short").unwrap();

        let protector = UserKeyProtector::new(&key_path);
        assert!(matches!(
            protector.protect(b"x"),
            Err(TokenError::KeyUnavailable(_))
        ));
    }

    #[test]
    fn test_empty_key_file_is_replaced() {
        let dir = tempdir().expect("Failed to create temp dir");
        let key_path = dir.path().join("keys").join("token.key");
        create_private_file(&key_path).expect("Failed to create key file");
        assert_eq!(fs::metadata(&key_path).unwrap().len(), 0);

        let store = store_in(dir.path());
        store.save(b"tok").expect("Failed to save");
        assert_eq!(store.load(), b"tok");
        assert_eq!(fs::metadata(&key_path).unwrap().len(), KEY_BYTES as u64);

        store.save(b"tok2").expect("Failed to save");
        assert_eq!(store.load(), b"tok2");
    }

    #[test]
    fn test_key_creation_leaves_no_temp_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let store = store_in(dir.path());
        store.save(b"token").expect("Failed to save");

        let names: Vec<_> = fs::read_dir(dir.path().join("keys"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("token.key")]);
    }

    #[test]
    fn test_existing_key_is_kept() {
        let dir = tempdir().expect("Failed to create temp dir");
        let key_path = dir.path().join("token.key");
        let first = UserKeyProtector::new(&key_path);
        let sealed = first.protect(b"token").expect("Failed to protect");
        let key_bytes = fs::read(&key_path).unwrap();

        let second = UserKeyProtector::new(&key_path);
        assert_eq!(second.unprotect(&sealed).unwrap(), b"token");
        assert_eq!(fs::read(&key_path).unwrap(), key_bytes);
    }

    #[cfg(unix)]
    #[test]
    fn test_key_and_token_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().expect("Failed to create temp dir");
        let store = store_in(dir.path());
        store.save(b"token").expect("Failed to save");

        for path in [store.path().to_path_buf(), dir.path().join("keys").join("token.key")] {
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{:?}", path);
        }
    }
}
