use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::error::CacheError;

/// Write-once audio files keyed by a hash of whatever produced them.
///
/// Files are served as-is from `root`, so each entry is a plain
/// `<key>.<ext>` file rather than an opaque blob. Entries are never
/// invalidated here; an external retention sweep reclaims them.
#[derive(Clone, Debug)]
pub struct AudioFileStore {
    root: PathBuf,
    public_prefix: String,
    extension: String,
}

impl AudioFileStore {
    pub fn new(root: PathBuf, public_prefix: impl Into<String>) -> Self {
        Self {
            root,
            public_prefix: public_prefix.into().trim_end_matches('/').into(),
            extension: "mp3".into(),
        }
    }

    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stable hex key over the generating inputs. Parts are NUL-separated so
    /// `("ab", "c")` and `("a", "bc")` never collide.
    pub fn key_for(parts: &[&str]) -> String {
        let mut hasher = Sha256::new();
        for (idx, part) in parts.iter().enumerate() {
            if idx > 0 {
                hasher.update([0u8]);
            }
            hasher.update(part.as_bytes());
        }
        hex::encode(hasher.finalize())
    }

    pub fn is_valid_key(key: &str) -> bool {
        key.len() == 64
            && key
                .as_bytes()
                .iter()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn file_name(&self, key: &str) -> String {
        format!("{key}.{}", self.extension)
    }

    pub fn path_for_key(&self, key: &str) -> Result<PathBuf, CacheError> {
        if !Self::is_valid_key(key) {
            return Err(CacheError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(self.file_name(key)))
    }

    pub fn public_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_prefix, self.file_name(key))
    }

    pub async fn ensure_root(&self) -> Result<(), CacheError> {
        tokio::fs::create_dir_all(&self.root).await.map_err(|source| {
            CacheError::Io {
                path: self.root.clone(),
                source,
            }
        })
    }

    pub async fn contains(&self, key: &str) -> Result<bool, CacheError> {
        let path = self.path_for_key(key)?;
        Ok(tokio::fs::try_exists(path).await.unwrap_or(false))
    }

    /// Best-effort atomic write (tmp + rename). Concurrent writers for the
    /// same key are allowed; the loser discards its temp file.
    pub async fn write_if_missing(
        &self,
        key: &str,
        bytes: &[u8],
    ) -> Result<PathBuf, CacheError> {
        self.ensure_root().await?;
        let path = self.path_for_key(key)?;

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(path);
        }

        let tmp = self
            .root
            .join(format!(".{key}.tmp-{}", Uuid::new_v4().simple()));
        let mut file =
            tokio::fs::File::create(&tmp).await.map_err(io_err(&tmp))?;
        file.write_all(bytes).await.map_err(io_err(&tmp))?;
        file.flush().await.map_err(io_err(&tmp))?;
        drop(file);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Ok(path);
        }

        tokio::fs::rename(&tmp, &path).await.map_err(io_err(&path))?;
        Ok(path)
    }
}

fn io_err(path: &Path) -> impl FnOnce(std::io::Error) -> CacheError + use<> {
    let path = path.to_path_buf();
    move |source| CacheError::Io { path, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_stable_and_separator_aware() {
        let a = AudioFileStore::key_for(&["voice", "hello"]);
        let b = AudioFileStore::key_for(&["voice", "hello"]);
        let c = AudioFileStore::key_for(&["voiceh", "ello"]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(AudioFileStore::is_valid_key(&a));
    }

    #[test]
    fn rejects_path_like_keys() {
        let store = AudioFileStore::new(PathBuf::from("/tmp"), "/audio");
        assert!(store.path_for_key("../etc/passwd").is_err());
    }

    #[tokio::test]
    async fn second_write_keeps_first_contents() {
        let dir = tempfile::tempdir().unwrap();
        let store = AudioFileStore::new(dir.path().join("cache"), "/audio/");
        let key = AudioFileStore::key_for(&["k"]);

        let first = store.write_if_missing(&key, b"one").await.unwrap();
        let second = store.write_if_missing(&key, b"two").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(tokio::fs::read(&first).await.unwrap(), b"one");
        assert!(store.contains(&key).await.unwrap());
        assert_eq!(store.public_url(&key), format!("/audio/{key}.mp3"));
    }
}
