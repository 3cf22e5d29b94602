//! Image blobs, `data:` URL encoding, and the image store backends.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rzt_crypto::ContentHasher;
use rzt_types::Digest;

use crate::error::{StoreError, StoreResult};
use crate::traits::ImageStore;

/// Prefix of the storage paths handed out by the image stores.
pub const PATH_PREFIX: &str = "img:";

/// Raw image bytes plus their MIME type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBlob {
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl ImageBlob {
    /// Render as a `data:` URL, the inline form used by link records.
    pub fn to_data_url(&self) -> String {
        encode_data_url(self.mime.as_deref(), &self.bytes)
    }
}

/// Where a blob was filed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredImage {
    /// Hex content address.
    pub key: String,
    /// Storage path (`img:<key>`).
    pub path: String,
    pub size: u64,
}

/// Encode bytes as `data:<mime>;base64,<payload>`.
pub fn encode_data_url(mime: Option<&str>, bytes: &[u8]) -> String {
    let mime = mime.unwrap_or("application/octet-stream");
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

/// Decode a `data:` URL or a bare base64 string.
///
/// Returns the MIME type embedded in the URL (if any) and the decoded bytes.
pub fn decode_data_url(data: &str) -> StoreResult<(Option<String>, Vec<u8>)> {
    let (mime, payload) = match data.strip_prefix("data:") {
        Some(rest) => {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| StoreError::InvalidImage("data URL without ','".into()))?;
            let mime = header
                .strip_suffix(";base64")
                .ok_or_else(|| StoreError::InvalidImage("data URL is not base64".into()))?;
            let mime = (!mime.is_empty()).then(|| mime.to_string());
            (mime, payload)
        }
        None => (None, data),
    };
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| StoreError::InvalidImage(e.to_string()))?;
    Ok((mime, bytes))
}

fn key_of(key_or_path: &str) -> &str {
    key_or_path.strip_prefix(PATH_PREFIX).unwrap_or(key_or_path)
}

fn stored(key: String, size: usize) -> StoredImage {
    StoredImage {
        path: format!("{PATH_PREFIX}{key}"),
        key,
        size: size as u64,
    }
}

/// In-memory, HashMap-based image store.
pub struct InMemoryImageStore {
    blobs: RwLock<HashMap<String, ImageBlob>>,
}

impl InMemoryImageStore {
    pub fn new() -> Self {
        Self {
            blobs: RwLock::new(HashMap::new()),
        }
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InMemoryImageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageStore for InMemoryImageStore {
    fn put(&self, mime: Option<&str>, bytes: &[u8]) -> StoreResult<StoredImage> {
        let key = ContentHasher::IMAGE.hash(bytes).to_hex();
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        blobs.entry(key.clone()).or_insert_with(|| ImageBlob {
            mime: mime.map(str::to_string),
            bytes: bytes.to_vec(),
        });
        Ok(stored(key, bytes.len()))
    }

    fn get(&self, key: &str) -> StoreResult<Option<ImageBlob>> {
        let blobs = self
            .blobs
            .read()
            .map_err(|e| StoreError::Lock(e.to_string()))?;
        Ok(blobs.get(key_of(key)).cloned())
    }
}

impl std::fmt::Debug for InMemoryImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryImageStore")
            .field("blob_count", &self.len())
            .finish()
    }
}

/// Directory-backed image store: one file per blob plus a `.mime` sidecar.
#[derive(Debug)]
pub struct DirImageStore {
    root: PathBuf,
}

impl DirImageStore {
    /// Open (creating if needed) an image directory.
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn blob_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    fn mime_path(&self, key: &str) -> PathBuf {
        self.root.join(format!("{key}.mime"))
    }
}

impl ImageStore for DirImageStore {
    fn put(&self, mime: Option<&str>, bytes: &[u8]) -> StoreResult<StoredImage> {
        let key = ContentHasher::IMAGE.hash(bytes).to_hex();
        let path = self.blob_path(&key);
        if !path.exists() {
            let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
            tmp.write_all(bytes)?;
            tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
            if let Some(mime) = mime {
                fs::write(self.mime_path(&key), mime)?;
            }
            tracing::debug!(key = %key, size = bytes.len(), "stored image blob");
        }
        Ok(stored(key, bytes.len()))
    }

    fn get(&self, key: &str) -> StoreResult<Option<ImageBlob>> {
        let key = key_of(key);
        // Keys are digests; anything else cannot name a file in this store.
        let Ok(address) = key.parse::<Digest>() else {
            return Ok(None);
        };
        let path = self.blob_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(path)?;
        if !ContentHasher::IMAGE.verify(&bytes, &address) {
            return Err(StoreError::InvalidImage(format!(
                "blob {key} does not match its content address"
            )));
        }
        let mime = match fs::read_to_string(self.mime_path(key)) {
            Ok(mime) => Some(mime),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };
        Ok(Some(ImageBlob { mime, bytes }))
    }
}
