use std::path::PathBuf;

use anyhow::{Result, bail};
use async_trait::async_trait;
use placement_types::models::DocumentKind;
use tokio::fs;
use tracing::{debug, info};

/// Where uploaded student documents go. Returns the URL to persist.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn store(&self, owner_key: &str, kind: DocumentKind, bytes: &[u8]) -> Result<String>;
}

/// Documents on local disk at `{root}/{owner_key}/{kind}`, overwritten on re-upload.
pub struct LocalObjectStore {
    root: PathBuf,
    public_url: String,
}

impl LocalObjectStore {
    pub async fn new(root: PathBuf, public_url: impl Into<String>) -> Result<Self> {
        fs::create_dir_all(&root).await?;
        info!("Document storage directory: {}", root.display());
        Ok(Self {
            root,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }
}

/// Owner keys become directory names; keep them to one plain path segment.
fn check_owner_key(owner_key: &str) -> Result<()> {
    let ok = !owner_key.is_empty()
        && owner_key != "."
        && owner_key != ".."
        && owner_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !ok {
        bail!("invalid storage key '{}'", owner_key);
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for LocalObjectStore {
    async fn store(&self, owner_key: &str, kind: DocumentKind, bytes: &[u8]) -> Result<String> {
        check_owner_key(owner_key)?;

        let dir = self.root.join(owner_key);
        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(kind.as_str()), bytes).await?;
        debug!(owner_key, kind = kind.as_str(), size = bytes.len(), "Stored document");

        Ok(format!("{}/{}/{}", self.public_url, owner_key, kind.as_str()))
    }
}
