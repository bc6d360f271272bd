//! Capture pipeline: fetch, upload and clean up one heap profile per
//! listening port of a Critical process.

use crate::core::{BlobStore, FetchError, Pid, ProfileFetcher, UploadError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// A capture failure for one port. Either way, the remaining ports of the
/// process are not attempted this tick.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Upload(#[from] UploadError),
}

pub struct CapturePipeline {
    fetcher: Arc<dyn ProfileFetcher>,
    store: Arc<dyn BlobStore>,
    bucket: String,
}

impl CapturePipeline {
    pub fn new(fetcher: Arc<dyn ProfileFetcher>, store: Arc<dyn BlobStore>, bucket: String) -> Self {
        Self {
            fetcher,
            store,
            bucket,
        }
    }

    /// Captures a heap profile from every port, sequentially.
    ///
    /// Per port: fetch to a local artifact, upload it, then delete it. A
    /// fetch failure leaves nothing behind; an upload failure leaves the
    /// artifact in place so it can be recovered manually. Both abort the
    /// remaining ports. A failed deletion is logged and swallowed.
    pub async fn capture_all(&self, pid: Pid, ports: &[u16]) -> Result<(), CaptureError> {
        for &port in ports {
            let artifact = self.fetcher.fetch_and_save(pid, port).await?;
            let url = self.store.upload(&self.bucket, &artifact).await?;
            info!(pid, port, url = %url, "heap profile uploaded");

            if let Err(err) = self.fetcher.remove_artifact(&artifact).await {
                warn!(pid, port, error = %err, "leaving local artifact behind");
            }
        }
        Ok(())
    }
}
