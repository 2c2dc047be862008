use crate::Result;
use camino::{Utf8Path, Utf8PathBuf};
use fs4::fs_std::FileExt;
use ohno::IntoAppError;
use std::fs::{File, OpenOptions};

const LOG_TARGET: &str = "checkpoint";

/// Guard that releases the crawl lock when dropped
#[derive(Debug)]
pub struct CrawlLockGuard(File);

impl Drop for CrawlLockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.unlock() {
            log::warn!(target: LOG_TARGET, "Could not release crawl lock: {e:#}");
        }
    }
}

/// Path of the lock file guarding the checkpoint at `checkpoint`
#[must_use]
pub fn lock_path(checkpoint: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{checkpoint}.lock"))
}

/// Take the exclusive crawl lock for a checkpoint file.
///
/// Waits for any other process crawling into the same checkpoint to finish,
/// so two runs never interleave their saves.
pub async fn acquire_crawl_lock(checkpoint: &Utf8Path) -> Result<CrawlLockGuard> {
    let lock_path = lock_path(checkpoint);

    if let Some(parent) = lock_path.parent().filter(|parent| !parent.as_str().is_empty()) {
        std::fs::create_dir_all(parent).into_app_err_with(|| format!("creating checkpoint directory '{parent}'"))?;
    }

    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&lock_path)
        .into_app_err_with(|| format!("opening crawl lock file '{lock_path}'"))?;

    let file = tokio::task::spawn_blocking(move || {
        file.lock_exclusive()
            .into_app_err_with(|| format!("acquiring exclusive lock on '{lock_path}'"))?;
        log::debug!(target: LOG_TARGET, "Acquired crawl lock at '{lock_path}'");
        Ok::<_, ohno::AppError>(file)
    })
    .await
    .into_app_err("lock task panicked")??;

    Ok(CrawlLockGuard(file))
}
