use anyhow::{Result, anyhow};
use moka::future::Cache;
use once_cell::sync::Lazy;
use std::time::Duration;

use crate::repository::UserRepository;

/// true  => email is TAKEN
/// false => email is AVAILABLE (usually we store only taken)
pub static EMAIL_CACHE: Lazy<Cache<String, bool>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86400)) // 24h TTL
        .build()
});

/// Mark a single email as taken
pub async fn mark_taken(email: &str) {
    EMAIL_CACHE.insert(email.trim().to_lowercase(), true).await;
}

/// Check if email is taken
pub async fn is_taken(email: &str) -> bool {
    EMAIL_CACHE
        .get(&email.trim().to_lowercase())
        .await
        .unwrap_or(false)
}

/// Batch mark emails as taken
async fn batch_mark(emails: &[String]) {
    let futures: Vec<_> = emails
        .iter()
        .map(|e| EMAIL_CACHE.insert(e.trim().to_lowercase(), true))
        .collect();

    // Await all insertions concurrently
    futures::future::join_all(futures).await;
}

/// Load registered emails into the in-memory cache (batched)
pub async fn warmup_email_cache(users: &dyn UserRepository, batch_size: usize) -> Result<()> {
    let emails = users
        .emails()
        .await
        .map_err(|e| anyhow!("Email fetch failed: {}", e))?;

    for batch in emails.chunks(batch_size.max(1)) {
        batch_mark(batch).await;
    }

    log::info!("Email cache warmup complete: {} accounts", emails.len());
    Ok(())
}
