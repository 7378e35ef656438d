use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use once_cell::sync::Lazy;
use std::sync::RwLock;

use crate::repository::UserRepository;

/// Expected capacity and false-positive rate.
/// Tune these based on real account counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static EMAIL_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

#[inline]
fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check if an email might be registered (false positives possible)
pub fn might_exist(email: &str) -> bool {
    let email = normalize(email);
    match EMAIL_FILTER.read() {
        Ok(filter) => filter.contains(&email),
        // a poisoned filter cannot rule anything out
        Err(_) => true,
    }
}

/// Insert a single email into the filter
pub fn insert(email: &str) {
    let email = normalize(email);
    if let Ok(mut filter) = EMAIL_FILTER.write() {
        filter.add(&email);
    }
}

/// Warm up the email filter in batches
pub async fn warmup_email_filter(users: &dyn UserRepository, batch_size: usize) -> Result<()> {
    let emails = users
        .emails()
        .await
        .map_err(|e| anyhow!("Email fetch failed: {}", e))?;

    let total = emails.len();
    for batch in emails.chunks(batch_size.max(1)) {
        insert_batch(batch);
    }

    log::info!("Email filter warmup complete: {} accounts", total);
    Ok(())
}

fn insert_batch(emails: &[String]) {
    let Ok(mut filter) = EMAIL_FILTER.write() else {
        return;
    };

    for email in emails {
        filter.add(&normalize(email));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inserted_email_might_exist_regardless_of_case() {
        insert("Filter.Case@School.edu");
        assert!(might_exist("filter.case@school.edu"));
        assert!(might_exist("  FILTER.CASE@SCHOOL.EDU "));
    }
}
