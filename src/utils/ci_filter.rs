use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Expected capacity and false-positive rate.
const FILTER_CAPACITY: usize = 50_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

/// National id numbers already registered. A negative answer is final;
/// a positive one must be confirmed against the database.
static CI_FILTER: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Strips spaces, dashes and dots, and uppercases the extension letters
/// (e.g. "4.876.512-1B" -> "48765121B").
pub fn normalize(ci: &str) -> String {
    ci.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.'))
        .flat_map(char::to_uppercase)
        .collect()
}

fn read() -> RwLockReadGuard<'static, CuckooFilter<String>> {
    CI_FILTER.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write() -> RwLockWriteGuard<'static, CuckooFilter<String>> {
    CI_FILTER.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub fn might_exist(ci: &str) -> bool {
    read().contains(&normalize(ci))
}

pub fn insert(ci: &str) {
    write().add(&normalize(ci));
}

pub fn remove(ci: &str) {
    write().remove(&normalize(ci));
}

/// Loads every stored CI into the filter, streaming rows in batches.
pub async fn warmup_ci_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT ci FROM employees").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (ci,) = row.map_err(|e| anyhow!("DB row fetch failed: {}", e))?;
        batch.push(normalize(&ci));
        total += 1;

        if batch.len() == batch_size {
            insert_batch(&batch);
            batch.clear();
        }
    }

    if !batch.is_empty() {
        insert_batch(&batch);
    }

    tracing::info!(total, "CI filter warmup complete");
    Ok(())
}

fn insert_batch(cis: &[String]) {
    let mut filter = write();
    for ci in cis {
        filter.add(ci);
    }
}
