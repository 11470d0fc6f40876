use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use moka::future::Cache;
use sqlx::MySqlPool;

use crate::error::AppError;
use crate::model::face_template::FaceTemplateRow;
use crate::recognition::StoredTemplate;

const ALL: u8 = 0;

/// Snapshot of every stored face template, shared by identify requests.
///
/// Enrollment and employee deletion invalidate it; the TTL bounds staleness
/// from writes made by other processes.
#[derive(Clone)]
pub struct TemplateCache {
    cache: Cache<u8, Arc<Vec<StoredTemplate>>>,
}

impl TemplateCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder().max_capacity(1).time_to_live(ttl).build(),
        }
    }

    pub async fn get_or_load(&self, pool: &MySqlPool) -> Result<Arc<Vec<StoredTemplate>>, AppError> {
        self.get_or_try_load(|| load_templates(pool)).await
    }

    /// Returns the cached snapshot or fills it with `load`. Concurrent misses
    /// share a single load.
    pub async fn get_or_try_load<F, Fut>(&self, load: F) -> Result<Arc<Vec<StoredTemplate>>, AppError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<Vec<StoredTemplate>, AppError>>,
    {
        self.cache
            .try_get_with(ALL, async move { load().await.map(Arc::new) })
            .await
            .map_err(|e| AppError::Internal(format!("failed to load face templates: {e}")))
    }

    pub async fn invalidate(&self) {
        self.cache.invalidate(&ALL).await;
    }
}

/// Streams all templates, skipping rows whose stored vector is unusable.
async fn load_templates(pool: &MySqlPool) -> Result<Vec<StoredTemplate>, AppError> {
    let mut stream = sqlx::query_as::<_, FaceTemplateRow>(
        "SELECT id, employee_id, embedding FROM face_templates ORDER BY id",
    )
    .fetch(pool);

    let mut templates = Vec::new();
    let mut skipped = 0usize;

    while let Some(row) = stream.next().await {
        let row = row?;
        let template_id = row.id;
        match StoredTemplate::try_from(row) {
            Ok(t) => templates.push(t),
            Err(e) => {
                skipped += 1;
                tracing::warn!(template_id, error = %e, "ignoring malformed face template");
            }
        }
    }

    tracing::debug!(loaded = templates.len(), skipped, "face templates loaded");
    Ok(templates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognition::embedding::tests::emb;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn one_template() -> Vec<StoredTemplate> {
        vec![StoredTemplate {
            template_id: 1,
            employee_id: 10,
            embedding: emb(0.1),
        }]
    }

    #[actix_web::test]
    async fn loads_once_until_invalidated() {
        let cache = TemplateCache::new(Duration::from_secs(60));
        let loads = AtomicUsize::new(0);

        for _ in 0..3 {
            let got = cache
                .get_or_try_load(|| async {
                    loads.fetch_add(1, Ordering::SeqCst);
                    Ok(one_template())
                })
                .await
                .unwrap();
            assert_eq!(got.len(), 1);
        }
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        cache.invalidate().await;
        cache
            .get_or_try_load(|| async {
                loads.fetch_add(1, Ordering::SeqCst);
                Ok(Vec::new())
            })
            .await
            .unwrap();
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }

    #[actix_web::test]
    async fn failed_load_is_not_cached() {
        let cache = TemplateCache::new(Duration::from_secs(60));

        let err = cache
            .get_or_try_load(|| async { Err(AppError::Internal("db down".into())) })
            .await;
        assert!(err.is_err());

        let ok = cache.get_or_try_load(|| async { Ok(one_template()) }).await;
        assert_eq!(ok.unwrap().len(), 1);
    }
}
