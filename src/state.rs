use std::sync::Arc;
use std::time::Instant;

use crate::cache::{ListingInvalidator, NoopInvalidator, RedisCache};
use crate::db::Database;
use crate::services::pinyin::PinyinResolver;
use crate::services::review::ReviewSessions;

#[derive(Clone)]
pub struct AppState {
    started_at: Instant,
    db: Database,
    resolver: Arc<PinyinResolver>,
    cache: Option<Arc<RedisCache>>,
    review_sessions: Arc<ReviewSessions>,
}

impl AppState {
    pub fn new(db: Database, resolver: Arc<PinyinResolver>, cache: Option<Arc<RedisCache>>) -> Self {
        Self {
            started_at: Instant::now(),
            db,
            resolver,
            cache,
            review_sessions: Arc::new(ReviewSessions::new()),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn resolver(&self) -> &PinyinResolver {
        &self.resolver
    }

    pub fn cache(&self) -> Option<&RedisCache> {
        self.cache.as_deref()
    }

    pub fn review_sessions(&self) -> &ReviewSessions {
        &self.review_sessions
    }

    pub fn listing_invalidator(&self) -> &dyn ListingInvalidator {
        match self.cache.as_deref() {
            Some(cache) => cache as &dyn ListingInvalidator,
            None => &NoopInvalidator,
        }
    }
}
