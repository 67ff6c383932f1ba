use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use dashmetrics::adapter::outbound::sqlite::connection::{create_pool, DbPool};
use dashmetrics::testkit::fixtures::seed_orders;

/// Temporary SQLite database seeded with the orders fixture.
pub struct TempDb {
    path: PathBuf,
    pool: DbPool,
}

impl TempDb {
    pub fn create(name: &str) -> Self {
        let mut path = std::env::temp_dir();
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        path.push(format!("dashmetrics-{name}-{nanos}.db"));

        let pool = create_pool(&path.display().to_string(), 2).expect("create sqlite pool");
        seed_orders(&pool).expect("seed orders");

        Self { path, pool }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[allow(dead_code)]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl Drop for TempDb {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}
