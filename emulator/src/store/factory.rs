//! `DataStoreFactory` — §4.1. Enforces "at most one `DataStore` per id
//! per process" via a process-wide cache.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use serde_json::Value;
use tracing::{debug, info};

use shared::errors::ApiResult;

use crate::context::Context;
use crate::store::data_store::DataStore;

pub struct DataStoreFactory {
    directory: PathBuf,
    cache: RwLock<HashMap<String, Arc<DataStore>>>,
}

impl DataStoreFactory {
    pub fn new(directory: PathBuf) -> Self {
        Self {
            directory,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Opens the store for `id`, creating its backing file with `defaults`
    /// if it doesn't exist yet. If it exists but is missing top-level keys
    /// present in `defaults`, those keys are merged in (a schema upgrade
    /// path — new pools created after this binary added a field don't
    /// break stores written by an older one).
    pub async fn create(&self, ctx: &Context, id: &str, defaults: Value) -> ApiResult<Arc<DataStore>> {
        if let Some(existing) = self.get(ctx, id).await? {
            return Ok(existing);
        }

        tokio::fs::create_dir_all(&self.directory).await?;
        let path = self.path_for(id);
        let document = if path.exists() {
            let mut on_disk = read_json_file(&path).await?;
            merge_missing_top_level_keys(&mut on_disk, &defaults);
            on_disk
        } else {
            defaults
        };

        let store = Arc::new(DataStore::new(path.clone(), document.clone()));
        write_json_file(&path, &document).await?;
        self.cache.write().expect("cache lock poisoned").insert(id.to_string(), store.clone());
        debug!(data_store_id = id, path = %path.display(), "data store created");
        Ok(store)
    }

    /// Returns the cached store for `id`, loading it from disk on first
    /// access. `None` if no backing file and nothing cached.
    pub async fn get(&self, _ctx: &Context, id: &str) -> ApiResult<Option<Arc<DataStore>>> {
        if let Some(cached) = self.cache.read().expect("cache lock poisoned").get(id).cloned() {
            return Ok(Some(cached));
        }

        let path = self.path_for(id);
        if !path.exists() {
            return Ok(None);
        }
        let document = read_json_file(&path).await?;
        let store = Arc::new(DataStore::new(path, document));
        self.cache
            .write()
            .expect("cache lock poisoned")
            .insert(id.to_string(), store.clone());
        Ok(Some(store))
    }

    /// Evicts `id` from the cache and removes its backing file, if any.
    pub async fn delete(&self, _ctx: &Context, id: &str) -> ApiResult<()> {
        self.cache.write().expect("cache lock poisoned").remove(id);
        let path = self.path_for(id);
        if path.exists() {
            tokio::fs::remove_file(&path).await?;
        }
        info!(data_store_id = id, "data store deleted");
        Ok(())
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.directory.join(format!("{id}.json"))
    }
}

async fn read_json_file(path: &std::path::Path) -> ApiResult<Value> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

async fn write_json_file(path: &std::path::Path, document: &Value) -> ApiResult<()> {
    let temp_path = path.with_extension("json.tmp");
    tokio::fs::write(&temp_path, serde_json::to_vec_pretty(document)?).await?;
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

fn merge_missing_top_level_keys(on_disk: &mut Value, defaults: &Value) {
    let (Some(on_disk), Some(defaults)) = (on_disk.as_object_mut(), defaults.as_object()) else {
        return;
    };
    for (key, value) in defaults {
        on_disk.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        Context::new()
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("emulator-factory-test-{}", uuid::Uuid::new_v4()));
        dir
    }

    #[tokio::test]
    async fn create_then_get_returns_the_same_cached_instance() {
        let factory = DataStoreFactory::new(tempdir());
        let created = factory.create(&ctx(), "us-east-1_abc", json!({"Users": {}})).await.unwrap();
        let fetched = factory.get(&ctx(), "us-east-1_abc").await.unwrap().unwrap();
        assert!(Arc::ptr_eq(&created, &fetched));
    }

    #[tokio::test]
    async fn get_returns_none_for_unknown_id() {
        let factory = DataStoreFactory::new(tempdir());
        assert!(factory.get(&ctx(), "does-not-exist").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_merges_missing_top_level_keys_into_existing_file() {
        let directory = tempdir();
        tokio::fs::create_dir_all(&directory).await.unwrap();
        write_json_file(&directory.join("pool.json"), &json!({"Users": {"alice": {}}}))
            .await
            .unwrap();

        let factory = DataStoreFactory::new(directory);
        let store = factory
            .create(&ctx(), "pool", json!({"Users": {}, "Groups": {}}))
            .await
            .unwrap();

        let root = store.get_root(&ctx()).await.unwrap();
        assert!(root["Users"]["alice"].is_object());
        assert!(root["Groups"].is_object());
    }

    #[tokio::test]
    async fn delete_evicts_cache_and_removes_file() {
        let factory = DataStoreFactory::new(tempdir());
        factory.create(&ctx(), "pool", json!({})).await.unwrap();
        factory.delete(&ctx(), "pool").await.unwrap();
        assert!(factory.get(&ctx(), "pool").await.unwrap().is_none());
    }
}
