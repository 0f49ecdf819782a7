//! `DataStore` — §4.1. One JSON document, one backing file, serialized
//! reads/writes.
//!
//! Grounded on the teacher's own stated design decision for its repository
//! layer ("concrete implementation... rather than trait, for simplicity" —
//! `auth-service/src/repository/mod.rs`): there is exactly one
//! implementation of this collaborator at runtime, so it is a concrete
//! struct rather than a trait object. Tests construct it directly against
//! a temp directory instead of mocking it.

use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use shared::errors::ApiResult;

use crate::context::Context;

/// A single JSON document persisted to one file, guarded by an
/// `.await`-compatible mutex so concurrent `set`/`delete` calls never
/// interleave and no reader ever observes a partial document (§5).
pub struct DataStore {
    path: PathBuf,
    document: Mutex<Value>,
}

impl DataStore {
    pub(crate) fn new(path: PathBuf, document: Value) -> Self {
        Self {
            path,
            document: Mutex::new(document),
        }
    }

    /// Returns the value at `key` (a single top-level key, or a path into
    /// nested objects), or `default` if the path is absent.
    pub async fn get<T: DeserializeOwned>(
        &self,
        _ctx: &Context,
        key: &[&str],
        default: Option<T>,
    ) -> ApiResult<Option<T>> {
        let document = self.document.lock().await;
        match navigate(&document, key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(default),
        }
    }

    /// Writes `value` at `key`, creating any missing intermediate objects
    /// along the path, then persists the whole document atomically.
    pub async fn set<T: Serialize>(&self, _ctx: &Context, key: &[&str], value: &T) -> ApiResult<()> {
        let mut document = self.document.lock().await;
        let encoded = serde_json::to_value(value)?;
        navigate_mut(&mut document, key, encoded);
        persist(&self.path, &document).await
    }

    /// Removes the value at `key`, then persists.
    pub async fn delete(&self, _ctx: &Context, key: &[&str]) -> ApiResult<()> {
        let mut document = self.document.lock().await;
        remove(&mut document, key);
        persist(&self.path, &document).await
    }

    /// Returns the full document.
    pub async fn get_root(&self, _ctx: &Context) -> ApiResult<Value> {
        Ok(self.document.lock().await.clone())
    }
}

fn navigate<'a>(document: &'a Value, key: &[&str]) -> Option<&'a Value> {
    let mut current = document;
    for segment in key {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

fn navigate_mut(document: &mut Value, key: &[&str], value: Value) {
    if key.is_empty() {
        *document = value;
        return;
    }
    let mut current = document;
    for segment in &key[..key.len() - 1] {
        if !current.is_object() {
            *current = Value::Object(Default::default());
        }
        current = current
            .as_object_mut()
            .expect("just ensured object")
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(Default::default()));
    }
    if !current.is_object() {
        *current = Value::Object(Default::default());
    }
    current
        .as_object_mut()
        .expect("just ensured object")
        .insert(key[key.len() - 1].to_string(), value);
}

fn remove(document: &mut Value, key: &[&str]) {
    if key.is_empty() {
        return;
    }
    let mut current = document;
    for segment in &key[..key.len() - 1] {
        match current.as_object_mut().and_then(|o| o.get_mut(*segment)) {
            Some(next) => current = next,
            None => return,
        }
    }
    if let Some(object) = current.as_object_mut() {
        object.remove(key[key.len() - 1]);
    }
}

/// Write to a sibling temp file, then rename — the whole-document atomic
/// write the spec requires; no incremental updates, no journal.
async fn persist(path: &Path, document: &Value) -> ApiResult<()> {
    let temp_path = path.with_extension("json.tmp");
    let bytes = serde_json::to_vec_pretty(document)?;
    {
        let mut file = tokio::fs::File::create(&temp_path).await?;
        file.write_all(&bytes).await?;
        file.flush().await?;
    }
    tokio::fs::rename(&temp_path, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx() -> Context {
        Context::new()
    }

    #[tokio::test]
    async fn get_returns_default_when_path_absent() {
        let store = DataStore::new(std::env::temp_dir().join("unused.json"), json!({}));
        let value = store.get(&ctx(), &["Users", "alice"], Some(42)).await.unwrap();
        assert_eq!(value, Some(42));
    }

    #[tokio::test]
    async fn set_then_get_round_trips_nested_path() {
        let dir = tempdir();
        let path = dir.join("pool.json");
        let store = DataStore::new(path, json!({}));
        store
            .set(&ctx(), &["Users", "alice"], &json!({"Username": "alice"}))
            .await
            .unwrap();
        let value: Option<Value> = store.get(&ctx(), &["Users", "alice"], None).await.unwrap();
        assert_eq!(value.unwrap()["Username"], "alice");
    }

    #[tokio::test]
    async fn set_persists_to_disk_atomically() {
        let dir = tempdir();
        let path = dir.join("pool.json");
        let store = DataStore::new(path.clone(), json!({}));
        store.set(&ctx(), &["Clients", "abc"], &json!({"ClientId": "abc"})).await.unwrap();

        let on_disk: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(on_disk["Clients"]["abc"]["ClientId"], "abc");
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn delete_removes_nested_key() {
        let store = DataStore::new(
            std::env::temp_dir().join("unused2.json"),
            json!({"Users": {"alice": {"Username": "alice"}}}),
        );
        store.delete(&ctx(), &["Users", "alice"]).await.unwrap();
        let value: Option<Value> = store.get(&ctx(), &["Users", "alice"], None).await.unwrap();
        assert!(value.is_none());
    }

    fn tempdir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("emulator-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }
}
