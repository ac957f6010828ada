//! Building compositions off the drawing thread, and sharing parsed
//! documents between consumers.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use lottie_data::model::LottieJson;
use tracing::{debug, warn};

use crate::composition::Composition;
use crate::config::EngineConfig;
use crate::error::Result;

/// Parses and builds `bytes` on a worker thread. The receiver yields exactly
/// one result.
pub fn spawn_load(bytes: Vec<u8>, config: EngineConfig) -> Receiver<Result<Composition>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || deliver(&tx, Composition::from_slice(&bytes, config)));
    rx
}

/// Like [`spawn_load`] for a document that is already parsed.
pub fn spawn_build(model: Arc<LottieJson>, config: EngineConfig) -> Receiver<Result<Composition>> {
    let (tx, rx) = bounded(1);
    thread::spawn(move || deliver(&tx, Composition::from_model(&model, config)));
    rx
}

fn deliver(tx: &Sender<Result<Composition>>, result: Result<Composition>) {
    if let Err(err) = &result {
        warn!(error = %err, "background build failed");
    }
    // The caller may have dropped the receiver.
    let _ = tx.send(result);
}

/// Memoizes parsed documents by key.
///
/// Compositions carry per-draw caches and cannot be shared, so the cache
/// keeps the immutable parsed document and builds a fresh composition for
/// every request. Least recently used documents are evicted once
/// `composition_cache_capacity` is exceeded.
#[derive(Debug)]
pub struct CompositionCache {
    config: EngineConfig,
    documents: HashMap<String, Arc<LottieJson>>,
    /// Keys, most recently used last.
    recency: VecDeque<String>,
}

impl CompositionCache {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            documents: HashMap::new(),
            recency: VecDeque::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.documents.contains_key(key)
    }

    pub fn clear(&mut self) {
        self.documents.clear();
        self.recency.clear();
    }

    /// Parsed document for `key`, parsing `fetch()`'s bytes on a miss. A
    /// failed fetch or parse caches nothing.
    pub fn document(
        &mut self,
        key: &str,
        fetch: impl FnOnce() -> Result<Vec<u8>>,
    ) -> Result<Arc<LottieJson>> {
        if let Some(doc) = self.documents.get(key).cloned() {
            self.touch(key);
            return Ok(doc);
        }
        let bytes = fetch()?;
        let doc = Arc::new(LottieJson::from_slice(&bytes)?);
        debug!(key, "cached parsed document");
        self.insert(key.to_string(), doc.clone());
        Ok(doc)
    }

    /// A new, independent composition for `key`.
    pub fn composition(
        &mut self,
        key: &str,
        fetch: impl FnOnce() -> Result<Vec<u8>>,
    ) -> Result<Composition> {
        let doc = self.document(key, fetch)?;
        Composition::from_model(&doc, self.config.clone())
    }

    /// Same as [`CompositionCache::composition`] with the build moved to a
    /// worker thread. Parsing still happens on the calling thread on a miss.
    pub fn spawn_composition(
        &mut self,
        key: &str,
        fetch: impl FnOnce() -> Result<Vec<u8>>,
    ) -> Result<Receiver<Result<Composition>>> {
        let doc = self.document(key, fetch)?;
        Ok(spawn_build(doc, self.config.clone()))
    }

    fn touch(&mut self, key: &str) {
        if let Some(pos) = self.recency.iter().position(|k| k == key) {
            if let Some(k) = self.recency.remove(pos) {
                self.recency.push_back(k);
            }
        }
    }

    fn insert(&mut self, key: String, doc: Arc<LottieJson>) {
        let capacity = self.config.composition_cache_capacity.max(1);
        while self.documents.len() >= capacity {
            let Some(oldest) = self.recency.pop_front() else {
                break;
            };
            debug!(key = %oldest, "evicting cached document");
            self.documents.remove(&oldest);
        }
        self.recency.push_back(key.clone());
        self.documents.insert(key, doc);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LottieError;
    use serde_json::json;
    use std::time::Duration;

    fn doc_bytes(op: f32) -> Vec<u8> {
        json!({
            "v": "5.7.0", "ip": 0, "op": op, "fr": 30, "w": 10, "h": 10,
            "layers": [{"ty": 3, "nm": "null", "ip": 0, "op": op}]
        })
        .to_string()
        .into_bytes()
    }

    #[test]
    fn spawn_load_delivers_composition() {
        let rx = spawn_load(doc_bytes(30.0), EngineConfig::default());
        let comp = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(comp.end_frame(), 30.0);
    }

    #[test]
    fn spawn_load_delivers_errors() {
        let rx = spawn_load(b"not json".to_vec(), EngineConfig::default());
        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(matches!(result, Err(LottieError::Structural(_))));
    }

    #[test]
    fn spawn_build_delivers_errors() {
        let mut doc: LottieJson = serde_json::from_slice(&doc_bytes(30.0)).unwrap();
        doc.layers.clear();
        let rx = spawn_build(Arc::new(doc), EngineConfig::default());
        let result = rx.recv_timeout(Duration::from_secs(10)).unwrap();
        assert!(matches!(result, Err(LottieError::Structural(_))));
    }

    #[test]
    fn cache_parses_once_per_key() {
        let mut cache = CompositionCache::new(EngineConfig::default());
        let mut fetches = 0;
        for _ in 0..3 {
            cache
                .composition("a", || {
                    fetches += 1;
                    Ok(doc_bytes(30.0))
                })
                .unwrap();
        }
        assert_eq!(fetches, 1);
        let first = cache.document("a", || unreachable!()).unwrap();
        let second = cache.document("a", || unreachable!()).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn cache_evicts_least_recently_used() {
        let config = EngineConfig {
            composition_cache_capacity: 2,
            ..EngineConfig::default()
        };
        let mut cache = CompositionCache::new(config);
        cache.document("a", || Ok(doc_bytes(10.0))).unwrap();
        cache.document("b", || Ok(doc_bytes(20.0))).unwrap();
        cache.document("a", || unreachable!()).unwrap();
        cache.document("c", || Ok(doc_bytes(30.0))).unwrap();
        assert_eq!(cache.len(), 2);
        assert!(cache.contains("a"));
        assert!(!cache.contains("b"));
        assert!(cache.contains("c"));
    }

    #[test]
    fn failed_fetch_is_not_cached() {
        let mut cache = CompositionCache::new(EngineConfig::default());
        let err = cache
            .composition("x", || Err(LottieError::asset("x", "offline")))
            .unwrap_err();
        assert!(matches!(err, LottieError::Asset { .. }));
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_builds_run_in_background() {
        let mut cache = CompositionCache::new(EngineConfig::default());
        let rx = cache.spawn_composition("a", || Ok(doc_bytes(12.0))).unwrap();
        let comp = rx.recv_timeout(Duration::from_secs(10)).unwrap().unwrap();
        assert_eq!(comp.end_frame(), 12.0);
    }
}
