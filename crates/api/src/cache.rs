use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Model completions keyed by (model, prompt)
pub struct CompletionCache {
    completions: Arc<DashMap<String, String>>,
    max_entries: usize,
}

impl CompletionCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            completions: Arc::new(DashMap::new()),
            max_entries,
        }
    }

    pub fn set(&self, model: &str, prompt: &str, completion: String) {
        if self.max_entries == 0 {
            return;
        }
        if self.completions.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self.completions.iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.completions.remove(&key);
            }
        }
        let key = self.key(model, prompt);
        self.completions.insert(key, completion);
    }

    pub fn get(&self, model: &str, prompt: &str) -> Option<String> {
        let key = self.key(model, prompt);
        self.completions.get(&key).map(|r| r.value().clone())
    }

    fn key(&self, model: &str, prompt: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0u8]);
        hasher.update(prompt.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            completions_cached: self.completions.len(),
            max_entries: self.max_entries,
        }
    }

    pub fn clear(&self) {
        self.completions.clear();
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CacheStats {
    pub completions_cached: usize,
    pub max_entries: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_requires_same_model_and_prompt() {
        let cache = CompletionCache::new(10);
        cache.set("command-r", "prompt", "answer".to_string());

        assert_eq!(cache.get("command-r", "prompt").as_deref(), Some("answer"));
        assert_eq!(cache.get("llama3", "prompt"), None);
        assert_eq!(cache.get("command-r", "other prompt"), None);
    }

    #[test]
    fn test_eviction_keeps_size_bounded() {
        let cache = CompletionCache::new(4);
        for i in 0..20 {
            cache.set("m", &format!("prompt {}", i), i.to_string());
        }

        assert!(cache.stats().completions_cached <= 4);
        assert_eq!(cache.get("m", "prompt 19").as_deref(), Some("19"));
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let cache = CompletionCache::new(0);
        cache.set("m", "p", "c".to_string());
        assert_eq!(cache.get("m", "p"), None);
    }

    #[test]
    fn test_clear() {
        let cache = CompletionCache::new(10);
        cache.set("m", "p", "c".to_string());
        cache.clear();
        assert_eq!(cache.stats().completions_cached, 0);
    }
}
