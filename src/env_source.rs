//! Third fallback tier of the resolver.

use std::collections::HashMap;
use std::env;

/// Process-wide key -> string lookup consulted after cache and backend
pub trait EnvSource: Send + Sync {
    fn lookup(
        &self,
        key: &str,
    ) -> Option<String>;
}

/// Reads the process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn lookup(
        &self,
        key: &str,
    ) -> Option<String> {
        env::var(key).ok()
    }
}

/// Fixed map of values, for embedding overrides or tests
#[derive(Debug, Default, Clone)]
pub struct MapEnv {
    values: HashMap<String, String>,
}

impl MapEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }
}

impl<K, V> FromIterator<(K, V)> for MapEnv
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl EnvSource for MapEnv {
    fn lookup(
        &self,
        key: &str,
    ) -> Option<String> {
        self.values.get(key).cloned()
    }
}
