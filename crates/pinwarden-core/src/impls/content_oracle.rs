//! StaticContentOracle - fixed hash -> size table.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::ports::{ContentSizeOracle, StatError};

/// Content size oracle backed by a map (dev / tests).
///
/// Unknown hashes stat as `NotFound`.
#[derive(Debug, Clone, Default)]
pub struct StaticContentOracle {
    sizes: HashMap<String, u64>,
}

impl StaticContentOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_content(mut self, hash: impl Into<String>, size: u64) -> Self {
        self.sizes.insert(hash.into(), size);
        self
    }

    pub fn sizes(&self) -> &HashMap<String, u64> {
        &self.sizes
    }
}

impl From<HashMap<String, u64>> for StaticContentOracle {
    fn from(sizes: HashMap<String, u64>) -> Self {
        Self { sizes }
    }
}

#[async_trait]
impl ContentSizeOracle for StaticContentOracle {
    async fn stat(&self, hash: &str) -> Result<u64, StatError> {
        self.sizes
            .get(hash)
            .copied()
            .ok_or_else(|| StatError::NotFound(hash.to_string()))
    }
}
