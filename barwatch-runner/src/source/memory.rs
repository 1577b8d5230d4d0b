//! In-memory source for tests and embedding.

use std::collections::BTreeMap;

use barwatch_core::Series;

use super::{canonicalize, DataSource, SourceError};

#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    series: BTreeMap<String, Series>,
}

impl MemorySource {
    /// Series are canonicalised on the way in.
    pub fn new(series: impl IntoIterator<Item = Series>) -> Self {
        let series = series
            .into_iter()
            .map(|mut s| {
                canonicalize(&mut s.bars);
                (s.symbol.clone(), s)
            })
            .collect();
        Self { series }
    }
}

impl DataSource for MemorySource {
    fn name(&self) -> &str {
        "memory"
    }

    fn fetch_symbol(&self, symbol: &str) -> Result<Series, SourceError> {
        self.series
            .get(symbol)
            .cloned()
            .ok_or_else(|| SourceError::SymbolNotFound {
                symbol: symbol.to_string(),
            })
    }
}
