//! Typed configuration for the retrieval engine.
//!
//! Loaded once at process start from `rag_config.yaml` merged with
//! `RAG_`-prefixed environment variables, then validated. The resulting
//! `RagConfig` is immutable for the process lifetime; components receive
//! it by reference at construction time and never re-read raw
//! configuration mid-request.

use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::{RagError, Result};
use crate::types::StrategyKind;

/// Tolerance used when checking that weights sum to 1.0.
pub const WEIGHT_TOLERANCE: f32 = 1e-6;

/// Top-level retrieval mode used when multi-strategy fusion is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    Basic,
    Contextual,
    ParentRetrieval,
    Hybrid,
}

impl RetrievalMode {
    /// The strategy executed on the single-strategy path.
    pub fn strategy(&self) -> StrategyKind {
        match self {
            RetrievalMode::Basic => StrategyKind::Similarity,
            RetrievalMode::Contextual => StrategyKind::Contextual,
            RetrievalMode::ParentRetrieval => StrategyKind::ParentChild,
            RetrievalMode::Hybrid => StrategyKind::Hybrid,
        }
    }
}

/// How documents are split into chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    Basic,
    Contextual,
    ParentChild,
    Adaptive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub strategy: ChunkStrategy,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub add_document_context: bool,
    pub add_section_headers: bool,
    /// Template for contextual chunks. `{document}`, `{section}` and
    /// `{chunk}` are substituted. When absent a default template is used.
    pub context_template: Option<String>,
    pub parent_chunk_size: usize,
    pub parent_overlap: usize,
    pub child_chunk_size: usize,
    pub child_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            strategy: ChunkStrategy::Basic,
            chunk_size: 1000,
            chunk_overlap: 200,
            add_document_context: true,
            add_section_headers: true,
            context_template: None,
            parent_chunk_size: 2000,
            parent_overlap: 400,
            child_chunk_size: 400,
            child_overlap: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub primary_model: String,
    pub fallback_models: Vec<String>,
    pub dimensions: usize,
    pub batch_size: usize,
    pub normalize_embeddings: bool,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            primary_model: "all-MiniLM-L6-v2".to_string(),
            fallback_models: Vec::new(),
            dimensions: 384,
            batch_size: 32,
            normalize_embeddings: true,
        }
    }
}

/// Which search path runs by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryStrategy {
    /// Run every enabled strategy and fuse the rankings.
    MultiStrategy,
    Similarity,
    Contextual,
    ParentChild,
    Hybrid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub primary_strategy: PrimaryStrategy,
    /// Tried in order when the primary path yields nothing above the
    /// similarity threshold.
    pub fallback_strategies: Vec<StrategyKind>,
    pub similarity_threshold: f32,
    pub max_results: usize,
    pub enable_query_expansion: bool,
    pub max_query_expansions: usize,
    pub enable_result_fusion: bool,
    pub vector_weight: f32,
    pub text_weight: f32,
    pub strategy_weights: BTreeMap<StrategyKind, f32>,
    pub enable_diversity_filter: bool,
    /// Cosine similarity above which a lower-ranked passage is dropped
    /// as redundant. Open parameter; not part of the original surface.
    pub diversity_threshold: f32,
    pub enable_reranking: bool,
    pub rerank_top_k: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        let mut weights = BTreeMap::new();
        weights.insert(StrategyKind::Similarity, 1.0);
        weights.insert(StrategyKind::Contextual, 1.0);
        weights.insert(StrategyKind::ParentChild, 1.0);
        weights.insert(StrategyKind::Hybrid, 1.0);
        Self {
            primary_strategy: PrimaryStrategy::MultiStrategy,
            fallback_strategies: vec![StrategyKind::Similarity],
            similarity_threshold: 0.7,
            max_results: 10,
            enable_query_expansion: false,
            max_query_expansions: 3,
            enable_result_fusion: true,
            vector_weight: 0.7,
            text_weight: 0.3,
            strategy_weights: weights,
            enable_diversity_filter: true,
            diversity_threshold: 0.92,
            enable_reranking: false,
            rerank_top_k: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub strategy: RetrievalMode,
    pub enable_advanced_rag: bool,
    pub enable_contextual_retrieval: bool,
    pub enable_parent_retrieval: bool,
    pub enable_hybrid_search: bool,
    pub enable_quality_filtering: bool,
    pub max_concurrent_requests: usize,
    pub request_timeout_ms: u64,
    pub cache_enabled: bool,
    pub cache_ttl_secs: u64,
    pub enable_metrics: bool,
    pub log_level: String,
    pub chunking: ChunkingConfig,
    pub embedding: EmbeddingConfig,
    pub search: SearchConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            strategy: RetrievalMode::Basic,
            enable_advanced_rag: true,
            enable_contextual_retrieval: true,
            enable_parent_retrieval: true,
            enable_hybrid_search: true,
            enable_quality_filtering: true,
            max_concurrent_requests: 16,
            request_timeout_ms: 10_000,
            cache_enabled: true,
            cache_ttl_secs: 300,
            enable_metrics: false,
            log_level: "info".to_string(),
            chunking: ChunkingConfig::default(),
            embedding: EmbeddingConfig::default(),
            search: SearchConfig::default(),
        }
    }
}

impl RagConfig {
    /// Load from `rag_config.yaml` in the working directory, merged with
    /// `RAG_`-prefixed environment variables (`RAG_SEARCH__MAX_RESULTS=5`).
    pub fn load() -> Result<Self> {
        Self::load_from("rag_config.yaml")
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config: RagConfig = Figment::from(Serialized::defaults(RagConfig::default()))
            .merge(Yaml::file(path.as_ref()))
            .merge(Env::prefixed("RAG_").split("__"))
            .extract()
            .map_err(|e| RagError::Configuration(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// The strategies the engine is allowed to construct, derived from the
    /// feature flags. A disabled strategy never appears in the executor
    /// set regardless of `strategy_weights` entries.
    pub fn enabled_strategies(&self) -> Vec<StrategyKind> {
        let mut out = vec![StrategyKind::Similarity];
        if self.enable_contextual_retrieval {
            out.push(StrategyKind::Contextual);
        }
        if self.enable_parent_retrieval {
            out.push(StrategyKind::ParentChild);
        }
        if self.enable_hybrid_search {
            out.push(StrategyKind::Hybrid);
        }
        out
    }

    /// The strategy executed when the multi-strategy fused path is not
    /// taken: an explicit `search.primary_strategy`, or the top-level
    /// `strategy` mode when the primary is `multi_strategy`.
    pub fn single_strategy(&self) -> StrategyKind {
        match self.search.primary_strategy {
            PrimaryStrategy::MultiStrategy => self.strategy.strategy(),
            PrimaryStrategy::Similarity => StrategyKind::Similarity,
            PrimaryStrategy::Contextual => StrategyKind::Contextual,
            PrimaryStrategy::ParentChild => StrategyKind::ParentChild,
            PrimaryStrategy::Hybrid => StrategyKind::Hybrid,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    /// All checks that must hold before the process starts serving.
    /// Anything caught here is a fatal startup error, never a query-time
    /// surprise.
    pub fn validate(&self) -> Result<()> {
        let s = &self.search;
        let weight_sum = s.vector_weight + s.text_weight;
        if (weight_sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RagError::Configuration(format!(
                "vector_weight ({}) + text_weight ({}) must sum to 1.0, got {}",
                s.vector_weight, s.text_weight, weight_sum
            )));
        }
        if s.vector_weight < 0.0 || s.text_weight < 0.0 {
            return Err(RagError::Configuration(
                "hybrid weights must be non-negative".to_string(),
            ));
        }
        for (kind, w) in &s.strategy_weights {
            if *w < 0.0 {
                return Err(RagError::Configuration(format!(
                    "strategy weight for {kind} must be non-negative, got {w}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&s.similarity_threshold) {
            return Err(RagError::Configuration(format!(
                "similarity_threshold must be in [0, 1], got {}",
                s.similarity_threshold
            )));
        }
        if !(0.0..=1.0).contains(&s.diversity_threshold) {
            return Err(RagError::Configuration(format!(
                "diversity_threshold must be in [0, 1], got {}",
                s.diversity_threshold
            )));
        }
        if s.max_results == 0 {
            return Err(RagError::Configuration("max_results must be > 0".to_string()));
        }
        if s.rerank_top_k == 0 {
            return Err(RagError::Configuration("rerank_top_k must be > 0".to_string()));
        }
        let single = self.single_strategy();
        if !self.enabled_strategies().contains(&single) {
            return Err(RagError::Configuration(format!(
                "configured strategy {single} is disabled by its feature flag"
            )));
        }

        let c = &self.chunking;
        if c.chunk_size == 0 || c.parent_chunk_size == 0 || c.child_chunk_size == 0 {
            return Err(RagError::Configuration("chunk sizes must be > 0".to_string()));
        }
        if c.chunk_overlap >= c.chunk_size {
            return Err(RagError::Configuration(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                c.chunk_overlap, c.chunk_size
            )));
        }
        if c.parent_overlap >= c.parent_chunk_size {
            return Err(RagError::Configuration(format!(
                "parent_overlap ({}) must be smaller than parent_chunk_size ({})",
                c.parent_overlap, c.parent_chunk_size
            )));
        }
        if c.child_overlap >= c.child_chunk_size {
            return Err(RagError::Configuration(format!(
                "child_overlap ({}) must be smaller than child_chunk_size ({})",
                c.child_overlap, c.child_chunk_size
            )));
        }
        if c.child_chunk_size > c.parent_chunk_size {
            return Err(RagError::Configuration(format!(
                "child_chunk_size ({}) must not exceed parent_chunk_size ({})",
                c.child_chunk_size, c.parent_chunk_size
            )));
        }

        let e = &self.embedding;
        if e.dimensions == 0 {
            return Err(RagError::Configuration("embedding dimensions must be > 0".to_string()));
        }
        if e.batch_size == 0 {
            return Err(RagError::Configuration("embedding batch_size must be > 0".to_string()));
        }
        if e.primary_model.is_empty() {
            return Err(RagError::Configuration("primary_model must be set".to_string()));
        }

        if self.max_concurrent_requests == 0 {
            return Err(RagError::Configuration(
                "max_concurrent_requests must be > 0".to_string(),
            ));
        }
        if self.request_timeout_ms == 0 {
            return Err(RagError::Configuration("request_timeout_ms must be > 0".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        RagConfig::default().validate().expect("default config is valid");
    }

    #[test]
    fn hybrid_weights_must_sum_to_one() {
        let mut cfg = RagConfig::default();
        cfg.search.vector_weight = 0.7;
        cfg.search.text_weight = 0.4;
        let err = cfg.validate().expect_err("weights sum to 1.1");
        assert!(matches!(err, RagError::Configuration(_)));
    }

    #[test]
    fn weight_sum_tolerance_is_respected() {
        let mut cfg = RagConfig::default();
        cfg.search.vector_weight = 0.7;
        cfg.search.text_weight = 0.3 + 1e-8;
        cfg.validate().expect("within tolerance");
    }

    #[test]
    fn overlap_must_be_smaller_than_window() {
        let mut cfg = RagConfig::default();
        cfg.chunking.chunk_overlap = cfg.chunking.chunk_size;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn disabled_flags_remove_strategies() {
        let mut cfg = RagConfig::default();
        cfg.enable_hybrid_search = false;
        cfg.enable_parent_retrieval = false;
        let enabled = cfg.enabled_strategies();
        assert_eq!(enabled, vec![StrategyKind::Similarity, StrategyKind::Contextual]);
    }

    #[test]
    fn retrieval_mode_maps_to_strategy() {
        assert_eq!(RetrievalMode::Basic.strategy(), StrategyKind::Similarity);
        assert_eq!(RetrievalMode::ParentRetrieval.strategy(), StrategyKind::ParentChild);
    }

    #[test]
    fn configured_single_strategy_must_be_enabled() {
        let mut cfg = RagConfig::default();
        cfg.strategy = RetrievalMode::ParentRetrieval;
        cfg.enable_parent_retrieval = false;
        assert!(matches!(cfg.validate(), Err(RagError::Configuration(_))));

        let mut cfg = RagConfig::default();
        cfg.search.primary_strategy = PrimaryStrategy::Hybrid;
        cfg.enable_hybrid_search = false;
        assert!(matches!(cfg.validate(), Err(RagError::Configuration(_))));
    }
}
