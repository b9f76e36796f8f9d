//! The retrieval engine front door.
//!
//! One `retrieve` call runs the whole pipeline: admission, query
//! expansion, embedding, strategy fan-out, fusion, diversity filtering,
//! optional reranking, quality filtering and truncation. Per-branch
//! failures are contained here; the caller sees an error only when the
//! query could not be embedded or every strategy branch failed.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use ragdb_core::config::{PrimaryStrategy, RagConfig};
use ragdb_core::error::{RagError, Result};
use ragdb_core::traits::{IndexAdapter, MetricsSink, NoopMetrics, RerankModel};
use ragdb_core::types::{
    Chunk, ChunkId, FusedResult, Provenance, RetrievedPassage, SearchCandidate, StrategyKind,
};
use ragdb_embed::BatchEmbedder;

use crate::cache::RetrievalCache;
use crate::expand::QueryExpander;
use crate::fusion;
use crate::rerank;
use crate::diversity;
use crate::strategy::{build_executors, QueryContext, StrategyExecutor};

/// How many fused results to carry into the post-processing stages per
/// requested result, so diversity and quality filtering have slack to
/// drop entries without starving the final list.
const FETCH_MULTIPLIER: usize = 3;

/// Per-call overrides. Everything not set here comes from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetrievalOptions {
    pub max_results: Option<usize>,
}

pub struct RetrievalEngine {
    config: RagConfig,
    index: Arc<dyn IndexAdapter>,
    embedder: Arc<BatchEmbedder>,
    reranker: Option<Arc<dyn RerankModel>>,
    metrics: Arc<dyn MetricsSink>,
    executors: Vec<Arc<dyn StrategyExecutor>>,
    expander: QueryExpander,
    cache: Arc<RetrievalCache>,
    admission: Arc<Semaphore>,
    /// Hashed into result cache keys so a config change cannot serve
    /// results computed under different parameters.
    params_fingerprint: String,
}

impl RetrievalEngine {
    pub fn new(
        config: RagConfig,
        index: Arc<dyn IndexAdapter>,
        embedder: Arc<BatchEmbedder>,
    ) -> Result<Self> {
        config.validate()?;
        let executors = build_executors(&config, index.clone());
        let expander = QueryExpander::from_config(&config.search);
        let cache = Arc::new(RetrievalCache::new(config.cache_enabled, config.cache_ttl()));
        let admission = Arc::new(Semaphore::new(config.max_concurrent_requests));
        let params_fingerprint =
            serde_json::to_string(&config.search).unwrap_or_else(|_| String::from("default"));
        Ok(Self {
            config,
            index,
            embedder,
            reranker: None,
            metrics: Arc::new(NoopMetrics),
            executors,
            expander,
            cache,
            admission,
            params_fingerprint,
        })
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn RerankModel>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Drop all cached branch results and query embeddings. Called after
    /// ingestion so stale rankings never outlive a corpus change.
    pub fn invalidate_cache(&self) {
        self.cache.invalidate_all();
    }

    /// Retrieve the best passages for `query`.
    ///
    /// Identical inputs against an unchanged corpus return identical
    /// passages in identical order.
    pub async fn retrieve(
        &self,
        query: &str,
        options: &RetrievalOptions,
    ) -> Result<Vec<RetrievedPassage>> {
        let _permit = self
            .admission
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| RagError::RetrievalUnavailable("engine is shutting down".to_string()))?;

        let started = Instant::now();
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }

        let max_results = options.max_results.unwrap_or(self.config.search.max_results).max(1);
        let fetch_k = (max_results * FETCH_MULTIPLIER).max(self.config.search.rerank_top_k);

        let sub_queries = self.expander.expand(query);
        let contexts = self.embed_sub_queries(&sub_queries).await?;

        let multi = self.config.enable_advanced_rag
            && self.config.search.primary_strategy == PrimaryStrategy::MultiStrategy
            && self.config.search.enable_result_fusion
            && self.executors.len() > 1;

        let executors: Vec<Arc<dyn StrategyExecutor>> = if multi {
            self.executors.clone()
        } else {
            let kind = self.config.single_strategy();
            let executor = self.executor_for(kind).ok_or_else(|| {
                RagError::Configuration(format!("strategy {kind} has no constructed executor"))
            })?;
            vec![executor]
        };

        let per_strategy = self.fan_out(&executors, &contexts, fetch_k).await?;

        let merged: Vec<Vec<SearchCandidate>> =
            per_strategy.into_values().map(fusion::merge_subqueries).collect();
        let fused: Vec<FusedResult> = if multi {
            fusion::fuse(&merged, &self.config.search.strategy_weights)
        } else {
            fusion::pass_through(merged.into_iter().next().unwrap_or_default())
        };

        let mut items = self.hydrate(fused).await?;

        if self.config.search.enable_diversity_filter {
            items = diversity::apply(items, self.config.search.diversity_threshold);
        }
        items = self.maybe_rerank(query, items).await;
        if self.config.enable_quality_filtering {
            items = quality_filter(items, self.config.search.similarity_threshold);
        }
        items.truncate(max_results);

        if items.is_empty() {
            items = self.run_fallbacks(&contexts, max_results, fetch_k).await?;
        }

        let passages = to_passages(items);
        if self.config.enable_metrics {
            self.metrics.record("retrieve", started.elapsed(), passages.len());
        }
        tracing::debug!(
            query,
            results = passages.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "retrieval complete"
        );
        Ok(passages)
    }

    async fn embed_sub_queries(&self, sub_queries: &[String]) -> Result<Vec<QueryContext>> {
        let model_id = &self.config.embedding.primary_model;
        let mut contexts = Vec::with_capacity(sub_queries.len());
        for text in sub_queries {
            let key = RetrievalCache::embedding_key(model_id, text);
            let vector = match self.cache.get_embedding(key) {
                Some(v) => (*v).clone(),
                None => {
                    let v = self.embedder.embed_query(text).await?;
                    self.cache.put_embedding(key, Arc::new(v.clone()));
                    v
                }
            };
            contexts.push(QueryContext { text: text.clone(), vector });
        }
        Ok(contexts)
    }

    /// Run every (executor, sub-query) pair concurrently. Branch results
    /// are grouped by strategy; a branch that fails after its retry is
    /// logged and dropped. Only the case where nothing at all succeeded
    /// is an error.
    async fn fan_out(
        &self,
        executors: &[Arc<dyn StrategyExecutor>],
        contexts: &[QueryContext],
        fetch_k: usize,
    ) -> Result<BTreeMap<StrategyKind, Vec<Vec<SearchCandidate>>>> {
        let timeout = self.config.request_timeout();
        let mut set: JoinSet<(StrategyKind, Option<Vec<SearchCandidate>>)> = JoinSet::new();
        for executor in executors {
            for context in contexts {
                let executor = executor.clone();
                let context = context.clone();
                let cache = self.cache.clone();
                let fingerprint = self.params_fingerprint.clone();
                set.spawn(async move {
                    let kind = executor.kind();
                    let key =
                        RetrievalCache::result_key(&context.text, kind, fetch_k, &fingerprint);
                    if let Some(hit) = cache.get_results(key) {
                        return (kind, Some((*hit).clone()));
                    }
                    match run_branch(executor.as_ref(), &context, fetch_k, timeout).await {
                        Ok(candidates) => {
                            cache.put_results(key, Arc::new(candidates.clone()));
                            (kind, Some(candidates))
                        }
                        Err(e) => {
                            tracing::warn!(strategy = %kind, error = %e, "strategy branch failed");
                            (kind, None)
                        }
                    }
                });
            }
        }

        let mut per_strategy: BTreeMap<StrategyKind, Vec<Vec<SearchCandidate>>> = BTreeMap::new();
        let mut branches = 0usize;
        let mut succeeded = 0usize;
        while let Some(joined) = set.join_next().await {
            branches += 1;
            match joined {
                Ok((kind, Some(candidates))) => {
                    succeeded += 1;
                    per_strategy.entry(kind).or_default().push(candidates);
                }
                Ok((_, None)) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "strategy branch task aborted");
                }
            }
        }
        if succeeded == 0 {
            return Err(RagError::RetrievalUnavailable(format!(
                "all {branches} strategy branches failed"
            )));
        }
        Ok(per_strategy)
    }

    async fn hydrate(&self, fused: Vec<FusedResult>) -> Result<Vec<(FusedResult, Chunk)>> {
        let mut items = Vec::with_capacity(fused.len());
        for result in fused {
            match self.get_chunk(&result.chunk_id).await? {
                Some(chunk) => items.push((result, chunk)),
                None => {
                    tracing::warn!(chunk_id = %result.chunk_id, "fused chunk missing from index")
                }
            }
        }
        Ok(items)
    }

    /// Chunk lookup with one bounded retry. An index that stays down is
    /// reported to the caller as `RetrievalUnavailable`; the internal
    /// `IndexUnavailable` classification never escapes `retrieve`.
    async fn get_chunk(&self, id: &ChunkId) -> Result<Option<Chunk>> {
        let timeout = self.config.request_timeout();
        let first = match tokio::time::timeout(timeout, self.index.get(id)).await {
            Ok(Ok(found)) => return Ok(found),
            Ok(Err(e)) => RagError::IndexUnavailable(e.to_string()),
            Err(_) => RagError::IndexUnavailable(format!(
                "chunk lookup timed out after {}ms",
                timeout.as_millis()
            )),
        };
        tracing::warn!(chunk_id = %id, error = %first, "chunk lookup failed, retrying once");
        match tokio::time::timeout(timeout, self.index.get(id)).await {
            Ok(Ok(found)) => Ok(found),
            Ok(Err(e)) => Err(RagError::RetrievalUnavailable(format!("index unavailable: {e}"))),
            Err(_) => Err(RagError::RetrievalUnavailable(format!(
                "index lookup timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Rerank the shortlist when enabled and a model is wired in. A
    /// rerank failure or timeout keeps the fused ordering; it never
    /// fails the request.
    async fn maybe_rerank(
        &self,
        query: &str,
        items: Vec<(FusedResult, Chunk)>,
    ) -> Vec<(FusedResult, Chunk)> {
        if !self.config.search.enable_reranking {
            return items;
        }
        let Some(model) = &self.reranker else {
            return items;
        };
        let top_k = self.config.search.rerank_top_k;
        let attempt = rerank::apply(model.as_ref(), query, items.clone(), top_k);
        match tokio::time::timeout(self.config.request_timeout(), attempt).await {
            Ok(Ok(reranked)) => reranked,
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "rerank failed, keeping fused order");
                items
            }
            Err(_) => {
                tracing::warn!("rerank timed out, keeping fused order");
                items
            }
        }
    }

    /// Tried in configured order when the primary path produced nothing.
    /// Each fallback is a plain single-strategy pass with the same
    /// quality bar; the first one with survivors wins.
    async fn run_fallbacks(
        &self,
        contexts: &[QueryContext],
        max_results: usize,
        fetch_k: usize,
    ) -> Result<Vec<(FusedResult, Chunk)>> {
        let timeout = self.config.request_timeout();
        for kind in &self.config.search.fallback_strategies {
            let Some(executor) = self.executor_for(*kind) else {
                tracing::debug!(strategy = %kind, "fallback strategy not enabled, skipping");
                continue;
            };
            let mut lists = Vec::with_capacity(contexts.len());
            for context in contexts {
                match run_branch(executor.as_ref(), context, fetch_k, timeout).await {
                    Ok(candidates) => lists.push(candidates),
                    Err(e) => {
                        tracing::warn!(strategy = %kind, error = %e, "fallback branch failed")
                    }
                }
            }
            if lists.is_empty() {
                continue;
            }
            let fused = fusion::pass_through(fusion::merge_subqueries(lists));
            let mut items = self.hydrate(fused).await?;
            if self.config.enable_quality_filtering {
                items = quality_filter(items, self.config.search.similarity_threshold);
            }
            items.truncate(max_results);
            if !items.is_empty() {
                tracing::info!(strategy = %kind, "fallback strategy rescued the query");
                return Ok(items);
            }
        }
        Ok(Vec::new())
    }

    fn executor_for(&self, kind: StrategyKind) -> Option<Arc<dyn StrategyExecutor>> {
        self.executors.iter().find(|e| e.kind() == kind).cloned()
    }
}

/// One strategy search with the configured timeout, retried once on
/// failure. A timeout is not retried; the branch already spent its
/// budget.
async fn run_branch(
    executor: &dyn StrategyExecutor,
    context: &QueryContext,
    fetch_k: usize,
    timeout: Duration,
) -> Result<Vec<SearchCandidate>> {
    match timed_search(executor, context, fetch_k, timeout).await {
        Err(RagError::StrategyFailure { strategy, reason }) => {
            tracing::debug!(%strategy, %reason, "strategy failed, retrying once");
            timed_search(executor, context, fetch_k, timeout).await
        }
        other => other,
    }
}

async fn timed_search(
    executor: &dyn StrategyExecutor,
    context: &QueryContext,
    fetch_k: usize,
    timeout: Duration,
) -> Result<Vec<SearchCandidate>> {
    match tokio::time::timeout(timeout, executor.search(context, fetch_k)).await {
        Ok(Ok(candidates)) => Ok(candidates),
        Ok(Err(e)) => Err(RagError::StrategyFailure {
            strategy: executor.kind(),
            reason: e.to_string(),
        }),
        Err(_) => Err(RagError::StrategyTimeout {
            strategy: executor.kind(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Keep only passages whose final score clears the threshold.
pub fn quality_filter(
    items: Vec<(FusedResult, Chunk)>,
    threshold: f32,
) -> Vec<(FusedResult, Chunk)> {
    items.into_iter().filter(|(result, _)| result.score >= threshold).collect()
}

fn to_passages(items: Vec<(FusedResult, Chunk)>) -> Vec<RetrievedPassage> {
    items
        .into_iter()
        .map(|(result, chunk)| RetrievedPassage {
            chunk_id: result.chunk_id,
            text: chunk.text,
            score: result.score,
            provenance: Provenance {
                doc_id: chunk.doc_id,
                source_url: chunk.metadata.get("source_url").cloned(),
                section: chunk.section,
                strategies: result.strategies,
            },
        })
        .collect()
}
