//! Semantic clustering of markets.
//!
//! Embeds `question + rules` text for every market, connects pairs whose
//! cosine similarity clears the threshold, and reads the connected
//! components off a union-find. Clusters are disjoint, ordered by their
//! first member's snapshot position, and deterministic given a fixed
//! embedder.

use std::sync::Arc;

use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::domain::id::MarketId;
use crate::domain::market::Market;
use crate::error::Result;
use crate::port::outbound::Embedder;

/// Clustering parameters.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Cosine similarity floor for connecting a pair.
    pub similarity_threshold: f32,
    /// Texts per embedding request.
    pub batch_size: usize,
    /// Concurrent embedding requests.
    pub concurrency: usize,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.75,
            batch_size: 16,
            concurrency: 4,
        }
    }
}

/// Union-Find over market indices.
struct UnionFind {
    parent: Vec<usize>,
}

impl UnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            let root = self.find(self.parent[x]);
            self.parent[x] = root;
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            // Attach the higher root under the lower so representatives
            // stay at the smallest member index.
            let (lo, hi) = if ra < rb { (ra, rb) } else { (rb, ra) };
            self.parent[hi] = lo;
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

/// Groups markets by embedding similarity.
pub struct SemanticClusterer {
    embedder: Arc<dyn Embedder>,
    config: ClusterConfig,
}

impl SemanticClusterer {
    /// Creates a clusterer over the given embedder.
    #[must_use]
    pub fn new(embedder: Arc<dyn Embedder>, config: ClusterConfig) -> Self {
        Self { embedder, config }
    }

    /// Embeds all market texts, batched and bounded by the embed pool.
    ///
    /// Results come back in input order regardless of completion order,
    /// which keeps clustering deterministic.
    async fn embed_all(&self, markets: &[Market]) -> Result<Vec<Vec<f32>>> {
        let texts: Vec<String> = markets.iter().map(Market::embedding_text).collect();
        let semaphore = Arc::new(Semaphore::new(self.config.concurrency.max(1)));

        let batches = texts
            .chunks(self.config.batch_size.max(1))
            .map(|chunk| {
                let semaphore = Arc::clone(&semaphore);
                let chunk = chunk.to_vec();
                async move {
                    let _permit = semaphore.acquire().await.expect("semaphore never closed");
                    self.embedder.embed(&chunk).await
                }
            })
            .collect::<Vec<_>>();

        let results = futures::future::try_join_all(batches).await?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Clusters the snapshot. Only clusters with at least two members are
    /// returned; member order follows the snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when embedding fails outright.
    pub async fn cluster(&self, markets: &[Market]) -> Result<Vec<Vec<MarketId>>> {
        if markets.len() < 2 {
            return Ok(Vec::new());
        }

        info!(
            count = markets.len(),
            embedder = self.embedder.name(),
            "Embedding markets for clustering"
        );
        let embeddings = self.embed_all(markets).await?;

        let n = markets.len();
        let mut uf = UnionFind::new(n);
        let mut edges = 0usize;
        for i in 0..n {
            for j in (i + 1)..n {
                if cosine(&embeddings[i], &embeddings[j]) >= self.config.similarity_threshold {
                    uf.union(i, j);
                    edges += 1;
                }
            }
        }
        debug!(edges, "Similarity edges above threshold");

        // Components keyed by root; roots are minimal member indices, so
        // iterating 0..n yields clusters in first-member order.
        let mut clusters: Vec<Vec<MarketId>> = Vec::new();
        let mut root_to_cluster: std::collections::HashMap<usize, usize> =
            std::collections::HashMap::new();
        for i in 0..n {
            let root = uf.find(i);
            let slot = *root_to_cluster.entry(root).or_insert_with(|| {
                clusters.push(Vec::new());
                clusters.len() - 1
            });
            clusters[slot].push(markets[i].id.clone());
        }

        clusters.retain(|c| c.len() >= 2);
        info!(clusters = clusters.len(), "Clustering complete");
        Ok(clusters)
    }
}
