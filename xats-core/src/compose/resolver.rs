// xats-core/src/compose/resolver.rs
// Expands `$ref` fragment references in a document tree.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use async_recursion::async_recursion;
use futures::future::join_all;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{OnceCell, Semaphore};
use tracing::{debug, instrument, warn};
use xats_aio::FsFragmentLoader;
use xats_common::config::{default_concurrency, Config};
use xats_common::error::{ReportedError, Result, XatsError};
use xats_common::model::{
    CompositionLimits, FragmentLoader, FragmentReference, FragmentSchema, PartialDocumentCheck,
    ResolvedFragment,
};
use xats_common::CancelSignal;

use super::node::DocumentNode;
use super::sandbox::{confine, verify_within, Confined};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionMetrics {
    pub total_files: usize,
    pub total_bytes: u64,
    pub max_load_time_ms: f64,
    pub total_load_time_ms: f64,
    pub resolution_time_ms: f64,
}

/// A reference that would have re-entered a fragment already open on its branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CircularReference {
    pub path: String,
    /// Fragments open on the branch, outermost first, ending with `path`.
    pub chain: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompositionResult {
    pub document: Value,
    /// Every fragment loaded during the call, keyed by its path below the base.
    pub resolved: BTreeMap<String, ResolvedFragment>,
    pub errors: Vec<ReportedError>,
    pub circular_references: Vec<CircularReference>,
    pub metrics: CompositionMetrics,
}

impl CompositionResult {
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[derive(Clone)]
pub struct CompositionResolver {
    loader: Arc<dyn FragmentLoader>,
    schema: Arc<dyn FragmentSchema>,
    concurrency: usize,
}

impl CompositionResolver {
    pub fn new(loader: Arc<dyn FragmentLoader>) -> Self {
        Self {
            loader,
            schema: Arc::new(PartialDocumentCheck),
            concurrency: default_concurrency(),
        }
    }

    /// Filesystem loader with the configured fan-out.
    pub fn from_config(config: &Config) -> Self {
        Self::new(Arc::new(FsFragmentLoader::new())).with_concurrency(config.concurrency)
    }

    pub fn with_schema(mut self, schema: Arc<dyn FragmentSchema>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Expands every fragment reference in `root`. Failures are collected,
    /// never raised: a reference that cannot be expanded stays in the
    /// output as it was written.
    #[instrument(skip(self, root, limits, cancel), fields(base = %base_path.display()))]
    pub async fn resolve_fragments(
        &self,
        root: &Value,
        base_path: &Path,
        limits: &CompositionLimits,
        cancel: &CancelSignal,
    ) -> CompositionResult {
        let started = Instant::now();
        let canonical_base = match tokio::fs::canonicalize(base_path).await {
            Ok(p) => p,
            Err(e) => {
                warn!("Cannot canonicalize base {}: {}", base_path.display(), e);
                base_path.to_path_buf()
            }
        };
        let walk = Walk {
            loader: Arc::clone(&self.loader),
            schema: Arc::clone(&self.schema),
            base: base_path.to_path_buf(),
            canonical_base,
            limits: limits.clone(),
            cancel: cancel.clone(),
            io: Semaphore::new(self.concurrency),
            state: Mutex::new(WalkState::default()),
        };

        let node = DocumentNode::classify(root.clone());
        debug!("Composing document with {} top-level references", node.reference_count());
        let expanded = walk.expand(node, String::new(), 0, Vec::new()).await;

        let state = walk
            .state
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut metrics = state.metrics;
        metrics.resolution_time_ms = ms(started.elapsed());
        debug!(
            "Composition loaded {} fragments with {} errors",
            metrics.total_files,
            state.errors.len()
        );
        CompositionResult {
            document: expanded.into_value(),
            resolved: state.resolved,
            errors: state.errors,
            circular_references: state.circular,
            metrics,
        }
    }
}

impl std::fmt::Debug for CompositionResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositionResolver")
            .field("concurrency", &self.concurrency)
            .finish_non_exhaustive()
    }
}

#[derive(Default)]
struct WalkState {
    resolved: BTreeMap<String, ResolvedFragment>,
    errors: Vec<ReportedError>,
    circular: Vec<CircularReference>,
    metrics: CompositionMetrics,
    slots: HashMap<String, Arc<FragmentSlot>>,
    files_started: usize,
}

/// Parsed content of one fragment, loaded once per call.
type FragmentSlot = OnceCell<Result<Value>>;

/// State of one `resolve_fragments` call. The mutex-guarded accumulator is
/// the only thing shared between concurrently expanding siblings.
struct Walk {
    loader: Arc<dyn FragmentLoader>,
    schema: Arc<dyn FragmentSchema>,
    base: PathBuf,
    canonical_base: PathBuf,
    limits: CompositionLimits,
    cancel: CancelSignal,
    io: Semaphore,
    state: Mutex<WalkState>,
}

impl Walk {
    fn lock(&self) -> MutexGuard<'_, WalkState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// `chain` holds the fragments open on this branch; each call gets its own copy.
    #[async_recursion]
    async fn expand(
        &self,
        node: DocumentNode,
        dir_key: String,
        depth: usize,
        chain: Vec<String>,
    ) -> DocumentNode {
        match node {
            DocumentNode::Reference(reference) => {
                let entered = self.enter(&reference, &dir_key, depth, &chain).await;
                match entered {
                    Ok((confined, content)) => {
                        let mut next = chain;
                        next.push(confined.key.clone());
                        self.expand(
                            DocumentNode::classify(content),
                            confined.dir_key().to_string(),
                            depth + 1,
                            next,
                        )
                        .await
                    }
                    Err(e) => {
                        debug!("Leaving '{}' unexpanded: {}", reference.ref_path, e);
                        self.lock()
                            .errors
                            .push(ReportedError::new(reference.ref_path.clone(), &e));
                        DocumentNode::Reference(reference)
                    }
                }
            }
            DocumentNode::ContentBlock { block_type, fields } => DocumentNode::ContentBlock {
                block_type,
                fields: self.expand_fields(fields, &dir_key, depth, &chain).await,
            },
            DocumentNode::Object(fields) => {
                DocumentNode::Object(self.expand_fields(fields, &dir_key, depth, &chain).await)
            }
            DocumentNode::Array(items) => DocumentNode::Array(
                join_all(
                    items
                        .into_iter()
                        .map(|item| self.expand(item, dir_key.clone(), depth, chain.clone())),
                )
                .await,
            ),
            scalar @ DocumentNode::Scalar(_) => scalar,
        }
    }

    /// Siblings expand concurrently; results come back in their original order.
    async fn expand_fields(
        &self,
        fields: Vec<(String, DocumentNode)>,
        dir_key: &str,
        depth: usize,
        chain: &[String],
    ) -> Vec<(String, DocumentNode)> {
        join_all(fields.into_iter().map(|(key, value)| {
            let child = self.expand(value, dir_key.to_string(), depth, chain.to_vec());
            async move { (key, child.await) }
        }))
        .await
    }

    /// Runs every check for one reference and returns the fragment content
    /// to descend into.
    async fn enter(
        &self,
        reference: &FragmentReference,
        dir_key: &str,
        depth: usize,
        chain: &[String],
    ) -> Result<(Confined, Value)> {
        if self.cancel.is_cancelled() {
            return Err(XatsError::Cancelled);
        }
        let confined = confine(&self.base, dir_key, &reference.ref_path)?;
        if !self.limits.allows_extension(&confined.key) {
            return Err(XatsError::ExtensionNotAllowed(confined.key));
        }
        if chain.contains(&confined.key) {
            let mut cycle = chain.to_vec();
            cycle.push(confined.key.clone());
            warn!("Circular fragment reference: {}", cycle.join(" -> "));
            self.lock().circular.push(CircularReference {
                path: confined.key.clone(),
                chain: cycle.clone(),
            });
            return Err(XatsError::CircularDependency(cycle));
        }
        if depth >= self.limits.max_depth {
            return Err(XatsError::DepthLimitExceeded {
                at: confined.key,
                limit: self.limits.max_depth,
            });
        }
        verify_within(&self.canonical_base, &confined).await?;

        let (slot, first) = self.reserve(&confined.key)?;
        if !first {
            debug!("Reusing fragment {}", confined.key);
        }
        let target = &confined;
        let content = slot
            .get_or_init(|| async move {
                let fragment = self.load(target).await?;
                let content = fragment.content.clone();
                self.lock().resolved.insert(target.key.clone(), fragment);
                Ok::<Value, XatsError>(content)
            })
            .await
            .clone()?;
        Ok((confined, content))
    }

    /// Returns the load slot for `key`, creating it on first sight. Only a new
    /// slot counts against the file limit; later references share its load.
    fn reserve(&self, key: &str) -> Result<(Arc<FragmentSlot>, bool)> {
        let mut state = self.lock();
        if let Some(slot) = state.slots.get(key) {
            return Ok((Arc::clone(slot), false));
        }
        if state.files_started >= self.limits.max_total_files {
            return Err(XatsError::FileCountExceeded {
                limit: self.limits.max_total_files,
            });
        }
        state.files_started += 1;
        let slot = Arc::new(FragmentSlot::new());
        state.slots.insert(key.to_string(), Arc::clone(&slot));
        Ok((slot, true))
    }

    async fn load(&self, confined: &Confined) -> Result<ResolvedFragment> {
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(XatsError::Cancelled),
            permit = self.io.acquire() => permit
                .map_err(|_| XatsError::Generic("fragment io semaphore closed".to_string()))?,
        };

        let max = self.limits.max_file_size;
        let size = self.loader.size(&confined.full).await?;
        if size > max {
            return Err(XatsError::SizeLimitExceeded {
                path: confined.key.clone(),
                size,
                limit: max,
            });
        }
        if self.cancel.is_cancelled() {
            return Err(XatsError::Cancelled);
        }

        let started = Instant::now();
        let loaded = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(XatsError::Cancelled),
            loaded = self.loader.load(&confined.full) => loaded?,
        };
        let elapsed = started.elapsed();
        if loaded.size > max {
            return Err(XatsError::SizeLimitExceeded {
                path: confined.key.clone(),
                size: loaded.size,
                limit: max,
            });
        }

        let content: Value = serde_json::from_str(&loaded.content)?;
        if !self.schema.check(&content) {
            return Err(XatsError::SchemaRejected(confined.key.clone()));
        }

        {
            let metrics = &mut self.lock().metrics;
            metrics.total_files += 1;
            metrics.total_bytes += loaded.size;
            metrics.total_load_time_ms += ms(elapsed);
            metrics.max_load_time_ms = metrics.max_load_time_ms.max(ms(elapsed));
        }
        debug!("Loaded fragment {} ({} bytes)", confined.key, loaded.size);

        Ok(ResolvedFragment {
            path: confined.key.clone(),
            content,
            checksum: loaded.checksum,
            last_modified: loaded.last_modified,
            size: loaded.size,
        })
    }
}

pub(crate) fn ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
