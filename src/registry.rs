//! Lookup of the rewriter chain that applies to a clause over an entity.
//!
//! Executors ask a [`ProviderLookup`] for a [`Provision`] before preparing a
//! clause. [`CachedLookup`] memoizes any lookup per `(kind, entity)`.

use crate::error::{RewriteError, RewriteResult};
use crate::rewrite::RewriterChain;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClauseKind {
    /// Bare expression outside any query
    Plain,
    Query,
    /// Query with GROUP BY / HAVING
    GroupableQuery,
    Insert,
    Update,
    Delete,
}

impl std::fmt::Display for ClauseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClauseKind::Plain => "expression",
            ClauseKind::Query => "query",
            ClauseKind::GroupableQuery => "groupable query",
            ClauseKind::Insert => "insert",
            ClauseKind::Update => "update",
            ClauseKind::Delete => "delete",
        };
        write!(f, "{}", name)
    }
}

/// The backend a clause runs on and the rewrites it needs first.
#[derive(Debug, Clone)]
pub struct Provision {
    pub backend: String,
    pub rewriter: Arc<RewriterChain>,
}

impl Provision {
    pub fn new(backend: impl Into<String>, rewriter: RewriterChain) -> Self {
        Self {
            backend: backend.into(),
            rewriter: Arc::new(rewriter),
        }
    }
}

pub trait ProviderLookup: Send + Sync {
    fn lookup(&self, kind: ClauseKind, entity: &str) -> RewriteResult<Arc<Provision>>;
}

/// Fixed registrations, with an optional per-kind fallback for unknown entities.
#[derive(Debug, Default)]
pub struct StaticRegistry {
    entries: HashMap<(ClauseKind, String), Arc<Provision>>,
    fallbacks: HashMap<ClauseKind, Arc<Provision>>,
}

impl StaticRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ClauseKind, entity: impl Into<String>, provision: Provision) {
        self.entries.insert((kind, entity.into()), Arc::new(provision));
    }

    /// Used for `kind` when the entity has no registration of its own.
    pub fn register_fallback(&mut self, kind: ClauseKind, provision: Provision) {
        self.fallbacks.insert(kind, Arc::new(provision));
    }
}

impl ProviderLookup for StaticRegistry {
    fn lookup(&self, kind: ClauseKind, entity: &str) -> RewriteResult<Arc<Provision>> {
        self.entries
            .get(&(kind, entity.to_string()))
            .or_else(|| self.fallbacks.get(&kind))
            .cloned()
            .ok_or_else(|| RewriteError::UnknownProvider {
                kind: kind.to_string(),
                entity: entity.to_string(),
            })
    }
}

/// Thread-safe memo in front of another lookup.
pub struct CachedLookup<L> {
    inner: L,
    entries: DashMap<(ClauseKind, String), Arc<Provision>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<L: ProviderLookup> CachedLookup<L> {
    pub fn new(inner: L) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Drop every cached provision; the next lookups go to the inner source.
    pub fn reset(&self) {
        let count = self.entries.len();
        self.entries.clear();
        tracing::debug!("Cleared {} cached provider entries", count);
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl<L: ProviderLookup> ProviderLookup for CachedLookup<L> {
    fn lookup(&self, kind: ClauseKind, entity: &str) -> RewriteResult<Arc<Provision>> {
        let key = (kind, entity.to_string());
        if let Some(found) = self.entries.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            return Ok(found.clone());
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let provision = self.inner.lookup(kind, entity)?;
        self.entries.insert(key, provision.clone());
        Ok(provision)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
