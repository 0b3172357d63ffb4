//! ENS resolver with TTL caching and single-flight lookups.

use alloy::primitives::{address, Address};
use alloy::sol;
use dashmap::DashMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::timeout;

use crate::chains::{ChainError, ChainRegistry};
use crate::ens::cache::{CacheLookup, CacheStats, CachedValue, ResolutionCache};
use crate::ens::namehash::{namehash, reverse_node};

/// The ENS registry, deployed at the same address on mainnet and Sepolia.
const ENS_REGISTRY: Address = address!("00000000000C2E074eC69A0dBFc9D8c4175C4eBF");

sol! {
    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IEnsRegistry {
        function resolver(bytes32 node) external view returns (address);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface IAddrResolver {
        function addr(bytes32 node) external view returns (address);
    }

    #[allow(missing_docs)]
    #[sol(rpc)]
    interface INameResolver {
        function name(bytes32 node) external view returns (string);
    }
}

/// Full multi-label `.eth` name check, applied before any network access.
static ENS_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?(\.[a-z0-9]([a-z0-9-]*[a-z0-9])?)*\.eth$")
        .expect("ENS name pattern is a valid regex")
});

/// Is `name` a syntactically plausible `.eth` name?
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && ENS_NAME_RE.is_match(&name.to_lowercase())
}

/// Errors surfaced by resolution when the failure policy propagates them.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Network-level failure; retrying later may succeed. Distinct from a
    /// definitive "not found", which is an `Ok(None)`.
    #[error("transient lookup failure: {0}")]
    Transient(String),

    /// Chain-level failure (unsupported chain, bad endpoint).
    #[error(transparent)]
    Chain(#[from] ChainError),
}

/// What to do when a lookup fails at the network level.
///
/// The default is `Propagate`: callers see a [`ResolveError::Transient`]
/// rather than a fake "not found", and nothing is cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    #[default]
    Propagate,
    Swallow,
}

/// Network-facing name lookup, kept behind a trait so tests can count calls
/// without a live chain.
pub trait NameLookup {
    fn forward(
        &self,
        name: &str,
    ) -> impl Future<Output = Result<Option<Address>, ResolveError>> + Send;
    fn reverse(
        &self,
        address: Address,
    ) -> impl Future<Output = Result<Option<String>, ResolveError>> + Send;
}

/// [`NameLookup`] backed by the ENS registry contracts on one chain.
pub struct EnsLookup {
    registry: Arc<ChainRegistry>,
    chain_id: u64,
}

impl EnsLookup {
    pub fn new(registry: Arc<ChainRegistry>, chain_id: u64) -> Self {
        Self { registry, chain_id }
    }

    async fn rpc<T>(
        &self,
        fut: impl std::future::IntoFuture<Output = Result<T, alloy::contract::Error>>,
    ) -> Result<T, ResolveError> {
        let rpc_timeout = self.registry.rpc_timeout();
        match timeout(rpc_timeout, fut.into_future()).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(ResolveError::Transient(e.to_string())),
            Err(_) => Err(ResolveError::Transient(format!(
                "lookup timed out after {} seconds",
                rpc_timeout.as_secs()
            ))),
        }
    }

    /// Resolve a name without verifying anything about the result.
    async fn forward_unchecked(&self, name: &str) -> Result<Option<Address>, ResolveError> {
        let provider = self.registry.provider(self.chain_id)?;
        let node = namehash(name);

        let ens = IEnsRegistry::new(ENS_REGISTRY, provider.clone());
        let resolver_addr = self.rpc(ens.resolver(node).call()).await?;
        if resolver_addr == Address::ZERO {
            return Ok(None);
        }

        let resolver = IAddrResolver::new(resolver_addr, provider);
        let resolved = self.rpc(resolver.addr(node).call()).await?;
        Ok((resolved != Address::ZERO).then_some(resolved))
    }
}

impl NameLookup for EnsLookup {
    async fn forward(&self, name: &str) -> Result<Option<Address>, ResolveError> {
        self.forward_unchecked(name).await
    }

    async fn reverse(&self, address: Address) -> Result<Option<String>, ResolveError> {
        let provider = self.registry.provider(self.chain_id)?;
        let node = reverse_node(address);

        let ens = IEnsRegistry::new(ENS_REGISTRY, provider.clone());
        let resolver_addr = self.rpc(ens.resolver(node).call()).await?;
        if resolver_addr == Address::ZERO {
            return Ok(None);
        }

        let resolver = INameResolver::new(resolver_addr, provider);
        let claimed = self.rpc(resolver.name(node).call()).await?;
        if claimed.is_empty() {
            return Ok(None);
        }

        // A reverse record is only authoritative if the claimed name
        // forward-resolves back to the same address.
        match self.forward_unchecked(&claimed).await? {
            Some(forward) if forward == address => Ok(Some(claimed)),
            _ => Ok(None),
        }
    }
}

/// Validating, caching ENS resolver.
pub struct EnsResolver<L: NameLookup> {
    lookup: L,
    cache: ResolutionCache,
    policy: FailurePolicy,
    reverse_enabled: bool,
    /// Per-key gates so concurrent misses on one key do a single lookup.
    inflight: DashMap<String, Arc<Mutex<()>>>,
}

impl<L: NameLookup> EnsResolver<L> {
    pub fn new(lookup: L, ttl: Duration, policy: FailurePolicy, reverse_enabled: bool) -> Self {
        Self {
            lookup,
            cache: ResolutionCache::new(ttl),
            policy,
            reverse_enabled,
            inflight: DashMap::new(),
        }
    }

    /// Resolve a `.eth` name to an address.
    ///
    /// Malformed input returns `Ok(None)` without touching the network or
    /// the cache. A definitive not-found is cached; transient failures
    /// follow the configured [`FailurePolicy`].
    pub async fn resolve(&self, name: &str) -> Result<Option<Address>, ResolveError> {
        if !is_valid_name(name) {
            tracing::warn!(name, "invalid ENS name format");
            return Ok(None);
        }
        let normalized = name.to_lowercase();
        let key = ResolutionCache::forward_key(&normalized);

        if let CacheLookup::Hit(CachedValue::Forward(cached)) = self.cache.get(&key) {
            tracing::debug!(name = %normalized, "resolution cache hit");
            return Ok(cached);
        }

        let gate = self.inflight.entry(key.clone()).or_default().clone();
        let guard = gate.lock().await;

        // Another task may have finished the same lookup while we waited.
        if let CacheLookup::Hit(CachedValue::Forward(cached)) = self.cache.get(&key) {
            drop(guard);
            self.inflight.remove(&key);
            return Ok(cached);
        }

        let outcome = match self.lookup.forward(&normalized).await {
            Ok(resolved) => {
                tracing::info!(name = %normalized, resolved = ?resolved, "resolved ENS name");
                self.cache
                    .insert(key.clone(), CachedValue::Forward(resolved));
                Ok(resolved)
            }
            Err(e) => self.apply_policy(&normalized, e),
        };

        drop(guard);
        self.inflight.remove(&key);
        outcome
    }

    /// Resolve an address back to its primary `.eth` name.
    ///
    /// Gated by configuration; when disabled returns `Ok(None)` without a
    /// lookup.
    pub async fn reverse(&self, address: Address) -> Result<Option<String>, ResolveError> {
        if !self.reverse_enabled {
            tracing::warn!("reverse resolution is disabled");
            return Ok(None);
        }
        let key = ResolutionCache::reverse_key(address);

        if let CacheLookup::Hit(CachedValue::Reverse(cached)) = self.cache.get(&key) {
            tracing::debug!(%address, "reverse cache hit");
            return Ok(cached);
        }

        let gate = self.inflight.entry(key.clone()).or_default().clone();
        let guard = gate.lock().await;

        if let CacheLookup::Hit(CachedValue::Reverse(cached)) = self.cache.get(&key) {
            drop(guard);
            self.inflight.remove(&key);
            return Ok(cached);
        }

        let outcome = match self.lookup.reverse(address).await {
            Ok(resolved) => {
                tracing::info!(%address, name = ?resolved, "reverse-resolved address");
                self.cache
                    .insert(key.clone(), CachedValue::Reverse(resolved.clone()));
                Ok(resolved)
            }
            Err(e) => match self.apply_policy(&address.to_string(), e) {
                Ok(_) => Ok(None),
                Err(e) => Err(e),
            },
        };

        drop(guard);
        self.inflight.remove(&key);
        outcome
    }

    /// Apply the failure policy to a lookup error. Swallowed failures are not
    /// cached, so the next request retries.
    fn apply_policy(
        &self,
        subject: &str,
        error: ResolveError,
    ) -> Result<Option<Address>, ResolveError> {
        match self.policy {
            FailurePolicy::Propagate => {
                tracing::error!(subject, error = %error, "lookup failed");
                Err(error)
            }
            FailurePolicy::Swallow => {
                tracing::warn!(subject, error = %error, "lookup failed, reporting not-found");
                Ok(None)
            }
        }
    }

    /// The underlying network lookup, mainly for test inspection.
    pub fn lookup(&self) -> &L {
        &self.lookup
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        tracing::info!("resolution cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedLookup {
        forward_calls: AtomicUsize,
        reverse_calls: AtomicUsize,
        result: Option<Address>,
        fail: bool,
    }

    impl ScriptedLookup {
        fn returning(result: Option<Address>) -> Self {
            Self {
                forward_calls: AtomicUsize::new(0),
                reverse_calls: AtomicUsize::new(0),
                result,
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail: true,
                ..Self::returning(None)
            }
        }
    }

    impl NameLookup for ScriptedLookup {
        async fn forward(&self, _name: &str) -> Result<Option<Address>, ResolveError> {
            self.forward_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ResolveError::Transient("connection refused".into()));
            }
            Ok(self.result)
        }

        async fn reverse(&self, _address: Address) -> Result<Option<String>, ResolveError> {
            self.reverse_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ResolveError::Transient("connection refused".into()));
            }
            Ok(Some("alice.eth".to_string()))
        }
    }

    fn some_address() -> Address {
        "0xd8dA6BF26964aF9D7eEd9e03E53415D37aA96045"
            .parse()
            .unwrap()
    }

    fn resolver(
        lookup: ScriptedLookup,
        ttl: Duration,
        policy: FailurePolicy,
    ) -> EnsResolver<ScriptedLookup> {
        EnsResolver::new(lookup, ttl, policy, false)
    }

    #[tokio::test]
    async fn second_resolve_within_ttl_hits_the_cache() {
        let r = resolver(
            ScriptedLookup::returning(Some(some_address())),
            Duration::from_secs(300),
            FailurePolicy::Propagate,
        );
        assert_eq!(r.resolve("alice.eth").await.unwrap(), Some(some_address()));
        assert_eq!(r.resolve("alice.eth").await.unwrap(), Some(some_address()));
        assert_eq!(r.lookup.forward_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_ttl_triggers_a_second_lookup() {
        let r = resolver(
            ScriptedLookup::returning(Some(some_address())),
            Duration::from_millis(10),
            FailurePolicy::Propagate,
        );
        r.resolve("alice.eth").await.unwrap();
        r.resolve("alice.eth").await.unwrap();
        assert_eq!(r.lookup.forward_calls.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_millis(20)).await;
        r.resolve("alice.eth").await.unwrap();
        assert_eq!(r.lookup.forward_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn not_found_is_cached_and_not_requeried() {
        let r = resolver(
            ScriptedLookup::returning(None),
            Duration::from_secs(300),
            FailurePolicy::Propagate,
        );
        assert_eq!(r.resolve("nobody.eth").await.unwrap(), None);
        assert_eq!(r.resolve("nobody.eth").await.unwrap(), None);
        assert_eq!(r.lookup.forward_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn case_variants_share_one_cache_entry() {
        let r = resolver(
            ScriptedLookup::returning(Some(some_address())),
            Duration::from_secs(300),
            FailurePolicy::Propagate,
        );
        r.resolve("alice.eth").await.unwrap();
        r.resolve("Alice.ETH").await.unwrap();
        assert_eq!(r.lookup.forward_calls.load(Ordering::SeqCst), 1);
        assert_eq!(r.cache_stats().total_entries, 1);
    }

    #[tokio::test]
    async fn malformed_name_never_reaches_the_lookup() {
        let r = resolver(
            ScriptedLookup::returning(Some(some_address())),
            Duration::from_secs(300),
            FailurePolicy::Propagate,
        );
        assert_eq!(r.resolve("not-a-name").await.unwrap(), None);
        assert_eq!(r.resolve("-bad.eth").await.unwrap(), None);
        assert_eq!(r.resolve("").await.unwrap(), None);
        assert_eq!(r.lookup.forward_calls.load(Ordering::SeqCst), 0);
        assert_eq!(r.cache_stats().total_entries, 0);
    }

    #[tokio::test]
    async fn propagate_policy_surfaces_transient_failures_uncached() {
        let r = resolver(
            ScriptedLookup::failing(),
            Duration::from_secs(300),
            FailurePolicy::Propagate,
        );
        assert!(matches!(
            r.resolve("alice.eth").await,
            Err(ResolveError::Transient(_))
        ));
        assert_eq!(r.cache_stats().total_entries, 0);
    }

    #[tokio::test]
    async fn swallow_policy_degrades_to_none_uncached() {
        let r = resolver(
            ScriptedLookup::failing(),
            Duration::from_secs(300),
            FailurePolicy::Swallow,
        );
        assert_eq!(r.resolve("alice.eth").await.unwrap(), None);
        // Not cached: the next request retries the lookup.
        assert_eq!(r.resolve("alice.eth").await.unwrap(), None);
        assert_eq!(r.lookup.forward_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn reverse_is_gated_by_configuration() {
        let r = EnsResolver::new(
            ScriptedLookup::returning(Some(some_address())),
            Duration::from_secs(300),
            FailurePolicy::Propagate,
            false,
        );
        assert_eq!(r.reverse(some_address()).await.unwrap(), None);
        assert_eq!(r.lookup.reverse_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn reverse_caches_like_forward() {
        let r = EnsResolver::new(
            ScriptedLookup::returning(Some(some_address())),
            Duration::from_secs(300),
            FailurePolicy::Propagate,
            true,
        );
        assert_eq!(
            r.reverse(some_address()).await.unwrap(),
            Some("alice.eth".to_string())
        );
        r.reverse(some_address()).await.unwrap();
        assert_eq!(r.lookup.reverse_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn name_format_validation() {
        assert!(is_valid_name("alice.eth"));
        assert!(is_valid_name("sub.alice.eth"));
        assert!(is_valid_name("Bob-Smith.ETH"));
        assert!(!is_valid_name("alice"));
        assert!(!is_valid_name("alice.com"));
        assert!(!is_valid_name("-alice.eth"));
        assert!(!is_valid_name("alice-.eth"));
        assert!(!is_valid_name(".eth"));
    }
}
