/// Read-through caching around an async fetch.
///
/// Looks the key up in the cache first. On a hit the cached value is returned.
/// On a miss (or when the policy bypasses the cache) the block is awaited, its
/// value stored under the key, and returned.
///
/// # Arguments
/// * `$cache`: a `ResponseCache` (anything with `get(&key, policy)` and `put(&key, value)`).
/// * `$key`: the `CacheKey` to read and write.
/// * `$policy`: a `CachePolicy`; `Bypass` skips the read but still writes.
/// * `$block`: a future producing `AppResult<T>`, awaited only on a miss.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache, key, CachePolicy::Prefer, async move {
///     self.queue.enqueue(request).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $policy:expr, $block:expr) => {{
        if let Some(hit) = $cache.get(&$key, $policy) {
            tracing::debug!(key = %$key, "Cache hit");
            Ok(hit)
        } else {
            tracing::debug!(key = %$key, "Cache miss");
            let value = $block.await?;
            $cache.put(&$key, ::std::clone::Clone::clone(&value));
            Ok(value)
        }
    }};
}
