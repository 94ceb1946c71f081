/// Read-through caching around an async computation.
///
/// Returns the cached value for `$key` when present. Otherwise awaits `$block`,
/// queues the result for a background write with `$ttl` seconds to live and
/// returns it wrapped in `Ok`. Meant as the tail expression of a function
/// returning `AppResult`; errors from the cache read or `$block` propagate with `?`.
///
/// ```rust,ignore
/// async fn detail(cache: &Cache, id: &str) -> AppResult<ProductDetail> {
///     cached!(cache, CacheKey::Product(id.to_string()), 3600, async {
///         load_detail(id).await
///     })
/// }
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        match $cache.get_from_cache(&key).await? {
            Some(hit) => Ok(hit),
            None => {
                let value = $block.await?;
                $cache.set_in_background(&key, &value, $ttl);
                Ok(value)
            }
        }
    }};
}
