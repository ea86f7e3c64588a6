/// Serves a value from an optional cache, computing and storing it on a miss.
///
/// `$cache` is an `Option<&Cache>`. With no cache configured, or on a miss,
/// the future in `$block` is awaited; a successful result is written back
/// in the background with `$ttl` seconds to live. Errors from `$block` are
/// propagated with `?` and never cached.
///
/// # Example
/// ```rust,ignore
/// let recommendation = cached!(self.cache.as_ref(), cache_key, 900, async {
///     compute_recommendation().await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache {
            Some(cache) => {
                if let Some(cached) = cache.get_from_cache(&$key).await {
                    Ok(cached)
                } else {
                    let value = $block.await?;
                    cache.set_in_background(&$key, &value, $ttl);
                    Ok(value)
                }
            }
            None => $block.await,
        }
    }};
}
