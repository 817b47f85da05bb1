//! Cached regular expressions for best-effort parsing of loose input.

use std::collections::HashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

use regex::Regex;

/// Thread-safe cache of compiled patterns.
///
/// Patterns are compiled on first use and kept for the lifetime of the
/// program.
struct RegexCache {
    cache: RwLock<HashMap<&'static str, Regex>>,
}

impl RegexCache {
    fn new() -> Self {
        Self {
            cache: RwLock::new(HashMap::new()),
        }
    }

    fn get_or_compile(&self, pattern: &'static str) -> Result<Regex, regex::Error> {
        {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(regex) = cache.get(pattern) {
                return Ok(regex.clone());
            }
        }

        let regex = Regex::new(pattern)?;
        self.cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pattern, regex.clone());
        Ok(regex)
    }
}

fn regex_cache() -> &'static RegexCache {
    static CACHE: OnceLock<RegexCache> = OnceLock::new();
    CACHE.get_or_init(RegexCache::new)
}

/// Return the part of `value` matched by an anchored `pattern`.
///
/// An invalid pattern is logged and treated as a non-match, so callers fall
/// back to their empty value instead of failing.
pub(crate) fn leading_match<'v>(value: &'v str, pattern: &'static str) -> Option<&'v str> {
    match regex_cache().get_or_compile(pattern) {
        Ok(regex) => regex.find(value).map(|m| m.as_str()),
        Err(e) => {
            tracing::warn!(
                pattern = pattern,
                error = %e,
                "Invalid parse pattern, treating as non-match"
            );
            None
        }
    }
}
