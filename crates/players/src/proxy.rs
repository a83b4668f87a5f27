use std::sync::atomic::{AtomicUsize, Ordering};

/// Cyclic selection over a configured outbound-proxy list. An empty pool is
/// the valid "direct connection" state. The cursor is a plain atomic;
/// concurrent callers may interleave, rotation is best-effort load
/// distribution, not a correctness guarantee.
#[derive(Debug, Default)]
pub struct ProxyPool {
    proxies: Vec<String>,
    cursor: AtomicUsize,
}

impl ProxyPool {
    pub fn new(proxies: Vec<String>) -> Self {
        Self {
            proxies,
            cursor: AtomicUsize::new(0),
        }
    }

    /// The proxy a request should use right now, `None` for direct
    /// connection.
    pub fn current(&self) -> Option<&str> {
        if self.proxies.is_empty() {
            return None;
        }
        let index = self.cursor.load(Ordering::Relaxed) % self.proxies.len();
        Some(self.proxies[index].as_str())
    }

    /// Move to the next candidate. Called after an unsuccessful attempt so a
    /// later retry lands on a different proxy. Never mutates the pool itself.
    pub fn advance(&self) {
        if !self.proxies.is_empty() {
            self.cursor.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn all(&self) -> &[String] {
        &self.proxies
    }

    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_pool_is_direct() {
        let pool = ProxyPool::new(Vec::new());
        assert_eq!(pool.current(), None);
        pool.advance();
        assert_eq!(pool.current(), None);
    }

    #[test]
    fn test_rotation_wraps() {
        let pool = ProxyPool::new(vec![
            "http://proxy-a:8080".to_string(),
            "http://proxy-b:8080".to_string(),
        ]);
        assert_eq!(pool.current(), Some("http://proxy-a:8080"));
        pool.advance();
        assert_eq!(pool.current(), Some("http://proxy-b:8080"));
        pool.advance();
        assert_eq!(pool.current(), Some("http://proxy-a:8080"));
    }
}
