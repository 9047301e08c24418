//! Array Pool: Bounded pool of scratch integer arrays for layout.
//!
//! Layout needs short-lived `i32` arrays (child sizes, flex weights, line
//! breaks) on every container. The pool hands back previously used arrays
//! instead of allocating. Arrays are exclusively owned by the caller
//! between [`ArrayPool::take`] and [`ArrayPool::give_back`].

/// Default maximum number of arrays retained by the pool.
pub const DEFAULT_POOL_CAP: usize = 32;

/// Performance counters for the pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Requests served from a pooled array.
    pub hits: u64,
    /// Requests that had to allocate.
    pub misses: u64,
    /// Arrays dropped because the pool was full.
    pub discarded: u64,
}

/// Bounded pool of reusable `i32` scratch arrays.
#[derive(Debug, Clone)]
pub struct ArrayPool {
    /// Idle arrays, in return order.
    free: Vec<Vec<i32>>,
    /// Maximum idle arrays retained.
    cap: usize,
    /// Counters.
    stats: PoolStats,
}

impl Default for ArrayPool {
    fn default() -> Self {
        Self::new()
    }
}

impl ArrayPool {
    /// Create a pool with the default cap of 32 arrays.
    pub const fn new() -> Self {
        Self::with_cap(DEFAULT_POOL_CAP)
    }

    /// Create a pool retaining at most `cap` idle arrays.
    pub const fn with_cap(cap: usize) -> Self {
        Self {
            free: Vec::new(),
            cap,
            stats: PoolStats {
                hits: 0,
                misses: 0,
                discarded: 0,
            },
        }
    }

    /// Number of idle arrays held.
    #[inline]
    pub fn idle(&self) -> usize {
        self.free.len()
    }

    /// Counters since creation.
    #[inline]
    pub const fn stats(&self) -> PoolStats {
        self.stats
    }

    /// Take an array of at least `len` elements with the first `len` zeroed.
    ///
    /// The first idle array whose length is `>= len` is used. When none
    /// qualifies a fresh zeroed array is allocated.
    pub fn take(&mut self, len: usize) -> Vec<i32> {
        if let Some(pos) = self.free.iter().position(|a| a.len() >= len) {
            let mut array = self.free.remove(pos);
            array[..len].fill(0);
            self.stats.hits += 1;
            return array;
        }
        self.stats.misses += 1;
        tracing::trace!(len, "array pool miss");
        vec![0; len]
    }

    /// Return an array to the pool.
    ///
    /// Dropped instead when the pool already holds `cap` arrays.
    pub fn give_back(&mut self, array: Vec<i32>) {
        if self.free.len() >= self.cap {
            self.stats.discarded += 1;
            return;
        }
        self.free.push(array);
    }

    /// Drop every idle array.
    pub fn clear(&mut self) {
        self.free.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_allocates_on_empty_pool() {
        let mut pool = ArrayPool::new();
        let a = pool.take(8);
        assert_eq!(a.len(), 8);
        assert!(a.iter().all(|&v| v == 0));
        assert_eq!(pool.stats().misses, 1);
    }

    #[test]
    fn test_reuse_zeroes_prefix() {
        let mut pool = ArrayPool::new();
        let mut a = pool.take(4);
        a.copy_from_slice(&[1, 2, 3, 4]);
        pool.give_back(a);

        let b = pool.take(3);
        assert_eq!(b.len(), 4);
        assert_eq!(&b[..3], &[0, 0, 0]);
        assert_eq!(pool.stats().hits, 1);
    }

    #[test]
    fn test_first_long_enough_array_is_used() {
        let mut pool = ArrayPool::new();
        pool.give_back(vec![0; 2]);
        pool.give_back(vec![0; 10]);
        let a = pool.take(5);
        assert_eq!(a.len(), 10);
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_take_keeps_return_order() {
        let mut pool = ArrayPool::new();
        pool.give_back(vec![0; 4]);
        pool.give_back(vec![0; 2]);
        pool.give_back(vec![0; 8]);
        assert_eq!(pool.take(3).len(), 4);
        assert_eq!(pool.take(1).len(), 2);
        assert_eq!(pool.take(1).len(), 8);
    }

    #[test]
    fn test_cap_bounds_idle_arrays() {
        let mut pool = ArrayPool::with_cap(2);
        for _ in 0..3 {
            pool.give_back(vec![0; 1]);
        }
        assert_eq!(pool.idle(), 2);
        assert_eq!(pool.stats().discarded, 1);
    }
}
