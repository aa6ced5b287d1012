//! Fixed-block event pools.
//!
//! Dynamic events draw one block from the smallest pool whose block size fits
//! the event. The block is owned by the event's last reference: dropping it
//! hands the block back to its pool exactly once. Pools bound how many events
//! of each size class can be alive at a time; running a pool dry is a sizing
//! error reported as [`FwError::PoolExhausted`].

use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{FwError, FwResult};

/// Sizing of one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub block_size: usize,
    pub block_count: usize,
}

impl PoolConfig {
    pub const fn new(block_size: usize, block_count: usize) -> Self {
        Self {
            block_size,
            block_count,
        }
    }
}

/// Pool statistics for debugging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of blocks in the pool
    pub total_blocks: usize,
    /// Number of free blocks currently available
    pub free_blocks: usize,
    /// Number of blocks currently in use
    pub used_blocks: usize,
    /// Minimum number of free blocks ever reached
    pub min_free_blocks: usize,
}

impl PoolStats {
    pub const fn new(total_blocks: usize) -> Self {
        Self {
            total_blocks,
            free_blocks: total_blocks,
            used_blocks: 0,
            min_free_blocks: total_blocks,
        }
    }

    fn on_alloc(&mut self) {
        self.used_blocks += 1;
        self.free_blocks -= 1;
        self.min_free_blocks = self.min_free_blocks.min(self.free_blocks);
    }

    fn on_dealloc(&mut self) {
        self.used_blocks -= 1;
        self.free_blocks += 1;
    }

    /// Utilization as a percentage (0-100).
    pub fn utilization(&self) -> u8 {
        if self.total_blocks == 0 {
            0
        } else {
            ((self.used_blocks * 100) / self.total_blocks) as u8
        }
    }
}

struct PoolState {
    free: Vec<u16>,
    in_use: Vec<bool>,
    stats: PoolStats,
}

pub(crate) struct Pool {
    id: u8,
    block_size: usize,
    state: Mutex<PoolState>,
}

impl Pool {
    fn new(id: u8, cfg: PoolConfig) -> Self {
        assert!(
            cfg.block_count <= u16::MAX as usize,
            "pool {id} has too many blocks"
        );
        Self {
            id,
            block_size: cfg.block_size,
            state: Mutex::new(PoolState {
                free: (0..cfg.block_count as u16).rev().collect(),
                in_use: vec![false; cfg.block_count],
                stats: PoolStats::new(cfg.block_count),
            }),
        }
    }

    fn get(self: &Arc<Self>) -> Option<Block> {
        let mut state = self.state.lock();
        let index = state.free.pop()?;
        state.in_use[index as usize] = true;
        state.stats.on_alloc();
        Some(Block {
            pool: Arc::clone(self),
            index,
        })
    }

    /// Returns a block to the free list.
    ///
    /// # Panics
    ///
    /// Panics if the block is not currently allocated.
    pub(crate) fn put(&self, index: u16) {
        let mut state = self.state.lock();
        let slot = state.in_use.get_mut(index as usize);
        match slot {
            Some(in_use) if *in_use => *in_use = false,
            _ => panic!("block {index} of pool {} released twice", self.id),
        }
        state.free.push(index);
        state.stats.on_dealloc();
    }

    fn stats(&self) -> PoolStats {
        self.state.lock().stats
    }
}

/// A pool block owned by exactly one live event.
pub(crate) struct Block {
    pool: Arc<Pool>,
    index: u16,
}

impl Block {
    pub(crate) fn pool_id(&self) -> u8 {
        self.pool.id
    }

    #[cfg(test)]
    pub(crate) fn parts(&self) -> (Arc<Pool>, u16) {
        (Arc::clone(&self.pool), self.index)
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        self.pool.put(self.index);
    }
}

impl core::fmt::Debug for Block {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Block")
            .field("pool", &self.pool.id)
            .field("index", &self.index)
            .finish()
    }
}

/// The set of size-class pools, ordered by block size.
pub struct EventPools {
    pools: Vec<Arc<Pool>>,
}

impl EventPools {
    /// Creates the pools. Pool ids start at 1; id 0 denotes a static event.
    ///
    /// # Panics
    ///
    /// Panics unless block sizes are strictly ascending.
    pub fn new(configs: &[PoolConfig]) -> Self {
        assert!(
            configs.windows(2).all(|w| w[0].block_size < w[1].block_size),
            "event pools must be ordered by ascending block size"
        );
        let pools = configs
            .iter()
            .enumerate()
            .map(|(i, cfg)| Arc::new(Pool::new(i as u8 + 1, *cfg)))
            .collect();
        Self { pools }
    }

    pub(crate) fn alloc(&self, size: usize) -> FwResult<Block> {
        let pool = self
            .pools
            .iter()
            .find(|p| p.block_size >= size)
            .ok_or(FwError::EventTooLarge(size))?;
        pool.get().ok_or(FwError::PoolExhausted(pool.id))
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    pub fn block_size(&self, pool_id: u8) -> Option<usize> {
        self.pool(pool_id).map(|p| p.block_size)
    }

    pub fn stats(&self, pool_id: u8) -> Option<PoolStats> {
        self.pool(pool_id).map(|p| p.stats())
    }

    fn pool(&self, pool_id: u8) -> Option<&Arc<Pool>> {
        self.pools.get((pool_id as usize).checked_sub(1)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pools() -> EventPools {
        EventPools::new(&[PoolConfig::new(32, 2), PoolConfig::new(64, 1)])
    }

    #[test]
    fn picks_smallest_fitting_pool() {
        let pools = pools();
        let small = pools.alloc(10).unwrap();
        let big = pools.alloc(40).unwrap();
        assert_eq!(small.pool_id(), 1);
        assert_eq!(big.pool_id(), 2);
        assert_eq!(pools.alloc(100).unwrap_err(), FwError::EventTooLarge(100));
    }

    #[test]
    fn exhaustion_and_release() {
        let pools = pools();
        let a = pools.alloc(64).unwrap();
        assert_eq!(pools.alloc(64).unwrap_err(), FwError::PoolExhausted(2));
        drop(a);
        let stats = pools.stats(2).unwrap();
        assert_eq!(stats.free_blocks, 1);
        assert_eq!(stats.min_free_blocks, 0);
        assert!(pools.alloc(64).is_ok());
    }

    #[test]
    fn stats_track_utilization() {
        let pools = pools();
        let _a = pools.alloc(1).unwrap();
        let stats = pools.stats(1).unwrap();
        assert_eq!(stats.used_blocks, 1);
        assert_eq!(stats.utilization(), 50);
        assert!(pools.stats(0).is_none());
        assert!(pools.stats(3).is_none());
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_is_fatal() {
        let pools = pools();
        let block = pools.alloc(1).unwrap();
        let (pool, index) = block.parts();
        drop(block);
        pool.put(index);
    }
}
