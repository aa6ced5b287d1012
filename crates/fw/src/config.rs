//! Framework configuration.

use crate::pool::PoolConfig;

/// Default event pools: 32 B x 32, 64 B x 8, 256 B x 4, 2048 B x 2.
pub const DEFAULT_POOLS: [PoolConfig; 4] = [
    PoolConfig::new(32, 32),
    PoolConfig::new(64, 8),
    PoolConfig::new(256, 4),
    PoolConfig::new(2048, 2),
];

/// Configuration for the framework.
///
/// Sizes the event pools and the queues of execution contexts and sets the
/// timer tick period.
#[derive(Debug, Clone)]
pub struct FwConfig {
    pub name: &'static str,
    /// Queue length of an active object.
    pub event_queue_len: usize,
    /// Queue length of a bare region-hosting thread.
    pub xthread_queue_len: usize,
    /// Milliseconds per timer tick.
    pub ms_per_tick: u32,
    pub pools: Vec<PoolConfig>,
    pub idle_callback: Option<fn()>,
}

impl Default for FwConfig {
    fn default() -> Self {
        Self {
            name: "FW",
            event_queue_len: 64,
            xthread_queue_len: 16,
            ms_per_tick: 10,
            pools: DEFAULT_POOLS.to_vec(),
            idle_callback: None,
        }
    }
}

impl FwConfig {
    pub fn builder() -> FwConfigBuilder {
        FwConfigBuilder::default()
    }

    /// Rounds a timeout up to whole ticks. Never returns zero.
    pub fn ms_to_ticks(&self, ms: u32) -> u32 {
        ms.div_ceil(self.ms_per_tick.max(1)).max(1)
    }
}

/// Builder for ergonomic framework configuration construction.
#[derive(Debug, Clone, Default)]
pub struct FwConfigBuilder {
    config: FwConfig,
    custom_pools: bool,
}

impl FwConfigBuilder {
    pub fn name(mut self, name: &'static str) -> Self {
        self.config.name = name;
        self
    }

    pub fn event_queue_len(mut self, len: usize) -> Self {
        self.config.event_queue_len = len;
        self
    }

    pub fn xthread_queue_len(mut self, len: usize) -> Self {
        self.config.xthread_queue_len = len;
        self
    }

    /// # Panics
    ///
    /// Panics if `ms` is zero.
    pub fn ms_per_tick(mut self, ms: u32) -> Self {
        assert!(ms > 0, "tick period must be at least 1 ms");
        self.config.ms_per_tick = ms;
        self
    }

    /// Adds a pool. The first call replaces the default pools.
    pub fn pool(mut self, block_size: usize, block_count: usize) -> Self {
        if !self.custom_pools {
            self.config.pools.clear();
            self.custom_pools = true;
        }
        self.config.pools.push(PoolConfig::new(block_size, block_count));
        self
    }

    pub fn idle_callback(mut self, callback: fn()) -> Self {
        self.config.idle_callback = Some(callback);
        self
    }

    pub fn build(self) -> FwConfig {
        self.config
    }
}
