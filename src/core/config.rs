//! # Limiter configuration.
//!
//! Provides [`LimiterConfig`] centralized settings for a [`Limiter`](crate::Limiter).
//!
//! Config is used in two ways:
//! 1. **Direct construction**: `Limiter::builder(config).build()`
//! 2. **Shorthand**: `Limiter::new(limit)` uses defaults for everything but the limit
//!
//! ## Validation
//! - `max_concurrent = 0` → rejected with [`ConfigError::NonPositiveLimit`]
//! - `bus_capacity = 0` → clamped to 1

use std::num::NonZeroUsize;

use crate::error::ConfigError;

/// Configuration for a limiter.
///
/// ## Field semantics
/// - `max_concurrent`: Maximum number of tasks in flight (must be `> 0`)
/// - `bus_capacity`: Event bus ring buffer size (min 1; clamped)
///
/// ## Notes
/// All fields are public for flexibility. Prefer the helper accessors over
/// reading fields directly so validation happens in one place.
#[derive(Clone, Debug)]
pub struct LimiterConfig {
    /// Maximum number of tasks allowed to run concurrently.
    ///
    /// Fixed for the lifetime of the limiter.
    pub max_concurrent: usize,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow receivers that lag behind more than `bus_capacity` events will
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl LimiterConfig {
    /// Creates a config with the given limit and default bus capacity.
    pub fn with_limit(max_concurrent: usize) -> Self {
        Self {
            max_concurrent,
            ..Self::default()
        }
    }

    /// Returns the validated concurrency limit.
    ///
    /// # Example
    /// ```
    /// use taskgate::{ConfigError, LimiterConfig};
    ///
    /// assert_eq!(LimiterConfig::with_limit(3).concurrency_limit().unwrap().get(), 3);
    /// assert_eq!(
    ///     LimiterConfig::with_limit(0).concurrency_limit(),
    ///     Err(ConfigError::NonPositiveLimit { limit: 0 }),
    /// );
    /// ```
    #[inline]
    pub fn concurrency_limit(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.max_concurrent).ok_or(ConfigError::NonPositiveLimit { limit: 0 })
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for LimiterConfig {
    /// Default configuration:
    ///
    /// - `max_concurrent` = available hardware parallelism (1 if unknown)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            max_concurrent: std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1),
            bus_capacity: 1024,
        }
    }
}

impl TryFrom<i64> for LimiterConfig {
    type Error = ConfigError;

    /// Builds a config from a signed limit, rejecting zero and negatives.
    fn try_from(limit: i64) -> Result<Self, Self::Error> {
        match usize::try_from(limit) {
            Ok(n) if n > 0 => Ok(Self::with_limit(n)),
            _ => Err(ConfigError::NonPositiveLimit { limit }),
        }
    }
}
