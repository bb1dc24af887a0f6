use crate::session::FlushMode;

/// Processing mode requested by the caller
///
/// Batch processing wins over read-only when both are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ConnectionMode {
    pub batch_optimized: bool,
    pub read_only_optimized: bool,
}

impl ConnectionMode {
    pub fn new(batch_optimized: bool, read_only_optimized: bool) -> Self {
        Self {
            batch_optimized,
            read_only_optimized,
        }
    }

    pub fn flush_mode(&self) -> FlushMode {
        if self.batch_optimized {
            FlushMode::Always
        } else if self.read_only_optimized {
            FlushMode::Manual
        } else {
            FlushMode::Auto
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_mode_resolution() {
        assert_eq!(ConnectionMode::new(false, false).flush_mode(), FlushMode::Auto);
        assert_eq!(ConnectionMode::new(true, false).flush_mode(), FlushMode::Always);
        assert_eq!(ConnectionMode::new(false, true).flush_mode(), FlushMode::Manual);
    }

    #[test]
    fn test_batch_wins_over_read_only() {
        assert_eq!(ConnectionMode::new(true, true).flush_mode(), FlushMode::Always);
    }

    #[test]
    fn test_default_mode() {
        assert_eq!(ConnectionMode::default().flush_mode(), FlushMode::Auto);
    }
}
