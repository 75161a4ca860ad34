//! Per-pass priority allocation and stale cutoffs.

/// Distance between consecutive priorities in a category.
pub const PRIORITY_STEP: u32 = 10;

/// Allocator state for one synthesis pass.
///
/// Policies and login schemas are numbered independently. Each counter
/// starts at zero and advances by [`PRIORITY_STEP`] before every assignment,
/// so the first priority handed out in a category is 10.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PriorityAllocator {
    policy: u32,
    login_schema: u32,
}

impl PriorityAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Next authentication policy priority: 10 for the primary policy, 20 for the bypass policy.
    pub fn next_policy(&mut self) -> u32 {
        self.policy += PRIORITY_STEP;
        self.policy
    }

    /// Next login-schema priority.
    pub fn next_login_schema(&mut self) -> u32 {
        self.login_schema += PRIORITY_STEP;
        self.login_schema
    }

    /// Close the pass: the last priority of each category becomes its cutoff.
    #[must_use]
    pub fn high_water_marks(self) -> HighWaterMarks {
        HighWaterMarks {
            policy: Cutoff::Above(self.policy),
            login_schema: Cutoff::Above(self.login_schema),
        }
    }
}

/// Boundary above which a bound priority belongs to a superseded generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cutoff {
    /// Priorities strictly above the value are stale.
    Above(u32),
    /// Every bound priority is stale.
    Everything,
}

impl Cutoff {
    #[must_use]
    pub fn is_stale(self, priority: u32) -> bool {
        match self {
            Self::Above(mark) => priority > mark,
            Self::Everything => true,
        }
    }
}

/// Cutoffs of both categories after a pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HighWaterMarks {
    pub policy: Cutoff,
    pub login_schema: Cutoff,
}

impl HighWaterMarks {
    /// The empty generation used by teardown.
    #[must_use]
    pub fn teardown() -> Self {
        Self {
            policy: Cutoff::Everything,
            login_schema: Cutoff::Everything,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_schema_priorities_for_three_headers() {
        let mut alloc = PriorityAllocator::new();
        let got: Vec<u32> = (0..3).map(|_| alloc.next_login_schema()).collect();
        assert_eq!(got, vec![10, 20, 30]);
        assert_eq!(alloc.high_water_marks().login_schema, Cutoff::Above(30));
    }

    #[test]
    fn test_categories_are_independent() {
        let mut alloc = PriorityAllocator::new();
        assert_eq!(alloc.next_policy(), 10);
        assert_eq!(alloc.next_login_schema(), 10);
        assert_eq!(alloc.next_policy(), 20);
        let marks = alloc.high_water_marks();
        assert_eq!(marks.policy, Cutoff::Above(20));
        assert_eq!(marks.login_schema, Cutoff::Above(10));
    }

    #[test]
    fn test_unused_category_marks_everything_above_zero_stale() {
        let marks = PriorityAllocator::new().high_water_marks();
        assert!(marks.login_schema.is_stale(10));
        assert!(!marks.login_schema.is_stale(0));
    }

    #[test]
    fn test_cutoffs() {
        assert!(!Cutoff::Above(20).is_stale(20));
        assert!(Cutoff::Above(20).is_stale(30));
        assert!(Cutoff::Everything.is_stale(0));
        assert_eq!(HighWaterMarks::teardown().policy, Cutoff::Everything);
    }
}
