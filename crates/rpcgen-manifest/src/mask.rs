use serde::Serialize;

/// Highest number of permissions a 128-bit mask can address.
pub const MAX_PERMISSIONS: usize = 128;

/// A 128-bit permission set split into two 64-bit halves.
///
/// Bit `i` of `lo` stands for manifest permission `i` when `i < 64`;
/// bit `i - 64` of `hi` stands for it otherwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
pub struct PermissionMask {
    pub hi: u64,
    pub lo: u64,
}

impl PermissionMask {
    pub const EMPTY: PermissionMask = PermissionMask { hi: 0, lo: 0 };

    /// The mask holding only the permission at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index >= MAX_PERMISSIONS`; manifests are validated against
    /// that limit at load time.
    pub fn bit(index: usize) -> PermissionMask {
        assert!(index < MAX_PERMISSIONS, "permission index {index} out of range");
        if index < 64 {
            PermissionMask {
                hi: 0,
                lo: 1u64 << index,
            }
        } else {
            PermissionMask {
                hi: 1u64 << (index - 64),
                lo: 0,
            }
        }
    }

    /// Bitwise OR of the masks for every index.
    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> PermissionMask {
        indices
            .into_iter()
            .fold(PermissionMask::EMPTY, |acc, i| acc.union(PermissionMask::bit(i)))
    }

    pub fn union(self, other: PermissionMask) -> PermissionMask {
        PermissionMask {
            hi: self.hi | other.hi,
            lo: self.lo | other.lo,
        }
    }

    pub fn is_empty(self) -> bool {
        self.hi == 0 && self.lo == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_and_high_halves() {
        let mask = PermissionMask::from_indices([0, 64, 65]);
        assert_eq!(mask.lo, 0b1);
        assert_eq!(mask.hi, 0b11);
    }

    #[test]
    fn bit_boundaries() {
        assert_eq!(PermissionMask::bit(63), PermissionMask { hi: 0, lo: 1 << 63 });
        assert_eq!(PermissionMask::bit(64), PermissionMask { hi: 1, lo: 0 });
        assert_eq!(PermissionMask::bit(127), PermissionMask { hi: 1 << 63, lo: 0 });
    }

    #[test]
    #[should_panic(expected = "out of range")]
    fn bit_past_limit_panics() {
        PermissionMask::bit(128);
    }

    #[test]
    fn union_and_emptiness() {
        assert!(PermissionMask::EMPTY.is_empty());
        assert!(PermissionMask::from_indices([]).is_empty());
        let mask = PermissionMask::bit(3).union(PermissionMask::bit(70));
        assert!(!mask.is_empty());
        assert_eq!(mask, PermissionMask { hi: 1 << 6, lo: 1 << 3 });
        assert_eq!(mask.union(PermissionMask::bit(3)), mask);
    }
}
