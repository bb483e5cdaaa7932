//! Lock permission levels.

use std::fmt;

/// Access mode a transaction holds on a page.
///
/// Ordered by strength: `Shared < Exclusive`. A holder of a stronger
/// permission implicitly has every weaker one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Permission {
    /// Read-only; any number of concurrent holders.
    Shared,
    /// Read-write; excludes every other holder.
    Exclusive,
}

impl Permission {
    /// Whether this permission allows the holder to modify the page.
    #[inline]
    pub fn allows_write(self) -> bool {
        self == Permission::Exclusive
    }

    /// Whether holding `self` already covers a request for `requested`.
    #[inline]
    pub fn covers(self, requested: Permission) -> bool {
        self >= requested
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Shared => write!(f, "S"),
            Permission::Exclusive => write!(f, "X"),
        }
    }
}
