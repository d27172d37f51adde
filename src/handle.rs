use serde::{Deserialize, Serialize};

/// A socket identifier.
///
/// Assigned at allocation time from a process-lifetime monotonic counter
/// and never reused, even after the slot that held it is released. This
/// is distinct from the slot's position in the table, which *is* reused;
/// see [`crate::table::SocketTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocketHandle(pub u32);

impl core::fmt::Display for SocketHandle {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
