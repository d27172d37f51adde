use heapless::Vec;

use crate::handle::SocketHandle;
use crate::slot::{Origin, Slot, State};

/// A fixed-capacity pool of socket slots, indexed externally by
/// [`SocketHandle`] and internally by position.
///
/// Allocation picks the id itself rather than taking one from the caller:
/// `allocate` hands back a fresh, monotonically increasing id along with
/// the slot, instead of requiring the id up front.
pub struct SocketTable<const N: usize> {
    slots: Vec<Option<Slot>, N>,
    next_id: u32,
}

impl<const N: usize> Default for SocketTable<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SocketTable<N> {
    pub fn new() -> Self {
        let mut slots = Vec::new();
        while slots.len() < N {
            slots.push(None).ok();
        }
        Self { slots, next_id: 0 }
    }

    pub fn capacity(&self) -> usize {
        N
    }

    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Find the first free slot, assign it the next monotonic id, and
    /// return a mutable reference to it.
    ///
    /// Ids are never reused, even though the slot position this id now
    /// occupies will be, once the slot is released.
    pub fn allocate(&mut self, origin: Origin, state: State) -> Option<&mut Slot> {
        let index = self.slots.iter().position(|s| s.is_none())?;
        let id = SocketHandle(self.next_id);
        self.next_id += 1;
        self.slots[index] = Some(Slot::new(id, origin, state));
        self.slots[index].as_mut()
    }

    pub fn find(&mut self, id: SocketHandle) -> Option<&mut Slot> {
        self.slots
            .iter_mut()
            .filter_map(|s| s.as_mut())
            .find(|s| s.id == id)
    }

    /// Find the listening slot bound to local port `port`, if any.
    pub fn find_server_on_port(&mut self, port: u16) -> Option<&mut Slot> {
        self.slots
            .iter_mut()
            .filter_map(|s| s.as_mut())
            .find(|s| matches!(s.origin, Origin::Server) && s.local_port == Some(port))
    }

    /// Find an accepted-but-not-yet-`accept`ed child of the listening
    /// socket bound to `port`.
    pub fn find_unaccepted_on_port(&mut self, port: u16) -> Option<&mut Slot> {
        self.slots
            .iter_mut()
            .filter_map(|s| s.as_mut())
            .find(|s| matches!(s.state, State::Unaccepted) && s.local_port == Some(port))
    }

    /// Release the slot with the given id, returning it to `UNUSED`.
    ///
    /// Asserts the half-closed teardown protocol already ran: the
    /// transport connection must already be released and the receive
    /// buffer already drained or dropped.
    pub fn release(&mut self, id: SocketHandle) {
        if let Some(slot) = self.slots.iter_mut().find(|s| s.as_ref().map(|s| s.id) == Some(id)) {
            let s = slot.as_ref().unwrap();
            debug_assert!(!s.conn_open);
            debug_assert!(s.rx.is_none());
            crate::log::debug!("[{}] releasing slot", id.0);
            *slot = None;
        }
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Slot> {
        self.slots.iter_mut().filter_map(|s| s.as_mut())
    }
}
