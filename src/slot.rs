use crate::buffer::ByteBuffer;
use crate::handle::SocketHandle;

/// The nine states a slot can be in.
///
/// Transitions are driven by both upper-API calls and transport
/// callbacks; see each transition site in `mux.rs` for the full table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum State {
    /// New inbound connection, not yet handed to the upper layer by
    /// `accept`.
    Unaccepted,
    /// DNS resolution of the saved hostname is in flight.
    HostResolving,
    /// Outbound connect issued, awaiting the transport's connect callback.
    Connecting,
    /// Connected, nothing in flight.
    Idle,
    /// A send is in flight, awaiting the transport's "sent" callback.
    Transmitting,
    /// Local close initiated, awaiting the transport's disconnect callback.
    Disconnecting,
    /// Transport side torn down (by the remote end or by an error);
    /// awaiting the upper layer's `close`.
    Closed,
    /// Transport failure recorded; awaiting the upper layer's `close`.
    Error,
}

/// How a slot came to exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Origin {
    /// Listening socket.
    Server,
    /// Actively-connected client socket.
    Outbound,
    /// Accepted child of a listening socket; the transport, not this
    /// module, owns its connection object.
    Inbound,
}

/// A captured transport error: message plus the transport's own code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SocketError {
    pub message: &'static str,
    pub code: i32,
}

/// One socket-table entry: the unit of ownership.
///
/// `conn_open` starts `false` on allocation and becomes `true` only once a
/// transport connection object actually exists for the slot: immediately,
/// for an inbound connection the transport already owns; after a
/// successful `Transport::open`, for outbound and server sockets. It
/// clears the moment the transport side is released, whether or not the
/// slot itself is freed yet (the half-closed window).
pub struct Slot {
    pub id: SocketHandle,
    pub state: State,
    pub origin: Origin,
    pub conn_open: bool,
    pub local_port: Option<u16>,
    pub tx: Option<ByteBuffer>,
    pub rx: Option<ByteBuffer>,
    pub error: Option<SocketError>,
}

impl Slot {
    pub(crate) fn new(id: SocketHandle, origin: Origin, state: State) -> Self {
        Self {
            id,
            state,
            origin,
            conn_open: false,
            local_port: None,
            tx: None,
            rx: None,
            error: None,
        }
    }

    pub fn set_state(&mut self, state: State) {
        crate::log::debug!("[{}] state {:?} -> {:?}", self.id.0, self.state, state);
        self.state = state;
    }
}
