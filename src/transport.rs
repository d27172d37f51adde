use embedded_nal::Ipv4Addr;

use crate::error::Result;
use crate::handle::SocketHandle;

/// The low-level, callback-driven TCP/IP stack this multiplexer adapts.
///
/// Every method here is the synchronous, fire-and-forget half of the
/// transport's API — analogous to `espconn_connect`, `espconn_accept`,
/// `espconn_send`, `espconn_disconnect` and `espconn_gethostbyname` on an
/// ESP8266-style stack. The other half, the asynchronous callbacks the
/// transport raises back, is [`Event`]; the caller that owns the event
/// loop is responsible for turning whatever the real transport's callback
/// mechanism looks like into `Event` values and feeding them to
/// [`crate::mux::Multiplexer::handle_event`].
///
/// Every method is keyed by [`SocketHandle`] rather than a connection
/// object the transport hands back: the handle itself is the
/// "back-pointer" stamped into the transport connection's user-data at
/// allocation time, so a callback can always re-resolve its target by id
/// instead of by a potentially-stale pointer. Implementations are
/// expected to maintain their own mapping from handle to whatever native
/// connection object they need.
pub trait Transport {
    /// Allocate a transport-side connection object for `handle` and enable
    /// `NODELAY` on it. Called for outbound and server sockets only —
    /// never for inbound-accepted sockets, which adopt a connection object
    /// the transport already allocated.
    fn open(&mut self, handle: SocketHandle) -> Result<()>;

    /// Begin listening on `port`, registering only the inbound-connect
    /// callback.
    fn listen(&mut self, handle: SocketHandle, port: u16) -> Result<()>;

    /// Begin connecting to `ip:port`, registering the outbound-connect,
    /// disconnect, sent, recv and reset callbacks.
    fn connect(&mut self, handle: SocketHandle, ip: Ipv4Addr, port: u16) -> Result<()>;

    /// Kick off DNS resolution of `hostname`. Resolution completes
    /// asynchronously via [`Event::DnsResolved`].
    fn gethostbyname(&mut self, handle: SocketHandle, hostname: &str) -> Result<()>;

    /// Hand `data` off to the transport for transmission. Completion is
    /// signalled asynchronously via [`Event::Sent`].
    fn send(&mut self, handle: SocketHandle, data: &[u8]) -> Result<()>;

    /// Ask the transport to tear down the connection. Completion is
    /// signalled asynchronously via [`Event::Disconnect`].
    fn disconnect(&mut self, handle: SocketHandle) -> Result<()>;

    /// Free the transport-side connection object for `handle`.
    ///
    /// Only ever called for `outbound`/`server`-origin sockets; sockets of
    /// `inbound` origin adopted a connection object the transport owns and
    /// must never have it freed from here.
    fn free(&mut self, handle: SocketHandle);

    /// Refuse a brand-new inbound connection before it is ever given a
    /// handle, because the pool is full.
    ///
    /// Mirrors the original's pool-exhaustion path in
    /// `esp8266_callback_connectCB_inbound`, which calls
    /// `espconn_disconnect` directly on the raw connection argument — there
    /// is no socket slot yet to carry a back-pointer.
    fn reject_inbound(&mut self, local_port: u16);
}

/// An asynchronous event raised by the transport.
///
/// Every variant carries the [`SocketHandle`] of the socket it targets —
/// the back-pointer. A handle that no longer names an allocated slot marks
/// a stray callback and must be a silent no-op (see
/// [`crate::mux::Multiplexer::handle_event`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Event<'a> {
    /// A new inbound connection arrived on a listening socket's port.
    ///
    /// Unlike the other variants this carries no back-pointer: the
    /// connection is brand new and has not yet been assigned a slot. It is
    /// matched to its listening parent by `local_port`.
    InboundConnect { local_port: u16 },
    /// An outbound connect attempt succeeded.
    OutboundConnect { handle: SocketHandle },
    /// The transport finished tearing the connection down, either because
    /// we asked it to or because the remote end closed first.
    Disconnect { handle: SocketHandle },
    /// A previously submitted send completed.
    Sent { handle: SocketHandle },
    /// Inbound data arrived.
    Recv { handle: SocketHandle, data: &'a [u8] },
    /// The connection was reset by the transport (named "reconnect" in the
    /// original SDK, but it is really a reset/error notification).
    Reset { handle: SocketHandle, code: i32 },
    /// DNS resolution of the saved hostname completed, successfully or not.
    DnsResolved { handle: SocketHandle, ip: Option<Ipv4Addr> },
}
