use embedded_nal::Ipv4Addr;
use heapless::String;

use crate::buffer::ByteBuffer;
use crate::config::DEFAULT_RX_LIMIT;
use crate::error::{Error, Result};
use crate::handle::SocketHandle;
use crate::slot::{Origin, SocketError, State};
use crate::table::SocketTable;
use crate::transport::{Event, Transport};

/// Pull the transport's own error code out of an `Error`, for threading
/// into `SocketError.code`. Errors this crate raises itself (pool full,
/// buffer exhaustion, ...) carry no transport code, so `0` stands in.
fn transport_error_code(e: &Error) -> i32 {
    match e {
        Error::Transport(code) => *code,
        _ => 0,
    }
}

/// Longest hostname `gethostbyname` will hold onto for the next
/// `create_socket(ConnectTarget::Resolve, ..)`. 253 is the DNS limit.
pub const MAX_HOSTNAME_LEN: usize = 253;

/// Where a newly created socket should connect, or whether it should
/// listen instead.
///
/// Replaces a sentinel-encoded `ip` parameter (`0` for listen, `-1` for
/// "use the saved hostname") with a plain enum covering the same three
/// behaviors: listen, connect to a resolved hostname, or connect to a
/// literal address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConnectTarget {
    /// Listen on the given port.
    Listen,
    /// Connect to the address resolved from the hostname most recently
    /// passed to `gethostbyname`.
    Resolve,
    /// Connect directly to this address.
    Direct(Ipv4Addr),
}

/// The socket multiplexer.
///
/// Owns a fixed-capacity [`SocketTable`] and the [`Transport`] it drives.
/// `N` is the pool capacity; see [`crate::config::DEFAULT_POOL_CAPACITY`]
/// for the original's default of 10.
pub struct Multiplexer<T: Transport, const N: usize> {
    table: SocketTable<N>,
    transport: T,
    pending_hostname: Option<String<MAX_HOSTNAME_LEN>>,
    rx_limit: usize,
}

impl<T: Transport, const N: usize> Multiplexer<T, N> {
    pub fn new(transport: T) -> Self {
        Self {
            table: SocketTable::new(),
            transport,
            pending_hostname: None,
            rx_limit: DEFAULT_RX_LIMIT,
        }
    }

    /// Override the receive-buffer growth ceiling (default
    /// [`crate::config::DEFAULT_RX_LIMIT`]).
    pub fn with_rx_limit(mut self, rx_limit: usize) -> Self {
        self.rx_limit = rx_limit;
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The current state of the socket named by `id`, or `None` if it
    /// names no allocated slot.
    ///
    /// Not part of the original upper API (which has no status query at
    /// all) but a near-universal convenience in this crate family — see
    /// e.g. smoltcp's `TcpSocket::state`.
    pub fn state(&mut self, id: SocketHandle) -> Option<State> {
        self.table.find(id).map(|slot| slot.state)
    }

    // ---- upper API -----------------------------------------------------

    /// No-op; present for interface symmetry with the original.
    pub fn idle(&self) {}

    /// Always true: there is no global error state at this layer, only
    /// per-socket error state surfaced through `send`/`recv`.
    pub fn check_error(&self) -> bool {
        true
    }

    /// Record `hostname` for the next `create_socket(ConnectTarget::Resolve, ..)`.
    ///
    /// This call and the next `create_socket` form a two-step protocol,
    /// not two independent operations: only one hostname can be pending
    /// resolution at a time.
    pub fn gethostbyname(&mut self, hostname: &str) -> Result<()> {
        let mut s = String::new();
        s.push_str(hostname).map_err(|_| Error::Exhausted)?;
        self.pending_hostname = Some(s);
        Ok(())
    }

    /// Allocate a new socket and kick off listen/connect/resolve as
    /// selected by `target`.
    ///
    /// On resource exhaustion (pool full, or the transport connection
    /// object itself couldn't be allocated) no slot is left behind and an
    /// `Err` is returned. A transport-level listen/connect failure, by
    /// contrast, still returns `Ok` with the new handle — the slot is left
    /// in `ERROR` for the caller to discover on the next `send`/`recv` and
    /// retire with `close_socket`, exactly as with any other transport
    /// failure.
    pub fn create_socket(&mut self, target: ConnectTarget, port: u16) -> Result<SocketHandle> {
        match target {
            ConnectTarget::Listen => self.create_server(port),
            ConnectTarget::Resolve => self.create_resolving(port),
            ConnectTarget::Direct(ip) => self.create_outbound(ip, port),
        }
    }

    fn create_server(&mut self, port: u16) -> Result<SocketHandle> {
        let slot = self
            .table
            .allocate(Origin::Server, State::Idle)
            .ok_or(Error::SocketSetFull)?;
        let id = slot.id;
        slot.local_port = Some(port);

        if let Err(e) = self.transport.open(id) {
            self.discard_unopened(id);
            return Err(e);
        }
        self.mark_open(id);

        if let Err(e) = self.transport.listen(id, port) {
            self.enter_error(id, "listen error", transport_error_code(&e));
        }
        Ok(id)
    }

    fn create_outbound(&mut self, ip: Ipv4Addr, port: u16) -> Result<SocketHandle> {
        let slot = self
            .table
            .allocate(Origin::Outbound, State::Connecting)
            .ok_or(Error::SocketSetFull)?;
        let id = slot.id;

        if let Err(e) = self.transport.open(id) {
            self.discard_unopened(id);
            return Err(e);
        }
        self.mark_open(id);

        if let Err(e) = self.transport.connect(id, ip, port) {
            self.enter_error(id, "connect error", transport_error_code(&e));
        }
        Ok(id)
    }

    fn create_resolving(&mut self, port: u16) -> Result<SocketHandle> {
        let hostname = self.pending_hostname.take().ok_or(Error::NoSavedHostname)?;

        let slot = self
            .table
            .allocate(Origin::Outbound, State::HostResolving)
            .ok_or(Error::SocketSetFull)?;
        let id = slot.id;
        // The resolved port is needed once DNS completes; stash it in
        // `local_port`, which is otherwise unused for outbound sockets.
        slot.local_port = Some(port);

        if let Err(e) = self.transport.open(id) {
            self.discard_unopened(id);
            return Err(e);
        }
        self.mark_open(id);

        if let Err(e) = self.transport.gethostbyname(id, &hostname) {
            self.enter_error(id, "hostname resolution error", transport_error_code(&e));
        }
        Ok(id)
    }

    /// Return the id of an `UNACCEPTED` child of `server`, moving it to
    /// `IDLE`, or `None` if there isn't one.
    pub fn accept(&mut self, server: SocketHandle) -> Option<SocketHandle> {
        let port = self.table.find(server)?.local_port?;
        let child = self.table.find_unaccepted_on_port(port)?;
        let id = child.id;
        child.set_state(State::Idle);
        Some(id)
    }

    /// Returns `len` sent, `0` on backpressure (no send issued), or an
    /// error if the socket is closed/errored or unknown.
    pub fn send(&mut self, id: SocketHandle, data: &[u8]) -> Result<usize> {
        let slot = self.table.find(id).ok_or(Error::InvalidSocket)?;
        match slot.state {
            State::Error | State::Closed => Err(Error::Illegal),
            State::Idle => {
                let mut tx = ByteBuffer::new();
                if tx.append(data).is_err() {
                    return Err(Error::Exhausted);
                }
                if let Err(e) = self.transport.send(id, data) {
                    // re-borrow: the transport call above doesn't touch
                    // `slot`, so this just finds it again to finish the
                    // teardown started by the failed send.
                    self.enter_error(id, "send error", transport_error_code(&e));
                    return Err(e);
                }
                let slot = self.table.find(id).expect("slot present");
                slot.tx = Some(tx);
                slot.set_state(State::Transmitting);
                Ok(data.len())
            }
            _ => Ok(0),
        }
    }

    /// Copy as much buffered data as fits into `out`. Returns `0` if none
    /// is available yet, or an error if the socket is closed/errored with
    /// an empty receive buffer, or unknown.
    pub fn recv(&mut self, id: SocketHandle, out: &mut [u8]) -> Result<usize> {
        let slot = self.table.find(id).ok_or(Error::InvalidSocket)?;
        match &mut slot.rx {
            None => match slot.state {
                State::Closed | State::Error => Err(Error::Illegal),
                _ => Ok(0),
            },
            Some(buf) => {
                let n = buf.drain_into(out);
                if buf.is_empty() {
                    slot.rx = None;
                }
                Ok(n)
            }
        }
    }

    /// Idempotent: closing an already-`UNUSED` or unknown handle is a
    /// silent no-op.
    pub fn close_socket(&mut self, id: SocketHandle) {
        let Some(slot) = self.table.find(id) else {
            return;
        };
        match slot.state {
            State::Closed | State::Error => {
                slot.rx = None;
                self.table.release(id);
            }
            State::Disconnecting => {
                debug_assert!(false, "close_socket called while already disconnecting");
            }
            _ => {
                if self.transport.disconnect(id).is_err() {
                    // The original logs and marks the socket in error on a
                    // failed disconnect request but does not retry it; the
                    // caller is still expected to eventually see the
                    // transport's own disconnect callback.
                    crate::log::warn!("[{}] disconnect request failed", id.0);
                }
                let slot = self.table.find(id).expect("slot present");
                slot.set_state(State::Disconnecting);
            }
        }
    }

    // ---- transport callbacks -------------------------------------------

    /// Dispatch a transport event. Every variant except `InboundConnect`
    /// begins by re-resolving its handle; an unresolvable handle is a
    /// stray callback and a silent no-op.
    pub fn handle_event(&mut self, event: Event<'_>) {
        match event {
            Event::InboundConnect { local_port } => self.on_inbound_connect(local_port),
            Event::OutboundConnect { handle } => self.on_outbound_connect(handle),
            Event::Disconnect { handle } => self.on_disconnect(handle),
            Event::Sent { handle } => self.on_sent(handle),
            Event::Recv { handle, data } => self.on_recv(handle, data),
            Event::Reset { handle, code } => self.on_reset(handle, code),
            Event::DnsResolved { handle, ip } => self.on_dns_resolved(handle, ip),
        }
    }

    fn on_inbound_connect(&mut self, local_port: u16) {
        if self.table.find_server_on_port(local_port).is_none() {
            // No listener on this port (any more); refuse it the same way
            // as a pool-exhaustion refusal.
            self.transport.reject_inbound(local_port);
            return;
        }
        match self.table.allocate(Origin::Inbound, State::Unaccepted) {
            Some(slot) => {
                // The transport already owns an open connection object for
                // this accept; there is no `open()` step to wait on.
                slot.conn_open = true;
                slot.local_port = Some(local_port);
                crate::log::debug!("[{}] inbound connect on port {}", slot.id.0, local_port);
            }
            None => {
                crate::log::warn!("pool full, refusing inbound connect on port {}", local_port);
                self.transport.reject_inbound(local_port);
            }
        }
    }

    fn on_outbound_connect(&mut self, id: SocketHandle) {
        let Some(slot) = self.table.find(id) else {
            return;
        };
        debug_assert!(matches!(slot.state, State::Connecting));
        slot.set_state(State::Idle);
    }

    fn on_sent(&mut self, id: SocketHandle) {
        let Some(slot) = self.table.find(id) else {
            return;
        };
        slot.tx = None;
        match slot.state {
            State::Transmitting => slot.set_state(State::Idle),
            State::Disconnecting => {}
            other => debug_assert!(false, "sent callback in unexpected state {:?}", other),
        }
    }

    fn on_recv(&mut self, id: SocketHandle, data: &[u8]) {
        let over_limit = match self.table.find(id) {
            Some(slot) => {
                let current = slot.rx.as_ref().map(ByteBuffer::len).unwrap_or(0);
                current.saturating_add(data.len()) > self.rx_limit
            }
            None => return,
        };
        let appended = if over_limit {
            false
        } else {
            let slot = self.table.find(id).expect("slot present");
            let buf = slot.rx.get_or_insert_with(ByteBuffer::new);
            buf.append(data).is_ok()
        };
        if !appended {
            crate::log::warn!("[{}] receive buffer allocation failed, dropping bytes", id.0);
            self.enter_error(id, "out of memory", 0);
        }
    }

    fn on_disconnect(&mut self, id: SocketHandle) {
        let Some(slot) = self.table.find(id) else {
            return;
        };
        if slot.conn_open && !matches!(slot.origin, Origin::Inbound) {
            self.transport.free(id);
        }
        let slot = self.table.find(id).expect("slot present");
        slot.conn_open = false;
        slot.tx = None;

        if matches!(slot.state, State::Disconnecting) {
            slot.rx = None;
            self.table.release(id);
        } else {
            slot.set_state(State::Closed);
        }
    }

    fn on_reset(&mut self, id: SocketHandle, code: i32) {
        let was_disconnecting = match self.table.find(id) {
            Some(slot) => matches!(slot.state, State::Disconnecting),
            None => return,
        };
        self.on_disconnect(id);
        if !was_disconnecting {
            if let Some(slot) = self.table.find(id) {
                slot.error = Some(SocketError {
                    message: "connection reset",
                    code,
                });
                slot.set_state(State::Error);
            }
        }
    }

    fn on_dns_resolved(&mut self, id: SocketHandle, ip: Option<Ipv4Addr>) {
        let Some(slot) = self.table.find(id) else {
            return;
        };
        debug_assert!(matches!(slot.state, State::HostResolving));
        let port = slot.local_port.unwrap_or(0);

        match ip {
            Some(ip) => {
                slot.set_state(State::Connecting);
                if let Err(e) = self.transport.connect(id, ip, port) {
                    self.enter_error(id, "connect error", transport_error_code(&e));
                }
            }
            None => self.enter_error(id, "hostname not found", 0),
        }
    }

    // ---- shared helpers --------------------------------------------------

    /// A transport connection object was never successfully opened; the
    /// slot can be discarded immediately instead of going through the
    /// half-closed teardown (there is nothing to tear down).
    fn discard_unopened(&mut self, id: SocketHandle) {
        self.table.release(id);
    }

    /// Mark a slot's transport connection as successfully opened.
    fn mark_open(&mut self, id: SocketHandle) {
        if let Some(slot) = self.table.find(id) {
            slot.conn_open = true;
        }
    }

    /// Move a slot straight to `ERROR`, releasing its transport connection
    /// first so the `ERROR ⇒ conn absent` invariant always holds.
    fn enter_error(&mut self, id: SocketHandle, message: &'static str, code: i32) {
        let Some(slot) = self.table.find(id) else {
            return;
        };
        if slot.conn_open && !matches!(slot.origin, Origin::Inbound) {
            self.transport.free(id);
        }
        let slot = self.table.find(id).expect("slot present");
        slot.conn_open = false;
        slot.tx = None;
        slot.error = Some(SocketError { message, code });
        slot.set_state(State::Error);
    }
}
