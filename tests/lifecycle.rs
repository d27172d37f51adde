//! Integration tests driving `Multiplexer` through the transport trait
//! only, the way a real event loop would.

use embedded_nal::Ipv4Addr;
use tcp_socket_mux::{ConnectTarget, Error, Event, Multiplexer, SocketHandle, State, Transport};

#[derive(Default)]
struct MockTransport {
    opened: Vec<SocketHandle>,
    listened: Vec<(SocketHandle, u16)>,
    connected: Vec<(SocketHandle, Ipv4Addr, u16)>,
    resolved: Vec<(SocketHandle, String)>,
    sent: Vec<(SocketHandle, Vec<u8>)>,
    disconnected: Vec<SocketHandle>,
    freed: Vec<SocketHandle>,
    rejected: Vec<u16>,
    fail_open: bool,
    fail_listen: bool,
    fail_connect: bool,
    fail_send: bool,
}

impl Transport for MockTransport {
    fn open(&mut self, handle: SocketHandle) -> tcp_socket_mux::Result<()> {
        if self.fail_open {
            return Err(Error::Transport(-1));
        }
        self.opened.push(handle);
        Ok(())
    }

    fn listen(&mut self, handle: SocketHandle, port: u16) -> tcp_socket_mux::Result<()> {
        if self.fail_listen {
            return Err(Error::Transport(-1));
        }
        self.listened.push((handle, port));
        Ok(())
    }

    fn connect(&mut self, handle: SocketHandle, ip: Ipv4Addr, port: u16) -> tcp_socket_mux::Result<()> {
        if self.fail_connect {
            return Err(Error::Transport(-1));
        }
        self.connected.push((handle, ip, port));
        Ok(())
    }

    fn gethostbyname(&mut self, handle: SocketHandle, hostname: &str) -> tcp_socket_mux::Result<()> {
        self.resolved.push((handle, hostname.to_string()));
        Ok(())
    }

    fn send(&mut self, handle: SocketHandle, data: &[u8]) -> tcp_socket_mux::Result<()> {
        if self.fail_send {
            return Err(Error::Transport(-1));
        }
        self.sent.push((handle, data.to_vec()));
        Ok(())
    }

    fn disconnect(&mut self, handle: SocketHandle) -> tcp_socket_mux::Result<()> {
        self.disconnected.push(handle);
        Ok(())
    }

    fn free(&mut self, handle: SocketHandle) {
        self.freed.push(handle);
    }

    fn reject_inbound(&mut self, local_port: u16) {
        self.rejected.push(local_port);
    }
}

#[test]
fn outbound_connect_send_recv_close() {
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(MockTransport::default());
    let id = mux
        .create_socket(ConnectTarget::Direct(Ipv4Addr::new(127, 0, 0, 1)), 4000)
        .unwrap();
    assert_eq!(mux.state(id), Some(State::Connecting));
    assert_eq!(
        mux.transport().connected,
        vec![(id, Ipv4Addr::new(127, 0, 0, 1), 4000)]
    );

    mux.handle_event(Event::OutboundConnect { handle: id });
    assert_eq!(mux.state(id), Some(State::Idle));

    assert_eq!(mux.send(id, b"hello").unwrap(), 5);
    assert_eq!(mux.state(id), Some(State::Transmitting));
    assert_eq!(mux.transport().sent, vec![(id, b"hello".to_vec())]);

    // a second send while one is already in flight is backpressure, not an error
    assert_eq!(mux.send(id, b"world").unwrap(), 0);

    mux.handle_event(Event::Sent { handle: id });
    assert_eq!(mux.state(id), Some(State::Idle));

    mux.handle_event(Event::Recv {
        handle: id,
        data: b"pong",
    });
    let mut buf = [0u8; 8];
    let n = mux.recv(id, &mut buf).unwrap();
    assert_eq!(&buf[..n], b"pong");
    assert_eq!(mux.recv(id, &mut buf).unwrap(), 0);

    mux.close_socket(id);
    assert_eq!(mux.state(id), Some(State::Disconnecting));
    assert_eq!(mux.transport().disconnected, vec![id]);

    mux.handle_event(Event::Disconnect { handle: id });
    assert_eq!(mux.state(id), None);
    assert_eq!(mux.transport().freed, vec![id]);
}

#[test]
fn server_accept_child_socket() {
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(MockTransport::default());
    let server = mux.create_socket(ConnectTarget::Listen, 80).unwrap();
    assert_eq!(mux.state(server), Some(State::Idle));
    assert_eq!(mux.transport().listened, vec![(server, 80)]);

    assert!(mux.accept(server).is_none());

    mux.handle_event(Event::InboundConnect { local_port: 80 });
    let child = mux.accept(server).expect("a child should be pending");
    assert_eq!(mux.state(child), Some(State::Idle));
    assert_ne!(child, server);
    assert!(mux.accept(server).is_none());

    // the child owns a transport-adopted connection and can send/recv like
    // any other socket
    mux.handle_event(Event::Recv {
        handle: child,
        data: b"hi",
    });
    let mut buf = [0u8; 2];
    assert_eq!(mux.recv(child, &mut buf).unwrap(), 2);
}

#[test]
fn inbound_connect_rejected_when_pool_full() {
    let mut mux: Multiplexer<MockTransport, 1> = Multiplexer::new(MockTransport::default());
    let server = mux.create_socket(ConnectTarget::Listen, 80).unwrap();

    // capacity 1 is already spent on the listening socket itself
    mux.handle_event(Event::InboundConnect { local_port: 80 });
    assert_eq!(mux.transport().rejected, vec![80]);
    assert!(mux.accept(server).is_none());
}

#[test]
fn inbound_connect_on_unknown_port_is_rejected() {
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(MockTransport::default());
    mux.handle_event(Event::InboundConnect { local_port: 9999 });
    assert_eq!(mux.transport().rejected, vec![9999]);
}

#[test]
fn remote_reset_marks_error_then_close_releases() {
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(MockTransport::default());
    let id = mux
        .create_socket(ConnectTarget::Direct(Ipv4Addr::new(10, 0, 0, 1)), 9000)
        .unwrap();
    mux.handle_event(Event::OutboundConnect { handle: id });

    mux.handle_event(Event::Reset { handle: id, code: 5 });
    assert_eq!(mux.state(id), Some(State::Error));
    assert_eq!(mux.transport().freed, vec![id]);

    assert_eq!(mux.send(id, b"x"), Err(Error::Illegal));
    let mut buf = [0u8; 4];
    assert_eq!(mux.recv(id, &mut buf), Err(Error::Illegal));

    mux.close_socket(id);
    assert_eq!(mux.state(id), None);
}

#[test]
fn reset_while_already_disconnecting_does_not_override_close() {
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(MockTransport::default());
    let id = mux
        .create_socket(ConnectTarget::Direct(Ipv4Addr::new(10, 0, 0, 1)), 9000)
        .unwrap();
    mux.handle_event(Event::OutboundConnect { handle: id });

    mux.close_socket(id);
    assert_eq!(mux.state(id), Some(State::Disconnecting));

    // the remote races our close with its own reset; the teardown in
    // flight wins and the slot is fully released, not left in `ERROR`
    mux.handle_event(Event::Reset { handle: id, code: 1 });
    assert_eq!(mux.state(id), None);
}

#[test]
fn resolve_hostname_then_connect() {
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(MockTransport::default());
    mux.gethostbyname("example.com").unwrap();
    let id = mux.create_socket(ConnectTarget::Resolve, 443).unwrap();
    assert_eq!(mux.state(id), Some(State::HostResolving));
    assert_eq!(
        mux.transport().resolved,
        vec![(id, "example.com".to_string())]
    );

    let ip = Ipv4Addr::new(93, 184, 216, 34);
    mux.handle_event(Event::DnsResolved {
        handle: id,
        ip: Some(ip),
    });
    assert_eq!(mux.state(id), Some(State::Connecting));
    assert_eq!(mux.transport().connected, vec![(id, ip, 443)]);
}

#[test]
fn resolve_without_saved_hostname_fails() {
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(MockTransport::default());
    assert_eq!(
        mux.create_socket(ConnectTarget::Resolve, 443).unwrap_err(),
        Error::NoSavedHostname
    );
}

#[test]
fn resolve_hostname_not_found_enters_error() {
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(MockTransport::default());
    mux.gethostbyname("nowhere.invalid").unwrap();
    let id = mux.create_socket(ConnectTarget::Resolve, 443).unwrap();

    mux.handle_event(Event::DnsResolved { handle: id, ip: None });
    assert_eq!(mux.state(id), Some(State::Error));
}

#[test]
fn recv_buffer_over_limit_enters_error() {
    let mut mux: Multiplexer<MockTransport, 4> =
        Multiplexer::new(MockTransport::default()).with_rx_limit(4);
    let id = mux
        .create_socket(ConnectTarget::Direct(Ipv4Addr::new(1, 2, 3, 4)), 1234)
        .unwrap();
    mux.handle_event(Event::OutboundConnect { handle: id });

    mux.handle_event(Event::Recv {
        handle: id,
        data: b"abcd",
    });
    assert_eq!(mux.state(id), Some(State::Idle));

    mux.handle_event(Event::Recv {
        handle: id,
        data: b"e",
    });
    assert_eq!(mux.state(id), Some(State::Error));
    assert_eq!(mux.transport().freed, vec![id]);
}

#[test]
fn failed_open_leaves_no_slot_behind() {
    let mut transport = MockTransport::default();
    transport.fail_open = true;
    let mut mux: Multiplexer<MockTransport, 1> = Multiplexer::new(transport);

    let err = mux
        .create_socket(ConnectTarget::Direct(Ipv4Addr::new(1, 1, 1, 1)), 80)
        .unwrap_err();
    assert!(matches!(err, Error::Transport(_)));

    // the failed attempt didn't consume the pool's only slot
    assert!(mux.create_socket(ConnectTarget::Listen, 81).is_ok());
}

#[test]
fn synchronous_listen_failure_lands_in_error_with_no_open_connection() {
    let mut transport = MockTransport::default();
    transport.fail_listen = true;
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(transport);

    let id = mux.create_socket(ConnectTarget::Listen, 80).unwrap();
    assert_eq!(mux.state(id), Some(State::Error));
    // the invariant that ERROR implies no open connection: `free` ran
    assert_eq!(mux.transport().freed, vec![id]);
}

#[test]
fn stray_callback_on_unknown_handle_is_a_noop() {
    let mut mux: Multiplexer<MockTransport, 4> = Multiplexer::new(MockTransport::default());
    mux.handle_event(Event::Sent {
        handle: SocketHandle(999),
    });
    mux.handle_event(Event::Disconnect {
        handle: SocketHandle(999),
    });
    assert!(mux.transport().freed.is_empty());
}

#[test]
fn pool_full_on_create_socket_returns_err() {
    let mut mux: Multiplexer<MockTransport, 1> = Multiplexer::new(MockTransport::default());
    mux.create_socket(ConnectTarget::Listen, 80).unwrap();
    let err = mux.create_socket(ConnectTarget::Listen, 81).unwrap_err();
    assert_eq!(err, Error::SocketSetFull);
}
