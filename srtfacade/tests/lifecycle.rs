use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use srtfacade::{Callbacks, Configuration, Facade, NetworkConnection};

fn init() {
    let _ = srtfacade::startup();
}

fn free_port() -> u16 {
    static NEXT: AtomicU32 = AtomicU32::new(9100);
    NEXT.fetch_add(1, Ordering::Relaxed) as u16
}

#[test]
fn start_stop_basic() {
    init();

    let port = free_port();
    let psk = "Th1$_is_4n_0pt10N4L_P$k";

    let (disconnect_tx, disconnect_rx) = mpsc::channel::<u32>();

    let server = Facade::new();
    let mut server_callbacks = Callbacks::default();
    server_callbacks.client_connected = Some(Box::new(|_peer, _socket, server_ctx, _info| {
        assert_eq!(server_ctx.and_then(|c| c.downcast_ref::<i32>().copied()), Some(42));
        Some(NetworkConnection::new(1111i32))
    }));
    let tx = disconnect_tx.clone();
    server_callbacks.client_disconnected = Some(Box::new(move |ctx, socket| {
        assert_eq!(ctx.downcast_ref::<i32>().copied(), Some(1111));
        let _ = tx.send(socket);
    }));

    let server_config = Configuration::builder()
        .local_host("127.0.0.1")
        .local_port(port)
        .passphrase(psk)
        .build();

    assert!(server.start_server(server_config, server_callbacks, Some(NetworkConnection::new(42i32))));

    let client = Facade::new();
    let client_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .passphrase(psk)
        .build();

    assert!(client.start_client(client_config, None, Callbacks::default(), NetworkConnection::new(())));

    std::thread::sleep(Duration::from_millis(300));
    assert!(client.is_connected_to_server());
    assert_eq!(server.active_client_sockets().len(), 1);

    let (_, ctx) = server.active_clients().into_iter().next().unwrap();
    assert_eq!(ctx.downcast_ref::<i32>().copied(), Some(1111));

    client.stop();
    let got = disconnect_rx.recv_timeout(Duration::from_secs(2));
    assert!(got.is_ok());

    server.stop();
}

#[test]
fn psk_mismatch_then_aligned() {
    init();

    let port = free_port();

    let server = Facade::new();
    let mut server_callbacks = Callbacks::default();
    server_callbacks.client_connected = Some(Box::new(|_p, _s, _c, _i| Some(NetworkConnection::new(()))));

    let server_config = Configuration::builder()
        .local_host("127.0.0.1")
        .local_port(port)
        .passphrase("serverkey12345")
        .build();
    assert!(server.start_server(server_config, server_callbacks, None));

    let mismatched = Facade::new();
    let mismatched_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .passphrase("wrongkey6789")
        .fail_on_connect_error(true)
        .build();
    assert!(!mismatched.start_client(mismatched_config, None, Callbacks::default(), NetworkConnection::new(())));

    let aligned = Facade::new();
    let aligned_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .passphrase("serverkey12345")
        .fail_on_connect_error(true)
        .build();
    assert!(aligned.start_client(aligned_config, None, Callbacks::default(), NetworkConnection::new(())));

    std::thread::sleep(Duration::from_millis(300));
    assert!(aligned.is_connected_to_server());

    aligned.stop();
    server.stop();
}

#[test]
fn echo_roundtrip() {
    init();

    let port = free_port();
    let payload = vec![0x01u8; 1000];

    let received = Arc::new(Mutex::new(None));
    let received_clone = received.clone();

    let server = Facade::new();
    let mut server_callbacks = Callbacks::default();
    server_callbacks.client_connected = Some(Box::new(|_p, _s, _c, _i| Some(NetworkConnection::new(()))));
    server_callbacks.received_data = Some(Box::new(move |payload, _ctrl, _ctx, _socket| {
        *received_clone.lock() = Some(payload.to_vec());
    }));

    let server_config = Configuration::builder()
        .local_host("127.0.0.1")
        .local_port(port)
        .build();
    assert!(server.start_server(server_config, server_callbacks, None));

    let client_received = Arc::new(Mutex::new(None));
    let client_received_clone = client_received.clone();

    let client = Facade::new();
    let mut client_callbacks = Callbacks::default();
    client_callbacks.received_data = Some(Box::new(move |payload, _ctrl, _ctx, _socket| {
        *client_received_clone.lock() = Some(payload.to_vec());
    }));

    let client_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .build();
    assert!(client.start_client(client_config, None, client_callbacks, NetworkConnection::new(())));

    std::thread::sleep(Duration::from_millis(300));
    assert!(client.send_data(&payload, None));

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(received.lock().clone(), Some(payload.clone()));

    // Echo it back from the registry entry the server saw.
    if let Some((socket, _)) = server.active_clients().into_iter().next() {
        assert!(server.send_data(&payload, Some(socket)));
    }

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(client_received.lock().clone(), Some(payload));

    client.stop();
    assert!(!server.send_data(&[1, 2, 3], server.active_client_sockets().first().copied()));

    server.stop();
}

#[test]
fn oversize_reject() {
    init();

    let port = free_port();

    let server = Facade::new();
    let mut server_callbacks = Callbacks::default();
    server_callbacks.client_connected = Some(Box::new(|_p, _s, _c, _i| Some(NetworkConnection::new(()))));
    let server_config = Configuration::builder()
        .local_host("127.0.0.1")
        .local_port(port)
        .build();
    assert!(server.start_server(server_config, server_callbacks, None));

    let mtu = Configuration::default().mtu;
    let client = Facade::new();
    let client_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .mtu(mtu)
        .build();
    assert!(client.start_client(client_config, None, Callbacks::default(), NetworkConnection::new(())));

    std::thread::sleep(Duration::from_millis(300));

    let max = srtfacade::max_payload_size(mtu);
    let oversized = vec![0u8; max + 1];
    assert!(!client.send_data(&oversized, None));

    client.stop();
    server.stop();
}

#[test]
fn single_client_mode_rejects_second() {
    init();

    let port = free_port();

    let server = Facade::new();
    let mut server_callbacks = Callbacks::default();
    server_callbacks.client_connected = Some(Box::new(|_p, _s, _c, _i| Some(NetworkConnection::new(()))));
    let server_config = Configuration::builder()
        .local_host("127.0.0.1")
        .local_port(port)
        .single_client(true)
        .build();
    assert!(server.start_server(server_config, server_callbacks, None));

    let first = Facade::new();
    let first_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .build();
    assert!(first.start_client(first_config, None, Callbacks::default(), NetworkConnection::new(())));

    std::thread::sleep(Duration::from_millis(300));
    assert!(first.is_connected_to_server());

    // The listener is closed once the first client is accepted, so a second
    // concurrent client (fail_on_connect_error defaults to true) is rejected
    // synchronously rather than left retrying.
    let second = Facade::new();
    let second_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .build();
    assert!(!second.start_client(second_config, None, Callbacks::default(), NetworkConnection::new(())));
    assert!(!second.is_connected_to_server());

    first.stop();
    std::thread::sleep(Duration::from_millis(300));

    // Once the first client disconnects, the worker rebinds and a new
    // client can take its place.
    let third = Facade::new();
    let third_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .build();
    assert!(third.start_client(third_config, None, Callbacks::default(), NetworkConnection::new(())));

    std::thread::sleep(Duration::from_millis(300));
    assert!(third.is_connected_to_server());

    third.stop();
    server.stop();
}

#[test]
fn auto_port_assignment() {
    init();

    let server = Facade::new();
    let mut server_callbacks = Callbacks::default();
    server_callbacks.client_connected = Some(Box::new(|_p, _s, _c, _i| Some(NetworkConnection::new(()))));
    let server_config = Configuration::builder()
        .local_host("0.0.0.0")
        .local_port(0)
        .build();
    assert!(server.start_server(server_config, server_callbacks, None));

    let port = server.locally_bound_port();
    assert!(port > 1024);

    let client = Facade::new();
    let client_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .local_port(0)
        .build();
    assert!(client.start_client(client_config, Some(("0.0.0.0".to_string(), 0)), Callbacks::default(), NetworkConnection::new(())));

    std::thread::sleep(Duration::from_millis(300));
    assert!(client.is_connected_to_server());

    client.stop();
    server.stop();
}

#[test]
fn fail_on_connect_flag() {
    init();

    let port = free_port();

    let strict = Facade::new();
    let strict_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .fail_on_connect_error(true)
        .build();
    assert!(!strict.start_client(strict_config, None, Callbacks::default(), NetworkConnection::new(())));

    let lenient = Facade::new();
    let lenient_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .fail_on_connect_error(false)
        .build();
    assert!(lenient.start_client(lenient_config, None, Callbacks::default(), NetworkConnection::new(())));
    assert!(!lenient.is_connected_to_server());

    lenient.stop();
}

#[test]
fn stream_id_is_visible_to_server() {
    init();

    let port = free_port();
    let seen: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
    let seen_clone = seen.clone();

    let server = Facade::new();
    let mut server_callbacks = Callbacks::default();
    server_callbacks.client_connected = Some(Box::new(move |_peer, _socket, _ctx, info| {
        *seen_clone.lock() = Some(info.stream_id.clone());
        Some(NetworkConnection::new(()))
    }));
    let server_config = Configuration::builder()
        .local_host("127.0.0.1")
        .local_port(port)
        .build();
    assert!(server.start_server(server_config, server_callbacks, None));

    let client = Facade::new();
    let client_config = Configuration::builder()
        .remote_host("127.0.0.1")
        .remote_port(port)
        .stream_id("An example Stream ID")
        .build();
    assert!(client.start_client(client_config, None, Callbacks::default(), NetworkConnection::new(())));

    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(seen.lock().clone(), Some("An example Stream ID".to_string()));

    client.stop();
    server.stop();
}
