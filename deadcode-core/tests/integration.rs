//! Integration tests for the emitter and collector
//!
//! These tests send real UDP packets over loopback from an emitter to a
//! collector listener and check what ends up in the class inventory.

use deadcode_core::collector::{handle_datagram, CollectorListener, SharedInventory};
use deadcode_core::config::{Config, EmitterConfig};
use deadcode_core::emitter::{ClassFilter, Emitter, EmitterHandle, UdpTransport};
use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::TempDir;

/// Bind a loopback receiver and return it with its port
fn receiver() -> (UdpSocket, u16) {
    deadcode_core::logging::init_test();
    let socket = UdpSocket::bind("127.0.0.1:0").expect("failed to bind receiver");
    socket
        .set_read_timeout(Some(Duration::from_secs(5)))
        .expect("failed to set timeout");
    let port = socket.local_addr().unwrap().port();
    (socket, port)
}

fn recv_packets(socket: &UdpSocket, count: usize) -> Vec<String> {
    let mut buf = [0u8; 65_535];
    (0..count)
        .map(|_| {
            let n = socket.recv(&mut buf).expect("expected a packet");
            String::from_utf8_lossy(&buf[..n]).into_owned()
        })
        .collect()
}

// ============================================
// Emitter over UDP
// ============================================

#[test]
fn test_shutdown_sends_one_packet_with_all_records() {
    let (socket, port) = receiver();
    let config = EmitterConfig {
        port,
        ..Default::default()
    };
    let hooks = EmitterHandle::new(Emitter::from_config(&config));

    hooks.on_class_loaded("Foo\\Bar");
    hooks.on_class_loaded("Foo\\Bar");
    hooks.on_class_loaded("Foo\\Bar");
    assert_eq!(hooks.pending_count(), 3);

    hooks.on_shutdown();

    let packets = recv_packets(&socket, 1);
    assert_eq!(packets[0], "autoloaded,class=Foo/Bar:1|c\n".repeat(3));
    assert_eq!(hooks.stats().packets_sent, 1);
}

#[test]
fn test_auto_flush_splits_into_bounded_packets() {
    let (socket, port) = receiver();
    let mut emitter = Emitter::new(
        ClassFilter::new(vec!["App\\".to_string()]),
        100,
        UdpTransport::new("127.0.0.1", port),
    );

    // 36 bytes per record: the third accepted record reaches 108 >= 100
    emitter.record_event("App\\Service\\Mailer1");
    emitter.record_event("Vendor\\Lib\\Thing");
    emitter.record_event("App\\Service\\Mailer2");
    emitter.record_event("App\\Service\\Mailer3");
    assert_eq!(emitter.pending_count(), 0);

    let packets = recv_packets(&socket, 2);
    assert_eq!(
        packets[0],
        "autoloaded,class=App/Service/Mailer1:1|c\nautoloaded,class=App/Service/Mailer2:1|c\n"
    );
    assert_eq!(packets[1], "autoloaded,class=App/Service/Mailer3:1|c\n");
    assert_eq!(emitter.stats().records_filtered, 1);
}

#[test]
fn test_unreachable_collector_never_fails_the_host() {
    // Nothing listens on this port; UDP send still succeeds or is swallowed
    let (socket, port) = receiver();
    drop(socket);

    let mut emitter = Emitter::new(
        ClassFilter::default(),
        10,
        UdpTransport::new("127.0.0.1", port),
    );
    emitter.record_event("App\\Foo");
    emitter.record_event("App\\Bar");
    emitter.flush();

    assert_eq!(emitter.pending_count(), 0);
    assert_eq!(emitter.buffered_len(), 0);
}

// ============================================
// Emitter -> collector
// ============================================

#[test]
fn test_emitter_to_listener_marks_loaded_classes_active() {
    deadcode_core::logging::init_test();
    let dir = TempDir::new().unwrap();
    let storage = dir.path().join("data.json");

    let inventory = SharedInventory::default();
    inventory
        .write()
        .reset(["App\\Used", "App\\Unused", "App\\AlsoUsed"]);

    let listener = CollectorListener::bind("127.0.0.1:0").expect("failed to bind listener");
    let port = listener.local_addr().unwrap().port();
    let shutdown = Arc::new(AtomicBool::new(false));

    let server = {
        let inventory = inventory.clone();
        let shutdown = Arc::clone(&shutdown);
        thread::spawn(move || listener.serve(&inventory, &shutdown))
    };

    let hooks = EmitterHandle::new(Emitter::new(
        ClassFilter::default(),
        500,
        UdpTransport::new("127.0.0.1", port),
    ));
    hooks.on_class_loaded("App\\Used");
    hooks.on_class_loaded("App\\AlsoUsed");
    hooks.on_shutdown();

    let deadline = Instant::now() + Duration::from_secs(5);
    while inventory.read().summary().active < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(20));
    }

    shutdown.store(true, Ordering::Relaxed);
    server.join().unwrap().expect("listener failed");

    inventory.save(&storage).unwrap();
    let reloaded = SharedInventory::load(&storage).unwrap();
    let reloaded = reloaded.read();
    assert_eq!(reloaded.dead(), vec!["App\\Unused"]);
    assert_eq!(reloaded.autoloaded["App\\Used"], 1);
    assert_eq!(reloaded.autoloaded["App\\AlsoUsed"], 1);
}

#[test]
fn test_collector_accepts_emitter_wire_format() {
    let inventory = SharedInventory::default();
    let payload = deadcode_core::emitter::encode_packet(&[
        deadcode_core::emitter::MetricRecord::from_class("App\\Service\\Foo"),
        deadcode_core::emitter::MetricRecord::from_class("App\\Service\\Foo"),
    ]);

    assert_eq!(handle_datagram(payload.as_bytes(), &inventory), 2);
    assert_eq!(inventory.read().autoloaded["App\\Service\\Foo"], 2);
}

// ============================================
// Configuration
// ============================================

#[test]
fn test_load_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[emitter]\nallowed_namespaces = [\"App\"]\npacket_size = 64\n",
    )
    .unwrap();

    let config = Config::load_from(&path).expect("config should load");
    assert_eq!(config.emitter.allowed_namespaces, vec!["App".to_string()]);
    assert_eq!(config.emitter.packet_size, 64);
    assert_eq!(config.emitter.port, 8125);
}

#[test]
fn test_load_invalid_config_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[emitter]\npacket_size = \"big\"\n").unwrap();

    assert!(Config::load_from(&path).is_err());
}
