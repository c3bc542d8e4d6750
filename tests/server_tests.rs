use stationd::config::StationConfig;
use stationd::server::handle_datagram;
use stationd::*;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{oneshot, Mutex};
use tokio::time::timeout;

fn simulated_station() -> Station {
    let mut config = StationConfig::simulated();
    config.interlock.settle_ms = 1;
    let mut allocator = PinAllocator::new(&config);
    Station::open(&config, &mut allocator, Arc::new(SystemClock)).expect("station opens")
}

async fn request(socket: &UdpSocket, server: SocketAddr, command: &str) -> String {
    socket.send_to(command.as_bytes(), server).await.expect("send");
    let mut buf = [0u8; 1024];
    let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
        .await
        .expect("reply in time")
        .expect("recv");
    String::from_utf8_lossy(&buf[..len]).into_owned()
}

#[tokio::test]
async fn test_udp_round_trip() {
    let server = StationServer::bind("127.0.0.1:0".parse().expect("addr"), simulated_station())
        .await
        .expect("binds");
    let addr = server.local_addr().expect("local addr");
    let station = server.station();

    let (stop, stopped) = oneshot::channel::<()>();
    let serving = tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));

    let client = UdpSocket::bind("127.0.0.1:0").await.expect("client");
    assert_eq!(request(&client, addr, "rotator power on").await, "SUCCESS: rotator power on\n");
    assert_eq!(request(&client, addr, "rotator status").await, "rotator power ON\n");
    assert_eq!(request(&client, addr, "vhf rf-ptt sideways").await, "FAIL: Invalid Command\n");
    assert!(request(&client, addr, "uhf pa-power on").await.starts_with("Re-enter"));

    assert_eq!(station.lock().await.arbiter().count(), 0);

    stop.send(()).expect("server still running");
    timeout(Duration::from_secs(5), serving)
        .await
        .expect("server stops")
        .expect("join")
        .expect("clean shutdown");
}

#[tokio::test]
async fn test_concurrent_keying_admits_one_transmitter() {
    let server = StationServer::bind("127.0.0.1:0".parse().expect("addr"), simulated_station())
        .await
        .expect("binds");
    let addr = server.local_addr().expect("local addr");
    let station = server.station();
    tokio::spawn(server.run());

    let client = UdpSocket::bind("127.0.0.1:0").await.expect("client");
    for device in ["vhf", "uhf", "l-band"] {
        let command = format!("{device} pa-power on");
        request(&client, addr, &command).await;
        assert_eq!(request(&client, addr, &command).await, format!("SUCCESS: {command}\n"));
    }

    // Fire every key request before reading any reply
    let mut clients = Vec::new();
    for device in ["vhf", "uhf", "l-band"] {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("client");
        let command = format!("{device} rf-ptt on");
        socket.send_to(command.as_bytes(), addr).await.expect("send");
        clients.push(socket);
    }

    let mut successes = 0;
    for socket in &clients {
        let mut buf = [0u8; 1024];
        let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf))
            .await
            .expect("reply in time")
            .expect("recv");
        let reply = String::from_utf8_lossy(&buf[..len]).into_owned();
        if reply.starts_with("SUCCESS") {
            successes += 1;
        } else {
            assert!(reply.ends_with("Max PTT\n"), "unexpected reply {reply:?}");
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(station.lock().await.arbiter().count(), 1);
}

#[tokio::test]
async fn test_handle_datagram_runs_under_lock() {
    let station = Arc::new(Mutex::new(simulated_station()));

    let reply = handle_datagram(Arc::clone(&station), "satnogs-host power on".to_string()).await;
    assert_eq!(reply, Reply::Success("satnogs-host power on".to_string()));

    // The lock is free again afterwards
    assert!(station.try_lock().is_ok());
}

#[tokio::test]
async fn test_shutdown_waits_for_in_flight_reply() {
    let server = StationServer::bind("127.0.0.1:0".parse().expect("addr"), simulated_station())
        .await
        .expect("binds");
    let addr = server.local_addr().expect("local addr");
    let station = server.station();

    let (stop, stopped) = oneshot::channel::<()>();
    let mut serving = tokio::spawn(server.run_until(async {
        let _ = stopped.await;
    }));

    // Hold the station so the command is stuck in its handler
    let held = station.lock().await;
    let client = UdpSocket::bind("127.0.0.1:0").await.expect("client");
    client
        .send_to(b"radio-host power on", addr)
        .await
        .expect("send");
    tokio::time::sleep(Duration::from_millis(200)).await;

    stop.send(()).expect("server still running");
    assert!(
        timeout(Duration::from_millis(200), &mut serving).await.is_err(),
        "server returned before its reply was sent"
    );

    drop(held);
    let mut buf = [0u8; 1024];
    let (len, _) = timeout(Duration::from_secs(5), client.recv_from(&mut buf))
        .await
        .expect("reply in time")
        .expect("recv");
    assert_eq!(&buf[..len], b"SUCCESS: radio-host power on\n");

    timeout(Duration::from_secs(5), serving)
        .await
        .expect("server stops")
        .expect("join")
        .expect("clean shutdown");
}
