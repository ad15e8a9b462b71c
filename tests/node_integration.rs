//! End-to-end tests driving a running `Node` over a real loopback UDP
//! socket, covering the public surface rather than individual module
//! internals.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use artnet_node::codec::{self, ArtPoll, Packet};
use artnet_node::config::Config;
use artnet_node::net::host::HostValue;
use artnet_node::Node;

fn loopback_config() -> Config {
    let mut config = Config::default();
    config.node.ip = Some(HostValue::from([127, 0, 0, 1]));
    config.node.port = Some(0);
    config.node.short_name = "test-node".into();
    config
}

async fn recv_with_timeout(socket: &tokio::net::UdpSocket, buf: &mut [u8]) -> (usize, SocketAddr) {
    tokio::time::timeout(Duration::from_secs(2), socket.recv_from(buf))
        .await
        .expect("timed out waiting for a reply")
        .expect("recv_from failed")
}

#[tokio::test]
async fn artpoll_receives_artpollreply_with_configured_identity() {
    let node = Node::start(loopback_config()).await.unwrap();
    let node_addr = SocketAddr::from((node.bind_resolution().ip, node.bind_resolution().port));

    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.connect(node_addr).await.unwrap();

    let poll_bytes = codec::encode(&Packet::Poll(ArtPoll::default()));
    client.send(&poll_bytes).await.unwrap();

    let mut buf = [0u8; 256];
    let (len, _from) = recv_with_timeout(&client, &mut buf).await;
    let reply = codec::decode(&buf[..len]).unwrap();

    match reply {
        Packet::PollReply(reply) => assert_eq!(reply.short_name, "test-node"),
        other => panic!("expected an ArtPollReply, got {other:?}"),
    }

    node.shutdown().await;
}

#[tokio::test]
async fn dmx_frame_callback_fires_on_artdmx() {
    let received = Arc::new(AtomicBool::new(false));
    let received_clone = received.clone();

    let mut config = loopback_config();
    config.callbacks.dmx_frame = Some(Arc::new(move |frame| {
        assert_eq!(frame.port_address, 0x0001);
        received_clone.store(true, Ordering::SeqCst);
    }));

    let node = Node::start(config).await.unwrap();
    let node_addr = SocketAddr::from((node.bind_resolution().ip, node.bind_resolution().port));

    let client = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
    client.connect(node_addr).await.unwrap();

    let dmx_bytes = codec::encode(&Packet::Dmx(codec::ArtDmx {
        sequence: 1,
        physical: 0,
        port_address: 0x0001,
        length: 3,
        data: vec![1, 2, 3],
    }));
    client.send(&dmx_bytes).await.unwrap();

    for _ in 0..50 {
        if received.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(received.load(Ordering::SeqCst), "dmx-frame callback never fired");

    node.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_safe_without_any_traffic() {
    let node = Node::start(loopback_config()).await.unwrap();
    node.shutdown().await;
}
