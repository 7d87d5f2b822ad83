//! Flood-state exchange integration tests
//!
//! Exercises the Refresh codec the way peer daemons use it: one message per
//! UDP datagram, decoded on receipt, folded into an aggregate, re-encoded
//! and redistributed.

use std::net::Ipv4Addr;

use tokio::net::UdpSocket;
use vxfld::pkt::{MsgType, Refresh};

fn ip(s: &str) -> Ipv4Addr {
    s.parse().unwrap()
}

async fn local_socket() -> UdpSocket {
    UdpSocket::bind("127.0.0.1:0").await.unwrap()
}

#[tokio::test]
async fn test_refresh_exchange_over_udp() {
    let vtep = local_socket().await;
    let svcnode = local_socket().await;

    let mut msg = Refresh::refresh(90).with_originator(0x0001);
    msg.add_vteps(100, [ip("10.0.0.1"), ip("10.0.0.2")]);

    let wire = msg.encode();
    vtep.send_to(&wire, svcnode.local_addr().unwrap())
        .await
        .unwrap();

    let mut buf = [0u8; 1500];
    let (len, _from) = svcnode.recv_from(&mut buf).await.unwrap();

    // The datagram boundary is the message boundary
    assert_eq!(len, msg.encoded_len());

    let received = Refresh::decode(&buf[..len]).unwrap();
    assert_eq!(received.msg_type, MsgType::Refresh);
    assert_eq!(received.holdtime, 90);
    assert_eq!(received.originator, 0x0001);
    assert_eq!(received.vni_vteps(), msg.vni_vteps());
}

#[tokio::test]
async fn test_service_node_aggregates_and_redistributes() {
    let vtep_a = local_socket().await;
    let vtep_b = local_socket().await;
    let svcnode = local_socket().await;
    let svcnode_addr = svcnode.local_addr().unwrap();

    // Two VTEPs register membership for an overlapping VNI set
    let mut from_a = Refresh::refresh(90);
    from_a.add_vteps(100, [ip("10.0.0.1")]);
    from_a.add_vteps(200, [ip("10.0.0.1")]);
    vtep_a.send_to(&from_a.encode(), svcnode_addr).await.unwrap();

    let mut from_b = Refresh::refresh(90);
    from_b.add_vteps(100, [ip("10.0.0.2")]);
    vtep_b.send_to(&from_b.encode(), svcnode_addr).await.unwrap();

    // The service node folds each datagram into its aggregate view
    let mut aggregate = Refresh::refresh(90);
    let mut buf = [0u8; 1500];
    for _ in 0..2 {
        let (len, _from) = svcnode.recv_from(&mut buf).await.unwrap();
        let msg = Refresh::decode(&buf[..len]).unwrap();
        aggregate.merge(&msg);
    }

    assert_eq!(aggregate.vni_vteps()[&100], vec![ip("10.0.0.1"), ip("10.0.0.2")]);
    assert_eq!(aggregate.vni_vteps()[&200], vec![ip("10.0.0.1")]);

    // Redistribute the merged view back to one of the VTEPs
    svcnode
        .send_to(&aggregate.encode(), vtep_a.local_addr().unwrap())
        .await
        .unwrap();

    let (len, _from) = vtep_a.recv_from(&mut buf).await.unwrap();
    let view = Refresh::decode(&buf[..len]).unwrap();
    assert_eq!(view.vni_vteps(), aggregate.vni_vteps());
}

#[tokio::test]
async fn test_resend_request_round_trip() {
    let vtep = local_socket().await;
    let svcnode = local_socket().await;

    // A freshly started VTEP asks the service node to resend its state
    vtep.send_to(&Refresh::resend().encode(), svcnode.local_addr().unwrap())
        .await
        .unwrap();

    let mut buf = [0u8; 1500];
    let (len, from) = svcnode.recv_from(&mut buf).await.unwrap();
    let request = Refresh::decode(&buf[..len]).unwrap();
    assert_eq!(request.msg_type, MsgType::Resend);
    assert_eq!(request.vni_count(), 0);

    // The service node answers with its current membership
    let mut state = Refresh::refresh(90);
    state.add_vteps(300, [ip("172.16.0.1")]);
    svcnode.send_to(&state.encode(), from).await.unwrap();

    let (len, _from) = vtep.recv_from(&mut buf).await.unwrap();
    let reply = Refresh::decode(&buf[..len]).unwrap();
    assert_eq!(reply.vni_vteps()[&300], vec![ip("172.16.0.1")]);
}

#[tokio::test]
async fn test_corrupt_datagram_is_rejected_without_state() {
    let vtep = local_socket().await;
    let svcnode = local_socket().await;

    // A datagram truncated in flight (here: a partial send) must decode to
    // an error, never to a partial membership view.
    let mut msg = Refresh::refresh(90);
    msg.add_vteps(100, [ip("10.0.0.1"), ip("10.0.0.2")]);
    let wire = msg.encode();

    vtep.send_to(&wire[..wire.len() - 3], svcnode.local_addr().unwrap())
        .await
        .unwrap();

    let mut buf = [0u8; 1500];
    let (len, _from) = svcnode.recv_from(&mut buf).await.unwrap();
    assert!(Refresh::decode(&buf[..len]).is_err());
}
