use std::sync::Arc;

use peerfleet::protocol::{write_frame, Message};
use peerfleet::{
    GameSession, MessageSink, MessageSource, NetConfig, Orientation, PeerProtocol, Phase,
    SessionConfig, SessionSignal, TcpSink, TcpSource, Winner,
};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{sleep, timeout, Duration};

async fn wait_for(what: &str, cond: impl Fn() -> bool) {
    let waited = timeout(Duration::from_secs(5), async {
        while !cond() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "timed out waiting for {}", what);
}

#[tokio::test(flavor = "multi_thread")]
async fn one_connection_per_message() -> anyhow::Result<()> {
    let mut source = TcpSource::bind("127.0.0.1:0").await?;
    let sink = TcpSink::new(source.local_addr()?.to_string());

    sink.send(Message::Ready).await?;
    sink.send(Message::Seen { x: 1, y: 2 }).await?;
    assert_eq!(source.recv().await?, Some(Message::Ready));
    assert_eq!(source.recv().await?, Some(Message::Seen { x: 1, y: 2 }));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn source_rejects_malformed_connection() -> anyhow::Result<()> {
    let mut source = TcpSource::bind("127.0.0.1:0").await?.with_max_frame_size(16);
    let addr = source.local_addr()?;

    let mut stream = TcpStream::connect(addr).await?;
    stream.write_all(&[0, 0, 1, 0]).await?;
    stream.shutdown().await?;
    let err = source.recv().await.unwrap_err();
    assert!(format!("{:#}", err).contains("too large"));

    // The acceptor survives and takes the next connection.
    let mut stream = TcpStream::connect(addr).await?;
    write_frame(&mut stream, &Message::ShipDiscovered { x: 0, y: 1 }).await?;
    assert_eq!(
        source.recv().await?,
        Some(Message::ShipDiscovered { x: 0, y: 1 })
    );
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_peer_fails_to_send() -> anyhow::Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);

    let sink = TcpSink::with_timeout(addr.to_string(), Duration::from_secs(2));
    let err = sink.send(Message::Ready).await.unwrap_err();
    assert!(err.to_string().contains("connect to"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn sessions_play_over_loopback() -> anyhow::Result<()> {
    let source_a = TcpSource::from_config(&NetConfig::new("127.0.0.1:0", "unused")).await?;
    let source_b = TcpSource::bind("127.0.0.1:0").await?;
    let sink_a = TcpSink::new(source_b.local_addr()?.to_string());
    let sink_b = TcpSink::new(source_a.local_addr()?.to_string());

    let config = SessionConfig::new(4, 4, &[2])?;
    let a = Arc::new(GameSession::new(config.clone()));
    let b = Arc::new(GameSession::new(config));
    let mut ha = PeerProtocol::start(Arc::clone(&a), sink_a, source_a);
    let mut hb = PeerProtocol::start(Arc::clone(&b), sink_b, source_b);

    a.initialize()?;
    b.initialize()?;
    a.place_ship(2, 0, 0, Orientation::Horizontal)?;
    b.place_ship(2, 0, 0, Orientation::Horizontal)?;
    wait_for("both sides to play", || {
        a.phase() == Phase::Playing && b.phase() == Phase::Playing
    })
    .await;

    a.player_has_seen(0, 0)?;
    wait_for("first hit", || a.remaining_enemy_ship_cells() == 1).await;
    b.player_has_seen(3, 3)?;
    wait_for("miss to arrive", || a.last_actor() == Some(peerfleet::Side::Enemy)).await;
    a.player_has_seen(1, 0)?;

    let signal = timeout(Duration::from_secs(5), ha.next_signal()).await?;
    assert_eq!(signal, Some(SessionSignal::Ended(Winner::Player)));
    let signal = timeout(Duration::from_secs(5), hb.next_signal()).await?;
    assert_eq!(signal, Some(SessionSignal::Ended(Winner::Enemy)));

    ha.shutdown().await;
    hb.shutdown().await;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn stop_closes_the_acceptor() -> anyhow::Result<()> {
    let source = TcpSource::bind("127.0.0.1:0").await?;
    let addr = source.local_addr()?;
    let session = Arc::new(GameSession::new(SessionConfig::default()));
    let mut handle = PeerProtocol::start(Arc::clone(&session), TcpSink::new("127.0.0.1:9"), source);

    timeout(Duration::from_secs(5), handle.shutdown()).await?;
    assert!(handle.is_stopped());
    assert_eq!(session.dispatcher().observer_count(), 0);
    assert!(TcpStream::connect(addr).await.is_err());
    assert_eq!(timeout(Duration::from_secs(1), handle.next_signal()).await?, None);
    Ok(())
}
