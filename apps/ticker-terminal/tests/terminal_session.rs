//! Terminal Session Integration Tests
//!
//! Drives sessions end to end: a local mini-ticker server feeds the session
//! controller, and the TCP host serves the resulting frames to a client.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use ticker_terminal::infrastructure::feed::MiniTickerMessage;
use ticker_terminal::{
    FeedSettings, Frame, HostInput, Key, SessionConfig, SessionController, SessionExit,
    SessionRegistry, TcpTerminalHost, Viewport,
};

const WAIT: Duration = Duration::from_secs(5);

/// Mini-ticker server that forwards every price sent on the returned
/// channel to each connected client.
async fn price_server() -> (SocketAddr, mpsc::UnboundedSender<&'static str>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, mut rx) = mpsc::unbounded_channel::<&'static str>();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();
        loop {
            tokio::select! {
                price = rx.recv() => {
                    let Some(price) = price else { return };
                    let message = MiniTickerMessage::with_close(price);
                    let json = serde_json::to_string(&message).unwrap();
                    if ws.send(Message::text(json)).await.is_err() {
                        return;
                    }
                }
                msg = ws.next() => {
                    if !matches!(msg, Some(Ok(_))) {
                        return;
                    }
                }
            }
        }
    });

    (addr, tx)
}

fn session_config(addr: SocketAddr) -> SessionConfig {
    SessionConfig {
        feed: FeedSettings {
            url: format!("ws://{addr}/ws/btcusdt@miniTicker"),
            ..FeedSettings::default()
        },
        ..SessionConfig::default()
    }
}

async fn wait_for<F>(frames: &mut watch::Receiver<Frame>, predicate: F) -> Frame
where
    F: Fn(&Frame) -> bool,
{
    timeout(WAIT, async {
        loop {
            {
                let frame = frames.borrow_and_update();
                if predicate(&frame) {
                    return Frame::clone(&frame);
                }
            }
            frames.changed().await.unwrap();
        }
    })
    .await
    .expect("timed out waiting for frame")
}

/// Read from `stream` until the decoded output satisfies `predicate`.
async fn read_until<F>(stream: &mut TcpStream, seen: &mut Vec<u8>, predicate: F)
where
    F: Fn(&str) -> bool,
{
    timeout(WAIT, async {
        let mut buf = [0u8; 4096];
        while !predicate(&String::from_utf8_lossy(seen)) {
            let n = stream.read(&mut buf).await.unwrap();
            assert!(n > 0, "connection closed early");
            seen.extend_from_slice(&buf[..n]);
        }
    })
    .await
    .expect("timed out reading terminal output");
}

#[tokio::test]
async fn prices_reach_rendered_frames() {
    let (addr, prices) = price_server().await;
    let registry = Arc::new(SessionRegistry::new());
    let termination = CancellationToken::new();

    let handle = SessionController::spawn(
        &session_config(addr),
        Viewport::new(100, 30),
        &termination,
        Arc::clone(&registry),
        None,
    );
    let mut frames = handle.frames();

    prices.send("64123.45").unwrap();
    let frame = wait_for(&mut frames, |f| f.content.contains("Last: 64 123.45usdt")).await;
    assert!(frame.content.starts_with("BTC/USDT Live Price\n\n\n"));
    assert!(frame.content.contains("Min: 64 123.45usdt  Max: 64 123.45usdt"));
    assert!(frame.content.contains("Last: 1 346 592.45czk"));

    prices.send("64200.00").unwrap();
    let frame = wait_for(&mut frames, |f| f.content.contains("Last: 64 200.00usdt")).await;
    assert!(frame.content.contains("Min: 64 123.45usdt  Max: 64 200.00usdt"));
    assert!(frame.content.contains("Δ: 76.55 (0.12%)"));
    assert!(frame.content.contains("\x1b[32mBTC/USDT 64200.00\x1b[0m"));

    termination.cancel();
    assert_eq!(handle.join().await, SessionExit::Terminated);
    assert_eq!(registry.active(), 0);
}

#[tokio::test]
async fn help_toggle_expands_footer() {
    let (addr, prices) = price_server().await;
    let termination = CancellationToken::new();

    let handle = SessionController::spawn(
        &session_config(addr),
        Viewport::default(),
        &termination,
        Arc::new(SessionRegistry::new()),
        None,
    );
    let mut frames = handle.frames();

    prices.send("100.00").unwrap();
    let frame = wait_for(&mut frames, |f| f.content.contains("Last: 100.00usdt")).await;
    assert!(frame.content.ends_with("q quit • ? more"));

    assert!(handle.send(HostInput::Key(Key::ToggleHelp)).await);
    let frame = wait_for(&mut frames, |f| f.content.contains("toggle this help")).await;
    assert!(frame.content.contains("q quit • ? less"));

    assert!(handle.send(HostInput::Key(Key::ToggleHelp)).await);
    wait_for(&mut frames, |f| f.content.ends_with("? more")).await;

    assert!(handle.send(HostInput::Key(Key::Quit)).await);
    assert_eq!(handle.join().await, SessionExit::Quit);
}

#[tokio::test]
async fn sessions_are_independent() {
    let (addr_a, prices_a) = price_server().await;
    let (addr_b, prices_b) = price_server().await;
    let termination = CancellationToken::new();
    let registry = Arc::new(SessionRegistry::new());

    let a = SessionController::spawn(
        &session_config(addr_a),
        Viewport::default(),
        &termination,
        Arc::clone(&registry),
        None,
    );
    let b = SessionController::spawn(
        &session_config(addr_b),
        Viewport::default(),
        &termination,
        Arc::clone(&registry),
        None,
    );
    assert_ne!(a.id(), b.id());
    assert_eq!(registry.active(), 2);

    prices_a.send("1.00").unwrap();
    prices_b.send("2.00").unwrap();

    let frame_a = wait_for(&mut a.frames(), |f| f.content.contains("Last: 1.00usdt")).await;
    let frame_b = wait_for(&mut b.frames(), |f| f.content.contains("Last: 2.00usdt")).await;
    assert!(!frame_a.content.contains("2.00usdt"));
    assert!(!frame_b.content.contains("Last: 1.00usdt"));

    assert!(a.send(HostInput::Key(Key::Quit)).await);
    assert_eq!(a.join().await, SessionExit::Quit);
    assert_eq!(registry.active(), 1);

    termination.cancel();
    assert_eq!(b.join().await, SessionExit::Terminated);
    assert_eq!(registry.active(), 0);
}

#[tokio::test]
async fn tcp_host_serves_frames_and_quits_on_q() {
    let (feed_addr, prices) = price_server().await;
    let registry = Arc::new(SessionRegistry::new());
    let cancel = CancellationToken::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host_addr = listener.local_addr().unwrap();
    let host = TcpTerminalHost::new(
        host_addr.to_string(),
        session_config(feed_addr),
        Viewport::new(80, 24),
        Arc::clone(&registry),
        cancel.clone(),
    );
    let host_task = tokio::spawn(host.serve(listener));

    let mut client = TcpStream::connect(host_addr).await.unwrap();
    let mut seen = Vec::new();

    read_until(&mut client, &mut seen, |s| s.contains("Connecting to Binance…")).await;
    assert!(seen.starts_with(b"\x1b[?25l\x1b[H\x1b[2J"));
    assert!(registry.is_accepting());
    assert_eq!(registry.active(), 1);

    prices.send("64123.45").unwrap();
    read_until(&mut client, &mut seen, |s| s.contains("Last: 64 123.45usdt")).await;
    assert!(String::from_utf8_lossy(&seen).contains("BTC/USDT Live Price\r\n\r\n\r\n"));

    client.write_all(b"q").await.unwrap();
    let mut rest = Vec::new();
    timeout(WAIT, client.read_to_end(&mut rest)).await.unwrap().unwrap();
    assert!(rest.ends_with(b"\x1b[?25h\r\n"));

    timeout(WAIT, async {
        while registry.active() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    cancel.cancel();
    timeout(WAIT, host_task).await.unwrap().unwrap().unwrap();
    assert!(!registry.is_accepting());
}

#[tokio::test]
async fn tcp_host_cancellation_closes_open_sessions() {
    let (feed_addr, _prices) = price_server().await;
    let registry = Arc::new(SessionRegistry::new());
    let cancel = CancellationToken::new();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let host_addr = listener.local_addr().unwrap();
    let host = TcpTerminalHost::new(
        host_addr.to_string(),
        session_config(feed_addr),
        Viewport::default(),
        Arc::clone(&registry),
        cancel.clone(),
    );
    let host_task = tokio::spawn(host.serve(listener));

    let mut client = TcpStream::connect(host_addr).await.unwrap();
    let mut seen = Vec::new();
    read_until(&mut client, &mut seen, |s| s.contains("Connecting")).await;

    cancel.cancel();
    timeout(WAIT, host_task).await.unwrap().unwrap().unwrap();

    let mut rest = Vec::new();
    timeout(WAIT, client.read_to_end(&mut rest)).await.unwrap().unwrap();
    assert!(rest.ends_with(b"\x1b[?25h\r\n"));
}
