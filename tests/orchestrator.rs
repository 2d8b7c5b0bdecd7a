//! Signal-driven lifecycle: start, rotation, graceful stop.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;

use carbon_agent::diagnostics::{DiagnosticsServer, DiagnosticsState};
use carbon_agent::lifecycle::{Lifecycle, LifecycleState, ManagedApplication, Orchestrator};
use carbon_agent::logging::LogDestination;

mod common;
use common::{wait_until_async, FakeApp};

fn orchestrator(app: &Arc<FakeApp>) -> Orchestrator<FakeApp> {
    let lifecycle = Lifecycle::new();
    lifecycle.advance(LifecycleState::Starting).unwrap();
    Orchestrator::new(lifecycle, Arc::new(LogDestination::new()), Arc::clone(app))
}

#[tokio::test]
async fn full_lifecycle_with_signals() {
    let app = Arc::new(FakeApp::new());
    let orchestrator = orchestrator(&app);
    let mut states = orchestrator.lifecycle().subscribe();

    orchestrator.start().unwrap();
    assert_eq!(orchestrator.lifecycle().current(), LifecycleState::Running);
    assert_eq!(app.starts.load(Ordering::SeqCst), 1);

    let (rotate_tx, rotate_rx) = mpsc::channel(4);
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let orchestrator = Arc::new(orchestrator);
    let running = tokio::spawn(Arc::clone(&orchestrator).run(rotate_rx, stop_rx));

    rotate_tx.send(()).await.unwrap();
    rotate_tx.send(()).await.unwrap();
    assert!(wait_until_async(Duration::from_secs(2), || app.reloads.load(Ordering::SeqCst) == 2).await);
    assert_eq!(app.stops.load(Ordering::SeqCst), 0);

    stop_tx.send(()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(app.stops.load(Ordering::SeqCst), 1);
    assert_eq!(orchestrator.lifecycle().current(), LifecycleState::Stopped);
    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), LifecycleState::Stopped);
}

#[tokio::test]
async fn terminal_signal_closes_diagnostics_before_graceful_stop() {
    let app = Arc::new(FakeApp::new());
    let orchestrator = orchestrator(&app);

    let state = DiagnosticsState::new(
        Arc::new(LogDestination::new()),
        orchestrator.lifecycle().subscribe(),
    );
    let server = DiagnosticsServer::start("127.0.0.1:0", state).await.unwrap();
    let addr = server.local_addr();
    *app.probe.lock() = Some(addr);
    let orchestrator = orchestrator.with_diagnostics(server);
    orchestrator.start().unwrap();

    let client = reqwest::Client::builder().no_proxy().build().unwrap();
    let status: serde_json::Value = client
        .get(format!("http://{addr}/debug/status"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["state"], "running");
    drop(client);

    let (_rotate_tx, rotate_rx) = mpsc::channel::<()>(1);
    let (stop_tx, stop_rx) = mpsc::channel(1);
    let orchestrator = Arc::new(orchestrator);
    let running = tokio::spawn(Arc::clone(&orchestrator).run(rotate_rx, stop_rx));

    stop_tx.send(()).await.unwrap();
    tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(*app.probe_closed.lock(), Some(true));
    assert!(tokio::net::TcpStream::connect(addr).await.is_err());
    assert_eq!(orchestrator.lifecycle().current(), LifecycleState::Stopped);
}

#[tokio::test]
async fn application_exit_without_signal_stops() {
    let app = Arc::new(FakeApp::new());
    let orchestrator = Arc::new(orchestrator(&app));
    orchestrator.start().unwrap();

    let (_rotate_tx, rotate_rx) = mpsc::channel::<()>(1);
    let (_stop_tx, stop_rx) = mpsc::channel::<()>(1);
    let running = tokio::spawn(Arc::clone(&orchestrator).run(rotate_rx, stop_rx));

    app.graceful_stop();

    tokio::time::timeout(Duration::from_secs(2), running)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(orchestrator.lifecycle().current(), LifecycleState::Stopped);
}

#[tokio::test]
async fn second_terminal_signal_is_ignored() {
    let app = Arc::new(FakeApp::new());
    let orchestrator = Arc::new(orchestrator(&app));
    orchestrator.start().unwrap();

    let (_rotate_tx, rotate_rx) = mpsc::channel::<()>(1);
    let (stop_tx, stop_rx) = mpsc::channel(2);
    stop_tx.send(()).await.unwrap();
    stop_tx.send(()).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), Arc::clone(&orchestrator).run(rotate_rx, stop_rx))
        .await
        .unwrap();
    assert_eq!(app.stops.load(Ordering::SeqCst), 1);
}

#[test]
fn start_requires_starting_state() {
    let app = Arc::new(FakeApp::new());
    let orchestrator = Orchestrator::new(Lifecycle::new(), Arc::new(LogDestination::new()), Arc::clone(&app));
    assert!(orchestrator.start().is_err());
    assert_eq!(app.starts.load(Ordering::SeqCst), 0);
    assert_eq!(orchestrator.lifecycle().current(), LifecycleState::Configuring);
}
