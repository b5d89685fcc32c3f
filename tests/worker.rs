//! Serving, draining and socket handoff between workers.

mod common;

use std::time::{Duration, Instant};

use axum::http::StatusCode;
use seed_server::routing::{Router, Routes};

use common::{client, loopback_listener, spawn_server};

fn tagged(tag: &'static str) -> Router {
    let mut router = Router::new();
    router
        .handle_fn("GET", "/who", move |_req| async move { tag }, &[])
        .unwrap();
    router
        .handle_fn(
            "GET",
            "/slow",
            |_req| async {
                tokio::time::sleep(Duration::from_millis(400)).await;
                "done"
            },
            &[],
        )
        .unwrap();
    router
        .handle_fn(
            "GET",
            "/stuck",
            |_req| async {
                tokio::time::sleep(Duration::from_secs(30)).await;
                "never"
            },
            &[],
        )
        .unwrap();
    router
}

#[tokio::test]
async fn in_flight_request_finishes_during_drain() {
    let server = spawn_server(tagged("a"), loopback_listener(), Duration::from_secs(5));
    let url = server.url("/slow");

    let in_flight = tokio::spawn(async move { client().get(url).send().await });
    tokio::time::sleep(Duration::from_millis(100)).await;
    let _ = server.stop.send(());

    let res = in_flight.await.unwrap().unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    assert_eq!(res.text().await.unwrap(), "done");

    server.task.await.unwrap().unwrap();

    // Stopped servers refuse new connections.
    assert!(client().get(format!("http://{}/who", server.addr)).send().await.is_err());
}

#[tokio::test]
async fn drain_is_bounded_by_deadline() {
    let server = spawn_server(tagged("a"), loopback_listener(), Duration::from_millis(200));
    let url = server.url("/stuck");

    let in_flight = tokio::spawn(async move { client().get(url).send().await });
    tokio::time::sleep(Duration::from_millis(100)).await;

    let started = Instant::now();
    let _ = server.stop.send(());
    tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .expect("drain exceeded its deadline")
        .unwrap()
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(5));

    assert!(in_flight.await.unwrap().is_err());
}

#[tokio::test]
async fn shared_socket_survives_handoff() {
    let listener = loopback_listener();
    let handoff = listener.try_clone().unwrap();

    let old = spawn_server(tagged("old"), listener, Duration::from_secs(1));
    let new = spawn_server(tagged("new"), handoff, Duration::from_secs(1));
    let url = old.url("/who");
    assert_eq!(old.addr, new.addr);

    let _ = old.stop.send(());
    old.task.await.unwrap().unwrap();

    // Every request after the handoff lands on the new server.
    let client = client();
    for _ in 0..20 {
        let res = client.get(&url).send().await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert_eq!(res.text().await.unwrap(), "new");
    }

    let _ = new.stop.send(());
    new.task.await.unwrap().unwrap();
}
