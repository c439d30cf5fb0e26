//! Integration-Tests fuer den zusammengesetzten Server

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use futures_util::StreamExt;
use parlor_commander::RestServerKonfig;
use parlor_observability::ParlorMetrics;
use parlor_server::{config::ServerConfig, router, Server};
use parlor_signaling::{SignalingConfig, SignalingState};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tower::ServiceExt;

const WARTEZEIT: Duration = Duration::from_secs(5);

async fn naechstes_event<S>(client: &mut S) -> Value
where
    S: futures_util::Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        let frame = tokio::time::timeout(WARTEZEIT, client.next())
            .await
            .expect("Kein Frame innerhalb der Wartezeit")
            .expect("Stream beendet")
            .expect("Lesefehler");
        if let Message::Text(text) = frame {
            return serde_json::from_str(&text).unwrap();
        }
    }
}

#[tokio::test]
async fn control_plane_events_erreichen_websocket_clients() {
    let state = SignalingState::neu(SignalingConfig::default());
    let metriken = ParlorMetrics::neu().unwrap();
    let app = router(Arc::clone(&state), &metriken, &RestServerKonfig::default());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let serve_app = app.clone();
    tokio::spawn(async move {
        axum::serve(listener, serve_app).await.unwrap();
    });

    let (mut alice, _) = connect_async(format!("ws://{addr}/connect?username=alice"))
        .await
        .unwrap();
    assert_eq!(naechstes_event(&mut alice).await["about"], "user is connected to the websocket server");

    let request = Request::builder()
        .method(Method::POST)
        .uri("/createVoiceChannel")
        .header(header::CONTENT_TYPE, "text/plain; charset=utf-8")
        .body(Body::from("lobby"))
        .unwrap();
    let antwort = app.clone().oneshot(request).await.unwrap();
    assert_eq!(antwort.status(), StatusCode::CREATED);
    assert_eq!(
        naechstes_event(&mut alice).await,
        json!({"about": "voice channel is created", "name": "lobby"})
    );

    let request = Request::builder()
        .method(Method::POST)
        .uri("/joinVoiceChannel")
        .header(header::CONTENT_TYPE, "application/json; charset=utf-8")
        .body(Body::from(r#"{"username":"alice","channelName":"lobby"}"#))
        .unwrap();
    let antwort = app.clone().oneshot(request).await.unwrap();
    assert_eq!(antwort.status(), StatusCode::NO_CONTENT);
    assert_eq!(
        naechstes_event(&mut alice).await,
        json!({"about": "user joined the voice channel", "username": "alice", "channelName": "lobby"})
    );

    // Control-Plane-Anfragen werden gezaehlt
    let gezaehlt = metriken
        .http_requests_total
        .with_label_values(&["POST", "/createVoiceChannel", "201"])
        .get();
    assert_eq!(gezaehlt, 1);
}

#[tokio::test]
async fn shutdown_beendet_server_und_verbindungen() {
    let mut config = ServerConfig::default();
    config.observability.aktiviert = false;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();

    let server = tokio::spawn(Server::neu(config).starten_mit(listener, async move {
        let _ = stop_rx.await;
    }));

    let (mut alice, _) = connect_async(format!("ws://{addr}/connect?username=alice"))
        .await
        .unwrap();
    naechstes_event(&mut alice).await;

    stop_tx.send(()).unwrap();

    // Der Client bekommt einen Close-Frame, danach endet der Server
    let ende = tokio::time::timeout(WARTEZEIT, async {
        while let Some(Ok(frame)) = alice.next().await {
            if let Message::Close(frame) = frame {
                return frame.map(|f| u16::from(f.code));
            }
        }
        None
    })
    .await
    .expect("Verbindung wurde nicht geschlossen");
    assert_eq!(ende, Some(1001));

    tokio::time::timeout(WARTEZEIT, server)
        .await
        .expect("Server endet nicht")
        .unwrap()
        .unwrap();
}
