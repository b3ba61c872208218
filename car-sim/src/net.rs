use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, Mutex};
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::dynamics::InputState;
use crate::state::{AidToggles, Command, SharedGameState, ShiftDir};

/// Client → server frames.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ClientMessage {
    Input {
        #[serde(default)]
        throttle: f32,
        #[serde(default)]
        brake: f32,
        #[serde(default)]
        steer: f32,
        #[serde(default)]
        handbrake: f32,
    },
    Shift {
        dir: ShiftDir,
    },
    Aids(AidToggles),
    Ping,
}

impl ClientMessage {
    pub fn from_json(txt: &str) -> Option<Self> {
        serde_json::from_str(txt).ok()
    }
}

pub fn welcome_message(client_id: &uuid::Uuid) -> String {
    serde_json::json!({ "type": "welcome", "client_id": client_id }).to_string()
}

pub const PONG: &str = r#"{"type":"pong"}"#;

/// Apply one client frame to the shared state. Returns an immediate reply.
pub fn handle_message(game: &mut SharedGameState, msg: ClientMessage) -> Option<String> {
    match msg {
        ClientMessage::Input { throttle, brake, steer, handbrake } => {
            game.update_input(InputState { throttle, brake, steering: steer, handbrake });
            None
        }
        ClientMessage::Shift { dir } => {
            game.queue(Command::Shift(dir));
            None
        }
        ClientMessage::Aids(toggles) => {
            game.queue(Command::Aids(toggles));
            None
        }
        ClientMessage::Ping => Some(PONG.to_string()),
    }
}

pub async fn start_websocket_server(listener: TcpListener, state: Arc<Mutex<SharedGameState>>) {
    if let Ok(addr) = listener.local_addr() {
        info!("websocket listening on ws://{addr}");
    }

    loop {
        let (raw, peer) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                warn!(error = %e, "accept failed");
                continue;
            }
        };
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_client(raw, state).await {
                warn!(%peer, error = %e, "client session ended with error");
            }
        });
    }
}

async fn handle_client(raw: TcpStream, state: Arc<Mutex<SharedGameState>>) -> anyhow::Result<()> {
    let ws = accept_async(raw).await?;
    let (mut write, mut read) = ws.split();

    // -------------------------------
    // 1) outgoing channel + send loop
    // -------------------------------
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();
    let client_id = state.lock().await.register_client(tx.clone());

    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if write.send(Message::Text(msg)).await.is_err() {
                break;
            }
        }
    });

    info!(%client_id, "client connected");
    let _ = tx.send(welcome_message(&client_id));

    // -------------------------------
    // 2) receive loop
    // -------------------------------
    while let Some(msg) = read.next().await {
        let msg = match msg {
            Ok(m) => m,
            Err(e) => {
                debug!(%client_id, error = %e, "read failed");
                break;
            }
        };
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else { continue };

        let Some(parsed) = ClientMessage::from_json(text) else {
            debug!(%client_id, text, "ignoring unrecognised frame");
            continue;
        };

        let reply = handle_message(&mut *state.lock().await, parsed);
        if let Some(reply) = reply {
            let _ = tx.send(reply);
        }
    }

    info!(%client_id, "client disconnected");
    state.lock().await.remove_client(&client_id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_every_frame_kind() {
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"input","throttle":0.5,"steer":-0.2}"#),
            Some(ClientMessage::Input { throttle: 0.5, brake: 0.0, steer: -0.2, handbrake: 0.0 })
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"shift","dir":"down"}"#),
            Some(ClientMessage::Shift { dir: ShiftDir::Down })
        );
        assert_eq!(
            ClientMessage::from_json(r#"{"type":"aids","tc":true}"#),
            Some(ClientMessage::Aids(AidToggles { tc: Some(true), ..Default::default() }))
        );
        assert_eq!(ClientMessage::from_json(r#"{"type":"ping"}"#), Some(ClientMessage::Ping));
        assert_eq!(ClientMessage::from_json(r#"{"type":"fly"}"#), None);
        assert_eq!(ClientMessage::from_json("not json"), None);
    }

    #[test]
    fn input_is_clamped_and_ping_answers() {
        let mut game = SharedGameState::new();
        let reply = handle_message(
            &mut game,
            ClientMessage::Input { throttle: 4.0, brake: -1.0, steer: 0.25, handbrake: 1.0 },
        );
        assert!(reply.is_none());
        assert_eq!(game.input, InputState { throttle: 1.0, brake: 0.0, steering: 0.25, handbrake: 1.0 });
        assert_eq!(handle_message(&mut game, ClientMessage::Ping).as_deref(), Some(PONG));
    }

    #[test]
    fn welcome_carries_client_id() {
        let id = uuid::Uuid::new_v4();
        let v: serde_json::Value = serde_json::from_str(&welcome_message(&id)).unwrap();
        assert_eq!(v["type"], "welcome");
        assert_eq!(v["client_id"], id.to_string());
    }

    #[tokio::test]
    async fn websocket_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(SharedGameState::new()));
        tokio::spawn(start_websocket_server(listener, Arc::clone(&state)));

        let (mut ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}")).await.unwrap();
        let welcome = ws.next().await.unwrap().unwrap();
        assert!(welcome.to_text().unwrap().contains("welcome"));

        ws.send(Message::Text(r#"{"type":"input","throttle":0.7}"#.into())).await.unwrap();
        ws.send(Message::Text(r#"{"type":"ping"}"#.into())).await.unwrap();
        let pong = ws.next().await.unwrap().unwrap();
        assert_eq!(pong.to_text().unwrap(), PONG);

        // the ping is handled after the input frame
        assert_eq!(state.lock().await.input.throttle, 0.7);
    }
}
