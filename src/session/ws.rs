use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::session::{Reply, Session};
use crate::state::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(st): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| {
        let session_id = Uuid::new_v4();
        handle_socket(socket, st).instrument(info_span!("ws_session", %session_id))
    })
}

async fn handle_socket(socket: WebSocket, st: AppState) {
    let (mut sender, mut receiver) = socket.split();
    info!("connection opened");

    let (mut session, greeting) = Session::start();
    if send_reply(&mut sender, greeting).await.is_err() {
        return;
    }

    while let Some(msg) = receiver.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "websocket receive failed");
                break;
            }
        };
        let reply = session.handle(&st, &text).await;
        let close = reply.close;
        if send_reply(&mut sender, reply).await.is_err() || close {
            break;
        }
    }

    if sender.send(Message::Close(None)).await.is_err() {
        debug!("socket already closed");
    }
    info!(user_id = session.user().map(|u| u.id), "connection closed");
}

async fn send_reply(
    sender: &mut SplitSink<WebSocket, Message>,
    reply: Reply,
) -> Result<(), axum::Error> {
    for line in reply.lines {
        sender.send(Message::Text(line)).await?;
    }
    Ok(())
}
