//! WebSocket handler that drives one chat widget per connection.
//!
//! The `/ws/widget` endpoint upgrades an HTTP connection to a WebSocket.
//! Each connection owns a [`WidgetController`] rendering into a
//! [`SocketView`]; the handler:
//!
//! - **Forwards patches:** drains the view's patch channel and pushes every
//!   [`ViewPatch`] to the page as a JSON text frame.
//! - **Receives commands:** parses incoming text frames as [`WidgetCommand`]
//!   and routes them to the controller.
//!
//! Sends run on their own task so the connection keeps reading while a
//! reply streams; that is what lets a second send hit the busy guard and a
//! reset orphan the stream in flight. Disconnecting shuts the controller
//! down, which stops any stream that is still running.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use mcars_core::widget::WidgetController;

use crate::http::socket_view::{SocketView, ViewPatch};
use crate::state::AppState;

type Controller = Arc<WidgetController<SocketView>>;

/// Incoming command from the widget page.
///
/// Unknown or malformed messages are logged and ignored.
#[derive(Debug, PartialEq, serde::Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum WidgetCommand {
    /// Floating toggle button clicked.
    Toggle,
    /// Send button clicked or Enter pressed.
    Send { text: String },
    /// Quick-action button clicked.
    QuickAction { index: usize },
    /// Reset button clicked.
    Reset,
    /// Keep-alive ping. Server responds with `{"type":"pong"}`.
    Ping,
}

/// Upgrade an HTTP request to a widget WebSocket connection.
///
/// This is mounted at `/ws/widget` in the router.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_widget_connection(socket, state))
}

async fn handle_widget_connection(socket: WebSocket, state: AppState) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let (patch_tx, mut patch_rx) = mpsc::unbounded_channel();

    let controller: Controller = Arc::new(WidgetController::new(
        Arc::clone(&state.provider),
        Arc::clone(&state.widget),
        SocketView::new(patch_tx.clone()),
    ));
    tracing::debug!("Widget connected");

    loop {
        tokio::select! {
            Some(patch) = patch_rx.recv() => {
                match serde_json::to_string(&patch) {
                    Ok(json) => {
                        if ws_sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        tracing::warn!("Failed to serialize view patch: {err}");
                    }
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        process_command(&text, &controller, &patch_tx);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(err)) => {
                        tracing::debug!("WebSocket receive error: {err}");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    controller.shutdown();
    tracing::debug!("Widget disconnected");
}

/// Parse and dispatch a single command from the page.
fn process_command(text: &str, controller: &Controller, patches: &mpsc::UnboundedSender<ViewPatch>) {
    let cmd: WidgetCommand = match serde_json::from_str(text) {
        Ok(cmd) => cmd,
        Err(err) => {
            tracing::warn!(
                raw = %text,
                error = %err,
                "Ignoring malformed widget command"
            );
            return;
        }
    };

    match cmd {
        WidgetCommand::Toggle => {
            controller.toggle();
        }
        WidgetCommand::Send { text } => {
            let controller = Arc::clone(controller);
            tokio::spawn(async move {
                let outcome = controller.send(&text).await;
                tracing::debug!(?outcome, "Send finished");
            });
        }
        WidgetCommand::QuickAction { index } => {
            let controller = Arc::clone(controller);
            tokio::spawn(async move {
                let outcome = controller.send_quick_action(index).await;
                tracing::debug!(index, ?outcome, "Quick action finished");
            });
        }
        WidgetCommand::Reset => controller.reset(),
        WidgetCommand::Ping => {
            if patches.send(ViewPatch::Pong).is_err() {
                tracing::debug!("Failed to queue pong (client disconnecting)");
            }
        }
    }
}
