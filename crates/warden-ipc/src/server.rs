//! Socket server: one task per connection, requests forwarded to the daemon

use std::collections::HashMap;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{broadcast, mpsc, Mutex, RwLock};
use tracing::{debug, error, info, warn};
use warden_api::{
    ClientInfo, Command, ErrorCode, ErrorInfo, Event, Request, Response, ResponseResult,
};
use warden_util::ClientId;

use crate::{IpcError, IpcResult};

const EVENT_BUFFER: usize = 100;

/// What the server hands to the daemon
pub enum ServerMessage {
    Request {
        client_id: ClientId,
        request: Request,
    },
    ClientConnected {
        client_id: ClientId,
        info: ClientInfo,
    },
    ClientDisconnected {
        client_id: ClientId,
    },
}

type Clients = Arc<RwLock<HashMap<ClientId, mpsc::UnboundedSender<Response>>>>;

/// Listening policy socket
pub struct IpcServer {
    socket_path: PathBuf,
    listener: UnixListener,
    owner_uid: u32,
    clients: Clients,
    event_tx: broadcast::Sender<Event>,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
    message_rx: Mutex<Option<mpsc::UnboundedReceiver<ServerMessage>>>,
}

impl IpcServer {
    /// Bind the socket, replacing a stale one from a previous run
    pub fn bind(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let socket_path = socket_path.as_ref().to_path_buf();
        if socket_path.exists() {
            std::fs::remove_file(&socket_path)?;
        }
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let listener = UnixListener::bind(&socket_path)?;
        // Owner only
        std::fs::set_permissions(&socket_path, std::fs::Permissions::from_mode(0o600))?;

        let owner_uid = nix::unistd::getuid().as_raw();
        info!(path = %socket_path.display(), owner_uid, "IPC server listening");

        let (event_tx, _) = broadcast::channel(EVENT_BUFFER);
        let (message_tx, message_rx) = mpsc::unbounded_channel();

        Ok(Self {
            socket_path,
            listener,
            owner_uid,
            clients: Arc::new(RwLock::new(HashMap::new())),
            event_tx,
            message_tx,
            message_rx: Mutex::new(Some(message_rx)),
        })
    }

    /// The receiving end for daemon-bound messages; `None` once taken
    pub async fn take_message_receiver(&self) -> Option<mpsc::UnboundedReceiver<ServerMessage>> {
        self.message_rx.lock().await.take()
    }

    /// Accept connections until the task is dropped
    pub async fn run(&self) {
        loop {
            let stream = match self.listener.accept().await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    error!(error = %e, "Failed to accept connection");
                    continue;
                }
            };

            let uid = peer_uid(&stream);
            if !peer_is_trusted(uid, self.owner_uid) {
                warn!(uid = ?uid, owner_uid = self.owner_uid, "Refusing connection from another user");
                continue;
            }

            let client_id = ClientId::new();
            let mut info = ClientInfo::new(client_id.clone());
            if let Some(uid) = uid {
                info = info.with_uid(uid);
            }

            let (response_tx, responses) = mpsc::unbounded_channel();
            self.clients
                .write()
                .await
                .insert(client_id.clone(), response_tx);
            let _ = self.message_tx.send(ServerMessage::ClientConnected {
                client_id: client_id.clone(),
                info,
            });

            let connection = Connection {
                client_id,
                responses,
                events: self.event_tx.subscribe(),
                message_tx: self.message_tx.clone(),
                clients: self.clients.clone(),
            };
            tokio::spawn(connection.serve(stream));
        }
    }

    /// Queue a response for one client
    pub async fn send_response(&self, client_id: &ClientId, response: Response) -> IpcResult<()> {
        let clients = self.clients.read().await;
        let Some(tx) = clients.get(client_id) else {
            debug!(client_id = %client_id, "Response for a client that already left");
            return Ok(());
        };
        tx.send(response).map_err(|_| IpcError::ConnectionClosed)
    }

    /// Push an event to every subscribed client
    pub fn broadcast_event(&self, event: Event) {
        let _ = self.event_tx.send(event);
    }

    /// Remove the socket file
    pub fn shutdown(&self) {
        if self.socket_path.exists() {
            let _ = std::fs::remove_file(&self.socket_path);
        }
    }
}

impl Drop for IpcServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

struct Connection {
    client_id: ClientId,
    responses: mpsc::UnboundedReceiver<Response>,
    events: broadcast::Receiver<Event>,
    message_tx: mpsc::UnboundedSender<ServerMessage>,
    clients: Clients,
}

impl Connection {
    async fn serve(mut self, stream: UnixStream) {
        let (read_half, mut writer) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        // Events start flowing once the subscribe response has been written,
        // so a subscriber always sees its confirmation first.
        let mut pending_subscribe: Option<u64> = None;
        let mut subscribed = false;

        loop {
            tokio::select! {
                biased;

                Some(response) = self.responses.recv() => {
                    let request_id = response.request_id;
                    let accepted = matches!(response.result, ResponseResult::Ok(_));
                    if let Err(e) = write_json_line(&mut writer, serde_json::to_string(&response)).await {
                        debug!(client_id = %self.client_id, error = %e, "Write error");
                        break;
                    }
                    if pending_subscribe == Some(request_id) {
                        pending_subscribe = None;
                        subscribed = accepted;
                    }
                }

                event = self.events.recv() => match event {
                    Ok(event) if subscribed => {
                        if let Err(e) = write_json_line(&mut writer, serde_json::to_string(&event)).await {
                            debug!(client_id = %self.client_id, error = %e, "Event write error");
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(client_id = %self.client_id, skipped, "Subscriber lagging, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },

                line = lines.next_line() => match line {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }
                        match serde_json::from_str::<Request>(line) {
                            Ok(request) => {
                                if matches!(request.command, Command::SubscribeEvents) {
                                    pending_subscribe = Some(request.request_id);
                                }
                                let message = ServerMessage::Request {
                                    client_id: self.client_id.clone(),
                                    request,
                                };
                                if self.message_tx.send(message).is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                warn!(client_id = %self.client_id, error = %e, "Invalid request");
                                let response = Response::error(
                                    0,
                                    ErrorInfo::new(ErrorCode::InvalidRequest, e.to_string()),
                                );
                                if write_json_line(&mut writer, serde_json::to_string(&response)).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Ok(None) => {
                        debug!(client_id = %self.client_id, "Client disconnected (EOF)");
                        break;
                    }
                    Err(e) => {
                        debug!(client_id = %self.client_id, error = %e, "Read error");
                        break;
                    }
                },
            }
        }

        self.clients.write().await.remove(&self.client_id);
        let _ = self.message_tx.send(ServerMessage::ClientDisconnected {
            client_id: self.client_id,
        });
    }
}

async fn write_json_line(
    writer: &mut OwnedWriteHalf,
    json: serde_json::Result<String>,
) -> IpcResult<()> {
    let mut line = json?;
    line.push('\n');
    writer.write_all(line.as_bytes()).await?;
    Ok(())
}

fn peer_uid(stream: &UnixStream) -> Option<u32> {
    use nix::sys::socket::{getsockopt, sockopt::PeerCredentials};
    use std::os::unix::io::AsFd;

    getsockopt(&stream.as_fd(), PeerCredentials)
        .ok()
        .map(|cred| cred.uid())
}

/// Root and the daemon's own user. Unknown peers are refused.
fn peer_is_trusted(uid: Option<u32>, owner_uid: u32) -> bool {
    matches!(uid, Some(uid) if uid == 0 || uid == owner_uid)
}
