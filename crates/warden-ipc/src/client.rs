//! Client side of the policy socket

use std::path::Path;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use warden_api::{Command, Event, Request, Response, ResponsePayload, ResponseResult};

use crate::{IpcError, IpcResult};

/// Connection to wardend
pub struct IpcClient {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
    next_request_id: u64,
}

impl IpcClient {
    pub async fn connect(socket_path: impl AsRef<Path>) -> IpcResult<Self> {
        let stream = UnixStream::connect(socket_path).await?;
        let (read_half, writer) = stream.into_split();

        Ok(Self {
            lines: BufReader::new(read_half).lines(),
            writer,
            next_request_id: 1,
        })
    }

    /// Send a command and wait for the matching response
    pub async fn send(&mut self, command: Command) -> IpcResult<Response> {
        let request_id = self.next_request_id;
        self.next_request_id += 1;

        let mut line = serde_json::to_string(&Request::new(request_id, command))?;
        line.push('\n');
        self.writer.write_all(line.as_bytes()).await?;

        let line = self.lines.next_line().await?.ok_or(IpcError::ConnectionClosed)?;
        let response: Response = serde_json::from_str(&line)?;
        if response.request_id != request_id {
            return Err(IpcError::UnexpectedResponse {
                expected: request_id,
                got: response.request_id,
            });
        }
        Ok(response)
    }

    /// Like [`send`](Self::send), with error responses turned into [`IpcError::Remote`]
    pub async fn request(&mut self, command: Command) -> IpcResult<ResponsePayload> {
        match self.send(command).await?.result {
            ResponseResult::Ok(payload) => Ok(payload),
            ResponseResult::Err(e) => Err(IpcError::Remote {
                code: e.code,
                message: e.message,
            }),
        }
    }

    /// Subscribe to events. The connection carries only events afterwards.
    pub async fn subscribe(mut self) -> IpcResult<EventStream> {
        self.request(Command::SubscribeEvents).await?;
        Ok(EventStream { lines: self.lines })
    }
}

/// Events pushed by wardend after a subscribe
pub struct EventStream {
    lines: Lines<BufReader<OwnedReadHalf>>,
}

impl EventStream {
    pub async fn next(&mut self) -> IpcResult<Event> {
        let line = self.lines.next_line().await?.ok_or(IpcError::ConnectionClosed)?;
        Ok(serde_json::from_str(&line)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn connect_without_server_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = IpcClient::connect(dir.path().join("missing.sock")).await;
        assert!(matches!(result, Err(IpcError::Io(_))));
    }
}
