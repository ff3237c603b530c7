//! JSON-RPC plumbing for driver communication
//!
//! The browser driver is an external Node process; requests and responses
//! travel as newline-delimited JSON-RPC 2.0 over its stdin/stdout. A
//! [`DriverLink`] hands each call to a background pump task that owns both
//! pipes and routes replies back to callers by request id.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{ChildStdin, ChildStdout};
use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use super::PageError;

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
pub(super) struct RpcResponse {
    pub id: u64,
    pub result: Option<Value>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub(super) struct RpcError {
    pub code: i32,
    pub message: String,
}

type Reply = oneshot::Sender<Result<Value, PageError>>;

struct Call {
    line: String,
    id: u64,
    reply: Reply,
}

/// Cloneable handle for issuing driver calls.
///
/// Dropping every clone closes the channel, which stops the pump and lets
/// the driver process see EOF on its stdin.
#[derive(Clone)]
pub struct DriverLink {
    calls: mpsc::Sender<Call>,
    next_id: Arc<AtomicU64>,
}

impl DriverLink {
    /// Take over the driver's pipes and start the background pump.
    pub fn connect(stdin: ChildStdin, stdout: ChildStdout) -> Self {
        let (calls, queue) = mpsc::channel(100);
        tokio::spawn(pump(queue, stdin, stdout));
        Self {
            calls,
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Issue one request and wait for the driver's reply.
    ///
    /// Driver-reported errors come back as [`PageError::DriverError`]; a
    /// dead pump (process exited, pipes closed) as [`PageError::Disconnected`].
    pub async fn call(&self, method: &str, params: Value) -> Result<Value, PageError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = RpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };
        let mut line = serde_json::to_string(&request)?;
        line.push('\n');

        let (reply, response) = oneshot::channel();
        self.calls
            .send(Call { line, id, reply })
            .await
            .map_err(|_| PageError::Disconnected)?;

        response.await.map_err(|_| PageError::Disconnected)?
    }
}

/// Writes queued calls to the driver and routes reply lines back by id.
/// Ends when either pipe breaks or the last [`DriverLink`] clone is dropped;
/// pending callers then observe a closed oneshot and report disconnection.
async fn pump(mut queue: mpsc::Receiver<Call>, mut stdin: ChildStdin, stdout: ChildStdout) {
    let mut reader = BufReader::new(stdout).lines();
    let mut in_flight: HashMap<u64, Reply> = HashMap::new();

    loop {
        tokio::select! {
            call = queue.recv() => {
                let Some(call) = call else { break };
                if stdin.write_all(call.line.as_bytes()).await.is_err() {
                    let _ = call.reply.send(Err(PageError::Disconnected));
                    break;
                }
                in_flight.insert(call.id, call.reply);
            }

            line = reader.next_line() => {
                let Ok(Some(line)) = line else { break };
                dispatch_reply(&mut in_flight, &line);
            }
        }
    }
}

fn dispatch_reply(in_flight: &mut HashMap<u64, Reply>, line: &str) {
    let response: RpcResponse = match serde_json::from_str(line) {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "Discarding unparseable driver output");
            return;
        }
    };
    let Some(reply) = in_flight.remove(&response.id) else {
        // Replies to abandoned calls; nothing is waiting.
        return;
    };
    let result = match response.error {
        Some(err) => Err(PageError::DriverError(format!(
            "[{}] {}",
            err.code, err.message
        ))),
        None => Ok(response.result.unwrap_or(Value::Null)),
    };
    let _ = reply.send(result);
}
