//! Integration test support
//!
//! Spawns the full relay application on an ephemeral port with an in-memory
//! user store and a temporary upload directory, and provides a small
//! WebSocket client for driving it.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use futures_util::{SinkExt, StreamExt};
use relay_api::upload::UploadStore;
use relay_api::{create_app, create_gateway, AppState};
use relay_common::AppConfig;
use relay_db::MemoryUserRepository;
use relay_gateway::{Gateway, PresenceSnapshot, ServerEnvelope, WS_PATH};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use tempfile::TempDir;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{
    connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream,
};

/// How long a client waits for the next frame
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a client waits before concluding nothing is coming
pub const QUIET_PERIOD: Duration = Duration::from_millis(200);

/// Test server instance that manages lifecycle
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub gateway: Arc<Gateway>,
    upload_dir: TempDir,
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with default settings
    pub async fn start() -> Result<Self> {
        Self::start_with(&[]).await
    }

    /// Start a server with extra configuration variables
    pub async fn start_with(vars: &[(&str, &str)]) -> Result<Self> {
        let upload_dir = tempfile::tempdir()?;
        let upload_root = upload_dir.path().to_string_lossy().into_owned();

        let mut env: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        env.insert("UPLOAD_DIR".to_string(), upload_root.clone());

        let config = AppConfig::from_lookup(|key| env.get(key).cloned())?;
        let gateway = Arc::new(create_gateway(&config)?);

        let uploads = UploadStore::new(upload_root);
        uploads.init().await?;

        let state = AppState::new(
            config,
            gateway.clone(),
            uploads,
            Some(Arc::new(MemoryUserRepository::new())),
        );
        let app = create_app(state);

        let listener = TcpListener::bind(SocketAddr::from(([127, 0, 0, 1], 0))).await?;
        let addr = listener.local_addr()?;

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            addr,
            client,
            gateway,
            upload_dir,
            _handle: handle,
        })
    }

    /// Get base URL for the server
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// WebSocket endpoint of the relay
    pub fn ws_url(&self) -> String {
        format!("ws://{}{}", self.addr, WS_PATH)
    }

    /// Root of the temporary upload directory
    pub fn upload_dir(&self) -> &std::path::Path {
        self.upload_dir.path()
    }

    /// Make a GET request
    pub async fn get(&self, path: &str) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.get(&url).send().await?)
    }

    /// Make a POST request with JSON body
    pub async fn post<T: Serialize>(&self, path: &str, body: &T) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).json(body).send().await?)
    }

    /// Make a POST request with a multipart body
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url(), path);
        Ok(self.client.post(&url).multipart(form).send().await?)
    }

    /// Open a relay connection and consume its first roster
    pub async fn connect(&self) -> Result<WsClient> {
        let (stream, _) = connect_async(self.ws_url()).await?;
        let mut client = WsClient { stream };
        client.recv_info().await?;
        Ok(client)
    }

    /// Open a relay connection and register `name`, waiting until the
    /// roster shows it
    pub async fn connect_as(&self, name: &str) -> Result<WsClient> {
        let mut client = self.connect().await?;
        client.register(name).await?;
        client
            .recv_info_until(|s| s.clients.iter().any(|c| c == name))
            .await?;
        Ok(client)
    }
}

/// WebSocket client speaking the relay protocol
pub struct WsClient {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsClient {
    /// Send a raw text frame
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.stream.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Send a JSON value as a text frame
    pub async fn send_json(&mut self, value: &serde_json::Value) -> Result<()> {
        self.send_text(value.to_string()).await
    }

    pub async fn register(&mut self, name: &str) -> Result<()> {
        self.send_json(&serde_json::json!({"event": "register", "name": name}))
            .await
    }

    pub async fn message(&mut self, to: &str, text: &str) -> Result<()> {
        self.send_json(&serde_json::json!({"event": "message", "to": to, "text": text}))
            .await
    }

    pub async fn group_message(&mut self, text: &str) -> Result<()> {
        self.send_json(&serde_json::json!({"event": "groupmessage", "text": text}))
            .await
    }

    /// Next text frame, decoded
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<T> {
        loop {
            let frame = tokio::time::timeout(RECV_TIMEOUT, self.stream.next())
                .await
                .context("timed out waiting for a frame")?
                .ok_or_else(|| anyhow!("connection closed"))??;

            match frame {
                Message::Text(text) => return Ok(serde_json::from_str(&text)?),
                Message::Close(_) => bail!("connection closed"),
                _ => {}
            }
        }
    }

    pub async fn recv_envelope(&mut self) -> Result<ServerEnvelope> {
        self.recv().await
    }

    /// Next envelope, which must be a roster
    pub async fn recv_info(&mut self) -> Result<PresenceSnapshot> {
        match self.recv_envelope().await? {
            ServerEnvelope::Info(snapshot) => Ok(snapshot),
            other => bail!("expected info, got {other}"),
        }
    }

    /// Skip rosters until one satisfies `pred`
    pub async fn recv_info_until<F>(&mut self, pred: F) -> Result<PresenceSnapshot>
    where
        F: Fn(&PresenceSnapshot) -> bool,
    {
        loop {
            let snapshot = self.recv_info().await?;
            if pred(&snapshot) {
                return Ok(snapshot);
            }
        }
    }

    /// Next envelope that is not a roster
    pub async fn recv_chat(&mut self) -> Result<ServerEnvelope> {
        loop {
            let envelope = self.recv_envelope().await?;
            if !matches!(envelope, ServerEnvelope::Info(_)) {
                return Ok(envelope);
            }
        }
    }

    /// Assert no chat envelope arrives within the quiet period
    pub async fn expect_no_chat(&mut self) -> Result<()> {
        let deadline = tokio::time::Instant::now() + QUIET_PERIOD;

        loop {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, self.stream.next()).await {
                Err(_) | Ok(None) => return Ok(()),
                Ok(Some(frame)) => {
                    if let Message::Text(text) = frame? {
                        let envelope: ServerEnvelope = serde_json::from_str(&text)?;
                        if !matches!(envelope, ServerEnvelope::Info(_)) {
                            bail!("unexpected envelope: {envelope}");
                        }
                    }
                }
            }
        }
    }

    /// Read and discard frames until the server closes the connection
    pub async fn wait_closed(mut self, limit: Duration) -> Result<()> {
        tokio::time::timeout(limit, async {
            while let Some(frame) = self.stream.next().await {
                if matches!(frame, Ok(Message::Close(_)) | Err(_)) {
                    break;
                }
            }
        })
        .await
        .context("connection still open")
    }

    /// Close the connection from the client side
    pub async fn close(mut self) -> Result<()> {
        self.stream.close(None).await?;
        Ok(())
    }
}

/// Assert response status and parse JSON body
pub async fn assert_json<T: DeserializeOwned>(
    response: Response,
    expected_status: StatusCode,
) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    if status != expected_status {
        bail!("Expected status {expected_status}, got {status}. Body: {body}");
    }

    serde_json::from_str(&body).with_context(|| format!("Failed to parse JSON: {body}"))
}

/// Assert an error response carries `code`
pub async fn assert_error(
    response: Response,
    expected_status: StatusCode,
    code: &str,
) -> Result<serde_json::Value> {
    let body: serde_json::Value = assert_json(response, expected_status).await?;
    if body["error"]["code"] != code {
        bail!("Expected error code {code}, got {body}");
    }
    Ok(body)
}
