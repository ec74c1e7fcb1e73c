//! Unix socket listener for the OpenVPN management interface
//!
//! OpenVPN connects to us when started with
//! `--management <socket> unix --management-client --management-query-passwords`.
//! Each accepted connection gets its own task running a
//! [`SessionHandler`]; a failing session is logged and the listener keeps
//! accepting.

use super::session::SessionHandler;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio::io::BufReader;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Notify;
use tracing::{debug, error, warn};

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to remove stale socket {}: {source}", path.display())]
    StaleSocket {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to bind {}: {source}", path.display())]
    Bind {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub struct Server {
    socket_path: PathBuf,
    handler: SessionHandler,
    shutdown: Arc<Notify>,
}

impl Server {
    pub fn new(socket_path: &Path, handler: SessionHandler) -> Self {
        Self {
            socket_path: socket_path.to_path_buf(),
            handler,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Notifier that stops [`Server::run`] when signalled
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.shutdown)
    }

    /// Bind the socket and serve connections until shutdown is signalled
    pub async fn run(&self) -> Result<(), ServerError> {
        let listener = self.bind()?;
        warn!("Listening for OpenVPN on {}", self.socket_path.display());

        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, _addr)) => self.spawn_session(stream),
                    Err(e) => error!("Failed to accept connection: {}", e),
                },
                _ = self.shutdown.notified() => {
                    debug!("Shutdown requested");
                    break;
                }
            }
        }

        if let Err(e) = std::fs::remove_file(&self.socket_path) {
            warn!("Failed to remove socket {}: {}", self.socket_path.display(), e);
        }
        Ok(())
    }

    fn bind(&self) -> Result<UnixListener, ServerError> {
        if self.socket_path.exists() {
            std::fs::remove_file(&self.socket_path).map_err(|source| ServerError::StaleSocket {
                path: self.socket_path.clone(),
                source,
            })?;
        }

        UnixListener::bind(&self.socket_path).map_err(|source| ServerError::Bind {
            path: self.socket_path.clone(),
            source,
        })
    }

    fn spawn_session(&self, stream: UnixStream) {
        let handler = self.handler.clone();
        tokio::spawn(async move {
            debug!("Management connection accepted");
            let (reader, mut writer) = stream.into_split();
            if let Err(e) = handler.run(BufReader::new(reader), &mut writer).await {
                error!("Management session failed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dialog::{
        Credentials, DialogError, DialogOptions, PasswordOptions, Prompt, PromptProvider,
    };
    use crate::management::PatternTable;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, mpsc};
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt};

    /// Answers every password prompt with the same credentials
    struct FixedProvider;

    #[async_trait]
    impl PromptProvider for FixedProvider {
        async fn ask_password(
            &self,
            _options: &PasswordOptions,
        ) -> Result<Prompt<Credentials>, DialogError> {
            Ok(Prompt::Answered(Credentials {
                username: "alice".to_string(),
                password: "secret".to_string(),
            }))
        }

        async fn ask_text(&self, _options: &DialogOptions) -> Result<Prompt<String>, DialogError> {
            Ok(Prompt::Cancelled)
        }
    }

    /// Holds its first prompt open on the blocking pool until released
    struct GatedProvider {
        calls: AtomicUsize,
        gate: Mutex<Option<mpsc::Receiver<()>>>,
    }

    #[async_trait]
    impl PromptProvider for GatedProvider {
        async fn ask_password(
            &self,
            _options: &PasswordOptions,
        ) -> Result<Prompt<Credentials>, DialogError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let gate = if call == 0 {
                self.gate.lock().unwrap().take()
            } else {
                None
            };
            if let Some(gate) = gate {
                tokio::task::spawn_blocking(move || gate.recv()).await?.unwrap();
            }
            Ok(Prompt::Answered(Credentials {
                username: format!("user{call}"),
                password: "pw".to_string(),
            }))
        }

        async fn ask_text(&self, _options: &DialogOptions) -> Result<Prompt<String>, DialogError> {
            Ok(Prompt::Cancelled)
        }
    }

    fn server_with(path: &Path, provider: Arc<dyn PromptProvider>) -> Server {
        let handler = SessionHandler::new(Arc::new(PatternTable::standard().unwrap()), provider);
        Server::new(path, handler)
    }

    fn server(path: &Path) -> Server {
        server_with(path, Arc::new(FixedProvider))
    }

    async fn connect(path: &Path) -> UnixStream {
        for _ in 0..100 {
            if let Ok(stream) = UnixStream::connect(path).await {
                return stream;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("server never started listening on {}", path.display());
    }

    async fn request_credentials(path: &Path, label: &str) -> Vec<String> {
        let stream = connect(path).await;
        let (reader, mut writer) = stream.into_split();
        writer
            .write_all(format!(">PASSWORD:Need '{label}' username/password\n").as_bytes())
            .await
            .unwrap();

        let mut lines = BufReader::new(reader).lines();
        let mut received = Vec::new();
        for _ in 0..2 {
            received.push(lines.next_line().await.unwrap().unwrap());
        }
        received
    }

    #[tokio::test]
    async fn test_serves_connections_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("askpass.sock");
        let server = Arc::new(server(&path));
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.run().await }
        });

        assert_eq!(
            request_credentials(&path, "Auth").await,
            vec!["username \"Auth\" \"alice\"", "password \"Auth\" \"secret\""]
        );

        // A connection sending garbage does not stop the listener
        let mut broken = connect(&path).await;
        broken.write_all(b"\xff\xfe\n").await.unwrap();
        drop(broken);

        assert_eq!(
            request_credentials(&path, "Second").await,
            vec!["username \"Second\" \"alice\"", "password \"Second\" \"secret\""]
        );

        shutdown.notify_one();
        task.await.unwrap().unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_pending_prompt_does_not_stall_other_connections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("askpass.sock");
        let (release, gate) = mpsc::channel();
        let provider = Arc::new(GatedProvider {
            calls: AtomicUsize::new(0),
            gate: Mutex::new(Some(gate)),
        });
        let server = Arc::new(server_with(&path, provider.clone()));
        let shutdown = server.shutdown_handle();
        let task = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.run().await }
        });

        let (first_reader, mut first_writer) = connect(&path).await.into_split();
        first_writer
            .write_all(b">PASSWORD:Need 'A' username/password\n")
            .await
            .unwrap();
        while provider.calls.load(Ordering::SeqCst) == 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        // The first dialog is still open while the second request is answered
        let second = tokio::time::timeout(Duration::from_secs(5), request_credentials(&path, "B"))
            .await
            .expect("second connection stalled behind the open prompt");
        assert_eq!(
            second,
            vec!["username \"B\" \"user1\"", "password \"B\" \"pw\""]
        );

        release.send(()).unwrap();
        let mut first_lines = BufReader::new(first_reader).lines();
        assert_eq!(
            first_lines.next_line().await.unwrap().unwrap(),
            "username \"A\" \"user0\""
        );
        assert_eq!(
            first_lines.next_line().await.unwrap().unwrap(),
            "password \"A\" \"pw\""
        );

        shutdown.notify_one();
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_replaces_stale_socket_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("askpass.sock");
        std::fs::write(&path, b"stale").unwrap();

        let listener = server(&path).bind().unwrap();

        assert!(path.exists());
        drop(listener);
    }

    #[tokio::test]
    async fn test_bind_error_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("askpass.sock");

        let err = server(&path).bind().unwrap_err();

        assert!(matches!(err, ServerError::Bind { .. }));
    }
}
