use async_trait::async_trait;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::protocol::{decode_response, encode_request, expect_string, EngineRequest, ResponseFrame};
use super::{CipherEngine, EngineError};
use crate::settings::EngineSettings;

/// Cipher Engine reached through a child process speaking line-delimited JSON
/// on stdin/stdout. The child is spawned on first use and respawned after a
/// transport or protocol failure.
///
/// One request is in flight at a time: every call shares the one pipe, so a
/// slow or hung call (a large encrypt, say) also delays unrelated calls such
/// as log reads or key generation until it answers. There is no timeout.
pub struct ProcessEngine {
    program: PathBuf,
    args: Vec<String>,
    session: Mutex<Option<EngineSession>>,
    next_id: AtomicU64,
}

struct EngineSession {
    // Held so the child is killed when the session is dropped.
    _child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

impl ProcessEngine {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            session: Mutex::new(None),
            next_id: AtomicU64::new(0),
        }
    }

    pub fn from_settings(settings: &EngineSettings) -> Self {
        Self::new(settings.program.clone(), settings.args.clone())
    }

    fn spawn(&self) -> Result<EngineSession, EngineError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                EngineError::Transport(format!("spawn {}: {e}", self.program.display()))
            })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| EngineError::Transport("engine stdin unavailable".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineError::Transport("engine stdout unavailable".into()))?;
        info!(program = %self.program.display(), "cipher engine process started");
        Ok(EngineSession {
            _child: child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    async fn call(&self, request: EngineRequest) -> Result<Value, EngineError> {
        let mut guard = self.session.lock().await;
        let mut session = match guard.take() {
            Some(session) => session,
            None => self.spawn()?,
        };
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let method = request.method();
        debug!(id, method, "engine request");

        match exchange(&mut session, id, request).await {
            Ok(frame) => {
                *guard = Some(session);
                frame.into_result()
            }
            Err(e) => {
                warn!(id, method, error = %e, "engine session dropped");
                Err(e)
            }
        }
    }
}

async fn exchange(
    session: &mut EngineSession,
    id: u64,
    request: EngineRequest,
) -> Result<ResponseFrame, EngineError> {
    let line = encode_request(id, request)?;
    session.stdin.write_all(line.as_bytes()).await?;
    session.stdin.flush().await?;

    let mut buf = String::new();
    let n = session.stdout.read_line(&mut buf).await?;
    if n == 0 {
        return Err(EngineError::Transport("engine closed its output".into()));
    }
    let frame = decode_response(&buf)?;
    if frame.id != id {
        return Err(EngineError::Protocol(format!(
            "expected response {id}, got {}",
            frame.id
        )));
    }
    Ok(frame)
}

fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[async_trait]
impl CipherEngine for ProcessEngine {
    async fn encrypt(
        &self,
        file_path: &Path,
        key: &str,
        algorithm: &str,
    ) -> Result<PathBuf, EngineError> {
        let value = self
            .call(EngineRequest::Encrypt {
                file_path: path_arg(file_path),
                key: key.to_string(),
                algorithm: algorithm.to_string(),
            })
            .await?;
        expect_string(value).map(PathBuf::from)
    }

    async fn decrypt(
        &self,
        file_path: &Path,
        key: &str,
        algorithm: &str,
    ) -> Result<PathBuf, EngineError> {
        let value = self
            .call(EngineRequest::Decrypt {
                file_path: path_arg(file_path),
                key: key.to_string(),
                algorithm: algorithm.to_string(),
            })
            .await?;
        expect_string(value).map(PathBuf::from)
    }

    async fn generate_rsa_keypair(&self, bits: u32) -> Result<String, EngineError> {
        let value = self.call(EngineRequest::GenerateRsaKeypair { bits }).await?;
        expect_string(value)
    }

    async fn generate_ecdh_keypair(&self) -> Result<String, EngineError> {
        let value = self.call(EngineRequest::GenerateEcdhKeypair).await?;
        expect_string(value)
    }

    async fn compute_ecdh_shared_secret(
        &self,
        private_key: &str,
        public_key: &str,
    ) -> Result<String, EngineError> {
        let value = self
            .call(EngineRequest::ComputeEcdhSharedSecret {
                private_key: private_key.to_string(),
                public_key: public_key.to_string(),
            })
            .await?;
        expect_string(value)
    }

    async fn export_logs(&self) -> Result<String, EngineError> {
        let value = self.call(EngineRequest::ExportLogs).await?;
        expect_string(value)
    }

    async fn clear_logs(&self) -> Result<(), EngineError> {
        self.call(EngineRequest::ClearLogs).await.map(|_| ())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn scripted(script: &str) -> ProcessEngine {
        ProcessEngine::new("sh", vec!["-c".to_string(), script.to_string()])
    }

    #[tokio::test]
    async fn encrypt_returns_engine_output_path() {
        let engine = scripted(r#"read line; echo '{"id":1,"ok":"/tmp/cipherdesk/a.txt.enc"}'"#);
        let out = engine
            .encrypt(Path::new("/tmp/cipherdesk/a.txt"), "k", "caesar-cipher")
            .await
            .unwrap();
        assert_eq!(out, PathBuf::from("/tmp/cipherdesk/a.txt.enc"));
    }

    #[tokio::test]
    async fn engine_error_frame_is_rejected() {
        let engine = scripted(r#"read line; echo '{"id":1,"error":"key too short"}'"#);
        let err = engine.generate_rsa_keypair(512).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected(m) if m == "key too short"));
    }

    #[tokio::test]
    async fn mismatched_id_is_a_protocol_error() {
        let engine = scripted(r#"read line; echo '{"id":42,"ok":"x"}'"#);
        let err = engine.export_logs().await.unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
    }

    #[tokio::test]
    async fn silent_engine_is_a_transport_error() {
        let engine = scripted("read line; exit 0");
        let err = engine.clear_logs().await.unwrap_err();
        assert!(matches!(err, EngineError::Transport(_)));
    }

    #[tokio::test]
    async fn concurrent_calls_take_turns_on_the_pipe() {
        let engine = scripted(
            r#"read a; sleep 0.2; echo '{"id":1,"ok":"first"}'; read b; echo '{"id":2,"ok":"second"}'"#,
        );
        let (a, b) = tokio::join!(engine.export_logs(), engine.export_logs());
        let mut answers = vec![a.unwrap(), b.unwrap()];
        answers.sort();
        assert_eq!(answers, vec!["first".to_string(), "second".to_string()]);
    }

    #[tokio::test]
    async fn missing_program_is_a_transport_error() {
        let engine = ProcessEngine::new("/nonexistent/cipherdesk-engine", vec![]);
        let err = engine.generate_ecdh_keypair().await.unwrap_err();
        assert!(matches!(err, EngineError::Transport(_)));
    }
}
