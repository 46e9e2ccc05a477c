use std::{
    fs,
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use async_trait::async_trait;
use thiserror::Error;
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::debug;

/// Upper bound on a single gpg invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors produced by an encryption engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// The engine binary could not be started.
    #[error("failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },
    /// Reading or writing the engine's streams or files failed.
    #[error("io error: {0}")]
    Io(String),
    /// The engine ran but reported failure (missing file, wrong key, bad recipient).
    #[error("encryption engine exited with {status}")]
    Exit { status: String },
    /// The engine did not finish in time and was killed.
    #[error("encryption engine timed out after {0:?}")]
    Timeout(Duration),
}

/// Encrypts and decrypts secret files (gpg in production; a masking double in tests).
#[async_trait]
pub trait Encryptor: Send + Sync {
    /// Decrypt the file at `path` and return the plaintext.
    async fn decrypt(&self, path: &Path) -> Result<Vec<u8>, EngineError>;

    /// Encrypt `plaintext` for `recipient`, writing ciphertext to `path`.
    async fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &str,
        path: &Path,
    ) -> Result<(), EngineError>;
}

/// Shells out to `gpg` (or a compatible binary).
/// The child is killed if the call is cancelled or times out.
#[derive(Debug, Clone)]
pub struct GpgEncryptor {
    program: PathBuf,
    timeout: Duration,
}

impl Default for GpgEncryptor {
    fn default() -> Self {
        Self {
            program: PathBuf::from("gpg"),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl GpgEncryptor {
    pub fn with_program(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    async fn run(&self, mut cmd: Command, input: Option<&[u8]>) -> Result<Vec<u8>, EngineError> {
        cmd.stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stderr(Stdio::null())
        .kill_on_drop(true);

        let exec = async {
            let mut child = cmd.spawn().map_err(|e| EngineError::Spawn {
                program: self.program.display().to_string(),
                reason: e.to_string(),
            })?;

            if let (Some(input), Some(mut stdin)) = (input, child.stdin.take()) {
                // A child that exits early closes the pipe; its exit status is the real error.
                match stdin.write_all(input).await {
                    Err(err) if err.kind() != std::io::ErrorKind::BrokenPipe => {
                        return Err(EngineError::Io(err.to_string()));
                    }
                    _ => {}
                }
            }

            let output = child
                .wait_with_output()
                .await
                .map_err(|e| EngineError::Io(e.to_string()))?;
            if !output.status.success() {
                return Err(EngineError::Exit {
                    status: output.status.to_string(),
                });
            }
            Ok(output.stdout)
        };

        tokio::time::timeout(self.timeout, exec)
            .await
            .map_err(|_| EngineError::Timeout(self.timeout))?
    }
}

#[async_trait]
impl Encryptor for GpgEncryptor {
    async fn decrypt(&self, path: &Path) -> Result<Vec<u8>, EngineError> {
        debug!(program = %self.program.display(), path = %path.display(), "gpg decrypt");
        let mut cmd = Command::new(&self.program);
        cmd.arg("--decrypt").arg(path).stdout(Stdio::piped());
        self.run(cmd, None).await
    }

    async fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &str,
        path: &Path,
    ) -> Result<(), EngineError> {
        debug!(program = %self.program.display(), path = %path.display(), "gpg encrypt");
        let mut cmd = Command::new(&self.program);
        cmd.args(["--encrypt", "-r", recipient, "-o"])
            .arg(path)
            .stdout(Stdio::null());
        self.run(cmd, Some(plaintext)).await.map(|_| ())
    }
}

const MASK_HEADER: &[u8] = b"passdrv-mask:";
const MASK_BYTE: u8 = 0xA5;

/// In-process encryptor for tests and smoke runs.
/// XOR masking only: it keeps plaintext off disk but is not cryptographically secure.
#[derive(Debug, Clone)]
pub struct MaskingEncryptor {
    recipients: Vec<String>,
}

impl MaskingEncryptor {
    /// Encryptor that can decrypt files addressed to any of `recipients`.
    pub fn new<I, S>(recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            recipients: recipients.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl Encryptor for MaskingEncryptor {
    async fn decrypt(&self, path: &Path) -> Result<Vec<u8>, EngineError> {
        let raw = fs::read(path).map_err(|e| EngineError::Io(e.to_string()))?;
        let body = raw.strip_prefix(MASK_HEADER).ok_or_else(|| EngineError::Exit {
            status: "no valid OpenPGP data found".to_string(),
        })?;
        let split = body
            .iter()
            .position(|b| *b == b'\n')
            .ok_or_else(|| EngineError::Exit {
                status: "truncated header".to_string(),
            })?;
        let recipient = String::from_utf8_lossy(&body[..split]);
        if !self.recipients.iter().any(|r| *r == recipient) {
            return Err(EngineError::Exit {
                status: "no secret key".to_string(),
            });
        }
        Ok(mask(&body[split + 1..]))
    }

    async fn encrypt(
        &self,
        plaintext: &[u8],
        recipient: &str,
        path: &Path,
    ) -> Result<(), EngineError> {
        if recipient.trim().is_empty() || recipient.contains('\n') {
            return Err(EngineError::Exit {
                status: "no valid recipient".to_string(),
            });
        }
        let mut out = Vec::with_capacity(MASK_HEADER.len() + recipient.len() + 1 + plaintext.len());
        out.extend_from_slice(MASK_HEADER);
        out.extend_from_slice(recipient.as_bytes());
        out.push(b'\n');
        out.extend(mask(plaintext));
        fs::write(path, out).map_err(|e| EngineError::Io(e.to_string()))
    }
}

fn mask(input: &[u8]) -> Vec<u8> {
    input.iter().map(|b| b ^ MASK_BYTE).collect()
}
