use crate::error::{BridgeError, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::path::PathBuf;

pub const CHANNEL: &str = "com.gertech.aws_plugin";
pub const STREAM: &str = "uploading_status";
pub const METHOD_CALL_UPLOAD: &str = "uploadToS3";
pub const METHOD_CALL_PRESIGNED: &str = "createPreSignedURL";

/// Static access-key credentials supplied with every call.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    #[serde(rename = "AWSAccess")]
    pub access_key: String,
    #[serde(rename = "AWSSecret")]
    pub secret_key: String,
}

impl Credentials {
    pub fn new(access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key: secret_key.into(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.access_key.trim().is_empty() {
            return Err(BridgeError::MissingArgument("AWSAccess"));
        }
        if self.secret_key.trim().is_empty() {
            return Err(BridgeError::MissingArgument("AWSSecret"));
        }
        Ok(())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"** redacted **")
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadRequest {
    #[serde(rename = "filePath")]
    pub file_path: PathBuf,
    #[serde(rename = "awsFolder", default)]
    pub folder: Option<String>,
    #[serde(rename = "fileNameWithExt")]
    pub file_name: String,
    #[serde(rename = "bucketName")]
    pub bucket: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(flatten)]
    pub credentials: Credentials,
}

impl UploadRequest {
    pub fn from_arguments(arguments: &Map<String, Value>) -> Result<Self> {
        let request: Self = serde_json::from_value(Value::Object(arguments.clone()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_path.as_os_str().is_empty() {
            return Err(BridgeError::MissingArgument("filePath"));
        }
        if self.file_name.is_empty() {
            return Err(BridgeError::MissingArgument("fileNameWithExt"));
        }
        if self.bucket.is_empty() {
            return Err(BridgeError::MissingArgument("bucketName"));
        }
        self.credentials.validate()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PresignRequest {
    #[serde(rename = "awsFolder", default)]
    pub folder: Option<String>,
    #[serde(rename = "fileNameWithExt")]
    pub file_name: String,
    #[serde(rename = "bucketName")]
    pub bucket: String,
    pub region: String,
    #[serde(flatten)]
    pub credentials: Credentials,
}

impl PresignRequest {
    pub fn from_arguments(arguments: &Map<String, Value>) -> Result<Self> {
        let request: Self = serde_json::from_value(Value::Object(arguments.clone()))?;
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.file_name.is_empty() {
            return Err(BridgeError::MissingArgument("fileNameWithExt"));
        }
        if self.bucket.is_empty() {
            return Err(BridgeError::MissingArgument("bucketName"));
        }
        self.credentials.validate()
    }
}

/// Lifecycle state reported by a running transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransferState {
    Waiting,
    InProgress,
    Completed,
    Failed,
}

impl TransferState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Failed)
    }
}

/// An inbound call from the host: method name plus named arguments.
#[derive(Debug, Clone, Deserialize)]
pub struct MethodCall {
    pub method: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

impl MethodCall {
    pub fn new(method: impl Into<String>, arguments: Map<String, Value>) -> Self {
        Self {
            method: method.into(),
            arguments,
        }
    }
}

/// The single reply sent back for a `MethodCall`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodResponse {
    /// Resolved with a value; `Value::Null` is the absence result.
    Success { result: Value },
    Error { code: String, message: String },
    NotImplemented,
}

impl MethodResponse {
    pub fn success(value: Option<String>) -> Self {
        MethodResponse::Success {
            result: value.map(Value::String).unwrap_or(Value::Null),
        }
    }

    pub fn error(err: &BridgeError) -> Self {
        MethodResponse::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
