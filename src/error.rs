use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    #[error("Client setup failed: {0}")]
    ClientSetup(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Presign failed: {0}")]
    Presign(String),
}

impl BridgeError {
    /// Error code for this failure. Setup failures carry it to the host in
    /// `MethodResponse::Error`; transfer and presign failures resolve to a
    /// null result, so their codes only appear as the `code` field of the
    /// failure log line.
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::MissingArgument(_) | BridgeError::InvalidArguments(_) => "UNAVAILABLE",
            BridgeError::InvalidRegion(_) => "INVALID_REGION",
            BridgeError::ClientSetup(_) | BridgeError::Io(_) => "UPLOAD_SETUP_FAILED",
            BridgeError::Transfer(_) => "UPLOAD_FAILED",
            BridgeError::Presign(_) => "FAILED_TO_CREATE_PRESIGNED",
        }
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(BridgeError::MissingArgument("bucketName").code(), "UNAVAILABLE");
        assert_eq!(
            BridgeError::ClientSetup("bad credentials".to_string()).code(),
            "UPLOAD_SETUP_FAILED"
        );
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert_eq!(BridgeError::from(io).code(), "UPLOAD_SETUP_FAILED");
        assert_eq!(BridgeError::Transfer("reset".to_string()).code(), "UPLOAD_FAILED");
        assert_eq!(
            BridgeError::Presign("bad window".to_string()).code(),
            "FAILED_TO_CREATE_PRESIGNED"
        );
    }

    #[test]
    fn test_error_display() {
        let err = BridgeError::MissingArgument("filePath");
        assert_eq!(err.to_string(), "Missing argument: filePath");
    }
}
