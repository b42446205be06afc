//! Centralized Error Handling Module
//!
//! Every failure carries a unique code so degraded analyzers and failed
//! requests can be told apart in logs and API responses.
//!
//! Error codes follow pattern: CATEGORY_SPECIFIC_ERROR
//! - INPUT_xxx / MALFORMED_xxx / INVARIANT_xxx: recovered per analyzer
//! - REQUEST_xxx: whole-request failures (retryable)
//! - RPC_xxx / EXPLORER_xxx: collaborator failures
//! - API_xxx / CFG_xxx: surface and configuration errors

use std::fmt;

/// Application-wide error type
#[derive(Debug)]
pub struct AppError {
    /// Unique error code for logging/monitoring
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Optional underlying error
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new AppError
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Create AppError with source error
    pub fn with_source(
        code: ErrorCode,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            code,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Get error code as string (for logging)
    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn std::error::Error + 'static))
    }
}

/// Unique error codes for monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // ============================================
    // Analyzer Input Errors (absorbed per analyzer)
    // ============================================
    /// A collaborator returned no usable data
    InputUnavailable,
    /// Collaborator data could not be parsed
    MalformedInput,
    /// A computation precondition failed (e.g. zero total supply)
    InvariantViolation,
    /// Contract source is not verified on the explorer
    ContractNotVerified,

    // ============================================
    // Request Errors (fail the whole check)
    // ============================================
    /// Global request deadline elapsed
    RequestTimeout,
    /// Request was cancelled before completion
    RequestCancelled,

    // ============================================
    // Collaborator Errors
    // ============================================
    /// RPC connection failed
    RpcConnectionFailed,
    /// RPC returned error response
    RpcError,
    /// No RPC endpoint configured for the chain
    RpcNoEndpoints,
    /// Explorer API returned an error status
    ExplorerError,
    /// DexScreener API error
    DexScreenerError,
    /// A single external call exceeded its timeout
    ExternalTimeout,

    // ============================================
    // API Errors
    // ============================================
    /// Invalid request format
    ApiBadRequest,
    /// Unauthorized (invalid API key)
    ApiUnauthorized,
    /// Rate limit exceeded
    ApiRateLimited,
    /// Internal server error
    ApiInternalError,

    // ============================================
    // Configuration Errors
    // ============================================
    /// Invalid configuration value
    ConfigInvalidValue,
    /// Unsupported chain ID
    ConfigUnsupportedChain,
    /// Missing API key
    ConfigMissingApiKey,

    // ============================================
    // Token Errors
    // ============================================
    /// Invalid token address
    TokenInvalidAddress,

    /// Unknown error
    Unknown,
}

impl ErrorCode {
    /// Get string representation of error code
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InputUnavailable => "INPUT_UNAVAILABLE",
            Self::MalformedInput => "MALFORMED_INPUT",
            Self::InvariantViolation => "INVARIANT_VIOLATION",
            Self::ContractNotVerified => "CONTRACT_NOT_VERIFIED",

            Self::RequestTimeout => "REQUEST_TIMEOUT",
            Self::RequestCancelled => "REQUEST_CANCELLED",

            Self::RpcConnectionFailed => "RPC_CONNECTION_FAILED",
            Self::RpcError => "RPC_ERROR",
            Self::RpcNoEndpoints => "RPC_NO_ENDPOINTS",
            Self::ExplorerError => "EXPLORER_ERROR",
            Self::DexScreenerError => "DEXSCREENER_ERROR",
            Self::ExternalTimeout => "EXTERNAL_TIMEOUT",

            Self::ApiBadRequest => "API_BAD_REQUEST",
            Self::ApiUnauthorized => "API_UNAUTHORIZED",
            Self::ApiRateLimited => "API_RATE_LIMITED",
            Self::ApiInternalError => "API_INTERNAL_ERROR",

            Self::ConfigInvalidValue => "CFG_INVALID_VALUE",
            Self::ConfigUnsupportedChain => "CFG_UNSUPPORTED_CHAIN",
            Self::ConfigMissingApiKey => "CFG_MISSING_API_KEY",

            Self::TokenInvalidAddress => "TOKEN_INVALID_ADDRESS",

            Self::Unknown => "UNKNOWN_ERROR",
        }
    }

    /// Get HTTP status code for API responses
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ApiBadRequest
            | Self::TokenInvalidAddress
            | Self::ConfigInvalidValue
            | Self::ConfigUnsupportedChain => 400,
            Self::ApiUnauthorized => 401,
            Self::ContractNotVerified => 404,
            Self::ApiRateLimited => 429,
            Self::RequestCancelled => 499,
            Self::RequestTimeout | Self::ExternalTimeout => 504,
            _ => 500,
        }
    }

    /// Check if error is retryable
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RequestTimeout
                | Self::RequestCancelled
                | Self::ExternalTimeout
                | Self::RpcConnectionFailed
                | Self::DexScreenerError
                | Self::ApiRateLimited
        )
    }
}

// ============================================
// Convenience constructors
// ============================================

impl AppError {
    /// Collaborator returned nothing usable
    pub fn input_unavailable(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InputUnavailable, msg)
    }

    /// Collaborator data could not be parsed
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::MalformedInput, msg)
    }

    /// Computation precondition failed
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvariantViolation, msg)
    }

    /// Source not verified
    pub fn not_verified(address: &str) -> Self {
        Self::new(
            ErrorCode::ContractNotVerified,
            format!("Source code for {} is not verified", address),
        )
    }

    /// Single external call timed out
    pub fn external_timeout(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExternalTimeout, msg)
    }

    /// Whole request exceeded its deadline
    pub fn request_timeout(deadline_ms: u128) -> Self {
        Self::new(
            ErrorCode::RequestTimeout,
            format!("Risk check did not finish within {}ms", deadline_ms),
        )
    }

    /// Whole request was cancelled
    pub fn request_cancelled(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::RequestCancelled, msg)
    }

    /// Explorer API error
    pub fn explorer_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ExplorerError, msg)
    }

    /// DexScreener error
    pub fn dexscreener_error(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::DexScreenerError, msg)
    }

    /// Invalid token address
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::TokenInvalidAddress, msg)
    }

    /// Unsupported chain
    pub fn unsupported_chain(chain_id: u64) -> Self {
        Self::new(
            ErrorCode::ConfigUnsupportedChain,
            format!("Unsupported chain_id: {}", chain_id),
        )
    }

    /// Missing API key
    pub fn missing_api_key(key_name: &str) -> Self {
        Self::new(
            ErrorCode::ConfigMissingApiKey,
            format!("Missing API key: {}", key_name),
        )
    }

    /// Invalid configuration value
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalidValue, msg)
    }

    /// API bad request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiBadRequest, msg)
    }

    /// API internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(ErrorCode::ApiInternalError, msg)
    }
}

// ============================================
// Result type alias
// ============================================

/// Application Result type
pub type AppResult<T> = Result<T, AppError>;

// ============================================
// Conversion from common error types
// ============================================

impl From<eyre::Report> for AppError {
    fn from(err: eyre::Report) -> Self {
        Self::new(ErrorCode::Unknown, err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorCode::Unknown, "IO error", err)
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new(ErrorCode::ExternalTimeout, "Request timeout")
        } else if err.is_connect() {
            Self::new(ErrorCode::RpcConnectionFailed, "Connection failed")
        } else {
            Self::new(ErrorCode::Unknown, err.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(ErrorCode::MalformedInput, "JSON parse error", err)
    }
}
