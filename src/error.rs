use thiserror::Error;

/// Failures raised by the MCP protocol layer (transport, framing, JSON-RPC).
#[derive(Error, Debug)]
pub enum McpError {
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("MCP transport I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("MCP message encoding error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON-RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("JSON-RPC response to '{0}' is missing its result")]
    MissingResult(String),

    #[error("MCP server closed the connection")]
    ConnectionClosed,
}

#[derive(Error, Debug)]
pub enum StripeMcpError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to Stripe MCP server: {0}")]
    Connection(#[source] McpError),

    #[error("Failed to create payment link: {0}")]
    Creation(#[source] McpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, StripeMcpError>;
