use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZabbixError>;

#[derive(Debug, Error)]
pub enum ZabbixError {
    #[error("Zabbix authentication failed: {0}")]
    Authentication(String),

    #[error("Invalid desired state: {0}")]
    Validation(String),

    #[error("{count} {object_type} objects match '{key}', expected at most one")]
    AmbiguousMatch {
        object_type: String,
        key: String,
        count: usize,
    },

    #[error("Zabbix API error {code}: {detail}")]
    RemoteApi { code: i64, detail: String },

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Unexpected Zabbix response: {0}")]
    UnexpectedResponse(String),
}

impl ZabbixError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ZabbixError::Validation(msg.into())
    }
}
