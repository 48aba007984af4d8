use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AccrualClientError {
    #[error("Could not initialize the accrual client. {0}")]
    Initialization(String),
    #[error("Transport error calling the accrual service. {0}")]
    Transport(String),
    #[error("Could not decode the accrual service response. {0}")]
    InvalidResponse(String),
    #[error("The accrual service returned unexpected status code {0}")]
    UnexpectedStatus(u16),
}
