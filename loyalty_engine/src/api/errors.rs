use lps_common::Points;
use thiserror::Error;

use crate::traits::LedgerError;

#[derive(Debug, Clone, Error)]
pub enum LedgerApiError {
    #[error("Order number {0} fails the Luhn check")]
    InvalidOrderNumber(String),
    #[error("Withdrawal amount {0} must be positive")]
    InvalidAmount(Points),
    #[error(transparent)]
    LedgerError(#[from] LedgerError),
}
