mod errors;
mod ledger_api;

pub use errors::LedgerApiError;
pub use ledger_api::{LedgerApi, OrderUploadStatus};
