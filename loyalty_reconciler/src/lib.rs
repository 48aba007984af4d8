//! Loyalty Reconciler
//!
//! The reconciler is the background half of the loyalty points service: it periodically discovers orders that have
//! not reached a terminal status, asks the external accrual service for a verdict on each of them, and applies the
//! verdicts to the ledger. The accrual service imposes a global rate limit, so a shared [`rate_gate::RateGate`]
//! keeps every stage honest once the service starts throttling.
//!
//! The pipeline is best-effort per tick: any single order's failure (transport fault, malformed response, lost
//! store race) is contained to that order, which simply stays in the backlog for the next tick.
pub mod accrual;
pub mod config;
pub mod errors;
pub mod poller;
pub mod rate_gate;
