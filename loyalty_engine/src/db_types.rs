use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
use lps_common::Points;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

//--------------------------------------   OrderStatusType     -------------------------------------------------------
/// The lifecycle of a local order.
///
/// `New` and `Processing` are the "unaccrued" statuses: the reconciliation worker keeps querying the accrual
/// service for them. `Processed` and `Invalid` are terminal and never transition again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatusType {
    /// The order has been uploaded and no verdict has been received yet.
    New,
    /// The accrual service knows about the order but has not finalized it.
    Processing,
    /// The accrual service finalized the order with a credit. The amount is credited exactly once.
    Processed,
    /// The accrual service rejected the order. No credit, terminal.
    Invalid,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatusType::Processed | OrderStatusType::Invalid)
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::New => write!(f, "NEW"),
            OrderStatusType::Processing => write!(f, "PROCESSING"),
            OrderStatusType::Processed => write!(f, "PROCESSED"),
            OrderStatusType::Invalid => write!(f, "INVALID"),
        }
    }
}

#[derive(Debug, Clone, Error)]
#[error("Invalid order status: {0}")]
pub struct ConversionError(String);

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NEW" => Ok(Self::New),
            "PROCESSING" => Ok(Self::Processing),
            "PROCESSED" => Ok(Self::Processed),
            "INVALID" => Ok(Self::Invalid),
            s => Err(ConversionError(s.to_string())),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to NEW");
            OrderStatusType::New
        })
    }
}

//--------------------------------------     OrderNumber       -------------------------------------------------------
/// A lightweight wrapper around the externally-assigned order number (a string of digits, globally unique).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct OrderNumber(pub String);

impl FromStr for OrderNumber {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.to_string()))
    }
}

impl From<String> for OrderNumber {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for OrderNumber {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Display for OrderNumber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl OrderNumber {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

//--------------------------------------        Order        ---------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    #[serde(skip)]
    pub id: i64,
    pub number: OrderNumber,
    #[serde(skip)]
    pub user_id: i64,
    pub status: OrderStatusType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
    #[serde(rename = "uploaded_at")]
    pub created_at: DateTime<Utc>,
}

//--------------------------------------     VerdictStatus     -------------------------------------------------------
/// The status the accrual service reports for an order. `Registered` and `Processing` are interim; an order with
/// either maps to the local `PROCESSING` status and stays in the reconciliation backlog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Registered,
    Invalid,
    Processing,
    Processed,
}

impl VerdictStatus {
    /// The order status this verdict settles the order into.
    pub fn order_status(&self) -> OrderStatusType {
        match self {
            VerdictStatus::Registered | VerdictStatus::Processing => OrderStatusType::Processing,
            VerdictStatus::Invalid => OrderStatusType::Invalid,
            VerdictStatus::Processed => OrderStatusType::Processed,
        }
    }
}

impl Display for VerdictStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VerdictStatus::Registered => write!(f, "REGISTERED"),
            VerdictStatus::Invalid => write!(f, "INVALID"),
            VerdictStatus::Processing => write!(f, "PROCESSING"),
            VerdictStatus::Processed => write!(f, "PROCESSED"),
        }
    }
}

//--------------------------------------        Verdict        -------------------------------------------------------
/// The classified result of one accrual-service lookup. Verdicts are the unit exchanged between the fetch and
/// persist stages of the reconciliation pipeline; they are never stored as their own entity.
#[derive(Debug, Clone)]
pub struct Verdict {
    pub order_id: i64,
    pub number: OrderNumber,
    pub user_id: i64,
    pub status: VerdictStatus,
    /// Present and meaningful only when `status` is `Processed`.
    pub accrual: Option<Points>,
}

impl Verdict {
    pub fn for_order(order: &Order, status: VerdictStatus, accrual: Option<Points>) -> Self {
        Self { order_id: order.id, number: order.number.clone(), user_id: order.user_id, status, accrual }
    }
}

//--------------------------------------         User          -------------------------------------------------------
/// A registered user. The password hash is opaque to the engine; hashing and session handling live in the HTTP
/// layer.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub login: String,
    pub password_hash: String,
    pub balance: Points,
    pub created_at: DateTime<Utc>,
}

//--------------------------------------       Balance         -------------------------------------------------------
/// Per-user balance aggregate: the spendable amount and the lifetime total withdrawn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Balance {
    pub current: Points,
    pub withdrawn: Points,
}

//--------------------------------------      Withdrawal       -------------------------------------------------------
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Withdrawal {
    #[serde(skip)]
    pub id: i64,
    #[serde(skip)]
    pub user_id: i64,
    /// The order the user spent the points on. A free-form token; not necessarily a local order.
    #[serde(rename = "order")]
    pub order_number: OrderNumber,
    #[serde(rename = "sum")]
    pub amount: Points,
    #[serde(rename = "processed_at")]
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod test {
    use chrono::{TimeZone, Utc};
    use lps_common::Points;

    use super::{Order, OrderNumber, OrderStatusType, VerdictStatus};

    #[test]
    fn order_statuses_round_trip_through_strings() {
        for status in
            [OrderStatusType::New, OrderStatusType::Processing, OrderStatusType::Processed, OrderStatusType::Invalid]
        {
            assert_eq!(status.to_string().parse::<OrderStatusType>().unwrap(), status);
        }
        assert!("PAID".parse::<OrderStatusType>().is_err());
    }

    #[test]
    fn terminal_statuses() {
        assert!(!OrderStatusType::New.is_terminal());
        assert!(!OrderStatusType::Processing.is_terminal());
        assert!(OrderStatusType::Processed.is_terminal());
        assert!(OrderStatusType::Invalid.is_terminal());
    }

    #[test]
    fn interim_verdicts_map_to_processing() {
        assert_eq!(VerdictStatus::Registered.order_status(), OrderStatusType::Processing);
        assert_eq!(VerdictStatus::Processing.order_status(), OrderStatusType::Processing);
        assert_eq!(VerdictStatus::Invalid.order_status(), OrderStatusType::Invalid);
        assert_eq!(VerdictStatus::Processed.order_status(), OrderStatusType::Processed);
    }

    #[test]
    fn order_json_matches_wire_format() {
        let order = Order {
            id: 7,
            number: OrderNumber::from("79927398713"),
            user_id: 1,
            status: OrderStatusType::Processed,
            accrual: Some(Points::from(50_000)),
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "number": "79927398713",
                "status": "PROCESSED",
                "accrual": 500.0,
                "uploaded_at": "2024-06-01T12:00:00Z"
            })
        );

        let unaccrued = Order { status: OrderStatusType::New, accrual: None, ..order };
        let json = serde_json::to_value(&unaccrued).unwrap();
        assert!(json.get("accrual").is_none());
    }
}
