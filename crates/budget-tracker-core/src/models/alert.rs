//! Alert data models

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Kind of budget threshold that was crossed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlertType {
    /// At least 80% of the budget used
    #[serde(rename = "THRESHOLD_80")]
    Threshold80,
    /// Exactly 100% of the budget used
    #[serde(rename = "THRESHOLD_100")]
    Threshold100,
    /// More than 100% of the budget used
    #[serde(rename = "EXCEEDED")]
    Exceeded,
}

impl AlertType {
    /// Stored representation
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Threshold80 => "THRESHOLD_80",
            Self::Threshold100 => "THRESHOLD_100",
            Self::Exceeded => "EXCEEDED",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::Threshold80 => "80% budget reached",
            Self::Threshold100 => "Budget limit reached",
            Self::Exceeded => "Budget exceeded",
        }
    }

    /// Trigger percentage; 101 stands for "strictly above 100"
    pub fn threshold_percentage(self) -> u32 {
        match self {
            Self::Threshold80 => 80,
            Self::Threshold100 => 100,
            Self::Exceeded => 101,
        }
    }
}

impl fmt::Display for AlertType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AlertType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "THRESHOLD_80" => Ok(Self::Threshold80),
            "THRESHOLD_100" => Ok(Self::Threshold100),
            "EXCEEDED" => Ok(Self::Exceeded),
            other => Err(Error::validation(format!("Unknown alert type: {other}"))),
        }
    }
}

/// Delivery channel label attached to an alert. Nothing is dispatched here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationChannel {
    Sms,
    Email,
    Push,
    InApp,
}

impl NotificationChannel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sms => "SMS",
            Self::Email => "EMAIL",
            Self::Push => "PUSH",
            Self::InApp => "IN_APP",
        }
    }

    /// Channels attached to alerts unless configured otherwise
    pub fn defaults() -> Vec<Self> {
        vec![Self::Sms, Self::Email, Self::Push]
    }

    /// Encode as the stored comma-separated list
    pub fn join(channels: &[Self]) -> String {
        channels
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Decode a stored comma-separated list, skipping unknown labels
    pub fn parse_list(raw: &str) -> Vec<Self> {
        raw.split(',')
            .filter_map(|label| label.trim().parse().ok())
            .collect()
    }
}

impl FromStr for NotificationChannel {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "SMS" => Ok(Self::Sms),
            "EMAIL" => Ok(Self::Email),
            "PUSH" => Ok(Self::Push),
            "IN_APP" => Ok(Self::InApp),
            other => Err(Error::validation(format!(
                "Unknown notification channel: {other}"
            ))),
        }
    }
}

/// Delivery state of an alert. Moves from `Unsent` to `Sent` once and never back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryState {
    #[default]
    Unsent,
    Sent { at: DateTime<Utc> },
}

impl DeliveryState {
    /// Build from the stored `is_sent` / `sent_at` columns
    pub fn from_columns(is_sent: bool, sent_at: Option<DateTime<Utc>>) -> Self {
        match (is_sent, sent_at) {
            (true, Some(at)) => Self::Sent { at },
            _ => Self::Unsent,
        }
    }

    pub fn is_sent(self) -> bool {
        matches!(self, Self::Sent { .. })
    }

    pub fn sent_at(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Sent { at } => Some(at),
            Self::Unsent => None,
        }
    }

    /// Transition to `Sent`; an already-sent alert keeps its original timestamp
    #[must_use]
    pub fn mark_sent(self, at: DateTime<Utc>) -> Self {
        match self {
            Self::Unsent => Self::Sent { at },
            sent @ Self::Sent { .. } => sent,
        }
    }
}

/// A budget alert (threshold crossed at evaluation time)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetAlert {
    /// Unique identifier
    pub id: Uuid,

    /// The budget that triggered this alert
    pub budget_id: Uuid,

    /// Owning customer (CIF)
    pub cif_id: String,

    pub alert_type: AlertType,

    /// Spending at evaluation time
    pub current_spending: Decimal,

    /// Budget amount at evaluation time
    pub budget_limit: Decimal,

    /// Utilisation at evaluation time
    pub percentage_used: u32,

    pub category: String,

    /// Human-readable message
    pub message: String,

    pub delivery: DeliveryState,

    /// Channels the delivery collaborator should use
    pub channels: Vec<NotificationChannel>,

    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_alert_type_round_trip_and_thresholds() {
        for alert_type in [AlertType::Threshold80, AlertType::Threshold100, AlertType::Exceeded] {
            assert_eq!(alert_type.as_str().parse::<AlertType>().unwrap(), alert_type);
        }
        assert_eq!(AlertType::Exceeded.threshold_percentage(), 101);
        assert_eq!(
            serde_json::to_string(&AlertType::Threshold80).unwrap(),
            "\"THRESHOLD_80\""
        );
    }

    #[test]
    fn test_channel_list_encoding() {
        let channels = NotificationChannel::defaults();
        let stored = NotificationChannel::join(&channels);
        assert_eq!(stored, "SMS,EMAIL,PUSH");
        assert_eq!(NotificationChannel::parse_list(&stored), channels);
        assert_eq!(
            NotificationChannel::parse_list("EMAIL, FAX ,IN_APP"),
            vec![NotificationChannel::Email, NotificationChannel::InApp]
        );
    }

    #[test]
    fn test_delivery_is_one_way() {
        let first = Utc::now();
        let later = first + Duration::hours(2);

        let sent = DeliveryState::Unsent.mark_sent(first);
        assert_eq!(sent.sent_at(), Some(first));

        let resent = sent.mark_sent(later);
        assert_eq!(resent.sent_at(), Some(first));
        assert!(resent.is_sent());
    }

    #[test]
    fn test_delivery_from_columns() {
        let at = Utc::now();
        assert_eq!(DeliveryState::from_columns(true, Some(at)), DeliveryState::Sent { at });
        assert_eq!(DeliveryState::from_columns(false, Some(at)), DeliveryState::Unsent);
        assert_eq!(DeliveryState::from_columns(true, None), DeliveryState::Unsent);
    }
}
