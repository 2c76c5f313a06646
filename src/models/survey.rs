// src/models/survey.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::status::{status_names, StatusMachine};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "survey_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SurveyStatus {
    Pending,
    Sent,
    AwaitingFeedback,
    Responded,
    Failed,
    Expired,
    Cancelled,
    NotSent,
}

status_names!(SurveyStatus {
    Pending => "pending",
    Sent => "sent",
    AwaitingFeedback => "awaiting_feedback",
    Responded => "responded",
    Failed => "failed",
    Expired => "expired",
    Cancelled => "cancelled",
    NotSent => "not_sent",
});

impl StatusMachine for SurveyStatus {
    const ENTITY: &'static str = "satisfaction_survey";

    fn allows(self, next: Self) -> bool {
        use SurveyStatus::*;
        match self {
            Pending => matches!(next, Sent | Failed | NotSent | Cancelled),
            Sent => matches!(next, AwaitingFeedback | Expired | Cancelled),
            AwaitingFeedback => matches!(next, Responded | Expired),
            // Reenvio de pesquisas que não chegaram
            Failed | NotSent => matches!(next, Sent | Failed | Cancelled),
            Responded | Expired | Cancelled => false,
        }
    }
}

impl SurveyStatus {
    pub fn can_resend(&self) -> bool {
        matches!(self, SurveyStatus::Pending | SurveyStatus::Failed | SurveyStatus::NotSent)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct SatisfactionSurvey {
    pub id: Uuid,
    pub campaign_send_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub driver_name: Option<String>,
    pub status: SurveyStatus,
    pub rating: Option<i16>,
    pub feedback: Option<String>,
    pub error_message: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSurvey {
    pub campaign_send_id: Uuid,
    pub customer_name: String,
    pub customer_phone: String,
    pub driver_name: Option<String>,
}

/// Nota de 1 a 5 enviada como um único dígito.
pub fn parse_rating(text: &str) -> Option<i16> {
    let text = text.trim();
    match text.as_bytes() {
        [digit @ b'1'..=b'5'] => Some(i16::from(digit - b'0')),
        _ => None,
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendSurveysRequest {
    pub campaign_send_ids: Option<Vec<Uuid>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpireSurveysRequest {
    pub max_age_hours: Option<i64>,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SurveySendReport {
    pub surveys_sent: u32,
    pub new_surveys: u32,
    pub resent_surveys: u32,
    pub failed_surveys: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_is_a_single_digit_between_one_and_five() {
        assert_eq!(parse_rating("4"), Some(4));
        assert_eq!(parse_rating(" 5 "), Some(5));
        assert_eq!(parse_rating("0"), None);
        assert_eq!(parse_rating("6"), None);
        assert_eq!(parse_rating("45"), None);
        assert_eq!(parse_rating("nota 4"), None);
        assert_eq!(parse_rating(""), None);
    }

    #[test]
    fn survey_lifecycle() {
        use SurveyStatus::*;
        assert!(Pending.transition(Sent).is_ok());
        assert!(Sent.transition(AwaitingFeedback).is_ok());
        assert!(AwaitingFeedback.transition(Responded).is_ok());
        assert!(Failed.transition(Sent).is_ok());
        assert!(Responded.transition(Sent).is_err());
        assert!(Sent.transition(Responded).is_err());
        assert!(Cancelled.transition(Pending).is_err());
    }
}
