use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TenderWatchError;
use crate::keywords;

// --- Sources ---

/// Which upstream repositories a subscriber wants searched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceSelection {
    Czech,
    Eu,
    Both,
}

impl SourceSelection {
    pub fn includes_czech(&self) -> bool {
        matches!(self, SourceSelection::Czech | SourceSelection::Both)
    }

    pub fn includes_eu(&self) -> bool {
        matches!(self, SourceSelection::Eu | SourceSelection::Both)
    }

    pub fn includes(&self, kind: SourceKind) -> bool {
        match kind {
            SourceKind::Czech => self.includes_czech(),
            SourceKind::Eu => self.includes_eu(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    Czech,
    Eu,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::Czech => write!(f, "Česká republika"),
            SourceKind::Eu => write!(f, "Evropská unie"),
        }
    }
}

// --- Task input ---

fn default_max_results() -> usize {
    25
}

/// One subscriber task as delivered by the external scheduler/queue.
///
/// The pipeline treats this as opaque validated input; anything missing a
/// relevance signal (keywords or company description) is rejected before
/// any network call happens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriberTask {
    pub subscriber_id: String,
    pub email: String,
    pub source_selection: SourceSelection,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub company_description: String,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification_frequency: Option<String>,
}

impl SubscriberTask {
    /// Keywords after separator normalization, dedup and the abuse cap.
    /// The queue sometimes delivers one combined preference string instead
    /// of a pre-split list; joining first makes both shapes equivalent.
    pub fn normalized_keywords(&self) -> Vec<String> {
        keywords::split_preference(&self.keywords.join(","))
    }

    pub fn validate(&self) -> Result<(), TenderWatchError> {
        if self.subscriber_id.trim().is_empty() {
            return Err(TenderWatchError::InvalidTask(
                "subscriber_id is required".into(),
            ));
        }
        if self.email.trim().is_empty() || !self.email.contains('@') {
            return Err(TenderWatchError::InvalidTask(format!(
                "not a deliverable email address: {:?}",
                self.email
            )));
        }
        if self.normalized_keywords().is_empty() && self.company_description.trim().is_empty() {
            return Err(TenderWatchError::InvalidTask(
                "no relevance signal: keywords and company_description both empty".into(),
            ));
        }
        if self.max_results == 0 {
            return Err(TenderWatchError::InvalidTask(
                "max_results must be positive".into(),
            ));
        }
        Ok(())
    }
}

// --- Tender records ---

/// One raw procurement notice as normalized by a source client.
/// `external_id` is unique within its source for a single run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenderNotice {
    pub external_id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    pub source_url: String,
    pub source: SourceKind,
}

/// A notice the relevance judge accepted, ready for the digest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredTender {
    pub notice: TenderNotice,
    /// Judge confidence in [0, 1]; drives digest ordering.
    pub strength: f32,
    pub rationale: String,
}

// --- Digest ---

/// The composed per-cycle message. Built once, sent once, then discarded.
#[derive(Debug, Clone)]
pub struct DigestMessage {
    pub recipient_email: String,
    pub subject: String,
    pub html_body: String,
    pub text_body: String,
    /// Stable per-subscriber unsubscribe URL.
    pub unsubscribe_ref: String,
    pub items: Vec<ScoredTender>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task() -> SubscriberTask {
        SubscriberTask {
            subscriber_id: "42".into(),
            email: "firma@example.cz".into(),
            source_selection: SourceSelection::Both,
            keywords: vec!["IT služby".into()],
            company_description: String::new(),
            max_results: 25,
            notification_frequency: None,
        }
    }

    #[test]
    fn valid_task_passes() {
        assert!(task().validate().is_ok());
    }

    #[test]
    fn task_without_any_relevance_signal_is_invalid() {
        let mut t = task();
        t.keywords.clear();
        t.company_description = "  ".into();
        let err = t.validate().unwrap_err();
        assert!(matches!(err, TenderWatchError::InvalidTask(_)));
    }

    #[test]
    fn description_alone_is_a_sufficient_signal() {
        let mut t = task();
        t.keywords.clear();
        t.company_description = "Vývoj software na zakázku".into();
        assert!(t.validate().is_ok());
    }

    #[test]
    fn bad_email_is_invalid() {
        let mut t = task();
        t.email = "not-an-address".into();
        assert!(t.validate().is_err());
    }

    #[test]
    fn selection_includes() {
        assert!(SourceSelection::Both.includes_czech());
        assert!(SourceSelection::Both.includes_eu());
        assert!(SourceSelection::Czech.includes_czech());
        assert!(!SourceSelection::Czech.includes_eu());
        assert!(SourceSelection::Eu.includes(SourceKind::Eu));
    }

    #[test]
    fn task_deserializes_with_defaults() {
        let t: SubscriberTask = serde_json::from_str(
            r#"{
                "subscriber_id": "7",
                "email": "a@b.cz",
                "source_selection": "eu",
                "company_description": "stavební firma"
            }"#,
        )
        .unwrap();
        assert_eq!(t.max_results, 25);
        assert!(t.keywords.is_empty());
        assert!(t.validate().is_ok());
    }
}
