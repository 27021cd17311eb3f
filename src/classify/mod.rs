//! Page classification boundary
//!
//! The crawl core hands capsules to a [`Classifier`] and records the result.
//! Every [`ClassifierError`] means "classification unavailable": the URL's
//! classification stays unset and the crawl carries on.

mod command;

pub use command::{build_prompt, parse_classification, CommandClassifier};

use crate::capsule::Capsule;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Page categories a classifier may assign
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageType {
    JobPosting,
    Listing,
    CareersHub,
    ApplicationForm,
    Article,
    Irrelevant,
    Blocked,
}

impl PageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JobPosting => "job_posting",
            Self::Listing => "listing",
            Self::CareersHub => "careers_hub",
            Self::ApplicationForm => "application_form",
            Self::Article => "article",
            Self::Irrelevant => "irrelevant",
            Self::Blocked => "blocked",
        }
    }

    /// Parses the snake_case name; unknown names give None
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|t| t.as_str() == name)
    }

    pub fn all() -> [Self; 7] {
        [
            Self::JobPosting,
            Self::Listing,
            Self::CareersHub,
            Self::ApplicationForm,
            Self::Article,
            Self::Irrelevant,
            Self::Blocked,
        ]
    }
}

impl fmt::Display for PageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the classifier may consult web search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ClassifyMode {
    #[default]
    Plain,
    SearchAugmented,
}

/// Structured classifier answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub page_type: PageType,

    /// Confidence in `[0.0, 1.0]`
    pub confidence: f64,

    /// Free-form posting details, populated for job postings only
    #[serde(default)]
    pub fields: Value,
}

impl Classification {
    /// Checks the answer against the documented ranges
    pub fn validate(self) -> Result<Self, ClassifierError> {
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(ClassifierError::Malformed(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }

        match self.fields {
            Value::Object(_) => Ok(self),
            Value::Null => Ok(Self {
                fields: Value::Object(Default::default()),
                ..self
            }),
            _ => Err(ClassifierError::Malformed(
                "fields must be an object".to_string(),
            )),
        }
    }
}

/// Ways a classification can be unavailable
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifierError {
    #[error("classifier unavailable: {0}")]
    Unavailable(String),

    #[error("classifier timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed classifier response: {0}")]
    Malformed(String),
}

/// Capability that labels a capsule
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(
        &self,
        capsule: &Capsule,
        mode: ClassifyMode,
    ) -> Result<Classification, ClassifierError>;
}
