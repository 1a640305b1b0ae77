//! Output-side content filters applied to assistant speech.

use serde::Serialize;

/// Topics no IFC agent may discuss.
pub const FORBIDDEN_TOPICS: &[&str] = &[
    "politics",
    "religion",
    "personal relationships",
    "medical advice",
    "legal counsel",
    "financial advice",
    "visa services",
    "immigration",
    "criticism of competitors",
    "unofficial information",
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GuardrailVerdict {
    pub tripped: bool,
    pub category: Option<String>,
    pub rationale: Option<String>,
}

impl GuardrailVerdict {
    pub fn pass() -> Self {
        Self::default()
    }

    pub fn trip(category: impl Into<String>, rationale: impl Into<String>) -> Self {
        Self {
            tripped: true,
            category: Some(category.into()),
            rationale: Some(rationale.into()),
        }
    }
}

/// A filter evaluated on each completed assistant output.
pub trait OutputGuardrail: Send + Sync {
    fn name(&self) -> &str;
    fn evaluate(&self, text: &str) -> GuardrailVerdict;
}

/// Keyword filter over a list of forbidden topics.
#[derive(Debug, Clone)]
pub struct ForbiddenTopicGuardrail {
    company: String,
    topics: Vec<String>,
}

impl ForbiddenTopicGuardrail {
    pub fn new(company: impl Into<String>, topics: &[&str]) -> Self {
        Self {
            company: company.into(),
            topics: topics.iter().map(|t| t.to_lowercase()).collect(),
        }
    }

    /// The institute's default forbidden topics.
    pub fn for_company(company: impl Into<String>) -> Self {
        Self::new(company, FORBIDDEN_TOPICS)
    }
}

impl OutputGuardrail for ForbiddenTopicGuardrail {
    fn name(&self) -> &str {
        "forbidden_topics"
    }

    fn evaluate(&self, text: &str) -> GuardrailVerdict {
        let lowered = text.to_lowercase();
        match self.topics.iter().find(|topic| lowered.contains(topic.as_str())) {
            Some(topic) => GuardrailVerdict::trip(
                "OFF_BRAND",
                format!("'{topic}' is outside what {} agents may discuss", self.company),
            ),
            None => GuardrailVerdict::pass(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_topic_trips() {
        let guardrail = ForbiddenTopicGuardrail::for_company("Institut français du Cambodge");
        let verdict = guardrail.evaluate("Let me share my view on POLITICS in France.");
        assert!(verdict.tripped);
        assert_eq!(verdict.category.as_deref(), Some("OFF_BRAND"));
        assert!(verdict.rationale.unwrap().contains("Institut français du Cambodge"));
    }

    #[test]
    fn test_regular_answer_passes() {
        let guardrail = ForbiddenTopicGuardrail::for_company("IFC");
        assert_eq!(
            guardrail.evaluate("Les cours de DELF B1 commencent en septembre."),
            GuardrailVerdict::pass()
        );
    }
}
