//! Motivational-insight domain logic.
//!
//! Builds a compact summary of the user's habit history and asks a
//! hosted text model for a short coaching line. The model sits behind
//! the [`InsightModel`] trait; failures never propagate to the caller,
//! who always gets a usable line of text back.

use anyhow::{Context, Result};
use log::{info, warn};
use serde::Serialize;
use serde_json::Value;

use crate::domain::commands::insight::GenerateInsightsResult;
use crate::domain::models::habit::Habit as DomainHabit;

/// Reply used when the model call fails.
const FALLBACK_INSIGHT: &str = "Unable to generate insights at this moment. Keep tracking!";

/// Reply used when the model answers with empty text.
const EMPTY_REPLY_INSIGHT: &str = "Keep going! Consistency is key.";

/// How many recent log keys are sent per habit.
const RECENT_HISTORY_LEN: usize = 14;

/// Trait for the hosted text-generation collaborator.
pub trait InsightModel: Send + Sync {
    /// Generate a short text for the given prompt
    fn generate_text(&self, prompt: &str) -> Result<String>;
}

/// Gemini-backed implementation of [`InsightModel`].
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: String,
    model: String,
}

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

impl GeminiClient {
    pub const DEFAULT_MODEL: &'static str = "gemini-flash-latest";

    /// Create a client for the default model
    pub fn new(api_key: impl Into<String>) -> Self {
        Self::with_model(api_key, Self::DEFAULT_MODEL)
    }

    /// Create a client for a specific model
    pub fn with_model(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            http: reqwest::blocking::Client::new(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }
}

impl InsightModel for GeminiClient {
    fn generate_text(&self, prompt: &str) -> Result<String> {
        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
        });

        let response: Value = self
            .http
            .post(url)
            .json(&body)
            .send()
            .context("Text generation request failed")?
            .error_for_status()
            .context("Text generation request was rejected")?
            .json()
            .context("Text generation returned invalid JSON")?;

        let text = response
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|c| c.pointer("/content/parts/0/text"))
            .and_then(|t| t.as_str())
            .unwrap_or("")
            .trim()
            .to_string();

        Ok(text)
    }
}

/// Per-habit summary sent to the model. Kept small on purpose: totals,
/// the last active period, and a short tail of recent history.
#[derive(Debug, Clone, Serialize)]
pub struct HabitSummary {
    pub name: String,
    pub total_completions: usize,
    pub last_active: String,
    pub recent_history: Vec<String>,
}

/// Insight service that summarizes habits and asks the model for a
/// short coaching line.
#[derive(Clone)]
pub struct InsightService;

impl InsightService {
    /// Create a new InsightService instance
    pub fn new() -> Self {
        Self
    }

    /// Summarize habits for the model
    pub fn summarize(&self, habits: &[DomainHabit]) -> Vec<HabitSummary> {
        habits
            .iter()
            .map(|habit| {
                // BTreeSet iteration is already sorted by key.
                let keys: Vec<&String> = habit.logs.iter().collect();
                let last_active = keys
                    .last()
                    .map(|key| key.to_string())
                    .unwrap_or_else(|| "Never".to_string());
                let recent_history = keys
                    .iter()
                    .rev()
                    .take(RECENT_HISTORY_LEN)
                    .rev()
                    .map(|key| key.to_string())
                    .collect();

                HabitSummary {
                    name: habit.name.clone(),
                    total_completions: habit.logs.len(),
                    last_active,
                    recent_history,
                }
            })
            .collect()
    }

    /// Build the coach prompt for a set of summaries
    fn build_prompt(&self, summaries: &[HabitSummary]) -> Result<String> {
        let data = serde_json::to_string(summaries).context("Failed to serialize summaries")?;

        Ok(format!(
            "You are a supportive and analytical habit coach. \
             Analyze the following user habit data: {}. \
             Provide a concise summary (max 3 sentences) acknowledging their \
             consistency or offering a gentle specific tip to improve. \
             Focus on patterns. If they are doing well, celebrate it. If they \
             are struggling, suggest a small actionable step. \
             Do not use markdown formatting like bolding or headers. \
             Keep it conversational.",
            data
        ))
    }

    /// Ask the model for a motivational summary.
    ///
    /// Model failures and empty replies degrade to canned text; the
    /// caller can tell the difference through `generated`.
    pub fn generate_insights(
        &self,
        model: &dyn InsightModel,
        habits: &[DomainHabit],
    ) -> Result<GenerateInsightsResult> {
        info!("Generating insights over {} habits", habits.len());

        let summaries = self.summarize(habits);
        let prompt = self.build_prompt(&summaries)?;

        match model.generate_text(&prompt) {
            Ok(text) if !text.trim().is_empty() => {
                info!("Insight generated ({} chars)", text.trim().len());
                Ok(GenerateInsightsResult {
                    text: text.trim().to_string(),
                    generated: true,
                })
            }
            Ok(_) => {
                warn!("Insight model returned empty text");
                Ok(GenerateInsightsResult {
                    text: EMPTY_REPLY_INSIGHT.to_string(),
                    generated: false,
                })
            }
            Err(e) => {
                warn!("Insight model call failed: {:#}", e);
                Ok(GenerateInsightsResult {
                    text: FALLBACK_INSIGHT.to_string(),
                    generated: false,
                })
            }
        }
    }
}

impl Default for InsightService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::habit::{HabitColor, HabitFrequency};
    use chrono::Utc;
    use std::collections::BTreeSet;

    struct FakeModel {
        reply: Result<String>,
    }

    impl InsightModel for FakeModel {
        fn generate_text(&self, prompt: &str) -> Result<String> {
            assert!(prompt.contains("habit coach"));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(e) => Err(anyhow::anyhow!("{}", e)),
            }
        }
    }

    fn habit_with_keys(name: &str, keys: &[&str]) -> DomainHabit {
        DomainHabit {
            id: format!("habit::{}", name),
            name: name.to_string(),
            color: HabitColor::Green,
            frequency: HabitFrequency::Daily,
            created_at: Utc::now(),
            logs: keys.iter().map(|k| k.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    #[test]
    fn test_summarize_reports_totals_and_last_active() {
        let service = InsightService::new();
        let habits = vec![
            habit_with_keys("Exercise", &["2024-03-10", "2024-03-12", "2024-03-11"]),
            habit_with_keys("Read", &[]),
        ];

        let summaries = service.summarize(&habits);

        assert_eq!(summaries[0].total_completions, 3);
        assert_eq!(summaries[0].last_active, "2024-03-12");
        assert_eq!(
            summaries[0].recent_history,
            vec!["2024-03-10", "2024-03-11", "2024-03-12"]
        );
        assert_eq!(summaries[1].total_completions, 0);
        assert_eq!(summaries[1].last_active, "Never");
        assert!(summaries[1].recent_history.is_empty());
    }

    #[test]
    fn test_summarize_caps_recent_history() {
        let service = InsightService::new();
        let keys: Vec<String> = (1..=20).map(|d| format!("2024-03-{:02}", d)).collect();
        let key_refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let habits = vec![habit_with_keys("Exercise", &key_refs)];

        let summaries = service.summarize(&habits);

        assert_eq!(summaries[0].recent_history.len(), 14);
        // The newest keys survive, in chronological order.
        assert_eq!(summaries[0].recent_history[0], "2024-03-07");
        assert_eq!(summaries[0].recent_history[13], "2024-03-20");
    }

    #[test]
    fn test_generate_insights_returns_model_text() {
        let service = InsightService::new();
        let model = FakeModel {
            reply: Ok("  Nice streak on Exercise!  ".to_string()),
        };

        let result = service
            .generate_insights(&model, &[habit_with_keys("Exercise", &["2024-03-11"])])
            .unwrap();

        assert!(result.generated);
        assert_eq!(result.text, "Nice streak on Exercise!");
    }

    #[test]
    fn test_generate_insights_falls_back_on_error() {
        let service = InsightService::new();
        let model = FakeModel {
            reply: Err(anyhow::anyhow!("network down")),
        };

        let result = service.generate_insights(&model, &[]).unwrap();

        assert!(!result.generated);
        assert_eq!(result.text, FALLBACK_INSIGHT);
    }

    #[test]
    fn test_generate_insights_falls_back_on_empty_reply() {
        let service = InsightService::new();
        let model = FakeModel {
            reply: Ok("   ".to_string()),
        };

        let result = service.generate_insights(&model, &[]).unwrap();

        assert!(!result.generated);
        assert_eq!(result.text, EMPTY_REPLY_INSIGHT);
    }
}
