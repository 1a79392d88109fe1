use mindcare_schema::{DomainSnapshot, Insights};
use serde::Deserialize;

use crate::InsightError;

fn subject(snapshot: &DomainSnapshot) -> &'static str {
    match snapshot {
        DomainSnapshot::Mood(_) => "mood tracking",
        DomainSnapshot::Health(_) => "health measurement",
        DomainSnapshot::Chat(_) => "support chatbot usage",
    }
}

/// Prompt asking for a JSON `{summary, recommendations}` reply about one
/// snapshot. Rule-based observations are included so the model builds on them.
pub fn build_prompt(snapshot: &DomainSnapshot, baseline: &Insights) -> String {
    let data = serde_json::to_string_pretty(snapshot).unwrap_or_default();
    let mut prompt = format!(
        "You are assisting a mental-health care team. Analyze the following {} statistics \
         and describe what they suggest about the person's wellbeing.\n\nStatistics:\n{data}\n",
        subject(snapshot)
    );

    if !baseline.observations.is_empty() {
        prompt.push_str("\nAlready observed:\n");
        for obs in &baseline.observations {
            prompt.push_str("- ");
            prompt.push_str(obs);
            prompt.push('\n');
        }
    }

    prompt.push_str(
        "\nRespond with JSON only, in the form \
         {\"summary\": \"...\", \"recommendations\": [\"...\"]}. \
         Keep the summary under three sentences, be supportive, and do not diagnose.",
    );
    prompt
}

/// Structured reply extracted from model output.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Completion {
    pub summary: String,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Parse model output. A JSON object anywhere in the text is preferred;
/// otherwise the trimmed text is the summary.
pub fn parse_completion(text: &str) -> Result<Completion, InsightError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(InsightError::Malformed("empty completion".to_string()));
    }

    if let (Some(start), Some(end)) = (text.find('{'), text.rfind('}')) {
        if start < end {
            if let Ok(parsed) = serde_json::from_str::<Completion>(&text[start..=end]) {
                if !parsed.summary.trim().is_empty() {
                    return Ok(parsed);
                }
            }
        }
    }

    Ok(Completion {
        summary: text.to_string(),
        recommendations: Vec::new(),
    })
}
