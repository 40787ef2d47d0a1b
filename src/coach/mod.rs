//! AI coach
//!
//! Generates motivation messages, calorie estimates, and pattern insights
//! through an OpenRouter-compatible chat endpoint. Every call degrades to a
//! deterministic local fallback, so logging never depends on the network.

use serde_json::json;
use tracing::debug;

use crate::config::CoachConfig;

const SYSTEM_MOTIVATION: &str = "You are a tough-love junk food addiction coach. \
    Be direct, supportive, and motivating. Keep responses under 100 words. \
    Focus on getting back on track, not dwelling on the mistake.";
const SYSTEM_CALORIES: &str = "You are a nutrition expert. Estimate calories for \
    junk food items. Respond with only a number (no text).";
const SYSTEM_INSIGHT: &str = "You are a behavioral analyst. Provide a brief, \
    actionable insight about junk food patterns. Keep it under 80 words and \
    focus on actionable advice.";

/// Pattern summary handed to the coach alongside a new log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogContext {
    pub guilt_rating: u8,
    pub regret_rating: u8,
    pub recent_avg_guilt: Option<f64>,
    pub logs_this_week: u64,
}

/// Chat-completion client with local fallbacks
#[derive(Clone)]
pub struct CoachClient {
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl CoachClient {
    pub fn new(config: &CoachConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        }
    }

    /// Motivation message for a freshly logged slip, or a direct reply when
    /// the user sent the coach a message of their own
    pub fn generate_motivation(&self, ctx: &LogContext, custom_message: Option<&str>) -> String {
        let mut prompt = format!(
            "User just logged junk food with:\n\
             - Guilt rating: {}/10\n\
             - Regret rating: {}/10\n\
             - Recent average guilt: {:.1}/10\n\
             - Junk food incidents this week: {}",
            ctx.guilt_rating,
            ctx.regret_rating,
            ctx.recent_avg_guilt.unwrap_or(0.0),
            ctx.logs_this_week,
        );
        if let Some(message) = custom_message {
            prompt.push_str(&format!("\n\nUser's message: {message}"));
        }

        match self.chat(SYSTEM_MOTIVATION, &prompt, 150) {
            Some(reply) => reply,
            None => fallback_motivation(ctx.guilt_rating, ctx.regret_rating, ctx.logs_this_week),
        }
    }

    /// Calorie estimate for a free-text food description, clamped to a
    /// plausible range
    pub fn estimate_calories(&self, food_description: &str) -> i64 {
        let prompt = format!("Estimate calories for: {food_description}");
        match self.chat(SYSTEM_CALORIES, &prompt, 50) {
            Some(reply) => {
                let digits: String = reply.chars().filter(|c| c.is_ascii_digit()).collect();
                match digits.parse::<i64>() {
                    Ok(calories) => calories.clamp(50, 2000),
                    Err(_) => fallback_calories(food_description),
                }
            }
            None => fallback_calories(food_description),
        }
    }

    /// Behavioral insight over a user's recent history
    pub fn daily_insight(&self, total_logs: u64, avg_guilt: f64, avg_regret: f64) -> String {
        if total_logs == 0 {
            return "Start logging your junk food to get personalized insights about your eating patterns.".to_string();
        }

        let prompt = format!(
            "User has logged {total_logs} junk food incidents recently.\n\
             Average guilt: {avg_guilt:.1}/10\n\
             Average regret: {avg_regret:.1}/10"
        );
        match self.chat(SYSTEM_INSIGHT, &prompt, 120) {
            Some(reply) => reply,
            None => fallback_insight(total_logs, avg_guilt),
        }
    }

    /// One chat completion round trip. Returns `None` on any failure so the
    /// caller can fall back.
    fn chat(&self, system: &str, user: &str, max_tokens: u32) -> Option<String> {
        let api_key = self.api_key.as_ref()?;
        let url = format!("{}/chat/completions", self.base_url);

        let response = match ureq::post(&url)
            .set("Authorization", &format!("Bearer {api_key}"))
            .set("Content-Type", "application/json")
            .send_json(json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": system},
                    {"role": "user", "content": user},
                ],
                "max_tokens": max_tokens,
            })) {
            Ok(r) => r,
            Err(e) => {
                debug!("coach request failed: {e}");
                return None;
            }
        };

        let body: serde_json::Value = match response.into_json() {
            Ok(v) => v,
            Err(e) => {
                debug!("coach response unreadable: {e}");
                return None;
            }
        };

        body.get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// Canned motivation when no API key is configured or the call fails
pub fn fallback_motivation(guilt_rating: u8, regret_rating: u8, logs_this_week: u64) -> String {
    if guilt_rating >= 8 && regret_rating >= 8 {
        "That guilt shows you care about your health. Use this feeling as fuel - you're stronger than this craving. Start fresh right now.".to_string()
    } else if guilt_rating >= 6 {
        format!(
            "You've logged {logs_this_week} times this week. Each slip is data, not failure. What will you do differently in the next hour?"
        )
    } else if guilt_rating <= 3 {
        "Low guilt might mean you're getting comfortable with junk food again. Remember why you started this journey. Your future self is counting on you.".to_string()
    } else {
        "Every champion has setbacks. What matters is how quickly you bounce back. Your streak starts now - make the next choice count.".to_string()
    }
}

/// Keyword-table calorie estimate
pub fn fallback_calories(food_description: &str) -> i64 {
    let description = food_description.to_lowercase();
    let table: [(&[&str], i64); 8] = [
        (&["burger", "big mac", "whopper"], 550),
        (&["pizza", "slice"], 300),
        (&["fries", "chips"], 400),
        (&["soda", "coke", "pepsi"], 150),
        (&["candy", "chocolate", "bar"], 250),
        (&["ice cream", "sundae"], 350),
        (&["donut", "doughnut"], 300),
        (&["cookie", "cookies"], 200),
    ];

    for (keywords, calories) in table {
        if keywords.iter().any(|k| description.contains(k)) {
            return calories;
        }
    }
    400
}

/// Canned insight when no API key is configured or the call fails
pub fn fallback_insight(total_logs: u64, avg_guilt: f64) -> String {
    if avg_guilt >= 7.0 {
        format!(
            "High guilt levels ({avg_guilt:.1}/10) show you're aware this isn't serving you. Channel that awareness into planning alternatives for your next craving."
        )
    } else if avg_guilt <= 3.0 {
        format!(
            "Low guilt levels ({avg_guilt:.1}/10) might indicate you're becoming too comfortable with junk food. Remember your health goals and why you started tracking."
        )
    } else if total_logs >= 10 {
        format!(
            "You've logged {total_logs} incidents recently. Consider identifying your triggers - time, place, or emotions that lead to junk food choices."
        )
    } else {
        "Track more consistently to identify patterns. The more data you log, the better insights you'll get about your eating triggers.".to_string()
    }
}
