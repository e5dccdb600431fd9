// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Prompt templates and the pure functions that fill them in.
//!
//! Placeholders use `{name}` syntax and are substituted in a single pass, so
//! user-supplied values that happen to contain braces are never re-expanded.

use crate::models::{HealthMetrics, OnboardingTurn, UserRecord};

/// System message for summary generation.
pub const COACH_SYSTEM_PROMPT: &str = "You are a wellness and health coach, an expert at \
interpreting health data and motivating people.";

/// System message for profile extraction.
pub const EXTRACTION_SYSTEM_PROMPT: &str = "You are a data extractor. Return only valid JSON.";

const NOT_PROVIDED: &str = "not provided";

const GENERIC_SUMMARY_TEMPLATE: &str = "\
Analyze the following health data from a user and write a short, motivational and friendly \
summary in {language}.

Summary rules:
- Open with a positive, energetic greeting.
- Celebrate goals that were reached (calories, exercise time).
- Comment on sleep quality, highlighting positives such as duration.
- If a metric looks low (such as steps or distance), frame it gently as a challenge or a \
suggestion for tomorrow, never as criticism.
- Close with an encouraging sentence.
- Sound like a motivational coach, not a medical report.

User data:
{metrics}";

const PERSONALIZED_SUMMARY_TEMPLATE: &str = "\
Analyze the health data of {name} and write a personalized summary in {language}.

User profile:
- Name: {name}
- Age: {age}
- Profession: {profession}
- Preferred exercise: {exercise_preferences}
- Goals: {health_goals}

Health data:
{metrics}

Instructions:
- Greet the user by name
- Reference their preferred exercise when relevant
- Connect the data to their personal goals when possible
- Keep a {communication_style} tone
- Be specific and personal
- At most 200 words";

const EXTRACTION_TEMPLATE: &str = "\
Analyze the following onboarding conversation and extract the user's information as JSON.

{transcript}
Return ONLY a valid JSON object with this structure:
{
  \"age\": number or null,
  \"profession\": string or null,
  \"work_schedule\": string or null,
  \"sleep_time\": string or null,
  \"exercise_preferences\": [list of preferred exercises],
  \"exercise_frequency\": string or null,
  \"health_goals\": [list of health goals],
  \"lifestyle\": short description or null
}";

/// One fixed step of the onboarding dialogue.
#[derive(Debug, PartialEq, Eq)]
pub struct OnboardingStep {
    pub number: u8,
    pub topic: &'static str,
    template: &'static str,
}

/// Number of steps in the onboarding script.
pub const ONBOARDING_STEPS: i64 = 5;

/// The onboarding script, in order. Lookups outside 1..=5 use the first entry.
pub const ONBOARDING_SCRIPT: [OnboardingStep; 5] = [
    OnboardingStep {
        number: 1,
        topic: "age_and_profession",
        template: "You are a wellness coach named Ana. Start a warm conversation with {name} to \
get to know them better. Ask about their age and profession in a natural, friendly way. Be \
empathetic and motivating. Keep the reply short (two sentences at most). Reply in {language}.",
    },
    OnboardingStep {
        number: 2,
        topic: "work_routine",
        template: "Continue the conversation with {name}. Now ask about their work routine and \
schedule. Be curious about how work affects their well-being. Keep the reply short and \
conversational. Reply in {language}.",
    },
    OnboardingStep {
        number: 3,
        topic: "exercise",
        template: "Now ask {name} about exercise: which kinds they enjoy, how often they train, \
and their preferred times. Be encouraging whatever the answer. Keep the reply short. Reply in \
{language}.",
    },
    OnboardingStep {
        number: 4,
        topic: "sleep",
        template: "Ask {name} about sleep habits: what time they usually go to bed, how well they \
sleep, and whether they have a bedtime routine. Be understanding. Keep the reply short. Reply in \
{language}.",
    },
    OnboardingStep {
        number: 5,
        topic: "health_goals",
        template: "Finish by asking {name} about their health and wellness goals. What would they \
like to improve? Close with a motivating message about the journey you are starting together. \
Keep the reply short. Reply in {language}.",
    },
];

/// Look up a step by its 1-based number, clamping unknown values to step 1.
pub fn onboarding_step(step: i64) -> &'static OnboardingStep {
    usize::try_from(step)
        .ok()
        .and_then(|n| n.checked_sub(1))
        .and_then(|index| ONBOARDING_SCRIPT.get(index))
        .unwrap_or(&ONBOARDING_SCRIPT[0])
}

/// System prompt for one onboarding turn.
pub fn build_onboarding_prompt(step: i64, name: &str, language: &str) -> String {
    render(
        onboarding_step(step).template,
        &[("name", name), ("language", language)],
    )
}

/// Profile fields that personalize a summary.
#[derive(Debug, Clone, PartialEq)]
pub struct CoachingProfile {
    pub name: String,
    pub age: Option<u32>,
    pub profession: Option<String>,
    pub exercise_preferences: Vec<String>,
    pub health_goals: Vec<String>,
    pub communication_style: String,
}

impl From<&UserRecord> for CoachingProfile {
    fn from(user: &UserRecord) -> Self {
        Self {
            name: user.personal_info.name.clone(),
            age: user.profile.age,
            profession: user.profile.profession.clone(),
            exercise_preferences: user.profile.exercise_preferences.clone(),
            health_goals: user.profile.health_goals.clone(),
            communication_style: user.preferences.communication_style.clone(),
        }
    }
}

/// User prompt for a summary: personalized when a profile is known, generic otherwise.
pub fn build_summary_prompt(
    metrics: &HealthMetrics,
    profile: Option<&CoachingProfile>,
    language: &str,
) -> String {
    let metrics = render_metrics(metrics);

    let Some(profile) = profile else {
        return render(
            GENERIC_SUMMARY_TEMPLATE,
            &[("language", language), ("metrics", metrics.as_str())],
        );
    };

    let age = profile
        .age
        .map(|a| a.to_string())
        .unwrap_or_else(|| NOT_PROVIDED.to_string());
    let style = if profile.communication_style.trim().is_empty() {
        "motivational"
    } else {
        profile.communication_style.as_str()
    };
    let exercise = join_or_default(&profile.exercise_preferences);
    let goals = join_or_default(&profile.health_goals);

    render(
        PERSONALIZED_SUMMARY_TEMPLATE,
        &[
            ("name", profile.name.as_str()),
            ("language", language),
            ("age", age.as_str()),
            ("profession", profile.profession.as_deref().unwrap_or(NOT_PROVIDED)),
            ("exercise_preferences", exercise.as_str()),
            ("health_goals", goals.as_str()),
            ("communication_style", style),
            ("metrics", metrics.as_str()),
        ],
    )
}

/// User prompt asking for the structured profile behind a transcript.
pub fn build_extraction_prompt(turns: &[OnboardingTurn]) -> String {
    render(
        EXTRACTION_TEMPLATE,
        &[("transcript", render_transcript(turns).as_str())],
    )
}

fn render_transcript(turns: &[OnboardingTurn]) -> String {
    turns
        .iter()
        .map(|t| format!("User: {}\nCoach: {}\n\n", t.user_message, t.ai_response))
        .collect()
}

fn render_metrics(m: &HealthMetrics) -> String {
    format!(
        "- Steps: {}\n- Distance: {} km\n- Calories: {} kcal\n- Sleep: {} hours\n\
         - Average heart rate: {} bpm\n- Exercise: {} minutes",
        m.steps, m.distance_km, m.calories, m.sleep_hours, m.heart_rate, m.exercise_minutes
    )
}

fn join_or_default(items: &[String]) -> String {
    if items.is_empty() {
        NOT_PROVIDED.to_string()
    } else {
        items.join(", ")
    }
}

/// Substitute `{key}` placeholders in one pass. Unknown placeholders and
/// stray braces are copied through unchanged.
fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len() + 64);
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let value = after.find('}').and_then(|close| {
            let key = &after[..close];
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| (*v, close))
        });

        match value {
            Some((v, close)) => {
                out.push_str(v);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }

    out.push_str(rest);
    out
}
