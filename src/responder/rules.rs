//! Keyword-routed canned advice.
//!
//! The rule table is an ordered list of (keyword set, advice) pairs scanned
//! top to bottom against the lower-cased message; the first set with any
//! matching keyword wins and there is no combination logic. Do not reorder
//! the table — a message mentioning both "fever" and "vaccine" routes by
//! source order, not severity. Pure, deterministic, and total.

use async_trait::async_trait;

use crate::error::ApiResult;

use super::{latest_user_message, AdvisoryResponder, ChatTurn};

const FEVER_ADVICE: &str = "\
Based on your symptoms, here are some general recommendations:

1. Rest and Hydration: Get plenty of rest and drink fluids
2. Monitor Temperature: Check your temperature regularly
3. Over-the-counter Relief: Consider acetaminophen or ibuprofen for fever
4. Seek Medical Care If:
   - Fever persists for more than 3 days
   - Difficulty breathing
   - Severe headache or neck stiffness
   - Symptoms worsen

This is general advice. Consult a healthcare professional for proper diagnosis.";

const VACCINE_ADVICE: &str = "\
Vaccination Information:

1. COVID-19: Stay updated with booster shots as recommended
2. Flu: Annual vaccination recommended, especially for high-risk groups
3. General Schedule: Check with your local health department
4. Side Effects: Mild reactions are normal (soreness, low-grade fever)

Consult your healthcare provider for a personalized vaccination schedule.";

const MOSQUITO_ADVICE: &str = "\
Mosquito-borne Disease Prevention:

1. Protection:
   - Use mosquito repellent (DEET 20%+)
   - Wear long sleeves and pants
   - Use mosquito nets while sleeping

2. Eliminate Breeding Sites:
   - Remove standing water
   - Clean gutters and drains
   - Cover water storage containers

3. Seek Immediate Care If:
   - High fever with severe headache
   - Bleeding from nose/gums
   - Severe abdominal pain

Early detection and treatment are crucial.";

const FALLBACK_ADVICE: &str = "\
I can help with:
- Symptom assessment and general health advice
- Vaccination information and schedules
- Disease prevention strategies
- When to seek medical care

Please describe your symptoms or health concern, and I'll provide evidence-based guidance.

Remember: I provide general information only. Always consult healthcare professionals for medical advice.";

/// Evaluation order is part of the contract.
const RULES: &[(&[&str], &str)] = &[
    (&["fever", "cough", "cold"], FEVER_ADVICE),
    (&["vaccine", "vaccination"], VACCINE_ADVICE),
    (&["dengue", "malaria", "mosquito"], MOSQUITO_ADVICE),
];

pub struct RuleBasedResponder;

impl RuleBasedResponder {
    /// Route a single message through the rule table.
    pub fn advise(message: &str) -> &'static str {
        let lowered = message.to_lowercase();
        for (keywords, advice) in RULES {
            if keywords.iter().any(|kw| lowered.contains(kw)) {
                return advice;
            }
        }
        FALLBACK_ADVICE
    }
}

#[async_trait]
impl AdvisoryResponder for RuleBasedResponder {
    async fn respond(&self, turns: &[ChatTurn], _system: Option<&str>) -> ApiResult<String> {
        let message = latest_user_message(turns).unwrap_or("");
        Ok(Self::advise(message).to_string())
    }
}
