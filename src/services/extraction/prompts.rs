use chrono::NaiveDate;

use crate::models::ExtractionSchema;

const EXTRACTION_PROMPT: &str = r#"You extract the details of a single local experience (a live show, open mic, happy hour, trivia night, special, etc.) from a user's description.

Return ONLY a JSON object (no markdown, no explanation) whose keys are taken from the schema below, with values of the declared type.

Rules:
- Only include a property if the description states it or it can be directly inferred. Omit the key entirely otherwise; never use null, "", "unknown" or placeholder values.
- Never invent a business or venue name. If the description does not name one, return {}.
- "event_price" is the cover charge or ticket price in whole dollars. "No cover" or "free" is 0.
- Copy dates and times as the user wrote them ("tonight", "7/30", "7 PM"); do not convert them.
- "event_start_time" and "event_end_time" belong to the main event; a range like "from 7PM to 10PM" gives both.
- "happy_hour_deal" describes the drink or food specials.

Schema:
"#;

const DATE_PROMPT: &str = r#"Convert the date expression below into a JSON object matching this schema:
{"year": {"type": "integer"}, "month": {"type": "integer"}, "day": {"type": "integer"}}

Only respond with the JSON object. Resolve relative expressions ("tonight", "this Friday", "7/30") against today's date; a date without a year is the next occurrence on or after today.
If the expression does not identify exactly one calendar day, respond with {"error": "<short reason>"} instead.
"#;

const TIME_PROMPT: &str = r#"Convert the time expression below into a JSON object matching this schema:
{"hour": {"type": "integer"}, "minute": {"type": "integer"}}

Only respond with the JSON object. Use a 24-hour clock: "7 PM" is {"hour": 19, "minute": 0}, "noon" is {"hour": 12, "minute": 0}, "midnight" is {"hour": 0, "minute": 0}. A bare hour for an evening event ("at 8", "tonight at 9") is PM.
If the expression does not identify a single clock time, respond with {"error": "<short reason>"} instead.
"#;

pub fn extraction_prompt(schema: &ExtractionSchema) -> String {
    format!("{EXTRACTION_PROMPT}{}", schema.to_json_schema())
}

pub fn date_prompt(reference: NaiveDate) -> String {
    format!(
        "{DATE_PROMPT}\nToday's date is {} ({}).",
        reference.format("%Y-%m-%d"),
        reference.format("%A")
    )
}

pub fn date_request(expression: &str) -> String {
    format!("Date: {expression}")
}

pub fn time_prompt() -> &'static str {
    TIME_PROMPT
}

pub fn time_request(expression: &str) -> String {
    format!("Time: {expression}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extraction_prompt_embeds_schema() {
        let prompt = extraction_prompt(&ExtractionSchema::default());
        assert!(prompt.contains(r#""business_name":{"type":"string"}"#));
        assert!(prompt.contains(r#""required":["business_name","event_type"]"#));
    }

    #[test]
    fn test_date_prompt_uses_reference_date() {
        let prompt = date_prompt(NaiveDate::from_ymd_opt(2023, 8, 4).unwrap());
        assert!(prompt.contains("Today's date is 2023-08-04 (Friday)."));
    }
}
