//! System instruction for the Stoxara persona.

use chrono::NaiveDate;

/// Format a date the way the persona states it, e.g. `Monday, October 19, 2026`.
#[must_use]
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

/// Build the system instruction for a given day.
#[must_use]
pub fn system_instruction(today: NaiveDate) -> String {
    format!(
        "You are Stoxara, a premium institutional-grade financial intelligence AI.
Today is {today}.

Your mission is to provide sophisticated market intelligence and economic analysis.
Use Google Search to find current data, trends, and news for today.

Guidelines:
1. Provide clear, data-driven reasoning for all financial queries.
2. Use bolding for key metrics, events, or indicators.
3. Format responses with bullet points for high readability.
4. Focus on macroeconomic trends, industry shifts, and strategic financial outlooks.
5. ALWAYS include a brief daily summary of the global financial atmosphere.
6. Add a disclaimer that you are an AI and not a licensed financial advisor.

Tone: Professional, sophisticated, and authoritative.",
        today = format_long_date(today)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_long_date_format() {
        let monday = NaiveDate::from_ymd_opt(2026, 10, 19).map(format_long_date);
        assert_eq!(monday.as_deref(), Some("Monday, October 19, 2026"));

        let tuesday = NaiveDate::from_ymd_opt(2024, 3, 5).map(format_long_date);
        assert_eq!(tuesday.as_deref(), Some("Tuesday, March 5, 2024"));
    }

    #[test]
    fn test_instruction_carries_date() {
        let instruction = NaiveDate::from_ymd_opt(2026, 10, 19)
            .map(system_instruction)
            .unwrap_or_default();
        assert!(instruction.starts_with("You are Stoxara"));
        assert!(instruction.contains("Today is Monday, October 19, 2026."));
        assert!(instruction.contains("not a licensed financial advisor"));
    }
}
