/// System prompt for single-number sentiment scoring.
pub const SENTIMENT_SYSTEM_PROMPT: &str = "You are a sentiment analyzer. Analyze the sentiment of the given text and return a single number between -1 and 1, where -1 is very negative, 0 is neutral, and 1 is very positive. Return ONLY the number, nothing else.";
