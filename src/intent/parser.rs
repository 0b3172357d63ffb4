//! Free-text instruction parser.
//!
//! Supports patterns like:
//! - "pay 5 usdc to alice.eth"
//! - "send 0.5 USDC to bob-smith.eth"
//! - "alice.eth 5 usdc"
//!
//! Templates are tried in order and the first match wins; the ordering is an
//! observable tie-break, not an accident.

use regex::Regex;

use crate::intent::types::{
    IntentError, PaymentIntent, MAX_AMOUNT, MAX_FRACTIONAL_DIGITS, TOKEN_SYMBOL,
};

/// Capture order of a phrasing template.
#[derive(Debug, Clone, Copy)]
enum Shape {
    /// `pay|send|transfer <amount> usdc to <name>`
    VerbFirst,
    /// `<name> <amount> usdc`
    SubjectFirst,
}

/// Parses raw text into a validated [`PaymentIntent`].
pub struct IntentParser {
    templates: Vec<(Regex, Shape)>,
}

impl Default for IntentParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IntentParser {
    pub fn new() -> Self {
        // Order matters: verb-first phrasings take precedence.
        let templates = vec![
            (
                Regex::new(r"(?i)(?:pay|send|transfer)\s+(\d+(?:\.\d+)?)\s+usdc\s+to\s+([a-z0-9-]+\.eth)")
                    .expect("verb-first template is a valid regex"),
                Shape::VerbFirst,
            ),
            (
                Regex::new(r"(?i)([a-z0-9-]+\.eth)\s+(\d+(?:\.\d+)?)\s+usdc")
                    .expect("subject-first template is a valid regex"),
                Shape::SubjectFirst,
            ),
        ];
        Self { templates }
    }

    /// Parse and validate an instruction.
    ///
    /// Matching is case-insensitive and whitespace-tolerant. A structural
    /// match is followed by two independent validations (amount, recipient),
    /// each with its own error variant.
    pub fn parse(&self, text: &str) -> Result<PaymentIntent, IntentError> {
        let trimmed = text.trim();
        for (template, shape) in &self.templates {
            let Some(caps) = template.captures(trimmed) else {
                continue;
            };
            let (amount_literal, recipient) = match shape {
                Shape::VerbFirst => (caps[1].to_string(), caps[2].to_string()),
                Shape::SubjectFirst => (caps[2].to_string(), caps[1].to_string()),
            };

            let amount = validate_amount(&amount_literal)?;
            let recipient = recipient.to_lowercase();
            validate_recipient(&recipient)?;

            return Ok(PaymentIntent {
                amount,
                amount_literal,
                token: TOKEN_SYMBOL,
                recipient,
                raw_text: text.to_string(),
            });
        }
        Err(IntentError::Unrecognized(text.to_string()))
    }
}

/// Amount policy: finite, positive, at most 1000 (inclusive), and at most
/// six fractional digits in the literal as written.
fn validate_amount(literal: &str) -> Result<f64, IntentError> {
    let amount: f64 = literal
        .parse()
        .map_err(|_| IntentError::InvalidAmount(literal.to_string()))?;
    if !amount.is_finite() || amount <= 0.0 || amount > MAX_AMOUNT {
        return Err(IntentError::InvalidAmount(literal.to_string()));
    }
    let fractional_digits = literal.split('.').nth(1).map(str::len).unwrap_or(0);
    if fractional_digits > MAX_FRACTIONAL_DIGITS {
        return Err(IntentError::InvalidAmount(literal.to_string()));
    }
    Ok(amount)
}

/// Recipient policy: a single `.eth` label of 3-63 alphanumerics and
/// internal hyphens. Expects lower-cased input.
pub(crate) fn validate_recipient(name: &str) -> Result<(), IntentError> {
    let invalid = || IntentError::InvalidName(name.to_string());
    let label = name.strip_suffix(".eth").ok_or_else(invalid)?;
    if label.len() < 3 || label.len() > 63 {
        return Err(invalid());
    }
    if !label
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-')
    {
        return Err(invalid());
    }
    if label.starts_with('-') || label.ends_with('-') {
        return Err(invalid());
    }
    Ok(())
}
