// Field Extractors
// Pure first-match lookups over raw SMS text. Every extractor returns the
// first match or absent; there is no validation pass and no fallback pattern.

use anyhow::{Context, Result};
use regex::Regex;

/// Compiled pattern set shared by the classifier and the per-category
/// parsers. Built once, reused for the whole batch.
pub struct Patterns {
    amount: Regex,
    date_time: Regex,
    transaction_id: Regex,
    phone: Regex,
    fee: Regex,
    sender: Regex,
    recipient: Regex,
    bank_deposit: Regex,
    bank_transfer: Regex,
    reference: Regex,
    meter: Regex,
    agent: Regex,
    initiator: Regex,
    bundle_size: Regex,
    validity: Regex,
}

impl Patterns {
    pub fn new() -> Result<Self> {
        Ok(Patterns {
            amount: Regex::new(r"(\d+(?:,\d{3})*(?:\.\d{2})?)\s*RWF")?,
            date_time: Regex::new(r"(\d{4}-\d{2}-\d{2}\s+\d{2}:\d{2}:\d{2})")?,
            transaction_id: Regex::new(r"(?:Transaction ID|TxId):\s*(\w+)")?,
            phone: Regex::new(r"(250\d{9})")?,
            fee: Regex::new(r"Fee:\s*(\d+(?:\.\d{2})?)\s*RWF")?,
            sender: Regex::new(r"from\s+([^.]+?)\.")?,
            recipient: Regex::new(r"to\s+([^.]+?)(?:\s+has been|\.)")?,
            bank_deposit: Regex::new(r"(?:to|deposit to)\s+([^.]+?)(?:\s+has been|\.|Ref)")?,
            bank_transfer: Regex::new(r"(?:transferred to|to)\s+([^.]+?)\.")?,
            reference: Regex::new(r"(?:Ref|Reference):\s*(\w+)")?,
            meter: Regex::new(r"Meter:\s*(\w+)")?,
            agent: Regex::new(r"agent:\s*([^(]+?)\s*\(([^)]+)\)")?,
            initiator: Regex::new(r"initiated by\s+([^.]+?)\.")?,
            bundle_size: Regex::new(r"(\d+(?:\.\d+)?(?:GB|MB|minutes?))")?,
            validity: Regex::new(r"(?:valid|Valid).*?(\d+\s+days?)")?,
        })
    }

    /// Extract the transaction amount. Absent is normalized to 0.0, the one
    /// numeric field with a defined default. Matched text that fails to parse
    /// is a hard error, never a silent zero.
    pub fn amount(&self, text: &str) -> Result<f64> {
        match self.amount.captures(text) {
            Some(caps) => {
                let raw = caps[1].replace(',', "");
                raw.parse::<f64>()
                    .with_context(|| format!("amount text {:?} is not a number", &caps[1]))
            }
            None => Ok(0.0),
        }
    }

    /// Extract the fee, if any. Unlike amount, a missing fee stays absent.
    pub fn fee(&self, text: &str) -> Result<Option<f64>> {
        match self.fee.captures(text) {
            Some(caps) => {
                let value = caps[1]
                    .parse::<f64>()
                    .with_context(|| format!("fee text {:?} is not a number", &caps[1]))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    pub fn date_time(&self, text: &str) -> Option<String> {
        first_capture(&self.date_time, text)
    }

    pub fn transaction_id(&self, text: &str) -> Option<String> {
        first_capture(&self.transaction_id, text)
    }

    /// Country-code-prefixed phone number, searched in the original
    /// (non-lowercased) text.
    pub fn phone_number(&self, text: &str) -> Option<String> {
        first_capture(&self.phone, text)
    }

    pub fn has_phone_number(&self, text: &str) -> bool {
        self.phone.is_match(text)
    }

    pub fn sender(&self, text: &str) -> Option<String> {
        first_capture(&self.sender, text)
    }

    pub fn recipient(&self, text: &str) -> Option<String> {
        first_capture(&self.recipient, text)
    }

    pub fn bank_name_deposit(&self, text: &str) -> Option<String> {
        first_capture(&self.bank_deposit, text)
    }

    pub fn bank_name_transfer(&self, text: &str) -> Option<String> {
        first_capture(&self.bank_transfer, text)
    }

    pub fn reference(&self, text: &str) -> Option<String> {
        first_capture(&self.reference, text)
    }

    pub fn meter_number(&self, text: &str) -> Option<String> {
        first_capture(&self.meter, text)
    }

    /// Agent name and phone come out of one pattern: "agent: NAME (PHONE)".
    pub fn agent(&self, text: &str) -> Option<(String, String)> {
        self.agent
            .captures(text)
            .map(|caps| (caps[1].trim().to_string(), caps[2].to_string()))
    }

    pub fn initiator(&self, text: &str) -> Option<String> {
        first_capture(&self.initiator, text)
    }

    pub fn bundle_size(&self, text: &str) -> Option<String> {
        first_capture(&self.bundle_size, text)
    }

    pub fn validity_period(&self, text: &str) -> Option<String> {
        first_capture(&self.validity, text)
    }
}

/// First capture group, trimmed. An empty capture still counts as a match
/// (empty string), deliberately not collapsed to None.
fn first_capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text).map(|caps| caps[1].trim().to_string())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> Patterns {
        Patterns::new().unwrap()
    }

    #[test]
    fn test_amount_strips_grouping_commas() {
        let p = patterns();
        let amount = p.amount("You paid 1,234.50 RWF today").unwrap();
        assert_eq!(amount, 1234.50);
    }

    #[test]
    fn test_amount_absent_defaults_to_zero() {
        let p = patterns();
        let amount = p.amount("no currency figure anywhere").unwrap();
        assert_eq!(amount, 0.0);
    }

    #[test]
    fn test_amount_extraction_is_idempotent() {
        let p = patterns();
        let text = "You have received 5,000 RWF from John Doe.";
        let first = p.amount(text).unwrap();
        let second = p.amount(text).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, 5000.0);
    }

    #[test]
    fn test_amount_takes_first_occurrence() {
        let p = patterns();
        let amount = p.amount("Paid 2,000 RWF. Fee: 20 RWF").unwrap();
        assert_eq!(amount, 2000.0);
    }

    #[test]
    fn test_date_time_iso_like() {
        let p = patterns();
        let dt = p.date_time("Done at 2024-01-15 10:30:00 exactly");
        assert_eq!(dt.as_deref(), Some("2024-01-15 10:30:00"));
    }

    #[test]
    fn test_transaction_id_both_labels() {
        let p = patterns();
        assert_eq!(
            p.transaction_id("Transaction ID: ABC123").as_deref(),
            Some("ABC123")
        );
        assert_eq!(p.transaction_id("TxId: XY99").as_deref(), Some("XY99"));
        assert_eq!(p.transaction_id("no label here"), None);
    }

    #[test]
    fn test_fee_absent_is_none_not_zero() {
        let p = patterns();
        assert_eq!(p.fee("payment completed, no fee line").unwrap(), None);
        assert_eq!(p.fee("Fee: 20 RWF").unwrap(), Some(20.0));
    }

    #[test]
    fn test_phone_number_country_prefixed() {
        let p = patterns();
        assert_eq!(
            p.phone_number("sent to 250788123456 ok").as_deref(),
            Some("250788123456")
        );
        assert!(!p.has_phone_number("sent to 0788123456"));
    }

    #[test]
    fn test_agent_name_and_phone_pair() {
        let p = patterns();
        let (name, phone) = p
            .agent("via agent: Jane Agent (250788000111) done")
            .unwrap();
        assert_eq!(name, "Jane Agent");
        assert_eq!(phone, "250788000111");
    }

    #[test]
    fn test_bundle_size_units() {
        let p = patterns();
        assert_eq!(p.bundle_size("bought 2GB bundle").as_deref(), Some("2GB"));
        assert_eq!(
            p.bundle_size("bought 60minutes pack").as_deref(),
            Some("60minutes")
        );
        assert_eq!(p.bundle_size("no size token"), None);
    }

    #[test]
    fn test_validity_period() {
        let p = patterns();
        assert_eq!(
            p.validity_period("bundle valid for 30 days").as_deref(),
            Some("30 days")
        );
        assert_eq!(p.validity_period("no expiry mentioned"), None);
    }

    #[test]
    fn test_empty_trimmed_capture_is_match_not_absent() {
        // A capture that trims to nothing is still a match. Whitespace between
        // "from" and the period satisfies the pattern, so the sender comes
        // back as Some(""), never collapsed to None.
        let p = patterns();
        assert_eq!(
            p.sender("You have received 5,000 RWF from   .").as_deref(),
            Some("")
        );
    }

    #[test]
    fn test_sender_stops_at_period() {
        let p = patterns();
        assert_eq!(
            p.sender("received 5,000 RWF from John Doe. Transaction ID: A1")
                .as_deref(),
            Some("John Doe")
        );
    }
}
