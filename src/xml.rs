// Message Source
// Pulls SMS body texts out of the exported XML log. The export is a flat
// sequence of <sms><body>...</body></sms> entries; order is preserved.

use anyhow::{Context, Result};
use regex::Regex;
use std::fs;
use std::path::Path;

/// One read of the export: message bodies in source order, plus how many
/// <sms> entries carried no <body> element at all (skipped, never classified
/// as empty strings).
#[derive(Debug, Clone)]
pub struct MessageBatch {
    pub bodies: Vec<String>,
    pub missing_bodies: usize,
}

/// Read the export file. A file that cannot be read is fatal for the whole
/// batch: the error propagates to the driver with zero records processed.
pub fn read_sms_export(path: &Path) -> Result<MessageBatch> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read SMS export: {}", path.display()))?;
    parse_sms_export(&content)
}

pub fn parse_sms_export(content: &str) -> Result<MessageBatch> {
    let sms_re = Regex::new(r"(?s)<sms\b.*?</sms>")?;
    let body_re = Regex::new(r"(?s)<body>(.*?)</body>")?;

    let mut bodies = Vec::new();
    let mut missing_bodies = 0;

    for entry in sms_re.find_iter(content) {
        match body_re.captures(entry.as_str()) {
            Some(caps) => bodies.push(unescape_xml(&caps[1])),
            None => missing_bodies += 1,
        }
    }

    Ok(MessageBatch {
        bodies,
        missing_bodies,
    })
}

/// The five predefined XML entities. &amp; goes last so escaped ampersands
/// don't get double-expanded.
fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bodies_in_order() {
        let xml = r#"<?xml version="1.0"?>
<smses count="2">
  <sms protocol="0"><body>first message</body></sms>
  <sms protocol="0"><body>second message</body></sms>
</smses>"#;

        let batch = parse_sms_export(xml).unwrap();
        assert_eq!(batch.bodies, vec!["first message", "second message"]);
        assert_eq!(batch.missing_bodies, 0);
    }

    #[test]
    fn test_missing_body_is_skipped_and_counted() {
        let xml = r#"<smses>
  <sms><body>kept</body></sms>
  <sms protocol="0" date="123"></sms>
  <sms><body>also kept</body></sms>
</smses>"#;

        let batch = parse_sms_export(xml).unwrap();
        assert_eq!(batch.bodies, vec!["kept", "also kept"]);
        assert_eq!(batch.missing_bodies, 1);
    }

    #[test]
    fn test_empty_body_is_kept_as_empty_string() {
        let xml = "<smses><sms><body></body></sms></smses>";
        let batch = parse_sms_export(xml).unwrap();
        assert_eq!(batch.bodies, vec![String::new()]);
        assert_eq!(batch.missing_bodies, 0);
    }

    #[test]
    fn test_entities_unescaped() {
        let xml = "<smses><sms><body>sent 5,000 RWF to Tom &amp; Jerry &lt;shop&gt;</body></sms></smses>";
        let batch = parse_sms_export(xml).unwrap();
        assert_eq!(batch.bodies[0], "sent 5,000 RWF to Tom & Jerry <shop>");
    }

    #[test]
    fn test_unreadable_export_is_fatal() {
        let err = read_sms_export(Path::new("/no/such/export.xml"));
        assert!(err.is_err());
    }
}
