//! Extraction of readings from notification payloads.
//!
//! The peripheral sends free text lines such as `Ortalama BPM: 78`. There is no framing:
//! a payload is matched against the configured labels and the text after the first colon is
//! taken as the value.

use crate::config::types::LabelConfig;
use crate::device::types::{Field, Reading};

/// Classifies a payload by the first label (in [`Field::ALL`] order) it contains and extracts
/// the trimmed text after its first colon. Returns `None` for payloads that match no label.
pub fn parse_notification(labels: &LabelConfig, payload: &[u8]) -> Option<Reading> {
    let text = String::from_utf8_lossy(payload);

    let field = Field::ALL
        .into_iter()
        .find(|field| text.contains(labels.label(*field)))?;

    // a label configured without a colon can match a payload that has none
    let (_, value) = text.split_once(':')?;

    Some(Reading {
        field,
        value: value.trim().to_string(),
    })
}
