//! Suppression of templates that carry no new work.

use miner_core::BlockTemplate;

/// Remembers the last delivered template's (height, transaction count).
#[derive(Debug, Default)]
pub struct TemplateDeduplicator {
    last_delivered: Option<(u64, usize)>,
}

impl TemplateDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `template` should be delivered, recording it as the
    /// latest delivery. Returns `false` for an unchanged template.
    pub fn offer(&mut self, template: &BlockTemplate) -> bool {
        let key = template.dedup_key();
        if self.last_delivered == Some(key) {
            return false;
        }
        self.last_delivered = Some(key);
        true
    }
}
