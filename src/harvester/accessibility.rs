//! Accessibility check: is a candidate public and free?

use super::Harvester;
use crate::types::{AccessibilityVerdict, ThingId};

impl Harvester {
    /// Look up a candidate's metadata and decide whether it may be downloaded
    ///
    /// A candidate is eligible only when both `is_private` and `is_purchased` are false.
    /// A failed lookup is logged and reported as [`AccessibilityVerdict::CheckFailed`];
    /// it is never retried and never stops the run.
    pub async fn check_accessibility(&self, id: ThingId) -> AccessibilityVerdict {
        match self.client.thing_info(id).await {
            Ok(info) if !info.is_private && !info.is_purchased => AccessibilityVerdict::Eligible,
            Ok(info) => {
                tracing::debug!(
                    thing_id = %id,
                    is_private = info.is_private,
                    is_purchased = info.is_purchased,
                    "Candidate is not publicly accessible"
                );
                AccessibilityVerdict::Ineligible {
                    is_private: info.is_private,
                    is_purchased: info.is_purchased,
                }
            }
            Err(e) => {
                tracing::warn!(
                    thing_id = %id,
                    error = %e,
                    "Failed to check accessibility, treating candidate as not accessible"
                );
                AccessibilityVerdict::CheckFailed(e.to_string())
            }
        }
    }
}
