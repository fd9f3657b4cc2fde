use super::*;
use crate::config::GcodeNaming;
use crate::harvester::test_helpers::*;
use crate::types::{
    AbandonReason, AccessibilityVerdict, ArtifactKind, CandidateOutcome, Event, ThingId,
    TransferOutcome,
};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
