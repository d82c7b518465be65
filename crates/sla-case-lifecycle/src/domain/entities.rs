//! Case lifecycle entities.
//!
//! The `Case` document and the records nested in it. Field names serialize in
//! camelCase to match the persisted document layout.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use shared_types::{Amount, CaseId, CaseStatus, Decision, Timestamp, UserId};

use super::audit::AuditLog;

// =============================================================================
// FAMILY DATA
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    House,
    Apartment,
    Shop,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OwnershipStatus {
    Owned,
    Rented,
    Inherited,
}

/// The family's claim: identity, address, destruction assessment and prior aid.
///
/// Every field is optional while the case is a draft. Submission requires the
/// fields listed in `validation::REQUIRED_FIELDS`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyData {
    // Family
    pub family_name: Option<String>,
    pub head_of_household: Option<String>,
    pub phone_number: Option<String>,
    pub alternate_phone: Option<String>,
    pub email: Option<String>,
    pub national_id: Option<String>,
    pub number_of_members: Option<u32>,
    pub children_count: u32,
    pub elderly_count: u32,
    pub special_needs_count: u32,

    // Address
    pub village: Option<String>,
    pub current_address: Option<String>,
    pub original_address: Option<String>,
    pub property_type: Option<PropertyType>,
    pub ownership_status: Option<OwnershipStatus>,
    pub property_value: Option<Amount>,

    // Destruction
    pub destruction_date: Option<NaiveDate>,
    pub destruction_cause: Option<String>,
    pub destruction_percentage: Option<u8>,
    pub damage_description: Option<String>,
    pub previously_received_aid: Option<bool>,
    pub aid_details: Option<String>,

    // Supporting
    pub witness_name: Option<String>,
    pub witness_phone: Option<String>,
    pub emergency_contact: Option<String>,
    pub emergency_phone: Option<String>,
}

impl FamilyData {
    /// Village name normalised for grouping and lookups.
    #[must_use]
    pub fn village_key(&self) -> Option<String> {
        self.village
            .as_deref()
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_lowercase)
    }

    /// Household size, treating an unknown size as one person.
    #[must_use]
    pub fn members_or_one(&self) -> u32 {
        self.number_of_members.unwrap_or(1).max(1)
    }
}

// =============================================================================
// EVIDENCE FILES
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    PropertyDamage,
    Identification,
    Ownership,
    Other,
}

/// An evidence attachment. Content is stored inline, hex encoded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub name: String,
    pub original_name: String,
    pub content_type: String,
    pub size: u64,
    pub category: FileCategory,
    pub description: Option<String>,
    pub uploaded_at: Timestamp,
    #[serde(with = "hex_bytes")]
    pub content: Vec<u8>,
    /// SHA-256 of `content`, lowercase hex.
    pub checksum: String,
}

impl UploadedFile {
    /// Builds a file record, deriving `size` and `checksum` from `content`.
    pub fn new(
        original_name: impl Into<String>,
        content_type: impl Into<String>,
        category: FileCategory,
        content: Vec<u8>,
        uploaded_at: Timestamp,
    ) -> Self {
        let original_name = original_name.into();
        let checksum = checksum_of(&content);
        let name = format!("{}-{}", &checksum[..12], original_name);
        Self {
            name,
            original_name,
            content_type: content_type.into(),
            size: content.len() as u64,
            category,
            description: None,
            uploaded_at,
            content,
            checksum,
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// True when `size` and `checksum` still describe `content`.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.size == self.content.len() as u64 && self.checksum == checksum_of(&self.content)
    }
}

/// SHA-256 of `content` as lowercase hex.
#[must_use]
pub fn checksum_of(content: &[u8]) -> String {
    hex::encode(Sha256::digest(content))
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        hex::decode(encoded).map_err(serde::de::Error::custom)
    }
}

// =============================================================================
// REVIEW
// =============================================================================

/// The checker currently responsible for a case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerAssignment {
    pub checker_id: UserId,
    pub assigned_at: Timestamp,
    pub assigned_by: UserId,
    pub notes: Option<String>,
}

impl CheckerAssignment {
    #[must_use]
    pub fn is_self_assigned(&self) -> bool {
        self.checker_id == self.assigned_by
    }
}

/// A checker's recorded verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckerDecision {
    pub checker_id: UserId,
    pub decision: Decision,
    pub comments: String,
    /// Present only on approvals.
    pub final_damage_percentage: Option<f64>,
    /// Present only on approvals.
    pub estimated_cost: Option<Amount>,
    pub field_notes: Option<String>,
    pub decided_at: Timestamp,
}

/// A verdict as submitted by a checker, before validation.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionInput {
    pub decision: Decision,
    pub comments: String,
    pub final_damage_percentage: Option<f64>,
    pub estimated_cost: Option<Amount>,
    pub field_notes: Option<String>,
}

impl DecisionInput {
    pub fn approve(
        comments: impl Into<String>,
        final_damage_percentage: f64,
        estimated_cost: Amount,
    ) -> Self {
        Self {
            decision: Decision::Approved,
            comments: comments.into(),
            final_damage_percentage: Some(final_damage_percentage),
            estimated_cost: Some(estimated_cost),
            field_notes: None,
        }
    }

    pub fn reject(comments: impl Into<String>) -> Self {
        Self {
            decision: Decision::Rejected,
            comments: comments.into(),
            final_damage_percentage: None,
            estimated_cost: None,
            field_notes: None,
        }
    }

    #[must_use]
    pub fn with_field_notes(mut self, notes: impl Into<String>) -> Self {
        self.field_notes = Some(notes.into());
        self
    }
}

// =============================================================================
// CASE
// =============================================================================

/// A family's aid claim, tracked from draft through review to funding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    pub case_id: CaseId,
    /// The submitting family account.
    #[serde(rename = "userId")]
    pub owner_id: UserId,
    pub status: CaseStatus,
    pub family_data: FamilyData,
    pub uploaded_files: Vec<UploadedFile>,
    pub checker_assignment: Option<CheckerAssignment>,
    pub checker_decision: Option<CheckerDecision>,
    pub audit_log: AuditLog,

    // Funding
    pub total_needed: Amount,
    pub total_raised: Amount,
    pub donation_progress: u8,

    // Timestamps
    pub created_at: Timestamp,
    pub last_modified: Timestamp,
    pub submitted_at: Option<Timestamp>,
    pub review_started_at: Option<Timestamp>,
    pub approved_at: Option<Timestamp>,
    pub fully_funded_at: Option<Timestamp>,

    /// Share of required family-data fields filled in, 0..=100.
    pub form_completion: u8,
    /// Bumped by the store on every successful save.
    pub version: u64,
}

impl Case {
    /// Checker currently assigned, if any.
    #[must_use]
    pub fn assigned_checker(&self) -> Option<UserId> {
        self.checker_assignment.as_ref().map(|a| a.checker_id)
    }

    #[must_use]
    pub fn is_owned_by(&self, user: UserId) -> bool {
        self.owner_id == user
    }

    /// Amount still missing before the case is fully funded.
    #[must_use]
    pub fn remaining_need(&self) -> Amount {
        self.total_needed.saturating_sub(self.total_raised)
    }
}
