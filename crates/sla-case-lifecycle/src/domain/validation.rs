//! Input validation.
//!
//! One typed boundary per operation. Checks return the complete list of
//! problems, never just the first.

use shared_types::Decision;

use super::config::LifecycleConfig;
use super::entities::{DecisionInput, FamilyData, UploadedFile};
use super::errors::{LifecycleError, LifecycleResult};

/// Family-data fields that must be filled in before submission, in form order.
pub const REQUIRED_FIELDS: [&str; 10] = [
    "familyName",
    "headOfHousehold",
    "phoneNumber",
    "numberOfMembers",
    "village",
    "currentAddress",
    "originalAddress",
    "destructionDate",
    "destructionPercentage",
    "damageDescription",
];

/// Fields a draft cannot be created without.
pub const IDENTITY_FIELDS: [&str; 3] = ["familyName", "headOfHousehold", "phoneNumber"];

const MAX_NAME_LEN: usize = 100;
const MAX_ADDRESS_LEN: usize = 500;
const MAX_DESCRIPTION_LEN: usize = 2000;
const MAX_MEMBERS: u32 = 50;

fn filled(value: Option<&String>) -> bool {
    value.is_some_and(|v| !v.trim().is_empty())
}

/// Whether the named required field holds a usable value.
fn is_present(data: &FamilyData, field: &str) -> bool {
    match field {
        "familyName" => filled(data.family_name.as_ref()),
        "headOfHousehold" => filled(data.head_of_household.as_ref()),
        "phoneNumber" => filled(data.phone_number.as_ref()),
        "numberOfMembers" => data.number_of_members.is_some_and(|n| n > 0),
        "village" => filled(data.village.as_ref()),
        "currentAddress" => filled(data.current_address.as_ref()),
        "originalAddress" => filled(data.original_address.as_ref()),
        "destructionDate" => data.destruction_date.is_some(),
        "destructionPercentage" => data.destruction_percentage.is_some(),
        "damageDescription" => filled(data.damage_description.as_ref()),
        _ => false,
    }
}

/// Required fields still missing, in form order.
#[must_use]
pub fn missing_required_fields(data: &FamilyData) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| !is_present(data, field))
        .map(|field| (*field).to_string())
        .collect()
}

/// Percentage of required fields filled in, rounded half up.
#[must_use]
pub fn form_completion(data: &FamilyData) -> u8 {
    let total = REQUIRED_FIELDS.len();
    let done = total - missing_required_fields(data).len();
    // At most 100.
    ((done * 200 + total) / (total * 2)) as u8
}

/// A new draft needs at least the family's identity.
pub fn validate_identity(data: &FamilyData) -> LifecycleResult<()> {
    let missing: Vec<String> = IDENTITY_FIELDS
        .iter()
        .filter(|field| !is_present(data, field))
        .map(|field| format!("{field} is required"))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LifecycleError::Validation {
            violations: missing,
        })
    }
}

/// Range and length checks on whatever fields are present.
pub fn validate_family_data(data: &FamilyData) -> LifecycleResult<()> {
    let mut violations = Vec::new();

    let text_limits: [(&str, Option<&String>, usize); 6] = [
        ("familyName", data.family_name.as_ref(), MAX_NAME_LEN),
        ("headOfHousehold", data.head_of_household.as_ref(), MAX_NAME_LEN),
        ("village", data.village.as_ref(), MAX_NAME_LEN),
        ("currentAddress", data.current_address.as_ref(), MAX_ADDRESS_LEN),
        ("originalAddress", data.original_address.as_ref(), MAX_ADDRESS_LEN),
        ("damageDescription", data.damage_description.as_ref(), MAX_DESCRIPTION_LEN),
    ];
    for (field, value, max) in text_limits {
        if let Some(value) = value {
            if value.trim().chars().count() > max {
                violations.push(format!("{field} must be at most {max} characters"));
            }
        }
    }

    if let Some(members) = data.number_of_members {
        if !(1..=MAX_MEMBERS).contains(&members) {
            violations.push(format!("numberOfMembers must be between 1 and {MAX_MEMBERS}"));
        }
    }
    if let Some(pct) = data.destruction_percentage {
        if pct > 100 {
            violations.push("destructionPercentage must be between 0 and 100".to_string());
        }
    }
    if let Some(email) = data.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) {
        let valid = email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
        if !valid {
            violations.push("email must be a valid address".to_string());
        }
    }
    if let Some(members) = data.number_of_members {
        let dependants = data.children_count.saturating_add(data.elderly_count);
        if dependants > members {
            violations.push("childrenCount plus elderlyCount exceeds numberOfMembers".to_string());
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LifecycleError::Validation { violations })
    }
}

/// A decision that passed validation. Approval figures are present iff approved.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDecision {
    pub decision: Decision,
    pub comments: String,
    pub final_damage_percentage: Option<f64>,
    pub estimated_cost: Option<u64>,
    pub field_notes: Option<String>,
}

/// Checks comments, then approval figures. Rejections drop any figures sent.
pub fn validate_decision(
    input: &DecisionInput,
    config: &LifecycleConfig,
) -> LifecycleResult<ValidatedDecision> {
    let comments = input.comments.trim();
    let len = comments.chars().count();
    if len < config.min_comment_len || len > config.max_comment_len {
        return Err(LifecycleError::validation(format!(
            "comments must be between {} and {} characters",
            config.min_comment_len, config.max_comment_len
        )));
    }

    let field_notes = input
        .field_notes
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(String::from);

    match input.decision {
        Decision::Rejected => Ok(ValidatedDecision {
            decision: Decision::Rejected,
            comments: comments.to_string(),
            final_damage_percentage: None,
            estimated_cost: None,
            field_notes,
        }),
        Decision::Approved => {
            let pct = input
                .final_damage_percentage
                .filter(|p| p.is_finite() && (0.0..=100.0).contains(p));
            let cost = input.estimated_cost.filter(|c| *c > 0);

            let mut fields = Vec::new();
            if pct.is_none() {
                fields.push("finalDamagePercentage".to_string());
            }
            if cost.is_none() {
                fields.push("estimatedCost".to_string());
            }

            match (pct, cost) {
                (Some(pct), Some(cost)) => Ok(ValidatedDecision {
                    decision: Decision::Approved,
                    comments: comments.to_string(),
                    final_damage_percentage: Some(pct),
                    estimated_cost: Some(cost),
                    field_notes,
                }),
                _ => Err(LifecycleError::MissingApprovalFields { fields }),
            }
        }
    }
}

/// Checks an evidence file against the allow-list, size and count limits,
/// and its own checksum.
pub fn validate_file(
    file: &UploadedFile,
    existing: &[UploadedFile],
    config: &LifecycleConfig,
) -> LifecycleResult<()> {
    let mut violations = Vec::new();

    if file.original_name.trim().is_empty() {
        violations.push("file name is required".to_string());
    }
    if !config.allows_content_type(&file.content_type) {
        violations.push(format!("file type {} is not allowed", file.content_type));
    }
    if file.size > config.max_file_size_bytes {
        violations.push(format!(
            "file exceeds {} bytes",
            config.max_file_size_bytes
        ));
    }
    if !file.is_intact() {
        violations.push("file checksum does not match its content".to_string());
    }
    if existing.len() >= config.max_files_per_case {
        violations.push(format!(
            "a case may carry at most {} files",
            config.max_files_per_case
        ));
    }
    if existing.iter().any(|f| f.checksum == file.checksum) {
        violations.push("file is already attached".to_string());
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(LifecycleError::Validation { violations })
    }
}

/// Validates a full replacement file set.
pub fn validate_files(files: &[UploadedFile], config: &LifecycleConfig) -> LifecycleResult<()> {
    files
        .iter()
        .enumerate()
        .try_for_each(|(i, file)| validate_file(file, &files[..i], config))
}
