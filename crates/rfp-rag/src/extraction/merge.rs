//! Consolidation of per-chunk extraction records
//!
//! Records are merged in document order. Scalars take the first present
//! value; lists are a first-seen-order union deduplicated on a normalized
//! key. The result does not depend on which chunk call finished first.

use std::collections::HashSet;

use crate::types::{
    EligibilityRequirement, ExtractionSchema, FormattingRequirements, MergedExtraction,
    PageLimit, SubmissionDetails,
};

/// Lowercase and collapse internal whitespace
fn normalize(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// First present value of a scalar across records
fn first_present<'a, F>(records: &'a [ExtractionSchema], field: F) -> Option<String>
where
    F: Fn(&'a ExtractionSchema) -> Option<&'a str>,
{
    records
        .iter()
        .filter_map(field)
        .map(str::trim)
        .find(|value| !value.is_empty())
        .map(str::to_string)
}

fn merge_submission(records: &[ExtractionSchema]) -> Option<SubmissionDetails> {
    let details = SubmissionDetails {
        deadline_date: first_present(records, |r| {
            r.submission_details.as_ref()?.deadline_date.as_deref()
        }),
        deadline_time: first_present(records, |r| {
            r.submission_details.as_ref()?.deadline_time.as_deref()
        }),
        submission_method: first_present(records, |r| {
            r.submission_details.as_ref()?.submission_method.as_deref()
        }),
    };

    (!details.is_empty()).then_some(details)
}

fn merge_page_limits<'a>(limits: impl Iterator<Item = &'a PageLimit>) -> Vec<PageLimit> {
    let mut seen = HashSet::new();
    limits
        .filter(|limit| limit.page_limit.is_some())
        .filter(|limit| {
            let section = limit
                .section
                .as_deref()
                .map(normalize)
                .unwrap_or_else(|| "general".to_string());
            seen.insert((section, limit.page_limit))
        })
        .cloned()
        .collect()
}

fn merge_sections<'a>(sections: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen = HashSet::new();
    sections
        .map(|s| s.trim())
        .filter(|s| !s.is_empty() && seen.insert(normalize(s)))
        .map(str::to_string)
        .collect()
}

fn merge_formatting(records: &[ExtractionSchema]) -> Option<FormattingRequirements> {
    let parts: Vec<&FormattingRequirements> = records
        .iter()
        .filter_map(|r| r.formatting_requirements.as_ref())
        .collect();

    let formatting = FormattingRequirements {
        page_limits: merge_page_limits(parts.iter().flat_map(|f| f.page_limits.iter())),
        font_details: first_present(records, |r| {
            r.formatting_requirements.as_ref()?.font_details.as_deref()
        }),
        line_spacing: first_present(records, |r| {
            r.formatting_requirements.as_ref()?.line_spacing.as_deref()
        }),
        required_sections: merge_sections(parts.iter().flat_map(|f| f.required_sections.iter())),
    };

    (!formatting.is_empty()).then_some(formatting)
}

fn merge_eligibility(records: &[ExtractionSchema]) -> Vec<EligibilityRequirement> {
    let mut seen = HashSet::new();
    records
        .iter()
        .flat_map(|r| r.eligibility_criteria.iter())
        .filter(|c| {
            let key = (normalize(&c.requirement_type), normalize(&c.details));
            !key.0.is_empty() && !key.1.is_empty() && seen.insert(key)
        })
        .cloned()
        .collect()
}

/// Merge per-chunk records, given in document order, into one.
pub fn merge_extractions(records: &[ExtractionSchema]) -> MergedExtraction {
    tracing::debug!("Merging {} extraction records", records.len());

    MergedExtraction {
        issuing_agency: first_present(records, |r| r.issuing_agency.as_deref()),
        solicitation_number: first_present(records, |r| r.solicitation_number.as_deref()),
        submission_details: merge_submission(records),
        formatting_requirements: merge_formatting(records),
        eligibility_criteria: merge_eligibility(records),
    }
}
