//! Truth-table gap analysis.
//!
//! Pure function over field presence, no external calls. Each call stage
//! has a fixed table of required/important/optional fields drawn from two
//! sources: the user profile and the intent profile. Reports are computed
//! fresh on every request and never cached.

use dg_domain::record::{DreamDna, GapPriority, GapReport, MissingFields, UserProfile};
use dg_domain::trace::TraceEvent;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stage field tables
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tier {
    Required,
    Important,
    Optional,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Profile,
    Dna,
}

type FieldSpec = (Tier, Source, &'static str);

/// Stage 1 — foundation: who is forming what, where.
const STAGE_1: &[FieldSpec] = &[
    (Tier::Required, Source::Profile, "business_name"),
    (Tier::Required, Source::Profile, "state_of_operation"),
    (Tier::Important, Source::Profile, "customer_name"),
    (Tier::Important, Source::Profile, "entity_type"),
    (Tier::Optional, Source::Profile, "customer_email"),
    (Tier::Optional, Source::Profile, "customer_phone"),
];

/// Stage 2 — structure: what kind of business, under what form.
const STAGE_2: &[FieldSpec] = &[
    (Tier::Required, Source::Profile, "entity_type"),
    (Tier::Required, Source::Profile, "business_type"),
    (Tier::Important, Source::Profile, "timeline"),
    (Tier::Optional, Source::Profile, "urgency_level"),
];

/// Stage 3 — vision: the intent profile.
const STAGE_3: &[FieldSpec] = &[
    (Tier::Required, Source::Dna, "core_purpose"),
    (Tier::Required, Source::Dna, "target_audience"),
    (Tier::Important, Source::Dna, "value_proposition"),
    (Tier::Important, Source::Dna, "revenue_model"),
    (Tier::Optional, Source::Dna, "brand_personality"),
];

/// Stage 4 — launch readiness.
const STAGE_4: &[FieldSpec] = &[
    (Tier::Required, Source::Profile, "timeline"),
    (Tier::Important, Source::Dna, "growth_vision"),
    (Tier::Optional, Source::Profile, "urgency_level"),
];

fn table_for(stage: u8) -> &'static [FieldSpec] {
    match stage {
        2 => STAGE_2,
        3 => STAGE_3,
        4 => STAGE_4,
        _ => STAGE_1,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Analysis
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Compute the gap report for a stage.
///
/// A missing intent profile means every DNA-sourced field counts as
/// missing; the report stays well-defined either way.
pub fn analyze(stage: u8, profile: &UserProfile, dna: Option<&DreamDna>) -> GapReport {
    let table = table_for(stage);
    let mut missing = MissingFields::default();
    let mut completed = 0usize;

    for (tier, source, name) in table {
        let present = match source {
            Source::Profile => profile.field(name).is_some(),
            Source::Dna => dna.and_then(|d| d.field(name)).is_some(),
        };
        if present {
            completed += 1;
        } else {
            match tier {
                Tier::Required => missing.required.push((*name).to_owned()),
                Tier::Important => missing.important.push((*name).to_owned()),
                Tier::Optional => missing.optional.push((*name).to_owned()),
            }
        }
    }

    let total = table.len();
    let completion_percent = if total == 0 {
        100.0
    } else {
        (completed as f32 / total as f32) * 100.0
    };
    let priority = if !missing.required.is_empty() {
        GapPriority::Critical
    } else if !missing.important.is_empty() {
        GapPriority::Important
    } else {
        GapPriority::Optional
    };

    let report = GapReport {
        stage: if (1..=4).contains(&stage) { stage } else { 1 },
        missing,
        completed_fields: completed,
        total_fields: total,
        completion_percent,
        priority,
    };
    TraceEvent::GapsComputed {
        stage: report.stage,
        completion_percent: report.completion_percent,
        priority: format!("{:?}", report.priority).to_lowercase(),
    }
    .emit();
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_fields_are_critical() {
        let profile = UserProfile {
            customer_name: Some("Jane Doe".into()),
            ..Default::default()
        };
        let report = analyze(1, &profile, None);
        assert_eq!(report.priority, GapPriority::Critical);
        assert!(report.missing.required.contains(&"business_name".into()));
        assert!(report
            .missing
            .required
            .contains(&"state_of_operation".into()));
    }

    #[test]
    fn all_required_present_demotes_to_important() {
        let profile = UserProfile {
            business_name: Some("Acme".into()),
            state_of_operation: Some("Texas".into()),
            ..Default::default()
        };
        let report = analyze(1, &profile, None);
        assert_eq!(report.priority, GapPriority::Important);
    }

    #[test]
    fn fully_populated_stage_is_optional_priority() {
        let profile = UserProfile {
            customer_name: Some("Jane".into()),
            customer_email: Some("j@a.com".into()),
            customer_phone: Some("+15550001111".into()),
            business_name: Some("Acme".into()),
            entity_type: Some("LLC".into()),
            state_of_operation: Some("Texas".into()),
            ..Default::default()
        };
        let report = analyze(1, &profile, None);
        assert_eq!(report.priority, GapPriority::Optional);
        assert_eq!(report.completion_percent, 100.0);
    }

    #[test]
    fn completion_is_monotonic_and_bounded() {
        let fields = [
            "business_name",
            "state_of_operation",
            "customer_name",
            "entity_type",
            "customer_email",
            "customer_phone",
        ];
        let mut profile = UserProfile::default();
        let mut previous = analyze(1, &profile, None).completion_percent;
        assert!(previous >= 0.0);
        for field in fields {
            match field {
                "business_name" => profile.business_name = Some("x".into()),
                "state_of_operation" => profile.state_of_operation = Some("x".into()),
                "customer_name" => profile.customer_name = Some("x".into()),
                "entity_type" => profile.entity_type = Some("x".into()),
                "customer_email" => profile.customer_email = Some("x".into()),
                "customer_phone" => profile.customer_phone = Some("x".into()),
                _ => unreachable!(),
            }
            let current = analyze(1, &profile, None).completion_percent;
            assert!(current >= previous, "completion decreased at {field}");
            assert!((0.0..=100.0).contains(&current));
            previous = current;
        }
        assert_eq!(previous, 100.0);
    }

    #[test]
    fn stage_three_reads_the_intent_profile() {
        let profile = UserProfile::default();
        let report = analyze(3, &profile, None);
        assert_eq!(report.priority, GapPriority::Critical);
        assert_eq!(report.completed_fields, 0);

        let dna = DreamDna {
            user_id: "u1".into(),
            core_purpose: Some("help founders".into()),
            target_audience: Some("solo founders".into()),
            value_proposition: Some("speed".into()),
            revenue_model: Some("subscription".into()),
            brand_personality: Some("direct".into()),
            ..Default::default()
        };
        let report = analyze(3, &profile, Some(&dna));
        assert_eq!(report.priority, GapPriority::Optional);
        assert_eq!(report.completion_percent, 100.0);
    }

    #[test]
    fn out_of_range_stage_clamps_to_one() {
        let report = analyze(9, &UserProfile::default(), None);
        assert_eq!(report.stage, 1);
        assert_eq!(report.total_fields, STAGE_1.len());
    }
}
