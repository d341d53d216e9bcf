use chrono::Duration;

use super::common::{
    application, build_service, find_requirement, initialize_command, monday_morning,
    register_application, submit_file,
};
use crate::workflows::acceptance::domain::{
    ApplicationPhase, PermitCategory, RequirementKind, RequirementStatus, RequirementType,
    ReviewDecision, ReviewerId,
};
use crate::workflows::acceptance::repository::RequirementRepository;
use crate::workflows::acceptance::service::ReviewCommand;

use super::common::phase_of;

#[test]
fn sweep_auto_accepts_expired_requirements() {
    let (service, _, directory, notices) = build_service();
    let app = application("app-sw1");
    register_application(&directory, &app, RequirementKind::Acceptance);
    let requirements = service
        .initialize(initialize_command(
            &app,
            RequirementKind::Acceptance,
            PermitCategory::Fencing,
        ))
        .expect("initialize succeeds");
    let ownership = find_requirement(&requirements, RequirementType::ProofOfOwnership);
    submit_file(&service, &ownership.id, "title-deed.pdf");

    // Twenty calendar days later every ten-working-day deadline has elapsed.
    let later = monday_morning() + Duration::days(20);
    let transitioned = service.auto_accept_expired(later).expect("sweep succeeds");

    assert_eq!(transitioned.len(), 1);
    let accepted = &transitioned[0];
    assert_eq!(accepted.id, ownership.id);
    assert_eq!(accepted.status, RequirementStatus::Accepted);
    assert!(accepted.is_auto_accepted());
    let review = accepted.review.as_ref().expect("system review recorded");
    assert_eq!(review.reviewer_id, ReviewerId::system());
    assert!(review.remarks.contains("automatically accepted"));
    assert!(notices
        .events()
        .iter()
        .any(|notice| notice.template == "requirement_auto_accepted"));
}

#[test]
fn sweep_is_idempotent() {
    let (service, _, directory, _) = build_service();
    let app = application("app-sw2");
    register_application(&directory, &app, RequirementKind::Acceptance);
    let requirements = service
        .initialize(initialize_command(
            &app,
            RequirementKind::Acceptance,
            PermitCategory::Fencing,
        ))
        .expect("initialize succeeds");
    let ownership = find_requirement(&requirements, RequirementType::ProofOfOwnership);
    submit_file(&service, &ownership.id, "title-deed.pdf");

    let later = monday_morning() + Duration::days(20);
    let first = service.auto_accept_expired(later).expect("first sweep");
    let second = service.auto_accept_expired(later).expect("second sweep");

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
}

#[test]
fn sweep_leaves_unexpired_requirements_alone() {
    let (service, _, directory, _) = build_service();
    let app = application("app-sw3");
    register_application(&directory, &app, RequirementKind::Acceptance);
    let requirements = service
        .initialize(initialize_command(
            &app,
            RequirementKind::Acceptance,
            PermitCategory::Fencing,
        ))
        .expect("initialize succeeds");
    let ownership = find_requirement(&requirements, RequirementType::ProofOfOwnership);
    submit_file(&service, &ownership.id, "title-deed.pdf");

    // Two calendar days in, the ten-working-day deadline is nowhere near.
    let soon = monday_morning() + Duration::days(2);
    let transitioned = service.auto_accept_expired(soon).expect("sweep succeeds");

    assert!(transitioned.is_empty());
    let current = service.get(&ownership.id).expect("requirement still there");
    assert_eq!(current.status, RequirementStatus::PendingReview);
}

#[test]
fn sweep_skips_requirements_without_deadlines() {
    let (service, repository, directory, _) = build_service();
    let app = application("app-sw4");
    register_application(&directory, &app, RequirementKind::Acceptance);
    let requirements = service
        .initialize(initialize_command(
            &app,
            RequirementKind::Acceptance,
            PermitCategory::Fencing,
        ))
        .expect("initialize succeeds");
    let ownership = find_requirement(&requirements, RequirementType::ProofOfOwnership);
    submit_file(&service, &ownership.id, "title-deed.pdf");

    // Simulate a record from before deadlines were tracked.
    let mut record = service.get(&ownership.id).expect("requirement present");
    record.auto_accept_deadline = None;
    repository.seed(record);

    let later = monday_morning() + Duration::days(30);
    let transitioned = service.auto_accept_expired(later).expect("sweep succeeds");
    assert!(transitioned.is_empty());
}

#[test]
fn sweep_advances_phase_when_it_accepts_the_last_sibling() {
    let (service, _, directory, notices) = build_service();
    let app = application("app-sw5");
    register_application(&directory, &app, RequirementKind::OtherDocument);
    let requirements = service
        .initialize(initialize_command(
            &app,
            RequirementKind::OtherDocument,
            PermitCategory::Fencing,
        ))
        .expect("initialize succeeds");
    // Fencing has a single other-document requirement.
    assert_eq!(requirements.len(), 1);
    let plans = find_requirement(&requirements, RequirementType::StructuralDesignPlans);
    submit_file(&service, &plans.id, "fence-design.pdf");

    let later = monday_morning() + Duration::days(20);
    let transitioned = service.auto_accept_expired(later).expect("sweep succeeds");

    assert_eq!(transitioned.len(), 1);
    assert_eq!(
        phase_of(&directory, &app),
        Some(ApplicationPhase::Assessment)
    );
    let advanced: Vec<_> = notices
        .events()
        .into_iter()
        .filter(|notice| notice.template == "phase_advanced")
        .collect();
    assert_eq!(advanced.len(), 1);
    assert_eq!(
        advanced[0].details.get("phase").map(String::as_str),
        Some(ApplicationPhase::Assessment.label())
    );
}

#[test]
fn sweep_does_not_advance_phase_while_siblings_are_open() {
    let (service, _, directory, notices) = build_service();
    let app = application("app-sw6");
    register_application(&directory, &app, RequirementKind::Acceptance);
    let requirements = service
        .initialize(initialize_command(
            &app,
            RequirementKind::Acceptance,
            PermitCategory::Fencing,
        ))
        .expect("initialize succeeds");
    let ownership = find_requirement(&requirements, RequirementType::ProofOfOwnership);
    let tax = find_requirement(&requirements, RequirementType::TaxDeclaration);
    submit_file(&service, &ownership.id, "title-deed.pdf");
    submit_file(&service, &tax.id, "tax-2026.pdf");

    let later = monday_morning() + Duration::days(20);
    let transitioned = service.auto_accept_expired(later).expect("sweep succeeds");

    // Both reviewed documents flip, the unsubmitted boundary holds the phase.
    assert_eq!(transitioned.len(), 2);
    assert_eq!(
        phase_of(&directory, &app),
        Some(ApplicationPhase::Acceptance)
    );
    assert!(!notices
        .events()
        .iter()
        .any(|notice| notice.template == "phase_advanced"));
}

#[test]
fn human_decision_during_sweep_window_wins() {
    let (service, repository, directory, _) = build_service();
    let app = application("app-sw7");
    register_application(&directory, &app, RequirementKind::Acceptance);
    let requirements = service
        .initialize(initialize_command(
            &app,
            RequirementKind::Acceptance,
            PermitCategory::Fencing,
        ))
        .expect("initialize succeeds");
    let ownership = find_requirement(&requirements, RequirementType::ProofOfOwnership);
    submit_file(&service, &ownership.id, "title-deed.pdf");

    // A reviewer rejects between the sweep's read and its write; the stored
    // version moves on and the sweep's stale write is discarded.
    service
        .review(ReviewCommand {
            requirement_id: ownership.id.clone(),
            reviewer_id: ReviewerId("admin-7".to_string()),
            decision: ReviewDecision::Reject,
            remarks: Some("blurred scan".to_string()),
            attachment: None,
            overlap_verdict: None,
            now: monday_morning(),
        })
        .expect("rejection succeeds");

    let later = monday_morning() + Duration::days(20);
    let transitioned = service.auto_accept_expired(later).expect("sweep succeeds");

    assert!(transitioned.is_empty());
    let current = repository
        .fetch(&ownership.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(current.status, RequirementStatus::RevisionRequired);
    assert!(current.review.as_ref().is_some_and(|review| !review.compliant));
}
