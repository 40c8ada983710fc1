//! Properties of the merge engine that must hold for any fact order

use hs_resolver::merge::{merge_facts, ProfileMerger};
use hs_resolver::types::{
    CandidateFact, Platform, ScalarField, RANK_MICROBLOG, RANK_PHOTO_PLATFORM, RANK_PRIMARY_HOST,
};
use std::collections::HashSet;

/// Facts as three probes might report them for one handle
fn sample_facts() -> Vec<CandidateFact> {
    vec![
        CandidateFact::scalar(ScalarField::FullName, "ann.photos", RANK_PHOTO_PLATFORM),
        CandidateFact::account(Platform::Instagram, "https://www.instagram.com/annlee", "annlee"),
        CandidateFact::scalar(ScalarField::FullName, "annlee123", RANK_MICROBLOG),
        CandidateFact::scalar(ScalarField::Bio, "posting", RANK_MICROBLOG),
        CandidateFact::account(Platform::Twitter, "https://x.com/annlee", "annlee"),
        CandidateFact::scalar(ScalarField::FullName, "Ann Lee", RANK_PRIMARY_HOST),
        CandidateFact::scalar(ScalarField::Bio, "Builder of things", RANK_PRIMARY_HOST),
        CandidateFact::account(Platform::GitHub, "https://github.com/annlee", "annlee"),
        CandidateFact::account(Platform::Twitter, "https://x.com/annlee/", "annlee"),
        CandidateFact::scalar(ScalarField::Website, "https://ann.dev/", RANK_PRIMARY_HOST),
        CandidateFact::account(Platform::Website, "https://ann.dev/", "ann.dev"),
    ]
}

/// Every rotation of the input, a cheap stand-in for arbitrary arrival order
fn rotations(facts: &[CandidateFact]) -> Vec<Vec<CandidateFact>> {
    (0..facts.len())
        .map(|shift| {
            let mut rotated = facts.to_vec();
            rotated.rotate_left(shift);
            rotated
        })
        .collect()
}

#[test]
fn test_account_keys_unique_for_any_order() {
    for facts in rotations(&sample_facts()) {
        let record = merge_facts("annlee", facts);
        let keys: HashSet<(Platform, String)> = record
            .accounts
            .iter()
            .map(|a| (a.platform, a.url.trim_end_matches('/').to_string()))
            .collect();
        assert_eq!(keys.len(), record.accounts.len());
        assert_eq!(record.accounts.len(), 4);
    }
}

#[test]
fn test_scalars_independent_of_arrival_order() {
    let mut reversed = sample_facts();
    reversed.reverse();

    for facts in rotations(&sample_facts()).into_iter().chain([reversed]) {
        let record = merge_facts("annlee", facts);
        assert_eq!(record.full_name.as_deref(), Some("Ann Lee"));
        assert_eq!(record.bio.as_deref(), Some("Builder of things"));
        assert_eq!(record.website.as_deref(), Some("https://ann.dev/"));
    }
}

#[test]
fn test_equal_rank_keeps_first_arrival() {
    let record = merge_facts(
        "annlee",
        vec![
            CandidateFact::scalar(ScalarField::Website, "https://first.example", RANK_PRIMARY_HOST),
            CandidateFact::scalar(ScalarField::Website, "https://second.example", RANK_PRIMARY_HOST),
        ],
    );
    assert_eq!(record.website.as_deref(), Some("https://first.example"));
}

#[test]
fn test_same_sequence_same_bytes() {
    let first = serde_json::to_vec(&merge_facts("annlee", sample_facts())).unwrap();
    let second = serde_json::to_vec(&merge_facts("annlee", sample_facts())).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_trailing_slash_variants_collapse() {
    let record = merge_facts(
        "annlee",
        vec![
            CandidateFact::account(Platform::Twitter, "https://x.com/annlee/", "annlee"),
            CandidateFact::account(Platform::Twitter, "https://x.com/annlee", "annlee"),
        ],
    );
    assert_eq!(record.accounts.len(), 1);
    assert_eq!(record.accounts[0].url, "https://x.com/annlee/");
}

#[test]
fn test_same_url_different_platform_kept() {
    let record = merge_facts(
        "annlee",
        vec![
            CandidateFact::account(Platform::Website, "https://ann.dev", "ann.dev"),
            CandidateFact::account(Platform::Medium, "https://ann.dev", "ann.dev"),
        ],
    );
    assert_eq!(record.accounts.len(), 2);
}

#[test]
fn test_incremental_merger_matches_batch() {
    let mut merger = ProfileMerger::new();
    for fact in sample_facts() {
        merger.apply(fact);
    }
    assert_eq!(merger.scalar(ScalarField::FullName), Some("Ann Lee"));
    assert_eq!(merger.account_count(), 4);
    assert_eq!(merger.finish("annlee"), merge_facts("annlee", sample_facts()));
}

#[test]
fn test_empty_input_reports_no_accounts() {
    let record = merge_facts("annlee", Vec::new());
    let json = serde_json::to_value(&record).unwrap();

    assert_eq!(json["username"], "annlee");
    assert_eq!(json["fullName"], "");
    assert_eq!(json["connected_accounts"], serde_json::json!([]));
    assert_eq!(json["error"], "No connected accounts found");
}
