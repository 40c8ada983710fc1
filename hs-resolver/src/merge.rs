//! Merge & Dedup Engine
//!
//! Folds the fact stream of one lookup into a `ProfileRecord`.
//!
//! - **Scalars:** each field keeps the value of the lowest-rank fact seen so
//!   far. A later fact replaces it only with a strictly lower rank, so ties
//!   keep the first arrival. Blank values are ignored.
//! - **Accounts:** inserted in first-seen order, keyed by
//!   `(platform, normalize_url(url))`. Later duplicates are discarded.
//!
//! The result depends only on the order facts are applied, never on timing.

use crate::classifier::normalize_url;
use crate::types::{
    AccountLink, CandidateFact, ConnectedAccount, Platform, ProfileRecord, ScalarField,
    SourceRank, NO_ACCOUNTS_FOUND,
};
use std::collections::HashSet;
use tracing::trace;

/// Scalar value with the rank of the fact that set it
#[derive(Debug, Clone, PartialEq, Eq)]
struct Ranked {
    value: String,
    rank: SourceRank,
}

/// Per-lookup accumulator; never shared across lookups
#[derive(Debug, Default)]
pub struct ProfileMerger {
    full_name: Option<Ranked>,
    bio: Option<Ranked>,
    location: Option<Ranked>,
    company: Option<Ranked>,
    avatar: Option<Ranked>,
    website: Option<Ranked>,
    accounts: Vec<AccountLink>,
    seen: HashSet<(Platform, String)>,
}

impl ProfileMerger {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&mut self, field: ScalarField) -> &mut Option<Ranked> {
        match field {
            ScalarField::FullName => &mut self.full_name,
            ScalarField::Bio => &mut self.bio,
            ScalarField::Location => &mut self.location,
            ScalarField::Company => &mut self.company,
            ScalarField::Avatar => &mut self.avatar,
            ScalarField::Website => &mut self.website,
        }
    }

    /// Apply one fact
    pub fn apply(&mut self, fact: CandidateFact) {
        match fact {
            CandidateFact::Scalar { field, value, rank } => {
                let value = value.trim();
                if value.is_empty() {
                    return;
                }
                let slot = self.slot(field);
                let replace = match slot {
                    Some(current) => rank < current.rank,
                    None => true,
                };
                if replace {
                    trace!(field = ?field, rank, "Scalar set");
                    *slot = Some(Ranked {
                        value: value.to_string(),
                        rank,
                    });
                }
            }
            CandidateFact::Account(link) => {
                let key = (link.platform, normalize_url(&link.url).to_string());
                if self.seen.insert(key) {
                    self.accounts.push(link);
                } else {
                    trace!(platform = %link.platform, url = %link.url, "Duplicate account dropped");
                }
            }
        }
    }

    /// Apply facts in order
    pub fn apply_all(&mut self, facts: impl IntoIterator<Item = CandidateFact>) {
        for fact in facts {
            self.apply(fact);
        }
    }

    /// Current winning value for a scalar field
    pub fn scalar(&self, field: ScalarField) -> Option<&str> {
        let slot = match field {
            ScalarField::FullName => &self.full_name,
            ScalarField::Bio => &self.bio,
            ScalarField::Location => &self.location,
            ScalarField::Company => &self.company,
            ScalarField::Avatar => &self.avatar,
            ScalarField::Website => &self.website,
        };
        slot.as_ref().map(|r| r.value.as_str())
    }

    pub fn account_count(&self) -> usize {
        self.accounts.len()
    }

    /// Produce the output record for `handle`
    pub fn finish(self, handle: &str) -> ProfileRecord {
        let accounts: Vec<ConnectedAccount> = self
            .accounts
            .into_iter()
            .map(|link| ConnectedAccount {
                platform: link.platform,
                username: link.handle,
                url: link.url,
                exists: true,
            })
            .collect();
        let error = accounts.is_empty().then(|| NO_ACCOUNTS_FOUND.to_string());

        ProfileRecord {
            handle: handle.to_string(),
            full_name: self.full_name.map(|r| r.value),
            bio: self.bio.map(|r| r.value),
            location: self.location.map(|r| r.value),
            company: self.company.map(|r| r.value),
            avatar: self.avatar.map(|r| r.value),
            website: self.website.map(|r| r.value),
            accounts,
            error,
        }
    }
}

/// Merge a complete, ordered fact list
pub fn merge_facts(handle: &str, facts: impl IntoIterator<Item = CandidateFact>) -> ProfileRecord {
    let mut merger = ProfileMerger::new();
    merger.apply_all(facts);
    merger.finish(handle)
}
