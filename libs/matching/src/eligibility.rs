//! Selects the users taking part in a matching run

use tracing::{error, info};

use crate::model::{CandidateProfile, UserForMatching, UserRecord, non_empty};
use crate::store::MatchStore;

/// A user is eligible with a non-empty current focus and at least one
/// expertise claim or one open help request.
pub fn is_eligible(profile: &CandidateProfile) -> bool {
    non_empty(profile.user.current_focus.as_deref()).is_some()
        && (!profile.claims.is_empty() || profile.requests.iter().any(|r| r.is_open()))
}

/// "{role} with {years} years of experience in {industry}." plus the free
/// text background when present
pub fn general_background(user: &UserRecord) -> String {
    let role = non_empty(user.role_title.as_deref()).unwrap_or("Professional");
    let years = match user.experience_years {
        Some(years) if years > 0 => years.to_string(),
        _ => "some".to_string(),
    };
    let industry = non_empty(user.industry.as_deref()).unwrap_or("various fields");

    let mut background = format!("{role} with {years} years of experience in {industry}.");
    if let Some(text) = non_empty(user.background.as_deref()) {
        background.push(' ');
        background.push_str(text);
    }
    background
}

/// Shape a candidate into the record the prompt builder consumes
pub fn shape_user(profile: &CandidateProfile) -> UserForMatching {
    let proven_expertise = profile
        .claims
        .iter()
        .map(|claim| format!("{}: {}", claim.title, claim.proof))
        .collect();

    let current_asks = profile
        .requests
        .iter()
        .filter(|request| request.is_open())
        .map(|request| format!("{} ({})", request.headline(), request.help_type))
        .collect();

    UserForMatching {
        id: profile.user.id.clone(),
        name: profile.user.name.clone(),
        proven_expertise,
        current_asks,
        general_background: general_background(&profile.user),
    }
}

pub fn select_eligible(profiles: &[CandidateProfile]) -> Vec<UserForMatching> {
    profiles
        .iter()
        .filter(|profile| is_eligible(profile))
        .map(shape_user)
        .collect()
}

/// Load and shape every eligible user. A failed read is logged and yields
/// an empty list, which callers treat as too few users.
pub async fn load_eligible_users(store: &dyn MatchStore) -> Vec<UserForMatching> {
    match store.matching_candidates().await {
        Ok(profiles) => {
            let eligible = select_eligible(&profiles);
            info!(
                candidates = profiles.len(),
                eligible = eligible.len(),
                "Selected users for matching"
            );
            eligible
        }
        Err(e) => {
            error!(error = %e, "Failed to load users for matching");
            Vec::new()
        }
    }
}
