//! Renders eligible users into the matching prompt

use crate::model::UserForMatching;

/// Proposals at or below this score are discarded
pub const MIN_MUTUAL_SCORE: f64 = 6.0;

/// Highest score a proposal may carry
pub const MAX_MUTUAL_SCORE: f64 = 10.0;

const NONE_LISTED: &str = "None listed";

/// Each person is matched at most once, so at most half of them pair up
pub fn target_match_count(user_count: usize) -> usize {
    user_count / 2
}

fn bullet_list(items: &[String]) -> String {
    if items.is_empty() {
        return NONE_LISTED.to_string();
    }
    items
        .iter()
        .map(|item| format!("- {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the prompt for a matching run. Every user block carries a
/// `USER_ID:` line the model must echo back unchanged.
pub fn build_prompt(users: &[UserForMatching]) -> String {
    let mut prompt = String::from(
        "You are matching professionals for reciprocal help exchanges. \
         Each person below can offer help and may need help.\n\n",
    );

    for (index, user) in users.iter().enumerate() {
        prompt.push_str(&format!(
            "PERSON {number}\n\
             USER_ID: {id}\n\
             Name: {name}\n\
             Proven expertise:\n{expertise}\n\
             Background: {background}\n\
             Current asks:\n{asks}\n\n",
            number = index + 1,
            id = user.id,
            name = user.name,
            expertise = bullet_list(&user.proven_expertise),
            background = user.general_background,
            asks = bullet_list(&user.current_asks),
        ));
    }

    prompt.push_str(&format!(
        "MATCHING PRIORITIES:\n\
         1. Direct matches: one person's proven expertise answers the other's current ask.\n\
         2. Background matches: one person's background answers the other's current ask.\n\
         Prefer pairs where both people give and get something.\n\n\
         RULES:\n\
         - Each person may appear in at most one match.\n\
         - Aim for {target} matches.\n\
         - Only return matches with a mutual_score above {min:.1} (scale 0 to {max:.0}).\n\
         - Copy each USER_ID exactly as written above.\n\n\
         Respond with a JSON array only, no prose and no explanation, using this schema:\n\
         [\n  {{\n    \"user1_id\": \"<USER_ID>\",\n    \"user2_id\": \"<USER_ID>\",\n    \
         \"match_type\": \"mutual\",\n    \"mutual_score\": 8.5,\n    \
         \"user1_gives\": \"what the first person offers\",\n    \
         \"user1_gets\": \"what the first person receives\",\n    \
         \"user2_gives\": \"what the second person offers\",\n    \
         \"user2_gets\": \"what the second person receives\",\n    \
         \"rationale\": \"why this pairing works\"\n  }}\n]\n\
         If no pair qualifies, respond with [].\n",
        target = target_match_count(users.len()),
        min = MIN_MUTUAL_SCORE,
        max = MAX_MUTUAL_SCORE,
    ));

    prompt
}
