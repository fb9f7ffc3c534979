pub const MAX_PLAYER_NAME_LENGTH: usize = 20;

pub fn sanitize_player_name(name: &str, fallback: &str) -> String {
    let cleaned = name.split_whitespace().collect::<Vec<_>>().join(" ");
    if cleaned.is_empty() {
        return fallback.to_string();
    }
    cleaned.chars().take(MAX_PLAYER_NAME_LENGTH).collect()
}

/// Participant ids double as display names, so a name already in the roster
/// gets a numeric suffix: `ana`, `ana-2`, `ana-3`, ...
pub fn unique_participant_id<'a, I>(name: &str, taken: I) -> String
where
    I: IntoIterator<Item = &'a String> + Clone,
{
    let is_taken = |candidate: &str| taken.clone().into_iter().any(|id| id == candidate);
    if !is_taken(name) {
        return name.to_string();
    }
    (2..)
        .map(|suffix| format!("{name}-{suffix}"))
        .find(|candidate| !is_taken(candidate))
        .unwrap_or_else(|| name.to_string())
}
