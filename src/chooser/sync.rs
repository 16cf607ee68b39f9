use poise::serenity_prelude::ReactionType;

/// What to do with a member's role so that it mirrors their reaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleAction {
    Add,
    Remove,
    None,
}

/// Role change that makes membership match the presence of the reaction.
/// Shared by the reaction add and remove handlers.
pub fn role_action(has_reaction: bool, has_role: bool) -> RoleAction {
    match (has_reaction, has_role) {
        (true, false) => RoleAction::Add,
        (false, true) => RoleAction::Remove,
        _ => RoleAction::None,
    }
}

/// Compares a configured icon with a reaction emoji. Unicode emoji are
/// compared without the emoji presentation selector, custom ones by id.
pub fn emoji_matches(icon: &ReactionType, emoji: &ReactionType) -> bool {
    match (icon, emoji) {
        (ReactionType::Unicode(a), ReactionType::Unicode(b)) => {
            strip_selector(a) == strip_selector(b)
        }
        (ReactionType::Custom { id: a, .. }, ReactionType::Custom { id: b, .. }) => a == b,
        _ => false,
    }
}

fn strip_selector(emoji: &str) -> String {
    emoji.chars().filter(|c| *c != '\u{fe0f}').collect()
}
