//! Sender allowlist.
//!
//! Deny-by-default: an empty `allow_users` list lets no one in.

/// Returns `true` when the sender may talk to the bot.
///
/// Entries are matched as:
/// - `"*"`: everyone
/// - `"@name"` or `"name"`: Telegram username, ASCII case-insensitive
///   (Telegram treats usernames that way)
/// - `"123456789"`: numeric user ID
pub fn is_allowed(allow_users: &[String], username: Option<&str>, user_id: u64) -> bool {
    let id = user_id.to_string();
    allow_users.iter().any(|entry| {
        let entry = entry.trim();
        if entry == "*" || entry == id {
            return true;
        }
        let name = entry.strip_prefix('@').unwrap_or(entry);
        match username {
            Some(username) if !name.is_empty() => name.eq_ignore_ascii_case(username),
            _ => false,
        }
    })
}

/// True when no entry can ever match, i.e. every sender is ignored.
pub fn denies_everyone(allow_users: &[String]) -> bool {
    allow_users.iter().all(|entry| {
        let entry = entry.trim();
        entry.strip_prefix('@').unwrap_or(entry).is_empty()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(entries: &[&str]) -> Vec<String> {
        entries.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn empty_list_denies_everyone() {
        assert!(!is_allowed(&[], Some("alice"), 1));
        assert!(!is_allowed(&[], None, 1));
    }

    #[test]
    fn empty_or_blank_list_is_reported_as_deny_all() {
        assert!(denies_everyone(&[]));
        assert!(denies_everyone(&list(&["", "  ", "@"])));
        assert!(!denies_everyone(&list(&["*"])));
        assert!(!denies_everyone(&list(&["", "alice"])));
    }

    #[test]
    fn wildcard_allows_senders_without_username() {
        assert!(is_allowed(&list(&["*"]), None, 999));
    }

    #[test]
    fn username_with_or_without_at() {
        assert!(is_allowed(&list(&["alice"]), Some("alice"), 1));
        assert!(is_allowed(&list(&["@alice"]), Some("alice"), 1));
        assert!(!is_allowed(&list(&["@alice"]), Some("bob"), 2));
    }

    #[test]
    fn username_ignores_case() {
        assert!(is_allowed(&list(&["Alice"]), Some("alice"), 1));
    }

    #[test]
    fn numeric_id_matches_user_id() {
        assert!(is_allowed(&list(&["123456789"]), None, 123_456_789));
        assert!(!is_allowed(&list(&["123456789"]), Some("alice"), 1));
    }

    #[test]
    fn bare_at_matches_nobody() {
        assert!(!is_allowed(&list(&["@"]), Some(""), 1));
    }

    #[test]
    fn any_entry_may_match() {
        let users = list(&["alice", "987654321"]);
        assert!(is_allowed(&users, Some("bob"), 987_654_321));
        assert!(!is_allowed(&users, Some("carol"), 5));
    }
}
