//! Search while paged: combine an exact-match server search with a substring
//! filter over the page already on screen.

use std::collections::HashSet;

use crate::models::User;

/// Loaded users whose nickname contains `query` (case-sensitive)
pub fn client_matches(loaded: &[User], query: &str) -> Vec<User> {
    loaded
        .iter()
        .filter(|user| user.nick_name.contains(query))
        .cloned()
        .collect()
}

/// Merge server and client matches for `query`.
///
/// An empty query, or a server result exactly as long as the loaded page, gives
/// back `loaded` unchanged. Otherwise the result is the union of both match sets
/// de-duplicated by id; server matches come first in server order, then the
/// client-only matches in page order. Callers must not rely on that order.
pub fn search(loaded: &[User], server_matches: &[User], query: &str) -> Vec<User> {
    if query.is_empty() {
        return loaded.to_vec();
    }

    // Same size as the page: treat as a search that narrowed nothing
    if server_matches.len() == loaded.len() {
        return loaded.to_vec();
    }

    let mut seen = HashSet::new();
    server_matches
        .iter()
        .cloned()
        .chain(client_matches(loaded, query))
        .filter(|user| seen.insert(user.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Map;

    fn user(id: &str, nick_name: &str) -> User {
        User {
            id: id.to_string(),
            nick_name: nick_name.to_string(),
            birth: String::new(),
            mbti: String::new(),
            phone_number: String::new(),
            image_urls: Vec::new(),
            created_date: 0.0,
            extra: Map::new(),
        }
    }

    fn ids(users: &[User]) -> Vec<&str> {
        users.iter().map(|u| u.id.as_str()).collect()
    }

    #[test]
    fn test_empty_query_returns_loaded() {
        let loaded = vec![user("a", "mina"), user("b", "jun")];
        let server = vec![user("z", "zed")];

        assert_eq!(search(&loaded, &server, ""), loaded);
        assert_eq!(search(&loaded, &[], ""), loaded);
    }

    #[test]
    fn test_server_result_same_size_as_page_returns_loaded() {
        let loaded = vec![user("a", "A"), user("b", "B"), user("c", "C")];

        assert_eq!(search(&loaded, &loaded, "x"), loaded);
    }

    #[test]
    fn test_union_is_deduplicated_by_id() {
        let loaded = vec![user("a", "mina"), user("b", "minho"), user("c", "jun")];
        let server = vec![user("a", "mina"), user("q", "mi")];

        let result = search(&loaded, &server, "mi");
        assert_eq!(ids(&result), vec!["a", "q", "b"]);
    }

    #[test]
    fn test_substring_match_is_case_sensitive() {
        let loaded = vec![user("a", "Mina"), user("b", "mina")];

        assert_eq!(ids(&client_matches(&loaded, "min")), vec!["b"]);
    }
}
