use crate::models::{DirectoryGroup, DirectoryUser};
use std::cmp::Ordering;

/// Enabled-state filter applied to the user collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EnabledFilter {
    #[default]
    All,
    EnabledOnly,
    DisabledOnly,
}

/// Sort orders for the user collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UserOrder {
    #[default]
    UserId,
    DisplayName,
    /// Most recent login first; users that never logged in sort after all
    /// users that have, ordered among themselves by identifier.
    LastLoginDesc,
}

/// Pure derivation over an immutable snapshot: filter, search, then sort.
/// Recomputed on every access; directory sizes are operator-scale.
pub fn filtered_users(
    users: &[DirectoryUser],
    filter: EnabledFilter,
    search: &str,
    order: UserOrder,
) -> Vec<DirectoryUser> {
    let mut selected: Vec<DirectoryUser> = users
        .iter()
        .filter(|u| matches_filter(u, filter))
        .filter(|u| matches_search(u, search))
        .cloned()
        .collect();
    sort_users(&mut selected, order);
    selected
}

fn matches_filter(user: &DirectoryUser, filter: EnabledFilter) -> bool {
    match filter {
        EnabledFilter::All => true,
        EnabledFilter::EnabledOnly => user.enabled,
        EnabledFilter::DisabledOnly => !user.enabled,
    }
}

/// Case-insensitive substring match over identifier, display name, and
/// email. An empty term matches everything.
pub fn matches_search(user: &DirectoryUser, term: &str) -> bool {
    if term.is_empty() {
        return true;
    }
    let term = term.to_lowercase();
    let haystacks = [
        Some(user.user_id.as_str()),
        user.display_name.as_deref(),
        user.email.as_deref(),
    ];
    haystacks
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&term))
}

pub fn sort_users(users: &mut [DirectoryUser], order: UserOrder) {
    match order {
        UserOrder::UserId => users.sort_by(|a, b| a.user_id.cmp(&b.user_id)),
        UserOrder::DisplayName => users.sort_by(|a, b| {
            let a_name = display_key(a);
            let b_name = display_key(b);
            a_name.cmp(&b_name).then_with(|| a.user_id.cmp(&b.user_id))
        }),
        UserOrder::LastLoginDesc => users.sort_by(|a, b| match (a.last_login, b.last_login) {
            (Some(a_ts), Some(b_ts)) => {
                b_ts.cmp(&a_ts).then_with(|| a.user_id.cmp(&b.user_id))
            }
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => a.user_id.cmp(&b.user_id),
        }),
    }
}

fn display_key(user: &DirectoryUser) -> String {
    user.display_name
        .as_deref()
        .unwrap_or(&user.user_id)
        .to_lowercase()
}

/// Groups whose name contains the term, case-insensitively, sorted by name.
pub fn filtered_groups(groups: &[DirectoryGroup], search: &str) -> Vec<DirectoryGroup> {
    let term = search.to_lowercase();
    let mut selected: Vec<DirectoryGroup> = groups
        .iter()
        .filter(|g| term.is_empty() || g.name.to_lowercase().contains(&term))
        .cloned()
        .collect();
    selected.sort();
    selected
}

/// Number of users carrying the group name, derived by scanning the user
/// collection.
pub fn group_member_count(users: &[DirectoryUser], group: &str) -> usize {
    users.iter().filter(|u| u.groups.contains(group)).count()
}

/// The members of a group, in user-id order.
pub fn group_members(users: &[DirectoryUser], group: &str) -> Vec<DirectoryUser> {
    let mut members: Vec<DirectoryUser> = users
        .iter()
        .filter(|u| u.groups.contains(group))
        .cloned()
        .collect();
    members.sort_by(|a, b| a.user_id.cmp(&b.user_id));
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::instant_from_epoch;
    use std::collections::BTreeSet;

    fn user(id: &str, enabled: bool, last_login: Option<i64>) -> DirectoryUser {
        DirectoryUser {
            user_id: id.to_string(),
            display_name: None,
            email: None,
            enabled,
            groups: BTreeSet::new(),
            quota: None,
            last_login: last_login.and_then(instant_from_epoch),
            created: None,
            backend: None,
        }
    }

    fn ids(users: &[DirectoryUser]) -> Vec<&str> {
        users.iter().map(|u| u.user_id.as_str()).collect()
    }

    #[test]
    fn enabled_filter_selects_by_state() {
        let users = vec![user("alice", true, None), user("bob", false, None)];
        let enabled = filtered_users(&users, EnabledFilter::EnabledOnly, "", UserOrder::UserId);
        assert_eq!(ids(&enabled), vec!["alice"]);
        let disabled = filtered_users(&users, EnabledFilter::DisabledOnly, "", UserOrder::UserId);
        assert_eq!(ids(&disabled), vec!["bob"]);
        let all = filtered_users(&users, EnabledFilter::All, "", UserOrder::UserId);
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn search_matches_id_display_name_and_email() {
        let mut carol = user("carol", true, None);
        carol.display_name = Some("Caroline Mtg".to_string());
        carol.email = Some("c.mtg@example.com".to_string());
        let users = vec![user("alice", true, None), carol];

        let by_id = filtered_users(&users, EnabledFilter::All, "ALI", UserOrder::UserId);
        assert_eq!(ids(&by_id), vec!["alice"]);
        let by_name = filtered_users(&users, EnabledFilter::All, "caroline", UserOrder::UserId);
        assert_eq!(ids(&by_name), vec!["carol"]);
        let by_email = filtered_users(&users, EnabledFilter::All, "example.com", UserOrder::UserId);
        assert_eq!(ids(&by_email), vec!["carol"]);
    }

    #[test]
    fn display_name_sort_falls_back_to_identifier() {
        let mut zed = user("zed", true, None);
        zed.display_name = Some("Aaron".to_string());
        let users = vec![user("alice", true, None), zed];
        let mut sorted = users.clone();
        sort_users(&mut sorted, UserOrder::DisplayName);
        // "Aaron" < "alice" case-insensitively.
        assert_eq!(ids(&sorted), vec!["zed", "alice"]);
    }

    #[test]
    fn last_login_sorts_descending_with_never_logged_in_last() {
        let users = vec![
            user("old", true, Some(1_000_000)),
            user("never_b", true, None),
            user("recent", true, Some(2_000_000)),
            user("never_a", true, None),
        ];
        let mut sorted = users.clone();
        sort_users(&mut sorted, UserOrder::LastLoginDesc);
        assert_eq!(ids(&sorted), vec!["recent", "old", "never_a", "never_b"]);
    }

    #[test]
    fn group_views_scan_user_membership() {
        let mut alice = user("alice", true, None);
        alice.groups = ["admin".to_string(), "users".to_string()]
            .into_iter()
            .collect();
        let mut bob = user("bob", false, None);
        bob.groups = ["users".to_string()].into_iter().collect();
        let users = vec![alice, bob];

        assert_eq!(group_member_count(&users, "users"), 2);
        assert_eq!(group_member_count(&users, "admin"), 1);
        assert_eq!(group_member_count(&users, "empty"), 0);
        assert_eq!(ids(&group_members(&users, "users")), vec!["alice", "bob"]);
    }

    #[test]
    fn group_search_is_case_insensitive() {
        let groups = vec![
            DirectoryGroup {
                name: "Admins".to_string(),
            },
            DirectoryGroup {
                name: "users".to_string(),
            },
        ];
        let hit = filtered_groups(&groups, "admin");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].name, "Admins");
        assert_eq!(filtered_groups(&groups, "").len(), 2);
    }
}
