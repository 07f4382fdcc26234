//! Who may talk to the bot: DM and group policies plus allowlist matching.

use serde::{Deserialize, Serialize};

/// Whether `id` matches an allowlist entry.
///
/// An empty list admits everyone. Matching ignores ASCII case, and `*` in an
/// entry matches any run of characters, so `29:admin_*` or `*@contoso.com`
/// work as expected.
pub fn is_allowed(id: &str, allowlist: &[String]) -> bool {
    if allowlist.is_empty() {
        return true;
    }
    let id = id.to_ascii_lowercase();
    allowlist
        .iter()
        .any(|entry| wildcard_match(&entry.to_ascii_lowercase(), &id))
}

/// `*`-only glob match with single-star backtracking.
fn wildcard_match(pattern: &str, text: &str) -> bool {
    let (p, t) = (pattern.as_bytes(), text.as_bytes());
    let (mut pi, mut ti) = (0, 0);
    let mut star: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && p[pi] == b'*' {
            star = Some((pi, ti));
            pi += 1;
        } else if pi < p.len() && p[pi] == t[ti] {
            pi += 1;
            ti += 1;
        } else if let Some((star_pi, star_ti)) = star {
            pi = star_pi + 1;
            ti = star_ti + 1;
            star = Some((star_pi, star_ti + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == b'*')
}

/// When the bot reacts in group conversations.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MentionMode {
    /// Only when @mentioned.
    #[default]
    Mention,
    Always,
    /// Never in groups.
    None,
}

/// Who may message the bot 1:1.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DmPolicy {
    Open,
    /// Senders matching `allowlist`. An empty list admits everyone.
    #[default]
    Allowlist,
    Disabled,
}

/// Which group conversations the bot takes part in.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GroupPolicy {
    #[default]
    Open,
    /// Conversations matching `group_allowlist`.
    Allowlist,
    Disabled,
}
