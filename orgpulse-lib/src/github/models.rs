//! Serde shapes for the upstream JSON payloads.
//!
//! Only the fields the pipeline reads are modelled; everything else in the
//! responses is ignored.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;

/// A user reference embedded in other payloads
#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub login: String,
}

/// An entry from `/orgs/{org}/repos`
#[derive(Debug, Deserialize)]
pub struct OrgRepository {
    pub name: String,
    pub owner: Account,
}

/// Metadata from `/repos/{owner}/{name}`
#[derive(Debug, Default, Deserialize)]
pub struct RepositoryInfo {
    #[serde(default)]
    pub stargazers_count: u64,
    #[serde(default)]
    pub forks_count: u64,
}

/// An entry from `/repos/{owner}/{name}/contributors`
///
/// Anonymous contributors carry no login and are skipped.
#[derive(Debug, Deserialize)]
pub struct Contributor {
    pub login: Option<String>,
}

/// Envelope shared by every `/search/*` endpoint
#[derive(Debug, Deserialize)]
pub struct SearchPage<T> {
    #[serde(default)]
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// An item from `/search/issues`, either an issue or a pull request
#[derive(Debug, Deserialize)]
pub struct IssueItem {
    pub user: Option<Account>,
    pub created_at: DateTime<FixedOffset>,
    pub closed_at: Option<DateTime<FixedOffset>>,
    pub pull_request: Option<PullRequestMarker>,
}

/// Present on search items that are pull requests
#[derive(Debug, Deserialize)]
pub struct PullRequestMarker {
    pub merged_at: Option<DateTime<FixedOffset>>,
}

/// An item from `/search/commits`
///
/// `author` is the linked account, which is null when the commit email does
/// not map to any user.
#[derive(Debug, Deserialize)]
pub struct CommitItem {
    pub author: Option<Account>,
    pub commit: CommitDetail,
}

#[derive(Debug, Deserialize)]
pub struct CommitDetail {
    pub author: CommitSignature,
}

#[derive(Debug, Deserialize)]
pub struct CommitSignature {
    pub date: DateTime<FixedOffset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_org_repository_deserialize() {
        let json = r#"{
            "id": 1,
            "name": "widgets",
            "full_name": "acme/widgets",
            "owner": { "login": "acme", "type": "Organization" }
        }"#;

        let repo: OrgRepository = serde_json::from_str(json).unwrap();
        assert_eq!(repo.name, "widgets");
        assert_eq!(repo.owner.login, "acme");
    }

    #[test]
    fn test_repository_info_missing_counts() {
        let info: RepositoryInfo = serde_json::from_str("{}").unwrap();
        assert_eq!(info.stargazers_count, 0);
        assert_eq!(info.forks_count, 0);
    }

    #[test]
    fn test_anonymous_contributor() {
        let json = r#"[{ "login": "alice", "contributions": 3 }, { "type": "Anonymous", "contributions": 1 }]"#;
        let contributors: Vec<Contributor> = serde_json::from_str(json).unwrap();
        assert_eq!(contributors[0].login.as_deref(), Some("alice"));
        assert!(contributors[1].login.is_none());
    }

    #[test]
    fn test_issue_search_page() {
        let json = r#"{
            "total_count": 2,
            "incomplete_results": false,
            "items": [
                {
                    "user": { "login": "alice" },
                    "created_at": "2024-03-01T10:00:00Z",
                    "closed_at": "2024-03-02T10:00:00Z",
                    "pull_request": { "url": "https://example.invalid", "merged_at": "2024-03-02T09:00:00Z" }
                },
                {
                    "user": null,
                    "created_at": "2024-03-05T10:00:00Z",
                    "closed_at": null
                }
            ]
        }"#;

        let page: SearchPage<IssueItem> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_count, 2);
        assert_eq!(page.items.len(), 2);
        assert!(page.items[0].pull_request.as_ref().unwrap().merged_at.is_some());
        assert!(page.items[1].user.is_none());
        assert!(page.items[1].pull_request.is_none());
    }

    #[test]
    fn test_commit_search_keeps_offset_date() {
        let json = r#"{
            "total_count": 1,
            "items": [
                {
                    "author": { "login": "bob" },
                    "commit": { "author": { "name": "Bob", "date": "2024-03-01T23:30:00.000+02:00" } }
                }
            ]
        }"#;

        let page: SearchPage<CommitItem> = serde_json::from_str(json).unwrap();
        let date = page.items[0].commit.author.date.date_naive();
        assert_eq!(date.to_string(), "2024-03-01");
    }

    #[test]
    fn test_search_page_without_items() {
        let page: SearchPage<CommitItem> = serde_json::from_str(r#"{ "total_count": 0 }"#).unwrap();
        assert!(page.items.is_empty());
        assert!(!page.incomplete_results);
    }
}
