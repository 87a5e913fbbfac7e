//! Listing filter expressions
//!
//! A small boolean expression tree evaluated in memory or rendered to SQL.
//! Both renderings compare text folded with [`fold`], so a search returns the
//! same posts whichever storage backend is active.

use super::types::Post;

/// Longest search text honoured; the rest is ignored
pub const MAX_SEARCH_LEN: usize = 100;

/// Case folding shared by the in-memory matcher and the stored SQL columns
pub fn fold(text: &str) -> String {
    text.to_lowercase()
}

/// Case-insensitive literal search text
#[derive(Debug, Clone)]
pub struct SearchTerm {
    raw: String,
    folded: String,
}

impl SearchTerm {
    /// Blank input yields no term. Wildcard characters are matched literally.
    pub fn parse(input: &str) -> Option<Self> {
        let raw: String = input.trim().chars().take(MAX_SEARCH_LEN).collect();
        if raw.is_empty() {
            return None;
        }
        let folded = fold(&raw);
        Some(Self { raw, folded })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn folded(&self) -> &str {
        &self.folded
    }

    pub fn is_match(&self, haystack: &str) -> bool {
        fold(haystack).contains(&self.folded)
    }

    /// `%term%` over the folded term, LIKE wildcards escaped by `\`
    pub fn like_pattern(&self) -> String {
        let mut escaped = String::with_capacity(self.folded.len() + 2);
        escaped.push('%');
        for c in self.folded.chars() {
            if matches!(c, '%' | '_' | '\\') {
                escaped.push('\\');
            }
            escaped.push(c);
        }
        escaped.push('%');
        escaped
    }
}

impl PartialEq for SearchTerm {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for SearchTerm {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostFilter {
    All,
    Published,
    TitleMatches(SearchTerm),
    ContentMatches(SearchTerm),
    TagMatches(SearchTerm),
    And(Vec<PostFilter>),
    Or(Vec<PostFilter>),
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        match self {
            PostFilter::All => true,
            PostFilter::Published => post.published,
            PostFilter::TitleMatches(term) => term.is_match(&post.title),
            PostFilter::ContentMatches(term) => term.is_match(&post.content),
            PostFilter::TagMatches(term) => post.tags.iter().any(|tag| term.is_match(tag)),
            PostFilter::And(parts) => parts.iter().all(|p| p.matches(post)),
            PostFilter::Or(parts) => parts.iter().any(|p| p.matches(post)),
        }
    }

    /// Render as a SQL boolean over the `posts` table, pushing bind values in order
    pub fn to_sql(&self, binds: &mut Vec<String>) -> String {
        match self {
            PostFilter::All => "1 = 1".to_string(),
            PostFilter::Published => "posts.published = 1".to_string(),
            PostFilter::TitleMatches(term) => {
                binds.push(term.like_pattern());
                "posts.title_folded LIKE ? ESCAPE '\\'".to_string()
            }
            PostFilter::ContentMatches(term) => {
                binds.push(term.like_pattern());
                "posts.content_folded LIKE ? ESCAPE '\\'".to_string()
            }
            PostFilter::TagMatches(term) => {
                binds.push(term.like_pattern());
                "EXISTS (SELECT 1 FROM post_tags WHERE post_tags.post_id = posts.id AND post_tags.tag_folded LIKE ? ESCAPE '\\')".to_string()
            }
            PostFilter::And(parts) => join(parts, " AND ", "1 = 1", binds),
            PostFilter::Or(parts) => join(parts, " OR ", "1 = 0", binds),
        }
    }
}

fn join(parts: &[PostFilter], separator: &str, empty: &str, binds: &mut Vec<String>) -> String {
    if parts.is_empty() {
        return empty.to_string();
    }
    let rendered: Vec<String> = parts
        .iter()
        .map(|p| format!("({})", p.to_sql(binds)))
        .collect();
    rendered.join(separator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::visibility::listing_filter;
    use blogify_core::UserId;

    fn post(title: &str, content: &str, tags: &[&str], published: bool) -> Post {
        let mut post = Post::draft(UserId::from("author"), "author", title, content);
        post.tags = tags.iter().map(|t| t.to_string()).collect();
        post.published = published;
        post
    }

    #[test]
    fn blank_search_is_none() {
        assert!(SearchTerm::parse("   ").is_none());
        assert_eq!(SearchTerm::parse("  api ").unwrap().as_str(), "api");
    }

    #[test]
    fn search_is_literal_and_case_insensitive() {
        let term = SearchTerm::parse("a.b").unwrap();
        assert!(term.is_match("see A.B here"));
        assert!(!term.is_match("aXb"));
    }

    #[test]
    fn anonymous_search_never_returns_drafts() {
        let posts = vec![
            post("API design", "body", &[], true),
            post("API secrets", "body", &[], false),
            post("Other", "talks about the api", &[], false),
            post("Other", "nothing", &["API"], false),
            post("Other", "nothing", &["rust"], true),
            post("Rust", "mentions api", &[], true),
        ];

        let filter = listing_filter(None, SearchTerm::parse("api"));
        let titles: Vec<_> = posts
            .iter()
            .filter(|p| filter.matches(p))
            .map(|p| (p.title.as_str(), p.published))
            .collect();

        assert_eq!(titles, vec![("API design", true), ("Rust", true)]);
    }

    #[test]
    fn tag_clause_matches_any_tag() {
        let p = post("x", "y", &["Web", "APIs"], true);
        assert!(PostFilter::TagMatches(SearchTerm::parse("api").unwrap()).matches(&p));
    }

    #[test]
    fn like_pattern_escapes_wildcards() {
        let term = SearchTerm::parse("50%_OFF").unwrap();
        assert_eq!(term.like_pattern(), "%50\\%\\_off%");
    }

    #[test]
    fn folding_covers_non_ascii_letters() {
        let term = SearchTerm::parse("ÉTÉ").unwrap();
        assert_eq!(term.folded(), "été");
        assert!(term.is_match("Été à Paris"));
        assert!(PostFilter::TagMatches(term).matches(&post("x", "y", &["ÉtÉ"], true)));
    }

    #[test]
    fn sql_keeps_published_outside_the_disjunction() {
        let filter = listing_filter(None, SearchTerm::parse("api"));
        let mut binds = Vec::new();
        let sql = filter.to_sql(&mut binds);

        assert!(sql.starts_with("(posts.published = 1) AND (("));
        assert_eq!(binds.len(), 3);
        assert!(binds.iter().all(|b| b == "%api%"));
    }
}
