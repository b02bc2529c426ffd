// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Deserialize;

use crate::error::ApiError;
use crate::ids::ArticleId;
use crate::model::Comment;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct Counter {
    #[serde(default)]
    count: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct CommentCounter {
    #[serde(default)]
    count: u64,
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
struct StatsPayload {
    #[serde(default)]
    views: Counter,
    #[serde(default)]
    likes: Counter,
    #[serde(default)]
    comments: CommentCounter,
}

/// Audience figures of one article with its latest comments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleStats {
    pub views: u64,
    pub likes: u64,
    pub comment_count: u64,
    pub comments: Vec<Comment>,
}

impl ArticleStats {
    pub fn from_json(body: &str) -> Result<Self, ApiError> {
        let payload: StatsPayload = serde_json::from_str(body)
            .map_err(|error| ApiError::Unknown(format!("decode article stats: {error}")))?;
        Ok(Self {
            views: payload.views.count,
            likes: payload.likes.count,
            comment_count: payload.comments.count,
            comments: payload.comments.comments,
        })
    }

    pub fn unread_comments(&self) -> usize {
        self.comments.iter().filter(|comment| !comment.readed).count()
    }
}

pub trait ArticleStatsSource: Send + Sync {
    fn article_stats(&self, id: &ArticleId) -> Result<ArticleStats, ApiError>;
}

/// Rejects a blank id before any request is made.
pub fn load_article_stats(
    source: &dyn ArticleStatsSource,
    id: &ArticleId,
) -> anyhow::Result<ArticleStats> {
    if id.is_empty() {
        anyhow::bail!("article has no id yet -- save it before viewing statistics");
    }
    Ok(source.article_stats(id)?)
}

#[cfg(test)]
mod tests {
    use super::ArticleStats;
    use crate::ApiError;

    #[test]
    fn decodes_nested_counters() -> Result<(), ApiError> {
        let stats = ArticleStats::from_json(
            r#"{
                "views": {"count": 120},
                "likes": {"count": 7},
                "comments": {
                    "count": 2,
                    "comments": [
                        {"_id": "c1", "userName": "Ana", "comment": "nice", "readed": true},
                        {"_id": "c2", "userName": "Bia", "comment": "hmm"}
                    ]
                }
            }"#,
        )?;
        assert_eq!(stats.views, 120);
        assert_eq!(stats.likes, 7);
        assert_eq!(stats.comment_count, 2);
        assert_eq!(stats.comments.len(), 2);
        assert_eq!(stats.unread_comments(), 1);
        Ok(())
    }

    #[test]
    fn missing_sections_default_to_zero() -> Result<(), ApiError> {
        let stats = ArticleStats::from_json(r#"{"views": {"count": 3}}"#)?;
        assert_eq!(stats.views, 3);
        assert_eq!(stats.likes, 0);
        assert!(stats.comments.is_empty());
        Ok(())
    }

    #[test]
    fn malformed_body_is_unknown_error() {
        assert!(matches!(
            ArticleStats::from_json("not json"),
            Err(ApiError::Unknown(_))
        ));
    }
}
