// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::ids::*;

/// Backend-only attributes carried through untouched.
pub type Extra = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketType {
    AccountChanged,
    SimpleAccountProblem,
    BugReport,
    ImprovementSuggestion,
}

impl TicketType {
    pub const ALL: [Self; 4] = [
        Self::AccountChanged,
        Self::SimpleAccountProblem,
        Self::BugReport,
        Self::ImprovementSuggestion,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccountChanged => "account-changed",
            Self::SimpleAccountProblem => "simple-account-problem",
            Self::BugReport => "bug-report",
            Self::ImprovementSuggestion => "improvement-suggestion",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "account-changed" => Some(Self::AccountChanged),
            "simple-account-problem" => Some(Self::SimpleAccountProblem),
            "bug-report" => Some(Self::BugReport),
            "improvement-suggestion" => Some(Self::ImprovementSuggestion),
            _ => None,
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::AccountChanged => "account changed (profile 2)",
            Self::SimpleAccountProblem => "account changed (profile 1)",
            Self::BugReport => "bug report",
            Self::ImprovementSuggestion => "improvement suggestion",
        }
    }

    pub fn label_for(raw: &str) -> &'static str {
        Self::parse(raw).map_or("N/D", Self::label)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketContent {
    #[serde(default)]
    pub readed: bool,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub msg: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketParty {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    #[serde(default)]
    pub msg: String,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub created_at: Option<OffsetDateTime>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(rename = "_id")]
    pub id: TicketId,
    #[serde(default)]
    pub content: TicketContent,
    #[serde(default)]
    pub user: TicketParty,
    #[serde(default)]
    pub admin: TicketParty,
    #[serde(default)]
    pub responses: Vec<TicketResponse>,
    #[serde(flatten)]
    pub extra: Extra,
}

impl Ticket {
    pub fn ticket_type(&self) -> Option<TicketType> {
        TicketType::parse(&self.content.kind)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArticleRef {
    #[serde(default)]
    pub title: String,
    #[serde(rename = "customURL", default)]
    pub custom_url: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: CommentId,
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub readed: bool,
    #[serde(default)]
    pub confirmed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article: Option<ArticleRef>,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    #[serde(rename = "_id")]
    pub id: ArticleId,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "customURL", default)]
    pub custom_url: String,
    #[serde(default)]
    pub small_img: String,
    #[serde(default)]
    pub medium_img: String,
    #[serde(default)]
    pub big_img: String,
    #[serde(flatten)]
    pub extra: Extra,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: UserId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confirm_email: Option<String>,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub cellphone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub number: String,
    #[serde(default)]
    pub profile_photo: String,
    #[serde(default)]
    pub tag_admin: bool,
    #[serde(flatten)]
    pub extra: Extra,
}

/// Identity of the signed-in staff member, handed to each view explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user_id: UserId,
    pub name: String,
    pub tag_admin: bool,
    pub token: Option<String>,
}

impl Session {
    pub const fn is_admin(&self) -> bool {
        self.tag_admin
    }

    pub const fn access_label(&self) -> &'static str {
        if self.tag_admin { "administrator" } else { "author" }
    }

    pub fn greeting(&self) -> String {
        format!(
            "hello {}, your current access level is: {}",
            self.name,
            self.access_label()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::{Comment, Session, Ticket, TicketType};
    use anyhow::Result;

    #[test]
    fn ticket_type_labels_fall_back_to_not_defined() {
        assert_eq!(TicketType::label_for("bug-report"), "bug report");
        assert_eq!(TicketType::label_for("something-else"), "N/D");
        for kind in TicketType::ALL {
            assert_eq!(TicketType::parse(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn ticket_decodes_backend_shape_and_keeps_unknown_fields() -> Result<()> {
        let raw = r#"{
            "_id": "t1",
            "content": {"readed": false, "type": "bug-report", "email": "a@b.c",
                        "createdAt": "2020-05-01T12:00:00Z", "browser": "firefox"},
            "responses": [{"msg": "looking into it"}],
            "priority": 3
        }"#;
        let ticket: Ticket = serde_json::from_str(raw)?;
        assert_eq!(ticket.id.as_str(), "t1");
        assert_eq!(ticket.ticket_type(), Some(TicketType::BugReport));
        assert!(ticket.content.created_at.is_some());
        assert_eq!(ticket.content.extra["browser"], "firefox");
        assert_eq!(ticket.extra["priority"], 3);
        assert_eq!(ticket.responses.len(), 1);

        let encoded = serde_json::to_value(&ticket)?;
        assert_eq!(encoded["content"]["type"], "bug-report");
        assert_eq!(encoded["priority"], 3);
        Ok(())
    }

    #[test]
    fn default_ticket_is_a_renderable_sentinel() -> Result<()> {
        let sentinel = Ticket::default();
        assert!(sentinel.id.is_empty());
        assert!(sentinel.responses.is_empty());
        let encoded = serde_json::to_value(&sentinel)?;
        assert!(encoded["content"].is_object());
        assert!(encoded["user"].is_object());
        assert!(encoded["admin"].is_object());
        Ok(())
    }

    #[test]
    fn comment_uses_camel_case_wire_names() -> Result<()> {
        let comment: Comment = serde_json::from_str(
            r#"{"_id":"c1","userName":"Ana","userEmail":"ana@x.io","comment":"nice","readed":true,
               "article":{"title":"Rust","customURL":"rust"}}"#,
        )?;
        assert_eq!(comment.user_name, "Ana");
        assert!(comment.readed);
        assert_eq!(comment.article.map(|a| a.custom_url), Some("rust".to_owned()));
        Ok(())
    }

    #[test]
    fn session_reports_access_level() {
        let session = Session {
            name: "Rita".to_owned(),
            tag_admin: true,
            ..Session::default()
        };
        assert_eq!(session.access_label(), "administrator");
        assert!(session.greeting().contains("Rita"));
        assert_eq!(Session::default().access_label(), "author");
    }
}
