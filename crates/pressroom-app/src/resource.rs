// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt;
use std::hash::Hash;

use crate::ids::*;
use crate::model::{Article, Comment, Ticket, User};
use crate::mutation::{Method, MutationReply, MutationRequest};
use crate::patch::Fields;

/// How filter parameters are put on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterEncoding {
    /// Only non-empty filter values are sent.
    OmitEmpty,
    /// Once any filter is set, every listed key is sent, empty ones as `""`.
    SendEmpty(&'static [&'static str]),
}

pub const TICKET_FILTER_KEYS: [&str; 5] = ["tid", "type", "begin", "end", "order"];

/// A backend collection the console can page through.
pub trait Resource:
    Clone + Default + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + 'static
{
    type Id: Clone + Eq + Ord + Hash + fmt::Debug + fmt::Display + Send + 'static;

    const PATH: &'static str;
    const ITEMS_KEY: &'static str;
    const FILTER_ENCODING: FilterEncoding = FilterEncoding::OmitEmpty;
    const REQUIRES_ADMIN: bool = false;

    fn id(&self) -> &Self::Id;

    fn is_unread(&self) -> bool {
        false
    }

    /// Local fields and server write that flag this record as read.
    fn mark_read(&self) -> Option<(Fields, MutationRequest)> {
        None
    }

    fn reply(&self, _answer: &str) -> Option<MutationRequest> {
        None
    }

    /// Fields to merge into the list entry once a reply went through.
    fn reply_fields(&self, _answer: &str, _reply: &MutationReply) -> Fields {
        Fields::new()
    }
}

impl Resource for Ticket {
    type Id = TicketId;

    const PATH: &'static str = "tickets";
    const ITEMS_KEY: &'static str = "tickets";
    const FILTER_ENCODING: FilterEncoding = FilterEncoding::SendEmpty(&TICKET_FILTER_KEYS);
    const REQUIRES_ADMIN: bool = true;

    fn id(&self) -> &TicketId {
        &self.id
    }

    fn is_unread(&self) -> bool {
        !self.content.readed
    }

    fn mark_read(&self) -> Option<(Fields, MutationRequest)> {
        let request = MutationRequest::new(Method::Patch, format!("tickets/{}", self.id))
            .with_body(json!({ "readed": true }));
        Some((Fields::new().with("content.readed", true), request))
    }

    fn reply(&self, answer: &str) -> Option<MutationRequest> {
        Some(
            MutationRequest::new(Method::Post, format!("tickets/{}", self.id))
                .with_body(json!({ "msg": answer })),
        )
    }

    fn reply_fields(&self, answer: &str, reply: &MutationReply) -> Fields {
        let mut fields = Fields::new();
        if let Some(Value::Object(updated)) = reply.entity() {
            if updated.contains_key("content") || updated.contains_key("responses") {
                for key in ["content", "responses"] {
                    if let Some(value) = updated.get(key) {
                        fields.insert(key, value.clone());
                    }
                }
            } else {
                fields.insert("content", Value::Object(updated.clone()));
            }
            return fields;
        }

        let mut responses = serde_json::to_value(&self.responses)
            .ok()
            .and_then(|value| value.as_array().cloned())
            .unwrap_or_default();
        responses.push(json!({ "msg": answer }));
        fields.insert("responses", Value::Array(responses));
        fields
    }
}

impl Resource for Comment {
    type Id = CommentId;

    const PATH: &'static str = "comments";
    const ITEMS_KEY: &'static str = "comments";

    fn id(&self) -> &CommentId {
        &self.id
    }

    fn is_unread(&self) -> bool {
        !self.readed
    }

    fn mark_read(&self) -> Option<(Fields, MutationRequest)> {
        let request = MutationRequest::new(Method::Patch, "comments")
            .with_body(json!({ "_id": self.id, "readed": true }));
        Some((Fields::new().with("readed", true), request))
    }

    fn reply(&self, answer: &str) -> Option<MutationRequest> {
        let mut body = serde_json::to_value(self).unwrap_or_else(|_| json!({ "_id": self.id }));
        if let Value::Object(map) = &mut body {
            map.insert("answer".to_owned(), Value::String(answer.to_owned()));
        }
        Some(MutationRequest::new(Method::Post, "comments").with_body(body))
    }

    fn reply_fields(&self, answer: &str, _reply: &MutationReply) -> Fields {
        Fields::new().with("answer", answer).with("readed", true)
    }
}

impl Resource for Article {
    type Id = ArticleId;

    const PATH: &'static str = "articles";
    const ITEMS_KEY: &'static str = "articles";

    fn id(&self) -> &ArticleId {
        &self.id
    }
}

impl Resource for User {
    type Id = UserId;

    const PATH: &'static str = "users";
    const ITEMS_KEY: &'static str = "users";
    const REQUIRES_ADMIN: bool = true;

    fn id(&self) -> &UserId {
        &self.id
    }
}
