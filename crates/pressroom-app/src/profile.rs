// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use serde_json::{Value, json};
use time::Date;
use time::macros::format_description;

use crate::UserId;
use crate::model::User;
use crate::mutation::{Method, MutationGateway, MutationReply, MutationRequest};
use crate::notify::{Notification, NotificationEmitter};

pub const NAME_MAX_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
    #[default]
    Undefined,
}

impl Gender {
    pub const ALL: [Self; 3] = [Self::Male, Self::Female, Self::Undefined];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Undefined => "undefined",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            "undefined" | "" => Some(Self::Undefined),
            _ => None,
        }
    }
}

/// Account details as the user edits them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileForm {
    pub name: String,
    pub email: String,
    pub gender: Gender,
    pub cellphone: String,
    pub birth_date: Option<Date>,
    pub address: String,
    pub number: String,
}

impl ProfileForm {
    pub fn from_user(user: &User) -> Self {
        Self {
            name: user.name.clone(),
            email: user.email.clone(),
            gender: Gender::parse(&user.gender).unwrap_or_default(),
            cellphone: user.cellphone.clone(),
            birth_date: user.birth_date.as_deref().and_then(parse_birth_date),
            address: user.address.clone(),
            number: user.number.clone(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            bail!("name is required -- enter a name and retry");
        }
        if name.chars().count() > NAME_MAX_CHARS {
            bail!("name is longer than {NAME_MAX_CHARS} characters -- shorten it and retry");
        }
        let email = self.email.trim();
        if email.is_empty() {
            bail!("e-mail is required -- enter an e-mail address and retry");
        }
        if !looks_like_email(email) {
            bail!("e-mail {email:?} is not a valid address -- check it and retry");
        }
        Ok(())
    }

    /// Body for `PUT users/{id}`; a changed address travels as `confirmEmail`.
    pub fn to_payload(&self, stored: &User) -> Result<Value> {
        self.validate()?;
        let mut body = json!({
            "name": self.name.trim(),
            "gender": self.gender.as_str(),
            "cellphone": self.cellphone.trim(),
            "birthDate": self.birth_date.map(|date| date.to_string()),
            "address": self.address.trim(),
            "number": self.number.trim(),
        });
        let email = self.email.trim();
        if let Value::Object(map) = &mut body {
            if email == stored.email {
                map.insert("email".to_owned(), Value::String(email.to_owned()));
            } else {
                map.insert("confirmEmail".to_owned(), Value::String(email.to_owned()));
            }
        }
        Ok(body)
    }

    pub fn email_changed(&self, stored: &User) -> bool {
        self.email.trim() != stored.email
    }
}

pub fn save_profile(stored: &User, form: &ProfileForm) -> Result<MutationRequest> {
    if stored.id.is_empty() {
        bail!("cannot save a profile without a user id");
    }
    let body = form.to_payload(stored)?;
    Ok(MutationRequest::new(Method::Put, format!("users/{}", stored.id)).with_body(body))
}

pub fn resend_email_confirmation(stored: &User) -> Result<MutationRequest> {
    let Some(pending) = stored.confirm_email.as_deref() else {
        bail!("there is no pending e-mail change to confirm");
    };
    Ok(email_request(Method::Post, &stored.id).with_body(json!({ "confirmEmail": pending })))
}

pub fn cancel_email_change(stored: &User) -> Result<MutationRequest> {
    if stored.confirm_email.is_none() {
        bail!("there is no pending e-mail change to cancel");
    }
    Ok(email_request(Method::Patch, &stored.id))
}

/// Sends a profile write and toasts the outcome; `done` is shown when the backend sends no text.
pub fn send_profile_change(
    gateway: &dyn MutationGateway,
    notifier: &dyn NotificationEmitter,
    request: &MutationRequest,
    done: &str,
) -> Result<MutationReply> {
    match gateway.mutate(request) {
        Ok(reply) => {
            tracing::debug!(method = request.method.as_str(), path = %request.path, "profile change saved");
            notifier.emit(Notification::success(reply.message().unwrap_or(done)));
            Ok(reply)
        }
        Err(error) => {
            notifier.emit(Notification::error(error.user_message()));
            Err(error.into())
        }
    }
}

/// Accepts `YYYY-MM-DD`, optionally followed by a time part; blank clears the date.
pub fn parse_birth_date_input(raw: &str) -> Result<Option<Date>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    match parse_birth_date(trimmed) {
        Some(date) => Ok(Some(date)),
        None => bail!("birth date {trimmed:?} must look like 1990-04-02"),
    }
}

fn email_request(method: Method, id: &UserId) -> MutationRequest {
    MutationRequest::new(method, format!("users/emails/{id}"))
}

fn parse_birth_date(raw: &str) -> Option<Date> {
    let day = raw.get(..10)?;
    Date::parse(day, format_description!("[year]-[month]-[day]")).ok()
}

fn looks_like_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}
