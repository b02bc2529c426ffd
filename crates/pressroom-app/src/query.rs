// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use std::collections::BTreeMap;

use crate::Revision;
use crate::TICKET_FILTER_KEYS;
use crate::model::TicketType;

pub const ALLOWED_LIMITS: [u32; 4] = [5, 10, 25, 50];
pub const DEFAULT_LIMIT: u32 = 10;

pub fn validate_limit(limit: u32) -> Result<()> {
    if !ALLOWED_LIMITS.contains(&limit) {
        bail!("page size {limit} is not supported -- choose one of {ALLOWED_LIMITS:?}");
    }
    Ok(())
}

/// Number of pages needed to show `total` rows at `limit` per page.
pub fn page_count(total: u64, limit: u32) -> u64 {
    if limit == 0 {
        return 0;
    }
    total.div_ceil(u64::from(limit))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Desc,
    Asc,
}

impl SortOrder {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Desc => "desc",
            Self::Asc => "asc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "desc" => Some(Self::Desc),
            "asc" => Some(Self::Asc),
            _ => None,
        }
    }

    pub const fn toggled(self) -> Self {
        match self {
            Self::Desc => Self::Asc,
            Self::Asc => Self::Desc,
        }
    }
}

/// Filter predicate keyed by backend parameter name. Empty values mean "no constraint".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter(BTreeMap<String, String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keys that actually constrain the result set.
    pub fn constraints(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Parses `key=value` pairs separated by whitespace or commas.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut filter = Self::new();
        for pair in raw
            .split(|ch: char| ch.is_whitespace() || ch == ',')
            .filter(|pair| !pair.is_empty())
        {
            let Some((key, value)) = pair.split_once('=') else {
                bail!("filter {pair:?} must look like key=value");
            };
            let key = key.trim();
            if key.is_empty() {
                bail!("filter {pair:?} is missing a key");
            }
            filter = filter.with(key, value.trim());
        }
        Ok(filter)
    }

    pub fn describe(&self) -> String {
        let parts: Vec<String> = self
            .constraints()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        if parts.is_empty() {
            "none".to_owned()
        } else {
            parts.join(" ")
        }
    }
}

/// Ticket search form as the filter panel submits it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TicketFilterForm {
    pub ticket: String,
    pub ticket_type: Option<TicketType>,
    pub begin: String,
    pub end: String,
    pub order: SortOrder,
}

impl TicketFilterForm {
    /// Accepts the panel's "n/d" type choice as "any type".
    pub fn parse_type(raw: &str) -> Result<Option<TicketType>> {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/d") {
            return Ok(None);
        }
        match TicketType::parse(trimmed) {
            Some(kind) => Ok(Some(kind)),
            None => bail!("unknown ticket type {trimmed:?}"),
        }
    }

    /// Reads `tid=.. type=.. begin=.. end=.. order=..` text; `order` defaults to desc.
    pub fn parse(raw: &str) -> Result<Self> {
        let mut form = Self::default();
        for (key, value) in Filter::parse(raw)?.constraints() {
            match key {
                "tid" => form.ticket = value.to_owned(),
                "type" => form.ticket_type = Self::parse_type(value)?,
                "begin" => form.begin = value.to_owned(),
                "end" => form.end = value.to_owned(),
                "order" => {
                    let Some(order) = SortOrder::parse(value) else {
                        bail!("order must be asc or desc, not {value:?}");
                    };
                    form.order = order;
                }
                _ => bail!(
                    "unknown ticket filter {key:?} -- use one of {}",
                    TICKET_FILTER_KEYS.join(", ")
                ),
            }
        }
        Ok(form)
    }

    pub fn to_filter(&self) -> Filter {
        Filter::new()
            .with("tid", self.ticket.trim())
            .with("type", self.ticket_type.map_or("", TicketType::as_str))
            .with("begin", self.begin.trim())
            .with("end", self.end.trim())
            .with("order", self.order.as_str())
    }
}

/// Immutable description of what a view should be showing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryState {
    page: u32,
    limit: u32,
    filter: Filter,
    revision: Revision,
}

impl Default for QueryState {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
            filter: Filter::default(),
            revision: Revision::ZERO,
        }
    }
}

impl QueryState {
    pub fn new(limit: u32) -> Result<Self> {
        validate_limit(limit)?;
        Ok(Self {
            limit,
            ..Self::default()
        })
    }

    pub const fn page(&self) -> u32 {
        self.page
    }

    pub const fn limit(&self) -> u32 {
        self.limit
    }

    pub const fn filter(&self) -> &Filter {
        &self.filter
    }

    pub const fn revision(&self) -> Revision {
        self.revision
    }

    pub fn with_page(&self, page: u32) -> Result<Self> {
        if page == 0 {
            bail!("page numbers start at 1");
        }
        Ok(Self {
            page,
            revision: self.revision.next(),
            ..self.clone()
        })
    }

    pub fn with_limit(&self, limit: u32) -> Result<Self> {
        validate_limit(limit)?;
        Ok(Self {
            page: 1,
            limit,
            revision: self.revision.next(),
            filter: self.filter.clone(),
        })
    }

    pub fn with_filter(&self, filter: Filter) -> Self {
        Self {
            page: 1,
            limit: self.limit,
            filter,
            revision: self.revision.next(),
        }
    }

    /// Same view, new revision; used for manual refresh.
    pub fn reissued(&self) -> Self {
        Self {
            revision: self.revision.next(),
            ..self.clone()
        }
    }
}
