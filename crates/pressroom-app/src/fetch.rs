// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::Revision;
use crate::error::ApiError;
use crate::query::QueryState;
use crate::resource::{FilterEncoding, Resource};

/// Cooperative abort flag shared between a view and one in-flight request.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Wire-level description of one collection fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub path: &'static str,
    pub items_key: &'static str,
    pub page: u32,
    pub limit: u32,
    pub params: Vec<(String, String)>,
    pub revision: Revision,
}

impl PageRequest {
    pub fn for_query<R: Resource>(query: &QueryState) -> Self {
        Self {
            path: R::PATH,
            items_key: R::ITEMS_KEY,
            page: query.page(),
            limit: query.limit(),
            params: encode_filter(query, R::FILTER_ENCODING),
            revision: query.revision(),
        }
    }

    /// Every query parameter in send order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_owned(), self.page.to_string()),
            ("limit".to_owned(), self.limit.to_string()),
        ];
        pairs.extend(self.params.iter().cloned());
        pairs
    }
}

fn encode_filter(query: &QueryState, encoding: FilterEncoding) -> Vec<(String, String)> {
    let filter = query.filter();
    match encoding {
        FilterEncoding::OmitEmpty => filter
            .constraints()
            .map(|(key, value)| (key.to_owned(), value.to_owned()))
            .collect(),
        FilterEncoding::SendEmpty(keys) => {
            if filter.is_empty() {
                return Vec::new();
            }
            keys.iter()
                .map(|key| ((*key).to_owned(), filter.get(key).unwrap_or("").to_owned()))
                .collect()
        }
    }
}

/// Collection payload as decoded from the backend, before page invariants apply.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPage<R> {
    pub items: Vec<R>,
    pub count: u64,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<R> {
    items: Vec<R>,
    total_count: u64,
    effective_limit: u32,
}

impl<R> Page<R> {
    /// Falls back to `requested_limit` when the backend omits one and trims overflow.
    pub fn from_raw(raw: RawPage<R>, requested_limit: u32) -> Self {
        let effective_limit = raw
            .limit
            .filter(|limit| *limit > 0)
            .unwrap_or(requested_limit);
        let mut items = raw.items;
        if items.len() > effective_limit as usize {
            tracing::warn!(
                received = items.len(),
                limit = effective_limit,
                "backend returned more rows than the page size; extra rows dropped"
            );
            items.truncate(effective_limit as usize);
        }
        Self {
            items,
            total_count: raw.count,
            effective_limit,
        }
    }

    pub fn items(&self) -> &[R] {
        &self.items
    }

    pub(crate) fn items_mut(&mut self) -> &mut [R] {
        &mut self.items
    }

    pub const fn total_count(&self) -> u64 {
        self.total_count
    }

    pub const fn effective_limit(&self) -> u32 {
        self.effective_limit
    }
}

/// Transport for collection reads.
pub trait PageSource<R>: Send + Sync {
    fn fetch_page(&self, request: &PageRequest, cancel: &CancelToken)
    -> Result<RawPage<R>, ApiError>;
}

#[derive(Debug, Clone)]
pub struct FetchTicket {
    pub request: PageRequest,
    pub cancel: CancelToken,
}

impl FetchTicket {
    pub const fn revision(&self) -> Revision {
        self.request.revision
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome<R> {
    Success(Page<R>),
    Cancelled,
    Failure(ApiError),
}

#[derive(Debug)]
struct InFlight {
    revision: Revision,
    cancel: CancelToken,
}

/// Tracks which fetch is authoritative and classifies completions.
#[derive(Debug, Default)]
pub struct FetchController {
    latest: Option<Revision>,
    in_flight: Option<InFlight>,
}

impl FetchController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Supersedes any outstanding request and describes the new one.
    pub fn request<R: Resource>(&mut self, query: &QueryState) -> FetchTicket {
        if let Some(previous) = self.in_flight.take() {
            tracing::debug!(
                superseded = %previous.revision,
                by = %query.revision(),
                "cancelling outstanding fetch"
            );
            previous.cancel.cancel();
        }

        let request = PageRequest::for_query::<R>(query);
        let cancel = CancelToken::new();
        let revision = query.revision();
        self.latest = Some(self.latest.map_or(revision, |latest| latest.max(revision)));
        self.in_flight = Some(InFlight {
            revision,
            cancel: cancel.clone(),
        });
        tracing::debug!(
            resource = R::PATH,
            revision = %revision,
            page = request.page,
            limit = request.limit,
            "fetch issued"
        );
        FetchTicket { request, cancel }
    }

    pub fn resolve<R>(
        &mut self,
        revision: Revision,
        limit: u32,
        result: Result<RawPage<R>, ApiError>,
    ) -> FetchOutcome<R> {
        let is_latest = self.latest == Some(revision);
        let current = self
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.revision == revision);
        let was_cancelled = !current
            || self
                .in_flight
                .as_ref()
                .is_some_and(|in_flight| in_flight.cancel.is_cancelled());

        if !is_latest || was_cancelled {
            tracing::trace!(revision = %revision, "stale fetch result discarded");
            return FetchOutcome::Cancelled;
        }

        self.in_flight = None;
        match result {
            Ok(raw) => FetchOutcome::Success(Page::from_raw(raw, limit)),
            Err(ApiError::Cancelled) => FetchOutcome::Cancelled,
            Err(error) => FetchOutcome::Failure(error),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.is_some()
    }

    pub const fn latest(&self) -> Option<Revision> {
        self.latest
    }

    /// Abandons the outstanding request, if any.
    pub fn cancel(&mut self) {
        if let Some(in_flight) = self.in_flight.take() {
            in_flight.cancel.cancel();
        }
    }
}
