// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};

use crate::Revision;
use crate::error::ApiError;
use crate::fetch::{FetchController, FetchOutcome, PageSource, RawPage};
use crate::model::Session;
use crate::mutation::{MutationGateway, MutationReply, MutationRequest};
use crate::notify::{Notification, NotificationEmitter};
use crate::patch::Fields;
use crate::query::{Filter, QueryState};
use crate::resource::Resource;
use crate::selection::{CloseRequest, DialogMode, SelectionDialogController};
use crate::store::CollectionStore;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Runs network work away from the view's thread.
pub trait Dispatcher: Send + Sync {
    fn dispatch(&self, job: Job);
}

/// One OS thread per job.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDispatcher;

impl Dispatcher for ThreadDispatcher {
    fn dispatch(&self, job: Job) {
        std::thread::spawn(job);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationPurpose {
    /// Passive read flag; failures are never shown.
    MarkRead,
    Reply { answer: String },
    Edit,
}

#[derive(Debug)]
pub enum ViewEvent<R: Resource> {
    FetchCompleted {
        revision: Revision,
        limit: u32,
        result: Result<RawPage<R>, ApiError>,
    },
    MutationCompleted {
        id: R::Id,
        revision: Revision,
        purpose: MutationPurpose,
        result: Result<MutationReply, ApiError>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewStatus {
    Loading,
    Ready,
    /// The backend reported no rows for this query.
    Empty,
    /// The first fetch failed and there is nothing to show.
    Error(ApiError),
}

pub struct ViewServices<R> {
    pub source: Arc<dyn PageSource<R>>,
    pub gateway: Arc<dyn MutationGateway>,
    pub notifier: Arc<dyn NotificationEmitter>,
    pub dispatcher: Arc<dyn Dispatcher>,
}

impl<R> Clone for ViewServices<R> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            gateway: Arc::clone(&self.gateway),
            notifier: Arc::clone(&self.notifier),
            dispatcher: Arc::clone(&self.dispatcher),
        }
    }
}

/// A paged, filterable list of one resource with its detail dialog.
pub struct ResourceView<R: Resource> {
    session: Session,
    services: ViewServices<R>,
    query: QueryState,
    fetch: FetchController,
    store: CollectionStore<R>,
    selection: SelectionDialogController<R>,
    sending: BTreeSet<R::Id>,
    last_error: Option<ApiError>,
    tx: Sender<ViewEvent<R>>,
    rx: Receiver<ViewEvent<R>>,
}

impl<R: Resource> ResourceView<R> {
    pub fn new(session: Session, services: ViewServices<R>, query: QueryState) -> Result<Self> {
        if R::REQUIRES_ADMIN && !session.is_admin() {
            bail!(
                "the {} console is restricted to administrators -- sign in with an admin account",
                R::PATH
            );
        }
        let (tx, rx) = mpsc::channel();
        Ok(Self {
            session,
            services,
            query,
            fetch: FetchController::new(),
            store: CollectionStore::new(),
            selection: SelectionDialogController::new(),
            sending: BTreeSet::new(),
            last_error: None,
            tx,
            rx,
        })
    }

    pub fn start(&mut self) {
        tracing::info!(
            resource = R::PATH,
            user = %self.session.user_id,
            limit = self.query.limit(),
            "view started"
        );
        self.issue_fetch();
    }

    pub fn refresh(&mut self) {
        self.query = self.query.reissued();
        self.issue_fetch();
    }

    pub fn set_page(&mut self, page: u32) -> Result<()> {
        let pages = self.store.page_count();
        if self.store.has_loaded() && u64::from(page) > pages.max(1) {
            bail!("page {page} is past the last page ({})", pages.max(1));
        }
        self.query = self.query.with_page(page)?;
        self.issue_fetch();
        Ok(())
    }

    pub fn set_limit(&mut self, limit: u32) -> Result<()> {
        self.query = self.query.with_limit(limit)?;
        self.issue_fetch();
        Ok(())
    }

    pub fn submit_filter(&mut self, filter: Filter) {
        self.query = self.query.with_filter(filter);
        self.issue_fetch();
    }

    pub fn clear_filter(&mut self) {
        self.submit_filter(Filter::new());
    }

    /// Applies every completion delivered so far. Returns how many were handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.rx.try_recv() {
            self.handle_event(event);
            handled += 1;
        }
        handled
    }

    pub fn handle_event(&mut self, event: ViewEvent<R>) {
        match event {
            ViewEvent::FetchCompleted {
                revision,
                limit,
                result,
            } => self.settle_fetch(revision, limit, result),
            ViewEvent::MutationCompleted {
                id,
                revision,
                purpose,
                result,
            } => self.settle_mutation(id, revision, purpose, result),
        }
    }

    /// Opens the dialog on a row; unread rows are flagged read in the background.
    pub fn activate(&mut self, id: &R::Id, mode: DialogMode) -> Result<()> {
        let Some(entity) = self.store.get(id).cloned() else {
            bail!("no {} row with id {id} on this page", R::PATH);
        };
        self.selection.open(entity.clone(), mode);

        if entity.is_unread()
            && let Some((fields, request)) = entity.mark_read()
        {
            if self.sending.contains(id) {
                tracing::debug!(id = %id, "mark-read skipped; another change is in flight");
            } else {
                self.start_mutation(id.clone(), fields, request, MutationPurpose::MarkRead)?;
            }
        }
        Ok(())
    }

    pub fn request_close(&mut self) -> CloseRequest {
        self.selection.request_close()
    }

    pub fn confirm_close(&mut self) {
        self.selection.confirm_close();
    }

    pub fn switch_mode(&mut self, mode: DialogMode) {
        self.selection.switch_mode(mode);
    }

    pub fn edit_draft(&mut self, text: impl Into<String>) {
        self.selection.edit_draft(text);
    }

    pub fn submit_reply(&mut self) -> Result<()> {
        let answer = self.selection.begin_submit()?;
        let id = self.selection.entity().id().clone();
        // The store copy carries the confirmed mark-read; the dialog snapshot predates it.
        let entity = self
            .store
            .get(&id)
            .cloned()
            .unwrap_or_else(|| self.selection.entity().clone());

        let Some(request) = entity.reply(&answer) else {
            self.selection.finish_submit(&id, false);
            bail!("{} do not accept replies", R::PATH);
        };
        if self.sending.contains(&id) {
            self.selection.finish_submit(&id, false);
            bail!("{id} is still being saved -- wait a moment and retry");
        }
        self.start_mutation(id, Fields::new(), request, MutationPurpose::Reply { answer })
    }

    /// Optimistically applies `fields` to `id` and sends `request`; rolls back on failure.
    pub fn mutate_entity(&mut self, id: &R::Id, fields: Fields, request: MutationRequest) -> Result<()> {
        if self.sending.contains(id) {
            bail!("{id} is still being saved -- wait a moment and retry");
        }
        self.start_mutation(id.clone(), fields, request, MutationPurpose::Edit)
    }

    pub fn status(&self) -> ViewStatus {
        if !self.store.has_loaded() {
            return match &self.last_error {
                Some(error) if !self.fetch.is_loading() => ViewStatus::Error(error.clone()),
                _ => ViewStatus::Loading,
            };
        }
        if self.store.total_count() == 0 {
            ViewStatus::Empty
        } else {
            ViewStatus::Ready
        }
    }

    /// A fetch is in flight over an already displayed page.
    pub fn is_refreshing(&self) -> bool {
        self.store.has_loaded() && self.fetch.is_loading()
    }

    pub fn is_sending(&self, id: &R::Id) -> bool {
        self.sending.contains(id)
    }

    pub const fn query(&self) -> &QueryState {
        &self.query
    }

    pub const fn store(&self) -> &CollectionStore<R> {
        &self.store
    }

    pub const fn selection(&self) -> &SelectionDialogController<R> {
        &self.selection
    }

    pub const fn session(&self) -> &Session {
        &self.session
    }

    fn issue_fetch(&mut self) {
        let ticket = self.fetch.request::<R>(&self.query);
        let revision = ticket.revision();
        let limit = self.query.limit();
        let source = Arc::clone(&self.services.source);
        let tx = self.tx.clone();
        self.services.dispatcher.dispatch(Box::new(move || {
            let result = if ticket.cancel.is_cancelled() {
                Err(ApiError::Cancelled)
            } else {
                source.fetch_page(&ticket.request, &ticket.cancel)
            };
            let _ = tx.send(ViewEvent::FetchCompleted {
                revision,
                limit,
                result,
            });
        }));
    }

    fn settle_fetch(&mut self, revision: Revision, limit: u32, result: Result<RawPage<R>, ApiError>) {
        match self.fetch.resolve(revision, limit, result) {
            FetchOutcome::Success(page) => {
                tracing::debug!(
                    resource = R::PATH,
                    revision = %revision,
                    rows = page.items().len(),
                    count = page.total_count(),
                    "fetch settled"
                );
                self.store.replace(page, revision);
                self.last_error = None;
            }
            FetchOutcome::Cancelled => {}
            FetchOutcome::Failure(error) => {
                tracing::warn!(resource = R::PATH, revision = %revision, error = %error, "fetch failed");
                self.services
                    .notifier
                    .emit(Notification::error(error.user_message()));
                self.last_error = Some(error);
            }
        }
    }

    fn start_mutation(
        &mut self,
        id: R::Id,
        fields: Fields,
        request: MutationRequest,
        purpose: MutationPurpose,
    ) -> Result<()> {
        let revision = self.query.revision().next();
        if !fields.is_empty() {
            self.store.apply_optimistic(&id, &fields, revision)?;
        }
        self.sending.insert(id.clone());
        tracing::debug!(
            id = %id,
            method = request.method.as_str(),
            path = %request.path,
            revision = %revision,
            "mutation issued"
        );

        let gateway = Arc::clone(&self.services.gateway);
        let tx = self.tx.clone();
        self.services.dispatcher.dispatch(Box::new(move || {
            let result = gateway.mutate(&request);
            let _ = tx.send(ViewEvent::MutationCompleted {
                id,
                revision,
                purpose,
                result,
            });
        }));
        Ok(())
    }

    fn settle_mutation(
        &mut self,
        id: R::Id,
        revision: Revision,
        purpose: MutationPurpose,
        result: Result<MutationReply, ApiError>,
    ) {
        self.sending.remove(&id);
        match result {
            Ok(reply) => self.mutation_succeeded(&id, purpose, &reply),
            Err(error) => {
                if let Err(rollback_error) = self.store.rollback(&id, revision) {
                    tracing::warn!(id = %id, error = %rollback_error, "rollback failed");
                }
                self.mutation_failed(&id, purpose, &error);
            }
        }
    }

    fn mutation_succeeded(&mut self, id: &R::Id, purpose: MutationPurpose, reply: &MutationReply) {
        match purpose {
            MutationPurpose::MarkRead => {
                tracing::debug!(id = %id, "marked read");
            }
            MutationPurpose::Reply { answer } => {
                let owner = self
                    .store
                    .get(id)
                    .cloned()
                    .unwrap_or_else(|| self.selection.entity().clone());
                let fields = owner.reply_fields(&answer, reply);
                if !fields.is_empty() {
                    let revision = self.query.revision().next();
                    if let Err(error) = self.store.apply_optimistic(id, &fields, revision) {
                        tracing::warn!(id = %id, error = %error, "could not patch replied row");
                    }
                }
                let message = reply.message().unwrap_or("answer sent");
                self.services.notifier.emit(Notification::success(message));
                self.selection.finish_submit(id, true);
            }
            MutationPurpose::Edit => {
                let message = reply.message().unwrap_or("changes saved");
                self.services.notifier.emit(Notification::success(message));
            }
        }
    }

    fn mutation_failed(&mut self, id: &R::Id, purpose: MutationPurpose, error: &ApiError) {
        if error.is_cancelled() {
            tracing::trace!(id = %id, "mutation cancelled");
            if matches!(purpose, MutationPurpose::Reply { .. }) {
                self.selection.finish_submit(id, false);
            }
            return;
        }
        match purpose {
            MutationPurpose::MarkRead => {
                tracing::warn!(id = %id, error = %error, "mark-read failed; flag restored");
            }
            MutationPurpose::Reply { .. } => {
                self.selection.finish_submit(id, false);
                self.services
                    .notifier
                    .emit(Notification::error(error.user_message()));
            }
            MutationPurpose::Edit => {
                self.services
                    .notifier
                    .emit(Notification::error(error.user_message()));
            }
        }
    }
}
