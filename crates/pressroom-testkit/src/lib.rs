// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use pressroom_app::{
    ApiError, ArticleId, ArticleRef, ArticleStats, ArticleStatsSource, CancelToken, Comment,
    CommentId, Dispatcher, ImageFile, ImageSlot, Job, MediaService, MediaTarget, MutationGateway,
    MutationReply, MutationRequest, Notification, NotificationEmitter, NotificationLevel,
    PageRequest, PageSource, QueryState, RawPage, Resource, ResourceView, Session, Ticket,
    TicketContent, TicketId, TicketParty, TicketType, UserId, ViewServices, public_url,
};
use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const FIRST_NAMES: [&str; 12] = [
    "Ana", "Bruno", "Carla", "Diego", "Elisa", "Fabio", "Gabriela", "Hugo", "Iara", "Joao",
    "Karina", "Lucas",
];

const LAST_NAMES: [&str; 10] = [
    "Silva", "Souza", "Costa", "Santos", "Oliveira", "Pereira", "Lima", "Carvalho", "Ferreira",
    "Almeida",
];

const MAIL_DOMAINS: [&str; 4] = ["example.com", "mail.test", "newsroom.local", "readers.io"];

const WORDS: [&str; 24] = [
    "article", "layout", "login", "password", "image", "upload", "comment", "reply", "profile",
    "email", "broken", "slow", "page", "editor", "draft", "publish", "title", "search", "filter",
    "menu", "theme", "mobile", "link", "feature",
];

pub const BASE_URL: &str = "http://backend.test";

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct DeterministicRng {
    state: u64,
}

impl DeterministicRng {
    fn new(seed: u64) -> Self {
        let mut state = seed ^ 0x9E37_79B9_7F4A_7C15;
        if state == 0 {
            state = 0xA409_3822_299F_31D0;
        }
        Self { state }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);

        let mut x = self.state;
        x ^= x >> 13;
        x ^= x << 7;
        x ^= x >> 17;
        x
    }

    fn int_n(&mut self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        (self.next_u64() % (n as u64)) as usize
    }

    fn bool(&mut self) -> bool {
        (self.next_u64() & 1) == 1
    }
}

/// Seeded generator of plausible tickets and comments.
#[derive(Debug, Clone)]
pub struct PressFaker {
    rng: DeterministicRng,
    serial: u64,
}

impl PressFaker {
    pub fn new(seed: u64) -> Self {
        let normalized = if seed == 0 { 1 } else { seed };
        Self {
            rng: DeterministicRng::new(normalized),
            serial: 0,
        }
    }

    pub fn ticket(&mut self) -> Ticket {
        self.serial += 1;
        let (name, email) = self.person();
        let kind = TicketType::ALL[self.rng.int_n(TicketType::ALL.len())];
        Ticket {
            id: TicketId::new(format!("T{}", self.serial)),
            content: TicketContent {
                readed: self.rng.bool(),
                kind: kind.as_str().to_owned(),
                email: email.clone(),
                msg: self.sentence(6, 14),
                created_at: Some(fixture_time()),
                ..TicketContent::default()
            },
            user: TicketParty {
                name,
                email,
                ..TicketParty::default()
            },
            ..Ticket::default()
        }
    }

    pub fn comment(&mut self) -> Comment {
        self.serial += 1;
        let (user_name, user_email) = self.person();
        Comment {
            id: CommentId::new(format!("C{}", self.serial)),
            user_name,
            user_email,
            comment: self.sentence(4, 12),
            readed: self.rng.bool(),
            confirmed: true,
            article: Some(ArticleRef {
                title: self.sentence(2, 5),
                custom_url: format!("article-{}", self.serial),
                ..ArticleRef::default()
            }),
            ..Comment::default()
        }
    }

    pub fn tickets(&mut self, count: usize) -> Vec<Ticket> {
        (0..count).map(|_| self.ticket()).collect()
    }

    pub fn comments(&mut self, count: usize) -> Vec<Comment> {
        (0..count).map(|_| self.comment()).collect()
    }

    fn person(&mut self) -> (String, String) {
        let first = self.pick(&FIRST_NAMES);
        let last = self.pick(&LAST_NAMES);
        let domain = self.pick(&MAIL_DOMAINS);
        (
            format!("{first} {last}"),
            format!(
                "{}.{}@{domain}",
                first.to_ascii_lowercase(),
                last.to_ascii_lowercase()
            ),
        )
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.int_n(items.len())]
    }

    fn sentence(&mut self, min_words: usize, max_words: usize) -> String {
        let span = max_words.saturating_sub(min_words) + 1;
        let count = min_words + self.rng.int_n(span);
        let parts: Vec<&str> = (0..count).map(|_| self.pick(&WORDS)).collect();
        let mut sentence = parts.join(" ");
        if let Some(first) = sentence.get_mut(0..1) {
            first.make_ascii_uppercase();
        }
        sentence.push('.');
        sentence
    }
}

pub fn fixture_datetime() -> &'static str {
    "2026-02-19T12:34:56Z"
}

pub fn fixture_time() -> OffsetDateTime {
    OffsetDateTime::parse(fixture_datetime(), &Rfc3339).unwrap_or(OffsetDateTime::UNIX_EPOCH)
}

pub fn ticket(id: &str, readed: bool) -> Ticket {
    Ticket {
        id: TicketId::new(id),
        content: TicketContent {
            readed,
            kind: TicketType::BugReport.as_str().to_owned(),
            msg: format!("report {id}"),
            ..TicketContent::default()
        },
        ..Ticket::default()
    }
}

pub fn comment(id: &str, readed: bool) -> Comment {
    Comment {
        id: CommentId::new(id),
        user_name: "Ana Silva".to_owned(),
        comment: format!("comment {id}"),
        readed,
        ..Comment::default()
    }
}

/// Tickets `{prefix}{first}..` numbered consecutively.
pub fn numbered_tickets(prefix: &str, first: usize, count: usize) -> Vec<Ticket> {
    (first..first + count)
        .map(|n| ticket(&format!("{prefix}{n}"), true))
        .collect()
}

pub fn raw_page<R>(items: Vec<R>, count: u64, limit: u32) -> RawPage<R> {
    RawPage {
        items,
        count,
        limit: Some(limit),
    }
}

pub fn admin_session() -> Session {
    Session {
        user_id: UserId::new("admin-1"),
        name: "Ana Silva".to_owned(),
        tag_admin: true,
        token: None,
    }
}

pub fn author_session() -> Session {
    Session {
        user_id: UserId::new("author-1"),
        name: "Bruno Costa".to_owned(),
        tag_admin: false,
        token: None,
    }
}

/// Holds jobs until the test releases them, in whatever order it likes.
#[derive(Default)]
pub struct ManualDispatcher {
    jobs: Mutex<Vec<Job>>,
}

impl ManualDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> usize {
        lock(&self.jobs).len()
    }

    /// Runs the job queued at `index` (0 is the oldest). Returns false if there is none.
    pub fn release(&self, index: usize) -> bool {
        let job = {
            let mut jobs = lock(&self.jobs);
            if index >= jobs.len() {
                return false;
            }
            jobs.remove(index)
        };
        job();
        true
    }

    pub fn release_oldest(&self) -> bool {
        self.release(0)
    }

    pub fn release_newest(&self) -> bool {
        let len = self.pending();
        len > 0 && self.release(len - 1)
    }

    pub fn release_all(&self) -> usize {
        let mut released = 0;
        while self.release_oldest() {
            released += 1;
        }
        released
    }
}

impl Dispatcher for ManualDispatcher {
    fn dispatch(&self, job: Job) {
        lock(&self.jobs).push(job);
    }
}

/// Runs every job on the calling thread immediately.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineDispatcher;

impl Dispatcher for InlineDispatcher {
    fn dispatch(&self, job: Job) {
        job();
    }
}

/// Page source answering from per-page scripted responses.
pub struct ScriptedSource<R> {
    responses: Mutex<BTreeMap<u32, Result<RawPage<R>, ApiError>>>,
    requests: Mutex<Vec<PageRequest>>,
}

impl<R> Default for ScriptedSource<R> {
    fn default() -> Self {
        Self {
            responses: Mutex::new(BTreeMap::new()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl<R: Clone> ScriptedSource<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, page: u32, result: Result<RawPage<R>, ApiError>) {
        lock(&self.responses).insert(page, result);
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        lock(&self.requests).clone()
    }

    pub fn last_request(&self) -> Option<PageRequest> {
        lock(&self.requests).last().cloned()
    }
}

impl<R: Clone + Send> PageSource<R> for ScriptedSource<R> {
    fn fetch_page(
        &self,
        request: &PageRequest,
        cancel: &CancelToken,
    ) -> Result<RawPage<R>, ApiError> {
        lock(&self.requests).push(request.clone());
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled);
        }
        lock(&self.responses)
            .get(&request.page)
            .cloned()
            .unwrap_or_else(|| {
                Err(ApiError::Unknown(format!(
                    "no scripted response for page {}",
                    request.page
                )))
            })
    }
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        lock(&self.notifications).clone()
    }

    pub fn last(&self) -> Option<Notification> {
        lock(&self.notifications).last().cloned()
    }

    pub fn count(&self, level: NotificationLevel) -> usize {
        lock(&self.notifications)
            .iter()
            .filter(|notification| notification.level == level)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.notifications).is_empty()
    }
}

impl NotificationEmitter for RecordingNotifier {
    fn emit(&self, notification: Notification) {
        lock(&self.notifications).push(notification);
    }
}

/// Records writes and answers with queued replies (`Empty` once the queue runs dry).
#[derive(Debug, Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<MutationRequest>>,
    replies: Mutex<VecDeque<Result<MutationReply, ApiError>>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_reply(&self, reply: Result<MutationReply, ApiError>) {
        lock(&self.replies).push_back(reply);
    }

    pub fn requests(&self) -> Vec<MutationRequest> {
        lock(&self.requests).clone()
    }
}

impl MutationGateway for RecordingGateway {
    fn mutate(&self, request: &MutationRequest) -> Result<MutationReply, ApiError> {
        lock(&self.requests).push(request.clone());
        lock(&self.replies)
            .pop_front()
            .unwrap_or(Ok(MutationReply::Empty))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCall {
    Upload {
        target: MediaTarget,
        slot: ImageSlot,
        file_name: String,
    },
    Remove {
        target: MediaTarget,
        slot: ImageSlot,
    },
}

/// In-memory image store; `fail_with` makes every call return that error.
#[derive(Debug, Default)]
pub struct RecordingMedia {
    calls: Mutex<Vec<MediaCall>>,
    failure: Mutex<Option<ApiError>>,
}

impl RecordingMedia {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, error: ApiError) {
        *lock(&self.failure) = Some(error);
    }

    pub fn calls(&self) -> Vec<MediaCall> {
        lock(&self.calls).clone()
    }

    fn check(&self) -> Result<(), ApiError> {
        match lock(&self.failure).clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl MediaService for RecordingMedia {
    fn upload(
        &self,
        target: &MediaTarget,
        slot: ImageSlot,
        file: &ImageFile,
    ) -> Result<String, ApiError> {
        lock(&self.calls).push(MediaCall::Upload {
            target: target.clone(),
            slot,
            file_name: file.file_name.clone(),
        });
        self.check()?;
        Ok(format!("uploads/{}/{}-{}", target.id(), slot, file.file_name))
    }

    fn remove(&self, target: &MediaTarget, slot: ImageSlot) -> Result<(), ApiError> {
        lock(&self.calls).push(MediaCall::Remove {
            target: target.clone(),
            slot,
        });
        self.check()
    }

    fn public_url(&self, stored_path: &str) -> String {
        public_url(BASE_URL, stored_path)
    }
}

#[derive(Debug, Default)]
pub struct ScriptedStats {
    stats: Mutex<BTreeMap<ArticleId, ArticleStats>>,
    lookups: Mutex<Vec<ArticleId>>,
}

impl ScriptedStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: ArticleId, stats: ArticleStats) {
        lock(&self.stats).insert(id, stats);
    }

    pub fn lookups(&self) -> Vec<ArticleId> {
        lock(&self.lookups).clone()
    }
}

impl ArticleStatsSource for ScriptedStats {
    fn article_stats(&self, id: &ArticleId) -> Result<ArticleStats, ApiError> {
        lock(&self.lookups).push(id.clone());
        lock(&self.stats).get(id).cloned().ok_or_else(|| ApiError::Validation {
            status: 404,
            message: format!("article {id} not found"),
        })
    }
}

/// Doubles wired together for driving a `ResourceView` step by step.
pub struct Harness<R> {
    pub source: Arc<ScriptedSource<R>>,
    pub gateway: Arc<RecordingGateway>,
    pub notifier: Arc<RecordingNotifier>,
    pub dispatcher: Arc<ManualDispatcher>,
}

impl<R: Resource> Default for Harness<R> {
    fn default() -> Self {
        Self {
            source: Arc::new(ScriptedSource::new()),
            gateway: Arc::new(RecordingGateway::new()),
            notifier: Arc::new(RecordingNotifier::new()),
            dispatcher: Arc::new(ManualDispatcher::new()),
        }
    }
}

impl<R: Resource> Harness<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn services(&self) -> ViewServices<R> {
        ViewServices {
            source: self.source.clone(),
            gateway: self.gateway.clone(),
            notifier: self.notifier.clone(),
            dispatcher: self.dispatcher.clone(),
        }
    }

    pub fn view(&self, session: Session) -> Result<ResourceView<R>> {
        ResourceView::new(session, self.services(), QueryState::default())
    }

    /// Releases every queued job and applies the resulting events.
    pub fn settle(&self, view: &mut ResourceView<R>) -> usize {
        self.dispatcher.release_all();
        view.process_events()
    }
}
