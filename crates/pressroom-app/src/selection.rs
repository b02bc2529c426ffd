// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Result, bail};

use crate::resource::Resource;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogMode {
    View,
    Reply,
}

impl DialogMode {
    pub const fn label(self) -> &'static str {
        match self {
            Self::View => "details",
            Self::Reply => "reply",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DialogState {
    #[default]
    Closed,
    Open(DialogMode),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseRequest {
    Closed,
    /// The draft has text; call `confirm_close` to discard it.
    NeedsConfirmation,
}

/// Detail/reply dialog bound to one entity at a time.
#[derive(Debug, Clone, Default)]
pub struct SelectionDialogController<R: Resource> {
    state: DialogState,
    entity: R,
    draft: String,
    sending: bool,
}

impl<R: Resource> SelectionDialogController<R> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, entity: R, mode: DialogMode) {
        if self.entity.id() != entity.id() {
            self.draft.clear();
            self.sending = false;
        }
        self.entity = entity;
        self.state = DialogState::Open(mode);
    }

    pub fn switch_mode(&mut self, mode: DialogMode) {
        if self.is_open() {
            self.state = DialogState::Open(mode);
        }
    }

    pub const fn state(&self) -> DialogState {
        self.state
    }

    pub const fn is_open(&self) -> bool {
        matches!(self.state, DialogState::Open(_))
    }

    pub fn mode(&self) -> Option<DialogMode> {
        match self.state {
            DialogState::Open(mode) => Some(mode),
            DialogState::Closed => None,
        }
    }

    pub const fn entity(&self) -> &R {
        &self.entity
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub const fn is_sending(&self) -> bool {
        self.sending
    }

    pub fn edit_draft(&mut self, text: impl Into<String>) {
        if self.is_open() && !self.sending {
            self.draft = text.into();
        }
    }

    pub fn request_close(&mut self) -> CloseRequest {
        if !self.draft.trim().is_empty() {
            return CloseRequest::NeedsConfirmation;
        }
        self.reset();
        CloseRequest::Closed
    }

    pub fn confirm_close(&mut self) {
        self.reset();
    }

    /// Locks the draft for sending and returns the text to submit.
    pub fn begin_submit(&mut self) -> Result<String> {
        if self.state != DialogState::Open(DialogMode::Reply) {
            bail!("open the reply form before sending an answer");
        }
        if self.sending {
            bail!("an answer is already being sent -- wait for it to finish");
        }
        let answer = self.draft.trim();
        if answer.is_empty() {
            bail!("answer is required -- type a reply and retry");
        }
        let answer = answer.to_owned();
        self.sending = true;
        Ok(answer)
    }

    /// Settles a submit for `id`; ignored if the dialog moved on to another entity.
    pub fn finish_submit(&mut self, id: &R::Id, succeeded: bool) {
        if !self.sending || self.entity.id() != id {
            return;
        }
        if succeeded {
            self.reset();
        } else {
            self.sending = false;
        }
    }

    fn reset(&mut self) {
        self.state = DialogState::Closed;
        self.entity = R::default();
        self.draft.clear();
        self.sending = false;
    }
}
