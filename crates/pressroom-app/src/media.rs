// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use std::fmt;

use crate::error::ApiError;
use crate::ids::{ArticleId, UserId};
use crate::mutation::Method;
use crate::notify::{Notification, NotificationEmitter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageSlot {
    Small,
    Medium,
    Big,
    ProfilePhoto,
}

impl ImageSlot {
    pub const ARTICLE: [Self; 3] = [Self::Small, Self::Medium, Self::Big];

    /// Form field and `path` parameter name.
    pub const fn wire_name(self) -> &'static str {
        match self {
            Self::Small => "smallImg",
            Self::Medium => "mediumImg",
            Self::Big => "bigImg",
            Self::ProfilePhoto => "profilePhoto",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "smallImg" | "small" => Some(Self::Small),
            "mediumImg" | "medium" => Some(Self::Medium),
            "bigImg" | "big" => Some(Self::Big),
            "profilePhoto" | "profile" => Some(Self::ProfilePhoto),
            _ => None,
        }
    }

    pub const fn upload_method(self) -> Method {
        match self {
            Self::Small => Method::Post,
            Self::Medium | Self::ProfilePhoto => Method::Patch,
            Self::Big => Method::Put,
        }
    }

    /// Target height in pixels the backend resizes to.
    pub const fn size(self) -> Option<u32> {
        match self {
            Self::Small => Some(512),
            Self::Medium | Self::Big => Some(1080),
            Self::ProfilePhoto => None,
        }
    }
}

impl fmt::Display for ImageSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaTarget {
    Article(ArticleId),
    User(UserId),
}

impl MediaTarget {
    pub const fn resource(&self) -> &'static str {
        match self {
            Self::Article(_) => "articles",
            Self::User(_) => "users",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Self::Article(id) => id.as_str(),
            Self::User(id) => id.as_str(),
        }
    }

    /// Extra form field naming the owner, alongside the file part.
    pub const fn owner_field(&self) -> &'static str {
        match self {
            Self::Article(_) => "idArticle",
            Self::User(_) => "idUser",
        }
    }

    pub fn accepts(&self, slot: ImageSlot) -> bool {
        match self {
            Self::Article(_) => slot != ImageSlot::ProfilePhoto,
            Self::User(_) => slot == ImageSlot::ProfilePhoto,
        }
    }

    /// Path and query pairs of the upload/delete endpoint.
    pub fn endpoint(&self, slot: ImageSlot, with_size: bool) -> (String, Vec<(String, String)>) {
        let path = format!("{}/img/{}", self.resource(), self.id());
        let mut params = Vec::new();
        if matches!(self, Self::Article(_)) {
            params.push(("path".to_owned(), slot.wire_name().to_owned()));
            if with_size && let Some(size) = slot.size() {
                params.push(("size".to_owned(), size.to_string()));
            }
        }
        (path, params)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Image storage behind the API.
pub trait MediaService: Send + Sync {
    /// Returns the stored path of the uploaded image.
    fn upload(&self, target: &MediaTarget, slot: ImageSlot, file: &ImageFile) -> Result<String, ApiError>;

    fn remove(&self, target: &MediaTarget, slot: ImageSlot) -> Result<(), ApiError>;

    fn public_url(&self, stored_path: &str) -> String;
}

pub fn public_url(base_url: &str, stored_path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        stored_path.trim_start_matches('/')
    )
}

/// Uploads `file` and reports the outcome through `notifier`.
///
/// Returns the stored path, or `None` when nothing was uploaded.
pub fn upload_image(
    media: &dyn MediaService,
    notifier: &dyn NotificationEmitter,
    target: &MediaTarget,
    slot: ImageSlot,
    file: Option<&ImageFile>,
) -> Result<Option<String>> {
    let Some(file) = file.filter(|file| !file.is_empty()) else {
        notifier.emit(Notification::info("select an image"));
        return Ok(None);
    };
    if !target.accepts(slot) {
        anyhow::bail!("{slot} is not an image slot of {}", target.resource());
    }
    match media.upload(target, slot, file) {
        Ok(path) => {
            tracing::debug!(owner = target.id(), slot = slot.wire_name(), path = %path, "image stored");
            notifier.emit(Notification::success("image saved"));
            Ok(Some(path))
        }
        Err(error) if error.is_cancelled() => Ok(None),
        Err(error) => {
            notifier.emit(Notification::error(error.user_message()));
            Err(error.into())
        }
    }
}

pub fn remove_image(
    media: &dyn MediaService,
    notifier: &dyn NotificationEmitter,
    target: &MediaTarget,
    slot: ImageSlot,
) -> Result<()> {
    if !target.accepts(slot) {
        anyhow::bail!("{slot} is not an image slot of {}", target.resource());
    }
    match media.remove(target, slot) {
        Ok(()) => {
            notifier.emit(Notification::success("image removed"));
            Ok(())
        }
        Err(error) => {
            notifier.emit(Notification::error(error.user_message()));
            Err(error.into())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ImageSlot, MediaTarget, public_url};
    use crate::{ArticleId, Method, UserId};

    #[test]
    fn article_slots_carry_method_and_size() {
        assert_eq!(ImageSlot::Small.upload_method(), Method::Post);
        assert_eq!(ImageSlot::Medium.upload_method(), Method::Patch);
        assert_eq!(ImageSlot::Big.upload_method(), Method::Put);
        assert_eq!(ImageSlot::Small.size(), Some(512));
        assert_eq!(ImageSlot::Big.size(), Some(1080));
        assert_eq!(ImageSlot::parse("medium"), Some(ImageSlot::Medium));
    }

    #[test]
    fn endpoints_follow_target_kind() {
        let article = MediaTarget::Article(ArticleId::new("a1"));
        let (path, params) = article.endpoint(ImageSlot::Small, true);
        assert_eq!(path, "articles/img/a1");
        assert_eq!(
            params,
            vec![
                ("path".to_owned(), "smallImg".to_owned()),
                ("size".to_owned(), "512".to_owned()),
            ]
        );
        let (_, delete_params) = article.endpoint(ImageSlot::Big, false);
        assert_eq!(delete_params, vec![("path".to_owned(), "bigImg".to_owned())]);

        let user = MediaTarget::User(UserId::new("u1"));
        let (path, params) = user.endpoint(ImageSlot::ProfilePhoto, true);
        assert_eq!(path, "users/img/u1");
        assert!(params.is_empty());
        assert!(!user.accepts(ImageSlot::Big));
    }

    #[test]
    fn public_url_joins_without_double_slashes() {
        assert_eq!(
            public_url("http://localhost:3001/", "/uploads/a.png"),
            "http://localhost:3001/uploads/a.png"
        );
    }
}
