// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result};
use pressroom_api::Client;
use pressroom_app::{
    ArticleId, ArticleStats, ImageFile, ImageSlot, MediaTarget, QueryState, ResourceView,
    Session, ThreadDispatcher, User, ViewServices, cancel_email_change, load_article_stats,
    remove_image, resend_email_confirmation, save_profile, send_profile_change, upload_image,
};
use pressroom_tui::{TableRows, ToastSink};
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::profile::ProfileEdits;

/// Everything a view or one-shot command needs, built once from config.
pub struct Runtime {
    client: Arc<Client>,
    session: Session,
    user: User,
    limit: u32,
    toasts: ToastSink,
}

impl Runtime {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = Client::new(config.base_url(), config.timeout()?)?.with_token(config.token());
        Ok(Self {
            client: Arc::new(client),
            session: config.session(),
            user: config.session_user(),
            limit: config.default_limit(),
            toasts: ToastSink::new(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn services<R: TableRows>(&self) -> ViewServices<R> {
        ViewServices {
            source: self.client.clone(),
            gateway: self.client.clone(),
            notifier: Arc::new(self.toasts.clone()),
            dispatcher: Arc::new(ThreadDispatcher),
        }
    }

    pub fn build_view<R: TableRows>(&self) -> Result<ResourceView<R>> {
        ResourceView::new(
            self.session.clone(),
            self.services(),
            QueryState::new(self.limit)?,
        )
    }

    pub fn run_view<R: TableRows>(&self) -> Result<()> {
        let mut view = self.build_view::<R>()?;
        tracing::info!(
            resource = R::PATH,
            base_url = self.client.base_url(),
            "starting terminal shell"
        );
        pressroom_tui::run_app(&mut view, &self.toasts)
    }

    pub fn article_stats(&self, id: &str) -> Result<String> {
        let stats = load_article_stats(self.client.as_ref(), &ArticleId::new(id))?;
        Ok(format_stats(id, &stats))
    }

    /// Uploads `file` into `slot` of an article; returns the public URL.
    pub fn upload_article_image(&self, id: &str, slot: &str, file: &Path) -> Result<Option<String>> {
        let slot = parse_slot(slot)?;
        let image = read_image_file(file)?;
        let target = MediaTarget::Article(ArticleId::new(id));
        let stored = upload_image(
            self.client.as_ref(),
            &self.toasts,
            &target,
            slot,
            Some(&image),
        )?;
        Ok(stored.map(|path| pressroom_app::public_url(self.client.base_url(), &path)))
    }

    pub fn remove_article_image(&self, id: &str, slot: &str) -> Result<()> {
        let slot = parse_slot(slot)?;
        let target = MediaTarget::Article(ArticleId::new(id));
        remove_image(self.client.as_ref(), &self.toasts, &target, slot)
    }

    /// Saves the profile edits in `file` over the signed-in account.
    pub fn save_profile(&self, file: &Path) -> Result<()> {
        let form = ProfileEdits::load(file)?.apply(&self.user)?;
        let request = save_profile(&self.user, &form)?;
        let done = if form.email_changed(&self.user) {
            "profile saved; confirm the new e-mail address from your inbox"
        } else {
            "profile saved"
        };
        send_profile_change(self.client.as_ref(), &self.toasts, &request, done)?;
        Ok(())
    }

    pub fn resend_email_confirmation(&self) -> Result<()> {
        let request = resend_email_confirmation(&self.user)?;
        send_profile_change(
            self.client.as_ref(),
            &self.toasts,
            &request,
            "confirmation e-mail sent",
        )?;
        Ok(())
    }

    pub fn cancel_email_change(&self) -> Result<()> {
        let request = cancel_email_change(&self.user)?;
        send_profile_change(
            self.client.as_ref(),
            &self.toasts,
            &request,
            "e-mail change request removed",
        )?;
        Ok(())
    }

    /// Messages queued by one-shot commands, formatted for the console.
    pub fn drain_messages(&self) -> Vec<String> {
        self.toasts
            .drain()
            .into_iter()
            .map(|toast| format!("{}: {}", toast.level.as_str(), toast.message))
            .collect()
    }
}

fn parse_slot(raw: &str) -> Result<ImageSlot> {
    ImageSlot::parse(raw).with_context(|| {
        format!(
            "unknown image slot {raw:?}; expected one of: {}",
            ImageSlot::ARTICLE
                .iter()
                .map(|slot| slot.wire_name())
                .collect::<Vec<_>>()
                .join(", ")
        )
    })
}

fn read_image_file(path: &Path) -> Result<ImageFile> {
    let bytes = fs::read(path).with_context(|| format!("read image {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} has no file name", path.display()))?;
    Ok(ImageFile { file_name, bytes })
}

pub fn format_stats(id: &str, stats: &ArticleStats) -> String {
    let mut lines = vec![
        format!("article {id}"),
        format!("  views:    {}", stats.views),
        format!("  likes:    {}", stats.likes),
        format!(
            "  comments: {} ({} unread)",
            stats.comment_count,
            stats.unread_comments()
        ),
    ];
    for comment in &stats.comments {
        let mark = if comment.readed { " " } else { "*" };
        lines.push(format!("  {mark} {}: {}", comment.user_name, comment.comment));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{Runtime, format_stats, parse_slot, read_image_file};
    use crate::config::Config;
use crate::profile::ProfileEdits;
    use anyhow::{Result, anyhow};
    use pressroom_app::{ArticleStats, Comment, CommentId, ImageSlot, Ticket};
    use std::io::Read;
    use std::thread;
    use tiny_http::{Header, Response, Server};

    fn config_for(base_url: &str, tag_admin: bool) -> Result<Config> {
        config_with(base_url, &format!("tag_admin = {tag_admin}\n"))
    }

    fn config_with(base_url: &str, session_extra: &str) -> Result<Config> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            format!(
                "version = 1\n[api]\nbase_url = \"{base_url}\"\ntimeout = \"1s\"\n[session]\nuser_id = \"u1\"\nname = \"Ana\"\nemail = \"ana@example.com\"\n{session_extra}"
            ),
        )?;
        Config::load(&path)
    }

    #[test]
    fn stats_are_formatted_with_unread_marks() {
        let stats = ArticleStats {
            views: 40,
            likes: 3,
            comment_count: 2,
            comments: vec![
                Comment {
                    id: CommentId::new("c1"),
                    user_name: "Ana".to_owned(),
                    comment: "great".to_owned(),
                    readed: false,
                    ..Comment::default()
                },
                Comment {
                    id: CommentId::new("c2"),
                    user_name: "Bruno".to_owned(),
                    comment: "thanks".to_owned(),
                    readed: true,
                    ..Comment::default()
                },
            ],
        };
        let text = format_stats("a1", &stats);
        assert!(text.starts_with("article a1\n  views:    40"));
        assert!(text.contains("comments: 2 (1 unread)"));
        assert!(text.contains("* Ana: great"));
        assert!(text.contains("  Bruno: thanks"));
    }

    #[test]
    fn slots_are_validated_with_hint() -> Result<()> {
        assert_eq!(parse_slot("bigImg")?, ImageSlot::Big);
        let error = parse_slot("hugeImg").expect_err("unknown slot");
        assert!(format!("{error:#}").contains("smallImg"));
        Ok(())
    }

    #[test]
    fn missing_image_file_names_the_path() {
        let error = read_image_file(std::path::Path::new("/definitely/missing.png"))
            .expect_err("missing file");
        assert!(error.to_string().contains("/definitely/missing.png"));
    }

    #[test]
    fn ticket_view_requires_admin_session() -> Result<()> {
        let runtime = Runtime::from_config(&config_for("http://127.0.0.1:1", false)?)?;
        let error = runtime
            .build_view::<Ticket>()
            .err()
            .ok_or_else(|| anyhow!("author session must not open tickets"))?;
        assert!(error.to_string().contains("restricted to administrators"));
        Ok(())
    }

    #[test]
    fn stats_command_reads_from_backend() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/articles/stats/a9");
            let body = r#"{"views":{"count":7},"likes":{"count":1},"comments":{"count":0,"comments":[]}}"#;
            request
                .respond(Response::from_string(body).with_header(
                    Header::from_bytes("Content-Type", "application/json")
                        .expect("valid content type header"),
                ))
                .expect("response should succeed");
        });

        let runtime = Runtime::from_config(&config_for(&addr, true)?)?;
        let text = runtime.article_stats("a9")?;
        assert!(text.contains("views:    7"));
        assert!(text.contains("comments: 0 (0 unread)"));
        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn upload_command_prints_public_url() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let image = temp.path().join("cover.png");
        std::fs::write(&image, b"png-bytes")?;

        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let mut request = server.recv().expect("request expected");
            assert_eq!(request.url(), "/articles/img/a1?path=mediumImg&size=1080");
            let mut body = Vec::new();
            request
                .as_reader()
                .read_to_end(&mut body)
                .expect("body should be readable");
            assert!(String::from_utf8_lossy(&body).contains("filename=\"cover.png\""));
            request
                .respond(Response::from_string(r#""uploads/a1/medium.png""#))
                .expect("response should succeed");
        });

        let runtime = Runtime::from_config(&config_for(&addr, true)?)?;
        let url = runtime.upload_article_image("a1", "mediumImg", &image)?;
        assert_eq!(url, Some(format!("{addr}/uploads/a1/medium.png")));
        assert_eq!(runtime.drain_messages(), vec!["success: image saved".to_owned()]);
        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn save_profile_sends_changed_email_for_confirmation() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let edits = temp.path().join("profile.toml");
        std::fs::write(&edits, "email = \"ana@news.example.com\"\ncellphone = \"5550000\"\n")?;

        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let mut request = server.recv().expect("request expected");
            assert_eq!(request.method().as_str(), "PUT");
            assert_eq!(request.url(), "/users/u1");
            let mut body = String::new();
            request
                .as_reader()
                .read_to_string(&mut body)
                .expect("body should be readable");
            let body: serde_json::Value = serde_json::from_str(&body).expect("json body");
            assert_eq!(body["confirmEmail"], "ana@news.example.com");
            assert!(body.get("email").is_none());
            assert_eq!(body["cellphone"], "5550000");
            request
                .respond(Response::from_string(""))
                .expect("response should succeed");
        });

        let runtime = Runtime::from_config(&config_with(&addr, "")?)?;
        runtime.save_profile(&edits)?;
        assert_eq!(
            runtime.drain_messages(),
            vec!["success: profile saved; confirm the new e-mail address from your inbox".to_owned()]
        );
        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn cancel_email_change_patches_pending_request() -> Result<()> {
        let server =
            Server::http("127.0.0.1:0").map_err(|error| anyhow!("start mock server: {error}"))?;
        let addr = format!("http://{}", server.server_addr());
        let handle = thread::spawn(move || {
            let request = server.recv().expect("request expected");
            assert_eq!(request.method().as_str(), "PATCH");
            assert_eq!(request.url(), "/users/emails/u1");
            request
                .respond(Response::from_string(""))
                .expect("response should succeed");
        });

        let runtime = Runtime::from_config(&config_with(
            &addr,
            "pending_email = \"ana@news.example.com\"\n",
        )?)?;
        runtime.cancel_email_change()?;
        assert_eq!(
            runtime.drain_messages(),
            vec!["success: e-mail change request removed".to_owned()]
        );
        handle.join().expect("server thread should join");
        Ok(())
    }

    #[test]
    fn resend_without_pending_change_makes_no_request() -> Result<()> {
        let runtime = Runtime::from_config(&config_with("http://127.0.0.1:1", "")?)?;
        let error = runtime
            .resend_email_confirmation()
            .expect_err("nothing pending");
        assert!(error.to_string().contains("no pending e-mail change"));
        assert!(runtime.drain_messages().is_empty());
        Ok(())
    }
}
