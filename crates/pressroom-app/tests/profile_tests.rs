// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::Result;
use pressroom_app::{
    ApiError, Method, MutationReply, NotificationLevel, ProfileForm, User, UserId,
    cancel_email_change, save_profile, send_profile_change,
};
use pressroom_testkit::{RecordingGateway, RecordingNotifier};

fn stored() -> User {
    User {
        id: UserId::new("u1"),
        name: "Ana".to_owned(),
        email: "ana@example.com".to_owned(),
        ..User::default()
    }
}

#[test]
fn saved_profile_reports_the_fallback_message() -> Result<()> {
    let gateway = RecordingGateway::new();
    let notifier = RecordingNotifier::new();
    let user = stored();
    let form = ProfileForm {
        email: "new@example.com".to_owned(),
        ..ProfileForm::from_user(&user)
    };

    let request = save_profile(&user, &form)?;
    send_profile_change(&gateway, &notifier, &request, "profile saved")?;

    let writes = gateway.requests();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].method, Method::Put);
    assert_eq!(writes[0].path, "users/u1");
    let body = writes[0].body.clone().unwrap_or_default();
    assert_eq!(body["confirmEmail"], "new@example.com");
    let toast = notifier.last().expect("success toast");
    assert_eq!(toast.level, NotificationLevel::Success);
    assert_eq!(toast.message, "profile saved");
    Ok(())
}

#[test]
fn backend_message_wins_over_the_fallback() -> Result<()> {
    let gateway = RecordingGateway::new();
    gateway.push_reply(Ok(MutationReply::Message("e-mail change cancelled".to_owned())));
    let notifier = RecordingNotifier::new();
    let user = User {
        confirm_email: Some("new@example.com".to_owned()),
        ..stored()
    };

    let request = cancel_email_change(&user)?;
    send_profile_change(&gateway, &notifier, &request, "done")?;

    assert_eq!(gateway.requests()[0].path, "users/emails/u1");
    assert_eq!(
        notifier.last().map(|n| n.message),
        Some("e-mail change cancelled".to_owned())
    );
    Ok(())
}

#[test]
fn rejected_profile_toasts_the_backend_error() -> Result<()> {
    let gateway = RecordingGateway::new();
    gateway.push_reply(Err(ApiError::Validation {
        status: 400,
        message: "e-mail already registered".to_owned(),
    }));
    let notifier = RecordingNotifier::new();
    let user = stored();

    let request = save_profile(&user, &ProfileForm::from_user(&user))?;
    let error = send_profile_change(&gateway, &notifier, &request, "profile saved")
        .expect_err("validation error");

    assert!(error.to_string().contains("e-mail already registered"));
    let toast = notifier.last().expect("error toast");
    assert_eq!(toast.level, NotificationLevel::Error);
    assert_eq!(toast.message, "e-mail already registered");
    Ok(())
}
