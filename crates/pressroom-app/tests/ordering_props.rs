// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use pressroom_app::{
    CollectionStore, Comment, CommentId, Fields, Filter, Page, QueryState, RawPage, Revision,
    Ticket,
};
use pressroom_testkit::{Harness, admin_session, comment, numbered_tickets, raw_page};
use proptest::prelude::*;
use proptest::sample::Index;

const PAGES: u32 = 4;

fn comment_page(readed: bool) -> Page<Comment> {
    Page::from_raw(
        RawPage {
            items: vec![comment("C1", readed), comment("C2", true)],
            count: 2,
            limit: Some(10),
        },
        10,
    )
}

#[derive(Debug, Clone)]
enum Transition {
    Page(u32),
    Limit(u32),
    Filter(String),
    Reissue,
}

fn transition() -> impl Strategy<Value = Transition> {
    prop_oneof![
        (1..=20u32).prop_map(Transition::Page),
        prop::sample::select(vec![5u32, 10, 25, 50]).prop_map(Transition::Limit),
        "[a-z]{0,6}".prop_map(Transition::Filter),
        Just(Transition::Reissue),
    ]
}

proptest! {
    #[test]
    fn only_the_last_issued_page_is_displayed(
        pages in prop::collection::vec(1..=PAGES, 1..6),
        picks in prop::collection::vec(any::<Index>(), 6),
    ) {
        let harness = Harness::<Ticket>::new();
        for page in 1..=PAGES {
            let first = (page as usize - 1) * 10 + 1;
            harness
                .source
                .respond(page, Ok(raw_page(numbered_tickets("T", first, 10), 40, 10)));
        }
        let mut view = harness.view(admin_session()).expect("admin view");
        view.start();
        harness.settle(&mut view);

        for page in &pages {
            view.set_page(*page).expect("page within range");
        }
        let mut picks = picks.into_iter();
        while harness.dispatcher.pending() > 0 {
            let pending = harness.dispatcher.pending();
            let index = picks.next().map_or(0, |pick| pick.index(pending));
            harness.dispatcher.release(index);
            view.process_events();
        }

        let last = *pages.last().expect("at least one page");
        let expected_first = format!("T{}", (last - 1) * 10 + 1);
        prop_assert_eq!(view.store().items()[0].id.as_str(), expected_first.as_str());
        prop_assert_eq!(view.store().revision(), Some(view.query().revision()));
        prop_assert!(harness.notifier.is_empty());
    }

    #[test]
    fn filter_and_limit_changes_always_land_on_page_one(
        steps in prop::collection::vec(transition(), 0..12),
        final_filter in "[a-z]{1,6}",
    ) {
        let mut state = QueryState::default();
        for step in steps {
            let previous = state.revision();
            state = match step {
                Transition::Page(page) => state.with_page(page).expect("non-zero page"),
                Transition::Limit(limit) => {
                    let next = state.with_limit(limit).expect("allowed limit");
                    prop_assert_eq!(next.page(), 1);
                    next
                }
                Transition::Filter(value) => {
                    let next = state.with_filter(Filter::new().with("type", value));
                    prop_assert_eq!(next.page(), 1);
                    next
                }
                Transition::Reissue => state.reissued(),
            };
            prop_assert!(state.revision() > previous);
        }
        let filtered = state.with_filter(Filter::new().with("order", final_filter));
        prop_assert_eq!(filtered.page(), 1);
    }

    #[test]
    fn applying_a_patch_twice_equals_applying_it_once(
        readed in any::<bool>(),
        answer in "[a-zA-Z ]{0,20}",
        revision in 1..100u64,
    ) {
        let id = CommentId::new("C1");
        let fields = Fields::new().with("readed", readed).with("answer", answer);
        let revision = Revision::new(revision);

        let mut once = CollectionStore::new();
        once.replace(comment_page(false), Revision::ZERO);
        once.apply_optimistic(&id, &fields, revision).expect("patch applies");

        let mut twice = CollectionStore::new();
        twice.replace(comment_page(false), Revision::ZERO);
        twice.apply_optimistic(&id, &fields, revision).expect("patch applies");
        twice.apply_optimistic(&id, &fields, revision).expect("patch applies");

        prop_assert_eq!(once.items(), twice.items());
        prop_assert_eq!(once.pending(&id), twice.pending(&id));
    }

    #[test]
    fn rollback_restores_the_entity_exactly(
        readed in any::<bool>(),
        confirmed in any::<bool>(),
        extra in "[a-z]{1,8}",
        revision in 1..100u64,
    ) {
        let id = CommentId::new("C1");
        let mut store = CollectionStore::new();
        store.replace(comment_page(readed), Revision::ZERO);
        let before = store.items().to_vec();

        let fields = Fields::new()
            .with("readed", !readed)
            .with("confirmed", confirmed)
            .with(format!("x_{extra}"), true);
        let revision = Revision::new(revision);
        prop_assert!(store.apply_optimistic(&id, &fields, revision).expect("patch applies"));
        prop_assert!(store.rollback(&id, revision).expect("rollback applies"));

        prop_assert_eq!(store.items(), before.as_slice());
        prop_assert_eq!(store.pending_len(), 0);
    }

    #[test]
    fn reconciliation_keeps_only_patches_newer_than_the_page(
        patch_at in 1..20u64,
        page_at in 0..20u64,
    ) {
        let id = CommentId::new("C1");
        let mut store = CollectionStore::new();
        store.replace(comment_page(false), Revision::ZERO);
        store
            .apply_optimistic(&id, &Fields::new().with("readed", true), Revision::new(patch_at))
            .expect("patch applies");

        store.replace(comment_page(false), Revision::new(page_at));

        let kept = patch_at > page_at;
        prop_assert_eq!(store.get(&id).map(|c| c.readed), Some(kept));
        prop_assert_eq!(store.pending_len(), usize::from(kept));
    }
}
