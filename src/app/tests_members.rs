use super::tests::{car, publish, register, seeded_market, ADMIN, BUYER, DEALER, SELLER, T0};
use super::AppError;
use crate::cards::{CardFormat, CardList};
use crate::listing_query::{ListingFilter, SortOrder};
use time::Duration;

const PASSAT: &str = "vehicles/automobile/volkswagen/passat";

#[test]
fn favorites_toggle_and_follow_listing_visibility() {
    let mut app = seeded_market(None);
    let passat = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));

    app.act_as(None);
    assert!(matches!(
        app.toggle_favorite(&passat.listing.number)
            .expect_err("needs a session"),
        AppError::Forbidden(_)
    ));

    app.act_as(Some(BUYER));
    let first = app
        .toggle_favorite(&passat.listing.number)
        .expect("favorite should toggle on");
    assert!(first.favorited);
    assert_eq!(first.listing_id, passat.listing.id);

    let cards = app.list_favorites(CardFormat::Grid).expect("favorites");
    match &cards {
        CardList::Grid(items) => {
            assert_eq!(items.len(), 1);
            assert_eq!(items[0].number, passat.listing.number);
        }
        other => panic!("expected grid cards, got {other:?}"),
    }

    let second = app
        .toggle_favorite(&passat.listing.id)
        .expect("favorite should toggle off");
    assert!(!second.favorited);
    assert!(app.list_favorites(CardFormat::Row).expect("favorites").is_empty());

    app.toggle_favorite(&passat.listing.id).expect("favorite again");
    app.act_as(Some(SELLER));
    app.delete_listing(&passat.listing.id, None)
        .expect("owner deletes");

    app.act_as(Some(BUYER));
    assert!(app.list_favorites(CardFormat::Grid).expect("favorites").is_empty());
    let dropped = app
        .toggle_favorite(&passat.listing.id)
        .expect("a deleted favorite can still be removed");
    assert!(!dropped.favorited);
    assert!(matches!(
        app.toggle_favorite(&passat.listing.id)
            .expect_err("hidden listing"),
        AppError::NotFound { kind: "listing", .. }
    ));
}

#[test]
fn favorites_hide_taken_down_listings_but_can_be_removed() {
    let mut app = seeded_market(None);
    let passat = publish(&mut app, SELLER, car(PASSAT, "Secret Passat", 900_000));

    app.act_as(Some(BUYER));
    app.toggle_favorite(&passat.listing.number)
        .expect("favorite active listing");

    app.act_as(Some(ADMIN));
    app.reject_listing(&passat.listing.id, "fraud")
        .expect("admin takes the listing down");

    app.act_as(Some(BUYER));
    assert!(app.list_favorites(CardFormat::Grid).expect("favorites").is_empty());
    let removed = app
        .toggle_favorite(&passat.listing.number)
        .expect("untoggle works on a hidden listing");
    assert!(!removed.favorited);
    assert!(matches!(
        app.toggle_favorite(&passat.listing.number)
            .expect_err("cannot favorite it again"),
        AppError::NotFound { kind: "listing", .. }
    ));

    app.act_as(Some(SELLER));
    app.toggle_favorite(&passat.listing.id)
        .expect("owners may favorite their own listings");
    assert_eq!(app.list_favorites(CardFormat::Row).expect("favorites").len(), 1);
}

#[test]
fn pending_listings_cannot_be_favorited_by_strangers() {
    let mut app = seeded_market(None);
    app.act_as(Some(SELLER));
    let pending = app
        .create_listing(car(PASSAT, "Passat", 900_000))
        .expect("create");

    app.act_as(Some(BUYER));
    assert!(matches!(
        app.toggle_favorite(&pending.listing.id)
            .expect_err("not public yet"),
        AppError::NotFound { .. }
    ));
}

#[test]
fn saved_filters_dedupe_by_fingerprint() {
    let mut app = seeded_market(None);
    publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));
    publish(&mut app, SELLER, car(PASSAT, "Passat older", 450_000));

    app.act_as(Some(BUYER));
    let cheap = ListingFilter {
        price_max: Some(500_000),
        city: Some(" Izmir ".to_string()),
        ..ListingFilter::default()
    };
    let saved = app
        .save_filter(Some("Cheap in Izmir"), &cheap)
        .expect("save should succeed");
    assert!(saved.created);
    assert!(saved.id.starts_with("S-"));
    assert_eq!(saved.name, "Cheap in Izmir");
    assert_eq!(saved.filter.city.as_deref(), Some("Izmir"));

    let again = app
        .save_filter(Some("Another name"), &ListingFilter {
            city: Some("Izmir".to_string()),
            ..cheap.clone()
        })
        .expect("duplicate save returns the existing filter");
    assert!(!again.created);
    assert_eq!(again.id, saved.id);
    assert_eq!(again.name, "Cheap in Izmir");

    let unnamed = app
        .save_filter(None, &ListingFilter {
            sort: SortOrder::PriceAsc,
            ..ListingFilter::default()
        })
        .expect("save without a name");
    assert!(unnamed.created);
    assert_eq!(unnamed.name, "sort=price_asc");
    assert_eq!(app.list_saved_filters().expect("list").len(), 2);

    let page = app
        .run_saved_filter(&saved.id, None, None)
        .expect("run should succeed");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].listing.price, 450_000);

    assert!(matches!(
        app.save_filter(None, &ListingFilter {
            price_min: Some(10),
            price_max: Some(5),
            ..ListingFilter::default()
        })
        .expect_err("empty range"),
        AppError::InvalidArgument(_)
    ));
}

#[test]
fn saved_filters_belong_to_their_owner() {
    let mut app = seeded_market(None);
    app.act_as(Some(BUYER));
    let saved = app
        .save_filter(Some("mine"), &ListingFilter::default())
        .expect("save");

    app.act_as(Some(SELLER));
    assert!(app.list_saved_filters().expect("list").is_empty());
    assert!(matches!(
        app.delete_saved_filter(&saved.id).expect_err("not the owner"),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        app.run_saved_filter(&saved.id, None, None)
            .expect_err("not the owner"),
        AppError::Forbidden(_)
    ));

    app.act_as(Some(BUYER));
    let removed = app.delete_saved_filter(&saved.id).expect("owner deletes");
    assert_eq!(removed.id, saved.id);
    assert!(matches!(
        app.delete_saved_filter(&saved.id).expect_err("already gone"),
        AppError::NotFound { kind: "saved filter", .. }
    ));
}

#[test]
fn buyers_open_one_conversation_per_listing() {
    let mut app = seeded_market(None);
    let passat = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));

    app.act_as(Some(BUYER));
    let first = app
        .send_message(&passat.listing.number, "  Is the price negotiable?  ")
        .expect("message should send");
    assert!(first.mine);
    assert_eq!(first.body, "Is the price negotiable?");
    assert!(first.read_at.is_none());

    app.set_clock(Some(T0 + Duration::minutes(5)));
    let second = app
        .send_message(&passat.listing.id, "Also, any accident history?")
        .expect("second message should reuse the thread");
    assert_eq!(second.conversation_id, first.conversation_id);

    app.act_as(Some(SELLER));
    let inbox = app.inbox().expect("seller inbox");
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0].role, "seller");
    assert_eq!(inbox[0].unread, 2);
    assert_eq!(inbox[0].listing_number, passat.listing.number);
    assert_eq!(
        inbox[0].last_message.as_deref(),
        Some("Also, any accident history?")
    );

    let thread = app
        .read_conversation(&first.conversation_id)
        .expect("seller reads");
    assert_eq!(thread.marked_read, 2);
    assert_eq!(thread.messages.len(), 2);
    assert!(thread.messages.iter().all(|message| !message.mine));
    assert_eq!(app.inbox().expect("inbox")[0].unread, 0);

    app.set_clock(Some(T0 + Duration::minutes(9)));
    let reply = app
        .reply(&first.conversation_id, "No accidents, price is firm.")
        .expect("seller replies");
    assert!(reply.mine);

    app.act_as(Some(BUYER));
    let inbox = app.inbox().expect("buyer inbox");
    assert_eq!(inbox[0].role, "buyer");
    assert_eq!(inbox[0].unread, 1);
    assert_eq!(inbox[0].updated_at, "2026-03-01T10:09:00.000000Z");

    let thread = app
        .read_conversation(&first.conversation_id)
        .expect("buyer reads");
    assert_eq!(thread.marked_read, 1);
    let bodies = thread
        .messages
        .iter()
        .map(|message| message.body.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        bodies,
        vec![
            "Is the price negotiable?",
            "Also, any accident history?",
            "No accidents, price is firm."
        ]
    );
    let again = app
        .read_conversation(&first.conversation_id)
        .expect("reading twice");
    assert_eq!(again.marked_read, 0);
}

#[test]
fn chat_rejects_invalid_senders_and_bodies() {
    let mut app = seeded_market(Some("[chat]\nmax_message_len = 10\n"));
    let passat = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));

    app.act_as(Some(SELLER));
    assert!(matches!(
        app.send_message(&passat.listing.id, "hello")
            .expect_err("own listing"),
        AppError::InvalidArgument(_)
    ));

    app.act_as(Some(BUYER));
    assert!(matches!(
        app.send_message(&passat.listing.id, "   ")
            .expect_err("empty body"),
        AppError::InvalidArgument(_)
    ));
    assert!(matches!(
        app.send_message(&passat.listing.id, "this is far too long")
            .expect_err("long body"),
        AppError::InvalidArgument(_)
    ));
    let sent = app
        .send_message(&passat.listing.id, "price?")
        .expect("short body");

    register(&mut app, DEALER, "Dealer");
    app.act_as(Some(DEALER));
    assert!(matches!(
        app.reply(&sent.conversation_id, "hi").expect_err("stranger"),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        app.read_conversation(&sent.conversation_id)
            .expect_err("stranger"),
        AppError::Forbidden(_)
    ));
    assert!(app.inbox().expect("dealer inbox").is_empty());
    assert!(matches!(
        app.reply("V-missing", "hi").expect_err("unknown thread"),
        AppError::NotFound { kind: "conversation", .. }
    ));

    app.act_as(Some(SELLER));
    app.mark_sold(&passat.listing.id).expect("sold");
    app.act_as(Some(BUYER));
    assert!(matches!(
        app.send_message(&passat.listing.id, "still?")
            .expect_err("sold listing is hidden"),
        AppError::NotFound { .. }
    ));
    app.reply(&sent.conversation_id, "ok")
        .expect("existing threads stay open");
}

#[test]
fn banned_members_cannot_write() {
    let mut app = seeded_market(None);
    let passat = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));

    app.act_as(Some(ADMIN));
    app.ban(BUYER, Some("spam")).expect("ban");

    app.act_as(Some(BUYER));
    assert!(matches!(
        app.toggle_favorite(&passat.listing.id).expect_err("banned"),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        app.send_message(&passat.listing.id, "hi").expect_err("banned"),
        AppError::Forbidden(_)
    ));
    assert!(matches!(
        app.save_filter(None, &ListingFilter::default())
            .expect_err("banned"),
        AppError::Forbidden(_)
    ));
    assert!(app.list_saved_filters().expect("reads still work").is_empty());
}
