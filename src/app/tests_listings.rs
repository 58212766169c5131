use super::tests::{car, publish, register, seeded_market, ADMIN, BUYER, SELLER, T0};
use super::{AppError, ListingPatch, NewAccount};
use crate::cards::{CardFormat, CardList};
use crate::domain::account::AccountKind;
use crate::domain::doping::DopingTier;
use crate::domain::status::ListingStatus;
use crate::domain::vehicle::{Fuel, VehicleSpec};
use crate::listing_query::{ListingFilter, SortOrder};
use time::Duration;

const PASSAT: &str = "vehicles/automobile/volkswagen/passat";
const BMW_320I: &str = "vehicles/automobile/bmw/3-series/320i";

fn filter() -> ListingFilter {
    ListingFilter::default()
}

#[test]
fn new_listing_waits_for_approval_then_publishes() {
    let mut app = seeded_market(None);
    app.act_as(Some(SELLER));
    let created = app
        .create_listing(car(PASSAT, "Clean Passat", 1_250_000))
        .expect("create should succeed");
    assert!(created.listing.id.starts_with("L-"));
    assert_eq!(created.listing.number.len(), 8);
    assert_eq!(created.listing.status, "pending");
    assert_eq!(created.listing.price_label, "1.250.000 TRY");
    let names = created
        .breadcrumb
        .iter()
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>();
    assert_eq!(names, vec!["Vehicles", "Automobile", "Volkswagen", "Passat"]);

    app.act_as(None);
    assert_eq!(app.search(&filter(), None, None).expect("search").total, 0);

    app.act_as(Some(ADMIN));
    let approved = app
        .approve_listing(&created.listing.number)
        .expect("approve should succeed");
    assert_eq!(approved.status, "active");
    assert_eq!(
        approved.published_at.as_deref(),
        Some("2026-03-01T10:00:00.000000Z")
    );
    assert_eq!(
        approved.expires_at.as_deref(),
        Some("2026-04-30T10:00:00.000000Z")
    );
    assert!(matches!(
        app.approve_listing(&created.listing.id)
            .expect_err("already active"),
        AppError::Conflict(_)
    ));

    app.act_as(None);
    let page = app.search(&filter(), None, None).expect("search");
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].listing.id, created.listing.id);
}

#[test]
fn listings_publish_immediately_when_approval_is_off() {
    let mut app = seeded_market(Some("[listing]\nrequire_approval = false\n"));
    app.act_as(Some(SELLER));
    let created = app
        .create_listing(car(PASSAT, "Passat", 900_000))
        .expect("create should succeed");
    assert_eq!(created.listing.status, "active");
    assert!(created.listing.expires_at.is_some());
}

#[test]
fn create_listing_validates_input() {
    let mut app = seeded_market(Some("[listing]\nmax_images = 2\n"));
    app.act_as(Some(SELLER));

    let mut negative = car(PASSAT, "Passat", -1);
    negative.price = -1;
    assert!(matches!(
        app.create_listing(negative).expect_err("negative price"),
        AppError::InvalidArgument(_)
    ));

    assert!(matches!(
        app.create_listing(car(PASSAT, "   ", 1)).expect_err("blank title"),
        AppError::InvalidArgument(_)
    ));

    let mut currency = car(PASSAT, "Passat", 1);
    currency.currency = Some("TL".to_string());
    assert!(matches!(
        app.create_listing(currency).expect_err("two-letter currency"),
        AppError::InvalidArgument(_)
    ));

    let mut photos = car(PASSAT, "Passat", 1);
    photos.images = (0..3).map(|n| format!("https://img.example/{n}.jpg")).collect();
    assert!(matches!(
        app.create_listing(photos).expect_err("too many images"),
        AppError::InvalidArgument(_)
    ));

    let mut year = car(PASSAT, "Passat", 1);
    year.vehicle.year = Some(1850);
    assert!(matches!(
        app.create_listing(year).expect_err("year out of range"),
        AppError::InvalidArgument(_)
    ));

    assert!(matches!(
        app.create_listing(car("vehicles/boats", "Boat", 1))
            .expect_err("unknown category"),
        AppError::NotFound {
            kind: "category",
            ..
        }
    ));
}

#[test]
fn hidden_listings_read_as_missing_for_strangers() {
    let mut app = seeded_market(None);
    app.act_as(Some(SELLER));
    let created = app
        .create_listing(car(PASSAT, "Passat", 900_000))
        .expect("create should succeed");

    app.act_as(Some(BUYER));
    assert!(matches!(
        app.show_listing(&created.listing.id).expect_err("pending is hidden"),
        AppError::NotFound {
            kind: "listing",
            ..
        }
    ));
    app.act_as(None);
    assert!(app.show_listing(&created.listing.number).is_err());

    app.act_as(Some(ADMIN));
    app.show_listing(&created.listing.id)
        .expect("admins see pending listings");
    app.act_as(Some(SELLER));
    let own = app
        .show_listing(&created.listing.id)
        .expect("owners see pending listings");
    assert_eq!(own.vehicle.as_ref().and_then(|v| v.color.as_deref()), Some("white"));
}

#[test]
fn material_owner_edits_send_an_active_listing_back_to_review() {
    let mut app = seeded_market(None);
    let detail = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));
    let id = detail.listing.id.clone();

    app.act_as(Some(SELLER));
    let repriced = app
        .edit_listing(
            &id,
            ListingPatch {
                price: Some(850_000),
                city: Some("Ankara".to_string()),
                ..ListingPatch::default()
            },
        )
        .expect("price edit should succeed");
    assert_eq!(repriced.listing.status, "active");
    assert_eq!(repriced.listing.price, 850_000);

    let retitled = app
        .edit_listing(
            &id,
            ListingPatch {
                vehicle: VehicleSpec {
                    km: Some(120_000),
                    ..VehicleSpec::default()
                },
                ..ListingPatch::default()
            },
        )
        .expect("vehicle edit should succeed");
    assert_eq!(retitled.listing.status, "pending");
    let vehicle = retitled.vehicle.expect("vehicle data should be kept");
    assert_eq!(vehicle.km, Some(120_000));
    assert_eq!(vehicle.year, Some(2018));

    assert!(matches!(
        app.edit_listing(&id, ListingPatch::default())
            .expect_err("empty patch"),
        AppError::InvalidArgument(_)
    ));

    app.act_as(Some(BUYER));
    assert!(app
        .edit_listing(
            &id,
            ListingPatch {
                price: Some(1),
                ..ListingPatch::default()
            }
        )
        .is_err());
}

#[test]
fn admin_edits_do_not_reset_review() {
    let mut app = seeded_market(None);
    let detail = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));
    app.act_as(Some(ADMIN));
    let edited = app
        .edit_listing(
            &detail.listing.id,
            ListingPatch {
                title: Some("Passat 1.6 TDI".to_string()),
                ..ListingPatch::default()
            },
        )
        .expect("admin edit should succeed");
    assert_eq!(edited.listing.status, "active");
}

#[test]
fn rejected_listing_resubmits_when_the_owner_fixes_it() {
    let mut app = seeded_market(None);
    let detail = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));
    let id = detail.listing.id.clone();

    app.act_as(Some(ADMIN));
    assert!(matches!(
        app.reject_listing(&id, " ").expect_err("reason required"),
        AppError::InvalidArgument(_)
    ));
    let rejected = app
        .reject_listing(&id, "photos do not match the car")
        .expect("reject should succeed");
    assert_eq!(rejected.status, "rejected");
    assert_eq!(
        rejected.rejection_reason.as_deref(),
        Some("photos do not match the car")
    );

    app.act_as(Some(SELLER));
    let fixed = app
        .edit_listing(
            &id,
            ListingPatch {
                description: Some("Real photos attached.".to_string()),
                ..ListingPatch::default()
            },
        )
        .expect("owner edit should succeed");
    assert_eq!(fixed.listing.status, "pending");

    app.act_as(Some(ADMIN));
    let approved = app.approve_listing(&id).expect("re-approval");
    assert!(approved.rejection_reason.is_none());
}

#[test]
fn sold_listings_are_frozen() {
    let mut app = seeded_market(None);
    let detail = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));
    let id = detail.listing.id.clone();

    app.act_as(Some(SELLER));
    let sold = app.mark_sold(&id).expect("sold should succeed");
    assert_eq!(sold.status, "sold");

    assert!(matches!(
        app.edit_listing(
            &id,
            ListingPatch {
                price: Some(1),
                ..ListingPatch::default()
            }
        )
        .expect_err("sold listings cannot change"),
        AppError::Conflict(_)
    ));
    assert!(matches!(
        app.add_images(&id, &["https://img.example/x.jpg".to_string()])
            .expect_err("sold listings keep their images"),
        AppError::Conflict(_)
    ));

    app.set_clock(Some(T0 + Duration::hours(1)));
    let again = app.mark_sold(&id).expect("selling twice is a no-op");
    assert_eq!(again.status, "sold");
    assert_eq!(again.updated_at, sold.updated_at);
}

#[test]
fn pending_listing_cannot_be_marked_sold() {
    let mut app = seeded_market(None);
    app.act_as(Some(SELLER));
    let created = app
        .create_listing(car(PASSAT, "Passat", 900_000))
        .expect("create should succeed");
    assert!(matches!(
        app.mark_sold(&created.listing.id).expect_err("pending"),
        AppError::InvalidTransition(_)
    ));
}

#[test]
fn soft_delete_and_restore_return_to_the_previous_status() {
    let mut app = seeded_market(None);
    let detail = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));
    let id = detail.listing.id.clone();

    app.act_as(Some(SELLER));
    let deleted = app
        .delete_listing(&id, Some("sold elsewhere"))
        .expect("delete should succeed");
    assert_eq!(deleted.status, "deleted");
    assert!(matches!(
        app.delete_listing(&id, None).expect_err("already deleted"),
        AppError::Conflict(_)
    ));

    app.act_as(Some(BUYER));
    assert!(app.show_listing(&id).is_err());

    app.act_as(Some(SELLER));
    assert!(matches!(
        app.restore_listing(&id).expect_err("only admins restore"),
        AppError::Forbidden(_)
    ));

    app.act_as(Some(ADMIN));
    let restored = app.restore_listing(&id).expect("restore should succeed");
    assert_eq!(restored.status, "active");
    assert!(matches!(
        app.restore_listing(&id).expect_err("not deleted"),
        AppError::Conflict(_)
    ));

    let actions = app
        .moderation_log(10)
        .expect("log should load")
        .into_iter()
        .map(|entry| entry.action)
        .collect::<Vec<_>>();
    assert!(actions.contains(&"delete".to_string()));
    assert!(actions.contains(&"restore".to_string()));
}

#[test]
fn images_keep_a_dense_order_with_the_cover_first() {
    let mut app = seeded_market(None);
    let mut input = car(PASSAT, "Passat", 900_000);
    input.images = vec![
        "https://img.example/front.jpg".to_string(),
        "https://img.example/side.jpg".to_string(),
    ];
    let detail = publish(&mut app, SELLER, input);
    let id = detail.listing.id.clone();
    assert_eq!(detail.images.len(), 2);

    app.act_as(Some(SELLER));
    let images = app
        .add_images(&id, &["https://img.example/interior.jpg".to_string()])
        .expect("add should succeed");
    assert_eq!(images.len(), 3);
    let interior = images[2].id.clone();

    let moved = app.move_image(&id, &interior, 0).expect("move should succeed");
    assert_eq!(moved[0].url, "https://img.example/interior.jpg");
    let positions = moved.iter().map(|image| image.position).collect::<Vec<_>>();
    assert_eq!(positions, vec![0, 1, 2]);

    let trimmed = app
        .remove_image(&id, &moved[1].id)
        .expect("remove should succeed");
    assert_eq!(trimmed.len(), 2);
    assert_eq!(trimmed[1].position, 1);

    assert!(matches!(
        app.remove_image(&id, "I-missing").expect_err("unknown image"),
        AppError::NotFound { .. }
    ));

    app.act_as(None);
    let page = app
        .search_cards(&filter(), CardFormat::Grid, None, None)
        .expect("search");
    match page.cards {
        CardList::Grid(cards) => assert_eq!(
            cards[0].cover_image.as_deref(),
            Some("https://img.example/interior.jpg")
        ),
        other => panic!("expected grid cards, got {:?}", other),
    }
}

/// Passat (diesel, white, 2018, Izmir), 320i (gasoline, 2021) and a
/// cheap Passat without photos, all active.
fn search_market() -> super::App {
    let mut app = seeded_market(None);
    let mut passat = car(PASSAT, "Passat 1.6 TDI Highline", 1_250_000);
    passat.images = vec!["https://img.example/passat.jpg".to_string()];
    passat.description = Some("Garage kept, 100% original".to_string());
    publish(&mut app, SELLER, passat);

    let mut bmw = car(BMW_320I, "BMW 320i M Sport", 2_100_000);
    bmw.city = Some("Istanbul".to_string());
    bmw.vehicle = VehicleSpec {
        year: Some(2021),
        km: Some(30_000),
        fuel: Some(Fuel::Gasoline),
        color: Some("Black".to_string()),
        ..VehicleSpec::default()
    };
    publish(&mut app, SELLER, bmw);

    publish(&mut app, BUYER, car(PASSAT, "Passat cheap", 600_000));
    app.act_as(None);
    app
}

#[test]
fn search_scopes_by_category_subtree_and_brand_names() {
    let app = search_market();
    let by_path = app
        .search(
            &ListingFilter {
                category: Some("vehicles/automobile/bmw".to_string()),
                ..filter()
            },
            None,
            None,
        )
        .expect("search");
    assert_eq!(by_path.total, 1);

    let by_brand = app
        .search(
            &ListingFilter {
                brand: Some("Volkswagen".to_string()),
                model: Some("passat".to_string()),
                ..filter()
            },
            None,
            None,
        )
        .expect("search");
    assert_eq!(by_brand.total, 2);

    let err = app
        .search(
            &ListingFilter {
                brand: Some("Audi".to_string()),
                ..filter()
            },
            None,
            None,
        )
        .expect_err("unknown brand");
    assert!(matches!(err, AppError::NotFound { kind: "brand", .. }));

    let err = app
        .search(
            &ListingFilter {
                model: Some("passat".to_string()),
                ..filter()
            },
            None,
            None,
        )
        .expect_err("model without brand");
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[test]
fn search_applies_ranges_and_attributes() {
    let app = search_market();
    let total = |filter: ListingFilter| app.search(&filter, None, None).expect("search").total;

    assert_eq!(
        total(ListingFilter {
            price_max: Some(1_300_000),
            ..filter()
        }),
        2
    );
    assert_eq!(
        total(ListingFilter {
            year_min: Some(2020),
            ..filter()
        }),
        1
    );
    assert_eq!(
        total(ListingFilter {
            fuel: Some(Fuel::Diesel),
            ..filter()
        }),
        2
    );
    assert_eq!(
        total(ListingFilter {
            color: Some("  WHITE ".to_string()),
            ..filter()
        }),
        2
    );
    assert_eq!(
        total(ListingFilter {
            city: Some("istanbul".to_string()),
            ..filter()
        }),
        1
    );
    assert_eq!(
        total(ListingFilter {
            with_images: true,
            ..filter()
        }),
        1
    );
    assert_eq!(
        total(ListingFilter {
            seller_kind: Some(AccountKind::Corporate),
            ..filter()
        }),
        0
    );
    assert!(matches!(
        app.search(
            &ListingFilter {
                price_min: Some(10),
                price_max: Some(5),
                ..filter()
            },
            None,
            None
        )
        .expect_err("inverted range"),
        AppError::InvalidArgument(_)
    ));
}

#[test]
fn free_text_terms_must_all_match_and_wildcards_are_literal() {
    let app = search_market();
    let total = |query: &str| {
        app.search(
            &ListingFilter {
                query: Some(query.to_string()),
                ..filter()
            },
            None,
            None,
        )
        .expect("search")
        .total
    };
    assert_eq!(total("passat"), 2);
    assert_eq!(total("passat tdi"), 1);
    assert_eq!(total("m sport"), 1);
    assert_eq!(total("100%"), 1);
    assert_eq!(total("%"), 1);
    assert_eq!(total("golf"), 0);
}

#[test]
fn sorting_and_paging() {
    let app = search_market();
    let cheapest = app
        .search(
            &ListingFilter {
                sort: SortOrder::PriceAsc,
                ..filter()
            },
            None,
            None,
        )
        .expect("search");
    let prices = cheapest
        .items
        .iter()
        .map(|hit| hit.listing.price)
        .collect::<Vec<_>>();
    assert_eq!(prices, vec![600_000, 1_250_000, 2_100_000]);

    let newest = app.search(&filter(), None, None).expect("search");
    assert_eq!(newest.items[0].listing.title, "Passat cheap");

    let second = app
        .search(
            &ListingFilter {
                sort: SortOrder::PriceDesc,
                ..filter()
            },
            Some(2),
            Some(2),
        )
        .expect("search");
    assert_eq!(second.total, 3);
    assert_eq!(second.total_pages, 2);
    assert_eq!(second.page, 2);
    assert_eq!(second.items.len(), 1);
    assert_eq!(second.items[0].listing.price, 600_000);

    let clamped = app.search(&filter(), Some(0), Some(10_000)).expect("search");
    assert_eq!(clamped.page, 1);
    assert_eq!(clamped.per_page, 100);

    let past_end = app.search(&filter(), Some(9), None).expect("search");
    assert!(past_end.items.is_empty());
    assert_eq!(past_end.total, 3);
}

#[test]
fn status_and_mine_scopes() {
    let mut app = search_market();
    app.act_as(Some(SELLER));
    app.create_listing(car(PASSAT, "Draft-ish Passat", 1))
        .expect("pending listing");

    let status_filter = ListingFilter {
        status: Some(ListingStatus::Pending),
        ..filter()
    };
    assert!(matches!(
        app.search(&status_filter, None, None)
            .expect_err("members cannot search by status"),
        AppError::Forbidden(_)
    ));

    let mine = app
        .search(
            &ListingFilter {
                mine: true,
                ..filter()
            },
            None,
            None,
        )
        .expect("mine");
    assert_eq!(mine.total, 3);

    let mine_pending = app
        .search(
            &ListingFilter {
                mine: true,
                status: Some(ListingStatus::Pending),
                ..filter()
            },
            None,
            None,
        )
        .expect("mine pending");
    assert_eq!(mine_pending.total, 1);

    app.act_as(Some(ADMIN));
    assert_eq!(
        app.search(&status_filter, None, None).expect("admin").total,
        1
    );

    app.act_as(None);
    assert!(matches!(
        app.search(
            &ListingFilter {
                mine: true,
                ..filter()
            },
            None,
            None
        )
        .expect_err("mine needs a session"),
        AppError::Forbidden(_)
    ));
}

#[test]
fn doping_lifecycle_boosts_search_placement() {
    let mut app = search_market();
    app.act_as(Some(SELLER));
    let mine = app
        .search(
            &ListingFilter {
                mine: true,
                sort: SortOrder::PriceAsc,
                ..filter()
            },
            None,
            None,
        )
        .expect("mine");
    let passat = mine.items[0].listing.clone();
    assert_eq!(passat.price, 1_250_000);

    let requested = app
        .request_doping(&passat.id, DopingTier::Gold)
        .expect("request should succeed");
    assert_eq!(requested.status, "pending");
    assert_eq!(requested.days, 30);
    assert_eq!(requested.price, 999);
    assert!(matches!(
        app.request_doping(&passat.id, DopingTier::Gold)
            .expect_err("one open request per tier"),
        AppError::Conflict(_)
    ));

    app.act_as(Some(BUYER));
    assert!(matches!(
        app.list_dopings(&passat.id).expect_err("not the owner"),
        AppError::Forbidden(_)
    ));
    assert!(app.request_doping(&passat.id, DopingTier::Urgent).is_err());

    app.act_as(Some(SELLER));
    assert!(matches!(
        app.approve_doping(&requested.id).expect_err("admins only"),
        AppError::Forbidden(_)
    ));

    app.act_as(Some(ADMIN));
    let active = app
        .approve_doping(&requested.id)
        .expect("approval should succeed");
    assert_eq!(active.status, "active");
    assert_eq!(active.starts_at.as_deref(), Some("2026-03-01T10:00:00.000000Z"));
    assert_eq!(active.ends_at.as_deref(), Some("2026-03-31T10:00:00.000000Z"));

    app.act_as(None);
    let newest = app.search(&filter(), None, None).expect("search");
    assert_eq!(newest.items[0].listing.id, passat.id);
    assert_eq!(newest.items[0].tier, Some(DopingTier::Gold));

    let featured = app
        .search(
            &ListingFilter {
                featured: Some(DopingTier::Premium),
                ..filter()
            },
            None,
            None,
        )
        .expect("featured");
    assert_eq!(featured.total, 1);

    let showcase = app
        .search_cards(&filter(), CardFormat::Showcase, None, None)
        .expect("showcase");
    assert_eq!(showcase.cards.len(), 1);

    let detail = app.show_listing(&passat.id).expect("detail");
    assert_eq!(detail.tier, Some(DopingTier::Gold));
    assert!(detail.badges.contains(&"gold".to_string()));
    assert!(detail.dopings.is_empty(), "strangers do not see dopings");
}

#[test]
fn showcase_pages_only_count_gold_listings() {
    let mut app = seeded_market(Some("[search]\nfeatured_first = false\n"));
    let gold = publish(&mut app, SELLER, car(PASSAT, "Passat gold", 900_000));
    app.set_clock(Some(T0 + Duration::minutes(5)));
    publish(&mut app, SELLER, car(PASSAT, "Passat plain", 800_000));

    app.act_as(Some(SELLER));
    let request = app
        .request_doping(&gold.listing.id, DopingTier::Gold)
        .expect("request gold");
    app.act_as(Some(ADMIN));
    app.approve_doping(&request.id).expect("approve gold");

    app.act_as(None);
    let plain = app
        .search_cards(&filter(), CardFormat::Grid, Some(1), Some(1))
        .expect("grid page");
    assert_eq!(plain.total, 2);

    let showcase = app
        .search_cards(&filter(), CardFormat::Showcase, Some(1), Some(1))
        .expect("showcase page");
    assert_eq!(showcase.total, 1);
    assert_eq!(showcase.total_pages, 1);
    match &showcase.cards {
        CardList::Showcase(cards) => {
            assert_eq!(cards.len(), 1);
            assert_eq!(cards[0].number, gold.listing.number);
        }
        other => panic!("expected showcase cards, got {other:?}"),
    }
}

#[test]
fn doping_requests_can_be_cancelled_or_rejected() {
    let mut app = seeded_market(None);
    let detail = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));
    let id = detail.listing.id.clone();

    app.act_as(Some(SELLER));
    let urgent = app.request_doping(&id, DopingTier::Urgent).expect("urgent");
    let premium = app
        .request_doping(&id, DopingTier::Premium)
        .expect("premium");
    let cancelled = app
        .cancel_doping(&urgent.id, Some("changed my mind"))
        .expect("cancel should succeed");
    assert_eq!(cancelled.status, "cancelled");

    app.act_as(Some(ADMIN));
    assert!(matches!(
        app.reject_doping(&premium.id, "").expect_err("note required"),
        AppError::InvalidArgument(_)
    ));
    let rejected = app
        .reject_doping(&premium.id, "payment not received")
        .expect("reject should succeed");
    assert_eq!(rejected.status, "rejected");
    assert!(matches!(
        app.approve_doping(&premium.id).expect_err("already decided"),
        AppError::InvalidDopingTransition(_)
    ));

    app.act_as(Some(SELLER));
    let all = app.list_dopings(&id).expect("owner listing");
    assert_eq!(all.len(), 2);
    app.request_doping(&id, DopingTier::Urgent)
        .expect("closed requests no longer block the tier");
}

#[test]
fn pending_listing_dopings_wait_for_publication() {
    let mut app = seeded_market(None);
    app.act_as(Some(SELLER));
    let created = app
        .create_listing(car(PASSAT, "Passat", 900_000))
        .expect("create");
    let doping = app
        .request_doping(&created.listing.id, DopingTier::Premium)
        .expect("pending listings accept requests");

    app.act_as(Some(ADMIN));
    assert!(matches!(
        app.approve_doping(&doping.id).expect_err("listing not active"),
        AppError::Conflict(_)
    ));
    app.approve_listing(&created.listing.id).expect("approve");
    app.approve_doping(&doping.id).expect("now it can start");
}

#[test]
fn closing_a_listing_closes_its_dopings() {
    let mut app = seeded_market(None);
    let detail = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));
    let id = detail.listing.id.clone();

    app.act_as(Some(SELLER));
    let gold = app.request_doping(&id, DopingTier::Gold).expect("gold");
    let urgent = app.request_doping(&id, DopingTier::Urgent).expect("urgent");
    app.act_as(Some(ADMIN));
    app.approve_doping(&gold.id).expect("approve gold");

    app.set_clock(Some(T0 + Duration::days(3)));
    app.act_as(Some(SELLER));
    app.mark_sold(&id).expect("sold");

    let dopings = app.list_dopings(&id).expect("owner listing");
    let status_of = |doping_id: &str| {
        dopings
            .iter()
            .find(|d| d.id == doping_id)
            .map(|d| (d.status.clone(), d.ends_at.clone()))
            .expect("doping should be listed")
    };
    assert_eq!(
        status_of(&gold.id),
        (
            "expired".to_string(),
            Some("2026-03-04T10:00:00.000000Z".to_string())
        )
    );
    assert_eq!(status_of(&urgent.id).0, "cancelled");
}

#[test]
fn sweep_expires_dopings_then_listings_and_renew_resubmits() {
    let mut app = seeded_market(None);
    let detail = publish(&mut app, SELLER, car(PASSAT, "Passat", 900_000));
    let id = detail.listing.id.clone();
    app.act_as(Some(SELLER));
    let gold = app.request_doping(&id, DopingTier::Gold).expect("gold");
    app.act_as(Some(ADMIN));
    app.approve_doping(&gold.id).expect("approve");

    app.act_as(None);
    let early = app
        .sweep(Some(T0 + Duration::days(31)))
        .expect("sweep should succeed");
    assert_eq!(early.expired_dopings, 1);
    assert_eq!(early.expired_listings, 0);

    let late = app
        .sweep(Some(T0 + Duration::days(61)))
        .expect("sweep should succeed");
    assert_eq!(late.expired_dopings, 0);
    assert_eq!(late.expired_listings, 1);
    assert_eq!(
        app.sweep(Some(T0 + Duration::days(61)))
            .expect("idempotent")
            .expired_listings,
        0
    );

    assert_eq!(app.search(&filter(), None, None).expect("search").total, 0);

    app.act_as(Some(SELLER));
    let renewed = app.renew_listing(&id).expect("renew should succeed");
    assert_eq!(renewed.status, "pending");
    assert!(matches!(
        app.renew_listing(&id).expect_err("not expired"),
        AppError::Conflict(_)
    ));
}

#[test]
fn moderation_queue_and_stats_reflect_pending_work() {
    let mut app = seeded_market(None);
    app.register(NewAccount {
        email: "sales@dealer.example".to_string(),
        display_name: "Dealer".to_string(),
        kind: AccountKind::Corporate,
        company_name: Some("Dealer Motors".to_string()),
        tax_number: Some("1234567890".to_string()),
        ..NewAccount::default()
    })
    .expect("dealer");
    publish(&mut app, SELLER, car(PASSAT, "Active Passat", 900_000));
    app.act_as(Some(SELLER));
    let mut euro = car(BMW_320I, "Pending BMW", 2_000_000);
    euro.currency = Some("EUR".to_string());
    let pending = app.create_listing(euro).expect("pending");
    app.request_doping(&pending.listing.id, DopingTier::Urgent)
        .expect("doping");

    app.act_as(Some(SELLER));
    assert!(matches!(
        app.moderation_queue().expect_err("admins only"),
        AppError::Forbidden(_)
    ));

    app.act_as(Some(ADMIN));
    let queue = app.moderation_queue().expect("queue");
    assert_eq!(queue.listings.len(), 1);
    assert_eq!(queue.listings[0].title, "Pending BMW");
    assert_eq!(queue.dopings.len(), 1);
    assert!(queue.dopings[0].price_label.ends_with(" EUR"));
    assert_eq!(queue.verifications.len(), 1);

    let stats = app.moderation_stats().expect("stats");
    assert_eq!(stats.listings_by_status.get("active"), Some(&1));
    assert_eq!(stats.listings_by_status.get("sold"), Some(&0));
    assert_eq!(stats.pending_listings, 1);
    assert_eq!(stats.users, 4);
    assert_eq!(stats.corporate_users, 1);
    assert_eq!(stats.pending_dopings, 1);
    assert_eq!(stats.pending_verifications, 1);
    assert_eq!(stats.schema_version.as_deref(), Some("3"));
}

#[test]
fn sweep_needs_no_session_but_moderation_does() {
    let mut app = seeded_market(None);
    register(&mut app, "late@market.example", "Late");
    app.act_as(None);
    app.sweep(None).expect("sweep runs without a session");
    assert!(matches!(
        app.moderation_log(5).expect_err("no session"),
        AppError::Forbidden(_)
    ));
}
