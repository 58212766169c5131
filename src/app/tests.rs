use super::{App, AppError, NewAccount, NewListing, ProfilePatch};
use crate::cards::DetailView;
use crate::config::Config;
use crate::domain::account::{AccountKind, Role, Verification};
use crate::domain::vehicle::{Fuel, VehicleSpec};
use std::path::PathBuf;
use time::macros::datetime;
use time::OffsetDateTime;
use uuid::Uuid;

pub(super) const ADMIN: &str = "admin@market.example";
pub(super) const SELLER: &str = "seller@market.example";
pub(super) const BUYER: &str = "buyer@market.example";
pub(super) const DEALER: &str = "sales@dealer.example";

pub(super) const T0: OffsetDateTime = datetime!(2026-03-01 10:00 UTC);

fn unique_db_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("carmart-app-test-{}", Uuid::now_v7()))
        .join("state.sqlite")
}

/// Empty marketplace with the built-in defaults, or with an overlay.
pub(super) fn open_market(overlay: Option<&str>) -> App {
    let config = Config::from_layers(overlay).expect("test config should load");
    let path = unique_db_path();
    let mut app = App::open(path.to_str().expect("utf8 path"), config).expect("app should open");
    app.set_clock(Some(T0));
    app
}

pub(super) fn register(app: &mut App, email: &str, name: &str) {
    app.act_as(None);
    app.register(NewAccount {
        email: email.to_string(),
        display_name: name.to_string(),
        ..NewAccount::default()
    })
    .expect("registration should succeed");
}

/// Admin, one individual seller and one buyer over a small vehicle tree.
pub(super) fn seeded_market(overlay: Option<&str>) -> App {
    let mut app = open_market(overlay);
    register(&mut app, ADMIN, "Moderator");
    app.act_as(Some(ADMIN));
    app.promote(ADMIN).expect("first admin should bootstrap");

    app.add_category(None, "Vehicles").expect("root");
    app.add_category(Some("vehicles"), "Automobile")
        .expect("automobile");
    app.add_category(Some("vehicles"), "Motorcycle")
        .expect("motorcycle");
    for brand in ["BMW", "Volkswagen"] {
        app.add_category(Some("vehicles/automobile"), brand)
            .expect("brand");
    }
    app.add_category(Some("vehicles/automobile/bmw"), "3 Series")
        .expect("model");
    app.add_category(Some("vehicles/automobile/bmw/3-series"), "320i")
        .expect("submodel");
    app.add_category(Some("vehicles/automobile/volkswagen"), "Passat")
        .expect("model");

    register(&mut app, SELLER, "Ayse");
    register(&mut app, BUYER, "Mehmet");
    app.act_as(None);
    app
}

pub(super) fn car(category: &str, title: &str, price: i64) -> NewListing {
    NewListing {
        category: category.to_string(),
        title: title.to_string(),
        price,
        city: Some("Izmir".to_string()),
        vehicle: VehicleSpec {
            year: Some(2018),
            km: Some(96_000),
            fuel: Some(Fuel::Diesel),
            color: Some("White".to_string()),
            ..VehicleSpec::default()
        },
        ..NewListing::default()
    }
}

/// Creates a listing as `owner` and, when approval is on, approves it as admin.
pub(super) fn publish(app: &mut App, owner: &str, input: NewListing) -> DetailView {
    app.act_as(Some(owner));
    let created = app.create_listing(input).expect("listing should be created");
    if created.listing.status == "pending" {
        app.act_as(Some(ADMIN));
        app.approve_listing(&created.listing.id)
            .expect("approval should succeed");
    }
    app.act_as(Some(owner));
    app.show_listing(&created.listing.id)
        .expect("published listing should be visible")
}

#[test]
fn register_normalizes_email_and_rejects_duplicates() {
    let mut app = open_market(None);
    let user = app
        .register(NewAccount {
            email: "  Seller@Market.Example ".to_string(),
            display_name: "Ayse".to_string(),
            ..NewAccount::default()
        })
        .expect("register should succeed");
    assert!(user.id.starts_with("U-"));
    assert_eq!(user.email, SELLER);
    assert_eq!(user.role, Role::Member);
    assert_eq!(user.verification, Verification::Unverified);

    let err = app
        .register(NewAccount {
            email: SELLER.to_string(),
            display_name: "Again".to_string(),
            ..NewAccount::default()
        })
        .expect_err("duplicate email should fail");
    assert!(matches!(err, AppError::Conflict(_)));

    app.act_as(Some(SELLER));
    assert_eq!(app.whoami().expect("whoami").display_name, "Ayse");
}

#[test]
fn corporate_registration_needs_company_identity() {
    let app = open_market(None);
    let err = app
        .register(NewAccount {
            email: DEALER.to_string(),
            display_name: "Dealer".to_string(),
            kind: AccountKind::Corporate,
            company_name: Some("Dealer Motors".to_string()),
            ..NewAccount::default()
        })
        .expect_err("missing tax number should fail");
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let err = app
        .register(NewAccount {
            email: SELLER.to_string(),
            display_name: "Ayse".to_string(),
            tax_number: Some("123".to_string()),
            ..NewAccount::default()
        })
        .expect_err("individuals cannot carry company fields");
    assert!(matches!(err, AppError::InvalidArgument(_)));

    let dealer = app
        .register(NewAccount {
            email: DEALER.to_string(),
            display_name: "Dealer".to_string(),
            kind: AccountKind::Corporate,
            company_name: Some("Dealer Motors".to_string()),
            tax_number: Some("1234567890".to_string()),
            ..NewAccount::default()
        })
        .expect("corporate account should register");
    assert_eq!(dealer.verification, Verification::Pending);
}

#[test]
fn unknown_or_missing_session_is_rejected() {
    let mut app = open_market(None);
    let err = app.whoami().expect_err("no session");
    assert!(matches!(err, AppError::Forbidden(_)));

    app.act_as(Some("ghost@market.example"));
    let err = app.whoami().expect_err("unknown session");
    assert!(matches!(err, AppError::NotFound { kind: "user", .. }));
}

#[test]
fn promote_bootstraps_only_the_first_admin() {
    let mut app = open_market(None);
    register(&mut app, ADMIN, "Moderator");
    register(&mut app, SELLER, "Ayse");
    register(&mut app, BUYER, "Mehmet");

    app.act_as(Some(ADMIN));
    let admin = app.promote(ADMIN).expect("bootstrap should succeed");
    assert_eq!(admin.role, Role::Admin);

    app.act_as(Some(SELLER));
    let err = app.promote(BUYER).expect_err("members cannot promote");
    assert!(matches!(err, AppError::Forbidden(_)));

    app.act_as(Some(ADMIN));
    let log = app.moderation_log(10).expect("log should load");
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action, "promote");
    assert_eq!(log[0].note.as_deref(), Some("bootstrap"));
}

#[test]
fn verification_round_trip_and_identity_change_resets_it() {
    let mut app = seeded_market(None);
    app.register(NewAccount {
        email: DEALER.to_string(),
        display_name: "Dealer".to_string(),
        kind: AccountKind::Corporate,
        company_name: Some("Dealer Motors".to_string()),
        tax_number: Some("1234567890".to_string()),
        ..NewAccount::default()
    })
    .expect("dealer should register");

    app.act_as(Some(DEALER));
    let err = app
        .create_listing(car("vehicles/automobile/bmw", "Dealer BMW", 1_000_000))
        .expect_err("unverified dealers cannot publish");
    assert!(matches!(err, AppError::Forbidden(_)));

    app.act_as(Some(ADMIN));
    let rejected = app
        .reject_verification(DEALER, "tax document unreadable")
        .expect("reject should succeed");
    assert_eq!(rejected.verification, Verification::Rejected);

    app.act_as(Some(DEALER));
    let pending = app
        .request_verification(Some("sent a new scan"))
        .expect("re-request should succeed");
    assert_eq!(pending.verification, Verification::Pending);

    app.act_as(Some(ADMIN));
    let verified = app.approve_verification(DEALER).expect("approve");
    assert_eq!(verified.verification, Verification::Verified);

    app.act_as(Some(DEALER));
    app.create_listing(car("vehicles/automobile/bmw", "Dealer BMW", 1_000_000))
        .expect("verified dealers can publish");

    let unchanged = app
        .update_profile(ProfilePatch {
            phone: Some("+90 555 000 0000".to_string()),
            ..ProfilePatch::default()
        })
        .expect("contact change should succeed");
    assert_eq!(unchanged.verification, Verification::Verified);

    let changed = app
        .update_profile(ProfilePatch {
            tax_number: Some("0987654321".to_string()),
            ..ProfilePatch::default()
        })
        .expect("identity change should succeed");
    assert_eq!(changed.verification, Verification::Pending);
}

#[test]
fn verification_cannot_skip_review() {
    let mut app = seeded_market(None);
    app.act_as(Some(ADMIN));
    let err = app
        .approve_verification(SELLER)
        .expect_err("unverified members must request first");
    assert!(matches!(err, AppError::InvalidVerification(_)));
}

#[test]
fn banned_members_can_read_but_not_write() {
    let mut app = seeded_market(None);
    app.act_as(Some(ADMIN));
    let banned = app.ban(SELLER, Some("spam")).expect("ban should succeed");
    assert!(banned.banned);
    assert!(matches!(
        app.ban(ADMIN, None).expect_err("self-ban"),
        AppError::Conflict(_)
    ));

    app.act_as(Some(SELLER));
    assert!(app.whoami().expect("reads still work").banned);
    let err = app
        .create_listing(car("vehicles/automobile/bmw", "Spam", 1))
        .expect_err("banned members cannot create listings");
    assert!(matches!(err, AppError::Forbidden(_)));

    app.act_as(Some(ADMIN));
    app.unban(SELLER).expect("unban should succeed");
    app.act_as(Some(SELLER));
    app.create_listing(car("vehicles/automobile/bmw", "Back again", 1))
        .expect("unbanned members can write again");
}

#[test]
fn category_tree_paths_and_breadcrumbs() {
    let app = seeded_market(None);
    let tree = app.category_tree(None).expect("tree should load");
    assert_eq!(tree.len(), 1);
    assert_eq!(tree[0].slug, "vehicles");
    let automobile = &tree[0].children[0];
    assert_eq!(automobile.path, "vehicles/automobile");

    let crumbs = app
        .breadcrumb("vehicles/automobile/bmw/3-series/320i")
        .expect("breadcrumb should resolve");
    let names = crumbs.iter().map(|c| c.name.as_str()).collect::<Vec<_>>();
    assert_eq!(names, vec!["Vehicles", "Automobile", "BMW", "3 Series", "320i"]);

    let descendants = app
        .descendants("vehicles/automobile/bmw")
        .expect("descendants should resolve");
    assert_eq!(descendants.len(), 3);

    let err = app
        .show_category("vehicles/boats")
        .expect_err("missing path");
    assert!(matches!(err, AppError::NotFound { kind: "category", .. }));
}

#[test]
fn category_admin_operations_enforce_structure() {
    let mut app = seeded_market(None);
    app.act_as(Some(SELLER));
    assert!(matches!(
        app.add_category(None, "Boats").expect_err("members cannot edit the tree"),
        AppError::Forbidden(_)
    ));

    app.act_as(Some(ADMIN));
    assert!(matches!(
        app.add_category(Some("vehicles"), "automobile")
            .expect_err("sibling slug clash"),
        AppError::Conflict(_)
    ));
    assert!(matches!(
        app.move_category("vehicles/automobile", Some("vehicles/automobile/bmw"))
            .expect_err("cannot move under own descendant"),
        AppError::Conflict(_)
    ));

    let moved = app
        .move_category("vehicles/automobile/volkswagen", Some("vehicles/motorcycle"))
        .expect("move should succeed");
    assert_eq!(moved.path, "vehicles/motorcycle/volkswagen");

    let renamed = app
        .rename_category("vehicles/motorcycle/volkswagen", "VW")
        .expect("rename should succeed");
    assert_eq!(renamed.path, "vehicles/motorcycle/vw");

    assert!(matches!(
        app.remove_category("vehicles/motorcycle/vw")
            .expect_err("has children"),
        AppError::Conflict(_)
    ));
    let removed = app
        .remove_category("vehicles/motorcycle/vw/passat")
        .expect("leaf should be removable");
    assert_eq!(removed.path, "vehicles/motorcycle/vw/passat");
}

#[test]
fn non_empty_category_cannot_be_removed() {
    let mut app = seeded_market(None);
    publish(
        &mut app,
        SELLER,
        car("vehicles/automobile/volkswagen/passat", "Passat", 900_000),
    );
    app.act_as(Some(ADMIN));
    let err = app
        .remove_category("vehicles/automobile/volkswagen/passat")
        .expect_err("category holds a listing");
    assert!(matches!(err, AppError::Conflict(_)));
}

#[test]
fn vehicle_lookup_walks_names_below_the_vehicle_root() {
    let app = seeded_market(None);
    let view = app
        .vehicle_lookup("bmw", Some("3 Series"), Some("320i"))
        .expect("lookup should resolve");
    assert_eq!(view.path, "vehicles/automobile/bmw/3-series/320i");

    let err = app
        .vehicle_lookup("BMW", Some("X5"), None)
        .expect_err("unknown model");
    assert!(matches!(err, AppError::NotFound { kind: "model", .. }));

    let err = app
        .vehicle_lookup("BMW", None, Some("320i"))
        .expect_err("submodel without model");
    assert!(matches!(err, AppError::InvalidArgument(_)));
}

#[test]
fn import_merges_with_existing_nodes() {
    let mut app = seeded_market(None);
    let dir = std::env::temp_dir().join(format!("carmart-import-{}", Uuid::now_v7()));
    std::fs::create_dir_all(&dir).expect("temp dir");
    let file = dir.join("brands.json");
    std::fs::write(
        &file,
        r#"[
            {"name": "BMW", "children": [{"name": "5 Series"}]},
            {"name": "Renault", "children": [{"name": "Clio"}, {"name": "Megane"}]}
        ]"#,
    )
    .expect("seed file should be writable");

    app.act_as(Some(ADMIN));
    let summary = app
        .import_categories(&file, Some("vehicles/automobile"))
        .expect("import should succeed");
    assert_eq!(summary.reused, 1);
    assert_eq!(summary.created, 4);
    app.show_category("vehicles/automobile/renault/megane")
        .expect("imported node should resolve");

    let again = app
        .import_categories(&file, Some("vehicles/automobile"))
        .expect("re-import should succeed");
    assert_eq!(again.created, 0);
    assert_eq!(again.reused, 5);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn facets_count_active_listings_per_child() {
    let mut app = seeded_market(None);
    publish(
        &mut app,
        SELLER,
        car("vehicles/automobile/bmw/3-series/320i", "320i", 1_500_000),
    );
    publish(
        &mut app,
        SELLER,
        car("vehicles/automobile/volkswagen/passat", "Passat", 900_000),
    );
    publish(
        &mut app,
        SELLER,
        car("vehicles/automobile/volkswagen", "VW without model", 500_000),
    );
    app.act_as(Some(SELLER));
    app.create_listing(car("vehicles/automobile/bmw", "Still pending", 1))
        .expect("pending listing");

    let facets = app
        .facets(Some("vehicles/automobile"))
        .expect("facets should load");
    let counts = facets
        .iter()
        .map(|facet| (facet.name.as_str(), facet.active_listings))
        .collect::<Vec<_>>();
    assert_eq!(counts, vec![("BMW", 1), ("Volkswagen", 2)]);
}
