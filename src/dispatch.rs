use serde::Serialize;

use crate::app::{App, AppError};
use crate::cards::CardFormat;
use crate::cli::{
    AccountArgs, AccountSubcommands, AdminArgs, AdminSubcommands, CategoryArgs,
    CategorySubcommands, ChatArgs, ChatSubcommands, Commands, DopingArgs, DopingSubcommands,
    FavoriteArgs, FavoriteSubcommands, FilterArgs, FilterSubcommands, ListingArgs,
    ListingSubcommands, SearchArgs,
};
use crate::listing_query::ListingFilter;
use crate::ui;

pub fn print_json(value: &impl Serialize) -> Result<(), AppError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints `value` as JSON when asked, otherwise through `text`.
fn emit<T: Serialize>(json: bool, value: &T, text: impl FnOnce(&T)) -> Result<(), AppError> {
    if json {
        print_json(value)
    } else {
        text(value);
        Ok(())
    }
}

pub fn run_command(app: &App, command: Commands) -> Result<(), AppError> {
    match command {
        Commands::Account(args) => run_account(app, args),
        Commands::Category(args) => run_category(app, args),
        Commands::Listing(args) => run_listing(app, args),
        Commands::Search(args) => run_search(app, args),
        Commands::Doping(args) => run_doping(app, args),
        Commands::Admin(args) => run_admin(app, args),
        Commands::Favorite(args) => run_favorite(app, args),
        Commands::Filter(args) => run_filter(app, args),
        Commands::Chat(args) => run_chat(app, args),
        Commands::Config | Commands::Completions(_) => Err(AppError::InvalidArgument(
            "command runs without a database".to_string(),
        )),
    }
}

fn run_account(app: &App, args: AccountArgs) -> Result<(), AppError> {
    match args.command {
        AccountSubcommands::Register(args) => {
            let user = app.register(args.to_account())?;
            emit(args.output.json, &user, |user| {
                println!("registered {} ({})", user.email, user.id);
            })
        }
        AccountSubcommands::Whoami(output) => emit(output.json, &app.whoami()?, ui::print_user),
        AccountSubcommands::Update(args) => {
            let user = app.update_profile(args.to_patch())?;
            emit(args.output.json, &user, ui::print_user)
        }
        AccountSubcommands::Verify(args) => {
            let user = app.request_verification(args.note.as_deref())?;
            println!("verification for {} is {}", user.email, user.verification);
            Ok(())
        }
        AccountSubcommands::Promote(args) => {
            let user = app.promote(&args.email)?;
            println!("{} is now {}", user.email, user.role);
            Ok(())
        }
    }
}

fn run_category(app: &App, args: CategoryArgs) -> Result<(), AppError> {
    match args.command {
        CategorySubcommands::Add(args) => {
            let view = app.add_category(args.parent.as_deref(), &args.name)?;
            emit(args.output.json, &view, |view| {
                println!("added category {} ({})", view.path, view.id);
            })
        }
        CategorySubcommands::Tree(args) => {
            let tree = app.category_tree(args.path.as_deref())?;
            emit(args.output.json, &tree, |tree| ui::print_category_tree(tree))
        }
        CategorySubcommands::Show(args) => {
            let view = app.show_category(&args.path)?;
            let breadcrumb = app.breadcrumb(&args.path)?;
            if args.output.json {
                return print_json(&serde_json::json!({
                    "category": view,
                    "breadcrumb": breadcrumb,
                }));
            }
            ui::print_category(&view, &breadcrumb);
            Ok(())
        }
        CategorySubcommands::Descendants(args) => {
            let ids = app.descendants(&args.path)?;
            emit(args.output.json, &ids, |ids| {
                for id in ids {
                    println!("{id}");
                }
            })
        }
        CategorySubcommands::Move(args) => {
            if args.to.is_none() && !args.root {
                return Err(AppError::InvalidArgument(
                    "category move needs --to <path> or --root".to_string(),
                ));
            }
            let view = app.move_category(&args.path, args.to.as_deref())?;
            println!("moved category to {}", view.path);
            Ok(())
        }
        CategorySubcommands::Rename(args) => {
            let view = app.rename_category(&args.path, &args.name)?;
            println!("renamed category to {} ({})", view.name, view.path);
            Ok(())
        }
        CategorySubcommands::Remove(args) => {
            let removed = app.remove_category(&args.path)?;
            emit(args.output.json, &removed, |removed| {
                println!("removed category {} ({})", removed.path, removed.id);
            })
        }
        CategorySubcommands::Facets(args) => {
            let facets = app.facets(args.path.as_deref())?;
            emit(args.output.json, &facets, |facets| ui::print_facets(facets))
        }
        CategorySubcommands::Lookup(args) => {
            let view = app.vehicle_lookup(
                &args.brand,
                args.model.as_deref(),
                args.submodel.as_deref(),
            )?;
            emit(args.output.json, &view, |view| {
                println!("{} {}", view.id, view.path);
            })
        }
        CategorySubcommands::Import(args) => {
            let summary = app.import_categories(&args.file, args.under.as_deref())?;
            println!(
                "imported categories: {} created, {} already present",
                summary.created, summary.reused
            );
            Ok(())
        }
    }
}

fn run_listing(app: &App, args: ListingArgs) -> Result<(), AppError> {
    match args.command {
        ListingSubcommands::Create(args) => {
            let detail = app.create_listing(args.to_listing())?;
            emit(args.output.json, &detail, |detail| {
                println!(
                    "created listing {} ({}) {}",
                    detail.listing.number, detail.listing.id, detail.listing.status
                );
            })
        }
        ListingSubcommands::Edit(args) => {
            let detail = app.edit_listing(&args.listing, args.to_patch())?;
            emit(args.output.json, &detail, |detail| {
                println!(
                    "updated listing {} {}",
                    detail.listing.number, detail.listing.status
                );
            })
        }
        ListingSubcommands::Show(args) => {
            emit(args.output.json, &app.show_listing(&args.listing)?, ui::print_detail)
        }
        ListingSubcommands::Mine(args) => {
            let filter = ListingFilter {
                mine: true,
                status: args.status,
                ..ListingFilter::default()
            };
            let page = app.search_cards(&filter, CardFormat::Row, args.page.page, args.page.per_page)?;
            emit(args.output.json, &page, ui::print_card_page)
        }
        ListingSubcommands::Images(args) => {
            let images = app.listing_images(&args.listing)?;
            emit(args.output.json, &images, |images| ui::print_images(images))
        }
        ListingSubcommands::ImageAdd(args) => {
            ui::print_images(&app.add_images(&args.listing, &args.urls)?);
            Ok(())
        }
        ListingSubcommands::ImageRemove(args) => {
            ui::print_images(&app.remove_image(&args.listing, &args.image)?);
            Ok(())
        }
        ListingSubcommands::ImageMove(args) => {
            ui::print_images(&app.move_image(&args.listing, &args.image, args.position)?);
            Ok(())
        }
        ListingSubcommands::Sold(args) => {
            ui::print_listing(&app.mark_sold(&args.listing)?);
            Ok(())
        }
        ListingSubcommands::Renew(args) => {
            ui::print_listing(&app.renew_listing(&args.listing)?);
            Ok(())
        }
        ListingSubcommands::Delete(args) => {
            ui::print_listing(&app.delete_listing(&args.listing, args.reason.as_deref())?);
            Ok(())
        }
    }
}

fn run_search(app: &App, args: SearchArgs) -> Result<(), AppError> {
    let filter = args.filter.to_filter();
    let page = app.search_cards(&filter, args.format, args.page.page, args.page.per_page)?;
    if !args.output.json {
        if let Some(summary) = filter.normalized().summary() {
            println!("filters: {summary}");
        }
    }
    emit(args.output.json, &page, ui::print_card_page)
}

fn run_doping(app: &App, args: DopingArgs) -> Result<(), AppError> {
    match args.command {
        DopingSubcommands::Request(args) => {
            let doping = app.request_doping(&args.listing, args.tier)?;
            emit(args.output.json, &doping, |doping| {
                println!(
                    "requested {} doping {} for {}",
                    doping.tier, doping.id, doping.price_label
                );
            })
        }
        DopingSubcommands::Cancel(args) => {
            let doping = app.cancel_doping(&args.doping, args.note.as_deref())?;
            println!("doping {} is {}", doping.id, doping.status);
            Ok(())
        }
        DopingSubcommands::List(args) => {
            let dopings = app.list_dopings(&args.listing)?;
            emit(args.output.json, &dopings, |dopings| ui::print_dopings(dopings))
        }
    }
}

fn run_admin(app: &App, args: AdminArgs) -> Result<(), AppError> {
    match args.command {
        AdminSubcommands::Queue(output) => {
            emit(output.json, &app.moderation_queue()?, ui::print_queue)
        }
        AdminSubcommands::Stats(output) => {
            emit(output.json, &app.moderation_stats()?, ui::print_stats)
        }
        AdminSubcommands::Log(args) => {
            let entries = app.moderation_log(args.limit)?;
            emit(args.output.json, &entries, |entries| {
                ui::print_moderation_log(entries)
            })
        }
        AdminSubcommands::Approve(args) => {
            ui::print_listing(&app.approve_listing(&args.listing)?);
            Ok(())
        }
        AdminSubcommands::Reject(args) => {
            ui::print_listing(&app.reject_listing(&args.listing, &args.reason)?);
            Ok(())
        }
        AdminSubcommands::Delete(args) => {
            ui::print_listing(&app.delete_listing(&args.listing, args.reason.as_deref())?);
            Ok(())
        }
        AdminSubcommands::Restore(args) => {
            ui::print_listing(&app.restore_listing(&args.listing)?);
            Ok(())
        }
        AdminSubcommands::DopingApprove(args) => {
            let doping = app.approve_doping(&args.doping)?;
            println!(
                "doping {} active until {}",
                doping.id,
                doping.ends_at.as_deref().unwrap_or("-")
            );
            Ok(())
        }
        AdminSubcommands::DopingReject(args) => {
            let doping = app.reject_doping(&args.doping, &args.note)?;
            println!("doping {} is {}", doping.id, doping.status);
            Ok(())
        }
        AdminSubcommands::VerifyApprove(args) => {
            let user = app.approve_verification(&args.email)?;
            println!("{} is {}", user.email, user.verification);
            Ok(())
        }
        AdminSubcommands::VerifyReject(args) => {
            let user = app.reject_verification(&args.email, &args.note)?;
            println!("{} is {}", user.email, user.verification);
            Ok(())
        }
        AdminSubcommands::Ban(args) => {
            let user = app.ban(&args.email, args.reason.as_deref())?;
            println!("banned {}", user.email);
            Ok(())
        }
        AdminSubcommands::Unban(args) => {
            let user = app.unban(&args.email)?;
            println!("unbanned {}", user.email);
            Ok(())
        }
        AdminSubcommands::Sweep(args) => {
            let summary = app.sweep(args.at)?;
            emit(args.output.json, &summary, |summary| {
                println!(
                    "sweep at {}: {} doping(s) and {} listing(s) expired",
                    summary.at, summary.expired_dopings, summary.expired_listings
                );
            })
        }
    }
}

fn run_favorite(app: &App, args: FavoriteArgs) -> Result<(), AppError> {
    match args.command {
        FavoriteSubcommands::Toggle(args) => {
            let toggle = app.toggle_favorite(&args.listing)?;
            if toggle.favorited {
                println!("added {} to favorites", toggle.number);
            } else {
                println!("removed {} from favorites", toggle.number);
            }
            Ok(())
        }
        FavoriteSubcommands::List(args) => {
            let cards = app.list_favorites(args.format)?;
            emit(args.output.json, &cards, ui::print_card_list)
        }
    }
}

fn run_filter(app: &App, args: FilterArgs) -> Result<(), AppError> {
    match args.command {
        FilterSubcommands::Save(args) => {
            let saved = app.save_filter(args.name.as_deref(), &args.filter.to_filter())?;
            emit(args.output.json, &saved, |saved| {
                if saved.created {
                    println!("saved filter {} \"{}\"", saved.id, saved.name);
                } else {
                    println!("filter already saved as {} \"{}\"", saved.id, saved.name);
                }
            })
        }
        FilterSubcommands::List(output) => {
            let filters = app.list_saved_filters()?;
            emit(output.json, &filters, |filters| ui::print_saved_filters(filters))
        }
        FilterSubcommands::Delete(args) => {
            let removed = app.delete_saved_filter(&args.id)?;
            println!("deleted saved filter {}", removed.id);
            Ok(())
        }
        FilterSubcommands::Run(args) => {
            let hits = app.run_saved_filter(&args.id, args.page.page, args.page.per_page)?;
            let page = crate::cards::CardPage::build(args.format, &hits);
            emit(args.output.json, &page, ui::print_card_page)
        }
    }
}

fn run_chat(app: &App, args: ChatArgs) -> Result<(), AppError> {
    match args.command {
        ChatSubcommands::Send(args) => {
            let message = app.send_message(&args.listing, &args.body)?;
            println!("sent {} in {}", message.id, message.conversation_id);
            Ok(())
        }
        ChatSubcommands::Reply(args) => {
            let message = app.reply(&args.conversation, &args.body)?;
            println!("sent {} in {}", message.id, message.conversation_id);
            Ok(())
        }
        ChatSubcommands::Inbox(output) => {
            let inbox = app.inbox()?;
            emit(output.json, &inbox, |inbox| ui::print_inbox(inbox))
        }
        ChatSubcommands::Read(args) => {
            let conversation = app.read_conversation(&args.conversation)?;
            emit(args.output.json, &conversation, ui::print_conversation)
        }
    }
}
