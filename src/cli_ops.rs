use std::path::PathBuf;

use clap::{Args, Subcommand};
use time::OffsetDateTime;

use crate::app::{ListingPatch, NewAccount, NewListing, ProfilePatch};
use crate::cards::CardFormat;
use crate::clock::parse_ts;
use crate::domain::account::AccountKind;
use crate::domain::doping::DopingTier;
use crate::domain::status::ListingStatus;
use crate::domain::vehicle::{parse_damage_entry, DamageEntry, Fuel, Gearbox, VehicleSpec};
use crate::listing_query::{ListingFilter, SortOrder};

fn parse_instant(raw: &str) -> Result<OffsetDateTime, String> {
    parse_ts(raw).ok_or_else(|| format!("'{raw}' is not an RFC 3339 timestamp"))
}

#[derive(Debug, Args)]
pub struct OutputArgs {
    #[arg(long, help = "Print JSON instead of text.")]
    pub json: bool,
}

// ------------------------------------------------------------- account

#[derive(Debug, Args)]
#[command(about = "Account commands.")]
pub struct AccountArgs {
    #[command(subcommand)]
    pub command: AccountSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum AccountSubcommands {
    #[command(about = "Register a new individual or corporate account.")]
    Register(RegisterArgs),
    #[command(about = "Show the session account.")]
    Whoami(OutputArgs),
    #[command(about = "Update the session account's profile.")]
    Update(ProfileArgs),
    #[command(about = "Ask for identity verification.")]
    Verify(VerifyRequestArgs),
    #[command(about = "Grant the admin role (bootstraps the first admin).")]
    Promote(EmailArgs),
}

#[derive(Debug, Args)]
pub struct RegisterArgs {
    #[arg(long, help = "Login email; stored lowercased.")]
    pub email: String,
    #[arg(long, help = "Display name shown to buyers.")]
    pub name: String,
    #[arg(long, default_value = "individual", help = "individual or corporate.")]
    pub kind: AccountKind,
    #[arg(long, help = "Company name (corporate accounts).")]
    pub company: Option<String>,
    #[arg(long, help = "Tax number (corporate accounts).")]
    pub tax_number: Option<String>,
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[command(flatten)]
    pub output: OutputArgs,
}

impl RegisterArgs {
    pub fn to_account(&self) -> NewAccount {
        NewAccount {
            email: self.email.clone(),
            display_name: self.name.clone(),
            kind: self.kind,
            company_name: self.company.clone(),
            tax_number: self.tax_number.clone(),
            phone: self.phone.clone(),
            city: self.city.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct ProfileArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long, help = "Phone number; empty string clears it.")]
    pub phone: Option<String>,
    #[arg(long, help = "City; empty string clears it.")]
    pub city: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
    #[arg(long)]
    pub tax_number: Option<String>,
    #[command(flatten)]
    pub output: OutputArgs,
}

impl ProfileArgs {
    pub fn to_patch(&self) -> ProfilePatch {
        ProfilePatch {
            display_name: self.name.clone(),
            phone: self.phone.clone(),
            city: self.city.clone(),
            company_name: self.company.clone(),
            tax_number: self.tax_number.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct VerifyRequestArgs {
    #[arg(long, help = "Context for the reviewer, e.g. where documents were sent.")]
    pub note: Option<String>,
}

#[derive(Debug, Args)]
pub struct EmailArgs {
    #[arg(help = "Account email.")]
    pub email: String,
}

// ------------------------------------------------------------ category

#[derive(Debug, Args)]
#[command(about = "Category commands.")]
pub struct CategoryArgs {
    #[command(subcommand)]
    pub command: CategorySubcommands,
}

#[derive(Debug, Subcommand)]
pub enum CategorySubcommands {
    #[command(about = "Add a category (admin).")]
    Add(CategoryAddArgs),
    #[command(about = "Print the category tree.")]
    Tree(CategoryTreeArgs),
    #[command(about = "Show one category and its breadcrumb.")]
    Show(CategoryPathArgs),
    #[command(about = "Ids of a category and everything below it.")]
    Descendants(CategoryPathArgs),
    #[command(about = "Move a category under another parent (admin).")]
    Move(CategoryMoveArgs),
    #[command(about = "Rename a category (admin).")]
    Rename(CategoryRenameArgs),
    #[command(about = "Remove an empty leaf category (admin).")]
    Remove(CategoryPathArgs),
    #[command(about = "Active listing counts per child category.")]
    Facets(CategoryTreeArgs),
    #[command(about = "Resolve brand/model/submodel names to a category.")]
    Lookup(CategoryLookupArgs),
    #[command(about = "Merge a JSON category document into the tree (admin).")]
    Import(CategoryImportArgs),
}

#[derive(Debug, Args)]
pub struct CategoryAddArgs {
    #[arg(help = "Display name; the slug is derived from it.")]
    pub name: String,
    #[arg(long, help = "Parent path such as vehicles/automobile.")]
    pub parent: Option<String>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct CategoryTreeArgs {
    #[arg(help = "Start path; the roots when omitted.")]
    pub path: Option<String>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct CategoryPathArgs {
    #[arg(help = "Category path, e.g. vehicles/automobile/bmw.")]
    pub path: String,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct CategoryMoveArgs {
    pub path: String,
    #[arg(long, conflicts_with = "root", help = "New parent path.")]
    pub to: Option<String>,
    #[arg(long, help = "Make the category a root.")]
    pub root: bool,
}

#[derive(Debug, Args)]
pub struct CategoryRenameArgs {
    pub path: String,
    pub name: String,
}

#[derive(Debug, Args)]
pub struct CategoryLookupArgs {
    pub brand: String,
    pub model: Option<String>,
    pub submodel: Option<String>,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct CategoryImportArgs {
    #[arg(help = "JSON file with {name, children} nodes (one object or an array).")]
    pub file: PathBuf,
    #[arg(long, help = "Import below this path instead of at the root.")]
    pub under: Option<String>,
}

// ------------------------------------------------------------- listing

#[derive(Debug, Args)]
#[command(about = "Listing commands.")]
pub struct ListingArgs {
    #[command(subcommand)]
    pub command: ListingSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ListingSubcommands {
    #[command(about = "Create a listing.")]
    Create(ListingCreateArgs),
    #[command(about = "Edit a listing you own.")]
    Edit(ListingEditArgs),
    #[command(about = "Show a listing by id or number.")]
    Show(ListingRefOutputArgs),
    #[command(about = "List your own listings.")]
    Mine(ListingMineArgs),
    #[command(about = "List a listing's images.")]
    Images(ListingRefOutputArgs),
    #[command(about = "Attach image urls.")]
    ImageAdd(ImageAddArgs),
    #[command(about = "Detach an image.")]
    ImageRemove(ImageRefArgs),
    #[command(about = "Move an image; position 0 is the cover.")]
    ImageMove(ImageMoveArgs),
    #[command(about = "Mark an active listing as sold.")]
    Sold(ListingRefArgs),
    #[command(about = "Send an expired listing back for publication.")]
    Renew(ListingRefArgs),
    #[command(about = "Soft-delete a listing.")]
    Delete(ListingDeleteArgs),
}

#[derive(Debug, Args)]
pub struct VehicleOpts {
    #[arg(long, help = "Model year.")]
    pub year: Option<i64>,
    #[arg(long, help = "Odometer reading.")]
    pub km: Option<i64>,
    #[arg(long)]
    pub fuel: Option<Fuel>,
    #[arg(long)]
    pub gearbox: Option<Gearbox>,
    #[arg(long = "body")]
    pub body_type: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub engine_cc: Option<i64>,
    #[arg(long = "hp")]
    pub horsepower: Option<i64>,
}

impl VehicleOpts {
    pub fn to_spec(&self) -> VehicleSpec {
        VehicleSpec {
            year: self.year,
            km: self.km,
            fuel: self.fuel,
            gearbox: self.gearbox,
            body_type: self.body_type.clone(),
            color: self.color.clone(),
            engine_cc: self.engine_cc,
            horsepower: self.horsepower,
        }
    }
}

#[derive(Debug, Args)]
pub struct ListingCreateArgs {
    #[arg(long, help = "Category path.")]
    pub category: String,
    #[arg(long)]
    pub title: String,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: i64,
    #[arg(long, help = "Three-letter code; listing.currency when omitted.")]
    pub currency: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[command(flatten)]
    pub vehicle: VehicleOpts,
    #[arg(long = "equipment", help = "Repeatable equipment item.")]
    pub equipment: Vec<String>,
    #[arg(long = "damage", value_parser = parse_damage_entry, help = "Repeatable part=kind entry.")]
    pub damage: Vec<DamageEntry>,
    #[arg(long = "image", help = "Repeatable image url; the first is the cover.")]
    pub images: Vec<String>,
    #[command(flatten)]
    pub output: OutputArgs,
}

impl ListingCreateArgs {
    pub fn to_listing(&self) -> NewListing {
        NewListing {
            category: self.category.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price,
            currency: self.currency.clone(),
            city: self.city.clone(),
            vehicle: self.vehicle.to_spec(),
            equipment: self.equipment.clone(),
            damage: self.damage.clone(),
            images: self.images.clone(),
        }
    }
}

#[derive(Debug, Args)]
pub struct ListingEditArgs {
    #[arg(help = "Listing id or number.")]
    pub listing: String,
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long, help = "Description; empty string clears it.")]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Option<i64>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub category: Option<String>,
    #[command(flatten)]
    pub vehicle: VehicleOpts,
    #[arg(long = "equipment", help = "Replaces the equipment list.")]
    pub equipment: Vec<String>,
    #[arg(long, help = "Clear the equipment list.")]
    pub clear_equipment: bool,
    #[arg(long = "damage", value_parser = parse_damage_entry, help = "Replaces the damage report.")]
    pub damage: Vec<DamageEntry>,
    #[arg(long, help = "Clear the damage report.")]
    pub clear_damage: bool,
    #[command(flatten)]
    pub output: OutputArgs,
}

impl ListingEditArgs {
    pub fn to_patch(&self) -> ListingPatch {
        let replace = |values: &Vec<String>, clear: bool| {
            if clear {
                Some(Vec::new())
            } else if values.is_empty() {
                None
            } else {
                Some(values.clone())
            }
        };
        let damage = if self.clear_damage {
            Some(Vec::new())
        } else if self.damage.is_empty() {
            None
        } else {
            Some(self.damage.clone())
        };
        ListingPatch {
            title: self.title.clone(),
            description: self.description.clone(),
            price: self.price,
            city: self.city.clone(),
            category: self.category.clone(),
            vehicle: self.vehicle.to_spec(),
            equipment: replace(&self.equipment, self.clear_equipment),
            damage,
        }
    }
}

#[derive(Debug, Args)]
pub struct ListingRefArgs {
    #[arg(help = "Listing id or number.")]
    pub listing: String,
}

#[derive(Debug, Args)]
pub struct ListingRefOutputArgs {
    #[arg(help = "Listing id or number.")]
    pub listing: String,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct ListingMineArgs {
    #[arg(long)]
    pub status: Option<ListingStatus>,
    #[command(flatten)]
    pub page: PageOpts,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct ListingDeleteArgs {
    #[arg(help = "Listing id or number.")]
    pub listing: String,
    #[arg(long)]
    pub reason: Option<String>,
}

#[derive(Debug, Args)]
pub struct ImageAddArgs {
    pub listing: String,
    #[arg(required = true, num_args = 1..)]
    pub urls: Vec<String>,
}

#[derive(Debug, Args)]
pub struct ImageRefArgs {
    pub listing: String,
    pub image: String,
}

#[derive(Debug, Args)]
pub struct ImageMoveArgs {
    pub listing: String,
    pub image: String,
    pub position: usize,
}

// -------------------------------------------------------------- search

#[derive(Debug, Args)]
pub struct FilterOpts {
    #[arg(long, help = "Category path; matches the whole subtree.")]
    pub category: Option<String>,
    #[arg(long)]
    pub brand: Option<String>,
    #[arg(long)]
    pub model: Option<String>,
    #[arg(long)]
    pub submodel: Option<String>,
    #[arg(long)]
    pub price_min: Option<i64>,
    #[arg(long)]
    pub price_max: Option<i64>,
    #[arg(long)]
    pub year_min: Option<i64>,
    #[arg(long)]
    pub year_max: Option<i64>,
    #[arg(long)]
    pub km_min: Option<i64>,
    #[arg(long)]
    pub km_max: Option<i64>,
    #[arg(long)]
    pub fuel: Option<Fuel>,
    #[arg(long)]
    pub gearbox: Option<Gearbox>,
    #[arg(long = "body")]
    pub body_type: Option<String>,
    #[arg(long)]
    pub color: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long = "seller")]
    pub seller_kind: Option<AccountKind>,
    #[arg(long, help = "Only listings with at least one image.")]
    pub with_images: bool,
    #[arg(long, help = "Minimum active doping tier.")]
    pub featured: Option<DopingTier>,
    #[arg(short = 'q', long, help = "Free text; every term must match.")]
    pub query: Option<String>,
    #[arg(long, help = "Listing status (admins only).")]
    pub status: Option<ListingStatus>,
    #[arg(long, help = "Only your own listings.")]
    pub mine: bool,
    #[arg(long, default_value = "newest")]
    pub sort: SortOrder,
}

impl FilterOpts {
    pub fn to_filter(&self) -> ListingFilter {
        ListingFilter {
            category: self.category.clone(),
            brand: self.brand.clone(),
            model: self.model.clone(),
            submodel: self.submodel.clone(),
            price_min: self.price_min,
            price_max: self.price_max,
            year_min: self.year_min,
            year_max: self.year_max,
            km_min: self.km_min,
            km_max: self.km_max,
            fuel: self.fuel,
            gearbox: self.gearbox,
            body_type: self.body_type.clone(),
            color: self.color.clone(),
            city: self.city.clone(),
            seller_kind: self.seller_kind,
            with_images: self.with_images,
            featured: self.featured,
            query: self.query.clone(),
            status: self.status,
            mine: self.mine,
            sort: self.sort,
        }
    }
}

#[derive(Debug, Args)]
pub struct PageOpts {
    #[arg(long, help = "1-based page number.")]
    pub page: Option<u32>,
    #[arg(long, help = "Page size, clamped to search.max_page_size.")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Args)]
#[command(about = "Search listings.")]
pub struct SearchArgs {
    #[command(flatten)]
    pub filter: FilterOpts,
    #[arg(long, default_value = "grid")]
    pub format: CardFormat,
    #[command(flatten)]
    pub page: PageOpts,
    #[command(flatten)]
    pub output: OutputArgs,
}

// -------------------------------------------------------------- doping

#[derive(Debug, Args)]
#[command(about = "Doping commands.")]
pub struct DopingArgs {
    #[command(subcommand)]
    pub command: DopingSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum DopingSubcommands {
    #[command(about = "Request a doping package for a listing.")]
    Request(DopingRequestArgs),
    #[command(about = "Withdraw a pending doping request.")]
    Cancel(DopingCancelArgs),
    #[command(about = "List a listing's dopings.")]
    List(ListingRefOutputArgs),
}

#[derive(Debug, Args)]
pub struct DopingRequestArgs {
    pub listing: String,
    #[arg(help = "urgent, premium or gold.")]
    pub tier: DopingTier,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct DopingCancelArgs {
    pub doping: String,
    #[arg(long)]
    pub note: Option<String>,
}

// --------------------------------------------------------------- admin

#[derive(Debug, Args)]
#[command(about = "Admin commands.")]
pub struct AdminArgs {
    #[command(subcommand)]
    pub command: AdminSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum AdminSubcommands {
    #[command(about = "Pending listings, dopings and verifications.")]
    Queue(OutputArgs),
    #[command(about = "Marketplace counters.")]
    Stats(OutputArgs),
    #[command(about = "Recent moderation actions.")]
    Log(AdminLogArgs),
    #[command(about = "Publish a pending listing.")]
    Approve(ListingRefArgs),
    #[command(about = "Reject a pending listing or take down an active one.")]
    Reject(AdminRejectArgs),
    #[command(about = "Soft-delete any listing.")]
    Delete(ListingDeleteArgs),
    #[command(about = "Undo a soft delete.")]
    Restore(ListingRefArgs),
    #[command(about = "Start a paid doping.")]
    DopingApprove(DopingRefArgs),
    #[command(about = "Reject a doping request.")]
    DopingReject(DopingRejectArgs),
    #[command(about = "Mark an account verified.")]
    VerifyApprove(EmailArgs),
    #[command(about = "Reject an account verification.")]
    VerifyReject(VerifyRejectArgs),
    #[command(about = "Ban an account from writing.")]
    Ban(BanArgs),
    #[command(about = "Lift a ban.")]
    Unban(EmailArgs),
    #[command(about = "Expire finished dopings and listings.")]
    Sweep(SweepArgs),
}

#[derive(Debug, Args)]
pub struct AdminLogArgs {
    #[arg(long, default_value_t = 50)]
    pub limit: u32,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct AdminRejectArgs {
    pub listing: String,
    #[arg(long)]
    pub reason: String,
}

#[derive(Debug, Args)]
pub struct DopingRefArgs {
    pub doping: String,
}

#[derive(Debug, Args)]
pub struct DopingRejectArgs {
    pub doping: String,
    #[arg(long)]
    pub note: String,
}

#[derive(Debug, Args)]
pub struct VerifyRejectArgs {
    pub email: String,
    #[arg(long)]
    pub note: String,
}

#[derive(Debug, Args)]
pub struct BanArgs {
    pub email: String,
    #[arg(long)]
    pub reason: Option<String>,
}

#[derive(Debug, Args)]
pub struct SweepArgs {
    #[arg(long, value_parser = parse_instant, help = "Sweep as of this RFC 3339 instant.")]
    pub at: Option<OffsetDateTime>,
    #[command(flatten)]
    pub output: OutputArgs,
}

// ------------------------------------------------------ member actions

#[derive(Debug, Args)]
#[command(about = "Favorite commands.")]
pub struct FavoriteArgs {
    #[command(subcommand)]
    pub command: FavoriteSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum FavoriteSubcommands {
    #[command(about = "Add or remove a listing from favorites.")]
    Toggle(ListingRefArgs),
    #[command(about = "List favorite listings.")]
    List(CardListArgs),
}

#[derive(Debug, Args)]
pub struct CardListArgs {
    #[arg(long, default_value = "grid")]
    pub format: CardFormat,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
#[command(about = "Saved filter commands.")]
pub struct FilterArgs {
    #[command(subcommand)]
    pub command: FilterSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum FilterSubcommands {
    #[command(about = "Save a search filter.")]
    Save(FilterSaveArgs),
    #[command(about = "List saved filters.")]
    List(OutputArgs),
    #[command(about = "Delete a saved filter.")]
    Delete(SavedFilterRefArgs),
    #[command(about = "Run a saved filter.")]
    Run(FilterRunArgs),
}

#[derive(Debug, Args)]
pub struct FilterSaveArgs {
    #[arg(long)]
    pub name: Option<String>,
    #[command(flatten)]
    pub filter: FilterOpts,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
pub struct SavedFilterRefArgs {
    pub id: String,
}

#[derive(Debug, Args)]
pub struct FilterRunArgs {
    pub id: String,
    #[arg(long, default_value = "grid")]
    pub format: CardFormat,
    #[command(flatten)]
    pub page: PageOpts,
    #[command(flatten)]
    pub output: OutputArgs,
}

#[derive(Debug, Args)]
#[command(about = "Chat commands.")]
pub struct ChatArgs {
    #[command(subcommand)]
    pub command: ChatSubcommands,
}

#[derive(Debug, Subcommand)]
pub enum ChatSubcommands {
    #[command(about = "Message the seller of a listing.")]
    Send(ChatSendArgs),
    #[command(about = "Reply in a conversation.")]
    Reply(ChatReplyArgs),
    #[command(about = "List your conversations.")]
    Inbox(OutputArgs),
    #[command(about = "Read a conversation and mark it read.")]
    Read(ConversationRefArgs),
}

#[derive(Debug, Args)]
pub struct ChatSendArgs {
    pub listing: String,
    pub body: String,
}

#[derive(Debug, Args)]
pub struct ChatReplyArgs {
    pub conversation: String,
    pub body: String,
}

#[derive(Debug, Args)]
pub struct ConversationRefArgs {
    pub conversation: String,
    #[command(flatten)]
    pub output: OutputArgs,
}
