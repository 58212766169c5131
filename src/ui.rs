use std::io::{self, IsTerminal};

use crate::app::{
    ConversationView, InboxEntry, ModerationEntry, ModerationQueue, ModerationStats,
    SavedFilterView, UserView,
};
use crate::cards::{
    CardList, CardPage, DetailView, DopingView, GridCard, ImageView, ListingView, RowCard,
    ShowcaseCard,
};
use crate::catalog::{BreadcrumbEntry, CategoryNode, CategoryView, FacetCount};

pub fn print_card_page(page: &CardPage) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Listings"));
    print_cards(&page.cards, &palette);
    println!(
        "{}",
        palette.dim(&format!(
            "page {}/{} ({} listing(s), {} per page)",
            page.page,
            page.total_pages.max(1),
            page.total,
            page.per_page
        ))
    );
}

pub fn print_card_list(cards: &CardList) {
    let palette = Palette::auto();
    print_cards(cards, &palette);
    println!("{}", palette.dim(&format!("{} listing(s)", cards.len())));
}

fn print_cards(cards: &CardList, palette: &Palette) {
    if cards.is_empty() {
        println!("{}", palette.dim("no listings matched"));
        return;
    }
    match cards {
        CardList::Grid(cards) => cards
            .iter()
            .for_each(|card| println!("{}", format_grid_card(card, palette))),
        CardList::Row(cards) => cards
            .iter()
            .for_each(|card| println!("{}", format_row_card(card, palette))),
        CardList::Showcase(cards) => cards
            .iter()
            .for_each(|card| println!("{}", format_showcase_card(card, palette))),
    }
}

fn format_grid_card(card: &GridCard, palette: &Palette) -> String {
    let mut line = format!(
        "{} {} {}",
        palette.id(&card.number),
        card.title,
        palette.price(&card.price_label)
    );
    let facts = vehicle_facts(card.year, card.km, None);
    if !facts.is_empty() {
        line.push(' ');
        line.push_str(&palette.dim(&facts));
    }
    if let Some(city) = card.city.as_deref() {
        line.push(' ');
        line.push_str(&palette.dim(&format!("@{city}")));
    }
    for badge in &card.badges {
        line.push(' ');
        line.push_str(&palette.badge(badge));
    }
    if card.cover_image.is_none() {
        line.push(' ');
        line.push_str(&palette.dim("(no photo)"));
    }
    line
}

fn format_row_card(card: &RowCard, palette: &Palette) -> String {
    format!(
        "{} {} | {} | {} | {} | {}",
        palette.id(&card.number),
        card.date,
        card.title,
        vehicle_facts(card.year, card.km, card.color.as_deref()),
        card.city.as_deref().unwrap_or("-"),
        palette.price(&card.price_label)
    )
}

fn format_showcase_card(card: &ShowcaseCard, palette: &Palette) -> String {
    format!(
        "{} {} {} {}",
        palette.badge("gold"),
        palette.id(&card.number),
        card.title,
        palette.price(&card.price_label)
    )
}

fn vehicle_facts(year: Option<i64>, km: Option<i64>, color: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(year) = year {
        parts.push(year.to_string());
    }
    if let Some(km) = km {
        parts.push(format!("{km} km"));
    }
    if let Some(color) = color {
        parts.push(color.to_string());
    }
    parts.join(", ")
}

pub fn print_detail(detail: &DetailView) {
    let palette = Palette::auto();
    let listing = &detail.listing;
    println!(
        "{} {} {}",
        palette.id(&listing.number),
        palette.status(&listing.status),
        palette.heading(&listing.title)
    );
    println!("{}", palette.dim(&breadcrumb_line(&detail.breadcrumb)));
    println!("price: {}", palette.price(&listing.price_label));
    if let Some(city) = listing.city.as_deref() {
        println!("city: {city}");
    }
    if !detail.badges.is_empty() {
        let badges = detail
            .badges
            .iter()
            .map(|badge| palette.badge(badge))
            .collect::<Vec<_>>();
        println!("badges: {}", badges.join(" "));
    }
    if let Some(vehicle) = &detail.vehicle {
        let mut facts = Vec::new();
        if let Some(year) = vehicle.year {
            facts.push(format!("year {year}"));
        }
        if let Some(km) = vehicle.km {
            facts.push(format!("{km} km"));
        }
        if let Some(fuel) = vehicle.fuel {
            facts.push(fuel.to_string());
        }
        if let Some(gearbox) = vehicle.gearbox {
            facts.push(gearbox.to_string());
        }
        if let Some(body) = vehicle.body_type.as_deref() {
            facts.push(body.to_string());
        }
        if let Some(color) = vehicle.color.as_deref() {
            facts.push(color.to_string());
        }
        if let Some(cc) = vehicle.engine_cc {
            facts.push(format!("{cc} cc"));
        }
        if let Some(hp) = vehicle.horsepower {
            facts.push(format!("{hp} hp"));
        }
        if !facts.is_empty() {
            println!("vehicle: {}", facts.join(", "));
        }
    }
    if !detail.equipment.is_empty() {
        println!("equipment: {}", detail.equipment.join(", "));
    }
    if !detail.damage.is_empty() {
        let damage = detail
            .damage
            .iter()
            .map(|entry| format!("{}={}", entry.part, entry.kind))
            .collect::<Vec<_>>();
        println!("damage: {}", damage.join(", "));
    }
    if let Some(reason) = listing.rejection_reason.as_deref() {
        println!("{}", palette.warn(&format!("rejected: {reason}")));
    }
    if let Some(description) = listing.description.as_deref() {
        println!();
        println!("{description}");
    }
    println!();
    let seller = &detail.seller;
    let mut seller_line = format!("seller: {} ({})", seller.display_name, seller.kind);
    if let Some(company) = seller.company_name.as_deref() {
        seller_line.push_str(&format!(" {company}"));
    }
    if seller.verified {
        seller_line.push_str(" verified");
    }
    println!("{seller_line}");
    for image in &detail.images {
        println!("  {}", format_image(image, &palette));
    }
    for doping in &detail.dopings {
        println!("  {}", format_doping(doping, &palette));
    }
    if let Some(expires) = listing.expires_at.as_deref() {
        println!("{}", palette.dim(&format!("expires {expires}")));
    }
}

pub fn print_listing(listing: &ListingView) {
    let palette = Palette::auto();
    println!(
        "{} {} {} {}",
        palette.id(&listing.number),
        palette.status(&listing.status),
        listing.title,
        palette.price(&listing.price_label)
    );
}

pub fn print_images(images: &[ImageView]) {
    let palette = Palette::auto();
    if images.is_empty() {
        println!("{}", palette.dim("no images"));
        return;
    }
    for image in images {
        println!("{}", format_image(image, &palette));
    }
}

fn format_image(image: &ImageView, palette: &Palette) -> String {
    let cover = if image.position == 0 { " cover" } else { "" };
    format!(
        "{} #{} {}{}",
        palette.id(&image.id),
        image.position,
        image.url,
        palette.dim(cover)
    )
}

pub fn print_dopings(dopings: &[DopingView]) {
    let palette = Palette::auto();
    if dopings.is_empty() {
        println!("{}", palette.dim("no dopings"));
        return;
    }
    for doping in dopings {
        println!("{}", format_doping(doping, &palette));
    }
}

fn format_doping(doping: &DopingView, palette: &Palette) -> String {
    let mut line = format!(
        "{} {} {} {} days {}",
        palette.id(&doping.id),
        palette.badge(doping.tier.as_str()),
        palette.status(&doping.status),
        doping.days,
        doping.price_label
    );
    if let (Some(start), Some(end)) = (doping.starts_at.as_deref(), doping.ends_at.as_deref()) {
        line.push(' ');
        line.push_str(&palette.dim(&format!("{start} .. {end}")));
    }
    if let Some(note) = doping.note.as_deref() {
        line.push(' ');
        line.push_str(&palette.dim(&format!("({note})")));
    }
    line
}

pub fn print_user(user: &UserView) {
    let palette = Palette::auto();
    println!(
        "{} {} <{}>",
        palette.id(&user.id),
        palette.heading(&user.display_name),
        user.email
    );
    println!(
        "{} {} verification={}",
        user.role, user.account_kind, user.verification
    );
    if let Some(company) = user.company_name.as_deref() {
        println!(
            "company: {company} tax={}",
            user.tax_number.as_deref().unwrap_or("-")
        );
    }
    if let Some(city) = user.city.as_deref() {
        println!("city: {city}");
    }
    if let Some(note) = user.verification_note.as_deref() {
        println!("{}", palette.dim(&format!("note: {note}")));
    }
    if user.banned {
        println!("{}", palette.warn("banned"));
    }
}

fn breadcrumb_line(entries: &[BreadcrumbEntry]) -> String {
    entries
        .iter()
        .map(|entry| entry.name.as_str())
        .collect::<Vec<_>>()
        .join(" > ")
}

pub fn print_category(view: &CategoryView, breadcrumb: &[BreadcrumbEntry]) {
    let palette = Palette::auto();
    println!("{} {}", palette.id(&view.id), palette.heading(&view.name));
    println!("path: {}", view.path);
    println!("{}", palette.dim(&breadcrumb_line(breadcrumb)));
}

pub fn print_category_tree(nodes: &[CategoryNode]) {
    let palette = Palette::auto();
    if nodes.is_empty() {
        println!("{}", palette.dim("no categories"));
        return;
    }
    let mut lines = Vec::new();
    tree_lines(nodes, 0, &palette, &mut lines);
    for line in lines {
        println!("{line}");
    }
}

fn tree_lines(nodes: &[CategoryNode], depth: usize, palette: &Palette, out: &mut Vec<String>) {
    for node in nodes {
        out.push(format!(
            "{}{} {}",
            indentation_prefix(depth, palette),
            node.name,
            palette.dim(&format!("[{}]", node.path))
        ));
        tree_lines(&node.children, depth + 1, palette, out);
    }
}

fn indentation_prefix(depth: usize, palette: &Palette) -> String {
    if depth == 0 {
        return String::new();
    }
    let spaces = "  ".repeat(depth.saturating_sub(1));
    palette.dim(&format!("{spaces}↳ "))
}

pub fn print_facets(facets: &[FacetCount]) {
    let palette = Palette::auto();
    if facets.is_empty() {
        println!("{}", palette.dim("no subcategories"));
        return;
    }
    for facet in facets {
        println!(
            "{} {} {}",
            facet.name,
            palette.dim(&format!("[{}]", facet.path)),
            facet.active_listings
        );
    }
}

pub fn print_inbox(entries: &[InboxEntry]) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Inbox"));
    if entries.is_empty() {
        println!("{}", palette.dim("no conversations"));
        return;
    }
    for entry in entries {
        let mut line = format!(
            "{} {} {} as {}",
            palette.id(&entry.conversation_id),
            entry.listing_number,
            entry.listing_title,
            entry.role
        );
        if entry.unread > 0 {
            line.push(' ');
            line.push_str(&palette.badge(&format!("{} unread", entry.unread)));
        }
        println!("{line}");
        if let Some(last) = entry.last_message.as_deref() {
            println!("  {}", palette.dim(last));
        }
    }
}

pub fn print_conversation(conversation: &ConversationView) {
    let palette = Palette::auto();
    println!(
        "{} {}",
        palette.id(&conversation.id),
        palette.dim(&format!("listing {}", conversation.listing_id))
    );
    for message in &conversation.messages {
        let who = if message.mine { "you" } else { "them" };
        println!(
            "{} {}: {}",
            palette.dim(&message.created_at),
            who,
            message.body
        );
    }
}

pub fn print_queue(queue: &ModerationQueue) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Pending listings"));
    if queue.listings.is_empty() {
        println!("{}", palette.dim("none"));
    }
    for listing in &queue.listings {
        println!(
            "{} {} {}",
            palette.id(&listing.number),
            listing.title,
            palette.price(&listing.price_label)
        );
    }
    println!("{}", palette.heading("Pending dopings"));
    if queue.dopings.is_empty() {
        println!("{}", palette.dim("none"));
    }
    for doping in &queue.dopings {
        println!("{}", format_doping(doping, &palette));
    }
    println!("{}", palette.heading("Pending verifications"));
    if queue.verifications.is_empty() {
        println!("{}", palette.dim("none"));
    }
    for user in &queue.verifications {
        println!(
            "{} {} {}",
            palette.id(&user.email),
            user.display_name,
            user.company_name.as_deref().unwrap_or("")
        );
    }
}

pub fn print_stats(stats: &ModerationStats) {
    let palette = Palette::auto();
    println!("{}", palette.heading("Listings"));
    for (status, count) in &stats.listings_by_status {
        println!("  {} {count}", palette.status(status));
    }
    println!(
        "users: {} ({} corporate)",
        stats.users, stats.corporate_users
    );
    println!(
        "pending: {} listing(s), {} doping(s), {} verification(s)",
        stats.pending_listings, stats.pending_dopings, stats.pending_verifications
    );
    if let Some(version) = &stats.schema_version {
        println!("{}", palette.dim(&format!("schema v{version}")));
    }
}

pub fn print_moderation_log(entries: &[ModerationEntry]) {
    let palette = Palette::auto();
    if entries.is_empty() {
        println!("{}", palette.dim("no moderation actions"));
        return;
    }
    for entry in entries {
        let mut line = format!(
            "{} {} {} {} {}",
            palette.dim(&entry.occurred_at),
            palette.id(&entry.actor_id),
            entry.action,
            entry.target_kind,
            entry.target_id
        );
        if let Some(note) = entry.note.as_deref() {
            line.push_str(&format!(" ({note})"));
        }
        println!("{line}");
    }
}

pub fn print_saved_filters(filters: &[SavedFilterView]) {
    let palette = Palette::auto();
    if filters.is_empty() {
        println!("{}", palette.dim("no saved filters"));
        return;
    }
    for filter in filters {
        println!(
            "{} {} {}",
            palette.id(&filter.id),
            filter.name,
            palette.dim(filter.summary.as_deref().unwrap_or("all listings"))
        );
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    #[cfg(test)]
    fn plain() -> Self {
        Self { enabled: false }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn price(&self, text: &str) -> String {
        self.paint("1;32", text)
    }

    fn warn(&self, text: &str) -> String {
        self.paint("1;31", text)
    }

    fn status(&self, status: &str) -> String {
        let upper = status.to_ascii_uppercase();
        self.paint(status_color_code(status), &format!("[{upper}]"))
    }

    fn badge(&self, text: &str) -> String {
        self.paint(badge_color_code(text), &format!("<{text}>"))
    }
}

fn status_color_code(status: &str) -> &'static str {
    match status.trim().to_ascii_lowercase().as_str() {
        "draft" => "34",
        "pending" => "33",
        "active" => "32",
        "rejected" => "31",
        "expired" | "cancelled" => "90",
        "sold" => "35",
        "deleted" => "2",
        _ => "37",
    }
}

fn badge_color_code(badge: &str) -> &'static str {
    match badge {
        "gold" => "1;33",
        "premium" => "1;35",
        "urgent" => "1;31",
        "dealer" => "36",
        _ => "37",
    }
}

#[cfg(test)]
mod tests {
    use super::{
        breadcrumb_line, format_grid_card, format_row_card, tree_lines, vehicle_facts, Palette,
    };
    use crate::cards::{GridCard, RowCard};
    use crate::catalog::{BreadcrumbEntry, CategoryNode};

    #[test]
    fn grid_card_lists_facts_and_badges() {
        let card = GridCard {
            id: "L-1".to_string(),
            number: "48151623".to_string(),
            title: "Passat 1.6 TDI".to_string(),
            price_label: "1.250.000 TRY".to_string(),
            city: Some("Izmir".to_string()),
            cover_image: None,
            year: Some(2018),
            km: Some(96000),
            badges: vec!["gold".to_string(), "dealer".to_string()],
        };
        assert_eq!(
            format_grid_card(&card, &Palette::plain()),
            "48151623 Passat 1.6 TDI 1.250.000 TRY 2018, 96000 km @Izmir <gold> <dealer> (no photo)"
        );
    }

    #[test]
    fn row_card_uses_placeholders_for_missing_city() {
        let card = RowCard {
            number: "1".to_string(),
            title: "Clio".to_string(),
            year: None,
            km: Some(10),
            color: Some("white".to_string()),
            price_label: "5 TRY".to_string(),
            city: None,
            date: "2026-01-02".to_string(),
        };
        assert_eq!(
            format_row_card(&card, &Palette::plain()),
            "1 2026-01-02 | Clio | 10 km, white | - | 5 TRY"
        );
    }

    #[test]
    fn vehicle_facts_skip_unknown_fields() {
        assert_eq!(vehicle_facts(None, None, None), "");
        assert_eq!(vehicle_facts(Some(2020), None, Some("red")), "2020, red");
    }

    #[test]
    fn tree_lines_indent_children() {
        let nodes = vec![CategoryNode {
            id: "C-1".to_string(),
            name: "Vehicles".to_string(),
            slug: "vehicles".to_string(),
            path: "vehicles".to_string(),
            children: vec![CategoryNode {
                id: "C-2".to_string(),
                name: "Automobile".to_string(),
                slug: "automobile".to_string(),
                path: "vehicles/automobile".to_string(),
                children: Vec::new(),
            }],
        }];
        let mut lines = Vec::new();
        tree_lines(&nodes, 0, &Palette::plain(), &mut lines);
        assert_eq!(
            lines,
            vec![
                "Vehicles [vehicles]".to_string(),
                "↳ Automobile [vehicles/automobile]".to_string(),
            ]
        );
    }

    #[test]
    fn breadcrumb_joins_names() {
        let entries = ["Vehicles", "Automobile", "BMW"]
            .iter()
            .enumerate()
            .map(|(index, name)| BreadcrumbEntry {
                id: format!("C-{index}"),
                name: name.to_string(),
                slug: name.to_ascii_lowercase(),
            })
            .collect::<Vec<_>>();
        assert_eq!(breadcrumb_line(&entries), "Vehicles > Automobile > BMW");
    }
}
