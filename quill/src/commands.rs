use quire::config::Config;
use quire::content::{Collection, Site};
use quire::error::Result;
use quire::render::{self, Components};
use quire::view::{Listing, TagPage};
use quire::{err, query};

/// The site as the presentation layer sees it: the artifact if one has been
/// written, a fresh build otherwise.
pub fn site(config: &Config) -> Result<Site> {
    let artifact = config.artifact_path();
    match artifact.exists() {
        true => Site::load(artifact),
        false => {
            log::info!("no artifact at {}; building", artifact.display());
            Site::build(config)
        }
    }
}

fn collection<'s>(site: &'s Site, name: &str) -> Result<&'s Collection> {
    match site.collection(name) {
        Some(collection) => Ok(collection),
        None => err! {
            "no such collection",
            "name" => name,
            "collections" => site.collections.keys().cloned().collect::<Vec<_>>().join(", "),
        },
    }
}

pub fn summarize(site: &Site) {
    for (name, collection) in &site.collections {
        let published = query::published(&collection.entries).len();
        println!("{name} ({}): {} entries, {published} published", collection.route, collection.len());
    }
}

pub fn list(site: &Site, config: &Config, name: &str, page: Option<&str>, tag: Option<&str>) -> Result<()> {
    let collection = collection(site, name)?;
    let page = query::parse_page(page);
    let summaries = match tag {
        Some(tag) => {
            let tag_page = TagPage::new(&collection.entries, tag, &config.build);
            println!("# {}", tag_page.title);
            let per_page = config.build.per_page;
            let total = query::total_pages(tag_page.entries.len(), per_page);
            println!("page {page} of {total}");
            query::paginate(&tag_page.entries, per_page, page).to_vec()
        }
        None => {
            let listing = Listing::new(collection, page, &config.build);
            println!("# {} ({})", listing.collection, listing.route);
            println!("page {} of {}", listing.page, listing.total_pages);
            listing.entries
        }
    };

    if summaries.is_empty() {
        println!("no entries");
    }

    for summary in summaries {
        println!("{}  {}  {}", summary.display_date, summary.slug, summary.title);
        if let Some(description) = &summary.description {
            println!("    {description}");
        }
    }

    Ok(())
}

pub fn tags(site: &Site, name: Option<&str>) -> Result<()> {
    let entries = match name {
        Some(name) => query::published(&collection(site, name)?.entries),
        None => site.collections.values()
            .flat_map(|c| query::published(&c.entries))
            .collect(),
    };

    let index = query::aggregate_tag_counts(&entries);
    for (tag, count) in query::sort_tags_by_count_descending(&index) {
        println!("{count:>4}  {tag}  /tags/{}", quire::util::slugify_tag(tag));
    }

    Ok(())
}

pub fn show(site: &Site, name: &str, slug: &[String]) -> Result<()> {
    let collection = collection(site, name)?;
    let Some(entry) = query::find_by_slug(&collection.entries, slug) else {
        return err!("not found", "collection" => name, "slug" => slug.join("/"));
    };

    println!("{}", render::render(&entry.body, &Components::standard())?);
    Ok(())
}
