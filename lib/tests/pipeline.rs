use std::fs;
use std::path::Path;

use quire::config::{Config, CONFIG_FILE};
use quire::content::Site;
use quire::error::ContentError;
use quire::render::{render, Components};
use quire::view::{Listing, TagPage};
use quire::query;

fn write(root: &Path, path: &str, contents: &str) {
    let path = root.join(path);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn post(title: &str, date: &str, published: bool, tags: &[&str]) -> String {
    let tags = tags.iter().map(|t| format!("{t:?}")).collect::<Vec<_>>().join(", ");
    format!("---\ntitle: {title}\ndate: {date}\npublished: {published}\ntags: [{tags}]\n---\n\nBody of {title}.\n")
}

#[test]
fn build_load_query_render() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, CONFIG_FILE, "[site]\nname = \"Test\"\n\n[build]\nper_page = 5\n");

    for i in 1..=12 {
        let tags: &[&str] = if i % 3 == 0 { &["Rust", "Web Dev"] } else { &["Rust"] };
        write(root, &format!("content/posts/2024/post-{i:02}.md"), &post(&format!("Post {i}"), &format!("2024-02-{i:02}"), true, tags));
    }

    write(root, "content/posts/draft.md", &post("Draft", "2024-03-01", false, &["Secret"]));
    write(root, "content/posts/about/index.mdx", "+++\ntitle = \"About\"\ndate = 2023-01-01\npublished = true\n+++\n\
        # About\n\n<Callout type=\"warning\">\n\nHello <Tag tag=\"Rust\" />!\n\n</Callout>\n\n<script>alert(1)</script>\n");
    write(root, "content/essays/one.md", &post("One", "2022-05-05", true, &[]));

    let config = Config::discover(root).unwrap();
    let site = Site::build(&config).unwrap();
    site.write(config.artifact_path()).unwrap();

    let site = Site::load(config.artifact_path()).unwrap();
    let posts = site.collection("posts").unwrap();
    assert_eq!(posts.len(), 14);

    let listing = Listing::new(posts, 1, &config.build);
    assert_eq!(listing.total_pages, 3);
    assert_eq!(listing.entries.len(), 5);
    assert_eq!(listing.entries[0].slug, "/blog/2024/post-12");
    assert_eq!(Listing::new(posts, 3, &config.build).entries.len(), 3);
    assert!(Listing::new(posts, 4, &config.build).entries.is_empty());
    assert_eq!(listing.tags[0].tag, "Rust");
    assert_eq!(listing.tags[0].count, 12);
    assert!(listing.tags.iter().all(|t| t.tag != "Secret"));

    let web = TagPage::new(&posts.entries, "web-dev", &config.build);
    assert_eq!(web.title, "web dev");
    assert_eq!(web.entries.len(), 4);

    assert!(query::find_by_slug(&posts.entries, &["draft"]).is_none());
    let about = query::find_by_slug(&posts.entries, &["about"]).unwrap();
    assert_eq!(about.slug, "/blog/about");
    assert_eq!(about.toc[0].title, "About");

    let html = render(&about.body, &Components::standard()).unwrap();
    assert!(html.contains("<div class=\"callout callout-warning\">"));
    assert!(html.contains("<a class=\"tag\" href=\"/tags/rust\">Rust</a>"));
    assert!(html.contains("&lt;script&gt;"));
    assert!(!html.contains("<script>"));

    assert_eq!(site.entries("essays")[0].slug, "/essays/one");
}

#[test]
fn invalid_content_fails_the_build() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    write(root, "content/posts/ok.md", &post("Ok", "2024-01-01", true, &[]));
    write(root, "content/posts/no-date.md", "---\ntitle: No date\n---\nText\n");
    write(root, "content/essays/foo.md", "---\ntitle: Foo\ndate: 2024-01-01\n---\n\n<Foo />\n");

    let config = Config::discover(root).unwrap();
    let error = Site::build(&config).unwrap_err();
    let details = error.find_all::<ContentError>();
    assert_eq!(details.len(), 2);
    assert!(details.iter().any(|e| matches!(e,
        ContentError::SchemaValidation { field, path, .. } if field == "date" && path == "posts/no-date.md")));
    assert!(details.iter().any(|e| matches!(e,
        ContentError::UnknownComponent { name, .. } if name == "Foo")));

    assert!(!config.artifact_path().exists());
}
