use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use shelf::{Collection, CollectionConfig, Entry, FieldFilter, Format, ShelfError};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Post {
    title: String,
    date: NaiveDate,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    content: String,
}

fn post(title: &str, date: (i32, u32, u32), draft: bool, content: &str) -> Post {
    Post {
        title: title.into(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        draft,
        content: content.into(),
    }
}

fn write_blog(dir: &Path) {
    fs::write(
        dir.join("first.md"),
        "---\ntitle: First\ndate: 2024-01-01\ndraft: false\n---\n\nHello\n",
    )
    .unwrap();
    fs::write(
        dir.join("second.md"),
        "---\ntitle: Second\ndate: 2024-02-01\ndraft: true\n---\n\nWorld\n",
    )
    .unwrap();
}

fn open<T>(dir: &Path, format: &str) -> Collection<T>
where
    T: Serialize + serde::de::DeserializeOwned,
{
    Collection::open(dir, &CollectionConfig::new().with_format(format)).unwrap()
}

fn titles(entries: &[Entry<Post>]) -> Vec<String> {
    entries.iter().map(|e| e.borrow().title.clone()).collect()
}

#[test]
fn blog_fixture_queries() {
    let fixtures = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/blog");
    let posts: Collection<Post> =
        Collection::open(&fixtures, &CollectionConfig::new()).unwrap();

    let by_date = posts.order_by("date").to_list().unwrap();
    assert_eq!(titles(&by_date), vec!["First", "Second"]);
    assert_eq!(posts.filter(|p| !p.draft).count().unwrap(), 2);

    let head = posts.order_by("date").head(1).first().unwrap().unwrap();
    assert_eq!(head.borrow().title, "First");
    let tail = posts.order_by("date").tail(1).last().unwrap().unwrap();
    assert_eq!(tail.borrow().title, "Second");

    assert_eq!(by_date[0].borrow().content, "The first post.");
    assert_eq!(
        by_date[1].borrow().date,
        NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
    );
}

#[test]
fn blog_workflow() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());

    let mut posts: Collection<Post> =
        Collection::open(temp.path(), &CollectionConfig::new()).unwrap();
    assert_eq!(posts.format(), Format::Markdown);
    assert_eq!(posts.count().unwrap(), 2);

    let published = posts.filter(|p| !p.draft).to_list().unwrap();
    assert_eq!(titles(&published), vec!["First"]);
    assert_eq!(published[0].borrow().content, "Hello");

    let newest = posts.order_by("-date").first().unwrap().unwrap();
    assert_eq!(newest.borrow().title, "Second");

    let third = Entry::new(post("Third Post", (2024, 3, 1), false, "New content"));
    let path = posts.add(&third).unwrap();
    assert_eq!(path, temp.path().join("third-post.md"));

    let written = fs::read_to_string(&path).unwrap();
    assert!(written.starts_with("---\ntitle: Third Post\n"));
    assert!(written.contains("draft: false\n"));
    assert!(written.ends_with("---\n\nNew content\n"));

    assert_eq!(posts.count().unwrap(), 3);
    let by_date = posts.order_by("date").to_list().unwrap();
    assert_eq!(titles(&by_date), vec!["First", "Second", "Third Post"]);
}

#[test]
fn records_round_trip_through_every_format() {
    for format in ["markdown", "json", "yaml"] {
        let temp = TempDir::new().unwrap();
        let original = post("Round Trip", (2023, 12, 31), true, "line one\n\nline two");

        let mut writer: Collection<Post> = open(temp.path(), format);
        writer.add(&Entry::new(original.clone())).unwrap();

        let reader: Collection<Post> =
            Collection::open(temp.path(), &CollectionConfig::new()).unwrap();
        assert_eq!(reader.format().name(), format);
        let loaded = reader.first().unwrap().unwrap();
        assert_eq!(loaded.get(), original, "format {}", format);
    }
}

#[test]
fn adding_the_same_record_three_times_writes_one_file() {
    let temp = TempDir::new().unwrap();
    let mut posts: Collection<Post> = open(temp.path(), "md");

    let entry = Entry::new(post("Test Post", (2024, 1, 1), false, "v1"));
    let first = posts.add(&entry).unwrap();
    entry.borrow_mut().content = "v2".into();
    let second = posts.add(&entry).unwrap();
    entry.borrow_mut().content = "v3".into();
    let third = posts.add(&entry).unwrap();

    assert_eq!(first, temp.path().join("test-post.md"));
    assert_eq!(second, first);
    assert_eq!(third, first);
    assert_eq!(posts.count().unwrap(), 1);
    assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 1);
    assert!(fs::read_to_string(&first).unwrap().contains("v3"));
}

#[test]
fn equal_records_are_distinct_records() {
    let temp = TempDir::new().unwrap();
    let mut posts: Collection<Post> = open(temp.path(), "md");

    let record = post("Test Post", (2024, 1, 1), false, "");
    let a = Entry::new(record.clone());
    let b = Entry::new(record);

    let path_a = posts.add(&a).unwrap();
    let path_b = posts.add(&b).unwrap();
    assert_eq!(path_a, temp.path().join("test-post.md"));
    assert_eq!(path_b, temp.path().join("test-post-1.md"));
    assert_eq!(posts.count().unwrap(), 2);

    let path_c = posts
        .add(&Entry::new(post("Test Post", (2024, 1, 1), false, "")))
        .unwrap();
    assert_eq!(path_c, temp.path().join("test-post-2.md"));
}

#[test]
fn records_without_a_name_get_a_random_file_name() {
    #[derive(Serialize, Deserialize)]
    struct Point {
        x: i32,
        y: i32,
    }

    let temp = TempDir::new().unwrap();
    let mut points: Collection<Point> = open(temp.path(), "json");
    let path = points.add(&Entry::new(Point { x: 1, y: 2 })).unwrap();

    assert!(path.exists());
    assert_eq!(path.parent().unwrap(), temp.path());
    assert_eq!(path.extension().unwrap(), "json");
    let stem = path.file_stem().unwrap().to_str().unwrap();
    assert_eq!(stem.len(), 32);
    assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn format_inference() {
    let empty = TempDir::new().unwrap();
    let err = Collection::<Post>::open(empty.path(), &CollectionConfig::new()).unwrap_err();
    assert!(matches!(err, ShelfError::UnknownFormat(_)));

    let defaulted =
        Collection::<Post>::open_or_default(empty.path(), &CollectionConfig::new()).unwrap();
    assert_eq!(defaulted.format(), Format::Markdown);

    let mixed = TempDir::new().unwrap();
    fs::write(mixed.path().join("a.md"), "---\ntitle: A\n---\n").unwrap();
    fs::write(mixed.path().join("b.json"), "{}").unwrap();
    let err = Collection::<Post>::open(mixed.path(), &CollectionConfig::new()).unwrap_err();
    assert!(matches!(err, ShelfError::InconsistentFormat(_)));

    let yaml = TempDir::new().unwrap();
    fs::write(yaml.path().join("a.yml"), "title: A\n").unwrap();
    fs::write(yaml.path().join("b.yaml"), "title: B\n").unwrap();
    let opened = Collection::<Post>::open(yaml.path(), &CollectionConfig::new()).unwrap();
    assert_eq!(opened.format(), Format::Yaml);

    let err = Collection::<Post>::open(
        empty.path(),
        &CollectionConfig::new().with_format("toml"),
    )
    .unwrap_err();
    assert!(matches!(err, ShelfError::UnknownFormat(_)));
}

#[test]
fn declared_format_ignores_other_files() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());
    fs::write(temp.path().join("notes.txt"), "not a record").unwrap();
    fs::write(temp.path().join("data.json"), "{}").unwrap();

    let posts: Collection<Post> = open(temp.path(), "markdown");
    assert_eq!(posts.count().unwrap(), 2);
}

#[test]
fn head_and_tail_boundaries() {
    let temp = TempDir::new().unwrap();
    let mut posts: Collection<Post> = open(temp.path(), "json");
    for (i, title) in ["A", "B", "C"].iter().enumerate() {
        posts
            .add(&Entry::new(post(title, (2024, 1, i as u32 + 1), false, "")))
            .unwrap();
    }

    let sorted = posts.order_by("date");
    assert_eq!(titles(&sorted.head(2).to_list().unwrap()), vec!["A", "B"]);
    assert_eq!(titles(&sorted.tail(2).to_list().unwrap()), vec!["B", "C"]);
    assert!(sorted.head(0).to_list().unwrap().is_empty());
    assert!(sorted.tail(0).to_list().unwrap().is_empty());
    assert_eq!(sorted.head(10).count().unwrap(), 3);
    assert_eq!(titles(&sorted.head(2).tail(1).to_list().unwrap()), vec!["B"]);

    let err = sorted.try_head(-1).unwrap_err();
    assert!(matches!(err, ShelfError::Validation(_)));
    assert!(matches!(sorted.try_tail(-3), Err(ShelfError::Validation(_))));
    assert_eq!(sorted.try_tail(1).unwrap().count().unwrap(), 1);
}

#[test]
fn queries_are_immutable_and_forkable() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());
    fs::write(
        temp.path().join("third.md"),
        "---\ntitle: Third\ndate: 2024-03-01\ndraft: false\n---\n",
    )
    .unwrap();
    let posts: Collection<Post> = open(temp.path(), "md");

    let published = posts.filter(|p| !p.draft);
    let newest = published.order_by("-date");
    let oldest = published.order_by("date");

    assert!(published.sort_instruction().is_none());
    assert_eq!(titles(&newest.to_list().unwrap()), vec!["Third", "First"]);
    assert_eq!(titles(&oldest.to_list().unwrap()), vec!["First", "Third"]);
    assert_eq!(published.count().unwrap(), 2);

    let chained = published.filter(|p| p.title.starts_with('T'));
    assert_eq!(chained.count().unwrap(), 1);
    assert_eq!(published.count().unwrap(), 2);

    assert!(posts.exists().unwrap());
    assert!(posts.exists_where(|p| p.title == "Second").unwrap());
    assert!(!posts.exists_where(|p| p.title == "Fourth").unwrap());
    assert_eq!(posts.last().unwrap().unwrap().borrow().title, "Third");
}

#[test]
fn later_sort_replaces_earlier_one() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());
    let posts: Collection<Post> = open(temp.path(), "md");

    let query = posts.order_by("title").order_by("-date");
    assert_eq!(query.sort_instruction().unwrap().field, "date");
    assert_eq!(titles(&query.to_list().unwrap()), vec!["Second", "First"]);
}

#[test]
fn sort_is_stable_and_missing_fields_sort_first() {
    #[derive(Debug, Serialize, Deserialize)]
    struct Task {
        name: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        priority: Option<u32>,
    }

    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("a.json"), r#"{"name": "a", "priority": 2}"#).unwrap();
    fs::write(temp.path().join("b.json"), r#"{"name": "b", "priority": 1}"#).unwrap();
    fs::write(temp.path().join("c.json"), r#"{"name": "c"}"#).unwrap();
    fs::write(temp.path().join("d.json"), r#"{"name": "d", "priority": 2}"#).unwrap();
    let tasks: Collection<Task> = open(temp.path(), "json");

    let names = |q: shelf::Query<'_, Task>| -> Vec<String> {
        q.to_list()
            .unwrap()
            .iter()
            .map(|e| e.borrow().name.clone())
            .collect()
    };
    assert_eq!(names(tasks.order_by("priority")), vec!["c", "b", "a", "d"]);
    assert_eq!(names(tasks.order_by("-priority")), vec!["a", "d", "b", "c"]);
}

#[test]
fn field_filters_work_on_typed_records() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());
    let posts: Collection<Post> = open(temp.path(), "md");

    let drafts = posts.query().filter_field(FieldFilter::eq("draft", true));
    assert_eq!(titles(&drafts.to_list().unwrap()), vec!["Second"]);

    let parsed: FieldFilter = "date=2024-01-01".parse().unwrap();
    let january = posts.query().filter_field(parsed);
    assert_eq!(titles(&january.to_list().unwrap()), vec!["First"]);
}

#[test]
fn update_upsert_and_missing_path() {
    let temp = TempDir::new().unwrap();
    let mut posts: Collection<Post> = open(temp.path(), "yaml");

    let entry = Entry::new(post("Draft", (2024, 5, 1), true, ""));
    let err = posts.update(&entry).unwrap_err();
    assert!(matches!(err, ShelfError::MissingPath(_)));
    assert_eq!(posts.count().unwrap(), 0);

    let path = posts.upsert(&entry).unwrap();
    assert_eq!(path, temp.path().join("draft.yaml"));

    entry.borrow_mut().draft = false;
    assert_eq!(posts.upsert(&entry).unwrap(), path);
    assert_eq!(posts.update(&entry).unwrap(), path);
    assert_eq!(posts.count().unwrap(), 1);

    let fresh: Collection<Post> = open(temp.path(), "yaml");
    assert!(!fresh.first().unwrap().unwrap().borrow().draft);
}

#[test]
fn loaded_records_can_be_updated_in_place() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());
    let mut posts: Collection<Post> = open(temp.path(), "md");

    let second = posts.get("second.md").unwrap().unwrap();
    second.borrow_mut().draft = false;
    let path = posts.update(&second).unwrap();
    assert_eq!(path, temp.path().join("second.md"));

    let text = fs::read_to_string(&path).unwrap();
    assert!(text.contains("draft: false"));
    assert!(text.ends_with("\n\nWorld\n"));
}

#[test]
fn get_only_returns_files_of_the_collection_format() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());
    fs::write(temp.path().join("other.json"), "{}").unwrap();
    let posts: Collection<Post> = open(temp.path(), "md");

    assert!(posts.get("first.md").unwrap().is_some());
    assert!(posts.get(temp.path().join("second.md")).unwrap().is_some());
    assert!(posts.get("missing.md").unwrap().is_none());
    assert!(posts.get("other.json").unwrap().is_none());
}

#[test]
fn delete_by_record_and_by_path() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());
    let mut posts: Collection<Post> = open(temp.path(), "md");

    let first = posts.get("first.md").unwrap().unwrap();
    posts.delete(&first).unwrap();
    assert!(!temp.path().join("first.md").exists());
    assert!(posts.path_for(&first).is_none());
    assert!(matches!(posts.delete(&first), Err(ShelfError::MissingPath(_))));

    posts.delete("second.md").unwrap();
    assert!(!temp.path().join("second.md").exists());
    posts.delete("second.md").unwrap();

    let untracked = Entry::new(post("Nowhere", (2024, 1, 1), false, ""));
    assert!(matches!(
        posts.delete(&untracked),
        Err(ShelfError::MissingPath(_))
    ));
    assert_eq!(posts.count().unwrap(), 0);
}

#[test]
fn refresh_rereads_from_disk() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());
    let mut posts: Collection<Post> = open(temp.path(), "md");

    let first = posts.get("first.md").unwrap().unwrap();
    fs::write(
        temp.path().join("first.md"),
        "---\ntitle: First (edited)\ndate: 2024-01-01\n---\n\nChanged\n",
    )
    .unwrap();

    let cached = posts.get("first.md").unwrap().unwrap();
    assert!(cached.same_record(&first));
    assert_eq!(cached.borrow().title, "First");

    let refreshed = posts.refresh(&first).unwrap();
    assert_eq!(refreshed.borrow().title, "First (edited)");
    assert_eq!(refreshed.borrow().content, "Changed");
    assert_eq!(first.borrow().title, "First");

    let now = posts.get("first.md").unwrap().unwrap();
    assert!(now.same_record(&refreshed));

    let untracked = Entry::new(post("Nowhere", (2024, 1, 1), false, ""));
    assert!(matches!(
        posts.refresh(&untracked),
        Err(ShelfError::MissingPath(_))
    ));
}

#[test]
fn two_collections_share_the_directory() {
    let temp = TempDir::new().unwrap();
    let mut writer: Collection<Post> = open(temp.path(), "json");
    let mut reader: Collection<Post> = open(temp.path(), "json");

    let original = Entry::new(post("Shared", (2024, 6, 1), false, ""));
    writer.add(&original).unwrap();
    assert_eq!(reader.count().unwrap(), 1);

    let seen = reader.first().unwrap().unwrap();
    assert!(!seen.same_record(&original));
    assert!(reader.path_for(&original).is_none());

    seen.borrow_mut().title = "Shared (edited)".into();
    let path = reader.update(&seen).unwrap();
    assert_eq!(Some(path), writer.path_for(&original));

    let reloaded = writer.refresh(&original).unwrap();
    assert_eq!(reloaded.borrow().title, "Shared (edited)");
}

#[test]
fn invalid_files_surface_errors() {
    let temp = TempDir::new().unwrap();
    fs::write(temp.path().join("bad.json"), r#"{"title": "No date"}"#).unwrap();
    let posts: Collection<Post> = open(temp.path(), "json");
    assert!(matches!(posts.to_list(), Err(ShelfError::Validation(_))));

    let broken = TempDir::new().unwrap();
    fs::write(broken.path().join("bad.json"), "{ not json").unwrap();
    let posts: Collection<Post> = open(broken.path(), "json");
    assert!(matches!(posts.to_list(), Err(ShelfError::Parse { .. })));
}

#[test]
fn custom_body_field() {
    #[derive(Debug, Serialize, Deserialize)]
    struct Note {
        title: String,
        body: String,
    }

    let temp = TempDir::new().unwrap();
    let config = CollectionConfig::new()
        .with_format("markdown")
        .with_body_field("body");
    let mut notes: Collection<Note> = Collection::open(temp.path(), &config).unwrap();

    let path = notes
        .add(&Entry::new(Note {
            title: "Memo".into(),
            body: "Remember this".into(),
        }))
        .unwrap();
    assert_eq!(
        fs::read_to_string(&path).unwrap(),
        "---\ntitle: Memo\n---\n\nRemember this\n"
    );

    let reread: Collection<Note> = Collection::open(temp.path(), &config).unwrap();
    assert_eq!(reread.first().unwrap().unwrap().borrow().body, "Remember this");
}

#[test]
fn recursive_collections_include_subdirectories() {
    let temp = TempDir::new().unwrap();
    write_blog(temp.path());
    let nested = temp.path().join("2023");
    fs::create_dir(&nested).unwrap();
    fs::write(
        nested.join("old.md"),
        "---\ntitle: Old\ndate: 2023-06-01\n---\n",
    )
    .unwrap();

    let flat: Collection<Post> = open(temp.path(), "md");
    assert_eq!(flat.count().unwrap(), 2);

    let deep: Collection<Post> = Collection::open(
        temp.path(),
        &CollectionConfig::new().with_format("md").recursive(true),
    )
    .unwrap();
    assert!(deep.is_recursive());
    assert_eq!(
        titles(&deep.order_by("date").to_list().unwrap()),
        vec!["Old", "First", "Second"]
    );
}
