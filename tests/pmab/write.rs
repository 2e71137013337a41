use crate::pmab::{assert_same_tree, sample_book};
use std::fs;
use std::io::Cursor;
use tome::content::Text;
use tome::ebook::errors::EbookError;
use tome::pmab::{self, ArchiveKind, CancellationToken, PmabOptions};
use tome::variant::{Date, Time};
use tome::{Book, Chapter};

#[test]
fn test_zip_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dawn.pmab");
    let book = sample_book();

    pmab::make(&book, &path, PmabOptions::default()).unwrap();
    let parsed = pmab::parse(&path, PmabOptions::default()).unwrap();

    assert_same_tree(&book, &parsed);
    assert_eq!(book.extensions().get("source"), parsed.extensions().get("source"));

    parsed.cleanup();
    book.cleanup();
}

#[test]
fn test_directory_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dawn");
    let book = sample_book();
    let options = PmabOptions::builder()
        .archive_kind(ArchiveKind::Directory)
        .xml_indent("  ")
        .build();

    pmab::make(&book, &path, options.clone()).unwrap();

    for entry in [
        "mimetype",
        "book.xml",
        "content.xml",
        "text/intro.txt",
        "resources/cover.png",
        "text/chapter-1-1.txt",
        "text/chapter-1-2.html",
        "text/chapter-2.txt",
    ] {
        assert!(path.join(entry).is_file(), "{entry}");
    }
    assert_eq!(
        "application/pmab+zip",
        fs::read_to_string(path.join("mimetype")).unwrap()
    );

    let parsed = pmab::parse(&path, options).unwrap();
    assert_same_tree(&book, &parsed);

    parsed.cleanup();
    book.cleanup();
}

#[test]
fn test_title_and_chapter_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("t.pmab");

    let book = Book::with_title("T");
    book.new_chapter("C1")
        .set_text(Some(Text::from_string("First chapter text")));

    pmab::make(&book, &path, PmabOptions::default()).unwrap();
    let parsed = pmab::parse(&path, PmabOptions::default()).unwrap();

    assert_eq!(Some("T".to_owned()), parsed.title());
    let first = parsed.get(0).unwrap();
    assert_eq!(Some("C1".to_owned()), first.title());
    assert_eq!("First chapter text", first.text().unwrap().to_string().unwrap());

    parsed.cleanup();
    book.cleanup();
}

#[test]
fn test_stream_round_trip() {
    let book = sample_book();

    let bytes = pmab::make_to(&book, Vec::new(), PmabOptions::default()).unwrap();
    assert!(bytes.starts_with(b"PK"));

    let parsed = pmab::parse_from(Cursor::new(bytes), PmabOptions::default()).unwrap();
    assert_same_tree(&book, &parsed);

    parsed.cleanup();
    book.cleanup();
}

#[test]
fn test_text_encoding() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gbk");
    let options = PmabOptions::builder()
        .archive_kind(ArchiveKind::Directory)
        .text_encoding(encoding_rs::GBK);

    let book = Book::with_title("黎明");
    book.new_chapter("第一章")
        .set_text(Some(Text::from_string("天亮了。")));

    pmab::make(&book, &path, options).unwrap();

    let raw = fs::read(path.join("text/chapter-1.txt")).unwrap();
    assert_eq!(encoding_rs::GBK.encode("天亮了。").0.as_ref(), raw.as_slice());

    let content = fs::read_to_string(path.join("content.xml")).unwrap();
    assert!(content.contains("encoding=GBK"), "{content}");

    // The recorded encoding is used unless one is configured
    let parsed = pmab::parse(&path, PmabOptions::default()).unwrap();
    let text = parsed.get(0).unwrap().text().unwrap();
    assert_eq!(Some(encoding_rs::GBK), text.encoding());
    assert_eq!("天亮了。", text.to_string().unwrap());

    parsed.cleanup();
    book.cleanup();
}

#[test]
fn test_local_datetime_round_trip() {
    let book = Book::with_title("Local");
    let local = Date::new(2024, 3, 9).at(Time::new(8, 30, 0, None));
    book.set_attribute("date", local).unwrap();

    let bytes = pmab::make_to(&book, Vec::new(), PmabOptions::default()).unwrap();
    let parsed = pmab::parse_from(Cursor::new(bytes), PmabOptions::default()).unwrap();

    assert_eq!(Some(local), parsed.date());
    assert_eq!(None, parsed.date().unwrap().time().offset());

    parsed.cleanup();
    book.cleanup();
}

#[test]
fn test_utf16_text_is_written_as_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("utf16");
    let options = PmabOptions::builder()
        .archive_kind(ArchiveKind::Directory)
        .text_encoding(encoding_rs::UTF_16LE);

    let book = Book::with_title("T");
    book.new_chapter("C1")
        .set_text(Some(Text::from_string("hello")));

    pmab::make(&book, &path, options).unwrap();

    assert_eq!(b"hello".to_vec(), fs::read(path.join("text/chapter-1.txt")).unwrap());
    let content = fs::read_to_string(path.join("content.xml")).unwrap();
    assert!(content.contains("encoding=UTF-8"), "{content}");
    assert!(!content.contains("UTF-16"), "{content}");

    let parsed = pmab::parse(&path, PmabOptions::default()).unwrap();
    assert_eq!("hello", parsed.get(0).unwrap().text().unwrap().to_string().unwrap());

    parsed.cleanup();
    book.cleanup();
}

#[test]
fn test_date_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dated");
    let options = PmabOptions::builder()
        .archive_kind(ArchiveKind::Directory)
        .date_format("yyyy/MM/dd");

    let book = Book::with_title("Dated");
    book.set_attribute("date", tome::variant::DateTime::parse("2020-05-17").unwrap())
        .unwrap();

    pmab::make(&book, &path, options).unwrap();

    let metadata = fs::read_to_string(path.join("book.xml")).unwrap();
    assert!(metadata.contains(r#"type="datetime;format=yyyy/MM/dd">2020/05/17<"#), "{metadata}");

    let parsed = pmab::parse(&path, PmabOptions::default()).unwrap();
    assert_eq!(book.date(), parsed.date());

    parsed.cleanup();
    book.cleanup();
}

#[test]
fn test_header_metas() {
    let dir = tempfile::tempdir().unwrap();
    let first = dir.path().join("first.pmab");
    let second = dir.path().join("second.pmab");

    let book = Book::with_title("T");
    pmab::make(&book, &first, PmabOptions::builder().meta("generator", "tome")).unwrap();

    let parsed = pmab::parse(&first, PmabOptions::default()).unwrap();
    assert_eq!(
        Some("tome"),
        parsed.extensions().get("pmab:generator").and_then(|value| value.as_str())
    );

    // Header metas survive a rewrite without being configured again
    pmab::make(&parsed, &second, PmabOptions::default()).unwrap();
    let reparsed = pmab::parse(&second, PmabOptions::default()).unwrap();
    assert_eq!(
        parsed.extensions().get("pmab:generator"),
        reparsed.extensions().get("pmab:generator")
    );

    reparsed.cleanup();
    parsed.cleanup();
    book.cleanup();
}

#[test]
fn test_cancelled_write_leaves_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cancelled.pmab");
    let token = CancellationToken::new();

    let book = Book::with_title("T");
    book.new_chapter("C1");
    token.cancel();

    let result = pmab::make(&book, &path, PmabOptions::builder().cancellation(token));

    assert!(matches!(result, Err(EbookError::Cancelled)));
    assert!(!path.exists());
    assert_eq!(0, fs::read_dir(dir.path()).unwrap().count());

    book.cleanup();
}

#[test]
fn test_cancelled_directory_write_leaves_no_artifact() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cancelled");
    let token = CancellationToken::new();
    let options = PmabOptions::builder()
        .archive_kind(ArchiveKind::Directory)
        .cancellation(token.clone());

    let book = Book::with_title("T");
    book.new_chapter("C1");
    token.cancel();

    assert!(matches!(
        pmab::make(&book, &path, options),
        Err(EbookError::Cancelled)
    ));
    assert_eq!(0, fs::read_dir(dir.path()).unwrap().count());

    book.cleanup();
}

#[test]
fn test_directory_target_must_be_empty() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("keep.txt"), "data").unwrap();

    let book = Book::with_title("T");
    let result = pmab::make(
        &book,
        dir.path(),
        PmabOptions::builder().archive_kind(ArchiveKind::Directory),
    );

    assert!(matches!(result, Err(EbookError::Io(_))));
    assert!(dir.path().join("keep.txt").is_file());

    book.cleanup();
}

#[test]
fn test_chapter_order_is_preserved() {
    let book = Book::new();
    let titles = ["b", "a", "d", "c"];

    for title in titles {
        let chapter = Chapter::with_title(title);
        book.append(chapter).unwrap();
    }

    let bytes = pmab::make_to(&book, Vec::new(), PmabOptions::default()).unwrap();
    let parsed = pmab::parse_from(Cursor::new(bytes), PmabOptions::default()).unwrap();

    let parsed_titles: Vec<_> = parsed.iter().filter_map(|chapter| chapter.title()).collect();
    assert_eq!(titles.to_vec(), parsed_titles);
    assert!(parsed.title().is_none());

    parsed.cleanup();
    book.cleanup();
}
