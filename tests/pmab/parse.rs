use crate::pmab::{EMPTY_CONTENT, book_xml, write_raw_archive};
use std::fs;
use tome::ebook::errors::{EbookError, FormatError, PmabError};
use tome::pmab::{self, PmabOptions};
use tome::variant::Variant;

#[test]
fn test_wrong_mimetype() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_archive(dir.path(), "application/epub+zip", &book_xml(""), EMPTY_CONTENT);

    let error = pmab::parse(dir.path(), PmabOptions::default()).unwrap_err();

    assert!(
        matches!(
            &error,
            EbookError::Format(FormatError::Pmab(PmabError::InvalidMimetype { found, .. }))
                if found == "application/epub+zip"
        ),
        "{error:?}"
    );
}

#[test]
fn test_mimetype_is_trimmed() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_archive(dir.path(), "application/pmab+zip\n", &book_xml(""), EMPTY_CONTENT);

    let book = pmab::parse(dir.path(), PmabOptions::default()).unwrap();
    assert!(book.attributes().is_empty());
    book.cleanup();
}

#[test]
fn test_unsupported_version() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = r#"<pbm version="2.0"><attributes/></pbm>"#;
    write_raw_archive(dir.path(), "application/pmab+zip", metadata, EMPTY_CONTENT);

    let error = pmab::parse(dir.path(), PmabOptions::default()).unwrap_err();

    assert!(error.is_unsupported_version(), "{error:?}");
}

#[test]
fn test_missing_version() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_archive(
        dir.path(),
        "application/pmab+zip",
        &book_xml(""),
        "<pbc><nav/></pbc>",
    );

    let error = pmab::parse(dir.path(), PmabOptions::default()).unwrap_err();

    assert!(matches!(
        error,
        EbookError::Format(FormatError::Pmab(PmabError::MissingAttribute { .. }))
    ));
}

#[test]
fn test_unexpected_root() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_archive(
        dir.path(),
        "application/pmab+zip",
        r#"<package version="3.0"/>"#,
        EMPTY_CONTENT,
    );

    let error = pmab::parse(dir.path(), PmabOptions::default()).unwrap_err();

    assert!(matches!(
        error,
        EbookError::Format(FormatError::Pmab(PmabError::UnexpectedRoot { .. }))
    ));
}

#[test]
fn test_missing_document() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_archive(dir.path(), "application/pmab+zip", &book_xml(""), EMPTY_CONTENT);
    fs::remove_file(dir.path().join("content.xml")).unwrap();

    let error = pmab::parse(dir.path(), PmabOptions::default()).unwrap_err();

    assert!(matches!(
        error,
        EbookError::Format(FormatError::Pmab(PmabError::MissingDocument(document)))
            if document == "content.xml"
    ));
}

#[test]
fn test_truncated_contents() {
    let dir = tempfile::tempdir().unwrap();
    let content = r#"<pbc version="3.0"><nav><chapter><item name="title">A</item><chapter><item name="title">B</item>"#;
    write_raw_archive(dir.path(), "application/pmab+zip", &book_xml(""), content);

    let error = pmab::parse(dir.path(), PmabOptions::default()).unwrap_err();

    assert!(
        matches!(
            error,
            EbookError::Format(FormatError::Pmab(PmabError::UnbalancedChapter))
        ),
        "{error:?}"
    );
}

#[test]
fn test_truncated_documents() {
    #[rustfmt::skip]
    let cases = [
        // Root never closed
        (book_xml(""), r#"<pbc version="3.0"><nav><chapter/></nav>"#.to_owned()),
        (r#"<pbm version="3.0"><attributes><item name="title">A</item>"#.to_owned(), EMPTY_CONTENT.to_owned()),
        // Unknown element cut off while skipped
        (book_xml(""), r#"<pbc version="3.0"><nav><chapter><unknown><x/>"#.to_owned()),
        (r#"<pbm version="3.0"><unknown>"#.to_owned(), EMPTY_CONTENT.to_owned()),
    ];

    for (metadata, content) in cases {
        let dir = tempfile::tempdir().unwrap();
        write_raw_archive(dir.path(), "application/pmab+zip", &metadata, &content);

        let error = pmab::parse(dir.path(), PmabOptions::default()).unwrap_err();
        assert!(matches!(error, EbookError::Format(_)), "{metadata} {content}: {error:?}");
    }
}

#[test]
fn test_self_closing_roots() {
    let dir = tempfile::tempdir().unwrap();
    write_raw_archive(
        dir.path(),
        "application/pmab+zip",
        r#"<pbm version="3.0"/>"#,
        r#"<pbc version="3.0"/>"#,
    );

    let book = pmab::parse(dir.path(), PmabOptions::default()).unwrap();
    assert!(book.is_empty());
    book.cleanup();
}

#[test]
fn test_conversion_error_names_key() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = book_xml(r#"<item name="words" type="int">notanumber</item>"#);
    write_raw_archive(dir.path(), "application/pmab+zip", &metadata, EMPTY_CONTENT);

    let error = pmab::parse(dir.path(), PmabOptions::default()).unwrap_err();

    let EbookError::Conversion(conversion) = error else {
        panic!("expected a conversion error, found {error:?}");
    };
    assert_eq!(Some("words"), conversion.key());
    assert_eq!("notanumber", conversion.text());
}

#[test]
fn test_lenient_parsing() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = book_xml(
        r#"
        <item name="title">Lenient</item>
        <item name="words" type="int">notanumber</item>
        <item name="price" type="bool">true</item>
        "#,
    );
    write_raw_archive(dir.path(), "application/pmab+zip", &metadata, EMPTY_CONTENT);

    let book = pmab::parse(dir.path(), PmabOptions::builder().strict(false)).unwrap();

    assert_eq!(Some("Lenient".to_owned()), book.title());
    // Unconvertible values are kept as strings, then rejected by the type table
    assert_eq!(None, book.attribute("words"));
    // `price` must be real
    assert_eq!(None, book.attribute("price"));

    book.cleanup();
}

#[test]
fn test_lenient_parsing_keeps_unbound_strings() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = book_xml(r#"<item name="pages" type="int">many</item>"#);
    write_raw_archive(dir.path(), "application/pmab+zip", &metadata, EMPTY_CONTENT);

    let book = pmab::parse(dir.path(), PmabOptions::builder().strict(false)).unwrap();

    assert_eq!(Some(Variant::from("many")), book.attribute("pages"));
    book.cleanup();
}

#[test]
fn test_untyped_items_follow_attribute_types() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = book_xml(
        r#"
        <item name="intro">A short intro</item>
        <item name="language">en-GB</item>
        <item name="words">42</item>
        <item name="custom"> &#32;kept&#32; </item>
        <item name="date" type="date;format=yyyy-MM-dd">2001-02-03</item>
        "#,
    );
    write_raw_archive(dir.path(), "application/pmab+zip", &metadata, EMPTY_CONTENT);

    let book = pmab::parse(dir.path(), PmabOptions::default()).unwrap();

    assert_eq!("A short intro", book.intro().unwrap().to_string().unwrap());
    assert_eq!("en-GB", book.language().unwrap().to_string());
    assert_eq!(Some(42), book.words());
    assert_eq!(Some(Variant::from(" kept ")), book.attribute("custom"));
    assert_eq!("2001-02-03", book.date().unwrap().format("yyyy-MM-dd"));

    book.cleanup();
}

#[test]
fn test_nested_chapters_and_root_content() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("text")).unwrap();
    fs::write(dir.path().join("text/book.txt"), "Preface").unwrap();
    fs::write(dir.path().join("text/chapter-1-1.txt"), "Inner").unwrap();

    let content = r#"<?xml version="1.0" encoding="UTF-8"?>
        <!DOCTYPE pbc>
        <pbc version="3.0" xmlns="http://phylame.pw/format/pmab/pbc">
          <nav>
            <content type="text/plain;encoding=UTF-8">text/book.txt</content>
            <chapter>
              <item name="title" type="str">Part</item>
              <chapter>
                <item name="title">Inner</item>
                <content type="text/plain">text/chapter-1-1.txt</content>
              </chapter>
              <chapter/>
            </chapter>
            <chapter>
              <item name="title">Inline</item>
              <content>Written inline</content>
            </chapter>
          </nav>
        </pbc>"#;
    write_raw_archive(dir.path(), "application/pmab+zip", &book_xml(""), content);

    let book = pmab::parse(dir.path(), PmabOptions::default()).unwrap();

    assert_eq!("Preface", book.text().unwrap().to_string().unwrap());
    assert_eq!(2, book.len());

    let part = book.get(0).unwrap();
    assert_eq!(Some("Part".to_owned()), part.title());
    assert_eq!(2, part.len());
    assert!(part.get(1).unwrap().attributes().is_empty());

    let inner = part.get(0).unwrap();
    assert_eq!(Some("Inner".to_owned()), inner.title());
    assert_eq!("Inner", inner.text().unwrap().to_string().unwrap());
    assert!(inner.parent().unwrap().ptr_eq(&part));

    let inline = book.get(1).unwrap();
    assert_eq!("Written inline", inline.text().unwrap().to_string().unwrap());

    book.cleanup();
}

#[test]
fn test_missing_entry_reference() {
    let dir = tempfile::tempdir().unwrap();
    let content = r#"<pbc version="3.0"><nav><chapter>
        <content type="text/plain">text/missing.txt</content>
    </chapter></nav></pbc>"#;
    write_raw_archive(dir.path(), "application/pmab+zip", &book_xml(""), content);

    let error = pmab::parse(dir.path(), PmabOptions::default()).unwrap_err();

    assert!(error.is_not_found(), "{error:?}");
}

#[test]
fn test_header_metas_become_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let metadata = r#"<pbm version="3.0">
        <head>
          <meta name="generator" value="jem"/>
        </head>
        <attributes/>
        <extensions>
          <item name="source">scan</item>
        </extensions>
    </pbm>"#;
    write_raw_archive(dir.path(), "application/pmab+zip", metadata, EMPTY_CONTENT);

    let book = pmab::parse(dir.path(), PmabOptions::default()).unwrap();
    let extensions = book.extensions();

    assert_eq!(Some(&Variant::from("jem")), extensions.get("pmab:generator"));
    assert_eq!(Some(&Variant::from("scan")), extensions.get("source"));
    assert!(book.attributes().is_empty());

    drop(extensions);
    book.cleanup();
}

#[test]
fn test_archive_text_is_rereadable() {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir(dir.path().join("text")).unwrap();
    fs::write(dir.path().join("text/intro.txt"), "line 1\nline 2").unwrap();
    let metadata = book_xml(r#"<item name="intro" type="text/plain;encoding=UTF-8">text/intro.txt</item>"#);
    write_raw_archive(dir.path(), "application/pmab+zip", &metadata, EMPTY_CONTENT);

    let book = pmab::parse(dir.path(), PmabOptions::default()).unwrap();
    let intro = book.intro().unwrap();

    assert_eq!(intro.to_string().unwrap(), intro.to_string().unwrap());
    assert_eq!(
        vec!["line 1", "line 2"],
        intro.lines().unwrap().collect::<Result<Vec<_>, _>>().unwrap()
    );

    // Lazy content is released with the book
    book.cleanup();
    assert!(intro.to_string().is_err());
}
