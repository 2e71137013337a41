/// PMAB integration tests
mod pmab {
    mod parse;
    mod write;

    use std::fs;
    use std::path::Path;
    use tome::content::{Flob, Text};
    use tome::variant::{Date, Locale, Time, Variant};
    use tome::{Book, Chapter};

    /// A book exercising every variant kind.
    fn sample_book() -> Book {
        let book = Book::with_title("Dawn");
        book.set_authors(["A. Writer", "B. Editor"]).unwrap();
        book.set_attribute("words", 5200).unwrap();
        book.set_attribute("price", 9.5).unwrap();
        book.set_attribute("date", Date::new(2024, 3, 9).at(Time::utc(8, 30, 0)))
            .unwrap();
        // Local time, without an offset
        book.set_attribute("pubdate", Date::new(2024, 4, 1).at(Time::new(18, 5, 0, None)))
            .unwrap();
        book.set_attribute("language", Locale::parse("zh-CN").unwrap())
            .unwrap();
        book.set_attribute("intro", Text::from_string("  An opening\nin two lines "))
            .unwrap();
        book.set_attribute("cover", Flob::from_bytes("cover.png", None, vec![0x89, b'P', b'N', b'G']))
            .unwrap();
        book.set_attribute("finished", true).unwrap();
        book.extensions_mut().set("source", "scan").unwrap();

        let part = book.new_chapter("Part 1");
        part.set_attribute("words", 1200).unwrap();

        let first = part.new_chapter("Chapter 1");
        first.set_text(Some(Text::from_string("It was early. 黎明")));

        let second = part.new_chapter("Chapter 2");
        second.set_text(Some(
            Text::from_string("<p>Noon</p>").with_content_type("html"),
        ));

        let epilogue = book.new_chapter("Epilogue");
        epilogue.set_text(Some(Text::from_string("")));
        book
    }

    /// Writes the three mandatory entries of a directory archive.
    fn write_raw_archive(dir: &Path, mimetype: &str, book_xml: &str, content_xml: &str) {
        fs::write(dir.join("mimetype"), mimetype).unwrap();
        fs::write(dir.join("book.xml"), book_xml).unwrap();
        fs::write(dir.join("content.xml"), content_xml).unwrap();
    }

    const EMPTY_CONTENT: &str = r#"<pbc version="3.0"><nav/></pbc>"#;

    fn book_xml(attributes: &str) -> String {
        format!(r#"<?xml version="1.0"?><pbm version="3.0"><attributes>{attributes}</attributes></pbm>"#)
    }

    /// Structural equality: attributes, text content, and child order.
    fn assert_same_tree(expected: &Chapter, actual: &Chapter) {
        let expected_attributes = expected.attributes();
        let actual_attributes = actual.attributes();

        assert_eq!(
            expected_attributes.names().collect::<Vec<_>>(),
            actual_attributes.names().collect::<Vec<_>>(),
        );
        for (key, value) in expected_attributes.iter() {
            assert_same_value(key, value, actual_attributes.get(key).unwrap());
        }

        assert_eq!(
            expected.text().map(|text| text.to_string().unwrap()),
            actual.text().map(|text| text.to_string().unwrap()),
        );
        assert_eq!(expected.len(), actual.len());

        for (expected, actual) in expected.iter().zip(actual.iter()) {
            assert_same_tree(&expected, &actual);
        }
    }

    fn assert_same_value(key: &str, expected: &Variant, actual: &Variant) {
        match (expected, actual) {
            (Variant::Text(expected), Variant::Text(actual)) => {
                assert_eq!(expected.to_string().unwrap(), actual.to_string().unwrap(), "{key}");
                assert_eq!(expected.content_type(), actual.content_type(), "{key}");
            }
            (Variant::Flob(expected), Variant::Flob(actual)) => {
                assert_eq!(expected.read_bytes().unwrap(), actual.read_bytes().unwrap(), "{key}");
                assert_eq!(expected.mime(), actual.mime(), "{key}");
            }
            _ => assert_eq!(expected, actual, "{key}"),
        }
    }
}
