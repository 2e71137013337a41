use crate::ebook::chapter::Chapter;
use crate::ebook::variant::{Registry, Validator, VariantMap};
use std::cell::{Ref, RefCell, RefMut};
use std::fmt::{self, Debug, Formatter};
use std::ops::Deref;
use std::rc::Rc;

/// A book: the root [`Chapter`] of a tree plus an extensions map for
/// non-bibliographic metadata, such as archive header entries.
///
/// `Book` dereferences to its root chapter, so every [`Chapter`]
/// operation (attributes, children, cleanup) is available directly.
/// The root's attribute map is validated by the book's [`Registry`].
///
/// # Examples
/// ```
/// use tome::Book;
///
/// let book = Book::with_title("Dawn");
/// book.new_chapter("Chapter 1");
/// book.extensions_mut().set("source", "archive")?;
///
/// let copy = book.copy();
/// copy.extensions_mut().remove("source");
///
/// assert_eq!(1, copy.len());
/// assert!(book.extensions().contains("source"));
///
/// book.cleanup();
/// copy.cleanup();
/// # Ok::<(), tome::ebook::errors::ValidationError>(())
/// ```
pub struct Book {
    root: Chapter,
    extensions: RefCell<VariantMap>,
    registry: Rc<Registry>,
}

impl Book {
    /// Creates an empty book using [`Registry::standard`].
    pub fn new() -> Self {
        Self::with_registry(Rc::new(Registry::standard()))
    }

    pub fn with_title(title: impl Into<String>) -> Self {
        let book = Self::new();
        book.set_title(title);
        book
    }

    /// Creates an empty book whose attributes are validated by `registry`.
    pub fn with_registry(registry: Rc<Registry>) -> Self {
        let validator: Rc<dyn Validator> = registry.clone();

        Self {
            root: Chapter::from_attributes(VariantMap::with_validator(validator)),
            extensions: RefCell::new(VariantMap::new()),
            registry,
        }
    }

    /// The root chapter of the tree.
    pub fn root(&self) -> &Chapter {
        &self.root
    }

    pub fn registry(&self) -> &Rc<Registry> {
        &self.registry
    }

    pub fn extensions(&self) -> Ref<'_, VariantMap> {
        self.extensions.borrow()
    }

    pub fn extensions_mut(&self) -> RefMut<'_, VariantMap> {
        self.extensions.borrow_mut()
    }

    /// Deep-copies the tree and the extensions into a new book
    /// sharing the same registry.
    ///
    /// Cleanup callbacks are not copied.
    pub fn copy(&self) -> Book {
        Self {
            root: self.root.clone_tree(true),
            extensions: RefCell::new(self.extensions.borrow().clone()),
            registry: self.registry.clone(),
        }
    }

    /// [Cleans up](Chapter::cleanup) the tree and clears the extensions.
    pub fn cleanup(&self) {
        self.root.cleanup();
        self.extensions.borrow_mut().clear();
    }
}

impl Deref for Book {
    type Target = Chapter;

    fn deref(&self) -> &Self::Target {
        &self.root
    }
}

impl Default for Book {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Book {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Book")
            .field("root", &self.root)
            .field("extensions", &*self.extensions.borrow())
            .finish_non_exhaustive()
    }
}
