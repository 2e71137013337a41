//! The chapter tree.
//!
//! A [`Chapter`] is a shared handle to a tree node. Children are owned
//! by their parent; the parent link is weak and only used for navigation
//! and invariant checks. Every tree mutation enforces the single-parent
//! invariant and fails with [`TreeError`] without modifying the tree:
//! - A chapter cannot be attached to itself.
//! - A chapter cannot be attached below one of its own descendants.
//! - A chapter that already has a parent must be [detached](Chapter::detach) first.
//!
//! # Cleanup
//! Resources held by a tree (such as an open archive backing its lazy
//! content) are released by an explicit [`Chapter::cleanup`] call,
//! not when handles go out of scope.

use crate::ebook::attributes;
use crate::ebook::content::Text;
use crate::ebook::errors::{TreeError, ValidationError};
use crate::ebook::variant::{Variant, VariantMap};
use std::any::Any;
use std::cell::{Ref, RefCell, RefMut};
use std::fmt::{self, Debug, Formatter};
use std::rc::{Rc, Weak};

type TreeResult<T> = Result<T, TreeError>;
type Cleanup = Box<dyn FnOnce(&Chapter)>;

/// Identifies a callback registered with [`Chapter::add_cleanup`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct CleanupId(u64);

/// A node of a book's chapter tree.
///
/// Cloning a `Chapter` clones the *handle*; both handles refer to the same node.
/// See [`Chapter::clone_tree`] to copy a node.
///
/// # Examples
/// ```
/// use tome::Chapter;
///
/// let volume = Chapter::with_title("Volume 1");
/// let first = volume.new_chapter("Chapter 1");
/// volume.new_chapter("Chapter 2");
///
/// assert_eq!(2, volume.len());
/// assert_eq!(Some(0), volume.index_of(&first));
/// assert!(first.parent().is_some_and(|parent| parent.ptr_eq(&volume)));
///
/// // A chapter has at most one parent
/// let other = Chapter::new();
/// assert!(other.append(first.clone()).is_err());
///
/// volume.cleanup();
/// ```
#[derive(Clone)]
pub struct Chapter(Rc<RefCell<ChapterData>>);

struct ChapterData {
    attributes: VariantMap,
    text: Option<Text>,
    tag: Option<Rc<dyn Any>>,
    children: Vec<Chapter>,
    parent: Weak<RefCell<ChapterData>>,
    cleanups: Vec<(CleanupId, Cleanup)>,
    next_cleanup: u64,
    cleaned: bool,
}

impl ChapterData {
    fn new(attributes: VariantMap) -> Self {
        Self {
            attributes,
            text: None,
            tag: None,
            children: Vec::new(),
            parent: Weak::new(),
            cleanups: Vec::new(),
            next_cleanup: 0,
            cleaned: false,
        }
    }
}

impl Chapter {
    /// Creates an empty, detached chapter.
    pub fn new() -> Self {
        Self::from_attributes(VariantMap::new())
    }

    /// Creates a detached chapter with the given title.
    pub fn with_title(title: impl Into<String>) -> Self {
        let chapter = Self::new();
        chapter.set_title(title);
        chapter
    }

    pub(crate) fn from_attributes(attributes: VariantMap) -> Self {
        Self(Rc::new(RefCell::new(ChapterData::new(attributes))))
    }

    /// The attribute map of this chapter.
    ///
    /// # Panics
    /// If the map is currently borrowed mutably through [`Self::attributes_mut`].
    pub fn attributes(&self) -> Ref<'_, VariantMap> {
        Ref::map(self.0.borrow(), |data| &data.attributes)
    }

    pub fn attributes_mut(&self) -> RefMut<'_, VariantMap> {
        RefMut::map(self.0.borrow_mut(), |data| &mut data.attributes)
    }

    /// Sets an attribute through the map's validator.
    pub fn set_attribute(
        &self,
        key: impl Into<String>,
        value: impl Into<Variant>,
    ) -> Result<Option<Variant>, ValidationError> {
        self.attributes_mut().set(key, value)
    }

    /// Returns a clone of the attribute value for `key`.
    pub fn attribute(&self, key: &str) -> Option<Variant> {
        self.attributes().get(key).cloned()
    }

    /// The main text content.
    pub fn text(&self) -> Option<Text> {
        self.0.borrow().text.clone()
    }

    /// Replaces the main text content, returning the previous one.
    pub fn set_text(&self, text: Option<Text>) -> Option<Text> {
        std::mem::replace(&mut self.0.borrow_mut().text, text)
    }

    /// An opaque application value carried with this chapter.
    pub fn tag(&self) -> Option<Rc<dyn Any>> {
        self.0.borrow().tag.clone()
    }

    pub fn set_tag(&self, tag: Option<Rc<dyn Any>>) -> Option<Rc<dyn Any>> {
        std::mem::replace(&mut self.0.borrow_mut().tag, tag)
    }

    //////////////////////////////////
    // NAVIGATION
    //////////////////////////////////

    /// The number of direct children.
    pub fn len(&self) -> usize {
        self.0.borrow().children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if this chapter has children.
    pub fn is_section(&self) -> bool {
        !self.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Chapter> {
        self.0.borrow().children.get(index).cloned()
    }

    /// The position of `child` among the direct children of this chapter.
    pub fn index_of(&self, child: &Chapter) -> Option<usize> {
        self.0
            .borrow()
            .children
            .iter()
            .position(|candidate| candidate.ptr_eq(child))
    }

    /// A snapshot of the direct children.
    pub fn children(&self) -> Vec<Chapter> {
        self.0.borrow().children.clone()
    }

    /// Iterates over a snapshot of the direct children,
    /// so the tree may be mutated while iterating.
    pub fn iter(&self) -> std::vec::IntoIter<Chapter> {
        self.children().into_iter()
    }

    pub fn parent(&self) -> Option<Chapter> {
        self.0.borrow().parent.upgrade().map(Chapter)
    }

    /// The number of ancestors; `0` for a detached chapter.
    pub fn depth(&self) -> usize {
        std::iter::successors(self.parent(), Chapter::parent).count()
    }

    /// Returns `true` if both handles refer to the same node.
    pub fn ptr_eq(&self, other: &Chapter) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    //////////////////////////////////
    // MUTATION
    //////////////////////////////////

    /// Appends `child` as the last child.
    ///
    /// # Errors
    /// [`TreeError`] if `child` cannot be attached here; the tree is unchanged.
    pub fn append(&self, child: Chapter) -> TreeResult<()> {
        let len = self.len();
        self.insert(len, child)
    }

    /// Inserts `child` at `index`, shifting later children.
    pub fn insert(&self, index: usize, child: Chapter) -> TreeResult<()> {
        self.check_attachable(&child)?;

        let len = self.len();
        if index > len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }

        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.insert(index, child);
        Ok(())
    }

    /// Creates a child chapter with the given title, appends it, and returns it.
    ///
    /// The child shares this chapter's attribute validator.
    pub fn new_chapter(&self, title: impl Into<String>) -> Chapter {
        let validator = self.attributes().validator().cloned();
        let child = Chapter::from_attributes(match validator {
            Some(validator) => VariantMap::with_validator(validator),
            None => VariantMap::new(),
        });

        child.attributes_mut().put(attributes::TITLE, title.into());
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children.push(child.clone());
        child
    }

    /// Replaces the child at `index` with `child`, returning the detached previous child.
    pub fn replace_at(&self, index: usize, child: Chapter) -> TreeResult<Chapter> {
        let current = self.get(index).ok_or_else(|| TreeError::IndexOutOfBounds {
            index,
            len: self.len(),
        })?;

        if current.ptr_eq(&child) {
            return Ok(current);
        }
        self.check_attachable(&child)?;

        current.0.borrow_mut().parent = Weak::new();
        child.0.borrow_mut().parent = Rc::downgrade(&self.0);
        self.0.borrow_mut().children[index] = child;
        Ok(current)
    }

    /// Replaces `old` with `new`, returning `false` if `old` is not a child of this chapter.
    pub fn replace(&self, old: &Chapter, new: Chapter) -> TreeResult<bool> {
        match self.index_of(old) {
            Some(index) => self.replace_at(index, new).map(|_| true),
            None => Ok(false),
        }
    }

    /// Detaches and returns the child at `index`.
    pub fn remove_at(&self, index: usize) -> TreeResult<Chapter> {
        let len = self.len();
        if index >= len {
            return Err(TreeError::IndexOutOfBounds { index, len });
        }

        let child = self.0.borrow_mut().children.remove(index);
        child.0.borrow_mut().parent = Weak::new();
        Ok(child)
    }

    /// Detaches `child`, returning `false` if it is not a child of this chapter.
    pub fn remove(&self, child: &Chapter) -> bool {
        self.index_of(child)
            .is_some_and(|index| self.remove_at(index).is_ok())
    }

    /// Swaps the children at `a` and `b`.
    pub fn swap(&self, a: usize, b: usize) -> TreeResult<()> {
        let len = self.len();

        match [a, b].into_iter().find(|index| *index >= len) {
            Some(index) => Err(TreeError::IndexOutOfBounds { index, len }),
            None => {
                self.0.borrow_mut().children.swap(a, b);
                Ok(())
            }
        }
    }

    /// Detaches this chapter from its parent, returning `false` if it had none.
    pub fn detach(&self) -> bool {
        match self.parent() {
            Some(parent) => parent.remove(self),
            None => false,
        }
    }

    /// Detaches all children, [cleaning them up](Self::cleanup) first when `cleanup` is `true`.
    pub fn clear(&self, cleanup: bool) {
        let children = std::mem::take(&mut self.0.borrow_mut().children);

        for child in children {
            child.0.borrow_mut().parent = Weak::new();

            if cleanup {
                child.cleanup();
            }
        }
    }

    fn check_attachable(&self, child: &Chapter) -> TreeResult<()> {
        if self.ptr_eq(child) {
            return Err(TreeError::SelfReference(child.display_name()));
        }
        if std::iter::successors(self.parent(), Chapter::parent).any(|ancestor| ancestor.ptr_eq(child)) {
            return Err(TreeError::Cycle(child.display_name()));
        }
        if child.parent().is_some() {
            return Err(TreeError::AlreadyAttached(child.display_name()));
        }
        Ok(())
    }

    fn display_name(&self) -> String {
        self.attributes()
            .get(attributes::TITLE)
            .and_then(Variant::as_str)
            .unwrap_or("<untitled>")
            .to_owned()
    }

    //////////////////////////////////
    // COPY & CLEANUP
    //////////////////////////////////

    /// Copies this node into a new, detached chapter.
    ///
    /// The copy owns an independent attribute map and shares text and tag.
    /// When `deep` is `true`, children are copied recursively;
    /// otherwise the copy has no children.
    /// Cleanup callbacks are never copied.
    pub fn clone_tree(&self, deep: bool) -> Chapter {
        let data = self.0.borrow();
        let copy = Chapter::from_attributes(data.attributes.clone());
        {
            let mut copy_data = copy.0.borrow_mut();
            copy_data.text = data.text.clone();
            copy_data.tag = data.tag.clone();
        }

        if deep {
            for child in &data.children {
                let child = child.clone_tree(true);
                child.0.borrow_mut().parent = Rc::downgrade(&copy.0);
                copy.0.borrow_mut().children.push(child);
            }
        }
        copy
    }

    /// Registers a callback run once by [`Self::cleanup`], in registration order.
    pub fn add_cleanup(&self, cleanup: impl FnOnce(&Chapter) + 'static) -> CleanupId {
        let mut data = self.0.borrow_mut();
        let id = CleanupId(data.next_cleanup);

        data.next_cleanup += 1;
        data.cleanups.push((id, Box::new(cleanup)));
        id
    }

    /// Unregisters a cleanup callback, returning `false` if it was not pending.
    pub fn remove_cleanup(&self, id: CleanupId) -> bool {
        let mut data = self.0.borrow_mut();
        let before = data.cleanups.len();

        data.cleanups.retain(|(pending, _)| *pending != id);
        data.cleanups.len() != before
    }

    pub fn is_cleaned(&self) -> bool {
        self.0.borrow().cleaned
    }

    /// Releases this chapter and its subtree:
    /// 1. Runs the registered cleanup callbacks in registration order.
    /// 2. Cleans up and detaches every child.
    /// 3. Clears the attributes, text, and tag.
    /// 4. Detaches this chapter from its parent.
    ///
    /// Calling `cleanup` again is a no-op.
    pub fn cleanup(&self) {
        let callbacks = {
            let mut data = self.0.borrow_mut();
            if data.cleaned {
                return;
            }
            data.cleaned = true;
            std::mem::take(&mut data.cleanups)
        };

        for (_, callback) in callbacks {
            callback(self);
        }
        self.clear(true);
        {
            let mut data = self.0.borrow_mut();
            data.attributes.clear();
            data.text = None;
            data.tag = None;
        }
        self.detach();
    }
}

impl Default for Chapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Debug for Chapter {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let data = self.0.borrow();

        f.debug_struct("Chapter")
            .field("attributes", &data.attributes)
            .field("text", &data.text)
            .field("children", &data.children)
            .finish_non_exhaustive()
    }
}

impl<'a> IntoIterator for &'a Chapter {
    type Item = Chapter;
    type IntoIter = std::vec::IntoIter<Chapter>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl ChapterData {
    /// Whether this chapter holds content read through an open archive.
    fn holds_archived_content(&self) -> bool {
        self.text.as_ref().is_some_and(Text::is_archived)
            || self.attributes.iter().any(|(_, value)| match value {
                Variant::Text(text) => text.is_archived(),
                Variant::Flob(flob) => flob.is_archived(),
                _ => false,
            })
    }
}

#[cfg(debug_assertions)]
impl Drop for ChapterData {
    fn drop(&mut self) {
        if !self.cleaned && (!self.cleanups.is_empty() || self.holds_archived_content()) {
            tracing::warn!(
                title = ?self.attributes.get(attributes::TITLE),
                pending = self.cleanups.len(),
                "chapter dropped without cleanup",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn titles(chapter: &Chapter) -> Vec<String> {
        chapter.iter().map(|child| child.display_name()).collect()
    }

    #[test]
    fn test_append_sets_parent() {
        let root = Chapter::with_title("root");
        let child = Chapter::with_title("child");

        root.append(child.clone()).unwrap();

        assert!(child.parent().unwrap().ptr_eq(&root));
        assert_eq!(1, child.depth());
        assert!(root.is_section());
        assert!(!child.is_section());
    }

    #[test]
    fn test_attach_invariants() {
        let root = Chapter::with_title("root");
        let child = root.new_chapter("child");
        let grandchild = child.new_chapter("grandchild");

        assert_eq!(
            Err(TreeError::SelfReference("root".into())),
            root.append(root.clone())
        );
        assert_eq!(
            Err(TreeError::Cycle("root".into())),
            grandchild.append(root.clone())
        );
        assert_eq!(
            Err(TreeError::AlreadyAttached("grandchild".into())),
            root.append(grandchild.clone())
        );
        assert_eq!(vec!["child"], titles(&root));
        assert_eq!(vec!["grandchild"], titles(&child));
    }

    #[test]
    fn test_reattach_after_detach() {
        let first = Chapter::new();
        let second = Chapter::new();
        let child = first.new_chapter("moving");

        assert!(second.append(child.clone()).is_err());
        assert!(child.detach());
        assert!(!child.detach());
        second.append(child.clone()).unwrap();

        assert!(first.is_empty());
        assert_eq!(Some(0), second.index_of(&child));
    }

    #[test]
    fn test_insert_replace_remove_swap() {
        let root = Chapter::new();
        let a = root.new_chapter("a");
        root.new_chapter("c");
        root.insert(1, Chapter::with_title("b")).unwrap();
        assert_eq!(vec!["a", "b", "c"], titles(&root));

        let z = Chapter::with_title("z");
        let removed = root.replace_at(0, z.clone()).unwrap();
        assert!(removed.ptr_eq(&a));
        assert!(a.parent().is_none());
        assert_eq!(vec!["z", "b", "c"], titles(&root));

        assert!(!root.replace(&a, Chapter::with_title("y")).unwrap());
        assert!(root.replace(&z, a.clone()).unwrap());

        root.swap(0, 2).unwrap();
        assert_eq!(vec!["c", "b", "a"], titles(&root));

        assert!(root.remove(&a));
        assert!(!root.remove(&a));
        assert_eq!(
            Err(TreeError::IndexOutOfBounds { index: 5, len: 2 }),
            root.insert(5, Chapter::new())
        );
        assert!(root.remove_at(2).is_err());
        assert!(root.swap(0, 2).is_err());
    }

    #[test]
    fn test_cleanup_order_and_idempotence() {
        let calls = Rc::new(RefCell::new(Vec::new()));
        let root = Chapter::with_title("root");
        let child = root.new_chapter("child");

        for (chapter, name) in [(&root, "root-1"), (&root, "root-2"), (&child, "child")] {
            let calls = calls.clone();
            chapter.add_cleanup(move |_| calls.borrow_mut().push(name));
        }

        root.cleanup();
        root.cleanup();

        assert_eq!(vec!["root-1", "root-2", "child"], *calls.borrow());
        assert!(root.is_cleaned() && child.is_cleaned());
        assert!(root.is_empty());
        assert!(root.attributes().is_empty());
        assert!(child.parent().is_none());
    }

    #[test]
    fn test_archived_content_is_tracked() {
        use crate::ebook::archive::{ArchiveReader, DirectoryArchiveReader};
        use crate::ebook::content::Flob;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "a").unwrap();
        let reader: Rc<dyn ArchiveReader> = Rc::new(DirectoryArchiveReader::new(dir.path()).unwrap());
        let archived = || Flob::from_archive(reader.clone(), "a.txt", None).unwrap();

        let plain = Chapter::with_title("plain");
        plain.set_text(Some(Text::from_string("a")));
        assert!(!plain.0.borrow().holds_archived_content());

        let with_text = Chapter::with_title("text");
        with_text.set_text(Some(Text::from_flob(archived(), None)));
        assert!(with_text.0.borrow().holds_archived_content());

        let with_cover = Chapter::with_title("cover");
        with_cover.set_attribute("cover", archived()).unwrap();
        assert!(with_cover.0.borrow().holds_archived_content());

        for chapter in [plain, with_text, with_cover] {
            chapter.cleanup();
            assert!(!chapter.0.borrow().holds_archived_content());
        }
    }

    #[test]
    fn test_remove_cleanup() {
        let counter = Rc::new(Cell::new(0));
        let chapter = Chapter::new();

        let id = {
            let counter = counter.clone();
            chapter.add_cleanup(move |_| counter.set(counter.get() + 1))
        };

        assert!(chapter.remove_cleanup(id));
        assert!(!chapter.remove_cleanup(id));
        chapter.cleanup();
        assert_eq!(0, counter.get());
    }

    #[test]
    fn test_cleanup_detaches_from_parent() {
        let root = Chapter::new();
        let child = root.new_chapter("child");
        root.new_chapter("sibling");

        child.cleanup();

        assert_eq!(vec!["sibling"], titles(&root));
    }

    #[test]
    fn test_clear_without_cleanup() {
        let root = Chapter::new();
        let child = root.new_chapter("child");

        root.clear(false);

        assert!(root.is_empty());
        assert!(child.parent().is_none());
        assert!(!child.is_cleaned());
        assert_eq!("child", child.display_name());
    }

    #[test]
    fn test_clone_tree() {
        let root = Chapter::with_title("root");
        root.new_chapter("a").new_chapter("a.1");
        root.set_text(Some(Text::from_string("body")));

        let shallow = root.clone_tree(false);
        assert!(shallow.is_empty());
        assert_eq!(root.text(), shallow.text());

        let deep = root.clone_tree(true).clone_tree(true);
        assert!(deep.parent().is_none());
        assert_eq!(vec!["a"], titles(&deep));
        assert_eq!(vec!["a.1"], titles(&deep.get(0).unwrap()));
        assert!(!deep.get(0).unwrap().ptr_eq(&root.get(0).unwrap()));

        deep.set_attribute("title", "copy").unwrap();
        assert_eq!(Some(Variant::from("root")), root.attribute("title"));
    }

    #[test]
    fn test_new_chapter_inherits_validator() {
        let root = Chapter::from_attributes(VariantMap::with_validator(Rc::new(
            |key: &str, value: &Variant| match value {
                Variant::String(_) => Ok(()),
                _ => Err(ValidationError::new(key, "strings only")),
            },
        )));
        let child = root.new_chapter("child");

        assert!(child.set_attribute("words", 3).is_err());
        assert!(child.set_attribute("note", "ok").is_ok());
    }
}
