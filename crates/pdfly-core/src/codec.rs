//! Document codec adapter
//!
//! Wraps lopdf's object model behind the handful of calls the transforms need:
//! load and save byte buffers, copy pages between documents, and build pages
//! from embedded images. Page indices at this layer are 0-based.

use crate::error::PdfError;
use crate::input::ImageFormat;
use crate::raster::encode_image;
use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use std::collections::BTreeMap;

const PDF_VERSION: &str = "1.7";

/// Page attributes that may be inherited from ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guard against cyclic `/Parent` chains in malformed files
const MAX_TREE_DEPTH: usize = 64;

/// In-memory PDF document
pub struct PdfDocument {
    inner: Document,
}

/// A page living in a destination document's object table.
///
/// Returned by [`PdfDocument::copy_pages`]; it only shows up in the output
/// once passed to [`PdfDocument::add_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRef {
    id: ObjectId,
}

/// An embedded image XObject with its intrinsic pixel size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageHandle {
    id: ObjectId,
    width: u32,
    height: u32,
}

impl ImageHandle {
    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

impl PdfDocument {
    /// Parse a byte buffer
    pub fn load(bytes: &[u8]) -> Result<Self, PdfError> {
        let inner =
            Document::load_mem(bytes).map_err(|e| PdfError::CorruptDocument(e.to_string()))?;
        let doc = Self { inner };
        // A document whose page tree can't be located is unusable for every operation
        doc.pages_root()?;
        Ok(doc)
    }

    /// An empty document with a catalog and a zero-page tree
    pub fn create() -> Self {
        let mut inner = Document::with_version(PDF_VERSION);
        let pages_id = inner.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Pages".to_vec())),
            ("Kids", Object::Array(vec![])),
            ("Count", Object::Integer(0)),
        ]));
        let catalog_id = inner.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Catalog".to_vec())),
            ("Pages", Object::Reference(pages_id)),
        ]));
        inner.trailer.set("Root", Object::Reference(catalog_id));
        Self { inner }
    }

    pub fn page_count(&self) -> usize {
        self.inner.get_pages().len()
    }

    /// Page object ids in document order
    fn page_ids(&self) -> Vec<ObjectId> {
        self.inner.get_pages().into_values().collect()
    }

    fn page_id(&self, index: usize) -> Result<ObjectId, PdfError> {
        let ids = self.page_ids();
        ids.get(index).copied().ok_or(PdfError::PageIndexOutOfRange {
            page: page_number(index),
            page_count: ids.len() as u32,
        })
    }

    /// Copy pages of `source` into this document's object table.
    ///
    /// Every index is checked before anything is copied, so a bad index leaves
    /// this document untouched. `source` is never modified. Resources shared by
    /// several of the requested pages are copied once per call.
    pub fn copy_pages(
        &mut self,
        source: &PdfDocument,
        indices: &[usize],
    ) -> Result<Vec<PageRef>, PdfError> {
        let source_pages = source.page_ids();
        if let Some(&bad) = indices.iter().find(|&&i| i >= source_pages.len()) {
            return Err(PdfError::PageIndexOutOfRange {
                page: page_number(bad),
                page_count: source_pages.len() as u32,
            });
        }

        let mut importer = PageImporter::new(&source.inner);
        indices
            .iter()
            .map(|&i| importer.import_page(&mut self.inner, source_pages[i]))
            .collect()
    }

    /// Append a page to the end of the page tree
    pub fn add_page(&mut self, page: PageRef) -> Result<(), PdfError> {
        let pages_id = self.pages_root()?;

        match self.inner.objects.get_mut(&page.id) {
            Some(Object::Dictionary(dict)) => dict.set("Parent", Object::Reference(pages_id)),
            _ => {
                return Err(PdfError::CorruptDocument(format!(
                    "page object {:?} missing",
                    page.id
                )))
            }
        }

        match self.inner.objects.get_mut(&pages_id) {
            Some(Object::Dictionary(pages)) => {
                let mut kids = match pages.get(b"Kids") {
                    Ok(Object::Array(kids)) => kids.clone(),
                    _ => Vec::new(),
                };
                kids.push(Object::Reference(page.id));
                let count = pages.get(b"Count").and_then(Object::as_i64).unwrap_or(0) + 1;
                pages.set("Kids", Object::Array(kids));
                pages.set("Count", Object::Integer(count));
                Ok(())
            }
            _ => Err(PdfError::CorruptDocument("invalid pages dictionary".into())),
        }
    }

    /// Embed a JPEG or PNG as an image XObject
    pub fn embed_image(
        &mut self,
        bytes: &[u8],
        format: ImageFormat,
    ) -> Result<ImageHandle, PdfError> {
        let encoded = encode_image(bytes, format)?;
        let mut xobject = encoded.xobject;
        if let Some(mask) = encoded.smask {
            let mask_id = self.inner.add_object(mask);
            xobject.dict.set("SMask", Object::Reference(mask_id));
        }
        let id = self.inner.add_object(xobject);
        Ok(ImageHandle {
            id,
            width: encoded.width,
            height: encoded.height,
        })
    }

    /// Append a page exactly the size of `image`, drawn at the origin at
    /// its native size
    pub fn add_image_page(&mut self, image: ImageHandle) -> Result<PageRef, PdfError> {
        let (w, h) = (image.width as i64, image.height as i64);
        let int = Object::Integer;
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![int(w), int(0), int(0), int(h), int(0), int(0)],
                ),
                Operation::new("Do", vec![Object::Name(b"Image0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let encoded = content
            .encode()
            .map_err(|e| PdfError::Serialization(format!("content stream: {}", e)))?;
        let content_id = self.inner.add_object(Stream::new(Dictionary::new(), encoded));

        let resources = Dictionary::from_iter(vec![(
            "XObject",
            Object::Dictionary(Dictionary::from_iter(vec![(
                "Image0",
                Object::Reference(image.id),
            )])),
        )]);
        let page_id = self.inner.add_object(Dictionary::from_iter(vec![
            ("Type", Object::Name(b"Page".to_vec())),
            ("MediaBox", Object::Array(vec![int(0), int(0), int(w), int(h)])),
            ("Resources", Object::Dictionary(resources)),
            ("Contents", Object::Reference(content_id)),
        ]));

        let page = PageRef { id: page_id };
        self.add_page(page)?;
        Ok(page)
    }

    /// Serialize to bytes. Streams are written as they are held; nothing is
    /// re-encoded here.
    pub fn save(&mut self) -> Result<Vec<u8>, PdfError> {
        let mut buffer = Vec::new();
        self.inner
            .save_to(&mut buffer)
            .map_err(|e| PdfError::Serialization(format!("Failed to save PDF: {}", e)))?;
        Ok(buffer)
    }

    /// Width and height of a page's media box in points
    pub fn page_size(&self, index: usize) -> Result<(f64, f64), PdfError> {
        let page_id = self.page_id(index)?;
        let media_box = inherited_attribute(&self.inner, page_id, b"MediaBox")
            .ok_or_else(|| PdfError::CorruptDocument("page has no MediaBox".into()))?;
        let media_box = match media_box {
            Object::Reference(id) => self
                .inner
                .get_object(id)
                .map_err(|e| PdfError::CorruptDocument(e.to_string()))?
                .clone(),
            other => other,
        };
        let values: Vec<f64> = media_box
            .as_array()
            .map_err(|e| PdfError::CorruptDocument(format!("MediaBox: {}", e)))?
            .iter()
            .filter_map(as_number)
            .collect();
        match values.as_slice() {
            [x0, y0, x1, y1] => Ok(((x1 - x0).abs(), (y1 - y0).abs())),
            _ => Err(PdfError::CorruptDocument("malformed MediaBox".into())),
        }
    }

    /// Decoded content stream bytes of a page
    pub fn page_content(&self, index: usize) -> Result<Vec<u8>, PdfError> {
        let page_id = self.page_id(index)?;
        self.inner
            .get_page_content(page_id)
            .map_err(|e| PdfError::CorruptDocument(e.to_string()))
    }

    pub(crate) fn lopdf(&self) -> &Document {
        &self.inner
    }

    pub(crate) fn lopdf_mut(&mut self) -> &mut Document {
        &mut self.inner
    }

    fn pages_root(&self) -> Result<ObjectId, PdfError> {
        let root = || -> lopdf::Result<ObjectId> {
            let catalog_id = self.inner.trailer.get(b"Root")?.as_reference()?;
            self.inner
                .get_dictionary(catalog_id)?
                .get(b"Pages")?
                .as_reference()
        };
        root().map_err(|e| PdfError::CorruptDocument(format!("no page tree: {}", e)))
    }
}

/// 1-based page number for a 0-based index, saturating for indices no real
/// document can reach
fn page_number(index: usize) -> u32 {
    u32::try_from(index)
        .ok()
        .and_then(|n| n.checked_add(1))
        .unwrap_or(u32::MAX)
}

fn as_number(object: &Object) -> Option<f64> {
    match object {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(r) => Some(*r as f64),
        _ => None,
    }
}

/// Look up a page attribute, walking up `/Parent` links when the page itself
/// doesn't carry it
fn inherited_attribute(doc: &Document, page_id: ObjectId, key: &[u8]) -> Option<Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value.clone());
        }
        let parent = node.get(b"Parent").and_then(Object::as_reference).ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn is_page_tree_node(dict: &Dictionary) -> bool {
    dict.get(b"Type")
        .and_then(Object::as_name)
        .map(|name| name == b"Page" || name == b"Pages")
        .unwrap_or(false)
}

/// Deep-copies the object graph reachable from source pages into a
/// destination document, renumbering every object it touches.
struct PageImporter<'a> {
    source: &'a Document,
    copied: BTreeMap<ObjectId, ObjectId>,
    /// The source page being imported and its copy; back-references such as
    /// an annotation's `/P` resolve to the copy.
    current: Option<(ObjectId, ObjectId)>,
}

impl<'a> PageImporter<'a> {
    fn new(source: &'a Document) -> Self {
        Self {
            source,
            copied: BTreeMap::new(),
            current: None,
        }
    }

    fn import_page(&mut self, dest: &mut Document, page_id: ObjectId) -> Result<PageRef, PdfError> {
        let mut page = self
            .source
            .get_dictionary(page_id)
            .map_err(|e| PdfError::CorruptDocument(format!("page {:?}: {}", page_id, e)))?
            .clone();

        // Flatten inherited attributes: the copy gets a new parent
        for key in INHERITABLE {
            if !page.has(key) {
                if let Some(value) = inherited_attribute(self.source, page_id, key) {
                    page.set(key, value);
                }
            }
        }
        page.remove(b"Parent");

        let copy_id = dest.new_object_id();
        self.current = Some((page_id, copy_id));
        self.remap_dict(dest, &mut page);
        self.current = None;

        dest.objects.insert(copy_id, Object::Dictionary(page));
        Ok(PageRef { id: copy_id })
    }

    fn remap(&mut self, dest: &mut Document, object: Object) -> Object {
        match object {
            Object::Reference(id) => self.follow(dest, id),
            Object::Array(items) => {
                Object::Array(items.into_iter().map(|o| self.remap(dest, o)).collect())
            }
            Object::Dictionary(mut dict) => {
                self.remap_dict(dest, &mut dict);
                Object::Dictionary(dict)
            }
            Object::Stream(mut stream) => {
                self.remap_dict(dest, &mut stream.dict);
                Object::Stream(stream)
            }
            other => other,
        }
    }

    fn remap_dict(&mut self, dest: &mut Document, dict: &mut Dictionary) {
        for (_, value) in dict.iter_mut() {
            let taken = std::mem::replace(value, Object::Null);
            *value = self.remap(dest, taken);
        }
    }

    fn follow(&mut self, dest: &mut Document, id: ObjectId) -> Object {
        if let Some((source_page, copy)) = self.current {
            if id == source_page {
                return Object::Reference(copy);
            }
        }
        if let Some(&copy) = self.copied.get(&id) {
            return Object::Reference(copy);
        }

        let object = match self.source.get_object(id) {
            Ok(object) => object.clone(),
            Err(_) => return Object::Null,
        };
        // Other pages and tree nodes never come along with a copied page
        if let Object::Dictionary(dict) = &object {
            if is_page_tree_node(dict) {
                return Object::Null;
            }
        }

        let copy = dest.new_object_id();
        self.copied.insert(id, copy);
        let remapped = self.remap(dest, object);
        dest.objects.insert(copy, remapped);
        Object::Reference(copy)
    }
}
