use std::collections::BTreeMap;
use std::time::Instant;

use lopdf::{Dictionary, Document, Object, ObjectId};

use crate::error::{AppError, AppResult};
use crate::models::{NamedBlob, PageSelection};
use crate::services::page_range::parse_page_range;

/// Page attributes a page may inherit from its ancestors in the page tree.
const INHERITABLE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Guards the parent walk against cyclic page trees.
const MAX_TREE_DEPTH: usize = 64;

pub struct PdfProcessor;

impl PdfProcessor {
    pub fn new() -> Self {
        Self
    }

    pub fn page_count(&self, content: &[u8]) -> AppResult<usize> {
        let doc = load_document(content)?;
        Ok(doc.get_pages().len())
    }

    /// Extract the selected pages as single-page PDFs named `page_<N>.pdf`,
    /// with `N` the 1-based page number, in ascending page order.
    pub fn split(&self, content: &[u8], selection: &PageSelection) -> AppResult<Vec<NamedBlob>> {
        let start = Instant::now();
        let doc = load_document(content)?;
        let pages = doc.get_pages();
        let total_pages = pages.len();

        let indices: Vec<usize> = match selection {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Range(expression) => parse_page_range(expression, total_pages),
        };

        tracing::info!(
            total_pages,
            selected_pages = indices.len(),
            "Splitting PDF"
        );

        if indices.is_empty() {
            return Err(AppError::NoPagesSelected);
        }

        let mut results = Vec::with_capacity(indices.len());
        for index in indices {
            let page_number = index as u32 + 1;
            let page_id = *pages.get(&page_number).ok_or_else(|| {
                AppError::processing(format!("Page {} missing from page tree", page_number))
            })?;

            let mut single = doc.clone();
            rebuild_page_tree(&mut single, &[page_id])?;
            let bytes = save_document(single)?;

            tracing::debug!(page = page_number, size = bytes.len(), "Extracted page");
            results.push(NamedBlob::new(format!("page_{}.pdf", page_number), bytes));
        }

        tracing::info!(
            files = results.len(),
            processing_time_ms = start.elapsed().as_millis() as u64,
            "PDF split completed"
        );

        Ok(results)
    }

    /// One page, 1-based, as its own document named `page_<N>.pdf`.
    pub fn extract_page(&self, content: &[u8], page_number: usize) -> AppResult<NamedBlob> {
        self.split(content, &PageSelection::Range(page_number.to_string()))?
            .pop()
            .ok_or(AppError::NoPagesSelected)
    }

    /// Concatenate documents in the given order. A single document is returned untouched.
    pub fn merge(&self, documents: Vec<Vec<u8>>) -> AppResult<Vec<u8>> {
        let start = Instant::now();
        let document_count = documents.len();

        let mut iter = documents.into_iter();
        let first = match iter.next() {
            Some(first) => first,
            None => return Err(AppError::validation("No documents to merge")),
        };
        if document_count == 1 {
            return Ok(first);
        }

        let mut merged = load_numbered(&first, 1)?;
        let mut page_ids: Vec<ObjectId> = merged.get_pages().into_values().collect();
        let mut next_id = merged.max_id + 1;
        let mut imported: BTreeMap<ObjectId, Object> = BTreeMap::new();

        for (offset, bytes) in iter.enumerate() {
            let mut source = load_numbered(&bytes, offset + 2)?;
            source.renumber_objects_with(next_id);
            next_id = source.max_id + 1;

            page_ids.extend(source.get_pages().into_values());
            imported.extend(source.objects);
        }

        merged.objects.extend(imported);
        merged.max_id = next_id - 1;
        rebuild_page_tree(&mut merged, &page_ids)?;

        let total_pages = page_ids.len();
        let bytes = save_document(merged)?;

        tracing::info!(
            documents = document_count,
            total_pages,
            merged_size = bytes.len(),
            processing_time_ms = start.elapsed().as_millis() as u64,
            "PDF merge completed"
        );

        Ok(bytes)
    }

    /// Whether lopdf can write and read back a one-page document.
    pub fn is_available(&self) -> bool {
        let mut buffer = Vec::new();
        if let Err(e) = blank_document().save_to(&mut buffer) {
            tracing::warn!(error = %e, "PDF engine failed to write a blank document");
            return false;
        }
        match self.page_count(&buffer) {
            Ok(1) => true,
            Ok(pages) => {
                tracing::warn!(pages, "PDF engine read back the wrong page count");
                false
            }
            Err(e) => {
                tracing::warn!(error = %e, "PDF engine failed to read a blank document");
                false
            }
        }
    }
}

impl Default for PdfProcessor {
    fn default() -> Self {
        Self::new()
    }
}

fn load_document(content: &[u8]) -> AppResult<Document> {
    Ok(Document::load_mem(content)?)
}

/// A single empty Letter-sized page.
fn blank_document() -> Document {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();

    let mut page = Dictionary::new();
    page.set("Type", Object::Name(b"Page".to_vec()));
    page.set("Parent", Object::Reference(pages_id));
    let media_box = [0, 0, 612, 792].into_iter().map(Object::Integer).collect();
    page.set("MediaBox", Object::Array(media_box));
    let page_id = doc.add_object(page);

    let mut pages = Dictionary::new();
    pages.set("Type", Object::Name(b"Pages".to_vec()));
    pages.set("Kids", Object::Array(vec![Object::Reference(page_id)]));
    pages.set("Count", Object::Integer(1));
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let mut catalog = Dictionary::new();
    catalog.set("Type", Object::Name(b"Catalog".to_vec()));
    catalog.set("Pages", Object::Reference(pages_id));
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", Object::Reference(catalog_id));

    doc
}

fn load_numbered(content: &[u8], position: usize) -> AppResult<Document> {
    Document::load_mem(content)
        .map_err(|e| AppError::unreadable(format!("file {} could not be read: {}", position, e)))
}

fn save_document(mut doc: Document) -> AppResult<Vec<u8>> {
    doc.prune_objects();
    doc.compress();

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::processing(format!("Failed to save PDF: {}", e)))?;
    Ok(buffer)
}

/// Make `page_ids` the only pages of `doc`, in order, as direct children of
/// the catalog's root page node. Inherited attributes are copied onto each page
/// first so detaching it from its old parents does not change how it renders.
fn rebuild_page_tree(doc: &mut Document, page_ids: &[ObjectId]) -> AppResult<()> {
    let root_pages_id = root_pages_id(doc)?;

    for &page_id in page_ids {
        let inherited = collect_inherited(doc, page_id)?;
        let page = doc
            .get_object_mut(page_id)
            .and_then(Object::as_dict_mut)
            .map_err(|e| {
                AppError::processing(format!("Invalid page object {:?}: {}", page_id, e))
            })?;

        for (key, value) in inherited {
            page.set(key, value);
        }
        page.set("Parent", Object::Reference(root_pages_id));
    }

    let root = doc
        .get_object_mut(root_pages_id)
        .and_then(Object::as_dict_mut)
        .map_err(|e| AppError::processing(format!("Invalid page tree root: {}", e)))?;

    let kids = page_ids.iter().map(|&id| Object::Reference(id)).collect::<Vec<_>>();
    root.set("Kids", Object::Array(kids));
    root.set("Count", Object::Integer(page_ids.len() as i64));
    root.remove(b"Parent");

    Ok(())
}

fn root_pages_id(doc: &Document) -> AppResult<ObjectId> {
    let catalog_id = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|_| AppError::unreadable("document has no catalog"))?;

    doc.get_object(catalog_id)
        .and_then(Object::as_dict)
        .and_then(|catalog| catalog.get(b"Pages"))
        .and_then(Object::as_reference)
        .map_err(|_| AppError::unreadable("document catalog has no page tree"))
}

/// Inheritable attributes the page lacks, resolved from the nearest ancestor.
fn collect_inherited(doc: &Document, page_id: ObjectId) -> AppResult<Vec<(Vec<u8>, Object)>> {
    let page = doc
        .get_object(page_id)
        .and_then(Object::as_dict)
        .map_err(|e| AppError::processing(format!("Invalid page object {:?}: {}", page_id, e)))?;

    let mut missing: Vec<&[u8]> = INHERITABLE_KEYS
        .iter()
        .copied()
        .filter(|key| !page.has(key))
        .collect();
    let mut inherited = Vec::new();
    let mut parent = parent_of(page);

    for _ in 0..MAX_TREE_DEPTH {
        if missing.is_empty() {
            break;
        }
        let node = parent.and_then(|id| doc.get_object(id).and_then(Object::as_dict).ok());
        let Some(node) = node else {
            break;
        };

        missing.retain(|key| match node.get(key) {
            Ok(value) => {
                inherited.push((key.to_vec(), value.clone()));
                false
            }
            Err(_) => true,
        });
        parent = parent_of(node);
    }

    Ok(inherited)
}

fn parent_of(node: &Dictionary) -> Option<ObjectId> {
    node.get(b"Parent").and_then(Object::as_reference).ok()
}
