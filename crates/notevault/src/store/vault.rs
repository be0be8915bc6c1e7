use super::backend::StorageBackend;
use super::fs_backend::FsBackend;
use super::records::RecordStore;
use super::RecoveryReport;
use crate::config::VaultConfig;
use crate::error::{IntegrityViolation, Result, VaultError};
use crate::model::{
    Color, Container, DeletedRecord, Document, Entity, HierarchyItem, PageSize, RecordKind,
};
use crate::trash::Trash;
use log::{debug, info, warn};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Field edits for [`Vault::update_document_metadata`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DocumentUpdate {
    pub name: Option<String>,
    pub page_size: Option<PageSize>,
}

/// Field edits for [`Vault::update_container_metadata`].
///
/// `color: Some(None)` clears the color.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContainerUpdate {
    pub name: Option<String>,
    pub color: Option<Option<Color>>,
}

/// The document store: documents and containers over one storage root, with deletes
/// routed through the trash.
///
/// Every operation that assigns a parent or removes containers holds `hierarchy`
/// from the parent check through the save, so two reparents cannot both pass the
/// cycle check against a tree the other is about to change.
pub struct Vault<B: StorageBackend> {
    backend: Arc<B>,
    documents: RecordStore<Document, B>,
    containers: RecordStore<Container, B>,
    trash: Arc<Trash<B>>,
    hierarchy: Mutex<()>,
}

impl Vault<FsBackend> {
    /// Opens (or lazily creates) a vault rooted at `root`. Nothing is read until the
    /// first load.
    pub fn open(root: impl Into<PathBuf>, config: &VaultConfig) -> Self {
        let backend = FsBackend::new(root).with_sync_writes(config.sync_writes);
        Self::with_backend(Arc::new(backend))
    }

    pub fn root(&self) -> &std::path::Path {
        self.backend.root()
    }
}

impl<B: StorageBackend> Vault<B> {
    pub fn with_backend(backend: Arc<B>) -> Self {
        Self {
            documents: RecordStore::new(Arc::clone(&backend)),
            containers: RecordStore::new(Arc::clone(&backend)),
            trash: Arc::new(Trash::new(Arc::clone(&backend))),
            hierarchy: Mutex::new(()),
            backend,
        }
    }

    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// The trash shares this vault's backend. Clone the `Arc` to hand it to a
    /// [`crate::trash::TrashSweeper`].
    pub fn trash(&self) -> &Arc<Trash<B>> {
        &self.trash
    }

    // --- Documents ---

    pub fn save_document(&self, doc: &Document) -> Result<()> {
        self.documents.save(doc)
    }

    pub fn load_document(&self, id: &Uuid) -> Result<Document> {
        self.documents.load(id)
    }

    /// Creates and saves a one-page document under `parent`.
    pub fn create_document(&self, name: &str, parent: Option<Uuid>) -> Result<Document> {
        let _guard = self.hierarchy.lock();
        self.require_parent(parent)?;
        let doc = Document::new(name, parent);
        self.documents.save(&doc)?;
        debug!("event=document_created id={} parent={:?}", doc.id, parent);
        Ok(doc)
    }

    /// Documents directly inside `parent` (`None` for the root), sorted by name.
    pub fn documents_in(&self, parent: Option<Uuid>) -> Result<Vec<Document>> {
        let mut docs = self.documents.load_children(parent)?;
        sort_by_name(&mut docs);
        Ok(docs)
    }

    pub fn all_documents(&self) -> Result<Vec<Document>> {
        let mut docs = self.documents.load_all()?;
        sort_by_name(&mut docs);
        Ok(docs)
    }

    pub fn move_document(&self, id: &Uuid, new_parent: Option<Uuid>) -> Result<Document> {
        let _guard = self.hierarchy.lock();
        self.require_parent(new_parent)?;
        let mut doc = self.documents.load(id)?;
        doc.set_parent_id(new_parent);
        doc.touch();
        self.documents.save(&doc)?;
        Ok(doc)
    }

    pub fn rename_document(&self, id: &Uuid, name: &str) -> Result<Document> {
        rename(&self.documents, id, name)
    }

    pub fn update_document_metadata(&self, id: &Uuid, update: DocumentUpdate) -> Result<Document> {
        let mut doc = self.documents.load(id)?;
        if let Some(name) = update.name {
            doc.name = name;
        }
        if let Some(page_size) = update.page_size {
            doc.page_size = page_size;
        }
        doc.touch();
        self.documents.save(&doc)?;
        Ok(doc)
    }

    /// Load, edit the pages with `edit`, save.
    ///
    /// Nothing is written if `edit` fails or leaves the document without pages.
    pub fn update_document_pages<F>(&self, id: &Uuid, edit: F) -> Result<Document>
    where
        F: FnOnce(&mut Document) -> Result<()>,
    {
        let mut doc = self.documents.load(id)?;
        edit(&mut doc)?;
        doc.touch();
        self.documents.save(&doc)?;
        Ok(doc)
    }

    /// Deletes a document. A soft delete returns the trash record it produced.
    pub fn delete_document(&self, id: &Uuid, permanent: bool) -> Result<Vec<DeletedRecord>> {
        let mut staged = Vec::new();
        self.delete_document_into(id, permanent, &mut staged)?;
        Ok(staged)
    }

    fn delete_document_into(
        &self,
        id: &Uuid,
        permanent: bool,
        staged: &mut Vec<DeletedRecord>,
    ) -> Result<()> {
        if permanent {
            if !self.documents.remove(id)? {
                return Err(VaultError::not_found(RecordKind::Document, *id));
            }
            debug!("event=document_purged id={}", id);
            return Ok(());
        }

        let doc = self.documents.load(id)?;
        let record = self.trash.stage(&Entity::Document(doc))?;
        self.documents.remove(id)?;
        staged.push(record);
        Ok(())
    }

    // --- Containers ---

    /// Saves a container built elsewhere. Its parent reference goes through the same
    /// cycle check as [`move_container`](Self::move_container).
    pub fn save_container(&self, container: &Container) -> Result<()> {
        let _guard = self.hierarchy.lock();
        if let Some(parent) = container.parent_id {
            if parent == container.id {
                return Err(IntegrityViolation::SelfParent(container.id).into());
            }
            self.reject_cycle(container.id, parent)?;
        }
        self.containers.save(container)
    }

    pub fn load_container(&self, id: &Uuid) -> Result<Container> {
        self.containers.load(id)
    }

    pub fn create_container(&self, name: &str, parent: Option<Uuid>) -> Result<Container> {
        let _guard = self.hierarchy.lock();
        self.require_parent(parent)?;
        let container = Container::new(name, parent);
        self.containers.save(&container)?;
        debug!(
            "event=container_created id={} parent={:?}",
            container.id, parent
        );
        Ok(container)
    }

    pub fn containers_in(&self, parent: Option<Uuid>) -> Result<Vec<Container>> {
        let mut containers = self.containers.load_children(parent)?;
        sort_by_name(&mut containers);
        Ok(containers)
    }

    pub fn all_containers(&self) -> Result<Vec<Container>> {
        let mut containers = self.containers.load_all()?;
        sort_by_name(&mut containers);
        Ok(containers)
    }

    /// Number of documents and containers directly inside `parent`.
    pub fn item_count(&self, parent: Option<Uuid>) -> Result<usize> {
        Ok(self.documents.load_children(parent)?.len()
            + self.containers.load_children(parent)?.len())
    }

    /// Reparents a container after checking the new parent exists and is not the
    /// container itself or one of its descendants.
    pub fn move_container(&self, id: &Uuid, new_parent: Option<Uuid>) -> Result<Container> {
        let _guard = self.hierarchy.lock();
        let mut container = self.containers.load(id)?;
        if let Some(parent) = new_parent {
            if parent == *id {
                return Err(IntegrityViolation::SelfParent(*id).into());
            }
            self.require_parent(Some(parent))?;
            self.reject_cycle(*id, parent)?;
        }
        container.set_parent_id(new_parent);
        container.touch();
        self.containers.save(&container)?;
        Ok(container)
    }

    pub fn rename_container(&self, id: &Uuid, name: &str) -> Result<Container> {
        rename(&self.containers, id, name)
    }

    pub fn update_container_metadata(
        &self,
        id: &Uuid,
        update: ContainerUpdate,
    ) -> Result<Container> {
        let mut container = self.containers.load(id)?;
        if let Some(name) = update.name {
            container.name = name;
        }
        if let Some(color) = update.color {
            container.color = color;
        }
        container.touch();
        self.containers.save(&container)?;
        Ok(container)
    }

    /// Deletes a container and everything under it, children first.
    ///
    /// A soft delete produces one trash record per document and per container in the
    /// subtree.
    pub fn delete_container(&self, id: &Uuid, permanent: bool) -> Result<Vec<DeletedRecord>> {
        let _guard = self.hierarchy.lock();
        let mut staged = Vec::new();
        let mut visited = HashSet::new();
        self.delete_container_into(id, permanent, &mut staged, &mut visited)?;
        if !staged.is_empty() {
            info!(
                "event=container_trashed id={} records={}",
                id,
                staged.len()
            );
        }
        Ok(staged)
    }

    fn delete_container_into(
        &self,
        id: &Uuid,
        permanent: bool,
        staged: &mut Vec<DeletedRecord>,
        visited: &mut HashSet<Uuid>,
    ) -> Result<()> {
        if !visited.insert(*id) {
            warn!("event=cascade_cycle id={}", id);
            return Ok(());
        }
        let container = self.containers.load(id)?;

        // Each document and each container in the subtree, this one included, gets
        // its own trash record.
        for doc in self.documents.load_children(Some(*id))? {
            self.delete_document_into(&doc.id, permanent, staged)?;
        }
        for child in self.containers.load_children(Some(*id))? {
            self.delete_container_into(&child.id, permanent, staged, visited)?;
        }

        if !permanent {
            staged.push(self.trash.stage(&Entity::Container(container))?);
        }
        self.containers.remove(id)?;
        Ok(())
    }

    /// Containers from the root down to `id`.
    ///
    /// A dangling or corrupt parent stops the walk and returns what resolved so far.
    pub fn resolve_path(&self, id: Option<Uuid>) -> Result<Vec<Container>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = id;

        while let Some(current) = cursor {
            if !seen.insert(current) {
                warn!("event=parent_cycle id={}", current);
                break;
            }
            match self.containers.load(&current) {
                Ok(container) => {
                    cursor = container.parent_id;
                    chain.push(container);
                }
                Err(err) if err.is_not_found() || err.is_corrupt() => {
                    warn!(
                        "event=broken_parent_chain id={} resolved={} error=\"{}\"",
                        current,
                        chain.len(),
                        err
                    );
                    break;
                }
                Err(err) => return Err(err),
            }
        }

        chain.reverse();
        Ok(chain)
    }

    // --- Trash ---

    /// Brings a trash record back to life.
    ///
    /// The entity goes back under its old parent when that container still exists,
    /// otherwise to the root. The trash record is only dropped after the save.
    pub fn restore(&self, deleted_id: &Uuid) -> Result<Entity> {
        let _guard = self.hierarchy.lock();
        let record = self.trash.get(deleted_id)?;
        let mut entity = self.trash.snapshot(&record)?;

        if let Some(parent) = entity.parent_id() {
            if !self.containers.exists(&parent)? {
                warn!(
                    "event=restore_reparented id={} missing_parent={}",
                    entity.id(),
                    parent
                );
                match &mut entity {
                    Entity::Document(doc) => doc.set_parent_id(None),
                    Entity::Container(container) => container.set_parent_id(None),
                }
            }
        }

        match &entity {
            Entity::Document(doc) => self.documents.save(doc)?,
            Entity::Container(container) => self.containers.save(container)?,
        }
        self.trash.purge(deleted_id)?;
        debug!(
            "event=restored id={} kind={:?}",
            entity.id(),
            entity.kind()
        );
        Ok(entity)
    }

    // --- Maintenance ---

    /// Startup maintenance: clears temp files left by interrupted writes, then warms
    /// every cache from disk, quarantining whatever no longer decodes.
    pub fn recover(&self) -> Result<RecoveryReport> {
        let mut report = RecoveryReport::default();
        for kind in RecordKind::ALL {
            report.removed_temp_files += self.backend.remove_stale_temp_files(kind)?;
        }

        self.documents.invalidate();
        self.containers.invalidate();
        self.trash.invalidate();

        report.documents = self.documents.load_all()?.len();
        report.containers = self.containers.load_all()?.len();
        report.deleted = self.trash.load_all()?.len();

        for kind in RecordKind::ALL {
            let count = self.quarantined(kind)?.len();
            if count > 0 {
                report.quarantined.insert(kind, count);
            }
        }

        info!(
            "event=recovery_done temp_removed={} documents={} containers={} deleted={} quarantined={}",
            report.removed_temp_files,
            report.documents,
            report.containers,
            report.deleted,
            report.total_quarantined()
        );
        Ok(report)
    }

    /// File names held in quarantine for `kind`.
    pub fn quarantined(&self, kind: RecordKind) -> Result<Vec<String>> {
        match kind {
            RecordKind::Document => self.documents.quarantined(),
            RecordKind::Container => self.containers.quarantined(),
            RecordKind::Deleted => self.trash.quarantined(),
        }
    }

    fn require_parent(&self, parent: Option<Uuid>) -> Result<()> {
        match parent {
            Some(id) if !self.containers.exists(&id)? => {
                Err(IntegrityViolation::MissingParent(id).into())
            }
            _ => Ok(()),
        }
    }

    /// Walks up from `parent`; finding `id` there means `id` would become its own
    /// ancestor.
    fn reject_cycle(&self, id: Uuid, parent: Uuid) -> Result<()> {
        let mut seen = HashSet::new();
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == id {
                return Err(IntegrityViolation::ParentCycle { id, parent }.into());
            }
            if !seen.insert(current) {
                break;
            }
            cursor = match self.containers.load(&current) {
                Ok(container) => container.parent_id,
                Err(err) if err.is_not_found() || err.is_corrupt() => None,
                Err(err) => return Err(err),
            };
        }
        Ok(())
    }
}

fn rename<T, B>(store: &RecordStore<T, B>, id: &Uuid, name: &str) -> Result<T>
where
    T: HierarchyItem + Serialize + DeserializeOwned,
    B: StorageBackend,
{
    let mut item = store.load(id)?;
    item.set_name(name.to_string());
    item.touch();
    store.save(&item)?;
    Ok(item)
}

/// Case-insensitive by name, then oldest first.
fn sort_by_name<T: HierarchyItem>(items: &mut [T]) {
    items.sort_by(|a, b| {
        a.name()
            .to_lowercase()
            .cmp(&b.name().to_lowercase())
            .then_with(|| a.created_at().cmp(&b.created_at()))
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec;
    use crate::model::{EntityKind, PageTemplate};
    use crate::model::RetentionPolicy;
    use crate::store::mem_backend::MemBackend;
    use std::sync::Barrier;
    use std::thread;

    fn make_vault() -> (Arc<MemBackend>, Vault<MemBackend>) {
        let backend = Arc::new(MemBackend::new());
        let vault = Vault::with_backend(Arc::clone(&backend));
        (backend, vault)
    }

    #[test]
    fn test_create_and_load_document() {
        let (_backend, vault) = make_vault();
        let doc = vault.create_document("Physics", None).unwrap();
        let loaded = vault.load_document(&doc.id).unwrap();
        assert_eq!(loaded, doc);
        assert_eq!(loaded.pages.len(), 1);
    }

    #[test]
    fn test_create_under_missing_parent_is_rejected() {
        let (backend, vault) = make_vault();
        let ghost = Uuid::new_v4();
        let err = vault.create_document("Orphan", Some(ghost)).unwrap_err();
        assert!(matches!(
            err,
            VaultError::Integrity(IntegrityViolation::MissingParent(id)) if id == ghost
        ));
        assert_eq!(backend.slot_count(RecordKind::Document), 0);
    }

    #[test]
    fn test_loaded_copy_does_not_change_store() {
        let (_backend, vault) = make_vault();
        let doc = vault.create_document("Draft", None).unwrap();
        let mut copy = vault.load_document(&doc.id).unwrap();
        copy.name = "Edited locally".into();
        assert_eq!(vault.load_document(&doc.id).unwrap().name, "Draft");
    }

    #[test]
    fn test_listing_sorted_and_filtered() {
        let (_backend, vault) = make_vault();
        let folder = vault.create_container("School", None).unwrap();
        vault.create_document("banana", None).unwrap();
        vault.create_document("Apple", None).unwrap();
        vault.create_document("cherry", Some(folder.id)).unwrap();

        let names: Vec<String> = vault
            .documents_in(None)
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, vec!["Apple", "banana"]);
        assert_eq!(vault.documents_in(Some(folder.id)).unwrap().len(), 1);
        assert_eq!(vault.item_count(None).unwrap(), 3);
        assert_eq!(vault.item_count(Some(folder.id)).unwrap(), 1);
        assert_eq!(vault.all_documents().unwrap().len(), 3);
    }

    #[test]
    fn test_lazy_load_is_idempotent() {
        let (backend, vault) = make_vault();
        let doc = Document::new("Cold", None);
        backend
            .write_slot(RecordKind::Document, &doc.id, &codec::encode(&doc).unwrap())
            .unwrap();

        let first = vault.documents_in(None).unwrap();
        let second = vault.documents_in(None).unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec![doc]);
        assert_eq!(backend.scan_count(), 1);
    }

    #[test]
    fn test_cache_disk_coherence() {
        let (backend, vault) = make_vault();
        let folder = vault.create_container("Target", None).unwrap();
        let doc = vault.create_document("Moving", None).unwrap();
        vault.rename_document(&doc.id, "Moved").unwrap();
        vault.move_document(&doc.id, Some(folder.id)).unwrap();

        let cached = vault.load_document(&doc.id).unwrap();
        let on_disk: Document =
            codec::decode(doc.id, &backend.raw(RecordKind::Document, &doc.id).unwrap()).unwrap();
        assert_eq!(cached, on_disk);
        assert_eq!(cached.name, "Moved");
        assert_eq!(cached.parent_id, Some(folder.id));

        vault.delete_document(&doc.id, true).unwrap();
        assert!(vault.load_document(&doc.id).unwrap_err().is_not_found());
        assert!(backend.raw(RecordKind::Document, &doc.id).is_none());
    }

    #[test]
    fn test_failed_save_keeps_previous_state() {
        let (backend, vault) = make_vault();
        let doc = vault.create_document("Stable", None).unwrap();
        backend.set_simulate_write_error(true);

        assert!(matches!(
            vault.rename_document(&doc.id, "Lost").unwrap_err(),
            VaultError::Io(_)
        ));
        assert_eq!(vault.load_document(&doc.id).unwrap().name, "Stable");
    }

    #[test]
    fn test_cycle_rejection_leaves_tree_unchanged() {
        let (_backend, vault) = make_vault();
        let a = vault.create_container("A", None).unwrap();
        let b = vault.create_container("B", Some(a.id)).unwrap();
        let c = vault.create_container("C", Some(b.id)).unwrap();

        let err = vault.move_container(&a.id, Some(c.id)).unwrap_err();
        assert!(matches!(
            err,
            VaultError::Integrity(IntegrityViolation::ParentCycle { id, parent })
                if id == a.id && parent == c.id
        ));
        assert_eq!(vault.load_container(&a.id).unwrap(), a);
        assert_eq!(vault.load_container(&b.id).unwrap(), b);
        assert_eq!(vault.load_container(&c.id).unwrap(), c);
    }

    #[test]
    fn test_save_container_rejects_cycle() {
        let (_backend, vault) = make_vault();
        let a = vault.create_container("A", None).unwrap();
        let b = vault.create_container("B", Some(a.id)).unwrap();

        let mut looped = vault.load_container(&a.id).unwrap();
        looped.parent_id = Some(b.id);
        assert!(matches!(
            vault.save_container(&looped).unwrap_err(),
            VaultError::Integrity(IntegrityViolation::ParentCycle { .. })
        ));
        assert_eq!(vault.load_container(&a.id).unwrap(), a);
    }

    #[test]
    fn test_concurrent_reparents_never_form_cycle() {
        let (_backend, vault) = make_vault();
        let vault = Arc::new(vault);
        let a = vault.create_container("A", None).unwrap();
        let b = vault.create_container("B", None).unwrap();

        for _ in 0..200 {
            vault.move_container(&a.id, None).unwrap();
            vault.move_container(&b.id, None).unwrap();

            let barrier = Arc::new(Barrier::new(2));
            let workers: Vec<_> = [(a.id, b.id), (b.id, a.id)]
                .into_iter()
                .map(|(child, parent)| {
                    let vault = Arc::clone(&vault);
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        vault.move_container(&child, Some(parent)).is_ok()
                    })
                })
                .collect();
            let moved: Vec<bool> = workers.into_iter().map(|w| w.join().unwrap()).collect();

            assert_eq!(moved.iter().filter(|ok| **ok).count(), 1);
            let a_now = vault.load_container(&a.id).unwrap();
            let b_now = vault.load_container(&b.id).unwrap();
            assert!(!(a_now.parent_id == Some(b.id) && b_now.parent_id == Some(a.id)));
            assert_eq!(vault.containers_in(None).unwrap().len(), 1);
        }
    }

    #[test]
    fn test_sweep_racing_restore_settles_cleanly() {
        let (_backend, vault) = make_vault();
        let vault = Arc::new(vault);

        for _ in 0..100 {
            let record = vault.trash().insert_backdated("Contested", 31);
            let barrier = Arc::new(Barrier::new(2));

            let sweeper = {
                let vault = Arc::clone(&vault);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    vault.trash().sweep_expired(RetentionPolicy::Days(30))
                })
            };
            let restorer = {
                let vault = Arc::clone(&vault);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    vault.restore(&record.id)
                })
            };

            let swept = sweeper.join().unwrap().unwrap();
            assert!(swept <= 1);
            match restorer.join().unwrap() {
                Ok(entity) => {
                    assert_eq!(entity.id(), record.original_id);
                    assert!(vault.load_document(&record.original_id).is_ok());
                    vault.delete_document(&record.original_id, true).unwrap();
                }
                Err(err) => {
                    assert!(err.is_not_found(), "unexpected error: {err}");
                    assert!(vault.load_document(&record.original_id).unwrap_err().is_not_found());
                }
            }
            assert!(vault.trash().get(&record.id).unwrap_err().is_not_found());
        }
        assert!(vault.trash().load_all().unwrap().is_empty());
    }

    #[test]
    fn test_save_document_rejects_empty_pages() {
        let (backend, vault) = make_vault();
        let mut doc = Document::new("Imported", None);
        doc.pages.clear();

        assert!(matches!(
            vault.save_document(&doc).unwrap_err(),
            VaultError::Integrity(IntegrityViolation::LastPage(id)) if id == doc.id
        ));
        assert!(backend.raw(RecordKind::Document, &doc.id).is_none());
        assert!(vault.load_document(&doc.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_self_parent_rejected() {
        let (_backend, vault) = make_vault();
        let a = vault.create_container("A", None).unwrap();
        assert!(matches!(
            vault.move_container(&a.id, Some(a.id)).unwrap_err(),
            VaultError::Integrity(IntegrityViolation::SelfParent(_))
        ));
    }

    #[test]
    fn test_move_container_to_sibling_and_root() {
        let (_backend, vault) = make_vault();
        let a = vault.create_container("A", None).unwrap();
        let b = vault.create_container("B", None).unwrap();

        let moved = vault.move_container(&b.id, Some(a.id)).unwrap();
        assert_eq!(moved.parent_id, Some(a.id));
        let moved = vault.move_container(&b.id, None).unwrap();
        assert_eq!(moved.parent_id, None);
    }

    #[test]
    fn test_cascade_soft_delete() {
        let (_backend, vault) = make_vault();
        let top = vault.create_container("Top", None).unwrap();
        let d1 = vault.create_document("d1", Some(top.id)).unwrap();
        let d2 = vault.create_document("d2", Some(top.id)).unwrap();
        let sub = vault.create_container("Sub", Some(top.id)).unwrap();
        let d3 = vault.create_document("d3", Some(sub.id)).unwrap();
        let bystander = vault.create_document("bystander", None).unwrap();

        // One record per document plus one per container, never a nested snapshot.
        let staged = vault.delete_container(&top.id, false).unwrap();
        assert_eq!(staged.len(), 5);
        assert_eq!(vault.trash().load_all().unwrap().len(), 5);

        let originals: HashSet<Uuid> = staged.iter().map(|r| r.original_id).collect();
        let expected: HashSet<Uuid> = [d1.id, d2.id, d3.id, sub.id, top.id].into_iter().collect();
        assert_eq!(originals, expected);
        // Children are staged before the folder that held them.
        assert_eq!(staged.last().unwrap().original_id, top.id);
        let sub_pos = staged.iter().position(|r| r.original_id == sub.id).unwrap();
        let d3_pos = staged.iter().position(|r| r.original_id == d3.id).unwrap();
        assert!(d3_pos < sub_pos);

        for id in [d1.id, d2.id, d3.id] {
            assert!(vault.load_document(&id).unwrap_err().is_not_found());
        }
        for id in [top.id, sub.id] {
            assert!(vault.load_container(&id).unwrap_err().is_not_found());
        }
        assert_eq!(vault.all_documents().unwrap(), vec![bystander]);
    }

    #[test]
    fn test_cascade_permanent_delete_skips_trash() {
        let (backend, vault) = make_vault();
        let top = vault.create_container("Top", None).unwrap();
        vault.create_document("d1", Some(top.id)).unwrap();
        let sub = vault.create_container("Sub", Some(top.id)).unwrap();
        vault.create_document("d2", Some(sub.id)).unwrap();

        assert!(vault.delete_container(&top.id, true).unwrap().is_empty());
        assert!(vault.trash().load_all().unwrap().is_empty());
        assert_eq!(backend.slot_count(RecordKind::Document), 0);
        assert_eq!(backend.slot_count(RecordKind::Container), 0);
    }

    #[test]
    fn test_soft_delete_then_restore_document() {
        let (_backend, vault) = make_vault();
        let folder = vault.create_container("Home", None).unwrap();
        let doc = vault.create_document("Essay", Some(folder.id)).unwrap();

        let staged = vault.delete_document(&doc.id, false).unwrap();
        assert_eq!(staged.len(), 1);
        assert_eq!(staged[0].kind, EntityKind::Document);
        assert!(vault.load_document(&doc.id).unwrap_err().is_not_found());

        let restored = vault.restore(&staged[0].id).unwrap();
        assert_eq!(restored, Entity::Document(doc.clone()));
        assert_eq!(vault.load_document(&doc.id).unwrap(), doc);
        assert!(vault.trash().load_all().unwrap().is_empty());
    }

    #[test]
    fn test_restore_into_missing_parent_goes_to_root() {
        let (_backend, vault) = make_vault();
        let folder = vault.create_container("Gone soon", None).unwrap();
        let doc = vault.create_document("Survivor", Some(folder.id)).unwrap();
        let staged = vault.delete_document(&doc.id, false).unwrap();
        vault.delete_container(&folder.id, true).unwrap();

        vault.restore(&staged[0].id).unwrap();
        let restored = vault.load_document(&doc.id).unwrap();
        assert_eq!(restored.parent_id, None);
        assert_eq!(vault.documents_in(None).unwrap(), vec![restored]);
    }

    #[test]
    fn test_failed_restore_keeps_trash_record() {
        let (backend, vault) = make_vault();
        let doc = vault.create_document("Keep me", None).unwrap();
        let staged = vault.delete_document(&doc.id, false).unwrap();

        backend.set_simulate_write_error(true);
        assert!(vault.restore(&staged[0].id).is_err());
        backend.set_simulate_write_error(false);

        assert_eq!(vault.trash().get(&staged[0].id).unwrap(), staged[0]);
        assert!(vault.load_document(&doc.id).unwrap_err().is_not_found());
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let (_backend, vault) = make_vault();
        let ghost = Uuid::new_v4();
        assert!(vault.delete_document(&ghost, true).unwrap_err().is_not_found());
        assert!(vault.delete_document(&ghost, false).unwrap_err().is_not_found());
        assert!(vault.delete_container(&ghost, false).unwrap_err().is_not_found());
    }

    #[test]
    fn test_resolve_path_root_to_leaf() {
        let (_backend, vault) = make_vault();
        let a = vault.create_container("A", None).unwrap();
        let b = vault.create_container("B", Some(a.id)).unwrap();
        let c = vault.create_container("C", Some(b.id)).unwrap();

        let names: Vec<String> = vault
            .resolve_path(Some(c.id))
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert!(vault.resolve_path(None).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_path_stops_at_dangling_parent() {
        let (_backend, vault) = make_vault();
        let mut orphan = Container::new("Orphan", Some(Uuid::new_v4()));
        vault.save_container(&orphan).unwrap();
        let child = vault.create_container("Child", Some(orphan.id)).unwrap();

        let path = vault.resolve_path(Some(child.id)).unwrap();
        orphan = vault.load_container(&orphan.id).unwrap();
        assert_eq!(path, vec![orphan, child]);
    }

    #[test]
    fn test_resolve_path_survives_stored_cycle() {
        let (_backend, vault) = make_vault();
        let mut a = Container::new("A", None);
        let b = Container::new("B", Some(a.id));
        a.parent_id = Some(b.id);
        vault.save_container(&a).unwrap();
        vault.save_container(&b).unwrap();

        assert_eq!(vault.resolve_path(Some(b.id)).unwrap().len(), 2);
    }

    #[test]
    fn test_update_metadata() {
        let (_backend, vault) = make_vault();
        let doc = vault.create_document("Sheet", None).unwrap();
        let updated = vault
            .update_document_metadata(
                &doc.id,
                DocumentUpdate {
                    page_size: Some(PageSize::Letter),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "Sheet");
        assert_eq!(updated.page_size, PageSize::Letter);
        assert!(updated.updated_at >= doc.updated_at);

        let folder = vault.create_container("Red", None).unwrap();
        let red = Color::new(255, 0, 0);
        let updated = vault
            .update_container_metadata(
                &folder.id,
                ContainerUpdate {
                    color: Some(Some(red)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.color, Some(red));
        let cleared = vault
            .update_container_metadata(
                &folder.id,
                ContainerUpdate {
                    name: Some("Plain".into()),
                    color: Some(None),
                },
            )
            .unwrap();
        assert_eq!(cleared.name, "Plain");
        assert_eq!(cleared.color, None);
    }

    #[test]
    fn test_update_pages_rejects_last_page_removal() {
        let (_backend, vault) = make_vault();
        let doc = vault.create_document("Notebook", None).unwrap();
        let only = doc.pages[0].id;

        let err = vault
            .update_document_pages(&doc.id, |d| {
                d.remove_page(only)?;
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Integrity(IntegrityViolation::LastPage(_))
        ));
        assert_eq!(vault.load_document(&doc.id).unwrap(), doc);

        let updated = vault
            .update_document_pages(&doc.id, |d| {
                d.add_page(PageTemplate::Dotted);
                Ok(())
            })
            .unwrap();
        assert_eq!(updated.pages.len(), 2);
        assert_eq!(vault.load_document(&doc.id).unwrap().pages.len(), 2);
    }

    #[test]
    fn test_update_pages_rejects_emptied_document() {
        let (_backend, vault) = make_vault();
        let doc = vault.create_document("Notebook", None).unwrap();
        let err = vault
            .update_document_pages(&doc.id, |d| {
                d.pages.clear();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(
            err,
            VaultError::Integrity(IntegrityViolation::LastPage(_))
        ));
        assert_eq!(vault.load_document(&doc.id).unwrap().pages.len(), 1);
    }

    #[test]
    fn test_corrupt_document_is_isolated() {
        let (backend, vault) = make_vault();
        let good = vault.create_document("Good", None).unwrap();
        let bad = Uuid::new_v4();
        backend
            .write_slot(RecordKind::Document, &bad, &[0xde, 0xad, 0xbe, 0xef])
            .unwrap();

        let fresh = Vault::with_backend(Arc::clone(&backend));
        assert_eq!(fresh.documents_in(None).unwrap(), vec![good.clone()]);
        assert_eq!(fresh.quarantined(RecordKind::Document).unwrap().len(), 1);
        assert!(backend.raw(RecordKind::Document, &good.id).is_some());
    }

    #[test]
    fn test_fs_vault_survives_reopen() {
        let env = crate::test_utils::TestEnv::new();
        let folder = env.vault.create_container("Semester", None).unwrap();
        let doc = env.vault.create_document("Week 1", Some(folder.id)).unwrap();
        assert_eq!(env.vault.root(), env.root.as_path());

        let reopened = env.reopen();
        assert_eq!(reopened.documents_in(Some(folder.id)).unwrap(), vec![doc]);
        assert_eq!(reopened.resolve_path(Some(folder.id)).unwrap(), vec![folder]);
    }

    #[test]
    fn test_recover_reports_counts() {
        let (backend, vault) = make_vault();
        let folder = vault.create_container("F", None).unwrap();
        vault.create_document("d", Some(folder.id)).unwrap();
        let gone = vault.create_document("gone", None).unwrap();
        vault.delete_document(&gone.id, false).unwrap();
        backend
            .write_slot(RecordKind::Container, &Uuid::new_v4(), b"junk")
            .unwrap();

        let report = vault.recover().unwrap();
        assert_eq!(report.documents, 1);
        assert_eq!(report.containers, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(report.quarantined.get(&RecordKind::Container), Some(&1));
        assert_eq!(report.total_quarantined(), 1);
    }
}
