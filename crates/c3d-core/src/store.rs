use std::sync::Arc;

use log::{debug, info, warn};
use tokio::sync::watch;

use crate::error::{Error, Result};
use crate::scene_object::{ObjectId, SceneObject};

/// Immutable, ordered view of the gallery at one point in time.
pub type Snapshot = Arc<Vec<SceneObject>>;

/// The single mutable gallery resource.
///
/// Every mutation is a copy-on-write read-modify-write of the current
/// snapshot followed by a publish on a watch channel, so observers only ever
/// see whole snapshots. No invalidation rules live here; callers apply them.
#[derive(Clone)]
pub struct SceneObjectStore {
    tx: Arc<watch::Sender<Snapshot>>,
}

impl SceneObjectStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(Snapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn snapshot(&self) -> Snapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.tx.subscribe()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Atomically swaps the whole gallery.
    pub fn replace_all(&self, objects: Vec<SceneObject>) -> Snapshot {
        info!("Replacing gallery with {} objects", objects.len());
        let snapshot = Arc::new(objects);
        self.tx.send_replace(snapshot.clone());
        snapshot
    }

    pub fn clear(&self) -> Snapshot {
        self.replace_all(Vec::new())
    }

    pub fn id_at(&self, index: usize) -> Option<ObjectId> {
        self.tx.borrow().get(index).map(|obj| obj.id)
    }

    pub fn position_of(&self, id: ObjectId) -> Option<usize> {
        self.tx.borrow().iter().position(|obj| obj.id == id)
    }

    pub fn get(&self, id: ObjectId) -> Option<SceneObject> {
        self.tx.borrow().iter().find(|obj| obj.id == id).cloned()
    }

    /// Out-of-range indices are a logged no-op.
    pub fn update_at(&self, index: usize, f: impl FnOnce(&mut SceneObject)) -> bool {
        let mut len = 0;
        let updated = self.tx.send_if_modified(|snapshot| {
            len = snapshot.len();
            if index >= len {
                return false;
            }
            f(&mut Arc::make_mut(snapshot)[index]);
            true
        });
        if !updated {
            warn!("Ignoring update for index {} (gallery has {} objects)", index, len);
        }
        updated
    }

    /// Updates the object with `id` if it still exists. Returns false for
    /// objects that were deleted or replaced in the meantime.
    pub fn update(&self, id: ObjectId, f: impl FnOnce(&mut SceneObject)) -> bool {
        let updated = self.tx.send_if_modified(|snapshot| {
            let Some(pos) = snapshot.iter().position(|obj| obj.id == id) else {
                return false;
            };
            f(&mut Arc::make_mut(snapshot)[pos]);
            true
        });
        if !updated {
            debug!("Discarding update for vanished object {}", id);
        }
        updated
    }

    /// Like [`update`](Self::update), but `f` may decline the write by
    /// returning false, in which case nothing is published.
    pub fn update_if(&self, id: ObjectId, f: impl FnOnce(&mut SceneObject) -> bool) -> bool {
        self.tx.send_if_modified(|snapshot| {
            let Some(pos) = snapshot.iter().position(|obj| obj.id == id) else {
                debug!("Discarding update for vanished object {}", id);
                return false;
            };
            let mut draft = snapshot[pos].clone();
            if !f(&mut draft) {
                return false;
            }
            Arc::make_mut(snapshot)[pos] = draft;
            true
        })
    }

    pub fn update_all(&self, mut f: impl FnMut(&mut SceneObject)) -> Snapshot {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.is_empty() {
                return false;
            }
            Arc::make_mut(snapshot).iter_mut().for_each(&mut f);
            true
        });
        self.snapshot()
    }

    /// Removes the object at `index`, closing the gap.
    pub fn delete_at(&self, index: usize) -> Option<SceneObject> {
        let mut removed = None;
        let mut len = 0;
        self.tx.send_if_modified(|snapshot| {
            len = snapshot.len();
            if index >= len {
                return false;
            }
            removed = Some(Arc::make_mut(snapshot).remove(index));
            true
        });
        if removed.is_none() {
            warn!("Ignoring delete for index {} (gallery has {} objects)", index, len);
        }
        removed
    }

    /// Validates and mutates in one step; nothing is published when `f`
    /// returns an error.
    pub(crate) fn try_modify<R>(&self, f: impl FnOnce(&mut Vec<SceneObject>) -> Result<R>) -> Result<R> {
        let mut out: Result<R> = Err(Error::Service("store update was not applied".into()));
        self.tx.send_if_modified(|snapshot| {
            let mut draft = snapshot.as_ref().clone();
            let result = f(&mut draft);
            let ok = result.is_ok();
            if ok {
                *snapshot = Arc::new(draft);
            }
            out = result;
            ok
        });
        out
    }
}

impl Default for SceneObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene_object::ImageState;

    fn store_with(titles: &[&str]) -> SceneObjectStore {
        let store = SceneObjectStore::new();
        store.replace_all(titles.iter().map(|t| SceneObject::new(*t, format!("a {t}"))).collect());
        store
    }

    fn titles(store: &SceneObjectStore) -> Vec<String> {
        store.snapshot().iter().map(|o| o.title.clone()).collect()
    }

    #[test]
    fn test_replace_all_keeps_proposal_order() {
        let store = store_with(&["Chair", "Table", "Lamp"]);
        assert_eq!(titles(&store), vec!["Chair", "Table", "Lamp"]);
    }

    #[test]
    fn test_delete_closes_gap() {
        let store = store_with(&["Chair", "Table", "Lamp"]);
        let removed = store.delete_at(1).unwrap();
        assert_eq!(removed.title, "Table");
        assert_eq!(titles(&store), vec!["Chair", "Lamp"]);
    }

    #[test]
    fn test_out_of_range_is_noop() {
        let store = store_with(&["Chair"]);
        let before = store.snapshot();

        assert!(!store.update_at(5, |o| o.title = "Nope".into()));
        assert!(store.delete_at(5).is_none());

        assert_eq!(*store.snapshot(), *before);
    }

    #[test]
    fn test_snapshots_are_copy_on_write() {
        let store = store_with(&["Chair"]);
        let before = store.snapshot();

        store.update_at(0, |o| o.image_state = ImageState::Generating);

        assert_eq!(before[0].image_state, ImageState::Empty);
        assert_eq!(store.snapshot()[0].image_state, ImageState::Generating);
    }

    #[test]
    fn test_update_by_id_follows_object_after_delete() {
        let store = store_with(&["Chair", "Table"]);
        let table = store.id_at(1).unwrap();

        store.delete_at(0);
        assert!(store.update(table, |o| o.description = "oak".into()));

        assert_eq!(store.position_of(table), Some(0));
        assert_eq!(store.get(table).unwrap().description, "oak");
    }

    #[test]
    fn test_update_by_id_discards_vanished_object() {
        let store = store_with(&["Chair"]);
        let chair = store.id_at(0).unwrap();
        store.clear();
        assert!(!store.update(chair, |o| o.title = "Ghost".into()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_update_if_can_decline() {
        let store = store_with(&["Chair"]);
        let chair = store.id_at(0).unwrap();
        let rx = store.subscribe();

        assert!(!store.update_if(chair, |o| {
            o.title = "Ignored".into();
            false
        }));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(titles(&store), vec!["Chair"]);
    }

    #[test]
    fn test_try_modify_publishes_only_on_success() {
        let store = store_with(&["Chair"]);
        let rx = store.subscribe();

        let rejected: Result<()> = store.try_modify(|objects| {
            objects[0].title = "Changed".into();
            Err(Error::BatchActive)
        });
        assert!(matches!(rejected, Err(Error::BatchActive)));
        assert!(!rx.has_changed().unwrap());
        assert_eq!(titles(&store), vec!["Chair"]);

        let len = store
            .try_modify(|objects| {
                objects[0].title = "Stool".into();
                Ok(objects.len())
            })
            .unwrap();
        assert_eq!(len, 1);
        assert!(rx.has_changed().unwrap());
        assert_eq!(titles(&store), vec!["Stool"]);
    }
}
