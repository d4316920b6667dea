use log::warn;

use lockstep_shared::{ObjectId, ObjectMaster, SharedMaster, View};

/// A named arrangement of views. Owns the masters of its views; a view
/// refers back to its layout while it is part of it.
pub struct Layout {
    id: ObjectId,
    name: String,
    views: Vec<SharedMaster<View>>,
}

impl Layout {
    pub fn new(id: ObjectId, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            views: Vec::new(),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn views(&self) -> &[SharedMaster<View>] {
        &self.views
    }

    pub fn view(&self, view_id: ObjectId) -> Option<SharedMaster<View>> {
        self.views
            .iter()
            .find(|view| view.lock().object_id() == view_id)
            .cloned()
    }

    /// Takes ownership of `view` and makes it replicable under `view_id`
    pub fn add_view(&mut self, view_id: ObjectId, mut view: View) -> SharedMaster<View> {
        view.set_layout(Some(self.id));
        let master = ObjectMaster::new(view_id, view).into_shared();
        self.views.push(master.clone());
        master
    }

    /// Detaches a view. The returned master no longer refers to this layout.
    pub fn remove_view(&mut self, view_id: ObjectId) -> Option<SharedMaster<View>> {
        let index = self
            .views
            .iter()
            .position(|view| view.lock().object_id() == view_id)?;
        let master = self.views.remove(index);
        master.lock().state_mut().set_layout(None);
        Some(master)
    }
}

impl Drop for Layout {
    fn drop(&mut self) {
        for view in self.views.drain(..) {
            let mut master = view.lock();
            if master.slave_count() > 0 {
                warn!(
                    "Layout {} dropped while {} is still mapped",
                    self.name,
                    master.object_id()
                );
            }
            master.state_mut().set_layout(None);
        }
    }
}
