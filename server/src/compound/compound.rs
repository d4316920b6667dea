use std::{fmt, sync::Arc};

use log::trace;

use lockstep_shared::{EyeMask, FrameNumber, Frustum, ObserverList, TaskMask, Viewport};

use crate::{
    compound::{ChannelState, InheritData},
    entity::ChannelPath,
};

/// Position of a compound: indices from the config's root list down
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct CompoundPath(Vec<usize>);

impl CompoundPath {
    pub fn root(index: usize) -> Self {
        Self(vec![index])
    }

    pub fn child(&self, index: usize) -> Self {
        let mut indices = self.0.clone();
        indices.push(index);
        Self(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl fmt::Display for CompoundPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let indices: Vec<String> = self.0.iter().map(usize::to_string).collect();
        write!(f, "compound[{}]", indices.join("."))
    }
}

/// Notified when a compound starts updating a frame
pub trait CompoundListener: Send + Sync {
    fn notify_update_pre(&self, compound: &Compound, frame_number: FrameNumber);
}

/// A node of the tree describing how channels cooperate on a frame. Unset
/// attributes are inherited from the parent.
pub struct Compound {
    name: String,
    path: CompoundPath,
    channel: Option<ChannelPath>,
    tasks: Option<TaskMask>,
    eyes: Option<EyeMask>,
    viewport: Viewport,
    frustum: Option<Frustum>,
    swap_barrier: Option<String>,
    activated: bool,
    pub(crate) children: Vec<Compound>,
    inherit: InheritData,
    inherit_frame: Option<FrameNumber>,
    listeners: Arc<ObserverList<dyn CompoundListener>>,
}

impl Compound {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            path: CompoundPath::default(),
            channel: None,
            tasks: None,
            eyes: None,
            viewport: Viewport::FULL,
            frustum: None,
            swap_barrier: None,
            activated: true,
            children: Vec::new(),
            inherit: InheritData::default(),
            inherit_frame: None,
            listeners: Arc::new(ObserverList::new()),
        }
    }

    // Builder

    pub fn with_channel(mut self, channel: ChannelPath) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_tasks(mut self, tasks: TaskMask) -> Self {
        self.tasks = Some(tasks);
        self
    }

    pub fn with_eyes(mut self, eyes: EyeMask) -> Self {
        self.eyes = Some(eyes);
        self
    }

    /// Area of the parent's destination this compound covers
    pub fn with_viewport(mut self, viewport: Viewport) -> Self {
        self.viewport = viewport;
        self
    }

    pub fn with_frustum(mut self, frustum: Frustum) -> Self {
        self.frustum = Some(frustum);
        self
    }

    /// Every channel whose last draw of a frame happens in this compound or
    /// below waits at the named barrier before swapping
    pub fn with_swap_barrier(mut self, barrier: &str) -> Self {
        self.swap_barrier = Some(barrier.to_string());
        self
    }

    pub fn with_child(mut self, child: Compound) -> Self {
        self.children.push(child);
        self
    }

    // Accessors

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &CompoundPath {
        &self.path
    }

    pub fn channel(&self) -> Option<ChannelPath> {
        self.channel
    }

    pub fn tasks(&self) -> Option<TaskMask> {
        self.tasks
    }

    pub fn swap_barrier(&self) -> Option<&str> {
        self.swap_barrier.as_deref()
    }

    pub fn children(&self) -> &[Compound] {
        &self.children
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    pub fn is_activated(&self) -> bool {
        self.activated
    }

    pub fn activate(&mut self) {
        self.activated = true;
    }

    pub fn deactivate(&mut self) {
        self.activated = false;
    }

    /// Inherited attributes of the last updated frame
    pub fn inherit(&self) -> &InheritData {
        &self.inherit
    }

    pub fn inherit_frame(&self) -> Option<FrameNumber> {
        self.inherit_frame
    }

    pub fn child(&self, path: &[usize]) -> Option<&Compound> {
        match path.split_first() {
            None => Some(self),
            Some((index, rest)) => self.children.get(*index)?.child(rest),
        }
    }

    /// Assigns paths to the compound and its subtree
    pub(crate) fn set_path(&mut self, path: CompoundPath) {
        for (index, child) in self.children.iter_mut().enumerate() {
            child.set_path(path.child(index));
        }
        self.path = path;
    }

    /// Every channel the subtree renders into, with the tasks it performs
    /// there
    pub(crate) fn channel_tasks(
        &self,
        parent: Option<(ChannelPath, TaskMask)>,
    ) -> Vec<(ChannelPath, TaskMask)> {
        let tasks = self
            .tasks
            .or(parent.map(|(_, tasks)| tasks))
            .unwrap_or(TaskMask::DEFAULT);
        let channel = self.channel.or(parent.map(|(channel, _)| channel));
        let mut result = Vec::new();
        if let Some(channel) = channel {
            result.push((channel, tasks));
            for child in &self.children {
                result.extend(child.channel_tasks(Some((channel, tasks))));
            }
        } else {
            for child in &self.children {
                result.extend(child.channel_tasks(None));
            }
        }
        result
    }

    /// Barriers used anywhere in the subtree
    pub(crate) fn swap_barriers(&self) -> Vec<String> {
        let mut barriers: Vec<String> = self.swap_barrier.iter().cloned().collect();
        for child in &self.children {
            barriers.extend(child.swap_barriers());
        }
        barriers
    }

    // Listeners

    pub fn add_listener(&self, listener: Arc<dyn CompoundListener>) {
        self.listeners.add(listener);
    }

    pub fn remove_listener(&self, listener: &Arc<dyn CompoundListener>) -> bool {
        self.listeners.remove(listener)
    }

    pub(crate) fn fire_update_pre(&self, frame_number: FrameNumber) {
        self.listeners
            .notify(|listener| listener.notify_update_pre(self, frame_number));
    }

    /// Merges the compound's own attributes into those of its parent. Runs
    /// at most once per frame.
    pub(crate) fn update_inherit_data(
        &mut self,
        frame_number: FrameNumber,
        parent: Option<&InheritData>,
        channel: Option<&ChannelState>,
    ) {
        if self.inherit_frame == Some(frame_number) {
            return;
        }

        let mut data = parent.cloned().unwrap_or_default();
        let new_destination = match self.channel {
            Some(own) => data.channel != Some(own),
            None => false,
        };

        if new_destination {
            data.channel = self.channel;
            data.viewport = self.viewport;
        } else {
            data.viewport = data.viewport.apply(&self.viewport);
        }
        if let Some(tasks) = self.tasks {
            data.tasks = tasks;
        }
        if let Some(eyes) = self.eyes {
            data.eyes = eyes;
        }

        match (self.frustum, channel.and_then(|channel| channel.view_frustum)) {
            (Some(frustum), _) => data.frustum = frustum,
            (None, Some(frustum)) if new_destination || parent.is_none() => {
                data.frustum = frustum
            }
            _ => {}
        }

        if self.swap_barrier.is_some() {
            data.swap_barrier = self.swap_barrier.clone();
        }

        data.active = data.active
            && self.activated
            && channel.map_or(true, |channel| channel.active);
        data.pixel_viewport = channel
            .map(|channel| channel.pixel_viewport.apply(&data.viewport))
            .unwrap_or_default();

        trace!("{} inherits {:?} in frame {}", self.name, data, frame_number);
        self.inherit = data;
        self.inherit_frame = Some(frame_number);
    }
}

impl fmt::Debug for Compound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compound")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("channel", &self.channel)
            .field("children", &self.children)
            .finish()
    }
}
