use lockstep_shared::{traverse, ObjectId, VisitorResult};

use crate::entity::{Channel, ChannelPath, Node, Pipe, Window};

/// Walks the resource tree of a config. Every method defaults to
/// `Continue`; returning `Prune` from a pre-visit skips the children.
///
/// The matching post-visit runs after a `Prune` as well. Only `Terminate`
/// ends the walk without it.
pub trait ConfigVisitor {
    fn visit_pre_node(&mut self, _node: &mut Node) -> VisitorResult {
        VisitorResult::Continue
    }

    fn visit_post_node(&mut self, _node: &mut Node) -> VisitorResult {
        VisitorResult::Continue
    }

    fn visit_pre_pipe(&mut self, _pipe: &mut Pipe) -> VisitorResult {
        VisitorResult::Continue
    }

    fn visit_post_pipe(&mut self, _pipe: &mut Pipe) -> VisitorResult {
        VisitorResult::Continue
    }

    fn visit_pre_window(&mut self, _window: &mut Window) -> VisitorResult {
        VisitorResult::Continue
    }

    fn visit_post_window(&mut self, _window: &mut Window) -> VisitorResult {
        VisitorResult::Continue
    }

    fn visit_channel(&mut self, _channel: &mut Channel) -> VisitorResult {
        VisitorResult::Continue
    }
}

impl Node {
    pub fn accept(&mut self, visitor: &mut dyn ConfigVisitor) -> VisitorResult {
        let mut result = visitor.visit_pre_node(self);
        match result {
            VisitorResult::Terminate => return result,
            VisitorResult::Prune => {}
            VisitorResult::Continue => {
                result = traverse(self.pipes.iter_mut(), |pipe| pipe.accept(&mut *visitor));
                if result == VisitorResult::Terminate {
                    return result;
                }
            }
        }
        result.with_post(visitor.visit_post_node(self))
    }
}

impl Pipe {
    pub fn accept(&mut self, visitor: &mut dyn ConfigVisitor) -> VisitorResult {
        let mut result = visitor.visit_pre_pipe(self);
        match result {
            VisitorResult::Terminate => return result,
            VisitorResult::Prune => {}
            VisitorResult::Continue => {
                result = traverse(self.windows.iter_mut(), |window| {
                    window.accept(&mut *visitor)
                });
                if result == VisitorResult::Terminate {
                    return result;
                }
            }
        }
        result.with_post(visitor.visit_post_pipe(self))
    }
}

impl Window {
    pub fn accept(&mut self, visitor: &mut dyn ConfigVisitor) -> VisitorResult {
        let mut result = visitor.visit_pre_window(self);
        match result {
            VisitorResult::Terminate => return result,
            VisitorResult::Prune => {}
            VisitorResult::Continue => {
                result = traverse(self.channels.iter_mut(), |channel| {
                    visitor.visit_channel(channel)
                });
                if result == VisitorResult::Terminate {
                    return result;
                }
            }
        }
        result.with_post(visitor.visit_post_window(self))
    }
}

/// Finds the first channel with a given name
pub struct ChannelFinder<'a> {
    name: &'a str,
    found: Option<ChannelPath>,
}

impl<'a> ChannelFinder<'a> {
    pub fn new(name: &'a str) -> Self {
        Self { name, found: None }
    }

    pub fn found(&self) -> Option<ChannelPath> {
        self.found
    }
}

impl ConfigVisitor for ChannelFinder<'_> {
    fn visit_channel(&mut self, channel: &mut Channel) -> VisitorResult {
        if channel.name() != self.name {
            return VisitorResult::Continue;
        }
        self.found = Some(channel.path());
        VisitorResult::Terminate
    }
}

/// Collects the channels whose whole ancestry is active
#[derive(Default)]
pub struct ActiveChannels {
    paths: Vec<ChannelPath>,
}

impl ActiveChannels {
    pub fn into_paths(self) -> Vec<ChannelPath> {
        self.paths
    }
}

fn prune_inactive(active: bool) -> VisitorResult {
    if active {
        VisitorResult::Continue
    } else {
        VisitorResult::Prune
    }
}

impl ConfigVisitor for ActiveChannels {
    fn visit_pre_node(&mut self, node: &mut Node) -> VisitorResult {
        prune_inactive(node.is_active())
    }

    fn visit_pre_pipe(&mut self, pipe: &mut Pipe) -> VisitorResult {
        prune_inactive(pipe.is_active())
    }

    fn visit_pre_window(&mut self, window: &mut Window) -> VisitorResult {
        prune_inactive(window.is_active())
    }

    fn visit_channel(&mut self, channel: &mut Channel) -> VisitorResult {
        if channel.is_active() {
            self.paths.push(channel.path());
        }
        VisitorResult::Continue
    }
}

/// Switches one entity and everything below it on or off
pub struct ActivationVisitor {
    target: ObjectId,
    activate: bool,
    found: bool,
}

impl ActivationVisitor {
    pub fn activate(target: ObjectId) -> Self {
        Self {
            target,
            activate: true,
            found: false,
        }
    }

    pub fn deactivate(target: ObjectId) -> Self {
        Self {
            target,
            activate: false,
            found: false,
        }
    }

    pub fn found(&self) -> bool {
        self.found
    }

    fn hit(
        &mut self,
        id: ObjectId,
        activate: impl FnOnce(),
        deactivate: impl FnOnce(),
    ) -> VisitorResult {
        if id != self.target {
            return VisitorResult::Continue;
        }
        if self.activate {
            activate();
        } else {
            deactivate();
        }
        self.found = true;
        VisitorResult::Terminate
    }
}

impl ConfigVisitor for ActivationVisitor {
    fn visit_pre_node(&mut self, node: &mut Node) -> VisitorResult {
        self.hit(node.id(), || node.activate(), || node.deactivate())
    }

    fn visit_pre_pipe(&mut self, pipe: &mut Pipe) -> VisitorResult {
        self.hit(pipe.id(), || pipe.activate(), || pipe.deactivate())
    }

    fn visit_pre_window(&mut self, window: &mut Window) -> VisitorResult {
        self.hit(window.id(), || window.activate(), || window.deactivate())
    }

    fn visit_channel(&mut self, channel: &mut Channel) -> VisitorResult {
        self.hit(channel.id(), || channel.activate(), || channel.deactivate())
    }
}
