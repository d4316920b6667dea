use std::fmt;

/// Position of a node inside its config
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodePath {
    pub node: usize,
}

/// Position of a pipe inside its config
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PipePath {
    pub node: usize,
    pub pipe: usize,
}

/// Position of a window inside its config
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowPath {
    pub node: usize,
    pub pipe: usize,
    pub window: usize,
}

/// Position of a channel inside its config. Compounds refer to their
/// destination channel through it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelPath {
    pub node: usize,
    pub pipe: usize,
    pub window: usize,
    pub channel: usize,
}

impl NodePath {
    pub fn pipe(&self, pipe: usize) -> PipePath {
        PipePath {
            node: self.node,
            pipe,
        }
    }
}

impl PipePath {
    pub fn parent(&self) -> NodePath {
        NodePath { node: self.node }
    }

    pub fn window(&self, window: usize) -> WindowPath {
        WindowPath {
            node: self.node,
            pipe: self.pipe,
            window,
        }
    }
}

impl WindowPath {
    pub fn parent(&self) -> PipePath {
        PipePath {
            node: self.node,
            pipe: self.pipe,
        }
    }

    pub fn channel(&self, channel: usize) -> ChannelPath {
        ChannelPath {
            node: self.node,
            pipe: self.pipe,
            window: self.window,
            channel,
        }
    }
}

impl ChannelPath {
    pub fn parent(&self) -> WindowPath {
        WindowPath {
            node: self.node,
            pipe: self.pipe,
            window: self.window,
        }
    }
}

impl fmt::Display for NodePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node[{}]", self.node)
    }
}

impl fmt::Display for PipePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/pipe[{}]", self.parent(), self.pipe)
    }
}

impl fmt::Display for WindowPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/window[{}]", self.parent(), self.window)
    }
}

impl fmt::Display for ChannelPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/channel[{}]", self.parent(), self.channel)
    }
}
