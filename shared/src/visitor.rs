/// What a visitor wants the traversal to do next
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum VisitorResult {
    /// Keep going
    #[default]
    Continue,
    /// Skip the children of the current node; the traversal of its
    /// siblings goes on
    Prune,
    /// Stop the whole traversal
    Terminate,
}

impl VisitorResult {
    /// Combines a node's pre-order result with the result of walking its
    /// children and its post-order result.
    ///
    /// A pruned child does not stop its siblings but is reported upwards.
    /// A post-order result other than `Continue` wins.
    pub fn with_post(self, post: VisitorResult) -> VisitorResult {
        match post {
            VisitorResult::Continue => self,
            other => other,
        }
    }
}

/// Visits children in order until one terminates.
///
/// Returns `Terminate` if any child terminated, `Prune` if any child was
/// pruned, `Continue` otherwise.
pub fn traverse<I, F>(children: I, mut visit: F) -> VisitorResult
where
    I: IntoIterator,
    F: FnMut(I::Item) -> VisitorResult,
{
    let mut result = VisitorResult::Continue;
    for child in children {
        match visit(child) {
            VisitorResult::Continue => {}
            VisitorResult::Prune => result = VisitorResult::Prune,
            VisitorResult::Terminate => return VisitorResult::Terminate,
        }
    }
    result
}
