use lockstep_shared::{traverse, VisitorResult};

use crate::compound::Compound;

/// Walks a compound tree. Leaves only get `visit_leaf`; inner compounds get
/// `visit_pre` before and `visit_post` after their children.
///
/// `Prune` from `visit_pre` skips the children but `visit_post` still runs,
/// so visitors that push state in the pre-visit can pop it in the
/// post-visit. Only `Terminate` skips `visit_post`.
pub trait CompoundVisitor {
    fn visit_pre(&mut self, _compound: &mut Compound) -> VisitorResult {
        VisitorResult::Continue
    }

    fn visit_leaf(&mut self, _compound: &mut Compound) -> VisitorResult {
        VisitorResult::Continue
    }

    fn visit_post(&mut self, _compound: &mut Compound) -> VisitorResult {
        VisitorResult::Continue
    }
}

impl Compound {
    pub fn accept(&mut self, visitor: &mut dyn CompoundVisitor) -> VisitorResult {
        if self.is_leaf() {
            return visitor.visit_leaf(self);
        }

        let mut result = visitor.visit_pre(self);
        match result {
            VisitorResult::Terminate => return result,
            VisitorResult::Prune => {}
            VisitorResult::Continue => {
                result = traverse(self.children.iter_mut(), |child| {
                    child.accept(&mut *visitor)
                });
                if result == VisitorResult::Terminate {
                    return result;
                }
            }
        }
        result.with_post(visitor.visit_post(self))
    }
}
