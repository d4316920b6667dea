/// How commits of a replicated object reach its slaves
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChangeType {
    /// Never changes after the first full transmission
    Static,
    /// Every committed version is buffered and applied in order
    #[default]
    Delta,
    /// Only the latest version matters; intermediate versions may be skipped
    Unbuffered,
}
