//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a node in the scene arena
    ///
    /// Keys are generational, so a handle to a removed node never aliases a
    /// node created later in the same slot.
    pub struct NodeId;
}

/// Handle-based map used for scene node storage
pub type NodeMap<T> = SlotMap<NodeId, T>;
