//! Specialized collection types

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Stable handle to a light owned by a [`LightRegistry`](crate::lighting::LightRegistry).
    ///
    /// Handles stay valid until the light is removed; a stale handle never
    /// aliases a newer light.
    pub struct LightHandle;
}

/// Handle-based map using slot map for stable references
pub type HandleMap<T> = SlotMap<LightHandle, T>;
