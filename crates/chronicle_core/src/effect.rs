use crate::ViewPreferences;

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Write the snapshot to the key-value store.
    PersistPreferences(ViewPreferences),
}
