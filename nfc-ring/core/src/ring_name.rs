//! Ring Name Allocation
//!
//! Picks the friendly name for a newly registered ring. Slot ids are two-digit
//! numbers `01..max_tokens_count`; a slot is taken when its two digits appear
//! anywhere in an existing label. This is a substring test against the whole
//! label, so a custom label such as `"my 03 ring"` also blocks slot `03`.

use std::fmt;

/// Sentinel label used when no slot is free
pub const EXHAUSTED_LABEL: &str = "ring 00";

/// Upper bound on slots per user; ids stay two digits (`01..=99`)
pub const MAX_SLOT_COUNT: u32 = 100;

/// Outcome of ring name allocation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RingName {
    /// A free slot was found
    Allocated {
        /// Slot number, `1..max_tokens_count`
        slot: u32,
    },
    /// Every slot collides with an existing label
    Exhausted,
}

impl RingName {
    /// Two-digit slot id (`"00"` when exhausted)
    #[must_use]
    pub fn id(&self) -> String {
        match self {
            Self::Allocated { slot } => format!("{slot:02}"),
            Self::Exhausted => "00".to_string(),
        }
    }

    /// Friendly name sent to the daemon, e.g. `ring 03`
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Allocated { .. } => format!("ring {}", self.id()),
            Self::Exhausted => EXHAUSTED_LABEL.to_string(),
        }
    }

    /// Whether a real slot was allocated
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        matches!(self, Self::Allocated { .. })
    }
}

impl fmt::Display for RingName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Choose the next ring name given the labels already in use
///
/// Deterministic: the lowest free slot wins. `max_tokens_count` is capped at
/// [`MAX_SLOT_COUNT`].
pub fn next_ring_name<I, S>(existing_labels: I, max_tokens_count: u32) -> RingName
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let labels: Vec<S> = existing_labels.into_iter().collect();

    (1..max_tokens_count.min(MAX_SLOT_COUNT))
        .find(|slot| {
            let id = format!("{slot:02}");
            !labels.iter().any(|label| label.as_ref().contains(&id))
        })
        .map_or(RingName::Exhausted, |slot| RingName::Allocated { slot })
}
