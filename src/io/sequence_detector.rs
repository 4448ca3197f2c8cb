//=========================================================================
// Sequence Detector
//
// Matches a linear sequence of values fed one at a time, e.g. a key
// combo typed over several `KeyInput` events.
//
// A value that breaks the sequence resets matching to the start; there
// is no partial-prefix backtracking.
//
//=========================================================================

/// Finite-state matcher over a fixed target sequence.
#[derive(Debug, Clone)]
pub struct SequenceDetector<T: PartialEq> {
    target: Vec<T>,
    index: usize,
}

impl<T: PartialEq> SequenceDetector<T> {
    /// Panics if `target` is empty.
    pub fn new(target: impl Into<Vec<T>>) -> Self {
        let target = target.into();
        assert!(!target.is_empty(), "sequence detector needs a non-empty target");
        Self { target, index: 0 }
    }

    /// Feeds one value. Returns true if it advanced the match.
    ///
    /// Once completed, every further value is rejected until `reset()`.
    pub fn test(&mut self, value: &T) -> bool {
        if self.completed() {
            return false;
        }
        if *value == self.target[self.index] {
            self.index += 1;
            true
        } else {
            self.index = 0;
            false
        }
    }

    /// At least one value has matched.
    pub fn started(&self) -> bool {
        self.index > 0
    }

    /// The whole target has matched.
    pub fn completed(&self) -> bool {
        self.index == self.target.len()
    }

    pub fn reset(&mut self) {
        self.index = 0;
    }

    /// Number of values matched so far.
    pub fn progress(&self) -> usize {
        self.index
    }

    pub fn target(&self) -> &[T] {
        &self.target
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
