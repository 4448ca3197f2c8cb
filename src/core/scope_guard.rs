//=========================================================================
// Scope Guard
//
// Runs a cleanup action when it goes out of scope, on every exit path
// (early return, `?`, unwinding), unless dismissed first.
//
// Typical use is all-or-nothing construction:
//
//   let handle = acquire()?;
//   let guard = ScopeGuard::new(|| release(handle));
//   ...fallible steps...
//   guard.dismiss();   // success: ownership moves elsewhere
//
//=========================================================================

/// Invokes its action exactly once on drop unless dismissed.
#[must_use = "a scope guard is dropped, and its action run, immediately if not bound"]
pub struct ScopeGuard<F: FnOnce()> {
    action: Option<F>,
}

impl<F: FnOnce()> ScopeGuard<F> {
    pub fn new(action: F) -> Self {
        Self {
            action: Some(action),
        }
    }

    /// Disarms the guard; the action never runs.
    pub fn dismiss(mut self) {
        self.action = None;
    }
}

impl<F: FnOnce()> Drop for ScopeGuard<F> {
    fn drop(&mut self) {
        if let Some(action) = self.action.take() {
            action();
        }
    }
}

//=========================================================================
// Unit Tests
//=========================================================================
