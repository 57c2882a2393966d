//! Progress reporting for long-running operations

/// Receives progress of an install, update or uninstall
pub trait ProgressObserver {
    /// Advance by `steps` and show `title`
    fn step(&mut self, steps: u32, title: &str);
}

/// Advance an optional observer; nothing happens when there is none
pub(crate) fn make_step(progress: &mut Option<&mut dyn ProgressObserver>, steps: u32, title: &str) {
    if let Some(observer) = progress.as_deref_mut() {
        observer.step(steps, title);
    }
}
