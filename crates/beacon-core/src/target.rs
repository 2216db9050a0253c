//! The capability the binder needs from a page: find a field target by
//! selector, and replace its text.

/// Resolves selectors to writable targets.
///
/// Selectors are resolved again on every dispatch, so implementations must
/// not hand out handles that outlive the page structure they came from.
/// A selector that matches nothing is a normal outcome, not an error.
pub trait TargetResolver {
    /// Handle to one matched element.
    type Target;

    /// First element matching `selector`, if any.
    fn resolve(&self, selector: &str) -> Option<Self::Target>;

    /// Replace the element's entire text content.
    fn write_text(&mut self, target: &Self::Target, text: &str);
}

impl<R: TargetResolver + ?Sized> TargetResolver for &mut R {
    type Target = R::Target;

    fn resolve(&self, selector: &str) -> Option<Self::Target> {
        (**self).resolve(selector)
    }

    fn write_text(&mut self, target: &Self::Target, text: &str) {
        (**self).write_text(target, text);
    }
}
