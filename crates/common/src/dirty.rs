/// A derived value paired with the input snapshot it was computed from.
///
/// `get_or_recompute` only runs the derivation when the supplied state differs
/// from the stored snapshot under `PartialEq`. For float state this is exact
/// IEEE equality per component: writing the same value again is not a change.
#[derive(Debug, Clone)]
pub struct Cached<S, V> {
    snapshot: Option<S>,
    value: V,
    recomputes: u64,
}

impl<S: PartialEq + Copy, V> Cached<S, V> {
    /// Start with a placeholder value and no snapshot, so the first
    /// `get_or_recompute` always derives.
    pub fn new(initial: V) -> Self {
        Self {
            snapshot: None,
            value: initial,
            recomputes: 0,
        }
    }

    /// Re-derive if `state` differs from the last snapshot. Returns whether
    /// the derivation ran.
    pub fn get_or_recompute(&mut self, state: S, derive: impl FnOnce(&S) -> V) -> bool {
        if self.snapshot.as_ref() == Some(&state) {
            return false;
        }
        self.force(state, derive);
        true
    }

    /// Derive unconditionally and take a fresh snapshot.
    pub fn force(&mut self, state: S, derive: impl FnOnce(&S) -> V) {
        self.value = derive(&state);
        self.snapshot = Some(state);
        self.recomputes += 1;
    }

    /// Whether `state` would trigger a recompute.
    pub fn is_stale(&self, state: &S) -> bool {
        self.snapshot.as_ref() != Some(state)
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn snapshot(&self) -> Option<&S> {
        self.snapshot.as_ref()
    }

    /// Number of times the derivation has run.
    pub fn recompute_count(&self) -> u64 {
        self.recomputes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_always_derives() {
        let mut c: Cached<f32, f32> = Cached::new(0.0);
        assert!(c.is_stale(&0.0));
        assert!(c.get_or_recompute(0.0, |s| s * 2.0));
        assert_eq!(c.recompute_count(), 1);
    }

    #[test]
    fn unchanged_state_skips_work() {
        let mut c: Cached<(f32, f32), f32> = Cached::new(0.0);
        c.get_or_recompute((1.0, 2.0), |(a, b)| a + b);
        let ran = c.get_or_recompute((1.0, 2.0), |_| panic!("should not derive"));
        assert!(!ran);
        assert_eq!(*c.value(), 3.0);
        assert_eq!(c.recompute_count(), 1);
    }

    #[test]
    fn changed_state_rederives() {
        let mut c: Cached<f32, f32> = Cached::new(0.0);
        c.get_or_recompute(1.0, |s| *s);
        assert!(c.get_or_recompute(2.0, |s| *s));
        assert_eq!(*c.value(), 2.0);
        assert_eq!(c.snapshot(), Some(&2.0));
    }

    #[test]
    fn nan_state_never_compares_equal() {
        let mut c: Cached<f32, u32> = Cached::new(0);
        c.get_or_recompute(f32::NAN, |_| 1);
        assert!(c.get_or_recompute(f32::NAN, |_| 2));
        assert_eq!(c.recompute_count(), 2);
    }

    #[test]
    fn force_matches_gated_result() {
        let mut gated: Cached<f32, f32> = Cached::new(0.0);
        let mut forced: Cached<f32, f32> = Cached::new(0.0);
        gated.get_or_recompute(0.3, |s| s.sin());
        forced.force(0.3, |s| s.sin());
        assert_eq!(gated.value().to_bits(), forced.value().to_bits());
    }
}
