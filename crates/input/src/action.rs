/// A logical input the scene reacts to.
///
/// Hosts translate their raw key codes into actions; the scene never sees
/// platform key codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    /// Translate along the camera's look direction.
    MoveForward,
    /// Translate against the camera's look direction.
    MoveBackward,
    /// Translate along the camera's negative right axis.
    StrafeLeft,
    /// Translate along the camera's right axis.
    StrafeRight,
    /// Translate along world +Y.
    Ascend,
    /// Translate along world -Y.
    Descend,
    /// End the frame loop.
    Quit,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::MoveForward,
        Action::MoveBackward,
        Action::StrafeLeft,
        Action::StrafeRight,
        Action::Ascend,
        Action::Descend,
        Action::Quit,
    ];

    /// Whether this action drives camera translation.
    pub fn is_movement(self) -> bool {
        !matches!(self, Action::Quit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_is_not_movement() {
        assert!(!Action::Quit.is_movement());
        assert!(Action::Ascend.is_movement());
    }

    #[test]
    fn all_lists_each_variant_once() {
        let mut all = Action::ALL.to_vec();
        all.sort();
        all.dedup();
        assert_eq!(all.len(), Action::ALL.len());
    }
}
