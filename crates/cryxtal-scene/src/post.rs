use std::collections::BTreeSet;

use cryxtal_base::NodeId;

pub trait PostProduction {
    fn is_active(&self) -> bool;
    fn set_active(&mut self, active: bool);
    fn exclude(&mut self, node: NodeId);
    fn include(&mut self, node: NodeId);
    /// Turns the pass off until every `suspend` has a matching `resume`.
    fn suspend(&mut self);
    /// Restores the state from before the outermost `suspend`.
    fn resume(&mut self);
}

#[derive(Clone, Debug)]
pub struct PostProcessState {
    active: bool,
    excluded: BTreeSet<NodeId>,
    suspended: usize,
    resume_active: bool,
}

impl Default for PostProcessState {
    fn default() -> Self {
        Self {
            active: true,
            excluded: BTreeSet::new(),
            suspended: 0,
            resume_active: true,
        }
    }
}

impl PostProcessState {
    pub fn is_excluded(&self, node: NodeId) -> bool {
        self.excluded.contains(&node)
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    pub fn suspend_depth(&self) -> usize {
        self.suspended
    }
}

impl PostProduction for PostProcessState {
    fn is_active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn exclude(&mut self, node: NodeId) {
        self.excluded.insert(node);
    }

    fn include(&mut self, node: NodeId) {
        self.excluded.remove(&node);
    }

    fn suspend(&mut self) {
        if self.suspended == 0 {
            self.resume_active = self.active;
        }
        self.suspended += 1;
        self.active = false;
    }

    fn resume(&mut self) {
        match self.suspended {
            0 => {}
            1 => {
                self.suspended = 0;
                self.active = self.resume_active;
            }
            _ => self.suspended -= 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_suspends_restore_at_the_outermost_resume() {
        let mut post = PostProcessState::default();
        post.suspend();
        post.suspend();
        assert!(!post.is_active());

        post.resume();
        assert!(!post.is_active());
        post.resume();
        assert!(post.is_active());
        assert_eq!(post.suspend_depth(), 0);
    }

    #[test]
    fn resume_keeps_an_inactive_pass_off() {
        let mut post = PostProcessState::default();
        post.set_active(false);
        post.suspend();
        post.resume();
        post.resume();
        assert!(!post.is_active());
        assert_eq!(post.suspend_depth(), 0);
    }
}
