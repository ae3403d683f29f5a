use engine::ActorId;

use crate::registry::TransformationRegistry;

/// Per-frame presentation check. Pure registry read.
#[derive(Debug, Clone, Copy)]
pub struct RenderSuppressionGate<'a> {
    registry: &'a TransformationRegistry,
}

impl<'a> RenderSuppressionGate<'a> {
    pub fn new(registry: &'a TransformationRegistry) -> Self {
        Self { registry }
    }

    pub fn should_render(&self, actor: ActorId) -> bool {
        !self.registry.contains(actor)
    }
}

/// Keeps petrified actors out of rescue and downed alerts.
#[derive(Debug, Clone, Copy)]
pub struct RescueAlertGate<'a> {
    registry: &'a TransformationRegistry,
}

impl<'a> RescueAlertGate<'a> {
    pub fn new(registry: &'a TransformationRegistry) -> Self {
        Self { registry }
    }

    pub fn needs_rescue(&self, actor: ActorId, host_verdict: bool) -> bool {
        host_verdict && !self.registry.contains(actor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gates_follow_registry_membership() {
        let mut registry = TransformationRegistry::default();
        registry.add(ActorId(1));

        let render = RenderSuppressionGate::new(&registry);
        assert!(!render.should_render(ActorId(1)));
        assert!(render.should_render(ActorId(2)));

        let rescue = RescueAlertGate::new(&registry);
        assert!(!rescue.needs_rescue(ActorId(1), true));
        assert!(rescue.needs_rescue(ActorId(2), true));
        assert!(!rescue.needs_rescue(ActorId(2), false));
    }
}
