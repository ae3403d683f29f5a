use std::path::Path;

use engine::{
    read_save, restore_world, write_save, ActorId, Cell, DefDatabase, FactionId, Placement,
    RegionId, Rotation, SimWorld, Tilemap, BLOCKED_TILE_ID,
};
use petrify::{
    ConditionEventQueue, LifecycleController, PetrifyConfig, PetrifySession,
    RenderSuppressionGate, TransitionOutcome, TransitionReport,
};
use tracing::{info, warn};

use super::SandboxError;

const DEMO_WIDTH: u32 = 16;
const DEMO_HEIGHT: u32 = 16;

struct Demo {
    world: SimWorld,
    session: PetrifySession,
    queue: ConditionEventQueue,
    controller: LifecycleController,
    region: RegionId,
    condition: String,
}

impl Demo {
    fn tick(&mut self, label: &'static str) -> Vec<TransitionReport> {
        let reports = self
            .controller
            .process_tick(&mut self.world, &mut self.session, &mut self.queue);
        for report in &reports {
            info!(
                tick = label,
                actor = %report.event.actor(),
                outcome = ?report.outcome,
                "transition_reported"
            );
        }
        let dirty = self.world.take_graphics_dirty();
        if !dirty.is_empty() {
            info!(tick = label, actors = ?dirty, "graphics_refresh");
        }
        reports
    }

    fn set_condition(&mut self, actor: ActorId, active: bool) -> Result<(), SandboxError> {
        self.queue
            .set_condition(&mut self.world, actor, &self.condition, active)?;
        Ok(())
    }

    fn visible_actors(&self) -> usize {
        let gate = RenderSuppressionGate::new(self.session.registry());
        self.world
            .actors()
            .filter(|actor| actor.spawned() && gate.should_render(actor.id))
            .count()
    }
}

#[derive(Debug, Default)]
pub(crate) struct DemoSummary {
    pub(crate) petrify: Vec<TransitionReport>,
    pub(crate) depetrify: Vec<TransitionReport>,
    pub(crate) dropped_references: usize,
    pub(crate) remediated: Vec<(ActorId, Placement)>,
    pub(crate) visible_actors: usize,
}

impl DemoSummary {
    pub(crate) fn log(&self) {
        let restored = self
            .depetrify
            .iter()
            .filter(|report| {
                matches!(
                    report.outcome,
                    TransitionOutcome::Restored { .. } | TransitionOutcome::RestoredAtFallback { .. }
                )
            })
            .count();
        info!(
            petrified = self.petrify.len(),
            restored,
            remediated = self.remediated.len(),
            dropped_references = self.dropped_references,
            visible_actors = self.visible_actors,
            "sandbox_summary"
        );
    }
}

fn build_world(defs: DefDatabase) -> Result<(SimWorld, RegionId, [ActorId; 3]), SandboxError> {
    let mut world = SimWorld::new(defs);
    let mut tilemap = Tilemap::open(DEMO_WIDTH, DEMO_HEIGHT)?;
    for y in 4..12 {
        tilemap.set_tile(Cell::new(8, y), BLOCKED_TILE_ID);
    }
    let region = world.add_region("courtyard", tilemap);

    let spawns = [
        ("Aldric", Cell::new(3, 3), Rotation::East),
        ("Brenna", Cell::new(6, 10), Rotation::South),
        ("Corwin", Cell::new(12, 5), Rotation::West),
    ];
    let mut actors = [ActorId(0); 3];
    for (slot, (label, cell, rotation)) in actors.iter_mut().zip(spawns) {
        let actor = world.create_actor(label, Some(FactionId(1)));
        world.spawn_actor(actor, Placement::new(region, cell, rotation))?;
        *slot = actor;
    }
    Ok((world, region, actors))
}

/// Petrifies three actors, lets the host destroy one statue and carry another off,
/// round-trips the world through a save file, then lifts the condition.
pub(crate) fn run_demo(
    config: &PetrifyConfig,
    defs: DefDatabase,
    save_path: &Path,
) -> Result<DemoSummary, SandboxError> {
    let (world, region, [aldric, brenna, corwin]) = build_world(defs.clone())?;
    let mut demo = Demo {
        world,
        session: PetrifySession::new(),
        queue: ConditionEventQueue::default(),
        controller: LifecycleController::new(config.clone()),
        region,
        condition: config.condition.clone(),
    };
    let mut summary = DemoSummary::default();

    for actor in [aldric, brenna, corwin] {
        demo.set_condition(actor, true)?;
    }
    summary.petrify = demo.tick("petrify");

    // Host interference between ticks.
    if let Some(statue) = demo.controller.resolve(&demo.world, brenna).outer() {
        demo.world.destroy_thing(statue)?;
        info!(actor = %brenna, statue = %statue, "host_destroyed_statue");
    }
    if let Some(statue) = demo.controller.resolve(&demo.world, corwin).placeholder() {
        let packed = demo
            .world
            .defs()
            .thing_def_id_by_name(&config.wrapper_template);
        if let Some(packed) = packed {
            let wrapper = demo.world.wrap_thing(statue, packed)?;
            demo.world.despawn_thing(wrapper)?;
            info!(actor = %corwin, wrapper = %wrapper, "host_carried_statue_off_map");
        } else {
            warn!(template = %config.wrapper_template, "wrapper_template_missing");
        }
    }

    write_save(save_path, &demo.world)?;
    let save = read_save(save_path, &defs)?;
    let (restored, report) = restore_world(&save, defs)?;
    summary.dropped_references = report.dropped_holders.len()
        + report.dropped_placeholder_actors.len()
        + report.dropped_wrapper_inners.len();
    demo.world = restored;
    demo.session.teardown();
    demo.session.rebuild_from_world(&demo.world, &demo.condition);

    for actor in [aldric, brenna, corwin] {
        demo.set_condition(actor, false)?;
    }
    summary.depetrify = demo.tick("depetrify");

    let orphans = demo
        .session
        .orphans()
        .map(|record| record.actor)
        .collect::<Vec<_>>();
    let near = Placement::new(
        demo.region,
        Cell::new(DEMO_WIDTH as i32 / 2 + 2, DEMO_HEIGHT as i32 / 2),
        Rotation::North,
    );
    for actor in orphans {
        let placement =
            demo.controller
                .remediate_orphan(&mut demo.world, &mut demo.session, actor, near)?;
        summary.remediated.push((actor, placement));
    }

    summary.visible_actors = demo.visible_actors();
    demo.session.teardown();
    Ok(summary)
}
