//! Weapon-light storm benchmark
//!
//! Two fleets trade projectile and beam fire for a fixed number of ticks.
//! Every weapon event spawns lights through the preset catalog, the session
//! advances them, and each tick is composited on the recording backend.
//! Frame statistics are logged as it runs.
//!
//! Set `RUST_LOG=debug` for per-second statistics.

use std::time::Instant;

use rand::prelude::*;
use rand::rngs::StdRng;

use starlight_engine::config::Config;
use starlight_engine::core::LightingConfig;
use starlight_engine::foundation::collections::LightHandle;
use starlight_engine::foundation::logging;
use starlight_engine::foundation::math::{rotate_offset, Vec2, Vec3};
use starlight_engine::lighting::spawner::{
    beam_lights, impact_factor, impact_light, projectile_lights, roll_chance,
};
use starlight_engine::lighting::{
    BeamId, BeamSpawn, BeamState, EntityId, EntityState, Light, LightCatalog, LightDataKind, LightingSession,
    LoadMode, PlatformClass, ProjectileSpawn, SceneSnapshot, SpawnScale, SpawnSettings,
};
use starlight_engine::render::{FrameStats, LightCompositor, RecordingBackend, SurfaceSprite, Viewport};

const CONFIG_PATH: &str = "starlight.toml";
const LIGHT_DATA: &str = include_str!("../data/light_data.csv");

const SCREEN: (u32, u32) = (1920, 1080);
const TICKS: u32 = 1200;
const DT: f32 = 1.0 / 60.0;
const SHIPS_PER_FLEET: usize = 6;
const FLEET_SEPARATION: f32 = 900.0;
const PROJECTILE_SPEED: f32 = 1400.0;
const FIRE_CHANCE_PER_TICK: f64 = 0.08;
const BEAM_DURATION_TICKS: u32 = 90;

const PROJECTILE_WEAPONS: [&str; 3] = ["pulse_laser", "autocannon", "ion_bolt"];
const BEAM_WEAPONS: [&str; 2] = ["tachyon_lance", "mining_laser"];

struct Ship {
    entity: EntityId,
    location: Vec2,
    facing_degrees: f32,
    platform: PlatformClass,
}

struct Projectile {
    entity: EntityId,
    weapon: &'static str,
    platform: PlatformClass,
    velocity: Vec2,
    ticks_left: u32,
    light: Option<LightHandle>,
}

struct Beam {
    id: BeamId,
    origin: Vec2,
    target: Vec2,
    ticks_left: u32,
}

#[derive(Default)]
struct Totals {
    frames: u32,
    composited: u32,
    lights: usize,
    peak_lights: usize,
    peak_registry: usize,
}

impl Totals {
    fn record(&mut self, stats: &FrameStats, registry_len: usize) {
        self.frames += 1;
        if stats.composited {
            self.composited += 1;
        }
        self.lights += stats.lights;
        self.peak_lights = self.peak_lights.max(stats.lights);
        self.peak_registry = self.peak_registry.max(registry_len);
    }
}

struct Battle {
    ships: Vec<Ship>,
    projectiles: Vec<Projectile>,
    beams: Vec<Beam>,
    scene: SceneSnapshot,
    next_id: u64,
}

impl Battle {
    fn new() -> Self {
        let mut battle = Self {
            ships: Vec::new(),
            projectiles: Vec::new(),
            beams: Vec::new(),
            scene: SceneSnapshot::new(),
            next_id: 1,
        };

        for fleet in 0..2 {
            let x = if fleet == 0 { -FLEET_SEPARATION / 2.0 } else { FLEET_SEPARATION / 2.0 };
            let facing_degrees = if fleet == 0 { 0.0 } else { 180.0 };
            for slot in 0..SHIPS_PER_FLEET {
                let entity = EntityId(battle.allocate());
                let location = Vec2::new(x, (slot as f32 - SHIPS_PER_FLEET as f32 / 2.0) * 150.0);
                battle.scene.set_entity(entity, EntityState::new(location, facing_degrees));
                battle.ships.push(Ship {
                    entity,
                    location,
                    facing_degrees,
                    platform: if slot % 3 == 0 { PlatformClass::Fighter } else { PlatformClass::Ship },
                });
            }
        }
        battle
    }

    fn allocate(&mut self) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn sprites(&self) -> Vec<SurfaceSprite> {
        self.ships
            .iter()
            .map(|ship| {
                SurfaceSprite::new(ship.location, 60.0)
                    .with_angle(ship.facing_degrees)
                    .with_normal_map(0.8)
                    .with_surface_map()
            })
            .collect()
    }
}

fn fire_projectile<R: Rng>(
    battle: &mut Battle,
    session: &mut LightingSession,
    catalog: &LightCatalog,
    settings: &SpawnSettings,
    shooter: usize,
    rng: &mut R,
) {
    let weapon = PROJECTILE_WEAPONS[rng.gen_range(0..PROJECTILE_WEAPONS.len())];
    let Some(entry) = catalog.lookup(weapon, LightDataKind::Projectile) else {
        log::warn!("No light data for projectile '{weapon}'");
        return;
    };

    let ship = &battle.ships[shooter];
    let muzzle = rotate_offset(ship.location, Vec2::new(40.0, 0.0), ship.facing_degrees);
    let facing_degrees = ship.facing_degrees + rng.gen_range(-6.0..6.0);
    let platform = ship.platform;
    let direction = Vec2::new(facing_degrees.to_radians().cos(), facing_degrees.to_radians().sin());

    let entity = EntityId(battle.allocate());
    battle.scene.set_entity(entity, EntityState::new(muzzle, facing_degrees));

    let spawn = ProjectileSpawn {
        entity,
        location: muzzle,
        facing_degrees,
        platform,
    };
    let mut light = None;
    for spawned in projectile_lights(entry, &spawn, settings, rng) {
        let tethered = spawned.attachment().entity().is_some();
        let handle = session.registry_mut().insert(spawned);
        if tethered {
            light = Some(handle);
        }
    }

    battle.projectiles.push(Projectile {
        entity,
        weapon,
        platform,
        velocity: direction * PROJECTILE_SPEED,
        ticks_left: (FLEET_SEPARATION / PROJECTILE_SPEED / DT) as u32,
        light,
    });
}

fn fire_beam<R: Rng>(
    battle: &mut Battle,
    session: &mut LightingSession,
    catalog: &LightCatalog,
    settings: &SpawnSettings,
    shooter: usize,
    rng: &mut R,
) {
    let weapon = BEAM_WEAPONS[rng.gen_range(0..BEAM_WEAPONS.len())];
    let Some(entry) = catalog.lookup(weapon, LightDataKind::Beam) else {
        log::warn!("No light data for beam '{weapon}'");
        return;
    };

    let ship = &battle.ships[shooter];
    let origin = ship.location;
    let target = rotate_offset(origin, Vec2::new(FLEET_SEPARATION, 0.0), ship.facing_degrees);
    let platform = ship.platform;
    let spawn = BeamSpawn {
        beam: BeamId(battle.allocate()),
        platform,
        scale: SpawnScale::IDENTITY,
    };

    battle.scene.set_beam(spawn.beam, BeamState::new(origin, target, 1.0));
    for light in beam_lights(entry, &spawn, settings, rng) {
        session.registry_mut().insert(light);
    }
    battle.beams.push(Beam {
        id: spawn.beam,
        origin,
        target,
        ticks_left: BEAM_DURATION_TICKS,
    });
}

fn step_projectiles<R: Rng>(
    battle: &mut Battle,
    session: &mut LightingSession,
    catalog: &LightCatalog,
    settings: &SpawnSettings,
    rng: &mut R,
) {
    let mut arrived = Vec::new();
    for (index, projectile) in battle.projectiles.iter_mut().enumerate() {
        if let Some(state) = battle.scene.entity_mut(projectile.entity) {
            state.location += projectile.velocity * DT;
        }
        projectile.ticks_left = projectile.ticks_left.saturating_sub(1);
        if projectile.ticks_left == 0 {
            arrived.push(index);
        }
    }

    for index in arrived.into_iter().rev() {
        let projectile = battle.projectiles.swap_remove(index);
        let Some(last) = battle.scene.remove_entity(projectile.entity) else {
            continue;
        };

        let attached = projectile
            .light
            .and_then(|handle| session.registry().get(handle))
            .map(Light::intensity);
        session.registry_mut().release_entity(projectile.entity, last);

        let Some(entry) = catalog.lookup(projectile.weapon, LightDataKind::Projectile) else {
            continue;
        };
        let factor = match attached {
            Some(intensity) => impact_factor(entry, intensity),
            None if roll_chance(entry.chance, rng) => 1.0,
            None => continue,
        };
        if let Some(flash) = impact_light(entry, last.location, settings, projectile.platform, factor) {
            session.registry_mut().insert(flash);
        }
    }
}

fn step_beams<R: Rng>(battle: &mut Battle, session: &mut LightingSession, rng: &mut R) {
    let mut finished = Vec::new();
    for (index, beam) in battle.beams.iter_mut().enumerate() {
        beam.ticks_left = beam.ticks_left.saturating_sub(1);
        let brightness = (beam.ticks_left as f32 / 10.0).min(1.0);
        let dealt_damage = rng.gen_bool(0.7);
        battle
            .scene
            .set_beam(beam.id, BeamState::new(beam.origin, beam.target, brightness).with_damage(dealt_damage));
        if beam.ticks_left == 0 {
            finished.push(index);
        }
    }

    for index in finished.into_iter().rev() {
        let beam = battle.beams.swap_remove(index);
        battle.scene.remove_beam(beam.id);
        session.registry_mut().release_beam(beam.id);
    }
}

fn load_config() -> LightingConfig {
    let config = LightingConfig::load_or_default(CONFIG_PATH);
    match config.validate() {
        Ok(()) => config,
        Err(e) => {
            log::warn!("Ignoring {CONFIG_PATH}: {e}");
            LightingConfig::default()
        }
    }
}

fn main() {
    logging::init();
    log::info!("Starting starlight bench");

    let config = load_config();
    let settings = SpawnSettings::from(&config);

    let mut catalog = LightCatalog::new();
    if let Ok(report) = catalog.load_str(LIGHT_DATA, LoadMode::Overwrite) {
        log::info!("Loaded {} light presets", report.loaded);
    }

    let mut backend = RecordingBackend::new(SCREEN.0, SCREEN.1);
    let mut compositor = LightCompositor::new(&config, &mut backend);
    let mut session = LightingSession::new();
    let mut battle = Battle::new();
    let mut rng = StdRng::seed_from_u64(0x5747_4c49);

    session
        .registry_mut()
        .insert(Light::directional(Vec3::new(-0.3, 0.4, -0.85)).with_intensity(0.4));

    let viewport = Viewport::centered(Vec2::zeros(), Vec2::new(SCREEN.0 as f32, SCREEN.1 as f32), 1.0);
    let sprites = battle.sprites();
    let mut totals = Totals::default();
    let started = Instant::now();

    for tick in 0..TICKS {
        for shooter in 0..battle.ships.len() {
            if rng.gen_bool(FIRE_CHANCE_PER_TICK) {
                fire_projectile(&mut battle, &mut session, &catalog, &settings, shooter, &mut rng);
            }
        }
        if tick % 45 == 0 {
            let shooter = rng.gen_range(0..battle.ships.len());
            fire_beam(&mut battle, &mut session, &catalog, &settings, shooter, &mut rng);
        }

        step_projectiles(&mut battle, &mut session, &catalog, &settings, &mut rng);
        step_beams(&mut battle, &mut session, &mut rng);
        session.advance(DT, &battle.scene);

        backend.clear_commands();
        let stats = compositor.render_frame(&mut backend, session.registry(), &battle.scene, &viewport, &sprites);
        totals.record(&stats, session.registry().len());

        if tick % 60 == 0 {
            log::debug!(
                "tick {tick}: {} registered, {} composited ({} line), {} backend commands",
                session.registry().len(),
                stats.lights,
                stats.line_lights,
                backend.commands().len()
            );
        }
    }

    let elapsed = started.elapsed();
    compositor.destroy(&mut backend);

    let mean = if totals.frames == 0 {
        0.0
    } else {
        totals.lights as f64 / f64::from(totals.frames)
    };
    log::info!(
        "{} frames ({} composited) in {:.2?}: mean {:.1} lights, peak {} composited of {} registered",
        totals.frames,
        totals.composited,
        elapsed,
        mean,
        totals.peak_lights,
        totals.peak_registry
    );
    log::info!("Backend resources left after teardown: {}", backend.live_resources());
}
