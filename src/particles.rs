//! Wind particle advection
//!
//! A fixed population of massless tracers in geographic space. Each tick every
//! particle goes through `step`, a pure transition function: it either moves
//! with the sampled wind or is respawned in place at a fresh random position.
//! Nothing is ever deallocated; the population size never changes.

use crate::regions::{Bounds, RegionMask};
use crate::util::Rng;
use crate::wind::WindField;

/// Meters per degree of latitude
pub const METERS_PER_DEG: f64 = 111_320.0;

/// Floor for cos(lat) so longitude scaling stays finite near the poles
const MIN_COS_LAT: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParticleState {
    Alive,
    /// Respawned this tick; its trail segment is suppressed once
    JustRespawned,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub lat: f64,
    pub lon: f64,
    /// Ticks survived since the last respawn
    pub age: u32,
    pub state: ParticleState,
}

impl Particle {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            age: 0,
            state: ParticleState::JustRespawned,
        }
    }

    #[inline]
    pub fn just_respawned(&self) -> bool {
        self.state == ParticleState::JustRespawned
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdvectionParams {
    /// Ticks before a particle is recycled
    pub max_age: u32,
    /// Simulated seconds per tick (the integration dt)
    pub time_scale: f64,
    /// Speeds at or below this (m/s) count as calm
    pub calm_threshold: f64,
    /// Rejection-sampling tries before falling back to the view center
    pub respawn_attempts: u32,
}

impl Default for AdvectionParams {
    fn default() -> Self {
        Self {
            max_age: 90,
            time_scale: 300.0,
            calm_threshold: 0.05,
            respawn_attempts: 40,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RespawnReason {
    Expired,
    OutsideRegion,
    OutsideView,
    /// No field, no sample, or speed at or below the calm threshold
    Calm,
    /// The move would have left the region
    Blocked,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Moved { dlat: f64, dlon: f64 },
    Respawned(RespawnReason),
}

/// Where particles may live this tick: the region seen through the viewport
#[derive(Debug, Clone, Copy)]
pub struct SpawnArea<'a> {
    pub mask: &'a RegionMask,
    /// Geographic bounds of the viewport
    pub view: Bounds,
}

impl<'a> SpawnArea<'a> {
    pub fn new(mask: &'a RegionMask, view: Bounds) -> Self {
        Self { mask, view }
    }

    #[inline]
    fn admits(&self, lat: f64, lon: f64) -> bool {
        self.mask.inside_region(lat, lon)
    }
}

/// Degree displacement for wind (u east, v north) over `dt` seconds at `lat`
pub fn displacement(u: f64, v: f64, lat: f64, dt: f64) -> (f64, f64) {
    let cos_lat = lat.to_radians().cos().abs().max(MIN_COS_LAT);
    let dlat = v * dt / METERS_PER_DEG;
    let dlon = u * dt / (METERS_PER_DEG * cos_lat);
    (dlat, dlon)
}

/// Reinitialize `p` at a random admitted point of the view, or the view center
pub fn respawn(p: &mut Particle, area: &SpawnArea<'_>, attempts: u32, rng: &mut Rng) {
    let v = &area.view;
    let spot = (0..attempts)
        .map(|_| {
            (
                rng.range_f64(v.min_lat, v.max_lat),
                rng.range_f64(v.min_lon, v.max_lon),
            )
        })
        .find(|&(lat, lon)| area.admits(lat, lon));

    let (lat, lon) = spot.unwrap_or_else(|| v.center());
    *p = Particle::new(lat, lon);
}

/// Advance one particle by one tick
pub fn step(
    p: &mut Particle,
    area: &SpawnArea<'_>,
    field: Option<&WindField>,
    params: &AdvectionParams,
    rng: &mut Rng,
) -> Transition {
    let reason = if p.age > params.max_age {
        Some(RespawnReason::Expired)
    } else if !area.admits(p.lat, p.lon) {
        Some(RespawnReason::OutsideRegion)
    } else if !area.view.contains(p.lat, p.lon) {
        Some(RespawnReason::OutsideView)
    } else {
        None
    };

    if let Some(reason) = reason {
        respawn(p, area, params.respawn_attempts, rng);
        return Transition::Respawned(reason);
    }

    let wind = field
        .and_then(|f| f.sample(p.lat, p.lon))
        .filter(|w| w.s > params.calm_threshold);
    let Some(wind) = wind else {
        respawn(p, area, params.respawn_attempts, rng);
        return Transition::Respawned(RespawnReason::Calm);
    };

    let (dlat, dlon) = displacement(wind.u, wind.v, p.lat, params.time_scale);
    let (lat, lon) = (p.lat + dlat, p.lon + dlon);
    if !area.admits(lat, lon) {
        respawn(p, area, params.respawn_attempts, rng);
        return Transition::Respawned(RespawnReason::Blocked);
    }

    p.lat = lat;
    p.lon = lon;
    p.age += 1;
    p.state = ParticleState::Alive;
    Transition::Moved { dlat, dlon }
}

/// Fixed-size particle population
pub struct ParticleSystem {
    particles: Vec<Particle>,
    params: AdvectionParams,
}

impl ParticleSystem {
    pub fn new(count: usize, params: AdvectionParams) -> Self {
        Self {
            particles: vec![Particle::new(0.0, 0.0); count],
            params,
        }
    }

    pub fn params(&self) -> &AdvectionParams {
        &self.params
    }

    /// Place every particle afresh, with staggered ages so they don't all
    /// expire on the same tick
    pub fn seed(&mut self, area: &SpawnArea<'_>, rng: &mut Rng) {
        let span = u64::from(self.params.max_age) + 1;
        for p in &mut self.particles {
            respawn(p, area, self.params.respawn_attempts, rng);
            p.age = (rng.next_u64() % span) as u32;
        }
    }

    /// Step every particle. `visit` sees the position before the step and the
    /// particle after it.
    pub fn advance(
        &mut self,
        area: &SpawnArea<'_>,
        field: Option<&WindField>,
        rng: &mut Rng,
        mut visit: impl FnMut((f64, f64), &Particle, Transition),
    ) {
        for p in &mut self.particles {
            let before = (p.lat, p.lon);
            let t = step(p, area, field, &self.params, rng);
            visit(before, p, t);
        }
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn particles_mut(&mut self) -> &mut [Particle] {
        &mut self.particles
    }

    pub fn count(&self) -> usize {
        self.particles.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::ObservationCell;
    use crate::regions::{Polygon, RegionGeometry, Ring};

    fn square_mask(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> RegionMask {
        let ring = Ring::from_lon_lat(&[
            [min_lon, min_lat],
            [max_lon, min_lat],
            [max_lon, max_lat],
            [min_lon, max_lat],
        ]);
        RegionMask::new(RegionGeometry::Polygon(Polygon::new(vec![ring])))
    }

    fn steady_wind(speed: f64, dir: f64) -> WindField {
        WindField::build(&[
            ObservationCell::new("a", 10.0, 100.0).with_wind(speed, dir),
            ObservationCell::new("b", 20.0, 110.0).with_wind(speed, dir),
        ])
    }

    fn alive(lat: f64, lon: f64, age: u32) -> Particle {
        Particle {
            lat,
            lon,
            age,
            state: ParticleState::Alive,
        }
    }

    #[test]
    fn test_displacement_scaling() {
        let (dlat, dlon) = displacement(0.0, METERS_PER_DEG, 0.0, 1.0);
        assert!((dlat - 1.0).abs() < 1e-12);
        assert!(dlon.abs() < 1e-12);
        // At 60° a degree of longitude is half as long
        let (_, dlon) = displacement(METERS_PER_DEG, 0.0, 60.0, 1.0);
        assert!((dlon - 2.0).abs() < 1e-9);
        // Pole stays finite
        let (_, dlon) = displacement(1.0, 0.0, 90.0, 1.0);
        assert!(dlon.is_finite());
    }

    #[test]
    fn test_expired_particle_respawns() {
        let mask = square_mask(100.0, 10.0, 110.0, 20.0);
        let area = SpawnArea::new(&mask, Bounds::new(100.0, 10.0, 110.0, 20.0));
        let field = steady_wind(5.0, 270.0);
        let params = AdvectionParams::default();
        let mut rng = Rng::new(1);

        let mut p = alive(15.0, 105.0, params.max_age + 1);
        let t = step(&mut p, &area, Some(&field), &params, &mut rng);
        assert_eq!(t, Transition::Respawned(RespawnReason::Expired));
        assert_eq!(p.age, 0);
        assert!(p.just_respawned());
        assert!(mask.inside_region(p.lat, p.lon));
    }

    #[test]
    fn test_age_at_limit_still_moves() {
        let mask = square_mask(100.0, 10.0, 110.0, 20.0);
        let area = SpawnArea::new(&mask, Bounds::new(100.0, 10.0, 110.0, 20.0));
        let field = steady_wind(5.0, 270.0);
        let params = AdvectionParams::default();
        let mut rng = Rng::new(1);

        let mut p = alive(15.0, 105.0, params.max_age);
        assert!(matches!(
            step(&mut p, &area, Some(&field), &params, &mut rng),
            Transition::Moved { .. }
        ));
        assert_eq!(p.age, params.max_age + 1);
        // One tick over the limit, then recycled
        assert!(matches!(
            step(&mut p, &area, Some(&field), &params, &mut rng),
            Transition::Respawned(RespawnReason::Expired)
        ));
    }

    #[test]
    fn test_moves_downwind_and_clears_flag() {
        let mask = square_mask(100.0, 10.0, 110.0, 20.0);
        let area = SpawnArea::new(&mask, Bounds::new(100.0, 10.0, 110.0, 20.0));
        // West wind pushes east
        let field = steady_wind(5.0, 270.0);
        let params = AdvectionParams::default();
        let mut rng = Rng::new(3);

        let mut p = Particle::new(15.0, 105.0);
        let t = step(&mut p, &area, Some(&field), &params, &mut rng);
        let Transition::Moved { dlat, dlon } = t else {
            panic!("expected a move, got {:?}", t);
        };
        assert!(dlon > 0.0);
        assert!(dlat.abs() < 1e-9);
        assert_eq!(p.state, ParticleState::Alive);
        assert_eq!(p.age, 1);
    }

    #[test]
    fn test_calm_or_missing_field_respawns() {
        let mask = square_mask(100.0, 10.0, 110.0, 20.0);
        let area = SpawnArea::new(&mask, Bounds::new(100.0, 10.0, 110.0, 20.0));
        let params = AdvectionParams::default();
        let mut rng = Rng::new(5);

        let mut p = alive(15.0, 105.0, 3);
        assert_eq!(
            step(&mut p, &area, None, &params, &mut rng),
            Transition::Respawned(RespawnReason::Calm)
        );

        let calm = steady_wind(0.05, 90.0);
        let mut p = alive(15.0, 105.0, 3);
        assert_eq!(
            step(&mut p, &area, Some(&calm), &params, &mut rng),
            Transition::Respawned(RespawnReason::Calm)
        );
    }

    #[test]
    fn test_leaving_region_respawns_instead_of_moving() {
        let mask = square_mask(100.0, 10.0, 110.0, 20.0);
        let area = SpawnArea::new(&mask, Bounds::new(95.0, 5.0, 115.0, 25.0));
        let field = steady_wind(20.0, 270.0);
        let params = AdvectionParams {
            time_scale: 50_000.0,
            ..AdvectionParams::default()
        };
        let mut rng = Rng::new(9);

        // 20 m/s for 50 000 s is ~9 degrees east, out of the square
        let mut p = alive(15.0, 109.0, 2);
        assert_eq!(
            step(&mut p, &area, Some(&field), &params, &mut rng),
            Transition::Respawned(RespawnReason::Blocked)
        );
        assert!(mask.inside_region(p.lat, p.lon));
    }

    #[test]
    fn test_outside_region_respawns() {
        let mask = square_mask(100.0, 10.0, 110.0, 20.0);
        let area = SpawnArea::new(&mask, Bounds::new(95.0, 5.0, 115.0, 25.0));
        let field = steady_wind(5.0, 0.0);
        let params = AdvectionParams::default();
        let mut rng = Rng::new(11);

        let mut p = alive(22.0, 105.0, 2);
        assert_eq!(
            step(&mut p, &area, Some(&field), &params, &mut rng),
            Transition::Respawned(RespawnReason::OutsideRegion)
        );
    }

    #[test]
    fn test_respawn_falls_back_to_view_center() {
        // View lies entirely outside the region, so sampling always fails
        let mask = square_mask(100.0, 10.0, 110.0, 20.0);
        let area = SpawnArea::new(&mask, Bounds::new(0.0, 0.0, 2.0, 4.0));
        let mut rng = Rng::new(13);
        let mut p = alive(15.0, 105.0, 7);
        respawn(&mut p, &area, 40, &mut rng);
        assert_eq!((p.lat, p.lon), (2.0, 1.0));
        assert_eq!(p.age, 0);
        assert!(p.just_respawned());
    }

    #[test]
    fn test_population_is_fixed() {
        let mask = square_mask(100.0, 10.0, 110.0, 20.0);
        let area = SpawnArea::new(&mask, Bounds::new(100.0, 10.0, 110.0, 20.0));
        let field = steady_wind(4.0, 45.0);
        let mut rng = Rng::new(17);
        let mut system = ParticleSystem::new(200, AdvectionParams::default());
        system.seed(&area, &mut rng);

        for _ in 0..300 {
            system.advance(&area, Some(&field), &mut rng, |_, p, _| {
                assert!(p.age <= AdvectionParams::default().max_age + 1);
            });
        }
        assert_eq!(system.count(), 200);
        assert!(system.particles().iter().all(|p| mask.inside_region(p.lat, p.lon)));
    }
}
