// Axis-separated positional correction against a single obstacle.
//
// X is swept before Y, which makes diagonal moves slide along walls. The one-unit gap
// left after a clamp is part of the client-visible position and must not change.

use crate::domain::geometry::{BoundingBox, Vec2};

/// Corrects an actor that moved from `start` to `attempted` so its box no longer overlaps `obstacle`.
///
/// `size` is the actor's (width, height). An actor that already overlapped the obstacle at
/// `start` keeps `attempted` unchanged.
pub fn resolve(obstacle: &BoundingBox, start: Vec2, attempted: Vec2, size: Vec2) -> Vec2 {
    let actor_box = |pos: Vec2| BoundingBox::new(pos, pos + size);

    if actor_box(start).touching(obstacle) {
        return attempted;
    }

    let delta = attempted - start;
    let mut pos = start.with_x(start.x + delta.x);
    if actor_box(pos).touching(obstacle) {
        if delta.x > 0.0 {
            pos = pos.with_x(obstacle.left() - size.x - 1.0);
        } else if delta.x < 0.0 {
            pos = pos.with_x(obstacle.right() + 1.0);
        }
    }

    pos = pos.with_y(pos.y + delta.y);
    if actor_box(pos).touching(obstacle) {
        if delta.y > 0.0 {
            pos = pos.with_y(obstacle.top() - size.y - 1.0);
        } else if delta.y < 0.0 {
            pos = pos.with_y(obstacle.bottom() + 1.0);
        }
    }

    pos
}

/// Resolves against several obstacles, nearest (to `attempted`) first.
///
/// `obstacles` pairs each obstacle's box with the point used for distance ordering.
pub fn resolve_all(
    obstacles: &mut [(Vec2, BoundingBox)],
    start: Vec2,
    attempted: Vec2,
    size: Vec2,
) -> Vec2 {
    obstacles.sort_by(|(a, _), (b, _)| a.dist_to(attempted).total_cmp(&b.dist_to(attempted)));
    obstacles
        .iter()
        .fold(attempted, |pos, (_, obstacle)| resolve(obstacle, start, pos, size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ACTOR: Vec2 = Vec2::new(28.0, 28.0);

    fn wall() -> BoundingBox {
        BoundingBox::new(Vec2::new(32.0, 32.0), Vec2::new(64.0, 64.0))
    }

    #[test]
    fn when_moving_right_into_wall_then_x_clamps_one_unit_short() {
        // Vertically aligned with the wall, so only the x sweep collides.
        let end = resolve(&wall(), Vec2::new(0.0, 20.0), Vec2::new(20.0, 40.0), ACTOR);
        assert_eq!(end, Vec2::new(3.0, 40.0));
    }

    #[test]
    fn when_moving_diagonally_into_corner_then_actor_slides_along_x() {
        let end = resolve(&wall(), Vec2::new(0.0, 0.0), Vec2::new(20.0, 20.0), ACTOR);
        assert_eq!(end, Vec2::new(20.0, 3.0));
    }

    #[test]
    fn when_moving_left_and_up_into_wall_then_clamps_past_far_edges() {
        let end = resolve(&wall(), Vec2::new(70.0, 40.0), Vec2::new(60.0, 30.0), ACTOR);
        assert_eq!(end, Vec2::new(65.0, 30.0));

        let end = resolve(&wall(), Vec2::new(40.0, 70.0), Vec2::new(40.0, 60.0), ACTOR);
        assert_eq!(end, Vec2::new(40.0, 65.0));
    }

    #[test]
    fn when_actor_already_overlaps_then_attempted_position_is_kept() {
        let end = resolve(&wall(), Vec2::new(20.0, 20.0), Vec2::new(40.0, 40.0), ACTOR);
        assert_eq!(end, Vec2::new(40.0, 40.0));
    }

    #[test]
    fn when_several_walls_are_hit_then_nearest_is_resolved_first() {
        // Two stacked wall cells to the right of the actor.
        let upper = BoundingBox::new(Vec2::new(32.0, 0.0), Vec2::new(64.0, 32.0));
        let lower = BoundingBox::new(Vec2::new(32.0, 32.0), Vec2::new(64.0, 64.0));
        let mut obstacles = vec![(lower.min, lower), (upper.min, upper)];
        let end = resolve_all(&mut obstacles, Vec2::new(2.0, 2.0), Vec2::new(12.0, 12.0), ACTOR);
        assert_eq!(end, Vec2::new(3.0, 12.0));
        assert_eq!(obstacles[0].1, upper);
    }

    proptest! {
        #[test]
        fn prop_resolved_actor_never_overlaps_obstacle(
            ox in -200.0f64..200.0,
            oy in -200.0f64..200.0,
            ow in 1.0f64..96.0,
            oh in 1.0f64..96.0,
            sx in -300.0f64..300.0,
            sy in -300.0f64..300.0,
            dx in -60.0f64..60.0,
            dy in -60.0f64..60.0,
        ) {
            let obstacle = BoundingBox::new(Vec2::new(ox, oy), Vec2::new(ox + ow, oy + oh));
            let start = Vec2::new(sx, sy);
            let end = resolve(&obstacle, start, start + Vec2::new(dx, dy), ACTOR);

            let started_inside = BoundingBox::new(start, start + ACTOR).touching(&obstacle);
            prop_assume!(!started_inside);
            prop_assert!(!BoundingBox::new(end, end + ACTOR).touching(&obstacle));
        }
    }
}
