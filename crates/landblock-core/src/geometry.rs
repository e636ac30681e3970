use crate::glam::{IVec2, Vec2};

/// An axis-aligned rectangle of integer grid points. Both `minimum` and `maximum` are inclusive.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GridExtent {
    pub minimum: IVec2,
    pub maximum: IVec2,
}

impl GridExtent {
    pub fn from_min_and_max(minimum: IVec2, maximum: IVec2) -> Self {
        Self { minimum, maximum }
    }

    pub fn is_empty(&self) -> bool {
        self.minimum.x > self.maximum.x || self.minimum.y > self.maximum.y
    }

    pub fn contains(&self, p: IVec2) -> bool {
        p.cmpge(self.minimum).all() && p.cmple(self.maximum).all()
    }

    pub fn intersection(&self, other: &Self) -> Self {
        Self {
            minimum: self.minimum.max(other.minimum),
            maximum: self.maximum.min(other.maximum),
        }
    }

    /// Iterates over all points, `x` in the outer loop.
    pub fn iter2(&self) -> impl Iterator<Item = IVec2> {
        let Self { minimum, maximum } = *self;
        (minimum.x..=maximum.x)
            .flat_map(move |x| (minimum.y..=maximum.y).map(move |y| IVec2::new(x, y)))
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Circle {
    pub center: Vec2,
    pub radius: f32,
}

impl Circle {
    pub fn new(center: Vec2, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Inclusive of the boundary.
    pub fn contains(&self, p: Vec2) -> bool {
        self.center.distance(p) <= self.radius
    }

    /// The smallest [`GridExtent`] covering every grid point that could be inside the circle.
    pub fn grid_extent(&self) -> GridExtent {
        let r = Vec2::splat(self.radius);
        GridExtent::from_min_and_max(
            (self.center - r).floor().as_ivec2(),
            (self.center + r).ceil().as_ivec2(),
        )
    }
}

/// Steps through the grid points of the segment `start..=end` with an integer error accumulator (Bresenham). Works in all
/// octants and always yields both endpoints.
#[derive(Clone, Debug)]
pub struct GridLine {
    current: IVec2,
    end: IVec2,
    delta: IVec2,
    step: IVec2,
    error: i32,
    done: bool,
}

impl GridLine {
    pub fn new(start: IVec2, end: IVec2) -> Self {
        let diff = end - start;
        let delta = IVec2::new(diff.x.abs(), -diff.y.abs());
        Self {
            current: start,
            end,
            delta,
            step: diff.signum(),
            error: delta.x + delta.y,
            done: false,
        }
    }
}

impl Iterator for GridLine {
    type Item = IVec2;

    fn next(&mut self) -> Option<IVec2> {
        if self.done {
            return None;
        }
        let point = self.current;
        if point == self.end {
            self.done = true;
            return Some(point);
        }
        let e2 = 2 * self.error;
        if e2 >= self.delta.y {
            self.error += self.delta.y;
            self.current.x += self.step.x;
        }
        if e2 <= self.delta.x {
            self.error += self.delta.x;
            self.current.y += self.step.y;
        }
        Some(point)
    }
}

// ████████╗███████╗███████╗████████╗
// ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝
//    ██║   █████╗  ███████╗   ██║
//    ██║   ██╔══╝  ╚════██║   ██║
//    ██║   ███████╗███████║   ██║
//    ╚═╝   ╚══════╝╚══════╝   ╚═╝

#[cfg(test)]
mod test {
    use super::*;

    use approx::assert_relative_eq;

    #[test]
    fn circle_extent_covers_radius() {
        let circle = Circle::new(Vec2::new(2.5, 3.0), 1.5);
        let extent = circle.grid_extent();
        assert_eq!(extent.minimum, IVec2::new(1, 1));
        assert_eq!(extent.maximum, IVec2::new(4, 5));

        let inside: Vec<_> = extent.iter2().filter(|p| circle.contains(p.as_vec2())).collect();
        for p in inside.iter() {
            assert!(circle.center.distance(p.as_vec2()) <= 1.5);
        }
        assert!(inside.contains(&IVec2::new(2, 3)));
        assert!(!inside.contains(&IVec2::new(1, 1)));
    }

    #[test]
    fn circle_boundary_is_inclusive() {
        let circle = Circle::new(Vec2::ZERO, 1.0);
        assert!(circle.contains(Vec2::new(1.0, 0.0)));
        assert!(!circle.contains(Vec2::new(1.0, 0.1)));
        assert_relative_eq!(circle.center.distance(Vec2::new(0.0, 1.0)), 1.0);
    }

    #[test]
    fn extent_intersection_and_count() {
        let a = GridExtent::from_min_and_max(IVec2::ZERO, IVec2::splat(4));
        let b = GridExtent::from_min_and_max(IVec2::splat(3), IVec2::splat(10));
        let i = a.intersection(&b);
        assert_eq!(i.iter2().count(), 4);
        assert!(i.contains(IVec2::new(4, 3)));

        let disjoint =
            a.intersection(&GridExtent::from_min_and_max(IVec2::splat(6), IVec2::splat(7)));
        assert!(disjoint.is_empty());
        assert_eq!(disjoint.iter2().count(), 0);
    }

    #[test]
    fn line_single_point() {
        let points: Vec<_> = GridLine::new(IVec2::new(3, 3), IVec2::new(3, 3)).collect();
        assert_eq!(points, vec![IVec2::new(3, 3)]);
    }

    #[test]
    fn line_shallow_slope() {
        let points: Vec<_> = GridLine::new(IVec2::new(0, 0), IVec2::new(4, 2)).collect();
        assert_eq!(
            points,
            vec![
                IVec2::new(0, 0),
                IVec2::new(1, 1),
                IVec2::new(2, 1),
                IVec2::new(3, 2),
                IVec2::new(4, 2),
            ]
        );
    }

    #[test]
    fn line_is_connected_in_every_direction() {
        let ends = [
            IVec2::new(5, -3),
            IVec2::new(-5, 3),
            IVec2::new(-2, -7),
            IVec2::new(0, 6),
            IVec2::new(-6, 0),
        ];
        for &end in ends.iter() {
            let points: Vec<_> = GridLine::new(IVec2::ZERO, end).collect();
            assert_eq!(points.first(), Some(&IVec2::ZERO));
            assert_eq!(points.last(), Some(&end));
            assert_eq!(points.len() as i32, end.x.abs().max(end.y.abs()) + 1);
            for pair in points.windows(2) {
                let step = (pair[1] - pair[0]).abs();
                assert!(step.max_element() == 1, "{:?}", pair);
            }
        }
    }
}
