//! Per-module shape geometry

use crate::style::DotShape;

/// Which orthogonal neighbours of a module are dark (and drawn)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Neighbors {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

impl Neighbors {
    fn count(self) -> usize {
        [self.left, self.right, self.top, self.bottom]
            .into_iter()
            .filter(|n| *n)
            .count()
    }
}

/// A square cell with an independent radius on each corner,
/// ordered top-left, top-right, bottom-right, bottom-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CellShape {
    pub size: f32,
    pub radii: [f32; 4],
}

impl CellShape {
    fn square(size: f32) -> Self {
        Self {
            size,
            radii: [0.0; 4],
        }
    }

    fn circle(size: f32) -> Self {
        Self {
            size,
            radii: [size / 2.0; 4],
        }
    }

    /// Whether the point `(u, v)`, relative to the cell's top-left, is filled
    pub fn contains(&self, u: f32, v: f32) -> bool {
        let s = self.size;
        if u < 0.0 || v < 0.0 || u > s || v > s {
            return false;
        }
        let [tl, tr, br, bl] = self.radii;
        let outside = |r: f32, cx: f32, cy: f32, in_corner: bool| {
            r > 0.0 && in_corner && (u - cx).powi(2) + (v - cy).powi(2) > r * r
        };

        !(outside(tl, tl, tl, u < tl && v < tl)
            || outside(tr, s - tr, tr, u > s - tr && v < tr)
            || outside(br, s - br, s - br, u > s - br && v > s - br)
            || outside(bl, bl, s - bl, u < bl && v > s - bl))
    }
}

/// Geometry of one dark module drawn with `shape`
pub(crate) fn cell_shape(shape: DotShape, size: f32, n: Neighbors) -> CellShape {
    let half = size / 2.0;
    match shape {
        DotShape::Square => CellShape::square(size),
        DotShape::Dots => CellShape::circle(size),
        DotShape::Rounded => joined(size, n, half),
        DotShape::ExtraRounded => joined(size, n, size),
        DotShape::Classy => classy(size, n, half),
        DotShape::ClassyRounded => classy(size, n, size),
    }
}

fn joined(size: f32, n: Neighbors, corner_radius: f32) -> CellShape {
    let half = size / 2.0;
    let mut radii = [0.0; 4];
    match n.count() {
        0 => return CellShape::circle(size),
        1 => {
            // Round the side facing away from the only neighbour.
            let sides = if n.left {
                [1, 2]
            } else if n.right {
                [0, 3]
            } else if n.top {
                [2, 3]
            } else {
                [0, 1]
            };
            for i in sides {
                radii[i] = half;
            }
        }
        2 if !(n.left && n.right) && !(n.top && n.bottom) => {
            let corner = match (n.left, n.top) {
                (true, true) => 2,
                (true, false) => 1,
                (false, true) => 3,
                (false, false) => 0,
            };
            radii[corner] = corner_radius;
        }
        _ => {}
    }
    CellShape { size, radii }
}

fn classy(size: f32, n: Neighbors, corner_radius: f32) -> CellShape {
    let half = size / 2.0;
    let mut radii = [0.0; 4];
    if n.count() == 0 {
        radii[0] = half;
        radii[2] = half;
    } else if !n.left && !n.top {
        radii[0] = corner_radius;
    } else if !n.right && !n.bottom {
        radii[2] = corner_radius;
    }
    CellShape { size, radii }
}
