use nalgebra::Point3;

/// A triangulated world point paired with the RGB color sampled for it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColoredPoint {
    pub position: Point3<f64>,
    pub color: [u8; 3],
}

/// An unordered collection of colored world points.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    points: Vec<ColoredPoint>,
}

impl PointCloud {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, point: ColoredPoint) {
        self.points.push(point);
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ColoredPoint> {
        self.points.iter()
    }
}

impl FromIterator<ColoredPoint> for PointCloud {
    fn from_iter<I: IntoIterator<Item = ColoredPoint>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

impl Extend<ColoredPoint> for PointCloud {
    fn extend<I: IntoIterator<Item = ColoredPoint>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}
