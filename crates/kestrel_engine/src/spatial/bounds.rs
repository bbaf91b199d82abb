//! Bounding volumes and the view frustum

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Zero-size box at the origin
    pub fn zero() -> Self {
        Self::new(Vec3::zeros(), Vec3::zeros())
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// A box with no extent along any axis.
    ///
    /// Culling never rejects these; bounds that were never computed look
    /// like this.
    pub fn is_degenerate(&self) -> bool {
        (self.max - self.min).iter().all(|d| d.abs() <= f32::EPSILON)
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Whether `other` lies entirely inside this box
    pub fn contains(&self, other: &AABB) -> bool {
        self.min.x <= other.min.x && self.min.y <= other.min.y && self.min.z <= other.min.z &&
        self.max.x >= other.max.x && self.max.y >= other.max.y && self.max.z >= other.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Smallest box containing both
    pub fn merged(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Box grown by `margin` on every side
    pub fn grown(&self, margin: f32) -> AABB {
        let pad = Vec3::repeat(margin);
        AABB {
            min: self.min - pad,
            max: self.max + pad,
        }
    }

    /// Surface area, the cost metric of the dynamic tree
    pub fn surface_area(&self) -> f32 {
        let d = self.max - self.min;
        2.0 * (d.x * d.y + d.y * d.z + d.z * d.x)
    }

    /// Bounds of this box after an affine transform.
    ///
    /// Uses the absolute-value matrix trick (Arvo), so the result is the
    /// tightest axis-aligned box around the transformed corners.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        let center = self.center();
        let extents = self.extents();
        let new_center = matrix.transform_point(&Point3::from(center)).coords;
        let mut new_extents = Vec3::zeros();
        for i in 0..3 {
            for j in 0..3 {
                new_extents[i] += matrix[(i, j)].abs() * extents[j];
            }
        }
        AABB::from_center_extents(new_center, new_extents)
    }
}

impl Default for AABB {
    fn default() -> Self {
        Self::zero()
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (should be normalized)
    pub normal: Vec3,
    /// Signed distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a plane, normalizing the equation
    pub fn new(normal: Vec3, distance: f32) -> Self {
        let length = normal.magnitude();
        if length > f32::EPSILON {
            Self {
                normal: normal / length,
                distance: distance / length,
            }
        } else {
            Self { normal, distance }
        }
    }

    fn from_row(row: Vec4) -> Self {
        Self::new(row.xyz(), row.w)
    }

    /// Signed distance, positive on the side the normal points to
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }
}

/// Frustum for visibility culling
#[derive(Debug, Clone)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far),
    /// normals pointing inward
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// This uses the Gribb-Hartmann method: each plane is the sum or the
    /// difference of the fourth row with one of the first three.
    pub fn from_matrix(vp_matrix: &Mat4) -> Self {
        let row = |i: usize| -> Vec4 { vp_matrix.row(i).transpose() };
        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        Self {
            planes: [
                Plane::from_row(r3 + r0),
                Plane::from_row(r3 - r0),
                Plane::from_row(r3 + r1),
                Plane::from_row(r3 - r1),
                Plane::from_row(r3 + r2),
                Plane::from_row(r3 - r2),
            ],
        }
    }

    /// Check if an AABB is inside or intersects the frustum
    ///
    /// Degenerate boxes always pass.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_degenerate() {
            return true;
        }
        for plane in &self.planes {
            // corner furthest along the plane normal
            let mut p = aabb.min;
            if plane.normal.x >= 0.0 { p.x = aabb.max.x; }
            if plane.normal.y >= 0.0 { p.y = aabb.max.y; }
            if plane.normal.z >= 0.0 { p.z = aabb.max.z; }

            if plane.distance_to_point(p) < 0.0 {
                return false;
            }
        }
        true
    }

    /// Check if a point is inside the frustum
    pub fn contains_point(&self, point: Vec3) -> bool {
        self.planes.iter().all(|plane| plane.distance_to_point(point) >= 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{utils, Mat4Ext, Quat};
    use approx::assert_relative_eq;

    fn camera_frustum() -> Frustum {
        let proj = Mat4::perspective(utils::deg_to_rad(90.0), 1.0, 0.1, 100.0);
        let view = Mat4::view_from(&Vec3::zeros(), &Quat::identity());
        Frustum::from_matrix(&(proj * view))
    }

    #[test]
    fn test_planes_are_normalized() {
        for plane in camera_frustum().planes {
            assert_relative_eq!(plane.normal.magnitude(), 1.0, epsilon = 1e-5);
        }
    }

    #[test]
    fn test_box_in_front_is_visible() {
        let frustum = camera_frustum();
        let ahead = AABB::from_center_extents(Vec3::new(0.0, 0.0, -10.0), Vec3::repeat(1.0));
        assert!(frustum.intersects_aabb(&ahead));
        assert!(frustum.contains_point(Vec3::new(0.0, 0.0, -10.0)));
    }

    #[test]
    fn test_box_behind_or_beyond_is_culled() {
        let frustum = camera_frustum();
        let behind = AABB::from_center_extents(Vec3::new(0.0, 0.0, 10.0), Vec3::repeat(1.0));
        let too_far = AABB::from_center_extents(Vec3::new(0.0, 0.0, -200.0), Vec3::repeat(1.0));
        let off_side = AABB::from_center_extents(Vec3::new(50.0, 0.0, -10.0), Vec3::repeat(1.0));
        assert!(!frustum.intersects_aabb(&behind));
        assert!(!frustum.intersects_aabb(&too_far));
        assert!(!frustum.intersects_aabb(&off_side));
    }

    #[test]
    fn test_straddling_box_is_visible() {
        let frustum = camera_frustum();
        // crosses the near plane
        let straddle = AABB::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 5.0));
        assert!(frustum.intersects_aabb(&straddle));
    }

    #[test]
    fn test_degenerate_box_always_visible() {
        let frustum = camera_frustum();
        let point_behind = AABB::new(Vec3::new(0.0, 0.0, 50.0), Vec3::new(0.0, 0.0, 50.0));
        assert!(point_behind.is_degenerate());
        assert!(frustum.intersects_aabb(&point_behind));
    }

    #[test]
    fn test_transformed_box() {
        let unit = AABB::from_center_extents(Vec3::zeros(), Vec3::repeat(1.0));
        let moved = unit.transformed(&Mat4::new_translation(&Vec3::new(5.0, 0.0, 0.0)));
        assert_relative_eq!(moved.center(), Vec3::new(5.0, 0.0, 0.0), epsilon = 1e-6);

        let rotated = unit.transformed(&Mat4::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4));
        let half_diagonal = 2.0_f32.sqrt();
        assert_relative_eq!(rotated.extents().x, half_diagonal, epsilon = 1e-5);
        assert_relative_eq!(rotated.extents().z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_merge_and_contains() {
        let a = AABB::new(Vec3::zeros(), Vec3::repeat(1.0));
        let b = AABB::new(Vec3::repeat(2.0), Vec3::repeat(3.0));
        let m = a.merged(&b);
        assert!(m.contains(&a) && m.contains(&b));
        assert!(!a.intersects(&b));
        assert!(m.grown(0.5).contains(&m));
        assert_relative_eq!(a.surface_area(), 6.0);
    }
}
