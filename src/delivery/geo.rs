//! Great-circle distance.

use crate::customer::Coordinates;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance between two points, in kilometres.
pub fn haversine_km(a: Coordinates, b: Coordinates) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_distance() {
        let p = Coordinates::new(19.076, 72.8777);
        assert!(haversine_km(p, p).abs() < 1e-9);
    }

    #[test]
    fn symmetric() {
        let a = Coordinates::new(19.076, 72.8777);
        let b = Coordinates::new(18.922, 72.8347);
        assert!((haversine_km(a, b) - haversine_km(b, a)).abs() < 1e-9);
    }

    #[test]
    fn one_degree_of_latitude() {
        let a = Coordinates::new(0.0, 0.0);
        let b = Coordinates::new(1.0, 0.0);
        // 2πR / 360
        assert!((haversine_km(a, b) - 111.19).abs() < 0.01);
    }

    #[test]
    fn mumbai_to_pune() {
        let mumbai = Coordinates::new(19.076, 72.8777);
        let pune = Coordinates::new(18.5204, 73.8567);
        let d = haversine_km(mumbai, pune);
        assert!((115.0..125.0).contains(&d), "got {d}");
    }
}
