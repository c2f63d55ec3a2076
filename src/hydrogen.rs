//! Real-gas properties of hydrogen.
//!
//! Compressibility factors come from a tabulated `Z(T, p)` grid with
//! bilinear interpolation; queries outside the grid take the nearest edge.

/// Universal gas constant in J/(mol K).
pub const R_UNIVERSAL: f64 = 8.314;
/// Molar mass of hydrogen in kg/mol.
pub const MOLAR_MASS_H2: f64 = 2.016e-3;
/// Specific gas constant of hydrogen in J/(kg K).
pub const R_H2: f64 = R_UNIVERSAL / MOLAR_MASS_H2;

const BAR: f64 = 1e5;

const Z_TEMPERATURES: [f64; 8] = [200.0, 300.0, 400.0, 500.0, 600.0, 800.0, 1000.0, 2000.0];
const Z_PRESSURES: [f64; 12] = [
    1.0, 10.0, 20.0, 40.0, 60.0, 80.0, 100.0, 200.0, 400.0, 600.0, 800.0, 1000.0,
];

#[rustfmt::skip]
const Z_TABLE: [[f64; 12]; 8] = [
    [1.0007, 1.0066, 1.0134, 1.0275, 1.0422, 1.0575, 1.0734, 1.163, 1.355, 1.555, 1.753, 1.936],
    [1.0005, 1.0059, 1.0117, 1.0236, 1.0357, 1.0479, 1.0603, 1.124, 1.253, 1.383, 1.510, 1.636],
    [1.0004, 1.0048, 1.0096, 1.0192, 1.0289, 1.0386, 1.0484, 1.098, 1.196, 1.293, 1.388, 1.481],
    [1.0004, 1.0040, 1.0080, 1.0160, 1.0240, 1.0320, 1.0400, 1.080, 1.159, 1.236, 1.311, 1.385],
    [1.0003, 1.0034, 1.0068, 1.0136, 1.0204, 1.0272, 1.0340, 1.068, 1.133, 1.197, 1.259, 1.320],
    [1.0002, 1.0026, 1.0052, 1.0104, 1.0156, 1.0208, 1.0259, 1.051, 1.100, 1.147, 1.193, 1.237],
    [1.0002, 1.0021, 1.0042, 1.0084, 1.0126, 1.0168, 1.0209, 1.041, 1.080, 1.117, 1.153, 1.187],
    [1.0009, 1.0013, 1.0023, 1.0044, 1.0065, 1.0086, 1.0107, 1.021, 1.040, 1.057, 1.073, 1.088],
];

/// Index of the grid cell containing `x` and the fractional position in it.
fn locate(grid: &[f64], x: f64) -> (usize, f64) {
    let last = grid.len() - 1;
    if x <= grid[0] {
        return (0, 0.0);
    }
    if x >= grid[last] {
        return (last - 1, 1.0);
    }
    let upper = grid.iter().position(|g| *g > x).unwrap_or(last);
    let lower = upper - 1;
    (lower, (x - grid[lower]) / (grid[upper] - grid[lower]))
}

/// Compressibility factor of hydrogen.
///
/// # Arguments
///
/// * `pressure` - Pressure in bar
/// * `temperature` - Temperature in K
pub fn compressibility(pressure: f64, temperature: f64) -> f64 {
    let (ti, tf) = locate(&Z_TEMPERATURES, temperature);
    let (pi, pf) = locate(&Z_PRESSURES, pressure);
    let z00 = Z_TABLE[ti][pi];
    let z01 = Z_TABLE[ti][pi + 1];
    let z10 = Z_TABLE[ti + 1][pi];
    let z11 = Z_TABLE[ti + 1][pi + 1];
    let low = z00 + (z01 - z00) * pf;
    let high = z10 + (z11 - z10) * pf;
    low + (high - low) * tf
}

/// Volume in m³ holding `mass` kg at `pressure` bar and `temperature` K.
pub fn volume(mass: f64, pressure: f64, temperature: f64) -> f64 {
    mass * compressibility(pressure, temperature) * R_H2 * temperature / (pressure * BAR)
}

/// Mass in kg held by `volume` m³ at `pressure` bar and `temperature` K.
pub fn mass(pressure: f64, volume: f64, temperature: f64) -> f64 {
    pressure * BAR * volume / (compressibility(pressure, temperature) * R_H2 * temperature)
}

/// Pressure in bar of `mass` kg in `volume` m³ at `temperature` K.
///
/// Solved by fixed-point iteration starting from the ideal-gas pressure.
pub fn pressure(mass: f64, volume: f64, temperature: f64) -> f64 {
    if mass <= 0.0 || volume <= 0.0 {
        return 0.0;
    }
    let ideal = mass * R_H2 * temperature / (volume * BAR);
    let mut p = ideal;
    for _ in 0..50 {
        let next = ideal * compressibility(p, temperature);
        if (next - p).abs() < 1e-9 * next.max(1.0) {
            return next;
        }
        p = next;
    }
    p
}
