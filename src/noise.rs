/// Seeded, smooth 2D value noise.
///
/// This is the determinism core of stylization: jitter is a pure function of
/// (seed, arc-length position, time) instead of a draw from a stateful RNG,
/// so re-renders and parallel re-execution reproduce identical strokes, and
/// a small step in time moves the jitter by a correspondingly small amount.
#[derive(Clone, Copy, Debug)]
pub struct ValueNoise2 {
    seed: u64,
}

impl ValueNoise2 {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Sample at (x, y). Output is in [-1, 1], C1-continuous in both axes.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = x - x0;
        let fy = y - y0;
        let ix = x0 as i64;
        let iy = y0 as i64;

        let v00 = self.lattice(ix, iy);
        let v10 = self.lattice(ix + 1, iy);
        let v01 = self.lattice(ix, iy + 1);
        let v11 = self.lattice(ix + 1, iy + 1);

        let wx = smoothstep(fx);
        let wy = smoothstep(fy);

        let a = v00 + (v10 - v00) * wx;
        let b = v01 + (v11 - v01) * wx;
        a + (b - a) * wy
    }

    /// Deterministic lattice value in [-1, 1].
    fn lattice(&self, ix: i64, iy: i64) -> f64 {
        let h = mix64(
            self.seed
                ^ (ix as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15)
                ^ (iy as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F),
        );
        // Top 53 bits to a float in [0,1), then to [-1,1].
        let unit = (h >> 11) as f64 / (1u64 << 53) as f64;
        unit * 2.0 - 1.0
    }
}

fn smoothstep(t: f64) -> f64 {
    t * t * (3.0 - 2.0 * t)
}

fn mix64(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
