use rand::{rngs::SmallRng, seq::SliceRandom, Rng, SeedableRng};

/*
Noise Sources
=============

The voice needs two very different kinds of randomness.

  white noise     One independent uniform sample per output frame. After
                  band-pass shaping it becomes breath (aspiration at the
                  glottis) and hiss (frication at a constriction).

  smooth noise    A slowly wandering value used to make the voice imperfect:
                  pitch jitter, vibrato wobble, tenseness drift. It has to be
                  continuous in time, bounded, and identical from run to run,
                  otherwise the "human" wobble turns into clicks.

For the smooth kind we sample 2-D simplex noise along a straight line through
the plane. Each jitter channel walks the line at its own speed, so channels
that share one noise field still come out uncorrelated:

    jitter(t) = simplex(2.4 * t * k, -1.4 * t * k)     k = per-channel rate

Simplex vs. Perlin
------------------

Simplex noise evaluates three corners of a triangle instead of four corners
of a square, has no visible grid alignment, and its output stays inside
roughly [-1, 1]. Any coherent noise would do here; this one is pinned (with a
seeded permutation table) so renders are reproducible sample for sample.
*/

/// Seed used when the caller does not pick one.
pub const DEFAULT_NOISE_SEED: u64 = 0x7472_6f6d_626f_6e65;

/// Deterministic 2-D simplex noise.
#[derive(Clone)]
pub struct SimplexNoise {
    /// Permutation table, doubled so corner hashing never wraps.
    perm: [u8; 512],
}

impl SimplexNoise {
    /// (sqrt(3) - 1) / 2
    const F2: f64 = 0.366_025_403_784_438_6;
    /// (3 - sqrt(3)) / 6
    const G2: f64 = 0.211_324_865_405_187_13;

    const GRAD2: [[f64; 2]; 12] = [
        [1.0, 1.0],
        [-1.0, 1.0],
        [1.0, -1.0],
        [-1.0, -1.0],
        [1.0, 0.0],
        [-1.0, 0.0],
        [1.0, 0.0],
        [-1.0, 0.0],
        [0.0, 1.0],
        [0.0, -1.0],
        [0.0, 1.0],
        [0.0, -1.0],
    ];

    pub fn new(seed: u64) -> Self {
        let mut rng = SmallRng::seed_from_u64(seed);
        let mut source = [0u8; 256];
        for (i, slot) in source.iter_mut().enumerate() {
            *slot = i as u8;
        }
        source.shuffle(&mut rng);

        let mut perm = [0u8; 512];
        perm[..256].copy_from_slice(&source);
        perm[256..].copy_from_slice(&source);

        Self { perm }
    }

    #[inline]
    fn grad(hash: usize, x: f64, y: f64) -> f64 {
        let g = &Self::GRAD2[hash % 12];
        g[0] * x + g[1] * y
    }

    #[inline]
    fn corner(hash: usize, x: f64, y: f64) -> f64 {
        let t = 0.5 - x * x - y * y;
        if t < 0.0 {
            0.0
        } else {
            let t2 = t * t;
            t2 * t2 * Self::grad(hash, x, y)
        }
    }

    /// Sample the field at `(x, y)`. Output lies in roughly `[-1, 1]`.
    pub fn sample(&self, x: f64, y: f64) -> f64 {
        // Skew into simplex space to find the containing cell
        let s = (x + y) * Self::F2;
        let i = (x + s).floor() as i64;
        let j = (y + s).floor() as i64;

        let t = (i + j) as f64 * Self::G2;
        let x0 = x - (i as f64 - t);
        let y0 = y - (j as f64 - t);

        let (i1, j1) = if x0 > y0 { (1, 0) } else { (0, 1) };

        let x1 = x0 - i1 as f64 + Self::G2;
        let y1 = y0 - j1 as f64 + Self::G2;
        let x2 = x0 - 1.0 + 2.0 * Self::G2;
        let y2 = y0 - 1.0 + 2.0 * Self::G2;

        let ii = (i & 255) as usize;
        let jj = (j & 255) as usize;
        let p = &self.perm;

        let gi0 = p[ii + p[jj] as usize] as usize;
        let gi1 = p[ii + i1 + p[jj + j1] as usize] as usize;
        let gi2 = p[ii + 1 + p[jj + 1] as usize] as usize;

        70.0 * (Self::corner(gi0, x0, y0) + Self::corner(gi1, x1, y1) + Self::corner(gi2, x2, y2))
    }

    /// Sample along the jitter line at time `t` (seconds, pre-scaled per channel).
    #[inline]
    pub fn jitter(&self, t: f64) -> f64 {
        let x = t * 1.2;
        let y = -t * 0.7;
        self.sample(x * 2.0, y * 2.0)
    }
}

/// Uniform white noise in `[0, 1)`.
pub struct WhiteNoise {
    rng: SmallRng,
}

impl WhiteNoise {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    #[inline]
    pub fn next_sample(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}
