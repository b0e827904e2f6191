/// Rec.601 luma weights used by the saturation stage
pub const LUMA_WEIGHTS: [f32; 3] = [0.2989, 0.5870, 0.1140];

/// Gray weights used by the monochrome preset
pub const GRAY_WEIGHTS: [f32; 3] = [0.3, 0.59, 0.11];

/// 3x3 color matrix applied to linear RGB triples (rows produce R, G, B)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorMatrix(pub [[f32; 3]; 3]);

impl ColorMatrix {
    pub const IDENTITY: ColorMatrix =
        ColorMatrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);

    pub const SEPIA: ColorMatrix = ColorMatrix([
        [0.393, 0.769, 0.189],
        [0.349, 0.686, 0.168],
        [0.272, 0.534, 0.131],
    ]);

    /// Hue rotation around the gray axis. Uses the luma-preserving matrix of
    /// the SVG/CSS `hue-rotate` filter so capture and preview rotate alike.
    pub fn hue_rotation(degrees: f32) -> Self {
        let (sin, cos) = degrees.to_radians().sin_cos();

        ColorMatrix([
            [
                0.213 + cos * 0.787 - sin * 0.213,
                0.715 - cos * 0.715 - sin * 0.715,
                0.072 - cos * 0.072 + sin * 0.928,
            ],
            [
                0.213 - cos * 0.213 + sin * 0.143,
                0.715 + cos * 0.285 + sin * 0.140,
                0.072 - cos * 0.072 - sin * 0.283,
            ],
            [
                0.213 - cos * 0.213 - sin * 0.787,
                0.715 - cos * 0.715 + sin * 0.715,
                0.072 + cos * 0.928 + sin * 0.072,
            ],
        ])
    }

    /// Linear blend between identity (`amount = 0`) and `self` (`amount = 1`)
    pub fn blend_with_identity(&self, amount: f32) -> Self {
        let mut out = [[0.0f32; 3]; 3];
        for (row, out_row) in out.iter_mut().enumerate() {
            for (col, cell) in out_row.iter_mut().enumerate() {
                let id = Self::IDENTITY.0[row][col];
                *cell = id + (self.0[row][col] - id) * amount;
            }
        }
        ColorMatrix(out)
    }

    #[inline]
    pub fn apply(&self, [r, g, b]: [f32; 3]) -> [f32; 3] {
        let m = &self.0;
        [
            r * m[0][0] + g * m[0][1] + b * m[0][2],
            r * m[1][0] + g * m[1][1] + b * m[1][2],
            r * m[2][0] + g * m[2][1] + b * m[2][2],
        ]
    }
}

#[inline]
pub fn weighted_sum([r, g, b]: [f32; 3], weights: [f32; 3]) -> f32 {
    r * weights[0] + g * weights[1] + b * weights[2]
}

/// `(v - 128) * factor + 128` on one channel
#[inline]
pub fn contrast_channel(v: f32, factor: f32) -> f32 {
    (v - 128.0) * factor + 128.0
}

/// Pull channels toward or away from their luma
#[inline]
pub fn saturate(rgb: [f32; 3], factor: f32) -> [f32; 3] {
    let y = weighted_sum(rgb, LUMA_WEIGHTS);
    rgb.map(|c| y + (c - y) * factor)
}

#[inline]
pub fn clamp_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}
