use nalgebra as na;
use num_traits::Float;

/// Least-squares line through `(x, y)`, returns `[slope, intercept]`.
pub fn linear_ls<T: na::ComplexField + Float>(
    x: &na::DVector<T>,
    y: &na::DVector<T>,
) -> Option<na::Matrix2x1<T>> {
    let n = T::from(x.len())?;
    let eps = T::from(f32::EPSILON)?;

    let s_x = x.sum() + eps;
    let x2 = x.map(|x| x * x);
    let s_x2 = x2.sum() + eps;
    let s_xy = x.zip_map(y, |x, y| x * y).sum();
    let s_y = y.sum();

    let a = na::Matrix2::new(s_x2, s_x, s_x, n);
    let b = na::Matrix2x1::new(s_xy, s_y);

    let qr_result = a.qr();
    let qty = qr_result.q().transpose() * b;

    qr_result.r().solve_upper_triangular(&qty)
}

/// Slope of evenly spaced samples (oldest first), in units per sample.
pub fn trend(samples: &[f32]) -> Option<f32> {
    if samples.len() < 3 {
        return None;
    }

    let x = na::DVector::from_iterator(samples.len(), (0..samples.len()).map(|i| i as f32));
    let y = na::DVector::from_column_slice(samples);

    let beta = linear_ls(&x, &y)?;
    let slope = beta[0];

    slope.is_finite().then(|| slope)
}

#[inline]
pub fn lerp(a: &na::Point2<f32>, b: &na::Point2<f32>, t: f32) -> na::Point2<f32> {
    (a.coords * (1.0 - t) + b.coords * t).into()
}

/// Fills holes of at most `max_gap` frames in a frame-sorted trajectory
/// with linearly interpolated points. Longer holes are left as they are.
pub fn interpolate_gaps(
    samples: &[(u64, na::Point2<f32>)],
    max_gap: u64,
) -> Vec<(u64, na::Point2<f32>)> {
    let mut out = Vec::with_capacity(samples.len());

    for pair in samples.windows(2) {
        let (f0, p0) = pair[0];
        let (f1, p1) = pair[1];

        out.push((f0, p0));

        let gap = f1.saturating_sub(f0);
        if gap > 1 && gap <= max_gap {
            for f in f0 + 1..f1 {
                let t = (f - f0) as f32 / gap as f32;
                out.push((f, lerp(&p0, &p1, t)));
            }
        }
    }

    if let Some(last) = samples.last() {
        out.push(*last);
    }

    out
}
