use crate::errors::{invalid, EngineResult};
use rand::distributions::Bernoulli;
use rand::Rng;
use rand_distr::Distribution;

/// Two-sided return distribution: with probability `p` an upside draw,
/// otherwise the negated downside draw. Both halves are usually defined on
/// magnitudes.
#[derive(Debug, Clone, Copy)]
pub struct MixtureDistribution<U, D> {
    choice: Bernoulli,
    upside: U,
    downside: D,
}

impl<U, D> MixtureDistribution<U, D>
where
    U: Distribution<f64>,
    D: Distribution<f64>,
{
    pub fn new(upside_probability: f64, upside: U, downside: D) -> EngineResult<Self> {
        let choice = match Bernoulli::new(upside_probability) {
            Ok(b) => b,
            Err(_) => {
                return invalid(format!(
                    "mixture probability must be in [0, 1], got {upside_probability}"
                ))
            }
        };
        Ok(Self {
            choice,
            upside,
            downside,
        })
    }
}

impl<U, D> Distribution<f64> for MixtureDistribution<U, D>
where
    U: Distribution<f64>,
    D: Distribution<f64>,
{
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.choice.sample(rng) {
            self.upside.sample(rng)
        } else {
            -self.downside.sample(rng)
        }
    }
}

/// Log transform mapping (-inf, upper) onto the real line:
///
///   y = L - H * ln((H - x) / (H - L))
///   x = H - exp((L - y) / H) * (H - L)
///
/// A fit in y-space becomes a return generator capped at `upper` once
/// mapped back.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DualTransform {
    lower: f64,
    upper: f64,
}

impl DualTransform {
    pub fn new(lower: f64, upper: f64) -> EngineResult<Self> {
        if !lower.is_finite() || !upper.is_finite() || upper <= 0.0 || lower >= upper {
            return invalid(format!(
                "dual transform needs finite lower < upper with upper > 0, got ({lower}, {upper})"
            ));
        }
        Ok(Self { lower, upper })
    }

    /// Forward map; NaN for `x >= upper`.
    #[inline]
    pub fn transform(&self, x: f64) -> f64 {
        let (l, h) = (self.lower, self.upper);
        l - h * ((h - x) / (h - l)).ln()
    }

    #[inline]
    pub fn inverse_transform(&self, y: f64) -> f64 {
        let (l, h) = (self.lower, self.upper);
        h - ((l - y) / h).exp() * (h - l)
    }
}

/// Draws from `base` and maps them back through the inverse transform.
#[derive(Debug, Clone, Copy)]
pub struct TransformedDistribution<B> {
    base: B,
    transform: DualTransform,
}

impl<B: Distribution<f64>> TransformedDistribution<B> {
    pub fn new(base: B, transform: DualTransform) -> Self {
        Self { base, transform }
    }
}

impl<B: Distribution<f64>> Distribution<f64> for TransformedDistribution<B> {
    #[inline]
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        self.transform.inverse_transform(self.base.sample(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ReturnSample;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rand_distr::{Exp, Normal};

    #[test]
    fn test_mixture_signs_follow_choice() {
        let mut rng = StdRng::seed_from_u64(1);
        let up = Exp::new(50.0).unwrap();
        let down = Exp::new(20.0).unwrap();

        let only_up = MixtureDistribution::new(1.0, up, down).unwrap();
        assert!((0..1_000).all(|_| only_up.sample(&mut rng) >= 0.0));

        let only_down = MixtureDistribution::new(0.0, up, down).unwrap();
        assert!((0..1_000).all(|_| only_down.sample(&mut rng) <= 0.0));

        assert!(MixtureDistribution::new(1.5, up, down).is_err());
    }

    #[test]
    fn test_mixture_feeds_return_sample() {
        let mut rng = StdRng::seed_from_u64(2);
        let mix = MixtureDistribution::new(0.6, Exp::new(50.0).unwrap(), Exp::new(25.0).unwrap()).unwrap();
        let sample = ReturnSample::draw(&mix, 20_000, &mut rng).unwrap();
        // 0.6 / 50 - 0.4 / 25 = -0.004
        assert!((sample.mean() + 0.004).abs() < 0.001, "mean={}", sample.mean());
        let up_share = sample.gains().len() as f64 / sample.len() as f64;
        assert!((up_share - 0.6).abs() < 0.02, "up_share={up_share}");
    }

    #[test]
    fn test_dual_transform_inverts() {
        let t = DualTransform::new(-0.05, 0.3).unwrap();
        for x in [-0.5, -0.05, 0.0, 0.1, 0.29] {
            assert_relative_eq!(t.inverse_transform(t.transform(x)), x, epsilon = 1e-12);
        }
        assert_relative_eq!(t.transform(-0.05), -0.05, epsilon = 1e-15);
        assert!(t.transform(0.3).is_infinite() || t.transform(0.31).is_nan());
        assert!(DualTransform::new(0.3, 0.1).is_err());
    }

    #[test]
    fn test_transformed_draws_stay_below_cap() {
        let t = DualTransform::new(0.0, 0.25).unwrap();
        let dist = TransformedDistribution::new(Normal::new(0.0, 0.5).unwrap(), t);
        let mut rng = StdRng::seed_from_u64(3);
        assert!((0..5_000).all(|_| dist.sample(&mut rng) < 0.25));
    }
}
