use log::trace;
use nalgebra::{Matrix3, Vector3};

use super::{FitArgs, FitConfig, FitFailure, FitResult, PeakShapeModel};

const MIN_DAMPING: f64 = 1e-12;
const MAX_DAMPING: f64 = 1e12;

/// Fit a [`PeakShapeModel`] to some data by damped least squares
#[derive(Debug, Clone)]
pub struct PeakShapeFitter<'a, 'b> {
    pub data: FitArgs<'a, 'b>,
}

impl<'a, 'b> PeakShapeFitter<'a, 'b> {
    pub fn new(data: FitArgs<'a, 'b>) -> Self {
        Self { data }
    }

    /// Reject inputs that cannot determine three parameters
    pub fn validate(&self, config: &FitConfig) -> Result<(), FitFailure> {
        let required = config.required_points();
        let points = self.data.distinct_points();
        if points < required {
            return Err(FitFailure::TooFewPoints { points, required });
        }
        if !self.data.is_finite() {
            return Err(FitFailure::NonFinite);
        }
        if self.data.is_constant() {
            return Err(FitFailure::ConstantSignal);
        }
        Ok(())
    }

    /// The normal equations `JᵀJ` and `Jᵀr` at `model`
    fn normal_equations<T: PeakShapeModel>(&self, model: &T) -> (Matrix3<f64>, Vector3<f64>) {
        let mut jtj = Matrix3::zeros();
        let mut jtr = Vector3::zeros();
        for (x, y) in self.data.iter() {
            let j = Vector3::from(model.jacobian(x));
            let r = y - model.density(x);
            jtj += j * j.transpose();
            jtr += j * r;
        }
        (jtj, jtr)
    }

    /// Run Levenberg-Marquardt from the parameters in `model`, updating it in place
    /// with the best parameters found.
    pub fn fit_model<T: PeakShapeModel>(
        &self,
        model: &mut T,
        config: &FitConfig,
    ) -> Result<FitResult, FitFailure> {
        self.validate(config)?;
        if !model.is_valid() {
            return Err(FitFailure::NonFinite);
        }

        let mut params = Vector3::from(model.params());
        let mut cost = model.residual_sum_of_squares(&self.data);
        let mut damping = config.damping;
        let mut converged = cost == 0.0;
        let mut iterations = 0;

        while !converged && iterations < config.max_iter {
            iterations += 1;
            let current = T::from_params(params.into());
            let (jtj, jtr) = self.normal_equations(&current);
            let mut scaled = jtj;
            for i in 0..3 {
                scaled[(i, i)] += damping * jtj[(i, i)].max(f64::EPSILON);
            }

            let step = match scaled.lu().solve(&jtr) {
                Some(step) if step.iter().all(|s| s.is_finite()) => step,
                _ => {
                    damping *= 10.0;
                    if damping > MAX_DAMPING {
                        break;
                    }
                    continue;
                }
            };

            let candidate_params = params + step;
            let candidate = T::from_params(candidate_params.into());
            let candidate_cost = if candidate.is_valid() {
                candidate.residual_sum_of_squares(&self.data)
            } else {
                f64::INFINITY
            };

            if candidate_cost.is_finite() && candidate_cost <= cost {
                let improvement = cost - candidate_cost;
                trace!(
                    "{iterations}: cost {cost:.6e} -> {candidate_cost:.6e}, \
                     damping {damping:.1e}, params {candidate_params:?}"
                );
                converged = step.norm() <= config.convergence * (params.norm() + config.convergence)
                    || improvement <= config.convergence * cost
                    || candidate_cost == 0.0;
                params = candidate_params;
                cost = candidate_cost;
                damping = (damping / 10.0).max(MIN_DAMPING);
            } else {
                damping *= 10.0;
                // No step in any direction lowers the error: a minimum
                if damping > MAX_DAMPING {
                    converged = true;
                }
            }
        }

        if !converged {
            return Err(FitFailure::DidNotConverge { iterations });
        }

        *model = T::from_params(params.into());
        if !model.is_valid() {
            return Err(FitFailure::NonFinite);
        }
        let r_squared = model.r_squared(&self.data);
        if !r_squared.is_finite() {
            return Err(FitFailure::NonFinite);
        }
        Ok(model.to_result(r_squared, iterations))
    }
}
