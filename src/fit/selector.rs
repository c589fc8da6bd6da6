//! Iterative choice of the number of velocity components.
//!
//! The selector fits the current model, looks at where the residual is
//! largest, proposes one more component there and refits. The larger model
//! is kept while any of ΔBIC, ΔAIC or Δ(reduced χ²) is negative; the first
//! proposal that improves none of them is discarded and the previous fit is
//! returned.
//!
//! ```no_run
//! use astrovoigt_rs::config::FitConfig;
//! use astrovoigt_rs::fit::ModelOrderSelector;
//! use astrovoigt_rs::species::SpeciesSpec;
//! use ndarray::Array1;
//!
//! # fn observed() -> (Array1<f64>, Array1<f64>) { unimplemented!() }
//! let (wavelength, flux) = observed();
//! let ca = SpeciesSpec::new("CaI").with_transition(4226.728, 1.77, 2.2e8);
//!
//! let outcome = ModelOrderSelector::new(FitConfig::default())
//!     .select(&[ca], &wavelength, &flux, None)
//!     .unwrap();
//! println!("{} components: {}", outcome.component_count(), outcome.termination);
//! ```

use log::{debug, info, warn};
use ndarray::Array1;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::guess::{initial_guess, reference_wavelength, velocity_at};
use super::result::{FitResult, SpeciesFit};
use crate::absorption::AbsorptionModel;
use crate::config::FitConfig;
use crate::error::{Result, VoigtFitError};
use crate::expander::column_name;
use crate::model::Model;
use crate::species::{Absorbers, Cloud, SharedVelocityGroup, SpeciesSpec};

/// Why the selector stopped adding components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// The last proposal improved none of the criteria
    CriteriaSatisfied,

    /// The last proposal duplicated a component or fitted noise
    Degenerate(String),

    /// A fit failed to converge
    NonConvergence(String),

    /// `max_components` was reached
    ComponentLimit,

    /// The residual carries no usable signal
    NoResidualStructure,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::CriteriaSatisfied => write!(f, "no criterion favours another component"),
            Termination::Degenerate(reason) => write!(f, "degenerate proposal: {}", reason),
            Termination::NonConvergence(reason) => write!(f, "fit did not converge: {}", reason),
            Termination::ComponentLimit => write!(f, "component limit reached"),
            Termination::NoResidualStructure => write!(f, "residual has no structure"),
        }
    }
}

/// Statistics of one fit made during selection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionStep {
    /// Components per species
    pub components: usize,
    pub chisqr: f64,
    pub redchi: f64,
    pub aic: f64,
    pub bic: f64,
    pub success: bool,

    /// Differences to the accepted fit before this one
    pub delta_bic: Option<f64>,
    pub delta_aic: Option<f64>,
    pub delta_redchi: Option<f64>,

    pub accepted: bool,
    pub species: Vec<SpeciesFit>,
}

impl SelectionStep {
    fn record(result: &FitResult, previous: Option<&FitResult>, accepted: bool) -> Self {
        let fit = &result.fit;
        Self {
            components: result.component_count(),
            chisqr: fit.chisqr,
            redchi: fit.redchi,
            aic: fit.aic,
            bic: fit.bic,
            success: fit.success,
            delta_bic: previous.map(|p| fit.bic - p.fit.bic),
            delta_aic: previous.map(|p| fit.aic - p.fit.aic),
            delta_redchi: previous.map(|p| fit.redchi - p.fit.redchi),
            accepted,
            species: result.species.clone(),
        }
    }
}

/// Final fit of a selection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionOutcome {
    pub best: FitResult,
    pub history: Vec<SelectionStep>,
    pub termination: Termination,
}

impl SelectionOutcome {
    pub fn component_count(&self) -> usize {
        self.best.component_count()
    }
}

/// A fitted model the loop can fall back to.
struct Accepted {
    model: AbsorptionModel,
    result: FitResult,
}

enum State {
    /// Fit the starting model
    Fit(Absorbers),
    /// Inspect the accepted fit and propose one more component
    Evaluate(Accepted),
    /// Fit the proposal
    Refit { current: Accepted, candidate: Absorbers },
    /// Compare the proposal with the accepted fit
    Decide { current: Accepted, candidate: Accepted },
    Done(Accepted, Termination),
}

/// Where a new component goes.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Proposal {
    /// New component at this velocity
    Add(f64),
    /// Move `group` to `lower` and add a component at `upper`
    Split { group: usize, lower: f64, upper: f64 },
}

/// Chooses the number of components by repeated fitting.
#[derive(Debug, Clone, Default)]
pub struct ModelOrderSelector {
    config: FitConfig,
    ties: Vec<(String, String)>,
}

impl ModelOrderSelector {
    pub fn new(config: FitConfig) -> Self {
        Self {
            config,
            ties: Vec::new(),
        }
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// Constrain a parameter in every model the selector fits.
    ///
    /// Names follow the model's layout (`v_rad_{g}`, `b_{s}_{k}`,
    /// `N_{s}_{k}`), so a tie on component `k` applies once that
    /// component exists.
    pub fn with_tie(mut self, name: &str, expr: &str) -> Self {
        self.ties.push((name.to_string(), expr.to_string()));
        self
    }

    /// Run the selection from per-species input.
    ///
    /// Species may either all supply the same number of starting
    /// components or none at all, in which case one is seeded from the
    /// data.
    pub fn select(
        &self,
        specs: &[SpeciesSpec],
        wavelength: &Array1<f64>,
        flux: &Array1<f64>,
        weights: Option<&Array1<f64>>,
    ) -> Result<SelectionOutcome> {
        self.select_absorbers(Absorbers::from_specs(specs)?, wavelength, flux, weights)
    }

    pub fn select_absorbers(
        &self,
        mut absorbers: Absorbers,
        wavelength: &Array1<f64>,
        flux: &Array1<f64>,
        weights: Option<&Array1<f64>>,
    ) -> Result<SelectionOutcome> {
        self.config.validate()?;
        let reference = reference_wavelength(&absorbers, &self.config.selector)?;

        match absorbers.component_count() {
            None if absorbers.species.is_empty() => {
                return Err(VoigtFitError::Configuration("no species to fit".to_string()));
            }
            None => {
                return Err(VoigtFitError::Configuration(
                    "every species must start with the same number of components".to_string(),
                ));
            }
            Some(0) => {
                let seed = initial_guess(
                    wavelength,
                    flux,
                    reference,
                    self.config.selector.initial_guess,
                    &self.config.components,
                )?;
                info!("seeding one component at {:.2} km/s", seed.v_rad);
                absorbers.add_component(seed);
            }
            Some(k) => debug!("starting from {} components", k),
        }

        let mut history = Vec::new();
        let mut state = State::Fit(absorbers);

        loop {
            state = match state {
                State::Fit(absorbers) => {
                    let model = self.build_model(absorbers)?;
                    let result = model.fit(wavelength, flux, weights)?;
                    let success = result.success();
                    history.push(SelectionStep::record(&result, None, success));
                    let accepted = Accepted { model, result };
                    if success {
                        State::Evaluate(accepted)
                    } else {
                        let message = accepted.result.fit.message.clone();
                        warn!("initial fit did not converge: {}", message);
                        State::Done(accepted, Termination::NonConvergence(message))
                    }
                }

                State::Evaluate(current) => {
                    let count = current.result.component_count();
                    if count >= self.config.selector.max_components {
                        warn!("stopping at the component limit of {}", count);
                        State::Done(current, Termination::ComponentLimit)
                    } else {
                        let residual = flux - &current.result.fit.best_fit;
                        match self.propose(&current, wavelength, &residual, reference)? {
                            Some(candidate) => State::Refit { current, candidate },
                            None => {
                                info!("residual has no structure left");
                                State::Done(current, Termination::NoResidualStructure)
                            }
                        }
                    }
                }

                State::Refit { current, candidate } => {
                    let model = self.build_model(candidate)?;
                    match model.fit(wavelength, flux, weights) {
                        Ok(result) if result.success() => State::Decide {
                            current,
                            candidate: Accepted { model, result },
                        },
                        Ok(result) => {
                            history.push(SelectionStep::record(&result, Some(&current.result), false));
                            warn!("proposal did not converge: {}", result.fit.message);
                            State::Done(current, Termination::NonConvergence(result.fit.message))
                        }
                        Err(e) if e.is_numeric_stop() => {
                            warn!("proposal failed: {}", e);
                            State::Done(current, Termination::NonConvergence(e.to_string()))
                        }
                        Err(e) => return Err(e),
                    }
                }

                State::Decide { current, candidate } => {
                    let step = SelectionStep::record(&candidate.result, Some(&current.result), false);
                    debug!(
                        "{} components: dBIC = {:.3}, dAIC = {:.3}, dredchi = {:.4}",
                        step.components,
                        step.delta_bic.unwrap_or(0.0),
                        step.delta_aic.unwrap_or(0.0),
                        step.delta_redchi.unwrap_or(0.0)
                    );

                    match verdict(&step, self.degeneracy(&candidate.result)) {
                        None => {
                            info!("accepting {} components", step.components);
                            history.push(SelectionStep { accepted: true, ..step });
                            State::Evaluate(candidate)
                        }
                        Some(termination) => {
                            match &termination {
                                Termination::Degenerate(reason) => {
                                    warn!("rejecting {} components: {}", step.components, reason)
                                }
                                _ => info!(
                                    "keeping {} components; another one improves no criterion",
                                    current.result.component_count()
                                ),
                            }
                            history.push(step);
                            State::Done(current, termination)
                        }
                    }
                }

                State::Done(accepted, termination) => {
                    return Ok(SelectionOutcome {
                        best: accepted.result,
                        history,
                        termination,
                    });
                }
            };
        }
    }

    fn build_model(&self, absorbers: Absorbers) -> Result<AbsorptionModel> {
        let mut model = AbsorptionModel::new(absorbers, &self.config)?;
        for (name, expr) in &self.ties {
            if model.parameters().contains(name) {
                model.tie(name, expr)?;
            }
        }
        Ok(model)
    }

    /// Next candidate absorbers, warm-started from the accepted fit.
    fn propose(
        &self,
        current: &Accepted,
        wavelength: &Array1<f64>,
        residual: &Array1<f64>,
        reference: f64,
    ) -> Result<Option<Absorbers>> {
        let mut candidate = current.model.expander().resolve(current.result.params())?;
        let pad = self.config.selector.boundary_pad;
        let Some(proposal) = locate(&candidate.groups, wavelength, residual, reference, pad)? else {
            return Ok(None);
        };

        let count = candidate.component_count().unwrap_or(0) + 1;
        let (b, n) = self.config.components.for_count(count);

        match proposal {
            Proposal::Add(v_rad) => {
                info!("proposing component {} at {:.2} km/s", count, v_rad);
                candidate.add_component(Cloud::new(v_rad, b, n));
            }
            Proposal::Split { group, lower, upper } => {
                info!(
                    "splitting the component at {:.2} km/s into {:.2} and {:.2} km/s",
                    candidate.groups[group].velocity, lower, upper
                );
                candidate.reset_group(group, Cloud::new(lower, b, n))?;
                candidate.add_component(Cloud::new(upper, b, n));
            }
        }
        Ok(Some(candidate))
    }

    /// Reason a fitted proposal should not be kept, if any.
    fn degeneracy(&self, result: &FitResult) -> Option<String> {
        let selector = &self.config.selector;

        for species in &result.species {
            let velocities: Vec<f64> = species.components.iter().map(|c| c.v_rad).collect();
            for (i, &a) in velocities.iter().enumerate() {
                if let Some(&b) = velocities[i + 1..].iter().find(|&&b| (a - b).abs() < selector.min_separation) {
                    return Some(format!(
                        "{} components at {:.2} and {:.2} km/s are closer than {} km/s",
                        species.name, a, b, selector.min_separation
                    ));
                }
            }
        }

        for (s, species) in result.species.iter().enumerate() {
            for (k, component) in species.components.iter().enumerate() {
                let Some(param) = result.params().get(&column_name(s, k)) else {
                    continue;
                };
                if !param.vary() {
                    continue;
                }
                match component.n_err {
                    Some(err) if err > 0.0 && component.n / err >= selector.min_significance => {}
                    Some(err) => {
                        return Some(format!(
                            "{} N[{}] = {:.3e} ± {:.3e} is below {} sigma",
                            species.name, k, component.n, err, selector.min_significance
                        ))
                    }
                    None => return Some(format!("{} N[{}] has no uncertainty", species.name, k)),
                }
            }
        }
        None
    }
}

/// Where the residual says a component is missing.
///
/// The peak is the largest |r|, leftmost on ties. Its boundaries are the
/// nearest strict local minima of |r| on either side, or the grid ends,
/// padded outward by `pad` km/s. If the nearest of the fitted `groups` lies
/// inside the boundaries that group is split, otherwise a component is
/// added at the peak.
fn locate(
    groups: &[SharedVelocityGroup],
    wavelength: &Array1<f64>,
    residual: &Array1<f64>,
    reference: f64,
    pad: f64,
) -> Result<Option<Proposal>> {
    if residual.len() != wavelength.len() {
        return Err(VoigtFitError::DimensionMismatch(format!(
            "residual has {} samples, wavelength has {}",
            residual.len(),
            wavelength.len()
        )));
    }
    let magnitude: Vec<f64> = residual.iter().map(|r| r.abs()).collect();
    if magnitude.iter().any(|m| !m.is_finite()) {
        return Ok(None);
    }
    let Some((peak, &height)) = magnitude
        .iter()
        .enumerate()
        .fold(None, |best: Option<(usize, &f64)>, (i, m)| match best {
            Some((_, b)) if *b >= *m => best,
            _ => Some((i, m)),
        })
    else {
        return Ok(None);
    };
    if height == 0.0 {
        return Ok(None);
    }

    let is_minimum = |i: usize| magnitude[i] < magnitude[i - 1] && magnitude[i] < magnitude[i + 1];
    let last = magnitude.len() - 1;
    let left = (1..peak).rev().find(|&i| is_minimum(i)).unwrap_or(0);
    let right = (peak + 1..last).find(|&i| is_minimum(i)).unwrap_or(last);

    let v_peak = velocity_at(wavelength[peak], reference);
    let lower = velocity_at(wavelength[left], reference) - pad;
    let upper = velocity_at(wavelength[right], reference) + pad;
    debug!(
        "residual peak {:.4} at {:.2} km/s, boundaries [{:.2}, {:.2}] km/s",
        height, v_peak, lower, upper
    );

    let nearest = groups
        .iter()
        .enumerate()
        .map(|(g, group)| (g, group.velocity))
        .fold(None, |best: Option<(usize, f64)>, (g, v)| match best {
            Some((_, bv)) if (bv - v_peak).abs() <= (v - v_peak).abs() => best,
            _ => Some((g, v)),
        });

    Ok(Some(match nearest {
        Some((group, v)) if v >= lower && v <= upper => Proposal::Split { group, lower, upper },
        _ => Proposal::Add(v_peak),
    }))
}

/// Decision on a converged proposal: `None` keeps it, otherwise the loop
/// stops at the previous fit. Degeneracy wins over any criterion.
fn verdict(step: &SelectionStep, degeneracy: Option<String>) -> Option<Termination> {
    if let Some(reason) = degeneracy {
        return Some(Termination::Degenerate(reason));
    }
    let improves = [step.delta_bic, step.delta_aic, step.delta_redchi]
        .iter()
        .any(|d| d.is_some_and(|d| d < 0.0));
    (!improves).then_some(Termination::CriteriaSatisfied)
}
